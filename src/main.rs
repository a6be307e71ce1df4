use anyhow::Context;
use anyhow::Result;
use clap::ArgAction;
use clap::Parser;
use clap::ValueEnum;
use log::debug;
use std::time::Duration;

use relaycard::hardware_test::run_hardware_test;
use relaycard::mask::parse_address;
use relaycard::mask::parse_state_mask;
use relaycard::CardConfig;
use relaycard::CardResponse;
use relaycard::ConfigurationError;
use relaycard::RelayCard;
use relaycard::RelayState;

const DEFAULT_HARDWARE_TEST_ADDRESS: u8 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CommandOption {
    /// Set ports by mask, requires address and 8-bit mask
    #[value(name = "SETPORT")]
    SetPort,
    /// Get ports for address, requires address in mask parameter
    #[value(name = "GETPORT")]
    GetPort,
    /// Switches all relays one-by-one on the address in the mask parameter
    #[value(name = "HARDWARETEST")]
    HardwareTest,
    /// Switch on relays without changing the other outputs, requires address and 8-bit mask
    #[value(name = "SETSINGLE")]
    SetSingle,
    /// Switch off relays without changing the other outputs, requires address and 8-bit mask
    #[value(name = "DELSINGLE")]
    DelSingle,
    /// Flip relays without changing the remaining outputs, requires address and 8-bit mask
    #[value(name = "TOGGLE")]
    Toggle,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drives daisy-chained 8 relay cards over a serial port")]
struct Args {
    #[arg(short, long, value_enum, ignore_case = true)]
    command: CommandOption,

    /// Serial port name, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    port: String,

    /// Card address (first card is 1) and binary relay state, e.g. '1;00110001'
    /// for relays K6, K5 and K1. Read only commands take the address alone.
    #[arg(short, long)]
    mask: Option<String>,

    /// Do not initialize the card chain, use if it was initialized since power on
    #[arg(short = 'n', long)]
    no_init: bool,

    /// Print debug messages, repeat for frame traces
    #[arg(short, long, action = ArgAction::Count)]
    debug: u8,

    /// Give up on a reply after this many milliseconds instead of waiting forever
    #[arg(short, long)]
    timeout_ms: Option<u64>,
}

enum Invocation {
    SetPort(RelayState),
    GetPort(u8),
    HardwareTest(u8),
    SetSingle(RelayState),
    DelSingle(RelayState),
    Toggle(RelayState),
}

fn required_mask<'a>(
    command: CommandOption,
    mask: Option<&'a str>,
) -> Result<&'a str, ConfigurationError> {
    match mask {
        Some(mask) => Ok(mask),
        None => Err(ConfigurationError::MissingMask(format!("{:?}", command))),
    }
}

fn parse_invocation(
    command: CommandOption,
    mask: Option<&str>,
) -> Result<Invocation, ConfigurationError> {
    let invocation = match command {
        CommandOption::SetPort => {
            Invocation::SetPort(parse_state_mask(required_mask(command, mask)?)?)
        }
        CommandOption::GetPort => Invocation::GetPort(parse_address(required_mask(command, mask)?)?),
        CommandOption::HardwareTest => match mask {
            Some(mask) => Invocation::HardwareTest(parse_address(mask)?),
            None => Invocation::HardwareTest(DEFAULT_HARDWARE_TEST_ADDRESS),
        },
        CommandOption::SetSingle => {
            Invocation::SetSingle(parse_state_mask(required_mask(command, mask)?)?)
        }
        CommandOption::DelSingle => {
            Invocation::DelSingle(parse_state_mask(required_mask(command, mask)?)?)
        }
        CommandOption::Toggle => {
            Invocation::Toggle(parse_state_mask(required_mask(command, mask)?)?)
        }
    };
    Ok(invocation)
}

fn print_response(response: &CardResponse) {
    println!("Result frame: {}", response.frame);
    println!("Result state: {}", response.state);
}

fn run(args: Args) -> Result<()> {
    let invocation = parse_invocation(args.command, args.mask.as_deref())?;

    let mut config = CardConfig::new(args.port);
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_read_deadline(Duration::from_millis(timeout_ms));
    }

    let card = RelayCard::open(&config);

    if args.no_init {
        debug!("Option 'no-init' has been set, card not initialized");
    } else {
        debug!("Initializing card(s)");
        card.initialize()
            .with_context(|| format!("Could not initialize card(s) on '{}'", config.port_name))?;
    }

    match invocation {
        Invocation::SetPort(state) => {
            debug!("Command: SetPort {}", state);
            let frame = card.set_port(&state)?;
            println!("Result frame: {}", frame);
        }
        Invocation::GetPort(address) => {
            debug!("Command: GetPort, address {}", address);
            print_response(&card.get_port(address)?);
        }
        Invocation::HardwareTest(address) => {
            debug!("Command: HardwareTest, address {}", address);
            run_hardware_test(&card, address)?;
        }
        Invocation::SetSingle(state) => {
            debug!("Command: SetSingle {}", state);
            print_response(&card.set_single(&state)?);
        }
        Invocation::DelSingle(state) => {
            debug!("Command: DelSingle {}", state);
            print_response(&card.del_single(&state)?);
        }
        Invocation::Toggle(state) => {
            debug!("Command: Toggle {}", state);
            print_response(&card.toggle(&state)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    stderrlog::new()
        .module(module_path!())
        .verbosity(2 + usize::from(args.debug))
        .init()?;

    run(args)
}
