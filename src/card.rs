use log::debug;
use log::info;
use log::trace;
use log::warn;
use std::io::ErrorKind;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI16;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::config::CardConfig;
use crate::error::CardError;
use crate::error::ConfigurationError;
use crate::error::TransportError;
use crate::frame::RequestCommand;
use crate::frame::RequestFrame;
use crate::frame::ResponseFrame;
use crate::frame::FRAME_LEN;
use crate::relay_state::RelayState;
use crate::serial::ExclusiveLink;
use crate::serial::SerialChannel;
use crate::serial::SerialPortChannel;
use crate::serial::SerialTransport;

// Handshake timings are measured on the hardware, keep them as they are.
const SETUP_ATTEMPTS: usize = 4;
const SETUP_POLL_DELAY: Duration = Duration::from_millis(5);
const SETUP_RESPONSE_THRESHOLD: u32 = 3;
const CHAIN_RESPONSE_DELAY: Duration = Duration::from_millis(1023);
const SYNC_BYTE: u8 = 1;
const SYNC_BYTE_COUNT: usize = 4;
const MAX_SETUP_CHUNKS: usize = 256;

const NOT_DETECTED: i16 = -1;

/// Reply to a command that reports the resulting relay state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CardResponse {
    pub frame: ResponseFrame,
    pub state: RelayState,
}

impl CardResponse {
    fn from_frame(frame: ResponseFrame) -> CardResponse {
        // the address the card answered with wins over the requested one
        let state = RelayState::from_byte(frame.address, frame.data);
        CardResponse { frame, state }
    }
}

/// A chain of daisy-chained 8 relay cards behind one serial port.
pub struct RelayCard<C: SerialChannel> {
    transport: SerialTransport<C>,
    detected_card_count: AtomicI16,
    initialized: AtomicBool,
}

impl RelayCard<SerialPortChannel> {
    pub fn open(config: &CardConfig) -> RelayCard<SerialPortChannel> {
        debug!("Setting card port to '{}'", config.port_name);
        RelayCard::new(SerialPortChannel::new(config))
    }
}

impl<C: SerialChannel> RelayCard<C> {
    pub fn new(channel: C) -> RelayCard<C> {
        RelayCard {
            transport: SerialTransport::new(channel),
            detected_card_count: AtomicI16::new(NOT_DETECTED),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn detected_card_count(&self) -> Option<u8> {
        match self.detected_card_count.load(Ordering::SeqCst) {
            NOT_DETECTED => None,
            count => Some(count as u8),
        }
    }

    /// Runs the setup handshake and returns the number of cards in the chain.
    ///
    /// `Ok(None)` means no card echoed the setup command. The handshake
    /// blocks for about 2 seconds.
    pub fn initialize(&self) -> Result<Option<u8>, CardError> {
        self.detected_card_count.store(NOT_DETECTED, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);

        let detected = self
            .transport
            .with_exclusive_access(|link| -> Result<Option<u8>, TransportError> {
                link.discard_input()?;

                for attempt in 0..SETUP_ATTEMPTS {
                    debug!("Sending setup command, attempt {}", attempt + 1);
                    link.write_byte(RequestCommand::Setup.code())?;
                    thread::sleep(SETUP_POLL_DELAY);
                    if link.bytes_to_read()? > SETUP_RESPONSE_THRESHOLD {
                        break;
                    }
                }
                thread::sleep(CHAIN_RESPONSE_DELAY);

                for _ in 0..SYNC_BYTE_COUNT {
                    link.write_byte(SYNC_BYTE)?;
                }
                thread::sleep(CHAIN_RESPONSE_DELAY);

                let detected = find_setup_echo(link)?;

                link.discard_input()?;
                link.discard_output()?;
                Ok(detected)
            })?;

        let count = match detected {
            Some(count) => {
                info!("Found ({}) card(s)", count);
                i16::from(count)
            }
            None => {
                warn!("No card answered the setup command");
                NOT_DETECTED
            }
        };
        self.detected_card_count.store(count, Ordering::SeqCst);
        self.initialized.store(count >= 1, Ordering::SeqCst);
        Ok(detected)
    }

    /// Sets all 8 relays of `state.address()` at once.
    pub fn set_port(&self, state: &RelayState) -> Result<ResponseFrame, CardError> {
        self.send(RequestFrame::new(
            RequestCommand::SetPort,
            state.address(),
            state.to_byte(),
        ))
    }

    pub fn get_port(&self, address: u8) -> Result<CardResponse, CardError> {
        let frame = self.send(RequestFrame::new(RequestCommand::GetPort, address, 0))?;
        Ok(CardResponse::from_frame(frame))
    }

    /// Switches on the relays set in `state`, the others keep their state.
    pub fn set_single(&self, state: &RelayState) -> Result<CardResponse, CardError> {
        self.send_state(RequestCommand::SetSingle, state)
    }

    /// Switches off the relays set in `state`, the others keep their state.
    pub fn del_single(&self, state: &RelayState) -> Result<CardResponse, CardError> {
        self.send_state(RequestCommand::DelSingle, state)
    }

    /// Flips the relays set in `state`.
    pub fn toggle(&self, state: &RelayState) -> Result<CardResponse, CardError> {
        self.send_state(RequestCommand::Toggle, state)
    }

    pub fn toggle_port(&self, address: u8, port: usize) -> Result<CardResponse, CardError> {
        if address == 0 {
            return Err(ConfigurationError::InvalidAddress(address.to_string()).into());
        }
        let state = RelayState::single(address, port)?;
        self.toggle(&state)
    }

    fn send_state(
        &self,
        command: RequestCommand,
        state: &RelayState,
    ) -> Result<CardResponse, CardError> {
        let frame = self.send(RequestFrame::new(command, state.address(), state.to_byte()))?;
        Ok(CardResponse::from_frame(frame))
    }

    fn send(&self, request: RequestFrame) -> Result<ResponseFrame, CardError> {
        let reply = self
            .transport
            .with_exclusive_access(|link| -> Result<[u8; FRAME_LEN], TransportError> {
                link.discard_output()?;
                link.write_frame(&request.encode())?;
                link.read_frame()
            })?;
        let frame = ResponseFrame::decode(reply)?;
        debug!(
            "{:?} to card {} with data {} answered {}",
            request.command, request.address, request.data, frame
        );
        Ok(frame)
    }
}

fn find_setup_echo<C: SerialChannel>(
    link: &mut ExclusiveLink<'_, C>,
) -> Result<Option<u8>, TransportError> {
    for _ in 0..MAX_SETUP_CHUNKS {
        let chunk = match link.read_chunk() {
            Ok(chunk) => chunk,
            // a chain that stops talking has no echo left to send
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::UnexpectedEof) => {
                debug!("Setup echo search ended: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if chunk[0] != RequestCommand::Setup.code() {
            trace!("Skipping chunk {:?}", chunk);
            continue;
        }
        // the last card reports its own address plus one, 0 stands for 255 cards
        let count = match chunk[1] {
            0 => u8::MAX,
            address => address - 1,
        };
        return Ok(Some(count));
    }
    Ok(None)
}
