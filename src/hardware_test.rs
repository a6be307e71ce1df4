use log::debug;
use log::info;
use std::thread;
use std::time::Duration;

use crate::card::RelayCard;
use crate::error::CardError;
use crate::relay_state::RelayState;
use crate::serial::SerialChannel;
use crate::serial::RESPONSE_SETTLE_DELAY;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HardwareTestStep {
    pub state: u8,
    pub hold: Duration,
}

impl HardwareTestStep {
    fn new(state: u8, hold_ms: u64) -> HardwareTestStep {
        HardwareTestStep {
            state,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

/// All on, all off, a single relay walking K1 to K8 and back, all on, all off.
pub fn hardware_test_steps() -> Vec<HardwareTestStep> {
    let mut steps = vec![HardwareTestStep::new(255, 1000), HardwareTestStep::new(0, 500)];
    for bit in 0..8 {
        steps.push(HardwareTestStep::new(1 << bit, 250));
    }
    for bit in (0..7).rev() {
        steps.push(HardwareTestStep::new(1 << bit, 250));
    }
    steps.push(HardwareTestStep::new(255, 1000));
    steps.push(HardwareTestStep::new(0, 20));
    steps
}

pub fn run_hardware_test<C: SerialChannel>(
    card: &RelayCard<C>,
    address: u8,
) -> Result<(), CardError> {
    for step in hardware_test_steps() {
        debug!("Hardware test, new state: {}", step.state);
        let frame = card.set_port(&RelayState::from_byte(address, step.state))?;
        info!("Result frame: {}", frame);
        // reading the reply already took the settle delay
        thread::sleep(step.hold.saturating_sub(RESPONSE_SETTLE_DELAY));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_request;
    use crate::frame::RequestCommand;
    use crate::sim::SimulatedChannel;

    #[test]
    fn test_steps_walk_every_relay() {
        let states: Vec<u8> = hardware_test_steps().iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![255, 0, 1, 2, 4, 8, 16, 32, 64, 128, 64, 32, 16, 8, 4, 2, 1, 255, 0]
        );
    }

    #[test]
    fn test_last_step_only_waits_for_settle() {
        let steps = hardware_test_steps();
        let last = steps.last().unwrap();
        assert_eq!(last.hold, RESPONSE_SETTLE_DELAY);
    }

    #[test]
    fn test_run_sends_every_step_as_set_port() {
        let sim = SimulatedChannel::card(2, 0);
        let card = RelayCard::new(sim.clone());

        run_hardware_test(&card, 2).unwrap();

        let expected: Vec<u8> = hardware_test_steps()
            .iter()
            .flat_map(|step| encode_request(RequestCommand::SetPort, 2, step.state))
            .collect();
        assert_eq!(expected.len(), 19 * 4);
        assert_eq!(sim.written(), expected);
        assert_eq!(card.get_port(2).unwrap().state.to_byte(), 0);
    }
}
