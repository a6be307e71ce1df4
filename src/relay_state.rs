use std::fmt;

use crate::error::ConfigurationError;

pub const PORT_COUNT: usize = 8;

/// Switch state of the 8 relays of one card together with the card address.
///
/// Port `i` is relay `K{i+1}` and carries bit weight `2^i` in the data byte.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct RelayState {
    address: u8,
    ports: [bool; PORT_COUNT],
}

impl RelayState {
    pub fn new(address: u8, ports: &[bool]) -> Result<RelayState, ConfigurationError> {
        let ports: [bool; PORT_COUNT] = match ports.try_into() {
            Ok(ports) => ports,
            Err(_) => return Err(ConfigurationError::InvalidPortCount(ports.len())),
        };
        Ok(RelayState { address, ports })
    }

    pub fn from_byte(address: u8, state: u8) -> RelayState {
        let mut ports = [false; PORT_COUNT];
        for (i, port) in ports.iter_mut().enumerate() {
            *port = state & (1 << i) != 0;
        }
        RelayState { address, ports }
    }

    /// A state with only the port at `index` set.
    pub fn single(address: u8, index: usize) -> Result<RelayState, ConfigurationError> {
        if index >= PORT_COUNT {
            return Err(ConfigurationError::InvalidPortIndex(index));
        }
        let mut ports = [false; PORT_COUNT];
        ports[index] = true;
        Ok(RelayState { address, ports })
    }

    pub fn to_byte(&self) -> u8 {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0u8, |byte, (i, _)| byte | (1 << i))
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn ports(&self) -> &[bool; PORT_COUNT] {
        &self.ports
    }

    pub fn port(&self, index: usize) -> Option<bool> {
        self.ports.get(index).copied()
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = self.to_byte();
        write!(f, "[ADR:{} byte:{} mask:{:08b}]", self.address, byte, byte)
    }
}
