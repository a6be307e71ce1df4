use std::io;
use thiserror::Error;

use crate::frame::FRAME_LEN;

#[derive(Debug, Error)]
#[error("Serial transport failed while {action}: {source}")]
pub struct TransportError {
    action: String,
    #[source]
    source: io::Error,
}

impl TransportError {
    pub fn new<S: Into<String>>(action: S, source: io::Error) -> Self {
        Self {
            action: action.into(),
            source,
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown response code '{code}' in frame {frame:?}")]
pub struct DecodeError {
    pub code: u8,
    pub frame: [u8; FRAME_LEN],
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("A relay card has exactly 8 ports, got {0}")]
    InvalidPortCount(usize),

    #[error("Invalid card address '{0}', expected a number from 1 to 255")]
    InvalidAddress(String),

    #[error("Invalid port index {0}, expected 0 to 7")]
    InvalidPortIndex(usize),

    #[error("Malformed mask '{mask}': {message}")]
    MalformedMask { mask: String, message: String },

    #[error("Command '{0}' requires a mask")]
    MissingMask(String),
}

impl ConfigurationError {
    pub fn malformed_mask<S1: Into<String>, S2: Into<String>>(mask: S1, message: S2) -> Self {
        ConfigurationError::MalformedMask {
            mask: mask.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CardError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
