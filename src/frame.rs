//! The 4 byte frame exchanged with the card in both directions.
//!
//! ```text
//! +---------+---------+------+----------+
//! | command | address | data | checksum |
//! +---------+---------+------+----------+
//! ```
//!
//! Requests carry `command ^ address ^ data` as checksum. Response codes
//! mirror their request as `255 - command`.

use std::fmt;

use crate::error::DecodeError;

pub const FRAME_LEN: usize = 4;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum RequestCommand {
    NoOperation = 0,
    Setup = 1,
    GetPort = 2,
    SetPort = 3,
    GetOption = 4,
    SetOption = 5,
    SetSingle = 6,
    DelSingle = 7,
    Toggle = 8,
}

impl RequestCommand {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn response(self) -> ResponseCommand {
        match self {
            RequestCommand::NoOperation => ResponseCommand::NoOperation,
            RequestCommand::Setup => ResponseCommand::Setup,
            RequestCommand::GetPort => ResponseCommand::GetPort,
            RequestCommand::SetPort => ResponseCommand::SetPort,
            RequestCommand::GetOption => ResponseCommand::GetOption,
            RequestCommand::SetOption => ResponseCommand::SetOption,
            RequestCommand::SetSingle => ResponseCommand::SetSingle,
            RequestCommand::DelSingle => ResponseCommand::DelSingle,
            RequestCommand::Toggle => ResponseCommand::Toggle,
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ResponseCommand {
    NoOperation = 255,
    Setup = 254,
    GetPort = 253,
    SetPort = 252,
    GetOption = 251,
    SetOption = 250,
    SetSingle = 249,
    DelSingle = 248,
    Toggle = 247,
}

impl ResponseCommand {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<ResponseCommand> {
        let command = match code {
            255 => ResponseCommand::NoOperation,
            254 => ResponseCommand::Setup,
            253 => ResponseCommand::GetPort,
            252 => ResponseCommand::SetPort,
            251 => ResponseCommand::GetOption,
            250 => ResponseCommand::SetOption,
            249 => ResponseCommand::SetSingle,
            248 => ResponseCommand::DelSingle,
            247 => ResponseCommand::Toggle,
            _ => return None,
        };
        Some(command)
    }

    pub fn request(self) -> RequestCommand {
        match self {
            ResponseCommand::NoOperation => RequestCommand::NoOperation,
            ResponseCommand::Setup => RequestCommand::Setup,
            ResponseCommand::GetPort => RequestCommand::GetPort,
            ResponseCommand::SetPort => RequestCommand::SetPort,
            ResponseCommand::GetOption => RequestCommand::GetOption,
            ResponseCommand::SetOption => RequestCommand::SetOption,
            ResponseCommand::SetSingle => RequestCommand::SetSingle,
            ResponseCommand::DelSingle => RequestCommand::DelSingle,
            ResponseCommand::Toggle => RequestCommand::Toggle,
        }
    }
}

pub fn checksum(command: u8, address: u8, data: u8) -> u8 {
    command ^ address ^ data
}

pub fn encode_request(command: RequestCommand, address: u8, data: u8) -> [u8; FRAME_LEN] {
    let command = command.code();
    [command, address, data, checksum(command, address, data)]
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestFrame {
    pub command: RequestCommand,
    pub address: u8,
    pub data: u8,
}

impl RequestFrame {
    pub fn new(command: RequestCommand, address: u8, data: u8) -> Self {
        Self {
            command,
            address,
            data,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        encode_request(self.command, self.address, self.data)
    }
}

/// A frame as answered by the card.
///
/// The checksum byte is kept as received and never enforced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResponseFrame {
    pub command: ResponseCommand,
    pub address: u8,
    pub data: u8,
    pub checksum: u8,
}

impl ResponseFrame {
    pub fn decode(bytes: [u8; FRAME_LEN]) -> Result<ResponseFrame, DecodeError> {
        let command = match ResponseCommand::from_code(bytes[0]) {
            Some(command) => command,
            None => {
                return Err(DecodeError {
                    code: bytes[0],
                    frame: bytes,
                })
            }
        };
        Ok(ResponseFrame {
            command,
            address: bytes[1],
            data: bytes[2],
            checksum: bytes[3],
        })
    }

    pub fn checksum_matches(&self) -> bool {
        self.checksum == checksum(self.command.code(), self.address, self.data)
    }
}

impl fmt::Display for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[CMD:{:?} ADR:{} DAT:{} CRC:{}]",
            self.command, self.address, self.data, self.checksum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REQUESTS: [RequestCommand; 9] = [
        RequestCommand::NoOperation,
        RequestCommand::Setup,
        RequestCommand::GetPort,
        RequestCommand::SetPort,
        RequestCommand::GetOption,
        RequestCommand::SetOption,
        RequestCommand::SetSingle,
        RequestCommand::DelSingle,
        RequestCommand::Toggle,
    ];

    #[test]
    fn test_encode_request() {
        assert_eq!(encode_request(RequestCommand::SetPort, 1, 49), [3, 1, 49, 51]);
        assert_eq!(
            RequestFrame::new(RequestCommand::GetPort, 1, 0).encode(),
            [2, 1, 0, 3]
        );
    }

    #[test]
    fn test_response_code_mirrors_request() {
        for request in ALL_REQUESTS {
            let response = request.response();
            assert_eq!(response.code(), 255 - request.code());
            assert_eq!(response.request(), request);
            assert_eq!(ResponseCommand::from_code(response.code()), Some(response));
        }
        assert_eq!(RequestCommand::SetPort.response().code(), 252);
    }

    #[test]
    fn test_decode_response() {
        let frame = ResponseFrame::decode([253, 1, 65, 189]).unwrap();
        assert_eq!(frame.command, ResponseCommand::GetPort);
        assert_eq!(frame.address, 1);
        assert_eq!(frame.data, 65);
        assert_eq!(frame.checksum, 189);
        assert_eq!(frame.to_string(), "[CMD:GetPort ADR:1 DAT:65 CRC:189]");
    }

    #[test]
    fn test_decode_rejects_unknown_codes() {
        for code in 0..247u8 {
            let bytes = [code, 1, 0, 0];
            assert_eq!(
                ResponseFrame::decode(bytes),
                Err(DecodeError { code, frame: bytes })
            );
        }
    }

    #[test]
    fn test_checksum_is_not_enforced() {
        let frame = ResponseFrame::decode([252, 1, 49, 0]).unwrap();
        assert!(!frame.checksum_matches());

        let frame = ResponseFrame::decode([252, 1, 49, 252 ^ 1 ^ 49]).unwrap();
        assert!(frame.checksum_matches());
    }
}
