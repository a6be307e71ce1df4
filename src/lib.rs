//! Control of daisy-chained 8 relay cards over a serial line.

pub mod card;
pub mod config;
pub mod error;
pub mod frame;
pub mod hardware_test;
pub mod mask;
pub mod relay_state;
pub mod serial;
pub mod sim;

pub use card::CardResponse;
pub use card::RelayCard;
pub use config::CardConfig;
pub use error::CardError;
pub use error::ConfigurationError;
pub use error::DecodeError;
pub use error::TransportError;
pub use frame::RequestCommand;
pub use frame::ResponseCommand;
pub use frame::ResponseFrame;
pub use relay_state::RelayState;
