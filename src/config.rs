use std::time::Duration;

/// Everything needed to reach a card chain, built once by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardConfig {
    pub port_name: String,
    /// Upper bound for a single frame read, `None` waits forever.
    pub read_deadline: Option<Duration>,
}

impl CardConfig {
    pub fn new<S: Into<String>>(port_name: S) -> CardConfig {
        CardConfig {
            port_name: port_name.into(),
            read_deadline: None,
        }
    }

    pub fn with_read_deadline(mut self, read_deadline: Duration) -> CardConfig {
        self.read_deadline = Some(read_deadline);
        self
    }
}
