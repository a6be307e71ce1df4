use log::debug;
use log::trace;
use serialport::ClearBuffer;
use serialport::DataBits;
use serialport::FlowControl;
use serialport::Parity;
use serialport::SerialPort;
use serialport::StopBits;
use std::io;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::config::CardConfig;
use crate::error::TransportError;
use crate::frame::FRAME_LEN;

pub const BAUD_RATE: u32 = 19200;

/// Time the card needs before its reply can be read.
pub const RESPONSE_SETTLE_DELAY: Duration = Duration::from_millis(20);

// Poll interval of the underlying port, reads keep waiting across it
// unless a read deadline is configured.
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// A byte channel to the card that can be opened and closed repeatedly.
pub trait SerialChannel: Send {
    fn open(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;

    fn close(&mut self);

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Blocks until `buf` is filled, or fails with `TimedOut` once a
    /// configured read deadline has passed.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    fn bytes_to_read(&mut self) -> io::Result<u32>;

    fn discard_input(&mut self) -> io::Result<()>;

    fn discard_output(&mut self) -> io::Result<()>;
}

/// A physical serial port, 19200 baud 8N1.
pub struct SerialPortChannel {
    port_name: String,
    read_deadline: Option<Duration>,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortChannel {
    pub fn new(config: &CardConfig) -> SerialPortChannel {
        SerialPortChannel {
            port_name: config.port_name.clone(),
            read_deadline: config.read_deadline,
            port: None,
        }
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        match self.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(io::Error::new(
                ErrorKind::NotConnected,
                "serial port is not open",
            )),
        }
    }
}

impl SerialChannel for SerialPortChannel {
    fn open(&mut self) -> io::Result<()> {
        debug!("Opening serial port '{}'", self.port_name);
        let port = serialport::new(&self.port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PORT_POLL_TIMEOUT)
            .open()?;
        self.port = Some(port);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port '{}'", self.port_name);
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let deadline = self.read_deadline.map(|d| Instant::now() + d);
        let port = self.port()?;
        let mut filled = 0;
        while filled < buf.len() {
            match port.read(&mut buf[filled..]) {
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
            if let Some(deadline) = deadline {
                if filled < buf.len() && Instant::now() >= deadline {
                    return Err(io::Error::new(
                        ErrorKind::TimedOut,
                        format!("received {} of {} bytes before deadline", filled, buf.len()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.port()?.bytes_to_read()?)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        Ok(self.port()?.clear(ClearBuffer::Input)?)
    }

    fn discard_output(&mut self) -> io::Result<()> {
        Ok(self.port()?.clear(ClearBuffer::Output)?)
    }
}

/// Serializes all access to one serial channel.
pub struct SerialTransport<C: SerialChannel> {
    channel: Mutex<C>,
}

impl<C: SerialChannel> SerialTransport<C> {
    pub fn new(channel: C) -> SerialTransport<C> {
        SerialTransport {
            channel: Mutex::new(channel),
        }
    }

    /// Waits for exclusive ownership of the channel and opens it.
    ///
    /// The channel is closed again when the returned link is dropped.
    pub fn exclusive(&self) -> Result<ExclusiveLink<'_, C>, TransportError> {
        // A panic inside a previous section already closed the channel on unwind.
        let mut channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        if !channel.is_open() {
            if let Err(e) = channel.open() {
                return Err(TransportError::new("opening the channel", e));
            }
        }
        Ok(ExclusiveLink { channel })
    }

    pub fn with_exclusive_access<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut ExclusiveLink<'_, C>) -> Result<T, E>,
        E: From<TransportError>,
    {
        let mut link = self.exclusive()?;
        f(&mut link)
    }
}

pub struct ExclusiveLink<'a, C: SerialChannel> {
    channel: MutexGuard<'a, C>,
}

impl<'a, C: SerialChannel> ExclusiveLink<'a, C> {
    pub fn write_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), TransportError> {
        trace!("Writing frame {:?}", frame);
        self.channel
            .write_all(frame)
            .map_err(|e| TransportError::new("writing a frame", e))
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.channel
            .write_all(&[byte])
            .map_err(|e| TransportError::new("writing a byte", e))
    }

    /// Reads one reply frame after the settle delay and drops anything
    /// buffered behind it.
    pub fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], TransportError> {
        thread::sleep(RESPONSE_SETTLE_DELAY);
        let frame = self.read_chunk()?;
        self.discard_input()?;
        trace!("Read frame {:?}", frame);
        Ok(frame)
    }

    /// Reads the next 4 bytes as they arrive.
    pub fn read_chunk(&mut self) -> Result<[u8; FRAME_LEN], TransportError> {
        let mut buf = [0u8; FRAME_LEN];
        match self.channel.read_exact(&mut buf) {
            Ok(()) => Ok(buf),
            Err(e) => Err(TransportError::new("reading a frame", e)),
        }
    }

    pub fn bytes_to_read(&mut self) -> Result<u32, TransportError> {
        self.channel
            .bytes_to_read()
            .map_err(|e| TransportError::new("querying buffered input", e))
    }

    pub fn discard_input(&mut self) -> Result<(), TransportError> {
        self.channel
            .discard_input()
            .map_err(|e| TransportError::new("discarding input", e))
    }

    pub fn discard_output(&mut self) -> Result<(), TransportError> {
        self.channel
            .discard_output()
            .map_err(|e| TransportError::new("discarding output", e))
    }
}

impl<'a, C: SerialChannel> Drop for ExclusiveLink<'a, C> {
    fn drop(&mut self) {
        self.channel.close();
    }
}
