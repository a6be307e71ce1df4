//! An in-memory serial channel for driving a card without hardware.
//!
//! Clones share one state, so a test keeps a handle to inspect what the
//! transport did after handing the other clone to a `RelayCard`.

use std::collections::VecDeque;
use std::io;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::frame::checksum;
use crate::frame::FRAME_LEN;
use crate::serial::SerialChannel;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    Open,
    Close,
    Write(Vec<u8>),
    Read(Vec<u8>),
    DiscardInput,
    DiscardOutput,
}

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Default)]
struct SimState {
    open: bool,
    fail_open: bool,
    input: VecDeque<u8>,
    events: Vec<SimEvent>,
    responder: Option<Responder>,
}

#[derive(Clone, Default)]
pub struct SimulatedChannel {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedChannel {
    pub fn new() -> SimulatedChannel {
        SimulatedChannel::default()
    }

    /// A channel that answers every 4 byte request like a single card
    /// holding `state` would.
    pub fn card(address: u8, state: u8) -> SimulatedChannel {
        let sim = SimulatedChannel::new();
        let mut relays = state;
        sim.respond_with(move |request| {
            if request.len() != FRAME_LEN || request[1] != address {
                return Vec::new();
            }
            let data = match request[0] {
                2 => relays,
                3 => {
                    relays = request[2];
                    request[2]
                }
                6 => {
                    relays |= request[2];
                    relays
                }
                7 => {
                    relays &= !request[2];
                    relays
                }
                8 => {
                    relays ^= request[2];
                    relays
                }
                _ => 0,
            };
            let command = 255 - request[0];
            vec![command, address, data, checksum(command, address, data)]
        });
        sim
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called with every write, whatever it returns becomes readable input.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    pub fn push_input(&self, bytes: &[u8]) {
        self.lock().input.extend(bytes);
    }

    pub fn pending_input(&self) -> usize {
        self.lock().input.len()
    }

    pub fn fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events.clone()
    }

    /// All bytes written so far, in order.
    pub fn written(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SimEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

fn not_open() -> io::Error {
    io::Error::new(ErrorKind::NotConnected, "simulated channel is not open")
}

impl SerialChannel for SimulatedChannel {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(io::Error::new(ErrorKind::NotFound, "no such port"));
        }
        state.open = true;
        state.events.push(SimEvent::Open);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn close(&mut self) {
        let mut state = self.lock();
        if state.open {
            state.open = false;
            state.events.push(SimEvent::Close);
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(not_open());
        }
        state.events.push(SimEvent::Write(bytes.to_vec()));
        let reply = match state.responder.as_mut() {
            Some(responder) => responder(bytes),
            None => Vec::new(),
        };
        state.input.extend(reply);
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(not_open());
        }
        // nothing more will ever arrive, report it like an expired read deadline
        if state.input.len() < buf.len() {
            return Err(io::Error::new(
                ErrorKind::TimedOut,
                format!(
                    "simulated input holds {} of {} bytes",
                    state.input.len(),
                    buf.len()
                ),
            ));
        }
        for byte in buf.iter_mut() {
            *byte = state.input.pop_front().unwrap_or_default();
        }
        state.events.push(SimEvent::Read(buf.to_vec()));
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        let state = self.lock();
        if !state.open {
            return Err(not_open());
        }
        Ok(state.input.len() as u32)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(not_open());
        }
        state.input.clear();
        state.events.push(SimEvent::DiscardInput);
        Ok(())
    }

    fn discard_output(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(not_open());
        }
        state.events.push(SimEvent::DiscardOutput);
        Ok(())
    }
}
