//! Mock Device
//!
//! Emulates the recorder side of the protocol over TCP, for tests and for
//! driving the CLI without hardware.
//!
//! ## Behavior
//! - One connection is served at a time; others wait in the accept queue
//! - Query answers `I` + version; everything legal answers `Z`
//! - Commands before a Query, and recording commands in the wrong state,
//!   answer `F` + an error code
//! - Triggers must carry a duration of at least 1 ms and strictly
//!   increasing timestamps

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{EciError, Result};
use crate::protocol::{read_command, write_response, ByteOrderSpec, Command, Response};

/// Command received before the session was opened
pub const ERROR_NO_SESSION: i16 = 1;

/// EndRecording or trigger while not recording
pub const ERROR_NOT_RECORDING: i16 = 2;

/// Trigger with a non-positive duration or a non-increasing timestamp
pub const ERROR_INVALID_EVENT: i16 = 3;

/// BeginRecording while already recording
pub const ERROR_ALREADY_RECORDING: i16 = 4;

/// Protocol version reported when none is configured
pub const DEFAULT_VERSION: u8 = 1;

/// How often the accept loop checks for shutdown
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Device-side view of the session
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub session_open: bool,
    pub recording: bool,
    pub byte_order: Option<ByteOrderSpec>,
    pub last_trigger_ms: Option<i32>,

    /// Reject the next command with this code, whatever it is
    pub fail_next: Option<i16>,
}

/// State shared between the device thread and its handle
#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<DeviceState>>,
    active: Arc<Mutex<Option<TcpStream>>>,
    shutdown: Arc<AtomicBool>,
}

/// An emulated recording device
pub struct MockDevice {
    listener: TcpListener,
    local_addr: SocketAddr,
    version: u8,
    shared: Shared,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
}

impl MockDevice {
    /// Bind to `addr` (use port 0 for an ephemeral port)
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let (commands_tx, commands_rx) = unbounded();

        Ok(Self {
            listener,
            local_addr,
            version: DEFAULT_VERSION,
            shared: Shared {
                state: Arc::new(Mutex::new(DeviceState::default())),
                active: Arc::new(Mutex::new(None)),
                shutdown: Arc::new(AtomicBool::new(false)),
            },
            commands_tx,
            commands_rx,
        })
    }

    /// Protocol version reported in QuerySuccess responses
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Every decoded command, in arrival order
    pub fn commands(&self) -> Receiver<Command> {
        self.commands_rx.clone()
    }

    /// Serve connections until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        tracing::info!("Mock device listening on {}", self.local_addr);

        while !self.shared.shutdown.load(Ordering::Relaxed) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            tracing::debug!("Connection established from {}", peer);
            stream.set_nonblocking(false)?;

            if let Err(e) = self.serve(stream) {
                tracing::warn!("Error serving {}: {}", peer, e);
            }
            *self.shared.active.lock() = None;
            tracing::debug!("Client {} disconnected", peer);
        }

        Ok(())
    }

    /// Run on a background thread
    pub fn spawn(self) -> DeviceHandle {
        let local_addr = self.local_addr;
        let commands = self.commands();
        let shared = self.shared.clone();

        let thread = thread::spawn(move || {
            if let Err(e) = self.run() {
                tracing::error!("Mock device stopped: {}", e);
            }
        });

        DeviceHandle {
            local_addr,
            commands,
            shared,
            thread: Some(thread),
        }
    }

    /// Handle one connection until the client closes it
    fn serve(&self, stream: TcpStream) -> Result<()> {
        stream.set_nodelay(true)?;
        {
            let mut active = self.shared.active.lock();
            if self.shared.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            *active = Some(stream.try_clone()?);
        }

        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let command = match read_command(&mut reader) {
                Ok(cmd) => cmd,
                Err(EciError::Io(ref e))
                    if matches!(
                        e.kind(),
                        ErrorKind::UnexpectedEof
                            | ErrorKind::ConnectionReset
                            | ErrorKind::ConnectionAborted
                    ) =>
                {
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            tracing::trace!("Received command: {:?}", command);
            let response = self.execute(&command);
            // Observers may have gone away; the device keeps serving
            let _ = self.commands_tx.send(command);

            write_response(&mut writer, &response)?;
        }
    }

    /// Apply a command to the device state and build the reply
    fn execute(&self, command: &Command) -> Response {
        let mut state = self.shared.state.lock();

        if let Some(code) = state.fail_next.take() {
            return Response::Failure { code };
        }

        if !state.session_open && !matches!(command, Command::Query(_)) {
            return Response::Failure {
                code: ERROR_NO_SESSION,
            };
        }

        match command {
            Command::Query(spec) => {
                state.session_open = true;
                state.byte_order = Some(*spec);
                Response::QuerySuccess {
                    version: self.version,
                }
            }
            Command::Exit => {
                *state = DeviceState::default();
                Response::Success
            }
            Command::BeginRecording => {
                if state.recording {
                    return Response::Failure {
                        code: ERROR_ALREADY_RECORDING,
                    };
                }
                state.recording = true;
                Response::Success
            }
            Command::EndRecording => {
                if !state.recording {
                    return Response::Failure {
                        code: ERROR_NOT_RECORDING,
                    };
                }
                state.recording = false;
                Response::Success
            }
            Command::Attention | Command::TimeSynch { .. } => Response::Success,
            Command::Trigger {
                timestamp_ms,
                duration_ms,
                ..
            } => {
                if !state.recording {
                    return Response::Failure {
                        code: ERROR_NOT_RECORDING,
                    };
                }
                let stale = state
                    .last_trigger_ms
                    .is_some_and(|last| *timestamp_ms <= last);
                if *duration_ms < 1 || stale {
                    return Response::Failure {
                        code: ERROR_INVALID_EVENT,
                    };
                }
                state.last_trigger_ms = Some(*timestamp_ms);
                Response::Success
            }
        }
    }
}

/// Handle to a device running on a background thread
///
/// Dropping the handle shuts the device down.
pub struct DeviceHandle {
    local_addr: SocketAddr,
    commands: Receiver<Command>,
    shared: Shared,
    thread: Option<JoinHandle<()>>,
}

impl DeviceHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Every decoded command, in arrival order
    pub fn commands(&self) -> &Receiver<Command> {
        &self.commands
    }

    /// Snapshot of the device state
    pub fn state(&self) -> DeviceState {
        self.shared.state.lock().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.state.lock().recording
    }

    /// Reject the next command with `code`
    pub fn fail_next(&self, code: i16) {
        self.shared.state.lock().fail_next = Some(code);
    }

    /// Stop accepting, close the active connection, and wait for the thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(stream) = self.shared.active.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
