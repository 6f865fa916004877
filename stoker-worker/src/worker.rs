use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stoker_http::{parse_request, HttpLimits, Method, Output, ParsingStatus, Request};
use tracing::{debug, warn};

use crate::config::{BootEnv, WorkerConfig};
use crate::dispatcher::dispatch;
use crate::error::WorkerError;
use crate::framing::{encode_payload_header, FrameReader};
use crate::registry::Registry;
use crate::shared::WorkerShared;
use crate::watchdog;

const ACK: u8 = 0x42;
const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    PeerClosed,
    Idle,
    DynamicIdle,
    LifetimeExpired,
    DaemonGone,
}

/// One worker process: a control socket to the daemon, a reusable
/// request/response pair, and the shared state the watchdog observes.
pub struct Worker {
    config: WorkerConfig,
    registry: Registry,
    boot: BootEnv,
    socket: UnixStream,
    shared: Arc<WorkerShared>,
    reader: FrameReader,
    request: Request,
    output: Output,
    limits: HttpLimits,
    started: Instant,
    last_request: Instant,
}

impl Worker {
    /// Boot from the daemon environment: connect the control socket, send
    /// the ack byte, drop privileges, detach stdin. Group and user that
    /// cannot be resolved are fatal.
    pub fn boot(config: WorkerConfig, mut registry: Registry) -> Result<Self, WorkerError> {
        let boot = BootEnv::from_env()?;
        registry.seal()?;

        let mut socket = connect_control_socket(&boot.socket)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        socket.write_all(&[ACK])?;

        drop_privileges(config.group.as_deref(), config.user.as_deref())?;
        if unsafe { libc::geteuid() } == 0 {
            warn!("worker is running as root");
        }
        detach_stdin()?;

        Ok(Self::assemble(config, registry, boot, socket))
    }

    fn assemble(
        config: WorkerConfig,
        registry: Registry,
        boot: BootEnv,
        socket: UnixStream,
    ) -> Self {
        let shared = Arc::new(WorkerShared::new(config.max_request_time));
        let mut output = Output::new();
        output.set_timeout_sink(shared.timeout_sink());
        let limits = config.http_limits();
        let now = Instant::now();

        Self {
            config,
            registry,
            boot,
            socket,
            shared,
            reader: FrameReader::new(),
            request: Request::new(),
            output,
            limits,
            started: now,
            last_request: now,
        }
    }

    /// Run startup hooks, spawn the watchdog, and serve until a
    /// self-termination rule fires. Shutdown hooks run on every graceful
    /// exit; a transport failure surfaces as the error itself.
    pub fn run(mut self) -> Result<ExitReason, WorkerError> {
        self.registry.run_startup();
        watchdog::spawn(Arc::clone(&self.shared), self.socket.try_clone()?)?;

        let reason = loop {
            match self.step() {
                Ok(None) => continue,
                Ok(Some(reason)) => break reason,
                Err(err) => {
                    self.registry.run_shutdown();
                    return Err(err);
                }
            }
        };

        debug!(?reason, "worker exiting");
        self.registry.run_shutdown();
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        Ok(reason)
    }

    fn step(&mut self) -> Result<Option<ExitReason>, WorkerError> {
        let mut chunk = [0u8; 16 * 1024];
        match self.socket.read(&mut chunk) {
            Ok(0) => Ok(Some(ExitReason::PeerClosed)),
            Ok(read) => {
                if let Some(frame) = self.reader.push(&chunk[..read]) {
                    self.serve(frame)?;
                }
                Ok(None)
            }
            Err(err) if is_timeout(&err) => Ok(self.check_termination()),
            Err(err) => Err(WorkerError::Io(err)),
        }
    }

    fn serve(&mut self, frame: Vec<u8>) -> Result<(), WorkerError> {
        self.request.clear();
        self.output.clear();
        self.shared.reset_send_guard();
        self.shared.set_max_request(self.config.max_request_time);
        self.shared.next_request_id();

        let keep_alive =
            parse_request(&frame, &mut self.request, &self.limits) && self.config.keep_alive;
        self.output.version = self.request.version;
        self.output.keep_alive = keep_alive;
        if matches!(
            self.request.method,
            Method::Head | Method::Connect | Method::Trace
        ) {
            self.output.send_body = false;
        }

        match self.request.parsing_status {
            ParsingStatus::Ok => {
                self.shared.mark_busy();
                dispatch(&self.registry, &mut self.request, &mut self.output);
                self.shared.mark_idle();

                if !self.output.is_dirty() {
                    self.output.set_status(404);
                    self.output.send_body = false;
                }
            }
            ParsingStatus::InvalidRequest => {
                self.output.set_status(400);
                self.output.send_body = false;
            }
            ParsingStatus::MaxUploadSizeExceeded => {
                self.output.set_status(413);
                self.output.send_body = false;
            }
            ParsingStatus::InvalidBody => {
                self.output.set_status(422);
                self.output.send_body = false;
            }
        }

        self.output.build_headers();
        if self.shared.try_claim_send() {
            self.send_response()?;
        }
        self.last_request = Instant::now();
        Ok(())
    }

    fn send_response(&mut self) -> Result<(), WorkerError> {
        let total = self.output.headers_bytes().len() + self.output.body_bytes().len();
        let header = encode_payload_header(self.output.keep_alive, total as u64);
        self.socket.write_all(&header)?;
        self.socket.write_all(self.output.headers_bytes())?;
        self.socket.write_all(self.output.body_bytes())?;
        Ok(())
    }

    fn check_termination(&self) -> Option<ExitReason> {
        let idle = self.last_request.elapsed();
        if idle > self.config.max_worker_idling {
            return Some(ExitReason::Idle);
        }
        if self.boot.dynamic && idle > self.config.max_dynamic_worker_idling {
            return Some(ExitReason::DynamicIdle);
        }
        if self.started.elapsed() > self.config.max_worker_lifetime {
            return Some(ExitReason::LifetimeExpired);
        }
        if !daemon_alive(self.boot.daemon_pid) {
            return Some(ExitReason::DaemonGone);
        }
        None
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn daemon_alive(pid: i32) -> bool {
    let outcome = unsafe { libc::kill(pid, 0) };
    outcome == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Linux control sockets live in the abstract namespace; elsewhere the
/// daemon hands down a filesystem path.
fn connect_control_socket(name: &str) -> Result<UnixStream, WorkerError> {
    #[cfg(target_os = "linux")]
    {
        use std::os::linux::net::SocketAddrExt;
        let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())?;
        Ok(UnixStream::connect_addr(&addr)?)
    }
    #[cfg(not(target_os = "linux"))]
    {
        Ok(UnixStream::connect(name)?)
    }
}

fn drop_privileges(group: Option<&str>, user: Option<&str>) -> Result<(), WorkerError> {
    use std::ffi::CString;

    if let Some(group) = group {
        let raw = CString::new(group).map_err(|_| WorkerError::UnknownGroup(group.to_string()))?;
        let entry = unsafe { libc::getgrnam(raw.as_ptr()) };
        if entry.is_null() {
            return Err(WorkerError::UnknownGroup(group.to_string()));
        }
        if unsafe { libc::setgid((*entry).gr_gid) } != 0 {
            return Err(WorkerError::Privilege(
                std::io::Error::last_os_error().to_string(),
            ));
        }
    }

    if let Some(user) = user {
        let raw = CString::new(user).map_err(|_| WorkerError::UnknownUser(user.to_string()))?;
        let entry = unsafe { libc::getpwnam(raw.as_ptr()) };
        if entry.is_null() {
            return Err(WorkerError::UnknownUser(user.to_string()));
        }
        if unsafe { libc::setuid((*entry).pw_uid) } != 0 {
            return Err(WorkerError::Privilege(
                std::io::Error::last_os_error().to_string(),
            ));
        }
    }

    Ok(())
}

/// Inherited descriptors must not leak into user handlers through stdin.
fn detach_stdin() -> Result<(), WorkerError> {
    use std::os::fd::AsRawFd;

    let null = std::fs::File::open("/dev/null")?;
    if unsafe { libc::dup2(null.as_raw_fd(), libc::STDIN_FILENO) } < 0 {
        return Err(WorkerError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
