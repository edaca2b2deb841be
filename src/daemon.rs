//! Background service management
//!
//! `connect` persists the connection args and starts a detached copy of this
//! executable running `service run`; the pid is recorded in
//! `<state_dir>/cast-bridge.pid`. `disconnect` stops that process and deletes
//! both the pid file and the args. `reconnect` is disconnect + connect with
//! the persisted args.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{get_log_dir, get_state_dir, ArgsStore, ConnectionArgs};
use crate::error::BridgeError;
use crate::logging::log_file_path;

pub const PID_FILE_NAME: &str = "cast-bridge.pid";

#[cfg(unix)]
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(unix)]
const STOP_POLL: Duration = Duration::from_millis(100);

pub struct Daemon {
    state_dir: PathBuf,
    log_dir: PathBuf,
    args: ArgsStore,
    program: PathBuf,
    program_args: Vec<String>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new(get_state_dir(), get_log_dir())
    }
}

impl Daemon {
    pub fn new(state_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let program =
            std::env::current_exe().unwrap_or_else(|_| PathBuf::from(env!("CARGO_PKG_NAME")));
        Self {
            args: ArgsStore::new(&state_dir),
            state_dir,
            log_dir: log_dir.into(),
            program,
            program_args: vec!["service".into(), "run".into()],
        }
    }

    /// Replace the command used to start the background process
    pub fn with_command(mut self, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.program_args = args;
        self
    }

    pub fn args(&self) -> &ArgsStore {
        &self.args
    }

    pub fn pid_file(&self) -> PathBuf {
        self.state_dir.join(PID_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        log_file_path(&self.log_dir)
    }

    pub fn read_pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn write_pid(&self, pid: u32) -> std::io::Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        fs::write(self.pid_file(), pid.to_string())
    }

    fn remove_pid(&self) -> std::io::Result<()> {
        match fs::remove_file(self.pid_file()) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Pid of the live background process, if any
    pub fn running_pid(&self) -> Option<u32> {
        self.read_pid().filter(|pid| is_alive(*pid))
    }

    /// Persist `args` and start the background process
    pub fn connect(&self, args: &ConnectionArgs) -> Result<u32, BridgeError> {
        if let Some(pid) = self.running_pid() {
            return Err(BridgeError::AlreadyRunning(pid));
        }

        self.args.save(args)?;

        let pid = match self.spawn() {
            Ok(pid) => pid,
            Err(e) => {
                self.roll_back(args);
                return Err(BridgeError::DaemonLaunch(e.to_string()));
            }
        };

        if let Err(e) = self.write_pid(pid) {
            // An untracked service couldn't be stopped later
            terminate(pid);
            self.roll_back(args);
            return Err(e.into());
        }
        info!("Started background service (pid {})", pid);
        Ok(pid)
    }

    /// Don't leave args around for a later reconnect
    fn roll_back(&self, args: &ConnectionArgs) {
        if let Err(e) = self.args.delete(&args.identifier()) {
            warn!("Couldn't roll back connection args: {}", e);
        }
    }

    /// Stop the background process and forget its args
    pub fn disconnect(&self) -> Result<(), BridgeError> {
        let Some(pid) = self.read_pid() else {
            return Err(BridgeError::NotRunning);
        };

        let was_running = is_alive(pid);
        if was_running {
            terminate(pid);
        } else {
            debug!("Removing stale pid file for {}", pid);
        }

        self.remove_pid()?;
        self.args.delete_all()?;

        if was_running {
            info!("Stopped background service (pid {})", pid);
            Ok(())
        } else {
            Err(BridgeError::NotRunning)
        }
    }

    /// Restart the background process with the persisted args
    pub fn reconnect(&self) -> Result<u32, BridgeError> {
        let (Some(args), Some(pid)) = (self.args.load(None)?, self.read_pid()) else {
            return Err(BridgeError::NotRunning);
        };

        if is_alive(pid) {
            terminate(pid);
        }
        self.remove_pid()?;
        self.connect(&args)
    }

    /// Called by the background process on exit: drop the pid file if it
    /// still names this process
    pub fn release(&self) {
        if self.read_pid() == Some(std::process::id()) {
            if let Err(e) = self.remove_pid() {
                warn!("Couldn't remove pid file: {}", e);
            }
        }
    }

    /// Write `<Log file: path>` followed by the log contents
    pub fn print_log(&self, out: &mut impl Write) -> Result<(), BridgeError> {
        let path = self.log_file();
        writeln!(out, "<Log file: {}>", path.display())?;

        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for line in BufReader::new(file).lines() {
            writeln!(out, "{}", line?)?;
        }
        Ok(())
    }

    fn spawn(&self) -> std::io::Result<u32> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.program_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        debug!("Spawning {} {:?}", self.program.display(), self.program_args);
        let child = command.spawn()?;
        Ok(child.id())
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    let pid = pid as libc::pid_t;
    // Reap it first in case it is our own exited child
    unsafe {
        libc::waitpid(pid, std::ptr::null_mut(), libc::WNOHANG);
        libc::kill(pid, 0) == 0
    }
}

// TODO(windows): check the process table instead of trusting the pid file
#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    true
}

/// SIGTERM, then SIGKILL if the process outlives [`STOP_TIMEOUT`]
#[cfg(unix)]
fn terminate(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }

    let deadline = std::time::Instant::now() + STOP_TIMEOUT;
    while std::time::Instant::now() < deadline {
        if !is_alive(pid) {
            return;
        }
        std::thread::sleep(STOP_POLL);
    }

    warn!("Service (pid {}) ignored SIGTERM, killing", pid);
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn terminate(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status();
}
