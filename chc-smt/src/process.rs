#![forbid(unsafe_code)]

//! Forwarding of textual query scripts to an external solver binary.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::SolverError;

/// How long a solver may run past its own timeout before it is killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// External solver invoked once per query, reading the script from stdin.
#[derive(Clone, Debug)]
pub struct SolverProcess {
    program: PathBuf,
    args: Vec<String>,
    timeout_ms: u64,
}

impl SolverProcess {
    /// `args` replaces the default stdin argument; pass an empty list to keep it.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let program = program.into();
        let args = if args.is_empty() && is_z3(&program) {
            vec!["-in".to_string()]
        } else {
            args
        };
        Self {
            program,
            args,
            timeout_ms: 0,
        }
    }

    /// Locate `z3` on PATH.
    pub fn z3() -> Result<Self, SolverError> {
        find_executable("z3")
            .map(|p| Self::new(p, Vec::new()))
            .ok_or_else(|| SolverError::NotFound("z3".to_string()))
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if self.timeout_ms > 0 && is_z3(&self.program) {
            args.push(format!("-t:{}", self.timeout_ms));
        }
        args
    }

    /// Run the solver on `script` and return its stdout.
    pub fn run(&self, script: &str) -> Result<String, SolverError> {
        let program = self.program.display().to_string();
        let process_err = |message: String| SolverError::Process {
            program: program.clone(),
            message,
        };

        let mut child = Command::new(&self.program)
            .args(self.build_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| process_err(format!("spawn: {e}")))?;

        // Closing stdin lets solvers that read to end-of-file start.
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(script.as_bytes()) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(process_err(format!("write: {e}")));
                }
            }
        }
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = (self.timeout_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(self.timeout_ms) + KILL_GRACE);
        let timed_out = wait_until(&mut child, deadline).map_err(|e| process_err(format!("wait: {e}")))?;
        let stdout = collect(stdout);
        let stderr = collect(stderr);
        if timed_out {
            warn!(program = %program, timeout_ms = self.timeout_ms, "solver killed after its deadline");
            return Ok("timeout".to_string());
        }

        if stdout.trim().is_empty() {
            if stderr.contains("timeout") {
                return Ok("timeout".to_string());
            }
            return Err(process_err(format!("no answer ({})", stderr.trim())));
        }
        Ok(stdout)
    }
}

/// Poll the child until it exits or `deadline` passes; in the latter case
/// kill it and report `true`.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<bool> {
    loop {
        if child.try_wait()?.is_some() {
            return Ok(false);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            child.wait()?;
            return Ok(true);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn is_z3(program: &Path) -> bool {
    program
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s == "z3")
}

/// Search PATH for an executable file named `name`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
