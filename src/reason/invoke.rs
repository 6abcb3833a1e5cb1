//! Rule-engine invocation: run SWI-Prolog over the rule and fact files.
//!
//! The engine is launched non-interactively with init files disabled, loads
//! the rule file and then the fact file, runs one zero-argument goal and halts:
//!
//! ```text
//! swipl -q -f none -s <rules> -s <facts> -g main -t halt
//! ```
//!
//! Every failure mode (missing executable, timeout, non-zero exit, empty
//! output) is a distinct error carrying an [`InvocationBundle`] with the
//! command line, both captured streams and the head of both input files, so
//! an opaque engine failure can be diagnosed without re-running it.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use miette::Diagnostic;
use thiserror::Error;

use crate::config::PlannerConfig;
use crate::error::ConfigResult;

/// Environment variable consulted when the config names no executable.
pub const ENGINE_ENV_VAR: &str = "SWIPL";

/// Executable looked up on `PATH` as the last resort.
pub const DEFAULT_ENGINE: &str = "swipl";

/// Lines of each input file included in a failure bundle.
pub const DEBUG_HEAD_LINES: usize = 80;

/// Poll interval while waiting for the engine to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the output pipes to close after the process exits.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Captured context for a failed invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationBundle {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub facts_head: String,
    pub rules_head: String,
}

impl fmt::Display for InvocationBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CMD: {}", self.command)?;
        writeln!(f)?;
        writeln!(f, "STDOUT:\n{}", self.stdout)?;
        writeln!(f)?;
        writeln!(f, "STDERR:\n{}", self.stderr)?;
        writeln!(f)?;
        writeln!(f, "{}", self.facts_head)?;
        writeln!(f)?;
        write!(f, "{}", self.rules_head)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum InvokeError {
    #[error("missing rule file: {path}")]
    #[diagnostic(
        code(planner::invoke::missing_rules),
        help("Point `rules_path` in planner.toml at the planner rule file.")
    )]
    MissingRules { path: String },

    #[error("missing fact file: {path}")]
    #[diagnostic(
        code(planner::invoke::missing_facts),
        help("Run Perceive first (`studyplan perceive`) to generate the fact file.")
    )]
    MissingFacts { path: String },

    #[error("rule engine not found: \"{program}\" (from {origin})\n\n{bundle}")]
    #[diagnostic(
        code(planner::invoke::not_found),
        help(
            "Fix options: (1) add the SWI-Prolog bin directory to PATH so `swipl` works, \
             (2) set `engine_path = \"/path/to/swipl\"` in planner.toml, \
             or (3) set the SWIPL environment variable to the full path."
        )
    )]
    NotFound {
        program: String,
        origin: EngineOrigin,
        bundle: Box<InvocationBundle>,
    },

    #[error("failed to launch rule engine \"{program}\"")]
    #[diagnostic(
        code(planner::invoke::spawn),
        help("The executable exists but could not be started. Check its permissions.")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule engine timed out (hung > {timeout_secs:.1}s)\n\n{bundle}")]
    #[diagnostic(
        code(planner::invoke::timeout),
        help(
            "The goal did not terminate. Likely the rule file threw an error and the \
             engine is waiting, or the goal loops. Ensure the entry goal prints the \
             plan and ends, and that comparisons use bound numbers."
        )
    )]
    Timeout {
        timeout_secs: f64,
        bundle: Box<InvocationBundle>,
    },

    #[error("rule engine failed with {status}\n\n{bundle}")]
    #[diagnostic(
        code(planner::invoke::failed),
        help("Read STDERR above; the fact and rule file heads are included for diagnosis.")
    )]
    Failed {
        status: String,
        bundle: Box<InvocationBundle>,
    },

    #[error("rule engine succeeded but printed no output\n\n{bundle}")]
    #[diagnostic(
        code(planner::invoke::empty_output),
        help(
            "The entry goal must print the plan, e.g. [[math,shortlist,120],[physics,needs_info,60]]. \
             Ensure the rule file defines `main :- plan(P), writeln(P).`"
        )
    )]
    EmptyOutput { bundle: Box<InvocationBundle> },
}

pub type InvokeResult<T> = std::result::Result<T, InvokeError>;

// ---------------------------------------------------------------------------
// Executable resolution
// ---------------------------------------------------------------------------

/// Where the engine executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOrigin {
    Config,
    Environment,
    SearchPath,
}

impl fmt::Display for EngineOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config engine_path"),
            Self::Environment => write!(f, "${ENGINE_ENV_VAR}"),
            Self::SearchPath => write!(f, "PATH"),
        }
    }
}

/// A resolved engine executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineExecutable {
    pub program: PathBuf,
    pub origin: EngineOrigin,
}

/// Resolve the executable: config value, then `$SWIPL`, then `swipl` on `PATH`.
pub fn resolve_engine(configured: Option<&Path>) -> EngineExecutable {
    resolve_engine_with(configured, std::env::var(ENGINE_ENV_VAR).ok())
}

/// [`resolve_engine`] with the environment value supplied by the caller.
pub fn resolve_engine_with(configured: Option<&Path>, env_value: Option<String>) -> EngineExecutable {
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        return EngineExecutable {
            program: path.to_path_buf(),
            origin: EngineOrigin::Config,
        };
    }
    if let Some(value) = env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        return EngineExecutable {
            program: PathBuf::from(value),
            origin: EngineOrigin::Environment,
        };
    }
    EngineExecutable {
        program: PathBuf::from(DEFAULT_ENGINE),
        origin: EngineOrigin::SearchPath,
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Fully built engine command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// `-q` quiet, `-f none` no init file, `-s` load (rules, then facts),
    /// `-g` run the goal, `-t halt` always terminate.
    pub fn new(program: &Path, rules: &Path, facts: &Path, goal: &str) -> Self {
        Self {
            program: program.to_path_buf(),
            args: vec![
                "-q".into(),
                "-f".into(),
                "none".into(),
                "-s".into(),
                rules.display().to_string(),
                "-s".into(),
                facts.display().to_string(),
                "-g".into(),
                goal.into(),
                "-t".into(),
                "halt".into(),
            ],
        }
    }

    /// Space-joined command line for diagnostics.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Engine stdout and wall-clock time of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    /// Trimmed stdout; never empty.
    pub text: String,
    pub elapsed: Duration,
}

/// First `max_lines` lines of a file, labelled for a diagnostic bundle.
pub fn file_head(path: &Path, max_lines: usize) -> String {
    let content = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return format!("[debug] Missing file: {}", path.display()),
    };
    let lines: Vec<&str> = content.lines().collect();
    let shown = lines.len().min(max_lines);
    let mut out = format!(
        "[debug] {} (first {shown} lines)\n{}",
        path.display(),
        lines[..shown].join("\n")
    );
    if lines.len() > max_lines {
        out.push_str(&format!("\n... ({} more lines)", lines.len() - max_lines));
    }
    out
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

fn collect(rx: Option<mpsc::Receiver<Vec<u8>>>, stream: &str) -> String {
    let Some(rx) = rx else {
        return String::new();
    };
    match rx.recv_timeout(DRAIN_GRACE) {
        Ok(buf) => String::from_utf8_lossy(&buf).trim().to_string(),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(
                stream,
                grace_ms = DRAIN_GRACE.as_millis() as u64,
                "rule engine pipe still open after exit, output dropped; \
                 a child process may be holding it"
            );
            String::new()
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => String::new(),
    }
}

/// Runs the rule engine with a bounded timeout.
#[derive(Debug, Clone)]
pub struct Invoker {
    pub engine: EngineExecutable,
    pub goal: String,
    pub timeout: Duration,
    /// Working directory for the engine; inherited when `None`.
    pub working_dir: Option<PathBuf>,
}

impl Invoker {
    pub fn new(engine: EngineExecutable, timeout: Duration) -> Self {
        Self {
            engine,
            goal: "main".into(),
            timeout,
            working_dir: None,
        }
    }

    /// Build an invoker from config, resolving the executable.
    pub fn from_config(config: &PlannerConfig) -> ConfigResult<Self> {
        Ok(Self {
            engine: resolve_engine(config.engine_path.as_deref()),
            goal: config.entry_goal.clone(),
            timeout: config.timeout()?,
            working_dir: None,
        })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn bundle(&self, invocation: &Invocation, facts: &Path, rules: &Path) -> InvocationBundle {
        InvocationBundle {
            command: invocation.command_line(),
            facts_head: file_head(facts, DEBUG_HEAD_LINES),
            rules_head: file_head(rules, DEBUG_HEAD_LINES),
            ..Default::default()
        }
    }

    /// Run the engine over `rules` and `facts`.
    ///
    /// Both files are checked before anything is spawned. Only exit status 0
    /// with non-empty stdout counts as success.
    pub fn invoke(&self, facts: &Path, rules: &Path) -> InvokeResult<RawOutput> {
        if !rules.is_file() {
            return Err(InvokeError::MissingRules {
                path: rules.display().to_string(),
            });
        }
        if !facts.is_file() {
            return Err(InvokeError::MissingFacts {
                path: facts.display().to_string(),
            });
        }

        let invocation = Invocation::new(&self.engine.program, rules, facts, &self.goal);
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %invocation.command_line(), "invoking rule engine");
        let started = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InvokeError::NotFound {
                    program: invocation.program.display().to_string(),
                    origin: self.engine.origin,
                    bundle: Box::new(self.bundle(&invocation, facts, rules)),
                });
            }
            Err(e) => {
                return Err(InvokeError::Spawn {
                    program: invocation.program.display().to_string(),
                    source: e,
                });
            }
        };

        let stdout_rx = child.stdout.take().map(drain);
        let stderr_rx = child.stderr.take().map(drain);
        let deadline = started + self.timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        tracing::warn!(
                            timeout_secs = self.timeout.as_secs_f64(),
                            "rule engine timed out, killed"
                        );
                        let mut bundle = self.bundle(&invocation, facts, rules);
                        bundle.stdout = collect(stdout_rx, "stdout");
                        bundle.stderr = collect(stderr_rx, "stderr");
                        return Err(InvokeError::Timeout {
                            timeout_secs: self.timeout.as_secs_f64(),
                            bundle: Box::new(bundle),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(InvokeError::Spawn {
                        program: invocation.program.display().to_string(),
                        source: e,
                    });
                }
            }
        };
        let elapsed = started.elapsed();

        let stdout = collect(stdout_rx, "stdout");
        let stderr = collect(stderr_rx, "stderr");

        if !status.success() {
            let status = match status.code() {
                Some(code) => format!("exit code {code}"),
                None => "termination by signal".to_string(),
            };
            let mut bundle = self.bundle(&invocation, facts, rules);
            bundle.stdout = stdout;
            bundle.stderr = stderr;
            return Err(InvokeError::Failed {
                status,
                bundle: Box::new(bundle),
            });
        }

        if stdout.is_empty() {
            let mut bundle = self.bundle(&invocation, facts, rules);
            bundle.stderr = stderr;
            return Err(InvokeError::EmptyOutput {
                bundle: Box::new(bundle),
            });
        }

        if !stderr.is_empty() {
            tracing::warn!(stderr = %stderr, "rule engine wrote to stderr");
        }
        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = stdout.len(),
            "rule engine finished"
        );
        Ok(RawOutput {
            text: stdout,
            elapsed,
        })
    }
}
