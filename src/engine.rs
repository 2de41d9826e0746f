//! One engine subprocess speaking a UAI-style line protocol.
//!
//! A session owns the child process, a writer handle to its stdin and a
//! reader thread draining its stdout into a channel. All public operations
//! are synchronous: they write a command line and, where the protocol
//! defines one, block until the expected reply token arrives. The protocol
//! variants (UAI, UGI) differ only in their token strings.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;

use crate::board::Position;
use crate::settings::{EngineConfig, Protocol, SearchSettings};

/// Slack on top of the configured budget + buffer before the watchdog
/// declares a searching engine unresponsive and kills it.
const WATCHDOG_GRACE: Duration = Duration::from_millis(1000);

/// How long teardown waits after `quit` before resorting to `kill`.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },
    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine process exited unexpectedly")]
    Exited,
    #[error("engine sent unusable line {0:?}")]
    Protocol(String),
    #[error("engine produced no bestmove within its time budget")]
    Unresponsive,
}

/// Observer for a single protocol line. Shared with the callback set, so it
/// must be safe to call from any worker thread.
pub type LineObserver = Arc<dyn Fn(&str) + Send + Sync>;

struct Tokens {
    handshake: &'static str,
    handshake_ok: &'static str,
    newgame: &'static str,
}

fn tokens_for(protocol: Protocol) -> Tokens {
    match protocol {
        Protocol::Uai => Tokens {
            handshake: "uai",
            handshake_ok: "uaiok",
            newgame: "uainewgame",
        },
        Protocol::Ugi => Tokens {
            handshake: "ugi",
            handshake_ok: "ugiok",
            newgame: "uginewgame",
        },
    }
}

pub struct EngineSession {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    tokens: Tokens,
    name: String,
    on_send: Option<LineObserver>,
    on_recv: Option<LineObserver>,
}

impl EngineSession {
    pub fn spawn(
        config: &EngineConfig,
        on_send: Option<LineObserver>,
        on_recv: Option<LineObserver>,
    ) -> Result<EngineSession, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: config.path.clone(),
                source,
            })?;

        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());

        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            for line in stdout.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        debug!("launched {} ({})", config.name, config.path);

        Ok(EngineSession {
            child,
            stdin: Some(stdin),
            lines: rx,
            reader: Some(reader),
            tokens: tokens_for(config.protocol),
            name: config.name.clone(),
            on_send,
            on_recv,
        })
    }

    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        if let Some(observer) = &self.on_send {
            observer(line);
        }
        let stdin = self.stdin.as_mut().ok_or(EngineError::Exited)?;
        writeln!(stdin, "{}", line)?;
        stdin.flush()?;
        Ok(())
    }

    /// Blocks for the next line. With a deadline, an overdue engine is
    /// killed and reported as unresponsive; the channel disconnecting means
    /// the process died on its own.
    fn recv_line(&mut self, deadline: Option<Instant>) -> Result<String, EngineError> {
        let line = match deadline {
            None => self.lines.recv().map_err(|_| EngineError::Exited)?,
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match self.lines.recv_timeout(timeout) {
                    Ok(line) => line,
                    Err(RecvTimeoutError::Disconnected) => return Err(EngineError::Exited),
                    Err(RecvTimeoutError::Timeout) => {
                        warn!("{} missed its search deadline, killing it", self.name);
                        let _ = self.child.kill();
                        return Err(EngineError::Unresponsive);
                    }
                }
            }
        };
        if let Some(observer) = &self.on_recv {
            observer(&line);
        }
        Ok(line)
    }

    fn wait_for(&mut self, token: &str) -> Result<(), EngineError> {
        loop {
            if self.recv_line(None)?.trim() == token {
                return Ok(());
            }
        }
    }

    /// Protocol handshake: identity request, wait for the acknowledgement.
    pub fn init(&mut self) -> Result<(), EngineError> {
        self.send(self.tokens.handshake)?;
        self.wait_for(self.tokens.handshake_ok)
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.send(&format!("setoption name {} value {}", name, value))
    }

    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send(self.tokens.newgame)
    }

    pub fn is_ready(&mut self) -> Result<(), EngineError> {
        self.send("isready")?;
        self.wait_for("readyok")
    }

    pub fn position(&mut self, pos: &Position) -> Result<(), EngineError> {
        self.send(&format!("position fen {}", pos.fen()))
    }

    /// Starts a search and blocks until the engine reports a bestmove,
    /// returning the raw move token. `budget` is the wall-clock allowance
    /// for the timed modes (already including the timeout buffer); past
    /// `budget + grace` the engine is killed rather than waited on forever.
    pub fn go(
        &mut self,
        settings: &SearchSettings,
        budget: Option<Duration>,
    ) -> Result<String, EngineError> {
        let command = match *settings {
            SearchSettings::Movetime { ms } => format!("go movetime {}", ms),
            SearchSettings::Time {
                btime,
                wtime,
                binc,
                winc,
            } => format!(
                "go btime {} wtime {} binc {} winc {}",
                btime, wtime, binc, winc
            ),
            SearchSettings::Depth { plies } => format!("go depth {}", plies),
            SearchSettings::Nodes { count } => format!("go nodes {}", count),
            SearchSettings::Infinite => "go infinite".to_string(),
        };
        self.send(&command)?;

        let deadline = budget.map(|b| Instant::now() + b + WATCHDOG_GRACE);
        loop {
            let line = self.recv_line(deadline)?;
            let mut words = line.split_whitespace();
            if words.next() == Some("bestmove") {
                let token = words
                    .next()
                    .ok_or_else(|| EngineError::Protocol(line.clone()))?;
                return Ok(token.to_string());
            }
        }
    }

    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.send("stop")
    }

    pub fn quit(&mut self) -> Result<(), EngineError> {
        self.send("quit")
    }
}

impl Drop for EngineSession {
    /// Best-effort quit, close stdin, then bounded wait before `kill`.
    /// Tolerates a child that already exited or was already killed by the
    /// watchdog; no engine process outlives its session.
    fn drop(&mut self) {
        let _ = self.quit();
        self.stdin.take();

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) | Err(_) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("{} ignored quit, killing it", self.name);
                        let _ = self.child.kill();
                        let _ = self.child.wait();
                        break;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
