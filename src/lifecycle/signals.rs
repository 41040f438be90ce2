//! OS signal handling.
//!
//! # Responsibilities
//! - Name the process signals the service can observe
//! - Decide which of them request a graceful shutdown (`SignalSet`)
//! - Register OS signal handlers and forward every delivery onto a `SignalStream`
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The stream forwards raw signals; filtering happens in the orchestrator
//! - The allow-list is a value handed to the orchestrator, never global state
//! - SIGKILL and SIGILL cannot be intercepted and are skipped at registration

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffer depth for streams registered with the OS.
///
/// Rapid repeated signals are buffered up to this depth, later ones are dropped.
pub const DEFAULT_STREAM_CAPACITY: usize = 16;

/// A process signal as observed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    Interrupt,
    Terminate,
    Quit,
    Hangup,
    Kill,
    Abort,
    Illegal,
    UserDefined1,
    UserDefined2,
    Pipe,
}

impl Signal {
    pub const ALL: [Signal; 10] = [
        Signal::Interrupt,
        Signal::Terminate,
        Signal::Quit,
        Signal::Hangup,
        Signal::Kill,
        Signal::Abort,
        Signal::Illegal,
        Signal::UserDefined1,
        Signal::UserDefined2,
        Signal::Pipe,
    ];

    /// Conventional name, e.g. `SIGINT`.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
            Signal::Kill => "SIGKILL",
            Signal::Abort => "SIGABRT",
            Signal::Illegal => "SIGILL",
            Signal::UserDefined1 => "SIGUSR1",
            Signal::UserDefined2 => "SIGUSR2",
            Signal::Pipe => "SIGPIPE",
        }
    }

    /// Whether a process can install a handler for this signal.
    pub fn is_interceptable(self) -> bool {
        !matches!(self, Signal::Kill | Signal::Illegal)
    }

    #[cfg(unix)]
    fn kind(self) -> Option<tokio::signal::unix::SignalKind> {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => Some(SignalKind::interrupt()),
            Signal::Terminate => Some(SignalKind::terminate()),
            Signal::Quit => Some(SignalKind::quit()),
            Signal::Hangup => Some(SignalKind::hangup()),
            Signal::UserDefined1 => Some(SignalKind::user_defined1()),
            Signal::UserDefined2 => Some(SignalKind::user_defined2()),
            Signal::Pipe => Some(SignalKind::pipe()),
            // SIGABRT is 6 on every unix tokio supports.
            Signal::Abort => Some(SignalKind::from_raw(6)),
            Signal::Kill | Signal::Illegal => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a signal name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal name: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        Signal::ALL
            .into_iter()
            .find(|signal| &signal.name()[3..] == name)
            .ok_or_else(|| UnknownSignal(s.to_string()))
    }
}

impl TryFrom<String> for Signal {
    type Error = UnknownSignal;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.name().to_string()
    }
}

/// The allow-list of signals that request a graceful shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSet {
    signals: HashSet<Signal>,
}

impl SignalSet {
    /// An allow-list containing exactly `signals`.
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }

    /// Whether `signal` should trigger shutdown.
    pub fn is_shutdown_signal(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.iter().copied()
    }
}

impl Default for SignalSet {
    /// SIGINT and SIGTERM.
    fn default() -> Self {
        Self::new([Signal::Interrupt, Signal::Terminate])
    }
}

/// Producer half of a synthetic signal stream.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<Signal>,
}

impl SignalSender {
    /// Deliver `signal` without blocking.
    ///
    /// Returns `false` if the signal was dropped because the buffer is full
    /// or the stream has been dropped.
    pub fn send(&self, signal: Signal) -> bool {
        self.tx.try_send(signal).is_ok()
    }
}

/// Stream of raw signal deliveries consumed by the orchestrator.
#[derive(Debug)]
pub struct SignalStream {
    rx: mpsc::Receiver<Signal>,
    registered: Vec<Signal>,
    forwarders: Vec<JoinHandle<()>>,
}

impl SignalStream {
    /// A stream fed by the returned sender instead of the OS.
    pub fn channel(capacity: usize) -> (SignalSender, SignalStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            SignalSender { tx },
            SignalStream {
                rx,
                registered: Vec::new(),
                forwarders: Vec::new(),
            },
        )
    }

    /// Register OS handlers for `signals` and forward every delivery.
    ///
    /// Handlers are installed before this returns. Must be called from within
    /// a Tokio runtime. Tokio never uninstalls a handler, so every signal named
    /// here stops taking its default action for the rest of the process.
    #[cfg(unix)]
    pub fn register(signals: &[Signal]) -> std::io::Result<SignalStream> {
        use tokio::signal::unix::signal;

        let (tx, rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
        let mut forwarders = Vec::new();
        let mut registered = Vec::new();

        for &sig in signals {
            if registered.contains(&sig) {
                continue;
            }
            let Some(kind) = sig.kind() else {
                tracing::warn!(signal = %sig, "Signal cannot be intercepted, skipping registration");
                continue;
            };
            let mut os_signal = signal(kind)?;
            registered.push(sig);
            let tx = tx.clone();
            forwarders.push(tokio::spawn(async move {
                while os_signal.recv().await.is_some() {
                    match tx.try_send(sig) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            tracing::debug!(signal = %sig, "Signal buffer full, dropping delivery");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            }));
        }

        tracing::debug!(signals = ?registered, "Signal handlers registered");
        Ok(SignalStream {
            rx,
            registered,
            forwarders,
        })
    }

    /// Register the ctrl-c handler, reported as `SIGINT`.
    #[cfg(not(unix))]
    pub fn register(signals: &[Signal]) -> std::io::Result<SignalStream> {
        let (tx, rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
        let mut forwarders = Vec::new();
        let mut registered = Vec::new();

        if signals.contains(&Signal::Interrupt) {
            registered.push(Signal::Interrupt);
            forwarders.push(tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(Signal::Interrupt) {
                        break;
                    }
                }
            }));
        }

        Ok(SignalStream {
            rx,
            registered,
            forwarders,
        })
    }

    /// Signals with an OS handler feeding this stream. Empty for synthetic streams.
    pub fn registered(&self) -> &[Signal] {
        &self.registered
    }

    /// Next delivered signal, or `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }
}

impl Drop for SignalStream {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}
