//! Translates host interrupts into pipeline cancellation.
//!
//! [`ShutdownCoordinator`] is the only component that triggers the pipeline's
//! [`CancellationToken`]. It listens on an [`InterruptSource`]; the first
//! interrupt cancels the token, later ones are logged and otherwise ignored.

use crate::{Error, Result};
use core::fmt;
use portable_atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An operator-initiated stop request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// Ctrl+C / `SIGINT`.
    CtrlC,
    /// `SIGTERM`.
    Terminate,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CtrlC => write!(f, "Ctrl+C signal"),
            Self::Terminate => write!(f, "SIGTERM signal"),
        }
    }
}

/// Anything that can deliver interrupts to a [`ShutdownCoordinator`].
///
/// `recv` resolves to `None` once no further interrupts can arrive.
pub trait InterruptSource: Send + 'static {
    fn recv(&mut self) -> impl Future<Output = Option<Interrupt>> + Send;
}

/// Interrupts forwarded over a channel; used for embedding and tests.
impl InterruptSource for mpsc::Receiver<Interrupt> {
    fn recv(&mut self) -> impl Future<Output = Option<Interrupt>> + Send {
        mpsc::Receiver::recv(self)
    }
}

/// Host signal listener: Ctrl+C everywhere, plus `SIGTERM` on Unix.
///
/// Handlers are registered by [`SignalListener::install`], so a platform
/// without a usable signal subsystem fails before the pipeline starts.
pub struct SignalListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl SignalListener {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signal`] if a handler cannot be installed, or if the
    /// platform has no interrupt signals at all.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime with the signal driver
    /// enabled.
    pub fn install() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let interrupt = signal(SignalKind::interrupt()).map_err(|e| Error::Signal {
                context: format!("failed to install SIGINT handler: {e}"),
            })?;
            let terminate = signal(SignalKind::terminate()).map_err(|e| Error::Signal {
                context: format!("failed to install SIGTERM handler: {e}"),
            })?;
            Ok(Self {
                interrupt,
                terminate,
            })
        }

        #[cfg(windows)]
        {
            let ctrl_c = tokio::signal::windows::ctrl_c().map_err(|e| Error::Signal {
                context: format!("failed to install Ctrl+C handler: {e}"),
            })?;
            Ok(Self { ctrl_c })
        }

        #[cfg(not(any(unix, windows)))]
        {
            Err(Error::Signal {
                context: "interrupt signals are not supported on this platform".to_string(),
            })
        }
    }
}

impl InterruptSource for SignalListener {
    #[cfg(unix)]
    fn recv(&mut self) -> impl Future<Output = Option<Interrupt>> + Send {
        async move {
            tokio::select! {
                sig = self.interrupt.recv() => sig.map(|()| Interrupt::CtrlC),
                sig = self.terminate.recv() => sig.map(|()| Interrupt::Terminate),
            }
        }
    }

    #[cfg(windows)]
    fn recv(&mut self) -> impl Future<Output = Option<Interrupt>> + Send {
        async move { self.ctrl_c.recv().await.map(|()| Interrupt::CtrlC) }
    }

    #[cfg(not(any(unix, windows)))]
    fn recv(&mut self) -> impl Future<Output = Option<Interrupt>> + Send {
        async { None }
    }
}

/// Owns the right to cancel the pipeline.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    triggered: AtomicBool,
}

impl ShutdownCoordinator {
    pub const fn new(token: CancellationToken) -> Self {
        Self {
            token,
            triggered: AtomicBool::new(false),
        }
    }

    /// Cancels the token. Exactly one call returns `true`, even when called
    /// concurrently; it returns `false` for every call if the token was
    /// already cancelled elsewhere.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) || self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Listens until `source` is exhausted, cancelling on the first interrupt.
    ///
    /// Returns the number of interrupts received. Callers usually spawn this
    /// and abort the task once the pipeline has terminated.
    pub async fn run<I>(self, mut source: I) -> usize
    where
        I: InterruptSource,
    {
        let mut received = 0;
        while let Some(_interrupt) = source.recv().await {
            received += 1;
            if self.trigger() {
                #[cfg(feature = "tracing")]
                tracing::info!("Received {_interrupt}, draining pipeline...");
            } else {
                #[cfg(feature = "tracing")]
                tracing::info!("Received {_interrupt} while already shutting down");
            }
        }
        received
    }
}
