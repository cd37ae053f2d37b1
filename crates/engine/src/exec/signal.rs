// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-signal forwarding and exit-code mapping
//!
//! The forwarder is scoped to one live child: SIGINT/SIGTERM received by the
//! parent are remembered (for exit-code mapping) and forwarded to the child's
//! process group. A second terminal signal while the child is still alive
//! escalates to SIGKILL on the group, giving Ctrl-C the "first signal is
//! graceful, second is forceful" semantic.

use nix::sys::signal::{killpg, pthread_sigmask, SigSet, SigmaskHow, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};

/// Terminal signals the engine forwards and maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalSignal {
    Interrupt,
    Terminate,
}

impl TerminalSignal {
    /// Documented meridian exit code for this signal.
    pub fn exit_code(self) -> i32 {
        match self {
            TerminalSignal::Interrupt => 130,
            TerminalSignal::Terminate => 143,
        }
    }

    fn as_nix(self) -> Signal {
        match self {
            TerminalSignal::Interrupt => Signal::SIGINT,
            TerminalSignal::Terminate => Signal::SIGTERM,
        }
    }
}

/// Map raw subprocess status + forwarded parent signal to meridian exit
/// semantics. `raw_code` is the child's exit code when it exited normally;
/// `child_signal` is the signal number that killed it otherwise.
pub fn map_raw_exit(
    raw_code: Option<i32>,
    child_signal: Option<i32>,
    received: Option<TerminalSignal>,
) -> i32 {
    if let Some(signal) = received {
        return signal.exit_code();
    }
    match raw_code {
        Some(0) => 0,
        Some(_) => 1,
        None => match child_signal {
            Some(n) if n == Signal::SIGINT as i32 => 130,
            Some(n) if n == Signal::SIGTERM as i32 => 143,
            _ => 1,
        },
    }
}

/// Send one signal to a child's process group, best effort.
pub(crate) fn signal_process_group(pgid: u32, signal: Signal) {
    let pid = Pid::from_raw(pgid as i32);
    if let Err(err) = killpg(pid, signal) {
        tracing::debug!(pgid, signal = %signal, error = %err, "killpg failed");
    }
}

/// Scoped SIGINT/SIGTERM forwarding from parent to child process group.
pub struct SignalForwarder {
    sigint: SignalStream,
    sigterm: SignalStream,
    child_pgid: u32,
    received: Option<TerminalSignal>,
    seen_count: u32,
}

impl SignalForwarder {
    /// Install listeners for the duration of one spawn.
    pub fn new(child_pgid: u32) -> std::io::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            child_pgid,
            received: None,
            seen_count: 0,
        })
    }

    /// Wait for the next terminal signal sent to the parent.
    pub async fn next(&mut self) -> TerminalSignal {
        tokio::select! {
            _ = self.sigint.recv() => TerminalSignal::Interrupt,
            _ = self.sigterm.recv() => TerminalSignal::Terminate,
        }
    }

    /// Forward one signal to the child group and remember it.
    ///
    /// The second terminal signal within this scope means "force stop now".
    pub fn forward(&mut self, received: TerminalSignal) {
        self.received = Some(received);
        self.seen_count += 1;

        if self.seen_count >= 2 {
            signal_process_group(self.child_pgid, Signal::SIGKILL);
        } else {
            signal_process_group(self.child_pgid, received.as_nix());
        }
    }

    pub fn received_signal(&self) -> Option<TerminalSignal> {
        self.received
    }
}

/// Scoped SIGTERM mask for the finalize critical section.
///
/// Blocks SIGTERM delivery to the current thread so a shutdown signal cannot
/// tear the locked finalize append; delivery is deferred, not dropped, and
/// the previous mask is restored on drop.
pub struct SigtermMask {
    previous: Option<SigSet>,
}

impl SigtermMask {
    pub fn install() -> Self {
        let mut mask = SigSet::empty();
        mask.add(Signal::SIGTERM);
        let mut previous = SigSet::empty();
        match pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&mask), Some(&mut previous)) {
            Ok(()) => Self {
                previous: Some(previous),
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to mask SIGTERM for finalize");
                Self { previous: None }
            }
        }
    }
}

impl Drop for SigtermMask {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None) {
                tracing::warn!(error = %err, "failed to restore SIGTERM mask");
            }
        }
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
