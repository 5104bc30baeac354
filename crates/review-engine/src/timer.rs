//! Timer bookkeeping for the session reducer
//!
//! The reducer never sleeps. It arms timers by token and the runtime delivers
//! `TimerFired(token)` back. A token is live from `arm` until it fires or is
//! disarmed; deliveries for anything else are stale and get dropped.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerToken(u64);

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Analysis,
    Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    ProgressTick(DriverKind),
    ProgressSettle(DriverKind),
    PulseClear,
}

/// Timer requests produced while handling one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Arm {
        token: TimerToken,
        kind: TimerKind,
        delay: Duration,
    },
    Disarm {
        token: TimerToken,
    },
}

#[derive(Debug, Default)]
pub struct TimerBook {
    next: u64,
    armed: HashMap<TimerToken, TimerKind>,
    commands: Vec<TimerCommand>,
}

impl TimerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        self.next += 1;
        let token = TimerToken(self.next);
        self.armed.insert(token, kind);
        self.commands.push(TimerCommand::Arm { token, kind, delay });
        token
    }

    /// Invalidate a pending timer. Disarming an unknown token does nothing.
    pub fn disarm(&mut self, token: TimerToken) {
        if self.armed.remove(&token).is_some() {
            self.commands.push(TimerCommand::Disarm { token });
        }
    }

    /// Consume a delivery. `None` means the token was already disarmed or fired.
    pub fn fire(&mut self, token: TimerToken) -> Option<TimerKind> {
        let kind = self.armed.remove(&token);
        if kind.is_none() {
            tracing::debug!(%token, "Dropping stale timer delivery");
        }
        kind
    }

    pub fn is_armed(&self, token: TimerToken) -> bool {
        self.armed.contains_key(&token)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    pub fn drain_commands(&mut self) -> Vec<TimerCommand> {
        std::mem::take(&mut self.commands)
    }
}
