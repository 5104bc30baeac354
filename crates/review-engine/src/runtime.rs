//! Async shell around [`ReviewSession`]
//!
//! Each armed timer becomes a tokio task that sleeps and then posts its token
//! on an unbounded channel. Deliveries are applied one at a time, so a user
//! action and a timer callback never interleave. Disarmed timers are aborted;
//! a token that was already in flight is rejected by the session's timer book.

use crate::session::{Action, Effect, FocusTarget, ReviewSession};
use crate::stage::Stage;
use crate::timer::{TimerCommand, TimerToken};
use crate::view::ViewModel;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub struct SessionRuntime {
    session: ReviewSession,
    tx: mpsc::UnboundedSender<TimerToken>,
    rx: mpsc::UnboundedReceiver<TimerToken>,
    tasks: HashMap<TimerToken, AbortHandle>,
}

impl SessionRuntime {
    pub fn new(session: ReviewSession) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            tx,
            rx,
            tasks: HashMap::new(),
        }
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn current_stage(&self) -> Stage {
        self.session.current_stage()
    }

    pub fn view(&self) -> ViewModel {
        ViewModel::build(&self.session)
    }

    /// Timers scheduled on the runtime and not yet delivered
    pub fn pending_timers(&self) -> usize {
        self.tasks.len()
    }

    /// Apply a user action and return what the renderer should scroll to.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, action: Action) -> Vec<FocusTarget> {
        let effects = self.session.apply(action);
        self.execute(effects)
    }

    /// Wait for the next timer delivery and apply it. Returns `None` once no
    /// timer is scheduled.
    pub async fn next_event(&mut self) -> Option<Vec<FocusTarget>> {
        if self.tasks.is_empty() {
            return None;
        }
        let token = self.rx.recv().await?;
        self.tasks.remove(&token);
        Some(self.dispatch(Action::TimerFired(token)))
    }

    /// Drive timers until `stage` is current. Returns false if the timers ran
    /// out first.
    pub async fn run_until(&mut self, stage: Stage) -> bool {
        loop {
            if self.session.current_stage() == stage {
                return true;
            }
            if self.next_event().await.is_none() {
                tracing::debug!(
                    target_stage = stage.number(),
                    current = self.session.current_stage().number(),
                    "No timers left to reach stage"
                );
                return false;
            }
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) -> Vec<FocusTarget> {
        let mut focus = Vec::new();
        for effect in effects {
            match effect {
                Effect::Timer(TimerCommand::Arm { token, delay, .. }) => {
                    let tx = self.tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        // receiver only goes away with the runtime itself
                        let _ = tx.send(token);
                    });
                    self.tasks.insert(token, handle.abort_handle());
                }
                Effect::Timer(TimerCommand::Disarm { token }) => {
                    if let Some(handle) = self.tasks.remove(&token) {
                        handle.abort();
                    }
                }
                Effect::Focus(target) => focus.push(target),
            }
        }
        focus
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewConfig;
    use crate::dataset::ReviewDataset;
    use crate::progress::ProgressState;
    use std::sync::Arc;
    use std::time::Duration;

    fn runtime() -> SessionRuntime {
        let raw = serde_json::json!({
            "documents": [{
                "file_id": "doc-1",
                "document_type": "Engagement Letter",
                "findings": [{ "type": "warning", "title": "Unsigned", "source": { "bbox": [1, 2, 3, 4] } }]
            }]
        });
        let dataset = Arc::new(ReviewDataset::from_json_str(&raw.to_string()).unwrap());
        let config = ReviewConfig {
            seed: Some(5),
            ..Default::default()
        };
        SessionRuntime::new(ReviewSession::new(dataset, &config))
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_completes_on_timers() {
        let mut rt = runtime();
        rt.dispatch(Action::StartAnalysis);
        assert_eq!(rt.pending_timers(), 1);
        assert!(rt.run_until(Stage::ReviewResults).await);
        assert_eq!(rt.pending_timers(), 0);
        assert!(!rt.session().analysis().state().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_event_without_timers() {
        let mut rt = runtime();
        assert!(rt.next_event().await.is_none());
        assert!(!rt.run_until(Stage::Analyze).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_aborts_pending_tick() {
        let mut rt = runtime();
        rt.dispatch(Action::StartAnalysis);
        rt.next_event().await;
        assert_eq!(rt.pending_timers(), 1);

        rt.dispatch(Action::NavigateTo(1));
        assert_eq!(rt.pending_timers(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rt.next_event().await.is_none());

        rt.dispatch(Action::NavigateTo(2));
        assert_eq!(rt.session().analysis().state(), ProgressState::default());
    }
}
