//! Lifecycle state tracking.

use std::fmt;

use tokio::sync::watch;

/// Where a listener (or the orchestrator as a whole) is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// Has stop been requested (or completed)?
    pub fn is_terminating(self) -> bool {
        matches!(self, LifecycleState::Stopping | LifecycleState::Stopped)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::NotStarted => "not_started",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Observable lifecycle state.
///
/// Writers call [`StateCell::set`]; readers either peek with
/// [`StateCell::get`] or wait for a particular state.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<LifecycleState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::NotStarted);
        Self { tx }
    }

    pub fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Replace the state, returning the previous one.
    pub fn set(&self, state: LifecycleState) -> LifecycleState {
        self.tx.send_replace(state)
    }

    /// Wait until the state satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&LifecycleState) -> bool) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(predicate).await;
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn set_returns_previous() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), LifecycleState::NotStarted);
        assert_eq!(cell.set(LifecycleState::Starting), LifecycleState::NotStarted);
        assert_eq!(cell.get(), LifecycleState::Starting);
    }

    #[test]
    fn terminating_states() {
        assert!(!LifecycleState::Running.is_terminating());
        assert!(LifecycleState::Stopping.is_terminating());
        assert!(LifecycleState::Stopped.is_terminating());
    }

    #[tokio::test]
    async fn wait_for_sees_later_transition() {
        let cell = Arc::new(StateCell::new());
        let writer = cell.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set(LifecycleState::Running);
        });

        tokio::time::timeout(
            Duration::from_secs(1),
            cell.wait_for(|s| *s == LifecycleState::Running),
        )
        .await
        .expect("state never became running");
    }
}
