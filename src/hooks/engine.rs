//! Execution engine hooks.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Action lifecycle notification published by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ExecutionEvent {
    #[serde(rename = "EventExecutionStarted")]
    Started {
        action_id: String,
        tracking_id: String,
    },
    #[serde(rename = "EventOutputChunk")]
    OutputChunk { tracking_id: String, output: String },
    #[serde(rename = "EventExecutionFinished")]
    Finished {
        action_id: String,
        tracking_id: String,
        exit_code: Option<i32>,
    },
}

/// Receives action lifecycle events.
pub trait ExecutionListener: Send + Sync + 'static {
    fn on_execution_event(&self, event: &ExecutionEvent);
}

/// The command/action execution engine, as seen by the orchestrator.
pub trait ExecutionEngine: Send + Sync + 'static {
    /// Recompute the action map from the current configuration.
    fn rebuild_action_map(&self);

    /// Register a listener for action lifecycle events.
    fn subscribe(&self, listener: Arc<dyn ExecutionListener>);
}

/// An engine with no actions of its own.
///
/// Rebuilding is a no-op; events handed to [`IdleEngine::publish`] still
/// reach every subscriber, which is enough to drive websocket clients.
#[derive(Default)]
pub struct IdleEngine {
    listeners: Mutex<Vec<Arc<dyn ExecutionListener>>>,
}

impl IdleEngine {
    pub fn publish(&self, event: &ExecutionEvent) {
        let listeners = match self.listeners.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in listeners {
            listener.on_execution_event(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl ExecutionEngine for IdleEngine {
    fn rebuild_action_map(&self) {
        tracing::debug!("Idle engine has no actions to rebuild");
    }

    fn subscribe(&self, listener: Arc<dyn ExecutionListener>) {
        match self.listeners.lock() {
            Ok(mut guard) => guard.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ExecutionListener for Counting {
        fn on_execution_event(&self, _event: &ExecutionEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn publish_reaches_every_subscriber() {
        let engine = IdleEngine::default();
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        engine.subscribe(a.clone());
        engine.subscribe(b.clone());

        engine.publish(&ExecutionEvent::Started {
            action_id: "ping".into(),
            tracking_id: "t-1".into(),
        });

        assert_eq!(engine.listener_count(), 2);
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_wire_format() {
        let event = ExecutionEvent::Started {
            action_id: "ping".into(),
            tracking_id: "t-1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "EventExecutionStarted",
                "actionId": "ping",
                "trackingId": "t-1",
            })
        );
    }
}
