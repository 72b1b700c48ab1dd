//! 1Hz turn timer
//!
//! Posts a `Tick` onto the engine queue once per second. The engine reads
//! the phase snapshot and fires overrun rules; the timer itself holds no
//! exam state.

use super::session::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct TurnTimer {
    handle: Option<JoinHandle<()>>,
}

impl TurnTimer {
    /// Spawn the tick task. It stops on its own once the engine queue is
    /// gone, or when `stop()` aborts it.
    pub fn start(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // A stalled runtime must not burst a backlog of ticks.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if events.send(SessionEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
