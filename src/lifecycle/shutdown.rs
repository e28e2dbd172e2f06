//! Shutdown coordination for the watch loop.

use std::sync::Arc;

use tokio::sync::watch;

/// Latching stop flag shared by the watch loop and the signal task.
///
/// Unlike a one-shot message, a listener created after `trigger` still
/// observes the stop.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

/// Receiving half handed to each task that must stop.
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Resolve once shutdown has been triggered.
    pub async fn wait(&mut self) {
        // Err means every Shutdown handle is gone; nothing can trigger anymore.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listeners_observe_trigger() {
        let shutdown = Shutdown::new();
        let mut early = shutdown.listener();

        shutdown.clone().trigger();
        let mut late = shutdown.listener();

        early.wait().await;
        late.wait().await;
        assert!(shutdown.is_triggered());
    }
}
