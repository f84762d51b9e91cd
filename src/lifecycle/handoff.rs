//! Single-slot handoff between the service task and the coordinator.
//!
//! The sender writes at most one value and is then consumed. Once the slot
//! has produced a value, or the sender is gone, every further read returns
//! `None` immediately.

use tokio::sync::oneshot;

/// Create a connected sender/slot pair.
pub fn channel<T>() -> (Sender<T>, Slot<T>) {
    let (tx, rx) = oneshot::channel();
    (Sender { tx }, Slot { rx: Some(rx) })
}

/// Write side of the handoff.
#[derive(Debug)]
pub struct Sender<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Sender<T> {
    /// Deliver the value and finalize the slot. Never blocks.
    pub fn send(self, value: T) {
        // Nobody left to read it.
        let _ = self.tx.send(value);
    }

    /// Finalize the slot without a value.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Read side of the handoff.
#[derive(Debug)]
pub struct Slot<T> {
    rx: Option<oneshot::Receiver<T>>,
}

impl<T> Slot<T> {
    /// Wait for the value, or for the sender to finalize the slot.
    ///
    /// Cancel safe: dropping the returned future leaves a pending value in
    /// place for the next read.
    pub async fn recv(&mut self) -> Option<T> {
        let rx = self.rx.as_mut()?;
        let value = rx.await.ok();
        self.rx = None;
        value
    }

    /// Take the value if it has already been delivered.
    pub fn try_recv(&mut self) -> Option<T> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(value) => {
                self.rx = None;
                Some(value)
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                self.rx = None;
                None
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
        }
    }
}
