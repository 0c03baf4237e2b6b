//! Broadcast messaging for dashboard events.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{CrosslistError, Result};

/// Broadcast queue for one-to-many message distribution.
///
/// Every subscriber receives every project and flow event.
/// Backed by tokio's broadcast channel.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send(msg).map_err(|e| CrosslistError::Queue(e.to_string()))?;
        Ok(())
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let queue = BroadcastQueue::new(4);
        let mut a = queue.subscribe();
        let mut b = queue.subscribe();

        queue.send(7).unwrap();
        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_broadcast_without_subscribers_errors() {
        let queue = BroadcastQueue::new(4);
        assert!(queue.send("nobody listening").is_err());
    }
}
