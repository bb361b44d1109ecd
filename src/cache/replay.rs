//! Hot last-value channels.
//!
//! A [`Replay`] keeps the most recent value and hands it to every new
//! [`Subscription`] before any later change, so a consumer that subscribes
//! late never misses the current state and never has to trigger work just
//! to learn it.

use tokio::sync::watch;

/// Publisher side of a replaying channel.
#[derive(Debug)]
pub struct Replay<T> {
    sender: watch::Sender<T>,
}

impl<T> Replay<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Stores `value` and wakes every subscriber. Never fails, even with no
    /// subscribers attached.
    pub fn publish(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// The last published value.
    pub fn current(&self) -> T {
        self.sender.borrow().clone()
    }

    /// A subscription whose first [`Subscription::next`] yields the current value.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut receiver = self.sender.subscribe();
        receiver.mark_changed();
        Subscription { receiver }
    }
}

/// Consumer side of a replaying channel.
///
/// Intermediate values published faster than the consumer reads them are
/// collapsed; only the latest is observed.
#[derive(Debug, Clone)]
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync,
{
    /// The current value on the first call, then each subsequent change.
    /// Returns `None` once the publisher is gone and everything was seen.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until a value satisfies `predicate`, checking the current value first.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let value = self.receiver.wait_for(predicate).await.ok()?;
        Some(value.clone())
    }

    /// The latest value without waiting or marking it seen.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }
}
