//! A replayable, multi-subscriber result stream.
//!
//! [`ReplayBroadcast`] records every published item. Each subscriber gets its
//! own cursor over the recording: it first replays what has already been
//! published, then waits for live items, and finally observes the terminal
//! state (completed or failed). Subscribers may attach at any time, including
//! after the broadcast has finished, and dropping a subscription never
//! affects the publisher or the other subscribers.
//!
//! [`ReplayBroadcast::stop_recording`] turns the recording into a window:
//! items are then kept only until every live subscriber has read them, and
//! later subscribers start at the oldest item still held.
//!
//! Wake-ups go through a `tokio::sync::watch` version counter; the items
//! themselves live behind a mutex that is never held across an await.

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_core::{Error, Result};
use tokio::sync::watch;

// ============================================================================
// Types
// ============================================================================

/// Lifecycle of a broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastStatus {
    /// Still receiving items.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

#[derive(Debug)]
enum Terminal {
    Completed,
    Failed(Error),
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    /// Publish index of `items[0]`.
    base: usize,
    recording: bool,
    /// Next publish index each live subscriber will read.
    cursors: HashMap<u64, usize>,
    next_subscriber: u64,
    terminal: Option<Terminal>,
}

impl<T> State<T> {
    fn published(&self) -> usize {
        self.base + self.items.len()
    }

    /// Drop items every live subscriber has read. No-op while recording.
    fn trim(&mut self) {
        if self.recording {
            return;
        }
        let floor = self
            .cursors
            .values()
            .min()
            .copied()
            .unwrap_or_else(|| self.published());
        while self.base < floor && self.items.pop_front().is_some() {
            self.base += 1;
        }
    }
}

/// What a subscriber should do next.
enum Step<T> {
    Item(T),
    Done,
    Failed(Error),
    Wait,
}

/// Shared, replayable stream of items.
#[derive(Debug)]
pub struct ReplayBroadcast<T> {
    state: Mutex<State<T>>,
    version: watch::Sender<u64>,
}

/// A registered cursor; unregisters itself on drop.
struct Subscription<T> {
    broadcast: Arc<ReplayBroadcast<T>>,
    id: u64,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut state = self.broadcast.lock();
        state.cursors.remove(&self.id);
        state.trim();
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl<T> Default for ReplayBroadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReplayBroadcast<T> {
    /// Create an empty, running, recording broadcast.
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                base: 0,
                recording: true,
                cursors: HashMap::new(),
                next_subscriber: 0,
                terminal: None,
            }),
            version,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Append an item. Returns `false` if the broadcast already finished.
    pub fn publish(&self, item: T) -> bool {
        {
            let mut state = self.lock();
            if state.terminal.is_some() {
                return false;
            }
            state.items.push_back(item);
            state.trim();
        }
        self.notify();
        true
    }

    /// Finish successfully. Returns `false` if already finished.
    pub fn complete(&self) -> bool {
        self.terminate(Terminal::Completed)
    }

    /// Finish with an error delivered to every subscriber.
    /// Returns `false` if already finished.
    pub fn fail(&self, error: Error) -> bool {
        self.terminate(Terminal::Failed(error))
    }

    fn terminate(&self, terminal: Terminal) -> bool {
        {
            let mut state = self.lock();
            if state.terminal.is_some() {
                return false;
            }
            state.terminal = Some(terminal);
        }
        self.notify();
        true
    }

    /// Stop keeping history. Items already read by every live subscriber are
    /// released now, and each later item once the slowest one has read it.
    pub fn stop_recording(&self) {
        let mut state = self.lock();
        state.recording = false;
        state.trim();
    }

    /// Whether the full history is still kept.
    pub fn is_recording(&self) -> bool {
        self.lock().recording
    }

    /// Items published so far.
    pub fn len(&self) -> usize {
        self.lock().published()
    }

    /// Items currently held in memory.
    pub fn retained(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current lifecycle state.
    pub fn status(&self) -> BroadcastStatus {
        match self.lock().terminal {
            None => BroadcastStatus::Running,
            Some(Terminal::Completed) => BroadcastStatus::Completed,
            Some(Terminal::Failed(_)) => BroadcastStatus::Failed,
        }
    }
}

impl<T: Clone> ReplayBroadcast<T> {
    fn step(&self, subscriber: u64) -> Step<T> {
        let mut state = self.lock();
        let base = state.base;
        let cursor = state.cursors.get(&subscriber).copied().unwrap_or(base);
        let next = cursor
            .checked_sub(base)
            .and_then(|offset| state.items.get(offset).cloned());
        if let Some(item) = next {
            state.cursors.insert(subscriber, cursor + 1);
            state.trim();
            return Step::Item(item);
        }
        match &state.terminal {
            Some(Terminal::Completed) => Step::Done,
            Some(Terminal::Failed(err)) => Step::Failed(err.clone()),
            None => Step::Wait,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ReplayBroadcast<T> {
    /// Subscribe from the first item still held.
    ///
    /// While recording that is the first item ever published. The stream
    /// yields items in publish order, then ends, or yields a single `Err` if
    /// the broadcast failed. The cursor is registered before this returns.
    pub fn subscribe(self: &Arc<Self>) -> BoxStream<'static, Result<T>> {
        // Receiver first, so nothing published after the first state check is missed.
        let rx = self.version.subscribe();
        let id = {
            let mut state = self.lock();
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            let base = state.base;
            state.cursors.insert(id, base);
            id
        };
        let subscription = Subscription {
            broadcast: Arc::clone(self),
            id,
        };
        stream::unfold(
            (subscription, rx, false),
            |(subscription, mut rx, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    match subscription.broadcast.step(subscription.id) {
                        Step::Item(item) => return Some((Ok(item), (subscription, rx, false))),
                        Step::Failed(err) => return Some((Err(err), (subscription, rx, true))),
                        Step::Done => return None,
                        Step::Wait => {
                            if rx.changed().await.is_err() {
                                return None;
                            }
                        }
                    }
                }
            },
        )
        .boxed()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_replays_then_completes() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        broadcast.publish("Hello");
        broadcast.publish("World");
        broadcast.complete();

        for _ in 0..2 {
            let items: Vec<_> = broadcast.subscribe().collect().await;
            assert_eq!(items, vec![Ok("Hello"), Ok("World")]);
        }
        assert_eq!(broadcast.status(), BroadcastStatus::Completed);
    }

    #[tokio::test]
    async fn test_repeats_error_to_every_subscriber() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        broadcast.publish("Hello");
        broadcast.publish("World");
        broadcast.fail(Error::invocation("op", "not implemented"));

        for _ in 0..2 {
            let items: Vec<_> = broadcast.subscribe().collect().await;
            assert_eq!(items.len(), 3);
            assert_eq!(items[0], Ok("Hello"));
            assert_eq!(items[1], Ok("World"));
            assert!(items[2].is_err());
        }
        assert_eq!(broadcast.status(), BroadcastStatus::Failed);
    }

    #[tokio::test]
    async fn test_live_items_reach_waiting_subscriber() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        let mut sub = broadcast.subscribe();

        let publisher = Arc::clone(&broadcast);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(1);
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(2);
        });

        assert_eq!(sub.next().await, Some(Ok(1)));
        assert_eq!(sub.next().await, Some(Ok(2)));
        assert_eq!(broadcast.status(), BroadcastStatus::Running);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_earlier_items_and_live_ones() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        broadcast.publish("a");
        broadcast.publish("b");

        let mut late = broadcast.subscribe();
        assert_eq!(late.next().await, Some(Ok("a")));
        assert_eq!(late.next().await, Some(Ok("b")));

        broadcast.publish("c");
        broadcast.complete();
        assert_eq!(late.next().await, Some(Ok("c")));
        assert_eq!(late.next().await, None);
    }

    #[tokio::test]
    async fn test_dropping_a_subscriber_does_not_affect_others() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        let first = broadcast.subscribe();
        let second = broadcast.subscribe();
        drop(first);

        broadcast.publish(7);
        broadcast.complete();
        let items: Vec<_> = second.collect().await;
        assert_eq!(items, vec![Ok(7)]);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let broadcast = ReplayBroadcast::new();
        assert!(broadcast.is_empty());
        assert!(broadcast.publish(1));
        assert!(broadcast.complete());
        assert!(!broadcast.publish(2));
        assert!(!broadcast.fail(Error::not_found("x")));
        assert_eq!(broadcast.len(), 1);
        assert_eq!(broadcast.status(), BroadcastStatus::Completed);
    }

    #[tokio::test]
    async fn test_stop_recording_releases_read_items_only() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        let mut fast = broadcast.subscribe();
        let mut slow = broadcast.subscribe();
        for n in 0..4 {
            broadcast.publish(n);
        }
        for n in 0..4 {
            assert_eq!(fast.next().await, Some(Ok(n)));
        }
        assert_eq!(slow.next().await, Some(Ok(0)));

        broadcast.stop_recording();
        assert!(!broadcast.is_recording());
        assert_eq!(broadcast.len(), 4);
        assert_eq!(broadcast.retained(), 3);

        drop(slow);
        assert_eq!(broadcast.retained(), 0);

        broadcast.publish(4);
        assert_eq!(broadcast.retained(), 1);
        assert_eq!(fast.next().await, Some(Ok(4)));
        assert_eq!(broadcast.retained(), 0);
        assert_eq!(broadcast.len(), 5);

        broadcast.complete();
        assert_eq!(fast.next().await, None);
    }

    #[tokio::test]
    async fn test_subscriber_after_stop_recording_starts_at_held_items() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        broadcast.publish("gone");
        broadcast.stop_recording();
        assert_eq!(broadcast.retained(), 0);

        let late = broadcast.subscribe();
        broadcast.publish("live");
        broadcast.complete();
        let items: Vec<_> = late.collect().await;
        assert_eq!(items, vec![Ok("live")]);
    }

    #[test]
    fn test_subscribe_without_runtime_after_completion() {
        let broadcast = Arc::new(ReplayBroadcast::new());
        broadcast.publish("x");
        broadcast.complete();
        let items: Vec<_> = tokio_test::block_on(broadcast.subscribe().collect());
        assert_eq!(items, vec![Ok("x")]);
    }
}
