//! Delayed status transitions, cancellable per message or per conversation.
//!
//! Each scheduled task is a tokio task that sleeps for its delay and then
//! runs its closure. A task removes its own bookkeeping entry right before
//! running, so `pending` only counts timers that have not fired yet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use tourdesk_shared::types::{ConversationId, MessageId};

type TimerKey = (ConversationId, MessageId);
type PendingMap = HashMap<TimerKey, Vec<(u64, JoinHandle<()>)>>;

#[derive(Default)]
pub struct StatusScheduler {
    pending: Arc<Mutex<PendingMap>>,
    next_token: AtomicU64,
}

impl StatusScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, keyed by the message it will update.
    ///
    /// Outside a tokio runtime nothing is scheduled and `false` is returned.
    pub fn schedule<F>(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        delay: Duration,
        task: F,
    ) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!(conversation = %conversation_id, message = %message_id, "No async runtime, status timer skipped");
            return false;
        };
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let key: TimerKey = (conversation_id.clone(), message_id.clone());
        let pending = Arc::clone(&self.pending);

        // Hold the lock across the spawn so the task cannot fire and look
        // for its entry before the entry exists.
        let mut map = lock(&self.pending);
        let task_key = key.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = lock(&pending);
                if let Some(timers) = map.get_mut(&task_key) {
                    timers.retain(|(t, _)| *t != token);
                    if timers.is_empty() {
                        map.remove(&task_key);
                    }
                }
            }
            task();
        });
        map.entry(key).or_default().push((token, handle));
        true
    }

    /// Abort every pending timer for one message. Returns how many were aborted.
    pub fn cancel_message(&self, conversation_id: &ConversationId, message_id: &MessageId) -> usize {
        let key: TimerKey = (conversation_id.clone(), message_id.clone());
        let timers = lock(&self.pending).remove(&key).unwrap_or_default();
        let count = abort_all(timers);
        if count > 0 {
            debug!(conversation = %conversation_id, message = %message_id, count, "Cancelled status timers");
        }
        count
    }

    /// Abort every pending timer of a conversation.
    pub fn cancel_conversation(&self, conversation_id: &ConversationId) -> usize {
        let timers: Vec<_> = {
            let mut map = lock(&self.pending);
            let keys: Vec<TimerKey> = map
                .keys()
                .filter(|(c, _)| c == conversation_id)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|k| map.remove(&k))
                .flatten()
                .collect()
        };
        let count = abort_all(timers);
        if count > 0 {
            debug!(conversation = %conversation_id, count, "Cancelled conversation status timers");
        }
        count
    }

    /// Timers still waiting to fire for one message.
    pub fn pending(&self, conversation_id: &ConversationId, message_id: &MessageId) -> usize {
        let key: TimerKey = (conversation_id.clone(), message_id.clone());
        lock(&self.pending).get(&key).map_or(0, Vec::len)
    }

    pub fn pending_total(&self) -> usize {
        lock(&self.pending).values().map(Vec::len).sum()
    }
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn abort_all(timers: Vec<(u64, JoinHandle<()>)>) -> usize {
    let count = timers.len();
    for (_, handle) in timers {
        handle.abort();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay_and_forgets_itself() {
        let scheduler = StatusScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let (c, m): (ConversationId, MessageId) = ("c1".into(), "m1".into());

        let f = Arc::clone(&fired);
        scheduler.schedule(&c, &m, Duration::from_millis(500), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(scheduler.pending(&c, &m), 1);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_total(), 0);
    }

    #[test]
    fn scheduling_without_a_runtime_is_skipped() {
        let scheduler = StatusScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&fired);
        let scheduled = scheduler.schedule(&"c1".into(), &"m1".into(), Duration::from_millis(1), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!scheduled);
        assert_eq!(scheduler.pending_total(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let scheduler = StatusScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let c: ConversationId = "c1".into();

        for id in ["m1", "m2"] {
            let f = Arc::clone(&fired);
            scheduler.schedule(&c, &id.into(), Duration::from_millis(100), move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }
        let other = Arc::clone(&fired);
        scheduler.schedule(&"c2".into(), &"m3".into(), Duration::from_millis(100), move || {
            other.fetch_add(10, Ordering::SeqCst);
        });

        assert_eq!(scheduler.cancel_message(&c, &"m1".into()), 1);
        assert_eq!(scheduler.cancel_conversation(&c), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }
}
