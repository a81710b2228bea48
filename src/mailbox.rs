//! Latest-value handoff from the reader thread to any number of consumers

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::stream::ThrottleExt;
use crate::synchronizer::PostDecodeHook;
use crate::types::UpdateRate;

/// Single-slot holder of the most recent record
///
/// [`publish`](Self::publish) swaps the whole record in under the watch
/// channel's lock, so [`snapshot`](Self::snapshot) always clones a complete
/// record, never a half-written one. Before the first publish the snapshot is
/// `R::default()`.
///
/// Polling consumers call `snapshot`; async consumers can
/// [`subscribe`](Self::subscribe) or take a rate-limited
/// [`updates`](Self::updates) stream.
#[derive(Debug)]
pub struct Mailbox<R> {
    slot: watch::Sender<R>,
    published: AtomicU64,
}

impl<R: Default> Default for Mailbox<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Default> Mailbox<R> {
    pub fn new() -> Self {
        Self { slot: watch::Sender::new(R::default()), published: AtomicU64::new(0) }
    }
}

impl<R: Clone + Send + Sync + 'static> Mailbox<R> {
    /// Replace the held record and wake subscribers.
    pub fn publish(&self, record: R) {
        self.slot.send_replace(record);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> R {
        self.slot.borrow().clone()
    }

    /// Number of records published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> watch::Receiver<R> {
        self.slot.subscribe()
    }

    /// Records published after this call, optionally rate limited
    ///
    /// With [`UpdateRate::Max`] intermediate records are skipped and the
    /// latest one is delivered at each tick. The stream ends when the mailbox
    /// is dropped.
    pub fn updates(&self, rate: UpdateRate) -> BoxStream<'static, R> {
        let records = WatchStream::from_changes(self.subscribe());
        match rate.interval() {
            None => records.boxed(),
            Some(period) => records.throttle(period).boxed(),
        }
    }

    /// Post-decode hook publishing every decoded record into this mailbox.
    pub fn hook(self: &Arc<Self>) -> PostDecodeHook<R> {
        let mailbox = Arc::clone(self);
        Arc::new(move |_: &[u8], record: &R| mailbox.publish(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineRecord;
    use std::time::Duration;

    #[test]
    fn snapshot_defaults_before_first_publish() {
        let mailbox = Mailbox::<EngineRecord>::new();
        assert_eq!(mailbox.snapshot(), EngineRecord::default());
        assert_eq!(mailbox.published(), 0);
    }

    #[test]
    fn publish_replaces_whole_record() {
        let mailbox = Mailbox::new();
        mailbox.publish(EngineRecord { rpm: 850, water_temp: 90, ..Default::default() });
        mailbox.publish(EngineRecord { rpm: 3000, ..Default::default() });

        let current = mailbox.snapshot();
        assert_eq!(current.rpm, 3000);
        assert_eq!(current.water_temp, 0);
        assert_eq!(mailbox.published(), 2);
    }

    #[test]
    fn hook_publishes_decoded_record() {
        let mailbox = Arc::new(Mailbox::<Vec<u8>>::new());
        let hook = mailbox.hook();
        hook(&[1, 2, 3], &vec![1, 2]);
        assert_eq!(mailbox.snapshot(), vec![1, 2]);
    }

    #[test]
    fn concurrent_readers_see_complete_records() {
        let mailbox = Arc::new(Mailbox::<Vec<u32>>::new());
        let writer = {
            let mailbox = mailbox.clone();
            std::thread::spawn(move || {
                for n in 0..2_000u32 {
                    mailbox.publish(vec![n; 16]);
                }
            })
        };

        for _ in 0..2_000 {
            let record = mailbox.snapshot();
            if let Some(first) = record.first() {
                assert!(record.iter().all(|v| v == first));
            }
        }
        writer.join().unwrap();
        assert_eq!(mailbox.snapshot(), vec![1_999; 16]);
    }

    #[tokio::test]
    async fn native_updates_yield_new_records() {
        let mailbox = Mailbox::<u32>::new();
        mailbox.publish(1);
        let mut updates = mailbox.updates(UpdateRate::Native);

        mailbox.publish(2);
        assert_eq!(updates.next().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_updates_skip_to_latest() {
        let mailbox = Arc::new(Mailbox::<u32>::new());
        let mut updates = mailbox.updates(UpdateRate::Max(10));

        mailbox.publish(1);
        assert_eq!(updates.next().await, Some(1));

        for n in 2..=6 {
            mailbox.publish(n);
        }
        let next = tokio::time::timeout(Duration::from_secs(1), updates.next()).await.unwrap();
        assert_eq!(next, Some(6));
    }

    #[tokio::test]
    async fn updates_end_with_mailbox() {
        let mailbox = Mailbox::<u32>::new();
        let mut updates = mailbox.updates(UpdateRate::Native);
        drop(mailbox);
        assert_eq!(updates.next().await, None);
    }
}
