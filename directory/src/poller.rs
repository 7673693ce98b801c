//! Periodic directory refresh.
//!
//! The poller owns a single background task that ticks on a fixed interval. Every tick fires an
//! independent request (fire-and-forget): requests are not cancelled when a newer one starts and
//! responses are forwarded in arrival order, so a slow response can overwrite a newer one. Each
//! snapshot carries the sequence number of the request that produced it.
//!
//! Dropping the poller (or calling [`DirectoryPoller::stop`]) stops the ticking task. Requests
//! already in flight may still deliver one last snapshot; the receiver decides whether to keep
//! listening.

use std::sync::Arc;
use std::time::Duration;

use mention_protocol::ConversationId;
use mention_protocol::DirectorySnapshot;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::DirectoryProvider;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct DirectoryPoller {
    conversation_id: ConversationId,
    task: JoinHandle<()>,
}

impl DirectoryPoller {
    /// Start polling `provider` for `conversation_id`. The first request is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        provider: Arc<dyn DirectoryProvider>,
        conversation_id: ConversationId,
        interval: Duration,
        snapshot_tx: UnboundedSender<DirectorySnapshot>,
    ) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        tracing::debug!(
            conversation = %conversation_id,
            interval_ms = interval_millis(interval),
            "starting directory poller"
        );
        let task = tokio::spawn(poll_loop(
            provider,
            conversation_id.clone(),
            interval,
            snapshot_tx,
        ));
        Self {
            conversation_id,
            task,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for DirectoryPoller {
    fn drop(&mut self) {
        tracing::debug!(conversation = %self.conversation_id, "stopping directory poller");
        self.task.abort();
    }
}

fn interval_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

async fn poll_loop(
    provider: Arc<dyn DirectoryProvider>,
    conversation_id: ConversationId,
    interval: Duration,
    snapshot_tx: UnboundedSender<DirectorySnapshot>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequence = 0u64;

    loop {
        ticker.tick().await;
        if snapshot_tx.is_closed() {
            tracing::debug!(conversation = %conversation_id, "snapshot receiver closed");
            break;
        }
        sequence += 1;
        spawn_refresh(
            Arc::clone(&provider),
            conversation_id.clone(),
            sequence,
            snapshot_tx.clone(),
        );
    }
}

fn spawn_refresh(
    provider: Arc<dyn DirectoryProvider>,
    conversation_id: ConversationId,
    sequence: u64,
    snapshot_tx: UnboundedSender<DirectorySnapshot>,
) {
    tokio::spawn(async move {
        let request_id = conversation_id.clone();
        let result =
            tokio::task::spawn_blocking(move || provider.list_members(&request_id)).await;
        match result {
            Ok(Ok(entries)) => {
                tracing::trace!(
                    conversation = %conversation_id,
                    sequence,
                    entries = entries.len(),
                    "directory refreshed"
                );
                // The receiver may be gone after the session ended.
                let _ = snapshot_tx.send(DirectorySnapshot {
                    conversation_id,
                    sequence,
                    entries,
                });
            }
            Ok(Err(err)) => {
                tracing::warn!("failed to refresh directory for {conversation_id}: {err:#}");
            }
            Err(err) => {
                tracing::warn!("directory refresh task for {conversation_id} failed: {err}");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mention_protocol::DirectoryEntry;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl DirectoryProvider for CountingProvider {
        fn list_members(
            &self,
            _conversation_id: &ConversationId,
        ) -> anyhow::Result<Vec<DirectoryEntry>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![DirectoryEntry::new(
                format!("p{call}"),
                format!("member {call}"),
            )])
        }
    }

    struct FailingProvider;

    impl DirectoryProvider for FailingProvider {
        fn list_members(
            &self,
            _conversation_id: &ConversationId,
        ) -> anyhow::Result<Vec<DirectoryEntry>> {
            anyhow::bail!("directory unavailable")
        }
    }

    #[tokio::test]
    async fn first_snapshot_arrives_without_waiting_for_interval() {
        let (tx, mut rx) = unbounded_channel();
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let poller = DirectoryPoller::start(
            provider,
            ConversationId::new("lobby"),
            Duration::from_secs(3600),
            tx,
        );

        let snapshot = timeout(WAIT, rx.recv())
            .await
            .expect("snapshot before timeout")
            .expect("channel open");
        assert_eq!(snapshot.conversation_id, ConversationId::new("lobby"));
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.entries, vec![DirectoryEntry::new("p1", "member 1")]);
        assert!(poller.is_running());
    }

    #[tokio::test]
    async fn later_ticks_issue_new_requests() {
        let (tx, mut rx) = unbounded_channel();
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let _poller = DirectoryPoller::start(
            provider,
            ConversationId::new("lobby"),
            Duration::from_millis(10),
            tx,
        );

        let mut sequences = Vec::new();
        while sequences.len() < 3 {
            let snapshot = timeout(WAIT, rx.recv())
                .await
                .expect("snapshot before timeout")
                .expect("channel open");
            sequences.push(snapshot.sequence);
        }
        sequences.sort_unstable();
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_polling_without_snapshots() {
        let (tx, mut rx) = unbounded_channel();
        let poller = DirectoryPoller::start(
            Arc::new(FailingProvider),
            ConversationId::new("lobby"),
            Duration::from_millis(10),
            tx,
        );

        assert!(
            timeout(Duration::from_millis(100), rx.recv())
                .await
                .is_err()
        );
        assert!(poller.is_running());
    }

    #[tokio::test]
    async fn stop_closes_the_channel_once_in_flight_requests_finish() {
        let (tx, mut rx) = unbounded_channel();
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let poller = DirectoryPoller::start(
            provider,
            ConversationId::new("lobby"),
            Duration::from_millis(10),
            tx,
        );
        timeout(WAIT, rx.recv())
            .await
            .expect("snapshot before timeout")
            .expect("channel open");

        poller.stop();

        let drained = timeout(WAIT, async { while rx.recv().await.is_some() {} }).await;
        assert!(drained.is_ok());
    }

    #[test]
    fn interval_millis_saturates_instead_of_wrapping() {
        assert_eq!(interval_millis(Duration::from_secs(10)), 10_000);
        assert_eq!(interval_millis(Duration::MAX), u64::MAX);
    }
}
