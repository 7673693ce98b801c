//! A composition session: one composer plus the directory feed that serves it.
//!
//! Group conversations read their roster once when the session starts. Public conversations are
//! polled for the whole session; the poller and the snapshot channel are owned here and are torn
//! down together by [`ComposerSession::end`] (or by dropping the session).

use std::sync::Arc;

use mention_directory::DirectoryPoller;
use mention_directory::DirectoryProvider;
use mention_protocol::DirectorySnapshot;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::unbounded_channel;

use crate::composer::Composer;
use crate::composer::ComposerError;
use crate::composer::InputResult;
use crate::composer::MessageSink;
use crate::event::ComposerEvent;
use crate::surface::TextSurface;

pub enum DirectorySource {
    /// Read once at session start.
    Static(Arc<dyn DirectoryProvider>),
    /// Refreshed every `poll_interval_secs` for the lifetime of the session.
    Polled(Arc<dyn DirectoryProvider>),
}

pub struct ComposerSession<S, K> {
    composer: Composer<S, K>,
    poller: Option<DirectoryPoller>,
    snapshot_rx: Option<UnboundedReceiver<DirectorySnapshot>>,
}

impl<S: TextSurface, K: MessageSink> ComposerSession<S, K> {
    /// Start a session. A polled source must be started from within a tokio runtime.
    ///
    /// A static directory that fails to load leaves the composer with an empty directory.
    pub fn start(mut composer: Composer<S, K>, source: DirectorySource) -> Self {
        match source {
            DirectorySource::Static(provider) => {
                match provider.list_members(composer.conversation_id()) {
                    Ok(entries) => composer.set_directory(entries),
                    Err(err) => tracing::warn!(
                        "failed to load directory for {}: {err:#}",
                        composer.conversation_id()
                    ),
                }
                Self {
                    composer,
                    poller: None,
                    snapshot_rx: None,
                }
            }
            DirectorySource::Polled(provider) => {
                let (snapshot_tx, snapshot_rx) = unbounded_channel();
                let poller = DirectoryPoller::start(
                    provider,
                    composer.conversation_id().clone(),
                    composer.config().poll_interval(),
                    snapshot_tx,
                );
                Self {
                    composer,
                    poller: Some(poller),
                    snapshot_rx: Some(snapshot_rx),
                }
            }
        }
    }

    pub fn composer(&self) -> &Composer<S, K> {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer<S, K> {
        &mut self.composer
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(DirectoryPoller::is_running)
    }

    pub fn handle_event(&mut self, event: ComposerEvent) -> Result<InputResult, ComposerError> {
        self.composer.handle_event(event)
    }

    /// Wait for the next polled snapshot. Never resolves for a static directory.
    pub async fn next_directory_snapshot(&mut self) -> Option<DirectorySnapshot> {
        match self.snapshot_rx.as_mut() {
            Some(snapshot_rx) => snapshot_rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Stop polling and hand the composer back.
    pub fn end(mut self) -> Composer<S, K> {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(mut snapshot_rx) = self.snapshot_rx.take() {
            snapshot_rx.close();
        }
        tracing::debug!(
            conversation = %self.composer.conversation_id(),
            "composition session ended"
        );
        self.composer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComposerConfig;
    use crate::surface::TextBuffer;
    use crossterm::event::KeyCode;
    use crossterm::event::KeyEvent;
    use crossterm::event::KeyModifiers;
    use mention_directory::StaticRoster;
    use mention_protocol::ConversationId;
    use mention_protocol::DirectoryEntry;
    use mention_protocol::OutgoingMessage;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    struct FailingProvider;

    impl DirectoryProvider for FailingProvider {
        fn list_members(
            &self,
            _conversation_id: &ConversationId,
        ) -> anyhow::Result<Vec<DirectoryEntry>> {
            anyhow::bail!("directory offline")
        }
    }

    fn composer() -> Composer<TextBuffer, Vec<OutgoingMessage>> {
        Composer::new(
            ComposerConfig::default(),
            ConversationId::new("lobby"),
            TextBuffer::new(),
            Vec::new(),
        )
    }

    fn roster() -> Arc<StaticRoster> {
        Arc::new(StaticRoster::new().with_conversation(
            ConversationId::new("lobby"),
            vec![
                DirectoryEntry::new("p1", "alice"),
                DirectoryEntry::new("p2", "bob"),
            ],
        ))
    }

    #[test]
    fn static_directory_is_loaded_at_start() {
        let mut session = ComposerSession::start(composer(), DirectorySource::Static(roster()));
        assert!(!session.is_polling());
        assert_eq!(session.composer().directory().len(), 2);

        session
            .handle_event(ComposerEvent::Key(KeyEvent::new(
                KeyCode::Char('@'),
                KeyModifiers::NONE,
            )))
            .expect("key");
        assert_eq!(session.composer().autocomplete().candidates().len(), 2);
    }

    #[test]
    fn static_directory_failure_starts_empty() {
        let session = ComposerSession::start(
            composer(),
            DirectorySource::Static(Arc::new(FailingProvider)),
        );
        assert!(session.composer().directory().is_empty());
    }

    #[tokio::test]
    async fn polled_directory_feeds_snapshots_until_end() {
        let mut session = ComposerSession::start(composer(), DirectorySource::Polled(roster()));
        assert!(session.is_polling());

        let snapshot = timeout(WAIT, session.next_directory_snapshot())
            .await
            .expect("snapshot before timeout")
            .expect("channel open");
        assert_eq!(snapshot.sequence, 1);
        session
            .handle_event(ComposerEvent::Directory(snapshot))
            .expect("snapshot applied");
        assert_eq!(session.composer().directory().len(), 2);
        assert_eq!(session.composer().directory_sequence(), Some(1));

        let composer = session.end();
        assert_eq!(composer.directory().len(), 2);
    }

    #[tokio::test]
    async fn static_session_never_yields_snapshots() {
        let mut session = ComposerSession::start(composer(), DirectorySource::Static(roster()));
        assert!(
            timeout(Duration::from_millis(50), session.next_directory_snapshot())
                .await
                .is_err()
        );
    }
}
