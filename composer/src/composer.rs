//! The composer is the mention-aware input state machine.
//!
//! It is responsible for:
//!
//! - Routing keys to the autocomplete list while it is presenting candidates.
//! - Keeping mention handles atomic for caret movement and deletion.
//! - Handling submit vs commit on Enter.
//! - Encoding mention handles and handing the finished message to the send sink.
//!
//! # Key Event Routing
//!
//! Key handling goes through [`Composer::handle_key_event`], which dispatches to
//! `handle_key_event_with_candidates` while the autocomplete list has candidates and otherwise to
//! `handle_key_event_without_candidates`. After every handled event we call `sync_autocomplete`
//! so the list follows the latest buffer and caret.
//!
//! Every event is processed to completion through `&mut self` before the next one is accepted.
//! An edit made while committing a candidate is therefore never observed half-applied, and the
//! single `sync_autocomplete` pass at the end of the chain is the only place the controller is
//! re-evaluated.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use mention_protocol::AttachmentRef;
use mention_protocol::ConversationId;
use mention_protocol::DirectoryEntry;
use mention_protocol::DirectorySnapshot;
use mention_protocol::LinkPreview;
use mention_protocol::OutgoingMessage;
use mention_protocol::QuoteRef;
use mention_protocol::Selection;
use mention_protocol::SendError;
use tokio::sync::mpsc::UnboundedSender;

use crate::autocomplete::AutocompleteController;
use crate::config::ComposerConfig;
use crate::cursor;
use crate::cursor::DeleteDirection;
use crate::cursor::MoveDirection;
use crate::event::ComposerEvent;
use crate::registry::MentionRegistry;
use crate::surface::TextSurface;

/// Outbound send path for finished messages.
pub trait MessageSink {
    fn send(&mut self, message: OutgoingMessage) -> Result<(), SendError>;
}

impl MessageSink for UnboundedSender<OutgoingMessage> {
    fn send(&mut self, message: OutgoingMessage) -> Result<(), SendError> {
        UnboundedSender::send(self, message)
            .map_err(|_| SendError::Rejected("outgoing message channel closed".to_string()))
    }
}

impl MessageSink for Vec<OutgoingMessage> {
    fn send(&mut self, message: OutgoingMessage) -> Result<(), SendError> {
        self.push(message);
        Ok(())
    }
}

/// Result returned from [`Composer::handle_key_event`] and [`Composer::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    /// A candidate was committed into the buffer.
    Committed { handle: String },
    /// The message was handed to the sink and the composer was cleared.
    Sent,
    None,
}

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("failed to send message: {0}")]
    Send(#[from] SendError),
}

pub struct Composer<S, K> {
    config: ComposerConfig,
    conversation_id: ConversationId,
    surface: S,
    sink: K,
    registry: MentionRegistry,
    autocomplete: AutocompleteController,
    directory: Vec<DirectoryEntry>,
    directory_sequence: Option<u64>,
    attachments: Vec<AttachmentRef>,
    quote: Option<QuoteRef>,
    link_preview: Option<LinkPreview>,
}

impl<S: TextSurface, K: MessageSink> Composer<S, K> {
    pub fn new(config: ComposerConfig, conversation_id: ConversationId, surface: S, sink: K) -> Self {
        let registry = MentionRegistry::new(config.marker);
        let autocomplete =
            AutocompleteController::new(config.marker, config.placeholder_name.clone());
        let mut this = Self {
            config,
            conversation_id,
            surface,
            sink,
            registry,
            autocomplete,
            directory: Vec::new(),
            directory_sequence: None,
            attachments: Vec::new(),
            quote: None,
            link_preview: None,
        };
        this.sync_autocomplete();
        this
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn text(&self) -> &str {
        self.surface.text()
    }

    pub fn selection(&self) -> Selection {
        self.surface.selection()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access to the surface. Follow any edit with [`ComposerEvent::TextChanged`] or
    /// [`ComposerEvent::SelectionChanged`] so the autocomplete state catches up.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn registry(&self) -> &MentionRegistry {
        &self.registry
    }

    pub fn autocomplete(&self) -> &AutocompleteController {
        &self.autocomplete
    }

    pub fn directory(&self) -> &[DirectoryEntry] {
        &self.directory
    }

    /// Sequence of the last applied polled snapshot, if any.
    pub fn directory_sequence(&self) -> Option<u64> {
        self.directory_sequence
    }

    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    pub fn attach(&mut self, attachment: AttachmentRef) {
        self.attachments.push(attachment);
    }

    pub fn quote(&self) -> Option<&QuoteRef> {
        self.quote.as_ref()
    }

    pub fn set_quote(&mut self, quote: Option<QuoteRef>) {
        self.quote = quote;
    }

    pub fn link_preview(&self) -> Option<&LinkPreview> {
        self.link_preview.as_ref()
    }

    pub fn set_link_preview(&mut self, link_preview: Option<LinkPreview>) {
        self.link_preview = link_preview;
    }

    pub fn handle_event(&mut self, event: ComposerEvent) -> Result<InputResult, ComposerError> {
        match event {
            ComposerEvent::Key(key_event) => self.handle_key_event(key_event),
            ComposerEvent::Paste(pasted) => {
                self.handle_paste(pasted);
                Ok(InputResult::None)
            }
            ComposerEvent::TextChanged | ComposerEvent::SelectionChanged => {
                self.sync_autocomplete();
                Ok(InputResult::None)
            }
            ComposerEvent::Directory(snapshot) => {
                self.on_directory_snapshot(snapshot);
                Ok(InputResult::None)
            }
            ComposerEvent::Submit => self.submit(),
        }
    }

    /// Handle a key event coming from the front end.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<InputResult, ComposerError> {
        if !matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return Ok(InputResult::None);
        }

        let result = if self.autocomplete.is_presenting() {
            self.handle_key_event_with_candidates(key_event)
        } else {
            self.handle_key_event_without_candidates(key_event)
        };

        // Update (or close) the autocomplete list after processing the key. A commit leaves the
        // list closed even when the caret ends up right after the new handle.
        if !is_commit(&result) {
            self.sync_autocomplete();
        }

        result
    }

    /// Send the current draft, or commit the highlighted candidate while the list is presenting.
    ///
    /// An empty draft without attachments is not sent; whitespace counts as content. When the
    /// sink fails the draft, mentions and context are left exactly as they were.
    pub fn submit(&mut self) -> Result<InputResult, ComposerError> {
        let result = self.handle_submission();
        if !is_commit(&result) {
            self.sync_autocomplete();
        }
        result
    }

    pub fn handle_paste(&mut self, pasted: String) {
        self.surface.insert_str(&pasted);
        self.sync_autocomplete();
    }

    pub fn on_directory_snapshot(&mut self, snapshot: DirectorySnapshot) {
        if snapshot.conversation_id != self.conversation_id {
            tracing::trace!(
                "ignoring directory snapshot for {} in {}",
                snapshot.conversation_id,
                self.conversation_id
            );
            return;
        }
        self.directory_sequence = Some(snapshot.sequence);
        self.set_directory(snapshot.entries);
    }

    pub fn set_directory(&mut self, entries: Vec<DirectoryEntry>) {
        self.directory = entries;
        self.sync_autocomplete();
    }

    /// Clear the draft, its mentions and its context.
    pub fn reset(&mut self) {
        self.surface.set_text("");
        self.surface.set_selection(Selection::caret(0));
        self.registry.clear();
        self.autocomplete.reset();
        self.attachments.clear();
        self.quote = None;
        self.link_preview = None;
    }

    /// Handle key events while the autocomplete list has candidates.
    fn handle_key_event_with_candidates(
        &mut self,
        key_event: KeyEvent,
    ) -> Result<InputResult, ComposerError> {
        match key_event {
            KeyEvent {
                code: KeyCode::Up, ..
            } => {
                self.autocomplete.move_up();
                Ok(InputResult::None)
            }
            KeyEvent {
                code: KeyCode::Down,
                ..
            } => {
                self.autocomplete.move_down();
                Ok(InputResult::None)
            }
            KeyEvent {
                code: KeyCode::Tab, ..
            } => Ok(self.commit_selected()),
            input => self.handle_key_event_without_candidates(input),
        }
    }

    fn handle_key_event_without_candidates(
        &mut self,
        key_event: KeyEvent,
    ) -> Result<InputResult, ComposerError> {
        match key_event {
            KeyEvent {
                code: KeyCode::Enter,
                modifiers,
                ..
            } if !modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT | KeyModifiers::CONTROL) =>
            {
                self.handle_submission()
            }
            KeyEvent {
                code: KeyCode::Left,
                modifiers,
                ..
            } => {
                self.move_caret(MoveDirection::Left, modifiers);
                Ok(InputResult::None)
            }
            KeyEvent {
                code: KeyCode::Right,
                modifiers,
                ..
            } => {
                self.move_caret(MoveDirection::Right, modifiers);
                Ok(InputResult::None)
            }
            KeyEvent {
                code: KeyCode::Backspace,
                ..
            } => {
                self.delete(DeleteDirection::Backward, key_event);
                Ok(InputResult::None)
            }
            KeyEvent {
                code: KeyCode::Delete,
                ..
            } => {
                self.delete(DeleteDirection::Forward, key_event);
                Ok(InputResult::None)
            }
            input => {
                self.surface.input(input);
                Ok(InputResult::None)
            }
        }
    }

    fn handle_submission(&mut self) -> Result<InputResult, ComposerError> {
        if let Some(entry) = self.autocomplete.selected_candidate().cloned() {
            return Ok(self.commit_candidate(&entry));
        }

        let text = self.surface.text();
        if text.is_empty() && self.attachments.is_empty() {
            return Ok(InputResult::None);
        }

        let mentions = self.registry.active_mentions(text);
        let message = OutgoingMessage {
            conversation_id: self.conversation_id.clone(),
            text: mentions.encode(text),
            attachments: self.attachments.clone(),
            quote: self.quote.clone(),
            link_preview: self.link_preview.clone(),
        };
        if let Err(err) = self.sink.send(message) {
            tracing::warn!("failed to send message to {}: {err}", self.conversation_id);
            return Err(err.into());
        }

        tracing::debug!(
            conversation = %self.conversation_id,
            mentions = mentions.len(),
            attachments = self.attachments.len(),
            "message sent"
        );
        self.reset();
        Ok(InputResult::Sent)
    }

    fn commit_selected(&mut self) -> InputResult {
        let Some(entry) = self.autocomplete.selected_candidate().cloned() else {
            return InputResult::None;
        };
        self.commit_candidate(&entry)
    }

    fn commit_candidate(&mut self, entry: &DirectoryEntry) -> InputResult {
        let caret = self.surface.selection().end;
        let Some(edit) = self.autocomplete.commit(
            entry,
            &mut self.registry,
            self.surface.text(),
            caret,
            self.config.separator,
        ) else {
            return InputResult::None;
        };
        self.surface.set_text(&edit.text);
        self.surface.set_selection(Selection::caret(edit.caret));
        InputResult::Committed {
            handle: edit.handle,
        }
    }

    fn move_caret(&mut self, direction: MoveDirection, modifiers: KeyModifiers) {
        let text = self.surface.text();
        let mentions = self.registry.active_mentions(text);
        let selection = cursor::move_caret(
            text,
            self.surface.selection(),
            direction,
            modifiers.into(),
            &mentions,
        );
        self.surface.set_selection(selection);
    }

    fn delete(&mut self, direction: DeleteDirection, key_event: KeyEvent) {
        let deletion = {
            let text = self.surface.text();
            let mentions = self.registry.active_mentions(text);
            cursor::delete_mention(text, self.surface.selection(), direction, &mentions)
        };
        let Some(deletion) = deletion else {
            self.surface.input(key_event);
            return;
        };

        self.surface.set_text(&deletion.text);
        self.surface.set_selection(Selection::caret(deletion.caret));
        // Other occurrences of the same handle lose their mapping too.
        self.registry.remove(&deletion.handle);
        tracing::debug!(handle = %deletion.handle, id = %deletion.id, "deleted mention");
    }

    fn sync_autocomplete(&mut self) {
        let text = self.surface.text();
        let selection = self.surface.selection().normalized(text);
        let caret = selection.is_collapsed().then_some(selection.start);
        self.autocomplete.sync(text, caret, &self.directory);
    }
}

fn is_commit(result: &Result<InputResult, ComposerError>) -> bool {
    matches!(result, Ok(InputResult::Committed { .. }))
}
