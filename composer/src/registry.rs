//! Handle <-> participant bookkeeping for one composition session.
//!
//! Committing an autocomplete candidate registers its handle (`@` + display name). The buffer is
//! edited freely afterwards, so the set of mentions that still matter is always recomputed from
//! the live text with [`MentionRegistry::active_mentions`].
//!
//! Handles are keys: registering a second participant under an already used display name
//! replaces the earlier mapping.

use std::collections::HashMap;
use std::ops::Range;

use mention_protocol::ParticipantId;
use mention_protocol::wire;

/// A registered handle and the participant it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub handle: String,
    pub id: ParticipantId,
}

#[derive(Debug, Clone)]
pub struct MentionRegistry {
    marker: char,
    mentions: HashMap<String, ParticipantId>,
}

impl MentionRegistry {
    pub fn new(marker: char) -> Self {
        Self {
            marker,
            mentions: HashMap::new(),
        }
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// Register `display_name` for `id` and return the handle to insert into the buffer.
    pub fn register(&mut self, display_name: &str, id: ParticipantId) -> String {
        let handle = format!("{}{display_name}", self.marker);
        if let Some(previous) = self.mentions.get(&handle)
            && previous != &id
        {
            tracing::debug!("handle {handle} now refers to {id} instead of {previous}");
        }
        self.mentions.insert(handle.clone(), id);
        handle
    }

    pub fn get(&self, handle: &str) -> Option<&ParticipantId> {
        self.mentions.get(handle)
    }

    pub fn remove(&mut self, handle: &str) -> Option<ParticipantId> {
        self.mentions.remove(handle)
    }

    pub fn clear(&mut self) {
        self.mentions.clear();
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// Registered handles that still occur verbatim somewhere in `text`.
    pub fn active_mentions(&self, text: &str) -> ActiveMentions {
        let mut mentions: Vec<Mention> = self
            .mentions
            .iter()
            .filter(|(handle, _)| text.contains(handle.as_str()))
            .map(|(handle, id)| Mention {
                handle: handle.clone(),
                id: id.clone(),
            })
            .collect();
        // Longest first so that `@alice` wins over `@al`; ties broken by handle for determinism.
        mentions.sort_by(|a, b| {
            b.handle
                .len()
                .cmp(&a.handle.len())
                .then_with(|| a.handle.cmp(&b.handle))
        });
        ActiveMentions {
            marker: self.marker,
            mentions,
        }
    }

    /// Rewrite every active handle in `text` to its transmission token.
    pub fn encode(&self, text: &str) -> String {
        self.active_mentions(text).encode(text)
    }
}

/// The subset of registered mentions present in a particular buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveMentions {
    marker: char,
    mentions: Vec<Mention>,
}

impl ActiveMentions {
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mention> {
        self.mentions.iter()
    }

    pub fn get(&self, handle: &str) -> Option<&ParticipantId> {
        self.mentions
            .iter()
            .find(|mention| mention.handle == handle)
            .map(|mention| &mention.id)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.get(handle).is_some()
    }

    /// The mention whose handle starts exactly at byte offset `pos`.
    pub fn starting_at(&self, text: &str, pos: usize) -> Option<&Mention> {
        let rest = text.get(pos..)?;
        self.mentions
            .iter()
            .find(|mention| rest.starts_with(mention.handle.as_str()))
    }

    /// The mention whose handle ends exactly at byte offset `pos`.
    pub fn ending_at(&self, text: &str, pos: usize) -> Option<&Mention> {
        let head = text.get(..pos)?;
        self.mentions
            .iter()
            .find(|mention| head.ends_with(mention.handle.as_str()))
    }

    /// Byte ranges of the mention runs in `text`, left to right and non-overlapping.
    ///
    /// Where two handles overlap the one found first while scanning wins.
    pub fn runs(&self, text: &str) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        if self.mentions.is_empty() {
            return runs;
        }

        let mut index = 0usize;
        while index < text.len() {
            let rest = &text[index..];
            if rest.starts_with(self.marker)
                && let Some(mention) = self
                    .mentions
                    .iter()
                    .find(|mention| rest.starts_with(mention.handle.as_str()))
            {
                runs.push(index..index + mention.handle.len());
                index += mention.handle.len();
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            index += ch.len_utf8();
        }
        runs
    }

    pub fn encode(&self, text: &str) -> String {
        wire::encode_tokens(
            text,
            self.marker,
            self.mentions
                .iter()
                .map(|mention| (mention.handle.as_str(), &mention.id)),
        )
    }
}
