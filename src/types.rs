use serde::{Deserialize, Serialize};

/// First identifier in the client-local range.
///
/// Ids below this value belong to the server; ids at or above it are assigned
/// locally to messages that have not completed a round-trip yet. A message
/// leaves the local range exactly once, via [`crate::Murmur::set_real_id`].
pub const LOCAL_ID_BASE: i64 = 0x3FFF_FFFF;

/// Message identifier within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MsgId(pub i64);

impl MsgId {
    /// Whether this id was assigned by the server.
    pub fn is_server(self) -> bool {
        self.0 > 0 && self.0 < LOCAL_ID_BASE
    }

    /// Whether this id is still in the client-local range.
    pub fn is_local(self) -> bool {
        self.0 >= LOCAL_ID_BASE
    }
}

/// Identifier of a conversation (chat, channel or self-chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

/// Identifier of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub i64);

/// Album grouping identifier shared by sibling items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

/// Globally unique message address: conversation plus message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FullItemId {
    pub conversation: ConversationId,
    pub msg: MsgId,
}

impl FullItemId {
    pub fn new(conversation: ConversationId, msg: MsgId) -> Self {
        Self { conversation, msg }
    }
}

/// Message text with inline formatting entities.
///
/// Text shaping and measurement belong to the rendering collaborator; this
/// type only carries the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub text: String,
    pub entities: Vec<TextEntity>,
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One formatting span inside a [`RichText`], addressed in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEntity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Bold,
    Italic,
    Code,
    Link,
    Mention,
}

/// What kinds of content a target conversation accepts.
///
/// Consulted by [`crate::media::MediaVariant::error_text_for_forward`]; the
/// permission source of truth lives with the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPolicy {
    pub allow_media: bool,
    pub allow_stickers: bool,
    pub allow_gifs: bool,
    pub allow_games: bool,
    pub allow_polls: bool,
}

impl Default for ConversationPolicy {
    fn default() -> Self {
        Self {
            allow_media: true,
            allow_stickers: true,
            allow_gifs: true,
            allow_games: true,
            allow_polls: true,
        }
    }
}

/// Index tag reported to the shared-media indexing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SharedMediaType {
    Photo,
    Video,
    File,
    MusicFile,
    VoiceFile,
    Gif,
    Link,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_id_ranges() {
        assert!(MsgId(1).is_server());
        assert!(MsgId(LOCAL_ID_BASE - 1).is_server());
        assert!(!MsgId(LOCAL_ID_BASE).is_server());
        assert!(MsgId(LOCAL_ID_BASE).is_local());
        assert!(MsgId(LOCAL_ID_BASE + 42).is_local());
        assert!(!MsgId(0).is_server());
        assert!(!MsgId(-5).is_server());
    }

    #[test]
    fn test_rich_text_plain() {
        let text = RichText::plain("hello");
        assert_eq!(text.text, "hello");
        assert!(text.entities.is_empty());
        assert!(!text.is_empty());
        assert!(RichText::default().is_empty());
    }

    #[test]
    fn test_policy_default_allows_everything() {
        let policy = ConversationPolicy::default();
        assert!(policy.allow_media);
        assert!(policy.allow_stickers);
        assert!(policy.allow_gifs);
        assert!(policy.allow_games);
        assert!(policy.allow_polls);
    }
}
