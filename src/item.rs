//! Message items and their lifecycle flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaVariant;
use crate::types::{ConversationId, FullItemId, GroupId, MsgId, PeerId, RichText};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("item {0:?} is not awaiting a server id")]
    NotBeingSent(MsgId),

    #[error("item {0:?} already carries a server id")]
    AlreadyConfirmed(MsgId),
}

/// Lifecycle and display flags of an item, packed into one word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFlags(pub u32);

impl MessageFlags {
    pub const HIDE_EDITED: MessageFlags = MessageFlags(1 << 0);
    pub const ADMIN_LOG_ENTRY: MessageFlags = MessageFlags(1 << 1);
    pub const OUTGOING: MessageFlags = MessageFlags(1 << 2);
    pub const PINNED: MessageFlags = MessageFlags(1 << 3);
    pub const MEDIA_IS_UNREAD: MessageFlags = MessageFlags(1 << 4);
    pub const MENTIONS_ME: MessageFlags = MessageFlags(1 << 5);
    pub const IS_OR_WAS_SCHEDULED: MessageFlags = MessageFlags(1 << 6);
    pub const CLIENT_SIDE_UNREAD: MessageFlags = MessageFlags(1 << 7);
    pub const BEING_SENT: MessageFlags = MessageFlags(1 << 8);
    pub const SENDING_FAILED: MessageFlags = MessageFlags(1 << 9);
    pub const HISTORY_ENTRY: MessageFlags = MessageFlags(1 << 10);
    pub const LOCAL: MessageFlags = MessageFlags(1 << 11);
    pub const POST: MessageFlags = MessageFlags(1 << 12);
    pub const SILENT: MessageFlags = MessageFlags(1 << 13);

    pub fn contains(self, other: MessageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: MessageFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: MessageFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for MessageFlags {
    type Output = MessageFlags;

    fn bitor(self, rhs: MessageFlags) -> MessageFlags {
        MessageFlags(self.0 | rhs.0)
    }
}

/// One message in a conversation.
///
/// Items live in the session arena keyed by [`FullItemId`] and never hold
/// references back into it; everything an item method needs beyond its own
/// state arrives as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: MsgId,
    pub conversation: ConversationId,
    pub sender: PeerId,
    pub date: DateTime<Utc>,
    pub edit_date: Option<DateTime<Utc>>,
    pub flags: MessageFlags,
    /// Set when the item is an album member.
    pub group_id: Option<GroupId>,
    pub text: RichText,
    pub media: Option<MediaVariant>,
    /// When set, the item self-destructs at this instant.
    pub ttl_destroy_at: Option<DateTime<Utc>>,
    /// Service notices (unsupported media, TTL placeholders) render as plain
    /// text and are excluded from regular-history queries.
    pub service: bool,
}

impl Item {
    pub fn full_id(&self) -> FullItemId {
        FullItemId::new(self.conversation, self.id)
    }

    /// A regular history entry: shown in the timeline, counted by unread
    /// logic, eligible for shared-media indexing.
    pub fn is_regular(&self) -> bool {
        self.flags.contains(MessageFlags::HISTORY_ENTRY)
            && !self.flags.contains(MessageFlags::IS_OR_WAS_SCHEDULED)
            && !self.service
    }

    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    pub fn being_sent(&self) -> bool {
        self.flags.contains(MessageFlags::BEING_SENT)
    }

    /// Confirms the server-assigned id for a locally composed item.
    ///
    /// Only valid while the item is awaiting send confirmation with a
    /// client-range id; the transition happens at most once.
    pub fn set_real_id(&mut self, new_id: MsgId) -> Result<(), ItemError> {
        if !self.flags.contains(MessageFlags::BEING_SENT) {
            return Err(ItemError::NotBeingSent(self.id));
        }
        if !self.id.is_local() {
            return Err(ItemError::AlreadyConfirmed(self.id));
        }
        self.id = new_id;
        self.flags.remove(MessageFlags::BEING_SENT);
        self.flags.remove(MessageFlags::LOCAL);
        Ok(())
    }

    /// Edit timestamp shown to the user, `None` when the edited badge is
    /// suppressed.
    pub fn edited_date(&self) -> Option<DateTime<Utc>> {
        if self.hide_edited_badge() {
            None
        } else {
            self.edit_date
        }
    }

    pub fn hide_edited_badge(&self) -> bool {
        self.flags.contains(MessageFlags::HIDE_EDITED)
    }

    /// Records a failed send attempt. The item keeps its local id and can
    /// re-enter the sending state on retry.
    pub fn mark_sending_failed(&mut self) {
        self.flags.remove(MessageFlags::BEING_SENT);
        self.flags.insert(MessageFlags::SENDING_FAILED);
    }

    pub fn retry_send(&mut self) {
        self.flags.remove(MessageFlags::SENDING_FAILED);
        self.flags.insert(MessageFlags::BEING_SENT);
    }

    /// Whether the item counts as unread for `is_self_chat` conversations
    /// and regular ones. Outgoing messages are implicitly read; in the
    /// self-chat everything is read unless it was scheduled.
    pub fn unread(&self, is_self_chat: bool) -> bool {
        if self.flags.contains(MessageFlags::OUTGOING) {
            return false;
        }
        if is_self_chat {
            return self.flags.contains(MessageFlags::IS_OR_WAS_SCHEDULED)
                && self.flags.contains(MessageFlags::CLIENT_SIDE_UNREAD);
        }
        self.flags.contains(MessageFlags::CLIENT_SIDE_UNREAD)
            || self.flags.contains(MessageFlags::MEDIA_IS_UNREAD)
    }

    /// Arms self-destruction `ttl_seconds` from the item date.
    pub fn apply_ttl(&mut self, ttl_seconds: u32) {
        self.ttl_destroy_at = Some(self.date + chrono::Duration::seconds(i64::from(ttl_seconds)));
    }

    pub fn ttl_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.ttl_destroy_at, Some(at) if at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LOCAL_ID_BASE;
    use chrono::Duration;

    fn local_item() -> Item {
        Item {
            id: MsgId(LOCAL_ID_BASE + 1),
            conversation: ConversationId(10),
            sender: PeerId(1),
            date: Utc::now(),
            edit_date: None,
            flags: MessageFlags::BEING_SENT
                | MessageFlags::LOCAL
                | MessageFlags::OUTGOING
                | MessageFlags::HISTORY_ENTRY,
            group_id: None,
            text: RichText::plain("hi"),
            media: None,
            ttl_destroy_at: None,
            service: false,
        }
    }

    #[test]
    fn test_flag_set_operations() {
        let mut flags = MessageFlags::default();
        flags.insert(MessageFlags::PINNED | MessageFlags::SILENT);
        assert!(flags.contains(MessageFlags::PINNED));
        assert!(flags.contains(MessageFlags::SILENT));
        assert!(!flags.contains(MessageFlags::PINNED | MessageFlags::OUTGOING));
        flags.remove(MessageFlags::PINNED);
        assert!(!flags.contains(MessageFlags::PINNED));
        assert!(flags.contains(MessageFlags::SILENT));
    }

    #[test]
    fn test_set_real_id_happy_path() {
        let mut item = local_item();
        item.set_real_id(MsgId(42)).unwrap();
        assert_eq!(item.id, MsgId(42));
        assert!(!item.being_sent());
        assert!(!item.flags.contains(MessageFlags::LOCAL));
        // The transition can only happen once.
        assert_eq!(
            item.set_real_id(MsgId(43)),
            Err(ItemError::NotBeingSent(MsgId(42)))
        );
    }

    #[test]
    fn test_set_real_id_requires_being_sent() {
        let mut item = local_item();
        item.flags.remove(MessageFlags::BEING_SENT);
        assert_eq!(
            item.set_real_id(MsgId(42)),
            Err(ItemError::NotBeingSent(item.id))
        );
    }

    #[test]
    fn test_set_real_id_requires_local_range() {
        let mut item = local_item();
        item.id = MsgId(7);
        assert_eq!(
            item.set_real_id(MsgId(42)),
            Err(ItemError::AlreadyConfirmed(MsgId(7)))
        );
    }

    #[test]
    fn test_outgoing_is_implicitly_read() {
        let mut item = local_item();
        item.flags.insert(MessageFlags::CLIENT_SIDE_UNREAD);
        assert!(!item.unread(false));
    }

    #[test]
    fn test_self_chat_read_unless_scheduled() {
        let mut item = local_item();
        item.flags.remove(MessageFlags::OUTGOING);
        item.flags.insert(MessageFlags::CLIENT_SIDE_UNREAD);
        assert!(item.unread(false));
        assert!(!item.unread(true));
        item.flags.insert(MessageFlags::IS_OR_WAS_SCHEDULED);
        assert!(item.unread(true));
    }

    #[test]
    fn test_failed_send_can_retry() {
        let mut item = local_item();
        item.mark_sending_failed();
        assert!(!item.being_sent());
        assert!(item.flags.contains(MessageFlags::SENDING_FAILED));
        // A failed item cannot be confirmed until the send is retried.
        assert!(item.set_real_id(MsgId(42)).is_err());
        item.retry_send();
        assert!(item.set_real_id(MsgId(42)).is_ok());
    }

    #[test]
    fn test_edited_badge_suppression() {
        let mut item = local_item();
        assert!(item.edited_date().is_none());
        item.edit_date = Some(item.date + Duration::seconds(5));
        assert!(item.edited_date().is_some());
        item.flags.insert(MessageFlags::HIDE_EDITED);
        assert!(item.edited_date().is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let mut item = local_item();
        assert!(!item.ttl_expired(Utc::now()));
        item.apply_ttl(60);
        assert!(!item.ttl_expired(item.date + Duration::seconds(59)));
        assert!(item.ttl_expired(item.date + Duration::seconds(60)));
    }
}
