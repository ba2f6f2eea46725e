//! Incoming message payloads and their translation into items.
//!
//! The transport collaborator hands us already-parsed payloads; this module
//! decides what kind of item they become. Payloads the client cannot render
//! degrade to service notices instead of being dropped, so history never
//! develops holes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{
    CallRecord, ContactData, DiceRoll, DocumentRef, GameData, InvoiceData, LocationData,
    PhotoRef, PollData, WebPageData,
};
use crate::item::{Item, MessageFlags};
use crate::media::MediaVariant;
use crate::types::{ConversationId, GroupId, MsgId, PeerId, RichText};

/// Shown for a media payload of a kind this client version does not know.
pub const UNSUPPORTED_MEDIA_TEXT: &str =
    "This message is not supported by your version of the app.";

/// Shown when the server sent a media envelope with no content inside.
pub const EMPTY_MEDIA_TEXT: &str = "Message unavailable";

pub const TTL_PHOTO_TEXT: &str = "Self-destructing photo";
pub const TTL_FILE_TEXT: &str = "Self-destructing file";

/// Media payload as it arrives from the transport. `Photo` and `Document`
/// envelopes can legally be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMedia {
    Photo(Option<PhotoRef>),
    Document(Option<DocumentRef>),
    Contact(ContactData),
    Location(LocationData),
    Call(CallRecord),
    WebPage(WebPageData),
    Game(GameData),
    Invoice(InvoiceData),
    Poll(PollData),
    Dice(DiceRoll),
    Unsupported,
}

/// One message as delivered by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: MsgId,
    pub conversation: ConversationId,
    pub sender: PeerId,
    pub date: DateTime<Utc>,
    pub edit_date: Option<DateTime<Utc>>,
    pub outgoing: bool,
    pub silent: bool,
    pub post: bool,
    pub mentions_me: bool,
    pub media_unread: bool,
    pub grouped_id: Option<GroupId>,
    pub text: RichText,
    pub media: Option<WireMedia>,
    pub ttl_seconds: Option<u32>,
}

/// What a wire payload turns into on this client.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaConstruction {
    /// Renderable media.
    Media(MediaVariant),
    /// A plain service line replacing the media.
    Notice(&'static str),
}

/// Classifies a media payload. Self-destructing photos and documents never
/// materialize as media; they arrive pre-expired as a notice plus a TTL.
pub fn construct_media(media: &WireMedia, ttl_seconds: Option<u32>) -> MediaConstruction {
    match media {
        WireMedia::Photo(None) | WireMedia::Document(None) => {
            MediaConstruction::Notice(EMPTY_MEDIA_TEXT)
        }
        WireMedia::Unsupported => MediaConstruction::Notice(UNSUPPORTED_MEDIA_TEXT),
        WireMedia::Photo(Some(photo)) => {
            if ttl_seconds.is_some() {
                MediaConstruction::Notice(TTL_PHOTO_TEXT)
            } else {
                MediaConstruction::Media(MediaVariant::Photo(photo.clone()))
            }
        }
        WireMedia::Document(Some(document)) => {
            if ttl_seconds.is_some() {
                MediaConstruction::Notice(TTL_FILE_TEXT)
            } else {
                MediaConstruction::Media(MediaVariant::File(document.clone()))
            }
        }
        WireMedia::Contact(contact) => {
            MediaConstruction::Media(MediaVariant::Contact(contact.clone()))
        }
        WireMedia::Location(location) => {
            MediaConstruction::Media(MediaVariant::Location(location.clone()))
        }
        WireMedia::Call(call) => MediaConstruction::Media(MediaVariant::Call(call.clone())),
        WireMedia::WebPage(page) => {
            MediaConstruction::Media(MediaVariant::WebPage(page.clone()))
        }
        WireMedia::Game(game) => MediaConstruction::Media(MediaVariant::Game(game.clone())),
        WireMedia::Invoice(invoice) => {
            MediaConstruction::Media(MediaVariant::Invoice(invoice.clone()))
        }
        WireMedia::Poll(poll) => MediaConstruction::Media(MediaVariant::Poll(poll.clone())),
        WireMedia::Dice(dice) => MediaConstruction::Media(MediaVariant::Dice(dice.clone())),
    }
}

impl WireMessage {
    fn flags(&self) -> MessageFlags {
        let mut flags = MessageFlags::HISTORY_ENTRY;
        if self.outgoing {
            flags.insert(MessageFlags::OUTGOING);
        }
        if self.silent {
            flags.insert(MessageFlags::SILENT);
        }
        if self.post {
            flags.insert(MessageFlags::POST);
        }
        if self.mentions_me {
            flags.insert(MessageFlags::MENTIONS_ME);
        }
        if self.media_unread {
            flags.insert(MessageFlags::MEDIA_IS_UNREAD);
        }
        if !self.outgoing {
            flags.insert(MessageFlags::CLIENT_SIDE_UNREAD);
        }
        flags
    }

    /// Builds the item this payload represents. Grouping is only kept for
    /// payloads that actually produced groupable media.
    pub fn into_item(self) -> Item {
        let flags = self.flags();
        let (media, notice) = match &self.media {
            Some(wire_media) => match construct_media(wire_media, self.ttl_seconds) {
                MediaConstruction::Media(media) => (Some(media), None),
                MediaConstruction::Notice(text) => (None, Some(text)),
            },
            None => (None, None),
        };
        let service = notice.is_some();
        let text = match notice {
            Some(text) => RichText::plain(text),
            None => self.text,
        };
        let group_id = match &media {
            Some(media) if media.can_be_grouped() => self.grouped_id,
            _ => None,
        };
        let mut item = Item {
            id: self.id,
            conversation: self.conversation,
            sender: self.sender,
            date: self.date,
            edit_date: self.edit_date,
            flags,
            group_id,
            text,
            media,
            ttl_destroy_at: None,
            service,
        };
        if let Some(ttl) = self.ttl_seconds {
            item.apply_ttl(ttl);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DocumentId, DocumentKind, PhotoId};

    fn photo_ref() -> PhotoRef {
        PhotoRef {
            id: PhotoId(1),
            width: 800,
            height: 600,
            blurhash: None,
        }
    }

    fn wire(media: Option<WireMedia>) -> WireMessage {
        WireMessage {
            id: MsgId(100),
            conversation: ConversationId(5),
            sender: PeerId(9),
            date: Utc::now(),
            edit_date: None,
            outgoing: false,
            silent: false,
            post: false,
            mentions_me: false,
            media_unread: false,
            grouped_id: None,
            text: RichText::plain("hello"),
            media,
            ttl_seconds: None,
        }
    }

    #[test]
    fn test_photo_payload_becomes_media_item() {
        let item = wire(Some(WireMedia::Photo(Some(photo_ref())))).into_item();
        assert!(item.media.as_ref().unwrap().photo().is_some());
        assert!(!item.service);
        assert!(item.is_regular());
        assert_eq!(item.text.text, "hello");
    }

    #[test]
    fn test_empty_photo_becomes_unavailable_notice() {
        let item = wire(Some(WireMedia::Photo(None))).into_item();
        assert!(item.media.is_none());
        assert!(item.service);
        assert_eq!(item.text.text, EMPTY_MEDIA_TEXT);
    }

    #[test]
    fn test_unsupported_media_becomes_notice() {
        let item = wire(Some(WireMedia::Unsupported)).into_item();
        assert!(item.media.is_none());
        assert!(item.service);
        assert_eq!(item.text.text, UNSUPPORTED_MEDIA_TEXT);
    }

    #[test]
    fn test_ttl_photo_never_materializes() {
        let mut message = wire(Some(WireMedia::Photo(Some(photo_ref()))));
        message.ttl_seconds = Some(30);
        let item = message.into_item();
        assert!(item.media.is_none());
        assert_eq!(item.text.text, TTL_PHOTO_TEXT);
        assert!(item.ttl_destroy_at.is_some());
    }

    #[test]
    fn test_ttl_document_never_materializes() {
        let document = DocumentRef {
            id: DocumentId(2),
            kind: DocumentKind::Video,
            filename: String::new(),
            mime_type: "video/mp4".into(),
            size: 100,
            width: 640,
            height: 480,
            duration_secs: Some(10),
            blurhash: None,
            sticker_alt: None,
        };
        let mut message = wire(Some(WireMedia::Document(Some(document))));
        message.ttl_seconds = Some(60);
        let item = message.into_item();
        assert!(item.media.is_none());
        assert_eq!(item.text.text, TTL_FILE_TEXT);
    }

    #[test]
    fn test_grouping_dropped_for_ungroupable_media() {
        let mut message = wire(Some(WireMedia::Poll(PollData {
            id: 1,
            question: "?".into(),
            answers: vec![],
            closed: false,
        })));
        message.grouped_id = Some(GroupId(77));
        let item = message.into_item();
        assert!(item.group_id.is_none());

        let mut message = wire(Some(WireMedia::Photo(Some(photo_ref()))));
        message.grouped_id = Some(GroupId(77));
        assert_eq!(message.into_item().group_id, Some(GroupId(77)));
    }

    #[test]
    fn test_wire_message_json_roundtrip() {
        let message = wire(Some(WireMedia::Photo(Some(photo_ref()))));
        let json = serde_json::to_string(&message).unwrap();
        let parsed: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_incoming_flags() {
        let item = wire(None).into_item();
        assert!(item.flags.contains(MessageFlags::HISTORY_ENTRY));
        assert!(item.flags.contains(MessageFlags::CLIENT_SIDE_UNREAD));
        assert!(!item.flags.contains(MessageFlags::OUTGOING));

        let mut message = wire(None);
        message.outgoing = true;
        message.silent = true;
        let item = message.into_item();
        assert!(item.flags.contains(MessageFlags::OUTGOING | MessageFlags::SILENT));
        assert!(!item.flags.contains(MessageFlags::CLIENT_SIDE_UNREAD));
    }
}
