//! Content-identity types.
//!
//! Binary content (images, documents) is owned by the storage collaborator;
//! this module only carries stable references to it plus the small structured
//! payloads (contacts, polls, calls) that travel with a message. A forwarded
//! message clones the reference, never the bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{MsgId, PeerId};

/// Identifier of an image in the storage collaborator's key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(pub u64);

/// Identifier of a document in the storage collaborator's key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

/// Cache key derived from content identity.
///
/// Two items referencing the same underlying content produce the same key, so
/// their previews share one cache entry. Zero is reserved for "no content".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub u64);

impl ContentId {
    pub const NONE: ContentId = ContentId(0);

    /// Derives a key from a kind tag and the stable content identifier.
    pub fn derive(tag: &str, id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag.as_bytes());
        hasher.update(id.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let value = u64::from_le_bytes(bytes);
        // Zero stays reserved for ContentId::NONE.
        Self(if value == 0 { 1 } else { value })
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Hex rendering for log lines.
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

/// Reference to an image plus the metadata needed before the bytes load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub id: PhotoId,
    /// Intrinsic size in pixels, used for album packing.
    pub width: u32,
    pub height: u32,
    /// Blurhash placeholder carried inline with the reference.
    pub blurhash: Option<String>,
}

impl PhotoRef {
    pub fn content_id(&self) -> ContentId {
        ContentId::derive("photo", self.id.0)
    }
}

/// Behavioral class of a document. Drives capability resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    File,
    Video,
    Gif,
    Audio,
    Voice,
    VideoMessage,
    Sticker,
}

/// Reference to a document plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    /// Intrinsic size for visual kinds, zero otherwise.
    pub width: u32,
    pub height: u32,
    /// Playback length for audio and video kinds.
    pub duration_secs: Option<u32>,
    pub blurhash: Option<String>,
    /// Alt emoji for stickers.
    pub sticker_alt: Option<String>,
}

impl DocumentRef {
    pub fn content_id(&self) -> ContentId {
        ContentId::derive("document", self.id.0)
    }

    pub fn is_visual(&self) -> bool {
        matches!(
            self.kind,
            DocumentKind::Video | DocumentKind::Gif | DocumentKind::VideoMessage
        ) || (self.kind == DocumentKind::File && self.blurhash.is_some())
    }
}

/// A shared contact card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactData {
    pub user_id: Option<PeerId>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl ContactData {
    pub fn display_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => self.phone_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A geographic point with optional venue info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub point: GeoPoint,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallFinishReason {
    Missed,
    Busy,
    Disconnected,
    Hangup,
}

/// Record of a voice or video call. `finish_reason` is `None` while the call
/// is still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub duration_secs: u32,
    pub finish_reason: Option<CallFinishReason>,
    pub video: bool,
}

impl CallRecord {
    pub fn in_progress(&self) -> bool {
        self.finish_reason.is_none()
    }
}

/// Link preview payload resolved by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebPageData {
    pub id: u64,
    pub url: String,
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub photo: Option<PhotoRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub photo: Option<PhotoRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub receipt_msg_id: Option<MsgId>,
    pub amount: u64,
    pub currency: String,
    pub title: String,
    pub description: String,
    pub photo: Option<PhotoRef>,
    pub is_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollAnswer {
    pub text: String,
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollData {
    pub id: u64,
    pub question: String,
    pub answers: Vec<PollAnswer>,
    pub closed: bool,
}

/// An animated-emoji roll with its server-decided value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub emoji: String,
    pub value: i32,
}
