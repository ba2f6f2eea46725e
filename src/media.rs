//! Media content kinds and their behavioral contract.
//!
//! One closed enum instead of an open class hierarchy: every kind-specific
//! difference (forwarding, caption editing, clipboard text, indexing tags)
//! is either a match arm here or a row in the capability table, so "which
//! kinds support X" is auditable in one place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{
    CallRecord, ContactData, ContentId, DiceRoll, DocumentKind, DocumentRef, GameData,
    InvoiceData, LocationData, PhotoRef, PollData, WebPageData,
};
use crate::preview::{Preview, PreviewCache, PreviewSource};
use crate::types::{ConversationPolicy, RichText, SharedMediaType};
use crate::wire::WireMedia;

/// Most images a merged album preview may carry.
pub const MAX_PREVIEW_IMAGES: usize = 3;

/// Caption shown for an album whose members disagree on captions.
pub const ALBUM_PREVIEW_TEXT: &str = "Album";

/// Upper bound on any short-text rendering produced here.
const MAX_SHORT_TEXT: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("media of kind {0:?} cannot be forwarded")]
    CloneUnsupported(MediaKind),

    #[error("payload kind does not match media of kind {0:?}")]
    KindMismatch(MediaKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    File,
    Contact,
    Location,
    Call,
    WebPage,
    Game,
    Invoice,
    Poll,
    Dice,
}

/// Per-kind behavior record. Resolved from the table below at construction
/// and re-read after every edit; nothing caches these across a media swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub allows_forward: bool,
    pub allows_edit_caption: bool,
    pub allows_edit_media: bool,
    pub allows_revoke: bool,
    pub drop_forwarded_info: bool,
    pub force_forwarded_info: bool,
    pub forwarded_becomes_unread: bool,
    pub can_be_grouped: bool,
}

const DEFAULT_CAPS: Capabilities = Capabilities {
    allows_forward: true,
    allows_edit_caption: false,
    allows_edit_media: false,
    allows_revoke: true,
    drop_forwarded_info: false,
    force_forwarded_info: false,
    forwarded_becomes_unread: false,
    can_be_grouped: false,
};

/// The capability table. Documents in one place which kinds support what.
pub fn capabilities_for(kind: MediaKind, document: Option<DocumentKind>) -> Capabilities {
    match kind {
        MediaKind::Photo => Capabilities {
            allows_edit_caption: true,
            allows_edit_media: true,
            can_be_grouped: true,
            ..DEFAULT_CAPS
        },
        MediaKind::File => match document.unwrap_or(DocumentKind::File) {
            DocumentKind::File | DocumentKind::Audio => Capabilities {
                allows_edit_caption: true,
                allows_edit_media: true,
                can_be_grouped: true,
                ..DEFAULT_CAPS
            },
            DocumentKind::Video => Capabilities {
                allows_edit_caption: true,
                allows_edit_media: true,
                can_be_grouped: true,
                ..DEFAULT_CAPS
            },
            DocumentKind::Gif => Capabilities {
                allows_edit_caption: true,
                allows_edit_media: true,
                ..DEFAULT_CAPS
            },
            DocumentKind::Voice => Capabilities {
                forwarded_becomes_unread: true,
                ..DEFAULT_CAPS
            },
            DocumentKind::VideoMessage => Capabilities {
                forwarded_becomes_unread: true,
                ..DEFAULT_CAPS
            },
            DocumentKind::Sticker => DEFAULT_CAPS,
        },
        MediaKind::Call => Capabilities {
            allows_forward: false,
            allows_revoke: false,
            ..DEFAULT_CAPS
        },
        MediaKind::Dice => Capabilities {
            force_forwarded_info: true,
            ..DEFAULT_CAPS
        },
        MediaKind::Contact
        | MediaKind::Location
        | MediaKind::WebPage
        | MediaKind::Game
        | MediaKind::Invoice
        | MediaKind::Poll => DEFAULT_CAPS,
    }
}

/// Exactly one kind of content attached to a message.
///
/// Grouped albums are not a variant here: an item never owns the composite,
/// it only carries a group identifier and the album aggregates the members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaVariant {
    Photo(PhotoRef),
    File(DocumentRef),
    Contact(ContactData),
    Location(LocationData),
    Call(CallRecord),
    WebPage(WebPageData),
    Game(GameData),
    Invoice(InvoiceData),
    Poll(PollData),
    Dice(DiceRoll),
}

impl MediaVariant {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Photo(_) => MediaKind::Photo,
            Self::File(_) => MediaKind::File,
            Self::Contact(_) => MediaKind::Contact,
            Self::Location(_) => MediaKind::Location,
            Self::Call(_) => MediaKind::Call,
            Self::WebPage(_) => MediaKind::WebPage,
            Self::Game(_) => MediaKind::Game,
            Self::Invoice(_) => MediaKind::Invoice,
            Self::Poll(_) => MediaKind::Poll,
            Self::Dice(_) => MediaKind::Dice,
        }
    }

    // Kind probing. Callers discover what a message carries through these,
    // not by matching the enum in rendering code.

    pub fn photo(&self) -> Option<&PhotoRef> {
        match self {
            Self::Photo(photo) => Some(photo),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&DocumentRef> {
        match self {
            Self::File(document) => Some(document),
            _ => None,
        }
    }

    pub fn contact(&self) -> Option<&ContactData> {
        match self {
            Self::Contact(contact) => Some(contact),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&LocationData> {
        match self {
            Self::Location(location) => Some(location),
            _ => None,
        }
    }

    pub fn call(&self) -> Option<&CallRecord> {
        match self {
            Self::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn web_page(&self) -> Option<&WebPageData> {
        match self {
            Self::WebPage(page) => Some(page),
            _ => None,
        }
    }

    pub fn game(&self) -> Option<&GameData> {
        match self {
            Self::Game(game) => Some(game),
            _ => None,
        }
    }

    pub fn invoice(&self) -> Option<&InvoiceData> {
        match self {
            Self::Invoice(invoice) => Some(invoice),
            _ => None,
        }
    }

    pub fn poll(&self) -> Option<&PollData> {
        match self {
            Self::Poll(poll) => Some(poll),
            _ => None,
        }
    }

    pub fn dice(&self) -> Option<&DiceRoll> {
        match self {
            Self::Dice(dice) => Some(dice),
            _ => None,
        }
    }

    /// Produces an independent variant for a forwarded copy, sharing only the
    /// immutable content identity. Call records never forward.
    pub fn clone_for_forward(&self) -> Result<MediaVariant, MediaError> {
        if !self.capabilities().allows_forward {
            return Err(MediaError::CloneUnsupported(self.kind()));
        }
        Ok(self.clone())
    }

    pub fn capabilities(&self) -> Capabilities {
        capabilities_for(self.kind(), self.document().map(|d| d.kind))
    }

    pub fn allows_forward(&self) -> bool {
        self.capabilities().allows_forward
    }

    pub fn allows_edit_caption(&self) -> bool {
        self.capabilities().allows_edit_caption
    }

    pub fn allows_edit_media(&self) -> bool {
        self.capabilities().allows_edit_media
    }

    pub fn allows_revoke(&self, _now: chrono::DateTime<chrono::Utc>) -> bool {
        if let Some(call) = self.call() {
            // An in-progress call record cannot be revoked yet.
            return !call.in_progress() && self.capabilities().allows_revoke;
        }
        self.capabilities().allows_revoke
    }

    pub fn drop_forwarded_info(&self) -> bool {
        self.capabilities().drop_forwarded_info
    }

    pub fn force_forwarded_info(&self) -> bool {
        self.capabilities().force_forwarded_info
    }

    pub fn forwarded_becomes_unread(&self) -> bool {
        self.capabilities().forwarded_becomes_unread
    }

    pub fn can_be_grouped(&self) -> bool {
        self.capabilities().can_be_grouped
    }

    /// Index tags for the shared-media collaborator. Empty means the kind is
    /// not indexed at all.
    pub fn shared_media_types(&self) -> &'static [SharedMediaType] {
        match self {
            Self::Photo(_) => &[SharedMediaType::Photo],
            Self::File(document) => match document.kind {
                DocumentKind::File => &[SharedMediaType::File],
                DocumentKind::Video => &[SharedMediaType::Video],
                DocumentKind::Gif => &[SharedMediaType::Gif],
                DocumentKind::Audio => &[SharedMediaType::MusicFile],
                DocumentKind::Voice | DocumentKind::VideoMessage => {
                    &[SharedMediaType::VoiceFile]
                }
                DocumentKind::Sticker => &[],
            },
            Self::WebPage(_) => &[SharedMediaType::Link],
            _ => &[],
        }
    }

    /// The content identity of the image this media would preview with.
    pub fn preview_source(&self) -> Option<PreviewSource> {
        let from_photo = |photo: &PhotoRef| PreviewSource {
            content: photo.content_id(),
            width: photo.width,
            height: photo.height,
            blurhash: photo.blurhash.clone(),
        };
        match self {
            Self::Photo(photo) => Some(from_photo(photo)),
            Self::File(document) if document.is_visual() => Some(PreviewSource {
                content: document.content_id(),
                width: document.width,
                height: document.height,
                blurhash: document.blurhash.clone(),
            }),
            Self::WebPage(page) => page.photo.as_ref().map(from_photo),
            Self::Game(game) => game.photo.as_ref().map(from_photo),
            Self::Invoice(invoice) => invoice.photo.as_ref().map(from_photo),
            _ => None,
        }
    }

    /// Intrinsic size used by album packing. Non-visual kinds pack square.
    pub fn grouping_size(&self) -> (u32, u32) {
        match self.preview_source() {
            Some(source) if source.width > 0 && source.height > 0 => {
                (source.width, source.height)
            }
            _ => (1, 1),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Photo(_) => "Photo",
            Self::File(document) => match document.kind {
                DocumentKind::File => "File",
                DocumentKind::Video => "Video",
                DocumentKind::Gif => "GIF",
                DocumentKind::Audio => "Audio",
                DocumentKind::Voice => "Voice message",
                DocumentKind::VideoMessage => "Video message",
                DocumentKind::Sticker => "Sticker",
            },
            Self::Contact(_) => "Contact",
            Self::Location(_) => "Location",
            Self::Call(_) => "Call",
            Self::WebPage(_) => "Link",
            Self::Game(_) => "Game",
            Self::Invoice(_) => "Invoice",
            Self::Poll(_) => "Poll",
            Self::Dice(_) => "Dice",
        }
    }

    /// One-line text for a notification banner, caption appended when set.
    pub fn notification_text(&self, caption: &str) -> String {
        let base = match self {
            Self::File(document) => match document.kind {
                DocumentKind::Sticker => match &document.sticker_alt {
                    Some(alt) => format!("{alt} Sticker"),
                    None => "Sticker".to_string(),
                },
                DocumentKind::File if !document.filename.is_empty() => {
                    document.filename.clone()
                }
                _ => self.type_name().to_string(),
            },
            Self::Contact(contact) => contact.display_name(),
            Self::Location(location) => location
                .title
                .clone()
                .unwrap_or_else(|| self.type_name().to_string()),
            Self::Call(call) => call_text(call).to_string(),
            Self::WebPage(page) => {
                if !page.title.is_empty() {
                    page.title.clone()
                } else if !page.site_name.is_empty() {
                    page.site_name.clone()
                } else {
                    page.url.clone()
                }
            }
            Self::Game(game) => game.title.clone(),
            Self::Invoice(invoice) => invoice.title.clone(),
            Self::Poll(poll) => poll.question.clone(),
            Self::Dice(dice) => dice.emoji.clone(),
            Self::Photo(_) => self.type_name().to_string(),
        };
        bounded(with_caption(&base, caption))
    }

    /// Substring for "pinned …" service lines. Never includes the caption.
    pub fn pinned_text_substring(&self) -> String {
        let text = match self {
            Self::Photo(_) => "a photo".to_string(),
            Self::File(document) => match document.kind {
                DocumentKind::File => "a file".to_string(),
                DocumentKind::Video => "a video".to_string(),
                DocumentKind::Gif => "a GIF".to_string(),
                DocumentKind::Audio => "an audio file".to_string(),
                DocumentKind::Voice => "a voice message".to_string(),
                DocumentKind::VideoMessage => "a video message".to_string(),
                DocumentKind::Sticker => "a sticker".to_string(),
            },
            Self::Contact(_) => "a contact".to_string(),
            Self::Location(_) => "a location".to_string(),
            Self::Call(_) => "a call".to_string(),
            Self::WebPage(_) => "a link".to_string(),
            Self::Game(game) => format!("the game \u{00ab}{}\u{00bb}", game.title),
            Self::Invoice(_) => "an invoice".to_string(),
            Self::Poll(poll) => format!("a poll \u{00ab}{}\u{00bb}", poll.question),
            Self::Dice(dice) => dice.emoji.clone(),
        };
        bounded(text)
    }

    /// Plain text placed on the clipboard when the message is copied.
    pub fn clipboard_text(&self, caption: &str) -> String {
        let body = match self {
            Self::Contact(contact) => {
                format!("{}\n{}", contact.display_name(), contact.phone_number)
            }
            Self::Location(location) => format!(
                "{:.6},{:.6}",
                location.point.latitude, location.point.longitude
            ),
            Self::WebPage(page) => page.url.clone(),
            Self::Poll(poll) => poll.question.clone(),
            _ => String::new(),
        };
        let label = format!("[ {} ]", self.type_name());
        let mut parts = vec![label];
        if !body.is_empty() {
            parts.push(body);
        }
        if !caption.is_empty() {
            parts.push(caption.to_string());
        }
        bounded(parts.join("\n"))
    }

    /// Policy check against a forward target. `None` means allowed.
    pub fn error_text_for_forward(&self, policy: &ConversationPolicy) -> Option<String> {
        let blocked = |what: &str| Some(format!("{what} are not allowed in this conversation."));
        match self {
            Self::File(document) if document.kind == DocumentKind::Sticker => {
                (!policy.allow_stickers).then(|| blocked("Stickers")).flatten()
            }
            Self::File(document) if document.kind == DocumentKind::Gif => {
                (!policy.allow_gifs).then(|| blocked("GIFs")).flatten()
            }
            Self::Game(_) => (!policy.allow_games).then(|| blocked("Games")).flatten(),
            Self::Poll(_) => (!policy.allow_polls).then(|| blocked("Polls")).flatten(),
            Self::Dice(_) => (!policy.allow_stickers).then(|| blocked("Dice")).flatten(),
            Self::Photo(_) | Self::File(_) => {
                (!policy.allow_media).then(|| blocked("Media messages")).flatten()
            }
            _ => None,
        }
    }

    /// Replaces the payload with a server copy of the same kind. On kind
    /// mismatch nothing changes and the caller reports the inconsistency.
    pub fn update_sent_media(&mut self, payload: &WireMedia) -> Result<(), MediaError> {
        let replacement = match (&*self, payload) {
            (Self::Photo(_), WireMedia::Photo(Some(photo))) => Self::Photo(photo.clone()),
            (Self::File(_), WireMedia::Document(Some(document))) => {
                Self::File(document.clone())
            }
            (Self::Contact(_), WireMedia::Contact(contact)) => Self::Contact(contact.clone()),
            (Self::Location(_), WireMedia::Location(location)) => {
                Self::Location(location.clone())
            }
            (Self::Call(_), WireMedia::Call(call)) => Self::Call(call.clone()),
            (Self::WebPage(_), WireMedia::WebPage(page)) => Self::WebPage(page.clone()),
            (Self::Game(_), WireMedia::Game(game)) => Self::Game(game.clone()),
            (Self::Invoice(_), WireMedia::Invoice(invoice)) => Self::Invoice(invoice.clone()),
            (Self::Poll(_), WireMedia::Poll(poll)) => Self::Poll(poll.clone()),
            (Self::Dice(_), WireMedia::Dice(dice)) => Self::Dice(dice.clone()),
            _ => return Err(MediaError::KindMismatch(self.kind())),
        };
        *self = replacement;
        Ok(())
    }

    /// Media sent through an inline result is recreated from the server
    /// payload with the same matching rules as [`Self::update_sent_media`].
    pub fn update_inline_result_media(&mut self, payload: &WireMedia) -> Result<(), MediaError> {
        self.update_sent_media(payload)
    }

    /// Individual preview, ignoring any album this media's item belongs to.
    /// The album-aware entry point lives on [`crate::Murmur::item_preview`].
    pub fn to_preview_single(&self, caption: &RichText, cache: &mut PreviewCache) -> Preview {
        let images: Vec<_> = self
            .preview_source()
            .map(|source| cache.resolve(&source))
            .into_iter()
            .collect();
        let text = if caption.is_empty() {
            self.notification_text("")
        } else if images.is_empty() {
            bounded(with_caption(self.type_name(), &caption.text))
        } else {
            bounded(caption.text.clone())
        };
        Preview { text, images }
    }
}

/// Merges member previews into one album preview: images accumulate in
/// member order up to [`MAX_PREVIEW_IMAGES`]; the caption is kept verbatim
/// while all non-empty member captions agree, otherwise it degrades to the
/// generic album caption.
pub(crate) fn merge_group_preview<'a>(
    members: impl IntoIterator<Item = (&'a MediaVariant, &'a RichText)>,
    cache: &mut PreviewCache,
) -> Preview {
    let mut result = Preview::default();
    let mut diverged = false;
    for (media, caption) in members {
        let left = MAX_PREVIEW_IMAGES - result.images.len();
        if left > 0 {
            let mut single = media.to_preview_single(&RichText::default(), cache);
            single.images.truncate(left);
            result.images.append(&mut single.images);
        }
        if !caption.is_empty() && !diverged {
            if result.text.is_empty() {
                result.text = bounded(caption.text.clone());
            } else if result.text != caption.text {
                diverged = true;
            }
        }
    }
    if diverged || result.text.is_empty() {
        result.text = ALBUM_PREVIEW_TEXT.to_string();
    }
    result
}

fn call_text(call: &CallRecord) -> &'static str {
    use crate::content::CallFinishReason::*;
    match (call.finish_reason, call.video) {
        (None, _) => "Ongoing call",
        (Some(Missed), false) => "Missed call",
        (Some(Missed), true) => "Missed video call",
        (Some(Busy), _) => "Declined call",
        (Some(Disconnected), _) | (Some(Hangup), false) => "Phone call",
        (Some(Hangup), true) => "Video call",
    }
}

fn with_caption(type_name: &str, caption: &str) -> String {
    if caption.is_empty() {
        type_name.to_string()
    } else {
        format!("{type_name}, {caption}")
    }
}

fn bounded(text: String) -> String {
    if text.chars().count() <= MAX_SHORT_TEXT {
        return text;
    }
    let mut result: String = text.chars().take(MAX_SHORT_TEXT - 1).collect();
    result.push('\u{2026}');
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DocumentId, PhotoId};
    use chrono::Utc;

    fn photo(id: u64) -> MediaVariant {
        MediaVariant::Photo(PhotoRef {
            id: PhotoId(id),
            width: 1280,
            height: 960,
            blurhash: Some("LEHV6nWB2yk8pyo0adR*.7kCMdnj".to_string()),
        })
    }

    fn document(kind: DocumentKind) -> MediaVariant {
        MediaVariant::File(DocumentRef {
            id: DocumentId(11),
            kind,
            filename: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
            width: 0,
            height: 0,
            duration_secs: None,
            blurhash: None,
            sticker_alt: None,
        })
    }

    #[test]
    fn test_exactly_one_accessor_answers() {
        let media = photo(1);
        assert!(media.photo().is_some());
        assert!(media.document().is_none());
        assert!(media.poll().is_none());
        assert!(media.call().is_none());

        let media = document(DocumentKind::File);
        assert!(media.document().is_some());
        assert!(media.photo().is_none());
    }

    #[test]
    fn test_capability_table() {
        assert!(photo(1).allows_edit_caption());
        assert!(photo(1).allows_edit_media());
        assert!(photo(1).can_be_grouped());

        let sticker = document(DocumentKind::Sticker);
        assert!(!sticker.allows_edit_caption());
        assert!(!sticker.can_be_grouped());
        assert!(sticker.allows_forward());

        let voice = document(DocumentKind::Voice);
        assert!(voice.forwarded_becomes_unread());
        assert!(!voice.allows_edit_caption());

        let call = MediaVariant::Call(CallRecord {
            duration_secs: 30,
            finish_reason: Some(crate::content::CallFinishReason::Hangup),
            video: false,
        });
        assert!(!call.allows_forward());

        let dice = MediaVariant::Dice(DiceRoll {
            emoji: "\u{1F3B2}".to_string(),
            value: 4,
        });
        assert!(dice.force_forwarded_info());
    }

    #[test]
    fn test_clone_for_forward_independence() {
        let original = photo(5);
        let clone = original.clone_for_forward().unwrap();
        assert_eq!(original, clone);
        // Same content identity: forwarded copies share the bytes.
        assert_eq!(
            original.preview_source().unwrap().content,
            clone.preview_source().unwrap().content
        );
    }

    #[test]
    fn test_clone_rejected_for_calls() {
        let call = MediaVariant::Call(CallRecord {
            duration_secs: 0,
            finish_reason: None,
            video: false,
        });
        assert_eq!(
            call.clone_for_forward(),
            Err(MediaError::CloneUnsupported(MediaKind::Call))
        );
    }

    #[test]
    fn test_revoke_blocked_while_call_in_progress() {
        let now = Utc::now();
        let ongoing = MediaVariant::Call(CallRecord {
            duration_secs: 0,
            finish_reason: None,
            video: true,
        });
        assert!(!ongoing.allows_revoke(now));
        assert!(photo(1).allows_revoke(now));
    }

    #[test]
    fn test_shared_media_types() {
        assert_eq!(photo(1).shared_media_types(), &[SharedMediaType::Photo]);
        assert_eq!(
            document(DocumentKind::Voice).shared_media_types(),
            &[SharedMediaType::VoiceFile]
        );
        assert!(document(DocumentKind::Sticker).shared_media_types().is_empty());
        let poll = MediaVariant::Poll(PollData {
            id: 1,
            question: "?".to_string(),
            answers: vec![],
            closed: false,
        });
        assert!(poll.shared_media_types().is_empty());
    }

    #[test]
    fn test_update_sent_media_kind_mismatch_is_noop() {
        let mut media = photo(7);
        let before = media.clone();
        let result = media.update_sent_media(&WireMedia::Poll(PollData {
            id: 9,
            question: "which?".to_string(),
            answers: vec![],
            closed: false,
        }));
        assert_eq!(result, Err(MediaError::KindMismatch(MediaKind::Photo)));
        assert_eq!(media, before);
    }

    #[test]
    fn test_update_sent_media_same_kind_replaces() {
        let mut media = photo(7);
        let replacement = PhotoRef {
            id: PhotoId(8),
            width: 640,
            height: 480,
            blurhash: None,
        };
        media
            .update_sent_media(&WireMedia::Photo(Some(replacement.clone())))
            .unwrap();
        assert_eq!(media.photo(), Some(&replacement));
    }

    #[test]
    fn test_notification_text_bounded() {
        let long_caption = "x".repeat(500);
        let text = photo(1).notification_text(&long_caption);
        assert!(text.chars().count() <= MAX_SHORT_TEXT);
        assert!(text.starts_with("Photo, x"));
    }

    #[test]
    fn test_pinned_and_clipboard_texts() {
        let poll = MediaVariant::Poll(PollData {
            id: 1,
            question: "lunch?".to_string(),
            answers: vec![],
            closed: false,
        });
        assert_eq!(poll.pinned_text_substring(), "a poll \u{00ab}lunch?\u{00bb}");
        assert_eq!(photo(1).pinned_text_substring(), "a photo");

        let clipboard = photo(1).clipboard_text("nice view");
        assert_eq!(clipboard, "[ Photo ]\nnice view");

        let contact = MediaVariant::Contact(ContactData {
            user_id: None,
            first_name: "Ada".to_string(),
            last_name: String::new(),
            phone_number: "+100".to_string(),
        });
        let clipboard = contact.clipboard_text("");
        assert_eq!(clipboard, "[ Contact ]\nAda\n+100");
    }

    #[test]
    fn test_forward_policy_errors() {
        let no_stickers = ConversationPolicy {
            allow_stickers: false,
            ..Default::default()
        };
        assert!(document(DocumentKind::Sticker)
            .error_text_for_forward(&no_stickers)
            .is_some());
        assert!(photo(1).error_text_for_forward(&no_stickers).is_none());

        let no_media = ConversationPolicy {
            allow_media: false,
            ..Default::default()
        };
        assert!(photo(1).error_text_for_forward(&no_media).is_some());
        let contact = MediaVariant::Contact(ContactData {
            user_id: None,
            first_name: "A".to_string(),
            last_name: String::new(),
            phone_number: "+1".to_string(),
        });
        assert!(contact.error_text_for_forward(&no_media).is_none());
    }

    #[test]
    fn test_single_preview_prefers_caption_with_image() {
        let mut cache = PreviewCache::new();
        let preview = photo(1).to_preview_single(&RichText::plain("hello"), &mut cache);
        assert_eq!(preview.text, "hello");
        assert_eq!(preview.images.len(), 1);
        assert!(!preview.images[0].cache_key.is_none());

        let preview = photo(1).to_preview_single(&RichText::default(), &mut cache);
        assert_eq!(preview.text, "Photo");
    }

    #[test]
    fn test_group_preview_merge_bounded_and_caption_rules() {
        let mut cache = PreviewCache::new();
        let photos: Vec<MediaVariant> = (0..5).map(|i| photo(100 + i)).collect();
        let empty = RichText::default();

        // Five members, only the caption of one set: caption kept verbatim.
        let caption = RichText::plain("trip");
        let members: Vec<(&MediaVariant, &RichText)> = photos
            .iter()
            .enumerate()
            .map(|(i, media)| (media, if i == 2 { &caption } else { &empty }))
            .collect();
        let preview = merge_group_preview(members, &mut cache);
        assert_eq!(preview.images.len(), MAX_PREVIEW_IMAGES);
        assert_eq!(preview.text, "trip");

        // Two distinct captions diverge to the generic album caption.
        let other = RichText::plain("beach");
        let members: Vec<(&MediaVariant, &RichText)> = photos
            .iter()
            .enumerate()
            .map(|(i, media)| {
                (
                    media,
                    match i {
                        0 => &caption,
                        1 => &other,
                        _ => &empty,
                    },
                )
            })
            .collect();
        let preview = merge_group_preview(members, &mut cache);
        assert_eq!(preview.text, ALBUM_PREVIEW_TEXT);

        // All captions empty: generic as well.
        let members: Vec<(&MediaVariant, &RichText)> =
            photos.iter().map(|media| (media, &empty)).collect();
        let preview = merge_group_preview(members, &mut cache);
        assert_eq!(preview.text, ALBUM_PREVIEW_TEXT);
    }

    #[test]
    fn test_matching_captions_do_not_diverge() {
        let mut cache = PreviewCache::new();
        let first = photo(1);
        let second = photo(2);
        let caption = RichText::plain("same");
        let preview = merge_group_preview(
            [(&first, &caption), (&second, &caption)],
            &mut cache,
        );
        assert_eq!(preview.text, "same");
    }
}
