pub use crate::album::GroupAlbum;
pub use crate::content::{
    CallFinishReason, CallRecord, ContactData, ContentId, DiceRoll, DocumentId, DocumentKind,
    DocumentRef, GameData, GeoPoint, InvoiceData, LocationData, PhotoId, PhotoRef, PollAnswer,
    PollData, WebPageData,
};
pub use crate::error::{AlbumError, MurmurError, Result};
pub use crate::item::{Item, ItemError, MessageFlags};
pub use crate::layout::{
    corners_from_shared, layout_media_group, Corners, GroupMediaLayout, Rect, Sides,
    MAX_ALBUM_SIZE,
};
pub use crate::media::{
    capabilities_for, Capabilities, MediaError, MediaKind, MediaVariant, ALBUM_PREVIEW_TEXT,
    MAX_PREVIEW_IMAGES,
};
pub use crate::murmur::{Conversation, ItemView, Murmur};
pub use crate::preview::{
    DecodedPreview, Preview, PreviewCache, PreviewDecoder, PreviewImage, PreviewOptions,
    PreviewSource, PREVIEW_SIDE,
};
pub use crate::types::{
    ConversationId, ConversationPolicy, EntityKind, FullItemId, GroupId, MsgId, PeerId,
    RichText, SharedMediaType, TextEntity, LOCAL_ID_BASE,
};
pub use crate::wire::{
    MediaConstruction, WireMedia, WireMessage, EMPTY_MEDIA_TEXT, TTL_FILE_TEXT, TTL_PHOTO_TEXT,
    UNSUPPORTED_MEDIA_TEXT,
};

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt::Layer, prelude::*, registry::Registry};

mod album;
mod content;
mod error;
mod item;
mod layout;
mod media;
mod murmur;
mod preview;
mod types;
mod wire;

static TRACING_GUARDS: OnceCell<Mutex<Option<(WorkerGuard, WorkerGuard)>>> = OnceCell::new();
static TRACING_INIT: OnceCell<()> = OnceCell::new();

pub(crate) fn init_tracing(logs_dir: &Path) {
    TRACING_INIT.get_or_init(|| {
        let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix("murmur")
            .filename_suffix("log")
            .build(logs_dir)
            .expect("Failed to create file appender");

        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

        TRACING_GUARDS
            .set(Mutex::new(Some((file_guard, stdout_guard))))
            .ok();

        let stdout_layer = Layer::new()
            .with_writer(non_blocking_stdout)
            .with_ansi(true)
            .with_target(true);

        let file_layer = Layer::new()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true);

        Registry::default()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(stdout_layer)
            .with(file_layer)
            .init();
    });
}

/// Geometry parameters for grouped-album packing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Widest a message block ever renders; the natural packing width.
    pub max_album_width: i32,
    /// Rows whose height falls below this are penalized as too thin.
    pub min_item_width: i32,
    /// Gap between sibling rectangles in pixels.
    pub item_spacing: i32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_album_width: 800,
            min_item_width: 108,
            item_spacing: 4,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MurmurConfig {
    /// Directory for application logs. Logging stays uninitialized when unset.
    pub logs_dir: Option<PathBuf>,

    pub layout: LayoutOptions,
}

impl MurmurConfig {
    pub fn new(logs_dir: &Path) -> Self {
        let env_suffix = if cfg!(debug_assertions) {
            "dev"
        } else {
            "release"
        };
        Self {
            logs_dir: Some(logs_dir.join(env_suffix)),
            layout: LayoutOptions::default(),
        }
    }
}
