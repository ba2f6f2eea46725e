use thiserror::Error;

use crate::item::ItemError;
use crate::media::MediaError;
use crate::types::{ConversationId, FullItemId, GroupId};

#[derive(Debug, Error)]
pub enum AlbumError {
    #[error("group {0:?} does not exist")]
    UnknownGroup(GroupId),
}

#[derive(Debug, Error)]
pub enum MurmurError {
    #[error("unknown conversation: {0:?}")]
    UnknownConversation(ConversationId),

    #[error("unknown item: {0:?}")]
    UnknownItem(FullItemId),

    #[error("forwarding blocked: {0}")]
    ForwardBlocked(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Item error: {0}")]
    Item(#[from] ItemError),

    #[error("Album error: {0}")]
    Album(#[from] AlbumError),

    #[error("Logging setup error: {0}")]
    LoggingSetup(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MurmurError>;
