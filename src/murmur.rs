//! The message session: arena of items plus the indices over them.
//!
//! [`Murmur`] owns every item, album and cache. Items are addressed by
//! [`FullItemId`] and never point back at the session; album membership,
//! shared-media indexing and the TTL queue are separate indices that every
//! mutation keeps consistent. All mutations go through methods here so a
//! failed update leaves the session exactly as it was.

use std::collections::{BTreeSet, HashMap};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::album::GroupAlbum;
use crate::error::{MurmurError, Result};
use crate::item::{Item, MessageFlags};
use crate::layout::GroupMediaLayout;
use crate::media::{self, MediaKind, MediaVariant};
use crate::preview::{Preview, PreviewCache, PreviewDecoder, PreviewOptions};
use crate::types::{
    ConversationId, ConversationPolicy, FullItemId, GroupId, MsgId, PeerId, RichText,
    SharedMediaType, LOCAL_ID_BASE,
};
use crate::wire::WireMessage;
use crate::{init_tracing, MurmurConfig};

/// One chat the session knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub policy: ConversationPolicy,
    pub is_self_chat: bool,
}

/// Immutable render snapshot of one item. Building it never mutates session
/// state, so two consecutive snapshots of an untouched item are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: FullItemId,
    pub text: String,
    pub media_kind: Option<MediaKind>,
    pub outgoing: bool,
    pub pinned: bool,
    pub edited: bool,
    pub unread: bool,
    pub service: bool,
    pub grouped: bool,
}

pub struct Murmur {
    pub config: MurmurConfig,
    conversations: HashMap<ConversationId, Conversation>,
    items: HashMap<FullItemId, Item>,
    albums: HashMap<GroupId, GroupAlbum>,
    shared_media: HashMap<(ConversationId, SharedMediaType), BTreeSet<MsgId>>,
    previews: PreviewCache,
    ttl_queue: BTreeSet<(DateTime<Utc>, FullItemId)>,
    next_local_id: i64,
}

impl Murmur {
    /// Creates a session. Sets up the log directory and tracing when the
    /// config carries one.
    pub fn new(config: MurmurConfig) -> Result<Self> {
        if let Some(logs_dir) = &config.logs_dir {
            std::fs::create_dir_all(logs_dir)
                .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))
                .map_err(|error| MurmurError::LoggingSetup(format!("{error:#}")))?;
            init_tracing(logs_dir);
            tracing::debug!("Logging initialized in directory: {:?}", logs_dir);
        }
        Ok(Self {
            config,
            conversations: HashMap::new(),
            items: HashMap::new(),
            albums: HashMap::new(),
            shared_media: HashMap::new(),
            previews: PreviewCache::new(),
            ttl_queue: BTreeSet::new(),
            next_local_id: LOCAL_ID_BASE,
        })
    }

    pub fn upsert_conversation(
        &mut self,
        id: ConversationId,
        policy: ConversationPolicy,
        is_self_chat: bool,
    ) {
        self.conversations.insert(
            id,
            Conversation {
                id,
                policy,
                is_self_chat,
            },
        );
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    pub fn item(&self, id: FullItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    // ---- Ingestion ----------------------------------------------------

    /// Ingests one message from the transport. A payload arriving again
    /// under an id we already hold replaces the previous item.
    pub fn receive_message(&mut self, message: WireMessage) -> Result<FullItemId> {
        let conversation = message.conversation;
        if !self.conversations.contains_key(&conversation) {
            return Err(MurmurError::UnknownConversation(conversation));
        }
        let item = message.into_item();
        let id = item.full_id();
        if self.items.contains_key(&id) {
            tracing::debug!(
                target: "murmur::receive_message",
                "Replacing already-known item {:?}",
                id
            );
            self.take_item(id)?;
        }
        self.register_item(item);
        Ok(id)
    }

    /// Composes a message locally, before the server has seen it. The item
    /// gets the next client-range id and waits in the sending state until
    /// [`Self::set_real_id`] confirms it.
    pub fn compose_local(
        &mut self,
        conversation: ConversationId,
        text: RichText,
        media: Option<MediaVariant>,
        group_id: Option<GroupId>,
        sender: PeerId,
    ) -> Result<FullItemId> {
        if !self.conversations.contains_key(&conversation) {
            return Err(MurmurError::UnknownConversation(conversation));
        }
        let id = MsgId(self.next_local_id);
        self.next_local_id += 1;

        let group_id = match &media {
            Some(media) if media.can_be_grouped() => group_id,
            _ => None,
        };
        let item = Item {
            id,
            conversation,
            sender,
            date: Utc::now(),
            edit_date: None,
            flags: MessageFlags::OUTGOING
                | MessageFlags::BEING_SENT
                | MessageFlags::LOCAL
                | MessageFlags::HISTORY_ENTRY,
            group_id,
            text,
            media,
            ttl_destroy_at: None,
            service: false,
        };
        let full_id = item.full_id();
        self.register_item(item);
        Ok(full_id)
    }

    /// Confirms the server id of a locally composed item and re-keys every
    /// index that addressed it by the provisional id. Album membership is
    /// re-keyed in place: confirmation is not a membership change, so the
    /// cached group geometry survives.
    pub fn set_real_id(&mut self, id: FullItemId, new_id: MsgId) -> Result<FullItemId> {
        let mut item = self.items.remove(&id).ok_or(MurmurError::UnknownItem(id))?;
        if let Err(error) = item.set_real_id(new_id) {
            // Put it back untouched; no index addressed the new id yet.
            self.items.insert(id, item);
            return Err(error.into());
        }
        let new_full = item.full_id();
        if let Some(group) = item.group_id {
            if let Some(album) = self.albums.get_mut(&group) {
                album.rekey(id, new_full);
            }
        }
        if item.is_regular() {
            if let Some(media) = &item.media {
                for kind in media.shared_media_types() {
                    self.unindex_shared(id, *kind);
                    self.index_shared(new_full, *kind);
                }
            }
        }
        if let Some(at) = item.ttl_destroy_at {
            self.ttl_queue.remove(&(at, id));
            self.ttl_queue.insert((at, new_full));
        }
        self.items.insert(new_full, item);
        tracing::debug!(
            target: "murmur::set_real_id",
            "Item {:?} confirmed as {:?}, repaint scheduled",
            id,
            new_full
        );
        Ok(new_full)
    }

    // ---- Edits --------------------------------------------------------

    /// Applies the media payload echoed back by the server after a send.
    /// On a kind mismatch nothing changes and the caller resolves the
    /// inconsistency by refetching.
    pub fn apply_sent_message(
        &mut self,
        id: FullItemId,
        payload: &crate::wire::WireMedia,
    ) -> Result<()> {
        self.apply_media_update(id, payload, "murmur::apply_sent_message")
    }

    /// Same as [`Self::apply_sent_message`] for messages sent through an
    /// inline result, where the media is recreated from the server payload.
    pub fn update_inline_result(
        &mut self,
        id: FullItemId,
        payload: &crate::wire::WireMedia,
    ) -> Result<()> {
        self.apply_media_update(id, payload, "murmur::update_inline_result")
    }

    fn apply_media_update(
        &mut self,
        id: FullItemId,
        payload: &crate::wire::WireMedia,
        log_target: &'static str,
    ) -> Result<()> {
        let item = self.items.get_mut(&id).ok_or(MurmurError::UnknownItem(id))?;
        let Some(media) = item.media.as_mut() else {
            return Err(MurmurError::UnknownItem(id));
        };
        let old_types = media.shared_media_types();
        let old_source = media.preview_source();

        if let Err(error) = media.update_sent_media(payload) {
            tracing::warn!(
                log_target,
                "Server payload for {:?} does not match local media: {}",
                id,
                error
            );
            return Err(error.into());
        }

        // Capabilities are re-read from the table after an edit; a swap can
        // leave the media ungroupable.
        let new_types = media.shared_media_types();
        let new_source = media.preview_source();
        let can_group = media.can_be_grouped();
        let regular = item.is_regular();
        let dropped_group = if can_group { None } else { item.group_id.take() };

        if regular && old_types != new_types {
            for kind in old_types {
                self.unindex_shared(id, *kind);
            }
            for kind in new_types {
                self.index_shared(id, *kind);
            }
        }
        if let Some(group) = dropped_group {
            self.remove_album_member(group, id);
            tracing::debug!(
                log_target,
                "Item {:?} left group {:?}, media no longer groupable",
                id,
                group
            );
        }
        // A content change orphans the old entry unless another live item
        // still previews the same content; caption-only edits keep it.
        match (old_source, new_source) {
            (Some(old), new) if new.as_ref().map(|s| s.content) != Some(old.content) => {
                if !self.content_referenced(old.content) {
                    self.previews.invalidate(old.content);
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ---- Forwarding ---------------------------------------------------

    /// Forwards an item into another conversation as a new locally composed
    /// message. Fails without side effects when the media kind cannot be
    /// forwarded or the target's policy rejects it.
    pub fn forward_item(
        &mut self,
        source: FullItemId,
        target: ConversationId,
        sender: PeerId,
    ) -> Result<FullItemId> {
        let conversation = self
            .conversations
            .get(&target)
            .ok_or(MurmurError::UnknownConversation(target))?;
        let item = self.items.get(&source).ok_or(MurmurError::UnknownItem(source))?;

        let media = match &item.media {
            Some(media) => {
                if let Some(text) = media.error_text_for_forward(&conversation.policy) {
                    return Err(MurmurError::ForwardBlocked(text));
                }
                Some(media.clone_for_forward()?)
            }
            None => None,
        };
        let text = item.text.clone();
        let unread_media = media
            .as_ref()
            .map(|media| media.forwarded_becomes_unread())
            .unwrap_or(false);

        let id = self.compose_local(target, text, media, None, sender)?;
        if unread_media {
            let item = self.items.get_mut(&id).expect("just composed");
            item.flags.insert(MessageFlags::MEDIA_IS_UNREAD);
        }
        Ok(id)
    }

    // ---- Destruction --------------------------------------------------

    /// Removes an item and every index entry pointing at it.
    pub fn destroy_item(&mut self, id: FullItemId) -> Result<Item> {
        let item = self.take_item(id)?;
        tracing::debug!(target: "murmur::destroy_item", "Destroyed item {:?}", id);
        Ok(item)
    }

    /// Removes every item of a conversation. The conversation itself stays.
    pub fn clear_conversation(&mut self, conversation: ConversationId) -> usize {
        let ids: Vec<FullItemId> = self
            .items
            .keys()
            .filter(|id| id.conversation == conversation)
            .copied()
            .collect();
        let count = ids.len();
        for id in ids {
            let _ = self.take_item(id);
        }
        tracing::debug!(
            target: "murmur::clear_conversation",
            "Cleared {} items from {:?}",
            count,
            conversation
        );
        count
    }

    /// Destroys every item whose TTL has elapsed by `now`. Returns the ids
    /// that were destroyed, oldest deadline first.
    pub fn check_ttl(&mut self, now: DateTime<Utc>) -> Vec<FullItemId> {
        let expired: Vec<FullItemId> = self
            .ttl_queue
            .iter()
            .take_while(|(at, _)| *at <= now)
            .map(|&(_, id)| id)
            .collect();
        for id in &expired {
            let _ = self.take_item(*id);
        }
        if !expired.is_empty() {
            tracing::debug!(
                target: "murmur::check_ttl",
                "Destroyed {} expired items",
                expired.len()
            );
        }
        expired
    }

    // ---- Queries ------------------------------------------------------

    /// Message ids of a conversation carrying the given index tag, in order.
    pub fn shared_media(
        &self,
        conversation: ConversationId,
        kind: SharedMediaType,
    ) -> Vec<MsgId> {
        self.shared_media
            .get(&(conversation, kind))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// List-row preview for an item. Album members contribute a merged
    /// preview of the whole group unless `options.ignore_group` is set.
    pub fn item_preview(&mut self, id: FullItemId, options: PreviewOptions) -> Result<Preview> {
        let item = self.items.get(&id).ok_or(MurmurError::UnknownItem(id))?;
        let group = match item.group_id {
            Some(group) if !options.ignore_group => {
                self.albums.get(&group).filter(|album| album.is_group())
            }
            _ => None,
        };
        match group {
            Some(album) => {
                let members: Vec<(&MediaVariant, &RichText)> = album
                    .items()
                    .iter()
                    .filter_map(|member| self.items.get(member))
                    .filter_map(|member| member.media.as_ref().map(|m| (m, &member.text)))
                    .collect();
                Ok(media::merge_group_preview(members, &mut self.previews))
            }
            None => {
                let media = item.media.as_ref();
                match media {
                    Some(media) => {
                        let text = item.text.clone();
                        let media = media.clone();
                        Ok(media.to_preview_single(&text, &mut self.previews))
                    }
                    None => Ok(Preview {
                        text: item.text.text.clone(),
                        images: Vec::new(),
                    }),
                }
            }
        }
    }

    /// Packed geometry for an album at the given container width, in member
    /// order. Members without a visual size pack as squares.
    pub fn album_layout(&mut self, group: GroupId, width: i32) -> Result<Vec<GroupMediaLayout>> {
        let album = self
            .albums
            .get(&group)
            .ok_or(MurmurError::Album(crate::error::AlbumError::UnknownGroup(group)))?;
        let sizes: Vec<(u32, u32)> = album
            .items()
            .iter()
            .map(|member| {
                self.items
                    .get(member)
                    .and_then(|item| item.media.as_ref())
                    .map(|media| media.grouping_size())
                    .unwrap_or((1, 1))
            })
            .collect();
        let layout = self.config.layout;
        let album = self.albums.get_mut(&group).expect("checked above");
        Ok(album.layout_for_width(
            &sizes,
            layout.max_album_width,
            layout.min_item_width,
            layout.item_spacing,
            width,
        ))
    }

    pub fn album(&self, group: GroupId) -> Option<&GroupAlbum> {
        self.albums.get(&group)
    }

    /// Builds the render snapshot of an item.
    pub fn create_view(&self, id: FullItemId) -> Result<ItemView> {
        let item = self.items.get(&id).ok_or(MurmurError::UnknownItem(id))?;
        let is_self_chat = self
            .conversations
            .get(&id.conversation)
            .map(|c| c.is_self_chat)
            .unwrap_or(false);
        let grouped = item
            .group_id
            .and_then(|group| self.albums.get(&group))
            .map(|album| album.is_group())
            .unwrap_or(false);
        Ok(ItemView {
            id,
            text: item.text.text.clone(),
            media_kind: item.media.as_ref().map(|media| media.kind()),
            outgoing: item.flags.contains(MessageFlags::OUTGOING),
            pinned: item.flags.contains(MessageFlags::PINNED),
            edited: item.edited_date().is_some(),
            unread: item.unread(is_self_chat),
            service: item.service,
            grouped,
        })
    }

    // ---- Preview plumbing ----------------------------------------------

    pub fn preview_decoder(&self) -> PreviewDecoder {
        self.previews.decoder()
    }

    /// Applies finished preview decodes. Returns how many previews changed.
    pub fn drain_preview_results(&mut self) -> usize {
        self.previews.drain_completed()
    }

    // ---- Index maintenance ----------------------------------------------

    fn register_item(&mut self, item: Item) {
        let id = item.full_id();
        if let Some(group) = item.group_id {
            let album = self
                .albums
                .entry(group)
                .or_insert_with(|| GroupAlbum::new(group));
            if album.len() >= crate::layout::MAX_ALBUM_SIZE {
                tracing::warn!(
                    target: "murmur::register_item",
                    "Group {:?} is full, item {:?} joins ungrouped",
                    group,
                    id
                );
                let mut item = item;
                item.group_id = None;
                self.items.insert(id, item);
                return;
            }
            album.add(id);
        }
        if item.is_regular() {
            if let Some(media) = &item.media {
                for kind in media.shared_media_types() {
                    self.index_shared(id, *kind);
                }
            }
        }
        if let Some(at) = item.ttl_destroy_at {
            self.ttl_queue.insert((at, id));
        }
        self.items.insert(id, item);
    }

    fn take_item(&mut self, id: FullItemId) -> Result<Item> {
        let item = self.items.remove(&id).ok_or(MurmurError::UnknownItem(id))?;
        if let Some(group) = item.group_id {
            self.remove_album_member(group, id);
        }
        if item.is_regular() {
            if let Some(media) = &item.media {
                for kind in media.shared_media_types() {
                    self.unindex_shared(id, *kind);
                }
            }
        }
        if let Some(at) = item.ttl_destroy_at {
            self.ttl_queue.remove(&(at, id));
        }
        // The preview entry dies with its last referent.
        if let Some(source) = item.media.as_ref().and_then(|media| media.preview_source()) {
            if !self.content_referenced(source.content) {
                self.previews.invalidate(source.content);
            }
        }
        Ok(item)
    }

    fn remove_album_member(&mut self, group: GroupId, id: FullItemId) {
        if let Some(album) = self.albums.get_mut(&group) {
            album.remove(id);
            if album.is_empty() {
                self.albums.remove(&group);
            }
        }
    }

    /// Whether any live item previews the given content.
    fn content_referenced(&self, content: crate::content::ContentId) -> bool {
        self.items.values().any(|item| {
            item.media
                .as_ref()
                .and_then(|media| media.preview_source())
                .map(|source| source.content == content)
                .unwrap_or(false)
        })
    }

    fn index_shared(&mut self, id: FullItemId, kind: SharedMediaType) {
        self.shared_media
            .entry((id.conversation, kind))
            .or_default()
            .insert(id.msg);
    }

    fn unindex_shared(&mut self, id: FullItemId, kind: SharedMediaType) {
        if let Some(set) = self.shared_media.get_mut(&(id.conversation, kind)) {
            set.remove(&id.msg);
            if set.is_empty() {
                self.shared_media.remove(&(id.conversation, kind));
            }
        }
    }
}

impl std::fmt::Debug for Murmur {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Murmur")
            .field("config", &self.config)
            .field("conversations", &self.conversations.len())
            .field("items", &self.items.len())
            .field("albums", &self.albums.len())
            .field("previews", &self.previews)
            .finish()
    }
}
