//! Album aggregation over sibling items.
//!
//! An album is the ordered set of items sharing one group id. The album is
//! the composite; members stay independently addressable in the arena and
//! only carry the group id. Geometry is computed once at the configured
//! maximum width and rescaled for narrower containers, so resizing never
//! re-runs the packing search.

use serde::{Deserialize, Serialize};

use crate::layout::{layout_media_group, GroupMediaLayout, Rect};
use crate::types::{FullItemId, GroupId};

/// Layout packed at a specific width, kept until membership changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedLayout {
    width: i32,
    layouts: Vec<GroupMediaLayout>,
}

/// The members of one media group, in message order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAlbum {
    pub group_id: GroupId,
    items: Vec<FullItemId>,
    natural: Option<CachedLayout>,
}

impl GroupAlbum {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            items: Vec::new(),
            natural: None,
        }
    }

    pub fn items(&self) -> &[FullItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A single remaining member renders as an ordinary message.
    pub fn is_group(&self) -> bool {
        self.items.len() >= 2
    }

    pub fn contains(&self, id: FullItemId) -> bool {
        self.items.contains(&id)
    }

    /// Inserts a member keeping message order. Membership changes drop the
    /// cached geometry.
    pub fn add(&mut self, id: FullItemId) {
        if self.items.contains(&id) {
            return;
        }
        let position = self.items.partition_point(|&member| member < id);
        self.items.insert(position, id);
        self.natural = None;
    }

    pub fn remove(&mut self, id: FullItemId) -> bool {
        let Some(position) = self.items.iter().position(|&member| member == id) else {
            return false;
        };
        self.items.remove(position);
        self.natural = None;
        true
    }

    /// Re-keys a member in place when its message id is confirmed. Order is
    /// restored by re-sorting; geometry survives because membership and
    /// member count are unchanged.
    pub fn rekey(&mut self, old: FullItemId, new: FullItemId) -> bool {
        let Some(position) = self.items.iter().position(|&member| member == old) else {
            return false;
        };
        self.items[position] = new;
        self.items.sort();
        true
    }

    #[cfg(test)]
    pub(crate) fn has_cached_layout(&self) -> bool {
        self.natural.is_some()
    }

    /// Packed geometry for the given container width.
    ///
    /// `sizes` must be the members' intrinsic sizes in message order. The
    /// packing runs at `max_width`; narrower containers get the same block
    /// rescaled edge-wise so rows stay flush and no pixel gaps appear.
    pub fn layout_for_width(
        &mut self,
        sizes: &[(u32, u32)],
        max_width: i32,
        min_width: i32,
        spacing: i32,
        width: i32,
    ) -> Vec<GroupMediaLayout> {
        debug_assert_eq!(sizes.len(), self.items.len());
        let stale = !matches!(&self.natural, Some(cached) if cached.width == max_width);
        if stale {
            let layouts = layout_media_group(sizes, max_width, min_width, spacing);
            self.natural = Some(CachedLayout {
                width: max_width,
                layouts,
            });
        }
        let natural = self.natural.as_ref().expect("populated above");
        if width >= max_width {
            return natural.layouts.clone();
        }
        let factor = f64::from(width) / f64::from(max_width);
        natural
            .layouts
            .iter()
            .map(|layout| GroupMediaLayout {
                geometry: scale_rect(layout.geometry, factor),
                shared_sides: layout.shared_sides,
            })
            .collect()
    }
}

// Edges are scaled independently and widths recomputed from them, so two
// rectangles that were flush stay flush after rounding.
fn scale_rect(rect: Rect, factor: f64) -> Rect {
    let scale = |value: i32| (f64::from(value) * factor).round() as i32;
    let left = scale(rect.x);
    let top = scale(rect.y);
    let right = scale(rect.right());
    let bottom = scale(rect.bottom());
    Rect::new(left, top, right - left, bottom - top)
}
