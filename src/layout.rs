//! Grouped-album packing.
//!
//! Pure geometry: given the intrinsic aspect ratios of up to
//! [`MAX_ALBUM_SIZE`] items and a container width, produce one packed block of
//! rectangles plus, for every rectangle, which of its edges touch a sibling.
//! Shared edges suppress corner rounding downstream; the renderer only reads
//! the output, it never feeds anything back.
//!
//! The result is deterministic for identical inputs. Width-only changes are
//! handled by the caller through uniform rescaling (see
//! [`crate::album::GroupAlbum`]); this module is re-run only when membership
//! changes.

use serde::{Deserialize, Serialize};

/// Hard cap on album membership. Enforced by callers before layout.
pub const MAX_ALBUM_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Which edges of a rectangle are adjacent to a sibling rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Sides {
    pub const NONE: Sides = Sides {
        top: false,
        right: false,
        bottom: false,
        left: false,
    };

    fn grid(row: usize, row_count: usize, col: usize, col_count: usize) -> Self {
        Sides {
            top: row > 0,
            bottom: row + 1 < row_count,
            left: col > 0,
            right: col + 1 < col_count,
        }
    }
}

/// Which corners keep their rounding: exactly those whose both adjacent
/// edges are outer edges of the block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corners {
    pub top_left: bool,
    pub top_right: bool,
    pub bottom_left: bool,
    pub bottom_right: bool,
}

pub fn corners_from_shared(sides: Sides) -> Corners {
    Corners {
        top_left: !sides.top && !sides.left,
        top_right: !sides.top && !sides.right,
        bottom_left: !sides.bottom && !sides.left,
        bottom_right: !sides.bottom && !sides.right,
    }
}

/// One packed rectangle of an album block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMediaLayout {
    pub geometry: Rect,
    pub shared_sides: Sides,
}

/// Packs `sizes` (intrinsic pixel sizes, only their ratios matter) into a
/// block no wider than `max_width`. Rows are filled left to right in input
/// order; the last rectangle of each row absorbs rounding so every row spans
/// the full block width.
pub fn layout_media_group(
    sizes: &[(u32, u32)],
    max_width: i32,
    min_width: i32,
    spacing: i32,
) -> Vec<GroupMediaLayout> {
    debug_assert!(sizes.len() <= MAX_ALBUM_SIZE);

    let ratios: Vec<f64> = sizes
        .iter()
        .map(|&(w, h)| {
            if h == 0 {
                1.0
            } else {
                f64::from(w) / f64::from(h)
            }
        })
        .collect();

    match ratios.len() {
        0 => Vec::new(),
        1 => layout_one(&ratios, max_width),
        2 => layout_two(&ratios, max_width, min_width, spacing),
        _ => layout_rows(&ratios, max_width, min_width, spacing),
    }
}

fn round(value: f64) -> i32 {
    value.round() as i32
}

// Wide / narrow / squarish classification thresholds.
fn proportion(ratio: f64) -> char {
    if ratio > 1.2 {
        'w'
    } else if ratio < 0.8 {
        'n'
    } else {
        'q'
    }
}

fn layout_one(ratios: &[f64], max_width: i32) -> Vec<GroupMediaLayout> {
    let width = max_width;
    let height = round(f64::from(width) / ratios[0]).max(1);
    vec![GroupMediaLayout {
        geometry: Rect::new(0, 0, width, height),
        shared_sides: Sides::NONE,
    }]
}

fn layout_two(
    ratios: &[f64],
    max_width: i32,
    min_width: i32,
    spacing: i32,
) -> Vec<GroupMediaLayout> {
    let max_height = max_width;
    let average = (ratios[0] + ratios[1]) / 2.0;
    let proportions: String = ratios.iter().copied().map(proportion).collect();

    if proportions == "ww" && average > 1.4 && (ratios[1] - ratios[0]).abs() < 0.2 {
        // Two wide panoramas of similar shape stack vertically.
        let width = max_width;
        let height = round(
            (f64::from(width) / ratios[0])
                .min(f64::from(width) / ratios[1])
                .min(f64::from(max_height - spacing) / 2.0),
        );
        vec![
            GroupMediaLayout {
                geometry: Rect::new(0, 0, width, height),
                shared_sides: Sides {
                    bottom: true,
                    ..Sides::NONE
                },
            },
            GroupMediaLayout {
                geometry: Rect::new(0, height + spacing, width, height),
                shared_sides: Sides {
                    top: true,
                    ..Sides::NONE
                },
            },
        ]
    } else if proportions == "ww" || proportions == "qq" {
        let width = (max_width - spacing) / 2;
        let height = round(
            (f64::from(width) / ratios[0])
                .min(f64::from(width) / ratios[1])
                .min(f64::from(max_height)),
        );
        side_by_side(width, width + spacing, width, height)
    } else {
        let minimal = round(f64::from(min_width) * 1.5);
        let second = round(
            (0.4 * f64::from(max_width - spacing)).max(
                f64::from(max_width - spacing) / ratios[0]
                    / (1.0 / ratios[0] + 1.0 / ratios[1]),
            ),
        )
        .min(max_width - spacing - minimal);
        let first = max_width - second - spacing;
        let height = max_height.min(round(
            (f64::from(first) / ratios[0]).min(f64::from(second) / ratios[1]),
        ));
        side_by_side(first, first + spacing, second, height)
    }
}

fn side_by_side(first_width: i32, second_x: i32, second_width: i32, height: i32) -> Vec<GroupMediaLayout> {
    vec![
        GroupMediaLayout {
            geometry: Rect::new(0, 0, first_width, height),
            shared_sides: Sides {
                right: true,
                ..Sides::NONE
            },
        },
        GroupMediaLayout {
            geometry: Rect::new(second_x, 0, second_width, height),
            shared_sides: Sides {
                left: true,
                ..Sides::NONE
            },
        },
    ]
}

struct Attempt {
    line_counts: Vec<usize>,
    heights: Vec<f64>,
}

/// Row-partition search for three and more items: try every split of the
/// sequence into 2..=4 rows of at most three (occasionally four) items, pick
/// the one whose total height lands closest to a square block, then emit the
/// rows left to right.
fn layout_rows(
    ratios: &[f64],
    max_width: i32,
    min_width: i32,
    spacing: i32,
) -> Vec<GroupMediaLayout> {
    let count = ratios.len();
    let average = ratios.iter().sum::<f64>() / count as f64;
    let target_height = f64::from(max_width);

    // Extreme ratios distort row heights; crop around the average shape.
    let cropped: Vec<f64> = ratios
        .iter()
        .map(|&ratio| {
            if average > 1.1 {
                ratio.clamp(1.0, 2.75)
            } else {
                ratio.clamp(0.6667, 1.0)
            }
        })
        .collect();

    let row_height = |offset: usize, len: usize| -> f64 {
        let sum: f64 = cropped[offset..offset + len].iter().sum();
        f64::from(max_width - (len as i32 - 1) * spacing) / sum
    };
    let heights_for = |line_counts: &[usize]| -> Vec<f64> {
        let mut offset = 0;
        line_counts
            .iter()
            .map(|&len| {
                let height = row_height(offset, len);
                offset += len;
                height
            })
            .collect()
    };

    let second_row_limit = if average < 0.85 { 4 } else { 3 };
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut push = |line_counts: Vec<usize>| {
        let heights = heights_for(&line_counts);
        attempts.push(Attempt {
            line_counts,
            heights,
        });
    };

    for first in 1..count {
        let second = count - first;
        if first <= 3 && second <= 3 {
            push(vec![first, second]);
        }
    }
    for first in 1..count.saturating_sub(1) {
        for second in 1..count - first {
            let third = count - first - second;
            if first <= 3 && second <= second_row_limit && third <= 3 {
                push(vec![first, second, third]);
            }
        }
    }
    for first in 1..count.saturating_sub(2) {
        for second in 1..count - first - 1 {
            for third in 1..count - first - second {
                let fourth = count - first - second - third;
                if first <= 3 && second <= 3 && third <= 3 && fourth <= 3 {
                    push(vec![first, second, third, fourth]);
                }
            }
        }
    }

    let optimal = attempts
        .iter()
        .map(|attempt| {
            let total: f64 = attempt.heights.iter().sum::<f64>()
                + f64::from(spacing) * (attempt.heights.len() as f64 - 1.0);
            let min_line = attempt
                .heights
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min);
            let bad_thin = if min_line < f64::from(min_width) {
                1.5
            } else {
                1.0
            };
            let bad_order = if attempt
                .line_counts
                .windows(2)
                .any(|pair| pair[0] > pair[1])
            {
                1.5
            } else {
                1.0
            };
            let diff = (total - target_height).abs() * bad_thin * bad_order;
            (attempt, diff)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(attempt, _)| attempt)
        .expect("at least one row partition exists for count >= 3");

    let row_count = optimal.line_counts.len();
    let mut result = Vec::with_capacity(count);
    let mut index = 0usize;
    let mut y = 0i32;
    for (row, (&col_count, &line_height)) in optimal
        .line_counts
        .iter()
        .zip(optimal.heights.iter())
        .enumerate()
    {
        let height = round(line_height).max(1);
        let mut x = 0i32;
        for col in 0..col_count {
            let width = if col + 1 == col_count {
                max_width - x
            } else {
                round(cropped[index] * line_height)
            };
            result.push(GroupMediaLayout {
                geometry: Rect::new(x, y, width, height),
                shared_sides: Sides::grid(row, row_count, col, col_count),
            });
            x += width + spacing;
            index += 1;
        }
        y += height + spacing;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_overlap(layouts: &[GroupMediaLayout]) {
        for (i, a) in layouts.iter().enumerate() {
            for b in &layouts[i + 1..] {
                assert!(
                    !a.geometry.intersects(&b.geometry),
                    "{:?} overlaps {:?}",
                    a.geometry,
                    b.geometry
                );
            }
        }
    }

    #[test]
    fn test_empty_group() {
        assert!(layout_media_group(&[], 800, 108, 4).is_empty());
    }

    #[test]
    fn test_single_item_spans_full_width() {
        let layouts = layout_media_group(&[(400, 300)], 800, 108, 4);
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].geometry, Rect::new(0, 0, 800, 600));
        assert_eq!(layouts[0].shared_sides, Sides::NONE);
    }

    #[test]
    fn test_two_squares_side_by_side() {
        let layouts = layout_media_group(&[(500, 500), (500, 500)], 800, 108, 4);
        assert_eq!(layouts.len(), 2);
        assert!(layouts[0].shared_sides.right);
        assert!(layouts[1].shared_sides.left);
        assert_eq!(layouts[0].geometry.y, layouts[1].geometry.y);
        assert_eq!(layouts[1].geometry.right(), 800);
        assert_no_overlap(&layouts);
    }

    #[test]
    fn test_two_similar_panoramas_stack() {
        let layouts = layout_media_group(&[(1600, 500), (1610, 500)], 800, 108, 4);
        assert_eq!(layouts.len(), 2);
        assert!(layouts[0].shared_sides.bottom);
        assert!(layouts[1].shared_sides.top);
        assert_eq!(layouts[0].geometry.width, 800);
        assert_eq!(layouts[1].geometry.width, 800);
        assert_no_overlap(&layouts);
    }

    #[test]
    fn test_three_item_scenario_squares_over_panorama() {
        // Two squares share a vertical edge above the full-width 2:1 item.
        let layouts = layout_media_group(&[(500, 500), (500, 500), (1000, 500)], 800, 108, 4);
        assert_eq!(layouts.len(), 3);
        assert_no_overlap(&layouts);

        let union_right = layouts.iter().map(|l| l.geometry.right()).max().unwrap();
        let union_left = layouts.iter().map(|l| l.geometry.x).min().unwrap();
        assert_eq!(union_right - union_left, 800);

        assert!(layouts[0].shared_sides.right);
        assert!(layouts[1].shared_sides.left);
        assert_eq!(layouts[0].geometry.y, layouts[1].geometry.y);
        assert!(layouts[2].shared_sides.top);
        assert!(!layouts[2].shared_sides.left && !layouts[2].shared_sides.right);
    }

    #[test]
    fn test_determinism() {
        let sizes: Vec<(u32, u32)> = vec![
            (640, 480),
            (480, 640),
            (1000, 420),
            (300, 300),
            (900, 600),
        ];
        let first = layout_media_group(&sizes, 760, 108, 4);
        let second = layout_media_group(&sizes, 760, 108, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_group_sizes_produce_full_layouts() {
        for count in 1..=MAX_ALBUM_SIZE {
            let sizes: Vec<(u32, u32)> = (0..count)
                .map(|i| (400 + 37 * i as u32, 400))
                .collect();
            let layouts = layout_media_group(&sizes, 800, 108, 4);
            assert_eq!(layouts.len(), count, "count {count}");
            assert_no_overlap(&layouts);
            for layout in &layouts {
                assert!(layout.geometry.width > 0);
                assert!(layout.geometry.height > 0);
                assert!(layout.geometry.right() <= 800);
            }
        }
    }

    #[test]
    fn test_rows_span_full_width() {
        let sizes: Vec<(u32, u32)> = (0..7).map(|_| (600, 400)).collect();
        let layouts = layout_media_group(&sizes, 800, 108, 4);
        // Every row's rightmost rectangle is flush with the block edge.
        for layout in &layouts {
            if !layout.shared_sides.right {
                assert_eq!(layout.geometry.right(), 800);
            }
        }
    }

    #[test]
    fn test_corners_from_shared() {
        let corners = corners_from_shared(Sides {
            top: false,
            right: true,
            bottom: true,
            left: false,
        });
        assert!(corners.top_left);
        assert!(!corners.top_right);
        assert!(!corners.bottom_left);
        assert!(!corners.bottom_right);

        let all = corners_from_shared(Sides::NONE);
        assert!(all.top_left && all.top_right && all.bottom_left && all.bottom_right);
    }
}
