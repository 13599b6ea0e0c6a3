//! Pure geometry: container count in, rectangles out.
//!
//! Arrangement never mutates the tree. Each call partitions the padded work
//! area into one rectangle per container, applies any recorded resize
//! adjustments as shared-boundary shifts (so the result still tiles
//! exactly), applies the flip, and finally insets each rectangle by the
//! container padding.

use serde::{Deserialize, Serialize};

use crate::model::rect::Rect;

/// Smallest width or height a boundary shift may leave a container with.
pub const MIN_CONTAINER_DIMENSION: i32 = 50;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Axis {
    Horizontal,
    Vertical,
    HorizontalAndVertical,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum LayoutKind {
    #[default]
    Bsp,
    Columns,
    Rows,
    VerticalStack,
    HorizontalStack,
    RightMainVerticalStack,
    UltrawideVerticalStack,
    Grid,
    Scrolling,
    Monocle,
}

impl LayoutKind {
    /// Kinds whose geometry is fixed and therefore ignore resize requests.
    pub fn supports_resize(self) -> bool {
        !matches!(self, LayoutKind::Grid | LayoutKind::Monocle)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollingOptions {
    /// How many columns share the work area; the rest sit off-screen.
    pub visible_columns: usize,
    /// Keep the focused column centered instead of merely visible.
    pub center_focused: bool,
}

impl Default for ScrollingOptions {
    fn default() -> Self {
        Self {
            visible_columns: 3,
            center_focused: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Fixed column count for [`LayoutKind::Grid`]; `None` picks
    /// `ceil(sqrt(n))`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<usize>,
    pub scrolling: ScrollingOptions,
}

/// Lay out `len` containers inside `work_area` (already inset by the
/// workspace padding and any work-area offset). `resize_dimensions` holds
/// per-container edge deltas; entries beyond `len` are ignored.
pub fn arrange(
    kind: LayoutKind,
    work_area: Rect,
    len: usize,
    focused_idx: usize,
    container_padding: Option<i32>,
    flip: Option<Axis>,
    resize_dimensions: &[Option<Rect>],
    options: &LayoutOptions,
) -> Vec<Rect> {
    if len == 0 {
        return Vec::new();
    }

    let mut rects = if len == 1 && !matches!(kind, LayoutKind::Scrolling) {
        vec![work_area]
    } else {
        match kind {
            LayoutKind::Bsp => bsp(work_area, len, resize_dimensions),
            LayoutKind::Columns => {
                let mut rects = split_columns(work_area, len);
                shift_column_boundaries(&mut rects, resize_dimensions);
                rects
            }
            LayoutKind::Rows => {
                let mut rects = split_rows(work_area, len);
                shift_row_boundaries(&mut rects, resize_dimensions);
                rects
            }
            LayoutKind::VerticalStack => vertical_stack(work_area, len, resize_dimensions, false),
            LayoutKind::RightMainVerticalStack => {
                vertical_stack(work_area, len, resize_dimensions, true)
            }
            LayoutKind::HorizontalStack => horizontal_stack(work_area, len, resize_dimensions),
            LayoutKind::UltrawideVerticalStack => ultrawide(work_area, len, resize_dimensions),
            LayoutKind::Grid => grid(work_area, len, options.grid_columns),
            LayoutKind::Scrolling => {
                scrolling(work_area, len, focused_idx, resize_dimensions, &options.scrolling)
            }
            LayoutKind::Monocle => monocle(work_area, len, focused_idx),
        }
    };

    if let Some(axis) = flip {
        flip_rects(&mut rects, work_area, axis);
    }

    if let Some(padding) = container_padding {
        for rect in &mut rects {
            rect.add_padding(padding);
        }
    }

    rects
}

/// Equal-width vertical slices; the last slice absorbs the remainder so the
/// slices always tile the area exactly.
fn split_columns(area: Rect, n: usize) -> Vec<Rect> {
    let width = area.width() / n as i32;
    (0..n)
        .map(|i| {
            let left = area.left + i as i32 * width;
            let right = if i == n - 1 { area.right } else { left + width };
            Rect::new(left, area.top, right, area.bottom)
        })
        .collect()
}

fn split_rows(area: Rect, n: usize) -> Vec<Rect> {
    let height = area.height() / n as i32;
    (0..n)
        .map(|i| {
            let top = area.top + i as i32 * height;
            let bottom = if i == n - 1 { area.bottom } else { top + height };
            Rect::new(area.left, top, area.right, bottom)
        })
        .collect()
}

fn delta(resize: &[Option<Rect>], idx: usize) -> Rect {
    resize.get(idx).copied().flatten().unwrap_or_default()
}

/// Move the vertical boundary between `rects[i]` and `rects[i + 1]` by the
/// deltas either side recorded for it, keeping both sides above the minimum
/// width.
fn shift_column_boundaries(rects: &mut [Rect], resize: &[Option<Rect>]) {
    for i in 0..rects.len().saturating_sub(1) {
        let shift = delta(resize, i).right + delta(resize, i + 1).left;
        let shift = clamp_shift(
            shift,
            rects[i].width(),
            rects[i + 1].width(),
        );
        rects[i].right += shift;
        rects[i + 1].left += shift;
    }
}

fn shift_row_boundaries(rects: &mut [Rect], resize: &[Option<Rect>]) {
    for i in 0..rects.len().saturating_sub(1) {
        let shift = delta(resize, i).bottom + delta(resize, i + 1).top;
        let shift = clamp_shift(
            shift,
            rects[i].height(),
            rects[i + 1].height(),
        );
        rects[i].bottom += shift;
        rects[i + 1].top += shift;
    }
}

/// Clamp a boundary shift so the container on either side keeps at least
/// [`MIN_CONTAINER_DIMENSION`].
fn clamp_shift(shift: i32, before: i32, after: i32) -> i32 {
    let max_grow = (after - MIN_CONTAINER_DIMENSION).max(0);
    let max_shrink = (before - MIN_CONTAINER_DIMENSION).max(0);
    shift.clamp(-max_shrink, max_grow)
}

/// Primary pane on one side, the rest stacked in rows on the other.
fn vertical_stack(area: Rect, len: usize, resize: &[Option<Rect>], primary_right: bool) -> Vec<Rect> {
    let mid = area.left + area.width() / 2;
    let (mut primary, stack_area) = if primary_right {
        (
            Rect::new(mid, area.top, area.right, area.bottom),
            Rect::new(area.left, area.top, mid, area.bottom),
        )
    } else {
        (
            Rect::new(area.left, area.top, mid, area.bottom),
            Rect::new(mid, area.top, area.right, area.bottom),
        )
    };

    // All deltas touching the primary/stack divide act on the same boundary.
    let boundary_shift: i32 = if primary_right {
        delta(resize, 0).left + (1..len).map(|i| delta(resize, i).right).sum::<i32>()
    } else {
        delta(resize, 0).right + (1..len).map(|i| delta(resize, i).left).sum::<i32>()
    };
    // A positive shift moves the divide rightward, whichever side that grows.
    let boundary_shift = if primary_right {
        clamp_shift(boundary_shift, stack_area.width(), primary.width())
    } else {
        clamp_shift(boundary_shift, primary.width(), stack_area.width())
    };

    let mut stack_area = stack_area;
    if primary_right {
        primary.left += boundary_shift;
        stack_area.right += boundary_shift;
    } else {
        primary.right += boundary_shift;
        stack_area.left += boundary_shift;
    }

    let mut stack = split_rows(stack_area, len - 1);
    let stack_resize: Vec<Option<Rect>> = (1..len).map(|i| resize.get(i).copied().flatten()).collect();
    shift_row_boundaries(&mut stack, &stack_resize);

    let mut rects = vec![primary];
    rects.extend(stack);
    rects
}

/// Primary pane on top, the rest in a row along the bottom.
fn horizontal_stack(area: Rect, len: usize, resize: &[Option<Rect>]) -> Vec<Rect> {
    let mid = area.top + area.height() / 2;
    let mut primary = Rect::new(area.left, area.top, area.right, mid);
    let mut stack_area = Rect::new(area.left, mid, area.right, area.bottom);

    let boundary_shift =
        delta(resize, 0).bottom + (1..len).map(|i| delta(resize, i).top).sum::<i32>();
    let boundary_shift = clamp_shift(boundary_shift, primary.height(), stack_area.height());
    primary.bottom += boundary_shift;
    stack_area.top += boundary_shift;

    let mut stack = split_columns(stack_area, len - 1);
    let stack_resize: Vec<Option<Rect>> = (1..len).map(|i| resize.get(i).copied().flatten()).collect();
    shift_column_boundaries(&mut stack, &stack_resize);

    let mut rects = vec![primary];
    rects.extend(stack);
    rects
}

/// Primary pane centered, second pane to its left, everything else stacked
/// in the right quarter.
fn ultrawide(area: Rect, len: usize, resize: &[Option<Rect>]) -> Vec<Rect> {
    if len == 2 {
        let mid = area.left + area.width() / 2;
        let mut secondary = Rect::new(area.left, area.top, mid, area.bottom);
        let mut primary = Rect::new(mid, area.top, area.right, area.bottom);
        let shift = delta(resize, 1).right + delta(resize, 0).left;
        let shift = clamp_shift(shift, secondary.width(), primary.width());
        secondary.right += shift;
        primary.left += shift;
        return vec![primary, secondary];
    }

    let quarter = area.width() / 4;
    let mut secondary = Rect::new(area.left, area.top, area.left + quarter, area.bottom);
    let mut primary = Rect::new(secondary.right, area.top, secondary.right + 2 * quarter, area.bottom);
    let mut stack_area = Rect::new(primary.right, area.top, area.right, area.bottom);

    let left_shift = delta(resize, 1).right + delta(resize, 0).left;
    let left_shift = clamp_shift(left_shift, secondary.width(), primary.width());
    secondary.right += left_shift;
    primary.left += left_shift;

    let right_shift =
        delta(resize, 0).right + (2..len).map(|i| delta(resize, i).left).sum::<i32>();
    let right_shift = clamp_shift(right_shift, primary.width(), stack_area.width());
    primary.right += right_shift;
    stack_area.left += right_shift;

    let mut stack = split_rows(stack_area, len - 2);
    let stack_resize: Vec<Option<Rect>> = (2..len).map(|i| resize.get(i).copied().flatten()).collect();
    shift_row_boundaries(&mut stack, &stack_resize);

    let mut rects = vec![primary, secondary];
    rects.extend(stack);
    rects
}

/// Alternating half-splits over the sibling order; split axis alternates
/// with depth, starting with a vertical divide.
fn bsp(area: Rect, len: usize, resize: &[Option<Rect>]) -> Vec<Rect> {
    let mut rects = Vec::with_capacity(len);
    let mut remaining = area;
    for i in 0..len - 1 {
        let horizontal_divide = i % 2 == 0;
        let (first, rest) = if horizontal_divide {
            let mid = remaining.left + remaining.width() / 2;
            let shift = delta(resize, i).right + delta(resize, i + 1).left;
            let shift = clamp_shift(shift, mid - remaining.left, remaining.right - mid);
            (
                Rect::new(remaining.left, remaining.top, mid + shift, remaining.bottom),
                Rect::new(mid + shift, remaining.top, remaining.right, remaining.bottom),
            )
        } else {
            let mid = remaining.top + remaining.height() / 2;
            let shift = delta(resize, i).bottom + delta(resize, i + 1).top;
            let shift = clamp_shift(shift, mid - remaining.top, remaining.bottom - mid);
            (
                Rect::new(remaining.left, remaining.top, remaining.right, mid + shift),
                Rect::new(remaining.left, mid + shift, remaining.right, remaining.bottom),
            )
        };
        rects.push(first);
        remaining = rest;
    }
    rects.push(remaining);
    rects
}

/// Row-wise cells; a short final row stretches its cells to keep the tiling
/// exact. Resize adjustments are ignored.
fn grid(area: Rect, len: usize, configured_columns: Option<usize>) -> Vec<Rect> {
    let cols = configured_columns
        .filter(|&c| c > 0)
        .unwrap_or_else(|| (len as f64).sqrt().ceil() as usize)
        .min(len);
    let rows = len.div_ceil(cols);
    let row_rects = split_rows(area, rows);

    let mut rects = Vec::with_capacity(len);
    for (row, row_rect) in row_rects.iter().enumerate() {
        let in_row = if row == rows - 1 { len - row * cols } else { cols };
        rects.extend(split_columns(*row_rect, in_row));
    }
    rects
}

/// Fixed-width columns in a strip; the strip scrolls so the focused column
/// stays on screen, and columns past either edge land off-screen.
fn scrolling(
    area: Rect,
    len: usize,
    focused_idx: usize,
    resize: &[Option<Rect>],
    options: &ScrollingOptions,
) -> Vec<Rect> {
    let visible = options.visible_columns.max(1).min(len);
    let focused_idx = focused_idx.min(len - 1);

    let first = if options.center_focused {
        focused_idx
            .saturating_sub(visible / 2)
            .min(len - visible)
    } else if focused_idx < visible {
        0
    } else {
        (focused_idx + 1 - visible).min(len - visible)
    };

    let width = area.width() / visible as i32;
    let remainder = area.width() - width * visible as i32;
    // The last visible column absorbs the division remainder, so columns are
    // placed relative to their neighbours rather than by a fixed stride.
    let column_width =
        |i: usize| if i + 1 == first + visible { width + remainder } else { width };

    let mut lefts = vec![area.left; len];
    for i in first + 1..len {
        lefts[i] = lefts[i - 1] + column_width(i - 1);
    }
    for i in (0..first).rev() {
        lefts[i] = lefts[i + 1] - column_width(i);
    }

    let mut rects: Vec<Rect> = (0..len)
        .map(|i| Rect::new(lefts[i], area.top, lefts[i] + column_width(i), area.bottom))
        .collect();
    shift_column_boundaries(&mut rects, resize);
    rects
}

/// Only the focused container gets the work area; the rest collapse to an
/// empty rectangle at the origin so their windows drop off screen.
fn monocle(area: Rect, len: usize, focused_idx: usize) -> Vec<Rect> {
    let focused_idx = focused_idx.min(len - 1);
    (0..len)
        .map(|i| {
            if i == focused_idx {
                area
            } else {
                Rect::new(area.left, area.top, area.left, area.top)
            }
        })
        .collect()
}

fn flip_rects(rects: &mut [Rect], area: Rect, axis: Axis) {
    for rect in rects {
        *rect = match axis {
            Axis::Horizontal => rect.flipped_horizontal(&area),
            Axis::Vertical => rect.flipped_vertical(&area),
            Axis::HorizontalAndVertical => rect.flipped_horizontal(&area).flipped_vertical(&area),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const AREA: Rect = Rect {
        left: 0,
        top: 0,
        right: 1920,
        bottom: 1080,
    };

    fn plain(kind: LayoutKind, len: usize) -> Vec<Rect> {
        arrange(kind, AREA, len, 0, None, None, &[], &LayoutOptions::default())
    }

    /// With zero padding the rectangles must cover the work area exactly,
    /// with no overlap.
    fn assert_tiles(rects: &[Rect], area: Rect) {
        let total: i64 = rects.iter().map(Rect::area).sum();
        assert_eq!(total, area.area(), "areas must sum to the work area");
        for rect in rects {
            assert!(area.contains(rect), "{rect:?} escapes {area:?}");
        }
        for (i, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn every_tiled_kind_tiles_exactly_for_one_through_eight() {
        let kinds = [
            LayoutKind::Bsp,
            LayoutKind::Columns,
            LayoutKind::Rows,
            LayoutKind::VerticalStack,
            LayoutKind::HorizontalStack,
            LayoutKind::RightMainVerticalStack,
            LayoutKind::UltrawideVerticalStack,
            LayoutKind::Grid,
        ];
        for kind in kinds {
            for len in 1..=8 {
                let rects = plain(kind, len);
                assert_eq!(rects.len(), len, "{kind} with {len} containers");
                assert_tiles(&rects, AREA);
            }
        }
    }

    #[test]
    fn scrolling_tiles_when_everything_fits() {
        for len in 1..=3 {
            let rects = plain(LayoutKind::Scrolling, len);
            assert_eq!(rects.len(), len);
            assert_tiles(&rects, AREA);
        }
    }

    #[test]
    fn scrolling_keeps_the_focused_column_visible() {
        for focused in 0..6 {
            let rects = arrange(
                LayoutKind::Scrolling,
                AREA,
                6,
                focused,
                None,
                None,
                &[],
                &LayoutOptions::default(),
            );
            let r = &rects[focused];
            assert!(r.left >= AREA.left && r.right <= AREA.right, "focused {focused}: {r:?}");
        }
    }

    #[test]
    fn scrolling_off_screen_columns_clear_the_visible_strip() {
        // 1000 / 3 leaves a remainder for the last visible column to absorb;
        // the first off-screen column must still start past it.
        let area = Rect::new(0, 0, 1000, 600);
        let rects = arrange(
            LayoutKind::Scrolling,
            area,
            4,
            0,
            None,
            None,
            &[],
            &LayoutOptions::default(),
        );
        assert_eq!(rects[2].right, area.right);
        assert!(
            rects[3].left >= rects[2].right,
            "{:?} overlaps the visible strip",
            rects[3]
        );
        for pair in rects.windows(2) {
            assert!(!pair[0].intersects(&pair[1]), "{pair:?}");
        }
    }

    #[test]
    fn center_focused_keeps_the_column_in_the_middle_slot() {
        let options = LayoutOptions {
            scrolling: ScrollingOptions {
                visible_columns: 3,
                center_focused: true,
            },
            ..Default::default()
        };

        let rects = arrange(LayoutKind::Scrolling, AREA, 6, 3, None, None, &[], &options);
        assert_eq!(rects[3], Rect::new(640, 0, 1280, 1080));

        // Clamped at the front: nothing to scroll past.
        let rects = arrange(LayoutKind::Scrolling, AREA, 6, 0, None, None, &[], &options);
        assert_eq!(rects[0].left, AREA.left);

        // Clamped at the back: the strip stops at the last column.
        let rects = arrange(LayoutKind::Scrolling, AREA, 6, 5, None, None, &[], &options);
        assert_eq!(rects[5].right, AREA.right);
    }

    #[test]
    fn bsp_matches_the_alternating_split_shape() {
        let rects = plain(LayoutKind::Bsp, 3);
        assert_eq!(rects[0], Rect::new(0, 0, 960, 1080));
        assert_eq!(rects[1], Rect::new(960, 0, 1920, 540));
        assert_eq!(rects[2], Rect::new(960, 540, 1920, 1080));
    }

    #[test]
    fn a_single_container_always_fills_the_area() {
        for kind in [LayoutKind::Bsp, LayoutKind::Grid, LayoutKind::Monocle] {
            assert_eq!(plain(kind, 1), vec![AREA]);
        }
    }

    #[test]
    fn monocle_collapses_the_unfocused() {
        let rects = arrange(
            LayoutKind::Monocle,
            AREA,
            3,
            1,
            None,
            None,
            &[],
            &LayoutOptions::default(),
        );
        assert_eq!(rects[1], AREA);
        assert!(rects[0].is_empty());
        assert!(rects[2].is_empty());
    }

    #[test]
    fn vertical_stack_puts_the_primary_on_the_left() {
        let rects = plain(LayoutKind::VerticalStack, 3);
        assert_eq!(rects[0], Rect::new(0, 0, 960, 1080));
        assert_eq!(rects[1], Rect::new(960, 0, 1920, 540));
        assert_eq!(rects[2], Rect::new(960, 540, 1920, 1080));
    }

    #[test]
    fn right_main_mirrors_the_primary() {
        let rects = plain(LayoutKind::RightMainVerticalStack, 3);
        assert_eq!(rects[0], Rect::new(960, 0, 1920, 1080));
        assert_eq!(rects[1], Rect::new(0, 0, 960, 540));
    }

    #[test]
    fn resize_shifts_a_shared_boundary_and_still_tiles() {
        let resize = vec![
            Some(Rect::new(0, 0, 100, 0)),
            None,
        ];
        let rects = arrange(
            LayoutKind::Columns,
            AREA,
            2,
            0,
            None,
            None,
            &resize,
            &LayoutOptions::default(),
        );
        assert_eq!(rects[0].right, 1060);
        assert_eq!(rects[1].left, 1060);
        assert_tiles(&rects, AREA);
    }

    #[test]
    fn resize_clamps_at_the_minimum_dimension() {
        let resize = vec![Some(Rect::new(0, 0, 10_000, 0)), None];
        let rects = arrange(
            LayoutKind::Columns,
            AREA,
            2,
            0,
            None,
            None,
            &resize,
            &LayoutOptions::default(),
        );
        assert_eq!(rects[1].width(), MIN_CONTAINER_DIMENSION);
        assert_tiles(&rects, AREA);
    }

    #[test]
    fn flip_mirrors_within_the_work_area() {
        let rects = arrange(
            LayoutKind::Columns,
            AREA,
            2,
            0,
            None,
            Some(Axis::Horizontal),
            &[],
            &LayoutOptions::default(),
        );
        assert_eq!(rects[0], Rect::new(960, 0, 1920, 1080));
        assert_eq!(rects[1], Rect::new(0, 0, 960, 1080));
        assert_tiles(&rects, AREA);
    }

    #[test]
    fn container_padding_insets_every_rect() {
        let rects = arrange(
            LayoutKind::Columns,
            AREA,
            2,
            0,
            Some(10),
            None,
            &[],
            &LayoutOptions::default(),
        );
        assert_eq!(rects[0], Rect::new(10, 10, 950, 1070));
        assert_eq!(rects[1], Rect::new(970, 10, 1910, 1070));
    }

    #[test]
    fn grid_honours_a_configured_column_count() {
        let rects = arrange(
            LayoutKind::Grid,
            AREA,
            4,
            0,
            None,
            None,
            &[],
            &LayoutOptions {
                grid_columns: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(rects.len(), 4);
        assert!(rects.iter().all(|r| r.height() == 1080));
        assert_tiles(&rects, AREA);
    }

    #[test]
    fn grid_stretches_a_short_final_row() {
        let rects = plain(LayoutKind::Grid, 3);
        // Two columns, two rows, one cell in the final row.
        assert_eq!(rects[2].width(), AREA.width());
        assert_tiles(&rects, AREA);
    }
}
