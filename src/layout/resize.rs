//! Recording and constraining resize adjustments.
//!
//! A resize request never mutates geometry directly. It is stored as an
//! edge delta on the focused container's slot and replayed by
//! [`arrange`](super::arrange::arrange) as a boundary shift on every
//! subsequent pass. Constraints zero out any edge that does not face another
//! container in the current layout, so a request against an outer edge is a
//! no-op rather than an error.

use tracing::debug;

use super::arrange::{Direction, LayoutKind};
use crate::model::rect::Rect;

/// Why a resize request could not be recorded. Op sites treat this as a
/// silent no-op; it exists so query surfaces can say why nothing happened.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("{kind} has fixed geometry and cannot be resized")]
    FixedGeometry { kind: LayoutKind },
    #[error("container {idx} does not exist")]
    OutOfRange { idx: usize },
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Sizing {
    Increase,
    Decrease,
}

impl Sizing {
    fn signed(self, delta: i32) -> i32 {
        match self {
            Sizing::Increase => delta,
            Sizing::Decrease => -delta,
        }
    }
}

/// Record a resize of the container at `idx`'s `direction` edge.
pub fn record_resize(
    kind: LayoutKind,
    resize_dimensions: &mut [Option<Rect>],
    idx: usize,
    len: usize,
    direction: Direction,
    sizing: Sizing,
    delta: i32,
) -> Result<(), LayoutError> {
    if !kind.supports_resize() {
        debug!("{kind} has fixed geometry, ignoring resize");
        return Err(LayoutError::FixedGeometry { kind });
    }
    let Some(slot) = resize_dimensions.get_mut(idx) else {
        return Err(LayoutError::OutOfRange { idx });
    };

    let rect = slot.get_or_insert_with(Rect::default);
    let signed = sizing.signed(delta);
    // Increase always moves the named edge outward from the container.
    match direction {
        Direction::Left => rect.left -= signed,
        Direction::Right => rect.right += signed,
        Direction::Up => rect.top -= signed,
        Direction::Down => rect.bottom += signed,
    }

    enforce_resize_constraints(kind, resize_dimensions, len);
    Ok(())
}

/// Zero out deltas on edges that face the work-area border rather than a
/// sibling, per layout kind.
pub fn enforce_resize_constraints(
    kind: LayoutKind,
    resize_dimensions: &mut [Option<Rect>],
    len: usize,
) {
    match kind {
        LayoutKind::Bsp => enforce_bsp(resize_dimensions, len),
        LayoutKind::Columns | LayoutKind::Scrolling => {
            for (i, slot) in resize_dimensions.iter_mut().enumerate() {
                if let Some(rect) = slot {
                    if i == 0 {
                        rect.left = 0;
                    }
                    if i == len.saturating_sub(1) {
                        rect.right = 0;
                    }
                    rect.top = 0;
                    rect.bottom = 0;
                }
            }
        }
        LayoutKind::Rows => {
            for (i, slot) in resize_dimensions.iter_mut().enumerate() {
                if let Some(rect) = slot {
                    if i == 0 {
                        rect.top = 0;
                    }
                    if i == len.saturating_sub(1) {
                        rect.bottom = 0;
                    }
                    rect.left = 0;
                    rect.right = 0;
                }
            }
        }
        LayoutKind::VerticalStack => enforce_side_stack(resize_dimensions, len, false),
        LayoutKind::RightMainVerticalStack => enforce_side_stack(resize_dimensions, len, true),
        LayoutKind::HorizontalStack => {
            for (i, slot) in resize_dimensions.iter_mut().enumerate() {
                if let Some(rect) = slot {
                    match i {
                        0 => {
                            rect.left = 0;
                            rect.right = 0;
                            rect.top = 0;
                        }
                        _ => {
                            rect.top = 0;
                            rect.bottom = 0;
                            if i == 1 {
                                rect.left = 0;
                            }
                            if i == len.saturating_sub(1) {
                                rect.right = 0;
                            }
                        }
                    }
                }
            }
        }
        LayoutKind::UltrawideVerticalStack => {
            for (i, slot) in resize_dimensions.iter_mut().enumerate() {
                if let Some(rect) = slot {
                    match i {
                        // Center primary touches siblings on both sides
                        // once a stack exists.
                        0 => {
                            rect.top = 0;
                            rect.bottom = 0;
                            if len < 3 {
                                rect.right = 0;
                            }
                            if len < 2 {
                                rect.left = 0;
                            }
                        }
                        // Left secondary only shares its right edge.
                        1 => {
                            rect.top = 0;
                            rect.bottom = 0;
                            rect.left = 0;
                        }
                        // Stack entries share their left edge with the
                        // primary and rows with each other.
                        _ => {
                            rect.right = 0;
                            if i == 2 {
                                rect.top = 0;
                            }
                        }
                    }
                }
            }
            enforce_stack_rows(resize_dimensions, 2, len);
        }
        LayoutKind::Grid | LayoutKind::Monocle => {
            for slot in resize_dimensions.iter_mut() {
                *slot = None;
            }
        }
    }
}

/// Vertical rows stacked from `start`: first row cannot grow up, last
/// cannot grow down.
fn enforce_stack_rows(resize_dimensions: &mut [Option<Rect>], start: usize, len: usize) {
    for (i, slot) in resize_dimensions.iter_mut().enumerate().skip(start) {
        if let Some(rect) = slot {
            if i == start {
                rect.top = 0;
            }
            if i == len.saturating_sub(1) {
                rect.bottom = 0;
            }
        }
    }
}

fn enforce_side_stack(resize_dimensions: &mut [Option<Rect>], len: usize, primary_right: bool) {
    for (i, slot) in resize_dimensions.iter_mut().enumerate() {
        if let Some(rect) = slot {
            if i == 0 {
                rect.top = 0;
                rect.bottom = 0;
                if primary_right {
                    rect.right = 0;
                } else {
                    rect.left = 0;
                }
            } else if primary_right {
                rect.left = 0;
            } else {
                rect.right = 0;
            }
        }
    }
    enforce_stack_rows(resize_dimensions, 1, len);
}

/// In the alternating-split shape, container `i` faces its own split on the
/// right (even depth) or bottom (odd depth), and the previous container's
/// split on the left or top.
fn enforce_bsp(resize_dimensions: &mut [Option<Rect>], len: usize) {
    for (i, slot) in resize_dimensions.iter_mut().enumerate() {
        if let Some(rect) = slot {
            let own_split = i + 1 < len;
            if !(own_split && i % 2 == 0) {
                rect.right = 0;
            }
            if !(own_split && i % 2 == 1) {
                rect.bottom = 0;
            }
            if !(i > 0 && i % 2 == 1) {
                rect.left = 0;
            }
            if !(i > 0 && i % 2 == 0) {
                rect.top = 0;
            }
        }
    }
}
