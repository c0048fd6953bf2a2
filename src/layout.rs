//! Popover placement. Inputs are viewport-relative rects plus the current
//! scroll; outputs are absolute document coordinates.

use crate::dom::{Rect, ViewportSize};

pub const EDGE_MARGIN: f64 = 10.0;

pub const CAPTURE_POPOVER_WIDTH: f64 = 360.0;
pub const CAPTURE_POPOVER_HEIGHT: f64 = 280.0;

pub const REVIEW_POPOVER_WIDTH: f64 = 360.0;
pub const REVIEW_POPOVER_HEIGHT: f64 = 400.0;
const REVIEW_ANCHOR_GAP: f64 = 8.0;
// Keeps an above-anchor popover clear of the review bar.
const REVIEW_BAR_CLEARANCE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scroll {
    pub x: f64,
    pub y: f64,
}

/// Centered above the target; flipped below when it would start within the
/// top margin of the viewport. Clamped horizontally to the viewport.
pub fn capture_popover(target: Rect, scroll: Scroll, viewport: ViewportSize) -> Placement {
    let mut left = target.left() + scroll.x + target.width / 2.0 - CAPTURE_POPOVER_WIDTH / 2.0;
    let mut top = target.top() + scroll.y - CAPTURE_POPOVER_HEIGHT - EDGE_MARGIN;

    if top < scroll.y + EDGE_MARGIN {
        top = target.bottom() + scroll.y + EDGE_MARGIN;
    }

    let viewport_width = f64::from(viewport.width);
    if left < scroll.x + EDGE_MARGIN {
        left = scroll.x + EDGE_MARGIN;
    } else if left + CAPTURE_POPOVER_WIDTH > scroll.x + viewport_width - EDGE_MARGIN {
        left = scroll.x + viewport_width - CAPTURE_POPOVER_WIDTH - EDGE_MARGIN;
    }

    Placement { top, left }
}

/// Below the anchor; above it when the popover would run past the bottom of
/// the viewport.
pub fn review_popover(anchor: Rect, scroll: Scroll, viewport: ViewportSize) -> Placement {
    let viewport_width = f64::from(viewport.width);
    let viewport_height = f64::from(viewport.height);

    let mut top = anchor.bottom() + scroll.y + REVIEW_ANCHOR_GAP;
    let mut left = anchor.left() + scroll.x;

    if top + REVIEW_POPOVER_HEIGHT > viewport_height + scroll.y {
        top = (scroll.y + REVIEW_BAR_CLEARANCE)
            .max(anchor.top() + scroll.y - REVIEW_POPOVER_HEIGHT - REVIEW_ANCHOR_GAP);
    }

    if left + REVIEW_POPOVER_WIDTH > viewport_width + scroll.x {
        left = viewport_width + scroll.x - REVIEW_POPOVER_WIDTH - EDGE_MARGIN;
    }
    if left < scroll.x + EDGE_MARGIN {
        left = scroll.x + EDGE_MARGIN;
    }

    Placement { top, left }
}

/// Cuts `value` to `max` characters, the last three replaced by `...`.
pub fn truncate_label(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: ViewportSize = ViewportSize {
        width: 1280,
        height: 800,
    };

    #[test]
    fn capture_popover_sits_above_when_there_is_room() {
        let target = Rect::new(500.0, 400.0, 100.0, 40.0);
        let placement = capture_popover(target, Scroll { x: 0.0, y: 0.0 }, VIEWPORT);
        assert_eq!(placement.top, 400.0 - 280.0 - 10.0);
        assert_eq!(placement.left, 550.0 - 180.0);
    }

    #[test]
    fn capture_popover_flips_below_near_top_and_clamps_left() {
        let target = Rect::new(0.0, 50.0, 40.0, 20.0);
        let scroll = Scroll { x: 0.0, y: 300.0 };
        let placement = capture_popover(target, scroll, VIEWPORT);
        assert_eq!(placement.top, 70.0 + 300.0 + 10.0);
        assert_eq!(placement.left, 10.0);
    }

    #[test]
    fn capture_popover_clamps_right_edge() {
        let target = Rect::new(1250.0, 500.0, 20.0, 20.0);
        let placement = capture_popover(target, Scroll { x: 0.0, y: 0.0 }, VIEWPORT);
        assert_eq!(placement.left, 1280.0 - 360.0 - 10.0);
    }

    #[test]
    fn review_popover_flips_above_near_bottom() {
        let anchor = Rect::new(100.0, 700.0, 24.0, 24.0);
        let placement = review_popover(anchor, Scroll { x: 0.0, y: 0.0 }, VIEWPORT);
        assert_eq!(placement.top, 700.0 - 400.0 - 8.0);
        assert_eq!(placement.left, 100.0);
    }

    #[test]
    fn truncate_label_keeps_short_values() {
        assert_eq!(truncate_label("#submit", 40), "#submit");
        let long = "a".repeat(45);
        let cut = truncate_label(&long, 40);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));
    }
}
