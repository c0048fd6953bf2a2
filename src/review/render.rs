//! Marker grouping, placement and the pieces of text drawn for them.

use chrono::{DateTime, Utc};

use crate::dom::{Document, NodeId};
use crate::locator;
use crate::models::{Rating, Spike, SpikeKind};

pub const MARKER_OFFSET: f64 = 12.0;
pub const MARKER_SIZE: f64 = 24.0;
pub const ORPHAN_OPACITY: &str = "0.6";
pub const UNKNOWN_SELECTOR: &str = "unknown";
pub const SINGLE_BADGE: &str = "🗡️";

const NONE_COLOR: &str = "#95a5a6";
const NONE_GLYPH: &str = "—";

pub fn rating_color(rating: Option<Rating>) -> &'static str {
    match rating {
        Some(Rating::Love) => "#27ae60",
        Some(Rating::Like) => "#3498db",
        Some(Rating::Meh) => "#f39c12",
        Some(Rating::No) => "#e74c3c",
        None => NONE_COLOR,
    }
}

pub fn rating_glyph(rating: Option<Rating>) -> &'static str {
    match rating {
        Some(Rating::Love) => "❤️",
        Some(Rating::Like) => "👍",
        Some(Rating::Meh) => "😐",
        Some(Rating::No) => "👎",
        None => NONE_GLYPH,
    }
}

/// Most frequent rating; ties go to the earlier of love, like, meh, no,
/// unrated. An empty slice counts as unrated.
pub fn dominant_rating<'a>(spikes: impl IntoIterator<Item = &'a Spike>) -> Option<Rating> {
    // Slot 4 counts unrated spikes.
    let mut counts = [0usize; 5];
    for spike in spikes {
        let slot = spike.rating.map(|rating| rating as usize).unwrap_or(4);
        counts[slot] += 1;
    }

    let candidates = [
        Some(Rating::Love),
        Some(Rating::Like),
        Some(Rating::Meh),
        Some(Rating::No),
        None,
    ];
    let mut best = 0;
    let mut dominant = None;
    for (candidate, count) in candidates.into_iter().zip(counts) {
        if count > best {
            best = count;
            dominant = candidate;
        }
    }
    dominant
}

/// Element spikes sharing one selector.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeGroup {
    pub selector: String,
    pub spikes: Vec<Spike>,
}

impl SpikeGroup {
    /// First structural path recorded by any spike in the group.
    pub fn structural_path(&self) -> Option<&str> {
        self.spikes.iter().find_map(|spike| {
            spike
                .locator
                .as_ref()
                .and_then(|locator| locator.structural_path.as_deref())
        })
    }

    pub fn badge(&self) -> String {
        badge_text(self.spikes.len())
    }

    pub fn color(&self) -> &'static str {
        rating_color(dominant_rating(&self.spikes))
    }
}

pub fn badge_text(count: usize) -> String {
    if count > 1 {
        count.to_string()
    } else {
        SINGLE_BADGE.to_string()
    }
}

/// Group element spikes by selector, groups in first-seen order.
pub fn group_by_selector(spikes: &[Spike]) -> Vec<SpikeGroup> {
    let mut groups: Vec<SpikeGroup> = Vec::new();
    for spike in spikes.iter().filter(|spike| spike.kind == SpikeKind::Element) {
        let key = spike
            .selector()
            .filter(|selector| !selector.is_empty())
            .unwrap_or(UNKNOWN_SELECTOR);

        match groups.iter_mut().find(|group| group.selector == key) {
            Some(group) => group.spikes.push(spike.clone()),
            None => groups.push(SpikeGroup {
                selector: key.to_string(),
                spikes: vec![spike.clone()],
            }),
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerAnchor {
    /// The live element the group resolved to.
    Resolved(NodeId),
    /// Drawn at the first spike's frozen bounding box.
    Orphaned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPlacement {
    pub top: f64,
    pub left: f64,
    pub anchor: MarkerAnchor,
}

/// Resolve a group against the live document and place its marker at the
/// element's top-right corner. Returns `None` when neither the selector, the
/// structural path nor a frozen bounding box is usable.
pub fn place_marker(doc: &Document, group: &SpikeGroup) -> Option<MarkerPlacement> {
    if let Some(node) = locator::resolve(doc, &group.selector, group.structural_path()) {
        let rect = doc.bounding_client_rect(node);
        return Some(MarkerPlacement {
            top: rect.top() + doc.scroll_y() - MARKER_OFFSET,
            left: rect.right() + doc.scroll_x() - MARKER_OFFSET,
            anchor: MarkerAnchor::Resolved(node),
        });
    }

    let frozen = group
        .spikes
        .first()
        .and_then(|spike| spike.locator.as_ref())
        .and_then(|locator| locator.bounding_box)?;

    Some(MarkerPlacement {
        top: frozen.y - MARKER_OFFSET,
        left: frozen.x + frozen.width - MARKER_OFFSET,
        anchor: MarkerAnchor::Orphaned,
    })
}

pub fn orphan_tooltip(selector: &str) -> String {
    format!("Element not found: {selector}")
}

/// `just now`, `Nm ago`, `Nh ago`, `Nd ago` within a week, else the date.
pub fn time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else if seconds < 604_800 {
        format!("{}d ago", seconds / 86_400)
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

/// One row of a review popover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopoverEntry {
    pub reviewer: String,
    pub glyph: &'static str,
    pub color: &'static str,
    pub comment: Option<String>,
    pub age: String,
}

pub fn popover_entries(spikes: &[Spike], now: DateTime<Utc>) -> Vec<PopoverEntry> {
    spikes
        .iter()
        .map(|spike| PopoverEntry {
            reviewer: if spike.reviewer.name.is_empty() {
                "Anonymous".to_string()
            } else {
                spike.reviewer.name.clone()
            },
            glyph: rating_glyph(spike.rating),
            color: rating_color(spike.rating),
            comment: Some(spike.comment.clone()).filter(|comment| !comment.is_empty()),
            age: time_ago(spike.captured_at, now),
        })
        .collect()
}
