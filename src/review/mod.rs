//! Review mode: markers and popovers over the spikes left on a page.

pub mod filter;
mod overlay;
pub mod render;

pub use filter::ReviewFilters;
pub use overlay::{
    exit_url, MarkerKind, OpenPopover, RenderedMarker, ReviewOverlay, OVERLAY_CLASSES,
    REVIEW_BAR_ID,
};
pub use render::{MarkerAnchor, PopoverEntry};
