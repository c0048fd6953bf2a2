use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;

use crate::dom::{Document, DomEvent, EventResponse, NodeId, Rect};
use crate::layout::{self, Scroll};
use crate::models::{Rating, Spike, SpikeKind};
use crate::{log_debug, log_warn};

use super::filter::{self, ReviewFilters};
use super::render::{
    self, MarkerAnchor, PopoverEntry, MARKER_SIZE, ORPHAN_OPACITY,
};

const ENABLE_LOGS: bool = true;

pub const REVIEW_BAR_ID: &str = "spikes-review-bar";
pub const REVIEW_COUNT_ID: &str = "spikes-review-count";
pub const REVIEWER_FILTER_ID: &str = "spikes-review-filter-reviewer";
pub const RATING_FILTER_ID: &str = "spikes-review-filter-rating";
pub const MARKER_CLASS: &str = "spikes-review-marker";
pub const PAGE_INDICATOR_CLASS: &str = "spikes-review-page-indicator";
pub const POPOVER_CLASS: &str = "spikes-review-popover";
/// Classes carried by overlay nodes appended straight to `body`.
pub const OVERLAY_CLASSES: [&str; 3] = [MARKER_CLASS, PAGE_INDICATOR_CLASS, POPOVER_CLASS];

/// Query parameter that switches a page into review mode.
pub const REVIEW_PARAM: &str = "review";

pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

const BAR_HEIGHT: f64 = 50.0;
const INDICATOR_MARGIN: f64 = 20.0;
const INDICATOR_WIDTH: f64 = 180.0;
const INDICATOR_HEIGHT: f64 = 44.0;

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerKind {
    Element { selector: String, anchor: MarkerAnchor },
    Page,
}

#[derive(Debug, Clone)]
pub struct RenderedMarker {
    pub node: NodeId,
    pub kind: MarkerKind,
    pub spikes: Vec<Spike>,
}

impl RenderedMarker {
    pub fn is_orphaned(&self) -> bool {
        matches!(
            self.kind,
            MarkerKind::Element {
                anchor: MarkerAnchor::Orphaned,
                ..
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct OpenPopover {
    pub node: NodeId,
    pub anchor: NodeId,
    pub header: &'static str,
    pub entries: Vec<PopoverEntry>,
}

/// Review mode: the review bar plus markers for the spikes of this page.
///
/// Spikes are handed in by the host (usually fetched through the backend
/// client); filter changes re-derive the visible set from that snapshot.
pub struct ReviewOverlay {
    bar: NodeId,
    count_label: NodeId,
    reviewer_select: NodeId,
    prior_body_padding: String,
    all: Vec<Spike>,
    on_page: Vec<Spike>,
    visible: Vec<Spike>,
    filters: ReviewFilters,
    markers: Vec<RenderedMarker>,
    popover: Option<OpenPopover>,
    resize_deadline: Option<Instant>,
}

impl ReviewOverlay {
    /// Whether the page asked for review mode (`?review`).
    pub fn requested(doc: &Document) -> bool {
        doc.location()
            .query_pairs()
            .any(|(key, _)| key == REVIEW_PARAM)
    }

    pub fn mount(doc: &mut Document) -> Result<Self> {
        let body = doc.body();

        let bar = doc.append_new(body, "div")?;
        doc.set_id(bar, REVIEW_BAR_ID);
        doc.set_style(bar, "position", "fixed");
        doc.set_style(bar, "top", "0");

        let title = doc.append_new(bar, "span")?;
        doc.set_text(title, "Review Mode");

        let count_label = doc.append_new(bar, "span")?;
        doc.set_id(count_label, REVIEW_COUNT_ID);
        doc.set_text(count_label, "Loading...");

        let reviewer_select = doc.append_new(bar, "select")?;
        doc.set_id(reviewer_select, REVIEWER_FILTER_ID);
        append_option(doc, reviewer_select, "", "All reviewers")?;

        let rating_select = doc.append_new(bar, "select")?;
        doc.set_id(rating_select, RATING_FILTER_ID);
        append_option(doc, rating_select, "", "All ratings")?;
        for rating in Rating::ALL {
            append_option(doc, rating_select, rating.as_str(), rating.label())?;
        }

        let exit = doc.append_new(bar, "a")?;
        let exit_href = exit_url(doc);
        doc.set_attribute(exit, "href", &exit_href);
        doc.set_text(exit, "Exit review mode");

        let prior_body_padding = doc.style(body, "padding-top").to_string();
        let existing = prior_body_padding
            .trim_end_matches("px")
            .trim()
            .parse::<f64>()
            .unwrap_or(0.0);
        doc.set_style(body, "padding-top", &format!("{}px", existing + BAR_HEIGHT));

        Ok(Self {
            bar,
            count_label,
            reviewer_select,
            prior_body_padding,
            all: Vec::new(),
            on_page: Vec::new(),
            visible: Vec::new(),
            filters: ReviewFilters::default(),
            markers: Vec::new(),
            popover: None,
            resize_deadline: None,
        })
    }

    /// Replace the snapshot and redraw.
    pub fn load(&mut self, doc: &mut Document, spikes: Vec<Spike>) -> Result<()> {
        self.all = spikes;
        self.on_page = filter::page_spikes(&self.all, doc);
        log_debug!(
            "Review loaded {} spikes, {} on this page",
            self.all.len(),
            self.on_page.len()
        );
        self.fill_reviewer_options(doc)?;
        self.apply_filters(doc)
    }

    pub fn set_filters(&mut self, doc: &mut Document, filters: ReviewFilters) -> Result<()> {
        self.filters = filters;
        self.apply_filters(doc)
    }

    pub fn set_reviewer_filter(&mut self, doc: &mut Document, reviewer: Option<String>) -> Result<()> {
        self.filters.reviewer = reviewer.filter(|name| !name.is_empty());
        self.apply_filters(doc)
    }

    pub fn set_rating_filter(&mut self, doc: &mut Document, rating: Option<Rating>) -> Result<()> {
        self.filters.rating = rating;
        self.apply_filters(doc)
    }

    pub fn filters(&self) -> &ReviewFilters {
        &self.filters
    }

    pub fn spikes(&self) -> &[Spike] {
        &self.all
    }

    pub fn page_spikes(&self) -> &[Spike] {
        &self.on_page
    }

    pub fn visible(&self) -> &[Spike] {
        &self.visible
    }

    pub fn markers(&self) -> &[RenderedMarker] {
        &self.markers
    }

    pub fn element_markers(&self) -> impl Iterator<Item = &RenderedMarker> {
        self.markers
            .iter()
            .filter(|marker| matches!(marker.kind, MarkerKind::Element { .. }))
    }

    pub fn popover(&self) -> Option<&OpenPopover> {
        self.popover.as_ref()
    }

    pub fn reviewer_options(&self) -> Vec<String> {
        filter::reviewer_names(&self.on_page)
    }

    pub fn summary(&self) -> String {
        filter::summary(self.visible.len(), self.reviewer_options().len())
    }

    fn apply_filters(&mut self, doc: &mut Document) -> Result<()> {
        self.visible = self.filters.apply(&self.on_page);
        self.render(doc)?;
        let summary = self.summary();
        doc.set_text(self.count_label, &summary);
        Ok(())
    }

    fn fill_reviewer_options(&self, doc: &mut Document) -> Result<()> {
        let stale: Vec<NodeId> = doc.children(self.reviewer_select).iter().skip(1).copied().collect();
        for option in stale {
            doc.remove(option);
        }
        for name in self.reviewer_options() {
            append_option(doc, self.reviewer_select, &name, &name)?;
        }
        Ok(())
    }

    /// Drop every marker and draw the visible set again.
    pub fn render(&mut self, doc: &mut Document) -> Result<()> {
        self.clear_markers(doc);

        for group in render::group_by_selector(&self.visible) {
            let Some(placement) = render::place_marker(doc, &group) else {
                log_warn!("Cannot position marker for selector: {}", group.selector);
                continue;
            };

            let node = doc.append_new(doc.body(), "div")?;
            doc.add_class(node, MARKER_CLASS);
            doc.set_style(node, "position", "absolute");
            doc.set_style(node, "top", &format!("{}px", placement.top));
            doc.set_style(node, "left", &format!("{}px", placement.left));
            doc.set_style(node, "width", "24px");
            doc.set_style(node, "height", "24px");
            doc.set_style(node, "background", group.color());
            let count = group.spikes.len();
            doc.set_style(node, "font-size", if count > 1 { "11px" } else { "14px" });
            doc.set_text(node, &group.badge());
            doc.set_layout(
                node,
                Rect::new(placement.left, placement.top, MARKER_SIZE, MARKER_SIZE),
            );

            if placement.anchor == MarkerAnchor::Orphaned {
                doc.set_style(node, "opacity", ORPHAN_OPACITY);
                doc.set_attribute(node, "title", &render::orphan_tooltip(&group.selector));
            }

            self.markers.push(RenderedMarker {
                node,
                kind: MarkerKind::Element {
                    selector: group.selector,
                    anchor: placement.anchor,
                },
                spikes: group.spikes,
            });
        }

        let page: Vec<Spike> = self
            .visible
            .iter()
            .filter(|spike| spike.kind == SpikeKind::Page)
            .cloned()
            .collect();
        if !page.is_empty() {
            self.render_page_indicator(doc, page)?;
        }

        Ok(())
    }

    fn render_page_indicator(&mut self, doc: &mut Document, spikes: Vec<Spike>) -> Result<()> {
        let color = render::rating_color(render::dominant_rating(&spikes));
        let node = doc.append_new(doc.body(), "div")?;
        doc.add_class(node, PAGE_INDICATOR_CLASS);
        doc.set_style(node, "position", "fixed");
        doc.set_style(node, "bottom", "20px");
        doc.set_style(node, "left", "20px");
        doc.set_style(node, "border-left", &format!("4px solid {color}"));
        doc.set_text(node, &filter::page_indicator_label(spikes.len()));

        let viewport = doc.viewport();
        doc.set_layout(
            node,
            Rect::new(
                doc.scroll_x() + INDICATOR_MARGIN,
                doc.scroll_y() + f64::from(viewport.height) - INDICATOR_MARGIN - INDICATOR_HEIGHT,
                INDICATOR_WIDTH,
                INDICATOR_HEIGHT,
            ),
        );

        self.markers.push(RenderedMarker {
            node,
            kind: MarkerKind::Page,
            spikes,
        });
        Ok(())
    }

    fn clear_markers(&mut self, doc: &mut Document) {
        for marker in self.markers.drain(..) {
            doc.remove(marker.node);
        }
        self.close_popover(doc);
    }

    pub fn handle_event(&mut self, doc: &mut Document, event: &DomEvent) -> Result<EventResponse> {
        match event {
            DomEvent::Click { target } => {
                let hit = self
                    .markers
                    .iter()
                    .position(|marker| doc.contains(marker.node, *target));
                if let Some(index) = hit {
                    self.show_popover(doc, index)?;
                    return Ok(EventResponse::stop());
                }

                let outside = self
                    .popover
                    .as_ref()
                    .is_some_and(|popover| !doc.contains(popover.node, *target));
                if outside {
                    self.close_popover(doc);
                }
                Ok(EventResponse::pass())
            }
            event if event.is_cancel_key() => {
                self.close_popover(doc);
                Ok(EventResponse::pass())
            }
            _ => Ok(EventResponse::pass()),
        }
    }

    fn show_popover(&mut self, doc: &mut Document, index: usize) -> Result<()> {
        self.close_popover(doc);

        let Some(marker) = self.markers.get(index) else {
            return Ok(());
        };
        let header = match marker.kind {
            MarkerKind::Element { .. } => "Element Feedback",
            MarkerKind::Page => "Page Feedback",
        };
        let entries = render::popover_entries(&marker.spikes, Utc::now());
        let anchor = marker.node;

        let node = doc.append_new(doc.body(), "div")?;
        doc.add_class(node, POPOVER_CLASS);
        doc.set_style(node, "position", "absolute");

        let title = doc.append_new(node, "div")?;
        doc.set_text(title, header);

        for entry in &entries {
            let card = doc.append_new(node, "div")?;
            doc.set_style(card, "border-left", &format!("3px solid {}", entry.color));
            let name = doc.append_new(card, "span")?;
            doc.set_text(name, &entry.reviewer);
            let glyph = doc.append_new(card, "span")?;
            doc.set_text(glyph, entry.glyph);
            if let Some(comment) = &entry.comment {
                let text = doc.append_new(card, "div")?;
                doc.set_text(text, comment);
            }
            let age = doc.append_new(card, "div")?;
            doc.set_text(age, &entry.age);
        }

        let placement = layout::review_popover(
            doc.bounding_client_rect(anchor),
            Scroll {
                x: doc.scroll_x(),
                y: doc.scroll_y(),
            },
            doc.viewport(),
        );
        doc.set_style(node, "top", &format!("{}px", placement.top));
        doc.set_style(node, "left", &format!("{}px", placement.left));

        self.popover = Some(OpenPopover {
            node,
            anchor,
            header,
            entries,
        });
        Ok(())
    }

    pub fn close_popover(&mut self, doc: &mut Document) {
        if let Some(popover) = self.popover.take() {
            doc.remove(popover.node);
        }
    }

    /// Window resized: redraw once things settle.
    pub fn on_resize(&mut self, now: Instant) {
        self.resize_deadline = Some(now + RESIZE_DEBOUNCE);
    }

    /// Drive the resize debounce; returns true when a redraw happened.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> Result<bool> {
        match self.resize_deadline {
            Some(deadline) if now >= deadline => {
                self.resize_deadline = None;
                self.render(doc)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn unmount(mut self, doc: &mut Document) {
        self.clear_markers(doc);
        doc.remove(self.bar);
        let body = doc.body();
        doc.set_style(body, "padding-top", &self.prior_body_padding);
    }
}

fn append_option(doc: &mut Document, select: NodeId, value: &str, label: &str) -> Result<NodeId> {
    let option = doc.append_new(select, "option")?;
    doc.set_attribute(option, "value", value);
    doc.set_text(option, label);
    Ok(option)
}

/// Current location without the review parameter.
pub fn exit_url(doc: &Document) -> String {
    let mut url = doc.location().clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != REVIEW_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    if !kept.is_empty() {
        url.query_pairs_mut().extend_pairs(kept);
    }
    url.to_string()
}
