//! The widget's own DOM subtree: trigger button, reviewer indicator, page
//! modal, element popover, the inline name prompt and the rename dialog.

use anyhow::Result;

use crate::config::WidgetConfig;
use crate::dom::{Document, NodeId};
use crate::layout::Placement;
use crate::review::{OVERLAY_CLASSES, REVIEW_BAR_ID};

pub const CONTAINER_ID: &str = "spikes-container";
pub const BUTTON_ID: &str = "spikes-btn";
pub const REVIEWER_ID: &str = "spikes-reviewer";
pub const MODAL_ID: &str = "spikes-modal";
pub const POPOVER_ID: &str = "spikes-popover";
pub const NAME_OVERLAY_ID: &str = "spikes-name-overlay";
pub const NAME_PROMPT_ID: &str = "spikes-name-prompt";

/// Roots of the widget UI. Nothing inside them is ever a spike target.
pub const WIDGET_IDS: [&str; 7] = [
    BUTTON_ID,
    MODAL_ID,
    POPOVER_ID,
    CONTAINER_ID,
    REVIEWER_ID,
    NAME_OVERLAY_ID,
    REVIEW_BAR_ID,
];

const BUTTON_ARMED_TITLE: &str = "Click element to spike, or click here for page feedback";
const REVIEWER_TITLE: &str = "Click to change";

/// Capture widget nodes plus the review overlay's bar, markers and popovers.
pub fn is_widget_element(doc: &Document, node: NodeId) -> bool {
    doc.closest_with_id(node, &WIDGET_IDS).is_some()
        || doc.closest_with_class(node, &OVERLAY_CLASSES).is_some()
}

/// `html`, `body`, and the widget's own subtree.
pub fn is_excluded_element(doc: &Document, node: NodeId) -> bool {
    matches!(doc.tag(node), "html" | "body") || is_widget_element(doc, node)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetUi {
    pub container: NodeId,
    pub button: NodeId,
    pub reviewer: NodeId,
    pub modal: NodeId,
    pub modal_prompt_area: NodeId,
    pub popover: NodeId,
    pub popover_prompt_area: NodeId,
    /// Backdrop of the rename dialog opened from the reviewer indicator.
    pub name_overlay: NodeId,
}

impl WidgetUi {
    pub fn mount(doc: &mut Document, config: &WidgetConfig) -> Result<Self> {
        let body = doc.body();

        let container = doc.append_new(body, "div")?;
        doc.set_id(container, CONTAINER_ID);
        doc.set_style(container, "position", "fixed");
        for (property, value) in config.position.offsets() {
            doc.set_style(container, property, value);
        }

        let button = doc.append_new(container, "button")?;
        doc.set_id(button, BUTTON_ID);
        doc.set_text(button, "💬");
        doc.set_attribute(button, "aria-label", "Give Feedback");
        doc.set_style(button, "background", &config.color);

        let reviewer = doc.append_new(container, "div")?;
        doc.set_id(reviewer, REVIEWER_ID);
        doc.set_style(reviewer, "display", "none");

        let modal = doc.append_new(body, "div")?;
        doc.set_id(modal, MODAL_ID);
        doc.set_style(modal, "display", "none");
        let modal_prompt_area = doc.append_new(modal, "div")?;

        let popover = doc.append_new(body, "div")?;
        doc.set_id(popover, POPOVER_ID);
        doc.set_style(popover, "position", "absolute");
        doc.set_style(popover, "display", "none");
        let popover_prompt_area = doc.append_new(popover, "div")?;

        let name_overlay = doc.append_new(body, "div")?;
        doc.set_id(name_overlay, NAME_OVERLAY_ID);
        doc.set_style(name_overlay, "position", "fixed");
        doc.set_style(name_overlay, "display", "none");
        let name_dialog = doc.append_new(name_overlay, "div")?;
        doc.set_text(name_dialog, "Change your name");

        Ok(Self {
            container,
            button,
            reviewer,
            modal,
            modal_prompt_area,
            popover,
            popover_prompt_area,
            name_overlay,
        })
    }

    pub fn set_armed_affordance(&self, doc: &mut Document, armed: bool) {
        if armed {
            doc.set_style(self.button, "animation", "spikes-pulse 1.5s ease-in-out infinite");
            doc.set_attribute(self.button, "title", BUTTON_ARMED_TITLE);
        } else {
            doc.set_style(self.button, "animation", "");
            doc.remove_attribute(self.button, "title");
        }
    }

    pub fn set_reviewer_label(&self, doc: &mut Document, name: Option<&str>) {
        match name {
            Some(name) => {
                doc.set_text(self.reviewer, &format!("Reviewing as: {name}"));
                doc.set_attribute(self.reviewer, "title", REVIEWER_TITLE);
                doc.set_style(self.reviewer, "cursor", "pointer");
                doc.set_style(self.reviewer, "display", "block");
            }
            None => {
                doc.set_text(self.reviewer, "");
                doc.remove_attribute(self.reviewer, "title");
                doc.set_style(self.reviewer, "display", "none");
            }
        }
    }

    /// Open the rename dialog prefilled with the current name.
    pub fn show_rename_dialog(&self, doc: &mut Document, current: &str) {
        doc.set_attribute(self.name_overlay, "data-current", current);
        doc.set_style(self.name_overlay, "display", "flex");
    }

    pub fn hide_rename_dialog(&self, doc: &mut Document) {
        doc.remove_attribute(self.name_overlay, "data-current");
        doc.set_style(self.name_overlay, "display", "none");
    }

    pub fn is_rename_open(&self, doc: &Document) -> bool {
        doc.style(self.name_overlay, "display") == "flex"
    }

    pub fn show_modal(&self, doc: &mut Document, page_name: &str) {
        doc.set_attribute(self.modal, "data-page", page_name);
        doc.set_style(self.modal, "display", "flex");
    }

    pub fn hide_modal(&self, doc: &mut Document) {
        doc.set_style(self.modal, "display", "none");
        self.clear_prompt(doc, self.modal_prompt_area);
    }

    pub fn is_modal_open(&self, doc: &Document) -> bool {
        doc.style(self.modal, "display") == "flex"
    }

    pub fn show_popover(&self, doc: &mut Document, placement: Placement) {
        doc.set_style(self.popover, "left", &format!("{}px", placement.left));
        doc.set_style(self.popover, "top", &format!("{}px", placement.top));
        doc.set_style(self.popover, "display", "block");
    }

    pub fn hide_popover(&self, doc: &mut Document) {
        doc.set_style(self.popover, "display", "none");
        self.clear_prompt(doc, self.popover_prompt_area);
    }

    /// Insert the inline "What should we call you?" prompt into `area`,
    /// unless one is already showing.
    pub fn show_name_prompt(&self, doc: &mut Document, area: NodeId) -> Result<NodeId> {
        if let Some(existing) = self.name_prompt(doc, area) {
            return Ok(existing);
        }
        let prompt = doc.append_new(area, "div")?;
        doc.set_id(prompt, NAME_PROMPT_ID);
        doc.set_text(prompt, "What should we call you?");
        Ok(prompt)
    }

    pub fn name_prompt(&self, doc: &Document, area: NodeId) -> Option<NodeId> {
        doc.children(area)
            .iter()
            .copied()
            .find(|child| doc.id_attr(*child) == Some(NAME_PROMPT_ID))
    }

    /// Flag the prompt input as needing attention (red border).
    pub fn flag_name_prompt(&self, doc: &mut Document, area: NodeId) {
        if let Some(prompt) = self.name_prompt(doc, area) {
            doc.set_style(prompt, "border-color", "#ef4444");
        }
    }

    pub fn clear_prompt(&self, doc: &mut Document, area: NodeId) {
        let children: Vec<NodeId> = doc.children(area).to_vec();
        for child in children {
            doc.remove(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ButtonPosition;

    #[test]
    fn mount_builds_widget_subtree_in_configured_corner() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let mut config = WidgetConfig::new("acme");
        config.position = ButtonPosition::TopLeft;
        let ui = WidgetUi::mount(&mut doc, &config).unwrap();

        assert_eq!(doc.get_element_by_id(BUTTON_ID), Some(ui.button));
        assert_eq!(doc.style(ui.container, "top"), "20px");
        assert_eq!(doc.style(ui.container, "left"), "20px");
        assert!(is_widget_element(&doc, ui.button));
        assert!(is_widget_element(&doc, ui.popover_prompt_area));
        assert!(!ui.is_modal_open(&doc));
    }

    #[test]
    fn exclusion_covers_root_body_and_widget() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let ui = WidgetUi::mount(&mut doc, &WidgetConfig::new("acme")).unwrap();
        let article = doc.append_new(doc.body(), "article").unwrap();

        assert!(is_excluded_element(&doc, doc.root()));
        assert!(is_excluded_element(&doc, doc.body()));
        assert!(is_excluded_element(&doc, ui.reviewer));
        assert!(is_excluded_element(&doc, ui.name_overlay));
        assert!(!is_excluded_element(&doc, article));
    }

    #[test]
    fn review_overlay_nodes_count_as_widget() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let bar = doc.append_new(doc.body(), "div").unwrap();
        doc.set_id(bar, REVIEW_BAR_ID);
        let select = doc.append_new(bar, "select").unwrap();
        let marker = doc.append_new(doc.body(), "div").unwrap();
        doc.add_class(marker, "spikes-review-marker");
        let popover = doc.append_new(doc.body(), "div").unwrap();
        doc.add_class(popover, "spikes-review-popover");
        let entry = doc.append_new(popover, "p").unwrap();
        let plain = doc.append_new(doc.body(), "div").unwrap();
        doc.add_class(plain, "spikes-review");

        assert!(is_widget_element(&doc, select));
        assert!(is_widget_element(&doc, marker));
        assert!(is_widget_element(&doc, entry));
        assert!(!is_widget_element(&doc, plain));
    }

    #[test]
    fn rename_dialog_carries_current_name() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let ui = WidgetUi::mount(&mut doc, &WidgetConfig::new("acme")).unwrap();
        ui.set_reviewer_label(&mut doc, Some("Dana"));
        assert_eq!(doc.attribute(ui.reviewer, "title"), Some("Click to change"));

        ui.show_rename_dialog(&mut doc, "Dana");
        assert!(ui.is_rename_open(&doc));
        assert_eq!(doc.attribute(ui.name_overlay, "data-current"), Some("Dana"));

        ui.hide_rename_dialog(&mut doc);
        assert!(!ui.is_rename_open(&doc));
        assert_eq!(doc.attribute(ui.name_overlay, "data-current"), None);
    }

    #[test]
    fn name_prompt_is_single_instance() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let ui = WidgetUi::mount(&mut doc, &WidgetConfig::new("acme")).unwrap();
        let first = ui.show_name_prompt(&mut doc, ui.modal_prompt_area).unwrap();
        let second = ui.show_name_prompt(&mut doc, ui.modal_prompt_area).unwrap();
        assert_eq!(first, second);

        ui.hide_modal(&mut doc);
        assert!(ui.name_prompt(&doc, ui.modal_prompt_area).is_none());
    }
}
