use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::layout::Placement;
use crate::models::{ElementLocator, Rating};

pub const HIGHLIGHT_OUTLINE: &str = "2px solid #e74c3c";
pub const HIGHLIGHT_OUTLINE_OFFSET: &str = "2px";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    #[default]
    Idle,
    Armed,
    Capturing,
}

/// Document-level listeners whose lifetime is bound to a capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Listener {
    Hover,
    Unhover,
    TargetClick,
    CancelKey,
    ClickOutside,
}

impl CaptureMode {
    /// Entry/exit table: the listeners attached while in this mode.
    pub fn listeners(&self) -> &'static [Listener] {
        match self {
            CaptureMode::Idle => &[],
            CaptureMode::Armed => &[
                Listener::Hover,
                Listener::Unhover,
                Listener::TargetClick,
                Listener::CancelKey,
            ],
            CaptureMode::Capturing => &[Listener::CancelKey, Listener::ClickOutside],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    attached: BTreeSet<Listener>,
    attach_count: usize,
    detach_count: usize,
}

impl ListenerRegistry {
    /// Run the exit actions of the current set and the entry actions of
    /// `mode`: listeners shared by both stay attached untouched.
    pub fn enter(&mut self, mode: CaptureMode) {
        let wanted: BTreeSet<Listener> = mode.listeners().iter().copied().collect();

        let stale: Vec<Listener> = self.attached.difference(&wanted).copied().collect();
        for listener in stale {
            self.attached.remove(&listener);
            self.detach_count += 1;
        }

        for listener in wanted {
            if self.attached.insert(listener) {
                self.attach_count += 1;
            }
        }
    }

    pub fn is_attached(&self, listener: Listener) -> bool {
        self.attached.contains(&listener)
    }

    pub fn attached(&self) -> impl Iterator<Item = Listener> + '_ {
        self.attached.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    pub fn detach_count(&self) -> usize {
        self.detach_count
    }
}

/// Outline patch on a hovered element. Holds the inline values it replaced
/// and must be handed back through [`HighlightGuard::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightGuard {
    node: NodeId,
    prior_outline: String,
    prior_outline_offset: String,
}

impl HighlightGuard {
    pub fn apply(doc: &mut Document, node: NodeId) -> Self {
        let guard = Self {
            node,
            prior_outline: doc.style(node, "outline").to_string(),
            prior_outline_offset: doc.style(node, "outline-offset").to_string(),
        };
        doc.set_style(node, "outline", HIGHLIGHT_OUTLINE);
        doc.set_style(node, "outline-offset", HIGHLIGHT_OUTLINE_OFFSET);
        guard
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn restore(self, doc: &mut Document) {
        doc.set_style(self.node, "outline", &self.prior_outline);
        doc.set_style(self.node, "outline-offset", &self.prior_outline_offset);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSurface {
    PageModal,
    ElementPopover,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackForm {
    pub surface: FormSurface,
    pub rating: Option<Rating>,
    pub comment: String,
    /// A save was attempted without an identity and waits for one.
    pub awaiting_identity: bool,
}

impl FeedbackForm {
    pub fn new(surface: FormSurface) -> Self {
        Self {
            surface,
            rating: None,
            comment: String::new(),
            awaiting_identity: false,
        }
    }
}

/// Labels and placement for the element popover.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePopover {
    pub selector_label: String,
    pub text_label: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedTarget {
    pub node: NodeId,
    pub locator: ElementLocator,
    pub popover: CapturePopover,
}

/// Everything one arm → commit cycle knows. Owned by the machine and
/// lent to the handlers.
#[derive(Debug, Default)]
pub struct CaptureSession {
    pub mode: CaptureMode,
    pub highlight: Option<HighlightGuard>,
    pub target: Option<CapturedTarget>,
    pub form: Option<FeedbackForm>,
    pub listeners: ListenerRegistry,
    pub(crate) prior_body_cursor: Option<String>,
}

impl CaptureSession {
    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlight.as_ref().map(HighlightGuard::node)
    }

    /// Release the outline patch, if any. Every transition out of a
    /// highlighted state goes through here.
    pub fn clear_highlight(&mut self, doc: &mut Document) {
        if let Some(guard) = self.highlight.take() {
            guard.restore(doc);
        }
    }

    pub fn set_mode(&mut self, mode: CaptureMode) {
        self.mode = mode;
        self.listeners.enter(mode);
    }
}
