use super::NodeId;

pub const CANCEL_KEY: &str = "Escape";

/// Pointer and keyboard input forwarded by the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    MouseOver { target: NodeId },
    MouseOut { target: NodeId },
    Click { target: NodeId },
    KeyDown { key: String },
}

impl DomEvent {
    pub fn click(target: NodeId) -> Self {
        DomEvent::Click { target }
    }

    pub fn hover(target: NodeId) -> Self {
        DomEvent::MouseOver { target }
    }

    pub fn leave(target: NodeId) -> Self {
        DomEvent::MouseOut { target }
    }

    pub fn cancel_key() -> Self {
        DomEvent::KeyDown {
            key: CANCEL_KEY.to_string(),
        }
    }

    pub fn is_cancel_key(&self) -> bool {
        matches!(self, DomEvent::KeyDown { key } if key == CANCEL_KEY)
    }
}

/// What the host must do with the native event after the widget saw it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResponse {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventResponse {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn consume() -> Self {
        Self {
            prevent_default: true,
            stop_propagation: true,
        }
    }

    pub fn stop() -> Self {
        Self {
            prevent_default: false,
            stop_propagation: true,
        }
    }
}
