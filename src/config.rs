//! Widget configuration, normally read from the `data-*` attributes of the
//! script tag that loads the widget.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::dom::Document;

pub const DEFAULT_COLOR: &str = "#e74c3c";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl ButtonPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonPosition::BottomRight => "bottom-right",
            ButtonPosition::BottomLeft => "bottom-left",
            ButtonPosition::TopRight => "top-right",
            ButtonPosition::TopLeft => "top-left",
        }
    }

    /// Inline style declarations pinning the trigger to its corner.
    pub fn offsets(&self) -> [(&'static str, &'static str); 2] {
        match self {
            ButtonPosition::BottomRight => [("bottom", "20px"), ("right", "20px")],
            ButtonPosition::BottomLeft => [("bottom", "20px"), ("left", "20px")],
            ButtonPosition::TopRight => [("top", "20px"), ("right", "20px")],
            ButtonPosition::TopLeft => [("top", "20px"), ("left", "20px")],
        }
    }
}

impl fmt::Display for ButtonPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonPosition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bottom-right" => Ok(ButtonPosition::BottomRight),
            "bottom-left" => Ok(ButtonPosition::BottomLeft),
            "top-right" => Ok(ButtonPosition::TopRight),
            "top-left" => Ok(ButtonPosition::TopLeft),
            other => bail!("unknown button position '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Project key spikes are grouped under.
    pub project: String,
    #[serde(default)]
    pub position: ButtonPosition,
    #[serde(default = "default_color")]
    pub color: String,
    /// Reviewer name to create on first load when no identity exists.
    #[serde(default)]
    pub preset_reviewer: Option<String>,
    /// Submission endpoint, token included when the backend needs one.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Set when the widget is injected into a shared snapshot.
    #[serde(default)]
    pub share_id: Option<String>,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl WidgetConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            position: ButtonPosition::default(),
            color: default_color(),
            preset_reviewer: None,
            endpoint: None,
            share_id: None,
        }
    }

    /// Build from script-tag attributes. Missing or empty attributes fall
    /// back to defaults; the project defaults to the page host, then `local`.
    /// An unrecognised position falls back to bottom-right.
    pub fn from_attributes(attributes: &HashMap<String, String>, doc: &Document) -> Self {
        let attr = |name: &str| {
            attributes
                .get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Self {
            project: attr("data-project")
                .or_else(|| doc.hostname().map(str::to_string))
                .unwrap_or_else(|| "local".into()),
            position: attr("data-position")
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            color: attr("data-color").unwrap_or_else(default_color),
            preset_reviewer: attr("data-reviewer"),
            endpoint: attr("data-endpoint"),
            share_id: attr("data-share"),
        }
    }

    /// Where captured spikes are POSTed: the configured endpoint, else the
    /// page origin's `/spikes` when served over http(s), else nowhere.
    pub fn submission_url(&self, doc: &Document) -> Option<String> {
        if let Some(endpoint) = &self.endpoint {
            return Some(endpoint.clone());
        }

        let location = doc.location();
        match location.scheme() {
            "http" | "https" => location.join("/spikes").ok().map(|url| url.to_string()),
            _ => None,
        }
    }
}
