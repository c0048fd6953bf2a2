//! Spike records and their wire shape.
//!
//! In memory a [`Spike`] carries an optional [`ElementLocator`]; on the wire
//! the locator fields are flattened next to the page fields under the names
//! the widget and the backend exchange (`selector`, `xpath`, `elementText`...).

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpikeKind {
    Page,
    Element,
}

impl SpikeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpikeKind::Page => "page",
            SpikeKind::Element => "element",
        }
    }
}

/// Declaration order matters: it breaks ties when picking a dominant rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Love,
    Like,
    Meh,
    No,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Love, Rating::Like, Rating::Meh, Rating::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Love => "love",
            Rating::Like => "like",
            Rating::Meh => "meh",
            Rating::No => "no",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Love => "❤️ Love",
            Rating::Like => "👍 Like",
            Rating::Meh => "😐 Meh",
            Rating::No => "👎 No",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "love" => Ok(Rating::Love),
            "like" => Ok(Rating::Like),
            "meh" => Ok(Rating::Meh),
            "no" => Ok(Rating::No),
            other => Err(anyhow!("invalid rating '{other}' (expected love, like, meh or no)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Frozen snapshot of an element taken at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementLocator {
    pub selector: String,
    pub structural_path: Option<String>,
    pub element_text: Option<String>,
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpikeRecord", into = "SpikeRecord")]
pub struct Spike {
    pub id: String,
    pub kind: SpikeKind,
    pub project_key: String,
    pub page_title: String,
    pub page_url: String,
    pub locator: Option<ElementLocator>,
    pub rating: Option<Rating>,
    pub comment: String,
    pub reviewer: Reviewer,
    pub captured_at: DateTime<Utc>,
    pub viewport: Viewport,
    pub share_id: Option<String>,
}

impl Spike {
    pub fn selector(&self) -> Option<&str> {
        self.locator.as_ref().map(|locator| locator.selector.as_str())
    }

    pub fn rating_str(&self) -> &'static str {
        self.rating.as_ref().map(Rating::as_str).unwrap_or("-")
    }
}

/// Flat JSON shape shared with the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpikeRecord {
    id: String,
    #[serde(rename = "type")]
    kind: SpikeKind,
    #[serde(alias = "project", default)]
    project_key: String,
    #[serde(default)]
    page: String,
    #[serde(default)]
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    element_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounding_box: Option<BoundingBox>,
    #[serde(default)]
    rating: Option<Rating>,
    #[serde(default)]
    comments: String,
    reviewer: Reviewer,
    timestamp: DateTime<Utc>,
    // Older backend rows store no viewport and send `null`.
    #[serde(default)]
    viewport: Option<Viewport>,
    #[serde(rename = "share_id", default, skip_serializing_if = "Option::is_none")]
    share_id: Option<String>,
}

impl From<SpikeRecord> for Spike {
    fn from(record: SpikeRecord) -> Self {
        let locator = match record.kind {
            SpikeKind::Element => Some(ElementLocator {
                selector: record.selector.unwrap_or_default(),
                structural_path: record.xpath,
                element_text: record.element_text,
                bounding_box: record.bounding_box,
            }),
            SpikeKind::Page => None,
        };

        Self {
            id: record.id,
            kind: record.kind,
            project_key: record.project_key,
            page_title: record.page,
            page_url: record.url,
            locator,
            rating: record.rating,
            comment: record.comments,
            reviewer: record.reviewer,
            captured_at: record.timestamp,
            viewport: record.viewport.unwrap_or_default(),
            share_id: record.share_id,
        }
    }
}

impl From<Spike> for SpikeRecord {
    fn from(spike: Spike) -> Self {
        let (selector, xpath, element_text, bounding_box) = match spike.locator {
            Some(locator) => (
                Some(locator.selector),
                locator.structural_path,
                locator.element_text,
                locator.bounding_box,
            ),
            None => (None, None, None, None),
        };

        Self {
            id: spike.id,
            kind: spike.kind,
            project_key: spike.project_key,
            page: spike.page_title,
            url: spike.page_url,
            selector,
            xpath,
            element_text,
            bounding_box,
            rating: spike.rating,
            comments: spike.comment,
            reviewer: spike.reviewer,
            timestamp: spike.captured_at,
            viewport: Some(spike.viewport),
            share_id: spike.share_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_record_from_widget_json() {
        let raw = json!({
            "id": "V1StGXR8_Z5jdHi6B-myT",
            "type": "element",
            "project": "acme",
            "page": "Pricing",
            "url": "https://acme.test/pricing",
            "selector": "#submit",
            "xpath": "/html[1]/body[1]/button[1]",
            "elementText": "Buy now",
            "boundingBox": { "x": 10.0, "y": 20.0, "width": 80.0, "height": 24.0 },
            "rating": "love",
            "comments": "great",
            "reviewer": { "id": "r1", "name": "Dana" },
            "timestamp": "2024-05-01T12:00:00.000Z",
            "viewport": { "width": 1440, "height": 900 }
        });

        let spike: Spike = serde_json::from_value(raw).unwrap();
        assert_eq!(spike.kind, SpikeKind::Element);
        assert_eq!(spike.project_key, "acme");
        assert_eq!(spike.selector(), Some("#submit"));
        let locator = spike.locator.as_ref().unwrap();
        assert_eq!(
            locator.structural_path.as_deref(),
            Some("/html[1]/body[1]/button[1]")
        );
        assert_eq!(spike.rating, Some(Rating::Love));
        assert_eq!(spike.comment, "great");
    }

    #[test]
    fn page_spike_serializes_without_locator_fields() {
        let raw = json!({
            "id": "abc",
            "type": "page",
            "projectKey": "acme",
            "page": "Home",
            "url": "https://acme.test/",
            "rating": null,
            "comments": "",
            "reviewer": { "id": "anon", "name": "Anonymous" },
            "timestamp": "2024-05-01T12:00:00Z",
            "viewport": { "width": 800, "height": 600 }
        });

        let spike: Spike = serde_json::from_value(raw).unwrap();
        assert!(spike.locator.is_none());
        assert_eq!(spike.reviewer.name, "Anonymous");

        let value = serde_json::to_value(&spike).unwrap();
        assert_eq!(value["type"], "page");
        assert_eq!(value["projectKey"], "acme");
        assert!(value.get("selector").is_none());
        assert!(value.get("share_id").is_none());
    }

    #[test]
    fn backend_row_with_nulls_decodes() {
        let raw = json!({
            "id": "srv-1",
            "type": "element",
            "projectKey": "acme",
            "page": "Home",
            "url": "https://acme.test/",
            "reviewer": { "id": "r1", "name": "Dana", "email": null },
            "selector": ".hero",
            "xpath": null,
            "elementText": null,
            "boundingBox": null,
            "rating": "meh",
            "comments": "",
            "timestamp": "2024-05-01T12:00:00.000Z",
            "viewport": null,
            "userAgent": "Mozilla/5.0"
        });

        let spike: Spike = serde_json::from_value(raw).unwrap();
        assert_eq!(spike.viewport, Viewport::default());
        let locator = spike.locator.unwrap();
        assert_eq!(locator.selector, ".hero");
        assert!(locator.bounding_box.is_none());
    }

    #[test]
    fn rating_parses_case_insensitively() {
        assert_eq!("LOVE".parse::<Rating>().unwrap(), Rating::Love);
        assert!("great".parse::<Rating>().is_err());
    }
}
