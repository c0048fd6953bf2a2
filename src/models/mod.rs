pub mod identity;
pub mod spike;

pub use identity::ReviewerIdentity;
pub use spike::{BoundingBox, ElementLocator, Rating, Reviewer, Spike, SpikeKind, Viewport};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use super::*;

    pub fn page_spike(id: &str, project: &str, reviewer: &str, rating: Option<Rating>) -> Spike {
        Spike {
            id: id.into(),
            kind: SpikeKind::Page,
            project_key: project.into(),
            page_title: "Pricing".into(),
            page_url: "https://example.com/pricing".into(),
            locator: None,
            rating,
            comment: String::new(),
            reviewer: Reviewer {
                id: format!("r-{}", reviewer.to_lowercase()),
                name: reviewer.into(),
                email: None,
            },
            captured_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            viewport: Viewport {
                width: 1280,
                height: 800,
            },
            share_id: None,
        }
    }

    pub fn element_spike(
        id: &str,
        project: &str,
        reviewer: &str,
        rating: Option<Rating>,
        selector: &str,
    ) -> Spike {
        Spike {
            kind: SpikeKind::Element,
            locator: Some(ElementLocator {
                selector: selector.into(),
                structural_path: None,
                element_text: None,
                bounding_box: None,
            }),
            ..page_spike(id, project, reviewer, rating)
        }
    }
}
