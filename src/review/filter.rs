use std::collections::BTreeSet;

use url::Url;

use crate::dom::Document;
use crate::models::{Rating, Spike};

/// Whether a stored spike belongs to the page currently shown. Any one of
/// these is enough: exact href, href containing the current path, page
/// title or path equal to the stored page, or the stored URL's path equal
/// to the current path.
pub fn matches_page(spike: &Spike, doc: &Document) -> bool {
    let href = doc.href();
    let path = doc.pathname();
    let title = doc.title();
    let stored_url = spike.page_url.as_str();

    if stored_url == href {
        return true;
    }
    if !stored_url.is_empty() && stored_url.contains(path) {
        return true;
    }
    if spike.page_title == title || spike.page_title == path {
        return true;
    }

    Url::parse(stored_url)
        .map(|url| url.path() == path)
        .unwrap_or(false)
}

pub fn page_spikes(spikes: &[Spike], doc: &Document) -> Vec<Spike> {
    spikes
        .iter()
        .filter(|spike| matches_page(spike, doc))
        .cloned()
        .collect()
}

/// Review-bar filters. Reviewer matches the display name exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilters {
    pub reviewer: Option<String>,
    pub rating: Option<Rating>,
}

impl ReviewFilters {
    pub fn accepts(&self, spike: &Spike) -> bool {
        if let Some(reviewer) = &self.reviewer {
            if &spike.reviewer.name != reviewer {
                return false;
            }
        }
        if let Some(rating) = self.rating {
            if spike.rating != Some(rating) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, spikes: &[Spike]) -> Vec<Spike> {
        spikes
            .iter()
            .filter(|spike| self.accepts(spike))
            .cloned()
            .collect()
    }
}

/// Sorted, de-duplicated reviewer names; empty names are skipped.
pub fn reviewer_names(spikes: &[Spike]) -> Vec<String> {
    spikes
        .iter()
        .map(|spike| spike.reviewer.name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// `N spike(s) from M reviewer(s)`.
pub fn summary(visible: usize, reviewers: usize) -> String {
    format!("{} from {}", plural(visible, "spike"), plural(reviewers, "reviewer"))
}

/// `N page spike(s)`.
pub fn page_indicator_label(count: usize) -> String {
    plural(count, "page spike")
}
