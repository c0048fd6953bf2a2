//! Element locators: a CSS selector validated against the live document,
//! an independent structural path, and a frozen text/geometry snapshot.

use anyhow::{Context, Result};

use crate::dom::{css_escape, resolve_structural_path, structural_path, Document, NodeId};
use crate::models::{BoundingBox, ElementLocator};

pub const TEXT_SNIPPET_LIMIT: usize = 100;

/// Snapshot `node` into a locator. Called once per spike at capture time.
pub fn locate(doc: &Document, node: NodeId) -> Result<ElementLocator> {
    let selector = compute_selector(doc, node)?;
    let rect = doc.bounding_client_rect(node);

    Ok(ElementLocator {
        selector,
        structural_path: Some(structural_path(doc, node)),
        element_text: Some(text_snippet(&doc.text_content(node))),
        bounding_box: Some(BoundingBox {
            x: (rect.left() + doc.scroll_x()).round(),
            y: (rect.top() + doc.scroll_y()).round(),
            width: rect.width.round(),
            height: rect.height.round(),
        }),
    })
}

/// `#id`, then `.class`, then `tag.class`, each accepted only when it matches
/// exactly one element; otherwise the `nth-child` path from `body`.
pub fn compute_selector(doc: &Document, node: NodeId) -> Result<String> {
    if let Some(id) = doc.id_attr(node) {
        let candidate = format!("#{}", css_escape(id));
        if is_unique(doc, &candidate)? {
            return Ok(candidate);
        }
    }

    let classes = doc.class_list(node);
    for class in classes {
        let candidate = format!(".{}", css_escape(class));
        if is_unique(doc, &candidate)? {
            return Ok(candidate);
        }
    }

    let tag = doc.tag(node);
    for class in classes {
        let candidate = format!("{tag}.{}", css_escape(class));
        if is_unique(doc, &candidate)? {
            return Ok(candidate);
        }
    }

    Ok(nth_child_path(doc, node))
}

fn is_unique(doc: &Document, selector: &str) -> Result<bool> {
    let matches = doc
        .query_selector_all(selector)
        .with_context(|| format!("failed to evaluate candidate selector {selector}"))?;
    Ok(matches.len() == 1)
}

pub fn nth_child_path(doc: &Document, node: NodeId) -> String {
    let mut path = Vec::new();
    let mut current = node;

    while current != doc.body() && current != doc.root() {
        let Some(parent) = doc.parent(current) else {
            break;
        };
        let index = doc.child_index(current).unwrap_or(1);
        path.push(format!("{}:nth-child({index})", doc.tag(current)));
        current = parent;
    }

    path.reverse();
    format!("body > {}", path.join(" > "))
}

pub fn text_snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > TEXT_SNIPPET_LIMIT {
        let head: String = trimmed.chars().take(TEXT_SNIPPET_LIMIT).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

/// Re-find a stored locator: the selector first, then the structural path.
/// An unparsable selector counts as a miss.
pub fn resolve(doc: &Document, selector: &str, structural: Option<&str>) -> Option<NodeId> {
    if let Ok(Some(node)) = doc.query_selector(selector) {
        return Some(node);
    }
    structural.and_then(|path| resolve_structural_path(doc, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    fn doc() -> Document {
        Document::new("https://shop.test/checkout").unwrap()
    }

    #[test]
    fn unique_id_wins_and_resolves_back() {
        let mut doc = doc();
        let form = doc.append_new(doc.body(), "form").unwrap();
        let button = doc.append_new(form, "button").unwrap();
        doc.set_id(button, "submit");
        doc.add_class(button, "btn");

        let selector = compute_selector(&doc, button).unwrap();
        assert_eq!(selector, "#submit");
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![button]);
    }

    #[test]
    fn duplicated_id_falls_through_to_classes() {
        let mut doc = doc();
        let a = doc.append_new(doc.body(), "div").unwrap();
        let b = doc.append_new(doc.body(), "div").unwrap();
        doc.set_id(a, "dup");
        doc.set_id(b, "dup");
        doc.add_class(b, "shared");
        doc.add_class(b, "unique-one");
        doc.add_class(a, "shared");

        assert_eq!(compute_selector(&doc, b).unwrap(), ".unique-one");
    }

    #[test]
    fn tag_class_pairing_used_when_class_alone_is_ambiguous() {
        let mut doc = doc();
        let span = doc.append_new(doc.body(), "span").unwrap();
        let link = doc.append_new(doc.body(), "a").unwrap();
        doc.add_class(span, "cta");
        doc.add_class(link, "cta");

        assert_eq!(compute_selector(&doc, link).unwrap(), "a.cta");
    }

    #[test]
    fn nth_child_fallback_resolves_at_depth() {
        let mut doc = doc();
        let mut parent = doc.body();
        let mut deepest = parent;
        for depth in 0..8 {
            // Decoy siblings so every level has an index above one.
            for _ in 0..(depth % 3) {
                doc.append_new(parent, "div").unwrap();
            }
            deepest = doc.append_new(parent, "div").unwrap();
            parent = deepest;
        }

        let selector = compute_selector(&doc, deepest).unwrap();
        assert!(selector.starts_with("body > div:nth-child(1) > div:nth-child(2)"));
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![deepest]);

        let locator = locate(&doc, deepest).unwrap();
        let path = locator.structural_path.unwrap();
        assert_eq!(resolve_structural_path(&doc, &path), Some(deepest));
    }

    #[test]
    fn snapshot_truncates_text_and_adds_scroll() {
        let mut doc = doc();
        let p = doc.append_new(doc.body(), "p").unwrap();
        doc.set_text(p, &format!("  {}  ", "x".repeat(150)));
        doc.set_layout(p, Rect::new(40.2, 1210.6, 300.4, 18.5));
        doc.scroll_to(0.0, 1000.0);

        let locator = locate(&doc, p).unwrap();
        let text = locator.element_text.unwrap();
        assert_eq!(text.len(), TEXT_SNIPPET_LIMIT + 3);
        assert!(text.ends_with("..."));

        let bbox = locator.bounding_box.unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (40.0, 1211.0, 300.0, 19.0));
    }

    #[test]
    fn short_text_is_kept_verbatim() {
        assert_eq!(text_snippet("  Buy now "), "Buy now");
    }

    #[test]
    fn resolve_falls_back_to_structural_path() {
        let mut doc = doc();
        let button = doc.append_new(doc.body(), "button").unwrap();
        let path = structural_path(&doc, button);

        assert_eq!(resolve(&doc, "#renamed", Some(&path)), Some(button));
        assert_eq!(resolve(&doc, "#renamed", None), None);
        assert_eq!(resolve(&doc, "::bogus", Some("/html[1]/body[1]/nav[1]")), None);
    }
}
