//! Root-anchored structural paths (`/html[1]/body[1]/div[2]`).
//! Each step counts only same-tag siblings, so inserting an unrelated
//! sibling of another tag does not shift the path.

use super::{Document, NodeId};

pub fn structural_path(doc: &Document, node: NodeId) -> String {
    let mut steps = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        let tag = doc.tag(id);
        let index = match doc.parent(id) {
            Some(parent) => {
                let preceding = doc
                    .children(parent)
                    .iter()
                    .take_while(|sibling| **sibling != id)
                    .filter(|sibling| doc.tag(**sibling) == tag)
                    .count();
                preceding + 1
            }
            None => 1,
        };
        steps.push(format!("{tag}[{index}]"));
        current = doc.parent(id);
    }

    steps.reverse();
    format!("/{}", steps.join("/"))
}

/// Walks `path` from the document root. Returns `None` as soon as a step
/// has no matching element; malformed steps never match.
pub fn resolve_structural_path(doc: &Document, path: &str) -> Option<NodeId> {
    let mut steps = path.split('/').filter(|step| !step.is_empty());

    let (root_tag, root_index) = parse_step(steps.next()?)?;
    let root = doc.root();
    if doc.tag(root) != root_tag || root_index != 1 {
        return None;
    }

    let mut current = root;
    for step in steps {
        let (tag, index) = parse_step(step)?;
        current = doc
            .children(current)
            .iter()
            .filter(|child| doc.tag(**child) == tag)
            .nth(index - 1)
            .copied()?;
    }

    Some(current)
}

fn parse_step(step: &str) -> Option<(String, usize)> {
    let open = step.find('[')?;
    let close = step.strip_suffix(']')?;
    let tag = step[..open].to_ascii_lowercase();
    let index: usize = close[open + 1..].parse().ok()?;
    if tag.is_empty() || index == 0 {
        return None;
    }
    Some((tag, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_same_tag_siblings() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let body = doc.body();
        doc.append_new(body, "header").unwrap();
        doc.append_new(body, "div").unwrap();
        let target = doc.append_new(body, "div").unwrap();

        let path = structural_path(&doc, target);
        assert_eq!(path, "/html[1]/body[1]/div[2]");
        assert_eq!(resolve_structural_path(&doc, &path), Some(target));
    }

    #[test]
    fn missing_step_resolves_to_none() {
        let doc = Document::new("https://example.com/").unwrap();
        assert_eq!(resolve_structural_path(&doc, "/html[1]/body[1]/div[3]"), None);
        assert_eq!(resolve_structural_path(&doc, "/html[1]/body[x]"), None);
        assert_eq!(resolve_structural_path(&doc, ""), None);
    }
}
