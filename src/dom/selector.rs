//! The CSS subset the locator emits: type selectors, `#id`, `.class`,
//! `:nth-child(n)`, and the child / descendant combinators.

use anyhow::{anyhow, bail, Result};

use super::{Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    nth_child: Option<usize>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.nth_child.is_none()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if doc.tag(node) != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.id_attr(node) != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| doc.has_class(node, class)) {
            return false;
        }
        if let Some(index) = self.nth_child {
            // The root element counts as the first child of the document.
            let position = doc.child_index(node).unwrap_or(1);
            if position != index {
                return false;
            }
        }
        true
    }
}

/// A parsed complex selector, matched right to left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    // The combinator of the first step is ignored.
    steps: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
        };
        let selector = parser.selector()?;
        if selector.steps.is_empty() {
            bail!("empty selector");
        }
        Ok(selector)
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_step(doc, node, self.steps.len() - 1)
    }

    fn matches_step(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.steps[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => doc
                .parent(node)
                .map(|parent| self.matches_step(doc, parent, index - 1))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_step(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn selector(&mut self) -> Result<Selector> {
        let mut steps = Vec::new();
        self.skip_whitespace();
        let mut combinator = Combinator::Descendant;

        loop {
            let compound = self.compound()?;
            if compound.is_empty() {
                bail!("expected selector at offset {}", self.pos);
            }
            steps.push((combinator, compound));

            let had_space = self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_space => combinator = Combinator::Descendant,
                Some(c) => bail!("unexpected '{c}' at offset {}", self.pos),
            }
        }

        Ok(Selector { steps })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.nth_child = Some(self.nth_child()?);
                }
                _ => break,
            }
        }

        Ok(compound)
    }

    fn nth_child(&mut self) -> Result<usize> {
        let name = self.ident()?;
        if name != "nth-child" {
            bail!("unsupported pseudo-class :{name}");
        }
        if self.bump() != Some('(') {
            bail!("expected '(' after :nth-child");
        }
        self.skip_whitespace();
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.pos += 1;
        }
        self.skip_whitespace();
        if self.bump() != Some(')') {
            bail!("expected ')' to close :nth-child");
        }
        let index: usize = digits
            .parse()
            .map_err(|_| anyhow!("invalid :nth-child index '{digits}'"))?;
        if index == 0 {
            bail!(":nth-child index must be positive");
        }
        Ok(index)
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                out.push(self.escape()?);
            } else if is_ident_char(c) {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            bail!("expected identifier at offset {}", self.pos);
        }
        Ok(out)
    }

    fn escape(&mut self) -> Result<char> {
        let mut hex = String::new();
        while hex.len() < 6 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }

        if hex.is_empty() {
            return self
                .bump()
                .ok_or_else(|| anyhow!("dangling escape at end of selector"));
        }

        if matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&hex, 16)?;
        Ok(char::from_u32(code)
            .filter(|c| *c != '\0')
            .unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

/// Serializes an identifier so it can be embedded in a selector
/// (the `CSS.escape` algorithm).
pub fn css_escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());

    for (index, &c) in chars.iter().enumerate() {
        let code = c as u32;
        if c == '\0' {
            out.push(char::REPLACEMENT_CHARACTER);
        } else if (0x01..=0x1f).contains(&code)
            || code == 0x7f
            || (index == 0 && c.is_ascii_digit())
            || (index == 1 && c.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{code:x} "));
        } else if index == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if !c.is_ascii() || c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("https://example.com/").unwrap();
        let main = doc.append_new(doc.body(), "main").unwrap();
        doc.add_class(main, "content");
        let first = doc.append_new(main, "p").unwrap();
        let second = doc.append_new(main, "p").unwrap();
        doc.add_class(second, "lead");
        (doc, main, first, second)
    }

    #[test]
    fn matches_tag_class_and_nth_child() {
        let (doc, main, first, second) = page();
        assert_eq!(doc.query_selector_all("p").unwrap(), vec![first, second]);
        assert_eq!(doc.query_selector_all("p.lead").unwrap(), vec![second]);
        assert_eq!(doc.query_selector_all(".content").unwrap(), vec![main]);
        assert_eq!(
            doc.query_selector_all("body > main:nth-child(1) > p:nth-child(1)")
                .unwrap(),
            vec![first]
        );
    }

    #[test]
    fn descendant_combinator_skips_levels() {
        let (doc, _, first, second) = page();
        assert_eq!(doc.query_selector_all("body p").unwrap(), vec![first, second]);
        assert!(doc.query_selector_all("body > p").unwrap().is_empty());
    }

    #[test]
    fn escaped_identifiers_round_trip() {
        let mut doc = Document::new("https://example.com/").unwrap();
        let odd = doc.append_new(doc.body(), "div").unwrap();
        doc.set_id(odd, "1st:item.main");
        doc.add_class(odd, "w-1/2");

        let by_id = format!("#{}", css_escape("1st:item.main"));
        assert_eq!(by_id, "#\\31 st\\:item\\.main");
        assert_eq!(doc.query_selector_all(&by_id).unwrap(), vec![odd]);

        let by_class = format!(".{}", css_escape("w-1/2"));
        assert_eq!(doc.query_selector_all(&by_class).unwrap(), vec![odd]);
    }

    #[test]
    fn css_escape_handles_lone_hyphen_and_leading_hyphen_digit() {
        assert_eq!(css_escape("-"), "\\-");
        assert_eq!(css_escape("-2x"), "-\\32 x");
        assert_eq!(css_escape("plain_name-1"), "plain_name-1");
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div:hover").is_err());
        assert!(Selector::parse("a[href]").is_err());
        assert!(Selector::parse("p:nth-child(0)").is_err());
    }
}
