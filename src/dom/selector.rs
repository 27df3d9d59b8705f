//! Selector parsing and matching.
//!
//! Supports compound simple selectors (`tag`, `*`, `#id`, `.class` and any
//! combination such as `ul#list.items`), descendant combinators (whitespace)
//! and selector groups (`,`).

use crate::error::{Result, ViewError};
use crate::types::ElementId;

use super::Document;

// =============================================================================
// Types
// =============================================================================

/// One compound selector, e.g. `li.item.done`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, doc: &Document, el: ElementId) -> bool {
        if let Some(tag) = &self.tag {
            if doc.tag(el) != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.element_id(el) != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| doc.has_class(el, class))
    }
}

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Comma-separated alternatives, each a descendant chain (outermost first).
    groups: Vec<Vec<Compound>>,
}

// =============================================================================
// Parsing
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn invalid(selector: &str, reason: impl Into<String>) -> ViewError {
    ViewError::Selector {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

fn parse_compound(selector: &str, token: &str) -> Result<Compound> {
    let mut compound = Compound::default();
    let mut chars = token.chars().peekable();

    // Leading tag name or universal selector
    if chars.peek() == Some(&'*') {
        chars.next();
    } else {
        let tag: String = std::iter::from_fn(|| chars.next_if(|c| is_ident_char(*c))).collect();
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
    }

    while let Some(marker) = chars.next() {
        let name: String = std::iter::from_fn(|| chars.next_if(|c| is_ident_char(*c))).collect();
        if name.is_empty() {
            return Err(invalid(selector, format!("expected a name after '{marker}'")));
        }
        match marker {
            '#' => {
                if compound.id.is_some() {
                    return Err(invalid(selector, "more than one id in a compound selector"));
                }
                compound.id = Some(name);
            }
            '.' => compound.classes.push(name),
            other => return Err(invalid(selector, format!("unsupported character '{other}'"))),
        }
    }

    Ok(compound)
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(selector: &str) -> Result<Self> {
        let mut groups = Vec::new();
        for group in selector.split(',') {
            let chain = group
                .split_whitespace()
                .map(|token| parse_compound(selector, token))
                .collect::<Result<Vec<_>>>()?;
            if chain.is_empty() {
                return Err(invalid(selector, "empty selector"));
            }
            groups.push(chain);
        }
        Ok(Self { groups })
    }

    /// Check whether `el` matches any alternative of this selector.
    ///
    /// Ancestors for descendant combinators are searched through the whole
    /// document, not only below the query root.
    pub fn matches(&self, doc: &Document, el: ElementId) -> bool {
        self.groups.iter().any(|chain| matches_chain(doc, el, chain))
    }
}

fn matches_chain(doc: &Document, el: ElementId, chain: &[Compound]) -> bool {
    let Some((last, outer)) = chain.split_last() else {
        return false;
    };
    if !last.matches(doc, el) {
        return false;
    }

    // Nearest matching ancestor first; greedy is exact for descendant-only chains.
    let mut cursor = doc.parent(el);
    for compound in outer.iter().rev() {
        loop {
            let Some(ancestor) = cursor else {
                return false;
            };
            cursor = doc.parent(ancestor);
            if compound.matches(doc, ancestor) {
                break;
            }
        }
    }
    true
}
