//! Element tree of the simulated page and a small CSS matcher.
//!
//! Supported selectors: tag, `#id`, `.class`, `[attr]`, `[attr=value]`
//! (quoted or bare), compounds of those, descendant combinators and
//! comma-separated lists.

use crate::driver::ElementSnapshot;
use crate::locator::{accessible_name_matches, AriaRole, Selector};
use crate::result::{ScadaError, ScadaResult};

/// One element of the simulated page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// Lowercase tag name
    pub tag: &'static str,
    /// `id` attribute
    pub id: Option<&'static str>,
    /// Class list
    pub classes: Vec<&'static str>,
    /// `data-testid` attribute
    pub test_id: Option<&'static str>,
    /// `type` attribute for inputs
    pub input_type: Option<&'static str>,
    /// Own text (children contribute the rest of `textContent`)
    pub text: String,
    /// Rendered (not `display: none`)
    pub displayed: bool,
    /// Not disabled
    pub enabled: bool,
    /// Parent index
    pub parent: Option<usize>,
}

impl Node {
    /// A displayed, enabled element
    #[must_use]
    pub fn element(tag: &'static str) -> Self {
        Self {
            tag,
            displayed: true,
            enabled: true,
            ..Self::default()
        }
    }

    /// Set `id`
    #[must_use]
    pub const fn id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    /// Set `data-testid`
    #[must_use]
    pub const fn test_id(mut self, test_id: &'static str) -> Self {
        self.test_id = Some(test_id);
        self
    }

    /// Set input `type`
    #[must_use]
    pub const fn input_type(mut self, input_type: &'static str) -> Self {
        self.input_type = Some(input_type);
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set rendering
    #[must_use]
    pub const fn displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set enabled
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id,
            "data-testid" => self.test_id,
            "type" => self.input_type,
            "role" => AriaRole::for_tag(self.tag).map(|r| r.as_str()),
            _ => None,
        }
    }
}

/// Element tree in document order
#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent`; returns its index
    pub fn append(&mut self, parent: Option<usize>, mut node: Node) -> usize {
        node.parent = parent;
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `index`
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[index].parent, |&i| self.nodes[i].parent)
    }

    /// `textContent`: own text followed by descendants' text
    #[must_use]
    pub fn text_content(&self, index: usize) -> String {
        let mut text = self.nodes[index].text.clone();
        for (child, node) in self.nodes.iter().enumerate().skip(index + 1) {
            if node.parent == Some(index) {
                text.push_str(&self.text_content(child));
            }
        }
        text
    }

    /// Rendered: the node and all of its ancestors are displayed
    #[must_use]
    pub fn is_rendered(&self, index: usize) -> bool {
        self.nodes[index].displayed && self.ancestors(index).all(|i| self.nodes[i].displayed)
    }

    /// Snapshot of the node at `index`
    #[must_use]
    pub fn snapshot(&self, index: usize) -> ElementSnapshot {
        let text = self.text_content(index);
        ElementSnapshot {
            tag: self.nodes[index].tag.to_string(),
            text: Some(text),
            visible: self.is_rendered(index),
            enabled: self.nodes[index].enabled,
        }
    }

    /// Indices of every node matching `selector`, in document order
    pub fn query_all(&self, selector: &Selector) -> ScadaResult<Vec<usize>> {
        let indices = 0..self.nodes.len();
        Ok(match selector {
            Selector::Css(css) => {
                let list = SelectorList::parse(css)?;
                indices.filter(|&i| list.matches(self, i)).collect()
            }
            Selector::TestId(id) => indices
                .filter(|&i| self.nodes[i].test_id == Some(id.as_str()))
                .collect(),
            Selector::Role { role, name } => indices
                .filter(|&i| AriaRole::for_tag(self.nodes[i].tag) == Some(*role))
                .filter(|&i| accessible_name_matches(name, &self.text_content(i)))
                .collect(),
            Selector::Text(text) => indices
                .filter(|&i| !self.has_children(i) && self.nodes[i].text.contains(text.as_str()))
                .collect(),
        })
    }

    fn has_children(&self, index: usize) -> bool {
        self.nodes.iter().any(|n| n.parent == Some(index))
    }
}

// =============================================================================
// CSS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        self.tag.as_ref().map_or(true, |t| t == "*" || t == node.tag)
            && self.id.as_ref().map_or(true, |id| node.id == Some(id.as_str()))
            && self
                .classes
                .iter()
                .all(|c| node.classes.contains(&c.as_str()))
            && self.attributes.iter().all(|(name, value)| {
                match (node.attribute(name), value) {
                    (Some(actual), Some(expected)) => actual == expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            })
    }

    fn parse(source: &str, full: &str) -> ScadaResult<Self> {
        let unsupported = || ScadaError::page(format!("unsupported selector: {full}"));
        let mut compound = Self::default();
        let mut rest = source;

        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '*'))
            .unwrap_or(rest.len());
        if tag_len > 0 {
            compound.tag = Some(rest[..tag_len].to_lowercase());
            rest = &rest[tag_len..];
        }

        while let Some(first) = rest.chars().next() {
            match first {
                '#' | '.' => {
                    let body = &rest[1..];
                    let len = body
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
                        .unwrap_or(body.len());
                    if len == 0 {
                        return Err(unsupported());
                    }
                    let ident = body[..len].to_string();
                    if first == '#' {
                        compound.id = Some(ident);
                    } else {
                        compound.classes.push(ident);
                    }
                    rest = &body[len..];
                }
                '[' => {
                    let end = rest.find(']').ok_or_else(unsupported)?;
                    let inner = &rest[1..end];
                    let attribute = match inner.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                            (name.trim().to_string(), Some(value.to_string()))
                        }
                        None => (inner.trim().to_string(), None),
                    };
                    compound.attributes.push(attribute);
                    rest = &rest[end + 1..];
                }
                _ => return Err(unsupported()),
            }
        }

        if compound == Self::default() {
            return Err(unsupported());
        }
        Ok(compound)
    }
}

/// Descendant chain, outermost first
#[derive(Debug, Clone)]
struct Complex(Vec<Compound>);

impl Complex {
    fn matches(&self, dom: &Dom, index: usize) -> bool {
        let Some((last, outer)) = self.0.split_last() else {
            return false;
        };
        if !last.matches(&dom.nodes[index]) {
            return false;
        }
        // Nearest matching ancestor for each outer compound, right to left
        let mut ancestors = dom.ancestors(index);
        outer
            .iter()
            .rev()
            .all(|compound| ancestors.any(|i| compound.matches(&dom.nodes[i])))
    }
}

#[derive(Debug, Clone)]
struct SelectorList(Vec<Complex>);

impl SelectorList {
    fn parse(css: &str) -> ScadaResult<Self> {
        if css.contains(['>', '+', '~', ':']) {
            return Err(ScadaError::page(format!("unsupported selector: {css}")));
        }
        css.split(',')
            .map(|part| {
                split_compounds(part)
                    .into_iter()
                    .map(|c| Compound::parse(c, css))
                    .collect::<ScadaResult<Vec<_>>>()
                    .map(Complex)
            })
            .collect::<ScadaResult<Vec<_>>>()
            .map(Self)
    }

    fn matches(&self, dom: &Dom, index: usize) -> bool {
        self.0.iter().any(|complex| complex.matches(dom, index))
    }
}

/// Split on whitespace outside attribute brackets
fn split_compounds(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = None;
    for (i, c) in selector.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&selector[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        parts.push(&selector[s..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dom {
        let mut dom = Dom::new();
        let login = dom.append(None, Node::element("section").id("login-page").displayed(false));
        dom.append(Some(login), Node::element("h1").text("Login"));
        let dashboard = dom.append(None, Node::element("section").id("dashboard-page"));
        dom.append(Some(dashboard), Node::element("h1").text("Dashboard"));
        dom.append(Some(dashboard), Node::element("span").class("status").text("Connected"));
        let table = dom.append(Some(dashboard), Node::element("table").test_id("sensors-table"));
        let body = dom.append(Some(table), Node::element("tbody").id("sensors-body"));
        for (id, value) in [("TEMP-1", "20.5"), ("PRESS-2", "100.2")] {
            let row = dom.append(Some(body), Node::element("tr"));
            dom.append(Some(row), Node::element("td").test_id("sensor-id").text(id));
            dom.append(Some(row), Node::element("td").test_id("sensor-value").text(value));
        }
        dom
    }

    fn count(dom: &Dom, selector: Selector) -> usize {
        dom.query_all(&selector).unwrap().len()
    }

    mod css_tests {
        use super::*;

        #[test]
        fn test_descendant_rows() {
            let dom = sample();
            assert_eq!(count(&dom, Selector::css("#sensors-body tr")), 2);
            assert_eq!(count(&dom, Selector::css("#login-page tr")), 0);
        }

        #[test]
        fn test_compound_and_class() {
            let dom = sample();
            assert_eq!(count(&dom, Selector::css("span.status")), 1);
            assert_eq!(count(&dom, Selector::css("div.status")), 0);
        }

        #[test]
        fn test_attribute_forms() {
            let dom = sample();
            assert_eq!(count(&dom, Selector::css("[data-testid=\"sensor-value\"]")), 2);
            assert_eq!(count(&dom, Selector::css("[data-testid=sensor-value]")), 2);
            assert_eq!(count(&dom, Selector::css("td[data-testid='sensor-id']")), 2);
            assert_eq!(count(&dom, Selector::css("[data-testid]")), 5);
        }

        #[test]
        fn test_selector_list() {
            let dom = sample();
            assert_eq!(count(&dom, Selector::css("#login-page, #dashboard-page")), 2);
        }

        #[test]
        fn test_unsupported_selector_is_an_error() {
            let dom = sample();
            assert!(dom.query_all(&Selector::css("tbody > tr")).is_err());
            assert!(dom.query_all(&Selector::css("tr:first-child")).is_err());
        }

        #[test]
        fn test_split_keeps_bracketed_spaces() {
            assert_eq!(
                split_compounds("#sensors-body  [data-testid=\"a b\"]"),
                vec!["#sensors-body", "[data-testid=\"a b\"]"]
            );
        }
    }

    mod node_tests {
        use super::*;

        #[test]
        fn test_visibility_inherits_from_ancestors() {
            let dom = sample();
            let heading = dom.query_all(&Selector::role(AriaRole::Heading, "Login")).unwrap();
            assert_eq!(heading.len(), 1);
            assert!(!dom.snapshot(heading[0]).visible);

            let heading = dom.query_all(&Selector::role(AriaRole::Heading, "dashboard")).unwrap();
            assert!(dom.snapshot(heading[0]).visible);
        }

        #[test]
        fn test_text_content_concatenates_descendants() {
            let dom = sample();
            let rows = dom.query_all(&Selector::css("#sensors-body tr")).unwrap();
            assert_eq!(dom.text_content(rows[0]), "TEMP-120.5");
        }

        #[test]
        fn test_text_selector_targets_leaves() {
            let dom = sample();
            assert_eq!(count(&dom, Selector::text("Connected")), 1);
        }
    }
}
