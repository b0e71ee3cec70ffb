//! Path Queries over a Fragment
//!
//! Evaluates the same path language the tracker renders, plus a few
//! conveniences for querying an expanded node:
//!
//! ```text
//! path      := ('/' | '//')? step (('/' | '//') step)*
//! step      := (NAME | '*' | '.' | 'text()' | 'comment()' | 'node()') predicate*
//! predicate := '[' n ']' | '[@' NAME ']' | '[@' NAME '=' quoted ']'
//! ```
//!
//! Absolute paths start at the fragment's document node; relative paths
//! start at its root element.

use super::document::Fragment;
use super::node::{NodeId, NodeType};
use crate::core::scanner::{is_name_char, is_name_start_char, is_whitespace};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//`: children of the context node or any of its descendants
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    AnyElement,
    SelfNode,
    Text,
    Comment,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    HasAttribute(String),
    AttributeEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A parsed path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    absolute: bool,
    steps: Vec<Step>,
}

struct QueryParser<'q> {
    path: &'q str,
    bytes: &'q [u8],
    pos: usize,
}

impl<'q> QueryParser<'q> {
    fn error<T>(&self, reason: &'static str) -> Result<T> {
        Err(Error::Query {
            path: self.path.to_string(),
            reason,
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, token: &[u8]) -> bool {
        if self.bytes[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn name(&mut self) -> Option<&'q str> {
        let start = self.pos;
        if !self.peek().is_some_and(is_name_start_char) {
            return None;
        }
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        // Name runs end on an ASCII byte, so this is a char boundary
        self.path.get(start..self.pos)
    }

    fn parse(mut self) -> Result<PathQuery> {
        if self.path.trim().is_empty() {
            return self.error("empty path");
        }

        let absolute = self.peek() == Some(b'/');
        let mut steps = Vec::new();

        loop {
            let axis = if self.eat(b"//") {
                Axis::Descendant
            } else if self.eat(b"/") {
                Axis::Child
            } else if steps.is_empty() && !absolute {
                Axis::Child
            } else {
                return self.error("expected '/' between steps");
            };

            if self.peek().is_none() {
                if axis == Axis::Child && steps.is_empty() {
                    break;
                }
                return self.error("path ends with an empty step");
            }

            let test = self.node_test()?;
            let predicates = self.predicates()?;
            steps.push(Step { axis, test, predicates });

            if self.peek().is_none() {
                break;
            }
        }

        Ok(PathQuery { absolute, steps })
    }

    fn node_test(&mut self) -> Result<NodeTest> {
        if self.eat(b"*") {
            return Ok(NodeTest::AnyElement);
        }
        if self.eat(b".") {
            return Ok(NodeTest::SelfNode);
        }
        let Some(name) = self.name() else {
            return self.error("expected a name test");
        };
        if !self.eat(b"()") {
            return Ok(NodeTest::Name(name.to_string()));
        }
        match name {
            "text" => Ok(NodeTest::Text),
            "comment" => Ok(NodeTest::Comment),
            "node" => Ok(NodeTest::AnyNode),
            _ => self.error("unsupported node type test"),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();
        while self.eat(b"[") {
            self.skip_whitespace();
            let predicate = if self.eat(b"@") {
                let Some(name) = self.name() else {
                    return self.error("expected an attribute name");
                };
                let name = name.to_string();
                self.skip_whitespace();
                if self.eat(b"=") {
                    self.skip_whitespace();
                    Predicate::AttributeEquals(name, self.quoted()?)
                } else {
                    Predicate::HasAttribute(name)
                }
            } else {
                let start = self.pos;
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
                match self.path[start..self.pos].parse::<usize>() {
                    Ok(0) => return self.error("positions start at 1"),
                    Ok(n) => Predicate::Position(n),
                    Err(_) => return self.error("unsupported predicate"),
                }
            };
            self.skip_whitespace();
            if !self.eat(b"]") {
                return self.error("unterminated predicate");
            }
            predicates.push(predicate);
        }
        Ok(predicates)
    }

    fn quoted(&mut self) -> Result<String> {
        let Some(quote @ (b'"' | b'\'')) = self.peek() else {
            return self.error("attribute value must be quoted");
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != quote) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return self.error("unterminated string literal");
        }
        let value = self.path[start..self.pos].to_string();
        self.pos += 1;
        Ok(value)
    }
}

impl PathQuery {
    pub fn parse(path: &str) -> Result<Self> {
        QueryParser {
            path,
            bytes: path.as_bytes(),
            pos: 0,
        }
        .parse()
    }

    /// Matching nodes in document order, without duplicates
    pub fn evaluate(&self, doc: &Fragment) -> Vec<NodeId> {
        let mut context: Vec<NodeId> = if self.absolute {
            vec![doc.document_id()]
        } else {
            doc.root_element_id().into_iter().collect()
        };

        for step in &self.steps {
            let mut next = Vec::new();
            for &node in &context {
                let parents: Vec<NodeId> = match step.axis {
                    Axis::Child => vec![node],
                    Axis::Descendant => std::iter::once(node).chain(doc.descendants(node)).collect(),
                };
                for parent in parents {
                    let candidates: Vec<NodeId> = match step.test {
                        NodeTest::SelfNode => vec![parent],
                        _ => doc.children(parent).filter(|&id| step.test.matches(doc, id)).collect(),
                    };
                    next.extend(apply_predicates(doc, candidates, &step.predicates));
                }
            }
            // Ids are assigned in document order
            next.sort_unstable();
            next.dedup();
            context = next;
        }

        context
    }
}

impl NodeTest {
    fn matches(&self, doc: &Fragment, id: NodeId) -> bool {
        let Some(kind) = doc.node_type(id) else {
            return false;
        };
        match self {
            NodeTest::Name(name) => kind == NodeType::Element && doc.node_name(id) == Some(name.as_str()),
            NodeTest::AnyElement => kind == NodeType::Element,
            NodeTest::Text => matches!(kind, NodeType::Text | NodeType::CData),
            NodeTest::Comment => kind == NodeType::Comment,
            NodeTest::AnyNode | NodeTest::SelfNode => kind != NodeType::Document,
        }
    }
}

fn apply_predicates(doc: &Fragment, mut nodes: Vec<NodeId>, predicates: &[Predicate]) -> Vec<NodeId> {
    for predicate in predicates {
        nodes = match predicate {
            Predicate::Position(n) => nodes.get(n - 1).copied().into_iter().collect(),
            Predicate::HasAttribute(name) => nodes
                .into_iter()
                .filter(|&id| doc.get_attribute(id, name).is_some())
                .collect(),
            Predicate::AttributeEquals(name, value) => nodes
                .into_iter()
                .filter(|&id| doc.get_attribute(id, name) == Some(value.as_str()))
                .collect(),
        };
    }
    nodes
}

impl Fragment {
    /// Evaluate a path query against this fragment
    pub fn select(&self, path: &str) -> Result<Vec<NodeId>> {
        Ok(PathQuery::parse(path)?.evaluate(self))
    }
}

/// Nodes matched by a query, together with the fragment that owns them
#[derive(Debug)]
pub struct Selection {
    fragment: Fragment,
    nodes: Vec<NodeId>,
}

impl Selection {
    pub fn new(fragment: Fragment, nodes: Vec<NodeId>) -> Self {
        Selection { fragment, nodes }
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Text content of each matched node
    pub fn texts(&self) -> Vec<String> {
        self.nodes.iter().map(|&id| self.fragment.text_content(id)).collect()
    }

    /// Serialization of each matched node
    pub fn to_xml(&self) -> Vec<String> {
        self.nodes.iter().map(|&id| self.fragment.node_to_xml(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{NodeAttribute, Subtree, SubtreeEvent};

    fn open(name: &str, attrs: &[(&str, &str)]) -> SubtreeEvent {
        SubtreeEvent::Open {
            name: name.to_string(),
            attributes: attrs.iter().map(|&(n, v)| NodeAttribute::new(n, v)).collect(),
        }
    }

    fn text(value: &str) -> SubtreeEvent {
        SubtreeEvent::Text(value.to_string())
    }

    /// <shelf><book id="1"><t>A</t></book><mag/><book id="2" lang="en"><t>B</t><!--x--></book></shelf>
    fn shelf() -> Fragment {
        Fragment::from_subtree(
            &Subtree::new(vec![
                open("shelf", &[]),
                open("book", &[("id", "1")]),
                open("t", &[]),
                text("A"),
                SubtreeEvent::Close,
                SubtreeEvent::Close,
                open("mag", &[]),
                SubtreeEvent::Close,
                open("book", &[("id", "2"), ("lang", "en")]),
                open("t", &[]),
                text("B"),
                SubtreeEvent::Close,
                SubtreeEvent::Comment("x".into()),
                SubtreeEvent::Close,
                SubtreeEvent::Close,
            ]),
            None,
        )
    }

    fn texts(doc: &Fragment, path: &str) -> Vec<String> {
        doc.select(path)
            .unwrap()
            .into_iter()
            .map(|id| doc.text_content(id))
            .collect()
    }

    #[test]
    fn test_absolute_paths() {
        let doc = shelf();
        assert_eq!(texts(&doc, "/shelf/book/t"), vec!["A", "B"]);
        assert_eq!(texts(&doc, "/shelf/book[2]/t/text()"), vec!["B"]);
        assert_eq!(doc.select("/shelf/book[3]").unwrap(), Vec::<NodeId>::new());
    }

    #[test]
    fn test_relative_and_wildcard() {
        let doc = shelf();
        assert_eq!(doc.select("*").unwrap().len(), 3);
        assert_eq!(texts(&doc, "book/t"), vec!["A", "B"]);
        assert_eq!(doc.select(".").unwrap(), doc.root_element_id().into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = shelf();
        assert_eq!(texts(&doc, "/shelf/book[@lang]"), vec!["B"]);
        assert_eq!(texts(&doc, "/shelf/book[@id='1']"), vec!["A"]);
        assert_eq!(texts(&doc, "/shelf/*[@id][1]"), vec!["A"]);
    }

    #[test]
    fn test_descendant_axis() {
        let doc = shelf();
        assert_eq!(texts(&doc, "//t"), vec!["A", "B"]);
        assert_eq!(texts(&doc, "//t[1]"), vec!["A", "B"]);
        assert_eq!(doc.select("//comment()").unwrap().len(), 1);
    }

    #[test]
    fn test_document_node() {
        assert_eq!(shelf().select("/").unwrap(), vec![0]);
    }

    #[test]
    fn test_malformed_queries() {
        let doc = shelf();
        for path in ["", "/shelf/", "/shelf[0]", "/shelf[", "/shelf[last()]", "/shelf/@id", "/a b", "/x()", "/a[@id='1]"] {
            assert!(
                matches!(doc.select(path), Err(Error::Query { .. })),
                "expected query error for {path:?}"
            );
        }
    }

    #[test]
    fn test_selection() {
        let doc = shelf();
        let nodes = doc.select("/shelf/book").unwrap();
        let selection = Selection::new(doc, nodes);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.texts(), vec!["A", "B"]);
        assert_eq!(selection.to_xml()[0], "<book id=\"1\"><t>A</t></book>");
    }
}
