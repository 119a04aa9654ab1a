//! Dotted field paths over nested documents.

use bson::{Bson, Document};
use std::fmt;
use std::str::FromStr;

/// An ordered list of path segments, e.g. `arr.0.field1`.
///
/// A segment that parses as a non-negative integer indexes into an array
/// when the current value is an array; anywhere else it is a plain key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

/// Cursor position while walking a path.
enum Node<'a> {
    Document(&'a Document),
    Value(&'a Bson),
}

impl FieldPath {
    /// Build a path from pre-split segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a dotted string. The empty string yields the empty path.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::default();
        }
        Self::new(dotted.split('.'))
    }

    /// Path segments in evaluation order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk the path through `document`.
    ///
    /// Returns `None` when a key is missing, an index is out of bounds, or a
    /// segment would have to descend into a scalar. The empty path resolves to
    /// nothing, since the root document is not a value.
    pub fn resolve<'a>(&self, document: &'a Document) -> Option<&'a Bson> {
        let mut node = Node::Document(document);

        for segment in &self.segments {
            let next = match node {
                Node::Document(doc) | Node::Value(Bson::Document(doc)) => doc.get(segment)?,
                Node::Value(Bson::Array(items)) => {
                    let index = segment.parse::<usize>().ok()?;
                    items.get(index)?
                }
                Node::Value(_) => return None,
            };
            node = Node::Value(next);
        }

        match node {
            Node::Value(value) => Some(value),
            Node::Document(_) => None,
        }
    }

    /// Resolve the path to a string, or the empty string on any failure.
    pub fn resolve_str(&self, document: &Document) -> String {
        self.resolve(document)
            .and_then(Bson::as_str)
            .map(str::to_owned)
            .unwrap_or_default()
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
