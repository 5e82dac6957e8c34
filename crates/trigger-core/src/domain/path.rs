//! HTTP route templates (`/orders/{id}/items/{item}`).
//!
//! A template is parsed once at startup.  Its [`shape`](PathTemplate::shape)
//! erases placeholder names, so `/orders/{id}` and `/orders/{order_id}` are
//! recognised as the same route address.

use std::collections::BTreeSet;

use thiserror::Error;

/// Reasons a route template is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("route must start with '/'")]
    MissingLeadingSlash,

    #[error("segment '{0}' has an empty or malformed placeholder")]
    MalformedPlaceholder(String),

    #[error("placeholder '{0}' appears more than once")]
    DuplicatePlaceholder(String),

    #[error("segment '{0}' uses ':' or '*' route syntax; write placeholders as {{name}}")]
    ForeignSyntax(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A validated route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a route template.
    ///
    /// Placeholders must fill a whole segment and be made of ASCII letters,
    /// digits and `_`.  Literal segments may not start with `:` or `*`; the
    /// router reads those as captures.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] for templates the serving runtime could not route.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(PathError::MissingLeadingSlash);
        };

        let mut seen = BTreeSet::new();
        let mut segments = Vec::new();
        for segment in rest.split('/') {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    let valid = !name.is_empty()
                        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                    if !valid {
                        return Err(PathError::MalformedPlaceholder(segment.to_owned()));
                    }
                    if !seen.insert(name.to_owned()) {
                        return Err(PathError::DuplicatePlaceholder(name.to_owned()));
                    }
                    segments.push(Segment::Param(name.to_owned()));
                }
                None if segment.contains(['{', '}']) => {
                    return Err(PathError::MalformedPlaceholder(segment.to_owned()));
                }
                None if segment.starts_with([':', '*']) => {
                    return Err(PathError::ForeignSyntax(segment.to_owned()));
                }
                None => segments.push(Segment::Literal(segment.to_owned())),
            }
        }

        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in route order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params().any(|p| p == name)
    }

    /// The template with placeholder names erased: `/orders/{}`.
    pub fn shape(&self) -> String {
        let mut shape = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Literal(text) => shape.push_str(text),
                Segment::Param(_) => shape.push_str("{}"),
            }
        }
        shape
    }
}
