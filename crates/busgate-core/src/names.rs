//! Object paths and request-path segment classification.
//!
//! A request path below `/bus/{bus}/{service}` mixes two namespaces: an
//! object path of unbounded depth followed by an interface name and an
//! optional member. They are told apart by one rule: a segment containing a
//! `.` is an interface name, everything before it is object path.
//!
//! The test runs on raw segment text. There is no escaping, so an object path
//! segment that really contains a `.` cannot be addressed; the first dotted
//! segment always wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NameError, Result};

/// Returns true if `segment` names an interface rather than an object path element.
#[must_use]
pub fn is_interface_segment(segment: &str) -> bool {
    segment.contains('.')
}

/// Split a request path on '/', discarding empty segments.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// An absolute D-Bus object path.
///
/// The root path `/` is representable because introspection starts there,
/// but it is never a valid request target on its own.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// The root object path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Build a path from individual segments.
    ///
    /// An empty slice yields the root path.
    ///
    /// # Errors
    ///
    /// Returns an error if any segment is empty, contains '/' or contains '.'.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self> {
        let mut path = Self::root();
        for segment in segments {
            path.push(segment.as_ref())?;
        }
        Ok(path)
    }

    /// Append a segment in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is empty, contains '/' or contains '.'.
    pub fn push(&mut self, segment: &str) -> Result<()> {
        validate_segment(segment)?;
        if !self.is_root() {
            self.0.push('/');
        }
        self.0.push_str(segment);
        Ok(())
    }

    /// Return the path of a direct child.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid segment.
    pub fn child(&self, name: &str) -> Result<Self> {
        let mut child = self.clone();
        child.push(name)?;
        Ok(child)
    }

    /// Returns true for the root path `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Return the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(NameError::EmptySegment(segment.to_string()));
    }
    if segment.contains('/') {
        return Err(NameError::NestedSegment(segment.to_string()));
    }
    if is_interface_segment(segment) {
        return Err(NameError::DottedSegment(segment.to_string()));
    }
    Ok(())
}

impl FromStr for ObjectPath {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(NameError::NotAbsolute(s.to_string()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let mut path = Self::root();
        for segment in rest.split('/') {
            path.push(segment).map_err(|err| match err {
                NameError::EmptySegment(_) => NameError::EmptySegment(s.to_string()),
                other => other,
            })?;
        }
        Ok(path)
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPath({})", self.0)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
