//! State signatures and the dotted diagnostic name notation.
//!
//! A signature is the path that identifies a state inside a machine. Each
//! segment is a local state name, optionally tagged with the index of the
//! orthogonal region its descendants live in. Signatures render to (and parse
//! from) a dotted form such as `a[2].sub[3].leaf`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing the dotted name notation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature is empty")]
    Empty,

    #[error("Empty segment at position {position} in '{input}'")]
    EmptySegment { input: String, position: usize },

    #[error("Unbalanced brackets in segment '{segment}'")]
    UnbalancedBrackets { segment: String },

    #[error("Region index '{index}' in segment '{segment}' is not a number")]
    InvalidIndex { segment: String, index: String },

    #[error("Unexpected text after region index in segment '{segment}'")]
    TrailingText { segment: String },
}

/// One element of a signature: a local state name plus an optional region index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub index: Option<usize>,
}

impl Segment {
    /// A segment without a region index.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    /// A segment tagged with a region index.
    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

/// Hierarchical path identifying a state.
///
/// Equality is structural. The derived ordering has no statechart meaning and
/// only exists so reports and listings come out in a stable order.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Signature;
///
/// let sig: Signature = "a[2].sub[3].leaf".parse().unwrap();
/// assert_eq!(sig.segments().len(), 3);
/// assert_eq!(sig.to_string(), "a[2].sub[3].leaf");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    segments: Vec<Segment>,
}

impl Signature {
    /// Signature made of a single local name.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::named(name)],
        }
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Local name of the state (the last segment's name).
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", |s| s.name.as_str())
    }

    /// Prefix this signature with a region prefix.
    pub fn within(&self, prefix: &[Segment]) -> Self {
        let mut segments = prefix.to_vec();
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }

    /// Region prefix for the `index`-th region of the state named by `self`.
    pub fn region_prefix(&self, index: usize) -> Vec<Segment> {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.index = Some(index);
        }
        segments
    }

    /// Prefix shared by every state declared in the same region as `self`.
    pub fn prefix(&self) -> &[Segment] {
        match self.segments.split_last() {
            Some((_, prefix)) => prefix,
            None => &[],
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for Signature {
    fn from(name: &str) -> Self {
        Self::local(name)
    }
}

impl From<String> for Signature {
    fn from(name: String) -> Self {
        Self::local(name)
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(SignatureError::Empty);
        }
        input
            .split('.')
            .enumerate()
            .map(|(position, raw)| parse_segment(input, position, raw))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_segments)
    }
}

fn parse_segment(input: &str, position: usize, raw: &str) -> Result<Segment, SignatureError> {
    let unbalanced = || SignatureError::UnbalancedBrackets {
        segment: raw.to_string(),
    };

    let (name, index) = match raw.find('[') {
        None if raw.contains(']') => return Err(unbalanced()),
        None => (raw, None),
        Some(open) => {
            let close = raw.find(']').ok_or_else(unbalanced)?;
            if close < open || raw[open + 1..].contains('[') {
                return Err(unbalanced());
            }
            if close != raw.len() - 1 {
                return Err(SignatureError::TrailingText {
                    segment: raw.to_string(),
                });
            }
            let digits = &raw[open + 1..close];
            let invalid = || SignatureError::InvalidIndex {
                segment: raw.to_string(),
                index: digits.to_string(),
            };
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let index = digits.parse::<usize>().map_err(|_| invalid())?;
            (&raw[..open], Some(index))
        }
    };

    if name.is_empty() {
        return Err(SignatureError::EmptySegment {
            input: input.to_string(),
            position,
        });
    }

    Ok(Segment {
        name: name.to_string(),
        index,
    })
}
