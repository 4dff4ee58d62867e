//! Declarative path patterns compiled into anchored regex matchers.
//!
//! A pattern is a literal path in which any `<name>` placeholder captures a
//! run of non-`/` characters. Placeholders may share a segment with literal
//! text (`/avatar/<id>.<ext>`, `/res/<key>:<value>`); the whole request path
//! must match.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Bytes escaped when a value is substituted into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Maximum number of captures before heap allocation.
/// Most routes carry ≤4 placeholders (e.g. `/users/<id>/posts/<post_id>`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured values in declaration order.
///
/// Names are `Arc<str>` shared with the compiled matcher, so producing a
/// match never copies a parameter name.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Pattern compilation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The pattern text itself is malformed.
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// What is wrong with it
        reason: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern '{pattern}': {reason}")
            }
        }
    }
}

impl std::error::Error for RouteError {}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Capture(Arc<str>),
}

/// A compiled route pattern: recognizes concrete paths, extracts captures,
/// and expands back into a path for reverse routing.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    source: String,
    regex: Regex,
    names: Vec<Arc<str>>,
    segments: Vec<Segment>,
}

impl CompiledMatcher {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Fails when the pattern does not start with `/`, has an unterminated or
    /// empty placeholder, a placeholder name that is not an identifier, or the
    /// same placeholder twice.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("patterns must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut names: Vec<Arc<str>> = Vec::new();
        let mut regex_src = String::with_capacity(pattern.len() + 16);
        regex_src.push('^');

        let mut rest = pattern;
        while let Some(open) = rest.find('<') {
            let (literal, tail) = rest.split_at(open);
            if !literal.is_empty() {
                regex_src.push_str(&regex::escape(literal));
                segments.push(Segment::Literal(literal.to_string()));
            }
            let close = tail
                .find('>')
                .ok_or_else(|| invalid("unterminated '<' placeholder"))?;
            let name = &tail[1..close];
            if !is_identifier(name) {
                return Err(invalid(&format!(
                    "placeholder '<{name}>' is not a valid identifier"
                )));
            }
            if names.iter().any(|n| n.as_ref() == name) {
                return Err(invalid(&format!("placeholder '<{name}>' appears twice")));
            }
            let name: Arc<str> = Arc::from(name);
            regex_src.push_str("(?P<");
            regex_src.push_str(&name);
            regex_src.push_str(">[^/]+)");
            names.push(Arc::clone(&name));
            segments.push(Segment::Capture(name));
            rest = &tail[close + 1..];
        }
        if !rest.is_empty() {
            regex_src.push_str(&regex::escape(rest));
            segments.push(Segment::Literal(rest.to_string()));
        }
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            names,
            segments,
        })
    }

    /// The pattern text this matcher was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_ref())
    }

    /// The static-index key: the literal text before the first placeholder,
    /// cut back to the last `/`. A pattern without placeholders is its own key.
    #[must_use]
    pub fn static_prefix(&self) -> &str {
        match self.source.find('<') {
            None => &self.source,
            Some(open) => match self.source[..open].rfind('/') {
                Some(slash) => &self.source[..=slash],
                None => "",
            },
        }
    }

    /// Match the full `path`, returning captures in declaration order.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for name in &self.names {
            let value = caps.name(name)?;
            params.push((Arc::clone(name), value.as_str().to_string()));
        }
        Some(params)
    }

    /// Substitute `lookup(name)`, percent-encoded, for each placeholder;
    /// `None` when any is missing.
    pub fn expand<'a, F>(&self, mut lookup: F) -> Option<String>
    where
        F: FnMut(&str) -> Option<&'a str>,
    {
        let mut path = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Capture(name) => path.extend(utf8_percent_encode(lookup(name)?, SEGMENT)),
            }
        }
        Some(path)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
