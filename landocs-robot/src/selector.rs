use crate::element::ControlType;
use crate::errors::AutomationError;
use std::fmt;

/// One step of a structural path: the `index`-th child (1-based) of kind `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub kind: ControlType,
    pub index: usize,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 1 {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}[{}]", self.kind, self.index)
        }
    }
}

/// Indexed walk from a root node, e.g. `Pane[3]/Tab/TabItem[1]`.
///
/// Occurrence indices count only children of the segment's kind; a segment
/// without brackets means index 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuralPath {
    segments: Vec<PathSegment>,
}

impl StructuralPath {
    pub fn parse(path: &str) -> Result<Self, AutomationError> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(AutomationError::InvalidSelector(
                "structural path is empty".to_string(),
            ));
        }
        let segments = trimmed
            .split('/')
            .map(parse_segment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

fn parse_segment(raw: &str) -> Result<PathSegment, AutomationError> {
    let raw = raw.trim();
    let (kind, index) = match raw.find('[') {
        Some(open) => {
            let close = raw.rfind(']').filter(|&c| c == raw.len() - 1).ok_or_else(|| {
                AutomationError::InvalidSelector(format!("unterminated index in segment '{raw}'"))
            })?;
            let digits = raw[open + 1..close].trim();
            let index: usize = digits.parse().map_err(|_| {
                AutomationError::InvalidSelector(format!(
                    "index '{digits}' in segment '{raw}' is not a number"
                ))
            })?;
            (&raw[..open], index)
        }
        None => (raw, 1),
    };
    if index == 0 {
        return Err(AutomationError::InvalidSelector(format!(
            "segment '{raw}' uses index 0, occurrence indices start at 1"
        )));
    }
    Ok(PathSegment {
        kind: kind.parse()?,
        index,
    })
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join("/"))
    }
}

/// Represents ways to locate a UI element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Indexed per-kind walk through children
    Path(StructuralPath),
    /// Exact name match anywhere below the root
    Name(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    pub fn path(path: &str) -> Self {
        match StructuralPath::parse(path) {
            Ok(p) => Selector::Path(p),
            Err(e) => Selector::Invalid(e.to_string()),
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Selector::Name(name.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Path(p) => write!(f, "path:{p}"),
            Selector::Name(n) => write!(f, "name:{n}"),
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for Selector {
    /// `name:<text>` selects by name; anything else is read as a structural path.
    fn from(s: &str) -> Self {
        if let Some(name) = s.strip_prefix("name:").or_else(|| s.strip_prefix("Name:")) {
            return Selector::Name(name.to_string());
        }
        if let Some(path) = s.strip_prefix("path:") {
            return Selector::path(path);
        }
        Selector::path(s)
    }
}
