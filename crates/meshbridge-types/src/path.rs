//! Hierarchical addressing for the remote scene tree.
//!
//! Every visual object lives at `prefix / source / frame / index`.  The
//! `source` and `frame` segments come from the engine's compound
//! `"source::frame"` names, which [`split_compound_name`] takes apart.
//! Pose updates target the frame level ([`FramePath`]); geometry is created
//! one level deeper ([`ElementPath`]) so it inherits the frame's motion.

use std::fmt;

use crate::VizError;

/// Separator between the source name and the frame name.
pub const FRAME_DELIMITER: &str = "::";

/// Split `"source::frame"` into `("source", "frame")`.
///
/// The source part may be empty (the engine registers some sources without
/// a name).  A name with no delimiter, or with more than one, is an error:
/// there is no safe guess for which object it means.
///
/// ```rust
/// use meshbridge_types::split_compound_name;
///
/// assert_eq!(split_compound_name("plant::base_link").unwrap(), ("plant", "base_link"));
/// assert!(split_compound_name("base_link").is_err());
/// ```
pub fn split_compound_name(name: &str) -> Result<(&str, &str), VizError> {
    match name.split_once(FRAME_DELIMITER) {
        Some((source, frame)) if !frame.contains(FRAME_DELIMITER) => Ok((source, frame)),
        _ => Err(VizError::MalformedName(name.to_string())),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ScenePath
// ────────────────────────────────────────────────────────────────────────────

/// An absolute path in the remote scene tree, as a list of segments.
///
/// Displays as `/a/b/c`; the root displays as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScenePath {
    segments: Vec<String>,
}

impl ScenePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn root() -> Self {
        Self::default()
    }

    /// A new path one level below `self`.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// `true` when `other` is `self` or lies somewhere below it.
    pub fn contains(&self, other: &ScenePath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Every path from the root down to `self`, root first, `self` last.
    pub fn ancestry(&self) -> impl Iterator<Item = ScenePath> + '_ {
        (0..=self.segments.len()).map(|n| Self {
            segments: self.segments[..n].to_vec(),
        })
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for s in &self.segments {
            write!(f, "/{s}")?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FramePath / ElementPath
// ────────────────────────────────────────────────────────────────────────────

/// `(prefix, source, frame)`: the node a pose bundle entry moves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FramePath {
    pub prefix: String,
    pub source: String,
    pub frame: String,
}

impl FramePath {
    /// Resolve a compound engine name under `prefix`.
    pub fn from_compound(prefix: &str, compound_name: &str) -> Result<Self, VizError> {
        let (source, frame) = split_compound_name(compound_name)?;
        Ok(Self {
            prefix: prefix.to_string(),
            source: source.to_string(),
            frame: frame.to_string(),
        })
    }

    pub fn element(&self, index: usize) -> ElementPath {
        ElementPath {
            frame: self.clone(),
            index,
        }
    }

    pub fn to_scene_path(&self) -> ScenePath {
        ScenePath::new([&self.prefix, &self.source, &self.frame].map(String::as_str))
    }
}

/// `(prefix, source, frame, index)`: one geometry element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementPath {
    pub frame: FramePath,
    pub index: usize,
}

impl ElementPath {
    pub fn to_scene_path(&self) -> ScenePath {
        self.frame.to_scene_path().child(self.index.to_string())
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_scene_path())
    }
}
