//! # Universal Paths
//!
//! [`UPath`] is the single path currency of unifs: an immutable, normalized,
//! forward-slash path value. Every path crossing a filesystem boundary is a
//! `UPath`; native platform paths enter and leave only through
//! [`FsRead::to_internal_path`](crate::FsRead::to_internal_path) and
//! [`FsRead::from_internal_path`](crate::FsRead::from_internal_path).
//!
//! ## Canonical form
//!
//! Construction normalizes arbitrary input:
//!
//! - backslashes become `/`
//! - runs of `/` collapse
//! - `.` segments are removed, `..` segments resolve against their parent
//!   (`..` at the root of an absolute path stays at the root; leading `..`
//!   of a relative path is retained)
//! - no trailing `/`, except the root path `/` itself
//!
//! Two paths are equal exactly when their canonical strings are equal, and
//! canonicalization is idempotent.
//!
//! ```rust
//! use unifs::UPath;
//!
//! assert_eq!(UPath::new("\\a\\\\b\\.\\c\\..").as_str(), "/a/b");
//! assert_eq!(UPath::new("/a/b"), UPath::new("/a/./b/"));
//! assert_eq!(&UPath::new("/docs") / "guide.md", UPath::new("/docs/guide.md"));
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::ops::Div;
use std::str::FromStr;

use crate::error::VfsError;

/// The path separator used by every unifs path.
pub const SEPARATOR: char = '/';

/// An immutable, normalized forward-slash path.
///
/// A `UPath` is either *empty* (`""`), *absolute* (leading `/`) or
/// *relative*. Filesystem operations require absolute paths; relative paths
/// appear when composing (e.g. [`to_relative`](UPath::to_relative) before
/// re-rooting under a subtree).
///
/// Equality, ordering and hashing are over the canonical string, so a
/// `UPath` can key maps and sets directly.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UPath {
    full: String,
}

impl UPath {
    /// Create a path from arbitrary input, canonicalizing it.
    ///
    /// Canonicalization never fails; `..` that would escape the root of an
    /// absolute path is clamped to the root.
    ///
    /// ```rust
    /// use unifs::UPath;
    ///
    /// assert_eq!(UPath::new("/a/../..").as_str(), "/");
    /// assert_eq!(UPath::new("../a").as_str(), "../a");
    /// ```
    pub fn new(path: impl AsRef<str>) -> Self {
        Self { full: canonicalize(path.as_ref()) }
    }

    /// Create a path from a string that is already canonical.
    ///
    /// Callers must guarantee canonicality; this skips all normalization
    /// work. Used on hot paths where the input was produced by `UPath`
    /// itself (e.g. slicing a canonical string at a separator).
    pub(crate) fn new_unchecked(full: impl Into<String>) -> Self {
        let full = full.into();
        debug_assert_eq!(full, canonicalize(&full), "input was not canonical");
        Self { full }
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self::new_unchecked("/")
    }

    /// The empty path `""`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The canonical string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Returns `true` for the empty path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    /// Returns `true` if the path starts with `/`.
    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.full.starts_with(SEPARATOR)
    }

    /// Returns `true` for any non-empty path without a leading `/`.
    #[inline]
    pub fn is_relative(&self) -> bool {
        !self.is_absolute()
    }

    /// Returns `true` for the root path `/`.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.full == "/"
    }

    /// Join another path onto this one.
    ///
    /// If `other` is absolute it wins unchanged; if `self` is empty the
    /// result is `other`. Otherwise the two are concatenated with a
    /// separator and re-canonicalized (so `..` in `other` resolves against
    /// `self`).
    pub fn join(&self, other: impl AsRef<str>) -> UPath {
        let other = UPath::new(other);
        if other.is_absolute() || self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self.clone();
        }
        UPath::new(format!("{}/{}", self.full, other.full))
    }

    /// The parent directory, or `None` for the root and the empty path.
    ///
    /// The parent of a single-segment relative path is the empty path.
    pub fn parent(&self) -> Option<UPath> {
        if self.is_empty() || self.is_root() {
            return None;
        }
        match self.full.rfind(SEPARATOR) {
            Some(0) => Some(UPath::root()),
            Some(idx) => Some(UPath::new_unchecked(&self.full[..idx])),
            None => Some(UPath::empty()),
        }
    }

    /// The final name segment, or `""` for the root and the empty path.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        match self.full.rfind(SEPARATOR) {
            Some(idx) => &self.full[idx + 1..],
            None => &self.full,
        }
    }

    /// The final name without its extension.
    pub fn name_without_extension(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// The extension of the final name, with its leading dot.
    ///
    /// Returns `None` when the name has no dot past its first character, so
    /// dotfiles like `.gitignore` have no extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => Some(&name[idx..]),
            _ => None,
        }
    }

    /// Whether this path lies inside `dir`.
    ///
    /// A path is inside its own directory (`p.is_in_directory(p, …)` is
    /// `true`). When `recursive` is `false`, only direct children (and the
    /// directory itself) qualify.
    ///
    /// ```rust
    /// use unifs::UPath;
    ///
    /// let root = UPath::root();
    /// assert!(UPath::new("/a.log").is_in_directory(&root, false));
    /// assert!(!UPath::new("/sub/a.log").is_in_directory(&root, false));
    /// assert!(UPath::new("/sub/a.log").is_in_directory(&root, true));
    /// ```
    pub fn is_in_directory(&self, dir: &UPath, recursive: bool) -> bool {
        if self == dir {
            return true;
        }
        let rest = match strip_dir_prefix(&self.full, &dir.full) {
            Some(rest) => rest,
            None => return false,
        };
        recursive || !rest.contains(SEPARATOR)
    }

    /// Drop the leading `/`, turning an absolute path relative.
    ///
    /// The root becomes the empty path; relative paths are unchanged.
    pub fn to_relative(&self) -> UPath {
        if self.is_absolute() {
            UPath::new_unchecked(&self.full[1..])
        } else {
            self.clone()
        }
    }

    /// Prefix a `/`, turning a relative path absolute.
    ///
    /// The empty path becomes the root; absolute paths are unchanged.
    pub fn to_absolute(&self) -> UPath {
        if self.is_absolute() {
            self.clone()
        } else {
            UPath::new_unchecked(format!("/{}", self.full))
        }
    }

    /// Fail with [`VfsError::InvalidPath`] unless this path is absolute.
    pub fn assert_absolute(&self) -> Result<&Self, VfsError> {
        if self.is_absolute() {
            Ok(self)
        } else {
            Err(VfsError::InvalidPath {
                path: self.full.clone(),
                reason: "an absolute path is required",
            })
        }
    }
}

/// Strips `dir` plus one separator off the front of `path`.
///
/// Returns the remainder, or `None` when `path` is not under `dir`.
fn strip_dir_prefix<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    if dir == "/" {
        return path.strip_prefix('/');
    }
    path.strip_prefix(dir)?.strip_prefix(SEPARATOR)
}

fn canonicalize(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let absolute = matches!(input.as_bytes()[0], b'/' | b'\\');
    let mut segments: Vec<&str> = Vec::new();
    for segment in input.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&prev) if prev != ".." => {
                    segments.pop();
                }
                // `..` at the root of an absolute path stays at the root.
                None if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    if absolute {
        let mut out = String::with_capacity(input.len());
        if segments.is_empty() {
            out.push(SEPARATOR);
        } else {
            for segment in &segments {
                out.push(SEPARATOR);
                out.push_str(segment);
            }
        }
        out
    } else {
        segments.join("/")
    }
}

impl fmt::Display for UPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl fmt::Debug for UPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPath({:?})", self.full)
    }
}

impl AsRef<str> for UPath {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

impl Borrow<str> for UPath {
    fn borrow(&self) -> &str {
        &self.full
    }
}

impl From<&str> for UPath {
    fn from(value: &str) -> Self {
        UPath::new(value)
    }
}

impl From<String> for UPath {
    fn from(value: String) -> Self {
        UPath::new(value)
    }
}

impl FromStr for UPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(UPath::new(s))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for UPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}

// Deserialization goes through `new` so untrusted input is canonicalized.
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for UPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(UPath::new(raw))
    }
}

impl Div<&str> for &UPath {
    type Output = UPath;

    fn div(self, rhs: &str) -> UPath {
        self.join(rhs)
    }
}

impl Div<&UPath> for &UPath {
    type Output = UPath;

    fn div(self, rhs: &UPath) -> UPath {
        self.join(rhs)
    }
}

impl PartialEq<str> for UPath {
    fn eq(&self, other: &str) -> bool {
        self.full == other
    }
}

impl PartialEq<&str> for UPath {
    fn eq(&self, other: &&str) -> bool {
        self.full == *other
    }
}
