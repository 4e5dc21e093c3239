//! # Filter Patterns
//!
//! [`FilterPattern`] compiles a glob over a single path name segment into a
//! matcher. The glob language is the classic search-pattern one: literal
//! characters plus `*` (any run) and `?` (exactly one character). Directory
//! separators are rejected at compile time, so a pattern always describes
//! names, never paths.
//!
//! ```rust
//! use unifs::FilterPattern;
//!
//! let logs = FilterPattern::parse("*.log").unwrap();
//! assert!(logs.matches("app.log"));
//! assert!(!logs.matches("app.log.bak"));
//! ```

use regex::Regex;

use crate::error::VfsError;

/// A compiled matcher over a single path name segment.
///
/// Three internal forms keep the common cases cheap:
///
/// - `""`, `"*"` and `"*.*"` compile to a match-everything form
/// - patterns with no `.`/`*`/`?` compile to an exact string comparison
/// - everything else compiles to an anchored regular expression
///
/// The trailing-`.*` glob idiom is honored: `foo.*` matches `foo` as well
/// as `foo.bar`, because a missing extension satisfies "any extension".
#[derive(Debug, Clone)]
pub struct FilterPattern(Inner);

#[derive(Debug, Clone)]
enum Inner {
    MatchAll,
    Exact(String),
    Pattern(Regex),
}

impl FilterPattern {
    /// Compile a glob into a matcher.
    ///
    /// # Errors
    ///
    /// [`VfsError::InvalidFilter`] when the pattern contains `/` or `\`.
    pub fn parse(filter: &str) -> Result<Self, VfsError> {
        if filter.contains(['/', '\\']) {
            return Err(VfsError::InvalidFilter {
                filter: filter.to_string(),
                reason: "filters match a single name and cannot contain directory separators",
            });
        }
        if matches!(filter, "" | "*" | "*.*") {
            return Ok(Self(Inner::MatchAll));
        }
        if !filter.contains(['.', '*', '?']) {
            return Ok(Self(Inner::Exact(filter.to_string())));
        }
        Ok(Self(Inner::Pattern(build_regex(filter))))
    }

    /// Test a name segment against this pattern.
    pub fn matches(&self, name: &str) -> bool {
        match &self.0 {
            Inner::MatchAll => true,
            Inner::Exact(exact) => exact == name,
            Inner::Pattern(regex) => regex.is_match(name),
        }
    }
}

impl Default for FilterPattern {
    /// The default watcher filter `*.*`, which matches every name.
    fn default() -> Self {
        Self(Inner::MatchAll)
    }
}

fn build_regex(filter: &str) -> Regex {
    // `name.*` must also match a name with no extension, so a trailing `.*`
    // becomes an optional extension group rather than a literal-dot-plus-run.
    let (body, optional_extension) = match filter.strip_suffix(".*") {
        Some(body) => (body, true),
        None => (filter, false),
    };
    let mut pattern = String::with_capacity(filter.len() + 8);
    pattern.push('^');
    for ch in body.chars() {
        match ch {
            '*' => pattern.push_str(".*?"),
            '?' => pattern.push('.'),
            '.' => pattern.push_str("\\."),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    if optional_extension {
        pattern.push_str("(\\.[^.]*)?");
    }
    pattern.push('$');
    // The pattern is built entirely from escaped literals and fixed
    // fragments, so compilation cannot fail.
    Regex::new(&pattern).unwrap_or_else(|_| unreachable!("glob translation produced `{pattern}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(filter: &str) -> FilterPattern {
        FilterPattern::parse(filter).unwrap()
    }

    #[test]
    fn wildcard_forms_match_everything() {
        for filter in ["", "*", "*.*"] {
            let p = pattern(filter);
            for name in ["a", "a.txt", "no_extension", "weird.name.many.dots"] {
                assert!(p.matches(name), "filter {filter:?} name {name:?}");
            }
        }
    }

    #[test]
    fn exact_form_is_string_equality() {
        let p = pattern("Makefile");
        assert!(p.matches("Makefile"));
        assert!(!p.matches("makefile"));
        assert!(!p.matches("Makefile2"));
    }

    #[test]
    fn name_dot_star_matches_missing_extension() {
        let p = pattern("foo.*");
        assert!(p.matches("foo"));
        assert!(p.matches("foo.bar"));
        assert!(p.matches("foo."));
        assert!(!p.matches("fooX"));
        assert!(!p.matches("foo.bar.baz"));
    }

    #[test]
    fn star_extension_anchors_the_suffix() {
        let p = pattern("*.txt");
        assert!(p.matches("a.txt"));
        assert!(p.matches("many.dots.txt"));
        assert!(!p.matches("a.txt.bak"));
        assert!(!p.matches("atxt"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let p = pattern("a?c");
        assert!(p.matches("abc"));
        assert!(p.matches("axc"));
        assert!(!p.matches("ac"));
        assert!(!p.matches("abbc"));
    }

    #[test]
    fn literal_regex_metacharacters_are_escaped() {
        let p = pattern("a+b(c)");
        assert!(p.matches("a+b(c)"));
        assert!(!p.matches("aab(c)"));
    }

    #[test]
    fn separators_are_rejected() {
        for filter in ["a/b", "/", "*.l\\og"] {
            assert!(matches!(
                FilterPattern::parse(filter),
                Err(VfsError::InvalidFilter { .. })
            ));
        }
    }

    #[test]
    fn default_is_match_all() {
        assert!(FilterPattern::default().matches("anything.at.all"));
    }
}
