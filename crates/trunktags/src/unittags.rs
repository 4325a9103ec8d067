//! Radio unit aliases
//!
//! Units (individual radios) transmit under a numeric id.
//! Unit tags give these ids human-readable aliases. Each
//! entry is either
//!
//! * a literal id, like `1234`; or
//! * a regular expression between slashes, like
//!   `/12(\d\d)/`, which must match the *entire* id.
//!
//! Regular expression tags may refer to capture groups
//! with `${1}`-style expansions.

#[cfg(not(test))]
use log::{debug, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as warn;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// An invalid unit tag pattern
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum UnitTagErr {
    /// The pattern is empty
    #[error("invalid unit tag: empty pattern")]
    EmptyPattern,

    /// The regular expression does not compile
    #[error("invalid unit tag pattern \"{pattern}\": {reason}")]
    BadRegex {
        /// Offending pattern, as given
        pattern: String,

        /// Why the regular expression was rejected
        reason: String,
    },
}

/// A single unit alias
#[derive(Clone, Debug)]
pub struct UnitTag {
    pattern: Regex,
    tag: String,
}

impl UnitTag {
    /// Create an alias from a pattern and a tag
    ///
    /// See [module documentation](crate::unittags) for the
    /// pattern syntax.
    pub fn new<S>(pattern: &str, tag: S) -> Result<Self, UnitTagErr>
    where
        S: Into<String>,
    {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(UnitTagErr::EmptyPattern);
        }

        let anchored = match DELIMITED.captures(pattern) {
            Some(cap) => format!("^(?:{})$", &cap[1]),
            None => format!("^{}$", regex::escape(pattern)),
        };

        let re = Regex::new(&anchored).map_err(|e| UnitTagErr::BadRegex {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: re,
            tag: tag.into(),
        })
    }

    /// Alias for `unit_id`, if this entry matches it
    pub fn alias(&self, unit_id: u32) -> Option<String> {
        let id = unit_id.to_string();
        if self.pattern.is_match(&id) {
            Some(self.pattern.replace(&id, self.tag.as_str()).into_owned())
        } else {
            None
        }
    }

    /// Anchored regular expression used for matching
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Ordered collection of unit aliases
///
/// ```
/// use trunktags::UnitTags;
///
/// let mut tags = UnitTags::new();
/// tags.add("1234", "Engine 1").unwrap();
/// tags.add(r"/7(\d\d)/", "Medic ${1}").unwrap();
///
/// assert_eq!(Some("Engine 1".to_owned()), tags.find_unit_tag(1234));
/// assert_eq!(Some("Medic 05".to_owned()), tags.find_unit_tag(705));
/// assert_eq!(None, tags.find_unit_tag(7050));
/// ```
#[derive(Clone, Debug, Default)]
pub struct UnitTags {
    tags: Vec<UnitTag>,
}

impl UnitTags {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an alias
    ///
    /// Invalid patterns are reported and not added.
    pub fn add<S>(&mut self, pattern: &str, tag: S) -> Result<(), UnitTagErr>
    where
        S: Into<String>,
    {
        match UnitTag::new(pattern, tag) {
            Ok(unit_tag) => {
                debug!("unit tags: added pattern {}", unit_tag.pattern());
                self.tags.push(unit_tag);
                Ok(())
            }
            Err(e) => {
                warn!("unit tags: {}", e);
                Err(e)
            }
        }
    }

    /// First alias which matches `unit_id`
    pub fn find_unit_tag(&self, unit_id: u32) -> Option<String> {
        self.tags.iter().find_map(|t| t.alias(unit_id))
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if there are no aliases
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

lazy_static! {
    static ref DELIMITED: Regex = Regex::new(r"^/(.+)/$").expect("bad unit tag delimiter regex");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        let tag = UnitTag::new(" 1234 ", "Engine 1").unwrap();
        assert_eq!(Some("Engine 1".to_owned()), tag.alias(1234));
        assert_eq!(None, tag.alias(12345));
        assert_eq!(None, tag.alias(123));
        assert_eq!("^1234$", tag.pattern());
    }

    #[test]
    fn test_regex_whole_match() {
        let tag = UnitTag::new(r"/1\d{3}/", "Fire Unit").unwrap();
        assert_eq!(Some("Fire Unit".to_owned()), tag.alias(1999));
        assert_eq!(None, tag.alias(21999));

        let tag = UnitTag::new(r"/(\d{2})(\d{2})/", "Station ${1} Unit ${2}").unwrap();
        assert_eq!(Some("Station 12 Unit 34".to_owned()), tag.alias(1234));
    }

    #[test]
    fn test_errors() {
        let mut tags = UnitTags::new();
        assert_eq!(Err(UnitTagErr::EmptyPattern), tags.add("  ", "nothing"));
        assert!(matches!(
            tags.add("/(unclosed/", "bad"),
            Err(UnitTagErr::BadRegex { .. })
        ));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let mut tags = UnitTags::new();
        tags.add("/5.*/", "Five Hundreds").unwrap();
        tags.add("501", "Chief").unwrap();
        assert_eq!(2, tags.len());
        assert_eq!(Some("Five Hundreds".to_owned()), tags.find_unit_tag(501));
        assert_eq!(None, tags.find_unit_tag(601));
    }
}
