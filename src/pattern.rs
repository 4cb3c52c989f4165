//! Search patterns: literal strings or regular expressions, optionally
//! case-insensitive.
//!
//! Case-sensitive literals go through `memchr::memmem`; everything else is
//! compiled to a [`Regex`].

use std::ops::Range;

use memchr::memmem;
use regex::{Regex, RegexBuilder};

use crate::error::Result;

#[derive(Debug, Clone)]
enum Matcher {
    Literal(memmem::Finder<'static>),
    Regex(Regex),
}

/// A compiled search pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: Matcher,
}

impl Pattern {
    /// Compile `source`. Only regex syntax errors can fail.
    pub fn new(source: &str, regex: bool, case_sensitive: bool) -> Result<Pattern> {
        let matcher = if !regex && case_sensitive {
            Matcher::Literal(memmem::Finder::new(source.as_bytes()).into_owned())
        } else {
            let expr = if regex {
                source.to_string()
            } else {
                regex::escape(source)
            };
            Matcher::Regex(
                RegexBuilder::new(&expr)
                    .case_insensitive(!case_sensitive)
                    .multi_line(true)
                    .build()?,
            )
        };
        Ok(Pattern {
            source: source.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find_from(text, 0).is_some()
    }

    /// First match starting at or after `from`.
    pub fn find_from(&self, text: &str, from: usize) -> Option<Range<usize>> {
        let from = ceil_char_boundary(text, from);
        if from > text.len() {
            return None;
        }
        match &self.matcher {
            Matcher::Literal(finder) => finder
                .find(&text.as_bytes()[from..])
                .map(|start| from + start..from + start + finder.needle().len()),
            Matcher::Regex(re) => re.find_at(text, from).map(|m| m.range()),
        }
    }

    /// Last match starting strictly before `before`.
    pub fn find_before(&self, text: &str, before: usize) -> Option<Range<usize>> {
        match &self.matcher {
            Matcher::Literal(finder) => {
                let needle = finder.needle();
                let end = before
                    .saturating_sub(1)
                    .saturating_add(needle.len())
                    .min(text.len());
                memmem::rfind(&text.as_bytes()[..end], needle)
                    .filter(|&start| start < before)
                    .map(|start| start..start + needle.len())
            }
            Matcher::Regex(re) => {
                // Restart one character past each match so overlapping
                // matches are seen.
                let mut last = None;
                let mut from = 0;
                while let Some(m) = re.find_at(text, from) {
                    if m.start() >= before {
                        break;
                    }
                    last = Some(m.range());
                    from = ceil_char_boundary(text, m.start() + 1);
                    if from > text.len() {
                        break;
                    }
                }
                last
            }
        }
    }
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
