//! Pull tokenizer for the markup subset the codec writes.
//!
//! Declarations and comments are skipped. Text between tags is unescaped.
//! Anything else that starts with `<` and is not a well-formed start or end
//! tag stops the reader with a `MalformedInput` fault.

use crate::escape::unescape;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use recast_core::{RecastError, RecastResult};
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<(/?)([A-Za-z_][\w.\-]*)((?:\s+[A-Za-z_][\w.\-]*\s*=\s*"[^"<]*")*)\s*(/?)>"#)
        .expect("tag pattern is valid")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w.\-]*)\s*=\s*"([^"<]*)""#).expect("attribute pattern is valid")
});

/// One token of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `<name a="v">` or `<name a="v"/>`
    Start {
        /// Element name
        name: String,
        /// Attributes in document order, values unescaped
        attributes: IndexMap<String, String>,
        /// Self-closing form
        empty: bool,
    },
    /// `</name>`
    End {
        /// Element name
        name: String,
    },
    /// Character data, unescaped
    Text(String),
}

/// Tokenizer over a complete document
#[derive(Debug)]
pub struct TagReader<'a> {
    input: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> TagReader<'a> {
    /// Start reading at the beginning of `input`
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            failed: false,
        }
    }

    /// Byte offset of the next token
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn fail(&mut self, reason: impl Into<String>) -> Option<RecastResult<(usize, Event)>> {
        self.failed = true;
        Some(Err(RecastError::malformed(self.pos, reason)))
    }

    fn skip_past(&mut self, terminator: &str) -> bool {
        match self.input[self.pos..].find(terminator) {
            Some(end) => {
                self.pos += end + terminator.len();
                true
            }
            None => false,
        }
    }

    fn tag(&mut self) -> Option<RecastResult<(usize, Event)>> {
        let start = self.pos;
        let rest = &self.input[start..];
        let Some(caps) = TAG.captures(rest) else {
            return self.fail("unrecognized markup");
        };
        let closing = !caps[1].is_empty();
        let empty = !caps[4].is_empty();
        let name = caps[2].to_string();
        let raw_attributes = caps.get(3).map_or("", |m| m.as_str());
        let consumed = caps[0].len();

        if closing {
            if empty || !raw_attributes.trim().is_empty() {
                return self.fail(format!("malformed end tag </{}>", name));
            }
            self.pos += consumed;
            return Some(Ok((start, Event::End { name })));
        }

        let mut attributes = IndexMap::new();
        for attr in ATTRIBUTE.captures_iter(raw_attributes) {
            let value = match unescape(&attr[2], start) {
                Ok(value) => value.into_owned(),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            };
            if attributes.insert(attr[1].to_string(), value).is_some() {
                return self.fail(format!("duplicate attribute {} on <{}>", &attr[1], name));
            }
        }
        self.pos += consumed;
        Some(Ok((
            start,
            Event::Start {
                name,
                attributes,
                empty,
            },
        )))
    }
}

impl Iterator for TagReader<'_> {
    type Item = RecastResult<(usize, Event)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed || self.pos >= self.input.len() {
                return None;
            }
            let rest = &self.input[self.pos..];
            if rest.starts_with("<?") {
                if !self.skip_past("?>") {
                    return self.fail("unterminated declaration");
                }
                continue;
            }
            if rest.starts_with("<!--") {
                if !self.skip_past("-->") {
                    return self.fail("unterminated comment");
                }
                continue;
            }
            if rest.starts_with('<') {
                return self.tag();
            }
            let start = self.pos;
            let end = rest.find('<').unwrap_or(rest.len());
            self.pos += end;
            return match unescape(&rest[..end], start) {
                Ok(text) => Some(Ok((start, Event::Text(text.into_owned())))),
                Err(err) => {
                    self.failed = true;
                    Some(Err(err))
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Vec<Event> {
        TagReader::new(input).map(|r| r.unwrap().1).collect()
    }

    #[test]
    fn test_start_end_and_text() {
        let got = events(r#"<a x="1"><b/>hi &amp; bye</a>"#);
        assert_eq!(got.len(), 4);
        match &got[0] {
            Event::Start { name, attributes, empty } => {
                assert_eq!(name, "a");
                assert_eq!(attributes.get("x").map(String::as_str), Some("1"));
                assert!(!empty);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&got[1], Event::Start { name, empty: true, .. } if name == "b"));
        assert_eq!(got[2], Event::Text("hi & bye".to_string()));
        assert_eq!(got[3], Event::End { name: "a".to_string() });
    }

    #[test]
    fn test_declaration_and_comments_skipped() {
        let got = events("<?xml version=\"1.0\"?><!-- note --><r></r>");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_attribute_values_unescaped() {
        let got = events(r#"<a v="&lt;&quot;&gt;" />"#);
        match &got[0] {
            Event::Start { attributes, empty, .. } => {
                assert_eq!(attributes["v"], "<\">");
                assert!(*empty);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_garbage_stops_reader() {
        let mut reader = TagReader::new("<a><<b></a>");
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, RecastError::MalformedInput { ref position, .. } if position == "3"));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_duplicate_attribute() {
        let mut reader = TagReader::new(r#"<a x="1" x="2">"#);
        assert!(reader.next().unwrap().is_err());
    }

    #[test]
    fn test_end_tag_with_attributes_is_malformed() {
        let mut reader = TagReader::new(r#"</a x="1">"#);
        assert!(reader.next().unwrap().is_err());
    }
}
