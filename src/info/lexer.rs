//! Splitting Info text into segments and parsing node headers.
//!
//! Two modes share the same segment logic:
//! - [`Segments`]: walk a whole buffer, yielding every segment in file order
//! - [`read_node_at`]: read just enough of a [`ByteSource`] to parse the one
//!   node starting at a known offset (tag table lookups)

use std::io;

use log::trace;

use crate::error::ParseWarning;
use crate::io::ByteSource;
use crate::model::{Node, NodeHeader, NodeRef};
use crate::util::decode_text;

use super::{FORM_FEED, SEPARATOR};

/// Bytes read first when seeking to a node; doubled until the node's
/// closing separator is in view.
const INITIAL_WINDOW: usize = 4096;

/// What a segment contains, judged from its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Node,
    TagTable,
    EndTagTable,
    Indirect,
    LocalVariables,
    Unknown,
}

/// Raw text between two separators.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    /// Absolute offset of the separator that opens this segment.
    pub offset: u64,
    /// First line after the separator, without its line terminator.
    pub header: &'a [u8],
    /// Everything after the header line, up to the next separator.
    pub body: &'a [u8],
    /// True when the data ended before a closing separator.
    pub unterminated: bool,
}

impl Segment<'_> {
    pub fn kind(&self) -> SegmentKind {
        classify(self.header)
    }
}

/// Classify a segment by its first line.
pub fn classify(header: &[u8]) -> SegmentKind {
    let line = header.trim_ascii();
    if starts_with_ignore_case(line, b"File:") || contains_ignore_case(line, b"Node:") {
        SegmentKind::Node
    } else if starts_with_ignore_case(line, b"Tag Table:") {
        SegmentKind::TagTable
    } else if starts_with_ignore_case(line, b"End Tag Table") {
        SegmentKind::EndTagTable
    } else if starts_with_ignore_case(line, b"Indirect:") {
        SegmentKind::Indirect
    } else if starts_with_ignore_case(line, b"Local Variables:") {
        SegmentKind::LocalVariables
    } else {
        SegmentKind::Unknown
    }
}

/// Find the next separator line at or after `from`.
///
/// Returns `(separator_start, content_start)` where `content_start` is the
/// first byte after the separator line. A separator must begin a line and
/// may carry a form feed and a carriage return before its newline.
pub fn find_separator(data: &[u8], from: usize) -> Option<(usize, usize)> {
    find_separator_in(data, from, true)
}

/// [`find_separator`] over a window of a longer source. Unless `at_end`,
/// a separator whose line is cut off by the end of `data` is not reported.
pub fn find_separator_in(data: &[u8], from: usize, at_end: bool) -> Option<(usize, usize)> {
    let mut pos = from;
    while pos < data.len() {
        let start = pos + memchr::memchr(SEPARATOR, &data[pos..])?;
        if start == 0 || data[start - 1] == b'\n' {
            let mut end = start + 1;
            if data.get(end) == Some(&FORM_FEED) {
                end += 1;
            }
            if data.get(end) == Some(&b'\r') {
                end += 1;
            }
            match data.get(end) {
                Some(b'\n') => return Some((start, end + 1)),
                None if at_end => return Some((start, end)),
                None => return None,
                Some(_) => {}
            }
        }
        pos = start + 1;
    }
    None
}

/// Iterator over the segments of an in-memory buffer.
///
/// Text before the first separator (the file preamble) is skipped.
pub struct Segments<'a> {
    data: &'a [u8],
    base: u64,
    next: Option<(usize, usize)>,
}

impl<'a> Segments<'a> {
    /// `base` is the absolute offset of `data[0]` in its file.
    pub fn new(data: &'a [u8], base: u64) -> Self {
        Self {
            data,
            base,
            next: find_separator(data, 0),
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        let (start, content) = self.next?;
        let following = find_separator(self.data, content);
        self.next = following;
        let end = following.map_or(self.data.len(), |(s, _)| s);
        Some(split_segment(
            self.data,
            self.base + start as u64,
            content,
            end,
            following.is_none(),
        ))
    }
}

fn split_segment(
    data: &[u8],
    offset: u64,
    content: usize,
    end: usize,
    unterminated: bool,
) -> Segment<'_> {
    let region = &data[content..end];
    let (header, body) = match memchr::memchr(b'\n', region) {
        Some(nl) => (&region[..nl], &region[nl + 1..]),
        None => (region, &region[region.len()..]),
    };
    let header = header.strip_suffix(b"\r").unwrap_or(header);
    Segment {
        offset,
        header,
        body,
        unterminated,
    }
}

/// Parse a node header line into its fields.
///
/// Fields are comma separated `Key: Value` pairs; `Prev` may be spelled
/// `Previous`, keys are case-insensitive, and unknown keys are ignored.
/// Returns `None` when there is no `Node:` field.
pub fn parse_header(line: &str) -> Option<NodeHeader> {
    let mut header = NodeHeader::default();
    let mut has_name = false;

    for (key, value) in header_fields(line) {
        match key.to_ascii_lowercase().as_str() {
            "file" => header.file = Some(value.to_string()),
            "node" => {
                header.name = NodeRef::parse(value).to_string();
                has_name = !header.name.is_empty();
            }
            "next" => header.next = pointer(value),
            "prev" | "previous" => header.prev = pointer(value),
            "up" => header.up = pointer(value),
            _ => {}
        }
    }

    has_name.then_some(header)
}

/// A header pointer; `(dir)` means the node has no such neighbour.
fn pointer(value: &str) -> Option<NodeRef> {
    let target = NodeRef::parse(value);
    if target.node.is_empty() || target.is_dir() {
        None
    } else {
        Some(target)
    }
}

fn header_fields(line: &str) -> Vec<(&str, &str)> {
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let Some(colon) = rest.find(':') else {
            break;
        };
        let key = rest[..colon].trim();
        let after = rest[colon + 1..].trim_start_matches([' ', '\t']);

        let value_len = match after.strip_prefix('\x7f') {
            Some(quoted) => quoted.find('\x7f').map_or(after.len(), |close| close + 2),
            None => after.find([',', '\t']).unwrap_or(after.len()),
        };

        fields.push((key, after[..value_len].trim_end()));
        rest = &after[value_len..];
    }

    fields
}

/// Build a node from a segment.
pub fn parse_segment(segment: &Segment<'_>, encoding: Option<&str>) -> Result<Node, ParseWarning> {
    let header_line = decode_text(segment.header, encoding);
    let header = parse_header(&header_line).ok_or(ParseWarning::MissingNodeName {
        offset: segment.offset,
    })?;
    let body = decode_text(segment.body, encoding).into_owned();
    Ok(Node::new(header, body))
}

/// Parse the node that starts at `offset` in `source`.
///
/// `offset` may point at the separator line or directly at the header
/// line. Only the node's own bytes are read.
pub fn read_node_at(
    source: &dyn ByteSource,
    offset: u64,
    encoding: Option<&str>,
) -> io::Result<Result<Node, ParseWarning>> {
    let len = source.len();
    if offset >= len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("node offset {offset} beyond end of data ({len} bytes)"),
        ));
    }

    let available = usize::try_from(len - offset).unwrap_or(usize::MAX);
    let mut window = INITIAL_WINDOW;
    loop {
        let take = window.min(available);
        let data = source.read_at(offset, take)?;
        let content = separator_line_end(&data);

        if let Some((end, _)) = find_separator_in(&data, content, take == available) {
            trace!("node at {offset}: {} bytes", end);
            let segment = split_segment(&data, offset, content, end, false);
            return Ok(parse_segment(&segment, encoding));
        }
        if take == available {
            let segment = split_segment(&data, offset, content, data.len(), true);
            return Ok(parse_segment(&segment, encoding));
        }
        window = window.saturating_mul(2);
    }
}

/// Length of a separator line at the very start of `data`, or 0.
fn separator_line_end(data: &[u8]) -> usize {
    if data.first() != Some(&SEPARATOR) {
        return 0;
    }
    find_separator(data, 0)
        .filter(|&(start, _)| start == 0)
        .map_or(0, |(_, content)| content)
}

fn starts_with_ignore_case(s: &[u8], prefix: &[u8]) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn contains_ignore_case(s: &[u8], needle: &[u8]) -> bool {
    s.windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
