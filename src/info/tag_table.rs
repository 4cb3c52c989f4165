//! Tag table and indirect table parsing.
//!
//! The tag table maps node (and anchor) names to byte offsets so a reader
//! can seek straight to a node:
//!
//! ```text
//! Tag Table:
//! (Indirect)
//! Node: Top^?1261
//! Ref: some-anchor^?2044
//! ```
//!
//! Split documents add an indirect table listing each subfile with the
//! logical offset where its content begins:
//!
//! ```text
//! Indirect:
//! make.info-1: 1261
//! make.info-2: 301599
//! ```

use std::collections::HashMap;
use std::io;

use bstr::ByteSlice;
use log::debug;

use crate::error::{Error, Result};
use crate::io::ByteSource;
use crate::util::decode_text;

use super::DEL;
use super::lexer::{SegmentKind, Segments};

/// Tail bytes read first when looking for the tables; doubled until the
/// tables are fully in view.
const TAIL_WINDOW: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Node,
    Anchor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub kind: TagKind,
    pub name: String,
    /// Byte offset in the file, or logical offset for split documents.
    pub offset: u64,
}

/// Parsed tag table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTable {
    entries: Vec<TagEntry>,
    by_name: HashMap<String, usize>,
    indirect: bool,
    duplicates: Vec<String>,
}

impl TagTable {
    /// Parse the body of a `Tag Table:` segment.
    ///
    /// `size` is the size of the file when the offsets address it directly;
    /// an offset at or past it is a corruption.
    pub fn parse(body: &str, size: Option<u64>) -> Result<TagTable> {
        let mut table = TagTable::default();

        for line in body.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if line.trim().eq_ignore_ascii_case("(Indirect)") {
                table.indirect = true;
                continue;
            }

            let (kind, rest) = if let Some(rest) = line.strip_prefix("Node:") {
                (TagKind::Node, rest)
            } else if let Some(rest) = line.strip_prefix("Ref:") {
                (TagKind::Anchor, rest)
            } else {
                debug!("ignoring tag table line {line:?}");
                continue;
            };

            let (name, number) = rest.rsplit_once(DEL as char).ok_or_else(|| {
                Error::CorruptTagTable(format!("entry without offset: {line:?}"))
            })?;
            let offset: u64 = number.trim().parse().map_err(|_| {
                Error::CorruptTagTable(format!("non-numeric offset {number:?}"))
            })?;
            if let Some(size) = size
                && offset >= size
            {
                return Err(Error::CorruptTagTable(format!(
                    "offset {offset} for {:?} is beyond the end of the file ({size} bytes)",
                    name.trim()
                )));
            }

            let name = crate::model::NodeRef::parse(name).to_string();
            if table.by_name.contains_key(&name) {
                table.duplicates.push(name);
                continue;
            }
            table.by_name.insert(name.clone(), table.entries.len());
            table.entries.push(TagEntry { kind, name, offset });
        }

        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&TagEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[TagEntry] {
        &self.entries
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter().filter(|e| e.kind == TagKind::Node)
    }

    /// True when the table was marked `(Indirect)`: offsets are logical.
    pub fn is_indirect(&self) -> bool {
        self.indirect
    }

    /// Names listed more than once; only the first listing is kept.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// The node containing `offset`: the node entry with the greatest
    /// offset not past it. Used to place anchors.
    pub fn node_containing(&self, offset: u64) -> Option<&TagEntry> {
        self.nodes()
            .filter(|e| e.offset <= offset)
            .max_by_key(|e| e.offset)
    }
}

/// One physical file of a split document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfileEntry {
    pub name: String,
    /// Logical offset where this subfile's content starts.
    pub start: u64,
}

/// Parsed `Indirect:` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndirectTable {
    subfiles: Vec<SubfileEntry>,
}

impl IndirectTable {
    pub fn parse(body: &str) -> Result<IndirectTable> {
        let mut subfiles: Vec<SubfileEntry> = Vec::new();

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, number) = line.rsplit_once(':').ok_or_else(|| {
                Error::CorruptTagTable(format!("indirect entry without offset: {line:?}"))
            })?;
            let start: u64 = number.trim().parse().map_err(|_| {
                Error::CorruptTagTable(format!("non-numeric subfile offset {number:?}"))
            })?;
            if subfiles.last().is_some_and(|prev| prev.start > start) {
                return Err(Error::CorruptTagTable(format!(
                    "subfile {name:?} starts before its predecessor"
                )));
            }
            subfiles.push(SubfileEntry {
                name: name.trim().to_string(),
                start,
            });
        }

        if subfiles.is_empty() {
            return Err(Error::CorruptTagTable("empty indirect table".into()));
        }
        Ok(IndirectTable { subfiles })
    }

    pub fn subfiles(&self) -> &[SubfileEntry] {
        &self.subfiles
    }

    /// Translate a logical offset to `(subfile index, offset past the
    /// subfile's start)`. The caller adds the subfile's preamble length.
    pub fn locate(&self, logical: u64) -> Option<(usize, u64)> {
        let index = self
            .subfiles
            .partition_point(|s| s.start <= logical)
            .checked_sub(1)?;
        Some((index, logical - self.subfiles[index].start))
    }
}

/// The bookkeeping sections found at the end of an Info file.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub tag_table: Option<TagTable>,
    pub indirect: Option<IndirectTable>,
    /// Declared by `coding:` in a trailing `Local Variables:` block.
    pub encoding: Option<String>,
}

/// Read the tables from the tail of `source` without reading the whole file
/// (unless the tables are that large).
///
/// A malformed table is returned as `Err(CorruptTagTable)`; the caller
/// decides how to degrade. A file without tables yields empty [`Tables`].
pub fn read_tables(source: &dyn ByteSource) -> Result<Tables> {
    let len = source.len();
    let mut window = TAIL_WINDOW.min(len);

    loop {
        let start = len - window;
        let data = source.read_at(start, window as usize)?;
        let whole = start == 0;

        match scan_tables(&data, start, len, whole) {
            Some(tables) => return tables,
            None if whole => return Ok(Tables::default()),
            None => window = (window * 2).min(len),
        }
    }
}

/// Scan a tail window. `None` means the tables may begin before the window.
fn scan_tables(data: &[u8], base: u64, size: u64, whole: bool) -> Option<Result<Tables>> {
    let mut tables = Tables::default();
    let mut tag_body = None;
    let mut saw_end = false;

    for segment in Segments::new(data, base) {
        match segment.kind() {
            SegmentKind::TagTable => tag_body = Some(segment.body),
            SegmentKind::EndTagTable => saw_end = true,
            SegmentKind::Indirect => {
                let body = String::from_utf8_lossy(segment.body);
                match IndirectTable::parse(&body) {
                    Ok(indirect) => tables.indirect = Some(indirect),
                    Err(e) => return Some(Err(e)),
                }
            }
            SegmentKind::LocalVariables => tables.encoding = parse_coding(segment.body),
            _ => {}
        }
    }

    // The end marker is visible but the table header is not: widen.
    if saw_end && tag_body.is_none() && !whole {
        return None;
    }

    if let Some(body) = tag_body {
        let text = decode_text(body, tables.encoding.as_deref());
        let indirect = text
            .lines()
            .any(|line| line.trim().eq_ignore_ascii_case("(Indirect)"));
        // An indirect tag table needs its indirect table, which precedes it.
        if indirect && tables.indirect.is_none() && !whole {
            return None;
        }
        // Logical offsets are not bounded by this file's size.
        let bound = (!indirect).then_some(size);
        match TagTable::parse(&text, bound) {
            Ok(table) => tables.tag_table = Some(table),
            Err(e) => return Some(Err(e)),
        }
    }

    Some(Ok(tables))
}

/// Extract `coding: NAME` from a `Local Variables:` block.
pub fn parse_coding(body: &[u8]) -> Option<String> {
    let pos = body.find(b"coding:")?;
    let rest = &body[pos + b"coding:".len()..];
    let line_end = rest.find_byte(b'\n').unwrap_or(rest.len());
    let value = std::str::from_utf8(&rest[..line_end]).ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Read the start of a subfile to find where its content begins: the
/// offset of its first separator.
pub fn preamble_length(source: &dyn ByteSource) -> io::Result<u64> {
    let take = source.len().min(4096) as usize;
    let data = source.read_at(0, take)?;
    let whole = take as u64 == source.len();
    Ok(super::lexer::find_separator_in(&data, 0, whole).map_or(0, |(start, _)| start as u64))
}
