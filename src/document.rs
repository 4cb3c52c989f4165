//! An opened Info document.
//!
//! Opening reads only the tail of the file: when a usable tag table is
//! found, every node starts out unloaded and is parsed on first access by
//! seeking to its offset (in the right subfile for split documents).
//! Without a usable table the document is scanned once, in full, and
//! served from memory. A table that turns out to be wrong while loading
//! switches the document to the scanned store; [`Document::index_available`]
//! reports which mode is active.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::error::{Diagnostic, Error, ParseWarning, Result, StructuralError};
use crate::info::lexer::{self, SegmentKind, Segments};
use crate::info::tag_table::{self, IndirectTable, TagKind, TagTable};
use crate::io::{
    COMPRESSION_SUFFIXES, ByteSource, Decompressor, MemorySource, StandardDecompressor,
    strip_compression_suffix,
};
use crate::model::{Node, normalize_name};
use crate::store::NodeStore;
use crate::util::decode_text;

/// Largest span read to place an anchor within its node.
const MAX_ANCHOR_SPAN: u64 = 1 << 20;

/// Order in which whole-document operations visit nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    /// File order.
    #[default]
    Document,
    /// Follow `Next` pointers from the top node, then the unreached nodes
    /// in file order.
    NextChain,
}

/// A resolved node name: the node, plus the point within its body when the
/// name was an anchor.
#[derive(Debug, Clone)]
pub struct Target {
    pub node: Arc<Node>,
    pub point: Option<usize>,
}

struct Subfile {
    name: String,
    start: u64,
    /// Decompressed contents and preamble length, opened on first use.
    source: OnceCell<(Arc<dyn ByteSource>, u64)>,
}

/// One logical Info document, possibly split across several files.
pub struct Document {
    path: Option<PathBuf>,
    file_name: String,
    decompressor: Arc<dyn Decompressor>,
    main: Arc<dyn ByteSource>,
    encoding: Option<String>,
    subfiles: Vec<Subfile>,
    tags: Option<TagTable>,
    indexed: AtomicBool,
    store: RwLock<Arc<NodeStore>>,
    scanned: OnceCell<Arc<NodeStore>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("subfiles", &self.subfiles.len())
            .field("index_available", &self.index_available())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Open an Info file, decompressing it as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Document> {
        Self::open_with(path, Arc::new(StandardDecompressor))
    }

    /// Open with a custom decompression collaborator.
    pub fn open_with(
        path: impl AsRef<Path>,
        decompressor: Arc<dyn Decompressor>,
    ) -> Result<Document> {
        let path = path.as_ref();
        let main = decompressor
            .open(path)
            .map_err(|e| Error::Unreadable(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| strip_compression_suffix(&n.to_string_lossy()).to_string())
            .unwrap_or_default();

        Self::build(Some(path.to_path_buf()), file_name, main, decompressor)
    }

    /// Open a document held in memory. Split documents cannot find their
    /// subfiles this way.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Document> {
        Self::build(
            None,
            strip_compression_suffix(name).to_string(),
            Arc::new(MemorySource::new(bytes)),
            Arc::new(StandardDecompressor),
        )
    }

    fn build(
        path: Option<PathBuf>,
        file_name: String,
        main: Arc<dyn ByteSource>,
        decompressor: Arc<dyn Decompressor>,
    ) -> Result<Document> {
        if main.is_empty() {
            return Err(Error::Unreadable(format!("{file_name}: empty file")));
        }

        let mut diagnostics = Vec::new();
        let tables = match tag_table::read_tables(main.as_ref()) {
            Ok(tables) => tables,
            Err(e) => {
                warn!("{file_name}: {e}; falling back to a full scan");
                diagnostics.push(Diagnostic::Degraded(e.to_string()));
                let data = main.read_all()?;
                salvage_tables(&data)
            }
        };

        let subfiles = tables
            .indirect
            .as_ref()
            .map(IndirectTable::subfiles)
            .unwrap_or_default()
            .iter()
            .map(|entry| Subfile {
                name: entry.name.clone(),
                start: entry.start,
                source: OnceCell::new(),
            })
            .collect::<Vec<_>>();

        let tags = tables.tag_table.filter(|table| {
            if table.nodes().next().is_none() {
                return false;
            }
            if table.is_indirect() && subfiles.is_empty() {
                warn!("{file_name}: indirect tag table without an indirect table");
                diagnostics.push(Diagnostic::Degraded(
                    "indirect tag table without an indirect table".into(),
                ));
                return false;
            }
            true
        });

        let mut document = Document {
            path,
            file_name,
            decompressor,
            main,
            encoding: tables.encoding,
            subfiles,
            indexed: AtomicBool::new(tags.is_some()),
            tags,
            store: RwLock::new(Arc::new(NodeStore::new())),
            scanned: OnceCell::new(),
            diagnostics: Mutex::new(diagnostics),
        };

        let store = match &document.tags {
            Some(tags) => {
                let mut store = NodeStore::new();
                for entry in tags.nodes() {
                    // Names are unique by construction of the table.
                    let _ = store.insert_unloaded(&entry.name, entry.offset);
                }
                for name in tags.duplicates() {
                    warn!("{}: tag table lists {name:?} twice", document.file_name);
                    document.push_diagnostic(Diagnostic::Structural(
                        StructuralError::DuplicateNode(name.clone()),
                    ));
                }
                Arc::new(store)
            }
            None => document.full_scan()?,
        };

        if store.is_empty() {
            return Err(Error::Unreadable(format!(
                "{}: no nodes found",
                document.file_name
            )));
        }

        info!(
            "opened {} ({} nodes, {} subfiles, {})",
            document.file_name,
            store.len(),
            document.subfiles.len(),
            if document.index_available() { "indexed" } else { "full scan" }
        );
        document.store = RwLock::new(store);
        Ok(document)
    }

    /// Path the document was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File name without directory or compression suffix.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Encoding declared by the document, if any.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Subfile names of a split document, in order.
    pub fn subfile_names(&self) -> Vec<&str> {
        self.subfiles.iter().map(|s| s.name.as_str()).collect()
    }

    /// False when nodes are served from a full scan instead of the tag table.
    pub fn index_available(&self) -> bool {
        self.indexed.load(Ordering::Acquire)
    }

    /// Warnings and structural errors found so far. Lazy loading can add
    /// more as nodes are read.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// The current node store.
    pub fn store(&self) -> Arc<NodeStore> {
        Arc::clone(&self.store.read())
    }

    /// Node names in file order.
    ///
    /// Once a lookup has fallen back to a full scan, nodes the tag table
    /// leaves out are listed too.
    pub fn all_names(&self) -> Vec<String> {
        let names = self.store().all_names();
        match self.scanned.get() {
            Some(scanned) if self.index_available() => {
                let missing: Vec<String> = names
                    .into_iter()
                    .filter(|name| !scanned.contains(name))
                    .collect();
                let mut merged = scanned.all_names();
                merged.extend(missing);
                merged
            }
            _ => names,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// The node called `Top`, or the first node of the file.
    pub fn top_name(&self) -> Option<String> {
        let store = self.store();
        if store.contains("Top") {
            return Some("Top".to_string());
        }
        store
            .find_ignore_case("Top")
            .or_else(|| store.name_at(0))
            .map(str::to_string)
    }

    /// Fetch a node by name, loading it if needed.
    pub fn node(&self, name: &str) -> Result<Arc<Node>> {
        self.resolve(name).map(|target| target.node)
    }

    /// Resolve a node or anchor name.
    ///
    /// Exact names win, then anchors, then a case-insensitive match. A name
    /// missing from the tag table is looked for in a full scan without
    /// giving up the table for other lookups.
    pub fn resolve(&self, name: &str) -> Result<Target> {
        let name = normalize_name(name);
        let store = self.store();

        if store.contains(&name) {
            return self.load(&store, &name).map(Target::at_start);
        }

        if self.index_available()
            && let Some(tags) = &self.tags
            && let Some(entry) = tags.get(&name)
            && entry.kind == TagKind::Anchor
            && let Some(owner) = tags.node_containing(entry.offset)
        {
            let node = self.load(&store, &owner.name)?;
            let point = self
                .anchor_point(owner.offset, entry.offset, &node)
                .unwrap_or(0);
            debug!("anchor {name:?} is in {:?} at {point}", owner.name);
            return Ok(Target {
                node,
                point: Some(point),
            });
        }

        if let Some(found) = store.find_ignore_case(&name) {
            return self.load(&store, found).map(Target::at_start);
        }

        if self.index_available() {
            debug!("{name:?} is not in the tag table, scanning");
            let scanned = self.full_scan()?;
            let found = if scanned.contains(&name) {
                Some(name.as_str())
            } else {
                scanned.find_ignore_case(&name)
            };
            if let Some(found) = found {
                return self.load(&scanned, found).map(Target::at_start);
            }
        }

        Err(Error::NodeNotFound(name))
    }

    /// Load every node. Errors stop at the first unloadable node.
    pub fn load_all(&self) -> Result<Vec<Arc<Node>>> {
        self.all_names().iter().map(|name| self.node(name)).collect()
    }

    /// Node names in the requested traversal order.
    pub fn traversal(&self, order: TraversalOrder) -> Result<Vec<String>> {
        let names = self.all_names();
        match order {
            TraversalOrder::Document => Ok(names),
            TraversalOrder::NextChain => {
                let known: HashSet<&str> = names.iter().map(String::as_str).collect();
                let mut seen = HashSet::new();
                let mut ordered = Vec::with_capacity(names.len());
                let mut cursor = self.top_name();

                while let Some(name) = cursor.take() {
                    if !seen.insert(name.clone()) {
                        break;
                    }
                    let node = self.node(&name)?;
                    ordered.push(name);
                    cursor = node
                        .next()
                        .filter(|next| !next.is_external_to(Some(&self.file_name)))
                        .filter(|next| known.contains(next.node.as_str()))
                        .map(|next| next.node.clone());
                }

                ordered.extend(names.iter().filter(|n| !seen.contains(*n)).cloned());
                Ok(ordered)
            }
        }
    }

    /// Release the document. Dropping it has the same effect.
    pub fn close(self) {
        debug!("closing {}", self.file_name);
    }

    fn push_diagnostic(&self, diagnostic: Diagnostic) {
        let mut diagnostics = self.diagnostics.lock();
        if !diagnostics.contains(&diagnostic) {
            diagnostics.push(diagnostic);
        }
    }

    /// Record the menu and cross reference problems of a parsed node.
    fn note_link_warnings(&self, node: &Node) {
        for warning in node.warnings() {
            debug!("{}: {warning}", self.file_name);
            self.push_diagnostic(Diagnostic::Warning(warning.clone()));
        }
    }

    /// Fetch `name` from `store`, degrading on a bad tag table entry.
    fn load(&self, store: &NodeStore, name: &str) -> Result<Arc<Node>> {
        let result = store.get_or_load(name, |offset| self.load_indexed(name, offset));
        match result {
            Ok(Some(node)) => Ok(node),
            Ok(None) => Err(Error::NodeNotFound(name.to_string())),
            Err(
                err @ (Error::CorruptTagTable(_)
                | Error::Structural(StructuralError::TagTableMismatch { .. })),
            ) => {
                self.degrade(err)?;
                let scanned = self.full_scan()?;
                scanned
                    .get_or_load(name, |_| Err(Error::NodeNotFound(name.to_string())))?
                    .ok_or_else(|| Error::NodeNotFound(name.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Parse the node the tag table places at logical `offset` and check
    /// that it is the one the table named.
    fn load_indexed(&self, name: &str, offset: u64) -> Result<Node> {
        let (source, local) = self.locate(offset)?;
        debug!("loading {name:?} from offset {local}");

        let parsed = lexer::read_node_at(source.as_ref(), local, self.encoding())
            .map_err(|e| Error::CorruptTagTable(format!("{name:?} at {offset}: {e}")))?;
        match parsed {
            Ok(node) if node.name() == name => {
                self.note_link_warnings(&node);
                Ok(node)
            }
            Ok(node) => Err(Error::Structural(StructuralError::TagTableMismatch {
                expected: name.to_string(),
                found: Some(node.name().to_string()),
                offset,
            })),
            Err(_) => Err(Error::Structural(StructuralError::TagTableMismatch {
                expected: name.to_string(),
                found: None,
                offset,
            })),
        }
    }

    /// Map a logical offset to a physical source and offset within it.
    fn locate(&self, offset: u64) -> Result<(Arc<dyn ByteSource>, u64)> {
        if self.subfiles.is_empty() {
            return Ok((Arc::clone(&self.main), offset));
        }

        let index = self
            .subfiles
            .partition_point(|s| s.start <= offset)
            .checked_sub(1)
            .ok_or_else(|| {
                Error::CorruptTagTable(format!("offset {offset} precedes the first subfile"))
            })?;
        let subfile = &self.subfiles[index];
        let (source, preamble) = self.subfile_source(subfile)?;
        Ok((source, offset - subfile.start + preamble))
    }

    fn subfile_source(&self, subfile: &Subfile) -> Result<(Arc<dyn ByteSource>, u64)> {
        subfile
            .source
            .get_or_try_init(|| {
                let source = self.open_subfile(&subfile.name).map_err(|e| {
                    warn!("{}: cannot open subfile {}: {e}", self.file_name, subfile.name);
                    let err = StructuralError::MissingSubfile(subfile.name.clone());
                    self.push_diagnostic(Diagnostic::Structural(err.clone()));
                    Error::Structural(err)
                })?;
                let preamble = tag_table::preamble_length(source.as_ref())?;
                debug!("subfile {} preamble is {preamble} bytes", subfile.name);
                Ok((source, preamble))
            })
            .map(|(source, preamble)| (Arc::clone(source), *preamble))
    }

    /// Subfiles live next to the main file, each possibly compressed.
    fn open_subfile(&self, name: &str) -> std::io::Result<Arc<dyn ByteSource>> {
        let dir = self
            .path
            .as_deref()
            .and_then(Path::parent)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no directory"))?;

        let exact = dir.join(name);
        if exact.is_file() {
            return self.decompressor.open(&exact);
        }
        for suffix in COMPRESSION_SUFFIXES {
            let candidate = dir.join(format!("{name}{suffix}"));
            if candidate.is_file() {
                return self.decompressor.open(&candidate);
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", exact.display()),
        ))
    }

    /// Switch to full-scan mode. Only the first caller records diagnostics.
    fn degrade(&self, reason: Error) -> Result<()> {
        if self.indexed.swap(false, Ordering::AcqRel) {
            warn!("{}: {reason}; switching to a full scan", self.file_name);
            if let Error::Structural(err) = &reason {
                self.push_diagnostic(Diagnostic::Structural(err.clone()));
            }
            self.push_diagnostic(Diagnostic::Degraded(reason.to_string()));
            let scanned = self.full_scan()?;
            *self.store.write() = scanned;
        }
        Ok(())
    }

    /// Every node of every file, parsed once and cached.
    fn full_scan(&self) -> Result<Arc<NodeStore>> {
        self.scanned
            .get_or_try_init(|| self.scan_all().map(Arc::new))
            .cloned()
    }

    fn scan_all(&self) -> Result<NodeStore> {
        let mut store = NodeStore::new();
        let data = self.main.read_all()?;
        self.scan_into(&mut store, &data, 0);

        for subfile in &self.subfiles {
            let Ok((source, preamble)) = self.subfile_source(subfile) else {
                continue;
            };
            let data = source.read_all()?;
            self.scan_into(&mut store, &data, subfile.start.saturating_sub(preamble));
        }

        debug!("{}: full scan found {} nodes", self.file_name, store.len());
        Ok(store)
    }

    fn scan_into(&self, store: &mut NodeStore, data: &[u8], base: u64) {
        for segment in Segments::new(data, base) {
            match segment.kind() {
                SegmentKind::Node => match lexer::parse_segment(&segment, self.encoding()) {
                    Ok(node) => {
                        self.note_link_warnings(&node);
                        if let Err(err) = store.insert(node) {
                            warn!("{}: {err}", self.file_name);
                            self.push_diagnostic(Diagnostic::Structural(err));
                        }
                    }
                    Err(warning) => {
                        warn!("{}: {warning}", self.file_name);
                        self.push_diagnostic(Diagnostic::Warning(warning));
                    }
                },
                SegmentKind::Unknown => {
                    let warning = ParseWarning::UnknownSection {
                        offset: segment.offset,
                    };
                    debug!("{}: {warning}", self.file_name);
                    self.push_diagnostic(Diagnostic::Warning(warning));
                }
                _ => {}
            }
        }
    }

    /// Byte position of an anchor within its node's body.
    fn anchor_point(&self, node_offset: u64, anchor_offset: u64, node: &Node) -> Option<usize> {
        let (node_source, node_local) = self.locate(node_offset).ok()?;
        let (anchor_source, anchor_local) = self.locate(anchor_offset).ok()?;
        if !Arc::ptr_eq(&node_source, &anchor_source) || anchor_local < node_local {
            return None;
        }

        let span = (anchor_local - node_local).min(MAX_ANCHOR_SPAN);
        let data = node_source.read_at(node_local, span as usize).ok()?;
        let content = match lexer::find_separator(&data, 0) {
            Some((0, content)) => content,
            _ => 0,
        };
        let header_end = memchr::memchr(b'\n', &data[content..])? + content + 1;
        let prefix = decode_text(&data[header_end..], self.encoding());
        Some(prefix.len().min(node.body().len()))
    }
}

impl Target {
    fn at_start(node: Arc<Node>) -> Target {
        Target { node, point: None }
    }
}

/// Recover the indirect table and encoding from a file whose tag table is
/// unusable.
fn salvage_tables(data: &[u8]) -> tag_table::Tables {
    let mut tables = tag_table::Tables::default();
    for segment in Segments::new(data, 0) {
        match segment.kind() {
            SegmentKind::Indirect => {
                let body = String::from_utf8_lossy(segment.body);
                tables.indirect = IndirectTable::parse(&body).ok();
            }
            SegmentKind::LocalVariables => {
                tables.encoding = tag_table::parse_coding(segment.body);
            }
            _ => {}
        }
    }
    tables
}
