//! Benchmarks for opening documents and loading nodes.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use pinfo::{Direction, Document, SearchScope, Session};

const SAMPLE: &[u8] = include_bytes!("../tests/fixtures/sample.info");

/// A manual of `nodes` nodes, with or without a tag table.
fn large_document(nodes: usize, tag_table: bool) -> Vec<u8> {
    let mut data = b"This is big.info, produced by a benchmark.\n\n".to_vec();
    let mut offsets = Vec::with_capacity(nodes);
    for i in 0..nodes {
        offsets.push(data.len());
        let name = if i == 0 { "Top".to_string() } else { format!("Section {i}") };
        let header = format!("\x1f\nFile: big.info,  Node: {name},  Up: Top\n\n");
        data.extend_from_slice(header.as_bytes());
        for line in 0..40 {
            data.extend_from_slice(
                format!("Line {line} of section {i}, with some ordinary prose in it.\n").as_bytes(),
            );
        }
    }
    if tag_table {
        data.extend_from_slice(b"\x1f\nTag Table:\n");
        for (i, offset) in offsets.iter().enumerate() {
            let name = if i == 0 { "Top".to_string() } else { format!("Section {i}") };
            data.extend_from_slice(format!("Node: {name}\x7f{offset}\n").as_bytes());
        }
        data.extend_from_slice(b"\x1f\nEnd Tag Table\n");
    }
    data
}

// ============================================================================
// Opening
// ============================================================================

fn bench_open(c: &mut Criterion) {
    let indexed = large_document(2000, true);
    let bare = large_document(2000, false);

    c.bench_function("open_tag_table", |b| {
        b.iter(|| Document::from_bytes("big.info", black_box(indexed.clone())).unwrap());
    });
    c.bench_function("open_full_scan", |b| {
        b.iter(|| Document::from_bytes("big.info", black_box(bare.clone())).unwrap());
    });
}

fn bench_single_node(c: &mut Criterion) {
    let indexed = large_document(2000, true);
    c.bench_function("open_and_load_one_node", |b| {
        b.iter(|| {
            let doc = Document::from_bytes("big.info", indexed.clone()).unwrap();
            doc.node(black_box("Section 1500")).unwrap()
        });
    });
}

// ============================================================================
// Navigation
// ============================================================================

fn bench_search(c: &mut Criterion) {
    let doc = std::sync::Arc::new(Document::from_bytes("sample.info", SAMPLE.to_vec()).unwrap());
    c.bench_function("search_whole_document", |b| {
        b.iter(|| {
            let mut session = Session::new(doc.clone()).unwrap();
            session
                .search(black_box("exit status"), Direction::Forward, SearchScope::WholeDocument)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_open, bench_single_node, bench_search);
criterion_main!(benches);
