//! Property tests over generated Info documents.

use std::sync::Arc;

use proptest::prelude::*;

use pinfo::{Document, NavigationError, Session};

/// Build a document from node bodies; node 0 is `Top`, the rest chain by
/// `Next`. With `tag_table`, a correct tag table is appended.
fn build_document(bodies: &[String], tag_table: bool) -> Vec<u8> {
    let names: Vec<String> = (0..bodies.len())
        .map(|i| if i == 0 { "Top".to_string() } else { format!("Part {i}") })
        .collect();

    let mut data = b"This is gen.info, produced by a test.\n\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(data.len());
        let mut header = format!("\x1f\nFile: gen.info,  Node: {}", names[i]);
        if let Some(next) = names.get(i + 1) {
            header.push_str(&format!(",  Next: {next}"));
        }
        if i > 0 {
            header.push_str(&format!(",  Prev: {},  Up: Top", names[i - 1]));
        }
        data.extend_from_slice(header.as_bytes());
        data.extend_from_slice(b"\n\n");
        data.extend_from_slice(body.as_bytes());
        data.push(b'\n');
    }

    if tag_table {
        data.extend_from_slice(b"\x1f\nTag Table:\n");
        for (name, offset) in names.iter().zip(&offsets) {
            data.extend_from_slice(format!("Node: {name}\x7f{offset}\n").as_bytes());
        }
        data.extend_from_slice(b"\x1f\nEnd Tag Table\n");
    }
    data
}

fn bodies() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,6}(\n[a-z ]{0,30}){0,4}", 1..6)
}

proptest! {
    #[test]
    fn parsing_is_deterministic(bodies in bodies()) {
        let bytes = build_document(&bodies, true);
        let a = Document::from_bytes("gen.info", bytes.clone()).unwrap();
        let b = Document::from_bytes("gen.info", bytes).unwrap();

        prop_assert_eq!(a.all_names(), b.all_names());
        for name in a.all_names() {
            let x = a.node(&name).unwrap();
            let y = b.node(&name).unwrap();
            prop_assert_eq!(x.header(), y.header());
            prop_assert_eq!(x.body(), y.body());
            prop_assert_eq!(x.menu(), y.menu());
            prop_assert_eq!(x.xrefs(), y.xrefs());
        }
    }

    #[test]
    fn tag_table_matches_full_scan(bodies in bodies()) {
        let indexed = Document::from_bytes("gen.info", build_document(&bodies, true)).unwrap();
        let scanned = Document::from_bytes("gen.info", build_document(&bodies, false)).unwrap();
        prop_assert!(indexed.index_available());
        prop_assert!(!scanned.index_available());

        prop_assert_eq!(indexed.all_names(), scanned.all_names());
        for name in indexed.all_names() {
            let x = indexed.node(&name).unwrap();
            let y = scanned.node(&name).unwrap();
            prop_assert_eq!(x.header(), y.header());
            prop_assert_eq!(x.body(), y.body());
        }
        prop_assert!(indexed.index_available());
    }

    #[test]
    fn back_undoes_every_move(
        bodies in bodies(),
        moves in prop::collection::vec(0usize..6, 0..12),
    ) {
        let doc = Document::from_bytes("gen.info", build_document(&bodies, true)).unwrap();
        let names = doc.all_names();
        let mut s = Session::new(Arc::new(doc)).unwrap();

        let mut expected = vec![s.current_node().name().to_string()];
        for m in moves {
            let name = &names[m % names.len()];
            s.goto_node(name).unwrap();
            if expected.last() != Some(name) {
                expected.push(name.clone());
            }
        }
        prop_assert_eq!(s.visited(), expected.clone());

        expected.pop();
        while let Some(name) = expected.pop() {
            let node = s.back().unwrap();
            prop_assert_eq!(node.name(), name.as_str());
        }
        prop_assert_eq!(s.back().unwrap_err(), NavigationError::HistoryEmpty);
        prop_assert_eq!(s.current_node().name(), "Top");
    }

    #[test]
    fn failed_moves_leave_state_alone(bodies in bodies(), missing in "[A-Z]{3,10}") {
        let doc = Document::from_bytes("gen.info", build_document(&bodies, true)).unwrap();
        let mut s = Session::new(Arc::new(doc)).unwrap();
        let before = s.state().clone();

        let name = format!("No {missing}");
        prop_assert!(s.goto_node(&name).is_err());
        prop_assert!(s.go_prev().is_err());
        prop_assert!(s.select_menu_item(missing.as_str()).is_err());
        prop_assert!(s.back().is_err());
        prop_assert_eq!(s.state(), &before);
    }
}
