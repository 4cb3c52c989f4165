//! Navigation session tests.
//!
//! Pointer moves, menus, cross references, history, search, and index
//! lookup driven through the public `Session` API.

use std::sync::Arc;

use pinfo::{
    Config, Direction, Document, MenuItem, NavigationError, Relation, SearchOptions, SearchScope,
    Session,
};

const SAMPLE: &[u8] = include_bytes!("fixtures/sample.info");

/// Two nodes without a tag table; only `Intro` mentions "error".
const TWO_NODES: &[u8] = b"\x1f\nFile: two.info,  Node: Top,  Up: (dir)\n\n\
The top node.\n\n* Menu:\n\n* Intro: Intro.        Getting started.\n\n\
\x1f\nFile: two.info,  Node: Intro,  Up: Top\n\n\
Reading an error message.  *Note Top::.\n";

/// A node whose header has no `Up` field.
const NO_UP: &[u8] = b"\x1f\nFile: up.info,  Node: Top,  Next: Orphan\n\n\
Top.\n\n* Menu:\n\n* Orphan::\n\n\
\x1f\nFile: up.info,  Node: Orphan,  Prev: Top\n\nNo way up from here.\n";

fn session(name: &str, bytes: &[u8]) -> Session {
    let doc = Document::from_bytes(name, bytes.to_vec()).unwrap();
    Session::new(Arc::new(doc)).unwrap()
}

// ============================================================================
// Menus, Cross References, and History
// ============================================================================

#[test]
fn test_menu_xref_and_back() {
    let mut s = session("two.info", TWO_NODES);

    s.goto_node("Top").unwrap();
    assert_eq!(s.select_menu_item("Intro").unwrap().name(), "Intro");
    assert_eq!(s.follow_xref("Top").unwrap().name(), "Top");

    assert_eq!(s.back().unwrap().name(), "Intro");
    assert_eq!(s.back().unwrap().name(), "Top");
    assert_eq!(s.back().unwrap_err(), NavigationError::HistoryEmpty);
    assert_eq!(s.current_node().name(), "Top");
}

#[test]
fn test_back_restores_point() {
    let mut s = session("sample.info", SAMPLE);
    s.select_menu_item("Overview").unwrap();
    s.search("error", Direction::Forward, SearchScope::CurrentNode).unwrap();
    let point = s.point();
    assert!(point > 0);

    s.go_next().unwrap();
    assert_eq!(s.point(), 0);
    s.back().unwrap();
    assert_eq!(s.current_node().name(), "Overview");
    assert_eq!(s.point(), point);
}

#[test]
fn test_menu_item_by_position() {
    let mut s = session("sample.info", SAMPLE);
    let node = s.select_menu_item(MenuItem::Index(2)).unwrap();
    assert_eq!(node.name(), "Concept Index");

    s.go_top().unwrap();
    assert_eq!(
        s.select_menu_item(MenuItem::Index(3)).unwrap_err(),
        NavigationError::NoSuchMenuEntry("3".into())
    );
}

#[test]
fn test_menu_item_by_label_prefix() {
    let mut s = session("sample.info", SAMPLE);
    assert_eq!(s.select_menu_item("invok").unwrap().name(), "Invoking sample");
}

#[test]
fn test_missing_menu_item_keeps_state() {
    let mut s = session("sample.info", SAMPLE);
    let before = s.state().clone();
    assert_eq!(
        s.select_menu_item("Tutorial").unwrap_err(),
        NavigationError::NoSuchMenuEntry("Tutorial".into())
    );
    assert_eq!(s.state(), &before);
}

#[test]
fn test_xref_to_anchor_sets_point() {
    let mut s = session("sample.info", SAMPLE);
    s.goto_node("Overview").unwrap();

    let node = s.follow_xref("Exit status").unwrap();
    assert_eq!(node.name(), "Invoking sample");
    assert!(node.body()[s.point()..].starts_with("2.1 Exit status"));
}

#[test]
fn test_external_xref_is_reported() {
    let mut s = session("sample.info", SAMPLE);
    s.goto_node("Invoking sample").unwrap();

    let err = s.follow_xref("Common options").unwrap_err();
    assert_eq!(
        err,
        NavigationError::ExternalNode {
            file: "coreutils".into(),
            node: "Common options".into(),
        }
    );
    assert_eq!(s.current_node().name(), "Invoking sample");
}

#[test]
fn test_unknown_node() {
    let mut s = session("sample.info", SAMPLE);
    assert_eq!(
        s.goto_node("Glossary").unwrap_err(),
        NavigationError::NodeNotFound("Glossary".into())
    );
    assert_eq!(s.visited(), ["Top"]);
}

// ============================================================================
// Pointers and Document Order
// ============================================================================

#[test]
fn test_missing_up_pointer() {
    let mut s = session("up.info", NO_UP);
    let orphan = s.select_menu_item("Orphan").unwrap();
    assert!(orphan.up().is_none());

    let before = s.state().clone();
    assert_eq!(
        s.go_up().unwrap_err(),
        NavigationError::NoSuchDirection(Relation::Up)
    );
    assert_eq!(s.state(), &before);
    assert_eq!(s.current_node().name(), "Orphan");
}

#[test]
fn test_pointer_walk() {
    let mut s = session("sample.info", SAMPLE);
    let mut names = vec![s.current_node().name().to_string()];
    while let Ok(node) = s.go_next() {
        names.push(node.name().to_string());
    }
    assert_eq!(
        names,
        ["Top", "Overview", "Invoking sample", "Concept Index"]
    );
    assert_eq!(s.go_up().unwrap().name(), "Top");
    assert_eq!(
        s.go_prev().unwrap_err(),
        NavigationError::NoSuchDirection(Relation::Prev)
    );
}

#[test]
fn test_no_up_from_top() {
    let mut s = session("sample.info", SAMPLE);
    let before = s.state().clone();
    assert_eq!(
        s.go_up().unwrap_err(),
        NavigationError::NoSuchDirection(Relation::Up)
    );
    assert_eq!(s.state(), &before);
}

#[test]
fn test_global_moves() {
    let mut s = session("sample.info", SAMPLE);
    assert_eq!(
        s.go_backward_global().unwrap_err(),
        NavigationError::EndOfDocument
    );
    assert_eq!(s.go_forward_global().unwrap().name(), "Overview");
    assert_eq!(s.go_last().unwrap().name(), "Concept Index");
    assert_eq!(
        s.go_forward_global().unwrap_err(),
        NavigationError::EndOfDocument
    );
    assert_eq!(s.go_first().unwrap().name(), "Top");
    assert_eq!(
        s.visited(),
        ["Top", "Overview", "Concept Index", "Top"]
    );
}

#[test]
fn test_node_missing_from_tag_table_keeps_its_place() {
    let text = String::from_utf8(SAMPLE.to_vec()).unwrap();
    let entry = "Node: Invoking sample\x7f843\n";
    assert!(text.contains(entry));
    let doc = Document::from_bytes("sample.info", text.replace(entry, "").into_bytes()).unwrap();
    let mut s = Session::new(Arc::new(doc)).unwrap();

    s.goto_node("Invoking sample").unwrap();
    assert!(s.document().index_available());
    assert_eq!(s.go_forward_global().unwrap().name(), "Concept Index");
    assert_eq!(s.go_backward_global().unwrap().name(), "Invoking sample");
    assert_eq!(s.go_backward_global().unwrap().name(), "Overview");

    // Only Overview mentions "copies", and it comes before this node.
    s.goto_node("Invoking sample").unwrap();
    assert_eq!(
        s.search("copies", Direction::Forward, SearchScope::Forward).unwrap_err(),
        NavigationError::PatternNotFound("copies".into())
    );
    assert_eq!(s.current_node().name(), "Invoking sample");
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_then_repeat_without_more_matches() {
    let mut s = session("two.info", TWO_NODES);

    let found = s
        .search("error", Direction::Forward, SearchScope::WholeDocument)
        .unwrap();
    assert_eq!(found.name(), "Intro");

    let point = s.point();
    assert_eq!(
        s.repeat_search().unwrap_err(),
        NavigationError::PatternNotFound("error".into())
    );
    assert_eq!(s.current_node().name(), "Intro");
    assert_eq!(s.point(), point);
}

#[test]
fn test_search_regex_from_config() {
    let config: Config = toml::from_str("[search]\nregex = true\n").unwrap();
    let doc = Arc::new(Document::from_bytes("sample.info", SAMPLE.to_vec()).unwrap());
    let mut s = Session::with_options(doc, config.search_options()).unwrap();
    assert!(s.options().regex);

    let node = s
        .search(r"exit\s+status\s+of", Direction::Forward, SearchScope::Forward)
        .unwrap();
    assert_eq!(node.name(), "Invoking sample");
    assert!(node.body()[s.point()..].starts_with("exit status of"));
}

#[test]
fn test_search_backward_across_nodes() {
    let mut s = session("sample.info", SAMPLE);
    s.go_last().unwrap();

    let node = s
        .search("copies", Direction::Backward, SearchScope::Backward)
        .unwrap();
    assert_eq!(node.name(), "Overview");
}

#[test]
fn test_search_next_and_previous() {
    let mut s = session("sample.info", SAMPLE);
    s.set_search_options(SearchOptions {
        case_sensitive: true,
        ..SearchOptions::default()
    });

    s.search("sample", Direction::Forward, SearchScope::Forward)
        .unwrap();
    assert_eq!(s.current_node().name(), "Top");
    let first = s.point();

    s.search_next().unwrap();
    assert_eq!(s.current_node().name(), "Top");
    assert!(s.point() > first);

    s.search_previous().unwrap();
    assert_eq!(s.point(), first);
}

// ============================================================================
// Index Lookup
// ============================================================================

#[test]
fn test_index_search_lands_on_line() {
    let mut s = session("sample.info", SAMPLE);

    let node = s.index_search("exit status").unwrap();
    assert_eq!(node.name(), "Invoking sample");
    assert!(node.body()[s.point()..].starts_with("An exit status"));

    assert_eq!(
        s.next_index_match().unwrap_err(),
        NavigationError::PatternNotFound("exit status".into())
    );
}

#[test]
fn test_index_search_substring() {
    let mut s = session("sample.info", SAMPLE);
    let node = s.index_search("suppress").unwrap();
    assert_eq!(node.name(), "Invoking sample");
    assert!(node.body()[s.point()..].starts_with("     Do not print"));
}
