//! Integration test: decode a captured CPU-sampling payload and drive both
//! tree views over it the way a dashboard would.

use calltrace_core::model::{FrameTable, ProfileSession};
use calltrace_core::parsers::{FrameNodesError, ParseError, parse_profile};
use calltrace_core::views::{FrameRef, TreeConfig, TreeView, aggregate, top_layer_refs};
use calltrace_protocol::TraversalDirection;

fn fixture() -> FrameTable {
    parse_profile(include_bytes!("fixtures/worker-cpu-sampling.json"))
        .expect("fixture should decode")
}

fn expand_all(view: &mut TreeView, table: &FrameTable) {
    let mut i = 0;
    while i < view.len() {
        let entry = &view.entries()[i];
        let collapsed = entry.row.has_children() && entry.rendered_children() == 0;
        if collapsed {
            view.expand(table, i);
        }
        i += 1;
    }
}

/// Indices of the direct children rendered below `index`.
fn rendered_children(view: &TreeView, index: usize) -> Vec<usize> {
    let depth = view.entries()[index].depth;
    view.entries()[index + 1..]
        .iter()
        .enumerate()
        .take_while(|(_, e)| e.depth > depth)
        .filter(|(_, e)| e.depth == depth + 1)
        .map(|(offset, _)| index + 1 + offset)
        .collect()
}

#[test]
fn decodes_reference_example() {
    let data = br#"{
        "aggregated_samples": { "frame_nodes": [[0,2,0,[10,0]], [1,0,1,[4,4]], [2,1,2,[6,0]], [3,0,3,[6,6]]] },
        "method_lookup": ["root", "a", "b", "c"]
    }"#;
    let table = parse_profile(data).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.children(0), &[1, 2]);
    assert_eq!(table.children(2), &[3]);
    assert_eq!(table.terminal_nodes(), &[3, 1]);
}

#[test]
fn truncated_payload_is_rejected_whole() {
    let err = parse_profile(include_bytes!("fixtures/truncated.json")).unwrap_err();
    assert!(
        matches!(
            err,
            ParseError::FrameNodes(FrameNodesError::Truncated {
                parent: 1,
                expected: 2,
                found: 1,
            })
        ),
        "{err}"
    );
}

#[test]
fn totals_match_root_counts() {
    let table = fixture();
    assert_eq!(table.total_on_stack(), 100);
    assert_eq!(table.total_on_cpu(), 100);
    assert_eq!(table.terminal_nodes().len(), 8);
}

#[test]
fn hot_methods_top_layer() {
    let table = fixture();
    let mut view = TreeView::new(TraversalDirection::HotMethods, TreeConfig::default());
    view.materialize(&table);

    let rows = view.rows(&table);
    let summary: Vec<(&str, u64)> = rows.iter().map(|r| (r.label.as_str(), r.samples)).collect();
    assert_eq!(
        summary,
        vec![
            ("sun.nio.ch.FileDispatcherImpl.write0 (Ljava/io/FileDescriptor;JI)I", 35),
            ("java.util.HashMap.get (Ljava/lang/Object;)Ljava/lang/Object;", 35),
            ("com.acme.Parser.readToken ()I", 20),
            ("com.acme.Parser.parse (Ljava/lang/String;)Lcom/acme/Doc;", 5),
            ("com.acme.Store.flush ()V", 3),
            ("com.acme.Worker.loop ()V", 2),
        ]
    );
    assert_eq!(rows[0].samples_pct, 35.0);
    assert_eq!(rows[0].on_cpu, Some(35));
    assert!(rows.iter().all(|r| r.indent == 0 && !r.opened));
}

#[test]
fn hot_method_callers_split_by_call_site() {
    let table = fixture();
    let mut view = TreeView::new(TraversalDirection::HotMethods, TreeConfig::default());
    view.materialize(&table);
    assert_eq!(view.expand(&table, 0), 2);

    let rows = view.rows(&table);
    assert_eq!(rows[1].label, "com.acme.Store.flush ()V:77");
    assert_eq!(rows[1].samples, 25);
    assert_eq!(rows[1].on_cpu, None);
    assert_eq!(rows[2].label, "com.acme.Store.flush ()V:80");
    assert_eq!(rows[2].samples, 10);
    // flush:80 was called straight from a thread root.
    assert!(!rows[2].has_children);
    assert!(rows[2].opened);
    assert_eq!(rows[1].indent, TreeConfig::default().major_indent);
}

#[test]
fn call_tree_counts_are_consistent_when_fully_expanded() {
    let table = fixture();
    let mut view = TreeView::new(TraversalDirection::CallTree, TreeConfig::default());
    view.materialize(&table);
    expand_all(&mut view, &table);
    assert_eq!(view.len(), table.len() - 1);

    for (i, entry) in view.entries().iter().enumerate() {
        let children = rendered_children(&view, i);
        assert_eq!(children.len(), entry.rendered_children());
        if children.is_empty() {
            continue;
        }
        let below: u64 = children
            .iter()
            .map(|&c| view.entries()[c].row.sample_count)
            .sum();
        let on_cpu = entry.row.on_cpu.unwrap_or(0);
        assert_eq!(below + on_cpu, entry.row.sample_count, "{}", entry.unique_id);
    }
}

#[test]
fn hot_method_expansion_conserves_attributed_samples() {
    let table = fixture();
    let mut view = TreeView::new(TraversalDirection::HotMethods, TreeConfig::default());
    view.materialize(&table);
    expand_all(&mut view, &table);

    for (i, entry) in view.entries().iter().enumerate() {
        let children = rendered_children(&view, i);
        let below: u64 = children
            .iter()
            .map(|&c| view.entries()[c].row.sample_count)
            .sum();
        let handed_up: u64 = entry
            .row
            .next
            .iter()
            .filter_map(FrameRef::inherited_count)
            .sum();
        assert_eq!(below, handed_up, "{}", entry.unique_id);
        assert!(below <= entry.row.sample_count);
    }
}

#[test]
fn aggregation_is_repeatable() {
    let table = fixture();
    let refs = top_layer_refs(&table, TraversalDirection::HotMethods);
    let first = aggregate(&table, &refs, TraversalDirection::HotMethods, true);
    for _ in 0..5 {
        assert_eq!(aggregate(&table, &refs, TraversalDirection::HotMethods, true), first);
    }
}

#[test]
fn filter_hides_top_rows_but_not_callers() {
    let table = fixture();
    let mut view = TreeView::new(TraversalDirection::HotMethods, TreeConfig::default());
    view.set_filter(&table, "hashmap");

    let labels: Vec<String> = view.rows(&table).into_iter().map(|r| r.label).collect();
    assert_eq!(
        labels,
        vec![
            "java.util.HashMap.get (Ljava/lang/Object;)Ljava/lang/Object;",
            "com.acme.Parser.parse (Ljava/lang/String;)Lcom/acme/Doc;:58",
            "com.acme.Parser.readToken ()I:112",
        ]
    );

    view.expand(&table, 2);
    let labels: Vec<String> = view.rows(&table).into_iter().map(|r| r.label).collect();
    assert_eq!(labels[3], "com.acme.Parser.parse (Ljava/lang/String;)Lcom/acme/Doc;:58");

    view.set_filter(&table, "^no.such.method$");
    assert!(view.is_empty());
}

#[test]
fn session_collapse_returns_to_previous_length() {
    let data = include_bytes!("fixtures/worker-cpu-sampling.json");
    let mut session = ProfileSession::load(data, "worker", TreeConfig::default()).unwrap();
    let (table, view) = session.view_mut(TraversalDirection::CallTree);
    let before = view.len();

    // Thread.run has a single callee, so Worker.loop opens along with it.
    assert_eq!(view.expand(table, 0), 3);
    assert_eq!(view.expand_id(table, "1:745->2:31->3:58"), 2);
    assert_eq!(view.len(), before + 5);

    view.collapse(0);
    assert_eq!(view.len(), before);
}
