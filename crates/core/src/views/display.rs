use calltrace_protocol::TraversalDirection;

use crate::model::{FrameTable, MethodLookup};
use crate::views::aggregate::AggregatedRow;

/// Human-readable method label, or a placeholder when the lookup table has
/// no entry for `method`.
pub fn method_label(lookup: &MethodLookup, method: usize) -> String {
    match lookup.get(method) {
        Some(entry) => entry.label(),
        None => format!("<unknown method #{method}>"),
    }
}

/// The label a row is shown with.
///
/// Call-tree rows always carry their line; hot-methods rows carry it below
/// the top layer, where call sites are told apart.
pub fn display_name(lookup: &MethodLookup, row: &AggregatedRow, direction: TraversalDirection) -> String {
    let label = method_label(lookup, row.method());
    let with_line = match direction {
        TraversalDirection::CallTree => true,
        TraversalDirection::HotMethods => !row.is_top_layer,
    };
    if with_line {
        format!("{label}:{}", row.line_no)
    } else {
        label
    }
}

/// `count` as a percentage of `denominator`, rounded to two decimals.
pub fn percentage(count: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let pct = (count as f64 * 100.0) / denominator as f64;
    (pct * 100.0).round() / 100.0
}

/// The fixed denominator shared by every row of one tree.
pub fn denominator(table: &FrameTable, direction: TraversalDirection) -> u64 {
    match direction {
        TraversalDirection::CallTree => table.total_on_stack(),
        TraversalDirection::HotMethods => table.total_on_cpu(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::aggregate::RowKey;

    fn row(method: usize, line_no: i32, is_top_layer: bool) -> AggregatedRow {
        AggregatedRow {
            key: RowKey {
                method,
                line_no: (!is_top_layer).then_some(line_no),
            },
            line_no,
            sample_count: 1,
            on_cpu: None,
            sources: vec![],
            next: vec![],
            is_top_layer,
        }
    }

    #[test]
    fn hot_method_top_rows_omit_line() {
        let lookup = MethodLookup::from_wire(&["root", "a.B.c (I)V"]);
        assert_eq!(
            display_name(&lookup, &row(1, 12, true), TraversalDirection::HotMethods),
            "a.B.c (I)V"
        );
        assert_eq!(
            display_name(&lookup, &row(1, 12, false), TraversalDirection::HotMethods),
            "a.B.c (I)V:12"
        );
        assert_eq!(
            display_name(&lookup, &row(1, 12, true), TraversalDirection::CallTree),
            "a.B.c (I)V:12"
        );
    }

    #[test]
    fn missing_lookup_renders_placeholder() {
        let lookup = MethodLookup::from_wire(&["root"]);
        assert_eq!(method_label(&lookup, 7), "<unknown method #7>");
        assert_eq!(
            display_name(&lookup, &row(7, 3, false), TraversalDirection::CallTree),
            "<unknown method #7>:3"
        );
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(5, 0), 0.0);
    }
}
