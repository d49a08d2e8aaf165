//! Text rendering of tree snapshots and merge summaries.

use crate::project::{SnapshotNode, TreeSnapshot};
use crate::tree::NodeKind;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Indented tree, folders suffixed with `/`, non-members dimmed.
pub fn format_tree_text(snapshot: &TreeSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", snapshot.root.caption.bold()));
    for child in &snapshot.root.children {
        render_node(child, 1, &mut out);
    }
    out
}

fn render_node(node: &SnapshotNode, depth: usize, out: &mut String) {
    let label = if node.kind == NodeKind::Folder {
        format!("{}/", node.caption)
    } else {
        node.caption.clone()
    };
    out.push_str(&"  ".repeat(depth));
    if node.member {
        out.push_str(&label);
    } else {
        out.push_str(&format!("{}", label.dimmed()));
    }
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Summary table printed after a scan.
pub struct ScanSummary {
    pub nodes: usize,
    pub displayed: usize,
    pub ticks: usize,
    pub show_all_files: bool,
}

pub fn format_scan_summary(summary: &ScanSummary) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Nodes".to_string(), summary.nodes.to_string()]);
    table.add_row(vec!["Displayed".to_string(), summary.displayed.to_string()]);
    table.add_row(vec!["Idle ticks".to_string(), summary.ticks.to_string()]);
    table.add_row(vec![
        "Show all files".to_string(),
        if summary.show_all_files { "yes" } else { "no" }.to_string(),
    ]);
    format!("{}\n{}\n", format_section_heading("Summary"), table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;
    use std::path::PathBuf;

    fn node(caption: &str, kind: NodeKind, member: bool, children: Vec<SnapshotNode>) -> SnapshotNode {
        SnapshotNode {
            id: ItemId::NIL,
            caption: caption.to_string(),
            path: PathBuf::from(caption),
            kind,
            member,
            children,
        }
    }

    #[test]
    fn tree_text_marks_folders() {
        let snapshot = TreeSnapshot {
            show_all_files: false,
            node_count: 3,
            root: node(
                "/p",
                NodeKind::Root,
                true,
                vec![node("src", NodeKind::Folder, true, vec![node("lib.rs", NodeKind::File, true, vec![])])],
            ),
        };
        let text = format_tree_text(&snapshot);
        assert!(text.contains("  src/\n"));
        assert!(text.contains("    lib.rs\n"));
    }

    #[test]
    fn summary_lists_counts() {
        let text = format_scan_summary(&ScanSummary {
            nodes: 12,
            displayed: 9,
            ticks: 4,
            show_all_files: true,
        });
        assert!(text.contains("12"));
        assert!(text.contains("Displayed"));
    }
}
