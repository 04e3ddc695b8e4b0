//! Rewrite the base document with resolved parameter declarations
//!
//! Existing declarations are replaced in place. New keys are inserted just
//! before the last closing `}` of the file, or appended at the end when the
//! file has none. Every other line is left untouched.

use crate::document::BaseDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Indentation applied to every written declaration
pub const DECLARATION_INDENT: &str = "    ";

/// Counts of what a merge did to the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Existing declarations replaced
    pub replaced: usize,
    /// New declarations inserted before the closing brace
    pub inserted: usize,
    /// New declarations appended because no closing brace was found
    pub appended: usize,
}

/// Output document plus what changed
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub lines: Vec<String>,
    pub stats: MergeStats,
}

impl MergedDocument {
    /// Full file text, ready to be written
    pub fn to_text(&self) -> String {
        self.lines.concat()
    }
}

/// Format a declaration as a full output line
fn format_declaration(declaration: &str) -> String {
    format!("{DECLARATION_INDENT}{declaration}\n")
}

/// Index of the line new declarations go in front of
///
/// Scans from the end of the file; the first line whose trimmed text starts
/// with `}` wins.
pub fn find_insertion_point(lines: &[String]) -> Option<usize> {
    lines
        .iter()
        .rposition(|line| line.trim_start().starts_with('}'))
}

/// Apply resolved declarations (key -> declaration text) to the base
///
/// Keys are visited in ascending order, which is also the order new keys
/// appear in the output.
pub fn merge(base: &BaseDocument, resolved: &BTreeMap<String, String>) -> MergedDocument {
    let mut lines = base.lines().to_vec();
    let index = base.key_index();
    let mut stats = MergeStats::default();
    let mut pending: Vec<String> = Vec::new();

    for (key, declaration) in resolved {
        match index.get(key) {
            Some(&line_idx) => {
                debug!(key = key.as_str(), line = line_idx + 1, "replacing declaration");
                lines[line_idx] = format_declaration(declaration);
                stats.replaced += 1;
            }
            None => pending.push(format_declaration(declaration)),
        }
    }

    if pending.is_empty() {
        return MergedDocument { lines, stats };
    }

    info!(count = pending.len(), "adding new parameters");
    match find_insertion_point(&lines) {
        Some(at) => {
            info!(line = at + 1, "inserting new parameters before closing brace");
            stats.inserted = pending.len();
            // reversed so the pending lines keep their order
            for line in pending.into_iter().rev() {
                lines.insert(at, line);
            }
        }
        None => {
            warn!("no closing brace found, appending new parameters to the end of the file");
            if let Some(last) = lines.last_mut() {
                if !last.ends_with('\n') {
                    last.push('\n');
                }
            }
            stats.appended = pending.len();
            lines.extend(pending);
        }
    }

    MergedDocument { lines, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> BaseDocument {
        BaseDocument::from_text(text)
    }

    fn resolved(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const BASE: &str = "sub Main()\n{\n\tParam(\"HP\", \"100\");\n\t// stamina\n\tParam(\"Stamina\", \"50\");\n}\n";

    #[test]
    fn test_empty_resolved_is_identity() {
        let base = doc(BASE);
        let merged = merge(&base, &BTreeMap::new());

        assert_eq!(merged.lines, base.lines());
        assert_eq!(merged.stats, MergeStats::default());
    }

    #[test]
    fn test_replace_existing_key() {
        let base = doc(BASE);
        let merged = merge(&base, &resolved(&[("HP", "Param(\"HP\", \"150\");")]));

        assert_eq!(merged.lines.len(), base.lines().len());
        assert_eq!(merged.lines[2], "    Param(\"HP\", \"150\");\n");
        for i in [0, 1, 3, 4, 5] {
            assert_eq!(merged.lines[i], base.lines()[i]);
        }
        assert_eq!(merged.stats.replaced, 1);
    }

    #[test]
    fn test_new_keys_inserted_before_final_brace_in_order() {
        let base = doc("{\n  Param(\"A\",0)\n}\n");
        let merged = merge(
            &base,
            &resolved(&[("X", "Param(\"X\",1)"), ("Y", "Param(\"Y\",2)")]),
        );

        assert_eq!(
            merged.lines,
            vec![
                "{\n",
                "  Param(\"A\",0)\n",
                "    Param(\"X\",1)\n",
                "    Param(\"Y\",2)\n",
                "}\n",
            ]
        );
        assert_eq!(merged.stats.inserted, 2);
    }

    #[test]
    fn test_last_brace_is_used() {
        let base = doc("a\n{\n}\nb\n{\n}\ntrailer\n");
        let merged = merge(&base, &resolved(&[("N", "Param(\"N\",1)")]));

        assert_eq!(merged.lines[5], "    Param(\"N\",1)\n");
        assert_eq!(merged.lines[6], "}\n");
        assert_eq!(merged.lines[7], "trailer\n");
    }

    #[test]
    fn test_brace_on_first_line_is_found() {
        let base = doc("}\n");
        let merged = merge(&base, &resolved(&[("N", "Param(\"N\",1)")]));

        assert_eq!(merged.lines, vec!["    Param(\"N\",1)\n", "}\n"]);
    }

    #[test]
    fn test_no_brace_appends() {
        let base = doc("Param(\"A\",0)");
        let merged = merge(&base, &resolved(&[("B", "Param(\"B\",1)")]));

        assert_eq!(merged.lines, vec!["Param(\"A\",0)\n", "    Param(\"B\",1)\n"]);
        assert_eq!(merged.stats.appended, 1);
        assert_eq!(merged.stats.inserted, 0);
    }

    #[test]
    fn test_no_brace_in_empty_document() {
        let base = doc("");
        let merged = merge(&base, &resolved(&[("B", "Param(\"B\",1)")]));
        assert_eq!(merged.to_text(), "    Param(\"B\",1)\n");
    }

    #[test]
    fn test_duplicate_base_key_replaces_last_occurrence() {
        let base = doc("Param(\"A\",1)\nParam(\"A\",2)\n}\n");
        let merged = merge(&base, &resolved(&[("A", "Param(\"A\",3)")]));

        assert_eq!(merged.lines[0], "Param(\"A\",1)\n");
        assert_eq!(merged.lines[1], "    Param(\"A\",3)\n");
    }

    #[test]
    fn test_hp_mana_scenario() {
        let base = doc("Param(\"HP\",100)\n}\n");
        let merged = merge(
            &base,
            &resolved(&[("HP", "Param(\"HP\",150)"), ("MANA", "Param(\"MANA\",50)")]),
        );

        assert_eq!(
            merged.to_text(),
            "    Param(\"HP\",150)\n    Param(\"MANA\",50)\n}\n"
        );
        assert_eq!(merged.stats.replaced, 1);
        assert_eq!(merged.stats.inserted, 1);
    }
}
