//! Unified line diff between two snapshots.
//!
//! Output is diagnostic only; pass/fail never depends on it.

use std::fmt;

use similar::{ChangeTag, TextDiff};

use crate::core::snapshot::Snapshot;

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Rendered diff between two snapshots. Empty when they are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    text: String,
    inserted: usize,
    deleted: usize,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of `+` lines.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Number of `-` lines.
    pub fn deleted(&self) -> usize {
        self.deleted
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render a unified diff from `a` to `b` (`-a +b`).
pub fn render(a: &Snapshot, b: &Snapshot) -> DiffReport {
    if a == b {
        return DiffReport::default();
    }

    let diff = TextDiff::from_lines(a.as_str(), b.as_str());
    let mut unified = diff.unified_diff();
    unified.context_radius(CONTEXT_LINES);

    let mut report = DiffReport::default();
    for hunk in unified.iter_hunks() {
        report.text.push_str(&hunk.header().to_string());
        report.text.push('\n');
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => {
                    report.deleted += 1;
                    '-'
                }
                ChangeTag::Insert => {
                    report.inserted += 1;
                    '+'
                }
                ChangeTag::Equal => ' ',
            };
            report.text.push(sign);
            report.text.push_str(change.value());
            if change.missing_newline() {
                report.text.push('\n');
                report.text.push_str("\\ No newline at end of file\n");
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed_lines(report: &DiffReport, sign: char) -> Vec<&str> {
        report
            .as_str()
            .lines()
            .filter(|line| !line.starts_with("@@"))
            .filter_map(|line| line.strip_prefix(sign))
            .collect()
    }

    #[test]
    fn identical_snapshots_render_empty() {
        let a = Snapshot::from("x=1\n");
        let report = render(&a, &a.clone());
        assert!(report.is_empty());
        assert_eq!(report.inserted(), 0);
        assert_eq!(report.deleted(), 0);
    }

    #[test]
    fn swapped_lines_show_reordering() {
        let report = render(&Snapshot::from("b\na\n"), &Snapshot::from("a\nb\n"));
        assert!(!report.is_empty());
        assert!(report.as_str().starts_with("@@"));
        assert_eq!(report.inserted(), 1);
        assert_eq!(report.deleted(), 1);

        let removed = changed_lines(&report, '-');
        let added = changed_lines(&report, '+');
        assert_eq!(removed, added, "a swap removes and re-adds the same line");
        assert!(removed == ["a"] || removed == ["b"], "{report}");
    }

    #[test]
    fn appended_line_is_an_insertion_with_context() {
        let report = render(
            &Snapshot::from("one\ntwo\n"),
            &Snapshot::from("one\ntwo\nthree\n"),
        );
        assert_eq!(report.deleted(), 0);
        assert_eq!(changed_lines(&report, '+'), vec!["three"]);
        assert!(report.as_str().contains(" two\n"));
    }

    #[test]
    fn missing_trailing_newline_is_marked() {
        let report = render(&Snapshot::from("x=1\n"), &Snapshot::from("x=1"));
        assert!(!report.is_empty());
        assert!(report.as_str().contains("\\ No newline at end of file"));
    }

    #[test]
    fn distant_changes_produce_separate_hunks() {
        let before: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let after = before
            .replace("line 1\n", "line one\n")
            .replace("line 18\n", "line eighteen\n");
        let report = render(&Snapshot::from(before), &Snapshot::from(after));
        let hunks = report
            .as_str()
            .lines()
            .filter(|line| line.starts_with("@@"))
            .count();
        assert_eq!(hunks, 2);
    }
}
