//! Diff computation between two commit snapshots.
//!
//! Line-level diffing uses Myers' algorithm from `similar`; results are structured for JSON
//! output and also carry a short rendered excerpt (unified format for
//! changed files, a `+ `/`- ` preview for added or removed ones) for
//! terminal display.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

use crate::commit::Commit;
use crate::config::DiffConfig;
use crate::error::MinigitResult;
use crate::snapshot::SnapshotStore;

/// What kind of diff operation on a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineOp {
    /// Line exists only in the "after" version.
    Add,
    /// Line exists only in the "before" version.
    Remove,
    /// Line is identical in both versions.
    Context,
}

/// A single line within a diff hunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub op: LineOp,
    pub content: String,
    /// 1-based line number in the old file (None for Add lines).
    pub old_lineno: Option<usize>,
    /// 1-based line number in the new file (None for Remove lines).
    pub new_lineno: Option<usize>,
    /// The line is the last of its file and has no trailing newline.
    #[serde(default)]
    pub missing_newline: bool,
}

/// A contiguous block of changes within a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Starting line in the old file (1-based).
    pub old_start: usize,
    pub old_count: usize,
    /// Starting line in the new file (1-based).
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// How a file differs between the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Only on the second side.
    Added,
    /// Only on the first side.
    Removed,
    /// On both sides with different bytes.
    Modified,
}

/// The diff result for a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub change_type: ChangeType,
    /// True if either side appears to be binary; no line output then.
    pub is_binary: bool,
    /// Lines added, counted over the whole file.
    pub additions: usize,
    /// Lines removed, counted over the whole file.
    pub deletions: usize,
    /// Rendered lines for display, already cut to the configured limit.
    pub excerpt: Vec<String>,
    /// Rendered lines left out of `excerpt`.
    pub omitted: usize,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }
}

/// The full diff between two snapshots, files in lexicographic path order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    /// What is being compared.
    pub description: String,
    /// Commit on the "before" side.
    pub from: String,
    /// Commit on the "after" side.
    pub to: String,
    pub files: Vec<FileDiff>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn count(&self, change_type: ChangeType) -> usize {
        self.files
            .iter()
            .filter(|f| f.change_type == change_type)
            .count()
    }

    pub fn total_additions(&self) -> usize {
        self.files.iter().map(|f| f.additions).sum()
    }

    pub fn total_deletions(&self) -> usize {
        self.files.iter().map(|f| f.deletions).sum()
    }
}

/// Returns true if the data appears to be binary (contains null byte in first 8KB).
pub fn is_binary(data: &[u8]) -> bool {
    let check_len = data.len().min(8192);
    data[..check_len].contains(&0)
}

/// Compare two commits' snapshots.
///
/// Every path in the union of both file lists is visited in lexicographic
/// order; paths whose bytes are identical on both sides are skipped.
pub fn compare_commits(
    store: &SnapshotStore,
    old: &Commit,
    new: &Commit,
    config: &DiffConfig,
) -> MinigitResult<Vec<FileDiff>> {
    let old_files: BTreeSet<&str> = old.files.iter().map(String::as_str).collect();
    let new_files: BTreeSet<&str> = new.files.iter().map(String::as_str).collect();

    let mut files = Vec::new();
    for path in old_files.union(&new_files) {
        let diff = match (old_files.contains(path), new_files.contains(path)) {
            (false, true) => {
                let content = store.read(&new.id, path)?;
                file_preview(path, ChangeType::Added, &content, config)
            }
            (true, false) => {
                let content = store.read(&old.id, path)?;
                file_preview(path, ChangeType::Removed, &content, config)
            }
            _ => {
                let old_content = store.read(&old.id, path)?;
                let new_content = store.read(&new.id, path)?;
                if old_content == new_content {
                    continue;
                }
                file_change(path, &old_content, &new_content, config)
            }
        };
        files.push(diff);
    }

    Ok(files)
}

/// Diff entry for a file present on only one side: a short preview of its
/// first lines plus the number of lines not shown.
fn file_preview(path: &str, change_type: ChangeType, content: &[u8], config: &DiffConfig) -> FileDiff {
    if is_binary(content) {
        return binary_diff(path, change_type);
    }

    let text = String::from_utf8_lossy(content);
    let lines: Vec<&str> = text.lines().collect();
    let (marker, hunks) = match change_type {
        ChangeType::Removed => ("- ", compute_line_diff(&text, "", config.context_lines)),
        _ => ("+ ", compute_line_diff("", &text, config.context_lines)),
    };
    let excerpt = lines
        .iter()
        .take(config.preview_lines)
        .map(|l| format!("{marker}{l}"))
        .collect();
    let (additions, deletions) = match change_type {
        ChangeType::Removed => (0, lines.len()),
        _ => (lines.len(), 0),
    };

    FileDiff {
        path: path.to_string(),
        change_type,
        is_binary: false,
        additions,
        deletions,
        excerpt,
        omitted: lines.len().saturating_sub(config.preview_lines),
        hunks,
    }
}

/// Diff entry for a file present on both sides with different bytes.
fn file_change(path: &str, old: &[u8], new: &[u8], config: &DiffConfig) -> FileDiff {
    if is_binary(old) || is_binary(new) {
        return binary_diff(path, ChangeType::Modified);
    }

    let old_str = String::from_utf8_lossy(old);
    let new_str = String::from_utf8_lossy(new);
    let hunks = compute_line_diff(&old_str, &new_str, config.context_lines);

    let mut additions = 0;
    let mut deletions = 0;
    for line in hunks.iter().flat_map(|h| &h.lines) {
        match line.op {
            LineOp::Add => additions += 1,
            LineOp::Remove => deletions += 1,
            LineOp::Context => {}
        }
    }

    let mut rendered = render_unified(path, &hunks);
    let omitted = rendered.len().saturating_sub(config.max_lines);
    rendered.truncate(config.max_lines);

    FileDiff {
        path: path.to_string(),
        change_type: ChangeType::Modified,
        is_binary: false,
        additions,
        deletions,
        excerpt: rendered,
        omitted,
        hunks,
    }
}

fn binary_diff(path: &str, change_type: ChangeType) -> FileDiff {
    FileDiff {
        path: path.to_string(),
        change_type,
        is_binary: true,
        additions: 0,
        deletions: 0,
        excerpt: Vec::new(),
        omitted: 0,
        hunks: Vec::new(),
    }
}

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Render hunks in unified diff format, `---`/`+++` headers included.
pub fn render_unified(path: &str, hunks: &[DiffHunk]) -> Vec<String> {
    if hunks.is_empty() {
        return Vec::new();
    }
    let mut out = vec![format!("--- a/{path}"), format!("+++ b/{path}")];
    for hunk in hunks {
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(hunk.old_start, hunk.old_count),
            format_range(hunk.new_start, hunk.new_count)
        ));
        for line in &hunk.lines {
            let sign = match line.op {
                LineOp::Add => '+',
                LineOp::Remove => '-',
                LineOp::Context => ' ',
            };
            out.push(format!("{sign}{}", line.content));
            if line.missing_newline {
                out.push(NO_NEWLINE_MARKER.to_string());
            }
        }
    }
    out
}

/// Unified-format line range: `start` alone for one line, `start-1,0` for
/// an empty range.
fn format_range(start: usize, count: usize) -> String {
    match count {
        0 => format!("{},0", start.saturating_sub(1)),
        1 => format!("{start}"),
        _ => format!("{start},{count}"),
    }
}

/// Past this the line diff settles for a valid but non-minimal result.
const DIFF_TIMEOUT: Duration = Duration::from_secs(2);

/// One classified line: op, content without its terminator, 1-based old
/// and new line numbers, and whether the line lacked a trailing newline.
type Tagged = (LineOp, String, Option<usize>, Option<usize>, bool);

/// Compute diff hunks between two strings (treated as line sequences).
///
/// Lines are compared with their terminators, so a missing final newline or
/// a CRLF/LF switch is a change. `context_lines` controls how many unchanged
/// lines surround each hunk.
pub fn compute_line_diff(old: &str, new: &str, context_lines: usize) -> Vec<DiffHunk> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_lines(old, new);

    let tagged: Vec<Tagged> = diff
        .iter_all_changes()
        .map(|change| {
            let op = match change.tag() {
                ChangeTag::Equal => LineOp::Context,
                ChangeTag::Delete => LineOp::Remove,
                ChangeTag::Insert => LineOp::Add,
            };
            let value = change.value();
            let content = value
                .strip_suffix('\n')
                .map(|v| v.strip_suffix('\r').unwrap_or(v))
                .unwrap_or(value);
            (
                op,
                content.to_string(),
                change.old_index().map(|i| i + 1),
                change.new_index().map(|i| i + 1),
                change.missing_newline(),
            )
        })
        .collect();

    group_into_hunks(&tagged, context_lines)
}

/// Group tagged diff lines into hunks, including context lines around changes.
fn group_into_hunks(tagged: &[Tagged], context_lines: usize) -> Vec<DiffHunk> {
    let change_indices: Vec<usize> = tagged
        .iter()
        .enumerate()
        .filter(|(_, (op, ..))| *op != LineOp::Context)
        .map(|(i, _)| i)
        .collect();

    // Each change gets context_lines before and after; overlapping ranges merge.
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &ci in &change_indices {
        let start = ci.saturating_sub(context_lines);
        let end = (ci + context_lines + 1).min(tagged.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }

    ranges
        .into_iter()
        .map(|(start, end)| hunk_from(&tagged[start..end], tagged, start))
        .collect()
}

/// Build one hunk. Start lines for a side with no lines in the hunk are
/// taken from the nearest preceding line of that side, as unified diff does.
fn hunk_from(slice: &[Tagged], all: &[Tagged], offset: usize) -> DiffHunk {
    let mut old_count = 0usize;
    let mut new_count = 0usize;
    let mut lines = Vec::with_capacity(slice.len());

    for (op, content, old_ln, new_ln, missing_newline) in slice {
        match op {
            LineOp::Context => {
                old_count += 1;
                new_count += 1;
            }
            LineOp::Remove => old_count += 1,
            LineOp::Add => new_count += 1,
        }
        lines.push(DiffLine {
            op: *op,
            content: content.clone(),
            old_lineno: *old_ln,
            new_lineno: *new_ln,
            missing_newline: *missing_newline,
        });
    }

    let first_old = slice.iter().find_map(|t| t.2);
    let first_new = slice.iter().find_map(|t| t.3);
    let prior_old = all[..offset].iter().rev().find_map(|t| t.2).unwrap_or(0);
    let prior_new = all[..offset].iter().rev().find_map(|t| t.3).unwrap_or(0);

    DiffHunk {
        old_start: first_old.unwrap_or(prior_old + 1),
        old_count,
        new_start: first_new.unwrap_or(prior_new + 1),
        new_count,
        lines,
    }
}
