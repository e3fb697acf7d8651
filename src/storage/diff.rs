//! Fixed-position line diff.
//!
//! Line `i` of the committed version is compared against line `i` of the
//! working version; there is no edit-distance matching. An insertion or
//! deletion that shifts later lines therefore reports every shifted line as
//! changed. This is the intended behavior, not a shortcut to fix.

/// One annotated output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Identical in both versions.
    Context(String),
    /// Present at this position only in the committed version.
    Removed(String),
    /// Present at this position only in the working version.
    Added(String),
}

/// Compare two texts position by position.
///
/// Equal lines come out unmarked; a differing position emits the committed
/// line as removed followed by the working line as added; trailing lines of
/// the longer text come out as pure additions or removals.
pub fn positional_diff(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let max_lines = old_lines.len().max(new_lines.len());

    let mut diff = Vec::new();
    for i in 0..max_lines {
        let old_line = old_lines.get(i);
        let new_line = new_lines.get(i);

        match (old_line, new_line) {
            (Some(o), Some(n)) if o == n => diff.push(DiffLine::Context((*o).to_string())),
            _ => {
                if let Some(o) = old_line {
                    diff.push(DiffLine::Removed((*o).to_string()));
                }
                if let Some(n) = new_line {
                    diff.push(DiffLine::Added((*n).to_string()));
                }
            }
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_are_all_context() {
        let diff = positional_diff("a\nb\n", "a\nb\n");
        assert_eq!(
            diff,
            vec![
                DiffLine::Context("a".to_string()),
                DiffLine::Context("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_changed_line_emits_removed_then_added() {
        let diff = positional_diff("hello", "world");
        assert_eq!(
            diff,
            vec![
                DiffLine::Removed("hello".to_string()),
                DiffLine::Added("world".to_string()),
            ]
        );
    }

    #[test]
    fn test_trailing_additions() {
        let diff = positional_diff("a\n", "a\nb\nc\n");
        assert_eq!(
            diff,
            vec![
                DiffLine::Context("a".to_string()),
                DiffLine::Added("b".to_string()),
                DiffLine::Added("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_trailing_removals() {
        let diff = positional_diff("a\nb\n", "a\n");
        assert_eq!(
            diff,
            vec![
                DiffLine::Context("a".to_string()),
                DiffLine::Removed("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_shifted_lines_report_positionally() {
        // An insertion at the top shifts everything; positional comparison
        // flags every following line rather than matching it up.
        let diff = positional_diff("a\nb\n", "new\na\nb\n");
        assert_eq!(
            diff,
            vec![
                DiffLine::Removed("a".to_string()),
                DiffLine::Added("new".to_string()),
                DiffLine::Removed("b".to_string()),
                DiffLine::Added("a".to_string()),
                DiffLine::Added("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_texts() {
        assert!(positional_diff("", "").is_empty());
    }
}
