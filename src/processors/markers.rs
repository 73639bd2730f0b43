//! Template markers.
//!
//! A marker is any line containing `@prefab:<slot>`, whatever comment syntax
//! surrounds it (`// @prefab:imports`, `# @prefab:imports`, ...). Processors
//! insert their fragments directly above the marker so that later processors
//! in the chain can keep appending to the same slot.

use regex::Regex;
use std::sync::OnceLock;

pub const IMPORTS: &str = "imports";
pub const ACCESSORS: &str = "accessors";
pub const PROPERTIES: &str = "properties";
pub const ROUTE: &str = "route";
pub const UPDATE_IDENTITY: &str = "update-identity";

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@prefab:([A-Za-z0-9_-]+)").expect("marker pattern is valid"))
}

struct MarkerLine<'a> {
    start: usize,
    indent: &'a str,
}

fn line_has_slot(line: &str, slot: &str) -> bool {
    marker_pattern()
        .captures_iter(line)
        .any(|captures| &captures[1] == slot)
}

fn find_marker<'a>(text: &'a str, slot: &str) -> Option<MarkerLine<'a>> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line_has_slot(line, slot) {
            let indent_len = line.len() - line.trim_start_matches(|c: char| c == ' ' || c == '\t').len();
            return Some(MarkerLine {
                start: offset,
                indent: &line[..indent_len],
            });
        }
        offset += line.len();
    }
    None
}

pub fn has_marker(text: &str, slot: &str) -> bool {
    find_marker(text, slot).is_some()
}

/// Insert `lines` above the first `slot` marker, indented like the marker.
///
/// Returns `None` when the template has no such marker.
pub fn insert_at_marker(text: &str, slot: &str, lines: &[String]) -> Option<String> {
    let marker = find_marker(text, slot)?;

    let mut fragment = String::new();
    for line in lines.iter().flat_map(|l| l.split('\n')) {
        if !line.is_empty() {
            fragment.push_str(marker.indent);
            fragment.push_str(line);
        }
        fragment.push('\n');
    }

    let mut result = String::with_capacity(text.len() + fragment.len());
    result.push_str(&text[..marker.start]);
    result.push_str(&fragment);
    result.push_str(&text[marker.start..]);
    Some(result)
}

/// Whether some line of `text` already reads `line` (ignoring surrounding whitespace)
pub fn contains_line(text: &str, line: &str) -> bool {
    let wanted = line.trim();
    text.lines().any(|existing| existing.trim() == wanted)
}

/// Remove every marker line
pub fn strip_markers(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !marker_pattern().is_match(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "class Handler\n{\n    // @prefab:imports\n}\n";

    #[test]
    fn test_insert_uses_marker_indent() {
        let result = insert_at_marker(TEMPLATE, IMPORTS, &["use A;".to_string()]).unwrap();
        assert_eq!(result, "class Handler\n{\n    use A;\n    // @prefab:imports\n}\n");
    }

    #[test]
    fn test_repeated_inserts_keep_order() {
        let first = insert_at_marker(TEMPLATE, IMPORTS, &["use A;".to_string()]).unwrap();
        let second = insert_at_marker(&first, IMPORTS, &["use B;".to_string()]).unwrap();
        assert!(second.find("use A;").unwrap() < second.find("use B;").unwrap());
    }

    #[test]
    fn test_multiline_fragment_keeps_blank_lines_unindented() {
        let result = insert_at_marker(TEMPLATE, IMPORTS, &["a\n\nb".to_string()]).unwrap();
        assert!(result.contains("    a\n\n    b\n"));
    }

    #[test]
    fn test_slot_names_match_exactly() {
        let text = "# @prefab:update-identity\n";
        assert!(has_marker(text, UPDATE_IDENTITY));
        assert!(!has_marker(text, "update"));
        assert!(insert_at_marker(text, IMPORTS, &[]).is_none());
    }

    #[test]
    fn test_strip_markers() {
        let text = "a\n  // @prefab:imports\nb\n# @prefab:route";
        assert_eq!(strip_markers(text), "a\nb\n");
    }

    #[test]
    fn test_contains_line_ignores_indent() {
        assert!(contains_line("    use A;\n", "use A;"));
        assert!(!contains_line("use AB;\n", "use A;"));
    }
}
