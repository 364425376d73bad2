use std::fs;
use std::path::{Path, PathBuf};

use crate::{backup_file, Result};

/// Column separator used by every game data table. The tables deliberately
/// avoid commas so that free-text columns (descriptions, consequence lines)
/// never need quoting.
pub const FIELD_SEPARATOR: char = '|';

/// Flat-file table access rooted at a single data directory. All tables are
/// UTF-8, one header row, one record per line.
pub struct TableStore {
    dir: PathBuf,
}

impl TableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Trimmed content of a table, or an empty string when the file does not
    /// exist. Absence is reported but not fatal; the prompt builders degrade
    /// to generating without reference data.
    pub fn read(&self, name: &str) -> String {
        let path = self.path(name);
        match fs::read_to_string(&path) {
            Ok(content) => content.trim().to_string(),
            Err(_) => {
                log::warn!("table file not found: {}", path.display());
                String::new()
            }
        }
    }

    /// Append validated records to a table, one per line. The original file
    /// is copied to its `.bak` sibling first (overwriting any previous
    /// backup), and the rewrite preserves a single trailing newline no
    /// matter how the file previously ended. Existing rows are never
    /// reordered or deduplicated.
    pub fn append(&self, name: &str, records: &[String]) -> Result<()> {
        let path = self.path(name);
        backup_file(&path)?;

        let existing = fs::read_to_string(&path)?;
        let mut content = existing.trim_end().to_string();
        for record in records {
            content.push('\n');
            content.push_str(record);
        }
        content.push('\n');
        fs::write(&path, content)?;

        log::info!("{}: appended {} records", name, records.len());
        Ok(())
    }
}

/// First line of a table, or an empty string for empty content.
pub fn header(table: &str) -> &str {
    table.lines().next().unwrap_or("")
}

pub fn column_count(header: &str) -> usize {
    header.split(FIELD_SEPARATOR).count()
}

/// Filter candidate lines down to well-formed records.
///
/// A line is accepted iff, after trimming, it is non-empty, differs from the
/// header line, and splits into exactly `expected_cols` fields. Header
/// duplicates (models like to repeat the header they were shown) are dropped
/// silently; column-count mismatches are dropped with a diagnostic carrying
/// a truncated preview. Accepted lines keep their original order. This is a
/// hard filter: a malformed row is never repaired or partially accepted.
pub fn validate_rows<'a, I>(lines: I, expected_cols: usize, header: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let header_line = header.trim();
    let mut valid = Vec::new();

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line == header_line {
            continue;
        }

        let cols = line.split(FIELD_SEPARATOR).count();
        if cols == expected_cols {
            valid.push(line.to_string());
        } else {
            log::warn!(
                "dropping row with {} columns (expected {}): {}",
                cols,
                expected_cols,
                preview(line, 80),
            );
        }
    }

    valid
}

/// Char-boundary-safe truncation for diagnostics.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::{column_count, header, preview, validate_rows, TableStore};
    use std::fs;

    const HEADER: &str = "id|value";

    #[test]
    fn accepts_rows_matching_expected_columns() {
        let rows = validate_rows(["w_2|20", "w_3|30"], 2, HEADER);
        assert_eq!(rows, vec!["w_2|20", "w_3|30"]);
    }

    #[test]
    fn rejects_column_count_mismatch() {
        let rows = validate_rows(["w_2|20|extra", "w_3"], 2, HEADER);
        assert!(rows.is_empty());
    }

    #[test]
    fn drops_header_duplicates_and_blanks() {
        let rows = validate_rows(["", "  ", "id|value", "w_2|20"], 2, HEADER);
        assert_eq!(rows, vec!["w_2|20"]);
    }

    #[test]
    fn accept_iff_count_matches_and_not_header() {
        // A row shaped exactly like the header is dropped even though its
        // column count matches.
        let candidates = ["id|value", "w_2|20", "w_2|20|extra"];
        let rows = validate_rows(candidates, 2, HEADER);
        assert_eq!(rows, vec!["w_2|20"]);
    }

    #[test]
    fn preserves_input_order() {
        let rows = validate_rows(["b|2", "a|1", "c|3"], 2, HEADER);
        assert_eq!(rows, vec!["b|2", "a|1", "c|3"]);
    }

    #[test]
    fn header_of_empty_table_is_empty() {
        assert_eq!(header(""), "");
        assert_eq!(column_count("id|value|weight"), 3);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let long = "x".repeat(100);
        assert_eq!(preview(&long, 80).chars().count(), 83);
        assert_eq!(preview("short", 80), "short");
    }

    #[test]
    fn append_backs_up_then_extends() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let path = store.path("weapons.csv");
        fs::write(&path, "id|value\nw_1|10\n").unwrap();

        store
            .append("weapons.csv", &["w_2|20".to_string()])
            .unwrap();

        let bak = fs::read_to_string(crate::backup_path(&path)).unwrap();
        assert_eq!(bak, "id|value\nw_1|10\n");
        let new = fs::read_to_string(&path).unwrap();
        assert_eq!(new, "id|value\nw_1|10\nw_2|20\n");
    }

    #[test]
    fn append_does_not_stack_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        fs::write(store.path("events.csv"), "id|title\n\n\n").unwrap();

        store.append("events.csv", &["e5|Ambush".to_string()]).unwrap();

        let new = fs::read_to_string(store.path("events.csv")).unwrap();
        assert_eq!(new, "id|title\ne5|Ambush\n");
    }
}
