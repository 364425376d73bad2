use crate::locate::{BracketKind, ContainerSpan};

/// Entries and synthesized containers are laid out one indent step deeper
/// than the line that closes their parent, matching the document's four
/// space convention.
const INDENT_STEP: &str = "    ";

/// Leading whitespace of the line containing byte `at`. Used to derive
/// indentation for inserted text from the surrounding document instead of
/// assuming an absolute nesting depth.
fn line_indent(doc: &str, at: usize) -> &str {
    let line_start = doc[..at].rfind('\n').map_or(0, |nl| nl + 1);
    let line = &doc[line_start..at];
    let indent_len = line.len() - line.trim_start().len();
    &line[..indent_len]
}

/// Offset of the closing token of the last top-level entry strictly inside
/// the container, or `None` when the container holds no entries. Entries are
/// object or array literals, so the closing token is the bracket that
/// returns the interior to depth zero.
fn last_entry_close(doc: &str, span: &ContainerSpan) -> Option<usize> {
    let interior = span.interior(doc);
    let mut depth = 0i64;
    let mut last = None;

    for (idx, c) in interior.char_indices() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    last = Some(span.open + 1 + idx);
                }
            }
            _ => {}
        }
    }

    last
}

/// Render one entry at the given indentation, with every interior line
/// shifted to match and a trailing record separator.
fn render_entry(entry: &str, indent: &str) -> String {
    let mut out = String::new();
    for (i, line) in entry.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str(line);
    }
    out.push(',');
    out
}

/// Splice projected entries into an existing container, touching nothing
/// outside the insertion point.
///
/// An empty container receives the entries directly after its opening
/// bracket, each on its own line and each followed by the record separator.
/// A populated container receives them immediately after the closing token
/// of its last entry; when that token already carries a trailing comma the
/// insertion goes after the comma instead of doubling it. The result always
/// contains the input document as a subsequence, so bracket balance is
/// preserved.
pub fn splice_entries(doc: &str, span: &ContainerSpan, entries: &[String]) -> String {
    let close_indent = line_indent(doc, span.close).to_string();
    let entry_indent = format!("{}{}", close_indent, INDENT_STEP);

    let rendered: Vec<String> = entries
        .iter()
        .map(|e| render_entry(e, &entry_indent))
        .collect();

    match last_entry_close(doc, span) {
        None => {
            // Empty container: rebuild the interior as one entry per line,
            // leaving the closing bracket on its own properly indented line.
            let mut insert = String::from("\n");
            insert.push_str(&rendered.join("\n"));
            insert.push('\n');
            insert.push_str(&close_indent);

            let mut out = String::with_capacity(doc.len() + insert.len());
            out.push_str(&doc[..span.open + 1]);
            out.push_str(&insert);
            out.push_str(&doc[span.close..]);
            out
        }
        Some(entry_close) => {
            // Reuse the existing trailing comma when there is one.
            let after = &doc[entry_close + 1..span.close];
            let comma_rel = after
                .char_indices()
                .take_while(|(_, c)| c.is_whitespace() || *c == ',')
                .find(|(_, c)| *c == ',')
                .map(|(idx, _)| idx);

            let (insert_at, lead) = match comma_rel {
                Some(rel) => (entry_close + 1 + rel + 1, String::new()),
                None => (entry_close + 1, String::from(",")),
            };

            let mut insert = lead;
            insert.push('\n');
            insert.push_str(&rendered.join("\n"));

            let mut out = String::with_capacity(doc.len() + insert.len());
            out.push_str(&doc[..insert_at]);
            out.push_str(&insert);
            out.push_str(&doc[insert_at..]);
            out
        }
    }
}

/// Synthesize a brand-new nested container holding the given entries and
/// insert it directly before the anchor's closing bracket. A separator is
/// added after the anchor's current last entry when it lacks one.
pub fn create_container(
    doc: &str,
    anchor: &ContainerSpan,
    key: &str,
    kind: BracketKind,
    entries: &[String],
) -> String {
    let anchor_indent = line_indent(doc, anchor.close).to_string();
    let key_indent = format!("{}{}", anchor_indent, INDENT_STEP);
    let entry_indent = format!("{}{}", key_indent, INDENT_STEP);

    let rendered: Vec<String> = entries
        .iter()
        .map(|e| render_entry(e, &entry_indent))
        .collect();

    let mut block = format!("{}{}: {}\n", key_indent, key, kind.open_char());
    block.push_str(&rendered.join("\n"));
    block.push('\n');
    block.push_str(&key_indent);
    block.push(kind.close_char());
    block.push(',');
    block.push('\n');

    // If the anchor already has content, make sure the preceding sibling
    // ends with a separator before the new block goes in.
    let interior = anchor.interior(doc);
    let trimmed = interior.trim_end();
    let needs_comma = !trimmed.is_empty() && !trimmed.ends_with(',');

    let insert_at = anchor.open + 1 + trimmed.len();

    let mut insert = String::new();
    if needs_comma {
        insert.push(',');
    }
    insert.push('\n');
    insert.push_str(&block);
    insert.push_str(&anchor_indent);

    // The whitespace between the last entry and the closing bracket is
    // replaced by the indentation appended above.
    let mut out = String::with_capacity(doc.len() + insert.len());
    out.push_str(&doc[..insert_at]);
    out.push_str(&insert);
    out.push_str(&doc[anchor.close..]);
    out
}

/// Count of open minus close brackets, both kinds pooled. The splices are
/// purely additive with balanced insertions, so this is invariant across
/// them.
pub fn bracket_balance(doc: &str) -> i64 {
    let mut balance = 0i64;
    for c in doc.chars() {
        match c {
            '{' | '[' => balance += 1,
            '}' | ']' => balance -= 1,
            _ => {}
        }
    }
    balance
}
