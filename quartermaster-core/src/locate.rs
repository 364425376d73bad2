use thiserror::Error;

/// Errors raised while resolving a named container inside the document.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("key '{key}' not found in the searched range")]
    KeyNotFound { key: String },

    #[error("no opening bracket follows the definition of '{key}'")]
    MissingBracket { key: String },

    #[error("container '{key}' opened at byte {open} never returns to depth zero")]
    Unbalanced { key: String, open: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Brace,
    Square,
}

impl BracketKind {
    pub fn open_char(self) -> char {
        match self {
            BracketKind::Brace => '{',
            BracketKind::Square => '[',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            BracketKind::Brace => '}',
            BracketKind::Square => ']',
        }
    }

    fn from_open(c: char) -> Option<Self> {
        match c {
            '{' => Some(BracketKind::Brace),
            '[' => Some(BracketKind::Square),
            _ => None,
        }
    }
}

/// Byte range of one bracket-delimited container. `open` and `close` index
/// the bracket characters themselves, so the interior is `open + 1 .. close`
/// and the container as a whole is `open ..= close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSpan {
    pub open: usize,
    pub close: usize,
    pub kind: BracketKind,
}

impl ContainerSpan {
    pub fn interior<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.open + 1..self.close]
    }
}

/// Outcome of resolving a nested container under an anchor.
#[derive(Debug)]
pub enum NestedContainer {
    /// The nested container exists; splice into it.
    Existing(ContainerSpan),
    /// The anchor exists but the nested key does not. The caller creates the
    /// container immediately before the anchor's closing bracket.
    Absent { anchor: ContainerSpan },
}

/// Find the opening bracket that defines `key` within `doc[from..]`.
///
/// The defining token is the key as a standalone identifier followed
/// (ignoring whitespace) by `:` or `=`, and the container's opening bracket
/// is the first `{` or `[` after that whose preceding non-whitespace
/// character is `:` or `=`. Skipping brackets not introduced by `:`/`=`
/// keeps a TypeScript annotation such as `Record<string, string[]>` from
/// being mistaken for the container itself. The search gives up at the first
/// `;`, which ends the statement the key belongs to.
///
/// The scan is purely lexical: bracket characters inside string literals are
/// counted like any others, so document content must keep its string
/// payloads bracket-balanced.
fn find_defining_bracket(doc: &str, key: &str, from: usize) -> Result<usize, LocateError> {
    let hay = &doc[from..];

    let mut search = 0usize;
    while let Some(rel) = hay[search..].find(key) {
        let key_start = search + rel;
        let key_end = key_start + key.len();

        // Both sides of the match must be identifier boundaries, otherwise
        // 'HUNT' would match inside 'HUNTER'.
        let prev_ok = hay[..key_start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric() && c != '_');
        let next_char = hay[key_end..].chars().next();
        let next_ok = next_char.map_or(true, |c| !c.is_alphanumeric() && c != '_');

        if !(prev_ok && next_ok) {
            search = key_end;
            continue;
        }

        // The key must introduce a value.
        let after_key = hay[key_end..].trim_start();
        if !(after_key.starts_with(':') || after_key.starts_with('=')) {
            search = key_end;
            continue;
        }

        // Walk forward to the first opening bracket introduced by ':' or '='.
        let mut prev_non_ws: Option<char> = None;
        for (idx, c) in hay[key_end..].char_indices() {
            if c == ';' {
                break;
            }
            if (c == '{' || c == '[') && matches!(prev_non_ws, Some(':') | Some('=')) {
                return Ok(from + key_end + idx);
            }
            if !c.is_whitespace() {
                prev_non_ws = Some(c);
            }
        }

        return Err(LocateError::MissingBracket {
            key: key.to_string(),
        });
    }

    Err(LocateError::KeyNotFound {
        key: key.to_string(),
    })
}

/// Scan forward from an opening bracket, counting brackets of the same kind,
/// and return the index of the close bracket where depth returns to zero.
/// Returns `None` when the document ends first.
pub fn balanced_end(doc: &str, open: usize) -> Option<usize> {
    let kind = BracketKind::from_open(doc[open..].chars().next()?)?;
    let mut depth = 0i64;

    for (idx, c) in doc[open..].char_indices() {
        if c == kind.open_char() {
            depth += 1;
        } else if c == kind.close_char() {
            depth -= 1;
            if depth == 0 {
                return Some(open + idx);
            }
        }
    }

    None
}

/// Resolve the container bound to `key`, searching at or after `from`.
pub fn find_container(doc: &str, key: &str, from: usize) -> Result<ContainerSpan, LocateError> {
    let open = find_defining_bracket(doc, key, from)?;
    let kind = BracketKind::from_open(doc[open..].chars().next().unwrap_or(' '))
        .ok_or_else(|| LocateError::MissingBracket {
            key: key.to_string(),
        })?;
    let close = balanced_end(doc, open).ok_or_else(|| LocateError::Unbalanced {
        key: key.to_string(),
        open,
    })?;
    Ok(ContainerSpan { open, close, kind })
}

/// Resolve `key` nested inside the container bound to `anchor`.
///
/// The anchor being absent is a hard failure for the merge. The nested key
/// being absent under a present anchor is not: the caller is expected to
/// synthesize a fresh container, so the anchor's span is returned instead.
pub fn resolve_nested(doc: &str, anchor: &str, key: &str) -> Result<NestedContainer, LocateError> {
    let anchor_span = find_container(doc, anchor, 0)?;

    // Only search the anchor's own interior; an identical key under a
    // different anchor must not be picked up.
    let interior_start = anchor_span.open + 1;
    let interior = &doc[interior_start..anchor_span.close];

    match find_defining_bracket(interior, key, 0) {
        Ok(rel_open) => {
            let open = interior_start + rel_open;
            let kind = BracketKind::from_open(doc[open..].chars().next().unwrap_or(' '))
                .ok_or_else(|| LocateError::MissingBracket {
                    key: key.to_string(),
                })?;
            let close = balanced_end(doc, open).ok_or_else(|| LocateError::Unbalanced {
                key: key.to_string(),
                open,
            })?;
            if close >= anchor_span.close {
                return Err(LocateError::Unbalanced {
                    key: key.to_string(),
                    open,
                });
            }
            Ok(NestedContainer::Existing(ContainerSpan { open, close, kind }))
        }
        Err(LocateError::KeyNotFound { .. }) => Ok(NestedContainer::Absent {
            anchor: anchor_span,
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        balanced_end, find_container, resolve_nested, BracketKind, LocateError, NestedContainer,
    };

    const DOC: &str = r#"export const REGION_QUESTS = {
    CENTRAL_PLAINS: {
        HUNT: [
            { title: () => 'A' },
        ],
        ESCORT: [],
    },
    NORTH_MARCHES: {
        HUNT: [],
    },
};

const STORIES: Record<string, string[]> = {
    'FARMER': ["lost the harvest"],
};
"#;

    #[test]
    fn finds_nested_array_under_anchor() {
        let span = match resolve_nested(DOC, "CENTRAL_PLAINS", "HUNT").unwrap() {
            NestedContainer::Existing(span) => span,
            other => panic!("expected existing container, got {:?}", other),
        };
        assert_eq!(span.kind, BracketKind::Square);
        assert_eq!(&DOC[span.open..=span.open], "[");
        assert_eq!(&DOC[span.close..=span.close], "]");
        assert!(span.interior(DOC).contains("title"));
    }

    #[test]
    fn does_not_leak_into_sibling_anchor() {
        // NORTH_MARCHES has its own empty HUNT; resolving under it must not
        // return CENTRAL_PLAINS' populated one.
        let span = match resolve_nested(DOC, "NORTH_MARCHES", "HUNT").unwrap() {
            NestedContainer::Existing(span) => span,
            other => panic!("expected existing container, got {:?}", other),
        };
        assert!(span.interior(DOC).trim().is_empty());
    }

    #[test]
    fn absent_nested_key_reports_anchor_for_creation() {
        match resolve_nested(DOC, "CENTRAL_PLAINS", "PATROL").unwrap() {
            NestedContainer::Absent { anchor } => {
                assert_eq!(anchor.kind, BracketKind::Brace);
                assert!(anchor.interior(DOC).contains("ESCORT"));
            }
            other => panic!("expected absent container, got {:?}", other),
        }
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let err = resolve_nested(DOC, "SOUTH_REACH", "HUNT").unwrap_err();
        assert!(matches!(err, LocateError::KeyNotFound { .. }));
    }

    #[test]
    fn type_annotation_brackets_are_skipped() {
        // The '[' of 'string[]' precedes the real opening brace; the locator
        // must land on the brace introduced by '='.
        let span = find_container(DOC, "STORIES", 0).unwrap();
        assert_eq!(span.kind, BracketKind::Brace);
        assert!(span.interior(DOC).contains("'FARMER'"));
    }

    #[test]
    fn key_must_be_a_standalone_identifier() {
        let doc = "MANHUNT: [1], HUNT: [2]";
        let span = find_container(doc, "HUNT", 0).unwrap();
        assert_eq!(span.interior(doc), "2");
    }

    #[test]
    fn depth_zero_exactly_at_reported_end() {
        // Same key at several nesting depths; the located range must close
        // the bracket it opened, with depth strictly positive at every
        // earlier offset.
        let doc = "DATA: [ [ [1], [2] ], [3] ], TAIL: []";
        let span = find_container(doc, "DATA", 0).unwrap();

        let mut depth = 0i64;
        for (idx, c) in doc[span.open..=span.close].char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
            let at = span.open + idx;
            if at < span.close {
                assert!(depth > 0, "depth dropped to zero before reported end");
            }
        }
        assert_eq!(depth, 0);
        assert_eq!(&doc[span.close + 1..span.close + 2], ",");
    }

    #[test]
    fn unbalanced_container_is_reported() {
        let doc = "BROKEN: [ { }";
        let err = find_container(doc, "BROKEN", 0).unwrap_err();
        assert!(matches!(err, LocateError::Unbalanced { .. }));
    }

    #[test]
    fn balanced_end_ignores_other_bracket_kind() {
        let doc = "{ a: [1, 2], b: { c: [3] } }";
        let close = balanced_end(doc, 0).unwrap();
        assert_eq!(close, doc.len() - 1);
    }
}
