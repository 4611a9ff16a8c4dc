//! Statement kind detection
//!
//! tokio-postgres reports only the affected row count, not the command tag,
//! so `update` and `delete` check the statement text instead. The main verb is
//! the first top-level keyword, skipping comments and the CTE list of a
//! `WITH` query.

/// Kind of a SQL statement, by its main verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Other,
}

impl StatementKind {
    fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "SELECT" | "VALUES" | "TABLE" => Some(StatementKind::Select),
            "INSERT" => Some(StatementKind::Insert),
            "UPDATE" => Some(StatementKind::Update),
            "DELETE" => Some(StatementKind::Delete),
            "MERGE" => Some(StatementKind::Merge),
            _ => None,
        }
    }
}

/// Classify a statement by its main verb.
pub fn statement_kind(sql: &str) -> StatementKind {
    let words = top_level_words(sql);
    let Some(first) = words.first() else {
        return StatementKind::Other;
    };

    if first.eq_ignore_ascii_case("WITH") {
        return words[1..]
            .iter()
            .find_map(|w| StatementKind::from_keyword(w))
            .unwrap_or(StatementKind::Other);
    }

    StatementKind::from_keyword(first).unwrap_or(StatementKind::Other)
}

/// Words outside parentheses, string literals, quoted identifiers and comments
fn top_level_words(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
            }
            b'\'' | b'"' => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == c {
                        // doubled quote is an escaped quote
                        if bytes.get(i + 1) == Some(&c) {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                if depth == 0 {
                    words.push(&sql[start..i]);
                }
            }
            _ => i += 1,
        }
    }

    words
}
