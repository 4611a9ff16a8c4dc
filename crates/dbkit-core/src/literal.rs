//! SQL literal helpers
//!
//! Statements handed to the façades are plain strings, so values have to be
//! rendered into SQL text by the caller. These helpers keep quotes balanced
//! (a single quote is doubled); they are not a defence against every form of
//! injection and must not be fed untrusted identifiers.

use std::borrow::Cow;

/// Escape single quotes for use inside a SQL string literal.
///
/// ```rust
/// use dbkit_core::literal::escape;
///
/// assert_eq!(escape("O'Brien"), "O''Brien");
/// ```
pub fn escape(value: &str) -> Cow<'_, str> {
    if value.contains('\'') {
        Cow::Owned(value.replace('\'', "''"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Render strings as a bracketed, quote-escaped list: `['a','b']`.
///
/// An empty slice renders `[]`.
pub fn strings_to_string<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }

    let quoted: Vec<Cow<'_, str>> = items.iter().map(|s| escape(s.as_ref())).collect();
    format!("['{}']", quoted.join("','"))
}

/// Values that can be rendered as an array literal
///
/// Strings use the quoted form, numbers and booleans the JSON array form.
pub trait ArrayLiteral {
    fn array_literal(&self) -> String;
}

impl ArrayLiteral for [String] {
    fn array_literal(&self) -> String {
        strings_to_string(self)
    }
}

impl ArrayLiteral for [&str] {
    fn array_literal(&self) -> String {
        strings_to_string(self)
    }
}

macro_rules! json_array_literal {
    ($($t:ty),*) => {
        $(
            impl ArrayLiteral for [$t] {
                fn array_literal(&self) -> String {
                    let items: Vec<String> = self.iter().map(|v| v.to_string()).collect();
                    format!("[{}]", items.join(","))
                }
            }
        )*
    };
}

json_array_literal!(i8, i16, i32, i64, u8, u16, u32, u64, bool);

impl<T> ArrayLiteral for Vec<T>
where
    [T]: ArrayLiteral,
{
    fn array_literal(&self) -> String {
        self.as_slice().array_literal()
    }
}

impl<T, const N: usize> ArrayLiteral for [T; N]
where
    [T]: ArrayLiteral,
{
    fn array_literal(&self) -> String {
        self.as_slice().array_literal()
    }
}

impl<A: ArrayLiteral + ?Sized> ArrayLiteral for Option<&A> {
    fn array_literal(&self) -> String {
        match self {
            Some(items) => items.array_literal(),
            None => "[]".to_string(),
        }
    }
}

/// Render any supported collection as an array literal.
///
/// ```rust
/// use dbkit_core::literal::array_to_string;
///
/// assert_eq!(array_to_string(&["a", "b"]), "['a','b']");
/// assert_eq!(array_to_string(&vec![1i64, 2, 3]), "[1,2,3]");
/// assert_eq!(array_to_string(&Vec::<i32>::new()), "[]");
/// ```
pub fn array_to_string<A: ArrayLiteral + ?Sized>(items: &A) -> String {
    items.array_literal()
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn one_line(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maximum number of characters of a value kept in a log line
pub const LOG_VALUE_LIMIT: usize = 100;

/// One-line rendering of a value, cut at [`LOG_VALUE_LIMIT`] characters.
pub fn clip_for_log(value: &str) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= LOG_VALUE_LIMIT {
        return flat;
    }
    let kept: String = flat.chars().take(LOG_VALUE_LIMIT - 3).collect();
    format!("{kept}...")
}
