//! Differential UPDATE builder
//!
//! [`FieldValue`] collects the columns that changed between two versions of a
//! record, each with its value already rendered as a SQL literal, and turns
//! them into a single `UPDATE ... SET (cols) = (vals)` statement.
//!
//! ```rust
//! use dbkit_postgres::FieldValue;
//!
//! let mut fv = FieldValue::new();
//! fv.set("Alice", "Alicia", "name");
//! fv.set(30u8, 30u8, "age");
//! fv.set(false, true, "active");
//!
//! assert_eq!(fv.fields(), ["name", "active"]);
//! assert_eq!(fv.values(), ["'Alicia'", "true"]);
//!
//! let (query, stamp) = fv.update_query("users", &7u64);
//! assert!(query.starts_with("UPDATE users SET (name,active,updated_at) = ('Alicia',true,'"));
//! assert!(query.ends_with("') WHERE id = 7"));
//! assert!(stamp.is_some());
//! ```

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use dbkit_core::literal::{ArrayLiteral, escape};
use dbkit_core::DbResult;
use serde::Serialize;
use uuid::Uuid;

/// Values that render as a SQL literal
pub trait SqlValue {
    fn sql_literal(&self) -> String;
}

impl SqlValue for str {
    fn sql_literal(&self) -> String {
        format!("'{}'", escape(self))
    }
}

impl SqlValue for String {
    fn sql_literal(&self) -> String {
        self.as_str().sql_literal()
    }
}

impl<T: SqlValue + ?Sized> SqlValue for &T {
    fn sql_literal(&self) -> String {
        (**self).sql_literal()
    }
}

macro_rules! bare_sql_value {
    ($($t:ty),*) => {
        $(
            impl SqlValue for $t {
                fn sql_literal(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

bare_sql_value!(u8, u16, u32, u64, i8, i16, i32, i64, bool);

impl<Tz: TimeZone> SqlValue for DateTime<Tz> {
    fn sql_literal(&self) -> String {
        format!("'{}'", timestamp(&self.with_timezone(&Utc)))
    }
}

impl SqlValue for Uuid {
    fn sql_literal(&self) -> String {
        format!("'{self}'")
    }
}

/// `None` renders `NULL`
impl<T: SqlValue> SqlValue for Option<T> {
    fn sql_literal(&self) -> String {
        match self {
            Some(value) => value.sql_literal(),
            None => "NULL".to_string(),
        }
    }
}

/// Element types of typed array columns
pub trait ArrayElement {
    /// Postgres element type used in the `::TYPE[]` cast
    const SQL_TYPE: &'static str;
}

impl ArrayElement for i8 {
    const SQL_TYPE: &'static str = "SMALLINT";
}

impl ArrayElement for i16 {
    const SQL_TYPE: &'static str = "SMALLINT";
}

impl ArrayElement for i32 {
    const SQL_TYPE: &'static str = "INTEGER";
}

impl ArrayElement for i64 {
    const SQL_TYPE: &'static str = "BIGINT";
}

impl ArrayElement for String {
    const SQL_TYPE: &'static str = "VARCHAR";
}

impl ArrayElement for &str {
    const SQL_TYPE: &'static str = "VARCHAR";
}

/// Arrays render as `ARRAY[..]::TYPE[]`
impl<T: ArrayElement> SqlValue for [T]
where
    [T]: ArrayLiteral,
{
    fn sql_literal(&self) -> String {
        format!("ARRAY{}::{}[]", self.array_literal(), T::SQL_TYPE)
    }
}

impl<T: ArrayElement> SqlValue for Vec<T>
where
    [T]: ArrayLiteral,
{
    fn sql_literal(&self) -> String {
        self.as_slice().sql_literal()
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Accumulator of changed columns and their rendered values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValue {
    fields: Vec<String>,
    values: Vec<String>,
}

impl FieldValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append `field = is` when `was != is`.
    pub fn set<T>(&mut self, was: T, is: T, field: &str)
    where
        T: SqlValue + PartialEq,
    {
        if was != is {
            self.add(is, field);
        }
    }

    /// Append `field = is` unconditionally.
    pub fn add<T: SqlValue>(&mut self, is: T, field: &str) {
        self.push(field, is.sql_literal());
    }

    /// Append `field = is` rendered as quoted JSON when `was != is`.
    pub fn json<T>(&mut self, was: &T, is: &T, field: &str) -> DbResult<()>
    where
        T: Serialize + PartialEq + ?Sized,
    {
        if was != is {
            self.add_json(is, field)?;
        }
        Ok(())
    }

    /// Append `field = is` rendered as quoted JSON.
    ///
    /// Nothing is appended if serialization fails.
    pub fn add_json<T: Serialize + ?Sized>(&mut self, is: &T, field: &str) -> DbResult<()> {
        let data = serde_json::to_string(is)?;
        self.push(field, data.as_str().sql_literal());
        Ok(())
    }

    /// Build the UPDATE statement, stamping `updated_at` with the current time.
    ///
    /// Returns an empty statement and no timestamp when nothing changed.
    pub fn update_query<I>(&self, table: &str, id: &I) -> (String, Option<DateTime<Utc>>)
    where
        I: SqlValue + ?Sized,
    {
        self.update_query_at(table, id, Utc::now())
    }

    /// [`update_query`](Self::update_query) with an explicit `updated_at`.
    pub fn update_query_at<I>(
        &self,
        table: &str,
        id: &I,
        updated_at: DateTime<Utc>,
    ) -> (String, Option<DateTime<Utc>>)
    where
        I: SqlValue + ?Sized,
    {
        if self.fields.is_empty() {
            return (String::new(), None);
        }

        let query = format!(
            "UPDATE {table} SET ({},updated_at) = ({},'{}') WHERE id = {}",
            self.fields.join(","),
            self.values.join(","),
            timestamp(&updated_at),
            id.sql_literal()
        );
        (query, Some(updated_at))
    }

    fn push(&mut self, field: &str, value: String) {
        self.fields.push(field.to_string());
        self.values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde::Serialize;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_equal_values_append_nothing() {
        let mut fv = FieldValue::new();
        fv.set("same", "same", "name");
        fv.set(5i32, 5i32, "count");
        fv.set(true, true, "active");
        fv.set(fixed_time(), fixed_time(), "seen_at");
        fv.set(vec![1i64, 2], vec![1i64, 2], "ids");
        assert!(fv.is_empty());
    }

    #[rstest]
    #[case::string("O'Brien", "'O''Brien'")]
    #[case::empty_string("", "''")]
    fn test_string_rendering(#[case] value: &str, #[case] expected: &str) {
        let mut fv = FieldValue::new();
        fv.set("before", value, "name");
        assert_eq!(fv.values(), [expected]);
    }

    #[test]
    fn test_integer_and_bool_rendering() {
        let mut fv = FieldValue::new();
        fv.set(0u8, 255u8, "a");
        fv.set(0u64, u64::MAX, "b");
        fv.set(0i8, -128i8, "c");
        fv.set(0i64, i64::MIN, "d");
        fv.add(false, "e");
        assert_eq!(
            fv.values(),
            ["255", "18446744073709551615", "-128", "-9223372036854775808", "false"]
        );
    }

    #[test]
    fn test_time_rendering_is_utc_with_nanos() {
        let offset = chrono::FixedOffset::east_opt(3 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 3, 1, 15, 30, 45).unwrap();

        let mut fv = FieldValue::new();
        fv.add(local, "seen_at");
        assert_eq!(fv.values(), ["'2024-03-01T12:30:45.000000000Z'"]);
    }

    #[test]
    fn test_array_rendering() {
        let mut fv = FieldValue::new();
        fv.add(vec![1i8, 2], "a");
        fv.add(vec![3i16], "b");
        fv.add(vec![4i32, 5], "c");
        fv.add(vec![6i64], "d");
        fv.add(vec!["x".to_string(), "it's".to_string()], "e");
        fv.add(Vec::<i32>::new(), "f");
        fv.add(["p", "q"].as_slice(), "g");

        assert_eq!(
            fv.values(),
            [
                "ARRAY[1,2]::SMALLINT[]",
                "ARRAY[3]::SMALLINT[]",
                "ARRAY[4,5]::INTEGER[]",
                "ARRAY[6]::BIGINT[]",
                "ARRAY['x','it''s']::VARCHAR[]",
                "ARRAY[]::INTEGER[]",
                "ARRAY['p','q']::VARCHAR[]",
            ]
        );
    }

    #[test]
    fn test_option_renders_null() {
        let mut fv = FieldValue::new();
        fv.set(Some("a"), None, "nickname");
        fv.set(None, Some(3i32), "rank");
        fv.set(None::<i32>, None, "unchanged");
        assert_eq!(fv.fields(), ["nickname", "rank"]);
        assert_eq!(fv.values(), ["NULL", "3"]);
    }

    #[derive(Serialize, PartialEq)]
    struct Settings {
        theme: &'static str,
    }

    #[test]
    fn test_json_rendering() {
        let mut fv = FieldValue::new();
        fv.json(
            &Settings { theme: "dark" },
            &Settings { theme: "dark" },
            "settings",
        )
        .unwrap();
        assert!(fv.is_empty());

        fv.json(
            &Settings { theme: "dark" },
            &Settings { theme: "it's" },
            "settings",
        )
        .unwrap();
        assert_eq!(fv.values(), [r#"'{"theme":"it''s"}'"#]);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("nope"))
        }
    }

    #[test]
    fn test_json_failure_appends_nothing() {
        let mut fv = FieldValue::new();
        assert!(fv.add_json(&Unserializable, "data").is_err());
        assert!(fv.is_empty());
    }

    #[test]
    fn test_update_query_without_changes() {
        let fv = FieldValue::new();
        assert_eq!(fv.update_query("users", &1u64), (String::new(), None));
    }

    #[test]
    fn test_update_query_ids() {
        let mut fv = FieldValue::new();
        fv.set("a", "b", "name");

        let (query, stamp) = fv.update_query_at("users", &42u64, fixed_time());
        assert_eq!(
            query,
            "UPDATE users SET (name,updated_at) = ('b','2024-03-01T12:30:45.000000000Z') WHERE id = 42"
        );
        assert_eq!(stamp, Some(fixed_time()));

        let id = Uuid::nil();
        let (query, _) = fv.update_query_at("users", &id, fixed_time());
        assert!(query.ends_with("WHERE id = '00000000-0000-0000-0000-000000000000'"));

        let (query, _) = fv.update_query_at("users", "k'1", fixed_time());
        assert!(query.ends_with("WHERE id = 'k''1'"));
    }

    #[test]
    fn test_update_query_does_not_consume() {
        let mut fv = FieldValue::new();
        fv.add(1u32, "n");
        let before = fv.clone();
        let _ = fv.update_query("t", &1i64);
        assert_eq!(fv, before);
    }

    proptest! {
        #[test]
        fn prop_equal_pairs_append_nothing(a in any::<i64>(), s in ".*") {
            let mut fv = FieldValue::new();
            fv.set(a, a, "n");
            fv.set(s.as_str(), s.as_str(), "s");
            prop_assert!(fv.is_empty());
        }

        #[test]
        fn prop_differing_pairs_append_one(a in any::<i32>(), b in any::<i32>()) {
            prop_assume!(a != b);
            let mut fv = FieldValue::new();
            fv.set(a, b, "n");
            prop_assert_eq!(fv.fields(), ["n".to_string()]);
            prop_assert_eq!(fv.values(), [b.to_string()]);
        }

        #[test]
        fn prop_string_literals_keep_quotes_balanced(was in ".*", is in ".*") {
            prop_assume!(was != is);
            let mut fv = FieldValue::new();
            fv.set(was.as_str(), is.as_str(), "s");
            let literal = &fv.values()[0];
            let inner = &literal[1..literal.len() - 1];
            prop_assert!(literal.starts_with('\'') && literal.ends_with('\''));
            prop_assert_eq!(inner.replace("''", ""), is.replace('\'', ""));
            prop_assert_eq!(fv.fields().len(), fv.values().len());
        }
    }
}
