//! Row mapping for `select`

use dbkit_core::{DbError, DbResult};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSqlOwned, Type};

/// Types that can be built from a result row
///
/// ```rust
/// use dbkit_core::DbResult;
/// use dbkit_postgres::FromRow;
/// use tokio_postgres::Row;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> DbResult<Self> {
///         Ok(Self {
///             id: row.try_get("id")?,
///             name: row.try_get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> DbResult<Self>;
}

macro_rules! tuple_from_row {
    ($($name:ident => $idx:tt),+) => {
        impl<$($name: FromSqlOwned),+> FromRow for ($($name,)+) {
            fn from_row(row: &Row) -> DbResult<Self> {
                Ok(($(row.try_get::<_, $name>($idx)?,)+))
            }
        }
    };
}

tuple_from_row!(A => 0);
tuple_from_row!(A => 0, B => 1);
tuple_from_row!(A => 0, B => 1, C => 2);
tuple_from_row!(A => 0, B => 1, C => 2, D => 3);
tuple_from_row!(A => 0, B => 1, C => 2, D => 3, E => 4);

/// Read column `idx` as a non-negative integer of any width.
///
/// NULL reads as `None`. Negative values are [`DbError::IncorrectId`], non
/// integer columns [`DbError::IncorrectRequest`].
pub(crate) fn unsigned_column(row: &Row, idx: usize) -> DbResult<Option<u64>> {
    let column = row.columns().get(idx).ok_or(DbError::IncorrectRequest)?;
    let ty = column.type_();
    let value = if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(i64::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(i64::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?
    } else {
        return Err(DbError::IncorrectRequest);
    };

    value
        .map(|v| u64::try_from(v).map_err(|_| DbError::IncorrectId))
        .transpose()
}
