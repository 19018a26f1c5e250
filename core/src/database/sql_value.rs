use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type as PgType};

use crate::database::error::DatabaseError;

/// A single bound parameter or scanned column.
///
/// Every variant carries an `Option` so a column can be bound as SQL `NULL` while still
/// telling the driver which family of type it holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    TextArray(Option<Vec<String>>),
    Bool(Option<bool>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Timestamptz(Option<DateTime<Utc>>),
    Date(Option<NaiveDate>),
}

/// One result row, in column order.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(Some(value.into()))
    }

    pub fn raw_name(&self) -> &'static str {
        match self {
            SqlValue::Text(_) => "Text",
            SqlValue::TextArray(_) => "TextArray",
            SqlValue::Bool(_) => "Bool",
            SqlValue::Int4(_) => "Int4",
            SqlValue::Int8(_) => "Int8",
            SqlValue::Timestamptz(_) => "Timestamptz",
            SqlValue::Date(_) => "Date",
        }
    }

    pub fn to_type(&self) -> PgType {
        match self {
            SqlValue::Text(_) => PgType::TEXT,
            SqlValue::TextArray(_) => PgType::TEXT_ARRAY,
            SqlValue::Bool(_) => PgType::BOOL,
            SqlValue::Int4(_) => PgType::INT4,
            SqlValue::Int8(_) => PgType::INT8,
            SqlValue::Timestamptz(_) => PgType::TIMESTAMPTZ,
            SqlValue::Date(_) => PgType::DATE,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Text(v) => v.is_none(),
            SqlValue::TextArray(v) => v.is_none(),
            SqlValue::Bool(v) => v.is_none(),
            SqlValue::Int4(v) => v.is_none(),
            SqlValue::Int8(v) => v.is_none(),
            SqlValue::Timestamptz(v) => v.is_none(),
            SqlValue::Date(v) => v.is_none(),
        }
    }

    /// `NULL`, an empty string, or an empty array.
    pub fn is_empty(&self) -> bool {
        match self {
            SqlValue::Text(Some(v)) => v.is_empty(),
            SqlValue::TextArray(Some(v)) => v.is_empty(),
            other => other.is_null(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(Some(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Decodes column `idx` of a driver row according to the column's declared type.
    pub fn from_pg_row(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, DatabaseError> {
        let column = &row.columns()[idx];
        let ty = column.type_();

        let value = if [PgType::TEXT, PgType::VARCHAR, PgType::BPCHAR, PgType::NAME].contains(ty) {
            SqlValue::Text(row.try_get(idx)?)
        } else if [PgType::TEXT_ARRAY, PgType::VARCHAR_ARRAY].contains(ty) {
            SqlValue::TextArray(row.try_get(idx)?)
        } else if *ty == PgType::BOOL {
            SqlValue::Bool(row.try_get(idx)?)
        } else if *ty == PgType::INT2 {
            SqlValue::Int4(row.try_get::<_, Option<i16>>(idx)?.map(i32::from))
        } else if *ty == PgType::INT4 {
            SqlValue::Int4(row.try_get(idx)?)
        } else if *ty == PgType::INT8 {
            SqlValue::Int8(row.try_get(idx)?)
        } else if *ty == PgType::TIMESTAMPTZ {
            SqlValue::Timestamptz(row.try_get(idx)?)
        } else if *ty == PgType::TIMESTAMP {
            let naive: Option<NaiveDateTime> = row.try_get(idx)?;
            SqlValue::Timestamptz(naive.map(|v| v.and_utc()))
        } else if *ty == PgType::DATE {
            SqlValue::Date(row.try_get(idx)?)
        } else {
            return Err(DatabaseError::Decode {
                column: column.name().to_string(),
                reason: format!("unsupported column type {}", ty),
            });
        };

        Ok(value)
    }
}

pub fn row_from_pg(row: &tokio_postgres::Row) -> Result<Row, DatabaseError> {
    (0..row.len()).map(|idx| SqlValue::from_pg_row(row, idx)).collect()
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Text(value) => value.to_sql(ty, out),
            SqlValue::TextArray(value) => value.to_sql(ty, out),
            SqlValue::Bool(value) => value.to_sql(ty, out),
            // integers follow the width the server inferred for the placeholder
            SqlValue::Int4(value) => serialize_int(value.map(i64::from), ty, out),
            SqlValue::Int8(value) => serialize_int(*value, ty, out),
            SqlValue::Timestamptz(value) => value.to_sql(ty, out),
            SqlValue::Date(value) => value.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &PgType) -> bool {
        true
    }

    to_sql_checked!();
}

fn serialize_int(
    value: Option<i64>,
    ty: &PgType,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    let Some(value) = value else {
        return Ok(IsNull::Yes);
    };

    if *ty == PgType::INT2 {
        i16::try_from(value)?.to_sql(ty, out)
    } else if *ty == PgType::INT4 {
        i32::try_from(value)?.to_sql(ty, out)
    } else {
        value.to_sql(ty, out)
    }
}

/// Conversion from a Rust field into a bound parameter.
pub trait IntoSqlValue {
    fn into_sql_value(self) -> SqlValue;
}

/// Conversion from a scanned column back into a Rust field.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue, column: &str) -> Result<Self, DatabaseError>;
}

fn mismatch(column: &str, expected: &str, got: &SqlValue) -> DatabaseError {
    DatabaseError::Decode {
        column: column.to_string(),
        reason: format!("expected {} but got {}", expected, got.raw_name()),
    }
}

macro_rules! sql_value_conversions {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl IntoSqlValue for Option<$ty> {
                fn into_sql_value(self) -> SqlValue {
                    SqlValue::$variant(self)
                }
            }

            impl IntoSqlValue for $ty {
                fn into_sql_value(self) -> SqlValue {
                    SqlValue::$variant(Some(self))
                }
            }

            impl FromSqlValue for Option<$ty> {
                fn from_sql_value(value: SqlValue, column: &str) -> Result<Self, DatabaseError> {
                    match value {
                        SqlValue::$variant(v) => Ok(v),
                        other => Err(mismatch(column, stringify!($variant), &other)),
                    }
                }
            }

            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue, column: &str) -> Result<Self, DatabaseError> {
                    Option::<$ty>::from_sql_value(value, column)?.ok_or_else(|| {
                        DatabaseError::Decode {
                            column: column.to_string(),
                            reason: "unexpected NULL".to_string(),
                        }
                    })
                }
            }
        )+
    };
}

sql_value_conversions! {
    Text => String,
    TextArray => Vec<String>,
    Bool => bool,
    Int4 => i32,
    Int8 => i64,
    Timestamptz => DateTime<Utc>,
    Date => NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty() {
        assert!(SqlValue::Text(None).is_empty());
        assert!(SqlValue::text("").is_empty());
        assert!(SqlValue::TextArray(Some(vec![])).is_empty());
        assert!(!SqlValue::text("STUDENT_ENROLLMENT_STATUS_ENROLLED").is_empty());
        assert!(!SqlValue::Bool(Some(false)).is_empty());
        assert!(SqlValue::Timestamptz(None).is_null());
    }

    #[test]
    fn test_to_type() {
        assert_eq!(SqlValue::Text(None).to_type(), PgType::TEXT);
        assert_eq!(SqlValue::TextArray(Some(vec![])).to_type(), PgType::TEXT_ARRAY);
        assert_eq!(SqlValue::Date(None).to_type(), PgType::DATE);
    }

    #[test]
    fn test_int4_serializes_to_server_width() {
        let mut out = BytesMut::new();
        SqlValue::Int4(Some(7)).to_sql(&PgType::INT2, &mut out).unwrap();
        assert_eq!(out.len(), 2);

        let mut out = BytesMut::new();
        SqlValue::Int4(Some(7)).to_sql(&PgType::INT8, &mut out).unwrap();
        assert_eq!(out.len(), 8);

        let mut out = BytesMut::new();
        let is_null = SqlValue::Int8(None).to_sql(&PgType::INT4, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn test_from_sql_value_rejects_null_for_required_field() {
        let err = String::from_sql_value(SqlValue::Text(None), "student_id").unwrap_err();
        assert!(err.to_string().contains("student_id"));

        let optional = Option::<String>::from_sql_value(SqlValue::Text(None), "student_id").unwrap();
        assert_eq!(optional, None);
    }

    #[test]
    fn test_from_sql_value_rejects_wrong_variant() {
        let err = bool::from_sql_value(SqlValue::text("yes"), "is_origin").unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not decode column is_origin: expected Bool but got Text"
        );
    }
}
