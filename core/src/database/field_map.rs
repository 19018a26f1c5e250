use crate::database::{
    error::DatabaseError,
    schema::TableSchema,
    sql_value::{Row, SqlValue},
};

/// Column-to-value mapping of a persisted entity.
///
/// `field_names` and `field_values` are parallel and follow the column order of `schema`.
/// `scan` consumes a row in that same order.
pub trait FieldMap: Send + Sync {
    fn schema(&self) -> &'static TableSchema;

    fn table_name(&self) -> &'static str {
        self.schema().table
    }

    fn field_names(&self) -> Vec<&'static str>;

    fn field_values(&self) -> Vec<SqlValue>;

    fn scan(&mut self, row: Row) -> Result<(), DatabaseError>;
}

pub fn scan_into<E>(row: Row) -> Result<E, DatabaseError>
where
    E: FieldMap + Default,
{
    let mut entity = E::default();
    entity.scan(row)?;
    Ok(entity)
}

/// Implements [`FieldMap`] from a single ordered list of `"column" => field` pairs, so the
/// bound values and the scan targets can never drift apart.
#[macro_export]
macro_rules! impl_field_map {
    ($entity:ty, $schema:path, { $($column:literal => $field:ident),+ $(,)? }) => {
        impl $crate::database::FieldMap for $entity {
            fn schema(&self) -> &'static $crate::database::TableSchema {
                &$schema
            }

            fn field_names(&self) -> Vec<&'static str> {
                vec![$($column),+]
            }

            fn field_values(&self) -> Vec<$crate::database::SqlValue> {
                use $crate::database::IntoSqlValue;
                vec![$(self.$field.clone().into_sql_value()),+]
            }

            fn scan(
                &mut self,
                row: $crate::database::Row,
            ) -> Result<(), $crate::database::DatabaseError> {
                use $crate::database::FromSqlValue;
                let mut values = row.into_iter();
                $(
                    let value = values.next().ok_or_else(|| {
                        $crate::database::DatabaseError::Decode {
                            column: $column.to_string(),
                            reason: "missing from row".to_string(),
                        }
                    })?;
                    self.$field = FromSqlValue::from_sql_value(value, $column)?;
                )+
                Ok(())
            }
        }
    };
}
