//! Static per-table descriptors.
//!
//! Each entity declares its column order once, together with what happens to every column on
//! conflict and whether it may be left out of an insert. Statements are compiled from the
//! descriptor plus the entity's values.

use chrono::{DateTime, Utc};

use crate::{
    database::{
        error::InternalError,
        executor::OperationContext,
        query_builder::{
            build_bulk_insert, build_insert, build_soft_delete, build_upsert, with_returning,
            ConflictTarget,
        },
        sql_value::SqlValue,
    },
    options::UpsertOptions,
};

/// What an upsert does to a column when the row already exists.
#[derive(Clone, Copy)]
pub enum UpdatePolicy {
    Update,
    Keep,
    /// Overwritten only when the predicate holds for the call's options.
    UpdateWhen(fn(&UpsertOptions) -> bool),
}

impl std::fmt::Debug for UpdatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdatePolicy::Update => write!(f, "Update"),
            UpdatePolicy::Keep => write!(f, "Keep"),
            UpdatePolicy::UpdateWhen(_) => write!(f, "UpdateWhen(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmitRule {
    Never,
    /// Left out of the statement, placeholder included, when the bound value is empty.
    WhenEmpty,
}

/// Where a column's value comes from when a statement is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Data,
    /// Always the context's organization id.
    ResourcePath,
    /// The entity's value, or the compile time when unset.
    CreatedAt,
    /// Always the compile time.
    UpdatedAt,
    /// Always `NULL`, so writing a row revives it.
    DeletedAt,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub role: ColumnRole,
    pub on_conflict: UpdatePolicy,
    pub omit: OmitRule,
}

impl ColumnSpec {
    pub const RESOURCE_PATH: ColumnSpec =
        ColumnSpec::data("resource_path").with_role(ColumnRole::ResourcePath).keep();
    pub const CREATED_AT: ColumnSpec =
        ColumnSpec::data("created_at").with_role(ColumnRole::CreatedAt).keep();
    pub const UPDATED_AT: ColumnSpec =
        ColumnSpec::data("updated_at").with_role(ColumnRole::UpdatedAt);
    pub const DELETED_AT: ColumnSpec =
        ColumnSpec::data("deleted_at").with_role(ColumnRole::DeletedAt);

    pub const fn data(name: &'static str) -> Self {
        Self { name, role: ColumnRole::Data, on_conflict: UpdatePolicy::Update, omit: OmitRule::Never }
    }

    pub const fn with_role(mut self, role: ColumnRole) -> Self {
        self.role = role;
        self
    }

    pub const fn keep(mut self) -> Self {
        self.on_conflict = UpdatePolicy::Keep;
        self
    }

    pub const fn update_when(mut self, predicate: fn(&UpsertOptions) -> bool) -> Self {
        self.on_conflict = UpdatePolicy::UpdateWhen(predicate);
        self
    }

    pub const fn omit_when_empty(mut self) -> Self {
        self.omit = OmitRule::WhenEmpty;
        self
    }

    pub fn updates_on_conflict(&self, options: &UpsertOptions) -> bool {
        match self.on_conflict {
            UpdatePolicy::Update => true,
            UpdatePolicy::Keep => false,
            UpdatePolicy::UpdateWhen(predicate) => predicate(options),
        }
    }
}

/// Postgres accepts at most this many bound parameters in one statement.
pub const MAX_BIND_PARAMETERS: usize = u16::MAX as usize;

#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    pub conflict_constraint: &'static str,
    pub columns: &'static [ColumnSpec],
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// The tenant column, if the table has one.
    pub fn scope_column(&self) -> Option<&'static str> {
        self.columns.iter().find(|c| c.role == ColumnRole::ResourcePath).map(|c| c.name)
    }

    /// Columns an upsert leaves untouched on conflict under `options`.
    pub fn excluded_from_update(&self, options: &UpsertOptions) -> Vec<&'static str> {
        self.columns.iter().filter(|c| !c.updates_on_conflict(options)).map(|c| c.name).collect()
    }

    /// Applies column roles to `values` and drops columns whose omit rule fires.
    fn bind(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
        values: Vec<SqlValue>,
        apply_omit: bool,
    ) -> Result<(Vec<&'static str>, Vec<SqlValue>), InternalError> {
        if values.len() != self.columns.len() {
            return Err(InternalError::InvalidFieldMap {
                table: self.table,
                names: self.columns.len(),
                values: values.len(),
            });
        }

        let mut names = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len());
        for (column, value) in self.columns.iter().zip(values) {
            let value = match column.role {
                ColumnRole::Data => value,
                ColumnRole::ResourcePath => SqlValue::text(ctx.organization_id()),
                ColumnRole::CreatedAt if !value.is_null() => value,
                ColumnRole::CreatedAt | ColumnRole::UpdatedAt => SqlValue::Timestamptz(Some(now)),
                ColumnRole::DeletedAt => SqlValue::Timestamptz(None),
            };

            if apply_omit && column.omit == OmitRule::WhenEmpty && value.is_empty() {
                continue;
            }
            names.push(column.name);
            params.push(value);
        }

        Ok((names, params))
    }

    pub fn compile_insert(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
        values: Vec<SqlValue>,
    ) -> Result<CompiledStatement, InternalError> {
        let (names, params) = self.bind(ctx, now, values, true)?;
        Ok(CompiledStatement { sql: build_insert(self.table, &names), params })
    }

    /// Insert returning every column of the table in declaration order.
    pub fn compile_insert_returning(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
        values: Vec<SqlValue>,
    ) -> Result<CompiledStatement, InternalError> {
        let (names, params) = self.bind(ctx, now, values, true)?;
        let sql = with_returning(&build_insert(self.table, &names), &self.column_names());
        Ok(CompiledStatement { sql, params })
    }

    pub fn compile_upsert(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
        values: Vec<SqlValue>,
        options: &UpsertOptions,
    ) -> Result<CompiledStatement, InternalError> {
        let (names, params) = self.bind(ctx, now, values, true)?;
        let excluded = self.excluded_from_update(options);
        let sql = build_upsert(
            self.table,
            &names,
            ConflictTarget::Constraint(self.conflict_constraint),
            &excluded,
            self.scope_column(),
        );
        Ok(CompiledStatement { sql, params })
    }

    /// One multi-row insert. Every row binds every column, so omit rules do not apply here.
    pub fn compile_bulk_insert(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<CompiledStatement, InternalError> {
        let row_count = rows.len();
        let mut params = Vec::with_capacity(row_count * self.columns.len());
        for values in rows {
            let (_, bound) = self.bind(ctx, now, values, false)?;
            params.extend(bound);
        }

        let sql = build_bulk_insert(self.table, &self.column_names(), row_count);
        Ok(CompiledStatement { sql, params })
    }

    /// Rows a single multi-row insert can carry without exceeding [`MAX_BIND_PARAMETERS`].
    pub fn max_bulk_rows(&self) -> usize {
        (MAX_BIND_PARAMETERS / self.columns.len().max(1)).max(1)
    }

    /// Multi-row inserts of at most [`TableSchema::max_bulk_rows`] rows each, in row order.
    pub fn compile_bulk_inserts(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<Vec<CompiledStatement>, InternalError> {
        let chunk_size = self.max_bulk_rows();
        let mut statements = Vec::with_capacity(rows.len().div_ceil(chunk_size));
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(chunk_size).collect();
            statements.push(self.compile_bulk_insert(ctx, now, chunk)?);
        }
        Ok(statements)
    }

    /// Soft delete of every live row whose `key_columns` match the corresponding key lists.
    pub fn compile_soft_delete(
        &self,
        ctx: &OperationContext,
        key_columns: &[&str],
        keys: Vec<Vec<String>>,
    ) -> Result<CompiledStatement, InternalError> {
        if key_columns.len() != keys.len() {
            return Err(InternalError::InvalidFieldMap {
                table: self.table,
                names: key_columns.len(),
                values: keys.len(),
            });
        }

        let mut params: Vec<SqlValue> =
            keys.into_iter().map(|k| SqlValue::TextArray(Some(k))).collect();
        params.push(SqlValue::text(ctx.organization_id()));

        Ok(CompiledStatement { sql: build_soft_delete(self.table, key_columns), params })
    }
}
