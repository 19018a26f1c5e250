//! SQL text generation shared by every repository.
//!
//! Everything here is pure string building: no connection is touched and the same inputs always
//! produce byte-identical statements, which keeps the prepared-statement cache warm.

pub const RESERVED_KEYWORDS: &[&str] =
    &["group", "user", "order", "table", "index", "primary", "key"];

/// Quotes an identifier if it's a reserved keyword.
#[inline]
pub fn quote_identifier(name: &str) -> String {
    if RESERVED_KEYWORDS.contains(&name) {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

fn column_list(columns: &[&str]) -> String {
    columns.iter().map(|col| quote_identifier(col)).collect::<Vec<_>>().join(", ")
}

/// `$1,$2,...,$n`; empty for `n == 0`.
pub fn generate_placeholders(n: usize) -> String {
    generate_placeholders_with_first_index(1, n)
}

/// `$first,...,$(first+n-1)`; empty for `n == 0`.
pub fn generate_placeholders_with_first_index(first: usize, n: usize) -> String {
    (first..first + n).map(|i| format!("${}", i)).collect::<Vec<_>>().join(",")
}

/// `col = EXCLUDED.col` for every column not listed in `excluded`, in input order.
pub fn build_update_set_clause(columns: &[&str], excluded: &[&str]) -> String {
    columns
        .iter()
        .filter(|col| !excluded.contains(col))
        .map(|col| {
            let col = quote_identifier(col);
            format!("{} = EXCLUDED.{}", col, col)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy)]
pub enum ConflictTarget<'a> {
    Constraint(&'a str),
    Columns(&'a [&'a str]),
}

impl ConflictTarget<'_> {
    fn render(&self) -> String {
        match self {
            ConflictTarget::Constraint(name) => format!("ON CONSTRAINT {}", name),
            ConflictTarget::Columns(columns) => format!("({})", column_list(columns)),
        }
    }
}

pub fn build_insert(table: &str, columns: &[&str]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        column_list(columns),
        generate_placeholders(columns.len())
    )
}

/// Single-row upsert. Columns listed in `excluded` keep their stored value on conflict; when
/// nothing is left to update the statement degrades to `DO NOTHING`.
///
/// With a `scope` column the update only applies to a stored row whose `scope` equals the
/// incoming one, so a conflict against another tenant's row affects no rows.
pub fn build_upsert(
    table: &str,
    columns: &[&str],
    target: ConflictTarget<'_>,
    excluded: &[&str],
    scope: Option<&str>,
) -> String {
    let set_clause = build_update_set_clause(columns, excluded);
    let action = match (set_clause.is_empty(), scope) {
        (true, _) => "DO NOTHING".to_string(),
        (false, None) => format!("DO UPDATE SET {}", set_clause),
        (false, Some(scope)) => {
            let scope = quote_identifier(scope);
            format!(
                "DO UPDATE SET {} WHERE {}.{} = EXCLUDED.{}",
                set_clause, table, scope, scope
            )
        }
    };

    format!("{} ON CONFLICT {} {}", build_insert(table, columns), target.render(), action)
}

pub fn with_returning(sql: &str, columns: &[&str]) -> String {
    format!("{} RETURNING {}", sql, column_list(columns))
}

/// Multi-row insert with `rows` tuples of `columns.len()` placeholders each.
pub fn build_bulk_insert(table: &str, columns: &[&str], rows: usize) -> String {
    let width = columns.len();
    let tuples = (0..rows)
        .map(|row| format!("({})", generate_placeholders_with_first_index(row * width + 1, width)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) VALUES {}", table, column_list(columns), tuples)
}

/// Soft delete matching any of the keys bound as arrays to `$1..$k`, scoped to the tenant
/// bound at `$k+1`. Rows already deleted are left untouched.
pub fn build_soft_delete(table: &str, key_columns: &[&str]) -> String {
    let mut conditions = key_columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ANY(${})", quote_identifier(col), i + 1))
        .collect::<Vec<_>>();
    conditions.push(format!("resource_path = ${}", key_columns.len() + 1));
    conditions.push("deleted_at IS NULL".to_string());

    format!(
        "UPDATE {} SET deleted_at = now(), updated_at = now() WHERE {}",
        table,
        conditions.join(" AND ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_placeholders() {
        assert_eq!(generate_placeholders(3), "$1,$2,$3");
        assert_eq!(generate_placeholders(1), "$1");
        assert_eq!(generate_placeholders(0), "");
        assert_eq!(generate_placeholders_with_first_index(5, 3), "$5,$6,$7");
        assert_eq!(generate_placeholders_with_first_index(9, 0), "");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("user"), "\"user\"");
        assert_eq!(quote_identifier("group"), "\"group\"");
        assert_eq!(quote_identifier("user_id"), "user_id");
    }

    #[test]
    fn test_build_update_set_clause() {
        assert_eq!(
            build_update_set_clause(&["name", "created_at", "email"], &["created_at"]),
            "name = EXCLUDED.name, email = EXCLUDED.email"
        );
        assert_eq!(build_update_set_clause(&["created_at"], &["created_at"]), "");
    }

    #[test]
    fn test_build_upsert_with_constraint() {
        let sql = build_upsert(
            "students",
            &["student_id", "grade_id", "created_at"],
            ConflictTarget::Constraint("students_pk"),
            &["created_at"],
            None,
        );
        assert_eq!(
            sql,
            "INSERT INTO students (student_id, grade_id, created_at) VALUES ($1,$2,$3) \
             ON CONFLICT ON CONSTRAINT students_pk DO UPDATE SET \
             student_id = EXCLUDED.student_id, grade_id = EXCLUDED.grade_id"
        );
    }

    #[test]
    fn test_build_upsert_with_columns_and_nothing_to_update() {
        let sql = build_upsert(
            "tagged_user",
            &["user_id", "tag_id"],
            ConflictTarget::Columns(&["user_id", "tag_id"]),
            &["user_id", "tag_id"],
            Some("resource_path"),
        );
        assert_eq!(
            sql,
            "INSERT INTO tagged_user (user_id, tag_id) VALUES ($1,$2) \
             ON CONFLICT (user_id, tag_id) DO NOTHING"
        );
    }

    #[test]
    fn test_build_upsert_scoped_to_tenant() {
        let sql = build_upsert(
            "teachers",
            &["teacher_id", "school_ids", "resource_path"],
            ConflictTarget::Constraint("teachers_pk"),
            &["teacher_id", "resource_path"],
            Some("resource_path"),
        );
        assert_eq!(
            sql,
            "INSERT INTO teachers (teacher_id, school_ids, resource_path) VALUES ($1,$2,$3) \
             ON CONFLICT ON CONSTRAINT teachers_pk DO UPDATE SET school_ids = EXCLUDED.school_ids \
             WHERE teachers.resource_path = EXCLUDED.resource_path"
        );
    }

    #[test]
    fn test_with_returning() {
        let sql = with_returning(&build_insert("usr_email", &["email"]), &["usr_id", "email"]);
        assert_eq!(sql, "INSERT INTO usr_email (email) VALUES ($1) RETURNING usr_id, email");
    }

    #[test]
    fn test_build_bulk_insert() {
        assert_eq!(
            build_bulk_insert("t", &["a", "b"], 3),
            "INSERT INTO t (a, b) VALUES ($1,$2), ($3,$4), ($5,$6)"
        );
    }

    #[test]
    fn test_build_soft_delete() {
        assert_eq!(
            build_soft_delete("user_access_paths", &["user_id"]),
            "UPDATE user_access_paths SET deleted_at = now(), updated_at = now() \
             WHERE user_id = ANY($1) AND resource_path = $2 AND deleted_at IS NULL"
        );
        assert_eq!(
            build_soft_delete("users_groups", &["user_id", "group_id"]),
            "UPDATE users_groups SET deleted_at = now(), updated_at = now() \
             WHERE user_id = ANY($1) AND group_id = ANY($2) AND resource_path = $3 \
             AND deleted_at IS NULL"
        );
    }
}
