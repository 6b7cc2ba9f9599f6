//! PostgreSQL statement text.
//!
//! Pure string builders; nothing here touches a connection. Every identifier
//! is quoted and schema-qualified, and every non-null value becomes a bound
//! parameter with an explicit cast so the server never has to guess its type.
//! Writes take the target column's catalog type into account: a value whose
//! own type does not assign to the column is sent as text and cast to it.

use crate::core::identifier::{qualify_pg, quote_pg, validate_type_declaration};
use crate::core::schema::{ColumnDef, ColumnInfo, IDENTITY_COLUMN};
use crate::core::value::{Record, Value};
use crate::error::Result;

/// Catalog check for one relation. Params: schema, relation.
pub const RELATION_EXISTS_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM information_schema.tables
        WHERE table_schema = $1 AND table_name = $2
    )
"#;

/// Base tables of a schema, by name. Params: schema.
pub const LIST_RELATIONS_SQL: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

/// Columns of a relation in ordinal order. Params: schema, relation.
pub const LIST_COLUMNS_SQL: &str = r#"
    SELECT column_name::text, data_type::text
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

/// Catalog types that decode natively; anything else is read back as text.
const NATIVE_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "numeric",
    "real",
    "double precision",
    "boolean",
    "text",
    "character varying",
    "character",
];

/// Catalog types any bound scalar assigns to.
const TEXT_TYPES: &[&str] = &["text", "character varying", "character"];

/// Catalog types a bound `int8` or `numeric` assigns to.
const NUMBER_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "numeric",
    "real",
    "double precision",
];

/// A statement plus its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Statement builder for one schema.
#[derive(Debug, Clone)]
pub struct PgDialect {
    schema: String,
}

impl PgDialect {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// `"schema"."relation"`.
    pub fn qualify(&self, relation: &str) -> Result<String> {
        qualify_pg(&self.schema, relation)
    }

    /// `CREATE TABLE` with the identity column first.
    pub fn create_relation(&self, relation: &str, columns: &[ColumnDef]) -> Result<String> {
        let mut defs = vec![format!("{} SERIAL PRIMARY KEY", quote_pg(IDENTITY_COLUMN)?)];
        for col in columns {
            defs.push(format!(
                "{} {}",
                quote_pg(&col.name)?,
                col.column_type.to_sql()
            ));
        }
        Ok(format!(
            "CREATE TABLE {} ({})",
            self.qualify(relation)?,
            defs.join(", ")
        ))
    }

    pub fn drop_relation(&self, relation: &str) -> Result<String> {
        Ok(format!("DROP TABLE IF EXISTS {}", self.qualify(relation)?))
    }

    pub fn add_column(&self, relation: &str, column: &ColumnDef) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.qualify(relation)?,
            quote_pg(&column.name)?,
            column.column_type.to_sql()
        ))
    }

    pub fn drop_column(&self, relation: &str, column: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualify(relation)?,
            quote_pg(column)?
        ))
    }

    /// Full scan ordered by identity.
    pub fn select_all(&self, relation: &str, columns: &[ColumnInfo]) -> Result<String> {
        Ok(format!(
            "SELECT {} FROM {} ORDER BY {}",
            self.projection(columns)?,
            self.qualify(relation)?,
            quote_pg(IDENTITY_COLUMN)?
        ))
    }

    /// Point lookup. Params: the identity.
    pub fn select_by_id(&self, relation: &str, columns: &[ColumnInfo], id: i64) -> Result<Statement> {
        Ok(Statement {
            sql: format!(
                "SELECT {} FROM {} WHERE {} = $1::int8",
                self.projection(columns)?,
                self.qualify(relation)?,
                quote_pg(IDENTITY_COLUMN)?
            ),
            params: vec![Value::Integer(id)],
        })
    }

    /// Insert returning the assigned identity. `columns` supplies the target
    /// types; a field without a listed column binds by its own type.
    pub fn insert(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        values: &Record,
    ) -> Result<Statement> {
        let target = self.qualify(relation)?;
        let returning = format!("RETURNING {}::int8", quote_pg(IDENTITY_COLUMN)?);

        if values.is_empty() {
            return Ok(Statement {
                sql: format!("INSERT INTO {} DEFAULT VALUES {}", target, returning),
                params: Vec::new(),
            });
        }

        let mut params = Vec::new();
        let mut names = Vec::with_capacity(values.len());
        let mut slots = Vec::with_capacity(values.len());
        for (name, value) in values.iter() {
            names.push(quote_pg(name)?);
            slots.push(bind(value, target_type(columns, name), &mut params));
        }

        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({}) {}",
                target,
                names.join(", "),
                slots.join(", "),
                returning
            ),
            params,
        })
    }

    /// Update one row by identity. The identity is the last parameter.
    pub fn update(
        &self,
        relation: &str,
        columns: &[ColumnInfo],
        id: i64,
        values: &Record,
    ) -> Result<Statement> {
        let mut params = Vec::new();
        let mut assignments = Vec::with_capacity(values.len());
        for (name, value) in values.iter() {
            let slot = bind(value, target_type(columns, name), &mut params);
            assignments.push(format!("{} = {}", quote_pg(name)?, slot));
        }
        params.push(Value::Integer(id));

        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = ${}::int8",
                self.qualify(relation)?,
                assignments.join(", "),
                quote_pg(IDENTITY_COLUMN)?,
                params.len()
            ),
            params,
        })
    }

    /// Delete one row by identity.
    pub fn delete(&self, relation: &str, id: i64) -> Result<Statement> {
        Ok(Statement {
            sql: format!(
                "DELETE FROM {} WHERE {} = $1::int8",
                self.qualify(relation)?,
                quote_pg(IDENTITY_COLUMN)?
            ),
            params: vec![Value::Integer(id)],
        })
    }

    fn projection(&self, columns: &[ColumnInfo]) -> Result<String> {
        if columns.is_empty() {
            return Ok("*".to_string());
        }
        let cols = columns
            .iter()
            .map(|c| {
                let quoted = quote_pg(&c.name)?;
                if NATIVE_TYPES.contains(&c.data_type.as_str()) {
                    Ok(quoted)
                } else {
                    Ok(format!("{}::text AS {}", quoted, quoted))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(cols.join(", "))
    }
}

fn target_type<'a>(columns: &'a [ColumnInfo], name: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.data_type.as_str())
        .filter(|t| !t.is_empty())
}

/// Placeholder text for `value` written into a column of catalog type
/// `target`, pushing the bound parameter onto `params` unless it is NULL.
fn bind(value: &Value, target: Option<&str>, params: &mut Vec<Value>) -> String {
    let native = match value {
        Value::Null => return "NULL".to_string(),
        Value::Bool(_) => "boolean",
        Value::Integer(_) => "int8",
        Value::Decimal(_) => "numeric",
        Value::Text(_) => "text",
    };

    match target {
        Some(ty) if !assigns_to(native, ty) && validate_type_declaration(ty).is_ok() => {
            params.push(Value::Text(value.to_string()));
            format!("CAST(${}::text AS {})", params.len(), ty)
        }
        _ => {
            params.push(value.clone());
            format!("${}::{}", params.len(), native)
        }
    }
}

/// Whether a parameter cast to `native` is accepted by a `target` column as is.
fn assigns_to(native: &str, target: &str) -> bool {
    if TEXT_TYPES.contains(&target) {
        return true;
    }
    match native {
        "boolean" => target == "boolean",
        "int8" | "numeric" => NUMBER_TYPES.contains(&target),
        _ => false,
    }
}
