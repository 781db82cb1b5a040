//! Table definition DSL.
//!
//! Every column method returns a [`ColumnBuilder`] bound to the column it
//! just added, so modifiers always apply to that column:
//!
//! ```ignore
//! let mut table = Blueprint::new("users");
//! table.id();
//! table.string("email").unique();
//! table.boolean("is_active").default(true);
//! table.datetime("email_verified_at").nullable();
//! table.timestamps();
//! table.foreign("team_id").references("id", "teams").on_delete(ReferentialAction::Cascade);
//! table.create(&db)?;
//! ```

use crate::db::{DbError, DbHandle};
use crate::sql::ddl::{
    AlterTable, ColumnDef, CreateTable, DefaultValue, IndexKind, ReferentialAction,
    TableConstraint,
};
use crate::sql::{ColumnType, Dialect, SqlDialect};

use super::{SchemaError, SchemaResult};

/// Storage engine used when none is set.
pub const DEFAULT_ENGINE: &str = "InnoDB";

#[derive(Debug, Clone)]
struct IndexSpec {
    kind: IndexKind,
    name: String,
    columns: Vec<String>,
}

#[derive(Debug, Clone)]
struct ForeignKeySpec {
    column: String,
    references: Option<(String, String)>,
    on_delete: Option<ReferentialAction>,
    on_update: Option<ReferentialAction>,
}

/// Accumulated column, index and foreign key definitions for one table.
///
/// A blueprint is consumed by [`Blueprint::create`] or [`Blueprint::build`].
#[derive(Debug, Clone)]
pub struct Blueprint {
    table: String,
    engine: String,
    columns: Vec<ColumnDef>,
    primary: Vec<String>,
    indexes: Vec<IndexSpec>,
    foreign_keys: Vec<ForeignKeySpec>,
}

impl Blueprint {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            engine: DEFAULT_ENGINE.to_string(),
            columns: Vec::new(),
            primary: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Set the storage engine.
    pub fn engine(&mut self, engine: impl Into<String>) -> &mut Self {
        self.engine = engine.into();
        self
    }

    // ========================================================================
    // Columns
    // ========================================================================

    fn add(&mut self, column: ColumnDef) -> ColumnBuilder<'_> {
        self.columns.push(column);
        let index = self.columns.len() - 1;
        ColumnBuilder {
            blueprint: self,
            index,
        }
    }

    /// `id BIGINT UNSIGNED AUTO_INCREMENT` primary key.
    pub fn id(&mut self) -> ColumnBuilder<'_> {
        self.primary.push("id".to_string());
        self.add(
            ColumnDef::new("id", ColumnType::BigInteger)
                .unsigned()
                .auto_increment(),
        )
    }

    /// `VARCHAR(255)`.
    pub fn string(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.string_with_length(name, 255)
    }

    pub fn string_with_length(&mut self, name: impl Into<String>, length: u16) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Varchar(length)))
    }

    pub fn text(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Text))
    }

    pub fn medium_text(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::MediumText))
    }

    pub fn long_text(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::LongText))
    }

    /// `TINYINT(1)`.
    pub fn boolean(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Boolean))
    }

    /// `DECIMAL(8,2)`.
    pub fn decimal(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.decimal_with_precision(name, 8, 2)
    }

    pub fn decimal_with_precision(
        &mut self,
        name: impl Into<String>,
        total: u8,
        places: u8,
    ) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Decimal(total, places)))
    }

    pub fn float(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Float))
    }

    pub fn double(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Double))
    }

    pub fn json(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Json))
    }

    pub fn jsonb(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Jsonb))
    }

    /// `ENUM('a','b',...)`.
    pub fn enumeration(
        &mut self,
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = impl Into<String>>,
    ) -> ColumnBuilder<'_> {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.add(ColumnDef::new(name, ColumnType::Enum(allowed)))
    }

    pub fn date(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Date))
    }

    pub fn datetime(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::DateTime))
    }

    /// `INT`.
    pub fn integer(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Integer))
    }

    /// `BIGINT`.
    pub fn big_integer(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::BigInteger))
    }

    /// Nullable `TIMESTAMP`.
    pub fn timestamp(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.add(ColumnDef::new(name, ColumnType::Timestamp).null())
    }

    /// Nullable `created_at` and `updated_at`.
    pub fn timestamps(&mut self) -> &mut Self {
        self.timestamp("created_at");
        self.timestamp("updated_at");
        self
    }

    // ========================================================================
    // Indexes and foreign keys
    // ========================================================================

    fn push_index(&mut self, kind: IndexKind, columns: Vec<String>, name: Option<String>) {
        if columns.is_empty() {
            return;
        }
        let name = name
            .unwrap_or_else(|| format!("{}_{}_{}", self.table, columns.join("_"), kind.suffix()));
        self.indexes.push(IndexSpec {
            kind,
            name,
            columns,
        });
    }

    /// Composite index of the given kind. An empty column list adds nothing.
    pub fn add_index(
        &mut self,
        kind: IndexKind,
        columns: impl IntoIterator<Item = impl Into<String>>,
        name: Option<&str>,
    ) -> &mut Self {
        let columns = columns.into_iter().map(Into::into).collect();
        self.push_index(kind, columns, name.map(str::to_string));
        self
    }

    pub fn unique(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.add_index(IndexKind::Unique, columns, None)
    }

    pub fn index(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.add_index(IndexKind::Index, columns, None)
    }

    pub fn full_text(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.add_index(IndexKind::FullText, columns, None)
    }

    pub fn spatial(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.add_index(IndexKind::Spatial, columns, None)
    }

    /// Start a foreign key on `column`.
    pub fn foreign(&mut self, column: impl Into<String>) -> ForeignKeyBuilder<'_> {
        self.foreign_keys.push(ForeignKeySpec {
            column: column.into(),
            references: None,
            on_delete: None,
            on_update: None,
        });
        let index = self.foreign_keys.len() - 1;
        ForeignKeyBuilder {
            blueprint: self,
            index,
        }
    }

    // ========================================================================
    // Lowering
    // ========================================================================

    /// Whether an index of `kind` can be emitted, logging when it is skipped.
    fn index_supported(&self, index: &IndexSpec, dialect: Dialect, server_version: &str) -> bool {
        if !dialect.supports_index_kind(index.kind) {
            tracing::warn!(
                table = %self.table,
                index = %index.name,
                dialect = %dialect,
                "skipping index not supported by dialect"
            );
            return false;
        }
        if index.kind == IndexKind::FullText
            && dialect == Dialect::MySql
            && self.engine.eq_ignore_ascii_case("InnoDB")
            && version_below(server_version, 5, 6)
        {
            tracing::warn!(
                table = %self.table,
                index = %index.name,
                server_version,
                "skipping FULLTEXT index, InnoDB does not support it before MySQL 5.6"
            );
            return false;
        }
        true
    }

    fn index_constraints(&self, dialect: Dialect, server_version: &str) -> Vec<TableConstraint> {
        self.indexes
            .iter()
            .filter(|index| self.index_supported(index, dialect, server_version))
            .map(|index| TableConstraint::index(index.kind, index.name.clone(), index.columns.clone()))
            .collect()
    }

    fn foreign_key_constraints(&self) -> SchemaResult<Vec<TableConstraint>> {
        self.foreign_keys
            .iter()
            .map(|fk| {
                let (column, table) = fk
                    .references
                    .clone()
                    .ok_or_else(|| SchemaError::IncompleteForeignKey {
                        table: self.table.clone(),
                        column: fk.column.clone(),
                    })?;
                Ok(TableConstraint::ForeignKey {
                    name: format!("fk_{}_{}", self.table, fk.column),
                    columns: vec![fk.column.clone()],
                    references_table: table,
                    references_columns: vec![column],
                    on_delete: fk.on_delete,
                    on_update: fk.on_update,
                })
            })
            .collect()
    }

    /// CREATE TABLE for this blueprint.
    ///
    /// `server_version` feeds the FULLTEXT capability check.
    pub fn to_create_table(&self, dialect: Dialect, server_version: &str) -> SchemaResult<CreateTable> {
        let mut create = CreateTable::new(self.table.clone())
            .columns(self.columns.iter().cloned())
            .engine(self.engine.clone());
        if !self.primary.is_empty() {
            create = create.constraint(TableConstraint::primary_key(self.primary.iter().cloned()));
        }
        for index in self.index_constraints(dialect, server_version) {
            create = create.constraint(index);
        }
        for fk in self.foreign_key_constraints()? {
            create = create.constraint(fk);
        }
        Ok(create)
    }

    /// ALTER TABLE adding this blueprint's columns, indexes and foreign keys.
    pub fn to_alter_table(&self, dialect: Dialect, server_version: &str) -> SchemaResult<AlterTable> {
        let mut alter = AlterTable::new(self.table.clone());
        for column in &self.columns {
            let mut column = column.clone();
            // Primary keys cannot be added to an existing table
            column.auto_increment = false;
            alter = alter.add_column(column);
        }
        for index in self.index_constraints(dialect, server_version) {
            alter = alter.add_constraint(index);
        }
        let foreign_keys = self.foreign_key_constraints()?;
        if dialect.supports_alter_foreign_keys() {
            for fk in foreign_keys {
                alter = alter.add_constraint(fk);
            }
        } else if !foreign_keys.is_empty() {
            tracing::warn!(
                table = %self.table,
                count = foreign_keys.len(),
                dialect = %dialect,
                "skipping foreign keys, dialect cannot add them to an existing table"
            );
        }
        Ok(alter)
    }

    /// Execute CREATE TABLE (plus any separate index statements).
    pub fn create(self, db: &DbHandle) -> SchemaResult<()> {
        let dialect = db.dialect();
        let statements = self
            .to_create_table(dialect, &db.server_version())?
            .to_statements(dialect);
        self.execute_all(db, &statements)
            .map_err(|source| SchemaError::CreateFailed {
                table: self.table.clone(),
                source,
            })
    }

    /// Execute ALTER TABLE for the accumulated definitions.
    pub fn build(self, db: &DbHandle) -> SchemaResult<()> {
        let dialect = db.dialect();
        let statements = self
            .to_alter_table(dialect, &db.server_version())?
            .to_statements(dialect);
        self.execute_all(db, &statements)
            .map_err(|source| SchemaError::AlterFailed {
                table: self.table.clone(),
                source,
            })
    }

    fn execute_all(&self, db: &DbHandle, statements: &[String]) -> Result<(), DbError> {
        for sql in statements {
            tracing::debug!(table = %self.table, sql = %sql, "executing DDL");
            if let Err(e) = db.exec_batch(sql) {
                tracing::error!(table = %self.table, sql = %sql, error = %e, "DDL failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// `true` when `version` (e.g. `5.5.62-log`) is older than `major.minor`.
///
/// Versions that do not start with a number compare as new enough.
fn version_below(version: &str, major: u32, minor: u32) -> bool {
    let mut parts = version.split(|c: char| !c.is_ascii_digit());
    let parsed_major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let parsed_minor = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    match parsed_major {
        Some(v) => (v, parsed_minor) < (major, minor),
        None => false,
    }
}

// ============================================================================
// Column and foreign key handles
// ============================================================================

/// Modifier handle for the column just added to a [`Blueprint`].
pub struct ColumnBuilder<'a> {
    blueprint: &'a mut Blueprint,
    index: usize,
}

impl ColumnBuilder<'_> {
    fn def(&mut self) -> &mut ColumnDef {
        &mut self.blueprint.columns[self.index]
    }

    pub fn name(&self) -> &str {
        &self.blueprint.columns[self.index].name
    }

    pub fn nullable(mut self) -> Self {
        self.def().nullable = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.def().unsigned = true;
        self
    }

    /// Literal default. Booleans on `TINYINT(1)` columns render as `1`/`0`.
    pub fn default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.def().default = Some(value.into());
        self
    }

    /// Make this column (part of) the primary key.
    pub fn primary(self) -> Self {
        let name = self.name().to_string();
        if !self.blueprint.primary.contains(&name) {
            self.blueprint.primary.push(name);
        }
        self
    }

    fn single_index(self, kind: IndexKind, name: Option<&str>) -> Self {
        let column = self.name().to_string();
        self.blueprint
            .push_index(kind, vec![column], name.map(str::to_string));
        self
    }

    /// `{table}_{column}_unique`.
    pub fn unique(self) -> Self {
        self.single_index(IndexKind::Unique, None)
    }

    pub fn unique_named(self, name: &str) -> Self {
        self.single_index(IndexKind::Unique, Some(name))
    }

    /// `{table}_{column}_index`.
    pub fn index(self) -> Self {
        self.single_index(IndexKind::Index, None)
    }

    pub fn index_named(self, name: &str) -> Self {
        self.single_index(IndexKind::Index, Some(name))
    }

    /// `{table}_{column}_fulltext`.
    pub fn full_text(self) -> Self {
        self.single_index(IndexKind::FullText, None)
    }

    /// `{table}_{column}_spatial`.
    pub fn spatial(self) -> Self {
        self.single_index(IndexKind::Spatial, None)
    }
}

/// Builder for a foreign key started with [`Blueprint::foreign`].
///
/// The constraint is named `fk_{table}_{column}`.
pub struct ForeignKeyBuilder<'a> {
    blueprint: &'a mut Blueprint,
    index: usize,
}

impl ForeignKeyBuilder<'_> {
    fn spec(&mut self) -> &mut ForeignKeySpec {
        &mut self.blueprint.foreign_keys[self.index]
    }

    /// Referenced `column` of `table`.
    pub fn references(mut self, column: impl Into<String>, table: impl Into<String>) -> Self {
        self.spec().references = Some((column.into(), table.into()));
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.spec().on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.spec().on_update = Some(action);
        self
    }
}
