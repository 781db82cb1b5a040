//! Fluent query builder.
//!
//! [`QueryBuilder`] accumulates the pieces of a statement and executes it on
//! a [`DbHandle`]. Chaining methods consume and return the builder; terminal
//! methods (`get`, `first`, `count`, `insert`, `update`, `delete`, ...) borrow
//! it, so a builder can be executed more than once.
//!
//! Every value is bound under its own placeholder. WHERE placeholders are
//! `:where_N` where `N` comes from a counter that only ever grows, and list
//! operands expand to `:where_N_0`, `:where_N_1`, ...
//!
//! ```ignore
//! let adults = QueryBuilder::table(db.clone(), "users")
//!     .where_("age", ">=", 18)?
//!     .where_in("role", ["admin", "editor"])
//!     .order_by("name", "asc")
//!     .limit(10)
//!     .get()?;
//! ```

use crate::db::{Bindings, DbError, DbHandle, Row, Value};
use crate::sql::dml::{Delete, Insert, Update};
use crate::sql::query::{Condition, Connector, Join, OrderByExpr, Predicate, Select, SortDir};
pub use crate::sql::query::{JoinType, Operator};
use crate::sql::Dialect;

/// Errors raised while building or running a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid SQL operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid join type: {0}")]
    InvalidJoinType(String),

    #[error("Value for IN/NOT IN on '{0}' must be a list")]
    InvalidInValue(String),

    #[error("{0} without a WHERE clause is not allowed")]
    MissingWhere(&'static str),

    #[error("No table specified")]
    NoTable,

    #[error("Database query failed: {source}")]
    Execution {
        sql: String,
        bindings: Bindings,
        source: DbError,
    },
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Right-hand side of a WHERE/HAVING comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
}

macro_rules! scalar_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Scalar(v.into())
                }
            }
        )*
    };
}

scalar_operand!(Value, bool, i64, i32, u32, f64, &str, String);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Operand {
    fn from(values: [T; N]) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

/// Fluent SELECT/INSERT/UPDATE/DELETE builder bound to a connection.
#[derive(Clone)]
#[must_use = "builders have no effect until a terminal method runs"]
pub struct QueryBuilder {
    db: DbHandle,
    select: Select,
    bindings: Bindings,
    next_binding: usize,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("select", &self.select)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl QueryBuilder {
    /// A builder with no table yet.
    pub fn new(db: DbHandle) -> Self {
        Self {
            db,
            select: Select::default(),
            bindings: Vec::new(),
            next_binding: 0,
        }
    }

    /// A builder targeting `table`.
    pub fn table(db: DbHandle, table: impl Into<String>) -> Self {
        Self::new(db).from(table)
    }

    /// Set the target table.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.select.from = table.into();
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    /// The bindings collected so far.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    // =========================================================================
    // SELECT list
    // =========================================================================

    /// Replace the column list. An empty list selects `*`.
    pub fn select(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select.columns = columns
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| c != "*")
            .collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.select.distinct = true;
        self
    }

    // =========================================================================
    // WHERE
    // =========================================================================

    /// `column operator value`, joined with AND.
    ///
    /// The operator must be one of `=`, `<`, `>`, `<=`, `>=`, `<>`, `!=`,
    /// `LIKE`, `NOT LIKE`, `IN`, `NOT IN`; `IN`/`NOT IN` require a list.
    pub fn where_(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> QueryResult<Self> {
        self.add_where(Connector::And, column.into(), operator, value.into())
    }

    /// `column = value`, joined with AND.
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_compare(Connector::And, column.into(), Operator::Eq, value.into())
    }

    /// Equality on every pair, joined with AND.
    pub fn where_all<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        pairs
            .into_iter()
            .fold(self, |qb, (k, v)| qb.where_eq(k, v))
    }

    /// `column operator value`, joined with OR.
    pub fn or_where(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> QueryResult<Self> {
        self.add_where(Connector::Or, column.into(), operator, value.into())
    }

    /// `column = value`, joined with OR.
    pub fn or_where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_compare(Connector::Or, column.into(), Operator::Eq, value.into())
    }

    pub fn where_in<V: Into<Value>>(
        self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_list(Connector::And, column.into(), false, values)
    }

    pub fn where_not_in<V: Into<Value>>(
        self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_list(Connector::And, column.into(), true, values)
    }

    pub fn where_like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.push_compare(
            Connector::And,
            column.into(),
            Operator::Like,
            Value::Text(pattern.into()),
        )
    }

    fn add_where(
        self,
        connector: Connector,
        column: String,
        operator: &str,
        value: Operand,
    ) -> QueryResult<Self> {
        let operator: Operator = operator.parse().map_err(QueryError::InvalidOperator)?;
        match (operator, value) {
            (Operator::In, Operand::List(values)) => {
                Ok(self.push_list(connector, column, false, values))
            }
            (Operator::NotIn, Operand::List(values)) => {
                Ok(self.push_list(connector, column, true, values))
            }
            (op, Operand::Scalar(_)) if op.is_list() => Err(QueryError::InvalidInValue(column)),
            (_, Operand::List(_)) => Err(QueryError::InvalidOperator(format!(
                "{} does not take a list",
                operator
            ))),
            (op, Operand::Scalar(value)) => Ok(self.push_compare(connector, column, op, value)),
        }
    }

    fn next_placeholder(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.next_binding);
        self.next_binding += 1;
        name
    }

    fn push_compare(
        mut self,
        connector: Connector,
        column: String,
        operator: Operator,
        value: Value,
    ) -> Self {
        let placeholder = self.next_placeholder("where");
        self.bindings.push((placeholder.clone(), value));
        self.select.wheres.push(Predicate {
            connector,
            condition: Condition::Compare {
                column,
                operator,
                placeholder,
            },
        });
        self
    }

    fn push_list(
        mut self,
        connector: Connector,
        column: String,
        negated: bool,
        values: Vec<Value>,
    ) -> Self {
        let base = self.next_placeholder("where");
        let condition = if values.is_empty() {
            // IN () never matches, NOT IN () always does
            Condition::Constant(negated)
        } else {
            let placeholders: Vec<String> = (0..values.len())
                .map(|i| format!("{}_{}", base, i))
                .collect();
            self.bindings
                .extend(placeholders.iter().cloned().zip(values));
            Condition::List {
                column,
                negated,
                placeholders,
            }
        };
        self.select.wheres.push(Predicate {
            connector,
            condition,
        });
        self
    }

    // =========================================================================
    // JOIN
    // =========================================================================

    /// INNER JOIN.
    pub fn join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: &str,
        second: impl Into<String>,
    ) -> QueryResult<Self> {
        self.join_as("INNER", table, first, operator, second)
    }

    pub fn left_join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: &str,
        second: impl Into<String>,
    ) -> QueryResult<Self> {
        self.join_as("LEFT", table, first, operator, second)
    }

    pub fn right_join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: &str,
        second: impl Into<String>,
    ) -> QueryResult<Self> {
        self.join_as("RIGHT", table, first, operator, second)
    }

    /// Join with an explicit type: INNER, LEFT, RIGHT or FULL.
    pub fn join_as(
        mut self,
        join_type: &str,
        table: impl Into<String>,
        first: impl Into<String>,
        operator: &str,
        second: impl Into<String>,
    ) -> QueryResult<Self> {
        let join_type: JoinType = join_type.parse().map_err(QueryError::InvalidJoinType)?;
        let operator: Operator = operator.parse().map_err(QueryError::InvalidOperator)?;
        self.select.joins.push(Join {
            join_type,
            table: table.into(),
            first: first.into(),
            operator,
            second: second.into(),
        });
        Ok(self)
    }

    // =========================================================================
    // GROUP BY / HAVING / ORDER BY / LIMIT
    // =========================================================================

    pub fn group_by(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select
            .group_by
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// `HAVING column operator value`; placeholders are `:having_N`.
    pub fn having(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let operator: Operator = operator.parse().map_err(QueryError::InvalidOperator)?;
        if operator.is_list() {
            return Err(QueryError::InvalidOperator(operator.to_string()));
        }
        let placeholder = self.next_placeholder("having");
        self.bindings.push((placeholder.clone(), value.into()));
        self.select.having.push(Predicate {
            connector: Connector::And,
            condition: Condition::Compare {
                column: column.into(),
                operator,
                placeholder,
            },
        });
        Ok(self)
    }

    /// Order by `column`. Any direction other than `desc` sorts ascending.
    pub fn order_by(mut self, column: impl Into<String>, direction: &str) -> Self {
        self.select.order_by.push(OrderByExpr {
            column: column.into(),
            dir: SortDir::parse_lenient(direction),
        });
        self
    }

    pub fn in_random_order(self) -> Self {
        self.order_by("RAND()", "asc")
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.select.limit = Some(n);
        self
    }

    /// Only emitted when a limit is also set.
    pub fn offset(mut self, n: u64) -> Self {
        self.select.offset = Some(n);
        self
    }

    // =========================================================================
    // SQL
    // =========================================================================

    /// The SELECT statement this builder describes.
    pub fn to_sql(&self) -> QueryResult<String> {
        self.require_table()?;
        Ok(self.select.to_sql(self.dialect()))
    }

    fn require_table(&self) -> QueryResult<&str> {
        if self.select.from.is_empty() {
            Err(QueryError::NoTable)
        } else {
            Ok(&self.select.from)
        }
    }

    fn require_where(&self, statement: &'static str) -> QueryResult<()> {
        if self.select.wheres.is_empty() {
            Err(QueryError::MissingWhere(statement))
        } else {
            Ok(())
        }
    }

    /// Bindings referenced by WHERE clauses only.
    fn where_bindings(&self) -> Bindings {
        self.bindings
            .iter()
            .filter(|(name, _)| name.starts_with("where_"))
            .cloned()
            .collect()
    }

    // =========================================================================
    // Terminals
    // =========================================================================

    /// Every matching row.
    pub fn get(&self) -> QueryResult<Vec<Row>> {
        let sql = self.to_sql()?;
        Ok(self.fetch(sql, self.bindings.clone())?.into_maps())
    }

    /// Values of the first selected column.
    pub fn get_column(&self) -> QueryResult<Vec<Value>> {
        let sql = self.to_sql()?;
        Ok(self.fetch(sql, self.bindings.clone())?.into_first_column())
    }

    /// The first matching row.
    pub fn first(&self) -> QueryResult<Option<Row>> {
        let mut query = self.clone();
        query.select.limit = Some(1);
        Ok(query.get()?.into_iter().next())
    }

    /// `COUNT(*)` over the current filters. Leaves the builder untouched.
    pub fn count(&self) -> QueryResult<i64> {
        let mut query = self.clone();
        query.select.columns = vec!["COUNT(*) as aggregate".to_string()];
        query.select.distinct = false;
        query.select.limit = None;
        query.select.offset = None;
        query.select.order_by.clear();

        let rows = query.get()?;
        Ok(rows
            .first()
            .and_then(|row| row.get("aggregate"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    pub fn exists(&self) -> QueryResult<bool> {
        Ok(self.count()? > 0)
    }

    pub fn doesnt_exist(&self) -> QueryResult<bool> {
        Ok(!self.exists()?)
    }

    /// Insert one row. Placeholders are `:insert_{column}`.
    ///
    /// Returns `false` without touching the database when `row` is empty.
    pub fn insert<K, V>(&self, row: impl IntoIterator<Item = (K, V)>) -> QueryResult<bool>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let table = self.require_table()?;
        let row: Vec<(String, Value)> = row.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        if row.is_empty() {
            return Ok(false);
        }

        let columns: Vec<&String> = row.iter().map(|(c, _)| c).collect();
        let statement = Insert::into(table)
            .columns(columns.iter().map(|c| c.as_str()))
            .row(columns.iter().map(|c| format!("insert_{}", c)));
        let bindings = row
            .iter()
            .map(|(c, v)| (format!("insert_{}", c), v.clone()))
            .collect();

        let affected = self.run(statement.to_sql(self.dialect()), bindings)?;
        Ok(affected > 0)
    }

    /// Insert several rows in one statement.
    ///
    /// The column list comes from the first row; rows missing a column bind NULL.
    pub fn insert_many(&self, rows: &[Row]) -> QueryResult<u64> {
        let table = self.require_table()?;
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        let columns: Vec<String> = first.keys().cloned().collect();

        let mut statement = Insert::into(table).columns(columns.iter().cloned());
        let mut bindings = Vec::with_capacity(rows.len() * columns.len());
        for (i, row) in rows.iter().enumerate() {
            let names: Vec<String> = columns
                .iter()
                .map(|c| format!("insert_{}_{}", i, c))
                .collect();
            for (name, column) in names.iter().zip(&columns) {
                bindings.push((name.clone(), row.get(column).cloned().unwrap_or_default()));
            }
            statement = statement.row(names);
        }

        self.run(statement.to_sql(self.dialect()), bindings)
    }

    /// Insert one row and return the generated id.
    pub fn insert_get_id<K, V>(&self, row: impl IntoIterator<Item = (K, V)>) -> QueryResult<Option<i64>>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        if !self.insert(row)? {
            return Ok(None);
        }
        let id = self.db.last_insert_id().map_err(|source| QueryError::Execution {
            sql: "last_insert_id".into(),
            bindings: Vec::new(),
            source,
        })?;
        Ok(Some(id))
    }

    /// Update matching rows. Placeholders are `:update_{column}`.
    ///
    /// Fails with `MissingWhere` when no WHERE clause is set.
    pub fn update<K, V>(&self, row: impl IntoIterator<Item = (K, V)>) -> QueryResult<u64>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let table = self.require_table()?;
        self.require_where("Update")?;

        let row: Vec<(String, Value)> = row.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        if row.is_empty() {
            return Ok(0);
        }

        let mut statement = Update::table(table).filter(self.select.wheres.clone());
        let mut bindings = Vec::with_capacity(row.len());
        for (column, value) in row {
            let placeholder = format!("update_{}", column);
            statement = statement.set(column, placeholder.clone());
            bindings.push((placeholder, value));
        }
        bindings.extend(self.where_bindings());

        self.run(statement.to_sql(self.dialect()), bindings)
    }

    /// `column = column + amount` on matching rows.
    pub fn increment(&self, column: impl Into<String>, amount: i64) -> QueryResult<u64> {
        self.adjust(column.into(), amount, false)
    }

    /// `column = column - amount` on matching rows.
    pub fn decrement(&self, column: impl Into<String>, amount: i64) -> QueryResult<u64> {
        self.adjust(column.into(), amount, true)
    }

    fn adjust(&self, column: String, amount: i64, negative: bool) -> QueryResult<u64> {
        let table = self.require_table()?;
        self.require_where(if negative { "Decrement" } else { "Increment" })?;

        let statement = Update::table(table)
            .adjust(column, "amount", negative)
            .filter(self.select.wheres.clone());
        let mut bindings = vec![("amount".to_string(), Value::Int(amount))];
        bindings.extend(self.where_bindings());

        self.run(statement.to_sql(self.dialect()), bindings)
    }

    /// Delete matching rows.
    ///
    /// Fails with `MissingWhere` when no WHERE clause is set.
    pub fn delete(&self) -> QueryResult<u64> {
        let table = self.require_table()?;
        self.require_where("Delete")?;

        let statement = Delete::from(table).filter(self.select.wheres.clone());
        self.run(statement.to_sql(self.dialect()), self.where_bindings())
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn run(&self, sql: String, bindings: Bindings) -> QueryResult<u64> {
        tracing::debug!(sql = %sql, "execute");
        match self.db.execute(&sql, &bindings) {
            Ok(affected) => Ok(affected),
            Err(source) => Err(execution_error(sql, bindings, source)),
        }
    }

    fn fetch(&self, sql: String, bindings: Bindings) -> QueryResult<crate::db::ResultSet> {
        tracing::debug!(sql = %sql, "fetch");
        match self.db.fetch_all(&sql, &bindings) {
            Ok(rows) => Ok(rows),
            Err(source) => Err(execution_error(sql, bindings, source)),
        }
    }
}

fn execution_error(sql: String, bindings: Bindings, source: DbError) -> QueryError {
    tracing::error!(sql = %sql, bindings = ?bindings, error = %source, "query failed");
    QueryError::Execution {
        sql,
        bindings,
        source,
    }
}
