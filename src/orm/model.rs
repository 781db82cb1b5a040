//! ActiveRecord-style model.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::entity::Entity;
use super::{ModelError, ModelResult};
use crate::db::{DbHandle, Row, Value};
use crate::query::{Operand, QueryBuilder};

/// One row of `E`'s table.
///
/// Tracks the attributes as loaded (`original`) so `save` only writes what
/// changed. A model built from a fetched row is never dirty.
pub struct Model<E: Entity> {
    db: DbHandle,
    attributes: Row,
    original: Row,
    exists: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Model<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            attributes: self.attributes.clone(),
            original: self.original.clone(),
            exists: self.exists,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("table", &E::table())
            .field("attributes", &self.attributes)
            .field("exists", &self.exists)
            .finish()
    }
}

/// A page of results.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(bound = "")]
pub struct Page<E: Entity> {
    pub data: Vec<Model<E>>,
    pub total: i64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
}

impl<E: Entity> Model<E> {
    /// An empty, unsaved model.
    pub fn new(db: &DbHandle) -> Self {
        Self {
            db: db.clone(),
            attributes: Row::new(),
            original: Row::new(),
            exists: false,
            _entity: PhantomData,
        }
    }

    /// An unsaved model filled with the fillable subset of `attributes`.
    pub fn make<K, V>(db: &DbHandle, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut model = Self::new(db);
        model.fill(attributes);
        model
    }

    pub fn table() -> String {
        E::table()
    }

    /// A query builder on this model's table.
    pub fn query(db: &DbHandle) -> QueryBuilder {
        QueryBuilder::table(db.clone(), E::table())
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Wrap fetched rows as persisted models.
    pub fn hydrate(db: &DbHandle, rows: Vec<Row>) -> Vec<Self> {
        rows.into_iter()
            .map(|row| Self {
                db: db.clone(),
                original: row.clone(),
                attributes: row,
                exists: true,
                _entity: PhantomData,
            })
            .collect()
    }

    /// Run `query` and hydrate every row.
    pub fn all_from(query: &QueryBuilder) -> ModelResult<Vec<Self>> {
        let db = query.db().clone();
        Ok(Self::hydrate(&db, query.get()?))
    }

    /// Run `query` and hydrate the first row.
    pub fn first_from(query: &QueryBuilder) -> ModelResult<Option<Self>> {
        let db = query.db().clone();
        Ok(query
            .first()?
            .and_then(|row| Self::hydrate(&db, vec![row]).pop()))
    }

    pub fn all(db: &DbHandle) -> ModelResult<Vec<Self>> {
        Self::all_from(&Self::query(db))
    }

    pub fn find(db: &DbHandle, id: impl Into<Value>) -> ModelResult<Option<Self>> {
        Self::first_from(&Self::query(db).where_eq(E::PRIMARY_KEY, id))
    }

    /// Like [`Model::find`], but a missing row is `ModelError::NotFound`.
    pub fn find_or_fail(db: &DbHandle, id: impl Into<Value>) -> ModelResult<Self> {
        let id = id.into();
        Self::find(db, id.clone())?.ok_or_else(|| ModelError::NotFound {
            model: E::table(),
            id: id.to_string(),
        })
    }

    /// Start a filtered query.
    pub fn where_(
        db: &DbHandle,
        column: &str,
        operator: &str,
        value: impl Into<Operand>,
    ) -> ModelResult<QueryBuilder> {
        Ok(Self::query(db).where_(column, operator, value)?)
    }

    pub fn where_like(db: &DbHandle, column: &str, pattern: &str) -> QueryBuilder {
        Self::query(db).where_like(column, pattern)
    }

    /// One page of the table.
    pub fn paginate(db: &DbHandle, per_page: u64, page: u64) -> ModelResult<Page<E>> {
        Self::paginate_query(&Self::query(db), per_page, page)
    }

    /// One page of `query`. Pages are 1-based; anything below 1 is page 1.
    pub fn paginate_query(query: &QueryBuilder, per_page: u64, page: u64) -> ModelResult<Page<E>> {
        let per_page = per_page.max(1);
        let page = page.max(1);

        let total = query.count()?;
        let data = Self::all_from(
            &query
                .clone()
                .limit(per_page)
                .offset((page - 1) * per_page),
        )?;

        let total_rows = u64::try_from(total).unwrap_or(0);
        Ok(Page {
            data,
            total,
            per_page,
            current_page: page,
            last_page: total_rows.div_ceil(per_page),
        })
    }

    /// Values of one column, optionally filtered by equality conditions.
    pub fn pluck<K, V>(
        db: &DbHandle,
        column: &str,
        conditions: impl IntoIterator<Item = (K, V)>,
    ) -> ModelResult<Vec<Value>>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Ok(Self::query(db)
            .select([column])
            .where_all(conditions)
            .get_column()?)
    }

    /// Distinct values of one column.
    pub fn distinct(db: &DbHandle, column: &str) -> ModelResult<Vec<Value>> {
        Ok(Self::query(db).select([column]).distinct().get_column()?)
    }

    /// A random row.
    pub fn random(db: &DbHandle) -> ModelResult<Option<Self>> {
        Self::first_from(&Self::query(db).in_random_order())
    }

    // =========================================================================
    // Creating
    // =========================================================================

    /// Fill and save a new model.
    pub fn create<K, V>(db: &DbHandle, attributes: impl IntoIterator<Item = (K, V)>) -> ModelResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut model = Self::make(db, attributes);
        model.save()?;
        Ok(model)
    }

    /// Insert raw rows in one statement.
    pub fn insert_many(db: &DbHandle, rows: &[Row]) -> ModelResult<u64> {
        Ok(Self::query(db).insert_many(rows)?)
    }

    /// Fill and save the row with `id`. `false` when there is no such row.
    pub fn update_by_id<K, V>(
        db: &DbHandle,
        id: impl Into<Value>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> ModelResult<bool>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        match Self::find(db, id)? {
            Some(mut model) => {
                model.fill(attributes);
                model.save()
            }
            None => Ok(false),
        }
    }

    /// Update the first row matching `attributes` with `values`, or create it.
    pub fn update_or_create(db: &DbHandle, attributes: Row, values: Row) -> ModelResult<Self> {
        match Self::first_from(&Self::query(db).where_all(attributes.clone()))? {
            Some(mut model) => {
                model.fill(values);
                model.save()?;
                Ok(model)
            }
            None => Self::create(db, attributes.into_iter().chain(values)),
        }
    }

    /// The first row matching `attributes`, or a newly created one.
    pub fn first_or_create(db: &DbHandle, attributes: Row, values: Row) -> ModelResult<Self> {
        match Self::first_from(&Self::query(db).where_all(attributes.clone()))? {
            Some(model) => Ok(model),
            None => Self::create(db, attributes.into_iter().chain(values)),
        }
    }

    /// The first row matching `attributes`, or an unsaved model.
    pub fn first_or_new(db: &DbHandle, attributes: Row, values: Row) -> ModelResult<Self> {
        match Self::first_from(&Self::query(db).where_all(attributes.clone()))? {
            Some(model) => Ok(model),
            None => Ok(Self::make(db, attributes.into_iter().chain(values))),
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Whether the model is backed by a row.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    /// Apply the fillable subset of `attributes`. Others are skipped.
    pub fn fill<K, V>(&mut self, attributes: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in attributes {
            let key = key.into();
            if E::is_fillable(&key) {
                self.set_attribute(key, value.into());
            }
        }
        self
    }

    /// Assign one attribute, failing when it is not fillable.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> ModelResult<()> {
        if !E::is_fillable(key) {
            return Err(ModelError::NotFillable(key.to_string()));
        }
        self.set_attribute(key.to_string(), value.into());
        Ok(())
    }

    /// Assign through the mutator, bypassing the fillable check.
    pub fn set_attribute(&mut self, key: String, value: Value) {
        let value = E::fields().write(&key, value);
        self.attributes.insert(key, value);
    }

    /// Read through the accessor. Missing attributes are `Null`.
    pub fn get(&self, key: &str) -> Value {
        match self.attributes.get(key) {
            Some(value) => E::fields().read(key, value),
            None => Value::Null,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.attributes.get(key).is_some_and(|v| !v.is_null())
    }

    /// Remove an attribute from both the current and original snapshot.
    pub fn unset(&mut self, key: &str) {
        self.attributes.remove(key);
        self.original.remove(key);
    }

    pub fn key(&self) -> Value {
        self.get(E::PRIMARY_KEY)
    }

    /// Fillable attributes that differ from the loaded snapshot.
    pub fn dirty(&self) -> Row {
        self.attributes
            .iter()
            .filter(|(key, value)| self.original.get(*key) != Some(*value))
            .filter(|(key, _)| E::is_fillable(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    /// Raw attributes.
    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    /// Attributes as read through the accessors.
    pub fn to_array(&self) -> Row {
        let fields = E::fields();
        self.attributes
            .iter()
            .map(|(k, v)| (k.clone(), fields.read(k, v)))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.to_array()
                .into_iter()
                .map(|(k, v)| (k, v.to_json()))
                .collect(),
        )
    }

    fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Insert or update the dirty attributes.
    ///
    /// Nothing dirty means no SQL and `Ok(true)`.
    pub fn save(&mut self) -> ModelResult<bool> {
        let dirty = self.dirty();
        if dirty.is_empty() {
            return Ok(true);
        }

        let result = if self.exists {
            self.perform_update(dirty)
        } else {
            self.perform_insert()
        };

        result.map_err(|source| {
            tracing::error!(
                table = %E::table(),
                attributes = ?self.attributes,
                error = %source,
                "failed to save model"
            );
            ModelError::SaveFailed {
                table: E::table(),
                source,
            }
        })
    }

    fn perform_update(&mut self, dirty: Row) -> Result<bool, crate::query::QueryError> {
        let affected = Self::query(&self.db)
            .where_eq(E::PRIMARY_KEY, self.key())
            .update(dirty)?;
        if affected > 0 {
            self.sync_original();
        }
        Ok(affected > 0)
    }

    fn perform_insert(&mut self) -> Result<bool, crate::query::QueryError> {
        let row: BTreeMap<String, Value> = self
            .attributes
            .iter()
            .filter(|(key, _)| E::is_fillable(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match Self::query(&self.db).insert_get_id(row)? {
            Some(id) => {
                self.attributes
                    .insert(E::PRIMARY_KEY.to_string(), Value::Int(id));
                self.exists = true;
                self.sync_original();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fill and save. `false` for a model that was never persisted.
    pub fn update<K, V>(&mut self, attributes: impl IntoIterator<Item = (K, V)>) -> ModelResult<bool>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        if !self.exists {
            return Ok(false);
        }
        self.fill(attributes);
        self.save()
    }

    /// Delete the backing row. An unsaved model is a successful no-op.
    pub fn delete(&mut self) -> ModelResult<bool> {
        if !self.exists {
            return Ok(true);
        }
        let affected = Self::query(&self.db)
            .where_eq(E::PRIMARY_KEY, self.key())
            .delete()?;
        if affected > 0 {
            self.exists = false;
        }
        Ok(affected > 0)
    }

    /// `column = column + amount` on this row, mirrored locally.
    pub fn increment(&mut self, column: &str, amount: i64) -> ModelResult<u64> {
        self.adjust(column, amount)
    }

    /// `column = column - amount` on this row, mirrored locally.
    pub fn decrement(&mut self, column: &str, amount: i64) -> ModelResult<u64> {
        self.adjust(column, -amount)
    }

    fn adjust(&mut self, column: &str, delta: i64) -> ModelResult<u64> {
        let query = Self::query(&self.db).where_eq(E::PRIMARY_KEY, self.key());
        let affected = if delta >= 0 {
            query.increment(column, delta)?
        } else {
            query.decrement(column, -delta)?
        };
        if affected > 0 {
            let current = self.attributes.get(column).and_then(Value::as_i64).unwrap_or(0);
            let updated = Value::Int(current + delta);
            self.attributes.insert(column.to_string(), updated.clone());
            self.original.insert(column.to_string(), updated);
        }
        Ok(affected)
    }
}

impl<E: Entity> Serialize for Model<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let array = self.to_array();
        let mut map = serializer.serialize_map(Some(array.len()))?;
        for (k, v) in &array {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
