//! Per-model declarations: table, key, fillable list and field accessors.

use std::collections::HashMap;

use inflector::Inflector;

use crate::db::Value;

/// Transform applied when reading an attribute.
pub type Getter = fn(&Value) -> Value;

/// Transform applied when writing an attribute.
pub type Setter = fn(Value) -> Value;

/// Accessor and mutator for one attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldDescriptor {
    pub get: Option<Getter>,
    pub set: Option<Setter>,
}

/// Attribute name to descriptor table.
///
/// Attributes without an entry are stored and returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    fields: HashMap<&'static str, FieldDescriptor>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accessor for `name`.
    pub fn getter(mut self, name: &'static str, get: Getter) -> Self {
        self.fields.entry(name).or_default().get = Some(get);
        self
    }

    /// Register a mutator for `name`.
    pub fn setter(mut self, name: &'static str, set: Setter) -> Self {
        self.fields.entry(name).or_default().set = Some(set);
        self
    }

    /// Apply the accessor for `name`, if any.
    pub fn read(&self, name: &str, value: &Value) -> Value {
        match self.fields.get(name).and_then(|f| f.get) {
            Some(get) => get(value),
            None => value.clone(),
        }
    }

    /// Apply the mutator for `name`, if any.
    pub fn write(&self, name: &str, value: Value) -> Value {
        match self.fields.get(name).and_then(|f| f.set) {
            Some(set) => set(value),
            None => value,
        }
    }
}

/// Static description of a model type.
///
/// ```ignore
/// pub struct Post;
///
/// impl Entity for Post {
///     const FILLABLE: &'static [&'static str] = &["title", "body", "user_id"];
///
///     fn fields() -> FieldTable {
///         FieldTable::new().getter("title", |v| Value::Text(v.to_string().to_title_case()))
///     }
/// }
///
/// let post = Model::<Post>::find(&db, 1)?;
/// ```
pub trait Entity: 'static {
    /// Explicit table name. Derived from the type name when `None`.
    const TABLE: Option<&'static str> = None;

    const PRIMARY_KEY: &'static str = "id";

    /// Attributes open to mass assignment. Empty means unrestricted.
    const FILLABLE: &'static [&'static str] = &[];

    /// Accessors and mutators.
    fn fields() -> FieldTable {
        FieldTable::default()
    }

    /// Table backing this entity.
    fn table() -> String {
        match Self::TABLE {
            Some(table) => table.to_string(),
            None => table_for_type(std::any::type_name::<Self>()),
        }
    }

    fn is_fillable(key: &str) -> bool {
        Self::FILLABLE.is_empty() || Self::FILLABLE.contains(&key)
    }
}

/// `app::models::BlogPost` -> `blog_posts`.
pub fn table_for_type(type_name: &str) -> String {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let short = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    format!("{}s", short.to_snake_case())
}
