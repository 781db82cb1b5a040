//! ActiveRecord ORM on top of the query builder.
//!
//! A model type is a marker implementing [`Entity`]; rows are
//! [`Model<E>`] values carrying their attributes, a snapshot of what was
//! loaded, and the connection they came from.
//!
//! ```ignore
//! pub struct User;
//! impl Entity for User {
//!     const FILLABLE: &'static [&'static str] = &["name", "email"];
//! }
//!
//! let mut user = Model::<User>::create(&db, [("name", "Ada"), ("email", "ada@example.com")])?;
//! user.set("name", "Ada Lovelace")?;
//! user.save()?;
//! let posts = user.has_many::<Post>("user_id")?;
//! ```

mod entity;
mod model;
mod relations;

pub use entity::{table_for_type, Entity, FieldDescriptor, FieldTable, Getter, Setter};
pub use model::{Model, Page};

use crate::query::QueryError;

/// Errors raised by models.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{model} with ID {id} not found")]
    NotFound { model: String, id: String },

    #[error("Attribute '{0}' is not fillable")]
    NotFillable(String),

    #[error("Failed to save model in {table}: {source}")]
    SaveFailed { table: String, source: QueryError },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ModelError {
    /// Whether this is a missing-row error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
