//! Relationships.
//!
//! Relations run their query immediately and return loaded models; there
//! is no lazy proxy.

use super::entity::Entity;
use super::model::Model;
use super::ModelResult;

impl<E: Entity> Model<E> {
    /// Rows of `R` whose `foreign_key` equals this model's key.
    pub fn has_many<R: Entity>(&self, foreign_key: &str) -> ModelResult<Vec<Model<R>>> {
        let query = Model::<R>::query(self.db()).where_eq(foreign_key, self.key());
        Model::<R>::all_from(&query)
    }

    /// The `R` whose key equals this model's `foreign_key` attribute.
    pub fn belongs_to<R: Entity>(&self, foreign_key: &str) -> ModelResult<Option<Model<R>>> {
        let owner = self.get(foreign_key);
        if owner.is_null() {
            return Ok(None);
        }
        let query = Model::<R>::query(self.db()).where_eq(R::PRIMARY_KEY, owner);
        Model::<R>::first_from(&query)
    }

    /// Rows of `R` linked through `pivot`.
    ///
    /// `foreign_key` is the pivot column holding this model's key and
    /// `related_key` the pivot column holding `R`'s key.
    pub fn belongs_to_many<R: Entity>(
        &self,
        pivot: &str,
        foreign_key: &str,
        related_key: &str,
    ) -> ModelResult<Vec<Model<R>>> {
        let related = R::table();
        let query = Model::<R>::query(self.db())
            .select([format!("{}.*", related)])
            .join(
                pivot,
                format!("{}.{}", pivot, related_key),
                "=",
                format!("{}.{}", related, R::PRIMARY_KEY),
            )?
            .where_eq(format!("{}.{}", pivot, foreign_key), self.key());
        Model::<R>::all_from(&query)
    }
}
