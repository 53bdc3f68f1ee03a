//! Auxiliary JSON blobs
//!
//! Small preference-style values stored next to the database in single
//! slots. They are outside the transaction machinery: a store overwrites
//! the slot directly. A blob that fails to parse is not fatal; the caller
//! gets the type's default and a warning is logged.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::errors::{DbError, DbResult};
use super::shared::Shared;

impl Shared {
    pub(crate) fn load_aux<T>(&self, name: &str) -> DbResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(text) = self.slots.get(&self.names.aux(name))? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(blob = name, error = %e, "corrupt auxiliary blob; using default");
                Ok(T::default())
            }
        }
    }

    pub(crate) fn store_aux<T: Serialize>(&self, name: &str, value: &T) -> DbResult<()> {
        let text = serde_json::to_string(value).map_err(|e| DbError::Aux {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.slots.set(&self.names.aux(name), &text)?;
        Ok(())
    }

    pub(crate) fn remove_aux(&self, name: &str) -> DbResult<()> {
        self.slots.remove(&self.names.aux(name))?;
        Ok(())
    }
}
