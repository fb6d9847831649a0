use std::sync::Arc;

use lariat_core::store::Result;
use lariat_core::{Alphabet, LinkStore};

/// Tracks how much of each length's keyspace has been issued.
///
/// The issued count comes straight from the store and includes banned
/// and expired rows: their codes are never reissued, so they consume
/// capacity permanently. The service consults this before generating a
/// candidate, both to fail fast with a dedicated error and to keep the
/// collision-retry loop from spinning forever on a full pool.
#[derive(Debug, Clone)]
pub struct CapacityTracker<S> {
    store: Arc<S>,
    alphabet: Alphabet,
}

impl<S: LinkStore> CapacityTracker<S> {
    pub fn new(store: Arc<S>, alphabet: Alphabet) -> Self {
        Self { store, alphabet }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Whether every code of `length` has already been issued.
    ///
    /// Lengths whose keyspace exceeds `u64` are never exhausted.
    pub async fn is_exhausted(&self, length: u32) -> Result<bool> {
        let Some(capacity) = self.alphabet.capacity(length) else {
            return Ok(false);
        };
        let issued = self.store.count_with_length(length).await?;
        Ok(issued >= capacity)
    }
}
