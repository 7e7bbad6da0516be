use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::models::Batch;

/// In-process cache of each farmer's batch listing. Registration invalidates
/// the owning farmer's entry so the next read observes the new record.
pub struct ListingCache {
    inner: ArcSwap<HashMap<String, Arc<Vec<Batch>>>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn get(&self, farmer_account_id: &str) -> Option<Arc<Vec<Batch>>> {
        self.inner.load().get(farmer_account_id).cloned()
    }

    pub fn store(&self, farmer_account_id: &str, batches: Vec<Batch>) -> Arc<Vec<Batch>> {
        let entry = Arc::new(batches);
        let stored = entry.clone();
        self.inner.rcu(move |current| {
            let mut next = HashMap::clone(current);
            next.insert(farmer_account_id.to_string(), entry.clone());
            next
        });
        stored
    }

    pub fn invalidate(&self, farmer_account_id: &str) {
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(farmer_account_id);
            next
        });
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new()
    }
}
