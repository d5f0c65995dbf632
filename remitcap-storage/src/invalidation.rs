//! Invalidation recipes.
//!
//! A mutation stales several cached views at once. Each recipe names the full
//! set of scopes for one kind of mutation, so call sites never pick them by
//! hand. All keys are derived before anything is removed: a recipe either
//! removes every scope or, on a key error, none.

use crate::keys::CacheKey;
use crate::store::CacheStore;
use remitcap_core::{BusinessId, CustomerId, KeyError};
use std::sync::Arc;
use tracing::info;

/// A completed mutation whose cached views must be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A customer was created or edited.
    CustomerSaved {
        business_id: BusinessId,
        customer_id: CustomerId,
    },
    /// A transfer was recorded.
    TransferRecorded {
        business_id: BusinessId,
        customer_id: CustomerId,
        document_number: String,
    },
    /// The session ended or switched tenant.
    SessionEnded,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CustomerSaved { .. } => "customer_saved",
            Mutation::TransferRecorded { .. } => "transfer_recorded",
            Mutation::SessionEnded => "session_ended",
        }
    }

    /// Scopes staled by this mutation. Empty for [`Mutation::SessionEnded`],
    /// which clears the whole store instead.
    pub fn scopes(&self) -> Result<Vec<CacheKey>, KeyError> {
        match self {
            Mutation::CustomerSaved {
                business_id,
                customer_id,
            } => Ok(vec![
                CacheKey::customers_by_business(*business_id)?,
                CacheKey::customer_search_scope(*business_id)?,
                CacheKey::customer_by_id(*customer_id)?,
            ]),
            Mutation::TransferRecorded {
                business_id,
                customer_id,
                document_number,
            } => Ok(vec![
                CacheKey::transfers_by_business(*business_id)?,
                CacheKey::transfers_by_customer(*customer_id)?,
                // Usage changed for every business that may query this document.
                CacheKey::eligibility_scope(document_number)?,
            ]),
            Mutation::SessionEnded => Ok(Vec::new()),
        }
    }
}

/// What a recipe removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    pub scopes: Vec<String>,
    pub removed: usize,
    pub cleared_all: bool,
}

/// Applies invalidation recipes to a shared store.
#[derive(Debug, Clone)]
pub struct Invalidator {
    store: Arc<CacheStore>,
}

impl Invalidator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Run the recipe for a mutation.
    pub fn apply(&self, mutation: &Mutation) -> Result<InvalidationReport, KeyError> {
        if let Mutation::SessionEnded = mutation {
            let removed = self.store.clear();
            info!(mutation = mutation.name(), removed, "cache cleared");
            return Ok(InvalidationReport {
                scopes: Vec::new(),
                removed,
                cleared_all: true,
            });
        }

        let scopes = mutation.scopes()?;
        let removed: usize = scopes
            .iter()
            .map(|scope| self.store.invalidate_scope(scope.as_str()))
            .sum();
        let scopes: Vec<String> = scopes.into_iter().map(CacheKey::into_string).collect();
        info!(
            mutation = mutation.name(),
            scopes = ?scopes,
            removed,
            "cache invalidated"
        );
        Ok(InvalidationReport {
            scopes,
            removed,
            cleared_all: false,
        })
    }

    /// Customer list, customer search and the single customer entry.
    pub fn after_customer_saved(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> Result<InvalidationReport, KeyError> {
        self.apply(&Mutation::CustomerSaved {
            business_id,
            customer_id,
        })
    }

    /// Business transfers, customer transfers and eligibility for the
    /// document across all businesses.
    pub fn after_transfer_recorded(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
        document_number: &str,
    ) -> Result<InvalidationReport, KeyError> {
        self.apply(&Mutation::TransferRecorded {
            business_id,
            customer_id,
            document_number: document_number.to_string(),
        })
    }

    /// Clear everything; no residue may survive into the next session.
    pub fn on_sign_out(&self) -> InvalidationReport {
        self.clear_all()
    }

    /// Clear everything before serving another tenant.
    pub fn on_tenant_switch(&self) -> InvalidationReport {
        self.clear_all()
    }

    fn clear_all(&self) -> InvalidationReport {
        let removed = self.store.clear();
        info!(mutation = Mutation::SessionEnded.name(), removed, "cache cleared");
        InvalidationReport {
            scopes: Vec::new(),
            removed,
            cleared_all: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheStoreConfig;
    use remitcap_core::EntityIdType;

    fn invalidator() -> Invalidator {
        Invalidator::new(Arc::new(CacheStore::new(
            CacheStoreConfig::new().with_max_entries(100),
        )))
    }

    fn seed(store: &CacheStore, keys: &[&CacheKey]) {
        for key in keys {
            store.set(key.as_str(), 1u8);
        }
    }

    #[test]
    fn test_customer_saved_recipe() {
        let inv = invalidator();
        let store = inv.store().clone();
        let business = BusinessId::now_v7();
        let other_business = BusinessId::now_v7();
        let customer = CustomerId::now_v7();
        let other_customer = CustomerId::now_v7();

        let list = CacheKey::customers_by_business(business).unwrap();
        let search = CacheKey::customer_search(business, "ana").unwrap();
        let single = CacheKey::customer_by_id(customer).unwrap();
        let other_list = CacheKey::customers_by_business(other_business).unwrap();
        let other_single = CacheKey::customer_by_id(other_customer).unwrap();
        let transfers = CacheKey::transfers_by_business(business).unwrap();
        seed(&store, &[&list, &search, &single, &other_list, &other_single, &transfers]);

        let report = inv.after_customer_saved(business, customer).unwrap();
        assert_eq!(report.removed, 3);
        assert!(!report.cleared_all);
        assert!(!store.has(list.as_str()));
        assert!(!store.has(search.as_str()));
        assert!(!store.has(single.as_str()));
        assert!(store.has(other_list.as_str()));
        assert!(store.has(other_single.as_str()));
        assert!(store.has(transfers.as_str()));
    }

    #[test]
    fn test_transfer_recorded_recipe_spans_businesses() {
        let inv = invalidator();
        let store = inv.store().clone();
        let business = BusinessId::now_v7();
        let other_business = BusinessId::now_v7();
        let customer = CustomerId::now_v7();

        let by_business = CacheKey::transfers_by_business(business).unwrap();
        let by_customer = CacheKey::transfers_by_customer(customer).unwrap();
        let eligibility_here = CacheKey::eligibility("AB123456", business).unwrap();
        let eligibility_there = CacheKey::eligibility("AB123456", other_business).unwrap();
        let eligibility_sibling = CacheKey::eligibility("AB1234567", business).unwrap();
        let customers = CacheKey::customers_by_business(business).unwrap();
        seed(
            &store,
            &[
                &by_business,
                &by_customer,
                &eligibility_here,
                &eligibility_there,
                &eligibility_sibling,
                &customers,
            ],
        );

        let report = inv
            .after_transfer_recorded(business, customer, "AB123456")
            .unwrap();
        assert_eq!(report.removed, 4);
        assert_eq!(report.scopes.len(), 3);
        assert!(!store.has(eligibility_here.as_str()));
        assert!(!store.has(eligibility_there.as_str()));
        assert!(store.has(eligibility_sibling.as_str()));
        assert!(store.has(customers.as_str()));
    }

    #[test]
    fn test_bad_key_removes_nothing() {
        let inv = invalidator();
        let store = inv.store().clone();
        let business = BusinessId::now_v7();
        let customer = CustomerId::now_v7();
        let list = CacheKey::transfers_by_business(business).unwrap();
        seed(&store, &[&list]);

        let result = inv.after_transfer_recorded(business, customer, "");
        assert!(result.is_err());
        assert!(store.has(list.as_str()));
    }

    #[test]
    fn test_sign_out_and_tenant_switch_clear_everything() {
        let inv = invalidator();
        let store = inv.store().clone();
        store.set("customers:business:x", 1u8);
        store.set("eligibility:AB1:x", 2u8);

        let report = inv.on_sign_out();
        assert!(report.cleared_all);
        assert_eq!(report.removed, 2);
        assert!(store.is_empty());

        store.set("transfers:business:y", 3u8);
        assert_eq!(inv.on_tenant_switch().removed, 1);
        assert_eq!(inv.apply(&Mutation::SessionEnded).unwrap().removed, 0);
    }
}
