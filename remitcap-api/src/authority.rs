//! Interfaces to the external authority.
//!
//! The authority is the system of record: it computes eligibility over the
//! rolling window and persists customers and transfers. The facade treats it
//! as ground truth and never recomputes its rules.

use async_trait::async_trait;
use remitcap_core::{
    AuthorityError, BusinessId, Customer, CustomerId, CustomerPatch, EligibilityQuery,
    EligibilityResult, NewCustomer, NewTransfer, Transfer,
};

/// Answers whether a customer may transfer a given amount.
///
/// `amount_used` and `amount_available` in the answer describe the
/// `(document_number, business_id)` pair, not the requested amount.
#[async_trait]
pub trait EligibilityAuthority: Send + Sync {
    async fn check_eligibility(
        &self,
        query: &EligibilityQuery,
    ) -> Result<EligibilityResult, AuthorityError>;
}

/// Reads and writes customer and transfer records.
///
/// Writes return the persisted entity or fail; they never partially succeed
/// from the caller's point of view.
#[async_trait]
pub trait RecordAuthority: Send + Sync {
    async fn customers_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Customer>, AuthorityError>;

    async fn customer_by_id(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Customer>, AuthorityError>;

    /// Customers of a business whose name or document matches `query`.
    async fn search_customers(
        &self,
        business_id: BusinessId,
        query: &str,
    ) -> Result<Vec<Customer>, AuthorityError>;

    async fn transfers_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Transfer>, AuthorityError>;

    async fn transfers_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Transfer>, AuthorityError>;

    async fn create_customer(&self, data: &NewCustomer) -> Result<Customer, AuthorityError>;

    async fn update_customer(
        &self,
        customer_id: CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Customer, AuthorityError>;

    async fn create_transfer(&self, data: &NewTransfer) -> Result<Transfer, AuthorityError>;
}
