//! Cache key space.
//!
//! Every cached concept has exactly one key template:
//!
//! | Concept | Key |
//! |---|---|
//! | Customers of a business | `customers:business:<businessId>` |
//! | One customer | `customers:id:<customerId>` |
//! | Customer search | `customers:search:<businessId>:<query>` |
//! | Transfers of a business | `transfers:business:<businessId>` |
//! | Transfers of a customer | `transfers:customer:<customerId>` |
//! | Eligibility | `eligibility:<documentNumber>:<businessId>` |
//!
//! Identifier segments may not be empty or contain `:`, so a segment-aligned
//! scope (see [`crate::CacheStore::invalidate_scope`]) never reaches into a
//! sibling whose identifier merely shares a textual prefix.

use remitcap_core::{BusinessId, CustomerId, EntityIdType, KeyError};
use std::borrow::Borrow;
use std::fmt;

pub const SEPARATOR: char = ':';

/// Top-level key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Customers,
    Transfers,
    Eligibility,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Customers => "customers",
            Namespace::Transfers => "transfers",
            Namespace::Eligibility => "eligibility",
        }
    }

    /// The namespace with its trailing separator, for prefix invalidation.
    pub fn prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.as_str())
    }
}

/// A canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// `customers:business:<businessId>`
    pub fn customers_by_business(business_id: BusinessId) -> Result<Self, KeyError> {
        let business = id_segment("business_id", business_id)?;
        Ok(Self::join(&[Namespace::Customers.as_str(), "business", &business]))
    }

    /// `customers:id:<customerId>`
    pub fn customer_by_id(customer_id: CustomerId) -> Result<Self, KeyError> {
        let customer = id_segment("customer_id", customer_id)?;
        Ok(Self::join(&[Namespace::Customers.as_str(), "id", &customer]))
    }

    /// `customers:search:<businessId>:<query>`
    ///
    /// The query is trimmed and lowercased so equivalent searches share an
    /// entry. It is the final segment, so it may itself contain `:`.
    pub fn customer_search(business_id: BusinessId, query: &str) -> Result<Self, KeyError> {
        let scope = Self::customer_search_scope(business_id)?;
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(KeyError::EmptySegment { segment: "query" });
        }
        Ok(Self::join(&[scope.as_str(), &query]))
    }

    /// `customers:search:<businessId>`, the parent of every search key.
    pub fn customer_search_scope(business_id: BusinessId) -> Result<Self, KeyError> {
        let business = id_segment("business_id", business_id)?;
        Ok(Self::join(&[Namespace::Customers.as_str(), "search", &business]))
    }

    /// `transfers:business:<businessId>`
    pub fn transfers_by_business(business_id: BusinessId) -> Result<Self, KeyError> {
        let business = id_segment("business_id", business_id)?;
        Ok(Self::join(&[Namespace::Transfers.as_str(), "business", &business]))
    }

    /// `transfers:customer:<customerId>`
    pub fn transfers_by_customer(customer_id: CustomerId) -> Result<Self, KeyError> {
        let customer = id_segment("customer_id", customer_id)?;
        Ok(Self::join(&[Namespace::Transfers.as_str(), "customer", &customer]))
    }

    /// `eligibility:<documentNumber>:<businessId>`
    pub fn eligibility(document_number: &str, business_id: BusinessId) -> Result<Self, KeyError> {
        let scope = Self::eligibility_scope(document_number)?;
        let business = id_segment("business_id", business_id)?;
        Ok(Self::join(&[scope.as_str(), &business]))
    }

    /// `eligibility:<documentNumber>`, covering every business.
    pub fn eligibility_scope(document_number: &str) -> Result<Self, KeyError> {
        let document = text_segment("document_number", document_number)?;
        Ok(Self::join(&[Namespace::Eligibility.as_str(), document]))
    }

    fn join(segments: &[&str]) -> Self {
        let mut key = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                key.push(SEPARATOR);
            }
            key.push_str(segment);
        }
        Self(key)
    }
}

fn id_segment<I: EntityIdType>(segment: &'static str, id: I) -> Result<String, KeyError> {
    if id.is_nil() {
        return Err(KeyError::EmptySegment { segment });
    }
    Ok(id.to_string())
}

fn text_segment<'a>(segment: &'static str, value: &'a str) -> Result<&'a str, KeyError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(KeyError::EmptySegment { segment });
    }
    if value.contains(SEPARATOR) {
        return Err(KeyError::SeparatorInSegment { segment });
    }
    Ok(value)
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
