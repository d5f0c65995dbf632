//! RemitCap Core - Entity Types
//!
//! Pure data structures shared by every RemitCap crate. The types here carry
//! invariants (net amount, eligibility consistency) but no I/O and no cache
//! or validation policy; those live in `remitcap-guard`, `remitcap-storage`
//! and `remitcap-api`.

pub mod config;
pub mod eligibility;
pub mod entities;
pub mod enums;
pub mod error;
pub mod forms;
pub mod identity;
pub mod money;

pub use config::{CacheSettings, ComplianceConfig, TtlTier};
pub use eligibility::{EligibilityQuery, EligibilityResult};
pub use entities::{Customer, CustomerPatch, NewCustomer, NewTransfer, Transfer, TransferRecord};
pub use enums::Locale;
pub use error::{
    AuthorityError, BoundaryError, ConfigError, KeyError, RecordError, RemitError, RemitResult,
};
pub use forms::{ClientForm, RawAmount, TransferForm};
pub use identity::{BusinessId, CustomerId, EntityIdType, Timestamp, TransferId, UserId};
pub use money::{round_money, Money};
