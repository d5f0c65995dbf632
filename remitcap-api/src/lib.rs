//! RemitCap API - Compliance Service Facade
//!
//! The layer the dashboard talks to. It composes input hygiene from
//! `remitcap-guard`, the cache from `remitcap-storage` and an external
//! authority (behind the traits in [`authority`]) into operations that always
//! resolve to a uniform `{ data, error }` [`ServiceResponse`].
//!
//! The authority is the source of truth for the rolling-window limit. This
//! crate caches its answers briefly and never recomputes them.

pub mod authority;
pub mod error;
pub mod flow;
pub mod response;
pub mod rpc;
pub mod security;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use authority::{EligibilityAuthority, RecordAuthority};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use flow::{CheckTicket, FlowState, TransferFlow};
pub use response::ServiceResponse;
pub use rpc::{
    RpcComplianceAuthority, RpcTransport, CHECK_ELIGIBILITY_FN, CREATE_CUSTOMER_FN,
    CREATE_TRANSFER_FN, CUSTOMERS_BY_BUSINESS_FN, CUSTOMER_BY_ID_FN, SEARCH_CUSTOMERS_FN,
    TRANSFERS_BY_BUSINESS_FN, TRANSFERS_BY_CUSTOMER_FN, UPDATE_CUSTOMER_FN,
};
pub use security::{SecurityAlert, SecuritySink, TracingSecuritySink};
pub use service::ComplianceService;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
