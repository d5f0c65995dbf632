//! RemitCap Test Utilities
//!
//! Centralized test infrastructure for the RemitCap workspace:
//! - An in-memory authority that enforces the rolling-window limit
//! - Proptest generators for identifiers, amounts and hostile input
//! - Test fixtures for common scenarios
//! - Assertions over facade responses

pub use remitcap_api::{
    ComplianceService, EligibilityAuthority, ErrorCode, RecordAuthority, RpcTransport,
    ServiceResponse,
};
pub use remitcap_core::{
    AuthorityError, BusinessId, ClientForm, ComplianceConfig, Customer, CustomerId,
    CustomerPatch, EligibilityQuery, EligibilityResult, EntityIdType, Money, NewCustomer,
    NewTransfer, RawAmount, Timestamp, Transfer, TransferForm, TransferId, UserId,
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// MOCK AUTHORITY
// ============================================================================

/// Usage counted toward the window without a full transfer record.
#[derive(Debug, Clone)]
struct Usage {
    document_number: String,
    net_amount: Money,
    at: Timestamp,
}

#[derive(Debug, Default)]
struct MockState {
    customers: BTreeMap<CustomerId, Customer>,
    transfers: Vec<Transfer>,
    seeded: Vec<Usage>,
    calls: BTreeMap<&'static str, usize>,
    unavailable: bool,
    fail_next: BTreeMap<&'static str, AuthorityError>,
}

/// In-memory authority: stores customers and transfers, and computes
/// eligibility over a rolling window the way the real system of record does.
///
/// Usage is summed per document number across all businesses.
#[derive(Debug)]
pub struct MockAuthority {
    ceiling: Money,
    window_days: u32,
    state: Mutex<MockState>,
}

impl Default for MockAuthority {
    fn default() -> Self {
        Self::from_config(&ComplianceConfig::default())
    }
}

impl MockAuthority {
    pub fn new(ceiling: Money, window_days: u32) -> Self {
        Self {
            ceiling,
            window_days,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn from_config(config: &ComplianceConfig) -> Self {
        Self::new(config.ceiling, config.window_days)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Count a call and apply any injected failure.
    fn enter(&self, operation: &'static str) -> Result<(), AuthorityError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_default() += 1;
        if let Some(err) = state.fail_next.remove(operation) {
            return Err(err);
        }
        if state.unavailable {
            return Err(AuthorityError::Unavailable {
                reason: "mock authority offline".to_string(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Test controls
    // ------------------------------------------------------------------------

    /// Number of times `operation` was invoked (failed calls included).
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make every call fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Fail the next call to `operation` with `err`.
    pub fn fail_next(&self, operation: &'static str, err: AuthorityError) {
        self.lock().fail_next.insert(operation, err);
    }

    /// Record prior usage for a document, `days_ago` days in the past.
    pub fn seed_usage(&self, document_number: &str, net_amount: Money, days_ago: i64) {
        self.lock().seeded.push(Usage {
            document_number: document_number.to_string(),
            net_amount,
            at: Utc::now() - ChronoDuration::days(days_ago),
        });
    }

    /// Insert a customer directly, bypassing validation.
    pub fn seed_customer(&self, customer: Customer) {
        self.lock().customers.insert(customer.customer_id, customer);
    }

    pub fn transfer_count(&self) -> usize {
        self.lock().transfers.len()
    }

    // ------------------------------------------------------------------------
    // Window arithmetic
    // ------------------------------------------------------------------------

    fn usage_in_window(state: &MockState, document_number: &str, window_days: u32) -> Vec<Usage> {
        let since = Utc::now() - ChronoDuration::days(i64::from(window_days));
        let recorded = state.transfers.iter().map(|t| Usage {
            document_number: t.document_number.clone(),
            net_amount: t.record.net_amount(),
            at: t.created_at,
        });
        state
            .seeded
            .iter()
            .cloned()
            .chain(recorded)
            .filter(|u| u.document_number == document_number && u.at > since)
            .collect()
    }

    fn evaluate(&self, state: &MockState, document_number: &str, amount: Money) -> EligibilityResult {
        let usage = Self::usage_in_window(state, document_number, self.window_days);
        let used: Money = usage.iter().map(|u| u.net_amount).sum();
        let available = (self.ceiling - used).max(Decimal::ZERO);
        let days_remaining = usage
            .iter()
            .map(|u| u.at)
            .min()
            .map(|oldest| {
                let expires = oldest + ChronoDuration::days(i64::from(self.window_days));
                let left = (expires - Utc::now()).num_hours();
                // Round partial days up.
                u32::try_from((left + 23) / 24).unwrap_or(0)
            })
            .unwrap_or(0);
        let can_transfer = amount > Decimal::ZERO && amount <= available;
        let message = if can_transfer {
            format!("Transfer allowed. Available: {available}")
        } else {
            format!("Limit reached. Available: {available}")
        };
        EligibilityResult {
            can_transfer,
            amount_used: used,
            amount_available: available,
            days_remaining,
            message,
        }
    }
}

#[async_trait]
impl EligibilityAuthority for MockAuthority {
    async fn check_eligibility(
        &self,
        query: &EligibilityQuery,
    ) -> Result<EligibilityResult, AuthorityError> {
        self.enter("check_eligibility")?;
        let state = self.lock();
        Ok(self.evaluate(&state, &query.document_number, query.amount))
    }
}

#[async_trait]
impl RecordAuthority for MockAuthority {
    async fn customers_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Customer>, AuthorityError> {
        self.enter("customers_by_business")?;
        let mut customers: Vec<Customer> = self
            .lock()
            .customers
            .values()
            .filter(|c| c.business_id == business_id)
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(customers)
    }

    async fn customer_by_id(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Customer>, AuthorityError> {
        self.enter("customer_by_id")?;
        Ok(self.lock().customers.get(&customer_id).cloned())
    }

    async fn search_customers(
        &self,
        business_id: BusinessId,
        query: &str,
    ) -> Result<Vec<Customer>, AuthorityError> {
        self.enter("search_customers")?;
        let needle = query.to_lowercase();
        Ok(self
            .lock()
            .customers
            .values()
            .filter(|c| c.business_id == business_id)
            .filter(|c| {
                c.full_name.to_lowercase().contains(&needle)
                    || c.document_number.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn transfers_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Transfer>, AuthorityError> {
        self.enter("transfers_by_business")?;
        Ok(self
            .lock()
            .transfers
            .iter()
            .rev()
            .filter(|t| t.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn transfers_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Transfer>, AuthorityError> {
        self.enter("transfers_by_customer")?;
        Ok(self
            .lock()
            .transfers
            .iter()
            .rev()
            .filter(|t| t.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn create_customer(&self, data: &NewCustomer) -> Result<Customer, AuthorityError> {
        self.enter("create_customer")?;
        let mut state = self.lock();
        let duplicate = state.customers.values().any(|c| {
            c.business_id == data.business_id && c.document_number == data.document_number
        });
        if duplicate {
            return Err(AuthorityError::Rejected {
                operation: "create_customer".to_string(),
                message: format!("Document {} already registered", data.document_number),
            });
        }
        let now = Utc::now();
        let customer = Customer {
            customer_id: CustomerId::now_v7(),
            business_id: data.business_id,
            full_name: data.full_name.clone(),
            document_number: data.document_number.clone(),
            date_of_birth: data.date_of_birth,
            email: data.email.clone(),
            phone: data.phone.clone(),
            fiscal_code: data.fiscal_code.clone(),
            address: data.address.clone(),
            created_at: now,
            updated_at: now,
        };
        state.customers.insert(customer.customer_id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        customer_id: CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Customer, AuthorityError> {
        self.enter("update_customer")?;
        let mut state = self.lock();
        let customer = state
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| AuthorityError::NotFound {
                entity: "Customer",
                id: customer_id.to_string(),
            })?;
        patch.apply_to(customer);
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn create_transfer(&self, data: &NewTransfer) -> Result<Transfer, AuthorityError> {
        self.enter("create_transfer")?;
        let mut state = self.lock();
        if !state.customers.contains_key(&data.customer_id) {
            return Err(AuthorityError::NotFound {
                entity: "Customer",
                id: data.customer_id.to_string(),
            });
        }
        // The authority enforces the limit on its own side too.
        let verdict = self.evaluate(&state, &data.document_number, data.record.net_amount());
        if !verdict.can_transfer {
            return Err(AuthorityError::Rejected {
                operation: "create_transfer".to_string(),
                message: verdict.message,
            });
        }
        let transfer = Transfer {
            transfer_id: TransferId::now_v7(),
            business_id: data.business_id,
            customer_id: data.customer_id,
            created_by: data.created_by,
            document_number: data.document_number.clone(),
            recipient_name: data.recipient_name.clone(),
            recipient_country: data.recipient_country.clone(),
            record: data.record,
            notes: data.notes.clone(),
            created_at: Utc::now(),
        };
        state.transfers.push(transfer.clone());
        Ok(transfer)
    }
}

// ============================================================================
// MOCK RPC TRANSPORT
// ============================================================================

/// [`RpcTransport`] answering every authority function from a
/// [`MockAuthority`], serialized the way database functions return rows.
#[derive(Debug, Clone)]
pub struct MockRpcTransport {
    authority: Arc<MockAuthority>,
}

fn bad_param(function: &str, message: String) -> AuthorityError {
    AuthorityError::Rejected {
        operation: function.to_string(),
        message,
    }
}

impl MockRpcTransport {
    pub fn new(authority: Arc<MockAuthority>) -> Self {
        Self { authority }
    }

    fn text(function: &str, params: &Value, name: &str) -> Result<String, AuthorityError> {
        params[name]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| bad_param(function, format!("missing parameter {name}")))
    }

    fn id(function: &str, params: &Value, name: &str) -> Result<uuid::Uuid, AuthorityError> {
        Self::text(function, params, name)?
            .parse::<uuid::Uuid>()
            .map_err(|e| bad_param(function, format!("bad {name}: {e}")))
    }

    fn payload<T: DeserializeOwned>(
        function: &str,
        params: &Value,
        name: &str,
    ) -> Result<T, AuthorityError> {
        serde_json::from_value(params[name].clone())
            .map_err(|e| bad_param(function, format!("bad {name}: {e}")))
    }

    fn query_from(params: &Value) -> Result<EligibilityQuery, AuthorityError> {
        let function = remitcap_api::CHECK_ELIGIBILITY_FN;
        let amount = Self::text(function, params, "p_amount")?
            .parse::<Decimal>()
            .map_err(|e| bad_param(function, format!("bad p_amount: {e}")))?;
        Ok(EligibilityQuery {
            document_number: Self::text(function, params, "p_document_number")?,
            business_id: BusinessId::new(Self::id(function, params, "p_business_id")?),
            user_id: UserId::new(Self::id(function, params, "p_user_id")?),
            amount,
        })
    }
}

fn rows<T: Serialize>(function: &str, value: &T) -> Result<Value, AuthorityError> {
    serde_json::to_value(value).map_err(|e| bad_param(function, e.to_string()))
}

#[async_trait]
impl RpcTransport for MockRpcTransport {
    async fn call(&self, function: &str, params: Value) -> Result<Value, AuthorityError> {
        use remitcap_api::{
            CHECK_ELIGIBILITY_FN, CREATE_CUSTOMER_FN, CREATE_TRANSFER_FN,
            CUSTOMERS_BY_BUSINESS_FN, CUSTOMER_BY_ID_FN, SEARCH_CUSTOMERS_FN,
            TRANSFERS_BY_BUSINESS_FN, TRANSFERS_BY_CUSTOMER_FN, UPDATE_CUSTOMER_FN,
        };

        let authority = &self.authority;
        let business = || Self::id(function, &params, "p_business_id").map(BusinessId::new);
        let customer = || Self::id(function, &params, "p_customer_id").map(CustomerId::new);

        match function {
            CHECK_ELIGIBILITY_FN => {
                let query = Self::query_from(&params)?;
                let verdict = authority.check_eligibility(&query).await?;
                Ok(json!([{
                    "can_transfer": verdict.can_transfer,
                    "amount_used": verdict.amount_used.to_string(),
                    "amount_available": verdict.amount_available.to_string(),
                    "days_remaining": verdict.days_remaining,
                    "message": verdict.message,
                }]))
            }
            CUSTOMERS_BY_BUSINESS_FN => {
                rows(function, &authority.customers_by_business(business()?).await?)
            }
            CUSTOMER_BY_ID_FN => {
                let found = authority.customer_by_id(customer()?).await?;
                rows(function, &found.map(|c| vec![c]).unwrap_or_default())
            }
            SEARCH_CUSTOMERS_FN => {
                let query = Self::text(function, &params, "p_query")?;
                rows(function, &authority.search_customers(business()?, &query).await?)
            }
            TRANSFERS_BY_BUSINESS_FN => {
                rows(function, &authority.transfers_by_business(business()?).await?)
            }
            TRANSFERS_BY_CUSTOMER_FN => {
                rows(function, &authority.transfers_by_customer(customer()?).await?)
            }
            CREATE_CUSTOMER_FN => {
                let data: NewCustomer = Self::payload(function, &params, "p_data")?;
                rows(function, &[authority.create_customer(&data).await?])
            }
            UPDATE_CUSTOMER_FN => {
                let patch: CustomerPatch = Self::payload(function, &params, "p_patch")?;
                rows(function, &[authority.update_customer(customer()?, &patch).await?])
            }
            CREATE_TRANSFER_FN => {
                let data: NewTransfer = Self::payload(function, &params, "p_data")?;
                rows(function, &[authority.create_transfer(&data).await?])
            }
            _ => Err(bad_param(function, "unknown function".to_string())),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for RemitCap inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_business_id() -> impl Strategy<Value = BusinessId> {
        arb_uuid()
            .prop_filter("non-nil", |u| !u.is_nil())
            .prop_map(BusinessId::new)
    }

    pub fn arb_customer_id() -> impl Strategy<Value = CustomerId> {
        arb_uuid()
            .prop_filter("non-nil", |u| !u.is_nil())
            .prop_map(CustomerId::new)
    }

    /// A well-formed passport-style document number.
    pub fn arb_document_number() -> impl Strategy<Value = String> {
        "[A-Z]{2}[0-9]{6}"
    }

    /// An amount within `[0.01, 999.00]` with two decimals.
    pub fn arb_valid_amount() -> impl Strategy<Value = Money> {
        (1i64..=99_900).prop_map(|cents| Decimal::new(cents, 2))
    }

    /// Any raw amount a form might carry: numbers, numeric text and junk.
    pub fn arb_raw_amount() -> impl Strategy<Value = RawAmount> {
        prop_oneof![
            any::<f64>().prop_map(RawAmount::Number),
            (-10_000i64..10_000_000).prop_map(|c| RawAmount::Text(Decimal::new(c, 2).to_string())),
            "[0-9 .,a-z€-]{0,16}".prop_map(RawAmount::Text),
        ]
    }

    /// Known injection payloads.
    pub fn arb_dangerous_payload() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "<script>alert(1)</script>",
            "' or '1'='1",
            "; drop table users--",
            "javascript:alert(1)",
            "<img src=x onerror=alert(1)>",
            "1 UNION SELECT password FROM users",
            "<iframe src=//evil>",
        ])
        .prop_map(str::to_string)
    }

    /// Names with letters, accents and single spaces.
    pub fn arb_safe_name() -> impl Strategy<Value = String> {
        "[A-Za-zÁÉÍÓÚáéíóúÑñ]{2,12}( [A-Za-zÁÉÍÓÚáéíóúÑñ]{2,12}){0,2}"
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use chrono::NaiveDate;
    use remitcap_guard::Validator;
    use rust_decimal_macros::dec;

    /// Document number used by the reference end-to-end scenario.
    pub const SCENARIO_DOCUMENT: &str = "AB123456";

    /// Reference date used to pin age checks.
    pub fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap_or_default()
    }

    pub fn business_id() -> BusinessId {
        BusinessId::now_v7()
    }

    pub fn user_id() -> UserId {
        UserId::now_v7()
    }

    pub fn config() -> ComplianceConfig {
        ComplianceConfig::default()
    }

    /// A valid customer form.
    pub fn client_form(full_name: &str, document_number: &str) -> ClientForm {
        ClientForm {
            full_name: full_name.to_string(),
            document_number: document_number.to_string(),
            date_of_birth: Some("1985-04-12".to_string()),
            email: Some("cliente@example.com".to_string()),
            phone: Some("+34 600 123 456".to_string()),
            fiscal_code: None,
            address: None,
        }
    }

    /// A valid transfer form without commission.
    pub fn transfer_form(
        customer_id: CustomerId,
        document_number: &str,
        amount: impl Into<RawAmount>,
    ) -> TransferForm {
        TransferForm {
            customer_id: Some(customer_id),
            document_number: document_number.to_string(),
            recipient_name: "Rosa Quispe".to_string(),
            recipient_country: Some("PE".to_string()),
            amount: amount.into(),
            commission_amount: None,
            commission_included: false,
            notes: None,
        }
    }

    /// A customer record owned by `business_id`.
    pub fn customer(business_id: BusinessId, document_number: &str) -> Customer {
        let now = Utc::now();
        Customer {
            customer_id: CustomerId::now_v7(),
            business_id,
            full_name: "Ana Ruiz".to_string(),
            document_number: document_number.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 4, 12),
            email: None,
            phone: None,
            fiscal_code: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A service wired to `authority` with the default configuration and a
    /// pinned validation date.
    pub fn service(authority: &Arc<MockAuthority>) -> ComplianceService {
        let config = config();
        let validator = Validator::new(&config).with_today(fixed_today());
        ComplianceService::new(config, authority.clone(), authority.clone())
            .with_validator(validator)
    }

    /// Authority with the scenario customer's prior usage of 549.
    pub fn scenario_authority() -> Arc<MockAuthority> {
        let authority = Arc::new(MockAuthority::default());
        authority.seed_usage(SCENARIO_DOCUMENT, dec!(549), 2);
        authority
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over facade responses.

    use super::*;

    /// Assert that a response carries data and return it.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(response: ServiceResponse<T>) -> T {
        match response.into_result() {
            Ok(data) => data,
            Err(e) => panic!("Expected data, got error: {e:?}"),
        }
    }

    /// Assert that a response failed with `code`.
    #[track_caller]
    pub fn assert_error_code<T: std::fmt::Debug>(response: &ServiceResponse<T>, code: ErrorCode) {
        assert!(
            response.data.is_none(),
            "Expected {code}, got data: {:?}",
            response.data
        );
        assert_eq!(response.code, Some(code), "Wrong error code: {:?}", response.error);
    }

    /// Assert that a response failed on exactly these fields.
    #[track_caller]
    pub fn assert_field_errors<T: std::fmt::Debug>(response: &ServiceResponse<T>, fields: &[&str]) {
        let got: Vec<&str> = response.field_errors.keys().map(String::as_str).collect();
        let mut expected = fields.to_vec();
        expected.sort_unstable();
        assert_eq!(got, expected, "Unexpected field errors: {:?}", response.field_errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn query(document: &str, amount: Money) -> EligibilityQuery {
        EligibilityQuery {
            document_number: document.to_string(),
            business_id: BusinessId::now_v7(),
            user_id: UserId::now_v7(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_mock_window_sums_recent_usage_only() {
        let authority = MockAuthority::default();
        authority.seed_usage("AB123456", dec!(300), 2);
        authority.seed_usage("AB123456", dec!(249), 7);
        authority.seed_usage("AB123456", dec!(400), 9);
        authority.seed_usage("ZZ999999", dec!(999), 1);

        let verdict = authority
            .check_eligibility(&query("AB123456", dec!(450)))
            .await
            .unwrap();
        assert_eq!(verdict.amount_used, dec!(549));
        assert_eq!(verdict.amount_available, dec!(450));
        assert!(verdict.can_transfer);
        assert!(verdict.days_remaining >= 1);
        assert_eq!(authority.calls("check_eligibility"), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let authority = MockAuthority::default();
        authority.fail_next(
            "check_eligibility",
            AuthorityError::Unavailable {
                reason: "boom".to_string(),
            },
        );
        assert!(authority
            .check_eligibility(&query("AB123456", dec!(1)))
            .await
            .is_err());
        assert!(authority
            .check_eligibility(&query("AB123456", dec!(1)))
            .await
            .is_ok());

        authority.set_unavailable(true);
        assert!(authority.customers_by_business(BusinessId::now_v7()).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_rpc_transport_round_trip() {
        let authority = Arc::new(MockAuthority::default());
        authority.seed_usage("AB123456", dec!(549), 1);
        let rpc = remitcap_api::RpcComplianceAuthority::new(Arc::new(MockRpcTransport::new(
            authority.clone(),
        )));

        let verdict = rpc
            .check_eligibility(&query("AB123456", dec!(500)))
            .await
            .unwrap();
        assert!(!verdict.can_transfer);
        assert_eq!(verdict.amount_available, dec!(450));
    }

    #[tokio::test]
    async fn test_mock_rpc_transport_serves_records() {
        let authority = Arc::new(MockAuthority::default());
        let rpc = remitcap_api::RpcComplianceAuthority::new(Arc::new(MockRpcTransport::new(
            authority.clone(),
        )));
        let business_id = fixtures::business_id();
        let data = NewCustomer {
            business_id,
            full_name: "Ana Ruiz".to_string(),
            document_number: "AB123456".to_string(),
            date_of_birth: None,
            email: None,
            phone: None,
            fiscal_code: None,
            address: None,
        };

        let created = rpc.create_customer(&data).await.unwrap();
        assert_eq!(created.document_number, "AB123456");
        assert_eq!(rpc.customer_by_id(created.customer_id).await.unwrap(), Some(created.clone()));
        assert_eq!(rpc.customer_by_id(CustomerId::now_v7()).await.unwrap(), None);
        assert_eq!(rpc.customers_by_business(business_id).await.unwrap(), vec![created]);
        assert_eq!(authority.calls("create_customer"), 1);
    }
}
