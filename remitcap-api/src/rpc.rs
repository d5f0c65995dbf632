//! Strict boundary to an RPC-style authority.
//!
//! Requests are built as named-parameter objects and every response is parsed
//! into typed values before it reaches the facade. Missing, mistyped or
//! negative fields fail fast with a [`BoundaryError`]; nothing loosely shaped
//! leaks past this module.

use crate::authority::{EligibilityAuthority, RecordAuthority};
use async_trait::async_trait;
use remitcap_core::{
    AuthorityError, BoundaryError, BusinessId, Customer, CustomerId, CustomerPatch,
    EligibilityQuery, EligibilityResult, Money, NewCustomer, NewTransfer, Transfer,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, warn};

/// Remote function computing rolling-window eligibility.
pub const CHECK_ELIGIBILITY_FN: &str = "check_transfer_eligibility";
pub const CUSTOMERS_BY_BUSINESS_FN: &str = "get_customers_by_business";
pub const CUSTOMER_BY_ID_FN: &str = "get_customer_by_id";
pub const SEARCH_CUSTOMERS_FN: &str = "search_customers";
pub const TRANSFERS_BY_BUSINESS_FN: &str = "get_transfers_by_business";
pub const TRANSFERS_BY_CUSTOMER_FN: &str = "get_transfers_by_customer";
pub const CREATE_CUSTOMER_FN: &str = "create_customer";
pub const UPDATE_CUSTOMER_FN: &str = "update_customer";
pub const CREATE_TRANSFER_FN: &str = "create_transfer";

/// Transport for named remote functions.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Invoke `function` with a JSON object of parameters.
    async fn call(&self, function: &str, params: Value) -> Result<Value, AuthorityError>;
}

/// [`EligibilityAuthority`] and [`RecordAuthority`] backed by an
/// [`RpcTransport`].
#[derive(Clone)]
pub struct RpcComplianceAuthority {
    transport: Arc<dyn RpcTransport>,
}

impl RpcComplianceAuthority {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    async fn invoke(&self, function: &'static str, params: Value) -> Result<Value, AuthorityError> {
        self.transport
            .call(function, params)
            .await
            .inspect_err(|e| error!(function, error = %e, "RPC call failed"))
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        function: &'static str,
        params: Value,
    ) -> Result<Vec<T>, AuthorityError> {
        let response = self.invoke(function, params).await?;
        parse_rows(function, &response).map_err(|e| malformed(function, e))
    }

    async fn record<T: DeserializeOwned>(
        &self,
        function: &'static str,
        params: Value,
    ) -> Result<T, AuthorityError> {
        let response = self.invoke(function, params).await?;
        parse_record(function, &response).map_err(|e| malformed(function, e))
    }
}

fn malformed(function: &'static str, err: BoundaryError) -> AuthorityError {
    warn!(function, error = %err, "Malformed RPC response");
    err.into()
}

/// Serialize a payload parameter.
fn payload<T: Serialize>(function: &'static str, value: &T) -> Result<Value, AuthorityError> {
    serde_json::to_value(value).map_err(|e| AuthorityError::Rejected {
        operation: function.to_string(),
        message: format!("unserializable payload: {e}"),
    })
}

impl std::fmt::Debug for RpcComplianceAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcComplianceAuthority").finish_non_exhaustive()
    }
}

#[async_trait]
impl EligibilityAuthority for RpcComplianceAuthority {
    async fn check_eligibility(
        &self,
        query: &EligibilityQuery,
    ) -> Result<EligibilityResult, AuthorityError> {
        let response = self
            .invoke(CHECK_ELIGIBILITY_FN, eligibility_params(query))
            .await?;
        parse_eligibility(CHECK_ELIGIBILITY_FN, &response)
            .map_err(|e| malformed(CHECK_ELIGIBILITY_FN, e))
    }
}

#[async_trait]
impl RecordAuthority for RpcComplianceAuthority {
    async fn customers_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Customer>, AuthorityError> {
        self.rows(
            CUSTOMERS_BY_BUSINESS_FN,
            json!({ "p_business_id": business_id.to_string() }),
        )
        .await
    }

    async fn customer_by_id(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Customer>, AuthorityError> {
        let response = self
            .invoke(
                CUSTOMER_BY_ID_FN,
                json!({ "p_customer_id": customer_id.to_string() }),
            )
            .await?;
        parse_optional_record(CUSTOMER_BY_ID_FN, &response)
            .map_err(|e| malformed(CUSTOMER_BY_ID_FN, e))
    }

    async fn search_customers(
        &self,
        business_id: BusinessId,
        query: &str,
    ) -> Result<Vec<Customer>, AuthorityError> {
        self.rows(
            SEARCH_CUSTOMERS_FN,
            json!({ "p_business_id": business_id.to_string(), "p_query": query }),
        )
        .await
    }

    async fn transfers_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Transfer>, AuthorityError> {
        self.rows(
            TRANSFERS_BY_BUSINESS_FN,
            json!({ "p_business_id": business_id.to_string() }),
        )
        .await
    }

    async fn transfers_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Transfer>, AuthorityError> {
        self.rows(
            TRANSFERS_BY_CUSTOMER_FN,
            json!({ "p_customer_id": customer_id.to_string() }),
        )
        .await
    }

    async fn create_customer(&self, data: &NewCustomer) -> Result<Customer, AuthorityError> {
        let params = json!({ "p_data": payload(CREATE_CUSTOMER_FN, data)? });
        self.record(CREATE_CUSTOMER_FN, params).await
    }

    async fn update_customer(
        &self,
        customer_id: CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Customer, AuthorityError> {
        let params = json!({
            "p_customer_id": customer_id.to_string(),
            "p_patch": payload(UPDATE_CUSTOMER_FN, patch)?,
        });
        self.record(UPDATE_CUSTOMER_FN, params).await
    }

    async fn create_transfer(&self, data: &NewTransfer) -> Result<Transfer, AuthorityError> {
        let params = json!({ "p_data": payload(CREATE_TRANSFER_FN, data)? });
        self.record(CREATE_TRANSFER_FN, params).await
    }
}

/// Named parameters for [`CHECK_ELIGIBILITY_FN`].
pub fn eligibility_params(query: &EligibilityQuery) -> Value {
    json!({
        "p_document_number": query.document_number,
        "p_business_id": query.business_id.to_string(),
        "p_user_id": query.user_id.to_string(),
        "p_amount": query.amount.to_string(),
    })
}

/// Parse an eligibility response.
///
/// Accepts a JSON object, or an array holding exactly one object (the usual
/// shape of a single-row result set).
pub fn parse_eligibility(call: &str, value: &Value) -> Result<EligibilityResult, BoundaryError> {
    let row = single_row(call, value)?;
    Ok(EligibilityResult {
        can_transfer: bool_field(call, row, "can_transfer")?,
        amount_used: money_field(call, row, "amount_used")?,
        amount_available: money_field(call, row, "amount_available")?,
        days_remaining: days_field(call, row, "days_remaining")?,
        message: string_field(call, row, "message")?,
    })
}

/// Parse a result set. Every element must be an object matching `T`;
/// amount invariants (non-negative, consistent net amount) are enforced by
/// the entity's own deserializer.
pub fn parse_rows<T: DeserializeOwned>(call: &str, value: &Value) -> Result<Vec<T>, BoundaryError> {
    let Value::Array(rows) = value else {
        return Err(BoundaryError::NotAnArray {
            call: call.to_string(),
        });
    };
    rows.iter()
        .enumerate()
        .map(|(index, row)| typed_row(call, index, row))
        .collect()
}

/// Parse a single record from an object or single-row array.
pub fn parse_record<T: DeserializeOwned>(call: &str, value: &Value) -> Result<T, BoundaryError> {
    let row = single_row(call, value)?;
    serde_json::from_value(Value::Object(row.clone())).map_err(|e| BoundaryError::InvalidRow {
        call: call.to_string(),
        index: 0,
        reason: e.to_string(),
    })
}

/// Like [`parse_record`], with `null` or an empty result set meaning absent.
pub fn parse_optional_record<T: DeserializeOwned>(
    call: &str,
    value: &Value,
) -> Result<Option<T>, BoundaryError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(rows) if rows.is_empty() => Ok(None),
        other => parse_record(call, other).map(Some),
    }
}

fn typed_row<T: DeserializeOwned>(call: &str, index: usize, row: &Value) -> Result<T, BoundaryError> {
    if !row.is_object() {
        return Err(BoundaryError::InvalidRow {
            call: call.to_string(),
            index,
            reason: "not an object".to_string(),
        });
    }
    serde_json::from_value(row.clone()).map_err(|e| BoundaryError::InvalidRow {
        call: call.to_string(),
        index,
        reason: e.to_string(),
    })
}

fn single_row<'a>(call: &str, value: &'a Value) -> Result<&'a Map<String, Value>, BoundaryError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(rows) if rows.len() == 1 => single_row(call, &rows[0]),
        _ => Err(BoundaryError::NotAnObject {
            call: call.to_string(),
        }),
    }
}

fn field<'a>(call: &str, row: &'a Map<String, Value>, name: &str) -> Result<&'a Value, BoundaryError> {
    match row.get(name) {
        Some(Value::Null) | None => Err(BoundaryError::MissingField {
            call: call.to_string(),
            field: name.to_string(),
        }),
        Some(value) => Ok(value),
    }
}

fn wrong_type(call: &str, name: &str, expected: &'static str) -> BoundaryError {
    BoundaryError::WrongType {
        call: call.to_string(),
        field: name.to_string(),
        expected,
    }
}

fn out_of_range(call: &str, name: &str, value: impl ToString) -> BoundaryError {
    BoundaryError::OutOfRange {
        call: call.to_string(),
        field: name.to_string(),
        value: value.to_string(),
    }
}

fn bool_field(call: &str, row: &Map<String, Value>, name: &str) -> Result<bool, BoundaryError> {
    field(call, row, name)?
        .as_bool()
        .ok_or_else(|| wrong_type(call, name, "boolean"))
}

fn string_field(call: &str, row: &Map<String, Value>, name: &str) -> Result<String, BoundaryError> {
    field(call, row, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(call, name, "string"))
}

/// Numeric column; accepts a JSON number or a numeric string, never negative.
fn money_field(call: &str, row: &Map<String, Value>, name: &str) -> Result<Money, BoundaryError> {
    let amount = match field(call, row, name)? {
        // Parse the literal text so no float rounding creeps in.
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|_| out_of_range(call, name, n))?,
        Value::String(s) => {
            Decimal::from_str(s.trim()).map_err(|_| wrong_type(call, name, "decimal"))?
        }
        _ => return Err(wrong_type(call, name, "decimal")),
    };
    if amount < Decimal::ZERO {
        return Err(out_of_range(call, name, amount));
    }
    Ok(amount)
}

fn days_field(call: &str, row: &Map<String, Value>, name: &str) -> Result<u32, BoundaryError> {
    let value = field(call, row, name)?;
    match value.as_i64() {
        Some(days) => u32::try_from(days).map_err(|_| out_of_range(call, name, days)),
        None => Err(wrong_type(call, name, "integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remitcap_core::{EntityIdType, TransferId, TransferRecord, UserId};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    fn valid_row() -> Value {
        json!({
            "can_transfer": true,
            "amount_used": 549,
            "amount_available": "450.00",
            "days_remaining": 3,
            "message": "ok"
        })
    }

    #[test]
    fn test_parse_object_and_single_row_array() {
        let parsed = parse_eligibility("f", &valid_row()).unwrap();
        assert!(parsed.can_transfer);
        assert_eq!(parsed.amount_used, dec!(549));
        assert_eq!(parsed.amount_available, dec!(450));
        assert_eq!(parsed.days_remaining, 3);

        let from_array = parse_eligibility("f", &json!([valid_row()])).unwrap();
        assert_eq!(from_array, parsed);
    }

    #[test]
    fn test_parse_decimal_number_exactly() {
        let mut row = valid_row();
        row["amount_used"] = json!(548.99);
        let parsed = parse_eligibility("f", &row).unwrap();
        assert_eq!(parsed.amount_used, dec!(548.99));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            parse_eligibility("f", &json!([])),
            Err(BoundaryError::NotAnObject { .. })
        ));
        assert!(matches!(
            parse_eligibility("f", &json!("yes")),
            Err(BoundaryError::NotAnObject { .. })
        ));

        let mut row = valid_row();
        row.as_object_mut().unwrap().remove("amount_available");
        assert!(matches!(
            parse_eligibility("f", &row),
            Err(BoundaryError::MissingField { ref field, .. }) if field == "amount_available"
        ));

        let mut row = valid_row();
        row["can_transfer"] = json!("true");
        assert!(matches!(
            parse_eligibility("f", &row),
            Err(BoundaryError::WrongType { expected: "boolean", .. })
        ));

        let mut row = valid_row();
        row["days_remaining"] = json!(-1);
        assert!(matches!(
            parse_eligibility("f", &row),
            Err(BoundaryError::OutOfRange { .. })
        ));

        let mut row = valid_row();
        row["amount_used"] = json!("-5");
        assert!(matches!(
            parse_eligibility("f", &row),
            Err(BoundaryError::OutOfRange { .. })
        ));

        let mut row = valid_row();
        row["message"] = Value::Null;
        assert!(matches!(
            parse_eligibility("f", &row),
            Err(BoundaryError::MissingField { .. })
        ));
    }

    struct RecordingTransport {
        calls: Mutex<Vec<(String, Value)>>,
        response: Result<Value, AuthorityError>,
    }

    #[async_trait]
    impl RpcTransport for RecordingTransport {
        async fn call(&self, function: &str, params: Value) -> Result<Value, AuthorityError> {
            self.calls.lock().unwrap().push((function.to_string(), params));
            self.response.clone()
        }
    }

    fn query() -> EligibilityQuery {
        EligibilityQuery {
            document_number: "AB123456".to_string(),
            business_id: BusinessId::now_v7(),
            user_id: UserId::now_v7(),
            amount: dec!(450),
        }
    }

    #[tokio::test]
    async fn test_authority_sends_named_params() {
        let transport = Arc::new(RecordingTransport {
            calls: Mutex::new(Vec::new()),
            response: Ok(valid_row()),
        });
        let authority = RpcComplianceAuthority::new(transport.clone());
        let q = query();

        let verdict = authority.check_eligibility(&q).await.unwrap();
        assert!(verdict.can_transfer);

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CHECK_ELIGIBILITY_FN);
        assert_eq!(calls[0].1["p_document_number"], "AB123456");
        assert_eq!(calls[0].1["p_business_id"], q.business_id.to_string());
        assert_eq!(calls[0].1["p_user_id"], q.user_id.to_string());
        assert_eq!(calls[0].1["p_amount"], "450");
    }

    #[tokio::test]
    async fn test_authority_maps_malformed_response() {
        let transport = Arc::new(RecordingTransport {
            calls: Mutex::new(Vec::new()),
            response: Ok(json!({ "can_transfer": true })),
        });
        let authority = RpcComplianceAuthority::new(transport);
        let err = authority.check_eligibility(&query()).await.unwrap_err();
        assert!(matches!(err, AuthorityError::Boundary(_)));
    }

    fn customer() -> Customer {
        let now = chrono::Utc::now();
        Customer {
            customer_id: CustomerId::now_v7(),
            business_id: BusinessId::now_v7(),
            full_name: "Ana Ruiz".to_string(),
            document_number: "AB123456".to_string(),
            date_of_birth: None,
            email: None,
            phone: None,
            fiscal_code: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transfer_row() -> Value {
        let transfer = Transfer {
            transfer_id: TransferId::now_v7(),
            business_id: BusinessId::now_v7(),
            customer_id: CustomerId::now_v7(),
            created_by: UserId::now_v7(),
            document_number: "AB123456".to_string(),
            recipient_name: "Rosa Quispe".to_string(),
            recipient_country: Some("PE".to_string()),
            record: TransferRecord::new(dec!(100), dec!(10), true).unwrap(),
            notes: None,
            created_at: chrono::Utc::now(),
        };
        serde_json::to_value(transfer).unwrap()
    }

    #[test]
    fn test_parse_rows_of_customers() {
        let row = serde_json::to_value(customer()).unwrap();
        let parsed: Vec<Customer> = parse_rows("f", &json!([row.clone(), row])).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].full_name, "Ana Ruiz");

        let empty: Vec<Customer> = parse_rows("f", &json!([])).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_rows_rejects_bad_shapes() {
        assert!(matches!(
            parse_rows::<Customer>("f", &json!({ "rows": [] })),
            Err(BoundaryError::NotAnArray { .. })
        ));
        assert!(matches!(
            parse_rows::<Customer>("f", &json!(["Ana"])),
            Err(BoundaryError::InvalidRow { index: 0, .. })
        ));

        let good = serde_json::to_value(customer()).unwrap();
        let mut bad = good.clone();
        bad["full_name"] = json!(42);
        assert!(matches!(
            parse_rows::<Customer>("f", &json!([good, bad])),
            Err(BoundaryError::InvalidRow { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_transfer_enforces_amount_invariants() {
        let parsed: Transfer = parse_record("f", &json!([transfer_row()])).unwrap();
        assert_eq!(parsed.record.net_amount(), dec!(90));

        let mut negative = transfer_row();
        negative["commission_amount"] = json!("-10");
        assert!(matches!(
            parse_record::<Transfer>("f", &negative),
            Err(BoundaryError::InvalidRow { .. })
        ));

        let mut inconsistent = transfer_row();
        inconsistent["net_amount"] = json!("100");
        assert!(matches!(
            parse_rows::<Transfer>("f", &json!([inconsistent])),
            Err(BoundaryError::InvalidRow { .. })
        ));
    }

    #[test]
    fn test_parse_optional_record() {
        assert_eq!(parse_optional_record::<Customer>("f", &Value::Null).unwrap(), None);
        assert_eq!(parse_optional_record::<Customer>("f", &json!([])).unwrap(), None);

        let c = customer();
        let parsed = parse_optional_record::<Customer>("f", &json!([c.clone()])).unwrap();
        assert_eq!(parsed, Some(c));
        assert!(parse_optional_record::<Customer>("f", &json!({ "full_name": "x" })).is_err());
    }

    #[tokio::test]
    async fn test_record_calls_are_parsed_strictly() {
        let transport = Arc::new(RecordingTransport {
            calls: Mutex::new(Vec::new()),
            response: Ok(json!([{ "customer_id": "not-a-uuid" }])),
        });
        let authority = RpcComplianceAuthority::new(transport.clone());
        let business_id = BusinessId::now_v7();

        let err = authority.customers_by_business(business_id).await.unwrap_err();
        assert!(matches!(err, AuthorityError::Boundary(BoundaryError::InvalidRow { .. })));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, CUSTOMERS_BY_BUSINESS_FN);
        assert_eq!(calls[0].1["p_business_id"], business_id.to_string());
    }

    #[tokio::test]
    async fn test_create_transfer_sends_payload() {
        let transport = Arc::new(RecordingTransport {
            calls: Mutex::new(Vec::new()),
            response: Ok(json!([transfer_row()])),
        });
        let authority = RpcComplianceAuthority::new(transport.clone());
        let data = NewTransfer {
            business_id: BusinessId::now_v7(),
            customer_id: CustomerId::now_v7(),
            created_by: UserId::now_v7(),
            document_number: "AB123456".to_string(),
            recipient_name: "Rosa Quispe".to_string(),
            recipient_country: None,
            record: TransferRecord::new(dec!(100), dec!(10), true).unwrap(),
            notes: None,
        };

        let transfer = authority.create_transfer(&data).await.unwrap();
        assert_eq!(transfer.record.net_amount(), dec!(90));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, CREATE_TRANSFER_FN);
        assert_eq!(calls[0].1["p_data"]["document_number"], "AB123456");
        assert_eq!(calls[0].1["p_data"]["net_amount"], "90");
    }

    #[tokio::test]
    async fn test_authority_propagates_transport_failure() {
        let transport = Arc::new(RecordingTransport {
            calls: Mutex::new(Vec::new()),
            response: Err(AuthorityError::Unavailable {
                reason: "connection refused".to_string(),
            }),
        });
        let authority = RpcComplianceAuthority::new(transport);
        let err = authority.check_eligibility(&query()).await.unwrap_err();
        assert!(matches!(err, AuthorityError::Unavailable { .. }));
    }
}
