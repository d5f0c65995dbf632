//! Compliance Service
//!
//! The single entry point the dashboard calls. Every operation runs the same
//! pipeline:
//!
//! 1. scan raw input for injection payloads and report them,
//! 2. sanitize each string by field kind,
//! 3. validate the whole form and return every field error at once,
//! 4. reads go through the cache, writes go to the authority and then run
//!    the matching invalidation recipe before the result is released.
//!
//! Public methods never fail: they resolve to a [`ServiceResponse`].

use crate::authority::{EligibilityAuthority, RecordAuthority};
use crate::error::{ServiceError, ServiceResult};
use crate::response::ServiceResponse;
use crate::security::{SecurityAlert, SecuritySink, TracingSecuritySink};
use chrono::NaiveDate;
use remitcap_core::{
    BusinessId, ClientForm, ComplianceConfig, Customer, CustomerId, CustomerPatch,
    EligibilityQuery, EligibilityResult, Locale, NewCustomer, NewTransfer, RawAmount, Transfer,
    TransferForm, TransferRecord, TtlTier, UserId,
};
use remitcap_guard::{Field, FieldKind, Message, Sanitizer, ValidationResult, Validator};
use remitcap_storage::{
    CacheKey, CacheStats, CacheStore, CacheStoreConfig, InvalidationReport, Invalidator,
    Mutation, SweepHandle, SweepSnapshot,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Facade over sanitization, validation, caching and the authority.
pub struct ComplianceService {
    config: ComplianceConfig,
    cache: Arc<CacheStore>,
    invalidator: Invalidator,
    sanitizer: Sanitizer,
    validator: Validator,
    eligibility: Arc<dyn EligibilityAuthority>,
    records: Arc<dyn RecordAuthority>,
    security: Arc<dyn SecuritySink>,
    locale: Locale,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl std::fmt::Debug for ComplianceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceService")
            .field("config", &self.config)
            .field("locale", &self.locale)
            .field("cache_size", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ComplianceService {
    /// Build a service with its own cache store sized from `config`.
    pub fn new(
        config: ComplianceConfig,
        eligibility: Arc<dyn EligibilityAuthority>,
        records: Arc<dyn RecordAuthority>,
    ) -> Self {
        let cache = Arc::new(CacheStore::new(CacheStoreConfig::from_settings(
            &config.cache,
        )));
        Self {
            invalidator: Invalidator::new(cache.clone()),
            sanitizer: Sanitizer::from_config(&config),
            validator: Validator::new(&config),
            cache,
            eligibility,
            records,
            security: Arc::new(TracingSecuritySink),
            locale: Locale::default(),
            sweeper: Mutex::new(None),
            config,
        }
    }

    /// Use an externally built store (e.g. one with a manual clock).
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.invalidator = Invalidator::new(cache.clone());
        self.cache = cache;
        self
    }

    pub fn with_security_sink(mut self, sink: Arc<dyn SecuritySink>) -> Self {
        self.security = sink;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start the background cache sweeper. Returns `false` if it is already
    /// running. Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut sweeper = self.sweeper_slot();
        if sweeper.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        *sweeper = Some(self.cache.spawn_sweeper());
        info!("compliance service started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.sweeper_slot()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Drop every cached entry; nothing may leak into the next session.
    pub fn sign_out(&self) -> InvalidationReport {
        self.invalidator.on_sign_out()
    }

    pub fn switch_tenant(&self) -> InvalidationReport {
        self.invalidator.on_tenant_switch()
    }

    /// Stop the sweeper and clear the cache.
    pub async fn dispose(&self) -> Option<SweepSnapshot> {
        let handle = self.sweeper_slot().take();
        let snapshot = match handle {
            Some(handle) => Some(handle.shutdown().await),
            None => None,
        };
        let removed = self.cache.clear();
        info!(removed, sweeper = ?snapshot, "compliance service disposed");
        snapshot
    }

    fn sweeper_slot(&self) -> MutexGuard<'_, Option<SweepHandle>> {
        self.sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // ELIGIBILITY
    // ========================================================================

    /// Whether the customer identified by `document_number` may transfer
    /// `amount` on behalf of `business_id`.
    ///
    /// The authority's snapshot for the `(document, business)` pair is cached
    /// and re-evaluated for each requested amount.
    pub async fn check_eligibility(
        &self,
        document_number: &str,
        business_id: BusinessId,
        user_id: UserId,
        amount: &RawAmount,
    ) -> ServiceResponse<EligibilityResult> {
        self.try_check_eligibility(document_number, business_id, user_id, amount)
            .await
            .into()
    }

    async fn try_check_eligibility(
        &self,
        document_number: &str,
        business_id: BusinessId,
        user_id: UserId,
        amount: &RawAmount,
    ) -> ServiceResult<EligibilityResult> {
        let raw_amount = amount.as_text();
        self.guard_inputs(
            "check_eligibility",
            [
                (Field::DocumentNumber.as_str(), Some(document_number)),
                (Field::Amount.as_str(), Some(raw_amount.as_str())),
            ],
        )?;

        let document = self
            .sanitizer
            .sanitize(FieldKind::DocumentNumber, document_number);
        let mut errors = BTreeMap::new();
        for (field, value) in [
            (Field::DocumentNumber, document.as_str()),
            (Field::Amount, raw_amount.as_str()),
        ] {
            if let Some(message) = self.validator.validate_field(field, value, self.locale) {
                errors.insert(field, message);
            }
        }
        self.ensure_valid(ValidationResult::from_errors(errors))?;

        let amount = self.sanitizer.amount(amount);
        let snapshot = self.eligibility_snapshot(&document, business_id, user_id, amount).await?;
        let verdict = snapshot.for_amount(amount);
        debug!(
            document = %document,
            %amount,
            can_transfer = verdict.can_transfer,
            available = %verdict.amount_available,
            "eligibility evaluated"
        );
        Ok(verdict)
    }

    async fn eligibility_snapshot(
        &self,
        document: &str,
        business_id: BusinessId,
        user_id: UserId,
        amount: Decimal,
    ) -> ServiceResult<EligibilityResult> {
        let key = CacheKey::eligibility(document, business_id)?;
        let query = EligibilityQuery {
            document_number: document.to_string(),
            business_id,
            user_id,
            amount,
        };
        let query = &query;
        self.cache
            .get_or_set(key.as_str(), Some(self.ttl(TtlTier::Eligibility)), move || async move {
                self.eligibility
                    .check_eligibility(query)
                    .await
                    .map_err(|e| self.authority_failure("check_eligibility", e))
            })
            .await
    }

    // ========================================================================
    // CUSTOMERS
    // ========================================================================

    pub async fn get_customers_by_business(
        &self,
        business_id: BusinessId,
    ) -> ServiceResponse<Vec<Customer>> {
        self.customers_by_business(business_id).await.into()
    }

    async fn customers_by_business(&self, business_id: BusinessId) -> ServiceResult<Vec<Customer>> {
        let key = CacheKey::customers_by_business(business_id)?;
        self.cache
            .get_or_set(key.as_str(), Some(self.ttl(TtlTier::Lists)), move || async move {
                self.records
                    .customers_by_business(business_id)
                    .await
                    .map_err(|e| self.authority_failure("customers_by_business", e))
            })
            .await
    }

    /// A customer of `business_id`. Customers of other businesses are
    /// reported as not found.
    pub async fn get_customer_by_id(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> ServiceResponse<Customer> {
        self.customer_of(business_id, customer_id).await.into()
    }

    async fn customer_of(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> ServiceResult<Customer> {
        let key = CacheKey::customer_by_id(customer_id)?;
        let customer = match self.cache.get::<Customer>(key.as_str()) {
            Some(customer) => customer,
            None => {
                let customer = self
                    .records
                    .customer_by_id(customer_id)
                    .await
                    .map_err(|e| self.authority_failure("customer_by_id", e))?
                    .ok_or_else(|| ServiceError::not_found("Customer", customer_id))?;
                self.cache
                    .set_with_ttl(key.into_string(), customer.clone(), self.ttl(TtlTier::Stable));
                customer
            }
        };

        if customer.business_id != business_id {
            warn!(%customer_id, %business_id, "customer requested by another business");
            return Err(ServiceError::not_found("Customer", customer_id));
        }
        Ok(customer)
    }

    /// Customers of `business_id` matching `query` by name or document. An
    /// empty query lists every customer.
    pub async fn search_customers(
        &self,
        business_id: BusinessId,
        query: &str,
    ) -> ServiceResponse<Vec<Customer>> {
        self.try_search_customers(business_id, query).await.into()
    }

    async fn try_search_customers(
        &self,
        business_id: BusinessId,
        query: &str,
    ) -> ServiceResult<Vec<Customer>> {
        self.guard_inputs("search_customers", [("query", Some(query))])?;
        let query = self.sanitizer.sanitize(FieldKind::Text, query);
        if query.is_empty() {
            return self.customers_by_business(business_id).await;
        }

        let key = CacheKey::customer_search(business_id, &query)?;
        let query = query.as_str();
        self.cache
            .get_or_set(key.as_str(), Some(self.ttl(TtlTier::Lists)), move || async move {
                self.records
                    .search_customers(business_id, query)
                    .await
                    .map_err(|e| self.authority_failure("search_customers", e))
            })
            .await
    }

    pub async fn create_customer(
        &self,
        business_id: BusinessId,
        form: &ClientForm,
    ) -> ServiceResponse<Customer> {
        self.try_create_customer(business_id, form).await.into()
    }

    async fn try_create_customer(
        &self,
        business_id: BusinessId,
        form: &ClientForm,
    ) -> ServiceResult<Customer> {
        let form = self.prepare_client_form("create_customer", form)?;
        let data = NewCustomer {
            business_id,
            date_of_birth: parse_date(form.date_of_birth.as_deref()),
            full_name: form.full_name,
            document_number: form.document_number,
            email: form.email,
            phone: form.phone,
            fiscal_code: form.fiscal_code,
            address: form.address,
        };

        let customer = self
            .records
            .create_customer(&data)
            .await
            .map_err(|e| self.authority_failure("create_customer", e))?;
        self.invalidator
            .after_customer_saved(business_id, customer.customer_id)?;
        info!(customer_id = %customer.customer_id, %business_id, "customer created");
        Ok(customer)
    }

    /// Replace the editable fields of an existing customer with `form`.
    /// Optional fields left empty keep their stored value.
    pub async fn update_customer(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
        form: &ClientForm,
    ) -> ServiceResponse<Customer> {
        self.try_update_customer(business_id, customer_id, form)
            .await
            .into()
    }

    async fn try_update_customer(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
        form: &ClientForm,
    ) -> ServiceResult<Customer> {
        let form = self.prepare_client_form("update_customer", form)?;
        // Ownership check before touching the record.
        self.customer_of(business_id, customer_id).await?;

        let patch = CustomerPatch {
            date_of_birth: parse_date(form.date_of_birth.as_deref()),
            full_name: Some(form.full_name),
            document_number: Some(form.document_number),
            email: form.email,
            phone: form.phone,
            fiscal_code: form.fiscal_code,
            address: form.address,
        };
        let customer = self
            .records
            .update_customer(customer_id, &patch)
            .await
            .map_err(|e| self.authority_failure("update_customer", e))?;
        self.invalidator.after_customer_saved(business_id, customer_id)?;
        info!(%customer_id, %business_id, "customer updated");
        Ok(customer)
    }

    fn prepare_client_form(
        &self,
        operation: &'static str,
        form: &ClientForm,
    ) -> ServiceResult<ClientForm> {
        self.guard_inputs(
            operation,
            [
                (Field::FullName.as_str(), Some(form.full_name.as_str())),
                (Field::DocumentNumber.as_str(), Some(form.document_number.as_str())),
                (Field::DateOfBirth.as_str(), form.date_of_birth.as_deref()),
                (Field::Email.as_str(), form.email.as_deref()),
                (Field::Phone.as_str(), form.phone.as_deref()),
                (Field::FiscalCode.as_str(), form.fiscal_code.as_deref()),
                (Field::Address.as_str(), form.address.as_deref()),
            ],
        )?;

        let s = &self.sanitizer;
        let clean = ClientForm {
            full_name: s.sanitize(FieldKind::Name, &form.full_name),
            document_number: s.sanitize(FieldKind::DocumentNumber, &form.document_number),
            date_of_birth: s.sanitize_opt(FieldKind::Text, form.date_of_birth.as_deref()),
            email: s.sanitize_opt(FieldKind::Email, form.email.as_deref()),
            phone: s.sanitize_opt(FieldKind::Phone, form.phone.as_deref()),
            fiscal_code: s.sanitize_opt(FieldKind::FiscalCode, form.fiscal_code.as_deref()),
            address: s.sanitize_opt(FieldKind::Text, form.address.as_deref()),
        };
        self.ensure_valid(self.validator.validate_client_form(&clean, self.locale))?;
        Ok(clean)
    }

    // ========================================================================
    // TRANSFERS
    // ========================================================================

    pub async fn get_transfers_by_business(
        &self,
        business_id: BusinessId,
    ) -> ServiceResponse<Vec<Transfer>> {
        self.transfers_by_business(business_id).await.into()
    }

    async fn transfers_by_business(&self, business_id: BusinessId) -> ServiceResult<Vec<Transfer>> {
        let key = CacheKey::transfers_by_business(business_id)?;
        self.cache
            .get_or_set(key.as_str(), Some(self.ttl(TtlTier::Lists)), move || async move {
                self.records
                    .transfers_by_business(business_id)
                    .await
                    .map_err(|e| self.authority_failure("transfers_by_business", e))
            })
            .await
    }

    /// Transfers of one customer, restricted to those made through
    /// `business_id`.
    pub async fn get_transfers_by_customer(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> ServiceResponse<Vec<Transfer>> {
        self.transfers_by_customer(business_id, customer_id)
            .await
            .into()
    }

    async fn transfers_by_customer(
        &self,
        business_id: BusinessId,
        customer_id: CustomerId,
    ) -> ServiceResult<Vec<Transfer>> {
        let key = CacheKey::transfers_by_customer(customer_id)?;
        let transfers: Vec<Transfer> = self
            .cache
            .get_or_set(key.as_str(), Some(self.ttl(TtlTier::Lists)), move || async move {
                self.records
                    .transfers_by_customer(customer_id)
                    .await
                    .map_err(|e| self.authority_failure("transfers_by_customer", e))
            })
            .await?;
        Ok(transfers
            .into_iter()
            .filter(|t| t.business_id == business_id)
            .collect())
    }

    /// Record a transfer.
    ///
    /// The amount is validated as submitted, before any clamping, and the
    /// net amount is checked against a fresh (uncached) eligibility answer.
    pub async fn create_transfer(
        &self,
        business_id: BusinessId,
        user_id: UserId,
        form: &TransferForm,
    ) -> ServiceResponse<Transfer> {
        self.try_create_transfer(business_id, user_id, form)
            .await
            .into()
    }

    async fn try_create_transfer(
        &self,
        business_id: BusinessId,
        user_id: UserId,
        form: &TransferForm,
    ) -> ServiceResult<Transfer> {
        let raw_amount = form.amount.as_text();
        let raw_commission = form.commission_amount.as_ref().map(RawAmount::as_text);
        self.guard_inputs(
            "create_transfer",
            [
                (Field::DocumentNumber.as_str(), Some(form.document_number.as_str())),
                (Field::RecipientName.as_str(), Some(form.recipient_name.as_str())),
                (Field::RecipientCountry.as_str(), form.recipient_country.as_deref()),
                (Field::Notes.as_str(), form.notes.as_deref()),
                (Field::Amount.as_str(), Some(raw_amount.as_str())),
                (Field::CommissionAmount.as_str(), raw_commission.as_deref()),
            ],
        )?;

        let s = &self.sanitizer;
        let clean = TransferForm {
            customer_id: form.customer_id,
            document_number: s.sanitize(FieldKind::DocumentNumber, &form.document_number),
            recipient_name: s.sanitize(FieldKind::Name, &form.recipient_name),
            recipient_country: s.sanitize_opt(FieldKind::Text, form.recipient_country.as_deref()),
            notes: s.sanitize_opt(FieldKind::Text, form.notes.as_deref()),
            // Amounts stay raw so the validator sees what the user typed.
            amount: form.amount.clone(),
            commission_amount: form.commission_amount.clone(),
            commission_included: form.commission_included,
        };
        let validation = self.validator.validate_transfer_form(&clean, self.locale);
        if validation.ceiling_breached {
            warn!(
                amount = %raw_amount,
                commission = ?raw_commission,
                ceiling = %self.config.ceiling,
                "transfer above legal ceiling"
            );
            return Err(ServiceError::ceiling_exceeded_fields(
                self.config.ceiling,
                validation.field_errors(),
            ));
        }
        self.ensure_valid(validation)?;
        let (amount, commission) = self
            .validator
            .transfer_amounts(&clean)
            .ok_or_else(|| ServiceError::internal_error("Validated amounts failed to parse"))?;

        let customer_id = clean
            .customer_id
            .ok_or_else(|| ServiceError::invalid_state("Customer is required"))?;
        let customer = self.customer_of(business_id, customer_id).await?;
        if customer.document_number != clean.document_number {
            let mut errors = BTreeMap::new();
            errors.insert(
                Field::DocumentNumber.to_string(),
                Message::InvalidDocument.text(self.locale),
            );
            return Err(ServiceError::validation_failed(errors));
        }

        let record = TransferRecord::new(amount, commission, clean.commission_included)?;
        record.ensure_within(self.config.ceiling)?;

        // Derive every invalidation key before writing anything.
        let mutation = Mutation::TransferRecorded {
            business_id,
            customer_id,
            document_number: clean.document_number.clone(),
        };
        mutation.scopes()?;

        let verdict = self
            .eligibility
            .check_eligibility(&EligibilityQuery {
                document_number: clean.document_number.clone(),
                business_id,
                user_id,
                amount: record.net_amount(),
            })
            .await
            .map_err(|e| self.authority_failure("check_eligibility", e))?;
        if !verdict.can_transfer || record.net_amount() > verdict.amount_available {
            info!(
                document = %clean.document_number,
                net_amount = %record.net_amount(),
                available = %verdict.amount_available,
                "transfer refused: window capacity exceeded"
            );
            return Err(ServiceError::window_capacity_exceeded(&verdict));
        }

        let data = NewTransfer {
            business_id,
            customer_id,
            created_by: user_id,
            document_number: clean.document_number,
            recipient_name: clean.recipient_name,
            recipient_country: clean.recipient_country,
            record,
            notes: clean.notes,
        };
        let transfer = self
            .records
            .create_transfer(&data)
            .await
            .map_err(|e| self.authority_failure("create_transfer", e))?;
        self.invalidator.apply(&mutation)?;
        info!(
            transfer_id = %transfer.transfer_id,
            %business_id,
            %customer_id,
            net_amount = %transfer.record.net_amount(),
            "transfer recorded"
        );
        Ok(transfer)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn ttl(&self, tier: TtlTier) -> std::time::Duration {
        self.config.cache.ttl(tier)
    }

    /// Reject the operation if any raw input carries an injection payload.
    fn guard_inputs<const N: usize>(
        &self,
        operation: &'static str,
        inputs: [(&'static str, Option<&str>); N],
    ) -> ServiceResult<()> {
        let Some(alert) = SecurityAlert::scan(operation, inputs) else {
            return Ok(());
        };
        self.security.report(&alert);
        let message = Message::Security.text(self.locale);
        let fields = alert
            .field_names()
            .map(|name| (name.to_string(), message.clone()))
            .collect();
        Err(ServiceError::security_violation(fields))
    }

    fn ensure_valid(&self, result: ValidationResult) -> ServiceResult<()> {
        if result.is_valid {
            return Ok(());
        }
        let fields = result.field_errors();
        debug!(fields = ?fields.keys().collect::<Vec<_>>(), "validation failed");
        Err(ServiceError::validation_failed(fields))
    }

    fn authority_failure(
        &self,
        operation: &'static str,
        err: remitcap_core::AuthorityError,
    ) -> ServiceError {
        error!(operation, error = %err, "authority call failed");
        err.into()
    }
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
}
