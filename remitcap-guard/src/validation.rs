//! Validation engine.
//!
//! Field rules return localized messages; whole-form entry points aggregate
//! every failing field into one [`ValidationResult`] and never stop at the
//! first error.

use crate::messages::Message;
use crate::patterns::contains_dangerous_patterns;
use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use remitcap_core::{ClientForm, ComplianceConfig, Locale, Money, RawAmount, TransferForm};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

const MIN_NAME_CHARS: usize = 2;
const MAX_NAME_CHARS: usize = 150;
const MAX_DOCUMENT_CHARS: usize = 30;
const MAX_EMAIL_CHARS: usize = 100;
const MAX_FREE_TEXT_CHARS: usize = 500;
const MIN_PHONE_DIGITS: usize = 7;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid email regex")
});
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9\s\-()]{7,20}$").expect("Invalid phone regex"));
static DOCUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid document regex"));
static FISCAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{9,16}$").expect("Invalid fiscal code regex"));
static DECIMAL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-]?)0*(\d*)(?:\.\d*)?$").expect("Invalid decimal regex"));
static UUID_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("Invalid uuid regex")
});

// ============================================================================
// FIELDS
// ============================================================================

/// Form fields known to the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FullName,
    RecipientName,
    CustomerId,
    DocumentNumber,
    DateOfBirth,
    Email,
    Phone,
    FiscalCode,
    Address,
    Amount,
    CommissionAmount,
    RecipientCountry,
    Notes,
    Password,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FullName => "full_name",
            Field::RecipientName => "recipient_name",
            Field::CustomerId => "customer_id",
            Field::DocumentNumber => "document_number",
            Field::DateOfBirth => "date_of_birth",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::FiscalCode => "fiscal_code",
            Field::Address => "address",
            Field::Amount => "amount",
            Field::CommissionAmount => "commission_amount",
            Field::RecipientCountry => "recipient_country",
            Field::Notes => "notes",
            Field::Password => "password",
        }
    }

    /// Fields that may be left empty.
    fn is_optional(&self) -> bool {
        matches!(
            self,
            Field::DateOfBirth
                | Field::Email
                | Field::Phone
                | Field::FiscalCode
                | Field::Address
                | Field::CommissionAmount
                | Field::RecipientCountry
                | Field::Notes
        )
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// Outcome of validating a whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<Field, String>,
    /// A monetary field exceeded the legal ceiling.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ceiling_breached: bool,
}

impl ValidationResult {
    pub fn from_errors(errors: BTreeMap<Field, String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            ceiling_breached: false,
        }
    }

    pub fn valid() -> Self {
        Self::from_errors(BTreeMap::new())
    }

    pub fn error_for(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Errors keyed by wire field name.
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|(field, message)| (field.as_str().to_string(), message.clone()))
            .collect()
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Applies field rules with the configured jurisdiction limits.
#[derive(Debug, Clone)]
pub struct Validator {
    ceiling: Money,
    minimum_age_years: Option<u32>,
    min_document_length: usize,
    min_password_length: usize,
    today: Option<NaiveDate>,
}

impl Validator {
    pub fn new(config: &ComplianceConfig) -> Self {
        Self {
            ceiling: config.ceiling,
            minimum_age_years: config.minimum_age_years,
            min_document_length: config.min_document_length,
            min_password_length: config.min_password_length,
            today: None,
        }
    }

    /// Pin the reference date used for age and future-date checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn ceiling(&self) -> Money {
        self.ceiling
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Validate one field, returning a message in `locale` on failure.
    pub fn validate_field(&self, field: Field, value: &str, locale: Locale) -> Option<String> {
        self.check(field, value).err().map(|m| m.text(locale))
    }

    fn check(&self, field: Field, value: &str) -> Result<(), Message> {
        if contains_dangerous_patterns(value) {
            return Err(Message::Security);
        }
        let value = value.trim();
        if value.is_empty() {
            return if field.is_optional() {
                Ok(())
            } else {
                Err(Message::Required)
            };
        }

        match field {
            Field::FullName | Field::RecipientName => check_name(value),
            Field::CustomerId => {
                if UUID_SHAPE.is_match(value) {
                    Ok(())
                } else {
                    Err(Message::Required)
                }
            }
            Field::DocumentNumber => self.check_document(value),
            Field::DateOfBirth => self.check_date_of_birth(value),
            Field::Email => {
                if value.chars().count() > MAX_EMAIL_CHARS {
                    Err(Message::TooLong { max: MAX_EMAIL_CHARS })
                } else if EMAIL.is_match(value) {
                    Ok(())
                } else {
                    Err(Message::InvalidEmail)
                }
            }
            Field::Phone => check_phone(value),
            Field::FiscalCode => {
                if FISCAL_CODE.is_match(&value.to_uppercase()) {
                    Ok(())
                } else {
                    Err(Message::InvalidFiscalCode)
                }
            }
            Field::Address | Field::RecipientCountry | Field::Notes => {
                if value.chars().count() > MAX_FREE_TEXT_CHARS {
                    Err(Message::TooLong {
                        max: MAX_FREE_TEXT_CHARS,
                    })
                } else {
                    Ok(())
                }
            }
            Field::Amount => self.check_amount(&RawAmount::Text(value.to_string())).map(|_| ()),
            Field::CommissionAmount => self
                .check_commission(&RawAmount::Text(value.to_string()))
                .map(|_| ()),
            Field::Password => self.check_password(value),
        }
    }

    fn check_document(&self, value: &str) -> Result<(), Message> {
        let len = value.chars().count();
        if len < self.min_document_length {
            return Err(Message::TooShort {
                min: self.min_document_length,
            });
        }
        if len > MAX_DOCUMENT_CHARS {
            return Err(Message::TooLong {
                max: MAX_DOCUMENT_CHARS,
            });
        }
        if !DOCUMENT.is_match(value) {
            return Err(Message::InvalidDocument);
        }
        Ok(())
    }

    fn check_date_of_birth(&self, value: &str) -> Result<(), Message> {
        let dob = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Message::InvalidDate)?;
        let today = self.today();
        if dob > today {
            return Err(Message::FutureDate);
        }
        if let Some(min_years) = self.minimum_age_years {
            if age_on(dob, today) < min_years {
                return Err(Message::Underage { min_years });
            }
        }
        Ok(())
    }

    /// Parse and check a transfer amount before any clamping.
    fn check_amount(&self, raw: &RawAmount) -> Result<Money, Message> {
        let amount = parse_amount(raw).ok_or(Message::InvalidAmount)?;
        if amount <= Decimal::ZERO {
            return Err(Message::AmountNotPositive);
        }
        if amount > self.ceiling {
            return Err(Message::AmountAboveCeiling {
                ceiling: self.ceiling,
            });
        }
        Ok(amount)
    }

    /// A commission is optional, never negative and bound by the same
    /// ceiling as the amount.
    fn check_commission(&self, raw: &RawAmount) -> Result<Money, Message> {
        if let RawAmount::Text(text) = raw {
            if contains_dangerous_patterns(text) {
                return Err(Message::Security);
            }
            if text.trim().is_empty() {
                return Ok(Decimal::ZERO);
            }
        }
        let commission = parse_amount(raw).ok_or(Message::InvalidAmount)?;
        if commission < Decimal::ZERO {
            return Err(Message::CommissionNegative);
        }
        if commission > self.ceiling {
            return Err(Message::AmountAboveCeiling {
                ceiling: self.ceiling,
            });
        }
        Ok(commission)
    }

    fn check_password(&self, value: &str) -> Result<(), Message> {
        let long_enough = value.chars().count() >= self.min_password_length;
        let has_upper = value.chars().any(char::is_uppercase);
        let has_lower = value.chars().any(char::is_lowercase);
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        if long_enough && has_upper && has_lower && has_digit {
            Ok(())
        } else {
            Err(Message::WeakPassword {
                min: self.min_password_length,
            })
        }
    }

    // ========================================================================
    // WHOLE FORMS
    // ========================================================================

    /// Validate every field of a customer form.
    pub fn validate_client_form(&self, form: &ClientForm, locale: Locale) -> ValidationResult {
        let mut errors = BTreeMap::new();
        let fields: [(Field, Option<&str>); 7] = [
            (Field::FullName, Some(form.full_name.as_str())),
            (Field::DocumentNumber, Some(form.document_number.as_str())),
            (Field::DateOfBirth, form.date_of_birth.as_deref()),
            (Field::Email, form.email.as_deref()),
            (Field::Phone, form.phone.as_deref()),
            (Field::FiscalCode, form.fiscal_code.as_deref()),
            (Field::Address, form.address.as_deref()),
        ];
        for (field, value) in fields {
            if let Err(message) = self.check(field, value.unwrap_or_default()) {
                errors.insert(field, message.text(locale));
            }
        }
        ValidationResult::from_errors(errors)
    }

    /// Validate every field of a transfer form, including the commission
    /// relationship to the amount.
    pub fn validate_transfer_form(&self, form: &TransferForm, locale: Locale) -> ValidationResult {
        let mut errors = BTreeMap::new();
        let mut ceiling_breached = false;
        let mut record = |field: Field, result: Result<(), Message>| {
            if let Err(message) = result {
                ceiling_breached |= matches!(message, Message::AmountAboveCeiling { .. });
                errors.insert(field, message.text(locale));
            }
        };

        record(
            Field::CustomerId,
            match form.customer_id {
                Some(_) => Ok(()),
                None => Err(Message::Required),
            },
        );
        record(
            Field::DocumentNumber,
            self.check(Field::DocumentNumber, &form.document_number),
        );
        record(
            Field::RecipientName,
            self.check(Field::RecipientName, &form.recipient_name),
        );
        record(
            Field::RecipientCountry,
            self.check(
                Field::RecipientCountry,
                form.recipient_country.as_deref().unwrap_or_default(),
            ),
        );
        record(
            Field::Notes,
            self.check(Field::Notes, form.notes.as_deref().unwrap_or_default()),
        );

        let amount = self.check_raw_amount(&form.amount);
        let commission = match &form.commission_amount {
            Some(raw) => self.check_commission(raw).map(Some),
            None => Ok(None),
        };
        let commission_result = match (&amount, &commission) {
            (Ok(amount), Ok(Some(commission))) if form.commission_included => {
                if commission > amount {
                    Err(Message::CommissionAboveAmount)
                } else if commission == amount {
                    // Nothing would be sent.
                    Err(Message::CommissionConsumesAmount)
                } else {
                    Ok(())
                }
            }
            (_, Err(message)) => Err(message.clone()),
            _ => Ok(()),
        };
        record(Field::Amount, amount.map(|_| ()));
        record(Field::CommissionAmount, commission_result);

        let mut result = ValidationResult::from_errors(errors);
        result.ceiling_breached = ceiling_breached;
        result
    }

    /// The amount and commission of a transfer form exactly as submitted,
    /// or `None` if either fails its field rules. Nothing is clamped.
    pub fn transfer_amounts(&self, form: &TransferForm) -> Option<(Money, Money)> {
        let amount = self.check_raw_amount(&form.amount).ok()?;
        let commission = match &form.commission_amount {
            Some(raw) => self.check_commission(raw).ok()?,
            None => Decimal::ZERO,
        };
        Some((amount, commission))
    }

    fn check_raw_amount(&self, raw: &RawAmount) -> Result<Money, Message> {
        if let RawAmount::Text(text) = raw {
            if contains_dangerous_patterns(text) {
                return Err(Message::Security);
            }
            if text.trim().is_empty() {
                return Err(Message::Required);
            }
        }
        self.check_amount(raw)
    }
}

fn check_name(value: &str) -> Result<(), Message> {
    let visible = value.chars().filter(|c| !c.is_whitespace()).count();
    if visible < MIN_NAME_CHARS {
        return Err(Message::TooShort {
            min: MIN_NAME_CHARS,
        });
    }
    if value.chars().count() > MAX_NAME_CHARS {
        return Err(Message::TooLong {
            max: MAX_NAME_CHARS,
        });
    }
    Ok(())
}

fn check_phone(value: &str) -> Result<(), Message> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if PHONE.is_match(value) && digits >= MIN_PHONE_DIGITS {
        Ok(())
    } else {
        Err(Message::InvalidPhone)
    }
}

/// Strict parse: text must be a plain decimal, numbers must be finite.
///
/// Well-formed values beyond the range of `Decimal` saturate to its bounds,
/// so they fail the range checks rather than reading as malformed.
fn parse_amount(raw: &RawAmount) -> Option<Money> {
    match raw {
        RawAmount::Number(n) if n.is_finite() => raw.as_number().or_else(|| {
            (n.abs() >= 1.0).then(|| saturated(n.is_sign_negative()))
        }),
        RawAmount::Number(_) => None,
        RawAmount::Text(text) => {
            let text = text.trim();
            if let Ok(amount) = Decimal::from_str(text) {
                return Some(amount);
            }
            let caps = DECIMAL_SHAPE.captures(text)?;
            // Decimal holds at most 29 integer digits.
            (caps[2].len() >= 29).then(|| saturated(&caps[1] == "-"))
        }
    }
}

fn saturated(negative: bool) -> Money {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Whole years between `dob` and `today`.
fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
