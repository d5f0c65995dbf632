//! Customer and transfer entities exchanged with the record authority.

use crate::error::RecordError;
use crate::identity::{BusinessId, CustomerId, Timestamp, TransferId, UserId};
use crate::money::{round_money, Money};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// CUSTOMERS
// ============================================================================

/// A persisted customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub business_id: BusinessId,
    pub full_name: String,
    pub document_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fiscal_code: Option<String>,
    pub address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Sanitized, validated payload for creating a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub business_id: BusinessId,
    pub full_name: String,
    pub document_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fiscal_code: Option<String>,
    pub address: Option<String>,
}

/// Sanitized, validated changes to an existing customer.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl CustomerPatch {
    /// Whether any field is set.
    pub fn has_any_updates(&self) -> bool {
        self.full_name.is_some()
            || self.document_number.is_some()
            || self.date_of_birth.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.fiscal_code.is_some()
            || self.address.is_some()
    }

    /// Apply the patch to a customer in place.
    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(v) = &self.full_name {
            customer.full_name = v.clone();
        }
        if let Some(v) = &self.document_number {
            customer.document_number = v.clone();
        }
        if let Some(v) = self.date_of_birth {
            customer.date_of_birth = Some(v);
        }
        if let Some(v) = &self.email {
            customer.email = Some(v.clone());
        }
        if let Some(v) = &self.phone {
            customer.phone = Some(v.clone());
        }
        if let Some(v) = &self.fiscal_code {
            customer.fiscal_code = Some(v.clone());
        }
        if let Some(v) = &self.address {
            customer.address = Some(v.clone());
        }
    }
}

// ============================================================================
// TRANSFERS
// ============================================================================

/// Amount breakdown of a transfer.
///
/// `net_amount` is what counts against the rolling ceiling: when the quoted
/// amount already bundles the commission, the commission is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransferRecordRepr", into = "TransferRecordRepr")]
pub struct TransferRecord {
    amount: Money,
    commission_amount: Money,
    commission_included: bool,
    net_amount: Money,
}

#[derive(Serialize, Deserialize)]
struct TransferRecordRepr {
    amount: Money,
    commission_amount: Money,
    commission_included: bool,
    net_amount: Money,
}

impl TransferRecord {
    /// Build a record, deriving the net amount.
    pub fn new(
        amount: Money,
        commission_amount: Money,
        commission_included: bool,
    ) -> Result<Self, RecordError> {
        let amount = round_money(amount);
        let commission_amount = round_money(commission_amount);

        if amount < Decimal::ZERO {
            return Err(RecordError::AmountOutOfRange {
                amount,
                ceiling: Decimal::MAX,
            });
        }
        if commission_amount < Decimal::ZERO {
            return Err(RecordError::NegativeCommission {
                commission: commission_amount,
            });
        }
        if commission_included && commission_amount > amount {
            return Err(RecordError::CommissionExceedsAmount {
                commission: commission_amount,
                amount,
            });
        }

        let net_amount = if commission_included {
            amount - commission_amount
        } else {
            amount
        };

        Ok(Self {
            amount,
            commission_amount,
            commission_included,
            net_amount,
        })
    }

    /// Reject records whose gross amount exceeds the ceiling.
    pub fn ensure_within(&self, ceiling: Money) -> Result<(), RecordError> {
        if self.amount > ceiling {
            return Err(RecordError::AmountOutOfRange {
                amount: self.amount,
                ceiling,
            });
        }
        Ok(())
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn commission_amount(&self) -> Money {
        self.commission_amount
    }

    pub fn commission_included(&self) -> bool {
        self.commission_included
    }

    /// The amount counted against the rolling ceiling.
    pub fn net_amount(&self) -> Money {
        self.net_amount
    }
}

impl TryFrom<TransferRecordRepr> for TransferRecord {
    type Error = RecordError;

    fn try_from(repr: TransferRecordRepr) -> Result<Self, Self::Error> {
        let record = Self::new(repr.amount, repr.commission_amount, repr.commission_included)?;
        if round_money(repr.net_amount) != record.net_amount {
            return Err(RecordError::NetAmountMismatch {
                stored: repr.net_amount,
                computed: record.net_amount,
            });
        }
        Ok(record)
    }
}

impl From<TransferRecord> for TransferRecordRepr {
    fn from(record: TransferRecord) -> Self {
        Self {
            amount: record.amount,
            commission_amount: record.commission_amount,
            commission_included: record.commission_included,
            net_amount: record.net_amount,
        }
    }
}

/// A persisted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub transfer_id: TransferId,
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub created_by: UserId,
    pub document_number: String,
    pub recipient_name: String,
    pub recipient_country: Option<String>,
    #[serde(flatten)]
    pub record: TransferRecord,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// Sanitized, validated payload for recording a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransfer {
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub created_by: UserId,
    pub document_number: String,
    pub recipient_name: String,
    pub recipient_country: Option<String>,
    #[serde(flatten)]
    pub record: TransferRecord,
    pub notes: Option<String>,
}
