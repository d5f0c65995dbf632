//! Eligibility verdicts produced by the external authority.
//!
//! The authority owns the rolling-window rule. These types only carry its
//! answer, plus the one derivation the client is allowed to make: applying a
//! known usage snapshot to a different requested amount.

use crate::identity::{BusinessId, UserId};
use crate::money::{round_money, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityQuery {
    /// Customer identity document, already sanitized.
    pub document_number: String,
    /// Business asking the question.
    pub business_id: BusinessId,
    /// Operator asking the question.
    pub user_id: UserId,
    /// Candidate transfer amount.
    pub amount: Money,
}

/// Verdict for a customer/business pair.
///
/// `amount_used` and `amount_available` describe the pair, not the requested
/// amount, which is why one verdict may be re-evaluated for other amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub can_transfer: bool,
    pub amount_used: Money,
    pub amount_available: Money,
    pub days_remaining: u32,
    pub message: String,
}

impl EligibilityResult {
    /// Apply this usage snapshot to a different requested amount.
    ///
    /// The transfer fits iff it is positive and no larger than the remaining
    /// capacity. The authority's message is kept when the verdict does not
    /// change.
    pub fn for_amount(&self, amount: Money) -> Self {
        let can_transfer = amount > Decimal::ZERO && amount <= self.amount_available;
        let message = if can_transfer == self.can_transfer {
            self.message.clone()
        } else if can_transfer {
            format!("Transfer allowed. Available: {}", round_money(self.amount_available))
        } else {
            format!(
                "Amount exceeds available capacity of {}. Capacity frees up in {} day(s)",
                round_money(self.amount_available),
                self.days_remaining
            )
        };

        Self {
            can_transfer,
            amount_used: self.amount_used,
            amount_available: self.amount_available,
            days_remaining: self.days_remaining,
            message,
        }
    }

    /// Whether used and available amounts account for the whole ceiling.
    ///
    /// This can legitimately be false while part of the window is expiring,
    /// so it is diagnostic only.
    pub fn accounts_for(&self, ceiling: Money) -> bool {
        self.amount_used + self.amount_available == ceiling
    }

    /// Whether the customer has any capacity left at all.
    pub fn has_capacity(&self) -> bool {
        self.amount_available > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(used: Decimal, available: Decimal) -> EligibilityResult {
        EligibilityResult {
            can_transfer: available > Decimal::ZERO,
            amount_used: used,
            amount_available: available,
            days_remaining: 3,
            message: "ok".to_string(),
        }
    }

    #[test]
    fn test_for_amount_rejects_over_capacity() {
        let verdict = snapshot(dec!(549), dec!(450)).for_amount(dec!(500));
        assert!(!verdict.can_transfer);
        assert_eq!(verdict.amount_available, dec!(450));
        assert!(verdict.message.contains("450"));
    }

    #[test]
    fn test_for_amount_accepts_exact_capacity() {
        let verdict = snapshot(dec!(549), dec!(450)).for_amount(dec!(450));
        assert!(verdict.can_transfer);
        assert_eq!(verdict.message, "ok");
    }

    #[test]
    fn test_for_amount_rejects_zero() {
        let verdict = snapshot(dec!(0), dec!(999)).for_amount(Decimal::ZERO);
        assert!(!verdict.can_transfer);
    }

    #[test]
    fn test_accounts_for_ceiling() {
        assert!(snapshot(dec!(549), dec!(450)).accounts_for(dec!(999)));
        assert!(!snapshot(dec!(500), dec!(450)).accounts_for(dec!(999)));
    }

    #[test]
    fn test_has_capacity() {
        assert!(!snapshot(dec!(999), dec!(0)).has_capacity());
        assert!(snapshot(dec!(998), dec!(1)).has_capacity());
    }
}
