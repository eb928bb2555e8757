// 💸 Payment Item Entity - one cash-flow event
//
// Negative amount = outflow (expense), positive = inflow (income).
// `tag_ids` is the tag set (at most one tag per dimension) and
// `standard_tag_id` mirrors the member that lives in the standard dimension.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::conversion_error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub id: String,
    pub owner_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Marks a template item; stored only, nothing is scheduled from it
    pub periodic: bool,
    pub description: Option<String>,
    pub recipient_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub standard_tag_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentItem {
    pub(crate) const COLUMNS: &'static str = "id, owner_id, amount, date, periodic, description, \
         recipient_id, standard_tag_id, created_at";

    pub fn is_expense(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_income(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids.iter().any(|id| id == tag_id)
    }

    /// Map a row selected with `COLUMNS`; the tag set is loaded separately
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let amount: String = row.get(2)?;
        let amount = Decimal::from_str(&amount).map_err(|e| conversion_error(2, e))?;

        Ok(PaymentItem {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            amount,
            date: row.get(3)?,
            periodic: row.get(4)?,
            description: row.get(5)?,
            recipient_id: row.get(6)?,
            tag_ids: Vec::new(),
            standard_tag_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

/// Input for creating a payment item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentItem {
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    /// Omitted and empty both fall back to the owner's UNCLASSIFIED tag
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
}

impl NewPaymentItem {
    pub fn new(amount: Decimal, date: NaiveDate) -> Self {
        NewPaymentItem {
            amount,
            date,
            periodic: false,
            description: None,
            recipient_id: None,
            tag_ids: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<String>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }

    pub fn periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }
}

/// Partial update of a payment item
///
/// `tag_ids`: `None` leaves the tag set untouched, `Some(vec![])` resets it
/// to the UNCLASSIFIED fallback, anything else replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentItemUpdate {
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub periodic: Option<bool>,
    pub description: Option<Option<String>>,
    pub recipient_id: Option<Option<String>>,
    pub tag_ids: Option<Vec<String>>,
}

/// Listing filter; tag filter is OR across the descendant-expanded set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFilter {
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub expense_only: bool,
    #[serde(default)]
    pub income_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(amount: Decimal) -> PaymentItem {
        PaymentItem {
            id: "p1".to_string(),
            owner_id: "o1".to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            periodic: false,
            description: None,
            recipient_id: None,
            tag_ids: vec!["t1".to_string()],
            standard_tag_id: Some("t1".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_classification() {
        assert!(item(dec!(-45.99)).is_expense());
        assert!(!item(dec!(-45.99)).is_income());
        assert!(item(dec!(100)).is_income());
        assert!(!item(dec!(0)).is_income());
        assert!(!item(dec!(0)).is_expense());
    }

    #[test]
    fn test_new_payment_builder() {
        let new = NewPaymentItem::new(dec!(-12.5), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
            .with_description("Lunch")
            .with_tags(vec![])
            .periodic(true);

        assert_eq!(new.description.as_deref(), Some("Lunch"));
        assert_eq!(new.tag_ids, Some(vec![]));
        assert!(new.periodic);
        assert!(new.recipient_id.is_none());
    }

    #[test]
    fn test_has_tag() {
        let p = item(dec!(1));
        assert!(p.has_tag("t1"));
        assert!(!p.has_tag("t2"));
    }
}
