use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AccountStatus, Contract, Payment, PeriodOverride};

/// customer record as loaded from the legacy whole-file JSON store.
///
/// The store was written by hand-rolled javascript over the years, so
/// every field except the contract date may be missing, and dates arrive
/// as assorted strings. This view deserializes whatever is there and
/// defers strictness to `contract()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// contract start date, raw; missing or unparseable makes the
    /// customer's billing uncomputable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_cycle_days: Option<i64>,
    #[serde(default)]
    pub rent: Money,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub period_overrides: Vec<PeriodOverride>,
    /// manual next-due date, raw; empty strings from old form posts are
    /// treated as unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_override: Option<String>,
}

impl CustomerRecord {
    /// fresh record for a newly signed contract
    pub fn new(name: impl Into<String>, contract_date: NaiveDate, rent: Money) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            name: Some(name.into()),
            contract_date: Some(contract_date.format("%Y-%m-%d").to_string()),
            payment_cycle_days: None,
            rent,
            status: AccountStatus::Active,
            payments: Vec::new(),
            period_overrides: Vec::new(),
            next_due_override: None,
        }
    }

    /// billing terms of this record; fails with `MalformedContract` when
    /// the contract date is missing or unparseable, since nothing can be
    /// computed without it
    pub fn contract(&self) -> Result<Contract> {
        let raw = self
            .contract_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LedgerError::MalformedContract {
                message: "contract date is missing".to_string(),
            })?;

        let start_date = parse_date(raw).ok_or_else(|| LedgerError::MalformedContract {
            message: format!("unparseable contract date: {raw}"),
        })?;

        // a broken manual override should not blank the whole ledger
        let next_due_override = match self.next_due_override.as_deref() {
            None => None,
            Some(s) if s.trim().is_empty() => None,
            Some(s) => match parse_date(s) {
                Some(d) => Some(d),
                None => {
                    warn!(value = s, "ignoring unparseable next-due override");
                    None
                }
            },
        };

        Ok(Contract {
            start_date,
            cycle_days: self.payment_cycle_days.unwrap_or(0),
            rent: self.rent,
            status: self.status,
            next_due_override,
        })
    }
}

/// accept `YYYY-MM-DD` or a full RFC 3339 timestamp
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}
