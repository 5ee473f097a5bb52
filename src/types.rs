use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// unique identifier for a customer record
pub type CustomerId = Uuid;

/// operator-set account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AccountStatus {
    /// contract active and renting
    #[default]
    Active,
    /// written off as bad debt
    Locked,
    /// device bought back, no further periods
    #[serde(rename = "buyback")]
    BoughtBack,
}

impl From<String> for AccountStatus {
    // legacy records carry free-form status strings; anything unknown is active
    fn from(s: String) -> Self {
        match s.as_str() {
            "locked" => AccountStatus::Locked,
            "buyback" => AccountStatus::BoughtBack,
            _ => AccountStatus::Active,
        }
    }
}

/// payment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PaymentKind {
    /// ordinary rent payment
    #[default]
    Regular,
    /// miscellaneous fee, never satisfies a rent period on its own
    Extra,
    /// final buy-back settlement payment
    Buyback,
}

impl From<String> for PaymentKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "extra" => PaymentKind::Extra,
            "buyback" => PaymentKind::Buyback,
            _ => PaymentKind::Regular,
        }
    }
}

/// single user-facing status label for a customer's billing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoarseStatus {
    Normal,
    DueToday,
    Overdue,
    Locked,
    Buyback,
}

impl fmt::Display for CoarseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoarseStatus::Normal => "normal",
            CoarseStatus::DueToday => "due-today",
            CoarseStatus::Overdue => "overdue",
            CoarseStatus::Locked => "locked",
            CoarseStatus::Buyback => "buyback",
        };
        write!(f, "{s}")
    }
}

/// recorded payment as stored on the customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(with = "payment_date")]
    pub date: DateTime<Utc>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 1-based billing period this payment was explicitly tagged to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: PaymentKind,
}

impl Payment {
    pub fn new(date: DateTime<Utc>, amount: Money) -> Self {
        Self {
            date,
            amount,
            note: None,
            period: None,
            kind: PaymentKind::Regular,
        }
    }

    /// calendar date of the payment, time of day ignored
    pub fn date_naive(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// write-boundary validation: amounts must be strictly positive
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LedgerError::InvalidPaymentAmount {
                amount: self.amount,
            });
        }
        Ok(())
    }
}

/// manual operator correction of one period's start and/or due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOverride {
    /// 1-based period number the override applies to
    pub period: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
}

impl PeriodOverride {
    /// write-boundary validation: period numbers are 1-based, and a due
    /// date may not precede the start date of the same override
    pub fn validate(&self) -> Result<()> {
        if self.period < 1 {
            return Err(LedgerError::InvalidOverride {
                period: self.period,
                message: "period number must be >= 1".to_string(),
            });
        }
        if let (Some(start), Some(due)) = (self.start, self.due) {
            if due < start {
                return Err(LedgerError::InvalidOverride {
                    period: self.period,
                    message: format!("due {due} is earlier than start {start}"),
                });
            }
        }
        Ok(())
    }
}

/// billing-relevant contract terms of a customer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// contract start date; operator-editable, never touched by the engine
    pub start_date: NaiveDate,
    /// raw cycle length in days; non-positive values fall back to the
    /// configured default
    pub cycle_days: i64,
    pub rent: Money,
    pub status: AccountStatus,
    /// manual next-due override; see `NextDuePolicy` for how it is applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_override: Option<NaiveDate>,
}

impl Contract {
    /// cycle length actually used for period generation; anything outside
    /// 1..=u32::MAX on the raw record falls back to the default
    pub fn effective_cycle_days(&self, default_cycle_days: u32) -> u32 {
        match u32::try_from(self.cycle_days) {
            Ok(days) if days > 0 => days,
            _ => default_cycle_days,
        }
    }
}

/// one billing cycle's date range, derived from contract terms.
/// `end` is inclusive (end of day); never stored, always recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub index: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// total of payments this period consumed
    pub allocated_paid: Money,
    /// date of the most recent payment allocated here, for detail views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<DateTime<Utc>>,
}

impl Period {
    /// 1-based number as shown to operators and used by payment tags
    pub fn number(&self) -> u32 {
        self.index + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_paid(&self, rent: Money) -> bool {
        self.allocated_paid >= rent
    }

    /// amount still owed on this period, never negative
    pub fn shortfall(&self, rent: Money) -> Money {
        (rent - self.allocated_paid).max(Money::ZERO)
    }
}

mod payment_date {
    //! payment dates in legacy storage are either full RFC 3339 timestamps
    //! or bare `YYYY-MM-DD` strings; accept both, emit RFC 3339
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_parsing_tolerates_unknown() {
        let s: AccountStatus = serde_json::from_str("\"renting\"").unwrap();
        assert_eq!(s, AccountStatus::Active);
        let s: AccountStatus = serde_json::from_str("\"buyback\"").unwrap();
        assert_eq!(s, AccountStatus::BoughtBack);
        let s: AccountStatus = serde_json::from_str("\"locked\"").unwrap();
        assert_eq!(s, AccountStatus::Locked);
    }

    #[test]
    fn test_payment_date_accepts_bare_date() {
        let p: Payment =
            serde_json::from_str(r#"{"date":"2024-01-05","amount":"2000"}"#).unwrap();
        assert_eq!(
            p.date_naive(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(p.kind, PaymentKind::Regular);
        assert_eq!(p.period, None);
    }

    #[test]
    fn test_payment_date_accepts_rfc3339() {
        let p: Payment =
            serde_json::from_str(r#"{"date":"2024-01-05T14:30:00.000Z","amount":"2000","type":"extra"}"#)
                .unwrap();
        assert_eq!(
            p.date,
            Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap()
        );
        assert_eq!(p.kind, PaymentKind::Extra);
    }

    #[test]
    fn test_payment_validation() {
        let mut p = Payment::new(Utc::now(), Money::from_major(2000));
        assert!(p.validate().is_ok());

        p.amount = Money::ZERO;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_override_validation() {
        let ok = PeriodOverride {
            period: 2,
            start: NaiveDate::from_ymd_opt(2024, 3, 1),
            due: NaiveDate::from_ymd_opt(2024, 3, 15),
        };
        assert!(ok.validate().is_ok());

        let bad_period = PeriodOverride {
            period: 0,
            start: None,
            due: None,
        };
        assert!(bad_period.validate().is_err());

        let inverted = PeriodOverride {
            period: 1,
            start: NaiveDate::from_ymd_opt(2024, 3, 15),
            due: NaiveDate::from_ymd_opt(2024, 3, 1),
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_effective_cycle_days_rejects_garbage() {
        let mut c = Contract {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            cycle_days: 30,
            rent: Money::from_major(2000),
            status: AccountStatus::Active,
            next_due_override: None,
        };
        assert_eq!(c.effective_cycle_days(30), 30);

        c.cycle_days = 0;
        assert_eq!(c.effective_cycle_days(30), 30);

        c.cycle_days = -7;
        assert_eq!(c.effective_cycle_days(30), 30);

        // values past u32 range must not wrap into a tiny cycle
        c.cycle_days = (u32::MAX as i64) + 2;
        assert_eq!(c.effective_cycle_days(30), 30);
    }

    #[test]
    fn test_period_shortfall_never_negative() {
        let p = Period {
            index: 0,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            allocated_paid: Money::from_major(2500),
            last_payment_date: None,
        };
        assert!(p.is_paid(Money::from_major(2000)));
        assert_eq!(p.shortfall(Money::from_major(2000)), Money::ZERO);
    }
}
