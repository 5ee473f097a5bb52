use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationReport;
use crate::config::NextDuePolicy;
use crate::decimal::Money;
use crate::types::{AccountStatus, CoarseStatus, Contract, Period};

/// fully derived billing state for one customer, recomputed from the raw
/// record on every read; nothing here is ever persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingState {
    /// generated periods with allocated amounts, for per-period detail views
    pub periods: Vec<Period>,
    pub rent: Money,
    pub account_status: AccountStatus,
    pub coarse_status: CoarseStatus,
    /// unpaid periods whose end has passed, across the whole history
    pub overdue_period_count: u32,
    /// lifetime shortfall over all unpaid periods, never negative
    pub total_unpaid: Money,
    /// shortfall of matured (past-end) unpaid periods only, what a
    /// collections view would chase today
    pub overdue_unpaid: Money,
    pub next_due_date: NaiveDate,
    /// signed days from today to the next due date; negative when past due
    pub days_until_due: i64,
    /// grand total of every recorded payment, including extra fees
    pub total_paid: Money,
    /// money no period consumed (extra fees, out-of-range payments)
    pub unallocated_amount: Money,
}

impl BillingState {
    pub fn per_period_paid(&self) -> Vec<bool> {
        self.periods.iter().map(|p| p.is_paid(self.rent)).collect()
    }

    pub fn is_overdue(&self) -> bool {
        self.coarse_status == CoarseStatus::Overdue
    }
}

/// derives overdue counts, unpaid totals, the next due date, and the
/// coarse status label from allocated periods
#[derive(Debug, Clone, Copy)]
pub struct StatusEvaluator {
    policy: NextDuePolicy,
}

impl StatusEvaluator {
    pub fn new(policy: NextDuePolicy) -> Self {
        Self { policy }
    }

    /// `first_period_end` is the would-be end of period 1, used to report
    /// an upcoming due date when no period has started yet
    pub fn evaluate(
        &self,
        periods: Vec<Period>,
        contract: &Contract,
        report: AllocationReport,
        first_period_end: NaiveDate,
        today: NaiveDate,
    ) -> BillingState {
        let rent = contract.rent;

        let overdue_period_count = periods
            .iter()
            .filter(|p| !p.is_paid(rent) && p.end < today)
            .count() as u32;

        let total_unpaid: Money = periods
            .iter()
            .filter(|p| !p.is_paid(rent))
            .map(|p| p.shortfall(rent))
            .sum();

        let overdue_unpaid: Money = periods
            .iter()
            .filter(|p| !p.is_paid(rent) && p.end < today)
            .map(|p| p.shortfall(rent))
            .sum();

        // due date of the first unsatisfied period; with everything paid,
        // the upcoming period's due date is computed on demand
        let computed_next_due = periods
            .iter()
            .find(|p| !p.is_paid(rent))
            .map(|p| p.end + Duration::days(1))
            .or_else(|| periods.last().map(|p| p.end + Duration::days(1)))
            .unwrap_or(first_period_end + Duration::days(1));

        let next_due_date = contract.next_due_override.unwrap_or(computed_next_due);

        let coarse_status = self.coarse_status(&periods, contract, total_unpaid, today);

        BillingState {
            periods,
            rent,
            account_status: contract.status,
            coarse_status,
            overdue_period_count,
            total_unpaid,
            overdue_unpaid,
            next_due_date,
            days_until_due: (next_due_date - today).num_days(),
            total_paid: report.total_paid,
            unallocated_amount: report.unallocated_amount,
        }
    }

    fn coarse_status(
        &self,
        periods: &[Period],
        contract: &Contract,
        total_unpaid: Money,
        today: NaiveDate,
    ) -> CoarseStatus {
        match contract.status {
            AccountStatus::BoughtBack => return CoarseStatus::Buyback,
            AccountStatus::Locked => return CoarseStatus::Locked,
            AccountStatus::Active => {}
        }

        if self.policy == NextDuePolicy::Authoritative {
            if let Some(override_due) = contract.next_due_override {
                if total_unpaid.is_positive() && override_due < today {
                    return CoarseStatus::Overdue;
                }
                if total_unpaid.is_positive() && override_due == today {
                    return CoarseStatus::DueToday;
                }
                return CoarseStatus::Normal;
            }
        }

        let rent = contract.rent;
        if periods.iter().any(|p| !p.is_paid(rent) && p.end < today) {
            return CoarseStatus::Overdue;
        }
        if let Some(current) = periods.last() {
            if !current.is_paid(rent) && current.end == today {
                return CoarseStatus::DueToday;
            }
        }
        CoarseStatus::Normal
    }
}
