use chrono::{Duration, NaiveDate};
use tracing::warn;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{Period, PeriodOverride};

/// derives the ordered list of billing periods from contract terms.
///
/// Periods are contiguous and non-overlapping: each period's start is one
/// day after the previous period's end, unless an operator override breaks
/// the chain. Generation is lazy, stopping at the first period that has
/// not started by the cutoff date.
#[derive(Debug, Clone)]
pub struct PeriodBuilder {
    contract_start: NaiveDate,
    cycle_days: u32,
    overrides: Vec<PeriodOverride>,
    max_periods: u32,
}

impl PeriodBuilder {
    /// `cycle_days` must already be resolved to a positive value
    /// (`Contract::effective_cycle_days`). Malformed overrides are dropped
    /// here with a warning so one bad manual edit cannot blank the ledger.
    pub fn new(
        contract_start: NaiveDate,
        cycle_days: u32,
        overrides: &[PeriodOverride],
        max_periods: u32,
    ) -> Self {
        let overrides = overrides
            .iter()
            .filter(|ov| match ov.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!(period = ov.period, %err, "ignoring malformed period override");
                    false
                }
            })
            .copied()
            .collect();

        Self {
            contract_start,
            cycle_days,
            overrides,
            max_periods,
        }
    }

    /// generate periods up to `as_of`, or up to `closure` when the account
    /// was closed early (bought back). A closed account with no recorded
    /// payments has no closure signal and falls back to the `as_of` cutoff.
    pub fn build(&self, as_of: NaiveDate, closure: Option<NaiveDate>) -> Result<Vec<Period>> {
        let cutoff = closure.unwrap_or(as_of);

        let mut periods = Vec::new();
        let mut chained_start = self.contract_start;

        for index in 0..self.max_periods {
            let (start, end) = self.period_bounds(index, chained_start);

            if start > cutoff {
                return Ok(periods);
            }

            periods.push(Period {
                index,
                start,
                end,
                allocated_paid: Money::ZERO,
                last_payment_date: None,
            });

            chained_start = end + Duration::days(1);
        }

        Err(LedgerError::MalformedContract {
            message: format!(
                "period generation exceeded the {} period cap",
                self.max_periods
            ),
        })
    }

    /// bounds of the first period regardless of cutoff, so callers can
    /// report a due date for contracts that have not started yet
    pub fn first_period_bounds(&self) -> (NaiveDate, NaiveDate) {
        self.period_bounds(0, self.contract_start)
    }

    fn period_bounds(&self, index: u32, chained_start: NaiveDate) -> (NaiveDate, NaiveDate) {
        let ov = self.override_for(index + 1);

        let start = ov.and_then(|o| o.start).unwrap_or(chained_start);
        let default_end = start + Duration::days(self.cycle_days as i64 - 1);
        let end = match ov.and_then(|o| o.due) {
            Some(due) if due >= start => due,
            Some(due) => {
                // override start won but left the due date behind it
                warn!(period = index + 1, %due, %start, "override due precedes start, using cycle length");
                default_end
            }
            None => default_end,
        };

        (start, end)
    }

    fn override_for(&self, number: u32) -> Option<&PeriodOverride> {
        self.overrides.iter().find(|ov| ov.period == number as i64)
    }
}
