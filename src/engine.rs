use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

use crate::allocation::PaymentAllocator;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::periods::PeriodBuilder;
use crate::record::CustomerRecord;
use crate::status::{BillingState, StatusEvaluator};
use crate::types::{AccountStatus, Contract, Payment, PeriodOverride};

/// the billing-period reconciliation engine.
///
/// Pure and synchronous: every call takes an immutable snapshot of
/// contract, overrides, and payments and recomputes the full billing
/// state from scratch. The raw record stays the single source of truth;
/// there is no derived cache to invalidate, and concurrent calls over
/// the same record are safe because nothing shared is mutated.
#[derive(Debug, Clone)]
pub struct BillingEngine {
    config: EngineConfig,
}

impl Default for BillingEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

impl BillingEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// derive the full billing state as of `today`
    pub fn compute(
        &self,
        contract: &Contract,
        overrides: &[PeriodOverride],
        payments: &[Payment],
        today: NaiveDate,
    ) -> Result<BillingState> {
        let cycle_days = contract.effective_cycle_days(self.config.default_cycle_days);
        let builder = PeriodBuilder::new(
            contract.start_date,
            cycle_days,
            overrides,
            self.config.max_periods,
        );

        // bought-back accounts stop accruing periods at their last payment
        let closure = match contract.status {
            AccountStatus::BoughtBack => payments
                .iter()
                .filter(|p| p.amount.is_positive())
                .map(|p| p.date_naive())
                .max(),
            AccountStatus::Active | AccountStatus::Locked => None,
        };

        let mut periods = builder.build(today, closure)?;
        let report = PaymentAllocator::new().allocate(&mut periods, payments);

        let (_, first_period_end) = builder.first_period_bounds();
        let state = StatusEvaluator::new(self.config.next_due_policy).evaluate(
            periods,
            contract,
            report,
            first_period_end,
            today,
        );
        Ok(state)
    }

    /// derive the full billing state as of the provider's current date
    pub fn compute_now(
        &self,
        contract: &Contract,
        overrides: &[PeriodOverride],
        payments: &[Payment],
        time_provider: &SafeTimeProvider,
    ) -> Result<BillingState> {
        self.compute(
            contract,
            overrides,
            payments,
            time_provider.now().date_naive(),
        )
    }

    /// derive the billing state straight from a stored customer record
    pub fn compute_record(&self, record: &CustomerRecord, today: NaiveDate) -> Result<BillingState> {
        let contract = record.contract()?;
        self.compute(&contract, &record.period_overrides, &record.payments, today)
    }
}
