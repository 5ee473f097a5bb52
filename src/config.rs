use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// default billing cycle length when a contract does not specify one
pub const DEFAULT_CYCLE_DAYS: u32 = 30;

/// default hard cap on generated periods (~800 years at 30-day cycles)
pub const DEFAULT_MAX_PERIODS: u32 = 10_000;

/// policy for the manual next-due override on a customer record.
///
/// The legacy system had two call paths that disagreed: one used the
/// override only for the displayed due date, the other derived the
/// customer's overdue/due-today status from it. This makes the choice
/// explicit instead of depending on which path runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NextDuePolicy {
    /// override replaces the reported next due date only; coarse status
    /// and overdue counts stay period-derived
    #[default]
    ReportedOnly,
    /// override also drives coarse status: overdue once the override date
    /// has passed with anything unpaid, due-today on the date itself
    Authoritative,
}

/// engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// cycle length substituted when a contract's is missing or non-positive
    pub default_cycle_days: u32,
    /// iteration cap for period generation; exceeding it is a malformed contract
    pub max_periods: u32,
    pub next_due_policy: NextDuePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_cycle_days: DEFAULT_CYCLE_DAYS,
            max_periods: DEFAULT_MAX_PERIODS,
            next_due_policy: NextDuePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_cycle_days == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "default_cycle_days must be positive".to_string(),
            });
        }
        if self.max_periods == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "max_periods must be positive".to_string(),
            });
        }
        Ok(())
    }
}
