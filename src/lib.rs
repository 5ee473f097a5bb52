pub mod allocation;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod periods;
pub mod record;
pub mod status;
pub mod types;

// re-export key types
pub use allocation::{AllocationReport, PaymentAllocator};
pub use config::{EngineConfig, NextDuePolicy, DEFAULT_CYCLE_DAYS, DEFAULT_MAX_PERIODS};
pub use decimal::Money;
pub use engine::BillingEngine;
pub use errors::{LedgerError, Result};
pub use periods::PeriodBuilder;
pub use record::CustomerRecord;
pub use status::{BillingState, StatusEvaluator};
pub use types::{
    AccountStatus, CoarseStatus, Contract, CustomerId, Payment, PaymentKind, Period,
    PeriodOverride,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
