use tracing::warn;

use crate::decimal::Money;
use crate::types::{Payment, PaymentKind, Period};

/// totals produced while allocating payments to periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationReport {
    /// grand total of every valid payment, allocated or not
    pub total_paid: Money,
    /// total consumed by periods
    pub allocated_total: Money,
    /// floating money: extra fees and payments outside every period range
    pub unallocated_amount: Money,
    /// malformed payments skipped with a warning
    pub skipped_payments: u32,
}

/// assigns each payment to at most one billing period.
///
/// Two passes per period: payments explicitly tagged to the period number
/// win first; untagged payments are matched by calendar-day containment
/// only when the tagged sum for that period is exactly zero. A partially
/// tagged period never receives date-range top-up. Extra-kind payments
/// are skipped by the date pass entirely, so a miscellaneous fee cannot
/// clear a rent period unless an operator tags it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentAllocator;

impl PaymentAllocator {
    pub fn new() -> Self {
        Self
    }

    /// annotate `periods` with allocated amounts; payment order in storage
    /// is not guaranteed, so payments are sorted by date first. Any prior
    /// annotation on the periods is cleared, so re-allocating an already
    /// annotated slice yields the same result as a fresh one.
    pub fn allocate(&self, periods: &mut [Period], payments: &[Payment]) -> AllocationReport {
        let mut report = AllocationReport::default();

        for period in periods.iter_mut() {
            period.allocated_paid = Money::ZERO;
            period.last_payment_date = None;
        }

        let mut sorted: Vec<&Payment> = Vec::with_capacity(payments.len());
        for payment in payments {
            if let Err(err) = payment.validate() {
                warn!(%err, date = %payment.date, "skipping malformed payment");
                report.skipped_payments += 1;
                continue;
            }
            sorted.push(payment);
        }
        sorted.sort_by_key(|p| p.date);

        report.total_paid = sorted.iter().map(|p| p.amount).sum();

        let mut consumed = vec![false; sorted.len()];

        for period in periods.iter_mut() {
            let number = period.number();

            // tagged pass: explicit period tags win, whatever the kind
            for (idx, payment) in sorted.iter().enumerate() {
                if payment.period == Some(number) && !consumed[idx] {
                    period.allocated_paid += payment.amount;
                    period.last_payment_date = Some(payment.date);
                    consumed[idx] = true;
                }
            }

            // date-range fallback, only when no tagged money arrived
            if period.allocated_paid.is_zero() {
                for (idx, payment) in sorted.iter().enumerate() {
                    if consumed[idx]
                        || payment.period.is_some()
                        || payment.kind == PaymentKind::Extra
                    {
                        continue;
                    }
                    if period.contains(payment.date_naive()) {
                        period.allocated_paid += payment.amount;
                        period.last_payment_date = Some(payment.date);
                        consumed[idx] = true;
                    }
                }
            }

            report.allocated_total += period.allocated_paid;
        }

        report.unallocated_amount = report.total_paid - report.allocated_total;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::PeriodBuilder;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(y: i32, m: u32, d: u32, amount: i64) -> Payment {
        Payment::new(
            Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
            Money::from_major(amount),
        )
    }

    fn periods_for(as_of: NaiveDate) -> Vec<Period> {
        PeriodBuilder::new(date(2024, 1, 1), 30, &[], 10_000)
            .build(as_of, None)
            .unwrap()
    }

    #[test]
    fn test_date_range_fallback() {
        let mut periods = periods_for(date(2024, 2, 15));
        let payments = vec![payment(2024, 1, 5, 2000)];

        let report = PaymentAllocator::new().allocate(&mut periods, &payments);

        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
        assert_eq!(periods[1].allocated_paid, Money::ZERO);
        assert_eq!(report.allocated_total, Money::from_major(2000));
        assert_eq!(report.unallocated_amount, Money::ZERO);
    }

    #[test]
    fn test_end_day_inclusive() {
        // payment timestamped late on the period's last day still counts
        let mut periods = periods_for(date(2024, 2, 15));
        let payments = vec![Payment::new(
            Utc.with_ymd_and_hms(2024, 1, 30, 23, 50, 0).unwrap(),
            Money::from_major(2000),
        )];

        PaymentAllocator::new().allocate(&mut periods, &payments);
        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
    }

    #[test]
    fn test_tagged_payment_wins_over_date() {
        // dated inside period 1 but tagged to period 2
        let mut periods = periods_for(date(2024, 2, 15));
        let mut p = payment(2024, 1, 5, 2000);
        p.period = Some(2);

        PaymentAllocator::new().allocate(&mut periods, &[p]);

        assert_eq!(periods[0].allocated_paid, Money::ZERO);
        assert_eq!(periods[1].allocated_paid, Money::from_major(2000));
    }

    #[test]
    fn test_partially_tagged_period_gets_no_topup() {
        // tagged sum is nonzero but below rent; untagged in-range money
        // must not be pulled in
        let mut periods = periods_for(date(2024, 2, 15));
        let mut tagged = payment(2024, 1, 3, 500);
        tagged.period = Some(1);
        let untagged = payment(2024, 1, 10, 1500);

        let report = PaymentAllocator::new().allocate(&mut periods, &[tagged, untagged]);

        assert_eq!(periods[0].allocated_paid, Money::from_major(500));
        // the untagged payment stays available for the next period's date
        // pass, and here falls outside it
        assert_eq!(periods[1].allocated_paid, Money::ZERO);
        assert_eq!(report.unallocated_amount, Money::from_major(1500));
    }

    #[test]
    fn test_extra_payment_never_self_allocates() {
        let mut periods = periods_for(date(2024, 2, 15));
        let mut extra = payment(2024, 1, 10, 2000);
        extra.kind = PaymentKind::Extra;

        let report = PaymentAllocator::new().allocate(&mut periods, &[extra]);

        assert_eq!(periods[0].allocated_paid, Money::ZERO);
        assert_eq!(report.total_paid, Money::from_major(2000));
        assert_eq!(report.unallocated_amount, Money::from_major(2000));
    }

    #[test]
    fn test_tagged_extra_payment_allocates() {
        let mut periods = periods_for(date(2024, 2, 15));
        let mut extra = payment(2024, 1, 10, 2000);
        extra.kind = PaymentKind::Extra;
        extra.period = Some(1);

        PaymentAllocator::new().allocate(&mut periods, &[extra]);
        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
    }

    #[test]
    fn test_payment_consumed_once() {
        // overrides can make period ranges overlap; a payment may still
        // only satisfy the first period that claims it
        let overrides = [crate::types::PeriodOverride {
            period: 2,
            start: Some(date(2024, 1, 1)),
            due: Some(date(2024, 1, 30)),
        }];
        let mut periods = PeriodBuilder::new(date(2024, 1, 1), 30, &overrides, 10_000)
            .build(date(2024, 2, 15), None)
            .unwrap();
        let payments = vec![payment(2024, 1, 5, 2000)];

        let report = PaymentAllocator::new().allocate(&mut periods, &payments);

        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
        assert_eq!(periods[1].allocated_paid, Money::ZERO);
        assert_eq!(report.allocated_total, Money::from_major(2000));
    }

    #[test]
    fn test_unsorted_payments_are_sorted() {
        let mut periods = periods_for(date(2024, 3, 15));
        let payments = vec![
            payment(2024, 2, 5, 2000),
            payment(2024, 1, 5, 2000),
        ];

        PaymentAllocator::new().allocate(&mut periods, &payments);

        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
        assert_eq!(periods[1].allocated_paid, Money::from_major(2000));
        assert_eq!(
            periods[0].last_payment_date.unwrap().date_naive(),
            date(2024, 1, 5)
        );
    }

    #[test]
    fn test_out_of_range_payment_left_unconsumed() {
        let mut periods = periods_for(date(2024, 1, 15));
        // dated before the contract even started
        let payments = vec![payment(2023, 12, 1, 2000)];

        let report = PaymentAllocator::new().allocate(&mut periods, &payments);

        assert_eq!(periods[0].allocated_paid, Money::ZERO);
        assert_eq!(report.unallocated_amount, Money::from_major(2000));
    }

    #[test]
    fn test_malformed_payment_skipped() {
        let mut periods = periods_for(date(2024, 1, 15));
        let bad = payment(2024, 1, 5, 0);
        let good = payment(2024, 1, 6, 2000);

        let report = PaymentAllocator::new().allocate(&mut periods, &[bad, good]);

        assert_eq!(report.skipped_payments, 1);
        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
        assert_eq!(report.total_paid, Money::from_major(2000));
    }

    #[test]
    fn test_reallocating_annotated_periods_does_not_double_count() {
        let payments = vec![payment(2024, 1, 5, 2000)];
        let mut periods = periods_for(date(2024, 2, 15));

        let first = PaymentAllocator::new().allocate(&mut periods, &payments);
        // second run over the same, already-annotated slice
        let second = PaymentAllocator::new().allocate(&mut periods, &payments);

        assert_eq!(periods[0].allocated_paid, Money::from_major(2000));
        assert_eq!(first, second);
    }

    #[test]
    fn test_allocation_is_idempotent() {
        let payments = vec![
            payment(2024, 1, 5, 2000),
            payment(2024, 2, 3, 1500),
        ];

        let mut first = periods_for(date(2024, 3, 15));
        let mut second = first.clone();

        let a = PaymentAllocator::new().allocate(&mut first, &payments);
        let b = PaymentAllocator::new().allocate(&mut second, &payments);

        assert_eq!(first, second);
        assert_eq!(a, b);
        // conservation: allocated never exceeds what was paid
        assert!(a.allocated_total <= a.total_paid);
    }
}
