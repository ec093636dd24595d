use crate::config::{BudgetConfig, MissingDayPolicy};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use ledger::{TransactionKind, TransactionRecord};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Budget position derived from a ledger snapshot. Money fields are minor
/// units and serialize as fixed two-decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetState {
    pub today: NaiveDate,
    #[serde(serialize_with = "as_decimal")]
    pub daily_limit: i64,
    #[serde(serialize_with = "as_decimal")]
    pub spent_today: i64,
    #[serde(serialize_with = "as_decimal")]
    pub daily_remaining: i64,
    #[serde(serialize_with = "as_decimal")]
    pub cumulative_result: i64,
    #[serde(serialize_with = "as_decimal")]
    pub savings: i64,
    #[serde(serialize_with = "as_decimal")]
    pub overspent: i64,
    /// Past days that contributed to `cumulative_result`.
    pub days_counted: usize,
}

fn as_decimal<S: Serializer>(amount: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ledger::models::format_minor_units(*amount))
}

/// Sums debit amounts per calendar day in `tz`. Credits are not spend.
pub fn daily_debit_totals(records: &[TransactionRecord], tz: Tz) -> BTreeMap<NaiveDate, i64> {
    let mut totals = BTreeMap::new();
    for record in records.iter().filter(|r| r.kind == TransactionKind::Debit) {
        let day = record.timestamp.with_timezone(&tz).date_naive();
        let total = totals.entry(day).or_insert(0i64);
        *total = total.saturating_add(record.amount);
    }
    totals
}

/// Recomputes the whole budget position from `records` as of `now`.
///
/// Only days strictly before today feed the cumulative result, and today's
/// spend only reduces today's remaining limit. Records dated after today are
/// ignored by both.
pub fn compute_budget_stats(
    records: &[TransactionRecord],
    now: DateTime<Utc>,
    config: &BudgetConfig,
) -> BudgetState {
    let today = config.local_date(now);
    let limit = config.daily_limit();
    let totals = daily_debit_totals(records, config.timezone());

    let spent_today = totals.get(&today).copied().unwrap_or(0);
    let past = totals.range(..today);

    let (cumulative_result, days_counted) = match config.missing_days() {
        MissingDayPolicy::Ignore => past.fold((0i64, 0usize), |(sum, days), (_, spent)| {
            (sum.saturating_add(limit.saturating_sub(*spent)), days + 1)
        }),
        MissingDayPolicy::FullLimit => match totals.keys().next() {
            Some(first) if *first < today => {
                let days = (today - *first).num_days();
                let spent = past.fold(0i64, |sum, (_, spent)| sum.saturating_add(*spent));
                (limit.saturating_mul(days).saturating_sub(spent), days as usize)
            }
            _ => (0, 0),
        },
    };

    BudgetState {
        today,
        daily_limit: limit,
        spent_today,
        daily_remaining: limit.saturating_sub(spent_today),
        cumulative_result,
        savings: cumulative_result.max(0),
        overspent: cumulative_result.saturating_neg().max(0),
        days_counted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Moscow;

    // 48904.20 / 30 = 1630.14 per day
    fn example_config() -> BudgetConfig {
        BudgetConfig::new(4_890_420, 0, 30.0, Moscow).unwrap()
    }

    fn now() -> DateTime<Utc> {
        // 2025-03-10 15:00 Moscow
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn record(day: u32, hour_utc: u32, amount: i64, kind: TransactionKind) -> TransactionRecord {
        TransactionRecord {
            id: format!("{day}-{hour_utc}-{amount}"),
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, hour_utc, 0, 0).unwrap(),
            amount,
            kind,
            currency: "RUB".into(),
            description: String::new(),
            balance_after: None,
            source_text: String::new(),
        }
    }

    fn debit(day: u32, amount: i64) -> TransactionRecord {
        record(day, 9, amount, TransactionKind::Debit)
    }

    #[test]
    fn test_empty_ledger() {
        let state = compute_budget_stats(&[], now(), &example_config());
        assert_eq!(state.today, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(state.spent_today, 0);
        assert_eq!(state.cumulative_result, 0);
        assert_eq!(state.daily_remaining, 163_014);
        assert_eq!(state.savings, 0);
        assert_eq!(state.overspent, 0);
        assert_eq!(state.days_counted, 0);
    }

    #[test]
    fn test_worked_example() {
        let records = vec![debit(9, 100_000), debit(10, 20_000)];
        let state = compute_budget_stats(&records, now(), &example_config());
        assert_eq!(state.daily_limit, 163_014);
        assert_eq!(state.cumulative_result, 63_014);
        assert_eq!(state.savings, 63_014);
        assert_eq!(state.overspent, 0);
        assert_eq!(state.spent_today, 20_000);
        assert_eq!(state.daily_remaining, 143_014);
    }

    #[test]
    fn test_spend_today_is_conserved() {
        let amounts = [12_345, 1, 99_999, 50_000];
        let records: Vec<_> = amounts.iter().map(|a| debit(10, *a)).collect();
        let state = compute_budget_stats(&records, now(), &example_config());
        let total: i64 = amounts.iter().sum();
        assert_eq!(state.spent_today, total);
        assert_eq!(state.daily_remaining, 163_014 - total);
        assert_eq!(state.cumulative_result, 0);
    }

    #[test]
    fn test_two_prior_days_accumulate() {
        let records = vec![debit(7, 50_000), debit(8, 120_000), debit(8, 10_000)];
        let state = compute_budget_stats(&records, now(), &example_config());
        let expected = (163_014 - 50_000) + (163_014 - 130_000);
        assert_eq!(state.cumulative_result, expected);
        assert_eq!(state.savings, expected);
        assert_eq!(state.overspent, 0);
        assert_eq!(state.days_counted, 2);
    }

    #[test]
    fn test_overspend_is_floored() {
        let records = vec![debit(8, 500_000), debit(9, 100_000)];
        let state = compute_budget_stats(&records, now(), &example_config());
        let expected = (163_014 - 500_000) + (163_014 - 100_000);
        assert!(expected < 0);
        assert_eq!(state.cumulative_result, expected);
        assert_eq!(state.savings, 0);
        assert_eq!(state.overspent, -expected);
    }

    #[test]
    fn test_credits_are_not_spend() {
        let records = vec![
            record(9, 9, 1_000_000, TransactionKind::Credit),
            record(10, 9, 5_000_000, TransactionKind::Credit),
            debit(10, 1_000),
        ];
        let state = compute_budget_stats(&records, now(), &example_config());
        assert_eq!(state.spent_today, 1_000);
        // A day with only credits is not a counted day.
        assert_eq!(state.days_counted, 0);
        assert_eq!(state.cumulative_result, 0);
    }

    #[test]
    fn test_day_boundary_follows_reference_timezone() {
        // 21:30 UTC on the 9th is 00:30 on the 10th in Moscow.
        let mut late = debit(9, 7_000);
        late.timestamp = Utc.with_ymd_and_hms(2025, 3, 9, 21, 30, 0).unwrap();
        let state = compute_budget_stats(&[late], now(), &example_config());
        assert_eq!(state.spent_today, 7_000);
        assert_eq!(state.days_counted, 0);
    }

    #[test]
    fn test_future_records_are_ignored() {
        let records = vec![debit(11, 40_000), debit(9, 10_000)];
        let state = compute_budget_stats(&records, now(), &example_config());
        assert_eq!(state.spent_today, 0);
        assert_eq!(state.cumulative_result, 163_014 - 10_000);
    }

    #[test]
    fn test_full_limit_policy_counts_quiet_days() {
        let config = example_config().with_missing_day_policy(MissingDayPolicy::FullLimit);
        // Spend on the 7th, nothing on the 8th and 9th.
        let records = vec![debit(7, 60_000), debit(10, 5_000)];
        let state = compute_budget_stats(&records, now(), &config);
        assert_eq!(state.days_counted, 3);
        assert_eq!(state.cumulative_result, 3 * 163_014 - 60_000);

        let ignore = compute_budget_stats(&records, now(), &example_config());
        assert_eq!(ignore.days_counted, 1);
        assert_eq!(ignore.cumulative_result, 163_014 - 60_000);
    }

    #[test]
    fn test_full_limit_policy_without_past_days() {
        let config = example_config().with_missing_day_policy(MissingDayPolicy::FullLimit);
        let state = compute_budget_stats(&[debit(10, 5_000)], now(), &config);
        assert_eq!(state.days_counted, 0);
        assert_eq!(state.cumulative_result, 0);
    }

    #[test]
    fn test_extreme_amounts_saturate() {
        let records = vec![debit(8, i64::MAX), debit(9, i64::MAX), debit(10, i64::MAX), debit(10, i64::MAX)];
        let state = compute_budget_stats(&records, now(), &example_config());
        assert_eq!(state.spent_today, i64::MAX);
        assert_eq!(state.daily_remaining, 163_014 - i64::MAX);
        assert_eq!(state.cumulative_result, i64::MIN);
        assert_eq!(state.overspent, i64::MAX);
        assert_eq!(state.savings, 0);

        let config = example_config().with_missing_day_policy(MissingDayPolicy::FullLimit);
        let state = compute_budget_stats(&records, now(), &config);
        assert_eq!(state.cumulative_result, 2 * 163_014 - i64::MAX);
    }

    #[test]
    fn test_result_does_not_depend_on_record_order() {
        let mut records = vec![debit(7, 1_111), debit(9, 2_222), debit(10, 3_333), debit(8, 4_444)];
        let a = compute_budget_stats(&records, now(), &example_config());
        records.reverse();
        let b = compute_budget_stats(&records, now(), &example_config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_serializes_money_with_two_decimals() {
        let records = vec![debit(9, 100_000), debit(10, 20_000)];
        let state = compute_budget_stats(&records, now(), &example_config());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["daily_limit"], "1630.14");
        assert_eq!(json["daily_remaining"], "1430.14");
        assert_eq!(json["savings"], "630.14");
        assert_eq!(json["overspent"], "0.00");
        assert_eq!(json["today"], "2025-03-10");
    }
}
