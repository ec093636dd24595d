use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// How calendar days without any debit are treated when accumulating
/// savings over past days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDayPolicy {
    /// Only days that have debits in the ledger count.
    #[default]
    Ignore,
    /// Every day from the first debit day through yesterday counts; a day with
    /// no debits banks the whole daily limit.
    FullLimit,
}

impl FromStr for MissingDayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(MissingDayPolicy::Ignore),
            "full-limit" | "full_limit" => Ok(MissingDayPolicy::FullLimit),
            other => Err(format!("unknown missing-day policy '{other}', expected 'ignore' or 'full-limit'")),
        }
    }
}

impl fmt::Display for MissingDayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingDayPolicy::Ignore => f.write_str("ignore"),
            MissingDayPolicy::FullLimit => f.write_str("full-limit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BudgetConfigError {
    #[error("Average days in month must be positive, got {0}")]
    NonPositiveDays(f64),
    #[error("Amounts cannot be negative")]
    NegativeAmount,
    #[error("Savings goal exceeds monthly income")]
    SavingsExceedIncome,
}

/// Immutable budget parameters. Money is in minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    monthly_income: i64,
    monthly_savings_goal: i64,
    avg_days_in_month: f64,
    timezone: Tz,
    missing_days: MissingDayPolicy,
    daily_limit: i64,
}

impl BudgetConfig {
    pub fn new(
        monthly_income: i64,
        monthly_savings_goal: i64,
        avg_days_in_month: f64,
        timezone: Tz,
    ) -> Result<Self, BudgetConfigError> {
        if !(avg_days_in_month.is_finite() && avg_days_in_month > 0.0) {
            return Err(BudgetConfigError::NonPositiveDays(avg_days_in_month));
        }
        if monthly_income < 0 || monthly_savings_goal < 0 {
            return Err(BudgetConfigError::NegativeAmount);
        }
        if monthly_savings_goal > monthly_income {
            return Err(BudgetConfigError::SavingsExceedIncome);
        }

        let spendable = (monthly_income - monthly_savings_goal) as f64;
        let daily_limit = (spendable / avg_days_in_month).round() as i64;

        Ok(Self {
            monthly_income,
            monthly_savings_goal,
            avg_days_in_month,
            timezone,
            missing_days: MissingDayPolicy::default(),
            daily_limit,
        })
    }

    pub fn with_missing_day_policy(mut self, policy: MissingDayPolicy) -> Self {
        self.missing_days = policy;
        self
    }

    pub fn daily_limit(&self) -> i64 {
        self.daily_limit
    }

    pub fn monthly_income(&self) -> i64 {
        self.monthly_income
    }

    pub fn monthly_savings_goal(&self) -> i64 {
        self.monthly_savings_goal
    }

    pub fn avg_days_in_month(&self) -> f64 {
        self.avg_days_in_month
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn missing_days(&self) -> MissingDayPolicy {
        self.missing_days
    }

    /// Calendar date of `instant` in the reference timezone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Moscow;

    #[test]
    fn test_default_constants_daily_limit() {
        let config = BudgetConfig::new(6_960_000, 2_000_000, 30.4375, Moscow).unwrap();
        // 49600 / 30.4375 = 1629.5687...
        assert_eq!(config.daily_limit(), 162_957);
        assert_eq!(config.missing_days(), MissingDayPolicy::Ignore);
    }

    #[test]
    fn test_invalid_configs() {
        assert_eq!(
            BudgetConfig::new(100, 0, 0.0, Moscow),
            Err(BudgetConfigError::NonPositiveDays(0.0))
        );
        assert_eq!(
            BudgetConfig::new(100, 200, 30.0, Moscow),
            Err(BudgetConfigError::SavingsExceedIncome)
        );
        assert_eq!(
            BudgetConfig::new(-1, 0, 30.0, Moscow),
            Err(BudgetConfigError::NegativeAmount)
        );
    }

    #[test]
    fn test_local_date_uses_reference_timezone() {
        let config = BudgetConfig::new(3_000_000, 0, 30.0, Moscow).unwrap();
        let late_utc = Utc.with_ymd_and_hms(2025, 3, 1, 21, 30, 0).unwrap();
        assert_eq!(config.local_date(late_utc), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    }

    #[test]
    fn test_missing_day_policy_parsing() {
        assert_eq!("ignore".parse(), Ok(MissingDayPolicy::Ignore));
        assert_eq!("Full-Limit".parse(), Ok(MissingDayPolicy::FullLimit));
        assert!("sometimes".parse::<MissingDayPolicy>().is_err());
        assert_eq!(MissingDayPolicy::FullLimit.to_string(), "full-limit");
    }
}
