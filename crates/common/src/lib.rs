use budget::{BudgetConfig, BudgetConfigError, MissingDayPolicy};
use chrono_tz::Tz;
use clap::Args;
use ingest::{RegexNormalizer, SmsNormalizer};
use ledger::LedgerStore;
use ledger::models::minor_units_from_f64;
use notifier::{Notifier, ReportFormatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub notifier: Arc<dyn Notifier>,
    pub normalizer: Arc<dyn SmsNormalizer>,
    pub reports: ReportFormatter,
    pub budget: BudgetConfig,
    pub config: Config,
    /// Serializes every ledger mutation together with the read that follows it.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        config: Config,
        ledger: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        let budget = config.budget_config()?;
        let normalizer = RegexNormalizer::new(config.currency.clone())
            .map_err(|e| ConfigError::Normalizer(e.to_string()))?;

        Ok(Self {
            ledger,
            notifier,
            normalizer: Arc::new(normalizer),
            reports: ReportFormatter::new(config.currency_symbol.clone()),
            budget,
            config,
            write_lock: Arc::new(Mutex::new(())),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid budget configuration: {0}")]
    Budget(#[from] BudgetConfigError),
    #[error("{0} must be a non-negative number, got {1}")]
    Amount(&'static str, f64),
    #[error("Failed to build SMS normalizer: {0}")]
    Normalizer(String),
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse().map_err(|_| format!("invalid timezone: {s}"))
}

#[derive(Clone, Debug, Args)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:ledger.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// The only chat the bot talks to.
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Webhook path segment; the webhook is not mounted without it.
    #[arg(long, env = "TG_SECRET_PATH", hide_env_values = true)]
    pub tg_secret_path: Option<String>,

    #[arg(long, env = "MONTHLY_INCOME", default_value = "69600")]
    pub monthly_income: f64,

    #[arg(long, env = "MONTHLY_SAVINGS_GOAL", default_value = "20000")]
    pub monthly_savings_goal: f64,

    #[arg(long, env = "AVG_DAYS_IN_MONTH", default_value = "30.4375")]
    pub avg_days_in_month: f64,

    /// Timezone that decides where one budget day ends.
    #[arg(long, env = "BUDGET_TIMEZONE", default_value = "Europe/Moscow", value_parser = parse_timezone)]
    pub timezone: Tz,

    #[arg(long, env = "CURRENCY", default_value = "RUB")]
    pub currency: String,

    #[arg(long, env = "CURRENCY_SYMBOL", default_value = "₽")]
    pub currency_symbol: String,

    /// How days without spending count toward savings: ignore | full-limit
    #[arg(long = "missing-days", env = "MISSING_DAYS", default_value = "ignore")]
    pub missing_days: MissingDayPolicy,

    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value = "5")]
    pub store_timeout_secs: u64,

    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value = "10")]
    pub notify_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:ledger.db".into(),
            port: 3000,
            telegram_bot_token: None,
            telegram_chat_id: None,
            tg_secret_path: None,
            monthly_income: 69_600.0,
            monthly_savings_goal: 20_000.0,
            avg_days_in_month: 30.4375,
            timezone: chrono_tz::Europe::Moscow,
            currency: "RUB".into(),
            currency_symbol: "₽".into(),
            missing_days: MissingDayPolicy::Ignore,
            store_timeout_secs: 5,
            notify_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn budget_config(&self) -> Result<BudgetConfig, ConfigError> {
        let income = minor_units_from_f64(self.monthly_income)
            .ok_or(ConfigError::Amount("monthly income", self.monthly_income))?;
        let goal = minor_units_from_f64(self.monthly_savings_goal)
            .ok_or(ConfigError::Amount("monthly savings goal", self.monthly_savings_goal))?;

        Ok(BudgetConfig::new(income, goal, self.avg_days_in_month, self.timezone)?
            .with_missing_day_policy(self.missing_days))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}
