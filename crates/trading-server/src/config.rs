use std::{
    env,
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use chrono::{FixedOffset, Local, Offset};
use store::RejectedSellPolicy;
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_DB_PATH: &str = "data/trading.db";
const DEFAULT_SETTLEMENT_INTERVAL_SECS: u64 = runtime::SETTLEMENT_INTERVAL_SECS;
const DEFAULT_SETTLEMENT_DELAY_SECS: i64 = runtime::settlement::DEFAULT_SETTLEMENT_DELAY_SECS;
const DEFAULT_PRICE_INTERVAL_SECS: u64 = runtime::PRICE_INTERVAL_SECS;
const DEFAULT_STARTING_CASH: f64 = api::DEFAULT_STARTING_CASH;

const ENV_ADDR: &str = "TRADING_SERVER_ADDR";
const ENV_DB_PATH: &str = "TRADING_DB_PATH";
const ENV_SETTLEMENT_INTERVAL: &str = "TRADING_SETTLEMENT_INTERVAL_SECS";
const ENV_SETTLEMENT_DELAY: &str = "TRADING_SETTLEMENT_DELAY_SECS";
const ENV_PRICE_INTERVAL: &str = "TRADING_PRICE_INTERVAL_SECS";
const ENV_STARTING_CASH: &str = "TRADING_STARTING_CASH";
const ENV_ENFORCE_HOURS: &str = "TRADING_ENFORCE_MARKET_HOURS";
const ENV_REJECTED_SELL: &str = "TRADING_REJECTED_SELL";
const ENV_UTC_OFFSET: &str = "TRADING_MARKET_UTC_OFFSET_MINUTES";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: PathBuf,
    pub settlement_interval: Duration,
    pub settlement_delay: chrono::Duration,
    pub price_interval: Duration,
    pub starting_cash: f64,
    pub enforce_market_hours: bool,
    pub rejected_sell: RejectedSellPolicy,
    /// Offset used to read the market schedule's wall-clock times.
    pub market_offset: FixedOffset,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TRADING_SERVER_ADDR is not a valid socket address: {0}")]
    InvalidListenAddr(#[source] AddrParseError),
    #[error("TRADING_DB_PATH must not be empty or whitespace")]
    InvalidDbPath,
    #[error("{0} must be a positive whole number of seconds")]
    InvalidSeconds(&'static str),
    #[error("TRADING_STARTING_CASH must be a finite, non-negative amount")]
    InvalidStartingCash,
    #[error("TRADING_ENFORCE_MARKET_HOURS must be true or false")]
    InvalidEnforceMarketHours,
    #[error("TRADING_REJECTED_SELL must be one of: executed, failed")]
    InvalidRejectedSell,
    #[error("TRADING_MARKET_UTC_OFFSET_MINUTES must be minutes between -1439 and 1439")]
    InvalidUtcOffset,
    #[error("{0} contains non-unicode data")]
    NonUnicode(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = match read(ENV_ADDR)? {
            Some(value) => value.parse().map_err(ConfigError::InvalidListenAddr)?,
            None => DEFAULT_LISTEN_ADDR
                .parse()
                .map_err(ConfigError::InvalidListenAddr)?,
        };

        let db_path = match read(ENV_DB_PATH)? {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::InvalidDbPath),
            Some(value) => PathBuf::from(value),
            None => PathBuf::from(DEFAULT_DB_PATH),
        };

        let settlement_interval =
            Duration::from_secs(seconds(ENV_SETTLEMENT_INTERVAL, DEFAULT_SETTLEMENT_INTERVAL_SECS)?);
        let settlement_delay = match read(ENV_SETTLEMENT_DELAY)? {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs >= 0)
                .map(chrono::Duration::seconds)
                .ok_or(ConfigError::InvalidSeconds(ENV_SETTLEMENT_DELAY))?,
            None => chrono::Duration::seconds(DEFAULT_SETTLEMENT_DELAY_SECS),
        };
        let price_interval =
            Duration::from_secs(seconds(ENV_PRICE_INTERVAL, DEFAULT_PRICE_INTERVAL_SECS)?);

        let starting_cash = match read(ENV_STARTING_CASH)? {
            Some(value) => value
                .parse::<f64>()
                .ok()
                .filter(|cash| cash.is_finite() && *cash >= 0.0)
                .ok_or(ConfigError::InvalidStartingCash)?,
            None => DEFAULT_STARTING_CASH,
        };

        let enforce_market_hours = match read(ENV_ENFORCE_HOURS)? {
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidEnforceMarketHours)?,
            None => false,
        };

        let rejected_sell = match read(ENV_REJECTED_SELL)? {
            Some(value) => {
                RejectedSellPolicy::parse(value.trim()).ok_or(ConfigError::InvalidRejectedSell)?
            }
            None => RejectedSellPolicy::default(),
        };

        let market_offset = match read(ENV_UTC_OFFSET)? {
            Some(value) => value
                .trim()
                .parse::<i32>()
                .ok()
                .and_then(|minutes| FixedOffset::east_opt(minutes.checked_mul(60)?))
                .ok_or(ConfigError::InvalidUtcOffset)?,
            None => Local::now().offset().fix(),
        };

        Ok(Self {
            listen_addr,
            db_path,
            settlement_interval,
            settlement_delay,
            price_interval,
            starting_cash,
            enforce_market_hours,
            rejected_sell,
            market_offset,
        })
    }
}

fn read(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode(key)),
    }
}

fn seconds(key: &'static str, default_value: u64) -> Result<u64, ConfigError> {
    match read(key)? {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidSeconds(key)),
        None => Ok(default_value),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::{env, sync::Mutex, time::Duration};

    use store::RejectedSellPolicy;

    use super::{
        Config, ConfigError, ENV_ADDR, ENV_DB_PATH, ENV_ENFORCE_HOURS, ENV_PRICE_INTERVAL,
        ENV_REJECTED_SELL, ENV_SETTLEMENT_DELAY, ENV_SETTLEMENT_INTERVAL, ENV_STARTING_CASH,
        ENV_UTC_OFFSET,
    };

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_KEYS: [&str; 9] = [
        ENV_ADDR,
        ENV_DB_PATH,
        ENV_SETTLEMENT_INTERVAL,
        ENV_SETTLEMENT_DELAY,
        ENV_PRICE_INTERVAL,
        ENV_STARTING_CASH,
        ENV_ENFORCE_HOURS,
        ENV_REJECTED_SELL,
        ENV_UTC_OFFSET,
    ];

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<std::ffi::OsString>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn unset(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }

        #[cfg(unix)]
        fn set_os(key: &'static str, value: std::ffi::OsString) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.take() {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    fn clean_env() -> Vec<EnvVarGuard> {
        ALL_KEYS.into_iter().map(EnvVarGuard::unset).collect()
    }

    #[test]
    fn defaults_when_env_is_unset() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:3001".parse().unwrap());
        assert_eq!(config.db_path.to_str(), Some("data/trading.db"));
        assert_eq!(config.settlement_interval, Duration::from_secs(15));
        assert_eq!(config.settlement_delay, chrono::Duration::seconds(60));
        assert_eq!(config.price_interval, Duration::from_secs(30));
        assert_eq!(config.starting_cash, 10_000.0);
        assert!(!config.enforce_market_hours);
        assert_eq!(config.rejected_sell, RejectedSellPolicy::MarkExecuted);
    }

    #[test]
    fn overrides_are_read_from_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();
        let _guards = [
            EnvVarGuard::set(ENV_ADDR, "127.0.0.1:9090"),
            EnvVarGuard::set(ENV_DB_PATH, ":memory:"),
            EnvVarGuard::set(ENV_SETTLEMENT_INTERVAL, "5"),
            EnvVarGuard::set(ENV_SETTLEMENT_DELAY, "0"),
            EnvVarGuard::set(ENV_STARTING_CASH, "250.5"),
            EnvVarGuard::set(ENV_ENFORCE_HOURS, "true"),
            EnvVarGuard::set(ENV_REJECTED_SELL, "failed"),
            EnvVarGuard::set(ENV_UTC_OFFSET, "-300"),
        ];

        let config = Config::from_env().unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(config.db_path.to_str(), Some(":memory:"));
        assert_eq!(config.settlement_interval, Duration::from_secs(5));
        assert_eq!(config.settlement_delay, chrono::Duration::zero());
        assert_eq!(config.starting_cash, 250.5);
        assert!(config.enforce_market_hours);
        assert_eq!(config.rejected_sell, RejectedSellPolicy::MarkFailed);
        assert_eq!(config.market_offset.local_minus_utc(), -300 * 60);
    }

    #[test]
    fn rejects_invalid_listen_address() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();
        let _guard = EnvVarGuard::set(ENV_ADDR, "not-an-addr");

        let err = Config::from_env().unwrap_err();

        assert!(matches!(err, ConfigError::InvalidListenAddr(_)));
    }

    #[test]
    fn rejects_zero_interval_and_names_the_variable() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();
        let _guard = EnvVarGuard::set(ENV_PRICE_INTERVAL, "0");

        let err = Config::from_env().unwrap_err();

        assert!(matches!(err, ConfigError::InvalidSeconds(ENV_PRICE_INTERVAL)));
        assert_eq!(
            err.to_string(),
            "TRADING_PRICE_INTERVAL_SECS must be a positive whole number of seconds"
        );
    }

    #[test]
    fn rejects_unknown_policy_and_blank_db_path() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();

        {
            let _guard = EnvVarGuard::set(ENV_REJECTED_SELL, "maybe");
            assert!(matches!(
                Config::from_env().unwrap_err(),
                ConfigError::InvalidRejectedSell
            ));
        }
        {
            let _guard = EnvVarGuard::set(ENV_DB_PATH, "   ");
            assert!(matches!(
                Config::from_env().unwrap_err(),
                ConfigError::InvalidDbPath
            ));
        }
    }

    #[test]
    fn rejects_out_of_range_offset_and_negative_cash() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();

        {
            let _guard = EnvVarGuard::set(ENV_UTC_OFFSET, "1440");
            assert!(matches!(
                Config::from_env().unwrap_err(),
                ConfigError::InvalidUtcOffset
            ));
        }
        {
            let _guard = EnvVarGuard::set(ENV_STARTING_CASH, "-1");
            assert!(matches!(
                Config::from_env().unwrap_err(),
                ConfigError::InvalidStartingCash
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn rejects_non_unicode_values() {
        use std::os::unix::ffi::OsStringExt;

        let _lock = ENV_LOCK.lock().unwrap();
        let _baseline = clean_env();
        let _guard = EnvVarGuard::set_os(
            ENV_DB_PATH,
            std::ffi::OsString::from_vec(vec![0x66, 0x6f, 0x80]),
        );

        let err = Config::from_env().unwrap_err();

        assert!(matches!(err, ConfigError::NonUnicode(ENV_DB_PATH)));
    }
}
