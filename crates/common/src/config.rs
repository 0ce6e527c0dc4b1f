use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration loaded from environment variables at startup.
/// Every key is optional; a present but malformed value causes an immediate
/// panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Output
    pub output_dir: PathBuf,

    // Universe
    pub universe_dir: PathBuf,

    // Scoring profile: a preset name, optionally overridden by a TOML file
    pub scoring_profile: String,
    pub scoring_profile_path: Option<PathBuf>,

    // Data source
    pub yahoo_base_url: String,
    pub fetch_max_attempts: u32,
    pub fetch_retry_delay: Duration,
    /// Cookie origin visited before asking for a quoteSummary crumb.
    pub yahoo_cookie_url: String,
    /// History ranges requested for the screen and analysis passes.
    pub screen_period: String,
    pub analysis_period: String,

    // Politeness throttle between tickers
    pub throttle_min: Duration,
    pub throttle_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            universe_dir: PathBuf::from("universe"),
            scoring_profile: "screener".to_string(),
            scoring_profile_path: None,
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            fetch_max_attempts: 3,
            fetch_retry_delay: Duration::from_secs(5),
            yahoo_cookie_url: "https://fc.yahoo.com".to_string(),
            screen_period: "90d".to_string(),
            analysis_period: "120d".to_string(),
            throttle_min: Duration::from_millis(300),
            throttle_max: Duration::from_millis(800),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        let defaults = Config::default();

        let throttle_min = parsed_env::<u64>("THROTTLE_MIN_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.throttle_min);
        let throttle_max = parsed_env::<u64>("THROTTLE_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.throttle_max);
        if throttle_max < throttle_min {
            panic!("THROTTLE_MAX_MS must not be lower than THROTTLE_MIN_MS");
        }

        let fetch_max_attempts = parsed_env::<u32>("FETCH_MAX_ATTEMPTS")
            .unwrap_or(defaults.fetch_max_attempts);
        if fetch_max_attempts == 0 {
            panic!("FETCH_MAX_ATTEMPTS must be at least 1");
        }

        Config {
            output_dir: optional_env("SCREENER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            universe_dir: optional_env("UNIVERSE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.universe_dir),
            scoring_profile: optional_env("SCORING_PROFILE").unwrap_or(defaults.scoring_profile),
            scoring_profile_path: optional_env("SCORING_PROFILE_PATH").map(PathBuf::from),
            yahoo_base_url: optional_env("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            fetch_max_attempts,
            fetch_retry_delay: parsed_env::<u64>("FETCH_RETRY_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_retry_delay),
            yahoo_cookie_url: optional_env("YAHOO_COOKIE_URL").unwrap_or(defaults.yahoo_cookie_url),
            screen_period: optional_env("SCREEN_PERIOD").unwrap_or(defaults.screen_period),
            analysis_period: optional_env("ANALYSIS_PERIOD").unwrap_or(defaults.analysis_period),
            throttle_min,
            throttle_max,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|raw| parse_value(key, &raw))
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> T {
    raw.trim().parse::<T>().unwrap_or_else(|_| {
        panic!("Environment variable '{key}' has an invalid value: '{raw}'")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fetch_policy() {
        let cfg = Config::default();
        assert_eq!(cfg.fetch_max_attempts, 3);
        assert_eq!(cfg.fetch_retry_delay, Duration::from_secs(5));
        assert!(cfg.throttle_min < cfg.throttle_max);
        assert_eq!(cfg.screen_period, "90d");
        assert_eq!(cfg.analysis_period, "120d");
    }

    #[test]
    fn parse_value_trims_whitespace() {
        assert_eq!(parse_value::<u64>("X", " 250 "), 250);
    }

    #[test]
    #[should_panic(expected = "invalid value")]
    fn parse_value_panics_on_garbage() {
        let _ = parse_value::<u32>("FETCH_MAX_ATTEMPTS", "three");
    }
}
