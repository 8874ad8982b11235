use std::env;
use std::time::Duration;

// Environment variables recognized by the supervisor. PORT / WEB_PORT are
// informational for the web child; the bot variables are passed through
// untouched.
pub const PORT_ENV: &str = "PORT";
pub const WEB_PORT_ENV: &str = "WEB_PORT";
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const OWNER_ID_ENV: &str = "OWNER_ID";
pub const HEALTH_INTERVAL_ENV: &str = "DSW_HEALTH_INTERVAL_SEC";

// Hosting platforms probe this port for the health endpoint when PORT is not
// set from outside.
pub const WEB_PORT_DEFAULT: &str = "10000";

pub const WEB_COMMAND_DEFAULT: &str = "python3 app.py";
pub const BOT_COMMAND_DEFAULT: &str = "python3 bot.py";

pub const HEALTH_INTERVAL_DEFAULT: Duration = Duration::from_secs(30);
pub const BOT_START_DELAY_DEFAULT: Duration = Duration::from_secs(3);

/// Resolved supervisor settings: the two child command lines plus the timing
/// knobs for startup staggering and liveness polling.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub web_command: Vec<String>,
    pub bot_command: Vec<String>,
    pub health_interval: Duration,
    pub bot_start_delay: Duration,
}

impl SupervisorConfig {
    /// Merge CLI arguments with the ambient environment. CLI wins over env,
    /// env wins over the built-in defaults.
    pub fn resolve(
        web_cmd: &str,
        bot_cmd: &str,
        interval_secs: Option<u64>,
        delay_secs: Option<u64>,
    ) -> Self {
        let health_interval = interval_secs
            .map(Duration::from_secs)
            .or_else(health_interval_from_env)
            .unwrap_or(HEALTH_INTERVAL_DEFAULT);
        let bot_start_delay = delay_secs
            .map(Duration::from_secs)
            .unwrap_or(BOT_START_DELAY_DEFAULT);

        Self {
            web_command: split_command_line(web_cmd),
            bot_command: split_command_line(bot_cmd),
            health_interval,
            bot_start_delay,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::resolve(WEB_COMMAND_DEFAULT, BOT_COMMAND_DEFAULT, None, None)
    }
}

pub fn split_command_line(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

pub fn health_interval_from_env() -> Option<Duration> {
    env::var(HEALTH_INTERVAL_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Externally advertised web port: PORT if the platform set it, otherwise
/// WEB_PORT, otherwise the built-in default.
pub fn web_port() -> String {
    env::var(PORT_ENV)
        .or_else(|_| env::var(WEB_PORT_ENV))
        .unwrap_or_else(|_| WEB_PORT_DEFAULT.to_string())
}

pub fn bot_token_present() -> bool {
    env::var(BOT_TOKEN_ENV).map(|v| !v.is_empty()).unwrap_or(false)
}

pub fn owner_id() -> Option<String> {
    env::var(OWNER_ID_ENV).ok().filter(|v| !v.is_empty())
}

/// Environment overrides for the web child. PORT is pinned so the child sees
/// the same port the supervisor advertises.
pub fn web_env() -> Vec<(String, String)> {
    vec![(PORT_ENV.to_string(), web_port())]
}

/// Environment overrides for the bot child: token and owner id pass-through.
pub fn bot_env() -> Vec<(String, String)> {
    let mut env_overrides = Vec::new();
    if let Ok(token) = env::var(BOT_TOKEN_ENV) {
        env_overrides.push((BOT_TOKEN_ENV.to_string(), token));
    }
    if let Some(owner) = owner_id() {
        env_overrides.push((OWNER_ID_ENV.to_string(), owner));
    }
    env_overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_cli_over_defaults() {
        let config = SupervisorConfig::resolve("sleep 100", "sleep 200", Some(5), Some(1));
        assert_eq!(config.web_command, vec!["sleep", "100"]);
        assert_eq!(config.bot_command, vec!["sleep", "200"]);
        assert_eq!(config.health_interval, Duration::from_secs(5));
        assert_eq!(config.bot_start_delay, Duration::from_secs(1));
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.web_command, vec!["python3", "app.py"]);
        assert_eq!(config.bot_command, vec!["python3", "bot.py"]);
        assert_eq!(config.health_interval, HEALTH_INTERVAL_DEFAULT);
        assert_eq!(config.bot_start_delay, BOT_START_DELAY_DEFAULT);
    }

    #[test]
    fn split_command_line_collapses_whitespace() {
        assert_eq!(
            split_command_line("  python3   app.py  "),
            vec!["python3", "app.py"]
        );
        assert!(split_command_line("   ").is_empty());
    }
}
