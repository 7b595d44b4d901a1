//! Environment-driven configuration.
//!
//! The runtime hands every setting to the bot through environment
//! variables; defaults below match a local runner. A missing `BOT_TOKEN`
//! is replaced with a freshly generated GUID-style token so the bot stays
//! registrable across restarts of a local game.

use std::time::Duration;

use mcts::MctsConfig;
use rand::Rng;

/// Adapter configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub runner_host: String,
    pub runner_port: u16,
    pub hub_name: String,
    pub bot_nickname: String,
    pub bot_token: String,
    /// Override for the engine's wall-clock budget, in milliseconds.
    pub time_limit_ms: Option<u64>,
    /// Override for the engine's iteration cap.
    pub max_iterations: Option<u32>,
    /// Override for the engine's worker count.
    pub workers: Option<usize>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            runner_host: "http://localhost".to_string(),
            runner_port: 5000,
            hub_name: "bothub".to_string(),
            bot_nickname: "zooscape-mcts".to_string(),
            bot_token: String::new(),
            time_limit_ms: None,
            max_iterations: None,
            workers: None,
        }
    }
}

/// Reduce env-override boilerplate: plain strings, parsed values and
/// optional parsed values.
macro_rules! env_override {
    ($config:expr, $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$field = v;
        }
    };
    ($config:expr, $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$field = v;
        }
    };
    ($config:expr, $field:ident, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$field = Some(v);
        }
    };
}

impl BotConfig {
    /// Defaults overridden by the environment; generates a token when the
    /// environment provides none.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        env_override!(config, runner_host, "RUNNER_IPV4_OR_URL");
        env_override!(config, runner_port, "RUNNER_PORT", parse);
        env_override!(config, hub_name, "HUB_NAME");
        env_override!(config, bot_nickname, "BOT_NICKNAME");
        env_override!(config, bot_token, "BOT_TOKEN");
        env_override!(config, time_limit_ms, "MCTS_TIME_LIMIT_MS", optional_parse);
        env_override!(config, max_iterations, "MCTS_MAX_ITERATIONS", optional_parse);
        env_override!(config, workers, "MCTS_WORKERS", optional_parse);

        if config.bot_token.is_empty() {
            config.bot_token = generate_token(&mut rand::thread_rng());
        }
        config
    }

    /// The hub endpoint the transport connects to.
    pub fn hub_url(&self) -> String {
        format!("{}:{}/{}", self.runner_host, self.runner_port, self.hub_name)
    }

    /// Engine configuration with the environment overrides applied.
    pub fn mcts_config(&self) -> MctsConfig {
        let mut config = MctsConfig::default();
        if let Some(ms) = self.time_limit_ms {
            config.time_budget = Duration::from_millis(ms);
        }
        if let Some(iterations) = self.max_iterations {
            config.max_iterations = iterations;
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers.max(1);
        }
        config
    }
}

/// A 32-hex-digit token with dashes at the usual GUID positions.
fn generate_token<R: Rng>(rng: &mut R) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut token = String::with_capacity(36);
    for i in 0..32 {
        if i == 8 || i == 12 || i == 16 || i == 20 {
            token.push('-');
        }
        token.push(HEX[rng.gen_range(0..HEX.len())] as char);
    }
    token
}
