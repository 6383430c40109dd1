use serde::Deserialize;

/// Complete Fleetwatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FleetwatchConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

/// API endpoint configuration — base for both the pull endpoints and the
/// push channel
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_host() -> String {
    "localhost".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl ApiConfig {
    /// `http://host:port/{path}`
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("http://{}:{}/{}", self.host, self.port, path)
    }

    /// `ws://host:port/ws` — the push channel
    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

/// Snapshot polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// How often to refresh the top-N snapshot (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    /// Row limit forwarded to the summary endpoint
    #[serde(default = "default_top_n_limit")]
    pub top_n_limit: usize,
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_top_n_limit() -> usize {
    10
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            top_n_limit: default_top_n_limit(),
        }
    }
}

/// Marker animation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnimationConfig {
    /// Duration of one position transition (milliseconds)
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
    /// Animation driver cadence (milliseconds per frame)
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
}

fn default_transition_ms() -> u64 {
    1000
}

fn default_frame_interval() -> u64 {
    50
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            transition_ms: default_transition_ms(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

impl Default for FleetwatchConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            poll: PollConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl FleetwatchConfig {
    /// Build from env vars (FLEETWATCH_API_HOST / FLEETWATCH_API_PORT),
    /// falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("FLEETWATCH_API_HOST") {
            if !v.is_empty() {
                self.api.host = v;
            }
        }
        if let Ok(v) = std::env::var("FLEETWATCH_API_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                self.api.port = n;
            }
        }
    }
}

/// Load configuration from TOML file; env vars override the file
pub fn load_config(path: &str) -> Result<FleetwatchConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let mut config: FleetwatchConfig = toml::from_str(&contents)?;
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FleetwatchConfig::default();
        assert_eq!(config.api.host, "localhost");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.poll.interval_ms, 5000);
        assert_eq!(config.poll.top_n_limit, 10);
        assert_eq!(config.animation.transition_ms, 1000);
        assert_eq!(config.animation.frame_interval_ms, 50);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [api]
            host = "fleet.example.com"
            port = 9090

            [poll]
            interval_ms = 2000
            top_n_limit = 25

            [animation]
            transition_ms = 500
            frame_interval_ms = 16
        "#;

        let config: FleetwatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.host, "fleet.example.com");
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.poll.interval_ms, 2000);
        assert_eq!(config.poll.top_n_limit, 25);
        assert_eq!(config.animation.transition_ms, 500);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [poll]
            interval_ms = 1000
        "#;

        let config: FleetwatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.api.port, 8080); // Default
        assert_eq!(config.poll.top_n_limit, 10); // Default
    }

    #[test]
    fn test_urls() {
        let api = ApiConfig::default();
        assert_eq!(
            api.endpoint_url("metrics/top10"),
            "http://localhost:8080/metrics/top10"
        );
        assert_eq!(api.websocket_url(), "ws://localhost:8080/ws");
    }
}
