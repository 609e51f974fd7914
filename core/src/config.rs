//! Client configuration.

use serde::Deserialize;

/// Environment variable that overrides [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "REST_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub login_route: String,
    pub logout_route: String,
    /// Nesting depth past which multipart flattening stops recursing.
    pub max_form_depth: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1/api".to_string(),
            login_route: "login".to_string(),
            logout_route: "logout".to_string(),
            max_form_depth: 32,
        }
    }
}

impl ClientConfig {
    /// Defaults, with `REST_BASE_URL` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"https://api.example.com"}"#).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.login_route, "login");
        assert_eq!(config.max_form_depth, 32);
    }
}
