// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the admin web server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub log_level: String,

    // Auth gate configuration
    pub auth: AuthConfig,

    // Static file serving configuration
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the cookie carrying the bearer token
    pub cookie_name: String,
    /// Backend endpoint that accepts `Authorization: Bearer <token>`.
    /// When unset the gate only performs the local JWT-shape check.
    pub validation_url: Option<String>,
    pub validation_timeout_secs: u64,
    pub login_path: String,
    pub dashboard_path: String,
    /// Paths that require a valid token
    pub protected_prefixes: Vec<String>,
    /// Paths an authenticated user gets bounced away from
    pub auth_pages: Vec<String>,
    /// Paths the gate never looks at (assets, API routes)
    pub bypass_prefixes: Vec<String>,
    /// Old admin prefix, permanently redirected to the dashboard
    pub legacy_prefix: String,
    pub secure_cookies: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            validation_url: None,
            validation_timeout_secs: 10,
            login_path: "/login".to_string(),
            dashboard_path: "/dashboard".to_string(),
            protected_prefixes: vec!["/dashboard".to_string()],
            auth_pages: vec!["/login".to_string(), "/forgot-password".to_string()],
            bypass_prefixes: vec![
                "/_next".to_string(),
                "/static".to_string(),
                "/favicon.ico".to_string(),
                "/api".to_string(),
            ],
            legacy_prefix: "/admin".to_string(),
            secure_cookies: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:3000".to_string(),
            log_level: "info".to_string(),
            auth: AuthConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Config {
    /// Directory holding `default.toml` and friends
    pub fn config_dir() -> PathBuf {
        env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let path = PathBuf::from("./config");
                if path.exists() {
                    path
                } else {
                    PathBuf::from("../config")
                }
            })
    }

    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let config_dir = Self::config_dir();

        let config = ConfigFile::builder()
            // Secure cookies are on by default outside development
            .set_default("auth.secure_cookies", run_mode == "production")?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__AUTH__VALIDATION_URL
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables.
    ///
    /// Runs before logging is set up, so the load error is handed back
    /// alongside the fallback instead of being logged here.
    pub fn from_env() -> (Self, Option<config::ConfigError>) {
        match Self::load() {
            Ok(config) => (config, None),
            Err(e) => (Self::from_env_vars(), Some(e)),
        }
    }

    fn from_env_vars() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = env::var("WEB_SERVER_ADDR") {
            config.web_server_addr = addr;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config.auth.validation_url = env::var("VALIDATION_URL").ok();

        config.auth.secure_cookies = env::var("SECURE_COOKIES")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        if let Ok(path) = env::var("STATIC_FILES_PATH") {
            config.static_files.path = path;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_cookie_contract() {
        let config = Config::default();
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.auth.login_path, "/login");
        assert_eq!(config.auth.dashboard_path, "/dashboard");
        assert!(config.auth.auth_pages.iter().any(|p| p == "/forgot-password"));
        assert!(!config.auth.secure_cookies);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let raw = r#"
            web_server_addr = "0.0.0.0:8080"

            [auth]
            validation_url = "https://backend.example/api/auth/validate"
            protected_prefixes = ["/dashboard", "/reports"]
            secure_cookies = true
        "#;

        let config: Config = ConfigFile::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.web_server_addr, "0.0.0.0:8080");
        assert_eq!(config.auth.protected_prefixes.len(), 2);
        assert_eq!(
            config.auth.validation_url.as_deref(),
            Some("https://backend.example/api/auth/validate")
        );
        assert!(config.auth.secure_cookies);
        // Untouched keys fall back to defaults
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.static_files.index, "index.html");
    }

    #[test]
    fn test_broken_file_falls_back_to_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[auth\nvalidation_url = ").unwrap();

        env::set_var("CONFIG_DIR", dir.path());
        env::set_var("VALIDATION_URL", "https://backend.example/api/auth/validate");
        env::set_var("WEB_SERVER_ADDR", "0.0.0.0:9000");

        let (config, error) = Config::from_env();

        env::remove_var("CONFIG_DIR");
        env::remove_var("VALIDATION_URL");
        env::remove_var("WEB_SERVER_ADDR");

        assert!(error.is_some());
        assert_eq!(
            config.auth.validation_url.as_deref(),
            Some("https://backend.example/api/auth/validate")
        );
        assert_eq!(config.web_server_addr, "0.0.0.0:9000");
        assert_eq!(config.auth.cookie_name, "token");
        assert!(!config.auth.secure_cookies);
    }
}
