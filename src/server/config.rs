use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Upper bound for a recipe's cooking time, in minutes.
    #[serde(default = "default_max_cooking_time")]
    pub max_cooking_time: i32,

    #[serde(default = "default_page_size")]
    pub page_size: u64,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Marks the login cookie `Secure`. Turn off only for plain-HTTP local setups.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    log_dir: Option<String>,
    max_cooking_time: Option<i32>,
    page_size: Option<u64>,
    token_ttl_hours: Option<i64>,
    bcrypt_cost: Option<u32>,
    secure_cookies: Option<bool>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_max_cooking_time() -> i32 {
    1441
}

fn default_page_size() -> u64 {
    6
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_secure_cookies() -> bool {
    true
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let path = Path::new(path_str);
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents).map_err(|e| {
                    format!("Failed to parse TOML from config file at {path:?}: {e}")
                })?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        merge(env_config, file_config)
    }

    /// Configuration for tests and tools that build the router directly.
    pub fn for_database(database_url: &str, jwt_secret: &str) -> Self {
        ServerConfig {
            database_url: database_url.to_string(),
            jwt_secret: jwt_secret.to_string(),
            listen_addr: default_listen_addr(),
            log_dir: default_log_dir(),
            max_cooking_time: default_max_cooking_time(),
            page_size: default_page_size(),
            token_ttl_hours: default_token_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

fn merge(env: PartialServerConfig, file: PartialServerConfig) -> Result<ServerConfig, String> {
    let config = ServerConfig {
        database_url: env
            .database_url
            .or(file.database_url)
            .ok_or("DATABASE_URL is required")?,
        jwt_secret: env
            .jwt_secret
            .or(file.jwt_secret)
            .ok_or("JWT_SECRET is required")?,
        listen_addr: env
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or_else(default_listen_addr),
        log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
        max_cooking_time: env
            .max_cooking_time
            .or(file.max_cooking_time)
            .unwrap_or_else(default_max_cooking_time),
        page_size: env
            .page_size
            .or(file.page_size)
            .unwrap_or_else(default_page_size),
        token_ttl_hours: env
            .token_ttl_hours
            .or(file.token_ttl_hours)
            .unwrap_or_else(default_token_ttl_hours),
        bcrypt_cost: env
            .bcrypt_cost
            .or(file.bcrypt_cost)
            .unwrap_or_else(default_bcrypt_cost),
        secure_cookies: env
            .secure_cookies
            .or(file.secure_cookies)
            .unwrap_or_else(default_secure_cookies),
    };

    if config.max_cooking_time < 1 {
        return Err("MAX_COOKING_TIME must be at least 1".to_string());
    }
    if config.page_size == 0 {
        return Err("PAGE_SIZE must be at least 1".to_string());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(text: &str) -> PartialServerConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn environment_overrides_file() {
        let file = from_toml(
            r#"
            database_url = "postgres://file/db"
            jwt_secret = "file-secret"
            page_size = 10
            "#,
        );
        let env = PartialServerConfig {
            jwt_secret: Some("env-secret".to_string()),
            ..Default::default()
        };

        let config = merge(env, file).unwrap();
        assert_eq!(config.database_url, "postgres://file/db");
        assert_eq!(config.jwt_secret, "env-secret");
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let env = PartialServerConfig {
            database_url: Some("sqlite::memory:".to_string()),
            jwt_secret: Some("s".to_string()),
            ..Default::default()
        };
        let config = merge(env, PartialServerConfig::default()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.max_cooking_time, 1441);
        assert_eq!(config.page_size, 6);
        assert_eq!(config.token_ttl_hours, 24);
        assert!(config.secure_cookies);
    }

    #[test]
    fn secure_cookies_can_be_disabled() {
        let file = from_toml(
            r#"
            database_url = "sqlite::memory:"
            jwt_secret = "s"
            secure_cookies = false
            "#,
        );
        let config = merge(PartialServerConfig::default(), file).unwrap();
        assert!(!config.secure_cookies);
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let err = merge(PartialServerConfig::default(), PartialServerConfig::default())
            .unwrap_err();
        assert!(err.contains("DATABASE_URL"));

        let env = PartialServerConfig {
            database_url: Some("sqlite::memory:".to_string()),
            ..Default::default()
        };
        let err = merge(env, PartialServerConfig::default()).unwrap_err();
        assert!(err.contains("JWT_SECRET"));
    }

    #[test]
    fn rejects_zero_page_size() {
        let env = PartialServerConfig {
            database_url: Some("sqlite::memory:".to_string()),
            jwt_secret: Some("s".to_string()),
            page_size: Some(0),
            ..Default::default()
        };
        assert!(merge(env, PartialServerConfig::default()).is_err());
    }
}
