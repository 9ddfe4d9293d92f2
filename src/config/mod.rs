use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config, read_config_from};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_token_ttl_hours")]
    token_ttl_hours: i64,
    admin: Option<AdminSeed>,
}

/// Account created on startup when no user with this email exists yet.
#[derive(Debug, Deserialize)]
pub struct AdminSeed {
    name: String,
    email: String,
    password: String,
}

fn default_token_ttl_hours() -> i64 {
    24
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    Self::from_slice(&bytes)
                };

                let config = match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                };

                config
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let config: Self = toml::from_slice(bytes)?;
        Ok(config)
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn token_ttl_hours(&self) -> i64 {
        self.token_ttl_hours
    }

    #[inline]
    pub fn admin(&self) -> Option<&AdminSeed> {
        self.admin.as_ref()
    }
}

impl AdminSeed {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn config_test() {
        let config = Config::get_or_init(true).await;
        assert_eq!(config.host().bindto(), "127.0.0.1:5000"); // defaults
    }

    #[test]
    fn config_defaults_test() {
        let raw = br#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/statt"
        "#;

        let config = Config::from_slice(raw).unwrap();
        assert_eq!(config.host().bindto(), "0.0.0.0:8080");
        assert!(!config.app().docs());
        assert_eq!(config.app().token_ttl_hours(), 24);
        assert!(config.app().admin().is_none());
    }

    #[test]
    fn config_admin_seed_test() {
        let raw = br#"
            [host]
            bindto = "127.0.0.1:5000"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/statt"
            docs = true
            token_ttl_hours = 2

            [app.admin]
            name = "root"
            email = "root@example.com"
            password = "Root@1234"
        "#;

        let config = Config::from_slice(raw).unwrap();
        let admin = config.app().admin().unwrap();
        assert_eq!(admin.email(), "root@example.com");
        assert_eq!(config.app().token_ttl_hours(), 2);
        assert!(config.app().docs());
    }

    #[test]
    fn config_missing_field_test() {
        let raw = br#"
            [host]
            bindto = "127.0.0.1:5000"
        "#;

        assert!(matches!(
            Config::from_slice(raw),
            Err(ConfigError::TomlDeError(_))
        ));
    }
}
