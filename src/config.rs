//! Connection credentials.
//!
//! Credentials can be built in code, parsed from TOML, or read from
//! `ROWMAP_*` environment variables.

use crate::error::{OrmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

fn default_driver() -> String {
    "sqlite".to_string()
}

/// Everything needed to open a connection.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub(crate) url: String,
    #[serde(default = "default_driver")]
    pub(crate) driver: String,
    #[serde(default)]
    pub(crate) user: String,
    #[serde(default)]
    pub(crate) password: String,
    #[serde(default)]
    pub(crate) engine_type: String,
}

impl Credentials {
    pub fn new(
        url: impl Into<String>,
        driver: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        engine_type: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            driver: driver.into(),
            user: user.into(),
            password: password.into(),
            engine_type: engine_type.into(),
        }
    }

    /// Parses credentials from a TOML document.
    ///
    /// ```toml
    /// url = "sqlite:app.db"
    /// driver = "sqlite"
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut credentials: Self = toml::from_str(content)
            .map_err(|e| OrmError::configuration(format!("invalid credentials: {e}")))?;
        if credentials.driver.is_empty() {
            credentials.driver = default_driver();
        }
        Ok(credentials)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrmError::configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Reads `ROWMAP_URL`, `ROWMAP_DRIVER`, `ROWMAP_USER`, `ROWMAP_PASSWORD`
    /// and `ROWMAP_ENGINE_TYPE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| OrmError::configuration(format!("{key} is not set")))
        };
        Ok(Self {
            url: required("ROWMAP_URL")?,
            driver: required("ROWMAP_DRIVER")?,
            user: lookup("ROWMAP_USER").unwrap_or_default(),
            password: lookup("ROWMAP_PASSWORD").unwrap_or_default(),
            engine_type: lookup("ROWMAP_ENGINE_TYPE").unwrap_or_default(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_engine_type(mut self, engine_type: impl Into<String>) -> Self {
        self.engine_type = engine_type.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn engine_type(&self) -> &str {
        &self.engine_type
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("driver", &self.driver)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("engine_type", &self.engine_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_toml() {
        let credentials = Credentials::from_toml_str(
            r#"
            url = "sqlite:app.db"
            user = "app"
            password = "hunter2"
            engine_type = "sqlite"
            "#,
        )
        .unwrap();
        assert_eq!(credentials.url(), "sqlite:app.db");
        assert_eq!(credentials.driver(), "sqlite");
        assert_eq!(credentials.user(), "app");
        assert_eq!(credentials.password(), "hunter2");
    }

    #[test]
    fn test_from_toml_requires_url() {
        let err = Credentials::from_toml_str("driver = \"sqlite\"").unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ROWMAP_URL", ":memory:"),
            ("ROWMAP_DRIVER", "sqlite"),
            ("ROWMAP_USER", "sa"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| vars.get(key).map(|v| v.to_string());
        let credentials = Credentials::from_lookup(lookup).unwrap();
        assert_eq!(credentials.url(), ":memory:");
        assert_eq!(credentials.user(), "sa");
        assert_eq!(credentials.password(), "");
    }

    #[test]
    fn test_from_lookup_missing_driver() {
        let lookup = |key: &str| (key == "ROWMAP_URL").then(|| "db.sqlite".to_string());
        let err = Credentials::from_lookup(lookup).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: ROWMAP_DRIVER is not set");
    }

    #[test]
    fn test_builder_and_debug_redaction() {
        let credentials = Credentials::default()
            .with_url("sqlite:x.db")
            .with_driver("sqlite")
            .with_user("u")
            .with_password("secret")
            .with_engine_type("sqlite");
        assert_eq!(
            credentials,
            Credentials::new("sqlite:x.db", "sqlite", "u", "secret", "sqlite")
        );
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
