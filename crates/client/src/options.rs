//! Connection options
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! host = "localhost"
//! port = 5000
//! credentials = "user:password"   # optional
//! timeout_ms = 1000               # connect timeout; 0 blocks
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ClientError, Result};

/// Where and how to connect.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOptions {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// `user:password`, sent during the handshake.
    pub credentials: Option<String>,
    /// Connect timeout in milliseconds; 0 waits indefinitely.
    pub timeout_ms: u64,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            host: "localhost".to_string(),
            port: 5000,
            credentials: None,
            timeout_ms: 1000,
        }
    }
}

impl ConnectOptions {
    /// Options for `host:port` with no credentials and a one second timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ConnectOptions {
            host: host.into(),
            port,
            ..ConnectOptions::default()
        }
    }

    /// Authenticate as `user` with `password`.
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some(format!("{user}:{password}"));
        self
    }

    /// Connect timeout; `Duration::ZERO` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Connect timeout, or `None` to wait indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Credentials as sent in the handshake (empty when unset).
    pub fn credentials(&self) -> &str {
        self.credentials.as_deref().unwrap_or_default()
    }

    /// Check the options before dialling.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ClientError::Config("host is empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::Config("port must be non-zero".into()));
        }
        if self.credentials().contains('\0') {
            return Err(ClientError::Config("credentials contain NUL".into()));
        }
        Ok(())
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: ConnectOptions =
            toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self
            .credentials
            .as_deref()
            .map(|c| c.split(':').next().unwrap_or_default());
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &user)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder() {
        let o = ConnectOptions::new("kdb.local", 5001)
            .with_credentials("user", "secret")
            .with_timeout(Duration::from_millis(250));
        assert_eq!(o.address(), "kdb.local:5001");
        assert_eq!(o.credentials(), "user:secret");
        assert_eq!(o.timeout(), Some(Duration::from_millis(250)));
        assert!(!format!("{o:?}").contains("secret"));

        let blocking = o.with_timeout(Duration::ZERO);
        assert_eq!(blocking.timeout(), None);
    }

    #[test]
    fn test_from_toml() {
        let o = ConnectOptions::from_toml_str(
            r#"
            host = "10.0.0.1"
            port = 6000
            credentials = "u:p"
            "#,
        )
        .unwrap();
        assert_eq!(o.host, "10.0.0.1");
        assert_eq!(o.port, 6000);
        assert_eq!(o.credentials(), "u:p");
        assert_eq!(o.timeout_ms, 1000);

        let defaults = ConnectOptions::from_toml_str("").unwrap();
        assert_eq!(defaults, ConnectOptions::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ConnectOptions::from_toml_str("port = \"five\""),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ConnectOptions::from_toml_str("port = 0"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ConnectOptions::from_toml_str("hots = \"x\""),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"db\"\nport = 5010\ntimeout_ms = 0").unwrap();
        let o = ConnectOptions::from_file(file.path()).unwrap();
        assert_eq!(o.address(), "db:5010");
        assert_eq!(o.timeout(), None);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            ConnectOptions::from_file(missing),
            Err(ClientError::Config(_))
        ));
    }
}
