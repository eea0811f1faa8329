//! Client configuration.
//!
//! Configuration can be built programmatically or loaded from a TOML file.
//! It covers:
//! - Platform URLs (frontend base URL, optional separate backend URL)
//! - Credentials (username/password plus organization, or a ready JWT)
//! - TLS options (CA bundle, client certificate, verification toggle)
//! - Request timeouts

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AegisError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Frontend base URL, e.g. `https://aegis.example.com`.
    pub base_url: String,

    /// Backend URL when the API is served from a different host; defaults
    /// to `base_url`.
    #[serde(default)]
    pub backend_url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// A ready-made JWT, used instead of username/password.
    #[serde(default)]
    pub token: Option<String>,

    /// Organization to log in under; system admins leave this unset.
    #[serde(default)]
    pub organization: Option<String>,

    /// Path to a PEM CA bundle for the platform's certificate.
    #[serde(default)]
    pub cacert: Option<PathBuf>,

    /// Disable server certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a PEM client certificate (certificate + key).
    #[serde(default)]
    pub client_cert: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            backend_url: None,
            username: None,
            password: None,
            token: None,
            organization: None,
            cacert: None,
            insecure: false,
            client_cert: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AegisError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: ClientConfig = toml::from_str(&content).map_err(|e| {
            AegisError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_backend_url(mut self, backend_url: impl Into<String>) -> Self {
        self.backend_url = Some(backend_url.into());
        self
    }

    pub fn with_cacert(mut self, path: impl Into<PathBuf>) -> Self {
        self.cacert = Some(path.into());
        self
    }

    pub fn with_client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(path.into());
        self
    }

    /// Disables server certificate verification. Only for lab setups with
    /// self-signed certificates.
    pub fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
