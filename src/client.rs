//! The HTTP transport and session layer.
//!
//! [`Client`] owns the reqwest connection pool, the JWT session token and
//! the platform URL layout. Every remote call funnels through one request
//! helper that sends JSON, checks the expected status code and unwraps the
//! platform's `{"response": ...}` envelope. Retry policy for transient
//! failures lives here; the model core never retries.
//!
//! # Example
//!
//! ```no_run
//! use aegis_client::{Client, ClientConfig};
//!
//! # async fn run() -> aegis_client::Result<()> {
//! let config = ClientConfig::new("https://aegis.example.com")
//!     .with_credentials("alice", "secret")
//!     .with_organization("acme");
//! let client = Client::connect(config).await?;
//! let project = client.get_project_by_name("My project").await?;
//! let models = client.list_models(&project).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::errors::{AegisError, ApiError, Result};

const USER_AGENT: &str = concat!("aegis-client ", env!("CARGO_PKG_VERSION"));

pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    backend_url: Url,
    token: Mutex<Option<String>>,
}

impl Client {
    /// Builds the HTTP client and authenticates.
    ///
    /// The config must carry either a ready JWT or username and password;
    /// with the latter, a login round-trip is performed here.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AegisError::Config(format!("Invalid base_url: {e}")))?;
        let backend_base = match &config.backend_url {
            Some(backend) => Url::parse(backend)
                .map_err(|e| AegisError::Config(format!("Invalid backend_url: {e}")))?,
            None => base_url.clone(),
        };
        let backend_url = backend_base
            .join("/api/v1/")
            .map_err(|e| AegisError::Config(format!("Invalid backend_url: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(30));

        if let Some(cacert) = &config.cacert {
            let pem = std::fs::read(cacert).map_err(|e| {
                AegisError::Config(format!("Failed to read cacert {}: {e}", cacert.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| AegisError::Config(format!("Invalid cacert: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        if config.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(client_cert) = &config.client_cert {
            let pem = std::fs::read(client_cert).map_err(|e| {
                AegisError::Config(format!(
                    "Failed to read client_cert {}: {e}",
                    client_cert.display()
                ))
            })?;
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| AegisError::Config(format!("Invalid client_cert: {e}")))?;
            builder = builder.identity(identity);
        }

        let http = builder
            .build()
            .map_err(|e| AegisError::Config(format!("Failed to build HTTP client: {e}")))?;

        let client = Self {
            http,
            base_url,
            backend_url,
            token: Mutex::new(None),
        };

        match (&config.token, &config.username, &config.password) {
            (Some(token), _, _) => client.set_access_token(Some(token.clone())),
            (None, Some(username), Some(password)) => {
                client
                    .login(username, password, config.organization.as_deref())
                    .await?;
            }
            _ => {
                return Err(AegisError::Config(
                    "Supply either a JWT token or username and password".to_string(),
                ))
            }
        }

        Ok(client)
    }

    /// Frontend base URL, used to build report links.
    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn access_token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn set_access_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        data: Option<Value>,
        expected: StatusCode,
    ) -> Result<Value> {
        let url = self
            .backend_url
            .join(endpoint)
            .map_err(|e| AegisError::Config(format!("Invalid endpoint '{endpoint}': {e}")))?;
        let method_name = method_name(&method);
        debug!("{} {}", method_name, url);

        let mut request = self.http.request(method, url.clone());
        if let Some(token) = self.access_token() {
            request = request.header("Authorization", format!("JWT {token}"));
        }
        if let Some(data) = &data {
            request = request.json(data);
        }

        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();
        if status != expected {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                method: method_name,
                url: url.to_string(),
                message,
            }
            .into());
        }

        let body: Value = response.json().await.map_err(ApiError::from)?;
        body.get("response")
            .cloned()
            .ok_or_else(|| ApiError::Parse("missing 'response' envelope".to_string()).into())
    }

    pub(crate) async fn get(&self, endpoint: &str, data: Option<Value>) -> Result<Value> {
        self.request(Method::GET, endpoint, data, StatusCode::OK).await
    }

    pub(crate) async fn post(&self, endpoint: &str, data: Option<Value>) -> Result<Value> {
        self.request(Method::POST, endpoint, data, StatusCode::OK).await
    }

    pub(crate) async fn put(&self, endpoint: &str, data: Option<Value>) -> Result<Value> {
        self.request(Method::PUT, endpoint, data, StatusCode::OK).await
    }

    pub(crate) async fn delete(&self, endpoint: &str, data: Option<Value>) -> Result<Value> {
        self.request(Method::DELETE, endpoint, data, StatusCode::OK).await
    }

    /// Authenticates and stores the session token.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        organization: Option<&str>,
    ) -> Result<()> {
        let mut data = json!({"username": username, "password": password});
        if let Some(organization) = organization {
            data["organization"] = json!(organization);
        }
        let response = match self.post("auth/login", Some(data)).await {
            Err(AegisError::Api(ApiError::Status { status: 401, .. })) => {
                return Err(ApiError::Authentication("Invalid login".to_string()).into())
            }
            other => other?,
        };
        let token = response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("login response missing 'access_token'".to_string()))?;
        self.set_access_token(Some(token.to_string()));
        Ok(())
    }

    /// Invalidates the session server-side and drops the local token.
    pub async fn logout(&self) -> Result<()> {
        self.post("auth/logout", None).await?;
        self.set_access_token(None);
        Ok(())
    }

    /// Exchanges the current token for a fresh one.
    pub async fn refresh(&self) -> Result<()> {
        let response = self.post("auth/refresh", None).await?;
        let token = response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::Parse("refresh response missing 'access_token'".to_string())
            })?;
        self.set_access_token(Some(token.to_string()));
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("backend_url", &self.backend_url.as_str())
            .field("authenticated", &self.access_token().is_some())
            .finish()
    }
}

fn method_name(method: &Method) -> &'static str {
    if *method == Method::GET {
        "GET"
    } else if *method == Method::POST {
        "POST"
    } else if *method == Method::PUT {
        "PUT"
    } else if *method == Method::DELETE {
        "DELETE"
    } else {
        "OTHER"
    }
}
