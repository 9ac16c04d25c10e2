//! OpenStack Compute (Nova) implementation of [`CloudServerGateway`].
//!
//! The gateway authenticates lazily against Keystone v3 on first use and
//! reuses the token and compute endpoint for its lifetime. Clones share the
//! session.

mod auth;
mod error;
mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::OpenStackConfig;
use crate::gateway::{CloudServerGateway, GatewayFuture, RebootMode};
use crate::server::ServerRecord;
use types::{ServerEnvelope, ServersEnvelope};

pub use error::NovaGatewayError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
pub(crate) const NOVA_TARGET: &str = "nova_machine::nova";

#[derive(Clone, Debug, Eq, PartialEq)]
struct Credentials {
    auth_url: String,
    username: String,
    api_key: String,
    tenant: String,
    domain: String,
    region: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Session {
    token: String,
    compute_url: String,
}

#[derive(Debug)]
struct NovaInner {
    http: reqwest::Client,
    credentials: Credentials,
    session: OnceCell<Session>,
}

/// Gateway that talks to the OpenStack Compute API.
#[derive(Clone, Debug)]
pub struct NovaGateway {
    inner: Arc<NovaInner>,
}

impl NovaGateway {
    /// Constructs a gateway from configuration. No request is sent until the
    /// first gateway call.
    ///
    /// # Errors
    ///
    /// Returns [`NovaGatewayError::Config`] when the configuration fails
    /// validation, or [`NovaGatewayError::Http`] when the HTTP client cannot
    /// be built.
    pub fn new(config: &OpenStackConfig) -> Result<Self, NovaGatewayError> {
        config.validate()?;
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            inner: Arc::new(NovaInner {
                http,
                credentials: Credentials {
                    auth_url: config.auth_url.clone(),
                    username: config.username.clone(),
                    api_key: config.api_key.clone(),
                    tenant: config.tenant.clone(),
                    domain: config.domain.clone(),
                    region: config.region.clone(),
                },
                session: OnceCell::new(),
            }),
        })
    }

    async fn session(&self) -> Result<&Session, NovaGatewayError> {
        self.inner
            .session
            .get_or_try_init(|| auth::authenticate(&self.inner.http, &self.inner.credentials))
            .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, NovaGatewayError> {
        let session = self.session().await?;
        let url = format!("{}{path}", session.compute_url);
        debug!(target: NOVA_TARGET, method = %method, url = %url, "compute request");

        let mut request = self
            .inner
            .http
            .request(method, &url)
            .header(AUTH_TOKEN_HEADER, &session.token);
        if let Some(payload) = body {
            request = request.json(&payload);
        }
        Ok(request.send().await?)
    }

    async fn expect_success(
        response: reqwest::Response,
        method: &Method,
    ) -> Result<reqwest::Response, NovaGatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(NovaGatewayError::Status {
            method: method.to_string(),
            url,
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T, NovaGatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|err| NovaGatewayError::Decode {
                resource: resource.to_owned(),
                message: err.to_string(),
            })
    }
}

impl CloudServerGateway for NovaGateway {
    type Error = NovaGatewayError;

    fn get_server<'a>(
        &'a self,
        id: &'a str,
    ) -> GatewayFuture<'a, Option<ServerRecord>, Self::Error> {
        Box::pin(async move {
            let response = self
                .send(Method::GET, &format!("/servers/{id}"), None)
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let found = Self::expect_success(response, &Method::GET).await?;
            let envelope: ServerEnvelope = Self::decode(found, "server").await?;
            Ok(Some(envelope.server.into()))
        })
    }

    fn list_servers(&self) -> GatewayFuture<'_, Vec<ServerRecord>, Self::Error> {
        Box::pin(async move {
            let response = self.send(Method::GET, "/servers/detail", None).await?;
            let listed = Self::expect_success(response, &Method::GET).await?;
            let envelope: ServersEnvelope = Self::decode(listed, "servers").await?;
            Ok(envelope.servers.into_iter().map(ServerRecord::from).collect())
        })
    }

    fn destroy_server<'a>(&'a self, id: &'a str) -> GatewayFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let response = self
                .send(Method::DELETE, &format!("/servers/{id}"), None)
                .await?;
            Self::expect_success(response, &Method::DELETE).await?;
            Ok(())
        })
    }

    fn reboot_server<'a>(
        &'a self,
        id: &'a str,
        mode: RebootMode,
    ) -> GatewayFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let body = json!({ "reboot": { "type": mode.as_str() } });
            let response = self
                .send(Method::POST, &format!("/servers/{id}/action"), Some(body))
                .await?;
            Self::expect_success(response, &Method::POST).await?;
            Ok(())
        })
    }
}
