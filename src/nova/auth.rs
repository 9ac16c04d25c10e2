//! Keystone v3 password authentication and compute endpoint discovery.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Credentials, NovaGatewayError, Session};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const COMPUTE_SERVICE: &str = "compute";
const PUBLIC_INTERFACE: &str = "public";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CatalogEntry {
    #[serde(rename = "type")]
    pub(super) service_type: String,
    #[serde(default)]
    pub(super) endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Endpoint {
    pub(super) interface: String,
    #[serde(default)]
    pub(super) region: Option<String>,
    #[serde(default)]
    pub(super) region_id: Option<String>,
    pub(super) url: String,
}

impl Endpoint {
    fn in_region(&self, region: &str) -> bool {
        self.region.as_deref() == Some(region) || self.region_id.as_deref() == Some(region)
    }
}

/// Builds the token URL from an auth URL with or without a `/v3` suffix.
pub(super) fn token_url(auth_url: &str) -> String {
    let base = auth_url.trim().trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}

/// Picks the public compute endpoint, honouring an optional region.
pub(super) fn select_compute_endpoint(
    catalog: &[CatalogEntry],
    region: Option<&str>,
) -> Option<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == COMPUTE_SERVICE)
        .flat_map(|entry| entry.endpoints.iter())
        .filter(|endpoint| endpoint.interface == PUBLIC_INTERFACE)
        .find(|endpoint| region.is_none_or(|name| endpoint.in_region(name)))
        .map(|endpoint| endpoint.url.trim_end_matches('/').to_owned())
}

pub(super) async fn authenticate(
    http: &reqwest::Client,
    credentials: &Credentials,
) -> Result<Session, NovaGatewayError> {
    let url = token_url(&credentials.auth_url);
    let body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": credentials.username,
                        "domain": { "name": credentials.domain },
                        "password": credentials.api_key,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": credentials.tenant,
                    "domain": { "name": credentials.domain },
                }
            }
        }
    });

    debug!(target: super::NOVA_TARGET, url = %url, user = %credentials.username, "requesting token");
    let response = http.post(&url).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(NovaGatewayError::Auth {
            status: status.as_u16(),
            message,
        });
    }

    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or(NovaGatewayError::MissingToken)?;

    let parsed: TokenResponse = response
        .json()
        .await
        .map_err(|err| NovaGatewayError::Decode {
            resource: String::from("token"),
            message: err.to_string(),
        })?;

    let compute_url = select_compute_endpoint(&parsed.token.catalog, credentials.region.as_deref())
        .ok_or_else(|| NovaGatewayError::MissingEndpoint {
            region: credentials.region.clone(),
        })?;
    debug!(target: super::NOVA_TARGET, compute_url = %compute_url, "compute endpoint selected");

    Ok(Session { token, compute_url })
}
