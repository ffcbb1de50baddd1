//! ArmClient — `reqwest`-backed implementation of [`ManagementApi`].
//!
//! Every request carries a bearer token from [`TokenProvider`]. Non-2xx
//! responses are decoded from the ARM error envelope into [`ArmError::Api`].
//! Long-running operations are tracked the way ARM reports them:
//!
//! - an `Azure-AsyncOperation` header (on 200, 201 or 202) names a monitor
//!   polled until its `status` is `Succeeded`, `Failed` or `Canceled`;
//! - otherwise a `202 Accepted` with `Location` is polled until it stops
//!   answering 202;
//! - a PUT answered without either header but with a non-terminal
//!   `properties.provisioningState` re-reads the resource until it settles.
//!
//! A PUT that went through an operation monitor ends with a GET of the
//! resource. List calls follow `nextLink` and refuse to fetch a page twice.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use azsite_core::{Credentials, ResourceGroup, ServerFarm, Site};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::ManagementApi;
use crate::error::{ArmError, ArmResult};
use crate::token::TokenProvider;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// `api-version` for `Microsoft.Resources` calls.
pub const RESOURCES_API_VERSION: &str = "2021-04-01";

/// `api-version` for `Microsoft.Web` calls.
pub const WEB_API_VERSION: &str = "2022-03-01";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_POLLS: u32 = 360;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// One page of a list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Body of an `Azure-AsyncOperation` monitor.
#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorBody>,
}

impl OperationStatus {
    fn into_result(self) -> ArmResult<()> {
        if self.status.eq_ignore_ascii_case(SUCCEEDED) {
            return Ok(());
        }
        let detail = self
            .error
            .map(|e| format!(": {}: {}", e.code, e.message))
            .unwrap_or_default();
        Err(ArmError::Operation(format!("operation {}{detail}", self.status)))
    }
}

/// Where an accepted write reports its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    /// `Azure-AsyncOperation`: a monitor whose body carries `status`.
    AsyncOperation(String),
    /// `Location` on a 202: answers 202 until the work is done.
    Location(String),
}

impl Operation {
    /// `Azure-AsyncOperation` wins over `Location`; the latter only counts on 202.
    fn from_response(response: &Response) -> Option<Self> {
        let headers = response.headers();
        if let Some(url) = header_str(headers, AZURE_ASYNC_OPERATION) {
            return Some(Self::AsyncOperation(url.to_string()));
        }
        if response.status() == StatusCode::ACCEPTED {
            return header_str(headers, LOCATION.as_str()).map(|url| Self::Location(url.to_string()));
        }
        None
    }

    fn url(&self) -> &str {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) => url,
        }
    }
}

const SUCCEEDED: &str = "Succeeded";

/// `Succeeded`, `Failed` and `Canceled` end an operation; anything else is
/// still running.
fn is_terminal(state: &str) -> bool {
    ["Succeeded", "Failed", "Canceled"]
        .iter()
        .any(|terminal| state.eq_ignore_ascii_case(terminal))
}

fn provisioning_state(resource: &Value) -> Option<&str> {
    resource.pointer("/properties/provisioningState")?.as_str()
}

/// Azure Resource Manager client bound to one subscription.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: Client,
    endpoint: String,
    subscription_id: String,
    tokens: Arc<TokenProvider>,
    poll_interval: Duration,
    max_polls: u32,
}

/// Builder for [`ArmClient`]; endpoints default to the public Azure cloud.
#[derive(Debug)]
pub struct ArmClientBuilder {
    credentials: Credentials,
    endpoint: String,
    authority: Option<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl ArmClientBuilder {
    /// ARM endpoint, e.g. `https://management.azure.com`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Entra ID authority host, e.g. `https://login.microsoftonline.com`.
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Delay between operation polls when ARM sends no `Retry-After`.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn build(self) -> ArmResult<ArmClient> {
        let http = Client::builder()
            .user_agent(concat!("azsite/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_err!(Transport))?;

        let mut tokens = TokenProvider::new(http.clone(), &self.credentials);
        if let Some(authority) = self.authority {
            tokens = tokens.with_authority(authority);
        }

        Ok(ArmClient {
            http,
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            subscription_id: self.credentials.subscription_id,
            tokens: Arc::new(tokens),
            poll_interval: self.poll_interval,
            max_polls: self.max_polls,
        })
    }
}

impl ArmClient {
    pub fn builder(credentials: Credentials) -> ArmClientBuilder {
        ArmClientBuilder {
            credentials,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            authority: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Client for the public Azure cloud.
    pub fn new(credentials: Credentials) -> ArmResult<Self> {
        Self::builder(credentials).build()
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    // ── URLs ──────────────────────────────────────────────────────

    fn group_url(&self, group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{group}?api-version={RESOURCES_API_VERSION}",
            self.endpoint, self.subscription_id
        )
    }

    /// `Microsoft.Web` collection (`name = None`) or item URL.
    fn web_url(&self, group: &str, kind: &str, name: Option<&str>) -> String {
        let item = name.map(|n| format!("/{n}")).unwrap_or_default();
        format!(
            "{}/subscriptions/{}/resourceGroups/{group}/providers/Microsoft.Web/{kind}{item}?api-version={WEB_API_VERSION}",
            self.endpoint, self.subscription_id
        )
    }

    // ── Transport ─────────────────────────────────────────────────

    /// Authenticate and send a request, turning non-2xx answers into errors.
    async fn execute(&self, request: RequestBuilder) -> ArmResult<Response> {
        let token = self.tokens.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_err!(Transport))?;

        let status = response.status();
        debug!(%status, url = %response.url(), "arm response");
        if status.is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    async fn put<B, T>(&self, url: &str, body: &B) -> ArmResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.execute(self.http.put(url).json(body)).await?;
        if let Some(operation) = Operation::from_response(&response) {
            self.wait_for_operation(operation, retry_after(response.headers()))
                .await?;
            return self.get(url).await;
        }

        let mut value: Value = decode(response).await?;
        if provisioning_state(&value).is_some_and(|state| !is_terminal(state)) {
            value = self.wait_for_provisioning(url).await?;
        }
        serde_json::from_value(value).map_err(map_err!(Decode))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ArmResult<T> {
        let response = self.execute(self.http.get(url)).await?;
        decode(response).await
    }

    async fn delete(&self, url: &str) -> ArmResult<()> {
        let response = self.execute(self.http.delete(url)).await?;
        if let Some(operation) = Operation::from_response(&response) {
            self.wait_for_operation(operation, retry_after(response.headers()))
                .await?;
        }
        Ok(())
    }

    // ── Long-running operations ───────────────────────────────────

    /// Poll an operation monitor until it reports a terminal state.
    async fn wait_for_operation(
        &self,
        operation: Operation,
        first_delay: Option<Duration>,
    ) -> ArmResult<()> {
        let mut delay = first_delay.unwrap_or(self.poll_interval);

        for attempt in 1..=self.max_polls {
            tokio::time::sleep(delay).await;
            let response = self.execute(self.http.get(operation.url())).await?;
            delay = retry_after(response.headers()).unwrap_or(self.poll_interval);

            match &operation {
                Operation::AsyncOperation(url) => {
                    let status: OperationStatus = decode(response).await?;
                    if is_terminal(&status.status) {
                        debug!(attempt, %url, status = %status.status, "operation finished");
                        return status.into_result();
                    }
                }
                Operation::Location(url) => {
                    if response.status() != StatusCode::ACCEPTED {
                        debug!(attempt, %url, "operation completed");
                        return Ok(());
                    }
                }
            }
        }

        Err(ArmError::Operation(format!(
            "{} still pending after {} polls",
            operation.url(),
            self.max_polls
        )))
    }

    /// Re-read a resource created without an operation monitor until its
    /// `provisioningState` settles.
    async fn wait_for_provisioning(&self, url: &str) -> ArmResult<Value> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let value: Value = self.get(url).await?;
            let state = provisioning_state(&value).map(str::to_string);
            match state {
                Some(state) if !is_terminal(&state) => continue,
                Some(state) if !state.eq_ignore_ascii_case(SUCCEEDED) => {
                    return Err(ArmError::Operation(format!("{url} provisioning {state}")));
                }
                _ => {
                    debug!(attempt, %url, "provisioning settled");
                    return Ok(value);
                }
            }
        }

        Err(ArmError::Operation(format!(
            "{url} still provisioning after {} polls",
            self.max_polls
        )))
    }
}

impl ManagementApi for ArmClient {
    async fn create_or_update_resource_group(
        &self,
        group: &str,
        params: &ResourceGroup,
    ) -> ArmResult<ResourceGroup> {
        self.put(&self.group_url(group), params).await
    }

    async fn delete_resource_group(&self, group: &str) -> ArmResult<()> {
        self.delete(&self.group_url(group)).await
    }

    async fn create_or_update_server_farm(
        &self,
        group: &str,
        name: &str,
        params: &ServerFarm,
    ) -> ArmResult<ServerFarm> {
        self.put(&self.web_url(group, "serverfarms", Some(name)), params)
            .await
    }

    async fn create_or_update_site(
        &self,
        group: &str,
        name: &str,
        params: &Site,
    ) -> ArmResult<Site> {
        self.put(&self.web_url(group, "sites", Some(name)), params).await
    }

    async fn list_sites(&self, group: &str) -> ArmResult<Vec<Site>> {
        let mut sites = Vec::new();
        let mut fetched = HashSet::new();
        let mut next = Some(self.web_url(group, "sites", None));
        while let Some(url) = next {
            if !fetched.insert(url.clone()) {
                return Err(ArmError::Paging(format!("nextLink {url} was already fetched")));
            }
            let page: Page<Site> = self.get(&url).await?;
            sites.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }
        Ok(sites)
    }

    async fn get_site(&self, group: &str, name: &str) -> ArmResult<Site> {
        self.get(&self.web_url(group, "sites", Some(name))).await
    }

    async fn delete_site(&self, group: &str, name: &str) -> ArmResult<()> {
        self.delete(&self.web_url(group, "sites", Some(name))).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ArmResult<T> {
    response.json().await.map_err(map_err!(Decode))
}

async fn api_error(response: Response) -> ArmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(%status, "arm request rejected");

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => ArmError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ArmError::Api {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: body,
        },
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, RETRY_AFTER.as_str())?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn client() -> ArmClient {
        let credentials = Credentials {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            subscription_id: "sub".to_string(),
        };
        ArmClient::builder(credentials)
            .endpoint("https://arm.example/")
            .build()
            .unwrap()
    }

    #[test]
    fn test_group_url() {
        assert_eq!(
            client().group_url("g"),
            "https://arm.example/subscriptions/sub/resourcegroups/g?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_web_urls() {
        let client = client();
        assert_eq!(
            client.web_url("g", "sites", None),
            "https://arm.example/subscriptions/sub/resourceGroups/g/providers/Microsoft.Web/sites?api-version=2022-03-01"
        );
        assert_eq!(
            client.web_url("g", "serverfarms", Some("plan")),
            "https://arm.example/subscriptions/sub/resourceGroups/g/providers/Microsoft.Web/serverfarms/plan?api-version=2022-03-01"
        );
    }

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("15"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(15)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_page_without_next_link() {
        let page: Page<Site> = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal("Succeeded"));
        assert!(is_terminal("failed"));
        assert!(is_terminal("Canceled"));
        assert!(!is_terminal("InProgress"));
        assert!(!is_terminal("Creating"));
    }

    #[test]
    fn test_failed_operation_status_keeps_error_detail() {
        let status: OperationStatus = serde_json::from_str(
            r#"{"status": "Failed", "error": {"code": "Conflict", "message": "name taken"}}"#,
        )
        .unwrap();
        let err = status.into_result().unwrap_err();
        assert!(matches!(err, ArmError::Operation(_)));
        assert!(err.to_string().contains("Failed: Conflict: name taken"));
    }

    #[test]
    fn test_provisioning_state_lookup() {
        let value = serde_json::json!({ "properties": { "provisioningState": "Creating" } });
        assert_eq!(provisioning_state(&value), Some("Creating"));
        assert_eq!(provisioning_state(&serde_json::json!({ "name": "x" })), None);
    }
}
