//! HTTP client for a TaskTracker-compatible API.
//!
//! Test cases go through the flat `/test-cases` endpoints; folder hierarchy
//! and unit pages go through the TMS plugin endpoints.

use super::TrackerClient;
use crate::config::TrackerConfig;
use crate::error::{EntityKind, Error, Result};
use crate::tracker::{FolderNode, FolderUnits, PageRequest, TestCase, ROOT_FOLDER_CODE};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Prefix of the TMS plugin folder endpoints.
pub const TMS_FOLDER_PATH: &str = "/extension/plugin/v2/rest/api/swtr_tms_plugin/v1/folder";

/// Longest response body kept in an [`Error::Api`].
const MAX_ERROR_BODY: usize = 512;

/// What a 404 from a request means.
struct Lookup<'a> {
    kind: EntityKind,
    code: &'a str,
}

/// Client for a remote TaskTracker.
#[derive(Debug, Clone)]
pub struct HttpTrackerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTrackerClient {
    /// Create a client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, rb: RequestBuilder) -> RequestBuilder {
        let rb = rb.header(reqwest::header::ACCEPT, "application/json");
        match &self.api_key {
            Some(key) => rb.bearer_auth(key),
            None => rb,
        }
    }

    /// Send a request and return the raw body of a successful response.
    async fn send(&self, rb: RequestBuilder, lookup: Option<Lookup<'_>>) -> Result<String> {
        let resp = self.authorized(rb).send().await?;
        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "TaskTracker response");
        let body = resp.text().await?;

        if status.is_success() {
            return Ok(body);
        }
        Err(match (status, lookup) {
            (StatusCode::NOT_FOUND, Some(lookup)) => Error::not_found(lookup.kind, lookup.code),
            (StatusCode::UNPROCESSABLE_ENTITY, _) => Error::invalid(error_detail(&body)),
            _ => Error::Api { status: status.as_u16(), body: truncate(body) },
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        rb: RequestBuilder,
        lookup: Option<Lookup<'_>>,
    ) -> Result<T> {
        let body = self.send(rb, lookup).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// The `detail` member of an error body, or the body itself.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

/// Accept a bare list as well as `{"items": [...]}` and `{"test_cases": [...]}`.
fn test_case_list(data: Value) -> Result<Vec<TestCase>> {
    let items = match data {
        Value::Array(_) => data,
        Value::Object(mut map) => {
            map.remove("items").or_else(|| map.remove("test_cases")).unwrap_or(Value::Array(vec![]))
        }
        _ => Value::Array(vec![]),
    };
    Ok(serde_json::from_value(items)?)
}

#[async_trait]
impl TrackerClient for HttpTrackerClient {
    async fn get_test_cases(&self, folder: &str) -> Result<Vec<TestCase>> {
        let rb = self.client.get(self.url("/test-cases")).query(&[("folder", folder)]);
        test_case_list(self.send_json(rb, None).await?)
    }

    async fn create_test_case(
        &self,
        folder: &str,
        mut test_case: Map<String, Value>,
    ) -> Result<TestCase> {
        test_case.insert("folder".to_string(), Value::String(folder.to_string()));
        let rb = self.client.post(self.url("/test-cases")).json(&test_case);
        self.send_json(rb, None).await
    }

    async fn update_test_case(&self, id: &str, test_case: Map<String, Value>) -> Result<TestCase> {
        let rb = self.client.put(self.url(&format!("/test-cases/{id}"))).json(&test_case);
        self.send_json(rb, Some(Lookup { kind: EntityKind::TestCase, code: id })).await
    }

    async fn delete_test_case(&self, id: &str) -> Result<()> {
        let rb = self.client.delete(self.url(&format!("/test-cases/{id}")));
        self.send(rb, Some(Lookup { kind: EntityKind::TestCase, code: id })).await?;
        Ok(())
    }

    async fn get_root_folder_units(&self, page: PageRequest) -> Result<FolderUnits> {
        let body = json!({"unitFilters": {"page": {"page": page.page, "size": page.size}}});
        let rb = self.client.post(self.url(&format!("{TMS_FOLDER_PATH}/root/units"))).json(&body);
        self.send_json(rb, None).await
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<FolderNode> {
        let parent = parent.unwrap_or(ROOT_FOLDER_CODE);
        let body = json!({"name": name, "parentId": {"code": parent}});
        let rb = self.client.post(self.url(&format!("{TMS_FOLDER_PATH}/create"))).json(&body);
        self.send_json(rb, Some(Lookup { kind: EntityKind::Folder, code: parent })).await
    }
}
