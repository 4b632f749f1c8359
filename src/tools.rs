//! Agent-facing tool adapters.
//!
//! Each tool forwards to a [`TrackerClient`] and renders the result as a
//! pretty-printed JSON string. Mistakes an agent can fix by retrying
//! (malformed JSON, unknown ids, bad page arguments) come back as plain
//! strings; only transport and internal failures are errors.

use crate::client::TrackerClient;
use crate::error::{Error, Result};
use crate::tracker::PageRequest;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The TaskTracker tools with their client injected.
#[derive(Clone)]
pub struct TrackerTools {
    client: Arc<dyn TrackerClient>,
}

impl std::fmt::Debug for TrackerTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerTools").finish_non_exhaustive()
    }
}

/// Parse an agent-supplied test case, or explain what is wrong with it.
fn parse_test_case(test_case_json: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(test_case_json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("test_case_json must be a JSON object.".to_string()),
        Err(e) => Err(format!("Invalid JSON for test case: {e}")),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Turn recoverable failures into a message for the agent.
fn recover(err: Error) -> Result<String> {
    if err.is_not_found() || matches!(err, Error::InvalidInput(_)) {
        Ok(err.to_string())
    } else {
        Err(err)
    }
}

impl TrackerTools {
    /// Create the tools over a client.
    #[must_use]
    pub fn new(client: Arc<dyn TrackerClient>) -> Self {
        Self { client }
    }

    /// Get all test cases in a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the TaskTracker cannot be reached.
    pub async fn get_test_cases(&self, folder: &str) -> Result<String> {
        match self.client.get_test_cases(folder).await {
            Ok(cases) => render(&cases),
            Err(err) => recover(err),
        }
    }

    /// Create a test case in `folder`. The `folder` argument takes
    /// precedence over a `folder` member in the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the TaskTracker cannot be reached.
    pub async fn create_test_case(&self, folder: &str, test_case_json: &str) -> Result<String> {
        let payload = match parse_test_case(test_case_json) {
            Ok(payload) => payload,
            Err(message) => return Ok(message),
        };
        match self.client.create_test_case(folder, payload).await {
            Ok(created) => render(&created),
            Err(err) => recover(err),
        }
    }

    /// Merge-patch a test case by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the TaskTracker cannot be reached.
    pub async fn update_test_case(&self, test_case_id: &str, test_case_json: &str) -> Result<String> {
        let payload = match parse_test_case(test_case_json) {
            Ok(payload) => payload,
            Err(message) => return Ok(message),
        };
        match self.client.update_test_case(test_case_id, payload).await {
            Ok(updated) => render(&updated),
            Err(err) => recover(err),
        }
    }

    /// Delete a test case by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the TaskTracker cannot be reached.
    pub async fn delete_test_case(&self, test_case_id: &str) -> Result<String> {
        match self.client.delete_test_case(test_case_id).await {
            Ok(()) => Ok(format!("Test case {test_case_id} deleted successfully.")),
            Err(err) => recover(err),
        }
    }

    /// The root folder hierarchy and one page of units.
    ///
    /// # Errors
    ///
    /// Returns an error if the TaskTracker cannot be reached.
    pub async fn get_root_folder_units(&self, page: PageRequest) -> Result<String> {
        if let Err(err) = page.offset() {
            return recover(err);
        }
        match self.client.get_root_folder_units(page).await {
            Ok(units) => render(&units),
            Err(err) => recover(err),
        }
    }

    /// Create a folder under `parent_code`, or under the root folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the TaskTracker cannot be reached.
    pub async fn create_folder(&self, name: &str, parent_code: Option<&str>) -> Result<String> {
        match self.client.create_folder(name, parent_code).await {
            Ok(node) => render(&node),
            Err(err) => recover(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalClient;
    use crate::tracker::{TrackerStore, ROOT_FOLDER_CODE};
    use serde_json::json;

    fn tools() -> (TrackerTools, LocalClient) {
        let client = LocalClient::in_memory().unwrap();
        (TrackerTools::new(Arc::new(client.clone())), client)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (tools, _) = tools();
        let created = tools
            .create_test_case(
                "postgres datasource",
                r#"{"name": "Explore query", "steps": ["open explore", "run query"]}"#,
            )
            .await
            .unwrap();
        let created: Value = serde_json::from_str(&created).unwrap();
        assert_eq!(created["folder"], "postgres datasource");
        assert_eq!(created["name"], "Explore query");

        let listed = tools.get_test_cases("postgres datasource").await.unwrap();
        let listed: Value = serde_json::from_str(&listed).unwrap();
        assert_eq!(listed, json!([created]));
    }

    #[tokio::test]
    async fn test_output_is_pretty_json() {
        let (tools, _) = tools();
        let created = tools.create_test_case("f", r#"{"name": "x"}"#).await.unwrap();
        assert!(created.contains("\n  \"id\""));
    }

    #[tokio::test]
    async fn test_invalid_json_leaves_store_untouched() {
        let (tools, client) = tools();
        let message = tools.create_test_case("f", "not json").await.unwrap();
        assert!(message.starts_with("Invalid JSON for test case:"));
        let page = client.store().list_units(PageRequest::default()).unwrap();
        assert_eq!(page.total_elements, 0);
    }

    #[tokio::test]
    async fn test_non_object_payload() {
        let (tools, _) = tools();
        let message = tools.create_test_case("f", "[1, 2]").await.unwrap();
        assert_eq!(message, "test_case_json must be a JSON object.");
        let message = tools.update_test_case("STUB-1", "\"text\"").await.unwrap();
        assert_eq!(message, "test_case_json must be a JSON object.");
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (tools, _) = tools();
        tools.create_test_case("f", r#"{"name": "Original", "steps": ["a"]}"#).await.unwrap();
        let updated = tools.update_test_case("STUB-1", r#"{"name": "Updated"}"#).await.unwrap();
        let updated: Value = serde_json::from_str(&updated).unwrap();
        assert_eq!(updated["name"], "Updated");
        assert_eq!(updated["steps"], json!(["a"]));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let (tools, _) = tools();
        let message = tools.update_test_case("STUB-9", "{}").await.unwrap();
        assert_eq!(message, "Test case not found: STUB-9");
    }

    #[tokio::test]
    async fn test_delete() {
        let (tools, _) = tools();
        tools.create_test_case("f", "{}").await.unwrap();
        let message = tools.delete_test_case("STUB-1").await.unwrap();
        assert_eq!(message, "Test case STUB-1 deleted successfully.");
        let message = tools.delete_test_case("STUB-1").await.unwrap();
        assert_eq!(message, "Test case not found: STUB-1");
    }

    #[tokio::test]
    async fn test_root_folder_units() {
        let (tools, _) = tools();
        tools.create_test_case("f", r#"{"name": "one"}"#).await.unwrap();
        let output = tools.get_root_folder_units(PageRequest::default()).await.unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(output["folderHierarchy"]["key"], ROOT_FOLDER_CODE);
        assert_eq!(output["units"]["totalElements"], 1);
        assert_eq!(output["units"]["content"][0]["unit"]["name"], "one");
        assert_eq!(output["units"]["content"][0]["calculatedAttributes"], json!([]));
    }

    #[tokio::test]
    async fn test_root_folder_units_bad_page_size() {
        let (tools, _) = tools();
        let message = tools.get_root_folder_units(PageRequest::new(0, 0)).await.unwrap();
        assert!(message.contains("page size must be between 1 and 1000"));
    }

    #[tokio::test]
    async fn test_create_folder() {
        let (tools, client) = tools();
        let output = tools.create_folder("abyss datasource", None).await.unwrap();
        let node: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(node["title"], "abyss datasource");
        let code = node["key"].as_str().unwrap();
        assert_eq!(
            client.store().get_folder(code).unwrap().parent.as_deref(),
            Some(ROOT_FOLDER_CODE)
        );

        let message = tools.create_folder("orphan", Some("missing")).await.unwrap();
        assert_eq!(message, "Folder not found: missing");
    }
}
