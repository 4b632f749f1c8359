//! MCP server for TaskTracker test cases.
//!
//! Exposes the TaskTracker tools to agents through the Model Context Protocol.

// The rmcp `#[tool(aggr)]` macro requires ownership of input structs,
// making pass-by-value necessary for all tool handler functions.
#![allow(clippy::needless_pass_by_value)]

use crate::client::TrackerClient;
use crate::logging::ToolCallGuard;
use crate::tools::TrackerTools;
use crate::tracker::{PageRequest, DEFAULT_PAGE_SIZE};
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::Error as McpError;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Instructions for the MCP server, shown to agents using this server.
const INSTRUCTIONS: &str = r#"TaskTracker test case server. Use these tools to read, create, update and delete UI test cases for a Grafana-based monitoring platform, and to inspect the folder tree they live in.

## Generating Test Cases

When asked to generate tests from existing ones:

1. Identify the SOURCE folder (e.g. "postgres datasource") and the TARGET folder (e.g. "abyss datasource").
2. Call `get_test_cases` on the SOURCE folder.
3. For each source test case, or the subset the user named, write a new test case adapted to the TARGET: change datasource names, queries and labels, keep the structure and intent.
4. Call `create_test_case` on the TARGET folder with each new test case as a JSON object.

If only one folder is named, infer from context whether it is the source or the target. If that is unclear, ask.

## Test Case JSON

Keep the JSON structure consistent with the source test cases unless asked otherwise. Preserve steps, assertions and metadata; adapt names, datasource references and query text. `test_case_json` must be a JSON object. Updates merge into the stored test case, so send only the fields that change.

## Folders

Use `get_root_folder_units` to see the folder hierarchy and page through every test case. Use `create_folder` when the TARGET folder does not exist yet; folders are created under the root folder unless `parent_code` is given.
"#;

/// MCP server for TaskTracker test cases.
#[derive(Clone, Debug)]
pub struct TrackerServer {
    tools: TrackerTools,
}

impl TrackerServer {
    /// Create a server whose tools use the given client.
    #[must_use]
    pub fn new(client: Arc<dyn TrackerClient>) -> Self {
        Self { tools: TrackerTools::new(client) }
    }
}

// Tool input schemas

/// Input for listing test cases.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTestCasesInput {
    /// Folder name, e.g. "postgres datasource".
    pub folder: String,
}

/// Input for creating a test case.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTestCaseInput {
    /// Folder to create the test case in.
    pub folder: String,
    /// The test case as a JSON object.
    pub test_case_json: String,
}

/// Input for updating a test case.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTestCaseInput {
    /// Test case ID.
    pub test_case_id: String,
    /// JSON object with the fields to update.
    pub test_case_json: String,
}

/// Input for deleting a test case.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteTestCaseInput {
    /// Test case ID.
    pub test_case_id: String,
}

/// Input for paging through the root folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetRootFolderUnitsInput {
    /// Zero-based page number (default 0).
    #[serde(default)]
    pub page: usize,
    /// Page size (default 50).
    #[serde(default = "default_page_size")]
    #[schemars(range(min = 1, max = 1000))]
    pub size: usize,
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Input for creating a folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFolderInput {
    /// Folder title.
    pub name: String,
    /// Code of the parent folder (optional, defaults to the root folder).
    pub parent_code: Option<String>,
}

/// Wrap a tool's text output, logging the outcome.
fn respond(
    mut guard: ToolCallGuard,
    result: crate::error::Result<String>,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => {
            guard.mark_error();
            Err(McpError::internal_error(e.to_string(), None))
        }
    }
}

#[tool(tool_box)]
impl TrackerServer {
    /// List test cases in a folder.
    #[tool(description = "Get all test cases in a folder. Use it to inspect existing tests in a folder (e.g. 'postgres datasource') before generating similar ones elsewhere.")]
    async fn get_test_cases(
        &self,
        #[tool(aggr)] input: GetTestCasesInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("get_test_cases");
        respond(guard, self.tools.get_test_cases(&input.folder).await)
    }

    /// Create a test case.
    #[tool(description = "Create a new test case in the specified folder. test_case_json must be a JSON object representing the test case.")]
    async fn create_test_case(
        &self,
        #[tool(aggr)] input: CreateTestCaseInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("create_test_case");
        respond(guard, self.tools.create_test_case(&input.folder, &input.test_case_json).await)
    }

    /// Update a test case.
    #[tool(description = "Update an existing test case by its ID. test_case_json must be a JSON object with the fields to update.")]
    async fn update_test_case(
        &self,
        #[tool(aggr)] input: UpdateTestCaseInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("update_test_case");
        respond(
            guard,
            self.tools.update_test_case(&input.test_case_id, &input.test_case_json).await,
        )
    }

    /// Delete a test case.
    #[tool(description = "Delete a test case by its ID")]
    async fn delete_test_case(
        &self,
        #[tool(aggr)] input: DeleteTestCaseInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("delete_test_case");
        respond(guard, self.tools.delete_test_case(&input.test_case_id).await)
    }

    /// Page through the root folder.
    #[tool(description = "Get the root folder hierarchy and one page of all test case units (page is zero-based, size 1-1000)")]
    async fn get_root_folder_units(
        &self,
        #[tool(aggr)] input: GetRootFolderUnitsInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("get_root_folder_units");
        let page = PageRequest::new(input.page, input.size);
        respond(guard, self.tools.get_root_folder_units(page).await)
    }

    /// Create a folder.
    #[tool(description = "Create a folder under parent_code, or under the root folder when parent_code is omitted")]
    async fn create_folder(
        &self,
        #[tool(aggr)] input: CreateFolderInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("create_folder");
        respond(guard, self.tools.create_folder(&input.name, input.parent_code.as_deref()).await)
    }
}

#[tool(tool_box)]
impl rmcp::ServerHandler for TrackerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "tasktracker-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalClient;
    use rmcp::ServerHandler;
    use serde_json::Value;

    fn server() -> TrackerServer {
        TrackerServer::new(Arc::new(LocalClient::in_memory().unwrap()))
    }

    fn text(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_get_info() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, "tasktracker-mcp");
        assert!(info.instructions.unwrap().contains("get_test_cases"));
    }

    #[test]
    fn test_page_size_defaults() {
        let input: GetRootFolderUnitsInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.page, 0);
        assert_eq!(input.size, DEFAULT_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_create_and_list_through_tools() {
        let server = server();
        let created = server
            .create_test_case(CreateTestCaseInput {
                folder: "abyss datasource".into(),
                test_case_json: r#"{"name": "Add abyss datasource"}"#.into(),
            })
            .await
            .unwrap();
        let created: Value = serde_json::from_str(&text(&created)).unwrap();
        assert_eq!(created["folder"], "abyss datasource");

        let listed = server
            .get_test_cases(GetTestCasesInput { folder: "abyss datasource".into() })
            .await
            .unwrap();
        let listed: Value = serde_json::from_str(&text(&listed)).unwrap();
        assert_eq!(listed[0]["name"], "Add abyss datasource");
    }

    #[tokio::test]
    async fn test_recoverable_errors_are_text() {
        let server = server();
        let result = server
            .delete_test_case(DeleteTestCaseInput { test_case_id: "STUB-1".into() })
            .await
            .unwrap();
        assert_eq!(text(&result), "Test case not found: STUB-1");

        let result = server
            .update_test_case(UpdateTestCaseInput {
                test_case_id: "STUB-1".into(),
                test_case_json: "not json".into(),
            })
            .await
            .unwrap();
        assert!(text(&result).starts_with("Invalid JSON for test case:"));
    }

    #[tokio::test]
    async fn test_create_folder_and_root_units() {
        let server = server();
        server
            .create_folder(CreateFolderInput { name: "abyss datasource".into(), parent_code: None })
            .await
            .unwrap();
        let result = server
            .get_root_folder_units(GetRootFolderUnitsInput { page: 0, size: 10 })
            .await
            .unwrap();
        let output: Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(output["folderHierarchy"]["children"][0]["title"], "abyss datasource");
        assert_eq!(output["units"]["pageSize"], 10);
    }
}
