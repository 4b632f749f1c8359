//! Clients the agent tools talk to.
//!
//! [`TrackerClient`] is the seam between the tools and a TaskTracker:
//! [`LocalClient`] serves it from an in-process store and
//! [`HttpTrackerClient`] forwards it to a TaskTracker-compatible HTTP API.

pub mod http;

pub use http::HttpTrackerClient;

use crate::error::{Error, Result};
use crate::tracker::{
    FolderNode, FolderUnits, PageRequest, SqliteTrackerStore, TestCase, TrackerStore, UnitEntry,
    ROOT_FOLDER_CODE,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// TaskTracker operations available to the agent tools.
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// All test cases whose folder reference is `folder`.
    async fn get_test_cases(&self, folder: &str) -> Result<Vec<TestCase>>;

    /// Create a test case in `folder`.
    async fn create_test_case(&self, folder: &str, test_case: Map<String, Value>) -> Result<TestCase>;

    /// Merge-patch an existing test case.
    async fn update_test_case(&self, id: &str, test_case: Map<String, Value>) -> Result<TestCase>;

    /// Delete a test case.
    async fn delete_test_case(&self, id: &str) -> Result<()>;

    /// The root folder hierarchy and one page of all units.
    async fn get_root_folder_units(&self, page: PageRequest) -> Result<FolderUnits>;

    /// Create a folder under `parent`, or under the root folder when `None`.
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<FolderNode>;
}

/// Client backed by an in-process store.
#[derive(Debug, Clone)]
pub struct LocalClient {
    store: Arc<SqliteTrackerStore>,
}

impl LocalClient {
    /// Create a client over a shared store.
    #[must_use]
    pub const fn new(store: Arc<SqliteTrackerStore>) -> Self {
        Self { store }
    }

    /// Create a client over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteTrackerStore::in_memory()?)))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<SqliteTrackerStore> {
        &self.store
    }
}

#[async_trait]
impl TrackerClient for LocalClient {
    async fn get_test_cases(&self, folder: &str) -> Result<Vec<TestCase>> {
        let units = self.store.list_units_in_folder(folder)?;
        Ok(units.iter().map(crate::tracker::Unit::to_test_case).collect())
    }

    async fn create_test_case(
        &self,
        folder: &str,
        mut test_case: Map<String, Value>,
    ) -> Result<TestCase> {
        test_case.insert("folder".to_string(), Value::String(folder.to_string()));
        Ok(self.store.create_unit(test_case)?.to_test_case())
    }

    async fn update_test_case(&self, id: &str, test_case: Map<String, Value>) -> Result<TestCase> {
        let unit = self.store.update_unit(id, test_case).map_err(Error::for_test_case)?;
        Ok(unit.to_test_case())
    }

    async fn delete_test_case(&self, id: &str) -> Result<()> {
        self.store.delete_unit(id).map_err(Error::for_test_case)
    }

    async fn get_root_folder_units(&self, page: PageRequest) -> Result<FolderUnits> {
        let units = self.store.list_units(page)?;
        Ok(FolderUnits {
            folder_hierarchy: self.store.get_folder_tree(ROOT_FOLDER_CODE)?,
            units: units.map(UnitEntry::from),
        })
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<FolderNode> {
        let folder = self.store.create_folder(name, Some(parent.unwrap_or(ROOT_FOLDER_CODE)))?;
        self.store.get_folder_tree(&folder.code)
    }
}
