//! In-process TaskTracker stand-in.
//!
//! This module provides the storage side of the stub:
//! - A folder tree rooted at a fixed root folder
//! - Units (test cases) that reference folders by code or title
//! - Paged unit listings, globally and per folder subtree
//! - Merge-patch updates of unit fields
//!
//! # Example
//!
//! ```no_run
//! use serde_json::{json, Map};
//! use tasktracker_stub::tracker::{SqliteTrackerStore, TrackerStore, ROOT_FOLDER_CODE};
//!
//! let store = SqliteTrackerStore::in_memory().unwrap();
//!
//! let folder = store.create_folder("postgres datasource", Some(ROOT_FOLDER_CODE)).unwrap();
//!
//! let mut payload = Map::new();
//! payload.insert("folder".into(), json!(folder.title));
//! payload.insert("name".into(), json!("Query returns rows"));
//! let unit = store.create_unit(payload).unwrap();
//!
//! let units = store.list_units_in_folder("postgres datasource").unwrap();
//! assert_eq!(units[0].code, unit.code);
//! ```

pub mod codes;
pub mod models;
pub mod patch;
pub mod store;

pub use models::{
    FlatFolder, Folder, FolderNode, FolderRemoval, FolderScope, FolderUnits, FolderUpdate, Page,
    PageRequest, TestCase, Unit, UnitEntry, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ROOT_FOLDER_CODE,
    ROOT_FOLDER_TITLE, STUB_TIMESTAMP,
};
pub use store::{SqliteTrackerStore, TrackerStore};
