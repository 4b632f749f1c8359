//! Record and envelope types for the tracker stub.
//!
//! A unit is the one canonical test-case record. It is rendered two ways:
//! the TMS view ([`Unit::to_dto`]) with template defaults filled in, and the
//! flat test-case view ([`Unit::to_test_case`]) with `id` and `folder` on top.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Code of the folder created when a store is initialized.
pub const ROOT_FOLDER_CODE: &str = "TMS_test_case";

/// Title of the root folder.
pub const ROOT_FOLDER_TITLE: &str = "Все тест-кейсы";

/// Timestamp stamped on every stub unit.
pub const STUB_TIMESTAMP: &str = "2025-01-01T00:00:00Z";

/// Page size used when a request does not name one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Unit keys that carry a template default.
pub const TEMPLATE_KEYS: [&str; 5] = ["summary", "description", "suit", "space", "attributes"];

/// Unit keys owned by the store rather than the caller.
pub const METADATA_KEYS: [&str; 5] = ["code", "createdAt", "updatedAt", "isFavorite", "folder"];

/// Whether `key` is a template or metadata key of a unit.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    TEMPLATE_KEYS.contains(&key) || METADATA_KEYS.contains(&key)
}

/// Default `suit` for units created without one.
#[must_use]
pub fn default_suit() -> Value {
    json!({"code": "test_case", "name": "Тест-кейс", "icon": "memo_pencil"})
}

/// `suit` used when a unit is created through a suit-specific endpoint.
#[must_use]
pub fn suit_for(code: &str) -> Value {
    json!({"code": code, "name": code, "icon": "memo_pencil"})
}

/// Default `space` for units created without one.
#[must_use]
pub fn default_space() -> Value {
    json!({"code": "TMS", "name": "Простраство TMS"})
}

/// A folder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Unique folder code.
    pub code: String,
    /// Display title.
    pub title: String,
    /// Code of the parent folder, `None` for top-level folders.
    pub parent: Option<String>,
    /// Child folder codes in insertion order.
    pub children: Vec<String>,
}

impl Folder {
    /// Whether this is the store's root folder.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.code == ROOT_FOLDER_CODE
    }

    /// Whether a unit's folder reference points at this folder.
    ///
    /// References are free-form labels, so both the code and the title match.
    #[must_use]
    pub fn matches(&self, reference: &str) -> bool {
        self.code == reference || self.title == reference
    }

    /// The flat API representation of this folder.
    #[must_use]
    pub fn to_flat(&self) -> FlatFolder {
        FlatFolder {
            id: self.code.clone(),
            name: self.title.clone(),
            parent_id: self.parent.clone(),
        }
    }
}

/// Folder as exposed by the flat `/folders` API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFolder {
    /// Folder code.
    pub id: String,
    /// Folder title.
    pub name: String,
    /// Parent folder code.
    pub parent_id: Option<String>,
}

/// A `{"code": ...}` reference as used by the TMS API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRef {
    /// The referenced code.
    pub code: String,
}

/// A node of the nested folder hierarchy (TMS `FolderDto`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder identity.
    pub id: CodeRef,
    /// Same as the code.
    pub key: String,
    /// Display title.
    pub title: String,
    /// Child nodes in order.
    #[serde(default)]
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Leaf node for a code the store does not know.
    #[must_use]
    pub fn placeholder(code: &str) -> Self {
        Self {
            id: CodeRef { code: code.to_string() },
            key: code.to_string(),
            title: code.to_string(),
            children: Vec::new(),
        }
    }

    /// The code of this node.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.id.code
    }

    /// Depth-first search for a node with the given code.
    #[must_use]
    pub fn find(&self, code: &str) -> Option<&Self> {
        if self.code() == code {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(code))
    }
}

/// Which folders a listing returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderScope {
    /// Every folder.
    All,
    /// Folders without a parent.
    Roots,
    /// Direct children of the given folder.
    ChildrenOf(String),
}

impl FolderScope {
    /// Interpret the flat API's `parent_id` query parameter.
    ///
    /// Absent means all folders, empty means top-level folders, anything else
    /// means the children of that folder.
    #[must_use]
    pub fn from_parent_query(parent_id: Option<&str>) -> Self {
        match parent_id {
            None => Self::All,
            Some("") => Self::Roots,
            Some(code) => Self::ChildrenOf(code.to_string()),
        }
    }
}

/// Fields that can be updated on a folder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FolderUpdate {
    /// New title (if Some).
    pub name: Option<String>,
    /// New parent (if Some). `Some(None)` makes the folder top-level.
    pub parent: Option<Option<String>>,
}

impl FolderUpdate {
    /// Check if any fields are set for update.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent.is_none()
    }
}

/// What a folder deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FolderRemoval {
    /// Folders removed, including the target.
    pub folders: usize,
    /// Units removed because they referenced a removed folder.
    pub units: usize,
}

/// A unit (test case) record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Unique unit code (`STUB-<n>`).
    pub code: String,
    /// Folder reference (code or title), if any.
    pub folder: Option<String>,
    /// Caller-supplied members, exactly as given.
    pub fields: Map<String, Value>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Favorite flag.
    pub is_favorite: bool,
}

impl Unit {
    /// The TMS representation: template defaults overlaid with caller fields.
    #[must_use]
    pub fn to_dto(&self) -> Value {
        let mut dto = Map::new();
        dto.insert("summary".into(), json!("Stub test case"));
        dto.insert("description".into(), json!(""));
        dto.insert("suit".into(), default_suit());
        dto.insert("space".into(), default_space());
        dto.insert("attributes".into(), json!([]));
        for (key, value) in &self.fields {
            dto.insert(key.clone(), value.clone());
        }
        dto.insert("code".into(), json!(self.code));
        dto.insert("createdAt".into(), json!(self.created_at));
        dto.insert("updatedAt".into(), json!(self.updated_at));
        dto.insert("isFavorite".into(), json!(self.is_favorite));
        if let Some(folder) = &self.folder {
            dto.insert("folder".into(), json!(folder));
        }
        Value::Object(dto)
    }

    /// The flat test-case representation.
    #[must_use]
    pub fn to_test_case(&self) -> TestCase {
        let mut fields = self.fields.clone();
        fields.remove("id");
        fields.remove("folder");
        TestCase { id: self.code.clone(), folder: self.folder.clone(), fields }
    }

    /// Caller fields that are not template keys.
    #[must_use]
    pub fn custom_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// A test case as exposed by the flat API and the agent tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Unit code.
    pub id: String,
    /// Folder reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Every other member.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A page request (zero-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page number.
    #[serde(default)]
    pub page: usize,
    /// Page size.
    #[serde(default = "default_page_size")]
    pub size: usize,
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// Create a page request.
    #[must_use]
    pub const fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// Index of the first element of this page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the size is outside
    /// `1..=MAX_PAGE_SIZE` or the offset overflows.
    pub fn offset(&self) -> Result<usize> {
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(Error::invalid(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.size
            )));
        }
        self.page
            .checked_mul(self.size)
            .ok_or_else(|| Error::invalid(format!("page {} is out of range", self.page)))
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Elements of this page.
    pub content: Vec<T>,
    /// Requested page size.
    pub page_size: usize,
    /// Requested page number.
    pub page_number: usize,
    /// Whether elements exist after this page.
    pub has_next: bool,
    /// Number of elements across all pages.
    pub total_elements: usize,
}

impl<T> Page<T> {
    /// Convert every element, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_size: self.page_size,
            page_number: self.page_number,
            has_next: self.has_next,
            total_elements: self.total_elements,
        }
    }
}

/// One entry of a TMS unit listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEntry {
    /// The unit in its TMS representation.
    pub unit: Value,
    /// Always empty in the stub.
    #[serde(default)]
    pub attributes: Vec<Value>,
    /// Always empty in the stub.
    #[serde(default)]
    pub calculated_attributes: Vec<Value>,
}

impl From<Unit> for UnitEntry {
    fn from(unit: Unit) -> Self {
        Self { unit: unit.to_dto(), attributes: Vec::new(), calculated_attributes: Vec::new() }
    }
}

/// A folder hierarchy together with a page of units (TMS `FolderUnitsDto`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUnits {
    /// The folder tree the listing was taken from.
    pub folder_hierarchy: FolderNode,
    /// The page of units.
    pub units: Page<UnitEntry>,
}
