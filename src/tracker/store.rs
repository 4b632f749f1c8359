//! Tracker store trait and `SQLite` implementation.

use crate::error::{EntityKind, Error, Result};
use crate::tracker::codes::{folder_code, unit_code};
use crate::tracker::models::{
    Folder, FolderNode, FolderRemoval, FolderScope, FolderUpdate, Page, PageRequest, Unit,
    CodeRef, ROOT_FOLDER_CODE, ROOT_FOLDER_TITLE, STUB_TIMESTAMP,
};
use crate::tracker::patch::{merge_fields, UnitDraft, UnitPatch};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Trait for tracker storage operations.
///
/// All methods return a `Result`; lookups of unknown codes fail with
/// [`Error::NotFound`].
#[allow(clippy::missing_errors_doc)]
pub trait TrackerStore {
    // Folders
    /// Create a folder under `parent`, or a top-level folder when `None`.
    fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<Folder>;

    /// Get a folder by code.
    fn get_folder(&self, code: &str) -> Result<Folder>;

    /// Nested view of a folder and its descendants.
    ///
    /// Unknown codes produce a placeholder leaf instead of an error.
    fn get_folder_tree(&self, code: &str) -> Result<FolderNode>;

    /// List folders in the given scope.
    fn list_folders(&self, scope: &FolderScope) -> Result<Vec<Folder>>;

    /// Rename and/or move a folder.
    fn update_folder(&self, code: &str, update: FolderUpdate) -> Result<Folder>;

    /// Delete a folder, its subtree, and the units referencing them.
    ///
    /// A unit referencing a title is kept while a folder outside the
    /// subtree still carries that title.
    fn delete_folder(&self, code: &str) -> Result<FolderRemoval>;

    // Units
    /// Create a unit from a caller payload.
    fn create_unit(&self, payload: Map<String, Value>) -> Result<Unit>;

    /// Get a unit by code.
    fn get_unit(&self, code: &str) -> Result<Unit>;

    /// Merge-patch a unit.
    fn update_unit(&self, code: &str, patch: Map<String, Value>) -> Result<Unit>;

    /// Delete a unit by code.
    fn delete_unit(&self, code: &str) -> Result<()>;

    /// One page of all units in insertion order.
    fn list_units(&self, page: PageRequest) -> Result<Page<Unit>>;

    /// Units whose folder reference is exactly `folder`.
    fn list_units_in_folder(&self, folder: &str) -> Result<Vec<Unit>>;

    /// One page of the units referencing any folder in the subtree of `code`.
    /// Titles shared with folders outside the subtree are not followed.
    fn list_folder_units(&self, code: &str, page: PageRequest) -> Result<Page<Unit>>;
}

/// Subtree of folder `?1` as `(code, title)` rows, parents before children.
const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(code, title) AS (
        SELECT code, title FROM folders WHERE code = ?1
        UNION ALL
        SELECT f.code, f.title FROM folders f JOIN subtree s ON f.parent = s.code
    )";

const UNIT_COLUMNS: &str = "code, folder, fields, created_at, updated_at, is_favorite";

/// A unit row before its fields are decoded.
struct UnitRow {
    code: String,
    folder: Option<String>,
    fields: String,
    created_at: String,
    updated_at: String,
    is_favorite: bool,
}

impl UnitRow {
    fn into_unit(self) -> Result<Unit> {
        let fields: Map<String, Value> = serde_json::from_str(&self.fields)?;
        Ok(Unit {
            code: self.code,
            folder: self.folder,
            fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_favorite: self.is_favorite,
        })
    }
}

/// SQLite-backed tracker store.
///
/// One connection guarded by a mutex, so every operation is serialized and
/// multi-row changes run in a single transaction.
#[derive(Debug)]
pub struct SqliteTrackerStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackerStore {
    /// Create a store in memory. Its contents vanish when it is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Create a store persisted at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Lock the connection. A panic in another holder does not corrupt
    /// `SQLite` state, so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize the database schema and the root folder.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS folders (
                code TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                parent TEXT REFERENCES folders(code) ON DELETE CASCADE,
                position INTEGER NOT NULL
            );

            -- Units in insertion order; seq is the only sort key
            CREATE TABLE IF NOT EXISTS units (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                folder TEXT,
                fields TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0
            );

            -- Monotonic counters, never decremented
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent, position);
            CREATE INDEX IF NOT EXISTS idx_units_folder ON units(folder);

            INSERT OR IGNORE INTO counters (name, value) VALUES ('unit', 0), ('folder_position', 0);
            ",
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO folders (code, title, parent, position) VALUES (?1, ?2, NULL, 0)",
            params![ROOT_FOLDER_CODE, ROOT_FOLDER_TITLE],
        )?;
        Ok(())
    }

    /// Advance a named counter and return its new value.
    fn next_counter(conn: &Connection, name: &str) -> Result<i64> {
        let value = conn.query_row(
            "UPDATE counters SET value = value + 1 WHERE name = ?1 RETURNING value",
            params![name],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    fn folder_exists(conn: &Connection, code: &str) -> Result<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE code = ?1)",
            params![code],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn child_codes(conn: &Connection, code: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT code FROM folders WHERE parent = ?1 ORDER BY position")?;
        let codes = stmt
            .query_map(params![code], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(codes)
    }

    /// Load folders selected by `sql`, which must return `code, title, parent`.
    fn query_folders(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Folder>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<Vec<(String, String, Option<String>)>>>()?;

        rows.into_iter()
            .map(|(code, title, parent)| {
                let children = Self::child_codes(conn, &code)?;
                Ok(Folder { code, title, parent, children })
            })
            .collect()
    }

    fn load_folder(conn: &Connection, code: &str) -> Result<Option<Folder>> {
        let mut folders = Self::query_folders(
            conn,
            "SELECT code, title, parent FROM folders WHERE code = ?1",
            params![code],
        )?;
        Ok(folders.pop())
    }

    fn build_tree(conn: &Connection, code: &str) -> Result<FolderNode> {
        let Some(folder) = Self::load_folder(conn, code)? else {
            return Ok(FolderNode::placeholder(code));
        };
        let children = folder
            .children
            .iter()
            .map(|child| Self::build_tree(conn, child))
            .collect::<Result<Vec<_>>>()?;
        Ok(FolderNode {
            id: CodeRef { code: folder.code.clone() },
            key: folder.code,
            title: folder.title,
            children,
        })
    }

    /// Check if putting `code` under `new_parent` would create a cycle.
    fn would_create_cycle(conn: &Connection, code: &str, new_parent: &str) -> Result<bool> {
        // Walk up from the new parent to see if we reach the moved folder
        let mut visited = HashSet::new();
        let mut current = Some(new_parent.to_string());

        while let Some(ancestor) = current {
            if ancestor == code {
                return Ok(true);
            }
            if !visited.insert(ancestor.clone()) {
                break;
            }
            current = conn
                .query_row(
                    "SELECT parent FROM folders WHERE code = ?1",
                    params![&ancestor],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
        }

        Ok(false)
    }

    /// Folders in the subtree rooted at `code`, and the unit folder
    /// references that point into it.
    ///
    /// Codes always count. A title counts only when no folder outside the
    /// subtree answers to it, since titles need not be unique.
    fn subtree_references(conn: &Connection, code: &str) -> Result<(Vec<Folder>, Vec<String>)> {
        let subtree = Self::query_folders(
            conn,
            &format!(
                "{SUBTREE_CTE} SELECT code, title, parent FROM folders
                 WHERE code IN (SELECT code FROM subtree) ORDER BY position"
            ),
            params![code],
        )?;
        let outside = Self::query_folders(
            conn,
            &format!(
                "{SUBTREE_CTE} SELECT code, title, parent FROM folders
                 WHERE code NOT IN (SELECT code FROM subtree)"
            ),
            params![code],
        )?;

        let mut references = vec![code.to_string()];
        for folder in &subtree {
            for label in [&folder.code, &folder.title] {
                let shared = outside.iter().any(|other| other.matches(label));
                if !shared && !references.contains(label) {
                    references.push(label.clone());
                }
            }
        }
        Ok((subtree, references))
    }

    fn parse_unit(row: &rusqlite::Row) -> rusqlite::Result<UnitRow> {
        Ok(UnitRow {
            code: row.get(0)?,
            folder: row.get(1)?,
            fields: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            is_favorite: row.get(5)?,
        })
    }

    fn query_units(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Unit>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::parse_unit)?
            .collect::<rusqlite::Result<Vec<UnitRow>>>()?;
        rows.into_iter().map(UnitRow::into_unit).collect()
    }

    fn load_unit(conn: &Connection, code: &str) -> Result<Option<Unit>> {
        let row = conn
            .query_row(
                &format!("SELECT {UNIT_COLUMNS} FROM units WHERE code = ?1"),
                params![code],
                Self::parse_unit,
            )
            .optional()?;
        row.map(UnitRow::into_unit).transpose()
    }

    fn to_sql_int(value: usize) -> Result<i64> {
        i64::try_from(value).map_err(|_| Error::invalid(format!("{value} is out of range")))
    }

    fn from_sql_count(count: i64) -> usize {
        usize::try_from(count).unwrap_or(0)
    }

    /// Slice a page out of the units matched by `filter`, a `WHERE` clause
    /// (possibly empty) that may follow a `WITH` prefix.
    fn page_units(
        conn: &Connection,
        prefix: &str,
        filter: &str,
        args: &[&dyn ToSql],
        page: PageRequest,
    ) -> Result<Page<Unit>> {
        let offset = page.offset()?;
        let total: i64 = conn.query_row(
            &format!("{prefix} SELECT COUNT(*) FROM units {filter}"),
            args,
            |row| row.get(0),
        )?;
        let total = Self::from_sql_count(total);

        let content = Self::query_units(
            conn,
            &format!(
                "{prefix} SELECT {UNIT_COLUMNS} FROM units {filter} ORDER BY seq LIMIT {} OFFSET {}",
                Self::to_sql_int(page.size)?,
                Self::to_sql_int(offset)?,
            ),
            args,
        )?;

        let has_next = offset.saturating_add(content.len()) < total;
        Ok(Page {
            content,
            page_size: page.size,
            page_number: page.page,
            has_next,
            total_elements: total,
        })
    }
}

impl TrackerStore for SqliteTrackerStore {
    fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<Folder> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        if let Some(parent) = parent {
            if !Self::folder_exists(&tx, parent)? {
                return Err(Error::not_found(EntityKind::Folder, parent));
            }
        }

        let code = loop {
            let candidate = folder_code(name);
            if !Self::folder_exists(&tx, &candidate)? {
                break candidate;
            }
        };
        let position = Self::next_counter(&tx, "folder_position")?;

        tx.execute(
            "INSERT INTO folders (code, title, parent, position) VALUES (?1, ?2, ?3, ?4)",
            params![&code, name, parent, position],
        )?;
        tx.commit()?;

        debug!(folder = %code, parent = ?parent, "created folder");
        Ok(Folder {
            code,
            title: name.to_string(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
        })
    }

    fn get_folder(&self, code: &str) -> Result<Folder> {
        let conn = self.lock();
        Self::load_folder(&conn, code)?.ok_or_else(|| Error::not_found(EntityKind::Folder, code))
    }

    fn get_folder_tree(&self, code: &str) -> Result<FolderNode> {
        let conn = self.lock();
        Self::build_tree(&conn, code)
    }

    fn list_folders(&self, scope: &FolderScope) -> Result<Vec<Folder>> {
        let conn = self.lock();
        match scope {
            FolderScope::All => Self::query_folders(
                &conn,
                "SELECT code, title, parent FROM folders ORDER BY position",
                params![],
            ),
            FolderScope::Roots => Self::query_folders(
                &conn,
                "SELECT code, title, parent FROM folders WHERE parent IS NULL ORDER BY position",
                params![],
            ),
            FolderScope::ChildrenOf(code) => {
                if !Self::folder_exists(&conn, code)? {
                    return Err(Error::not_found(EntityKind::Folder, code.as_str()));
                }
                Self::query_folders(
                    &conn,
                    "SELECT code, title, parent FROM folders WHERE parent = ?1 ORDER BY position",
                    params![code],
                )
            }
        }
    }

    fn update_folder(&self, code: &str, update: FolderUpdate) -> Result<Folder> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let folder =
            Self::load_folder(&tx, code)?.ok_or_else(|| Error::not_found(EntityKind::Folder, code))?;
        if update.is_empty() {
            return Ok(folder);
        }

        if let Some(name) = &update.name {
            tx.execute("UPDATE folders SET title = ?2 WHERE code = ?1", params![code, name])?;
        }

        if let Some(new_parent) = &update.parent {
            if folder.is_root() {
                return Err(Error::invalid("the root folder cannot be moved"));
            }
            if let Some(parent) = new_parent {
                if !Self::folder_exists(&tx, parent)? {
                    return Err(Error::not_found(EntityKind::Folder, parent.as_str()));
                }
                if Self::would_create_cycle(&tx, code, parent)? {
                    return Err(Error::invalid(format!(
                        "moving folder {code} under {parent} would create a cycle"
                    )));
                }
            }
            if folder.parent != *new_parent {
                // Moved folders go to the end of their new parent's child list
                let position = Self::next_counter(&tx, "folder_position")?;
                tx.execute(
                    "UPDATE folders SET parent = ?2, position = ?3 WHERE code = ?1",
                    params![code, new_parent, position],
                )?;
            }
        }

        let folder =
            Self::load_folder(&tx, code)?.ok_or_else(|| Error::not_found(EntityKind::Folder, code))?;
        tx.commit()?;

        debug!(folder = %code, "updated folder");
        Ok(folder)
    }

    fn delete_folder(&self, code: &str) -> Result<FolderRemoval> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let folder =
            Self::load_folder(&tx, code)?.ok_or_else(|| Error::not_found(EntityKind::Folder, code))?;
        if folder.is_root() {
            return Err(Error::invalid("the root folder cannot be deleted"));
        }

        let (subtree, references) = Self::subtree_references(&tx, code)?;
        let mut removal = FolderRemoval { folders: subtree.len(), units: 0 };
        for reference in &references {
            removal.units += tx.execute("DELETE FROM units WHERE folder = ?1", params![reference])?;
        }
        // Descendant folders go with it through ON DELETE CASCADE
        tx.execute("DELETE FROM folders WHERE code = ?1", params![code])?;
        tx.commit()?;

        debug!(folder = %code, folders = removal.folders, units = removal.units, "deleted folder");
        Ok(removal)
    }

    fn create_unit(&self, payload: Map<String, Value>) -> Result<Unit> {
        let draft = UnitDraft::from_payload(payload)?;
        let fields_json = serde_json::to_string(&draft.fields)?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let code = unit_code(Self::next_counter(&tx, "unit")?);

        tx.execute(
            "INSERT INTO units (code, folder, fields, created_at, updated_at, is_favorite)
             VALUES (?1, ?2, ?3, ?4, ?4, 0)",
            params![&code, &draft.folder, fields_json, STUB_TIMESTAMP],
        )?;
        tx.commit()?;

        debug!(unit = %code, folder = ?draft.folder, "created unit");
        Ok(Unit {
            code,
            folder: draft.folder,
            fields: draft.fields,
            created_at: STUB_TIMESTAMP.to_string(),
            updated_at: STUB_TIMESTAMP.to_string(),
            is_favorite: false,
        })
    }

    fn get_unit(&self, code: &str) -> Result<Unit> {
        let conn = self.lock();
        Self::load_unit(&conn, code)?.ok_or_else(|| Error::not_found(EntityKind::Unit, code))
    }

    fn update_unit(&self, code: &str, patch: Map<String, Value>) -> Result<Unit> {
        let patch = UnitPatch::from_payload(patch)?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut unit =
            Self::load_unit(&tx, code)?.ok_or_else(|| Error::not_found(EntityKind::Unit, code))?;

        merge_fields(&mut unit.fields, patch.fields);
        if let Some(folder) = patch.folder {
            unit.folder = folder;
        }
        if let Some(is_favorite) = patch.is_favorite {
            unit.is_favorite = is_favorite;
        }

        tx.execute(
            "UPDATE units SET folder = ?2, fields = ?3, is_favorite = ?4 WHERE code = ?1",
            params![code, &unit.folder, serde_json::to_string(&unit.fields)?, unit.is_favorite],
        )?;
        tx.commit()?;

        debug!(unit = %code, "updated unit");
        Ok(unit)
    }

    fn delete_unit(&self, code: &str) -> Result<()> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM units WHERE code = ?1", params![code])?;
        if rows == 0 {
            return Err(Error::not_found(EntityKind::Unit, code));
        }
        debug!(unit = %code, "deleted unit");
        Ok(())
    }

    fn list_units(&self, page: PageRequest) -> Result<Page<Unit>> {
        let conn = self.lock();
        Self::page_units(&conn, "", "", params![], page)
    }

    fn list_units_in_folder(&self, folder: &str) -> Result<Vec<Unit>> {
        let conn = self.lock();
        Self::query_units(
            &conn,
            &format!("SELECT {UNIT_COLUMNS} FROM units WHERE folder = ?1 ORDER BY seq"),
            params![folder],
        )
    }

    fn list_folder_units(&self, code: &str, page: PageRequest) -> Result<Page<Unit>> {
        let conn = self.lock();
        let (_, references) = Self::subtree_references(&conn, code)?;

        let placeholders =
            (1..=references.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let args: Vec<&dyn ToSql> = references.iter().map(|r| r as &dyn ToSql).collect();
        Self::page_units(&conn, "", &format!("WHERE folder IN ({placeholders})"), &args, page)
    }
}
