//! Flat REST API: `/folders` and `/test-cases`.

use super::AppState;
use crate::error::{Error, Result};
use crate::tracker::{
    FlatFolder, FolderScope, FolderUpdate, PageRequest, TestCase, TrackerStore, Unit,
    MAX_PAGE_SIZE,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Flat API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/:id", get(get_folder).put(update_folder).delete(delete_folder))
        .route("/test-cases", get(list_test_cases).post(create_test_case))
        .route(
            "/test-cases/:id",
            get(get_test_case).put(update_test_case).delete(delete_test_case),
        )
}

#[derive(Debug, Deserialize)]
struct FolderQuery {
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFolderBody {
    name: String,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateFolderBody {
    #[serde(default)]
    name: Option<String>,
    /// Empty string detaches the folder; null or absent leaves it in place.
    #[serde(default)]
    parent_id: Option<String>,
}

impl From<UpdateFolderBody> for FolderUpdate {
    fn from(body: UpdateFolderBody) -> Self {
        let parent = body.parent_id.map(|id| if id.is_empty() { None } else { Some(id) });
        Self { name: body.name, parent }
    }
}

#[derive(Debug, Deserialize)]
struct TestCaseQuery {
    folder: Option<String>,
}

/// A JSON object body, minus the read-only `id`.
fn test_case_body(body: Value) -> Result<Map<String, Value>> {
    let Value::Object(mut map) = body else {
        return Err(Error::invalid("test case body must be a JSON object"));
    };
    map.remove("id");
    Ok(map)
}

async fn list_folders(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<Vec<FlatFolder>>> {
    let scope = FolderScope::from_parent_query(query.parent_id.as_deref());
    let folders = state.store.list_folders(&scope)?;
    Ok(Json(folders.iter().map(crate::tracker::Folder::to_flat).collect()))
}

async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FlatFolder>> {
    Ok(Json(state.store.get_folder(&id)?.to_flat()))
}

async fn create_folder(
    State(state): State<AppState>,
    Json(body): Json<CreateFolderBody>,
) -> Result<Json<FlatFolder>> {
    let parent = body.parent_id.as_deref().filter(|id| !id.is_empty());
    Ok(Json(state.store.create_folder(&body.name, parent)?.to_flat()))
}

async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateFolderBody>,
) -> Result<Json<FlatFolder>> {
    Ok(Json(state.store.update_folder(&id, body.into())?.to_flat()))
}

async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_folder(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_test_cases(
    State(state): State<AppState>,
    Query(query): Query<TestCaseQuery>,
) -> Result<Json<Vec<TestCase>>> {
    let units = match query.folder {
        Some(folder) => state.store.list_units_in_folder(&folder)?,
        None => {
            let mut units = Vec::new();
            let mut page = PageRequest::new(0, MAX_PAGE_SIZE);
            loop {
                let batch = state.store.list_units(page)?;
                units.extend(batch.content);
                if !batch.has_next {
                    break units;
                }
                page.page += 1;
            }
        }
    };
    Ok(Json(units.iter().map(Unit::to_test_case).collect()))
}

async fn get_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TestCase>> {
    let unit = state.store.get_unit(&id).map_err(Error::for_test_case)?;
    Ok(Json(unit.to_test_case()))
}

async fn create_test_case(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<TestCase>> {
    let payload = test_case_body(body)?;
    if !matches!(payload.get("folder"), Some(Value::String(_))) {
        return Err(Error::invalid("folder is required and must be a string"));
    }
    Ok(Json(state.store.create_unit(payload)?.to_test_case()))
}

async fn update_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<TestCase>> {
    let patch = test_case_body(body)?;
    let unit = state.store.update_unit(&id, patch).map_err(Error::for_test_case)?;
    Ok(Json(unit.to_test_case()))
}

async fn delete_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_unit(&id).map_err(Error::for_test_case)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_body_parent_semantics() {
        let update: FolderUpdate =
            UpdateFolderBody { name: None, parent_id: Some(String::new()) }.into();
        assert_eq!(update.parent, Some(None));

        let update: FolderUpdate =
            UpdateFolderBody { name: None, parent_id: Some("p".into()) }.into();
        assert_eq!(update.parent, Some(Some("p".to_string())));

        let update: FolderUpdate = UpdateFolderBody { name: Some("n".into()), parent_id: None }.into();
        assert_eq!(update.parent, None);
        assert_eq!(update.name.as_deref(), Some("n"));
    }

    #[test]
    fn test_test_case_body_strips_id() {
        let map = test_case_body(serde_json::json!({"id": "x", "name": "n"})).unwrap();
        assert!(!map.contains_key("id"));
        assert!(test_case_body(serde_json::json!([1])).is_err());
    }
}
