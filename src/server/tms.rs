//! TMS plugin API: folder hierarchy, unit pages and unit CRUD.

use super::AppState;
use crate::client::http::TMS_FOLDER_PATH;
use crate::error::{Error, Result};
use crate::tracker::models::{suit_for, CodeRef};
use crate::tracker::{
    FolderNode, FolderUnits, PageRequest, TrackerStore, UnitEntry, ROOT_FOLDER_CODE,
};
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Title of folders created without a name.
const DEFAULT_FOLDER_NAME: &str = "New folder";

/// TMS API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(&format!("{TMS_FOLDER_PATH}/root/units"), post(root_units))
        .route(&format!("{TMS_FOLDER_PATH}/create"), post(create_folder))
        .route(&format!("{TMS_FOLDER_PATH}/hierarchy/:code/units/filtered"), post(folder_units))
        .route("/rest/api/unit/v2/:code/create", post(create_unit))
        .route("/rest/api/unit/v2/:code", get(get_unit))
        .route("/rest/api/unit/v2/update/:code", patch(update_unit))
}

/// `{"unitFilters": {"page": {"page", "size"}}}`; every level may be missing or null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitsRequest {
    #[serde(default)]
    unit_filters: Option<UnitFilters>,
}

#[derive(Debug, Default, Deserialize)]
struct UnitFilters {
    #[serde(default)]
    page: Option<PageRequest>,
}

impl UnitsRequest {
    fn page(body: Option<Json<Self>>) -> PageRequest {
        body.and_then(|Json(request)| request.unit_filters)
            .and_then(|filters| filters.page)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<CodeRef>,
}

fn object_body(body: Option<Json<Value>>) -> Result<Map<String, Value>> {
    match body {
        None | Some(Json(Value::Null)) => Ok(Map::new()),
        Some(Json(Value::Object(map))) => Ok(map),
        Some(_) => Err(Error::invalid("request body must be a JSON object")),
    }
}

async fn root_units(
    State(state): State<AppState>,
    body: Option<Json<UnitsRequest>>,
) -> Result<Json<FolderUnits>> {
    let units = state.store.list_units(UnitsRequest::page(body))?;
    Ok(Json(FolderUnits {
        folder_hierarchy: state.store.get_folder_tree(ROOT_FOLDER_CODE)?,
        units: units.map(UnitEntry::from),
    }))
}

async fn create_folder(
    State(state): State<AppState>,
    body: Option<Json<CreateFolderRequest>>,
) -> Result<Json<FolderNode>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let name = request.name.as_deref().unwrap_or(DEFAULT_FOLDER_NAME);
    let parent = request.parent_id.map_or_else(|| ROOT_FOLDER_CODE.to_string(), |id| id.code);

    let folder = state.store.create_folder(name, Some(&parent))?;
    Ok(Json(state.store.get_folder_tree(&folder.code)?))
}

async fn folder_units(
    State(state): State<AppState>,
    Path(code): Path<String>,
    body: Option<Json<UnitsRequest>>,
) -> Result<Json<FolderUnits>> {
    let units = state.store.list_folder_units(&code, UnitsRequest::page(body))?;
    Ok(Json(FolderUnits {
        folder_hierarchy: state.store.get_folder_tree(&code)?,
        units: units.map(UnitEntry::from),
    }))
}

async fn create_unit(
    State(state): State<AppState>,
    Path(suit): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>> {
    let mut payload = object_body(body)?;
    payload.entry("suit").or_insert_with(|| suit_for(&suit));
    let unit = state.store.create_unit(payload)?;
    Ok(Json(json!({"id": unit.code})))
}

async fn get_unit(State(state): State<AppState>, Path(code): Path<String>) -> Result<Json<Value>> {
    Ok(Json(state.store.get_unit(&code)?.to_dto()))
}

async fn update_unit(
    State(state): State<AppState>,
    Path(code): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>> {
    let unit = state.store.update_unit(&code, object_body(body)?)?;
    Ok(Json(json!({"id": unit.code})))
}
