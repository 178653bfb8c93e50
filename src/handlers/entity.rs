//! Entity CRUD handlers: list, read, create, update, delete.
//! The path segment selects the entity; its catalog entry drives validation and the error body shape.

use crate::config::{FieldRule, Operation, ResolvedEntity};
use crate::error::{AppError, FieldError};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn entity_for<'a>(state: &'a AppState, path_segment: &str) -> Result<&'a ResolvedEntity, Response> {
    state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::UnknownResource(path_segment.to_string()).into_response())
}

/// Render the outcome, shaping errors the way the entity expects.
fn respond(entity: &ResolvedEntity, result: Result<Response, AppError>) -> Response {
    result.unwrap_or_else(|e| e.render(entity.error_style))
}

/// Only JSON bodies are parsed; anything else (or nothing) reads as `{}`.
fn parse_body(headers: &HeaderMap, bytes: &Bytes) -> Result<Map<String, Value>, AppError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false);
    if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(AppError::Validation(vec![FieldError::new(
            "body",
            "body",
            "isJSON",
            format!("Malformed JSON body: {}", e),
            None,
        )])),
    }
}

/// Run the path-id rule (when the entity declares one for `op`) followed by the body rules.
fn validate(
    entity: &ResolvedEntity,
    op: Operation,
    id: Option<&str>,
    rules: &[FieldRule],
    body: &Map<String, Value>,
) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if let Some(id) = id.filter(|_| entity.checks_id(op)) {
        let mut params = Map::new();
        params.insert("id".into(), Value::String(id.to_string()));
        errors.extend(RequestValidator::validate(&[FieldRule::path_id()], &params));
    }
    errors.extend(RequestValidator::validate(rules, body));
    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(entity = %entity.id, failures = errors.len(), "validation failed");
        Err(AppError::Validation(errors))
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let entity = match entity_for(&state, &path_segment) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    respond(entity, list_rows(&state, entity, params).await)
}

async fn list_rows(
    state: &AppState,
    entity: &ResolvedEntity,
    params: HashMap<String, String>,
) -> Result<Response, AppError> {
    let query: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    validate(entity, Operation::List, None, &entity.list_filters, &query)?;
    let filters: Vec<(String, Value)> = entity
        .list_filters
        .iter()
        .filter_map(|r| query.get(&r.field).map(|v| (r.field.clone(), v.clone())))
        .collect();
    let rows = CrudService::list(state.store.as_ref(), entity, &filters).await?;
    Ok(success_many(rows).into_response())
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Response {
    let entity = match entity_for(&state, &path_segment) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    respond(entity, read_row(&state, entity, &id).await)
}

async fn read_row(state: &AppState, entity: &ResolvedEntity, id: &str) -> Result<Response, AppError> {
    validate(entity, Operation::Read, Some(id), &[], &Map::new())?;
    let row = CrudService::read(state.store.as_ref(), entity, id)
        .await?
        .ok_or_else(|| AppError::NotFound(entity.not_found_message.clone()))?;
    Ok(success_one_ok(row).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let entity = match entity_for(&state, &path_segment) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    respond(entity, create_row(&state, entity, &headers, &bytes).await)
}

async fn create_row(
    state: &AppState,
    entity: &ResolvedEntity,
    headers: &HeaderMap,
    bytes: &Bytes,
) -> Result<Response, AppError> {
    let body = parse_body(headers, bytes)?;
    validate(entity, Operation::Create, None, &entity.create_rules, &body)?;
    let created = CrudService::create(state.store.as_ref(), entity, &body).await?;
    Ok(success_one(created).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let entity = match entity_for(&state, &path_segment) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    respond(entity, update_row(&state, entity, &id, &headers, &bytes).await)
}

async fn update_row(
    state: &AppState,
    entity: &ResolvedEntity,
    id: &str,
    headers: &HeaderMap,
    bytes: &Bytes,
) -> Result<Response, AppError> {
    let body = parse_body(headers, bytes)?;
    validate(entity, Operation::Update, Some(id), &entity.update_rules, &body)?;
    let row = CrudService::update(state.store.as_ref(), entity, id, &body).await?;
    Ok(success_one_ok(row).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Response {
    let entity = match entity_for(&state, &path_segment) {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    respond(entity, delete_row(&state, entity, &id).await)
}

async fn delete_row(state: &AppState, entity: &ResolvedEntity, id: &str) -> Result<Response, AppError> {
    validate(entity, Operation::Delete, Some(id), &[], &Map::new())?;
    CrudService::delete(state.store.as_ref(), entity, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        h
    }

    #[test]
    fn body_without_json_content_type_is_empty() {
        let body = parse_body(&HeaderMap::new(), &Bytes::from_static(b"{\"a\":1}")).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn non_object_json_is_empty() {
        let body = parse_body(&json_headers(), &Bytes::from_static(b"[1,2]")).unwrap();
        assert!(body.is_empty());
        let body = parse_body(&json_headers(), &Bytes::from_static(b"  ")).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn malformed_json_is_a_body_error() {
        let err = parse_body(&json_headers(), &Bytes::from_static(b"{\"a\":")).unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors[0].location, "body"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
