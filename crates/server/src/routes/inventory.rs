use axum::{
    extract::{rejection::{JsonRejection, PathRejection, QueryRejection}, Path, Query, State},
    response::Response,
    Json,
};
use models::{NoteInput, NoteType};
use serde::Deserialize;
use service::errors::ServiceError;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    pub codigo: Option<String>,
}

async fn create_note(state: AppState, payload: Result<Json<NoteInput>, JsonRejection>, tipo: NoteType) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let receipt = state.inventory.process_note(&input, tipo).await?;
    let message = match tipo {
        NoteType::Entrada => "entrada note created",
        NoteType::Salida => "salida note created",
    };
    Ok(response::created(message, receipt))
}

/// POST /inventory/entrada
pub async fn create_entrada(
    State(state): State<AppState>,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    create_note(state, payload, NoteType::Entrada).await
}

/// POST /inventory/salida
pub async fn create_salida(
    State(state): State<AppState>,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    create_note(state, payload, NoteType::Salida).await
}

/// GET /inventory?codigo=
pub async fn list_notes(
    State(state): State<AppState>,
    query: Result<Query<NotesQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let codigo = q.codigo.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let notes = state.inventory.list_notes(codigo).await?;
    Ok(response::ok("notes listed", notes))
}

/// GET /inventory/:id
pub async fn get_note(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    let id = Uuid::parse_str(&id).map_err(|_| ServiceError::InvalidInput(format!("invalid note id: {id}")))?;
    let note = state.inventory.get_note(id).await?;
    Ok(response::ok("note found", note))
}
