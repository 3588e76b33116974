use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::debug;

use super::error::ApiError;
use super::types::*;
use super::AppState;
use crate::account::{AccountId, AccountSummary};
use crate::attachment::AttachmentMeta;
use crate::auth::{AuthenticatedAccount, TokenPair};

const OCTET_STREAM: &str = "application/octet-stream";

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!("Unreadable request body: {}", rejection);
            Err(ApiError::validation("error parsing the request"))
        }
    }
}

fn account_id(raw: &str, message: &str) -> Result<AccountId, ApiError> {
    match raw.parse::<AccountId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation(message)),
    }
}

/// POST /public/api/users
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let request = body(payload)?;
    request.validate()?;

    let tokens = state
        .accounts
        .create_account(state.deadline(), request.name, request.email, request.password)
        .await?;
    Ok(Json(tokens))
}

/// POST /public/api/users/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let request = body(payload)?;
    request.validate()?;

    let tokens = state
        .accounts
        .login(state.deadline(), &request.email, request.password)
        .await?;
    Ok(Json(tokens))
}

/// GET /public/api/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    Ok(Json(state.accounts.list_accounts(state.deadline()).await?))
}

/// PUT /private/api/users
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthenticatedAccount(caller)): Extension<AuthenticatedAccount>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = body(payload)?;
    request.validate()?;
    debug!("Account {} updating account {}", caller, request.id);

    state
        .accounts
        .update_account(state.deadline(), request.into_update())
        .await
        .map_err(|e| ApiError::from(e).account_missing_as_bad_request())?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// DELETE /private/api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(AuthenticatedAccount(caller)): Extension<AuthenticatedAccount>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = account_id(&id, "invalid id")?;
    debug!("Account {} deleting account {}", caller, id);

    state
        .accounts
        .delete_account(state.deadline(), id)
        .await
        .map_err(|e| ApiError::from(e).account_missing_as_bad_request())?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// POST /public/api/files/:id with a multipart `file` field
pub async fn upload_file(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let owner = account_id(&owner, "invalid user ID")?;
    let mut multipart = multipart.map_err(|_| ApiError::validation("failed to get file"))?;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::validation("failed to read file"))?
            .ok_or_else(|| ApiError::validation("failed to get file"))?;
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or(OCTET_STREAM).to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::validation("failed to read file"))?;

        let id = state
            .files
            .upload(state.deadline(), owner, filename, content_type, data.to_vec())
            .await?;
        return Ok(Json(UploadResponse {
            message: "file uploaded successfully".to_string(),
            id,
        }));
    }
}

/// GET /public/api/files/:id
pub async fn download_file(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let file = state.files.get_attachment(state.deadline(), &id).await?;

    let content_type =
        HeaderValue::from_str(&file.content_type).unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    let disposition = format!("attachment; filename=\"{}\"", file.filename.replace(['"', '\\'], "_"));
    let disposition =
        HeaderValue::from_bytes(disposition.as_bytes()).unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = file.data.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// DELETE /public/api/files/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.files.delete_attachment(state.deadline(), &id).await?;
    Ok(Json(MessageResponse::new("file deleted")))
}

/// GET /public/api/files/user/:id
pub async fn list_files(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<AttachmentMeta>>, ApiError> {
    let owner = account_id(&owner, "invalid user ID")?;
    Ok(Json(state.files.list_attachments(state.deadline(), owner).await?))
}

/// DELETE /public/api/files/user/:id
pub async fn delete_files(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let owner = account_id(&owner, "invalid user ID")?;
    state.files.delete_attachments(state.deadline(), owner).await?;
    Ok(Json(MessageResponse::new("all files deleted")))
}
