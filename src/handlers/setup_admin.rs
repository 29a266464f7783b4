// handlers/setup_admin.rs - POST /setup-admin handler
// One-time promotion of a registered user to administrator

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures::StreamExt;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::config::SetupToken;
use crate::directory::RoleInsert;
use crate::email::email_from_body;
use crate::error::{ApiError, GENERIC_DENIAL};

/// Header carrying the deploy-time setup secret.
pub const SETUP_TOKEN_HEADER: &str = "x-setup-token";

pub const SUCCESS_MESSAGE: &str = "Admin role assigned!";

/**
 * POST /setup-admin - Grant the first administrator role
 *
 * Expected Input:
 * ```json
 * { "email": "owner@example.com" }
 * ```
 * with header `x-setup-token: <secret>`.
 *
 * Gates run in order: method, token, declared size, JSON, email grammar,
 * existing admin, user lookup, conditional insert. The token check comes
 * before anything reads the body or the directory.
 *
 * @returns `{"success": true, "message": "Admin role assigned!"}` or `{"error": "..."}`
 */
pub async fn setup_admin(State(state): State<AppState>, request: Request) -> Response {
    match *request.method() {
        Method::OPTIONS => return StatusCode::OK.into_response(),
        Method::POST => {}
        _ => {
            let mut response = ApiError::MethodNotAllowed.into_response();
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
            return response;
        }
    }

    match bootstrap(&state, request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": SUCCESS_MESSAGE })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn bootstrap(state: &AppState, request: Request) -> Result<(), ApiError> {
    let bootstrap = &state.config.bootstrap;

    authorize(bootstrap.setup_token.as_ref(), request.headers())?;

    let limit = bootstrap.max_body_bytes;
    if declared_length(request.headers()) > limit as u64 {
        warn!("Admin bootstrap rejected: declared body exceeds {} bytes", limit);
        return Err(ApiError::PayloadTooLarge);
    }

    let bytes = read_body(request.into_body(), limit).await?;

    let body: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| ApiError::InvalidJson)?;

    let email = email_from_body(&body)?;
    let normalized = email.normalized();

    let directory = state.directory.as_ref();

    if directory.admin_exists().await? {
        warn!("Admin bootstrap refused: an administrator is already provisioned");
        return Err(GENERIC_DENIAL);
    }

    let Some(user) = directory.find_user_by_email(&normalized).await? else {
        info!("Admin bootstrap refused: no matching user");
        return Err(GENERIC_DENIAL);
    };

    match directory.insert_admin_role(&user.id).await? {
        RoleInsert::Inserted => {
            info!(user_id = %user.id, backend = directory.backend(), "Admin role assigned");
            Ok(())
        }
        RoleInsert::AdminAlreadyExists => {
            warn!("Admin bootstrap refused: administrator provisioned concurrently");
            Err(GENERIC_DENIAL)
        }
    }
}

/// Collect the body, enforcing `limit` on what actually arrives so bodies
/// sent without a Content-Length are bounded too. A body that breaks off
/// mid-stream never forms a complete JSON document and is reported as such.
async fn read_body(body: Body, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut stream = body.into_data_stream();
    let mut bytes = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            debug!("Admin bootstrap body read failed: {}", e);
            ApiError::InvalidJson
        })?;
        if bytes.len() + chunk.len() > limit {
            warn!("Admin bootstrap rejected: body exceeds {} bytes", limit);
            return Err(ApiError::PayloadTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Fails closed when the server has no token configured.
fn authorize(expected: Option<&SetupToken>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        warn!("Admin bootstrap rejected: ADMIN_SETUP_TOKEN is not configured");
        return Err(ApiError::Unauthorized);
    };

    let provided = headers
        .get(SETUP_TOKEN_HEADER)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default();

    if bool::from(provided.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        warn!("Admin bootstrap rejected: bad or missing setup token");
        Err(ApiError::Unauthorized)
    }
}

/// Declared `Content-Length`; absent or unparseable counts as zero.
fn declared_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}
