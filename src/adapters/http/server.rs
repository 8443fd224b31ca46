//! axum front end of the receipt endpoint

use super::receipt::{ReceiptPayload, ReceiptResponse, ReceiptService, UploadedFile};
use crate::domain::{EdiError, Result};
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use std::future::Future;
use tokio::net::TcpListener;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Router serving `POST <route>`
pub fn router(service: ReceiptService) -> Router {
    let route = service.route().to_string();
    Router::new()
        .route(&route, post(receive))
        .with_state(service)
}

/// Serves the receipt endpoint until `shutdown` resolves
pub async fn serve(
    bind_address: &str,
    service: ReceiptService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    let local = listener.local_addr()?;
    tracing::info!(address = %local, route = %service.route(), "Receipt endpoint listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| EdiError::Io(format!("Receipt endpoint failed: {e}")))
}

async fn receive(State(service): State<ReceiptService>, request: Request) -> Response {
    let payload = match read_payload(request).await {
        Ok(payload) => payload,
        Err(message) => {
            tracing::warn!(error = %message, "Unreadable receipt request");
            return respond(ReceiptResponse {
                status: 400,
                message,
            });
        }
    };

    let response = tokio::task::spawn_blocking(move || service.receive(payload))
        .await
        .unwrap_or_else(|e| ReceiptResponse {
            status: 500,
            message: format!("Errors: {e}"),
        });
    respond(response)
}

async fn read_payload(request: Request) -> std::result::Result<ReceiptPayload, String> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| e.to_string())?;
        return Ok(ReceiptPayload::Raw(body.to_vec()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| e.body_text())?;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data: Bytes = field.bytes().await.map_err(|e| e.body_text())?;
        files.push(UploadedFile {
            name,
            data: data.to_vec(),
        });
    }

    if files.is_empty() {
        return Ok(ReceiptPayload::Raw(Vec::new()));
    }
    Ok(ReceiptPayload::Files(files))
}

fn respond(response: ReceiptResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match response.to_cxml(Utc::now()) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
