//! Inbound webhook ingestion.
//!
//! Verification happens over the exact raw request bytes before any JSON
//! parsing. Everything after the signature check is best-effort: a payload
//! that yields no candidate flows still gets a 200 summary.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use docflow_core::{defaults, Error, Result};

use crate::handlers::ApiError;
use crate::services::payload::{extract_refs, PayloadRefs};
use crate::services::status::StatusResolver;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Liveness probe. No body processing.
pub async fn probe() -> StatusCode {
    StatusCode::OK
}

/// Best-effort ingestion summary. Field names follow the wire contract the
/// external service's delivery log expects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSummary {
    pub ok: bool,
    pub signature_checked: bool,
    pub room_ids: Vec<String>,
    pub folder_ids: Vec<String>,
    pub file_ids: Vec<String>,
    pub flows_considered: usize,
}

pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<WebhookSummary>, ApiError> {
    let signature_checked = match &state.webhook_secret {
        Some(secret) => {
            verify_signature(secret, &headers, &body)?;
            true
        }
        None => {
            debug!("no webhook secret configured, accepting unsigned payload");
            false
        }
    };

    let refs = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => extract_refs(&value),
        Err(e) => {
            warn!(error = %e, "webhook body is not valid JSON, skipping resolution");
            PayloadRefs::default()
        }
    };

    let candidates = state
        .store
        .find_trackable_flows(&refs.room_ids, &refs.file_ids)
        .await;
    let flows_considered = candidates.len();
    if !candidates.is_empty() {
        let resolver = StatusResolver::new(state.store.clone(), state.service.clone());
        let transitioned = resolver.resolve_all(&candidates).await;
        info!(flows_considered, transitioned, "webhook resolution finished");
    }

    Ok(Json(WebhookSummary {
        ok: true,
        signature_checked,
        room_ids: refs.room_ids,
        folder_ids: refs.folder_ids,
        file_ids: refs.file_ids,
        flows_considered,
    }))
}

/// Constant-time verification of a `sha256=<hex>` signature over the exact
/// raw body bytes.
fn verify_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let header = headers
        .get(defaults::WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Signature("missing signature header".to_string()))?;
    let hex_part = header
        .strip_prefix("sha256=")
        .ok_or_else(|| Error::Signature("malformed signature header".to_string()))?;
    let received = hex::decode(hex_part)
        .map_err(|_| Error::Signature("signature is not valid hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Signature("invalid secret".to_string()))?;
    mac.update(body);
    mac.verify_slice(&received)
        .map_err(|_| Error::Signature("signature mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn headers_with(sig: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            defaults::WEBHOOK_SIGNATURE_HEADER,
            HeaderValue::from_str(sig).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"roomId":"R1"}"#;
        let headers = headers_with(&sign("secret", body));
        assert!(verify_signature("secret", &headers, body).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signed = br#"{"roomId":"R1"}"#;
        let headers = headers_with(&sign("secret", signed));
        let tampered = br#"{"roomId":"R2"}"#;
        assert!(verify_signature("secret", &headers, tampered).is_err());
    }

    #[test]
    fn test_missing_header_rejected() {
        let headers = HeaderMap::new();
        assert!(verify_signature("secret", &headers, b"{}").is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        let headers = headers_with("md5=abcdef");
        assert!(verify_signature("secret", &headers, b"{}").is_err());
        let headers = headers_with("sha256=not-hex");
        assert!(verify_signature("secret", &headers, b"{}").is_err());
    }
}
