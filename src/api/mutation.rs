// Shared plumbing for backoffice and recipe writes: idempotency replay,
// per-record conflict detection, and notification-shaped responses.

use actix_web::{http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use serde_json::{json, Value};
use std::future::Future;

use crate::api::metrics;
use crate::models::Notification;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::RecordedOutcome;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
pub const REPLAYED_HEADER: &str = "Idempotent-Replayed";

/// Successful mutation outcome
pub struct Mutated {
    pub status: StatusCode,
    pub body: Value,
}

impl Mutated {
    pub fn ok(notification: Notification, extra: Value) -> Self {
        Mutated {
            status: StatusCode::OK,
            body: body_with(notification, extra),
        }
    }

    pub fn created(notification: Notification, extra: Value) -> Self {
        Mutated {
            status: StatusCode::CREATED,
            body: body_with(notification, extra),
        }
    }
}

fn body_with(notification: Notification, extra: Value) -> Value {
    let mut body = json!({ "success": true, "notification": notification });
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    body
}

/// Error response carrying the generic destructive notification
pub fn failure(error: &AppError, action: &str) -> HttpResponse {
    HttpResponse::build(error.status_code()).json(json!({
        "success": false,
        "error": error.to_string(),
        "notification": error.notification(action),
    }))
}

fn idempotency_key(req: &HttpRequest) -> Option<String> {
    let key = req.headers().get(IDEMPOTENCY_HEADER)?.to_str().ok()?.trim();
    if key.is_empty() {
        return None;
    }
    Some(format!("{} {} {}", req.method(), req.path(), key))
}

/// Runs a write against `record` (`<collection>/<id>`).
///
/// A repeated `Idempotency-Key` replays the first successful outcome. A second
/// write to the same record while one is in flight gets 409.
/// `op` is not polled when the request is replayed or rejected.
pub async fn run<Fut>(
    state: &AppState,
    req: &HttpRequest,
    record: &str,
    action: &str,
    op: Fut,
) -> HttpResponse
where
    Fut: Future<Output = Result<Mutated, AppError>>,
{
    let key = idempotency_key(req);

    if let Some(outcome) = key.as_deref().and_then(|k| state.mutations.replay(k)) {
        log::info!("♻️  Replaying {} for {}", action, record);
        metrics::increment_replay_count();
        let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::OK);
        return HttpResponse::build(status)
            .insert_header((REPLAYED_HEADER, "true"))
            .json(outcome.body);
    }

    let permit = match state.mutations.acquire(record) {
        Ok(permit) => permit,
        Err(e) => {
            metrics::increment_conflict_count();
            return failure(&e, action);
        }
    };

    let result = op.await;
    drop(permit);

    match result {
        Ok(mutated) => {
            if let Some(key) = key {
                state.mutations.record(
                    &key,
                    RecordedOutcome {
                        status: mutated.status.as_u16(),
                        body: mutated.body.clone(),
                    },
                );
            }
            HttpResponse::build(mutated.status).json(mutated.body)
        }
        Err(e) => {
            log::error!("❌ Failed to {} ({}): {}", action, record, e);
            failure(&e, action)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_merges_extra_fields() {
        let body = body_with(Notification::success("Saved", "ok"), json!({ "updated": true }));
        assert_eq!(body["success"], true);
        assert_eq!(body["updated"], true);
        assert_eq!(body["notification"]["title"], "Saved");
    }

    #[test]
    fn test_failure_uses_generic_notice() {
        let res = failure(&AppError::NotFound("user 9".into()), "delete user");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
