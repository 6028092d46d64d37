use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static CONFLICT_COUNT: AtomicU64 = AtomicU64::new(0);
static REPLAY_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_conflict_count() {
    CONFLICT_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_replay_count() {
    REPLAY_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub mutation_conflicts_total: u64,
    pub idempotent_replays_total: u64,
}

impl MetricsResponse {
    pub fn snapshot() -> Self {
        MetricsResponse {
            http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            mutation_conflicts_total: CONFLICT_COUNT.load(Ordering::Relaxed),
            idempotent_replays_total: REPLAY_COUNT.load(Ordering::Relaxed),
        }
    }

    fn to_prometheus(&self) -> String {
        [
            ("http_requests_total", "Total number of HTTP requests", self.http_requests_total),
            ("http_errors_total", "Total number of HTTP error responses", self.http_errors_total),
            ("mutation_conflicts_total", "Writes rejected because the record was busy", self.mutation_conflicts_total),
            ("idempotent_replays_total", "Writes answered from the idempotency ledger", self.idempotent_replays_total),
        ]
        .iter()
        .map(|(name, help, value)| {
            format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n",
                name = name,
                help = help,
                value = value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Service counters in Prometheus text format", body = MetricsResponse)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::snapshot().to_prometheus())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_text_lists_every_counter() {
        let text = MetricsResponse {
            http_requests_total: 3,
            http_errors_total: 1,
            mutation_conflicts_total: 0,
            idempotent_replays_total: 2,
        }
        .to_prometheus();

        assert!(text.contains("http_requests_total 3\n"));
        assert!(text.contains("# TYPE mutation_conflicts_total counter"));
        assert!(text.contains("idempotent_replays_total 2\n"));
    }
}
