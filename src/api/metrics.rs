use actix_web::HttpResponse;
use std::sync::atomic::{AtomicU64, Ordering};

static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static CREDITS_GRANTED: AtomicU64 = AtomicU64::new(0);
static CREDITS_DEBITED: AtomicU64 = AtomicU64::new(0);
static DEBITS_REJECTED: AtomicU64 = AtomicU64::new(0);
static WEBHOOK_EVENTS: AtomicU64 = AtomicU64::new(0);
static WEBHOOK_DUPLICATES: AtomicU64 = AtomicU64::new(0);
static GENERATIONS: AtomicU64 = AtomicU64::new(0);
static GENERATIONS_FAILED: AtomicU64 = AtomicU64::new(0);

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn add_credits_granted(amount: i64) {
    // Grants negativos (ajustes de admin) não entram no contador
    if amount > 0 {
        CREDITS_GRANTED.fetch_add(amount as u64, Ordering::Relaxed);
    }
}

pub fn add_credits_debited(amount: i64) {
    if amount > 0 {
        CREDITS_DEBITED.fetch_add(amount as u64, Ordering::Relaxed);
    }
}

pub fn increment_debits_rejected() {
    DEBITS_REJECTED.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_webhook_events() {
    WEBHOOK_EVENTS.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_webhook_duplicates() {
    WEBHOOK_DUPLICATES.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_generations() {
    GENERATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_generations_failed() {
    GENERATIONS_FAILED.fetch_add(1, Ordering::Relaxed);
}

struct MetricsSnapshot {
    http_errors_total: u64,
    credits_granted_total: u64,
    credits_debited_total: u64,
    credit_debits_rejected_total: u64,
    webhook_events_total: u64,
    webhook_duplicates_total: u64,
    generations_total: u64,
    generations_failed_total: u64,
}

fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
        credits_granted_total: CREDITS_GRANTED.load(Ordering::Relaxed),
        credits_debited_total: CREDITS_DEBITED.load(Ordering::Relaxed),
        credit_debits_rejected_total: DEBITS_REJECTED.load(Ordering::Relaxed),
        webhook_events_total: WEBHOOK_EVENTS.load(Ordering::Relaxed),
        webhook_duplicates_total: WEBHOOK_DUPLICATES.load(Ordering::Relaxed),
        generations_total: GENERATIONS.load(Ordering::Relaxed),
        generations_failed_total: GENERATIONS_FAILED.load(Ordering::Relaxed),
    }
}

fn render_prometheus(m: &MetricsSnapshot) -> String {
    let counters: [(&str, &str, u64); 8] = [
        ("http_errors_total", "Total number of HTTP error responses", m.http_errors_total),
        ("credits_granted_total", "Credits added to user balances", m.credits_granted_total),
        ("credits_debited_total", "Credits consumed from user balances", m.credits_debited_total),
        ("credit_debits_rejected_total", "Debits rejected for insufficient credits", m.credit_debits_rejected_total),
        ("webhook_events_total", "Verified payment webhook events received", m.webhook_events_total),
        ("webhook_duplicates_total", "Payment webhook deliveries already processed", m.webhook_duplicates_total),
        ("generations_total", "Image generations started (credit reserved)", m.generations_total),
        ("generations_failed_total", "Failed image generations (credit refunded)", m.generations_failed_total),
    ];

    counters
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

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus counters (text format)", body = String)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render_prometheus(&snapshot()))
}
