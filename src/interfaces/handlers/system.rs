use actix_web::{web, HttpResponse, Responder};
use chrono::{Duration as ChronoDuration, Utc};
use humantime::format_duration;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};
use sysinfo::System;

use crate::{constants::START_TIME, AppState};

/// Health reports are rebuilt at most this often.
const HEALTH_CACHE_SECS: i64 = 5;

#[derive(Serialize, Clone, Default)]
struct SystemInfo {
    os: String,
    kernel: String,
    hostname: String,
    cpu_count: usize,
    memory_total: String,
}

#[derive(Serialize, Clone, Default)]
struct HealthCheckResponse {
    status: String,
    uptime: String,
    timestamp: String,
    start_at: String,
    database: String,
    cache: String,
    cache_backend: String,
    media_backend: String,
    version: String,
    memory_usage: String,
    system: SystemInfo,
}

static LAST_CHECK: AtomicI64 = AtomicI64::new(0);
static CACHED_STATUS: Lazy<RwLock<HealthCheckResponse>> = Lazy::new(|| RwLock::new(HealthCheckResponse::default()));

async fn build_health_response(state: &AppState) -> HealthCheckResponse {
    let now_utc = Utc::now();
    let uptime_secs = now_utc.signed_duration_since(*START_TIME).num_seconds().max(0) as u64;

    let mut sys = System::new_all();
    sys.refresh_all();

    let system_info = SystemInfo {
        os: System::name().unwrap_or_else(|| "Unknown".to_string()),
        kernel: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
        hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        cpu_count: sys.cpus().len(),
        memory_total: format!("{:.2} GB", sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0),
    };

    let database = match state.repos.users.check_connection().await {
        Ok(_) => "OK",
        Err(e) => {
            tracing::error!("Health check database probe failed: {}", e);
            "Unavailable"
        }
    };

    let cache = match state.counters.ping().await {
        Ok(_) => "OK",
        Err(e) => {
            tracing::error!("Health check cache probe failed: {}", e);
            "Unavailable"
        }
    };

    let memory_usage = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid).map(|p| format!("{:.2} MB", p.memory() as f64 / 1024.0 / 1024.0)))
        .unwrap_or_else(|| "Unknown".to_string());

    let status = if database == "OK" && cache == "OK" { "healthy" } else { "degraded" };

    HealthCheckResponse {
        status: status.to_string(),
        uptime: format_duration(Duration::from_secs(uptime_secs)).to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        database: database.to_string(),
        cache: cache.to_string(),
        cache_backend: if state.config.redis_url.is_some() { "redis" } else { "in-memory" }.to_string(),
        media_backend: state.media.backend_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        memory_usage,
        system: system_info,
    }
}

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let now = Utc::now().timestamp();
    let last = LAST_CHECK.load(Ordering::Relaxed);

    let response = if now - last > HEALTH_CACHE_SECS {
        let fresh = build_health_response(&state).await;
        *CACHED_STATUS.write() = fresh.clone();
        LAST_CHECK.store(now, Ordering::Relaxed);
        fresh
    } else {
        CACHED_STATUS.read().clone()
    };

    if response.status == "healthy" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub fn robots_body(site_url: &str) -> String {
    format!(
        "User-agent: *\nDisallow: /admin/\nDisallow: /media/private/\nSitemap: {}/sitemap.xml\n",
        site_url.trim_end_matches('/')
    )
}

/// RFC 9116 disclosure file; `Expires` is always a year out.
pub fn security_txt_body(contact: &str, site_url: &str) -> String {
    let contact = if contact.contains(':') { contact.to_string() } else { format!("mailto:{contact}") };
    let expires = (Utc::now() + ChronoDuration::days(365)).format("%Y-%m-%dT%H:%M:%S.000Z");
    format!(
        "Contact: {contact}\nExpires: {expires}\nPreferred-Languages: en\nPolicy: {}/security-policy\n",
        site_url.trim_end_matches('/')
    )
}

pub async fn robots_txt(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(robots_body(&state.config.site_url))
}

pub async fn security_txt(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(security_txt_body(&state.config.security_contact, &state.config.site_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robots_points_at_the_sitemap() {
        let body = robots_body("https://example.com/");
        assert!(body.contains("Disallow: /media/private/"));
        assert!(body.ends_with("Sitemap: https://example.com/sitemap.xml\n"));
    }

    #[test]
    fn security_txt_has_contact_and_future_expiry() {
        let body = security_txt_body("security@example.com", "https://example.com");
        assert!(body.starts_with("Contact: mailto:security@example.com\n"));
        assert!(body.contains("Policy: https://example.com/security-policy"));

        let expires = body
            .lines()
            .find_map(|l| l.strip_prefix("Expires: "))
            .unwrap();
        let expires = chrono::DateTime::parse_from_rfc3339(expires).unwrap();
        assert!(expires > Utc::now());

        let linked = security_txt_body("https://example.com/report", "https://example.com");
        assert!(linked.starts_with("Contact: https://example.com/report\n"));
    }
}
