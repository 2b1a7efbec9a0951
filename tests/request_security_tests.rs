mod common;

use actix_web::{http::StatusCode, test, web, App, HttpResponse};
use serde_json::Value;

use common::TestSecurity;
use portfolio_site::{
    entities::security_event::{SecurityEventType, Severity},
    middlewares::{
        auth::AuthMiddleware, block_suspicious::BlockSuspicious, rate_limit::RateLimit,
        security_headers::SecurityHeaders, security_logging::SecurityLogging,
    },
    settings::{test_config, AppEnvironment, RateRule},
};

async fn ok() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

#[actix_web::test]
async fn requests_over_the_limit_get_429_and_an_audit_event() {
    let mut config = test_config();
    config.rate_limits.general = RateRule { max_requests: 2, window_secs: 60 };
    let harness = TestSecurity::with_config(config);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(RateLimit)
            .route("/blog", web::get().to(ok)),
    )
    .await;

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/blog")
            .insert_header(("X-Forwarded-For", "203.0.113.9"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/blog")
        .insert_header(("X-Forwarded-For", "203.0.113.9"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let events = harness.events.of_type(SecurityEventType::RateLimit);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, Severity::Medium);
    assert_eq!(events[0].ip_address, "203.0.113.9");
    assert_eq!(events[0].description, "Rate limit exceeded on /blog (2/2 requests)");

    // Another client still has its own window.
    let req = test::TestRequest::get()
        .uri("/blog")
        .insert_header(("X-Forwarded-For", "198.51.100.4"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn scanner_user_agents_are_blocked_and_logged() {
    let harness = TestSecurity::new();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(BlockSuspicious)
            .route("/", web::get().to(ok)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("User-Agent", "sqlmap/1.7.2#stable"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Access denied - Malicious user agent detected");

    let scans = harness.events.of_type(SecurityEventType::SecurityScan);
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].severity, Severity::High);
}

#[actix_web::test]
async fn sql_injection_in_the_query_is_blocked() {
    let harness = TestSecurity::new();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(BlockSuspicious)
            .route("/blog", web::get().to(ok)),
    )
    .await;

    let req = test::TestRequest::get().uri("/blog?q=1%20UNION%20SELECT%20password").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get().uri("/blog?q=rust+unions").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let events = harness.events.of_type(SecurityEventType::SuspiciousRequest);
    assert_eq!(events.len(), 1);
    assert!(events[0].description.starts_with("SQL injection attempt detected"));
}

#[actix_web::test]
async fn development_mode_lets_suspicious_gets_through() {
    let mut config = test_config();
    config.env = AppEnvironment::Development;
    let harness = TestSecurity::with_config(config);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(BlockSuspicious)
            .route("/", web::get().to(ok)),
    )
    .await;

    let req = test::TestRequest::get().uri("/").insert_header(("User-Agent", "Nikto")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(harness.events.all().is_empty());
}

#[actix_web::test]
async fn security_headers_are_added_to_every_response() {
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::new(false))
            .route("/", web::get().to(ok)),
    )
    .await;

    for uri in ["/", "/missing"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let headers = resp.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.contains_key("content-security-policy"));
        assert!(headers.contains_key("referrer-policy"));
    }
}

#[actix_web::test]
async fn staff_routes_require_an_admin_token() {
    let harness = TestSecurity::new();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(AuthMiddleware)
            .route("/admin/blog/posts", web::get().to(ok))
            .route("/admin/auth/login", web::post().to(ok))
            .route("/security-dashboard", web::get().to(ok))
            .route("/blog", web::get().to(ok)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/admin/blog/posts").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let visitor = harness.token_for(false);
    let req = test::TestRequest::get()
        .uri("/security-dashboard")
        .insert_header(("Authorization", format!("Bearer {visitor}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let admin = harness.token_for(true);
    let req = test::TestRequest::get()
        .uri("/admin/blog/posts")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/admin/auth/login").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn admin_access_and_suspicious_patterns_are_logged_not_blocked() {
    let harness = TestSecurity::new();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(SecurityLogging)
            .route("/admin/contacts", web::get().to(ok))
            .route("/media/{key:.*}", web::get().to(ok)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/admin/contacts").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/media/a?x=%3Cscript%3E").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let admin = harness.events.of_type(SecurityEventType::AdminAccess);
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].description, "Admin panel access: /admin/contacts");

    let suspicious = harness.events.of_type(SecurityEventType::SuspiciousRequest);
    assert_eq!(suspicious.len(), 1);
    assert_eq!(suspicious[0].severity, Severity::Medium);
}

#[actix_web::test]
async fn percent_encoded_admin_paths_get_the_admin_treatment() {
    let mut config = test_config();
    config.rate_limits.admin = RateRule { max_requests: 1, window_secs: 60 };
    let harness = TestSecurity::with_config(config);
    let admin = harness.token_for(true);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.security.clone()))
            .wrap(AuthMiddleware)
            .wrap(SecurityLogging)
            .wrap(RateLimit)
            .route("/admin/contacts", web::get().to(ok)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/%61dmin/contacts").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let admin_events = harness.events.of_type(SecurityEventType::AdminAccess);
    assert_eq!(admin_events.len(), 1);
    assert_eq!(admin_events[0].description, "Admin panel access: /admin/contacts");

    // The first request used up the admin allowance.
    let req = test::TestRequest::get()
        .uri("/%61dmin/contacts")
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::TOO_MANY_REQUESTS);

    let limited = harness.events.of_type(SecurityEventType::RateLimit);
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].description, "Rate limit exceeded on /admin/contacts (1/1 requests)");
}
