use actix_web::web;

use crate::handlers::{downloads, main_site, security_dashboard, system};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(main_site::home)))
        .service(web::resource("/about").route(web::get().to(main_site::about)))
        .service(web::resource("/resume").route(web::get().to(main_site::resume)))
        .service(web::resource("/resume/download").route(web::get().to(main_site::download_cv)))
        .service(
            web::resource("/contact")
                .route(web::get().to(main_site::contact_details))
                .route(web::post().to(main_site::submit_contact)),
        )
        .service(web::resource("/security-dashboard").route(web::get().to(security_dashboard::dashboard)))
        .service(
            web::resource("/security-dashboard/report.csv").route(web::get().to(security_dashboard::report_csv)),
        )
        .service(web::resource("/health").route(web::get().to(system::health_check)))
        .service(web::resource("/robots.txt").route(web::get().to(system::robots_txt)))
        .service(
            web::resource(["/security.txt", "/.well-known/security.txt"]).route(web::get().to(system::security_txt)),
        )
        .service(web::resource("/media/{key:.*}").route(web::get().to(downloads::serve_media)));
}
