use actix_web::web;

mod admin;
mod auth;
mod blog;
mod json_error;
mod portfolio;
mod site;

/// Public site routes plus the staff API under the configured admin prefix.
pub fn configure_routes(cfg: &mut web::ServiceConfig, admin_prefix: &str) {
    cfg.configure(json_error::config_routes);

    cfg.configure(site::config_routes)
        .configure(blog::config_routes)
        .configure(portfolio::config_routes);

    cfg.service(
        web::scope(admin_prefix)
            .configure(auth::config_routes)
            .configure(admin::config_routes),
    );
}
