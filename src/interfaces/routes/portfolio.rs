use actix_web::web;

use crate::handlers::portfolio;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/portfolio")
            .service(web::resource("").route(web::get().to(portfolio::list_projects)))
            .service(web::resource("/filter").route(web::get().to(portfolio::filter_projects)))
            .service(web::resource("/{slug}").route(web::get().to(portfolio::project_detail)))
            .service(web::resource("/{slug}/writeup").route(web::get().to(portfolio::download_writeup))),
    );
}
