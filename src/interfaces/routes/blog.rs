use actix_web::web;

use crate::handlers::blog;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/blog")
            .service(web::resource("").route(web::get().to(blog::list_posts)))
            .service(web::resource("/search").route(web::get().to(blog::search_posts)))
            .service(web::resource("/{slug}").route(web::get().to(blog::post_detail)))
            .service(web::resource("/{slug}/comments").route(web::post().to(blog::add_comment)))
            .service(web::resource("/{slug}/like").route(web::post().to(blog::vote))),
    );
}
