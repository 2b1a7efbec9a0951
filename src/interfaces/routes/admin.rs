use actix_web::web;

use crate::handlers::{admin_blog, admin_portfolio, admin_resume, admin_site};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(blog_routes)
        .configure(portfolio_routes)
        .configure(resume_routes)
        .configure(site_routes);
}

fn blog_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/blog")
            .service(
                web::resource("/posts")
                    .route(web::get().to(admin_blog::list_posts))
                    .route(web::post().to(admin_blog::create_post)),
            )
            .service(
                web::resource("/posts/{post_id}")
                    .route(web::get().to(admin_blog::get_post))
                    .route(web::patch().to(admin_blog::update_post))
                    .route(web::delete().to(admin_blog::delete_post)),
            )
            .service(
                web::resource("/categories")
                    .route(web::get().to(admin_blog::list_categories))
                    .route(web::post().to(admin_blog::create_category)),
            )
            .service(web::resource("/categories/{id}").route(web::delete().to(admin_blog::delete_category)))
            .service(
                web::resource("/tags")
                    .route(web::get().to(admin_blog::list_tags))
                    .route(web::post().to(admin_blog::create_tag)),
            )
            .service(web::resource("/tags/{id}").route(web::delete().to(admin_blog::delete_tag)))
            .service(web::resource("/comments").route(web::get().to(admin_blog::list_comments)))
            .service(
                web::resource("/comments/{id}")
                    .route(web::patch().to(admin_blog::moderate_comment))
                    .route(web::delete().to(admin_blog::delete_comment)),
            ),
    );
}

fn portfolio_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/portfolio")
            .service(
                web::resource("/projects")
                    .route(web::get().to(admin_portfolio::list_projects))
                    .route(web::post().to(admin_portfolio::create_project)),
            )
            .service(
                web::resource("/projects/{id}")
                    .route(web::get().to(admin_portfolio::get_project))
                    .route(web::patch().to(admin_portfolio::update_project))
                    .route(web::delete().to(admin_portfolio::delete_project)),
            )
            .service(web::resource("/projects/{id}/writeup").route(web::post().to(admin_portfolio::upload_writeup)))
            .service(
                web::resource("/projects/{id}/features")
                    .route(web::get().to(admin_portfolio::list_features))
                    .route(web::post().to(admin_portfolio::add_feature)),
            )
            .service(
                web::resource("/projects/{id}/images")
                    .route(web::get().to(admin_portfolio::list_images))
                    .route(web::post().to(admin_portfolio::add_image)),
            )
            .service(
                web::resource("/projects/{id}/images/upload").route(web::post().to(admin_portfolio::upload_image)),
            )
            .service(web::resource("/features/{id}").route(web::delete().to(admin_portfolio::delete_feature)))
            .service(web::resource("/images/{id}").route(web::delete().to(admin_portfolio::delete_image)))
            .service(
                web::resource("/categories")
                    .route(web::get().to(admin_portfolio::list_categories))
                    .route(web::post().to(admin_portfolio::create_category)),
            )
            .service(web::resource("/categories/{id}").route(web::delete().to(admin_portfolio::delete_category)))
            .service(
                web::resource("/technologies")
                    .route(web::get().to(admin_portfolio::list_technologies))
                    .route(web::post().to(admin_portfolio::create_technology)),
            )
            .service(
                web::resource("/technologies/{id}").route(web::delete().to(admin_portfolio::delete_technology)),
            ),
    );
}

fn resume_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/resume")
            .service(web::resource("/cv").route(web::post().to(admin_resume::upload_cv)))
            .service(
                web::resource("/{section}")
                    .route(web::get().to(admin_resume::list_section))
                    .route(web::post().to(admin_resume::create_entry)),
            )
            .service(
                web::resource("/{section}/{id}")
                    .route(web::put().to(admin_resume::update_entry))
                    .route(web::delete().to(admin_resume::delete_entry)),
            ),
    );
}

fn site_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/contacts").route(web::get().to(admin_site::list_contacts)))
        .service(web::resource("/contacts/{id}").route(web::delete().to(admin_site::delete_contact)))
        .service(web::resource("/security/events").route(web::get().to(admin_site::list_events)))
        .service(web::resource("/security/check").route(web::get().to(admin_site::configuration_check)))
        .service(
            web::resource("/rate-limits/{ip}")
                .route(web::get().to(admin_site::rate_limit_status))
                .route(web::delete().to(admin_site::clear_rate_limits)),
        );
}
