pub mod auth;
pub mod backoffice_recipes;
pub mod backoffice_users;
pub mod health;
pub mod metrics;
pub mod mutation;
pub mod recipes;
pub mod roles;
pub mod swagger;

use actix_web::web;

use crate::middleware::AuthMiddleware;

/// Registers every route. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth endpoints
        .service(
            web::scope("/api/v1/auth")
                .route("/login", web::post().to(auth::login))
                .route("/register", web::post().to(auth::register))
                .route("/refresh", web::post().to(auth::refresh_token))
                .route("/verification/confirm", web::get().to(auth::confirm_verification))
                .service(
                    web::scope("")
                        .wrap(AuthMiddleware::authenticated())
                        .route("/logout", web::post().to(auth::logout))
                        .route("/session", web::get().to(auth::session))
                        .route("/verification/resend", web::post().to(auth::resend_verification)),
                ),
        )
        // Recipes: reads are public, writes need a session
        .service(
            web::scope("/api/v1/recipes")
                .route("", web::get().to(recipes::list_recipes))
                .route("/creation-options", web::get().to(recipes::creation_options))
                .route("/tags", web::get().to(recipes::tag_options))
                .service(
                    web::resource("")
                        .wrap(AuthMiddleware::authenticated())
                        .route(web::post().to(recipes::create_recipe)),
                )
                .service(
                    web::resource("/import/url")
                        .wrap(AuthMiddleware::authenticated())
                        .route(web::post().to(recipes::import_from_url)),
                )
                .service(
                    web::resource("/import")
                        .wrap(AuthMiddleware::authenticated())
                        .route(web::post().to(recipes::import_partial)),
                )
                .service(
                    web::resource("/invites/accept")
                        .wrap(AuthMiddleware::authenticated())
                        .route(web::post().to(recipes::accept_invite)),
                )
                // catch-all, keep last
                .route("/{id}", web::get().to(recipes::get_recipe)),
        )
        // Backoffice: admin and superadmin only
        .service(
            web::scope("/api/v1/backoffice")
                .wrap(AuthMiddleware::admin())
                .route("/users", web::get().to(backoffice_users::list_users))
                .route("/users/invite", web::post().to(backoffice_users::invite_users))
                .route("/users/{id}", web::delete().to(backoffice_users::delete_user))
                .route("/users/{id}/name", web::patch().to(backoffice_users::rename_user))
                .route("/users/{id}/role", web::patch().to(backoffice_users::change_role))
                .route("/users/{id}/undo-delete", web::post().to(backoffice_users::undo_delete_user))
                .route("/users/{id}/message", web::post().to(backoffice_users::message_user))
                .route("/users/{id}/toggle-expand", web::post().to(backoffice_users::toggle_expand))
                .route("/recipes", web::get().to(backoffice_recipes::list_recipes))
                .route("/recipes/{id}", web::patch().to(backoffice_recipes::update_recipe))
                .route("/recipes/{id}", web::delete().to(backoffice_recipes::delete_recipe))
                .route("/recipes/{id}/invites", web::post().to(backoffice_recipes::invite_to_recipe))
                .route("/recipes/{id}/toggle-expand", web::post().to(backoffice_recipes::toggle_expand))
                .route("/roles", web::get().to(roles::list_roles))
                .route("/roles", web::post().to(roles::add_role))
                .route("/roles/{role}", web::put().to(roles::rename_role)),
        );
}
