pub mod auth;
pub mod context;
pub mod error;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod response;

use actix_web::web::{delete, get, post, resource, scope, ServiceConfig};
use sqlx::PgPool;

use middlewares::authorizer::Author;
use middlewares::jwt::Jwt;

/// Admin predicate for the management scope: superusers and members of any
/// staff group may author and edit polls.
pub static IS_ADMIN_STMT: &str = "SELECT EXISTS(
    SELECT u.id
    FROM users AS u
    LEFT JOIN users_groups AS ug ON u.id = ug.user_id
    LEFT JOIN groups AS g ON ug.group_id = g.id
    WHERE u.id = $1 AND (u.is_superuser OR g.is_staff))";

pub fn routes(pool: PgPool) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.service(resource("login").route(post().to(handlers::login)))
            .service(resource("signup").route(post().to(handlers::signup)))
            .service(resource("logout").route(post().to(handlers::logout)))
            .service(
                scope("")
                    .wrap(Jwt)
                    .service(
                        scope("questions")
                            .route("", get().to(handlers::question::list))
                            .route("{question_id}", get().to(handlers::question::detail))
                            .route("{question_id}/results", get().to(handlers::question::results))
                            .route("{question_id}/votes", post().to(handlers::vote::cast)),
                    )
                    .service(
                        scope("manage")
                            .wrap(Author::new(pool.clone(), IS_ADMIN_STMT))
                            .route("questions", post().to(handlers::question::create))
                            .route("questions/{question_id}", delete().to(handlers::question::delete_question))
                            .route("questions/{question_id}/choices", post().to(handlers::choice::add))
                            .route("choices/{choice_id}", delete().to(handlers::choice::delete_choice)),
                    ),
            );
    }
}
