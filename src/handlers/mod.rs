pub mod choice;
pub mod question;
pub mod vote;

use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{Cookie, CookieBuilder};
use actix_web::http::StatusCode;
use actix_web::web::{Data, Json};
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar, PgPool};

use crate::auth::{self, Claims, JWT_SECRET, JWT_TOKEN};
use crate::error::Error;
use crate::models::user::User;

/// Group every fresh account is enrolled into.
pub static DEFAULT_GROUP: &str = "voters";

fn issue_session(uid: i32) -> Result<HttpResponse, Error> {
    let secret = dotenv::var(JWT_SECRET)?;
    let token = auth::gen_token(secret.as_bytes(), &Claims::for_user(uid))?;
    Ok(HttpResponse::build(StatusCode::OK).cookie(Cookie::new(JWT_TOKEN, token)).finish())
}

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

pub async fn login(Json(Login { username, password }): Json<Login>, db: Data<PgPool>) -> Result<HttpResponse, Error> {
    let mut conn = db.acquire().await?;
    let user = query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&username)
        .fetch_optional(&mut conn)
        .await?
        .ok_or(Error::Unauthenticated)?;
    if auth::hash_password(&password, &user.salt) != user.password {
        return Err(Error::Unauthenticated);
    }
    issue_session(user.id)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub username: String,
    pub password: String,
}

pub async fn signup(Json(Signup { username, password }): Json<Signup>, db: Data<PgPool>) -> Result<HttpResponse, Error> {
    let username = username.trim().to_owned();
    if username.is_empty() {
        return Err(Error::Validation("username must not be empty".into()));
    }
    if password.is_empty() {
        return Err(Error::Validation("password must not be empty".into()));
    }
    let mut tx = db.begin().await?;
    let taken: bool = query_scalar("SELECT EXISTS(SELECT id FROM users WHERE username = $1)")
        .bind(&username)
        .fetch_one(&mut tx)
        .await?;
    if taken {
        return Err(Error::Validation("username already taken".into()));
    }
    let salt = auth::random_salt();
    let uid: i32 = query_scalar("INSERT INTO users (username, password, salt) VALUES ($1, $2, $3) RETURNING id")
        .bind(&username)
        .bind(auth::hash_password(&password, &salt))
        .bind(&salt)
        .fetch_one(&mut tx)
        .await?;
    query("INSERT INTO groups (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
        .bind(DEFAULT_GROUP)
        .execute(&mut tx)
        .await?;
    query("INSERT INTO users_groups (user_id, group_id) SELECT $1, id FROM groups WHERE name = $2")
        .bind(uid)
        .bind(DEFAULT_GROUP)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    issue_session(uid)
}

pub async fn logout() -> HttpResponse {
    HttpResponseBuilder::new(StatusCode::OK)
        .cookie(CookieBuilder::new(JWT_TOKEN, "").expires(OffsetDateTime::now_utc()).finish())
        .finish()
}
