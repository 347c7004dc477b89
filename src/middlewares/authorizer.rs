use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    HttpMessage,
};
use sqlx::{query_scalar, PgPool};
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::task::Poll;

use crate::context::UserInfo;

/// Gates a scope behind a boolean SQL predicate evaluated against the
/// authenticated user id. Must be mounted beneath the `Jwt` middleware.
pub struct Author {
    db: PgPool,
    sql_stmt: String,
}

impl Author {
    pub fn new(db: PgPool, sql_stmt: &str) -> Self {
        Self {
            db,
            sql_stmt: sql_stmt.into(),
        }
    }
}

impl<S> Transform<S, ServiceRequest> for Author
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = actix_web::Error>,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type InitError = ();
    type Transform = AuthorMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthorMiddleware {
            db: self.db.clone(),
            sql_stmt: self.sql_stmt.clone(),
            service,
        }))
    }
}

pub struct AuthorMiddleware<S> {
    db: PgPool,
    sql_stmt: String,
    service: S,
}

impl<S> Service<ServiceRequest> for AuthorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = actix_web::Error>,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<ServiceResponse, Self::Error>>>>;
    fn poll_ready(&self, _: &mut core::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user_info = req.extensions().get::<UserInfo>().cloned();
        if let Some(user_info) = user_info {
            let uid = user_info.id;
            let stmt = self.sql_stmt.clone();
            let db = self.db.clone();
            let next = self.service.call(req);
            return Box::pin(async move {
                let allowed = match query_scalar::<sqlx::Postgres, bool>(&stmt).bind(uid).fetch_one(&db).await {
                    Ok(allowed) => allowed,
                    Err(err) => return Err(ErrorInternalServerError(err)),
                };
                if !allowed {
                    return Err(ErrorForbidden("forbidden"));
                }
                next.await
            });
        }
        Box::pin(async move { Err(ErrorUnauthorized("unauthorized")) })
    }
}
