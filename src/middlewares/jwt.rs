use actix_web::{
    dev::{Service, ServiceRequest, Transform},
    error::{ErrorInternalServerError, ErrorUnauthorized},
    Error, HttpMessage,
};
use std::future::{ready, Future, Ready};
use std::pin::Pin;

use crate::auth::{self, JWT_SECRET, JWT_TOKEN};
use crate::context::UserInfo;

/// Decodes the session token and stashes the caller's identity in the request
/// extensions for the `UserInfo` extractor.
pub struct Jwt;

impl<S> Transform<S, ServiceRequest> for Jwt
where
    S: Service<ServiceRequest, Error = Error>,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = Error;
    type Transform = JwtService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtService { service }))
    }
}

pub struct JwtService<S> {
    service: S,
}

fn token_from_request(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(JWT_TOKEN) {
        return Some(cookie.value().to_owned());
    }
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("Bearer ").to_owned())
}

impl<S> Service<ServiceRequest> for JwtService<S>
where
    S: Service<ServiceRequest, Error = Error>,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut core::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match token_from_request(&req) {
            Some(token) => token,
            None => return Box::pin(async move { Err(ErrorUnauthorized("no token in request")) }),
        };
        let secret = match dotenv::var(JWT_SECRET) {
            Ok(secret) => secret,
            Err(_) => return Box::pin(async move { Err(ErrorInternalServerError("internal server error")) }),
        };
        match auth::verify_token(secret.as_bytes(), &token) {
            Ok(claims) => {
                req.extensions_mut().insert(UserInfo { id: claims.uid });
            }
            Err(_) => return Box::pin(async move { Err(ErrorUnauthorized("unauthorized")) }),
        }
        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}
