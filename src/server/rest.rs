//! `/signup`, `/login` and `/users`

use crate::auth::{AuthError, AuthService};
use crate::server::{detail_reply, with_state};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::error;
use warp::http::StatusCode;
use warp::{Filter, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Body of `/signup` and `/login`
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct UserOut {
    email: String,
}

pub fn rest_routes(
    auth: AuthService,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::path("signup")
        .and(warp::path::end())
        .and(warp::post())
        .and(credentials())
        .and(with_state(auth.clone()))
        .and_then(handle_signup);

    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(credentials())
        .and(with_state(auth.clone()))
        .and_then(handle_login);

    let users = warp::path("users")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(auth))
        .and_then(handle_list_users);

    signup.or(login).or(users)
}

fn credentials() -> impl Filter<Extract = (Credentials,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

async fn handle_signup(
    body: Credentials,
    auth: AuthService,
) -> Result<warp::reply::Response, Infallible> {
    Ok(match auth.signup(&body.email, &body.password).await {
        Ok(user) => warp::reply::json(&UserOut { email: user.email }).into_response(),
        Err(AuthError::EmailAlreadyRegistered) => {
            detail_reply(StatusCode::BAD_REQUEST, "Email already registered")
        }
        Err(e) => internal_error("signup", e),
    })
}

async fn handle_login(
    body: Credentials,
    auth: AuthService,
) -> Result<warp::reply::Response, Infallible> {
    Ok(match auth.login(&body.email, &body.password).await {
        Ok(token) => warp::reply::json(&token).into_response(),
        Err(AuthError::InvalidCredentials) => {
            detail_reply(StatusCode::BAD_REQUEST, "Invalid credentials")
        }
        Err(e) => internal_error("login", e),
    })
}

async fn handle_list_users(auth: AuthService) -> Result<warp::reply::Response, Infallible> {
    Ok(match auth.users().list().await {
        Ok(users) if users.is_empty() => detail_reply(StatusCode::NOT_FOUND, "No users found"),
        Ok(users) => {
            let body: Vec<UserOut> = users
                .into_iter()
                .map(|user| UserOut { email: user.email })
                .collect();
            warp::reply::json(&body).into_response()
        }
        Err(e) => internal_error("list users", AuthError::from(e)),
    })
}

fn internal_error(operation: &str, e: AuthError) -> warp::reply::Response {
    error!(operation, error = %e, "Request failed");
    detail_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
