// Copyright 2023 Remi Bernotavicius

use super::error::ApiError;
use super::AppState;
use crate::database;
use crate::database::models::{AuthToken, User, UserId};
use crate::query;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest as _, Sha256};

const TOKEN_SCHEME: &str = "Token ";

fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    format!("{:x}", hasher.finalize())
}

/// Stored as `salt$digest`.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let digest = sha256_hex(&[salt.as_bytes(), password.as_bytes()]);
    format!("{salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    sha256_hex(&[salt.as_bytes(), password.as_bytes()]) == digest
}

pub fn token_digest(token: &str) -> String {
    sha256_hex(&[token.as_bytes()])
}

/// Creates a token for the user and returns it. Only its digest is kept.
pub fn issue_token(conn: &mut database::Connection, user_id: UserId) -> diesel::QueryResult<String> {
    let token = uuid::Uuid::new_v4().simple().to_string();
    query::insert_token(
        conn,
        &AuthToken {
            digest: token_digest(&token),
            user_id,
            created_at: chrono::Utc::now().naive_utc(),
        },
    )?;
    Ok(token)
}

fn bearer(parts: &Parts) -> Result<Option<String>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidToken)?;
    let token = value
        .strip_prefix(TOKEN_SCHEME)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::InvalidToken)?;
    Ok(Some(token.to_owned()))
}

/// The requesting user, if the request carries a token. A token that does not match any user is
/// rejected rather than treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.id)
    }
}

/// A request that must be authenticated.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_digest: String,
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, ApiError> {
    let Some(token) = bearer(parts)? else {
        return Ok(None);
    };
    let digest = token_digest(&token);
    let lookup = digest.clone();
    let user = state
        .run(move |conn| Ok(query::user_for_token(conn, &lookup)?))
        .await?
        .ok_or(ApiError::InvalidToken)?;
    Ok(Some(AuthUser {
        user,
        token_digest: digest,
    }))
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).await?.map(|a| a.user)))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}

#[test]
fn password_round_trip() {
    let stored = hash_password("hunter2");
    assert!(verify_password("hunter2", &stored));
    assert!(!verify_password("hunter3", &stored));
    assert_ne!(stored, hash_password("hunter2"));
    assert!(!verify_password("hunter2", "garbage"));
}

#[test]
fn issued_token_resolves_to_user() {
    let pool = database::test_pool();
    let mut conn = pool.get().unwrap();

    let alice = query::tests::user(&mut conn, "alice");
    let token = issue_token(&mut conn, alice.id).unwrap();
    let found = query::user_for_token(&mut conn, &token_digest(&token))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, alice.id);
    assert!(query::user_for_token(&mut conn, &token).unwrap().is_none());
}
