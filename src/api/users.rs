// Copyright 2023 Remi Bernotavicius

use super::auth::{self, AuthUser, MaybeUser};
use super::error::{ApiError, Result};
use super::pagination::{query_param, PageRequest, Paginated};
use super::views::{
    NewUserWrite, RegisteredUserView, SetPasswordWrite, SubscriptionView, TokenLogin, TokenView,
    UserView,
};
use super::{AppState, Json};
use crate::database;
use crate::database::models::{NewUser, User, UserId};
use crate::query;
use crate::validate;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;

const BAD_CREDENTIALS: &str = "unable to log in with provided credentials";

fn require_user(conn: &mut database::Connection, id: UserId) -> Result<User> {
    query::get_user(conn, id)?.ok_or_else(|| ApiError::not_found(format!("user {id}")))
}

pub async fn register(
    State(state): State<AppState>,
    Json(write): Json<NewUserWrite>,
) -> Result<(StatusCode, Json<RegisteredUserView>)> {
    validate::email(&write.email)?;
    validate::username(&write.username)?;
    validate::alpha("first_name", &write.first_name)?;
    validate::alpha("last_name", &write.last_name)?;
    validate::password(&write.password)?;

    let user = state
        .transaction(move |conn| {
            if query::email_or_username_taken(conn, &write.email, &write.username)? {
                return Err(ApiError::Validation(
                    "a user with that email or username already exists".into(),
                ));
            }
            let password_hash = auth::hash_password(&write.password);
            Ok(query::insert_user(
                conn,
                NewUser {
                    email: &write.email,
                    username: &write.username,
                    first_name: &write.first_name,
                    last_name: &write.last_name,
                    password_hash: &password_hash,
                },
            )?)
        })
        .await?;
    log::info!("registered user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(login): Json<TokenLogin>,
) -> Result<Json<TokenView>> {
    let auth_token = state
        .run(move |conn| {
            let user = query::find_user_by_email(conn, &login.email)?
                .filter(|user| auth::verify_password(&login.password, &user.password_hash))
                .ok_or_else(|| ApiError::Validation(BAD_CREDENTIALS.into()))?;
            Ok(auth::issue_token(conn, user.id)?)
        })
        .await?;
    Ok(Json(TokenView { auth_token }))
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode> {
    state
        .run(move |conn| Ok(query::delete_token(conn, &auth.token_digest)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list(
    State(state): State<AppState>,
    requester: MaybeUser,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<UserView>>> {
    let page = PageRequest::from_pairs(&pairs)?.page(state.config.page_size)?;
    let requester = requester.id();
    let (count, views) = state
        .run(move |conn| {
            let (users, count) = query::list_users(conn, page)?;
            Ok((count, UserView::load(conn, requester, users)?))
        })
        .await?;
    Ok(Json(Paginated::new(&uri, page, count, views)?))
}

pub async fn retrieve(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserView>> {
    let requester = requester.id();
    let mut views = state
        .run(move |conn| {
            let user = require_user(conn, id)?;
            Ok(UserView::load(conn, requester, vec![user])?)
        })
        .await?;
    views
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("user {id}")))
}

pub async fn me(AuthUser { user, .. }: AuthUser) -> Json<UserView> {
    Json(UserView::new(user, false))
}

pub async fn set_password(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Json(write): Json<SetPasswordWrite>,
) -> Result<StatusCode> {
    if !auth::verify_password(&write.current_password, &user.password_hash) {
        return Err(ApiError::Validation("current password is incorrect".into()));
    }
    validate::password(&write.new_password)?;
    let hash = auth::hash_password(&write.new_password);
    state
        .run(move |conn| Ok(query::set_password_hash(conn, user.id, &hash)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn recipes_limit(pairs: &[(String, String)]) -> Result<Option<i64>> {
    match query_param::<i64>(pairs, "recipes_limit")? {
        Some(limit) if limit < 0 => Err(ApiError::Validation(
            "recipes_limit must not be negative".into(),
        )),
        limit => Ok(limit),
    }
}

pub async fn subscriptions(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<SubscriptionView>>> {
    let page = PageRequest::from_pairs(&pairs)?.page(state.config.page_size)?;
    let limit = recipes_limit(&pairs)?;
    let (count, views) = state
        .run(move |conn| {
            let (authors, count) = query::subscribed_authors(conn, user.id, page)?;
            Ok((count, SubscriptionView::load(conn, user.id, authors, limit)?))
        })
        .await?;
    Ok(Json(Paginated::new(&uri, page, count, views)?))
}

pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<UserId>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<SubscriptionView>)> {
    let limit = recipes_limit(&pairs)?;
    let mut views = state
        .transaction(move |conn| {
            let author = require_user(conn, id)?;
            if author.id == user.id {
                return Err(ApiError::Validation(
                    "you cannot subscribe to yourself".into(),
                ));
            }
            if query::is_subscribed(conn, user.id, author.id)? {
                return Err(ApiError::Validation(format!(
                    "already subscribed to {}",
                    author.username
                )));
            }
            query::subscribe(conn, user.id, author.id)?;
            log::info!("{} subscribed to {}", user.username, author.username);
            Ok(SubscriptionView::load(conn, user.id, vec![author], limit)?)
        })
        .await?;
    let view = views
        .pop()
        .ok_or_else(|| ApiError::not_found(format!("user {id}")))?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let author = require_user(conn, id)?;
            if query::unsubscribe(conn, user.id, author.id)? == 0 {
                return Err(ApiError::NotFound(format!(
                    "not subscribed to {}",
                    author.username
                )));
            }
            log::info!("{} unsubscribed from {}", user.username, author.username);
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The subscribe endpoint without an author id.
pub async fn subscribe_without_target() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn register_and_login() {
        let app = TestApp::new();
        let (id, token) = app.sign_up("alice").await;

        let (status, me) = app.json(Method::GET, "/api/users/me/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"].as_i64(), Some(id));
        assert_eq!(me["email"], "alice@example.com");
        assert_eq!(me["is_subscribed"], false);

        let (status, _) = app.json(Method::GET, "/api/users/me/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .json(Method::GET, "/api/users/me/", Some("bogus"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .json(
                Method::POST,
                "/api/auth/token/login/",
                None,
                Some(json!({ "email": "alice@example.com", "password": "wrong" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(Method::POST, "/api/auth/token/logout/", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.json(Method::GET, "/api/users/me/", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_rules() {
        let app = TestApp::new();
        app.sign_up("alice").await;

        let user = |email: &str, username: &str, first_name: &str| {
            json!({
                "email": email,
                "username": username,
                "first_name": first_name,
                "last_name": "Cook",
                "password": "secret",
            })
        };
        for body in [
            user("alice@example.com", "other", "Anna"),
            user("other@example.com", "alice", "Anna"),
            user("not-an-email", "bob", "Anna"),
            user("bob@example.com", "bob1", "Anna"),
            user("bob@example.com", "bob", "Anna2"),
        ] {
            let (status, error) = app
                .json(Method::POST, "/api/users/", None, Some(body.clone()))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}: {error}");
        }

        let mut incomplete = user("ivan@example.com", "ivan", "Иван");
        incomplete.as_object_mut().unwrap().remove("last_name");
        let (status, error) = app
            .json(Method::POST, "/api/users/", None, Some(incomplete))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["errors"][0].as_str().unwrap().contains("last_name"), "{error}");

        let (status, created) = app
            .json(
                Method::POST,
                "/api/users/",
                None,
                Some(user("ivan@example.com", "ivan", "Иван")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["first_name"], "Иван");
        assert!(created.get("password").is_none());
    }

    #[tokio::test]
    async fn set_password() {
        let app = TestApp::new();
        let (_, token) = app.sign_up("alice").await;

        let (status, _) = app
            .json(
                Method::POST,
                "/api/users/set_password/",
                Some(&token),
                Some(json!({ "new_password": "fresh", "current_password": "nope" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(
                Method::POST,
                "/api/users/set_password/",
                Some(&token),
                Some(json!({ "new_password": "fresh", "current_password": "secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .json(
                Method::POST,
                "/api/auth/token/login/",
                None,
                Some(json!({ "email": "alice@example.com", "password": "fresh" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn subscriptions() {
        let app = TestApp::new();
        let (alice_id, alice) = app.sign_up("alice").await;
        let (bob_id, bob) = app.sign_up("bob").await;

        let subscribe = format!("/api/users/{bob_id}/subscribe/");
        let (status, view) = app.json(Method::POST, &subscribe, Some(&alice), None).await;
        assert_eq!(status, StatusCode::CREATED, "{view}");
        assert_eq!(view["username"], "bob");
        assert_eq!(view["is_subscribed"], true);
        assert_eq!(view["recipes_count"], 0);
        assert_eq!(view["recipes"], json!([]));

        let (status, _) = app.json(Method::POST, &subscribe, Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let own = format!("/api/users/{alice_id}/subscribe/");
        let (status, _) = app.json(Method::POST, &own, Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(Method::POST, "/api/users/999/subscribe/", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let bob_profile = format!("/api/users/{bob_id}/");
        let (_, profile) = app.json(Method::GET, &bob_profile, Some(&alice), None).await;
        assert_eq!(profile["is_subscribed"], true);
        let (_, profile) = app.json(Method::GET, &bob_profile, None, None).await;
        assert_eq!(profile["is_subscribed"], false);
        let alice_profile = format!("/api/users/{alice_id}/");
        let (_, profile) = app.json(Method::GET, &alice_profile, Some(&bob), None).await;
        assert_eq!(profile["is_subscribed"], false);

        let (status, page) = app
            .json(
                Method::GET,
                "/api/users/subscriptions/?recipes_limit=2",
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);
        assert_eq!(page["results"][0]["id"].as_i64(), Some(bob_id));

        let (status, _) = app.json(Method::DELETE, &subscribe, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.json(Method::DELETE, &subscribe, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json(Method::DELETE, "/api/users/subscribe/", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn list_is_paginated() {
        let app = TestApp::new();
        for name in ["dora", "alice", "carl", "bob"] {
            app.sign_up(name).await;
        }

        let (status, page) = app
            .json(Method::GET, "/api/users/?limit=3", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 4);
        let names: Vec<_> = page["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["username"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["alice", "bob", "carl"]);
        assert_eq!(page["next"], "/api/users/?limit=3&page=2");

        let (status, _) = app.json(Method::GET, "/api/users/?page=0", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
