// Copyright 2023 Remi Bernotavicius

use crate::config::ApiConfig;
use crate::database;
use axum::extract::{FromRequest, Request};
use axum::http::{header, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub mod auth;
pub mod error;
pub mod pagination;
pub mod recipes;
pub mod reference;
pub mod users;
pub mod views;

use error::ApiError;

/// `axum::Json` with its rejections turned into [`ApiError`], so a malformed body is a 400 like any
/// other validation failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: database::Pool,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(pool: database::Pool, config: ApiConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    /// Runs `f` against a pooled connection on the blocking thread pool.
    pub async fn run<T, F>(&self, f: F) -> error::Result<T>
    where
        F: FnOnce(&mut database::Connection) -> error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }

    /// Like [`Self::run`], inside one transaction.
    pub async fn transaction<T, F>(&self, f: F) -> error::Result<T>
    where
        F: FnOnce(&mut database::Connection) -> error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run(move |conn| conn.immediate_transaction::<_, ApiError, _>(f))
            .await
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    log::info!("{method} {uri} {}", response.status().as_u16());
    response
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/auth/token/login/", post(users::login))
        .route("/auth/token/logout/", post(users::logout))
        .route("/users/", get(users::list).post(users::register))
        .route("/users/me/", get(users::me))
        .route("/users/set_password/", post(users::set_password))
        .route("/users/subscriptions/", get(users::subscriptions))
        .route(
            "/users/subscribe/",
            post(users::subscribe_without_target).delete(users::subscribe_without_target),
        )
        .route("/users/{id}/", get(users::retrieve))
        .route(
            "/users/{id}/subscribe/",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/tags/", get(reference::list_tags))
        .route("/tags/{id}/", get(reference::get_tag))
        .route("/ingredients/", get(reference::list_ingredients))
        .route("/ingredients/{id}/", get(reference::get_ingredient))
        .route("/recipes/", get(recipes::list).post(recipes::create))
        .route(
            "/recipes/download_shopping_cart/",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/{id}/",
            get(recipes::retrieve)
                .put(recipes::update)
                .patch(recipes::update)
                .delete(recipes::destroy),
        )
        .route(
            "/recipes/{id}/favorite/",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(recipes::add_to_shopping_cart).delete(recipes::remove_from_shopping_cart),
        );

    Router::new()
        .nest("/api", api)
        .nest_service(
            views::MEDIA_URL.trim_end_matches('/'),
            ServeDir::new(&state.config.media_root),
        )
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState, address: SocketAddr) -> crate::Result<()> {
    let app = router(state);

    log::info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    log::info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(error) => {
                log::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
