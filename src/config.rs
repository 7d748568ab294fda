// Copyright 2023 Remi Bernotavicius

use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Address the HTTP server listens on.
    #[arg(long, env = "RECIPE_SHARE_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Directory uploaded recipe images are written to and served from. Defaults to `media/`
    /// under the data directory.
    #[arg(long, env = "RECIPE_SHARE_MEDIA_ROOT")]
    pub media_root: Option<PathBuf>,

    /// Page size used when a listing request does not pass `limit`.
    #[arg(long, env = "RECIPE_SHARE_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: i64,

    /// Number of pooled database connections.
    #[arg(long, env = "RECIPE_SHARE_POOL_SIZE", default_value_t = 8)]
    pub pool_size: u32,
}

/// Settings the request handlers need, resolved from [`ServeConfig`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub media_root: PathBuf,
    pub page_size: i64,
}

impl ApiConfig {
    pub fn new(serve: &ServeConfig, data_path: &std::path::Path) -> Self {
        Self {
            media_root: serve
                .media_root
                .clone()
                .unwrap_or_else(|| data_path.join("media")),
            page_size: serve.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}
