// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

mod api;
mod config;
mod database;
mod image;
mod import;
mod query;
mod shopping_list;
mod validate;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
#[command(about = "Recipe sharing REST backend")]
struct Args {
    /// SQLite database file. Defaults to `data.sqlite` under the data directory.
    #[arg(long, global = true, env = "RECIPE_SHARE_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long, global = true, env = "RECIPE_SHARE_LOG_LEVEL", default_value_t = log::LevelFilter::Info)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(config::ServeConfig),
    /// Seed ingredients from a JSON array of `{name, measurement_unit}`.
    ImportIngredients { path: PathBuf },
    /// Seed tags from a JSON array of `{name, color, slug}`.
    ImportTags { path: PathBuf },
}

/// This is where the database and uploaded images live on-disk. On Linux it should be like:
/// `~/.local/share/recipe_share/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("recipe_share");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn serve(pool: database::Pool, serve: config::ServeConfig, data_path: PathBuf) -> Result<()> {
    let api_config = config::ApiConfig::new(&serve, &data_path);
    std::fs::create_dir_all(&api_config.media_root)?;
    log::info!("serving media from {}", api_config.media_root.display());

    let state = api::AppState::new(pool, api_config);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api::serve(state, serve.bind))
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .init()?;

    let data_path = data_path()?;
    let database = args
        .database
        .unwrap_or_else(|| data_path.join("data.sqlite"));
    let pool_size = match &args.commands {
        Commands::Serve(serve) => serve.pool_size,
        _ => 1,
    };
    let pool = database::establish_pool(&database, pool_size)?;

    match args.commands {
        Commands::Serve(config) => serve(pool, config, data_path)?,
        Commands::ImportIngredients { path } => {
            let mut conn = pool.get()?;
            import::import_fixture::<database::models::NewIngredient>(&mut *conn, path)?
        }
        Commands::ImportTags { path } => {
            let mut conn = pool.get()?;
            import::import_fixture::<database::models::NewTag>(&mut *conn, path)?
        }
    }
    Ok(())
}
