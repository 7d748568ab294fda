// Copyright 2023 Remi Bernotavicius

use diesel::connection::SimpleConnection as _;
use diesel::r2d2::{ConnectionManager, CustomizeConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::error::Error;
use std::path::Path;

pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;
pub type Pool = diesel::r2d2::Pool<ConnectionManager<Connection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// SQLite leaves foreign keys off unless asked on every connection; the cascading deletes of
/// recipes and users depend on them.
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<Connection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn establish_pool(
    path: impl AsRef<Path>,
    max_size: u32,
) -> Result<Pool, Box<dyn Error + Send + Sync + 'static>> {
    let url = path
        .as_ref()
        .to_str()
        .ok_or("database path is not valid UTF-8")?;
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(ConnectionManager::new(url))?;

    let mut connection = pool.get()?;
    let applied = connection.run_pending_migrations(MIGRATIONS)?;
    for migration in applied {
        log::info!("applied migration {migration}");
    }
    Ok(pool)
}

/// A single-connection pool over a fresh in-memory database. The pool must stay at one
/// connection since every in-memory connection is its own database.
#[cfg(test)]
pub fn test_pool() -> Pool {
    establish_pool(":memory:", 1).unwrap()
}

#[test]
fn migrations() {
    let pool = test_pool();
    let mut conn = pool.get().unwrap();

    conn.revert_all_migrations(MIGRATIONS).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}

#[test]
fn foreign_keys_enabled() {
    use diesel::RunQueryDsl as _;

    #[derive(diesel::QueryableByName)]
    struct Pragma {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        foreign_keys: i32,
    }

    let pool = test_pool();
    let mut conn = pool.get().unwrap();
    let pragma: Pragma = diesel::sql_query("PRAGMA foreign_keys")
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(pragma.foreign_keys, 1);
}
