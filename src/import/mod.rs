// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{NewIngredient, NewTag};
use crate::query;
use crate::Result;
use diesel::Connection as _;
use diesel::QueryResult;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A row of reference data that can be seeded from a JSON fixture file.
pub trait Fixture: DeserializeOwned {
    const KIND: &'static str;

    /// Returns `false` when an equivalent row already exists and nothing was inserted.
    fn insert(&self, conn: &mut database::Connection) -> QueryResult<bool>;
}

impl Fixture for NewIngredient {
    const KIND: &'static str = "ingredients";

    fn insert(&self, conn: &mut database::Connection) -> QueryResult<bool> {
        query::add_ingredient(conn, self)
    }
}

impl Fixture for NewTag {
    const KIND: &'static str = "tags";

    fn insert(&self, conn: &mut database::Connection) -> QueryResult<bool> {
        query::add_tag(conn, self)
    }
}

pub fn decode_fixture<T: Fixture>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let file = std::fs::File::open(path.as_ref())?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

pub struct Importer<T> {
    pending: Vec<T>,

    num_imported: usize,
    num_skipped: usize,
    total: usize,
}

impl<T: Fixture> Importer<T> {
    const BATCH_SIZE: usize = 200;

    pub fn new(mut rows: Vec<T>) -> Self {
        // Batches are taken off the end.
        rows.reverse();
        let total = rows.len();
        Self {
            pending: rows,
            num_imported: 0,
            num_skipped: 0,
            total,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(decode_fixture(path)?))
    }

    pub fn done(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn num_imported(&self) -> usize {
        self.num_imported
    }

    pub fn num_skipped(&self) -> usize {
        self.num_skipped
    }

    pub fn percent_done(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.num_imported + self.num_skipped) as f32 / self.total as f32
    }

    /// Imports the next batch in one transaction.
    pub fn import_one(&mut self, conn: &mut database::Connection) -> Result<()> {
        assert!(!self.done());

        let split_point = self.pending.len().saturating_sub(Self::BATCH_SIZE);
        let batch = self.pending.split_off(split_point);

        let (imported, skipped) = conn.transaction(|conn| {
            let mut imported = 0;
            let mut skipped = 0;
            for row in batch.iter().rev() {
                if row.insert(conn)? {
                    imported += 1;
                } else {
                    skipped += 1;
                }
            }
            QueryResult::Ok((imported, skipped))
        })?;
        self.num_imported += imported;
        self.num_skipped += skipped;
        Ok(())
    }
}

pub fn import_fixture<T: Fixture>(
    conn: &mut database::Connection,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut importer = Importer::<T>::from_path(path)?;

    while !importer.done() {
        importer.import_one(conn)?;
        log::info!("imported {:.0}% of {}", importer.percent_done() * 100.0, T::KIND);
    }
    log::info!(
        "{} {} imported, {} already present",
        importer.num_imported(),
        T::KIND,
        importer.num_skipped()
    );

    Ok(())
}
