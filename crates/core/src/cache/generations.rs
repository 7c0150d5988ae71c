//! Cache generation namespaces.
//!
//! A generation is a named collection of entries. Opening one creates it if
//! absent; deleting one removes it with all of its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Handle scoped to a single generation.
///
/// All reads and writes through a handle are restricted to its generation.
#[derive(Clone, Debug)]
pub struct GenerationHandle {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl GenerationHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A generation name with its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationSummary {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Open a generation, creating it if it doesn't exist.
    pub async fn open_generation(&self, name: &str) -> Result<GenerationHandle, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("generation name cannot be empty".into()));
        }

        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| Error::StorageUnavailable(format!("open generation {name}: {}", Error::from(e))))?;

        Ok(GenerationHandle { db: self.clone(), name: name.to_string() })
    }

    /// All generation names, oldest first, including stale ones.
    pub async fn list_generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every generation with its entry count, oldest first.
    pub async fn generation_summaries(&self) -> Result<Vec<GenerationSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key_hash)
                     FROM generations g LEFT JOIN entries e ON e.generation = g.name
                     GROUP BY g.name
                     ORDER BY g.rowid",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(GenerationSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a generation currently exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                Ok(conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_once() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open_generation("v1").await.unwrap();
        db.open_generation("v1").await.unwrap();

        assert_eq!(handle.name(), "v1");
        assert_eq!(db.list_generation_names().await.unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_empty_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_generation("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["v2", "v1", "v3"] {
            db.open_generation(name).await.unwrap();
        }
        assert_eq!(db.list_generation_names().await.unwrap(), vec!["v2", "v1", "v3"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("old").await.unwrap();

        assert!(db.delete_generation("old").await.unwrap());
        assert!(!db.delete_generation("old").await.unwrap());
        assert!(!db.delete_generation("never-existed").await.unwrap());
        assert!(!db.has_generation("old").await.unwrap());
        assert!(db.list_generation_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summaries_count_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("empty").await.unwrap();
        let full = db.open_generation("full").await.unwrap();

        let req = crate::RequestDescriptor::get(url::Url::parse("https://app.test/a").unwrap());
        full.put(&req, &crate::ResponseSnapshot::new(200, "a")).await.unwrap();

        let summaries = db.generation_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "empty");
        assert_eq!(summaries[0].entries, 0);
        assert_eq!(summaries[1].name, "full");
        assert_eq!(summaries[1].entries, 1);
    }
}
