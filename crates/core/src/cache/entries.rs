//! Entry reads and writes within a generation.
//!
//! Entries are keyed by method and canonical URL. Headers named in the stored
//! response's `Vary` header are recorded at write time and must match at read
//! time; `Vary: *` never matches. Only `GET` requests are cached.

use std::collections::BTreeMap;

use super::generations::GenerationHandle;
use super::hash::compute_cache_key;
use crate::{Error, RequestDescriptor, ResponseSnapshot, ResponseType};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Identity of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredKey {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub stored_at: String,
}

/// Row prepared for insertion.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    vary_any: bool,
    vary_json: String,
    status: u16,
    status_text: String,
    response_type: &'static str,
    response_url: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn build(request: &RequestDescriptor, response: &ResponseSnapshot) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot cache {} requests", request.method)));
        }

        let vary = response.vary();
        let vary_any = vary.iter().any(|h| h == "*");
        let recorded: BTreeMap<String, Option<String>> = vary
            .iter()
            .filter(|h| h.as_str() != "*")
            .map(|h| (h.clone(), request.header(h).map(str::to_string)))
            .collect();

        let url = request.identity_url();
        Ok(Self {
            key_hash: compute_cache_key(&request.method, &url),
            method: request.method.clone(),
            url,
            vary_any,
            vary_json: serde_json::to_string(&recorded)?,
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str(),
            response_url: response.url.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

/// Upsert a row, skipping it when the generation no longer exists.
///
/// Returns whether a row was written.
fn write_row(conn: &rusqlite::Connection, generation: &str, row: &EntryRow, now: &str) -> Result<bool, Error> {
    let written = conn.execute(
        "INSERT INTO entries (
            generation, key_hash, method, url, vary_any, vary_json,
            status, status_text, response_type, response_url, headers_json, body, stored_at
        )
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13
        WHERE EXISTS (SELECT 1 FROM generations WHERE name = ?1)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            vary_any = excluded.vary_any,
            vary_json = excluded.vary_json,
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            response_url = excluded.response_url,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &row.key_hash,
            &row.method,
            &row.url,
            row.vary_any as i32,
            &row.vary_json,
            row.status as i64,
            &row.status_text,
            row.response_type,
            &row.response_url,
            &row.headers_json,
            &row.body,
            now,
        ],
    )?;
    Ok(written > 0)
}

/// Stored columns needed to rebuild a snapshot.
struct StoredRow {
    vary_any: bool,
    vary_json: String,
    status: i64,
    status_text: String,
    response_type: String,
    response_url: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredRow {
    fn varies_from(&self, request: &RequestDescriptor) -> Result<bool, Error> {
        if self.vary_any {
            return Ok(true);
        }
        let recorded: BTreeMap<String, Option<String>> = serde_json::from_str(&self.vary_json)?;
        Ok(recorded
            .iter()
            .any(|(name, value)| request.header(name) != value.as_deref()))
    }

    fn into_snapshot(self) -> Result<ResponseSnapshot, Error> {
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown response type {}", self.response_type)))?;
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("status out of range: {}", self.status)))?;

        Ok(ResponseSnapshot {
            url: self.response_url,
            status,
            status_text: self.status_text,
            headers: serde_json::from_str(&self.headers_json)?,
            body: Bytes::from(self.body),
            response_type,
        })
    }
}

impl GenerationHandle {
    /// Look up a request in this generation.
    ///
    /// Returns None for non-GET requests, for missing entries, for entries
    /// whose `Vary` headers differ, and when the generation has been deleted.
    pub async fn match_request(&self, request: &RequestDescriptor) -> Result<Option<ResponseSnapshot>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let generation = self.name.clone();
        let key_hash = compute_cache_key(&request.method, &request.identity_url());
        let stored = self
            .db
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let result = conn.query_row(
                    "SELECT vary_any, vary_json, status, status_text, response_type,
                            response_url, headers_json, body
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key_hash],
                    |row| {
                        Ok(StoredRow {
                            vary_any: row.get::<_, i32>(0)? == 1,
                            vary_json: row.get(1)?,
                            status: row.get(2)?,
                            status_text: row.get(3)?,
                            response_type: row.get(4)?,
                            response_url: row.get(5)?,
                            headers_json: row.get(6)?,
                            body: row.get(7)?,
                        })
                    },
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        match stored {
            Some(row) if !row.varies_from(request)? => row.into_snapshot().map(Some),
            _ => Ok(None),
        }
    }

    /// Store a snapshot for a request, overwriting any previous one.
    ///
    /// Returns false without error when the generation has been deleted.
    pub async fn put(&self, request: &RequestDescriptor, response: &ResponseSnapshot) -> Result<bool, Error> {
        let row = EntryRow::build(request, response)?;
        let generation = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| write_row(conn, &generation, &row, &now))
            .await
            .map_err(Error::from)
    }

    /// Store several snapshots in one transaction.
    ///
    /// Either every row is written or none is. Returns the number written,
    /// which is zero when the generation has been deleted.
    pub async fn put_all(&self, pairs: &[(RequestDescriptor, ResponseSnapshot)]) -> Result<usize, Error> {
        let rows = pairs
            .iter()
            .map(|(req, resp)| EntryRow::build(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                let mut written = 0;
                for row in &rows {
                    if write_row(&tx, &generation, row, &now)? {
                        written += 1;
                    }
                }
                tx.commit()?;
                Ok(written)
            })
            .await
            .map_err(Error::from)
    }

    /// Stored request identities, in insertion order.
    pub async fn keys(&self) -> Result<Vec<StoredKey>, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<StoredKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, stored_at FROM entries WHERE generation = ?1 ORDER BY rowid",
                )?;
                let keys = stmt
                    .query_map(params![generation], |row| {
                        Ok(StoredKey {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get::<_, i64>(2)? as u16,
                            stored_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this generation.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::CacheDb;
    use crate::{Error, RequestDescriptor, ResponseSnapshot, ResponseType};
    use url::Url;

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    fn page(body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot::new(200, body)
            .with_header("Content-Type", "text/html")
            .with_header("ETag", "\"abc\"")
            .with_url("https://app.test/index.html")
    }

    #[tokio::test]
    async fn test_put_and_match_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let request = get("https://app.test/index.html");
        let response = page("<html>hello</html>");

        assert!(generation.put(&request, &response).await.unwrap());

        let stored = generation.match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored, response);
        assert_eq!(stored.status, 200);
        assert_eq!(stored.status_text, "OK");
        assert_eq!(stored.header("etag"), Some("\"abc\""));
        assert_eq!(&stored.body[..], b"<html>hello</html>");
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        assert!(generation.match_request(&get("https://app.test/unknown")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_ignores_fragment() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        generation.put(&get("https://app.test/index.html"), &page("x")).await.unwrap();

        let hit = generation.match_request(&get("https://app.test/index.html#section")).await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let request = get("https://app.test/app.js");

        generation.put(&request, &ResponseSnapshot::new(200, "old")).await.unwrap();
        generation.put(&request, &ResponseSnapshot::new(200, "new")).await.unwrap();

        let stored = generation.match_request(&request).await.unwrap().unwrap();
        assert_eq!(&stored.body[..], b"new");
        assert_eq!(generation.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_is_generation_scoped() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = db.open_generation("v1").await.unwrap();
        let current = db.open_generation("v2").await.unwrap();
        let request = get("https://app.test/app.js");

        old.put(&request, &ResponseSnapshot::new(200, "stale")).await.unwrap();

        assert!(old.match_request(&request).await.unwrap().is_some());
        assert!(current.match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_get_not_cached() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let post = get("https://app.test/api").with_method("POST");

        let result = generation.put(&post, &ResponseSnapshot::new(200, "ok")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        generation.put(&get("https://app.test/api"), &ResponseSnapshot::new(200, "ok")).await.unwrap();
        assert!(generation.match_request(&post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vary_header_must_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let english = get("https://app.test/greeting").with_header("Accept-Language", "en");
        let response = ResponseSnapshot::new(200, "hello").with_header("Vary", "Accept-Language");

        generation.put(&english, &response).await.unwrap();

        assert!(generation.match_request(&english).await.unwrap().is_some());
        let french = get("https://app.test/greeting").with_header("Accept-Language", "fr");
        assert!(generation.match_request(&french).await.unwrap().is_none());
        let none = get("https://app.test/greeting");
        assert!(generation.match_request(&none).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vary_star_never_matches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let request = get("https://app.test/random");

        generation
            .put(&request, &ResponseSnapshot::new(200, "x").with_header("Vary", "*"))
            .await
            .unwrap();
        assert!(generation.match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_into_deleted_generation_is_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        db.delete_generation("v1").await.unwrap();

        let request = get("https://app.test/late.js");
        assert!(!generation.put(&request, &ResponseSnapshot::new(200, "late")).await.unwrap());
        assert!(generation.match_request(&request).await.unwrap().is_none());
        assert!(db.list_generation_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_generation_removes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        generation.put(&get("https://app.test/a"), &ResponseSnapshot::new(200, "a")).await.unwrap();

        db.delete_generation("v1").await.unwrap();
        let reopened = db.open_generation("v1").await.unwrap();
        assert_eq!(reopened.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_all_and_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let pairs = vec![
            (get("https://app.test/"), ResponseSnapshot::new(200, "root")),
            (get("https://app.test/index.html"), ResponseSnapshot::new(200, "index")),
            (
                get("https://cdn.test/lib.js"),
                ResponseSnapshot::new(200, "lib").with_type(ResponseType::Cors),
            ),
        ];

        assert_eq!(generation.put_all(&pairs).await.unwrap(), 3);

        let keys = generation.keys().await.unwrap();
        let urls: Vec<&str> = keys.iter().map(|k| k.url.as_str()).collect();
        assert_eq!(urls, vec!["https://app.test/", "https://app.test/index.html", "https://cdn.test/lib.js"]);
        assert!(keys.iter().all(|k| k.method == "GET" && k.status == 200));

        let lib = generation.match_request(&pairs[2].0).await.unwrap().unwrap();
        assert_eq!(lib.response_type, ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_put_all_rejects_whole_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("v1").await.unwrap();
        let pairs = vec![
            (get("https://app.test/"), ResponseSnapshot::new(200, "root")),
            (get("https://app.test/form").with_method("POST"), ResponseSnapshot::new(200, "form")),
        ];

        assert!(generation.put_all(&pairs).await.is_err());
        assert_eq!(generation.entry_count().await.unwrap(), 0);
    }
}
