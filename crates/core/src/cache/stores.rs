//! Named store operations.
//!
//! Implements [`CacheStorage`] on top of the `stores` / `entries` tables
//! and adds read-only inspection helpers used by the host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::storage::CacheStorage;
use crate::Error;
use crate::http::{Request, Response, ResponseType};

const SELECT_RESPONSE: &str = "SELECT e.status, e.response_type, e.response_url, e.headers_json, e.body
     FROM entries e JOIN stores s ON s.id = e.store_id";

/// Metadata of one cached entry, as listed by the inspection helpers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredEntry {
    pub store: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub cached_at: String,
}

/// Response columns as read from SQLite, before decoding.
struct RawResponse {
    status: i64,
    response_type: String,
    response_url: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            status: row.get(0)?,
            response_type: row.get(1)?,
            response_url: row.get(2)?,
            headers_json: row.get(3)?,
            body: row.get(4)?,
        })
    }

    fn decode(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let response_type: ResponseType = self.response_type.parse().map_err(Error::CorruptEntry)?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let url = match self.response_url {
            Some(u) => Some(url::Url::parse(&u).map_err(|e| Error::CorruptEntry(e.to_string()))?),
            None => None,
        };

        Ok(Response { status, headers, body: self.body.into(), url, response_type })
    }
}

/// An entry ready to be written, detached from borrowed request/response data.
struct PendingEntry {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    response_type: &'static str,
    response_url: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl PendingEntry {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let mut url = request.url.clone();
        url.set_fragment(None);

        Ok(Self {
            key_hash: compute_request_key(&request.url),
            method: request.method.clone(),
            url: url.to_string(),
            status: i64::from(response.status),
            response_type: response.response_type.as_str(),
            response_url: response.url.as_ref().map(|u| u.to_string()),
            headers_json: serde_json::to_string(&response.headers)
                .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_store(conn: &rusqlite::Connection, name: &str, now: &str) -> rusqlite::Result<i64> {
    conn.execute("INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)", params![name, now])?;
    conn.query_row("SELECT id FROM stores WHERE name = ?1", params![name], |row| row.get(0))
}

fn write_entries(conn: &mut rusqlite::Connection, name: &str, entries: &[PendingEntry]) -> Result<(), Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    let store_id = ensure_store(&tx, name, &now)?;

    for entry in entries {
        tx.execute(
            "INSERT OR REPLACE INTO entries (
                store_id, key_hash, method, url, status, response_type,
                response_url, headers_json, body, cached_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                store_id,
                &entry.key_hash,
                &entry.method,
                &entry.url,
                entry.status,
                entry.response_type,
                &entry.response_url,
                &entry.headers_json,
                &entry.body,
                &now,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_store(conn, &name, &now)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key_hash = compute_request_key(&request.url);
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawResponse>, Error> {
                let sql = format!("{SELECT_RESPONSE} WHERE s.name = ?1 AND e.key_hash = ?2");
                let result = conn.query_row(&sql, params![name, key_hash], RawResponse::from_row);

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawResponse::decode).transpose()
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = compute_request_key(&request.url);
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawResponse>, Error> {
                let sql = format!("{SELECT_RESPONSE} WHERE e.key_hash = ?1 ORDER BY s.id ASC LIMIT 1");
                let result = conn.query_row(&sql, params![key_hash], RawResponse::from_row);

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawResponse::decode).transpose()
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let name = name.to_string();
        let entry = PendingEntry::new(request, response)?;
        self.conn
            .call(move |conn| write_entries(conn, &name, std::slice::from_ref(&entry)))
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let name = name.to_string();
        let pending = entries
            .iter()
            .map(|(req, res)| PendingEntry::new(req, res))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| write_entries(conn, &name, &pending))
            .await
            .map_err(Error::from)
    }
}

/// Entry metadata columns as read from SQLite, before decoding.
struct RawEntry {
    store: String,
    method: String,
    url: String,
    status: i64,
    response_type: String,
    headers_json: String,
    body_len: i64,
    cached_at: String,
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        store: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        status: row.get(3)?,
        response_type: row.get(4)?,
        headers_json: row.get(5)?,
        body_len: row.get(6)?,
        cached_at: row.get(7)?,
    })
}

fn decode_entry(raw: RawEntry) -> Result<StoredEntry, Error> {
    let status = u16::try_from(raw.status).map_err(|_| Error::CorruptEntry(format!("status {}", raw.status)))?;
    let body_len =
        usize::try_from(raw.body_len).map_err(|_| Error::CorruptEntry(format!("body length {}", raw.body_len)))?;
    let headers = serde_json::from_str(&raw.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    Ok(StoredEntry {
        store: raw.store,
        method: raw.method,
        url: raw.url,
        status,
        response_type: raw.response_type,
        headers,
        body_len,
        cached_at: raw.cached_at,
    })
}

const SELECT_ENTRY: &str = "SELECT s.name, e.method, e.url, e.status, e.response_type, e.headers_json,
        length(e.body), e.cached_at
     FROM entries e JOIN stores s ON s.id = e.store_id";

impl CacheDb {
    /// List the entries of a store in insertion order.
    ///
    /// Returns an empty list for a store that does not exist.
    pub async fn list_entries(&self, name: &str) -> Result<Vec<StoredEntry>, Error> {
        let name = name.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<RawEntry>, Error> {
                let sql = format!("{SELECT_ENTRY} WHERE s.name = ?1 ORDER BY e.rowid ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![name], entry_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(decode_entry).collect()
    }

    /// Get the metadata of the entry a request would match in one store.
    pub async fn get_entry(&self, name: &str, request: &Request) -> Result<Option<StoredEntry>, Error> {
        let name = name.to_string();
        let key_hash = compute_request_key(&request.url);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!("{SELECT_ENTRY} WHERE s.name = ?1 AND e.key_hash = ?2");
                match conn.query_row(&sql, params![name, key_hash], entry_from_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    /// Number of entries in a store; zero if the store does not exist.
    pub async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries e JOIN stores s ON s.id = e.store_id WHERE s.name = ?1",
                    params![name],
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
    use super::*;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn ok(body: &'static str) -> Response {
        Response::new(200, body)
            .with_type(ResponseType::Basic)
            .with_header("content-type", "image/png")
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/art/poster.png");

        db.put("images-v1", &req, &ok("png-bytes")).await.unwrap();

        let hit = db.match_in("images-v1", &req).await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body.as_ref(), b"png-bytes");
        assert_eq!(hit.response_type, ResponseType::Basic);
        assert_eq!(hit.content_type(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_match_missing_store_and_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/a.png");
        assert!(db.match_in("images-v1", &req).await.unwrap().is_none());

        db.open("images-v1").await.unwrap();
        assert!(db.match_in("images-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/a.png");

        db.put("images-v1", &req, &ok("first")).await.unwrap();
        db.put("images-v1", &req, &ok("second")).await.unwrap();

        assert_eq!(db.entry_count("images-v1").await.unwrap(), 1);
        let hit = db.match_in("images-v1", &req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_replaced_entry_moves_to_end() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = get("https://example.com/a.png");
        let b = get("https://example.com/b.png");

        db.put("images-v1", &a, &ok("a")).await.unwrap();
        db.put("images-v1", &b, &ok("b")).await.unwrap();
        db.put("images-v1", &a, &ok("a2")).await.unwrap();

        let urls: Vec<String> = db
            .list_entries("images-v1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["https://example.com/b.png", "https://example.com/a.png"]);
    }

    #[tokio::test]
    async fn test_fragment_ignored_for_matching() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("shell-v1", &get("https://example.com/#gallery"), &ok("index"))
            .await
            .unwrap();
        let hit = db.match_in("shell-v1", &get("https://example.com/")).await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_keys_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("shell-v1").await.unwrap();
        db.open("images-v1").await.unwrap();
        db.open("shell-v1").await.unwrap();
        db.open("audio-v1").await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["shell-v1", "images-v1", "audio-v1"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/a.mp3");
        db.put("audio-v0", &req, &ok("old")).await.unwrap();

        assert!(db.delete("audio-v0").await.unwrap());
        assert!(!db.delete("audio-v0").await.unwrap());
        assert!(db.keys().await.unwrap().is_empty());
        assert!(db.match_any(&req).await.unwrap().is_none());
        assert_eq!(db.entry_count("audio-v0").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/data.json");
        db.put("shell-v1", &req, &ok("from-shell")).await.unwrap();
        db.put("images-v1", &req, &ok("from-images")).await.unwrap();

        let hit = db.match_any(&req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"from-shell");
    }

    #[tokio::test]
    async fn test_put_all_and_get_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            (get("https://example.com/"), ok("root")),
            (get("https://example.com/index.html"), ok("index")),
            (get("https://example.com/manifest.json"), ok("{}")),
        ];

        db.put_all("shell-v1", &entries).await.unwrap();
        assert_eq!(db.entry_count("shell-v1").await.unwrap(), 3);

        let entry = db
            .get_entry("shell-v1", &get("https://example.com/manifest.json"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.store, "shell-v1");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.body_len, 2);
        assert_eq!(entry.headers, vec![("content-type".to_string(), "image/png".to_string())]);
    }

    #[tokio::test]
    async fn test_response_url_roundtrip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/old.png");
        let res = ok("x").with_url(Url::parse("https://cdn.example.com/new.png").unwrap());
        db.put("images-v1", &req, &res).await.unwrap();

        let hit = db.match_in("images-v1", &req).await.unwrap().unwrap();
        assert_eq!(hit, res);
    }

    #[tokio::test]
    async fn test_corrupt_status_rejected_on_both_paths() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/a.png");
        db.put("images-v1", &req, &ok("x")).await.unwrap();
        db.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute("UPDATE entries SET status = -1", [])?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(db.match_in("images-v1", &req).await, Err(Error::CorruptEntry(_))));
        assert!(matches!(db.get_entry("images-v1", &req).await, Err(Error::CorruptEntry(_))));
        assert!(matches!(db.list_entries("images-v1").await, Err(Error::CorruptEntry(_))));
    }
}
