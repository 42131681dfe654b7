//! Keyed record collections.
//!
//! The application pages keep catalog payloads here so previously seen
//! searches still render offline. Values are arbitrary JSON; keys are
//! strings. The interception layer never reads these tables.

use super::connection::CacheDb;
use crate::Error;
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// Search results keyed by keyword.
pub const MOVIE_STORE: &str = "movieStore";

/// Recommendations keyed by reference movie id.
pub const SUGGEST_STORE: &str = "suggestStore";

fn collection_exists(conn: &rusqlite::Connection, name: &str) -> Result<bool, Error> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM record_collections WHERE name = ?1)",
        params![name],
        |row| row.get(0),
    )?)
}

fn require_collection(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    if collection_exists(conn, name)? { Ok(()) } else { Err(Error::StoreNotFound(name.to_string())) }
}

impl CacheDb {
    /// Create each named collection that does not exist yet.
    ///
    /// Every name is checked on its own. Returns the names that were created.
    pub async fn ensure_collections(&self, names: &[&str]) -> Result<Vec<String>, Error> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut created = Vec::new();
                for name in names {
                    if collection_exists(conn, &name)? {
                        continue;
                    }
                    conn.execute(
                        "INSERT INTO record_collections (name, created_at) VALUES (?1, ?2)",
                        params![name, chrono::Utc::now().to_rfc3339()],
                    )?;
                    tracing::debug!(collection = %name, "created record collection");
                    created.push(name);
                }
                Ok(created)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether the collection exists.
    pub async fn has_collection(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| collection_exists(conn, &name))
            .await
            .map_err(Error::from)
    }

    /// Insert a record, failing if the key is already present.
    pub async fn add_record(&self, collection: &str, key: &str, value: &Value) -> Result<(), Error> {
        let collection = collection.to_string();
        let key = key.to_string();
        let value_json = serde_json::to_string(value)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                require_collection(conn, &collection)?;
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM records WHERE collection = ?1 AND key = ?2)",
                    params![collection, key],
                    |row| row.get(0),
                )?;
                if exists {
                    return Err(Error::RecordExists(format!("{collection}/{key}")));
                }
                conn.execute(
                    "INSERT INTO records (collection, key, value_json, stored_at) VALUES (?1, ?2, ?3, ?4)",
                    params![collection, key, value_json, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a record.
    pub async fn put_record(&self, collection: &str, key: &str, value: &Value) -> Result<(), Error> {
        let collection = collection.to_string();
        let key = key.to_string();
        let value_json = serde_json::to_string(value)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                require_collection(conn, &collection)?;
                conn.execute(
                    "INSERT INTO records (collection, key, value_json, stored_at) VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(collection, key) DO UPDATE SET
                        value_json = excluded.value_json,
                        stored_at = excluded.stored_at",
                    params![collection, key, value_json, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get one record by key.
    pub async fn get_record(&self, collection: &str, key: &str) -> Result<Option<Value>, Error> {
        let collection = collection.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Value>, Error> {
                require_collection(conn, &collection)?;
                let json: Option<String> = conn
                    .query_row(
                        "SELECT value_json FROM records WHERE collection = ?1 AND key = ?2",
                        params![collection, key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
            })
            .await
            .map_err(Error::from)
    }

    /// All records of a collection, ordered by key.
    pub async fn get_all_records(&self, collection: &str) -> Result<Vec<Value>, Error> {
        let collection = collection.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<Value>, Error> {
                require_collection(conn, &collection)?;
                let mut stmt = conn.prepare("SELECT value_json FROM records WHERE collection = ?1 ORDER BY key ASC")?;
                let rows = stmt
                    .query_map(params![collection], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.iter()
                    .map(|j| serde_json::from_str(j).map_err(Error::from))
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}
