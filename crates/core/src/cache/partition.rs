//! Named cache partitions.
//!
//! A partition maps a request (method + URL) to a stored response. Entries
//! keep their insertion sequence so key listings come back oldest first;
//! re-storing a request moves it to the back of that order.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::http::{Request, Response};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::params;

/// A key listed from a partition, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredRequest {
    pub seq: i64,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
}

/// Handle to one named partition.
#[derive(Clone, Debug)]
pub struct Partition {
    db: CacheDb,
    name: String,
}

fn decode_response(status: i64, headers_json: &str, body: Vec<u8>) -> Result<Response, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(headers_json)?;
    let status = u16::try_from(status).map_err(|_| Error::InvalidInput(format!("stored status {status}")))?;
    Ok(Response { status, headers, body: body.into() })
}

fn insert_entry(
    conn: &rusqlite::Connection, partition: &str, request: &Request, response: &Response,
) -> Result<(), Error> {
    let key_hash = compute_cache_key(&request.method, request.url.as_str());
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "DELETE FROM partition_entries WHERE partition = ?1 AND key_hash = ?2",
        params![partition, key_hash],
    )?;
    conn.execute(
        "INSERT INTO partition_entries (partition, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            partition,
            key_hash,
            request.method.to_ascii_uppercase(),
            request.display_url(),
            response.status as i64,
            headers_json,
            response.body.to_vec(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn lookup_entry(conn: &rusqlite::Connection, partition: &str, key_hash: &str) -> Result<Option<Response>, Error> {
    let row = conn
        .query_row(
            "SELECT status, headers_json, body FROM partition_entries WHERE partition = ?1 AND key_hash = ?2",
            params![partition, key_hash],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
        )
        .optional()?;

    row.map(|(status, headers, body)| decode_response(status, &headers, body))
        .transpose()
}

impl CacheDb {
    /// Open a partition, creating it if absent.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), name: name.to_string() })
    }

    /// Whether a partition with this name exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                Ok(conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?)
            })
            .await
            .map_err(Error::from)
    }

    /// All partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if no such partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Create a partition and fill it with `entries` in one transaction.
    ///
    /// Either every entry is stored and the partition exists, or nothing is
    /// written at all. Existing entries with the same keys are replaced.
    pub async fn install_partition(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<Partition, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                for (request, response) in &entries {
                    insert_entry(&tx, &owned, request, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), name: name.to_string() })
    }

    /// Look a request up across `partitions`, in the order given.
    ///
    /// Returns the name of the partition that answered along with the
    /// response. Partitions that do not exist are skipped.
    pub async fn match_request(
        &self, partitions: &[&str], request: &Request,
    ) -> Result<Option<(String, Response)>, Error> {
        let names: Vec<String> = partitions.iter().map(|p| p.to_string()).collect();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<(String, Response)>, Error> {
                for name in names {
                    if let Some(response) = lookup_entry(conn, &name, &key_hash)? {
                        return Ok(Some((name, response)));
                    }
                }
                Ok(None)
            })
            .await
            .map_err(Error::from)
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response for `request`, replacing any previous entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let name = self.name.clone();
        let request = request.clone();
        let response = response.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_entry(&tx, &name, &request, &response)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Stored response for `request`, if any.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.db
            .conn
            .call(move |conn| lookup_entry(conn, &name, &key_hash))
            .await
            .map_err(Error::from)
    }

    /// Keys in insertion order, oldest first.
    pub async fn keys(&self) -> Result<Vec<StoredRequest>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<StoredRequest>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT seq, key_hash, method, url, stored_at FROM partition_entries
                    WHERE partition = ?1 ORDER BY seq ASC",
                )?;
                let keys = stmt
                    .query_map(params![name], |row| {
                        Ok(StoredRequest {
                            seq: row.get(0)?,
                            key_hash: row.get(1)?,
                            method: row.get(2)?,
                            url: row.get(3)?,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries.
    pub async fn len(&self) -> Result<usize, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM partition_entries WHERE partition = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry by key hash. Returns false if it was already gone.
    pub async fn delete(&self, key_hash: &str) -> Result<bool, Error> {
        let name = self.name.clone();
        let key_hash = key_hash.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM partition_entries WHERE partition = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for `request`.
    pub async fn delete_request(&self, request: &Request) -> Result<bool, Error> {
        self.delete(&compute_cache_key(&request.method, request.url.as_str()))
            .await
    }
}
