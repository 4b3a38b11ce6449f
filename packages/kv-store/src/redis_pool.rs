//! Pooled Redis backend.

use std::sync::Arc;

use r2d2::Pool;
use redis::{Client, RedisError, Script};

use crate::{ConnectionPool, KvConnection, KvError, MemoryInfo, PoolOptions, PooledConnection};

/// Copies a string value server-side, removing the destination when the
/// source is absent. Runs as one script so no client sees a partial copy.
const COPY_SCRIPT: &str = r"
local value = redis.call('GET', KEYS[1])
if value then
    redis.call('SET', KEYS[2], value)
    return 1
end
redis.call('DEL', KEYS[2])
return 0
";

const SCAN_COUNT: u32 = 512;

fn redis_url(host: &str, port: u16) -> String {
    format!("redis://{}:{}/", host, port)
}

/// A pool of connections to one Redis server.
///
/// Building the pool opens its initial connections, so an unreachable
/// server is reported by [`RedisPool::connect`] rather than by the first
/// command.
pub struct RedisPool {
    pool: Pool<Client>,
    copy_script: Arc<Script>,
}

impl RedisPool {
    pub fn connect(host: &str, port: u16, options: &PoolOptions) -> Result<Self, KvError> {
        Self::connect_url(&redis_url(host, port), options)
    }

    /// Build a pool from a full connection URL (`redis://host:port/db`).
    pub fn connect_url(url: &str, options: &PoolOptions) -> Result<Self, KvError> {
        log::debug!("Opening Redis pool for {} (max {})", url, options.max_size);

        let client = Client::open(url)?;
        let pool = Pool::builder()
            .max_size(options.max_size)
            .connection_timeout(options.connection_timeout)
            .build(client)?;

        Ok(Self {
            pool,
            copy_script: Arc::new(Script::new(COPY_SCRIPT)),
        })
    }
}

impl ConnectionPool for RedisPool {
    fn connection(&self) -> Result<PooledConnection, KvError> {
        let conn = self.pool.get()?;
        Ok(Box::new(RedisConnection {
            conn,
            copy_script: Arc::clone(&self.copy_script),
        }))
    }
}

struct RedisConnection {
    conn: r2d2::PooledConnection<Client>,
    copy_script: Arc<Script>,
}

fn offset(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl KvConnection for RedisConnection {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(redis::cmd("GET").arg(key).query(&mut *self.conn)?)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query::<()>(&mut *self.conn)?;
        Ok(())
    }

    fn set_if_absent(&mut self, key: &str, value: &[u8]) -> Result<bool, KvError> {
        // SET NX replies OK when stored and nil when the key exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query(&mut *self.conn)?;
        Ok(reply.is_some())
    }

    fn get_range(&mut self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, KvError> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(redis::cmd("GETRANGE")
            .arg(key)
            .arg(offset(start))
            .arg(offset(end))
            .query(&mut *self.conn)?)
    }

    fn set_range(&mut self, key: &str, offset: u64, value: &[u8]) -> Result<u64, KvError> {
        Ok(redis::cmd("SETRANGE")
            .arg(key)
            .arg(offset)
            .arg(value)
            .query(&mut *self.conn)?)
    }

    fn strlen(&mut self, key: &str) -> Result<u64, KvError> {
        Ok(redis::cmd("STRLEN").arg(key).query(&mut *self.conn)?)
    }

    fn exists(&mut self, key: &str) -> Result<bool, KvError> {
        Ok(redis::cmd("EXISTS").arg(key).query(&mut *self.conn)?)
    }

    fn is_hash(&mut self, key: &str) -> Result<bool, KvError> {
        let kind: String = redis::cmd("TYPE").arg(key).query(&mut *self.conn)?;
        Ok(kind == "hash")
    }

    fn delete(&mut self, keys: &[&str]) -> Result<u64, KvError> {
        if keys.is_empty() {
            return Ok(0);
        }
        Ok(redis::cmd("DEL").arg(keys).query(&mut *self.conn)?)
    }

    fn scan_keys(&mut self, pattern: &str) -> Result<Vec<String>, KvError> {
        // SCAN may return a key more than once across iterations.
        let mut seen = std::collections::HashSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query(&mut *self.conn)?;
            seen.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(seen.into_iter().collect())
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<(), KvError> {
        match redis::cmd("RENAME")
            .arg(src)
            .arg(dst)
            .query::<()>(&mut *self.conn)
        {
            Ok(()) => Ok(()),
            Err(e) if is_no_such_key(&e) => Err(KvError::NoSuchKey {
                key: src.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn copy_value(&mut self, src: &str, dst: &str) -> Result<bool, KvError> {
        let copied: i64 = self
            .copy_script
            .key(src)
            .key(dst)
            .invoke(&mut *self.conn)?;
        Ok(copied == 1)
    }

    fn hash_get(&mut self, key: &str, field: &str) -> Result<Option<String>, KvError> {
        Ok(redis::cmd("HGET").arg(key).arg(field).query(&mut *self.conn)?)
    }

    fn memory_info(&mut self) -> Result<MemoryInfo, KvError> {
        let report: String = redis::cmd("INFO").arg("memory").query(&mut *self.conn)?;
        Ok(MemoryInfo::parse(&report))
    }
}

fn is_no_such_key(e: &RedisError) -> bool {
    e.kind() == redis::ErrorKind::ResponseError
        && e.to_string().to_lowercase().contains("no such key")
}

impl From<RedisError> for KvError {
    fn from(e: RedisError) -> Self {
        if e.is_io_error()
            || e.is_connection_dropped()
            || e.is_connection_refusal()
            || e.is_timeout()
        {
            KvError::Connection(Box::new(e))
        } else {
            KvError::Command {
                message: e.to_string(),
            }
        }
    }
}

impl From<r2d2::Error> for KvError {
    fn from(e: r2d2::Error) -> Self {
        KvError::Pool {
            message: e.to_string(),
        }
    }
}
