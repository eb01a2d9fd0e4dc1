//! Frontier substrate client (§4.B), backed by Redis.
//!
//! `url_queue` is a list, `visited_set` a set, `pages_to_index` a
//! consumer-grouped stream. Two-phase stream reads drain a consumer's
//! pending entries (id `"0"`) before new ones (id `">"`), per §4.B.

use crate::errors::FrontierError;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
pub struct Frontier {
    conn: ConnectionManager,
}

pub struct StreamMessage {
    pub id: String,
    pub fields: HashMap<String, String>,
}

impl Frontier {
    pub async fn connect(addr: &str) -> Result<Self, FrontierError> {
        let client = redis::Client::open(addr)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn enqueue(&self, list: &str, url: &str) -> Result<(), FrontierError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(list, url).await?;
        Ok(())
    }

    /// Pops the front of `list`, blocking up to `timeout`. Returns `None`
    /// (not an error) if nothing arrived before the timeout.
    pub async fn dequeue_blocking(&self, list: &str, timeout: Duration) -> Result<Option<String>, FrontierError> {
        let mut conn = self.conn.clone();
        let result: Option<(String, String)> = conn.blpop(list, timeout.as_secs_f64()).await?;
        Ok(result.map(|(_, value)| value))
    }

    pub async fn set_add(&self, set: &str, url: &str) -> Result<(), FrontierError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.sadd(set, url).await?;
        Ok(())
    }

    pub async fn set_contains(&self, set: &str, url: &str) -> Result<bool, FrontierError> {
        let mut conn = self.conn.clone();
        Ok(conn.sismember(set, url).await?)
    }

    pub async fn queue_len(&self, list: &str) -> Result<u64, FrontierError> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(list).await?)
    }

    /// Used only on explicit operator request (`--reset`).
    pub async fn reset(&self, key: &str) -> Result<(), FrontierError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    pub async fn stream_push(&self, stream: &str, fields: &[(&str, &str)]) -> Result<(), FrontierError> {
        let mut conn = self.conn.clone();
        let _: String = conn.xadd(stream, "*", fields).await?;
        Ok(())
    }

    /// Creates `stream` and `group` from `$` if absent. BUSYGROUP (the
    /// group already exists) is swallowed, not propagated.
    pub async fn stream_ensure_group(&self, stream: &str, group: &str) -> Result<(), FrontierError> {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn.xgroup_create_mkstream(stream, group, "$").await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Two-phase read: drains pending entries first, then reads new ones,
    /// returning at most `count` messages. An empty result after `block`
    /// is not an error — the caller just loops.
    pub async fn stream_read(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamMessage>, FrontierError> {
        let pending = self
            .xread(stream, group, consumer, count, "0", None)
            .await?;
        if !pending.is_empty() {
            return Ok(pending);
        }
        self.xread(stream, group, consumer, count, ">", Some(block)).await
    }

    async fn xread(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        id: &str,
        block: Option<Duration>,
    ) -> Result<Vec<StreamMessage>, FrontierError> {
        let mut conn = self.conn.clone();
        let mut opts = StreamReadOptions::default().group(group, consumer).count(count);
        if let Some(block) = block {
            opts = opts.block(block.as_millis() as usize);
        }
        let reply: StreamReadReply = conn.xread_options(&[stream], &[id], &opts).await?;
        let mut out = Vec::new();
        for key in reply.keys {
            for entry in key.ids {
                let mut fields = HashMap::new();
                for (field, value) in entry.map {
                    if let redis::Value::BulkString(bytes) = value {
                        fields.insert(field, String::from_utf8_lossy(&bytes).to_string());
                    }
                }
                out.push(StreamMessage { id: entry.id, fields });
            }
        }
        Ok(out)
    }

    pub async fn stream_ack(&self, stream: &str, group: &str, msg_id: &str) -> Result<(), FrontierError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.xack(stream, group, &[msg_id]).await?;
        Ok(())
    }
}

pub const URL_QUEUE: &str = "url_queue";
pub const VISITED_SET: &str = "visited_set";
pub const PAGES_TO_INDEX: &str = "pages_to_index";
pub const INDEXER_GROUP: &str = "indexer_group";
