//! In-process store running every procedure under one mutex.
//!
//! Mirrors the observable behavior of the Redis scripts, including key
//! expiry (driven by the injected clock) and the store's integer semantics,
//! so the same tests pass against both adapters.

use crate::application::ports::{AtomicStore, Clock, StoreError};
use crate::domain::counter::exceeds_max;
use crate::domain::inventory::{OrderStatus, SaleRecord, ORDER_FIELDS};
use crate::domain::lock::{AcquireStatus, ReleaseStatus};
use crate::domain::procedure::Procedure;
use crate::domain::reply::{KeyTtl, Reply};
use crate::infrastructure::clock::SystemClock;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Calls between full sweeps of expired keys.
const SWEEP_EVERY: u64 = 1024;

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";
const OVERFLOW: &str = "ERR increment or decrement would overflow";
const INVALID_EXPIRE: &str = "ERR invalid expire time in 'set' command";

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<SystemTime>,
}

impl Entry {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
}

impl Keyspace {
    fn live(&mut self, key: &str, now: SystemTime) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn exists(&mut self, key: &str, now: SystemTime) -> bool {
        self.live(key, now).is_some()
    }

    fn get_str(&mut self, key: &str, now: SystemTime) -> Result<Option<String>, StoreError> {
        match self.live(key, now) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(command(WRONG_TYPE)),
        }
    }

    fn get_int(&mut self, key: &str, now: SystemTime) -> Result<i64, StoreError> {
        match self.get_str(key, now)? {
            None => Ok(0),
            Some(s) => s.parse().map_err(|_| command(NOT_AN_INTEGER)),
        }
    }

    /// Plain SET: replaces the value and clears any expiry.
    fn set_str(&mut self, key: &str, value: String, expires_at: Option<SystemTime>) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value),
                expires_at,
            },
        );
    }

    /// INCRBY: keeps the existing expiry.
    fn incr_by(&mut self, key: &str, by: i64, now: SystemTime) -> Result<i64, StoreError> {
        let current = self.get_int(key, now)?;
        let next = current.checked_add(by).ok_or_else(|| command(OVERFLOW))?;
        match self.live(key, now) {
            Some(entry) => entry.value = Value::Str(next.to_string()),
            None => self.set_str(key, next.to_string(), None),
        }
        Ok(next)
    }

    fn expire(&mut self, key: &str, at: SystemTime, now: SystemTime) {
        if let Some(entry) = self.live(key, now) {
            entry.expires_at = Some(at);
        }
    }

    fn del(&mut self, key: &str, now: SystemTime) -> i64 {
        if self.exists(key, now) {
            self.entries.remove(key);
            1
        } else {
            0
        }
    }

    /// TTL in whole seconds, rounded to nearest like the Redis `TTL` command.
    fn ttl(&mut self, key: &str, now: SystemTime) -> KeyTtl {
        match self.live(key, now) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let millis = at.duration_since(now).unwrap_or_default().as_millis();
                KeyTtl::Seconds(((millis + 500) / 1000) as u64)
            }
        }
    }

    fn hset_all(
        &mut self,
        key: &str,
        fields: impl IntoIterator<Item = (String, String)>,
        now: SystemTime,
    ) -> Result<(), StoreError> {
        if !self.exists(key, now) {
            self.entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Hash(HashMap::new()),
                    expires_at: None,
                },
            );
        }
        match self.entries.get_mut(key) {
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => {
                hash.extend(fields);
                Ok(())
            }
            _ => Err(command(WRONG_TYPE)),
        }
    }

    fn hmget(&mut self, key: &str, fields: &[&str], now: SystemTime) -> Result<Reply, StoreError> {
        let values = match self.live(key, now) {
            None => vec![Reply::Nil; fields.len()],
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => fields
                .iter()
                .map(|f| hash.get(*f).map_or(Reply::Nil, |v| Reply::text(v.clone())))
                .collect(),
            Some(_) => return Err(command(WRONG_TYPE)),
        };
        Ok(Reply::Array(values))
    }

    fn lpush(&mut self, key: &str, value: String, now: SystemTime) -> Result<(), StoreError> {
        if !self.exists(key, now) {
            self.entries.insert(
                key.to_string(),
                Entry {
                    value: Value::List(VecDeque::new()),
                    expires_at: None,
                },
            );
        }
        match self.entries.get_mut(key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => {
                list.push_front(value);
                Ok(())
            }
            _ => Err(command(WRONG_TYPE)),
        }
    }

    fn lrange_head(
        &mut self,
        key: &str,
        count: usize,
        now: SystemTime,
    ) -> Result<Vec<Reply>, StoreError> {
        match self.live(key, now) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(list.iter().take(count).cloned().map(Reply::Text).collect()),
            Some(_) => Err(command(WRONG_TYPE)),
        }
    }

    fn sweep(&mut self, now: SystemTime) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

/// In-process [`AtomicStore`].
///
/// Every procedure runs while holding a single mutex, which gives the same
/// all-or-nothing isolation a Redis script has. Clones share the data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    keyspace: Arc<Mutex<Keyspace>>,
    clock: Arc<dyn Clock>,
    calls: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create an empty store whose key expiry follows `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            keyspace: Arc::new(Mutex::new(Keyspace::default())),
            clock,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of keys held, including expired keys not swept yet.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired key now and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock().sweep(now)
    }

    /// Write a plain string value, replacing whatever the key held.
    ///
    /// For seeding state (e.g. initial stock) outside the procedures.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.lock().set_str(key, value.into(), None);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Keyspace> {
        self.keyspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(
        &self,
        procedure: Procedure,
        keys: &[String],
        args: &[String],
    ) -> Result<Reply, StoreError> {
        let now = self.clock.now();
        let mut space = self.lock();

        if self.calls.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let swept = space.sweep(now);
            tracing::trace!(swept, "swept expired keys");
        }

        match procedure {
            Procedure::CounterIncrement => counter_increment(&mut space, keys, args, now),
            Procedure::RateLimitHit => rate_limit_hit(&mut space, keys, args, now),
            Procedure::LockAcquire => lock_acquire(&mut space, keys, args, now),
            Procedure::LockRelease => lock_release(&mut space, keys, args, now),
            Procedure::InventoryDecrement => inventory_decrement(&mut space, keys, args, now),
            Procedure::InventoryRestock => {
                let stock = space.incr_by(key(keys, 0)?, int_arg(args, 0)?, now)?;
                Ok(Reply::Integer(stock))
            }
            Procedure::InventorySnapshot => {
                let stock = space.get_int(key(keys, 0)?, now)?;
                let sold = space.get_int(key(keys, 1)?, now)?;
                Ok(Reply::Array(vec![Reply::Integer(stock), Reply::Integer(sold)]))
            }
            Procedure::OrderLookup => space.hmget(key(keys, 0)?, &ORDER_FIELDS, now),
            Procedure::SalesHistory => {
                let limit = usize::try_from(int_arg(args, 0)?).unwrap_or(0);
                Ok(Reply::Array(space.lrange_head(key(keys, 0)?, limit, now)?))
            }
            Procedure::Batch => batch(&mut space, keys, args, now),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AtomicStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        self.lock().get_str(key, now)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = self.clock.now();
        Ok(self.lock().ttl(key, now))
    }

    async fn atomic_exec(
        &self,
        procedure: Procedure,
        keys: &[String],
        args: &[String],
    ) -> Result<Reply, StoreError> {
        self.run(procedure, keys, args)
    }
}

fn command(detail: &str) -> StoreError {
    StoreError::Command(detail.to_string())
}

fn key(keys: &[String], index: usize) -> Result<&str, StoreError> {
    keys.get(index)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Command(format!("ERR missing key {}", index + 1)))
}

fn arg(args: &[String], index: usize) -> Result<&str, StoreError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Command(format!("ERR missing argument {}", index + 1)))
}

fn int_arg(args: &[String], index: usize) -> Result<i64, StoreError> {
    arg(args, index)?
        .parse()
        .map_err(|_| command(NOT_AN_INTEGER))
}

fn seconds_arg(args: &[String], index: usize) -> Result<u64, StoreError> {
    u64::try_from(int_arg(args, index)?).map_err(|_| command(INVALID_EXPIRE))
}

/// Absolute expiry `seconds` from `now`; computed before any write so an
/// unrepresentable TTL leaves the keyspace untouched.
fn expiry(now: SystemTime, seconds: u64) -> Result<SystemTime, StoreError> {
    now.checked_add(Duration::from_secs(seconds))
        .ok_or_else(|| command(INVALID_EXPIRE))
}

fn counter_increment(
    space: &mut Keyspace,
    keys: &[String],
    args: &[String],
    now: SystemTime,
) -> Result<Reply, StoreError> {
    let key = key(keys, 0)?;
    let delta = int_arg(args, 0)?;
    let max = match arg(args, 1)? {
        "" => None,
        _ => Some(int_arg(args, 1)?),
    };

    let current = space.get_int(key, now)?;
    if exceeds_max(current, delta, max) {
        return Ok(Reply::Array(vec![Reply::Integer(current), Reply::Integer(0)]));
    }
    let value = space.incr_by(key, delta, now)?;
    Ok(Reply::Array(vec![Reply::Integer(value), Reply::Integer(1)]))
}

fn rate_limit_hit(
    space: &mut Keyspace,
    keys: &[String],
    args: &[String],
    now: SystemTime,
) -> Result<Reply, StoreError> {
    let key = key(keys, 0)?;
    let limit = int_arg(args, 0)?;
    let window = seconds_arg(args, 1)?;

    let count = space.get_int(key, now)?;
    if count >= limit {
        let reset = window_reset(space.ttl(key, now), window);
        return Ok(Reply::Array(vec![
            Reply::Integer(0),
            Reply::Integer(count),
            Reply::Integer(reset),
        ]));
    }

    let expires_at = expiry(now, window)?;
    let count = space.incr_by(key, 1, now)?;
    if count == 1 {
        space.expire(key, expires_at, now);
    }
    let reset = window_reset(space.ttl(key, now), window);
    Ok(Reply::Array(vec![
        Reply::Integer(1),
        Reply::Integer(count),
        Reply::Integer(reset),
    ]))
}

fn window_reset(ttl: KeyTtl, window: u64) -> i64 {
    let seconds = crate::domain::rate_window::reset_seconds(ttl, window);
    i64::try_from(seconds).unwrap_or(i64::MAX)
}

fn lock_acquire(
    space: &mut Keyspace,
    keys: &[String],
    args: &[String],
    now: SystemTime,
) -> Result<Reply, StoreError> {
    let key = key(keys, 0)?;
    let token = arg(args, 0)?;
    let ttl = seconds_arg(args, 1)?;
    let ttl_reply = Reply::Integer(int_arg(args, 1)?);

    match space.get_str(key, now)? {
        None => {
            space.set_str(key, token.to_string(), Some(expiry(now, ttl)?));
            Ok(Reply::Array(vec![
                Reply::text(AcquireStatus::Acquired.as_str()),
                ttl_reply,
            ]))
        }
        Some(holder) if holder == token => {
            space.expire(key, expiry(now, ttl)?, now);
            Ok(Reply::Array(vec![
                Reply::text(AcquireStatus::Renewed.as_str()),
                ttl_reply,
            ]))
        }
        Some(_) => Ok(Reply::Array(vec![
            Reply::text(AcquireStatus::LockedByOther.as_str()),
            Reply::Integer(space.ttl(key, now).code()),
        ])),
    }
}

fn lock_release(
    space: &mut Keyspace,
    keys: &[String],
    args: &[String],
    now: SystemTime,
) -> Result<Reply, StoreError> {
    let key = key(keys, 0)?;
    let token = arg(args, 0)?;

    let (status, remaining) = match space.get_str(key, now)? {
        None => (ReleaseStatus::NotFound, 0),
        Some(holder) if holder == token => {
            space.del(key, now);
            (ReleaseStatus::Released, 0)
        }
        Some(_) => (ReleaseStatus::NotOwner, space.ttl(key, now).code()),
    };
    Ok(Reply::Array(vec![
        Reply::text(status.as_str()),
        Reply::Integer(remaining),
    ]))
}

fn inventory_decrement(
    space: &mut Keyspace,
    keys: &[String],
    args: &[String],
    now: SystemTime,
) -> Result<Reply, StoreError> {
    let (stock_key, sold_key, order_key, sales_key) =
        (key(keys, 0)?, key(keys, 1)?, key(keys, 2)?, key(keys, 3)?);
    let product_id = arg(args, 0)?;
    let quantity = int_arg(args, 1)?;
    let order_id = arg(args, 2)?;
    let timestamp = arg(args, 3)?;

    let stock = space.get_int(stock_key, now)?;
    let sold = space.get_int(sold_key, now)?;
    let rejected = |status: &str| {
        Reply::Array(vec![
            Reply::text(status),
            Reply::Integer(stock),
            Reply::Integer(sold),
            Reply::Integer(stock),
        ])
    };

    if space.exists(order_key, now) {
        return Ok(rejected("duplicate_order"));
    }
    if stock < quantity {
        return Ok(rejected("insufficient_stock"));
    }

    let new_stock = space.incr_by(stock_key, -quantity, now)?;
    let new_sold = space.incr_by(sold_key, quantity, now)?;

    let values = [
        product_id.to_string(),
        quantity.to_string(),
        timestamp.to_string(),
        OrderStatus::Confirmed.as_str().to_string(),
        stock.to_string(),
        new_stock.to_string(),
    ];
    space.hset_all(
        order_key,
        ORDER_FIELDS.iter().map(|f| f.to_string()).zip(values),
        now,
    )?;

    let sale = SaleRecord {
        order_id: order_id.to_string(),
        quantity,
        timestamp: timestamp.parse().map_err(|_| command(NOT_AN_INTEGER))?,
        stock_after: new_stock,
    };
    let entry = sale
        .to_json()
        .map_err(|e| StoreError::Command(format!("ERR encoding sale: {}", e)))?;
    space.lpush(sales_key, entry, now)?;

    Ok(Reply::Array(vec![
        Reply::text("confirmed"),
        Reply::Integer(new_stock),
        Reply::Integer(new_sold),
        Reply::Integer(stock),
    ]))
}

fn batch(
    space: &mut Keyspace,
    keys: &[String],
    args: &[String],
    now: SystemTime,
) -> Result<Reply, StoreError> {
    let mut results = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let op = arg(args, 2 * i)?;
        let value = arg(args, 2 * i + 1)?;
        let result = match op {
            "set" => {
                space.set_str(key, value.to_string(), None);
                Reply::text("OK")
            }
            "get" => space.get_str(key, now)?.map_or(Reply::Nil, Reply::Text),
            "incr" => Reply::Integer(space.incr_by(key, int_arg(args, 2 * i + 1)?, now)?),
            "del" => Reply::Integer(space.del(key, now)),
            other => return Err(StoreError::Command(format!("ERR unknown batch op {:?}", other))),
        };
        results.push(result);
    }
    Ok(Reply::Array(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;

    fn store() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::at_unix_seconds(1_000_000);
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn exec(store: &MemoryStore, p: Procedure, keys: &[&str], args: &[&str]) -> Reply {
        store
            .atomic_exec(p, &strings(keys), &strings(args))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_keys_expire_with_the_clock() {
        let (store, clock) = store();
        exec(&store, Procedure::LockAcquire, &["lock"], &["a", "10"]).await;

        assert_eq!(store.ttl("lock").await.unwrap(), KeyTtl::Seconds(10));
        clock.advance(Duration::from_millis(9_400));
        assert_eq!(store.ttl("lock").await.unwrap(), KeyTtl::Seconds(1));
        clock.advance(Duration::from_millis(600));
        assert_eq!(store.get("lock").await.unwrap(), None);
        assert_eq!(store.ttl("lock").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_set_clears_expiry_and_incr_keeps_it() {
        let (store, _clock) = store();
        exec(&store, Procedure::RateLimitHit, &["w"], &["5", "60"]).await;
        exec(&store, Procedure::Batch, &["w"], &["incr", "2"]).await;
        assert_eq!(store.ttl("w").await.unwrap(), KeyTtl::Seconds(60));

        exec(&store, Procedure::Batch, &["w"], &["set", "9"]).await;
        assert_eq!(store.ttl("w").await.unwrap(), KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_command_error() {
        let (store, _clock) = store();
        store.set("s", "5");
        exec(
            &store,
            Procedure::InventoryDecrement,
            &["s", "d", "order:1", "sales"],
            &["p", "1", "1", "0"],
        )
        .await;

        let err = store
            .atomic_exec(Procedure::CounterIncrement, &strings(&["order:1"]), &strings(&["1", ""]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Command(ref m) if m.starts_with("WRONGTYPE")));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_counter_overflow_is_rejected_not_wrapped() {
        let (store, _clock) = store();
        store.set("c", i64::MAX.to_string());

        let err = store
            .atomic_exec(Procedure::CounterIncrement, &strings(&["c"]), &strings(&["1", ""]))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Command(OVERFLOW.to_string()));
        assert_eq!(store.get("c").await.unwrap(), Some(i64::MAX.to_string()));
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_a_command_error() {
        let (store, _clock) = store();
        let huge = i64::MAX.to_string();

        for (procedure, args) in [
            (Procedure::LockAcquire, ["a", huge.as_str()]),
            (Procedure::RateLimitHit, ["5", huge.as_str()]),
        ] {
            let err = store
                .atomic_exec(procedure, &strings(&["k"]), &strings(&args))
                .await
                .unwrap_err();
            assert_eq!(err, StoreError::Command(INVALID_EXPIRE.to_string()));
        }
        assert!(store.is_empty());

        // Renewal with a huge TTL keeps the existing expiry
        exec(&store, Procedure::LockAcquire, &["k"], &["a", "10"]).await;
        let err = store
            .atomic_exec(
                Procedure::LockAcquire,
                &strings(&["k"]),
                &strings(&["a", huge.as_str()]),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Command(INVALID_EXPIRE.to_string()));
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Seconds(10));
    }

    #[tokio::test]
    async fn test_batch_stops_at_failing_op() {
        let (store, _clock) = store();
        store.set("text", "abc");

        let err = store
            .atomic_exec(
                Procedure::Batch,
                &strings(&["a", "text", "b"]),
                &strings(&["set", "1", "incr", "1", "set", "2"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, clock) = store();
        exec(&store, Procedure::RateLimitHit, &["w1"], &["5", "1"]).await;
        exec(&store, Procedure::RateLimitHit, &["w2"], &["5", "100"]).await;
        store.set("plain", "x");
        assert_eq!(store.len(), 3);

        clock.advance(Duration::from_secs(2));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_batch_op() {
        let (store, _clock) = store();
        let err = store
            .atomic_exec(Procedure::Batch, &strings(&["k"]), &strings(&["flushall", ""]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
    }
}
