//! Lua sources for the Redis adapter, one per [`Procedure`].
//!
//! Every script returns integers (never Lua booleans) so replies survive the
//! Lua-to-RESP conversion intact. Missing values read through `GET` come back
//! as `false` in Lua and are turned into `0` or passed through as nil.

use crate::domain::procedure::Procedure;

const COUNTER_INCREMENT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local delta = tonumber(ARGV[1])
if ARGV[2] ~= '' and current + delta > tonumber(ARGV[2]) then
  return {current, 0}
end
return {redis.call('INCRBY', KEYS[1], ARGV[1]), 1}
"#;

const RATE_LIMIT_HIT: &str = r#"
local limit = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local count = tonumber(redis.call('GET', KEYS[1]) or '0')
if count >= limit then
  local ttl = redis.call('TTL', KEYS[1])
  if ttl <= 0 then ttl = window end
  return {0, count, ttl}
end
count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], window)
end
local ttl = redis.call('TTL', KEYS[1])
if ttl <= 0 then ttl = window end
return {1, count, ttl}
"#;

const LOCK_ACQUIRE: &str = r#"
local holder = redis.call('GET', KEYS[1])
if not holder then
  redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
  return {'acquired', tonumber(ARGV[2])}
end
if holder == ARGV[1] then
  redis.call('EXPIRE', KEYS[1], ARGV[2])
  return {'renewed', tonumber(ARGV[2])}
end
return {'locked_by_other', redis.call('TTL', KEYS[1])}
"#;

const LOCK_RELEASE: &str = r#"
local holder = redis.call('GET', KEYS[1])
if not holder then
  return {'not_found', 0}
end
if holder == ARGV[1] then
  redis.call('DEL', KEYS[1])
  return {'released', 0}
end
return {'not_owner', redis.call('TTL', KEYS[1])}
"#;

const INVENTORY_DECREMENT: &str = r#"
local stock = tonumber(redis.call('GET', KEYS[1]) or '0')
local sold = tonumber(redis.call('GET', KEYS[2]) or '0')
local quantity = tonumber(ARGV[2])
if redis.call('EXISTS', KEYS[3]) == 1 then
  return {'duplicate_order', stock, sold, stock}
end
if stock < quantity then
  return {'insufficient_stock', stock, sold, stock}
end
local new_stock = redis.call('DECRBY', KEYS[1], quantity)
local new_sold = redis.call('INCRBY', KEYS[2], quantity)
redis.call('HSET', KEYS[3],
  'productId', ARGV[1],
  'quantity', ARGV[2],
  'timestamp', ARGV[4],
  'status', 'confirmed',
  'stockBefore', tostring(stock),
  'stockAfter', tostring(new_stock))
redis.call('LPUSH', KEYS[4], cjson.encode({
  orderId = ARGV[3],
  quantity = quantity,
  timestamp = tonumber(ARGV[4]),
  stockAfter = new_stock
}))
return {'confirmed', new_stock, new_sold, stock}
"#;

const INVENTORY_RESTOCK: &str = r#"
return redis.call('INCRBY', KEYS[1], ARGV[1])
"#;

const INVENTORY_SNAPSHOT: &str = r#"
local stock = tonumber(redis.call('GET', KEYS[1]) or '0')
local sold = tonumber(redis.call('GET', KEYS[2]) or '0')
return {stock, sold}
"#;

const ORDER_LOOKUP: &str = r#"
return redis.call('HMGET', KEYS[1],
  'productId', 'quantity', 'timestamp', 'status', 'stockBefore', 'stockAfter')
"#;

const SALES_HISTORY: &str = r#"
return redis.call('LRANGE', KEYS[1], 0, tonumber(ARGV[1]) - 1)
"#;

const BATCH: &str = r#"
local results = {}
for i, key in ipairs(KEYS) do
  local op = ARGV[2 * i - 1]
  local value = ARGV[2 * i]
  if op == 'set' then
    results[i] = redis.call('SET', key, value)
  elseif op == 'get' then
    results[i] = redis.call('GET', key)
  elseif op == 'incr' then
    results[i] = redis.call('INCRBY', key, value)
  elseif op == 'del' then
    results[i] = redis.call('DEL', key)
  else
    return redis.error_reply('ERR unknown batch op ' .. tostring(op))
  end
end
return results
"#;

/// Lua source implementing `procedure`.
pub(crate) fn source(procedure: Procedure) -> &'static str {
    match procedure {
        Procedure::CounterIncrement => COUNTER_INCREMENT,
        Procedure::RateLimitHit => RATE_LIMIT_HIT,
        Procedure::LockAcquire => LOCK_ACQUIRE,
        Procedure::LockRelease => LOCK_RELEASE,
        Procedure::InventoryDecrement => INVENTORY_DECREMENT,
        Procedure::InventoryRestock => INVENTORY_RESTOCK,
        Procedure::InventorySnapshot => INVENTORY_SNAPSHOT,
        Procedure::OrderLookup => ORDER_LOOKUP,
        Procedure::SalesHistory => SALES_HISTORY,
        Procedure::Batch => BATCH,
    }
}
