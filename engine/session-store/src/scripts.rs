//! Server-side Lua transaction scripts
//!
//! Each script runs as one indivisible unit against a single session
//! key. The scripts call RedisJSON commands on the sub-fields they
//! touch instead of decoding the whole document, so the cost of a
//! mutation stays flat as `analysis_results` grows; they still return
//! the full document so callers get a consistent snapshot without a
//! second round trip.

/// Overwrite `current_analysis` and `last_activity`, refresh the TTL,
/// and return the full document. Returns nil when the key is absent.
///
/// KEYS[1] = session key
/// ARGV[1] = JSON for the current_analysis marker
/// ARGV[2] = JSON-quoted timestamp
/// ARGV[3] = TTL in seconds
pub const START_ANALYSIS: &str = r#"
local exists = redis.call('JSON.TYPE', KEYS[1], '$')
if not exists or exists[1] == false then return nil end

redis.call('JSON.SET', KEYS[1], '$.current_analysis', ARGV[1])
redis.call('JSON.SET', KEYS[1], '$.last_activity', ARGV[2])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return redis.call('JSON.GET', KEYS[1])
"#;

/// Append one metric result to `analysis_results` via JSON.ARRAPPEND
/// (no decode of the existing array), touch `last_activity`, refresh
/// the TTL, and return the full document.
///
/// KEYS[1] = session key
/// ARGV[1] = JSON for the metric result
/// ARGV[2] = JSON-quoted timestamp
/// ARGV[3] = TTL in seconds
pub const APPEND_RESULT: &str = r#"
local exists = redis.call('JSON.TYPE', KEYS[1], '$')
if not exists or exists[1] == false then return nil end

redis.call('JSON.ARRAPPEND', KEYS[1], '$.analysis_results', ARGV[1])
redis.call('JSON.SET', KEYS[1], '$.last_activity', ARGV[2])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return redis.call('JSON.GET', KEYS[1])
"#;

/// Recompute `total_value` from `holdings` and a price map. Reads only
/// the `holdings` sub-field; symbols without a price are skipped.
///
/// KEYS[1] = session key
/// ARGV[1] = JSON object mapping symbol -> price
/// ARGV[2] = JSON-quoted timestamp
/// ARGV[3] = TTL in seconds
pub const UPDATE_MARKET: &str = r#"
local raw_holdings = redis.call('JSON.GET', KEYS[1], '$.holdings')
if not raw_holdings then return nil end

local holdings = cjson.decode(raw_holdings)[1]
local prices = cjson.decode(ARGV[1])

local total = 0
for symbol, qty in pairs(holdings) do
    local price = prices[symbol]
    if price then
        total = total + (price * qty)
    end
end

redis.call('JSON.SET', KEYS[1], '$.total_value', tostring(total))
redis.call('JSON.SET', KEYS[1], '$.last_activity', ARGV[2])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return redis.call('JSON.GET', KEYS[1])
"#;
