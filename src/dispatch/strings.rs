//! `SET`, `GET`, `INCR`, `DECR`.

use bytes::Bytes;

use crate::resp::Value;
use crate::store::{Corestore, Value as StoreValue};
use crate::util::now_ms;

use super::{ensure_min_args, DispatchError, DispatchResult};

pub fn set(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 3, "set")?;
    let key = args[1].clone();
    let value = args[2].clone();
    let expires_at = match args.get(3) {
        None => None,
        Some(opt) => {
            let opt = String::from_utf8_lossy(opt).to_ascii_uppercase();
            let amount: u64 = args.get(4).ok_or(DispatchError::WrongArity("set"))?.as_ref().iter().fold(Some(0u64), |acc, &b| {
                acc.and_then(|a| if b.is_ascii_digit() { Some(a * 10 + (b - b'0') as u64) } else { None })
            }).ok_or(DispatchError::NotInteger)?;
            match opt.as_str() {
                "PX" => Some(now_ms() + amount),
                "EX" => Some(now_ms() + amount * 1000),
                "AT" => Some(amount),
                _ => return Err(DispatchError::NotImplemented("SET only supports PX/EX/AT expiry options")),
            }
        }
    };
    let mut ks = store.0.keyspace.lock();
    ks.set(key, StoreValue::Str(value), expires_at);
    Ok(Value::ok())
}

pub fn get(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "get")?;
    let mut ks = store.0.keyspace.lock();
    match ks.get(&args[1]) {
        None => Ok(Value::NullBulkString),
        Some(v) => v.as_str().map(|s| Value::bulk(s.clone())).map_err(|_| DispatchError::WrongType),
    }
}

/// Shared implementation for `INCR` (`delta = 1`) and `DECR`
/// (`delta = -1`).
pub fn incr(store: &Corestore, args: &[Bytes], delta: i64) -> DispatchResult {
    ensure_min_args(args, 2, if delta >= 0 { "incr" } else { "decr" })?;
    let verb = if delta >= 0 { "incr" } else { "decr" };
    let mut ks = store.0.keyspace.lock();
    let current: i64 = match ks.get(&args[1]) {
        None => 0,
        Some(v) => {
            let s = v.as_str().map_err(|_| DispatchError::WrongType)?;
            std::str::from_utf8(s).ok().and_then(|s| s.parse().ok()).ok_or(DispatchError::NotInteger)?
        }
    };
    let next = current.checked_add(delta).ok_or(DispatchError::NotInteger)?;
    let _ = verb;
    ks.set(args[1].clone(), StoreValue::Str(Bytes::from(next.to_string())), None);
    Ok(Value::Integer(next))
}
