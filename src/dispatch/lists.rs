//! `LPUSH`, `RPUSH`, `LLEN`, `LRANGE`.

use bytes::Bytes;

use crate::resp::Value;
use crate::store::{Corestore, Value as StoreValue};

use super::{ensure_min_args, DispatchError, DispatchResult};

/// Shared implementation for `LPUSH` (`left = true`) and `RPUSH`
/// (`left = false`).
pub fn push(store: &Corestore, args: &[Bytes], left: bool) -> DispatchResult {
    let verb = if left { "lpush" } else { "rpush" };
    ensure_min_args(args, 3, verb)?;
    let mut ks = store.0.keyspace.lock();
    let key = args[1].clone();
    let list = ks.get_or_insert_with(&key, || StoreValue::List(Vec::new())).as_list_mut().map_err(|_| DispatchError::WrongType)?;
    for item in &args[2..] {
        if left {
            list.insert(0, item.clone());
        } else {
            list.push(item.clone());
        }
    }
    Ok(Value::Integer(list.len() as i64))
}

pub fn llen(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "llen")?;
    let mut ks = store.0.keyspace.lock();
    let len = match ks.get(&args[1]) {
        None => 0,
        Some(v) => v.as_list().map_err(|_| DispatchError::WrongType)?.len(),
    };
    Ok(Value::Integer(len as i64))
}

pub fn lrange(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 4, "lrange")?;
    let low: i64 = parse_i64(&args[2]).ok_or(DispatchError::NotInteger)?;
    let high: i64 = parse_i64(&args[3]).ok_or(DispatchError::NotInteger)?;
    let mut ks = store.0.keyspace.lock();
    let list = match ks.get(&args[1]) {
        None => return Ok(Value::array(Vec::new())),
        Some(v) => v.as_list().map_err(|_| DispatchError::WrongType)?,
    };
    let len = list.len() as i64;
    if len == 0 {
        return Ok(Value::array(Vec::new()));
    }
    let start = low.clamp(0, len - 1);
    let end = if high == -1 { len - 1 } else { high.clamp(0, len - 1) };
    if start > end {
        return Ok(Value::array(Vec::new()));
    }
    let slice = list[start as usize..=end as usize].iter().cloned().map(Value::bulk).collect();
    Ok(Value::array(slice))
}

fn parse_i64(b: &Bytes) -> Option<i64> {
    std::str::from_utf8(b).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
    }

    #[test]
    fn lpush_prepends_last_arg_first() {
        let store = Corestore::new(None);
        push(&store, &args(&["LPUSH", "l", "a", "b"]), true).unwrap();
        let v = lrange(&store, &args(&["LRANGE", "l", "0", "-1"])).unwrap();
        assert_eq!(v, Value::array(vec![Value::bulk(&b"b"[..]), Value::bulk(&b"a"[..])]));
    }

    #[test]
    fn rpush_appends_in_order() {
        let store = Corestore::new(None);
        push(&store, &args(&["RPUSH", "l", "a", "b"]), false).unwrap();
        let v = lrange(&store, &args(&["LRANGE", "l", "0", "-1"])).unwrap();
        assert_eq!(v, Value::array(vec![Value::bulk(&b"a"[..]), Value::bulk(&b"b"[..])]));
    }

    #[test]
    fn llen_of_missing_key_is_zero() {
        let store = Corestore::new(None);
        assert_eq!(llen(&store, &args(&["LLEN", "nope"])).unwrap(), Value::Integer(0));
    }

    #[test]
    fn lrange_clamps_out_of_range_indices() {
        let store = Corestore::new(None);
        push(&store, &args(&["RPUSH", "l", "a", "b", "c"]), false).unwrap();
        let v = lrange(&store, &args(&["LRANGE", "l", "0", "100"])).unwrap();
        assert_eq!(v, Value::array(vec![Value::bulk(&b"a"[..]), Value::bulk(&b"b"[..]), Value::bulk(&b"c"[..])]));
    }
}
