//! `HSET`, `HGET`, `HMGET`, `HGETALL`, `HINCRBY`.

use std::collections::HashMap;

use bytes::Bytes;

use crate::resp::Value;
use crate::store::{Corestore, Value as StoreValue};

use super::{ensure_min_args, DispatchError, DispatchResult};

pub fn hset(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 4, "hset")?;
    if (args.len() - 2) % 2 != 0 {
        return Err(DispatchError::WrongArity("hset"));
    }
    let mut ks = store.0.keyspace.lock();
    let key = args[1].clone();
    let hash = ks.get_or_insert_with(&key, || StoreValue::Hash(HashMap::new())).as_hash_mut().map_err(|_| DispatchError::WrongType)?;
    for pair in args[2..].chunks_exact(2) {
        hash.insert(pair[0].clone(), pair[1].clone());
    }
    Ok(Value::Integer(hash.len() as i64))
}

pub fn hget(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 3, "hget")?;
    let mut ks = store.0.keyspace.lock();
    match ks.get(&args[1]) {
        None => Ok(Value::NullBulkString),
        Some(v) => {
            let hash = v.as_hash().map_err(|_| DispatchError::WrongType)?;
            Ok(hash.get(args[2].as_ref()).cloned().map(Value::bulk).unwrap_or(Value::NullBulkString))
        }
    }
}

pub fn hmget(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 3, "hmget")?;
    let mut ks = store.0.keyspace.lock();
    let hash = match ks.get(&args[1]) {
        None => None,
        Some(v) => Some(v.as_hash().map_err(|_| DispatchError::WrongType)?),
    };
    let out = args[2..]
        .iter()
        .map(|f| match hash.and_then(|h| h.get(f.as_ref())) {
            Some(v) => Value::bulk(v.clone()),
            None => Value::NullBulkString,
        })
        .collect();
    Ok(Value::array(out))
}

pub fn hgetall(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "hgetall")?;
    let mut ks = store.0.keyspace.lock();
    let hash = match ks.get(&args[1]) {
        None => return Ok(Value::array(Vec::new())),
        Some(v) => v.as_hash().map_err(|_| DispatchError::WrongType)?,
    };
    let mut out = Vec::with_capacity(hash.len() * 2);
    for (f, v) in hash {
        out.push(Value::bulk(f.clone()));
        out.push(Value::bulk(v.clone()));
    }
    Ok(Value::array(out))
}

pub fn hincrby(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 4, "hincrby")?;
    let delta: i64 = std::str::from_utf8(&args[3]).ok().and_then(|s| s.parse().ok()).ok_or(DispatchError::NotInteger)?;
    let mut ks = store.0.keyspace.lock();
    let key = args[1].clone();
    let hash = ks.get_or_insert_with(&key, || StoreValue::Hash(HashMap::new())).as_hash_mut().map_err(|_| DispatchError::WrongType)?;
    let current: i64 = match hash.get(args[2].as_ref()) {
        None => 0,
        Some(v) => std::str::from_utf8(v).ok().and_then(|s| s.parse().ok()).ok_or(DispatchError::NotInteger)?,
    };
    let next = current.checked_add(delta).ok_or(DispatchError::NotInteger)?;
    hash.insert(args[2].clone(), Bytes::from(next.to_string()));
    Ok(Value::Integer(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
    }

    #[test]
    fn hset_then_hget() {
        let store = Corestore::new(None);
        hset(&store, &args(&["HSET", "h", "f", "v"])).unwrap();
        assert_eq!(hget(&store, &args(&["HGET", "h", "f"])).unwrap(), Value::bulk(&b"v"[..]));
    }

    #[test]
    fn hmget_mixes_present_and_missing_fields() {
        let store = Corestore::new(None);
        hset(&store, &args(&["HSET", "h", "a", "1"])).unwrap();
        let v = hmget(&store, &args(&["HMGET", "h", "a", "b"])).unwrap();
        assert_eq!(v, Value::array(vec![Value::bulk(&b"1"[..]), Value::NullBulkString]));
    }

    #[test]
    fn hincrby_defaults_to_zero() {
        let store = Corestore::new(None);
        assert_eq!(hincrby(&store, &args(&["HINCRBY", "h", "f", "5"])).unwrap(), Value::Integer(5));
        assert_eq!(hincrby(&store, &args(&["HINCRBY", "h", "f", "-2"])).unwrap(), Value::Integer(3));
    }

    #[test]
    fn hset_rejects_unpaired_args() {
        let store = Corestore::new(None);
        assert!(matches!(hset(&store, &args(&["HSET", "h", "f"])), Err(DispatchError::WrongArity(_))));
    }
}
