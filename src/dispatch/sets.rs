//! `SADD`, `SREM`, `SISMEMBER`, `SINTER`, `SCARD`, `SMEMBERS`.

use std::collections::HashSet;

use bytes::Bytes;

use crate::resp::Value;
use crate::store::{Corestore, Value as StoreValue};

use super::{ensure_min_args, DispatchError, DispatchResult};

pub fn sadd(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 3, "sadd")?;
    let mut ks = store.0.keyspace.lock();
    let key = args[1].clone();
    let set = ks.get_or_insert_with(&key, || StoreValue::Set(HashSet::new())).as_set_mut().map_err(|_| DispatchError::WrongType)?;
    let added = args[2..].iter().filter(|m| set.insert((*m).clone())).count();
    Ok(Value::Integer(added as i64))
}

pub fn srem(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 3, "srem")?;
    let mut ks = store.0.keyspace.lock();
    let removed = match ks.get_mut(&args[1]) {
        None => 0,
        Some(v) => {
            let set = v.as_set_mut().map_err(|_| DispatchError::WrongType)?;
            args[2..].iter().filter(|m| set.remove(m.as_ref())).count()
        }
    };
    Ok(Value::Integer(removed as i64))
}

pub fn sismember(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 3, "sismember")?;
    let mut ks = store.0.keyspace.lock();
    let present = match ks.get(&args[1]) {
        None => false,
        Some(v) => v.as_set().map_err(|_| DispatchError::WrongType)?.contains(args[2].as_ref()),
    };
    Ok(Value::Integer(present as i64))
}

pub fn sinter(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "sinter")?;
    let mut ks = store.0.keyspace.lock();
    let mut sets = Vec::with_capacity(args.len() - 1);
    for key in &args[1..] {
        match ks.get(key) {
            None => return Ok(Value::array(Vec::new())),
            Some(v) => sets.push(v.as_set().map_err(|_| DispatchError::WrongType)?.clone()),
        }
    }
    let mut result = sets[0].clone();
    for s in &sets[1..] {
        result.retain(|m| s.contains(m));
    }
    Ok(Value::array(result.into_iter().map(Value::bulk).collect()))
}

pub fn scard(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "scard")?;
    let mut ks = store.0.keyspace.lock();
    let len = match ks.get(&args[1]) {
        None => 0,
        Some(v) => v.as_set().map_err(|_| DispatchError::WrongType)?.len(),
    };
    Ok(Value::Integer(len as i64))
}

pub fn smembers(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "smembers")?;
    let mut ks = store.0.keyspace.lock();
    let members = match ks.get(&args[1]) {
        None => Vec::new(),
        Some(v) => v.as_set().map_err(|_| DispatchError::WrongType)?.iter().cloned().collect(),
    };
    Ok(Value::array(members.into_iter().map(Value::bulk).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
    }

    #[test]
    fn sadd_counts_only_new_members() {
        let store = Corestore::new(None);
        assert_eq!(sadd(&store, &args(&["SADD", "s", "a", "b"])).unwrap(), Value::Integer(2));
        assert_eq!(sadd(&store, &args(&["SADD", "s", "a", "c"])).unwrap(), Value::Integer(1));
    }

    #[test]
    fn sinter_of_missing_key_is_empty() {
        let store = Corestore::new(None);
        sadd(&store, &args(&["SADD", "s1", "a"])).unwrap();
        let v = sinter(&store, &args(&["SINTER", "s1", "s2"])).unwrap();
        assert_eq!(v, Value::array(Vec::new()));
    }

    #[test]
    fn sismember_reports_membership() {
        let store = Corestore::new(None);
        sadd(&store, &args(&["SADD", "s", "a"])).unwrap();
        assert_eq!(sismember(&store, &args(&["SISMEMBER", "s", "a"])).unwrap(), Value::Integer(1));
        assert_eq!(sismember(&store, &args(&["SISMEMBER", "s", "b"])).unwrap(), Value::Integer(0));
    }

    #[test]
    fn srem_removes_and_counts() {
        let store = Corestore::new(None);
        sadd(&store, &args(&["SADD", "s", "a", "b"])).unwrap();
        assert_eq!(srem(&store, &args(&["SREM", "s", "a", "z"])).unwrap(), Value::Integer(1));
        assert_eq!(scard(&store, &args(&["SCARD", "s"])).unwrap(), Value::Integer(1));
    }
}
