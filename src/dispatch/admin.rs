//! Connection-agnostic housekeeping commands: `PING`, `ECHO`, `TYPE`,
//! `KEYS`, `EXISTS`, `DEL`, `CONFIG`, `CLIENT`, `SAVE`.

use bytes::Bytes;

use crate::resp::Value;
use crate::store::{value, Corestore};

use super::{ensure_min_args, DispatchError, DispatchResult};

pub fn ping(args: &[Bytes]) -> DispatchResult {
    match args.len() {
        1 => Ok(Value::SimpleString(Bytes::from_static(b"PONG"))),
        2 => Ok(Value::bulk(args[1].clone())),
        _ => Err(DispatchError::WrongArity("ping")),
    }
}

pub fn echo(args: &[Bytes]) -> DispatchResult {
    if args.len() != 2 {
        return Err(DispatchError::WrongArity("echo"));
    }
    Ok(Value::bulk(args[1].clone()))
}

pub fn type_of(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "type")?;
    let mut ks = store.0.keyspace.lock();
    let name = match ks.get(&args[1]) {
        Some(v) => v.type_name(),
        None => value::TYPE_NONE,
    };
    Ok(Value::SimpleString(Bytes::from_static(name.as_bytes())))
}

pub fn keys(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "keys")?;
    if args[1].as_ref() != b"*" {
        return Err(DispatchError::NotImplemented("KEYS only supports the '*' pattern"));
    }
    let mut ks = store.0.keyspace.lock();
    Ok(Value::array(ks.keys().into_iter().map(Value::bulk).collect()))
}

pub fn exists(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "exists")?;
    let mut ks = store.0.keyspace.lock();
    let count = args[1..].iter().filter(|k| ks.exists(k)).count();
    Ok(Value::Integer(count as i64))
}

pub fn del(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "del")?;
    let mut ks = store.0.keyspace.lock();
    let count = args[1..].iter().filter(|k| ks.remove(k)).count();
    Ok(Value::Integer(count as i64))
}

pub fn config(args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 2, "config")?;
    let sub = String::from_utf8_lossy(&args[1]).to_ascii_uppercase();
    match sub.as_str() {
        "GET" if args.len() == 3 => Ok(Value::array(vec![Value::bulk(args[2].clone()), Value::NullBulkString])),
        "GET" => Err(DispatchError::WrongArity("config|get")),
        _ => Err(DispatchError::NotImplemented("CONFIG only supports GET")),
    }
}

pub fn client(_args: &[Bytes]) -> DispatchResult {
    Ok(Value::ok())
}

pub fn save(store: &Corestore, _args: &[Bytes]) -> DispatchResult {
    let path = store.0.rdb_path.full_path();
    let ks = store.0.keyspace.lock();
    crate::persist::rdb::save(&path, &ks).map_err(|e| DispatchError::Io(format!("SAVE failed: {e}")))?;
    Ok(Value::ok())
}
