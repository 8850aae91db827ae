//! Command dispatch: maps one parsed command frame to a store operation
//! and a response value.
//!
//! Organized the way the teacher's `actions` module is — one function
//! per command, grouped into submodules by the value type they
//! operate on — with a single top-level verb match standing in for the
//! teacher's `queryengine::execute_simple` dispatch loop.

pub mod admin;
pub mod hashes;
pub mod lists;
pub mod sets;
pub mod streams;
pub mod strings;

use bytes::Bytes;

use crate::resp::Value;
use crate::store::Corestore;

#[derive(Debug)]
pub enum DispatchError {
    WrongArity(&'static str),
    UnknownCommand(Bytes),
    WrongType,
    NotInteger,
    InvalidStreamId,
    NotImplemented(&'static str),
    /// A command-triggered I/O operation (currently only `SAVE`) failed.
    /// Distinct from AOF append failures, which are logged as warnings
    /// per §7 rather than surfaced to the client.
    Io(String),
}

impl DispatchError {
    pub fn into_value(self) -> Value {
        let msg: Bytes = match self {
            DispatchError::WrongArity(verb) => format!("ERR wrong number of arguments for '{verb}' command").into(),
            DispatchError::UnknownCommand(cmd) => {
                format!("ERR unknown command '{}'", String::from_utf8_lossy(&cmd)).into()
            }
            DispatchError::WrongType => "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
            DispatchError::NotInteger => "ERR value is not an integer or out of range".into(),
            DispatchError::InvalidStreamId => "ERR Invalid stream ID specified as stream command argument".into(),
            DispatchError::NotImplemented(what) => format!("ERR not implemented: {what}").into(),
            DispatchError::Io(what) => format!("ERR {what}").into(),
        };
        Value::error(msg)
    }
}

pub type DispatchResult = Result<Value, DispatchError>;

/// The set of verbs whose successful execution must be appended to the
/// append-only log before the response reaches the client.
fn is_mutating(verb: &str) -> bool {
    matches!(
        verb,
        "SET" | "DEL" | "INCR" | "DECR" | "LPUSH" | "RPUSH" | "HSET" | "HINCRBY" | "SADD" | "SREM" | "XADD"
    )
}

fn verb_of(args: &[Bytes]) -> String {
    String::from_utf8_lossy(&args[0]).to_ascii_uppercase()
}

/// Executes one command, appending it to the AOF first if it mutates
/// the keyspace and produced no dispatch error. Used by the connection
/// server for live traffic.
pub fn execute(store: &Corestore, args: Vec<Bytes>) -> Value {
    if args.is_empty() {
        return DispatchError::UnknownCommand(Bytes::new()).into_value();
    }
    let verb = verb_of(&args);
    let mutating = is_mutating(&verb);
    let result = run(store, &verb, &args);
    if mutating && result.is_ok() {
        if let Some(writer) = store.0.aof.lock().as_mut() {
            if let Err(e) = writer.append(&args) {
                log::error!("failed to append to AOF: {e}");
            }
        }
    }
    match result {
        Ok(v) => v,
        Err(e) => e.into_value(),
    }
}

/// Like [`execute`] but never writes to the AOF, used when replaying
/// the AOF itself at startup (re-logging replayed commands would
/// duplicate every record on the next restart).
pub fn execute_no_log(store: &Corestore, args: Vec<Bytes>) -> Value {
    if args.is_empty() {
        return DispatchError::UnknownCommand(Bytes::new()).into_value();
    }
    let verb = verb_of(&args);
    match run(store, &verb, &args) {
        Ok(v) => v,
        Err(e) => e.into_value(),
    }
}

fn run(store: &Corestore, verb: &str, args: &[Bytes]) -> DispatchResult {
    match verb {
        "PING" => admin::ping(args),
        "ECHO" => admin::echo(args),
        "TYPE" => admin::type_of(store, args),
        "KEYS" => admin::keys(store, args),
        "EXISTS" => admin::exists(store, args),
        "DEL" => admin::del(store, args),
        "CONFIG" => admin::config(args),
        "CLIENT" => admin::client(args),
        "SAVE" => admin::save(store, args),

        "SET" => strings::set(store, args),
        "GET" => strings::get(store, args),
        "INCR" => strings::incr(store, args, 1),
        "DECR" => strings::incr(store, args, -1),

        "LPUSH" => lists::push(store, args, true),
        "RPUSH" => lists::push(store, args, false),
        "LLEN" => lists::llen(store, args),
        "LRANGE" => lists::lrange(store, args),

        "HSET" => hashes::hset(store, args),
        "HGET" => hashes::hget(store, args),
        "HMGET" => hashes::hmget(store, args),
        "HGETALL" => hashes::hgetall(store, args),
        "HINCRBY" => hashes::hincrby(store, args),

        "SADD" => sets::sadd(store, args),
        "SREM" => sets::srem(store, args),
        "SISMEMBER" => sets::sismember(store, args),
        "SINTER" => sets::sinter(store, args),
        "SCARD" => sets::scard(store, args),
        "SMEMBERS" => sets::smembers(store, args),

        "XADD" => streams::xadd(store, args),
        "XRANGE" => streams::xrange(store, args),
        "XREAD" => streams::xread(store, args),

        _ => Err(DispatchError::UnknownCommand(args[0].clone())),
    }
}

/// Checks `args.len()` (including the verb at index 0) against an
/// expected minimum, the common arity guard shared by every handler.
pub(crate) fn ensure_min_args(args: &[Bytes], min: usize, verb: &'static str) -> Result<(), DispatchError> {
    if args.len() < min {
        Err(DispatchError::WrongArity(verb))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
    }

    #[test]
    fn unknown_command_is_an_error() {
        let store = Corestore::new(None);
        let v = execute(&store, args(&["NOPE"]));
        assert!(matches!(v, Value::SimpleError(_)));
    }

    #[test]
    fn ping_without_args() {
        let store = Corestore::new(None);
        assert_eq!(execute(&store, args(&["PING"])), Value::SimpleString(Bytes::from_static(b"PONG")));
    }

    #[test]
    fn set_then_get_round_trip() {
        let store = Corestore::new(None);
        execute(&store, args(&["SET", "k", "v"]));
        assert_eq!(execute(&store, args(&["GET", "k"])), Value::bulk(&b"v"[..]));
    }

    #[test]
    fn wrong_type_does_not_mutate() {
        let store = Corestore::new(None);
        execute(&store, args(&["SET", "k", "v"]));
        let err = execute(&store, args(&["LPUSH", "k", "x"]));
        assert!(matches!(err, Value::SimpleError(_)));
        // the string value must be untouched
        assert_eq!(execute(&store, args(&["GET", "k"])), Value::bulk(&b"v"[..]));
    }
}
