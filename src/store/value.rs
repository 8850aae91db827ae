//! The tagged-union value type held per key.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;

use super::stream::Stream;

/// The kind name returned by `TYPE` and used in WRONGTYPE messages.
pub const TYPE_STRING: &str = "string";
pub const TYPE_LIST: &str = "list";
pub const TYPE_SET: &str = "set";
pub const TYPE_HASH: &str = "hash";
pub const TYPE_STREAM: &str = "stream";
pub const TYPE_NONE: &str = "none";

#[derive(Debug, Clone)]
pub enum Value {
    Str(Bytes),
    List(Vec<Bytes>),
    Set(HashSet<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
    Stream(Stream),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => TYPE_STRING,
            Value::List(_) => TYPE_LIST,
            Value::Set(_) => TYPE_SET,
            Value::Hash(_) => TYPE_HASH,
            Value::Stream(_) => TYPE_STREAM,
        }
    }

    pub fn as_str(&self) -> Result<&Bytes, &'static str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.type_name()),
        }
    }

    pub fn as_list(&self) -> Result<&Vec<Bytes>, &'static str> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(other.type_name()),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut Vec<Bytes>, &'static str> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(other.type_name()),
        }
    }

    pub fn as_set_mut(&mut self) -> Result<&mut HashSet<Bytes>, &'static str> {
        match self {
            Value::Set(s) => Ok(s),
            other => Err(other.type_name()),
        }
    }

    pub fn as_set(&self) -> Result<&HashSet<Bytes>, &'static str> {
        match self {
            Value::Set(s) => Ok(s),
            other => Err(other.type_name()),
        }
    }

    pub fn as_hash(&self) -> Result<&HashMap<Bytes, Bytes>, &'static str> {
        match self {
            Value::Hash(h) => Ok(h),
            other => Err(other.type_name()),
        }
    }

    pub fn as_hash_mut(&mut self) -> Result<&mut HashMap<Bytes, Bytes>, &'static str> {
        match self {
            Value::Hash(h) => Ok(h),
            other => Err(other.type_name()),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream, &'static str> {
        match self {
            Value::Stream(s) => Ok(s),
            other => Err(other.type_name()),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream, &'static str> {
        match self {
            Value::Stream(s) => Ok(s),
            other => Err(other.type_name()),
        }
    }
}
