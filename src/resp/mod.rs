//! The RESP (REdis Serialization Protocol) wire codec.
//!
//! [`Value`] is the typed in-memory form of a RESP frame. [`parser`]
//! turns a byte buffer into a `Value` incrementally (a connection may
//! see a frame split across several TCP reads); [`Value::write_into`]
//! does the reverse.

pub mod parser;

use bytes::{Bytes, BytesMut};

pub use parser::{ParseError, ParseOutcome, Parser};

/// One decoded RESP value, or the intent to send one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    SimpleString(Bytes),
    SimpleError(Bytes),
    Integer(i64),
    Null,
    Boolean(bool),
    BulkString(Bytes),
    BulkError(Bytes),
    /// Absent bulk string (`$-1\r\n`), distinct from an empty one.
    NullBulkString,
    Array(Vec<Value>),
    /// Absent array (`*-1\r\n`), distinct from an empty one.
    NullArray,
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
}

impl Value {
    pub fn ok() -> Self {
        Value::SimpleString(Bytes::from_static(b"OK"))
    }

    pub fn error(msg: impl Into<Bytes>) -> Self {
        Value::SimpleError(msg.into())
    }

    pub fn bulk(bytes: impl Into<Bytes>) -> Self {
        Value::BulkString(bytes.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items)
    }

    /// Serialize this value into `out`, appending to any existing
    /// contents (callers reuse one `BytesMut` per connection write).
    pub fn write_into(&self, out: &mut BytesMut) {
        match self {
            Value::SimpleString(s) => {
                out.extend_from_slice(b"+");
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            Value::SimpleError(s) => {
                out.extend_from_slice(b"-");
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            Value::Integer(i) => {
                out.extend_from_slice(b":");
                out.extend_from_slice(i.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Value::Null => out.extend_from_slice(b"_\r\n"),
            Value::Boolean(b) => {
                out.extend_from_slice(if *b { b"#t\r\n" } else { b"#f\r\n" });
            }
            Value::BulkString(s) => {
                out.extend_from_slice(b"$");
                out.extend_from_slice(s.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            Value::BulkError(s) => {
                out.extend_from_slice(b"!");
                out.extend_from_slice(s.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            Value::NullBulkString => out.extend_from_slice(b"$-1\r\n"),
            Value::Array(items) => {
                out.extend_from_slice(b"*");
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_into(out);
                }
            }
            Value::NullArray => out.extend_from_slice(b"*-1\r\n"),
            Value::Map(pairs) => {
                out.extend_from_slice(b"%");
                out.extend_from_slice(pairs.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for (k, v) in pairs {
                    k.write_into(out);
                    v.write_into(out);
                }
            }
            Value::Set(items) => {
                out.extend_from_slice(b"~");
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_into(out);
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.write_into(&mut out);
        out.freeze()
    }

    /// Unwraps a client command frame (array of bulk strings) into its
    /// raw byte arguments. Used by the dispatcher, which only ever
    /// receives client-originated arrays.
    pub fn into_command_args(self) -> Option<Vec<Bytes>> {
        match self {
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::BulkString(b) => Some(b),
                    Value::SimpleString(b) => Some(b),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_string_roundtrip() {
        let v = Value::SimpleString(Bytes::from_static(b"OK"));
        assert_eq!(v.to_bytes(), &b"+OK\r\n"[..]);
    }

    #[test]
    fn bulk_string_roundtrip() {
        let v = Value::bulk(&b"hello"[..]);
        assert_eq!(v.to_bytes(), &b"$5\r\nhello\r\n"[..]);
    }

    #[test]
    fn null_bulk_string() {
        assert_eq!(Value::NullBulkString.to_bytes(), &b"$-1\r\n"[..]);
    }

    #[test]
    fn array_of_bulk_strings() {
        let v = Value::array(vec![Value::bulk(&b"a"[..]), Value::bulk(&b"bc"[..])]);
        assert_eq!(v.to_bytes(), &b"*2\r\n$1\r\na\r\n$2\r\nbc\r\n"[..]);
    }

    #[test]
    fn integer_and_null_and_bool() {
        assert_eq!(Value::Integer(-7).to_bytes(), &b":-7\r\n"[..]);
        assert_eq!(Value::Null.to_bytes(), &b"_\r\n"[..]);
        assert_eq!(Value::Boolean(true).to_bytes(), &b"#t\r\n"[..]);
    }

    #[test]
    fn into_command_args_extracts_bulk_strings() {
        let v = Value::array(vec![Value::bulk(&b"SET"[..]), Value::bulk(&b"k"[..])]);
        let args = v.into_command_args().unwrap();
        assert_eq!(args, vec![Bytes::from_static(b"SET"), Bytes::from_static(b"k")]);
    }
}
