//! Recursive-descent RESP parser.
//!
//! Mirrors the cursor-over-buffer shape of a classic Skyhash parser
//! (read a sizeline, then that many bytes) but walks a safe `&[u8]`
//! slice with an explicit position rather than raw pointers, and
//! understands RESP's own prefix set instead of Skytable's tsymbols.
//! A frame that isn't fully buffered yet reports [`ParseOutcome::Incomplete`]
//! rather than erroring, so the connection loop can wait for more bytes.

use bytes::Bytes;

use super::Value;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The leading byte isn't one of the known RESP type prefixes.
    UnknownType(u8),
    /// A sizeline (`$<n>`, `*<n>`, ...) wasn't a valid non-negative (or
    /// `-1`) integer.
    BadLength,
    /// A bulk payload's declared length didn't terminate in `\r\n`.
    MissingTerminator,
    /// The buffer was empty.
    Empty,
}

pub enum ParseOutcome {
    /// A full frame was decoded, consuming `usize` bytes from the front
    /// of the input.
    Complete(Value, usize),
    /// Not enough bytes buffered yet; the caller should read more and
    /// retry with a longer slice.
    Incomplete,
}

/// A cursor over a byte slice that is not consumed by the caller: each
/// parse attempt starts fresh from the beginning of the buffer, and the
/// caller drains `consumed` bytes from its own buffer on success.
pub struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Attempts to parse exactly one RESP value from the front of the
    /// buffer.
    pub fn parse(buf: &'a [u8]) -> Result<ParseOutcome, ParseError> {
        if buf.is_empty() {
            return Err(ParseError::Empty);
        }
        let mut p = Parser::new(buf);
        match p.parse_value() {
            Ok(Some(v)) => Ok(ParseOutcome::Complete(v, p.pos)),
            Ok(None) => Ok(ParseOutcome::Incomplete),
            Err(e) => Err(e),
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Reads bytes up to (not including) the next `\r\n`, advancing past
    /// it. Returns `None` if no `\r\n` is buffered yet.
    fn read_line(&mut self) -> Result<Option<&'a [u8]>, ParseError> {
        let rest = self.remaining();
        match find_crlf(rest) {
            Some(idx) => {
                let line = &rest[..idx];
                self.pos += idx + 2;
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    fn read_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        let rest = self.remaining();
        if rest.len() < n {
            return None;
        }
        let out = &rest[..n];
        self.pos += n;
        Some(out)
    }

    /// Reads an ASCII decimal (optionally `-`-prefixed) integer sizeline.
    fn read_length(&mut self) -> Result<Option<i64>, ParseError> {
        match self.read_line()? {
            None => Ok(None),
            Some(line) => parse_i64(line).map(Some).ok_or(ParseError::BadLength),
        }
    }

    fn parse_value(&mut self) -> Result<Option<Value>, ParseError> {
        let Some(&prefix) = self.remaining().first() else {
            return Ok(None);
        };
        self.pos += 1;
        match prefix {
            b'+' => Ok(self.read_line()?.map(|l| Value::SimpleString(Bytes::copy_from_slice(l)))),
            b'-' => Ok(self.read_line()?.map(|l| Value::SimpleError(Bytes::copy_from_slice(l)))),
            b':' => match self.read_line()? {
                None => Ok(None),
                Some(line) => parse_i64(line)
                    .map(|i| Some(Value::Integer(i)))
                    .ok_or(ParseError::BadLength),
            },
            b'_' => match self.read_line()? {
                None => Ok(None),
                Some(_) => Ok(Some(Value::Null)),
            },
            b'#' => match self.read_exact(1) {
                None => Ok(None),
                Some(b) => {
                    let val = match b[0] {
                        b't' => true,
                        b'f' => false,
                        other => return Err(ParseError::UnknownType(other)),
                    };
                    match self.read_exact(2) {
                        Some(term) if term == b"\r\n" => Ok(Some(Value::Boolean(val))),
                        Some(_) => Err(ParseError::MissingTerminator),
                        None => Ok(None),
                    }
                }
            },
            b'$' => self.parse_bulk(false),
            b'!' => self.parse_bulk(true),
            b'*' => self.parse_aggregate(AggKind::Array),
            b'%' => self.parse_aggregate(AggKind::Map),
            b'~' => self.parse_aggregate(AggKind::Set),
            other => Err(ParseError::UnknownType(other)),
        }
    }

    fn parse_bulk(&mut self, is_error: bool) -> Result<Option<Value>, ParseError> {
        let len = match self.read_length()? {
            None => return Ok(None),
            Some(l) => l,
        };
        if len == -1 {
            return Ok(Some(if is_error { Value::BulkError(Bytes::new()) } else { Value::NullBulkString }));
        }
        if len < 0 {
            return Err(ParseError::BadLength);
        }
        let len = len as usize;
        let payload = match self.read_exact(len) {
            None => return Ok(None),
            Some(p) => Bytes::copy_from_slice(p),
        };
        match self.read_exact(2) {
            None => Ok(None),
            Some(term) if term == b"\r\n" => {
                Ok(Some(if is_error { Value::BulkError(payload) } else { Value::BulkString(payload) }))
            }
            Some(_) => Err(ParseError::MissingTerminator),
        }
    }

    fn parse_aggregate(&mut self, kind: AggKind) -> Result<Option<Value>, ParseError> {
        let count = match self.read_length()? {
            None => return Ok(None),
            Some(c) => c,
        };
        if count == -1 {
            return Ok(Some(match kind {
                AggKind::Array => Value::NullArray,
                // RESP has no null-map/null-set wire form; treat as empty.
                AggKind::Map | AggKind::Set => Value::Array(Vec::new()),
            }));
        }
        if count < 0 {
            return Err(ParseError::BadLength);
        }
        let count = count as usize;
        match kind {
            AggKind::Array | AggKind::Set => {
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    match self.parse_value()? {
                        Some(v) => items.push(v),
                        None => return Ok(None),
                    }
                }
                Ok(Some(if kind == AggKind::Set { Value::Set(items) } else { Value::Array(items) }))
            }
            AggKind::Map => {
                let mut pairs = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    let key = match self.parse_value()? {
                        Some(v) => v,
                        None => return Ok(None),
                    };
                    let val = match self.parse_value()? {
                        Some(v) => v,
                        None => return Ok(None),
                    };
                    pairs.push((key, val));
                }
                Ok(Some(Value::Map(pairs)))
            }
        }
    }
}

#[derive(PartialEq, Eq)]
enum AggKind {
    Array,
    Map,
    Set,
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\r' && buf[i + 1] == b'\n' {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn parse_i64(line: &[u8]) -> Option<i64> {
    std::str::from_utf8(line).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(buf: &[u8]) -> (Value, usize) {
        match Parser::parse(buf).unwrap() {
            ParseOutcome::Complete(v, n) => (v, n),
            ParseOutcome::Incomplete => panic!("expected complete frame"),
        }
    }

    #[test]
    fn parses_simple_string() {
        let (v, n) = complete(b"+OK\r\n");
        assert_eq!(v, Value::SimpleString(Bytes::from_static(b"OK")));
        assert_eq!(n, 5);
    }

    #[test]
    fn parses_integer() {
        let (v, _) = complete(b":1000\r\n");
        assert_eq!(v, Value::Integer(1000));
    }

    #[test]
    fn parses_negative_integer() {
        let (v, _) = complete(b":-42\r\n");
        assert_eq!(v, Value::Integer(-42));
    }

    #[test]
    fn parses_bulk_string() {
        let (v, n) = complete(b"$5\r\nhello\r\n");
        assert_eq!(v, Value::BulkString(Bytes::from_static(b"hello")));
        assert_eq!(n, 11);
    }

    #[test]
    fn parses_null_bulk_string() {
        let (v, _) = complete(b"$-1\r\n");
        assert_eq!(v, Value::NullBulkString);
    }

    #[test]
    fn parses_empty_bulk_string() {
        let (v, _) = complete(b"$0\r\n\r\n");
        assert_eq!(v, Value::BulkString(Bytes::new()));
    }

    #[test]
    fn parses_command_array() {
        let (v, n) = complete(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n");
        let args = v.into_command_args().unwrap();
        assert_eq!(args, vec![Bytes::from_static(b"GET"), Bytes::from_static(b"k")]);
        assert_eq!(n, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n".len());
    }

    #[test]
    fn parses_nested_array() {
        let (v, _) = complete(b"*1\r\n*2\r\n:1\r\n:2\r\n");
        assert_eq!(v, Value::Array(vec![Value::Array(vec![Value::Integer(1), Value::Integer(2)])]));
    }

    #[test]
    fn parses_map() {
        let (v, _) = complete(b"%1\r\n+k\r\n+v\r\n");
        assert_eq!(
            v,
            Value::Map(vec![(
                Value::SimpleString(Bytes::from_static(b"k")),
                Value::SimpleString(Bytes::from_static(b"v"))
            )])
        );
    }

    #[test]
    fn incomplete_bulk_string_waits_for_more_bytes() {
        match Parser::parse(b"$5\r\nhel").unwrap() {
            ParseOutcome::Incomplete => {}
            ParseOutcome::Complete(..) => panic!("should not be complete"),
        }
    }

    #[test]
    fn incomplete_sizeline_waits() {
        match Parser::parse(b"*2\r\n$3\r\nGET").unwrap() {
            ParseOutcome::Incomplete => {}
            ParseOutcome::Complete(..) => panic!("should not be complete"),
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert_eq!(Parser::parse(b"@nope\r\n").unwrap_err(), ParseError::UnknownType(b'@'));
    }

    #[test]
    fn bad_bulk_terminator_is_an_error() {
        assert_eq!(Parser::parse(b"$3\r\nabcXX").unwrap_err(), ParseError::MissingTerminator);
    }

    #[test]
    fn boolean_values() {
        assert_eq!(complete(b"#t\r\n").0, Value::Boolean(true));
        assert_eq!(complete(b"#f\r\n").0, Value::Boolean(false));
    }
}
