//! `XADD`, `XRANGE`, `XREAD`.
//!
//! `XREAD ... BLOCK` is split across two layers: this module only ever
//! performs one non-blocking scan ([`xread_scan`]) and exposes the
//! parsed options ([`parse_xread`]) so the connection server (C6) can
//! drive the actual wait loop on [`crate::store::Corestore::notify_writers`]
//! without holding the keyspace lock while blocked — see `src/net`.

use bytes::Bytes;

use crate::resp::Value;
use crate::store::stream::{parse_id_spec, Entry, IdSpec, Stream, StreamId, XaddError};
use crate::store::{Corestore, Value as StoreValue};
use crate::util::now_ms;

use super::{ensure_min_args, DispatchError, DispatchResult};

pub fn xadd(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 5, "xadd")?;
    if (args.len() - 3) % 2 != 0 {
        return Err(DispatchError::WrongArity("xadd"));
    }
    let id_raw = std::str::from_utf8(&args[2]).map_err(|_| DispatchError::InvalidStreamId)?;
    let spec = parse_id_spec(id_raw);
    if matches!(spec, IdSpec::Invalid(_)) {
        return Err(DispatchError::InvalidStreamId);
    }
    let fields: Vec<(Bytes, Bytes)> = args[3..].chunks_exact(2).map(|c| (c[0].clone(), c[1].clone())).collect();

    let mut ks = store.0.keyspace.lock();
    let key = args[1].clone();
    let stream =
        ks.get_or_insert_with(&key, || StoreValue::Stream(Stream::new())).as_stream_mut().map_err(|_| DispatchError::WrongType)?;
    let id = stream.resolve_id(&spec, now_ms()).map_err(|e| match e {
        XaddError::ZeroId | XaddError::NotStrictlyIncreasing => DispatchError::InvalidStreamId,
    })?;
    stream.insert(id, fields);
    drop(ks);
    store.notify_writers();
    Ok(Value::bulk(id.render()))
}

pub fn xrange(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    ensure_min_args(args, 4, "xrange")?;
    let start = parse_range_bound(&args[2], StreamId::ZERO).ok_or(DispatchError::InvalidStreamId)?;
    let end = parse_range_bound(&args[3], StreamId { ms: u64::MAX, seq: u64::MAX }).ok_or(DispatchError::InvalidStreamId)?;
    let mut ks = store.0.keyspace.lock();
    let entries = match ks.get(&args[1]) {
        None => Vec::new(),
        Some(v) => v.as_stream().map_err(|_| DispatchError::WrongType)?.range(start, end).into_iter().map(entry_to_value).collect(),
    };
    Ok(Value::array(entries))
}

fn parse_range_bound(raw: &Bytes, open: StreamId) -> Option<StreamId> {
    match raw.as_ref() {
        b"-" | b"+" => Some(open),
        _ => {
            let s = std::str::from_utf8(raw).ok()?;
            if let Some(id) = StreamId::parse_explicit(s) {
                return Some(id);
            }
            // A bare `ms` expands to its first/last possible sequence
            // depending on which bound it's used for.
            let ms: u64 = s.parse().ok()?;
            Some(if open.seq == 0 { StreamId { ms, seq: 0 } } else { StreamId { ms, seq: u64::MAX } })
        }
    }
}

fn entry_to_value(e: &Entry) -> Value {
    let mut fields = Vec::with_capacity(e.fields.len() * 2);
    for (f, v) in &e.fields {
        fields.push(Value::bulk(f.clone()));
        fields.push(Value::bulk(v.clone()));
    }
    Value::array(vec![Value::bulk(e.id.render()), Value::array(fields)])
}

pub struct XreadOptions {
    pub keys: Vec<Bytes>,
    pub after: Vec<StreamId>,
    /// `Some(None)` means `BLOCK` with no timeout (indefinite, bounded
    /// by the caller's own ceiling); `Some(Some(ms))` a finite timeout.
    pub block_ms: Option<Option<u64>>,
    /// `COUNT n`: caps the number of entries returned per stream.
    pub count: Option<usize>,
}

pub fn parse_xread(args: &[Bytes]) -> Result<XreadOptions, DispatchError> {
    ensure_min_args(args, 4, "xread")?;
    let mut i = 1;
    let mut block_ms = None;
    let mut count = None;
    let mut streams_idx = None;
    while i < args.len() {
        let word = String::from_utf8_lossy(&args[i]).to_ascii_uppercase();
        match word.as_str() {
            "BLOCK" => {
                let ms: u64 = std::str::from_utf8(args.get(i + 1).ok_or(DispatchError::WrongArity("xread"))?)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(DispatchError::NotInteger)?;
                block_ms = Some(if ms == 0 { None } else { Some(ms) });
                i += 2;
            }
            "COUNT" => {
                let n: usize = std::str::from_utf8(args.get(i + 1).ok_or(DispatchError::WrongArity("xread"))?)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(DispatchError::NotInteger)?;
                count = Some(n);
                i += 2;
            }
            "STREAMS" => {
                streams_idx = Some(i + 1);
                break;
            }
            _ => return Err(DispatchError::WrongArity("xread")),
        }
    }
    let streams_idx = streams_idx.ok_or(DispatchError::WrongArity("xread"))?;
    let rest = &args[streams_idx..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(DispatchError::WrongArity("xread"));
    }
    let n = rest.len() / 2;
    let keys = rest[..n].to_vec();
    let mut after = Vec::with_capacity(n);
    for raw in &rest[n..] {
        let s = std::str::from_utf8(raw).map_err(|_| DispatchError::InvalidStreamId)?;
        after.push(StreamId::parse_explicit(s).ok_or(DispatchError::InvalidStreamId)?);
    }
    Ok(XreadOptions { keys, after, block_ms, count })
}

/// One non-blocking scan across all requested streams. Returns
/// `Value::NullArray` if none had new entries.
pub fn xread_scan(store: &Corestore, opts: &XreadOptions) -> DispatchResult {
    let mut ks = store.0.keyspace.lock();
    let mut results = Vec::new();
    for (key, after) in opts.keys.iter().zip(opts.after.iter()) {
        let mut entries = match ks.get(key) {
            None => continue,
            Some(v) => v.as_stream().map_err(|_| DispatchError::WrongType)?.after(*after),
        };
        if let Some(count) = opts.count {
            entries.truncate(count);
        }
        if entries.is_empty() {
            continue;
        }
        let values: Vec<Value> = entries.into_iter().map(entry_to_value).collect();
        results.push(Value::array(vec![Value::bulk(key.clone()), Value::array(values)]));
    }
    Ok(if results.is_empty() { Value::NullArray } else { Value::array(results) })
}

/// Non-blocking entry point used by the synchronous dispatcher (AOF
/// replay, and plain `XREAD` without `BLOCK`). Real blocking is driven
/// by the connection server using [`parse_xread`] and [`xread_scan`]
/// directly.
pub fn xread(store: &Corestore, args: &[Bytes]) -> DispatchResult {
    let opts = parse_xread(args)?;
    xread_scan(store, &opts)
}
