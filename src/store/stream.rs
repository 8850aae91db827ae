//! Stream entries, ID generation, and range/read queries.

use bytes::Bytes;

use super::radix::RadixTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    pub fn key(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.ms.to_be_bytes());
        out[8..].copy_from_slice(&self.seq.to_be_bytes());
        out
    }

    pub fn from_key(key: &[u8]) -> Self {
        let ms = u64::from_be_bytes(key[..8].try_into().unwrap());
        let seq = u64::from_be_bytes(key[8..].try_into().unwrap());
        StreamId { ms, seq }
    }

    pub fn render(&self) -> String {
        format!("{}-{}", self.ms, self.seq)
    }

    /// Parses a fully-explicit `"<ms>-<seq>"` form.
    pub fn parse_explicit(s: &str) -> Option<Self> {
        let (ms, seq) = s.split_once('-')?;
        Some(StreamId { ms: ms.parse().ok()?, seq: seq.parse().ok()? })
    }
}

#[derive(Debug)]
pub enum IdSpec<'a> {
    /// `*` — fully server-generated.
    Auto,
    /// `<ms>-*` — server picks the sequence number.
    AutoSeq(u64),
    /// `<ms>-<seq>` — fully explicit.
    Explicit(StreamId),
    /// Anything else passed by a caller (used to report parse errors
    /// with the original text).
    Invalid(&'a str),
}

pub fn parse_id_spec(raw: &str) -> IdSpec<'_> {
    if raw == "*" {
        return IdSpec::Auto;
    }
    match raw.split_once('-') {
        Some((ms, "*")) => match ms.parse() {
            Ok(ms) => IdSpec::AutoSeq(ms),
            Err(_) => IdSpec::Invalid(raw),
        },
        Some((ms, seq)) => match (ms.parse(), seq.parse()) {
            (Ok(ms), Ok(seq)) => IdSpec::Explicit(StreamId { ms, seq }),
            _ => IdSpec::Invalid(raw),
        },
        None => IdSpec::Invalid(raw),
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: StreamId,
    pub fields: Vec<(Bytes, Bytes)>,
}

#[derive(Debug, Default)]
pub struct Stream {
    tree: RadixTree<Entry>,
    top: Option<StreamId>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum XaddError {
    /// Explicit `0-0`.
    ZeroId,
    /// ID is not strictly greater than the stream's current top ID.
    NotStrictlyIncreasing,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> Option<StreamId> {
        self.top
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Resolves an `IdSpec` against the current top ID, generating a
    /// concrete ID for wildcard forms and validating explicit ones.
    ///
    /// `now_ms` supplies the current wall-clock time for `*`.
    pub fn resolve_id(&self, spec: &IdSpec<'_>, now_ms: u64) -> Result<StreamId, XaddError> {
        match spec {
            IdSpec::Auto => Ok(match self.top {
                Some(top) if top.ms >= now_ms => StreamId { ms: top.ms, seq: top.seq + 1 },
                _ => StreamId { ms: now_ms, seq: 0 },
            }),
            IdSpec::AutoSeq(ms) => match self.top {
                Some(top) if *ms < top.ms => Err(XaddError::NotStrictlyIncreasing),
                Some(top) if *ms == top.ms => Ok(StreamId { ms: *ms, seq: top.seq + 1 }),
                _ => Ok(StreamId { ms: *ms, seq: 0 }),
            },
            IdSpec::Explicit(id) => {
                // `0-0` is never admissible; `0-1` is, on an empty
                // stream, via the ordinary strictly-increasing check
                // below (there is no top yet to compare against).
                if id.ms == 0 && id.seq == 0 {
                    return Err(XaddError::ZeroId);
                }
                match self.top {
                    Some(top) if *id <= top => Err(XaddError::NotStrictlyIncreasing),
                    _ => Ok(*id),
                }
            }
            IdSpec::Invalid(_) => unreachable!("caller must reject IdSpec::Invalid before resolving"),
        }
    }

    /// Inserts a pre-resolved entry, updating the top ID. Caller must
    /// have validated the ID via [`Stream::resolve_id`] first.
    pub fn insert(&mut self, id: StreamId, fields: Vec<(Bytes, Bytes)>) {
        self.tree.insert(&id.key(), Entry { id, fields });
        self.top = Some(match self.top {
            Some(t) if t >= id => t,
            _ => id,
        });
    }

    fn all_ordered(&self) -> Vec<&Entry> {
        self.tree.iter_ordered().into_iter().map(|(_, e)| e).collect()
    }

    /// Inclusive `[start, end]` range, in ID order.
    pub fn range(&self, start: StreamId, end: StreamId) -> Vec<&Entry> {
        self.all_ordered().into_iter().filter(|e| e.id >= start && e.id <= end).collect()
    }

    /// All entries with ID strictly greater than `after`, in ID order,
    /// used by `XREAD`'s exclusive-start semantics.
    pub fn after(&self, after: StreamId) -> Vec<&Entry> {
        self.all_ordered().into_iter().filter(|e| e.id > after).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(Bytes, Bytes)> {
        pairs.iter().map(|(k, v)| (Bytes::copy_from_slice(k.as_bytes()), Bytes::copy_from_slice(v.as_bytes()))).collect()
    }

    #[test]
    fn auto_id_uses_now_when_ahead_of_top() {
        let s = Stream::new();
        let id = s.resolve_id(&IdSpec::Auto, 1000).unwrap();
        assert_eq!(id, StreamId { ms: 1000, seq: 0 });
    }

    #[test]
    fn auto_id_bumps_seq_when_clock_hasnt_advanced() {
        let mut s = Stream::new();
        s.insert(StreamId { ms: 1000, seq: 0 }, fields(&[("a", "1")]));
        let id = s.resolve_id(&IdSpec::Auto, 1000).unwrap();
        assert_eq!(id, StreamId { ms: 1000, seq: 1 });
    }

    #[test]
    fn explicit_zero_zero_is_rejected() {
        let s = Stream::new();
        let err = s.resolve_id(&IdSpec::Explicit(StreamId::ZERO), 1000).unwrap_err();
        assert_eq!(err, XaddError::ZeroId);
    }

    #[test]
    fn explicit_zero_one_is_admissible_on_empty_stream() {
        let s = Stream::new();
        let id = s.resolve_id(&IdSpec::Explicit(StreamId { ms: 0, seq: 1 }), 1000).unwrap();
        assert_eq!(id, StreamId { ms: 0, seq: 1 });
    }

    #[test]
    fn explicit_id_not_greater_than_top_is_rejected() {
        let mut s = Stream::new();
        s.insert(StreamId { ms: 5, seq: 5 }, fields(&[("a", "1")]));
        assert_eq!(
            s.resolve_id(&IdSpec::Explicit(StreamId { ms: 5, seq: 5 }), 1000).unwrap_err(),
            XaddError::NotStrictlyIncreasing
        );
        assert_eq!(
            s.resolve_id(&IdSpec::Explicit(StreamId { ms: 5, seq: 4 }), 1000).unwrap_err(),
            XaddError::NotStrictlyIncreasing
        );
    }

    #[test]
    fn range_is_ordered_by_id_not_insertion() {
        let mut s = Stream::new();
        s.insert(StreamId { ms: 10, seq: 0 }, fields(&[("a", "1")]));
        s.insert(StreamId { ms: 2, seq: 0 }, fields(&[("a", "2")]));
        let got = s.range(StreamId::ZERO, StreamId { ms: u64::MAX, seq: u64::MAX });
        let ids: Vec<StreamId> = got.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![StreamId { ms: 2, seq: 0 }, StreamId { ms: 10, seq: 0 }]);
    }

    #[test]
    fn after_excludes_the_given_id() {
        let mut s = Stream::new();
        s.insert(StreamId { ms: 1, seq: 0 }, fields(&[]));
        s.insert(StreamId { ms: 1, seq: 1 }, fields(&[]));
        let got = s.after(StreamId { ms: 1, seq: 0 });
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, StreamId { ms: 1, seq: 1 });
    }
}
