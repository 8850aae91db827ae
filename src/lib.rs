//! `literedis`: an in-memory, RESP-speaking key-value store.
//!
//! See the module docs for each subsystem: [`resp`] is the wire codec,
//! [`store`] the keyspace (values, expiry, streams), [`dispatch`] maps
//! a parsed command to a store operation, [`persist`] is the AOF/RDB
//! durability layer, and [`net`] is the connection-handling loop.

pub mod cli;
pub mod dispatch;
pub mod net;
pub mod persist;
pub mod resp;
pub mod store;
pub mod util;
