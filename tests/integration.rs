//! End-to-end tests driving the crate the way a real client would: a
//! live TCP connection speaking RESP, and a full restart replaying a
//! prior session's AOF.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use literedis::net::listener::{self, ServerConfig};
use literedis::persist::aof;
use literedis::store::{Corestore, RdbPath};

/// Binds on an ephemeral port and runs the listener in the background,
/// returning the address clients should connect to and a shutdown
/// handle.
async fn spawn_server(store: Corestore) -> (std::net::SocketAddr, tokio::sync::broadcast::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (tx, rx) = tokio::sync::broadcast::channel(1);
    let cfg = ServerConfig { host: addr.ip().to_string(), port: addr.port(), max_connections: 16 };
    tokio::spawn(async move {
        let _ = listener::run(cfg, store, rx).await;
    });
    // give the bind a moment to land before the first client connects.
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    (addr, tx)
}

async fn send_command(stream: &mut TcpStream, parts: &[&str]) -> Vec<u8> {
    let mut frame = BytesMut::new();
    frame.extend_from_slice(format!("*{}\r\n", parts.len()).as_bytes());
    for p in parts {
        frame.extend_from_slice(format!("${}\r\n", p.len()).as_bytes());
        frame.extend_from_slice(p.as_bytes());
        frame.extend_from_slice(b"\r\n");
    }
    stream.write_all(&frame).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.unwrap();
    buf.truncate(n);
    buf
}

#[tokio::test]
async fn live_tcp_round_trip_set_get() {
    let store = Corestore::new(None);
    let (addr, shutdown) = spawn_server(store).await;
    let mut conn = TcpStream::connect(addr).await.unwrap();

    let reply = send_command(&mut conn, &["SET", "foo", "bar"]).await;
    assert_eq!(reply, b"+OK\r\n");

    let reply = send_command(&mut conn, &["GET", "foo"]).await;
    assert_eq!(reply, b"$3\r\nbar\r\n");

    let reply = send_command(&mut conn, &["TYPE", "foo"]).await;
    assert_eq!(reply, b"+string\r\n");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn live_tcp_pipelined_commands_respond_in_order() {
    let store = Corestore::new(None);
    let (addr, shutdown) = spawn_server(store).await;
    let mut conn = TcpStream::connect(addr).await.unwrap();

    let mut pipeline = BytesMut::new();
    for n in ["a", "b", "c"] {
        pipeline.extend_from_slice(format!("*3\r\n$5\r\nRPUSH\r\n$1\r\nl\r\n$1\r\n{n}\r\n").as_bytes());
    }
    conn.write_all(&pipeline).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let n = conn.read(&mut buf).await.unwrap();
    let text = String::from_utf8_lossy(&buf[..n]);
    assert_eq!(text, ":1\r\n:2\r\n:3\r\n");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn live_tcp_unknown_command_does_not_close_connection() {
    let store = Corestore::new(None);
    let (addr, shutdown) = spawn_server(store).await;
    let mut conn = TcpStream::connect(addr).await.unwrap();

    let reply = send_command(&mut conn, &["BOGUS"]).await;
    assert!(reply.starts_with(b"-ERR"));

    // the connection must still be alive for a subsequent command.
    let reply = send_command(&mut conn, &["PING"]).await;
    assert_eq!(reply, b"+PONG\r\n");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn aof_replay_reconstructs_state_across_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("session.aof");

    {
        let mut writer = aof::AofWriter::open(&aof_path).unwrap();
        writer.append(&[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v1")]).unwrap();
        writer.append(&[Bytes::from_static(b"RPUSH"), Bytes::from_static(b"l"), Bytes::from_static(b"a")]).unwrap();
        writer.append(&[Bytes::from_static(b"RPUSH"), Bytes::from_static(b"l"), Bytes::from_static(b"b")]).unwrap();
        writer.append(&[Bytes::from_static(b"SADD"), Bytes::from_static(b"s"), Bytes::from_static(b"x")]).unwrap();
        writer.append(&[Bytes::from_static(b"DEL"), Bytes::from_static(b"k")]).unwrap();
        writer.append(&[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v2")]).unwrap();
    }

    let restarted = Corestore::with_rdb_path(None, RdbPath { dir: dir.path().to_path_buf(), dbfilename: "unused.rdb".into() });
    aof::replay(&aof_path, &restarted).unwrap();

    let mut ks = restarted.0.keyspace.lock();
    assert_eq!(ks.get(b"k").unwrap().as_str().unwrap(), &Bytes::from_static(b"v2"));
    assert_eq!(ks.get(b"l").unwrap().as_list().unwrap(), &vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
    assert!(ks.get(b"s").unwrap().as_set().unwrap().contains(&Bytes::from_static(b"x")));
}

#[tokio::test]
async fn rdb_then_aof_replay_order_lets_aof_resurrect_a_deleted_key() {
    let dir = tempfile::tempdir().unwrap();
    let rdb_path = RdbPath { dir: dir.path().to_path_buf(), dbfilename: "snap.rdb".into() };
    let aof_path = dir.path().join("session.aof");

    let snapshot_store = Corestore::with_rdb_path(None, rdb_path.clone());
    {
        let mut ks = snapshot_store.0.keyspace.lock();
        ks.set(Bytes::from_static(b"k"), literedis::store::Value::Str(Bytes::from_static(b"old")), None);
    }
    {
        let ks = snapshot_store.0.keyspace.lock();
        literedis::persist::rdb::save(&rdb_path.full_path(), &ks).unwrap();
    }
    {
        let mut writer = aof::AofWriter::open(&aof_path).unwrap();
        writer.append(&[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"new")]).unwrap();
    }

    let restarted = Corestore::with_rdb_path(None, rdb_path.clone());
    literedis::persist::rdb::load(&rdb_path.full_path(), &restarted).unwrap();
    aof::replay(&aof_path, &restarted).unwrap();

    let mut ks = restarted.0.keyspace.lock();
    assert_eq!(ks.get(b"k").unwrap().as_str().unwrap(), &Bytes::from_static(b"new"));
}
