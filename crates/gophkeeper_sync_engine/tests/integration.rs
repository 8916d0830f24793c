//! Integration tests for sync engine and server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use gophkeeper_codec::Secret;
use gophkeeper_core::{now, LocalStore, Vault, EPOCH};
use gophkeeper_sync_engine::{
    HttpClient, HttpResponse, HttpTransport, LocalReplica, LoopbackClient, LoopbackServer,
    MemoryReplica, SyncConfig, SyncEngine, SyncError, SyncState,
};
use gophkeeper_sync_protocol::SyncRecord;
use gophkeeper_sync_server::{ServerConfig, SyncServer};

/// Routes loopback requests into an in-process server.
struct InProcess(Arc<SyncServer>);

impl LoopbackServer for InProcess {
    fn handle_post(&self, path: &str, bearer: Option<&str>, body: &[u8]) -> HttpResponse {
        let response = self.0.dispatch(path, bearer, body);
        HttpResponse::new(response.status, response.body)
    }
}

type Transport = HttpTransport<LoopbackClient<InProcess>>;

fn server() -> Arc<SyncServer> {
    Arc::new(SyncServer::open(ServerConfig::new("integration-secret")).unwrap())
}

fn transport(server: &Arc<SyncServer>) -> Transport {
    HttpTransport::new(
        "http://in-process",
        LoopbackClient::new(InProcess(Arc::clone(server))),
    )
}

fn client<R: LocalReplica>(server: &Arc<SyncServer>, replica: R) -> SyncEngine<Transport, R> {
    let transport = transport(server);
    transport.login("alice", "pw", "master").unwrap();
    SyncEngine::new(SyncConfig::default(), transport, replica)
}

fn register(server: &Arc<SyncServer>) {
    transport(server).register("alice", "pw", "master").unwrap();
}

fn at(millis: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

/// Sleeps long enough for `now()` to move past the previous millisecond.
fn tick() {
    std::thread::sleep(Duration::from_millis(5));
}

#[test]
fn newer_remote_write_wins_over_stale_push() {
    let server = server();
    register(&server);

    // Another device already wrote E1 at T1.
    let other = client(&server, MemoryReplica::new());
    other.replica().put(SyncRecord::new("site", b"E1".to_vec(), at(2_000)));
    other.sync_once().unwrap();

    // This device holds E0 from the earlier T0.
    let replica = Arc::new(MemoryReplica::new());
    replica.put(SyncRecord::new("site", b"E0".to_vec(), at(1_000)));
    let engine = client(&server, Arc::clone(&replica));

    let before = now();
    let result = engine.sync_once().unwrap();
    let after = now();

    assert_eq!(result.pushed, 0);
    assert_eq!(result.discarded, 1);
    assert_eq!(result.pulled, 1);

    let local = replica.get("site").unwrap();
    assert_eq!(local.value, b"E1");
    assert_eq!(local.updated_at, at(2_000));

    let watermark = replica.watermark().unwrap();
    assert_eq!(watermark, result.watermark);
    assert!(watermark >= before && watermark <= after);
    assert_eq!(engine.state(), SyncState::Synced);
}

#[test]
fn newer_local_write_overwrites_remote() {
    let server = server();
    register(&server);

    // The store holds E0 from T0.
    let other = client(&server, MemoryReplica::new());
    other.replica().put(SyncRecord::new("site", b"E0".to_vec(), at(1_000)));
    other.sync_once().unwrap();

    // This device wrote E1 at the later T1.
    let replica = Arc::new(MemoryReplica::new());
    replica.put(SyncRecord::new("site", b"E1".to_vec(), at(2_000)));
    let engine = client(&server, Arc::clone(&replica));

    let before = now();
    let result = engine.sync_once().unwrap();
    let after = now();
    assert_eq!(result.pushed, 1);
    assert_eq!(result.discarded, 0);

    let owner = server.store().find_user("alice").unwrap().unwrap().id;
    let remote = server.store().get(owner, "site").unwrap().unwrap();
    assert_eq!(remote.value, b"E1");
    assert_eq!(remote.updated_at, at(2_000));

    assert_eq!(replica.get("site").unwrap().value, b"E1");
    let watermark = replica.watermark().unwrap();
    assert!(watermark >= before && watermark <= after);
}

#[test]
fn second_sync_is_a_no_op() {
    let server = server();
    register(&server);

    let replica = Arc::new(MemoryReplica::new());
    replica.put(SyncRecord::new("a", vec![1], now()));
    replica.put(SyncRecord::new("b", vec![2], now()));
    let engine = client(&server, Arc::clone(&replica));
    tick();

    let first = engine.sync_once().unwrap();
    assert_eq!(first.pushed, 2);
    assert_eq!(first.pulled, 2);

    tick();
    let second = engine.sync_once().unwrap();
    assert_eq!(second.pushed, 0);
    assert_eq!(second.pulled, 0);
    assert!(second.watermark > first.watermark);
    assert_eq!(engine.stats().cycles_completed, 2);
}

#[test]
fn edit_in_the_cycle_start_millisecond_is_pushed_later() {
    let server = server();
    register(&server);

    let replica = Arc::new(MemoryReplica::new());
    let engine = client(&server, Arc::clone(&replica));
    let first = engine.sync_once().unwrap();

    replica.put(SyncRecord::new("late", b"v1".to_vec(), first.watermark));
    tick();
    let second = engine.sync_once().unwrap();
    assert_eq!(second.pushed, 1);

    let owner = server.store().find_user("alice").unwrap().unwrap().id;
    let remote = server.store().get(owner, "late").unwrap().unwrap();
    assert_eq!(remote.value, b"v1");
}

#[test]
fn two_clients_converge() {
    let server = server();
    register(&server);

    let a = client(&server, Arc::new(MemoryReplica::new()));
    let b = client(&server, Arc::new(MemoryReplica::new()));

    a.replica().put(SyncRecord::new("note", b"from a".to_vec(), now()));
    a.sync_once().unwrap();
    tick();

    b.sync_once().unwrap();
    assert_eq!(b.replica().get("note").unwrap().value, b"from a");

    tick();
    b.replica().put(SyncRecord::new("note", b"from b".to_vec(), now()));
    b.replica().put(SyncRecord::new("card", b"b only".to_vec(), now()));
    b.sync_once().unwrap();
    tick();

    let result = a.sync_once().unwrap();
    assert_eq!(result.pulled, 2);
    for key in ["note", "card"] {
        assert_eq!(a.replica().get(key), b.replica().get(key));
    }
}

#[test]
fn deletion_replicates_as_tombstone() {
    let server = server();
    register(&server);

    let a = client(&server, Arc::new(MemoryReplica::new()));
    let b = client(&server, Arc::new(MemoryReplica::new()));

    a.replica().put(SyncRecord::new("gone", vec![1], now()));
    a.sync_once().unwrap();
    tick();
    b.sync_once().unwrap();
    assert!(!b.replica().get("gone").unwrap().is_deleted());

    tick();
    let deleted_at = now();
    a.replica()
        .put(SyncRecord::new("gone", Vec::new(), deleted_at).with_deleted_at(deleted_at));
    a.sync_once().unwrap();
    tick();
    b.sync_once().unwrap();

    let record = b.replica().get("gone").unwrap();
    assert!(record.is_deleted());
    assert_eq!(record.deleted_at, Some(deleted_at));
}

#[test]
fn owners_are_isolated() {
    let server = server();
    register(&server);
    transport(&server).register("bob", "pw", "master").unwrap();

    let alice = client(&server, Arc::new(MemoryReplica::new()));
    alice.replica().put(SyncRecord::new("mine", vec![1], now()));
    alice.sync_once().unwrap();

    let bob_transport = transport(&server);
    bob_transport.login("bob", "pw", "master").unwrap();
    let bob = SyncEngine::new(
        SyncConfig::default(),
        bob_transport,
        Arc::new(MemoryReplica::new()),
    );
    let result = bob.sync_once().unwrap();
    assert_eq!(result.pulled, 0);
    assert!(bob.replica().is_empty());
}

#[test]
fn unauthenticated_client_does_not_advance() {
    let server = server();
    let replica = Arc::new(MemoryReplica::new());
    replica.put(SyncRecord::new("a", vec![1], now()));
    let engine = SyncEngine::new(SyncConfig::default(), transport(&server), Arc::clone(&replica));

    let err = engine.sync_once().unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));
    assert!(err.needs_login());
    assert_eq!(replica.watermark().unwrap(), EPOCH);
    assert_eq!(engine.state(), SyncState::Error);
}

#[test]
fn rejected_token_needs_login() {
    let server = server();
    register(&server);

    let transport = transport(&server);
    transport.set_token("not-a-token");
    let engine = SyncEngine::new(
        SyncConfig::default(),
        transport,
        Arc::new(MemoryReplica::new()),
    );

    let err = engine.sync_once().unwrap_err();
    assert!(matches!(err, SyncError::AuthenticationFailed(_)));
    assert!(err.needs_login());
    assert!(!err.is_retryable());
}

#[test]
fn unreachable_server_does_not_advance() {
    struct Offline;

    impl HttpClient for Offline {
        fn post(&self, _: &str, _: Option<&str>, _: Vec<u8>) -> Result<HttpResponse, String> {
            Err("connection refused".to_string())
        }
    }

    let replica = Arc::new(MemoryReplica::new());
    replica.put(SyncRecord::new("a", vec![1], now()));

    let transport = HttpTransport::new("http://127.0.0.1:9", Offline);
    transport.set_token("token");
    let engine = SyncEngine::new(SyncConfig::default(), transport, Arc::clone(&replica));

    let err = engine.sync_once().unwrap_err();
    assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(replica.watermark().unwrap(), EPOCH);

    let stats = engine.stats();
    assert_eq!(stats.cycles_failed, 1);
    assert!(stats.last_error.is_some());
}

#[test]
fn vaults_share_secrets_through_server() {
    let server = server();
    register(&server);

    let dir = tempfile::tempdir().unwrap();
    let store_a = Arc::new(LocalStore::open(&dir.path().join("a.db")).unwrap());
    let store_b = Arc::new(LocalStore::open(&dir.path().join("b.db")).unwrap());

    let vault_a = Vault::unlock(Arc::clone(&store_a), "master").unwrap();
    let vault_b = Vault::unlock(Arc::clone(&store_b), "master").unwrap();

    let secret = Secret::login_password("alice@example.com", "hunter2");
    vault_a.put("mail", &secret).unwrap();

    client(&server, Arc::clone(&store_a)).sync_once().unwrap();
    tick();
    client(&server, Arc::clone(&store_b)).sync_once().unwrap();

    assert_eq!(vault_b.get("mail").unwrap(), secret);
    assert_eq!(vault_b.list().unwrap(), vec!["mail".to_string()]);

    tick();
    vault_b.delete("mail").unwrap();
    client(&server, Arc::clone(&store_b)).sync_once().unwrap();
    tick();
    client(&server, Arc::clone(&store_a)).sync_once().unwrap();

    assert!(vault_a.get("mail").is_err());
    assert!(vault_a.list().unwrap().is_empty());
}
