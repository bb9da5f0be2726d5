//! Full server + node round trips over real TCP connections.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use taskmill_core::{Config, NodeId};
use taskmill_node::{Node, NodeProcessor};
use taskmill_protocol::{wire_encode, Connection, NodeCodec, ServerMessage};
use taskmill_server::{Server, ServerProcessor};

const TEST_KEY: &str = "12345678901234567890123456789012";
const INIT_DATA: [u8; 5] = [1, 2, 3, 4, 5];
const TOTAL_ROUNDS: usize = 5;

/// Grab a free port. The listener is dropped before the server binds.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(port: u16) -> Config {
    let mut config = Config::new(TEST_KEY).unwrap();
    config.server_port = port;
    config.heartbeat_timeout = 60;
    config
}

#[derive(Default)]
struct JobState {
    results: Vec<Vec<u8>>,
    save_calls: u32,
    timeouts: Vec<NodeId>,
}

/// Hands out the same five-byte unit of work until five results are in.
struct TestJob {
    state: Arc<Mutex<JobState>>,
}

impl ServerProcessor for TestJob {
    fn get_init_data(&mut self) -> Vec<u8> {
        INIT_DATA.to_vec()
    }

    fn is_job_done(&mut self) -> bool {
        self.state.lock().results.len() >= TOTAL_ROUNDS
    }

    fn save_data(&mut self) {
        self.state.lock().save_calls += 1;
    }

    fn on_node_timeout(&mut self, node_id: &NodeId) {
        self.state.lock().timeouts.push(node_id.clone());
    }

    fn get_new_data(&mut self, _node_id: &NodeId) -> Vec<u8> {
        INIT_DATA.to_vec()
    }

    fn process_result(&mut self, _node_id: &NodeId, result: Vec<u8>) {
        self.state.lock().results.push(result);
    }
}

/// Doubles every byte of the work and adds the init byte at the same
/// offset.
struct DoublingProcessor {
    init: Vec<u8>,
}

#[async_trait]
impl NodeProcessor for DoublingProcessor {
    async fn init(&mut self, data: Vec<u8>) {
        self.init = data;
    }

    async fn process(&mut self, data: Vec<u8>) -> Vec<u8> {
        data.iter()
            .zip(self.init.iter())
            .map(|(byte, init_byte)| byte * 2 + init_byte)
            .collect()
    }
}

#[tokio::test]
async fn test_five_rounds_then_quit_and_single_save() {
    let port = free_port().await;
    let state = Arc::new(Mutex::new(JobState::default()));

    let server = Arc::new(Server::new(
        test_config(port),
        TestJob {
            state: state.clone(),
        },
    ));
    let server_run = tokio::spawn(server.run());

    // Give the listener a moment to bind.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let node = Node::new(test_config(port), DoublingProcessor { init: Vec::new() });
    tokio::time::timeout(Duration::from_secs(10), node.run())
        .await
        .expect("node did not quit")
        .unwrap();

    tokio::time::timeout(Duration::from_secs(10), server_run)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();

    let state = state.lock();
    assert_eq!(state.results.len(), TOTAL_ROUNDS);
    // [1,2,3,4,5] doubled plus the init byte at the same offset.
    for result in &state.results {
        assert_eq!(result.as_slice(), &[3, 6, 9, 12, 15]);
    }
    // Persisted exactly once, after the accept loop stopped.
    assert_eq!(state.save_calls, 1);
}

#[tokio::test]
async fn test_unknown_identity_is_rejected_without_registration() {
    let port = free_port().await;
    let state = Arc::new(Mutex::new(JobState::default()));

    let server = Arc::new(Server::new(
        test_config(port),
        TestJob {
            state: state.clone(),
        },
    ));
    let registry = server.registry();
    let server_run = tokio::spawn(server.run());
    tokio::time::sleep(Duration::from_millis(50)).await;

    // This identity never sent Init.
    let config = test_config(port);
    let codec = NodeCodec::new(config.secret_key.clone(), NodeId::generate());

    for request in [
        codec.gen_heartbeat().unwrap(),
        codec.gen_need_more_data().unwrap(),
        codec.gen_result(vec![1, 2, 3]).unwrap(),
    ] {
        let mut conn = Connection::open(("127.0.0.1", port)).await.unwrap();
        conn.send(request).await.unwrap();
        let reply = conn.receive().await.unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::InvalidNodeId
        );
    }

    // None of those requests may have touched the registry or the job.
    assert!(registry.is_empty());
    assert!(state.lock().results.is_empty());

    server_run.abort();
}

#[tokio::test]
async fn test_undecodable_traffic() {
    let port = free_port().await;
    let state = Arc::new(Mutex::new(JobState::default()));

    let server = Arc::new(Server::new(
        test_config(port),
        TestJob {
            state: state.clone(),
        },
    ));
    let server_run = tokio::spawn(server.run());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = test_config(port);
    let codec = NodeCodec::new(config.secret_key.clone(), NodeId::generate());

    // An authenticated envelope with an unused kind byte earns
    // UnknownError.
    let mut envelope = vec![0x7F];
    envelope.extend_from_slice(NodeId::generate().as_bytes());
    let blob = wire_encode(&envelope, &config.secret_key).unwrap();

    let mut conn = Connection::open(("127.0.0.1", port)).await.unwrap();
    conn.send(blob).await.unwrap();
    let reply = conn.receive().await.unwrap();
    assert_eq!(
        codec.decode_from_server(&reply).unwrap(),
        ServerMessage::UnknownError
    );

    // Bytes that never authenticate get no reply at all; the server
    // hangs up.
    let mut conn = Connection::open(("127.0.0.1", port)).await.unwrap();
    conn.send(vec![0xAB; 100]).await.unwrap();
    assert!(conn.receive().await.is_err());

    // A well-formed frame under the wrong key is treated the same.
    let wrong_key =
        Config::new("abcdefghijklmnopqrstuvwxyz012345").unwrap();
    let wrong_codec = NodeCodec::new(wrong_key.secret_key, NodeId::generate());
    let mut conn = Connection::open(("127.0.0.1", port)).await.unwrap();
    conn.send(wrong_codec.gen_heartbeat().unwrap()).await.unwrap();
    assert!(conn.receive().await.is_err());

    // Dropped connections never wedge the accept loop: a valid
    // request right after still gets served.
    let mut conn = Connection::open(("127.0.0.1", port)).await.unwrap();
    conn.send(codec.gen_init().unwrap()).await.unwrap();
    let reply = conn.receive().await.unwrap();
    assert_eq!(
        codec.decode_from_server(&reply).unwrap(),
        ServerMessage::InitOk(INIT_DATA.to_vec())
    );

    server_run.abort();
}
