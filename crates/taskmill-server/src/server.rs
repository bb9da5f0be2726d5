use crate::processor::ServerProcessor;
use crate::registry::NodeRegistry;

use taskmill_core::Config;
use taskmill_protocol::{Connection, NodeMessage, ProtocolError, ServerCodec};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The coordinator: accepts node connections, hands out units of work,
/// collects results and watches node liveness.
pub struct Server<P: ServerProcessor> {
    config: Config,
    codec: ServerCodec,
    registry: Arc<NodeRegistry>,
    processor: Arc<Mutex<P>>,
    shutdown: CancellationToken,
}

impl<P: ServerProcessor> Server<P> {
    pub fn new(config: Config, processor: P) -> Self {
        let codec = ServerCodec::new(config.secret_key.clone());
        Server {
            config,
            codec,
            registry: Arc::new(NodeRegistry::new()),
            processor: Arc::new(Mutex::new(processor)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> Arc<NodeRegistry> {
        self.registry.clone()
    }

    /// Run until the job processor reports completion. Persists final
    /// data exactly once before returning.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let endpoint = self.config.server_endpoint();
        let listener = TcpListener::bind(&endpoint).await?;
        info!("Server listening on {}", endpoint);

        let server = self.clone();
        let sweep = tokio::spawn(async move {
            server.sweep_loop().await;
        });

        // One handler task per accepted connection, bounded: past the
        // limit the accept loop waits for a handler to finish first.
        let mut handlers: JoinSet<()> = JoinSet::new();

        loop {
            while handlers.len() >= self.config.max_handlers {
                handlers.join_next().await;
            }

            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("New connection from {}", addr);
                            let server = self.clone();
                            handlers.spawn(async move {
                                if let Err(e) = server.handle_connection(stream).await {
                                    // One bad connection never touches
                                    // the accept loop or its peers.
                                    warn!("Connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Job done, shutting down server");
                    break;
                }
            }
        }

        // Let in-flight handlers send their replies, then persist.
        while handlers.join_next().await.is_some() {}
        sweep.await?;

        self.processor.lock().save_data();
        info!("Final data saved");

        Ok(())
    }

    /// Periodic liveness sweep: every `heartbeat_timeout` seconds,
    /// report every node silent for more than one full interval.
    ///
    /// The registry lock is held only for the stale snapshot, not
    /// while the timeout hook runs. Effective slack is between one and
    /// two intervals depending on sweep phase.
    async fn sweep_loop(&self) {
        let interval = Duration::from_secs(self.config.heartbeat_timeout);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let stale = self.registry.stale_nodes(interval);
                    for node_id in stale {
                        warn!("Node {} missed its heartbeat window", node_id);
                        self.processor.lock().on_node_timeout(&node_id);
                    }
                }
                _ = self.shutdown.cancelled() => {
                    break;
                }
            }
        }
    }

    /// Exactly one receive -> dispatch -> reply cycle per connection.
    async fn handle_connection(&self, stream: TcpStream) -> taskmill_protocol::Result<()> {
        let mut conn = Connection::new(stream);
        let request = conn.receive().await?;

        // The job-done check precedes identity validation and
        // dispatch: once the job is finished every request of any
        // kind gets Quit.
        let job_done = self.processor.lock().is_job_done();

        let reply = match self.codec.decode_from_node(&request) {
            Ok((node_id, message)) => {
                if job_done {
                    self.codec.gen_quit()?
                } else {
                    self.dispatch(&node_id, message)?
                }
            }
            Err(ProtocolError::InvalidMessageType(kind)) => {
                warn!("Unrecognized message kind {:#04x}", kind);
                if job_done {
                    self.codec.gen_quit()?
                } else {
                    self.codec.gen_unknown_error()?
                }
            }
            // Authentication or framing failure: nothing trustworthy
            // to reply to, drop the connection.
            Err(e) => return Err(e),
        };

        conn.send(reply).await?;

        if job_done {
            self.shutdown.cancel();
        }

        Ok(())
    }

    fn dispatch(
        &self,
        node_id: &taskmill_core::NodeId,
        message: NodeMessage,
    ) -> taskmill_protocol::Result<Vec<u8>> {
        match message {
            NodeMessage::Init => {
                self.registry.register(node_id);
                info!("Registered node {}", node_id);
                let init_data = self.processor.lock().get_init_data();
                self.codec.gen_init_ok(init_data)
            }
            NodeMessage::Heartbeat => {
                if self.registry.touch(node_id) {
                    debug!("Heartbeat from node {}", node_id);
                    self.codec.gen_heartbeat_ok()
                } else {
                    warn!("Heartbeat from unknown node {}", node_id);
                    self.codec.gen_invalid_node_id()
                }
            }
            NodeMessage::NeedsMoreData => {
                if self.registry.is_known(node_id) {
                    let data = self.processor.lock().get_new_data(node_id);
                    debug!("Sending {} bytes of work to node {}", data.len(), node_id);
                    self.codec.gen_new_data(data)
                } else {
                    warn!("Data request from unknown node {}", node_id);
                    self.codec.gen_invalid_node_id()
                }
            }
            NodeMessage::NewResult(result) => {
                if self.registry.is_known(node_id) {
                    debug!("Result of {} bytes from node {}", result.len(), node_id);
                    self.processor.lock().process_result(node_id, result);
                    self.codec.gen_result_ok()
                } else {
                    warn!("Result from unknown node {}", node_id);
                    self.codec.gen_invalid_node_id()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmill_core::NodeId;
    use taskmill_protocol::{NodeCodec, ServerMessage};

    struct StubProcessor {
        job_done: bool,
        init_calls: u32,
        results: Vec<Vec<u8>>,
    }

    impl StubProcessor {
        fn new() -> Self {
            StubProcessor {
                job_done: false,
                init_calls: 0,
                results: Vec::new(),
            }
        }
    }

    impl ServerProcessor for StubProcessor {
        fn get_init_data(&mut self) -> Vec<u8> {
            self.init_calls += 1;
            vec![1, 2, 3, 4, 5]
        }

        fn is_job_done(&mut self) -> bool {
            self.job_done
        }

        fn save_data(&mut self) {}

        fn on_node_timeout(&mut self, _node_id: &NodeId) {}

        fn get_new_data(&mut self, _node_id: &NodeId) -> Vec<u8> {
            vec![10, 20, 30]
        }

        fn process_result(&mut self, _node_id: &NodeId, result: Vec<u8>) {
            self.results.push(result);
        }
    }

    const TEST_KEY: &str = "12345678901234567890123456789012";

    fn test_server() -> Server<StubProcessor> {
        let config = Config::new(TEST_KEY).unwrap();
        Server::new(config, StubProcessor::new())
    }

    fn node_codec(id: &NodeId) -> NodeCodec {
        let config = Config::new(TEST_KEY).unwrap();
        NodeCodec::new(config.secret_key, id.clone())
    }

    #[test]
    fn test_init_registers_and_replies_init_ok() {
        let server = test_server();
        let id = NodeId::generate();
        let codec = node_codec(&id);

        let reply = server.dispatch(&id, NodeMessage::Init).unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::InitOk(vec![1, 2, 3, 4, 5])
        );
        assert!(server.registry.is_known(&id));
    }

    #[test]
    fn test_heartbeat_from_unknown_node() {
        let server = test_server();
        let id = NodeId::generate();
        let codec = node_codec(&id);

        let reply = server.dispatch(&id, NodeMessage::Heartbeat).unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::InvalidNodeId
        );
        // An invalid request never mutates the registry.
        assert!(server.registry.is_empty());
    }

    #[test]
    fn test_data_request_from_unknown_node() {
        let server = test_server();
        let id = NodeId::generate();
        let codec = node_codec(&id);

        let reply = server.dispatch(&id, NodeMessage::NeedsMoreData).unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::InvalidNodeId
        );
        assert!(server.registry.is_empty());
    }

    #[test]
    fn test_known_node_full_dispatch_cycle() {
        let server = test_server();
        let id = NodeId::generate();
        let codec = node_codec(&id);

        server.dispatch(&id, NodeMessage::Init).unwrap();

        let reply = server.dispatch(&id, NodeMessage::Heartbeat).unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::HeartbeatOk
        );

        let reply = server.dispatch(&id, NodeMessage::NeedsMoreData).unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::NewData(vec![10, 20, 30])
        );

        let reply = server
            .dispatch(&id, NodeMessage::NewResult(vec![7, 7, 7]))
            .unwrap();
        assert_eq!(
            codec.decode_from_server(&reply).unwrap(),
            ServerMessage::ResultOk
        );
        assert_eq!(server.processor.lock().results, vec![vec![7, 7, 7]]);
    }
}
