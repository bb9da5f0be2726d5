use crate::processor::NodeProcessor;

use taskmill_core::{Config, NodeId};
use taskmill_protocol::{Connection, NodeCodec, NodeMessage, ProtocolError, ServerMessage};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a failed round trip before retrying.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Where the protocol loop currently stands. In-process only, never
/// persisted.
enum RunState {
    /// Not yet introduced to the server.
    Init,
    /// Waiting for the next unit of work.
    NeedData,
    /// Holding a computed result that still has to be delivered.
    HasData(Vec<u8>),
}

/// A worker process: one protocol loop driving Init -> NeedData <->
/// HasData, plus an independent heartbeat loop. Both share the error
/// budget and the quit signal.
pub struct Node<P: NodeProcessor> {
    config: Config,
    codec: NodeCodec,
    processor: P,
    error_count: Arc<AtomicU32>,
    shutdown: CancellationToken,
}

impl<P: NodeProcessor> Node<P> {
    pub fn new(config: Config, processor: P) -> Self {
        let node_id = NodeId::generate();
        info!("Node identity: {}", node_id);
        let codec = NodeCodec::new(config.secret_key.clone(), node_id);
        Node {
            config,
            codec,
            processor,
            error_count: Arc::new(AtomicU32::new(0)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        self.codec.node_id()
    }

    /// Run until the server says Quit or the error budget is spent.
    /// Joins the heartbeat loop before returning.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let heartbeat = tokio::spawn(heartbeat_loop(
            self.codec.clone(),
            self.config.server_endpoint(),
            Duration::from_secs(self.config.heartbeat_timeout),
            self.error_count.clone(),
            self.config.quit_counter,
            self.shutdown.clone(),
        ));

        let mut state = RunState::Init;

        while !self.shutdown.is_cancelled() {
            let message = match &state {
                RunState::Init => NodeMessage::Init,
                RunState::NeedData => NodeMessage::NeedsMoreData,
                RunState::HasData(result) => NodeMessage::NewResult(result.clone()),
            };

            match round_trip(&self.codec, &self.config.server_endpoint(), &message).await {
                Ok(reply) => {
                    state = self.transition(state, reply).await;
                }
                Err(e) => {
                    warn!("Round trip failed: {}", e);
                    self.record_error();
                    self.retry_pause().await;
                }
            }
        }

        self.shutdown.cancel();
        heartbeat.await?;
        info!("Node finished");

        Ok(())
    }

    /// Apply one server reply to the current state, per the protocol
    /// table. Unrecognized combinations count against the error
    /// budget; Quit is terminal from any state.
    async fn transition(&mut self, state: RunState, reply: ServerMessage) -> RunState {
        match (state, reply) {
            (RunState::Init, ServerMessage::InitOk(data)) => {
                debug!("Initialized with {} bytes", data.len());
                self.processor.init(data).await;
                RunState::NeedData
            }
            (RunState::NeedData, ServerMessage::NewData(data)) => {
                debug!("Processing {} bytes of work", data.len());
                let result = self.processor.process(data).await;
                RunState::HasData(result)
            }
            // A stale ResultOk while waiting for data: ask again.
            (RunState::NeedData, ServerMessage::ResultOk) => RunState::NeedData,
            (RunState::HasData(_), ServerMessage::ResultOk) => RunState::NeedData,
            (state, ServerMessage::Quit) => {
                info!("Server sent Quit");
                self.shutdown.cancel();
                state
            }
            (state, reply) => {
                warn!("Unexpected reply {:?}", reply);
                self.record_error();
                self.retry_pause().await;
                state
            }
        }
    }

    fn record_error(&self) {
        record_error(
            &self.error_count,
            self.config.quit_counter,
            &self.shutdown,
        );
    }

    async fn retry_pause(&self) {
        tokio::select! {
            _ = tokio::time::sleep(RETRY_DELAY) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

/// One connect -> send -> receive -> decode cycle. A fresh connection
/// per request keeps a wedged server from pinning the node.
async fn round_trip(
    codec: &NodeCodec,
    endpoint: &str,
    message: &NodeMessage,
) -> Result<ServerMessage, ProtocolError> {
    let request = codec.encode_to_server(message)?;
    let mut conn = Connection::open(endpoint).await?;
    conn.send(request).await?;
    let reply = conn.receive().await?;
    codec.decode_from_server(&reply)
}

/// Count a failure against the shared budget; spending the last unit
/// triggers quit. The counter is never reset on success, so the
/// budget covers the life of the process.
fn record_error(error_count: &AtomicU32, max_errors: u32, shutdown: &CancellationToken) {
    let errors = error_count.fetch_add(1, Ordering::SeqCst) + 1;
    warn!("Error count now {}/{}", errors, max_errors);
    if errors >= max_errors {
        warn!("Error budget exhausted, quitting");
        shutdown.cancel();
    }
}

/// Independent heartbeat loop: one beat per `heartbeat_timeout`, on
/// its own connections, sharing the error budget and quit signal with
/// the protocol loop.
async fn heartbeat_loop(
    codec: NodeCodec,
    endpoint: String,
    interval: Duration,
    error_count: Arc<AtomicU32>,
    max_errors: u32,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => break,
        }

        let outcome = async {
            let request = codec.gen_heartbeat()?;
            let mut conn = Connection::open(&endpoint).await?;
            conn.send(request).await?;
            let reply = conn.receive().await?;
            codec.decode_from_server(&reply)
        }
        .await;

        match outcome {
            Ok(ServerMessage::HeartbeatOk) => {
                debug!("Heartbeat acknowledged");
            }
            Ok(ServerMessage::Quit) => {
                info!("Server sent Quit on heartbeat");
                shutdown.cancel();
                break;
            }
            Ok(reply) => {
                warn!("Unexpected heartbeat reply {:?}", reply);
                record_error(&error_count, max_errors, &shutdown);
            }
            Err(e) => {
                warn!("Heartbeat failed: {}", e);
                record_error(&error_count, max_errors, &shutdown);
            }
        }
    }
}
