use crate::message::{NodeMessage, ServerMessage};
use crate::wire::{wire_decode, wire_encode};
use crate::Result;
use taskmill_core::{NodeId, SecretKey};

/// Node-side message codec: holds the shared key and the node's own
/// identity. Stateless otherwise; cheap to clone into the heartbeat
/// task.
#[derive(Debug, Clone)]
pub struct NodeCodec {
    key: SecretKey,
    node_id: NodeId,
}

impl NodeCodec {
    pub fn new(key: SecretKey, node_id: NodeId) -> Self {
        NodeCodec { key, node_id }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Envelope + compress + encrypt a node->server message.
    pub fn encode_to_server(&self, message: &NodeMessage) -> Result<Vec<u8>> {
        wire_encode(&message.to_envelope(&self.node_id), &self.key)
    }

    /// Decrypt + decompress + parse a server->node reply.
    pub fn decode_from_server(&self, blob: &[u8]) -> Result<ServerMessage> {
        let envelope = wire_decode(blob, &self.key)?;
        ServerMessage::from_envelope(&envelope)
    }

    pub fn gen_init(&self) -> Result<Vec<u8>> {
        self.encode_to_server(&NodeMessage::Init)
    }

    pub fn gen_heartbeat(&self) -> Result<Vec<u8>> {
        self.encode_to_server(&NodeMessage::Heartbeat)
    }

    pub fn gen_result(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        self.encode_to_server(&NodeMessage::NewResult(data))
    }

    pub fn gen_need_more_data(&self) -> Result<Vec<u8>> {
        self.encode_to_server(&NodeMessage::NeedsMoreData)
    }
}

/// Server-side message codec. Shared across all connection handlers.
#[derive(Debug, Clone)]
pub struct ServerCodec {
    key: SecretKey,
}

impl ServerCodec {
    pub fn new(key: SecretKey) -> Self {
        ServerCodec { key }
    }

    /// Envelope + compress + encrypt a server->node reply.
    pub fn encode_to_node(&self, message: &ServerMessage) -> Result<Vec<u8>> {
        wire_encode(&message.to_envelope(), &self.key)
    }

    /// Decrypt + decompress + parse a node->server request, yielding
    /// the sender's identity alongside the message.
    pub fn decode_from_node(&self, blob: &[u8]) -> Result<(NodeId, NodeMessage)> {
        let envelope = wire_decode(blob, &self.key)?;
        NodeMessage::from_envelope(&envelope)
    }

    pub fn gen_heartbeat_ok(&self) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::HeartbeatOk)
    }

    pub fn gen_init_ok(&self, init_data: Vec<u8>) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::InitOk(init_data))
    }

    pub fn gen_new_data(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::NewData(data))
    }

    pub fn gen_result_ok(&self) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::ResultOk)
    }

    pub fn gen_quit(&self) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::Quit)
    }

    pub fn gen_invalid_node_id(&self) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::InvalidNodeId)
    }

    pub fn gen_unknown_error(&self) -> Result<Vec<u8>> {
        self.encode_to_node(&ServerMessage::UnknownError)
    }
}
