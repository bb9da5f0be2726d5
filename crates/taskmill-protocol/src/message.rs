use crate::{ProtocolError, Result};
use taskmill_core::{NodeId, NODE_ID_LENGTH};

// The two directions use disjoint kind bytes: server->node kinds set
// the high bit, so a frame decoded under the wrong role is always
// rejected instead of being reinterpreted.
const KIND_INIT: u8 = 0x01;
const KIND_HEARTBEAT: u8 = 0x02;
const KIND_NEW_RESULT: u8 = 0x03;
const KIND_NEEDS_MORE_DATA: u8 = 0x04;

const KIND_UNKNOWN_ERROR: u8 = 0x81;
const KIND_HEARTBEAT_OK: u8 = 0x82;
const KIND_INIT_OK: u8 = 0x83;
const KIND_NEW_DATA: u8 = 0x84;
const KIND_RESULT_OK: u8 = 0x85;
const KIND_INVALID_NODE_ID: u8 = 0x86;
const KIND_QUIT: u8 = 0x87;

/// Messages a node sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMessage {
    /// First contact; the reply carries the initialization blob.
    Init,
    Heartbeat,
    /// A completed unit of work.
    NewResult(Vec<u8>),
    NeedsMoreData,
}

/// Messages the server sends back to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    UnknownError,
    HeartbeatOk,
    InitOk(Vec<u8>),
    NewData(Vec<u8>),
    ResultOk,
    InvalidNodeId,
    Quit,
}

impl NodeMessage {
    fn kind(&self) -> u8 {
        match self {
            NodeMessage::Init => KIND_INIT,
            NodeMessage::Heartbeat => KIND_HEARTBEAT,
            NodeMessage::NewResult(_) => KIND_NEW_RESULT,
            NodeMessage::NeedsMoreData => KIND_NEEDS_MORE_DATA,
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            NodeMessage::NewResult(data) => data,
            _ => &[],
        }
    }

    /// Build the node->server envelope:
    /// `[kind][64-byte node id][payload]`.
    pub fn to_envelope(&self, node_id: &NodeId) -> Vec<u8> {
        let payload = self.payload();
        let mut out = Vec::with_capacity(1 + NODE_ID_LENGTH + payload.len());
        out.push(self.kind());
        out.extend_from_slice(node_id.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Parse a node->server envelope.
    pub fn from_envelope(envelope: &[u8]) -> Result<(NodeId, Self)> {
        if envelope.len() < 1 + NODE_ID_LENGTH {
            return Err(ProtocolError::SizeMismatch {
                expected: 1 + NODE_ID_LENGTH,
                actual: envelope.len(),
            });
        }

        let node_id = NodeId::from_bytes(&envelope[1..=NODE_ID_LENGTH])
            .ok_or(ProtocolError::MalformedEnvelope)?;
        let payload = &envelope[1 + NODE_ID_LENGTH..];

        let message = match envelope[0] {
            KIND_INIT => NodeMessage::Init,
            KIND_HEARTBEAT => NodeMessage::Heartbeat,
            KIND_NEW_RESULT => NodeMessage::NewResult(payload.to_vec()),
            KIND_NEEDS_MORE_DATA => NodeMessage::NeedsMoreData,
            other => return Err(ProtocolError::InvalidMessageType(other)),
        };

        Ok((node_id, message))
    }
}

impl ServerMessage {
    fn kind(&self) -> u8 {
        match self {
            ServerMessage::UnknownError => KIND_UNKNOWN_ERROR,
            ServerMessage::HeartbeatOk => KIND_HEARTBEAT_OK,
            ServerMessage::InitOk(_) => KIND_INIT_OK,
            ServerMessage::NewData(_) => KIND_NEW_DATA,
            ServerMessage::ResultOk => KIND_RESULT_OK,
            ServerMessage::InvalidNodeId => KIND_INVALID_NODE_ID,
            ServerMessage::Quit => KIND_QUIT,
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            ServerMessage::InitOk(data) | ServerMessage::NewData(data) => data,
            _ => &[],
        }
    }

    /// Build the server->node envelope: `[kind][payload]`.
    /// No node identity in this direction.
    pub fn to_envelope(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut out = Vec::with_capacity(1 + payload.len());
        out.push(self.kind());
        out.extend_from_slice(payload);
        out
    }

    /// Parse a server->node envelope.
    pub fn from_envelope(envelope: &[u8]) -> Result<Self> {
        if envelope.is_empty() {
            return Err(ProtocolError::SizeMismatch {
                expected: 1,
                actual: 0,
            });
        }

        let payload = &envelope[1..];

        match envelope[0] {
            KIND_UNKNOWN_ERROR => Ok(ServerMessage::UnknownError),
            KIND_HEARTBEAT_OK => Ok(ServerMessage::HeartbeatOk),
            KIND_INIT_OK => Ok(ServerMessage::InitOk(payload.to_vec())),
            KIND_NEW_DATA => Ok(ServerMessage::NewData(payload.to_vec())),
            KIND_RESULT_OK => Ok(ServerMessage::ResultOk),
            KIND_INVALID_NODE_ID => Ok(ServerMessage::InvalidNodeId),
            KIND_QUIT => Ok(ServerMessage::Quit),
            other => Err(ProtocolError::InvalidMessageType(other)),
        }
    }
}
