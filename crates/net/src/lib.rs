#![warn(missing_docs)]
//! Networking for the arena client: wire codec, WebSocket transport, client-side
//! prediction with server reconciliation, and input recording.

pub mod codec;
pub mod connection;
pub mod prediction;
pub mod protocol;
pub mod replay;
pub mod transport;

pub use codec::{
    decode_client_message, decode_server_message, encode_client_message, encode_server_message,
    DecodeError,
};
pub use connection::{ClientConnection, Inbound, ServerConnection};
pub use prediction::{
    ClientPredictor, InputLog, PendingInput, PredictionMetrics, ReconciliationResult,
    DEFAULT_MAX_PENDING_INPUTS,
};
pub use protocol::{
    ClientMessage, InputMessage, LeaderboardEntry, MessageKind, PartyUpdate, PlayerAuthority,
    PlayerState, ServerMessage, Snapshot, WaveDef, WaveEntity, WaveState,
};
pub use replay::{InputLogEntry, InputLogReader, InputLogger};
pub use transport::{connect, ServerEndpoint};
