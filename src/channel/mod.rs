//! UA/TCP secure channel: chunk framing, sequence numbers, security token
//! rollover, and the handshake/renewal state machine (C5, §4.5).

mod chunk;
mod secure_channel;
mod sequence;
mod state;
mod token;

pub use chunk::{Acknowledge, ChunkFlag, ChunkHeader, ErrorMessage, Hello, MessageType, CHUNK_HEADER_SIZE};
pub use secure_channel::{
    default_token_lifetime, ChannelConfig, ChannelRole, SecureChannel, SequenceHeader, SymmetricSecurityHeader,
};
pub use sequence::SequenceCounter;
pub use state::ChannelState;
pub use token::{SecurityToken, TokenRing};
