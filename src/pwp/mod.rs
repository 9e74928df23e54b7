mod handshake;

pub use handshake::{Error, HANDSHAKE_LEN, Handshake, PeerConnection, State};
