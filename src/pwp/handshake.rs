use log::debug;
use std::io::{self, Read, Write};
use std::net::{SocketAddrV4, TcpStream};
use std::time::Duration;
use thiserror::Error;

const PROTOCOL_NAME: &str = "BitTorrent protocol";
const PSTR_LEN: usize = PROTOCOL_NAME.len();
const RESERVED_LEN: usize = 8;

/// Total size of a handshake message on the wire.
pub const HANDSHAKE_LEN: usize = 1 + PSTR_LEN + RESERVED_LEN + 20 + 20;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum Error {
    #[error("[io]{0}")]
    Io(#[from] io::Error),
    /// The remote end doesn't speak the peer wire protocol. Terminal.
    #[error("unknown protocol: '{0}'")]
    ProtocolMismatch(String),
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            e @ Error::ProtocolMismatch(_) => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Handshake {
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
}

impl Default for Handshake {
    fn default() -> Self {
        Handshake {
            info_hash: [0u8; 20],
            peer_id: [0u8; 20],
        }
    }
}

impl Handshake {
    pub fn to_bytes(&self) -> [u8; HANDSHAKE_LEN] {
        let mut msg = [0u8; HANDSHAKE_LEN];
        msg[0] = PSTR_LEN as u8;
        msg[1..1 + PSTR_LEN].copy_from_slice(PROTOCOL_NAME.as_bytes());
        // 8 reserved bytes stay zero, no extensions supported
        msg[28..48].copy_from_slice(&self.info_hash);
        msg[48..68].copy_from_slice(&self.peer_id);
        msg
    }

    pub fn from_bytes(msg: &[u8; HANDSHAKE_LEN]) -> Result<Self, Error> {
        let pstr = &msg[1..1 + PSTR_LEN];
        if msg[0] as usize != PSTR_LEN || pstr != PROTOCOL_NAME.as_bytes() {
            return Err(Error::ProtocolMismatch(
                String::from_utf8_lossy(pstr).into_owned(),
            ));
        }
        let mut handshake = Handshake::default();
        handshake.info_hash.copy_from_slice(&msg[28..48]);
        handshake.peer_id.copy_from_slice(&msg[48..68]);
        Ok(handshake)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connected,
    HandshakeSent,
    HandshakeVerified,
    Failed,
}

/// Connection to a single peer. Starts out freshly connected, transitions to
/// `HandshakeVerified` after a successful handshake and to `Failed` (terminal)
/// on any I/O or protocol error.
pub struct PeerConnection {
    stream: TcpStream,
    state: State,
}

impl PeerConnection {
    pub fn connect(remote_addr: SocketAddrV4) -> io::Result<Self> {
        debug!("Connecting to {remote_addr}");
        let stream = TcpStream::connect(remote_addr)?;
        stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
        stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;
        Ok(PeerConnection {
            stream,
            state: State::Connected,
        })
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        PeerConnection {
            stream,
            state: State::Connected,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Sends the local handshake, reads exactly one handshake back and
    /// verifies the protocol string. Returns the remote peer's identity.
    pub fn handshake(&mut self, local_handshake: &Handshake) -> Result<Handshake, Error> {
        match self.exchange_handshakes(local_handshake) {
            Ok(remote_handshake) => {
                self.state = State::HandshakeVerified;
                Ok(remote_handshake)
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    pub fn into_stream(self) -> TcpStream {
        self.stream
    }

    fn exchange_handshakes(&mut self, local_handshake: &Handshake) -> Result<Handshake, Error> {
        let remote_addr = self.stream.peer_addr()?;
        debug!("Starting handshake with {remote_addr}");

        self.stream.write_all(&local_handshake.to_bytes())?;
        self.state = State::HandshakeSent;

        let mut msg = [0u8; HANDSHAKE_LEN];
        self.stream.read_exact(&mut msg)?;
        let remote_handshake = Handshake::from_bytes(&msg)?;

        debug!(
            "Handshake with {} DONE. Peer id: {}",
            remote_addr,
            String::from_utf8_lossy(&remote_handshake.peer_id)
        );
        Ok(remote_handshake)
    }
}
