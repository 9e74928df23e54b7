//! Building blocks of a minimal Bittorrent client for single-file torrents:
//! bencoding, metainfo files, piece/block bookkeeping, HTTP trackers and the
//! peer wire handshake.

/// Encoding and decoding of bencoded data.
pub mod benc;

/// Piece and block layout of a torrent's payload.
pub mod data;

/// Parsed view of a metainfo (.torrent) file.
pub mod meta;

/// Peer wire protocol: connecting to peers and performing the handshake.
pub mod pwp;

/// Announcing to HTTP trackers.
pub mod tracker;

/// Peer id generation and startup helpers.
pub mod utils;
