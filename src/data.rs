use crate::meta::{Error, Metainfo};
use std::fmt;

/// Transfer unit of the peer wire protocol.
pub const BLOCK_SIZE: usize = 16 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    pub offset: usize,
    pub size: usize,
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Piece {
    pub index: usize,
    pub size: usize,
    pub hash: [u8; 20],
    pub blocks: Vec<Block>,
}

/// Piece and block layout of a single-file torrent's payload.
pub struct TorrentFile {
    name: String,
    file_size: usize,
    piece_length: usize,
    pieces: Vec<Piece>,
}

impl TorrentFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_size(&self) -> usize {
        self.file_size
    }

    pub fn piece_length(&self) -> usize {
        self.piece_length
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, index: usize) -> Option<&Piece> {
        self.pieces.get(index)
    }
}

impl TryFrom<&Metainfo> for TorrentFile {
    type Error = Error;

    fn try_from(metainfo: &Metainfo) -> Result<Self, Self::Error> {
        let file_size = metainfo.length().ok_or(Error::MissingField("length"))?;
        let name = metainfo.name().ok_or(Error::MissingField("name"))?.to_owned();
        let piece_length = metainfo.piece_length().ok_or(Error::MissingField("piece length"))?;
        if piece_length == 0 {
            return Err(Error::InvalidPieceLength);
        }
        let hashes = metainfo.pieces().ok_or(Error::MissingField("pieces"))?;
        if hashes.is_empty() || hashes.len() % 20 != 0 {
            return Err(Error::InvalidPiecesLength(hashes.len()));
        }

        let piece_count = hashes.len() / 20;
        let mut pieces = Vec::with_capacity(piece_count);
        for (index, hash_data) in hashes.chunks_exact(20).enumerate() {
            let size = if index + 1 == piece_count {
                remainder_or_full(file_size, piece_length)
            } else {
                piece_length
            };
            let mut hash = [0u8; 20];
            hash.copy_from_slice(hash_data);
            pieces.push(Piece {
                index,
                size,
                hash,
                blocks: split_into_blocks(size),
            });
        }

        Ok(TorrentFile {
            name,
            file_size,
            piece_length,
            pieces,
        })
    }
}

impl fmt::Display for TorrentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "size: {}", self.file_size)?;
        writeln!(f, "piece length: {}", self.piece_length)?;
        writeln!(f, "pieces: {}", self.pieces.len())?;
        for piece in &self.pieces {
            writeln!(
                f,
                "piece {}: size={} blocks={}",
                piece.index,
                piece.size,
                piece.blocks.len()
            )?;
        }
        Ok(())
    }
}

// last part of an uneven split is the remainder, an even split has no short part
fn remainder_or_full(total: usize, part: usize) -> usize {
    if total % part == 0 { part } else { total % part }
}

fn split_into_blocks(piece_size: usize) -> Vec<Block> {
    let block_count = piece_size.div_ceil(BLOCK_SIZE);
    let mut blocks = Vec::with_capacity(block_count);
    for index in 0..block_count {
        let size = if index + 1 == block_count {
            remainder_or_full(piece_size, BLOCK_SIZE)
        } else {
            BLOCK_SIZE
        };
        blocks.push(Block {
            offset: index * BLOCK_SIZE,
            size,
            data: None,
        });
    }
    blocks
}
