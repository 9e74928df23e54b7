use crate::benc::{self, Element};
use sha1_smol::Sha1;
use std::{io, str};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("[benc]{0}")]
    Benc(#[from] benc::ParseError),
    #[error("root element is not a dictionary")]
    NotADictionary,
    #[error("no '{0}' in the dictionary")]
    MissingField(&'static str),
    #[error("'{0}' has unexpected type")]
    WrongType(&'static str),
    #[error("'pieces' length {0} is not a multiple of 20")]
    InvalidPiecesLength(usize),
    #[error("'piece length' must be positive")]
    InvalidPieceLength,
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Benc(e) => e.into(),
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

/// Parsed content of a metainfo (.torrent) file.
pub struct Metainfo {
    root: benc::Dictionary,
    info: benc::Dictionary,
    info_hash: [u8; 20],
}

impl Metainfo {
    pub fn from_bytes(src: &[u8]) -> Result<Self, Error> {
        Self::try_from(Element::from_bytes(src)?)
    }

    pub fn announce(&self) -> Option<&str> {
        if let Some(Element::ByteString(data)) = self.root.get("announce") {
            str::from_utf8(data).ok()
        } else {
            None
        }
    }

    pub fn name(&self) -> Option<&str> {
        if let Some(Element::ByteString(data)) = self.info.get("name") {
            str::from_utf8(data).ok()
        } else {
            None
        }
    }

    pub fn piece_length(&self) -> Option<usize> {
        if let Some(Element::Integer(data)) = self.info.get("piece length") {
            usize::try_from(*data).ok()
        } else {
            None
        }
    }

    /// Concatenated 20-byte SHA-1 hashes of all pieces, in piece order.
    pub fn pieces(&self) -> Option<&[u8]> {
        if let Some(Element::ByteString(data)) = self.info.get("pieces") {
            Some(data)
        } else {
            None
        }
    }

    pub fn piece_hashes(&self) -> Option<impl Iterator<Item = &[u8]>> {
        self.pieces().map(|data| data.chunks_exact(20))
    }

    pub fn length(&self) -> Option<usize> {
        if let Some(Element::Integer(data)) = self.info.get("length") {
            usize::try_from(*data).ok()
        } else {
            None
        }
    }

    pub fn info_hash(&self) -> &[u8; 20] {
        &self.info_hash
    }
}

impl TryFrom<Element> for Metainfo {
    type Error = Error;

    fn try_from(e: Element) -> Result<Self, Self::Error> {
        let mut root = match e {
            Element::Dictionary(dict) => dict,
            _ => return Err(Error::NotADictionary),
        };

        let info_element = root.remove("info").ok_or(Error::MissingField("info"))?;
        // the hash covers the re-encoding of the parsed 'info' element, with
        // key order exactly as decoded
        let info_hash = Sha1::from(info_element.to_bytes()).digest().bytes();

        let info = match info_element {
            Element::Dictionary(dict) => dict,
            _ => return Err(Error::WrongType("info")),
        };

        Ok(Metainfo {
            root,
            info,
            info_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benc::Dictionary;

    fn example_metainfo() -> Vec<u8> {
        let info = Dictionary::from_iter([
            ("length", Element::Integer(100500)),
            ("name", Element::from("some file")),
            ("piece length", Element::Integer(32768)),
            ("pieces", Element::ByteString(vec![0xa5u8; 20 * 4])),
        ]);
        let root = Dictionary::from_iter([
            ("announce", Element::from("http://tracker.example.com:8080/announce")),
            ("info", Element::Dictionary(info)),
        ]);
        Element::Dictionary(root).to_bytes()
    }

    #[test]
    fn test_parse_metainfo_fields() {
        let metainfo = Metainfo::from_bytes(&example_metainfo()).unwrap();

        assert_eq!(Some("http://tracker.example.com:8080/announce"), metainfo.announce());
        assert_eq!(Some("some file"), metainfo.name());
        assert_eq!(Some(32768), metainfo.piece_length());
        assert_eq!(Some(100500), metainfo.length());
        assert_eq!(4, metainfo.piece_hashes().unwrap().count());
    }

    #[test]
    fn test_info_hash_covers_reencoded_info() {
        let metainfo = Metainfo::from_bytes(&example_metainfo()).unwrap();

        let info = Dictionary::from_iter([
            ("length", Element::Integer(100500)),
            ("name", Element::from("some file")),
            ("piece length", Element::Integer(32768)),
            ("pieces", Element::ByteString(vec![0xa5u8; 20 * 4])),
        ]);
        let expected = Sha1::from(Element::Dictionary(info).to_bytes()).digest().bytes();
        assert_eq!(&expected, metainfo.info_hash());
    }

    #[test]
    fn test_info_hash_preserves_unsorted_key_order() {
        // 'name' before 'length', i.e. not in canonical sorted order
        let info_encoded = b"d4:name1:x6:lengthi1e12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaae";
        let mut root_encoded = Vec::new();
        root_encoded.extend_from_slice(b"d4:info");
        root_encoded.extend_from_slice(info_encoded);
        root_encoded.push(b'e');

        let metainfo = Metainfo::from_bytes(&root_encoded).unwrap();
        let expected = Sha1::from(info_encoded.as_slice()).digest().bytes();
        assert_eq!(&expected, metainfo.info_hash());
    }

    #[test]
    fn test_parse_metainfo_without_info() {
        let root = Dictionary::from_iter([("announce", Element::from("http://localhost"))]);
        let encoded = Element::Dictionary(root).to_bytes();

        let result = Metainfo::from_bytes(&encoded);
        assert_eq!(Error::MissingField("info"), result.err().unwrap());
    }

    #[test]
    fn test_parse_metainfo_root_not_a_dictionary() {
        let result = Metainfo::from_bytes(b"l4:spame");
        assert_eq!(Error::NotADictionary, result.err().unwrap());
    }

    #[test]
    fn test_parse_truncated_metainfo() {
        let encoded = example_metainfo();
        let result = Metainfo::from_bytes(&encoded[..encoded.len() - 1]);
        assert_eq!(Error::Benc(benc::ParseError::Partial), result.err().unwrap());
    }
}
