use super::{AnnounceResponse, parse_binary_ipv4_peers};
use crate::benc;
use bytes::{BufMut, BytesMut};
use reqwest::Url;
use reqwest::blocking;
use std::io::Read;
use std::time::Duration;
use std::{io, str};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("[http]{0}")]
    Http(#[from] reqwest::Error),
    #[error("[url]{0}")]
    Url(#[from] url::ParseError),
    #[error("[benc]{0}")]
    Benc(#[from] benc::ParseError),
    #[error("[io]{0}")]
    Io(#[from] io::Error),
    /// The tracker itself rejected the announce ('failure reason').
    #[error("[failure]{0}")]
    Failure(String),
    #[error("[response]{0}")]
    Response(String),
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Http(e) => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            Error::Url(e) => io::Error::new(io::ErrorKind::InvalidInput, e),
            Error::Benc(e) => e.into(),
            Error::Io(e) => e,
            Error::Failure(s) => io::Error::other(s),
            Error::Response(s) => io::Error::other(s),
        }
    }
}

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TrackerClient(blocking::Client);

impl TrackerClient {
    pub fn new() -> Result<Self, Error> {
        let inner = blocking::Client::builder()
            .gzip(true)
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(TrackerClient(inner))
    }

    pub fn announce(&self, request_builder: TrackerRequestBuilder) -> Result<AnnounceResponse, Error> {
        let announce_url = request_builder.build_announce();
        log::debug!("Sending announce request to {announce_url}");

        let response = self.0.get(announce_url).send()?.error_for_status()?;
        let bencoded = read_bencoded_body(response)?;
        log::debug!("Received announce response: {bencoded}");

        into_announce_response(bencoded)
    }
}

/// Accumulates the body and re-attempts decoding as bytes arrive. An
/// incomplete element keeps the read loop going, a syntax error aborts it.
fn read_bencoded_body(mut source: impl Read) -> Result<benc::Element, Error> {
    let mut accumulated = BytesMut::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let count = source.read(&mut chunk)?;
        if count == 0 {
            // still incomplete at EOF
            return benc::Element::from_bytes(&accumulated).map_err(Into::into);
        }
        accumulated.put_slice(&chunk[..count]);
        match benc::Element::from_bytes(&accumulated) {
            Ok(element) => return Ok(element),
            Err(e) if e.is_partial() => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn into_announce_response(bencoded: benc::Element) -> Result<AnnounceResponse, Error> {
    let content = AnnounceResponseContent::from_benc(bencoded)
        .ok_or(Error::Response("response is not a dictionary".to_owned()))?;

    if let Some(reason) = content.failure_reason() {
        return Err(Error::Failure(reason.to_owned()));
    }
    if let Some(warning) = content.warning_message() {
        log::warn!("Tracker warning: {warning}");
    }

    let interval =
        content.interval().ok_or(Error::Response("no 'interval' in response".to_owned()))?;
    let peers_data =
        content.peers_data().ok_or(Error::Response("no 'peers' in response".to_owned()))?;
    if peers_data.len() % 6 != 0 {
        return Err(Error::Response(format!("invalid 'peers' length {}", peers_data.len())));
    }

    Ok(AnnounceResponse {
        interval,
        peers: parse_binary_ipv4_peers(peers_data).collect(),
    })
}

pub struct TrackerRequestBuilder {
    base_url: Url,
    query: String,
}

impl TryFrom<&str> for TrackerRequestBuilder {
    type Error = url::ParseError;

    fn try_from(announce_url: &str) -> Result<Self, Self::Error> {
        Ok(TrackerRequestBuilder {
            base_url: Url::parse(announce_url)?,
            query: String::with_capacity(128),
        })
    }
}

impl TrackerRequestBuilder {
    pub fn info_hash(&mut self, data: &[u8]) -> &mut Self {
        self.append_bytes("info_hash", data)
    }

    pub fn peer_id(&mut self, data: &[u8]) -> &mut Self {
        self.append_bytes("peer_id", data)
    }

    pub fn port(&mut self, port: u16) -> &mut Self {
        self.append_tostring("port", port)
    }

    pub fn bytes_uploaded(&mut self, count: usize) -> &mut Self {
        self.append_tostring("uploaded", count)
    }

    pub fn bytes_downloaded(&mut self, count: usize) -> &mut Self {
        self.append_tostring("downloaded", count)
    }

    pub fn bytes_left(&mut self, count: usize) -> &mut Self {
        self.append_tostring("left", count)
    }

    pub fn compact_support(&mut self) -> &mut Self {
        self.query.push_str("&compact=1");
        self
    }

    fn build_announce(mut self) -> Url {
        if let Some(substr) = self.query.get(1..) {
            self.base_url.set_query(Some(substr));
        }
        self.base_url
    }

    fn append_bytes(&mut self, name: &str, data: &[u8]) -> &mut Self {
        let value = form_urlencoded::byte_serialize(data).collect::<String>();
        self.query.push('&');
        self.query.push_str(name);
        self.query.push('=');
        self.query.push_str(value.as_str());
        self
    }

    fn append_tostring<T: ToString>(&mut self, name: &str, value: T) -> &mut Self {
        let mut encoder = form_urlencoded::Serializer::new(String::with_capacity(64));
        encoder.append_pair(name, value.to_string().as_str());
        self.query.push('&');
        self.query.push_str(encoder.finish().as_str());
        self
    }
}

// -------------------------------------------------------------------------------------------------

struct AnnounceResponseContent {
    root: benc::Dictionary,
}

impl AnnounceResponseContent {
    fn from_benc(e: benc::Element) -> Option<Self> {
        match e {
            benc::Element::Dictionary(dict) => Some(AnnounceResponseContent { root: dict }),
            _ => None,
        }
    }

    fn failure_reason(&self) -> Option<&str> {
        if let Some(benc::Element::ByteString(data)) = self.root.get("failure reason") {
            str::from_utf8(data).ok()
        } else {
            None
        }
    }

    fn warning_message(&self) -> Option<&str> {
        if let Some(benc::Element::ByteString(data)) = self.root.get("warning message") {
            str::from_utf8(data).ok()
        } else {
            None
        }
    }

    fn interval(&self) -> Option<usize> {
        if let Some(benc::Element::Integer(data)) = self.root.get("interval") {
            usize::try_from(*data).ok()
        } else {
            None
        }
    }

    fn peers_data(&self) -> Option<&[u8]> {
        if let Some(benc::Element::ByteString(data)) = self.root.get("peers") {
            Some(data)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_announce_uri() {
        let hash =
            b"\x12\x34\x56\x78\x9a\xbc\xde\xf1\x23\x45\x67\x89\xab\xcd\xef\x12\x34\x56\x78\x9a";
        let url_base = "http://example.com/announce";

        let mut builder = TrackerRequestBuilder::try_from(url_base).unwrap();
        builder
            .info_hash(hash)
            .bytes_left(42)
            .bytes_uploaded(3)
            .compact_support();

        let uri = builder.build_announce();

        assert_eq!(
            "http://example.com/announce?info_hash=%124Vx%9A%BC%DE%F1%23Eg%89%AB%CD%EF%124Vx%9A&left=42&uploaded=3&compact=1",
            uri.as_str()
        );
    }

    #[test]
    fn test_announce_uri_no_path() {
        let hash =
            b"\x12\x34\x56\x78\x9a\xbc\xde\xf1\x23\x45\x67\x89\xab\xcd\xef\x12\x34\x56\x78\x9a";
        let url_base = "http://example.com";

        let mut builder = TrackerRequestBuilder::try_from(url_base).unwrap();
        builder.info_hash(hash).bytes_left(42);

        let uri = builder.build_announce();

        assert_eq!(
            "http://example.com/?info_hash=%124Vx%9A%BC%DE%F1%23Eg%89%AB%CD%EF%124Vx%9A&left=42",
            uri.as_str()
        );
    }

    #[test]
    fn test_read_body_in_one_chunk() {
        let body = b"d8:intervali1800e5:peers6:\xc0\xa8\x01\x01\x1a\xe1e";

        let element = read_bencoded_body(Cursor::new(body.as_slice())).unwrap();
        let response = into_announce_response(element).unwrap();

        assert_eq!(1800, response.interval);
        assert_eq!(1, response.peers.len());
        assert_eq!("192.168.1.1:6881", response.peers[0].to_string());
    }

    #[test]
    fn test_read_body_arriving_byte_by_byte() {
        struct OneByteReader<'a>(&'a [u8]);
        impl Read for OneByteReader<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.split_first() {
                    Some((first, rest)) => {
                        buf[0] = *first;
                        self.0 = rest;
                        Ok(1)
                    }
                    None => Ok(0),
                }
            }
        }

        let body = b"d8:intervali1800e5:peers12:\xc0\xa8\x01\x01\x1a\xe1\x0a\x00\x00\x01\x00\x50e";

        let element = read_bencoded_body(OneByteReader(body)).unwrap();
        let response = into_announce_response(element).unwrap();

        assert_eq!(2, response.peers.len());
        assert_eq!("192.168.1.1:6881", response.peers[0].to_string());
        assert_eq!("10.0.0.1:80", response.peers[1].to_string());
    }

    #[test]
    fn test_read_truncated_body() {
        let body = b"d8:intervali1800e5:peers6:\xc0\xa8";

        let result = read_bencoded_body(Cursor::new(body.as_slice()));
        assert!(matches!(result, Err(Error::Benc(benc::ParseError::Partial))));
    }

    #[test]
    fn test_read_malformed_body() {
        let body = b"spam and eggs";

        let result = read_bencoded_body(Cursor::new(body.as_slice()));
        assert!(matches!(result, Err(Error::Benc(benc::ParseError::Syntax(_)))));
    }

    #[test]
    fn test_failure_reason_takes_precedence() {
        let body = b"d14:failure reason21:unregistered torrents8:intervali1800ee";

        let element = benc::Element::from_bytes(body).unwrap();
        let result = into_announce_response(element);

        match result {
            Err(Error::Failure(reason)) => assert_eq!("unregistered torrents", reason),
            other => panic!("Unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_peers_length_not_multiple_of_6() {
        let body = b"d8:intervali1800e5:peers4:\xc0\xa8\x01\x01e";

        let element = benc::Element::from_bytes(body).unwrap();
        let result = into_announce_response(element);

        match result {
            Err(Error::Response(msg)) => assert_eq!("invalid 'peers' length 4", msg),
            other => panic!("Unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_response_without_peers() {
        let body = b"d8:intervali1800ee";

        let element = benc::Element::from_bytes(body).unwrap();
        let result = into_announce_response(element);

        assert!(matches!(result, Err(Error::Response(_))));
    }
}
