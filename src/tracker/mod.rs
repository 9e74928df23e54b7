use crate::meta::Metainfo;
use crate::utils::peer_id::PeerId;
use std::net::{Ipv4Addr, SocketAddrV4};

pub mod http;

pub use http::{Error, TrackerClient, TrackerRequestBuilder};

/// Successful announce outcome: re-announce interval in seconds and the
/// addresses of the swarm's peers.
#[derive(Debug)]
pub struct AnnounceResponse {
    pub interval: usize,
    pub peers: Vec<SocketAddrV4>,
}

/// Announces the torrent to its tracker and returns the compact peer list.
pub fn announce_torrent(
    metainfo: &Metainfo,
    local_id: &PeerId,
    local_port: u16,
) -> Result<AnnounceResponse, Error> {
    let announce_url =
        metainfo.announce().ok_or(Error::Response("no announce url in metainfo".to_owned()))?;

    let mut request = TrackerRequestBuilder::try_from(announce_url)?;
    request
        .info_hash(metainfo.info_hash())
        .peer_id(&**local_id)
        .port(local_port)
        .bytes_uploaded(0)
        .bytes_downloaded(0)
        .bytes_left(metainfo.length().unwrap_or(0))
        .compact_support();

    TrackerClient::new()?.announce(request)
}

fn parse_binary_ipv4_peers(data: &[u8]) -> impl Iterator<Item = SocketAddrV4> + '_ {
    // 4 address bytes followed by a big-endian port
    fn to_addr_and_port(group: &[u8]) -> SocketAddrV4 {
        let ip = Ipv4Addr::new(group[0], group[1], group[2], group[3]);
        let port = u16::from(group[4]) << 8 | u16::from(group[5]);
        SocketAddrV4::new(ip, port)
    }
    data.chunks_exact(6).map(to_addr_and_port)
}
