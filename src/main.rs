use clap::{Parser, Subcommand};
use std::io;
use std::net::SocketAddrV4;
use std::path::PathBuf;
use tinytorrent::data::TorrentFile;
use tinytorrent::pwp::{Handshake, PeerConnection};
use tinytorrent::utils::peer_id::PeerId;
use tinytorrent::utils::startup;
use tinytorrent::{benc, tracker};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a bencoded value and print it
    Decode {
        /// Bencoded value, e.g. 'd3:cow3:mooe'
        value: String,
    },
    /// Print the piece and block layout of a torrent
    Info {
        /// Path to a .torrent file
        metainfo: PathBuf,
    },
    /// Announce to the tracker and list the swarm's peers
    Peers {
        /// Path to a .torrent file
        metainfo: PathBuf,
        /// Local port reported to the tracker
        #[arg(short, long, default_value_t = 6881)]
        port: u16,
    },
    /// Perform the peer wire handshake with a single peer
    Handshake {
        /// Path to a .torrent file
        metainfo: PathBuf,
        /// Peer address as <ip>:<port>
        peer: SocketAddrV4,
    },
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    simple_logger::SimpleLogger::new()
        .with_level(log_level)
        .with_threads(false)
        .init()
        .map_err(io::Error::other)?;

    match cli.command {
        Command::Decode { value } => {
            let element = benc::Element::from_bytes(value.as_bytes())?;
            println!("{element}");
        }
        Command::Info { metainfo } => {
            let metainfo = startup::read_metainfo(metainfo)?;
            let torrent = TorrentFile::try_from(&metainfo)?;
            print!("{torrent}");
        }
        Command::Peers { metainfo, port } => {
            let metainfo = startup::read_metainfo(metainfo)?;
            let local_id = PeerId::generate_new();
            let response = tracker::announce_torrent(&metainfo, &local_id, port)?;
            log::info!("Re-announce interval: {}s", response.interval);
            for peer_addr in &response.peers {
                println!("{peer_addr}");
            }
        }
        Command::Handshake { metainfo, peer } => {
            let metainfo = startup::read_metainfo(metainfo)?;
            let local_handshake = Handshake {
                info_hash: *metainfo.info_hash(),
                peer_id: *PeerId::generate_new(),
            };
            let mut connection = PeerConnection::connect(peer)?;
            let remote_handshake = connection.handshake(&local_handshake)?;
            println!("Peer ID: {}", String::from_utf8_lossy(&remote_handshake.peer_id));
        }
    }
    Ok(())
}
