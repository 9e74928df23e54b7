use crate::meta::Metainfo;
use std::path::Path;
use std::{fs, io};

/// Reads and parses a metainfo (.torrent) file.
pub fn read_metainfo(metainfo_filepath: impl AsRef<Path>) -> io::Result<Metainfo> {
    log::info!("Input metainfo file: {}", metainfo_filepath.as_ref().to_string_lossy());
    let file_content = fs::read(metainfo_filepath)?;
    Ok(Metainfo::from_bytes(&file_content)?)
}
