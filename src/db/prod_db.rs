use std::path::PathBuf;

use super::nyt::connections_archive::ConnectionsArchive;

pub struct ProdDb {}

impl ProdDb {
    pub fn nyt_connections() -> ConnectionsArchive {
        ConnectionsArchive {
            base_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data")),
        }
    }
}
