use std::error::Error;

use connections_archive::{
    db::{
        nyt::lib_nyt::{NytClient, NytConfig},
        prod_db::ProdDb,
    },
    utils::{clock::SystemClock, storage::FileStorage},
};
use log::error;

/// Run this job once a day, after midnight Eastern
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let archive = ProdDb::nyt_connections();
    let config = NytConfig::default();
    let client = NytClient::new(config.clone());
    let (dated, latest) = match archive.update(&config, &SystemClock, &client, &FileStorage) {
        Ok(paths) => paths,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    println!(
        "Wrote {} and {}",
        dated.file_name().unwrap_or_default().to_string_lossy(),
        latest.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(())
}
