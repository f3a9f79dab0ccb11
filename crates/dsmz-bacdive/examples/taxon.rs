//! Example: retrieve every BacDive strain of a taxon
//!
//! Usage:
//!   DSMZ_USER=... DSMZ_PASSWORD=... \
//!     cargo run -p dsmz-bacdive --example taxon -- Bacillus subtilis

use anyhow::Context;
use dsmz_bacdive::{BacdiveClient, Config};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let genus = args.first().context("usage: taxon <genus> [species] [subspecies]")?;
    let user = std::env::var("DSMZ_USER").context("DSMZ_USER not set")?;
    let password = std::env::var("DSMZ_PASSWORD").context("DSMZ_PASSWORD not set")?;

    let records = dsmz_core::block_on(async {
        let client = BacdiveClient::login(&Config::default(), &user, &password).await?;
        let search = client
            .by_taxonomy(genus, args.get(1).map(String::as_str), args.get(2).map(String::as_str))
            .await?;
        client.retrieve(&search).await
    })?;

    for record in &records {
        let name = record
            .data()
            .pointer("/Name and taxonomic classification/species")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        println!("{}\t{name}", record.id().unwrap_or("-"));
    }
    log::info!("{} strains", records.len());
    Ok(())
}
