//! `dsmz bacdive` - strain searches

use std::time::Instant;

use anyhow::Result;
use clap::{Args, Subcommand};
use dsmz_bacdive::BacdiveClient;
use dsmz_core::{Deployment, ProgressBar, ProgressContext, Retrieval, Search};

use super::{check_search, report, write_records, OutputArgs};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct BacdiveArgs {
    #[command(subcommand)]
    pub search: BacdiveSearch,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Include predicted traits in the records
    #[arg(long, global = true)]
    pub predictions: bool,
}

#[derive(Subcommand, Debug)]
pub enum BacdiveSearch {
    /// Strains by culture collection number, e.g. "DSM 1"
    CultureNo { number: String },
    /// Strains by genus, species and subspecies
    Taxon {
        genus: String,
        species: Option<String>,
        subspecies: Option<String>,
    },
    /// Strains by 16S rRNA sequence accession
    #[command(name = "16s")]
    Sequence16s { accession: String },
    /// Strains by genome assembly accession
    Genome { accession: String },
    /// Strains by BacDive id (`;`-separated lists accepted)
    Ids {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub fn run(
    args: BacdiveArgs,
    config: &Config,
    deployment: Deployment,
    progress: &ProgressContext,
) -> Result<()> {
    let bacdive_config = config.bacdive_config(deployment, args.predictions);
    let (user, password) = config.credentials()?;
    log::info!("BacDive {} API at {}", deployment, bacdive_config.api_url());

    let start = Instant::now();
    let pb = progress.page_bar("bacdive");
    let retrieval = dsmz_core::block_on(async {
        let client = BacdiveClient::login(&bacdive_config, user, password).await?;
        let result = search_and_retrieve(&client, &args.search, &pb).await;
        client.close().await;
        result
    });
    pb.finish_and_clear();
    let retrieval = retrieval?;

    write_records(&retrieval.records, args.output.output.as_deref())?;
    report("BacDive", &retrieval, start.elapsed())
}

async fn search_and_retrieve(
    client: &BacdiveClient,
    search: &BacdiveSearch,
    pb: &ProgressBar,
) -> Result<Retrieval> {
    let search: Search = match search {
        BacdiveSearch::CultureNo { number } => client.by_culture_collection_no(number).await?,
        BacdiveSearch::Taxon {
            genus,
            species,
            subspecies,
        } => {
            client
                .by_taxonomy(genus, species.as_deref(), subspecies.as_deref())
                .await?
        }
        BacdiveSearch::Sequence16s { accession } => client.by_16s(accession).await?,
        BacdiveSearch::Genome { accession } => client.by_genome(accession).await?,
        BacdiveSearch::Ids { ids } => client.by_ids(ids)?,
    };
    check_search("BacDive", &search)?;
    Ok(client.retrieve_with_summary(&search, pb).await?)
}
