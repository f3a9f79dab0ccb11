//! `dsmz lpsn` - nomenclature searches

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dsmz_core::{Deployment, ProgressBar, ProgressContext, Retrieval, Search};
use dsmz_lpsn::LpsnClient;

use super::{check_search, report, write_records, OutputArgs};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LpsnArgs {
    #[command(subcommand)]
    pub search: LpsnSearch,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Subcommand, Debug)]
pub enum LpsnSearch {
    /// Field search, e.g. `taxon_name=Escherichia is_legitimate=true`
    Advanced {
        #[arg(required = true, value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
    /// Search with a JSON expression
    Flexible {
        expression: String,
        /// Return records that do NOT match the expression
        #[arg(long)]
        negate: bool,
    },
    /// Records by LPSN id (`;`-separated lists accepted)
    Ids {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

pub fn run(
    args: LpsnArgs,
    config: &Config,
    deployment: Deployment,
    progress: &ProgressContext,
) -> Result<()> {
    let lpsn_config = config.lpsn_config(deployment);
    let (user, password) = config.credentials()?;
    log::info!("LPSN {} API at {}", deployment, lpsn_config.api_url());

    let start = Instant::now();
    let pb = progress.page_bar("lpsn");
    let retrieval = dsmz_core::block_on(async {
        let client = LpsnClient::login(&lpsn_config, user, password).await?;
        let result = search_and_retrieve(&client, &args.search, &pb).await;
        client.close().await;
        result
    });
    pb.finish_and_clear();
    let retrieval = retrieval?;

    write_records(&retrieval.records, args.output.output.as_deref())?;
    report("LPSN", &retrieval, start.elapsed())
}

async fn search_and_retrieve(
    client: &LpsnClient,
    search: &LpsnSearch,
    pb: &ProgressBar,
) -> Result<Retrieval> {
    let search: Search = match search {
        LpsnSearch::Advanced { params } => {
            client
                .advanced_search(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .await?
        }
        LpsnSearch::Flexible { expression, negate } => {
            let expression: serde_json::Value = serde_json::from_str(expression)
                .context("Flexible search expression is not valid JSON")?;
            client.flexible_search(&expression, *negate).await?
        }
        LpsnSearch::Ids { ids } => client.by_ids(ids)?,
    };
    check_search("LPSN", &search)?;
    Ok(client.retrieve_with_summary(&search, pb).await?)
}
