//! Subcommands and the output plumbing they share

pub mod bacdive;
pub mod lpsn;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use dsmz_core::{fmt_num, Deployment, Record, Retrieval, Search};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Write JSON lines to this file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
}

/// Fail with the upstream message when the search came back as an error.
pub fn check_search(api: &str, search: &Search) -> Result<()> {
    if let Some(msg) = search.error_message() {
        anyhow::bail!("{api} search failed: {msg}");
    }
    Ok(())
}

/// Write one JSON object per line, to `output` or stdout.
pub fn write_records(records: &[Record], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_json_lines(records, BufWriter::new(file))?;
            log::info!("Wrote {} records to {}", records.len(), path.display());
        }
        None => write_json_lines(records, BufWriter::new(std::io::stdout().lock()))?,
    }
    Ok(())
}

fn write_json_lines<W: Write>(records: &[Record], mut out: W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut out, record.data())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Print the run summary; failed pages make the command fail after output is written.
pub fn report(api: &str, retrieval: &Retrieval, elapsed: Duration) -> Result<()> {
    print_summary(
        api,
        &[
            ("Records", fmt_num(retrieval.records.len())),
            (
                "Pages",
                format!("{} ({} failed)", retrieval.pages, retrieval.failed_pages),
            ),
            ("Time", format!("{:.1}s", elapsed.as_secs_f64())),
        ],
    );
    if retrieval.failed_pages > 0 {
        anyhow::bail!("{} pages could not be retrieved", retrieval.failed_pages);
    }
    Ok(())
}

/// Print a key-value summary table on stderr
fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

pub fn show_config(config: &Config, deployment: Deployment) {
    let bacdive = config.bacdive_config(deployment, false);
    let lpsn = config.lpsn_config(deployment);
    let http = config.http_config();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Deployment", &deployment.to_string()]);
    table.add_row(vec![
        "User",
        config.auth.user.as_deref().unwrap_or("not set"),
    ]);
    table.add_row(vec![
        "Password",
        if config.auth.password.is_some() {
            "configured"
        } else {
            "not set"
        },
    ]);
    table.add_row(vec!["SSO", &format!("{} (realm {})", config.auth.sso_url, config.auth.realm)]);
    table.add_row(vec![
        "BacDive API",
        &format!("{} ({})", bacdive.api_url(), bacdive.keycloak().client_id),
    ]);
    table.add_row(vec![
        "BacDive predictions",
        if bacdive.predictions { "on" } else { "off" },
    ]);
    table.add_row(vec![
        "LPSN API",
        &format!("{} ({})", lpsn.api_url(), lpsn.keycloak().client_id),
    ]);
    table.add_row(vec!["Max retries", &http.max_retries.to_string()]);
    table.add_row(vec!["Backoff", &format!("{}ms", http.backoff_unit.as_millis())]);
    table.add_row(vec!["Max in flight", &http.max_in_flight.to_string()]);
    table.add_row(vec![
        "Timeouts",
        &format!(
            "{}s request, {}s connect",
            http.request_timeout.as_secs(),
            http.connect_timeout.as_secs()
        ),
    ]);

    eprintln!("\n{table}");
}
