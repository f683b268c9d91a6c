//! Orchestration of the `prefix` and `asn` lookups.
//!
//! Each orchestrator validates its input, runs the fetches on one [IrrExplorer], and writes the
//! selected output format to any [Write] sink.
use crate::{
    format_as_sets, format_direct_origins, format_overlapping_prefixes, format_prefix_result, normalize_asn, render_as_sets,
    render_panel_groups, sort_and_group_panels, validate_prefix_format, AsResponse, AsSets,
    IrrExplorer, IrrExplorerError, PanelGroup, PrefixInfo, CSV_HEADER,
};
use colored::Colorize;
use ipnet::IpNet;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;
use std::thread;
use tracing::{debug, warn};

/// Output format of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// nested terminal panels
    #[default]
    Table,
    /// pretty-printed JSON of the fetched data
    Json,
    /// flat CSV rows
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        write!(f, "{}", name)
    }
}

type FollowUp = (String, Result<Vec<PrefixInfo>, IrrExplorerError>);

#[derive(Serialize)]
struct AsnReport<'a> {
    asn_info: &'a AsResponse,
    as_sets: &'a AsSets,
}

/// Least-specific prefix of every cluster, deduplicated, in cluster order.
///
/// A cluster root contains every other record of its cluster, so it is the least specific one.
fn cluster_roots(groups: &[PanelGroup]) -> Vec<String> {
    groups
        .iter()
        .map(|group| group.root.info.prefix.to_string())
        .unique()
        .collect()
}

/// Fetch the overlaps of every prefix on scoped threads, at most `explorer.concurrency_limit()`
/// requests at a time. Results keep the order of `prefixes`.
fn fetch_overlaps(explorer: &IrrExplorer, prefixes: &[String]) -> Vec<FollowUp> {
    let batch_size = explorer.concurrency_limit().max(1);
    prefixes
        .chunks(batch_size)
        .flat_map(|batch| {
            thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|lsp| (lsp, scope.spawn(move || explorer.fetch_prefix_info(lsp))))
                    .collect();
                handles
                    .into_iter()
                    .map(|(lsp, handle)| match handle.join() {
                        Ok(result) => (lsp.clone(), result),
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect()
}

fn write_panels<W: Write>(
    out: &mut W,
    heading: &str,
    records: Vec<PrefixInfo>,
    empty: &str,
) -> Result<(), IrrExplorerError> {
    writeln!(out, "{}", heading.bold())?;
    let groups = sort_and_group_panels(records);
    if groups.is_empty() {
        writeln!(out, "{}", empty)?;
    } else {
        writeln!(out, "{}", render_panel_groups(&groups))?;
    }
    Ok(())
}

fn write_csv_block<W: Write>(out: &mut W, block: String) -> Result<(), IrrExplorerError> {
    if !block.is_empty() {
        writeln!(out, "{}", block)?;
    }
    Ok(())
}

/// Look up `prefix` and write the result to `out`.
///
/// Table and CSV output also include the overlaps of the least specific prefix of every cluster
/// found in the direct answer. A failed overlap lookup is reported inline and does not abort the
/// query. JSON output is the direct answer only.
pub fn prefix_query<W: Write>(
    explorer: &IrrExplorer,
    prefix: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), IrrExplorerError> {
    let prefix = prefix.trim();
    if !validate_prefix_format(prefix) {
        return Err(IrrExplorerError::InvalidPrefix(prefix.to_string()));
    }
    let direct = explorer.fetch_prefix_info(prefix)?;
    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string_pretty(&direct)?)?;
        return Ok(());
    }

    let groups = sort_and_group_panels(direct.clone());
    let roots = cluster_roots(&groups);
    debug!("{} clusters for {}, roots {:?}", groups.len(), prefix, roots);

    // the direct answer already holds the overlaps of the queried prefix itself
    let own_root = IpNet::from_str(prefix).ok().map(|net| net.to_string());
    let pending: Vec<String> = roots
        .iter()
        .filter(|root| Some(*root) != own_root.as_ref())
        .cloned()
        .collect();
    let mut fetched: HashMap<String, _> = fetch_overlaps(explorer, &pending).into_iter().collect();
    let follow_ups: Vec<FollowUp> = roots
        .into_iter()
        .map(|root| {
            let result = fetched.remove(&root).unwrap_or_else(|| Ok(direct.clone()));
            (root, result)
        })
        .collect();

    if format == OutputFormat::Csv {
        writeln!(out, "{}", CSV_HEADER)?;
        for info in &direct {
            writeln!(out, "{}", format_prefix_result(info, "DIRECT"))?;
        }
        for (lsp, result) in follow_ups {
            match result {
                Ok(records) => {
                    for info in &records {
                        writeln!(out, "{}", format_prefix_result(info, "OVERLAP"))?;
                    }
                }
                Err(e) => warn!("Error fetching overlaps for {}: {}", lsp, e),
            }
        }
        return Ok(());
    }

    writeln!(
        out,
        "{}",
        format!("Directly overlapping prefixes of {}", prefix).bold()
    )?;
    if groups.is_empty() {
        writeln!(out, "No prefixes found for {}", prefix)?;
    } else {
        writeln!(out, "{}", render_panel_groups(&groups))?;
    }
    for (lsp, result) in follow_ups {
        writeln!(out)?;
        match result {
            Ok(records) => write_panels(
                out,
                format!("All overlaps of least specific match {}", lsp).as_str(),
                records,
                format!("No overlaps found for {}", lsp).as_str(),
            )?,
            Err(e) => writeln!(
                out,
                "{}",
                format!("Error fetching overlaps for {}: {}", lsp, e).red()
            )?,
        }
    }
    Ok(())
}

/// Look up `asn` and its AS-set memberships and write the result to `out`.
///
/// `asn` may be given with or without the `AS` prefix.
pub fn asn_query<W: Write>(
    explorer: &IrrExplorer,
    asn: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), IrrExplorerError> {
    let asn = normalize_asn(asn.trim())?;
    let info = explorer.fetch_asn_info(&asn)?;
    let sets = explorer.fetch_asn_sets(&asn)?;

    match format {
        OutputFormat::Json => {
            let report = AsnReport {
                asn_info: &info,
                as_sets: &sets,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "{}", CSV_HEADER)?;
            write_csv_block(out, format_direct_origins(&asn, &info))?;
            write_csv_block(out, format_overlapping_prefixes(&asn, &info))?;
            write_csv_block(out, format_as_sets(&asn, &sets))?;
        }
        OutputFormat::Table => {
            write_panels(
                out,
                format!("Directly originated prefixes of {}", asn).as_str(),
                info.direct_origin,
                format!("No directly originated prefixes found for {}", asn).as_str(),
            )?;
            writeln!(out)?;
            write_panels(
                out,
                format!("Overlapping prefixes of {}", asn).as_str(),
                info.overlaps,
                format!("No overlapping prefixes found for {}", asn).as_str(),
            )?;
            writeln!(out)?;
            writeln!(out, "{}", render_as_sets(&asn, &sets))?;
        }
    }
    Ok(())
}
