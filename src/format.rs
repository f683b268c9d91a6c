//! CSV flattening of query results.
//!
//! Every row has the fixed [CSV_HEADER] columns. Multi-valued fields are joined with `;` into a
//! single cell, and cells containing a comma or a quote are quoted.
use crate::display::get_rpki_status;
use crate::{AsResponse, AsSets, PrefixInfo};
use itertools::Itertools;

/// Header line of every CSV output.
pub const CSV_HEADER: &str = "Type,ASN,Prefix,Category,RIR,RPKI_Status,BGP_Origins,IRR_Routes,Messages";

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(cells: &[&str]) -> String {
    cells.iter().map(|c| csv_cell(c)).join(",")
}

fn csv_row(row_type: &str, asn: &str, info: &PrefixInfo) -> String {
    let prefix = info.prefix.to_string();
    let rpki_status = get_rpki_status(info).to_string();
    let bgp_origins = info.bgp_origins.iter().join(";");
    let irr_routes = info
        .irr_routes
        .iter()
        .flat_map(|(irr, routes)| routes.iter().map(move |r| format!("{}:AS{}", irr, r.asn)))
        .join(";");
    let messages = info.messages.iter().map(|m| m.text.as_str()).join(";");
    csv_line(&[
        row_type,
        asn,
        prefix.as_str(),
        info.category_overall.as_str(),
        info.rir.as_deref().unwrap_or(""),
        rpki_status.as_str(),
        bgp_origins.as_str(),
        irr_routes.as_str(),
        messages.as_str(),
    ])
}

/// Format one prefix record as CSV rows, one per BGP origin ASN.
///
/// A record without BGP origins produces a single row with an empty ASN cell.
pub fn format_prefix_result(info: &PrefixInfo, query_type: &str) -> String {
    if info.bgp_origins.is_empty() {
        return csv_row(query_type, "", info);
    }
    info.bgp_origins
        .iter()
        .map(|origin| csv_row(query_type, format!("AS{}", origin).as_str(), info))
        .join("\n")
}

/// Format the directly originated prefixes of `asn` as CSV rows.
pub fn format_direct_origins(asn: &str, response: &AsResponse) -> String {
    response
        .direct_origin
        .iter()
        .map(|info| csv_row("DIRECT_ORIGIN", asn, info))
        .join("\n")
}

/// Format the prefixes overlapping those of `asn` as CSV rows.
pub fn format_overlapping_prefixes(asn: &str, response: &AsResponse) -> String {
    response
        .overlaps
        .iter()
        .map(|info| csv_row("OVERLAP", asn, info))
        .join("\n")
}

/// Format AS-set membership as CSV rows, one per set, with `irr:set` in the IRR column.
pub fn format_as_sets(asn: &str, sets: &AsSets) -> String {
    sets.sets_per_irr
        .iter()
        .flat_map(|(irr, names)| names.iter().map(move |name| (irr, name)))
        .map(|(irr, name)| {
            let irr_set = format!("{}:{}", irr, name);
            csv_line(&["AS_SET", asn, "", "", "", "", "", irr_set.as_str(), ""])
        })
        .join("\n")
}
