//! Terminal rendering of prefix records and AS-set memberships.
use crate::{AsSets, Category, PanelGroup, PrefixInfo, RpkiStatus};
use colored::{Color, Colorize};
use itertools::Itertools;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const INDENT: &str = "    ";

/// RPKI status of a record, taken from its first RPKI route.
///
/// A record without RPKI routes is `UNKNOWN`.
pub fn get_rpki_status(info: &PrefixInfo) -> RpkiStatus {
    info.rpki_routes
        .first()
        .map(|route| route.rpki_status)
        .unwrap_or(RpkiStatus::Unknown)
}

/// Terminal color used for a category.
pub fn get_status_style(category: Category) -> Color {
    match category {
        Category::Success => Color::Green,
        Category::Info => Color::Blue,
        Category::Warning => Color::Yellow,
        Category::Danger => Color::Red,
        Category::Error => Color::BrightRed,
    }
}

fn or_none(value: String) -> String {
    match value.is_empty() {
        true => "None".to_string(),
        false => value,
    }
}

/// Render one record as a titled key/value panel.
pub fn create_prefix_panel(info: &PrefixInfo) -> String {
    let color = get_status_style(info.category_overall);
    let mut title = format!("{} [{}]", info.prefix, info.category_overall)
        .color(color)
        .bold();
    if info.category_overall == Category::Error {
        title = title.underline();
    }

    let rpki = match info.rpki_routes.first() {
        Some(route) => match route.rpki_max_length {
            Some(max_length) => format!("{} (AS{}, max length {})", route.rpki_status, route.asn, max_length),
            None => format!("{} (AS{})", route.rpki_status, route.asn),
        },
        None => get_rpki_status(info).to_string(),
    };
    let bgp_origins = info.bgp_origins.iter().map(|asn| format!("AS{}", asn)).join(", ");
    let irr_routes = info
        .irr_routes
        .iter()
        .filter(|(_, routes)| !routes.is_empty())
        .map(|(irr, routes)| {
            let origins = routes.iter().map(|r| format!("AS{}", r.asn)).join(", ");
            format!("{}: {}", irr, origins)
        })
        .join("\n");
    let messages = info
        .messages
        .iter()
        .map(|m| format!("[{}] {}", m.category, m.text))
        .join("\n");

    let mut builder = Builder::default();
    builder.push_record(["RIR".to_string(), info.rir.clone().unwrap_or_else(|| "-".to_string())]);
    builder.push_record(["RPKI".to_string(), rpki]);
    builder.push_record(["BGP Origins".to_string(), or_none(bgp_origins)]);
    builder.push_record(["IRR Routes".to_string(), or_none(irr_routes)]);
    builder.push_record(["Messages".to_string(), or_none(messages)]);
    let mut table = builder.build();
    table.with(Style::rounded());

    format!("{}\n{}", title, table)
}

fn indent(text: &str, depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    text.lines().map(|line| format!("{}{}", pad, line)).join("\n")
}

/// Render clustered records, nesting each panel under the panel of its container.
pub fn render_panel_groups(groups: &[PanelGroup]) -> String {
    groups
        .iter()
        .flat_map(|group| group.flatten())
        .map(|(depth, info)| indent(&create_prefix_panel(info), depth))
        .join("\n")
}

#[derive(Tabled)]
struct AsSetRow {
    #[tabled(rename = "IRR")]
    irr: String,
    #[tabled(rename = "AS Sets")]
    sets: String,
}

/// Render the AS-sets containing `asn` as a table, one row per IRR database.
pub fn render_as_sets(asn: &str, sets: &AsSets) -> String {
    if sets.is_empty() {
        return format!("No AS sets found for {}", asn);
    }
    let rows = sets
        .sets_per_irr
        .iter()
        .filter(|(_, names)| !names.is_empty())
        .map(|(irr, names)| AsSetRow {
            irr: irr.clone(),
            sets: names.join(", "),
        });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    let heading = format!("AS sets containing {}", asn);
    format!("{}\n{}", heading.bold(), table)
}
