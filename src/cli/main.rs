use clap::{CommandFactory, Parser, Subcommand};
use irr_explorer::{
    asn_query, prefix_query, validate_url_format, ExplorerConfig, IrrExplorer, IrrExplorerError,
    OutputFormat,
};
use std::io::Write;
use std::process::exit;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// disable logging
    #[clap(long, global = true)]
    no_log: bool,

    /// IRR Explorer instance to query, overrides IRREXPLORER_BASE_URL
    #[clap(short = 'u', long, global = true)]
    base_url: Option<String>,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query routing and registry status of a prefix and its overlaps
    Prefix {
        /// prefix in CIDR notation, e.g. 192.0.2.0/24
        prefix: Option<String>,

        /// output format
        #[clap(short, long, default_value_t, value_enum)]
        format: OutputFormat,
    },

    /// Query prefixes originated by an ASN and the AS-sets it belongs to
    Asn {
        /// AS number, with or without the AS prefix, e.g. AS202196
        asn: Option<String>,

        /// output format
        #[clap(short, long, default_value_t, value_enum)]
        format: OutputFormat,
    },
}

enum Lookup {
    Prefix(String),
    Asn(String),
}

fn enable_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("irr_explorer=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_target(false)
        .init();
}

/// Help text of the whole program, or of one subcommand.
fn help_text(subcommand: Option<&str>) -> String {
    let mut cmd = Cli::command();
    cmd.build();
    match subcommand.and_then(|name| cmd.find_subcommand_mut(name)) {
        Some(sub) => sub.render_help().to_string(),
        None => cmd.render_help().to_string(),
    }
}

/// The argument, unless it is missing or blank.
fn required_arg(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// One-line message printed for a failed command.
fn error_line(err: &IrrExplorerError) -> String {
    match err {
        IrrExplorerError::InvalidPrefix(_) => "Error: Invalid prefix format".to_string(),
        IrrExplorerError::InvalidAsn(_) => "Error: Invalid ASN format".to_string(),
        IrrExplorerError::InvalidUrl(_) => "Error: Invalid URL format".to_string(),
        other => format!("Error: {}", other),
    }
}

fn report<E: Write>(error: IrrExplorerError, err: &mut E) -> i32 {
    let _ = writeln!(err, "{}", error_line(&error));
    1
}

/// Run one parsed command line and return the process exit code.
///
/// Help goes to `out` with exit code 0, query output goes to `out`, and errors go to `err`
/// with exit code 1.
fn run<W, E, F>(cli: Cli, config: ExplorerConfig, connect: F, out: &mut W, err: &mut E) -> i32
where
    W: Write,
    E: Write,
    F: FnOnce(&ExplorerConfig) -> Result<IrrExplorer, IrrExplorerError>,
{
    let (lookup, format) = match cli.command {
        None => {
            let _ = writeln!(out, "{}", help_text(None));
            return 0;
        }
        Some(Commands::Prefix { prefix, format }) => match required_arg(prefix) {
            Some(prefix) => (Lookup::Prefix(prefix), format),
            None => {
                let _ = writeln!(out, "{}", help_text(Some("prefix")));
                return 0;
            }
        },
        Some(Commands::Asn { asn, format }) => match required_arg(asn) {
            Some(asn) => (Lookup::Asn(asn), format),
            None => {
                let _ = writeln!(out, "{}", help_text(Some("asn")));
                return 0;
            }
        },
    };

    let mut config = config;
    if let Some(url) = cli.base_url {
        if !validate_url_format(url.as_str()) {
            return report(IrrExplorerError::InvalidUrl(url), err);
        }
        config = config.with_base_url(url);
    }
    debug!("loaded configuration: {}", config);

    let explorer = match connect(&config) {
        Ok(e) => e,
        Err(e) => return report(e, err),
    };

    let result = match lookup {
        Lookup::Prefix(prefix) => prefix_query(&explorer, prefix.as_str(), format, out),
        Lookup::Asn(asn) => asn_query(&explorer, asn.as_str(), format, out),
    };
    let _ = out.flush();
    drop(explorer);

    match result {
        Ok(()) => 0,
        Err(e) => report(e, err),
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if !cli.no_log {
        enable_logging();
    }

    let code = run(
        cli,
        ExplorerConfig::from_env(),
        IrrExplorer::from_config,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr(),
    );
    exit(code)
}
