use std::path::PathBuf;

use clap::Parser;
use geolink::config::ResolverConfig;
use geolink::location::{LinkResolver, ResolveOptions};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// geolink: resolve map links to coordinates
///
/// Accepts full map URLs (Google, Apple, Bing, OSM, Here, Waze), short links
/// (goo.gl, maps.app.goo.gl, tinyurl, bit.ly, ...) and place-name URLs.
///
/// Examples:
///   geolink "https://www.google.com/maps?q=40.7128,-74.0060"
///   geolink https://maps.app.goo.gl/abc123
///   geolink --free-text "Eiffel Tower"
///   geolink --serve --port 3100
#[derive(Parser)]
#[command(name = "geolink", version, about, long_about = None)]
struct Cli {
    /// Pasted link or text to resolve.
    #[arg(index = 1)]
    input: Option<String>,

    /// Config file path. Defaults to ~/.geolink/config.json.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offline mode: pattern extraction only, no network calls.
    #[arg(long)]
    offline: bool,

    /// Geocode input that is not a URL as a place name.
    #[arg(long)]
    free_text: bool,

    /// Skip reverse geocoding; use the coordinate label or query name.
    #[arg(long)]
    no_reverse: bool,

    /// Override the Nominatim base URL.
    #[arg(long)]
    nominatim_url: Option<String>,

    /// Network timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose logging to stderr.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Start the HTTP API server instead of resolving a single input.
    #[arg(long)]
    serve: bool,

    /// Server bind host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, short = 'p', default_value_t = 3100)]
    port: u16,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // ── Configuration ───────────────────────────────────────────

    let mut config = match &cli.config {
        Some(path) => ResolverConfig::load_from(path),
        None => ResolverConfig::load(),
    };
    if let Some(url) = &cli.nominatim_url {
        config.nominatim_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    if cli.offline {
        config.offline = true;
    }

    let resolver = LinkResolver::new(&config);

    // ── Server mode ─────────────────────────────────────────────

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: Failed to start async runtime: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = runtime.block_on(geolink::server::start(resolver, &cli.host, cli.port)) {
            eprintln!("Error: Server failed on {}:{}: {}", cli.host, cli.port, e);
            std::process::exit(1);
        }
        return;
    }

    // ── Single resolution ───────────────────────────────────────

    let input = cli.input.unwrap_or_else(|| {
        eprintln!("Error: No input. Pass a map link or use --serve.");
        eprintln!("  Example: geolink \"https://maps.google.com/?q=40.7128,-74.0060\"");
        std::process::exit(1);
    });

    let opts = ResolveOptions {
        geocode_free_text: cli.free_text,
        reverse_geocode: !cli.no_reverse,
    };

    let resolved = resolver.resolve_with_opts(&input, &opts).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    eprintln!("  \u{1F4CD} {}", resolved.display_line());

    match serde_json::to_string_pretty(&resolved) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: Failed to serialize result: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "geolink=debug" } else { "geolink=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
