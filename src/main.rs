//! serp-hybrid CLI - competitor lookup from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use serp_hybrid::{
    proxy::ProxyManager, proxy::HttpProbe, AnalysisRequest, CompetitorRecord, ParserOrchestrator,
    SearchMethod, SerpConfig,
};

/// Hybrid SERP acquisition CLI
#[derive(Parser)]
#[command(name = "serp-hybrid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the ranked competitors for a keyword
    Search(SearchArgs),

    /// Load and probe the public proxy pool
    Proxies(ProxiesArgs),
}

#[derive(Parser)]
struct SearchArgs {
    /// Keyword to search for
    keyword: String,

    /// Country/location code (e.g., us, gb)
    #[arg(short, long)]
    location: Option<String>,

    /// Interface language (e.g., en)
    #[arg(long)]
    language: Option<String>,

    /// Number of results (1-100)
    #[arg(short = 'n', long, default_value = "10")]
    count: usize,

    /// Use only this backend, without fallback
    #[arg(short, long)]
    method: Option<MethodArg>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Print quota and cache statistics afterwards
    #[arg(long)]
    stats: bool,
}

#[derive(Parser)]
struct ProxiesArgs {
    /// Number of working proxies to list
    #[arg(long, default_value = "10")]
    limit: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Search API
    Structured,
    /// Headless browser
    Browser,
}

impl From<MethodArg> for SearchMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Structured => SearchMethod::Structured,
            MethodArg::Browser => SearchMethod::Browser,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = SerpConfig::from_env()?;
    match cli.command {
        Commands::Search(args) => run_search(&config, args).await,
        Commands::Proxies(args) => run_proxies(&config, args).await,
    }
}

async fn run_search(config: &SerpConfig, args: SearchArgs) -> Result<()> {
    let orchestrator = ParserOrchestrator::from_config(config)?;

    let mut request = AnalysisRequest::new(&args.keyword).with_result_count(args.count);
    if let Some(location) = args.location {
        request = request.with_location(location);
    }
    if let Some(language) = args.language {
        request = request.with_language(language);
    }
    if let Some(method) = args.method {
        request = request.with_forced_method(method.into());
    }

    let competitors = orchestrator.analyze_competitors(&request).await;
    orchestrator.shutdown().await;
    let competitors = competitors?;

    match args.format {
        OutputFormat::Text => print_text(&args.keyword, &competitors),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&competitors)?),
        OutputFormat::Compact => {
            for c in &competitors {
                println!("{}\t{}\t{}", c.position, c.domain, c.url);
            }
        }
    }

    if args.stats {
        let stats = orchestrator.get_stats().await;
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            _ => {
                let api = &stats.structured_api;
                eprintln!(
                    "Structured API: {}/{} used ({:.1}%), {} remaining",
                    api.used, api.limit, api.percentage, api.remaining
                );
                eprintln!(
                    "Cache: {} entries, {} hits, {} misses",
                    stats.cache.size, stats.cache.hits, stats.cache.misses
                );
            }
        }
    }

    Ok(())
}

fn print_text(keyword: &str, competitors: &[CompetitorRecord]) {
    if competitors.is_empty() {
        println!("\nNo results for \"{}\".", keyword);
        return;
    }

    println!("\nCompetitors for \"{}\" ({} results):\n", keyword, competitors.len());
    for c in competitors {
        println!("{}. {}", c.position, c.title);
        println!("   {} | {}", c.domain, c.url);
        if !c.description.is_empty() {
            let description: String = c.description.chars().take(150).collect();
            if description.len() < c.description.len() {
                println!("   {}...", description);
            } else {
                println!("   {}", description);
            }
        }
        println!();
    }
}

async fn run_proxies(config: &SerpConfig, args: ProxiesArgs) -> Result<()> {
    let manager = ProxyManager::from_sources(config.proxy_sources.as_slice())?
        .with_probe(HttpProbe::new(
            config.proxy_probe_url.clone(),
            config.proxy_probe_timeout,
        ))
        .with_max_probed(config.proxy_max_probe);

    eprintln!(
        "Probing up to {} proxies from {} sources...",
        config.proxy_max_probe,
        config.proxy_sources.len()
    );
    let stats = manager.load_proxies().await;

    println!(
        "{} of {} probed proxies working ({:.1}%), average latency {:.0}ms\n",
        stats.working, stats.total_probed, stats.success_rate, stats.average_latency_ms
    );
    for proxy in manager.working_proxies().await.iter().take(args.limit) {
        println!(
            "{:<28} {:>6}ms  {}",
            proxy.url(),
            proxy.latency_ms.unwrap_or_default(),
            proxy.country.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
