use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lynx_visits::config::Config;
use lynx_visits::models::{Visit, VisitsParams};
use lynx_visits::report::{
    FileVisitsSource, HttpVisitsSource, VisitsEndpoint, VisitsReport, VisitsSource,
};
use lynx_visits::visits::Step;

#[derive(Parser)]
#[command(name = "lynx-visits")]
#[command(about = "Visit charts for short URLs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the line chart data of a set of visits as JSON
    Chart {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// Print the visits composing one point of the chart
    Point {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        chart: ChartArgs,
        /// Index of the point on the time axis
        index: usize,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Read visits from a JSON export instead of the server
    #[arg(long, conflicts_with_all = ["short_code", "tag", "orphan"])]
    file: Option<PathBuf>,
    /// Visits of one short URL (requires SERVER_URL)
    #[arg(long)]
    short_code: Option<String>,
    /// Visits of every short URL with a tag (requires SERVER_URL)
    #[arg(long)]
    tag: Option<String>,
    /// Visits that did not match any short URL (requires SERVER_URL)
    #[arg(long)]
    orphan: bool,
    /// Leave out visits flagged as potential bots
    #[arg(long)]
    exclude_bots: bool,
}

#[derive(Args)]
struct ChartArgs {
    /// Group visits by this step instead of inferring it
    #[arg(long, value_enum)]
    step: Option<Step>,
    /// Keep buckets without visits on the time axis
    #[arg(long)]
    show_empty: bool,
    /// Overlay visits coming from this browser
    #[arg(long)]
    highlight_browser: Option<String>,
}

fn build_source(args: &SourceArgs, config: &Config) -> Result<Arc<dyn VisitsSource>> {
    if let Some(ref path) = args.file {
        info!("Reading visits from {}", path.display());
        return Ok(Arc::new(FileVisitsSource::new(path)));
    }

    let endpoint = match (&args.short_code, &args.tag, args.orphan) {
        (Some(code), None, false) => VisitsEndpoint::ShortUrl(code.clone()),
        (None, Some(tag), false) => VisitsEndpoint::Tag(tag.clone()),
        (None, None, true) => VisitsEndpoint::Orphan,
        (None, None, false) => VisitsEndpoint::NonOrphan,
        _ => bail!("--short-code, --tag and --orphan are mutually exclusive"),
    };

    let server = config
        .server
        .as_ref()
        .context("SERVER_URL must be set to load visits from a server")?;
    info!("Loading {:?} visits from {}", endpoint, server.url);

    Ok(Arc::new(HttpVisitsSource::new(server, endpoint)?))
}

async fn load_report(source: &SourceArgs, chart: &ChartArgs, config: &Config) -> Result<VisitsReport> {
    let visits_source = build_source(source, config)?;
    let report = VisitsReport::spawn(visits_source, &config.chart)?;

    report.load(VisitsParams {
        exclude_bots: source.exclude_bots,
        ..Default::default()
    });
    report.wait_for_loads(1).await;

    if let Some(error) = report.last_error() {
        bail!("Could not load visits: {error}");
    }

    if let Some(step) = chart.step {
        report.set_step(step);
    }
    if chart.show_empty {
        report.set_skip_empty(false);
    }
    if let Some(browser) = chart.highlight_browser.clone() {
        report.highlight(Arc::new(move |visit: &Visit| {
            visit.browser.as_deref() == Some(browser.as_str())
        }));
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!("Loaded configuration");

    match cli.command {
        Commands::Chart { source, chart } => {
            let report = load_report(&source, &chart, &config).await?;
            let data = report.chart_data();
            info!(
                "Charted {} visits in {} {} buckets",
                report.visits().len(),
                data.labels.len(),
                report.step()
            );
            println!("{}", serde_json::to_string_pretty(&data)?);
            report.shutdown().await;
        }
        Commands::Point {
            source,
            chart,
            index,
        } => {
            let report = load_report(&source, &chart, &config).await?;
            let visits = report.select_point(index);
            match report.selected_label() {
                Some(label) => info!("{} visits in bucket {}", visits.len(), label),
                None => info!("No bucket at index {}", index),
            }
            println!("{}", serde_json::to_string_pretty(&visits)?);
            report.shutdown().await;
        }
    }

    Ok(())
}
