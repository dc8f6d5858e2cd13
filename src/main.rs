mod batch;
mod browser;
mod export;
mod links;
mod model;
mod parser;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use browser::detail::{self, DetailConfig};
use browser::scroll::{self, ScrollPolicy};
use browser::{ChromeDriver, RenderConfig};
use model::ExtractionResult;

#[derive(Parser)]
#[command(name = "avito_scraper", about = "Avito seller listing scraper (headless Chromium)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render seller pages, extract listings and export CSV
    Scrape {
        /// Seller listing URLs
        urls: Vec<String>,
        /// File with one URL per line (.txt or .csv)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// CSV output path (default: avito_products_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Visit every item page for description, parameters and price list
        #[arg(long)]
        details: bool,
        /// Print the merged result as JSON
        #[arg(long)]
        json: bool,
        /// Abort the batch on the first failed URL
        #[arg(long)]
        fail_fast: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Extract listings from a saved HTML snapshot
    Parse {
        html: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Save the fully scrolled HTML of one page
    Render {
        url: String,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    /// Chromium/Chrome binary (auto-detected when omitted)
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,
    /// Fixed user agent instead of a random one from the pool
    #[arg(long)]
    user_agent: Option<String>,
    /// Pause after each scroll, in ms
    #[arg(long, default_value_t = scroll::SCROLL_PAUSE.as_millis() as u64)]
    pause_ms: u64,
    #[arg(long, default_value_t = scroll::MAX_ATTEMPTS)]
    max_attempts: u32,
    /// Unchanged cycles before the listing counts as settled
    #[arg(long, default_value_t = scroll::STABLE_THRESHOLD)]
    stable_cycles: u32,
    /// Hard limit on scrolling time, in seconds
    #[arg(long, default_value_t = scroll::WALL_CLOCK_CEILING.as_secs())]
    ceiling_secs: u64,
    /// Do not click "expand description" links
    #[arg(long)]
    no_expand: bool,
}

impl RenderArgs {
    fn to_config(&self) -> RenderConfig {
        RenderConfig {
            headless: !self.headed,
            chrome_executable: self.chrome.clone(),
            user_agent: self.user_agent.clone(),
            expand_descriptions: !self.no_expand,
            scroll: ScrollPolicy {
                pause: Duration::from_millis(self.pause_ms),
                max_attempts: self.max_attempts,
                stable_threshold: self.stable_cycles.max(1),
                ceiling: Duration::from_secs(self.ceiling_secs),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { urls, file, output, details, json, fail_fast, render } => {
            let mut all = urls;
            if let Some(path) = file {
                all.extend(links::load_links(&path)?);
            }
            if all.is_empty() {
                bail!("No URLs given. Pass them as arguments or with --file.");
            }

            let config = render.to_config();
            let driver = ChromeDriver::new(config.clone());
            let pb = progress_bar(all.len());
            let report = batch::run_batch(&driver, &all, fail_fast, |p| {
                pb.set_position(p.percent as u64);
                pb.suspend(|| info!("Progress: {}% ({}/{})", p.percent, p.completed, p.total));
            })
            .await
            .context("Batch aborted")?;
            pb.finish_and_clear();

            for (url, err) in &report.failures {
                warn!("Not scraped: {} ({})", url, err);
            }

            let mut result = report.result;
            if details && !result.products.is_empty() {
                attach_details(&mut result, &config, &DetailConfig::default()).await;
            }

            finish(&result, output, json)
        }
        Commands::Parse { html, output, json } => {
            let text = std::fs::read_to_string(&html)
                .with_context(|| format!("Failed to read {}", html.display()))?;
            let result = parser::extract_from_html(&text);
            finish(&result, output, json)
        }
        Commands::Render { url, output, render } => {
            let html = browser::render_listing(&url, &render.to_config()).await?;
            save_html(&output, &html)?;
            println!("Saved {} bytes of HTML to {}", html.len(), output.display());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn save_html(path: &Path, html: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
}

/// Best-effort detail pass. Listing results survive a browser that fails
/// to start; the export then simply has no detail columns.
async fn attach_details(result: &mut ExtractionResult, render: &RenderConfig, config: &DetailConfig) -> usize {
    match detail::enrich_with_browser(&mut result.products, render, config).await {
        Ok(n) => {
            println!("Details collected for {} of {} items", n, result.total_products);
            n
        }
        Err(e) => {
            warn!("Detail pass skipped: {}", e);
            0
        }
    }
}

/// Print the summary and export. With `--json` and no `--output` only JSON
/// is produced.
fn finish(result: &ExtractionResult, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        if output.is_none() {
            return Ok(());
        }
    } else {
        print_summary(result);
    }

    let path = output.unwrap_or_else(|| PathBuf::from(export::default_filename()));
    let rows = export::save_csv(result, &path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    println!("Saved {} rows to {}", rows, path.display());
    Ok(())
}

fn print_summary(result: &ExtractionResult) {
    let seller = &result.seller_info;
    println!("Seller:  {}", if seller.name.is_empty() { "-" } else { seller.name.as_str() });
    println!("Rating:  {}", if seller.rating.is_empty() { "-" } else { seller.rating.as_str() });
    println!("Found:   {} products\n", result.total_products);

    if result.products.is_empty() {
        return;
    }

    println!("{:>4} | {:<40} | {:<14} | {:<24} | {:<14}", "#", "Name", "Price", "Location", "Date");
    println!("{}", "-".repeat(108));
    for p in &result.products {
        println!(
            "{:>4} | {:<40} | {:<14} | {:<24} | {:<14}",
            p.index,
            truncate(&p.name, 40),
            truncate(&p.price, 14),
            truncate(&p.location, 24),
            truncate(&p.date, 14),
        );
    }
    println!();
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("{} sellers", total));
    pb
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_args_map_to_config() {
        let cli = Cli::parse_from([
            "avito_scraper",
            "render",
            "https://www.avito.ru/brands/x/items",
            "-o",
            "page.html",
            "--headed",
            "--pause-ms",
            "250",
            "--ceiling-secs",
            "30",
            "--stable-cycles",
            "0",
        ]);
        let Commands::Render { render, .. } = cli.command else {
            panic!("expected render subcommand");
        };
        let config = render.to_config();
        assert!(!config.headless);
        assert_eq!(config.scroll.pause, Duration::from_millis(250));
        assert_eq!(config.scroll.ceiling, Duration::from_secs(30));
        assert_eq!(config.scroll.stable_threshold, 1);
        assert_eq!(config.scroll.max_attempts, scroll::MAX_ATTEMPTS);
        assert!(config.expand_descriptions);
    }

    #[tokio::test]
    async fn failed_detail_launch_keeps_listing_results() {
        let html = std::fs::read_to_string("tests/fixtures/seller_profile.html").unwrap();
        let mut result = parser::extract_from_html(&html);
        let render = RenderConfig {
            chrome_executable: Some(PathBuf::from("/nonexistent/chromium")),
            ..Default::default()
        };

        let n = attach_details(&mut result, &render, &DetailConfig::default()).await;

        assert_eq!(n, 0);
        assert_eq!(result.total_products, 4);
        assert!(!result.has_details());

        let dir = std::env::temp_dir().join(format!("avito_details_{}", std::process::id()));
        let path = dir.join("out.csv");
        finish(&result, Some(path.clone()), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert!(written.starts_with("index,name,url,title,price,location,date,seller_name,seller_rating"));
        assert_eq!(written.lines().count(), 5);
    }

    #[test]
    fn save_html_creates_missing_dirs() {
        let dir = std::env::temp_dir().join(format!("avito_render_{}", std::process::id()));
        let path = dir.join("snapshots").join("page.html");
        let _ = std::fs::remove_dir_all(&dir);

        save_html(&path, "<html></html>").unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(saved, "<html></html>");
    }

    #[test]
    fn truncate_keeps_char_boundaries() {
        assert_eq!(truncate("Стул", 10), "Стул");
        assert_eq!(truncate("Стол обеденный раздвижной", 10), "Стол об...");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
    }
}
