use clap::Parser;
use eoka_ocr::output::{self, ListStyle};
use eoka_ocr::{CdpTab, Error, FindQuery, ImageInput, LaunchedPage, Ocr, Region, Settings};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "eoka-ocr")]
#[command(about = "Find and click on-screen text with OCR")]
#[command(version)]
#[command(after_help = "\
Examples:
  eoka-ocr screenshot.png                  OCR a local image
  eoka-ocr screenshot.png -t Login         find text in an image
  eoka-ocr --cdp                           OCR the running browser's tab
  eoka-ocr --cdp -t Publish --click        find and click
  eoka-ocr --cdp -t Post --exact --click   avoid \"Post\" matching \"Posts\"
  eoka-ocr https://example.com             open a URL and OCR it")]
struct Cli {
    /// Image path or http(s) URL
    source: Option<String>,

    /// Text to find
    #[arg(short, long)]
    target: Option<String>,

    /// Match the whole text exactly (case-sensitive)
    #[arg(short, long)]
    exact: bool,

    /// List every match instead of the best one
    #[arg(short, long)]
    all: bool,

    /// Click the match (requires --cdp)
    #[arg(short, long)]
    click: bool,

    /// JSON output
    #[arg(short, long)]
    json: bool,

    /// Capture the tab of a running browser (default URL from config)
    #[arg(long, value_name = "URL", num_args = 0..=1, default_missing_value = "")]
    cdp: Option<String>,

    /// Only match in this area: top, bottom, left, right, center
    #[arg(long, value_parser = parse_region)]
    region: Option<Region>,

    /// Prefer the match closest to this text
    #[arg(long, value_name = "TEXT")]
    near: Option<String>,

    /// Wait before capturing the browser tab
    #[arg(long, value_name = "MS", default_value_t = 0)]
    wait_ms: u64,

    /// Print only the text of each item
    #[arg(short, long, conflicts_with = "layout")]
    plain: bool,

    /// Print recognized text reassembled into lines
    #[arg(long)]
    layout: bool,

    /// Always load the model in-process, skipping the OCR server
    #[arg(long)]
    local: bool,

    /// OCR server URL (overrides config and OCR_SERVER_URL)
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Settings file (YAML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

fn parse_region(s: &str) -> Result<Region, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

/// Where the image comes from.
enum Source {
    Cdp(String),
    Url(String),
    Image(PathBuf),
}

impl Cli {
    fn list_style(&self) -> ListStyle {
        if self.json {
            ListStyle::Json
        } else if self.plain {
            ListStyle::Plain
        } else if self.layout {
            ListStyle::Layout
        } else {
            ListStyle::Positions
        }
    }

    /// The search target. An empty one means list everything.
    fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }

    /// Clicking needs a live tab.
    fn check_click(&self, source: &Source) -> eoka_ocr::Result<()> {
        if self.click && !matches!(source, Source::Cdp(_)) {
            return Err(Error::Config("--click requires --cdp".into()));
        }
        Ok(())
    }

    fn source(&self, settings: &Settings) -> Option<Source> {
        if let Some(ref url) = self.cdp {
            let url = if url.is_empty() {
                settings.cdp_url.clone()
            } else {
                url.clone()
            };
            return Some(Source::Cdp(url));
        }
        let source = self.source.as_deref()?;
        if source.starts_with("http://") || source.starts_with("https://") {
            Some(Source::Url(source.to_string()))
        } else {
            Some(Source::Image(PathBuf::from(source)))
        }
    }
}

/// What one capture produced.
#[derive(Debug, PartialEq)]
enum Outcome {
    /// Every recognized item, for stdout.
    Listing(String),
    /// Matches for stdout, and the screenshot pixel to click.
    Found { output: String, click_at: [i32; 2] },
    /// Message for stderr; the run exits with status 1.
    NotFound(String),
}

#[tokio::main]
async fn main() -> eoka_ocr::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let settings = Settings::load_with(cli.config.as_deref(), |s| {
        if let Some(ref url) = cli.server {
            s.server_url = url.clone();
        }
    })?;

    let Some(source) = cli.source(&settings) else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        std::process::exit(1);
    };
    cli.check_click(&source)?;

    let ocr = Ocr::connect(&settings, cli.local).await?;
    debug!(
        "OCR backend: {}",
        if ocr.is_remote() { "server" } else { "local" }
    );

    let found = match source {
        Source::Cdp(url) => {
            let tab = CdpTab::attach(&url).await?;
            let result = run_tab(&cli, &ocr, &tab).await;
            tab.detach();
            result?
        }
        Source::Url(url) => {
            let page = LaunchedPage::open(&url, settings.viewport).await?;
            let shot = page.screenshot().await;
            page.close().await?;
            let image = ImageInput::Bytes(shot?);
            report(evaluate(&cli, &ocr, &image).await?, None, false).await?
        }
        Source::Image(path) => {
            let image = ImageInput::Path(path);
            report(evaluate(&cli, &ocr, &image).await?, None, false).await?
        }
    };

    if !found {
        std::process::exit(1);
    }
    Ok(())
}

/// Capture the live tab, search it, and click when asked.
async fn run_tab(cli: &Cli, ocr: &Ocr, tab: &CdpTab) -> eoka_ocr::Result<bool> {
    if cli.wait_ms > 0 {
        tokio::time::sleep(Duration::from_millis(cli.wait_ms)).await;
    }
    let image = ImageInput::Bytes(tab.screenshot().await?);
    let outcome = evaluate(cli, ocr, &image).await?;
    report(outcome, Some(tab), cli.click).await
}

/// Recognize or search `image`.
async fn evaluate(cli: &Cli, ocr: &Ocr, image: &ImageInput) -> eoka_ocr::Result<Outcome> {
    let Some(target) = cli.target() else {
        let items = ocr.recognize(image).await?;
        return Ok(Outcome::Listing(output::listing(&items, cli.list_style())?));
    };

    let query = FindQuery::new(target)
        .exact(cli.exact)
        .region(cli.region)
        .near(cli.near.clone());

    if cli.all {
        let matches = ocr.find_all(image, &query).await?;
        let Some(best) = matches.first() else {
            return Ok(Outcome::NotFound(output::not_found(target)));
        };
        return Ok(Outcome::Found {
            output: output::found_all(&matches, cli.json)?,
            click_at: best.center,
        });
    }

    Ok(match ocr.find(image, &query).await? {
        Some(item) => Outcome::Found {
            output: output::found(&item, cli.json)?,
            click_at: item.center,
        },
        None => Outcome::NotFound(output::not_found(target)),
    })
}

/// Print `outcome`, clicking the best match on `tab` when `click` is set.
/// Returns `false` when the target was not found.
async fn report(outcome: Outcome, tab: Option<&CdpTab>, click: bool) -> eoka_ocr::Result<bool> {
    match outcome {
        Outcome::Listing(out) => println!("{}", out),
        Outcome::Found {
            output: text,
            click_at,
        } => {
            println!("{}", text);
            if let (true, Some(tab)) = (click, tab) {
                let (x, y) = tab.click_at(click_at).await?;
                println!("{}", output::clicked(x, y));
            }
        }
        Outcome::NotFound(message) => {
            eprintln!("{}", message);
            return Ok(false);
        }
    }
    Ok(true)
}
