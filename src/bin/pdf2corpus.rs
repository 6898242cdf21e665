//! CLI binary for pdf2corpus.
//!
//! A thin shim over the library crate that maps CLI flags to `OcrConfig`
//! and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2corpus::pipeline::input::derived_outputs;
use pdf2corpus::{
    clean_file, clean_text, ingest_document, inspect, ocr_to_file, ocr_to_string,
    BatchProgressCallback, IngestReport, OcrConfig, ProgressCallback, ScriptBlock,
};
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per page.
/// Pages finish out of order, so per-page start times are keyed by page number.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn page_elapsed_ms(&self, page_num: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting OCR of {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed_ms = self.page_elapsed_ms(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} bytes")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed_ms = self.page_elapsed_ms(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep long tesseract diagnostics to one line.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR + filter, writing book_ocr.txt and book_cleaned.txt next to the PDF
  pdf2corpus book.pdf

  # Explicit destinations, 8 workers
  pdf2corpus book.pdf -o out/book_ocr.txt --cleaned out/book.txt -c 8

  # Raw OCR text only, to stdout
  pdf2corpus --ocr-only book.pdf

  # Another script
  pdf2corpus --lang tel+eng --script telugu book.pdf

  # Filter an existing text dump (e.g. a wiki extract) without OCR
  pdf2corpus --clean-only kn_wiki.txt --cleaned kn_wiki_clean.txt

  # Inspect PDF metadata (no tesseract needed)
  pdf2corpus --inspect-only book.pdf

  # Machine-readable report
  pdf2corpus --json book.pdf > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (default: system library search path)
  PDF2CORPUS_*            Every flag can also be set from the environment
  RUST_LOG                Overrides the log filter

SETUP:
  1. Install pdfium and tesseract with the language data you need
     (e.g. tesseract-ocr-kan for Kannada).
  2. Run:  pdf2corpus book.pdf
"#;

/// OCR scanned PDF books and filter the text to a single-script corpus.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2corpus",
    version,
    about = "OCR scanned PDF books in parallel and filter the text to a single-script corpus",
    long_about = "Render every page of a PDF, recognise it with tesseract on a bounded pool of \
workers, assemble the pages in order and filter the result down to lines written in one \
Unicode script (Kannada by default).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path (or a text file with --clean-only).
    input: PathBuf,

    /// Write the raw OCR text here (default: <stem>_ocr.txt next to the input).
    #[arg(short, long, env = "PDF2CORPUS_OUTPUT")]
    output: Option<PathBuf>,

    /// Write the cleaned corpus here (default: <stem>_cleaned.txt next to the input).
    #[arg(long, env = "PDF2CORPUS_CLEANED")]
    cleaned: Option<PathBuf>,

    /// Number of pages recognised at the same time.
    #[arg(short, long, env = "PDF2CORPUS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Tesseract language spec, `+`-joined (e.g. kan+eng).
    #[arg(long = "lang", env = "PDF2CORPUS_LANG", default_value = "kan+eng")]
    languages: String,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF2CORPUS_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Script whose lines are kept by the filter.
    #[arg(long, env = "PDF2CORPUS_SCRIPT", value_enum, default_value = "kannada")]
    script: ScriptArg,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CORPUS_PASSWORD")]
    password: Option<String>,

    /// Kill a page's tesseract process after this many seconds.
    #[arg(long, env = "PDF2CORPUS_PAGE_TIMEOUT", default_value_t = 300)]
    page_timeout: u64,

    /// Tesseract executable.
    #[arg(long, env = "PDF2CORPUS_TESSERACT", default_value = "tesseract")]
    tesseract: String,

    /// Stop after OCR; print the assembled text to stdout unless -o is given.
    #[arg(long, env = "PDF2CORPUS_OCR_ONLY", conflicts_with_all = ["clean_only", "inspect_only"])]
    ocr_only: bool,

    /// Treat the input as text and only run the script filter.
    #[arg(long, env = "PDF2CORPUS_CLEAN_ONLY", conflicts_with = "inspect_only")]
    clean_only: bool,

    /// Print PDF metadata only, no OCR.
    #[arg(long, env = "PDF2CORPUS_INSPECT_ONLY")]
    inspect_only: bool,

    /// Print a JSON report instead of a summary.
    #[arg(long, env = "PDF2CORPUS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2CORPUS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CORPUS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CORPUS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ScriptArg {
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
}

impl From<ScriptArg> for ScriptBlock {
    fn from(v: ScriptArg) -> Self {
        match v {
            ScriptArg::Devanagari => ScriptBlock::DEVANAGARI,
            ScriptArg::Bengali => ScriptBlock::BENGALI,
            ScriptArg::Gurmukhi => ScriptBlock::GURMUKHI,
            ScriptArg::Gujarati => ScriptBlock::GUJARATI,
            ScriptArg::Oriya => ScriptBlock::ORIYA,
            ScriptArg::Tamil => ScriptBlock::TAMIL,
            ScriptArg::Telugu => ScriptBlock::TELUGU,
            ScriptArg::Kannada => ScriptBlock::KANNADA,
            ScriptArg::Malayalam => ScriptBlock::MALAYALAM,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would tear through the progress bar; keep them off while it
    // is shown unless --verbose asks for everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.clean_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let script: ScriptBlock = cli.script.into();

    // ── Clean-only mode ──────────────────────────────────────────────────
    if cli.clean_only {
        return run_clean_only(&cli, script).await;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, script, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── OCR-only mode ────────────────────────────────────────────────────
    if cli.ocr_only {
        if let Some(ref output_path) = cli.output {
            let stats = interruptible(ocr_to_file(&cli.input, output_path, &config))
                .await?
                .context("OCR failed")?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{}  {}/{} pages  {}ms  →  {}",
                    if stats.failed_pages == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    stats.processed_pages,
                    stats.total_pages,
                    stats.duration_ms,
                    bold(&output_path.display().to_string()),
                );
            }
        } else {
            let text = interruptible(ocr_to_string(&cli.input, &config))
                .await?
                .context("OCR failed")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    // ── Full ingest: OCR → filter ────────────────────────────────────────
    let (default_ocr, default_cleaned) = derived_outputs(&cli.input);
    let ocr_path = cli.output.clone().unwrap_or(default_ocr);
    let cleaned_path = cli.cleaned.clone().unwrap_or(default_cleaned);

    let report = interruptible(ingest_document(&cli.input, &ocr_path, &cleaned_path, &config))
        .await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report);
    }

    if !report.is_completed() {
        anyhow::bail!(
            "{}",
            report.error.as_deref().unwrap_or("ingest failed")
        );
    }
    Ok(())
}

/// Run `fut` unless Ctrl-C arrives first. Dropping the future on interrupt
/// means no final artifact is promoted.
async fn interruptible<T>(fut: impl Future<Output = T>) -> Result<T> {
    tokio::select! {
        out = fut => Ok(out),
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{} interrupted", red("✘"));
            anyhow::bail!("Interrupted before completion; no output was committed")
        }
    }
}

async fn run_clean_only(cli: &Cli, script: ScriptBlock) -> Result<()> {
    match cli.cleaned.as_ref().or(cli.output.as_ref()) {
        Some(output_path) => {
            let kept = clean_file(&cli.input, output_path, script)
                .await
                .context("Cleaning failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} {} lines  →  {}",
                    green("✔"),
                    kept,
                    script.name,
                    bold(&output_path.display().to_string()),
                );
            }
        }
        None => {
            let raw = tokio::fs::read_to_string(&cli.input)
                .await
                .with_context(|| format!("Failed to read {}", cli.input.display()))?;
            let outcome = clean_text(&raw, script);
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to serialise output")?
                );
            } else {
                println!("{}", outcome.text);
            }
        }
    }
    Ok(())
}

fn print_summary(report: &IngestReport) {
    if report.is_completed() {
        if let Some(ref stats) = report.stats {
            eprintln!(
                "{}  {}/{} pages  {}ms  →  {}",
                if stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.processed_pages,
                stats.total_pages,
                stats.duration_ms,
                bold(&report.ocr_path.display().to_string()),
            );
        }
        eprintln!(
            "{}  {} lines kept  →  {}",
            green("✔"),
            report.kept_lines,
            bold(&report.cleaned_path.display().to_string()),
        );
        eprintln!("   {}", dim(&format!("{}ms total", report.elapsed_ms)));
    } else {
        eprintln!(
            "{} {}",
            red("✘"),
            report.error.as_deref().unwrap_or("ingest failed")
        );
    }
}

/// Map CLI args to `OcrConfig`.
fn build_config(
    cli: &Cli,
    script: ScriptBlock,
    progress: Option<ProgressCallback>,
) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .languages(cli.languages.clone())
        .script(script)
        .page_timeout_secs(cli.page_timeout)
        .tesseract_cmd(cli.tesseract.clone());

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_flag_has_an_env_fallback() {
        let cmd = Cli::command();
        let missing: Vec<_> = cmd
            .get_arguments()
            .filter(|a| !a.is_positional())
            .filter(|a| !matches!(a.get_id().as_str(), "help" | "version"))
            .filter(|a| a.get_env().is_none())
            .map(|a| a.get_id().to_string())
            .collect();
        assert!(missing.is_empty(), "flags without env: {missing:?}");
    }

    #[test]
    fn mode_flags_conflict() {
        let r = Cli::try_parse_from(["pdf2corpus", "book.pdf", "--clean-only", "--inspect-only"]);
        assert!(r.is_err());
        let cli = Cli::try_parse_from(["pdf2corpus", "book.pdf", "--clean-only"]).unwrap();
        assert!(cli.clean_only && !cli.inspect_only && !cli.ocr_only);
    }
}
