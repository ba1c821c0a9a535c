//! CLI binary for edgequake-pdfview.
//!
//! A thin shim over the library crate: each subcommand opens the viewer,
//! performs one action against the extraction server and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdfview::{
    upload_file, write_export, Backend, ContentFormat, ExportFormat, ExportProgressCallback,
    HttpBackend, NoopProgressCallback, PageBreak, Viewer, ViewerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
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

// ── Export progress using indicatif ──────────────────────────────────────────

/// Progress bar for `export --all`: one tick per page, with a log line for
/// each page that has no text or failed.
struct CliExportProgress {
    bar: ProgressBar,
}

impl CliExportProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Exporting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ExportProgressCallback for CliExportProgress {
    fn on_export_start(&self, total_pages: u32) {
        self.bar.set_length(u64::from(total_pages));
    }

    fn on_page_start(&self, page: u32, _total_pages: u32) {
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_complete(&self, page: u32, total_pages: u32, content_len: usize) {
        if content_len == 0 {
            self.bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                dim("·"),
                page,
                total_pages,
                dim("no text")
            ));
        }
        self.bar.inc(1);
    }

    fn on_page_error(&self, page: u32, total_pages: u32, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page,
            total_pages,
            red(error)
        ));
    }

    fn on_export_complete(&self, total_pages: u32, collected: u32) {
        self.bar.finish_and_clear();
        if collected == total_pages {
            eprintln!("{} {} pages exported", green("✔"), bold(&collected.to_string()));
        } else {
            eprintln!(
                "{} export stopped after {}/{} pages",
                red("✘"),
                bold(&collected.to_string()),
                total_pages
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Files stored on the server
  pdfview list

  # Upload a PDF
  pdfview upload report.pdf

  # Render page 3 to PNG and print its extracted content
  pdfview show report.pdf --page 3 --png page3.png

  # Replace the content of page 3 (reads stdin when --input is omitted)
  pdfview edit report.pdf --page 3 --input fixed.md

  # Force re-extraction of page 3
  pdfview refresh report.pdf --page 3

  # Export the whole document as HTML
  pdfview export report.pdf --all --to html -o report.html

ENVIRONMENT VARIABLES:
  PDFVIEW_SERVER      Extraction server base URL
  PDFVIEW_FORMAT      Content family: markdown, html, content
  PDFIUM_LIB_PATH     Directory holding the pdfium shared library
  RUST_LOG            Overrides the log filter
"#;

/// Browse, correct and export PDF content extracted by an extraction server.
#[derive(Parser, Debug)]
#[command(
    name = "pdfview",
    version,
    about = "Browse, correct and export PDF content extracted by an extraction server",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Extraction server base URL.
    #[arg(long, global = true, env = "PDFVIEW_SERVER", default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Content family served by the extraction server.
    #[arg(long, global = true, env = "PDFVIEW_FORMAT", value_enum, default_value = "markdown")]
    format: FormatArg,

    /// HTTP timeout in seconds.
    #[arg(long, global = true, env = "PDFVIEW_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Page rendering scale (0.25–8.0).
    #[arg(long, global = true, env = "PDFVIEW_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFVIEW_PASSWORD")]
    password: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFVIEW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files stored on the server.
    List,
    /// Upload a local PDF.
    Upload { path: PathBuf },
    /// Display one page: print its content and optionally save its image.
    Show {
        file: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Write the rendered page to this PNG file.
        #[arg(long)]
        png: Option<PathBuf>,
        /// Print the rendered page as a `data:image/png` URI instead of its content.
        #[arg(long, conflicts_with = "png")]
        data_uri: bool,
    },
    /// Replace the extracted content of a page.
    Edit {
        file: String,
        #[arg(short, long)]
        page: u32,
        /// Read the new content from this file instead of stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Force re-extraction of a page and print the new content.
    Refresh {
        file: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Print the raw structured extraction of a page.
    Json {
        file: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Export one page, or every page with --all.
    Export {
        file: String,
        #[arg(short, long, default_value_t = 1, conflicts_with = "all")]
        page: u32,
        #[arg(long)]
        all: bool,
        /// Output format.
        #[arg(long = "to", value_enum, default_value = "markdown")]
        to: ExportArg,
        /// Page-break marker for --all: hr, comment, formfeed, or a custom string.
        #[arg(long, default_value = "hr")]
        page_break: String,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Html,
    Content,
}

impl From<FormatArg> for ContentFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markdown => ContentFormat::Markdown,
            FormatArg::Html => ContentFormat::Html,
            FormatArg::Content => ContentFormat::Content,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ExportArg {
    Text,
    Markdown,
    Html,
    Json,
}

impl From<ExportArg> for ExportFormat {
    fn from(v: ExportArg) -> Self {
        match v {
            ExportArg::Text => ExportFormat::Text,
            ExportArg::Markdown => ExportFormat::Markdown,
            ExportArg::Html => ExportFormat::Html,
            ExportArg::Json => ExportFormat::Json,
        }
    }
}

fn parse_page_break(s: &str) -> PageBreak {
    match s {
        "hr" => PageBreak::HorizontalRule,
        "comment" => PageBreak::Comment,
        "formfeed" => PageBreak::FormFeed,
        custom => PageBreak::Custom(custom.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let mut builder = ViewerConfig::builder()
        .server_url(&cli.server)
        .content_format(cli.format.into())
        .request_timeout_secs(cli.timeout)
        .render_scale(cli.scale);
    if let Some(ref pwd) = cli.password {
        builder = builder.pdf_password(pwd);
    }
    if let Command::Export { ref page_break, .. } = cli.command {
        builder = builder.page_break(parse_page_break(page_break));
    }
    let config = builder.build().context("Invalid configuration")?;

    match cli.command {
        Command::List => {
            let backend = HttpBackend::new(&config).context("Failed to create HTTP client")?;
            let files = backend.list_files().await.context("Failed to list files")?;
            if files.is_empty() && !cli.quiet {
                eprintln!("{}", dim("no files on the server"));
            }
            for name in files {
                println!("{name}");
            }
        }

        Command::Upload { ref path } => {
            let backend = HttpBackend::new(&config).context("Failed to create HTTP client")?;
            let uploaded = upload_file(&backend, path)
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{} uploaded as {}", green("✔"), bold(&uploaded.filename));
            }
        }

        Command::Show {
            ref file,
            page,
            ref png,
            data_uri,
        } => {
            let viewer = open(config, file, page).await?;
            let view = viewer.current_view().context("No page displayed")?;
            if let Some(path) = png {
                tokio::fs::write(path, &view.image.png)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !cli.quiet {
                    eprintln!(
                        "{} page {} ({}×{}) → {}",
                        green("✔"),
                        view.page,
                        view.image.width,
                        view.image.height,
                        bold(&path.display().to_string())
                    );
                }
            }
            if data_uri {
                print_text(&view.image.data_uri())?;
            } else {
                print_text(view.body.display_text())?;
            }
            summary(&viewer, cli.quiet);
        }

        Command::Edit { ref file, page, ref input } => {
            let content = match input {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            let mut viewer = open(config, file, page).await?;
            viewer.enter_edit().context("Page cannot be edited")?;
            viewer.save_content(content).await.context("Save failed")?;
            if !cli.quiet {
                eprintln!("{} saved page {} of {}", green("✔"), page, bold(file));
            }
        }

        Command::Refresh { ref file, page } => {
            let mut viewer = open(config, file, page).await?;
            viewer.refresh().await.context("Refresh failed")?;
            let view = viewer.current_view().context("No page displayed")?;
            print_text(view.body.display_text())?;
        }

        Command::Json { ref file, page } => {
            let viewer = open(config, file, page).await?;
            let json = viewer.inspect_json().await.context("Failed to fetch JSON")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json).context("Failed to serialise JSON")?
            );
        }

        Command::Export {
            ref file,
            page,
            all,
            to,
            ref output,
            ..
        } => {
            let mut viewer = open(config, file, if all { 1 } else { page }).await?;
            let exported = if all {
                let progress: Box<dyn ExportProgressCallback> = if cli.quiet {
                    Box::new(NoopProgressCallback)
                } else {
                    Box::new(CliExportProgress::new())
                };
                viewer
                    .export_all(to.into(), progress.as_ref())
                    .await
                    .context("Export failed")?
            } else {
                viewer.export_current(to.into()).context("Export failed")?
            };

            match output {
                Some(path) => {
                    write_export(path, &exported).await?;
                    if !cli.quiet {
                        eprintln!("{} → {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
                None => print_text(&exported)?,
            }
        }
    }

    Ok(())
}

/// Connect, load `file` and display `page`.
async fn open(config: ViewerConfig, file: &str, page: u32) -> Result<Viewer> {
    let mut viewer = Viewer::connect(config).context("Failed to start viewer")?;
    viewer
        .load_file(file)
        .await
        .with_context(|| format!("Failed to open {file}"))?;
    if page != 1 {
        viewer
            .goto(page)
            .await
            .with_context(|| format!("Failed to display page {page}"))?;
    }
    Ok(viewer)
}

fn summary(viewer: &Viewer, quiet: bool) {
    if quiet {
        return;
    }
    let state = viewer.state();
    eprintln!(
        "{}",
        dim(&format!(
            "page {}/{}  extracted through {}{}",
            state.current_page,
            state.total_pages,
            state.highest_page_extracted,
            if state.is_fully_extracted { " (complete)" } else { "" }
        ))
    );
}

fn print_text(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
