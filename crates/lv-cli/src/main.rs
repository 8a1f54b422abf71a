//! # lv — list-view pipeline CLI
//!
//! Runs list-view queries against JSON record files.
//!
//! - `lv query "<query>" --records <file>` — Filter, sort and page records.
//! - `lv stats --records <file>` — Dashboard statistics.
//! - `lv domain "<query>"` — Show the remote filter expression for a query.
//! - `lv watch --records <file>` — Interactive search, debounced like a list view.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tabled::builder::Builder;
use tabled::settings::Style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lv_pipeline::config::{Profile, ViewConfig};
use lv_pipeline::domain::{bucket_domain, build_domain, fetch_options, DomainTerm, FetchOptions};
use lv_pipeline::host::{DetailOpener, ListController, Notifier, RecordSource, Severity};
use lv_pipeline::query::parser;
use lv_pipeline::stats::Bucket;
use lv_pipeline::{stats, PageResult, Record, RecordId, SourceError};

#[derive(Parser)]
#[command(name = "lv", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true, default_value = "lv.toml")]
    config: PathBuf,

    /// View profile supplying defaults (list or dashboard)
    #[arg(long, global = true, default_value = "list")]
    profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query and print the resulting page.
    Query {
        /// Query text, e.g. `SEARCH "acme" WHERE amount > 100 ORDER BY date DESC PAGE 2`
        #[arg(default_value = "")]
        query: String,

        /// JSON file holding an array of records.
        #[arg(long)]
        records: PathBuf,

        /// Columns to show (default: every field seen on the page).
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Print the page as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Compute dashboard statistics.
    Stats {
        #[arg(long)]
        records: PathBuf,

        #[arg(long, default_value = "date")]
        date_field: String,

        #[arg(long, default_value = "amount")]
        amount_field: String,

        /// Also total per distinct value of this field.
        #[arg(long)]
        group_by: Option<String>,

        /// Reference day (YYYY-MM-DD, default: today).
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Months in the record-count trend.
        #[arg(long, default_value_t = stats::DEFAULT_TREND_MONTHS)]
        months: u32,
    },

    /// Print the remote filter expression and paging options for a query.
    Domain {
        #[arg(default_value = "")]
        query: String,

        /// Narrow to a statistics card: today, this_week or this_month.
        #[arg(long)]
        bucket: Option<Bucket>,

        #[arg(long, default_value = "date")]
        date_field: String,

        /// Reference day for --bucket (YYYY-MM-DD, default: today).
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Read search terms from stdin and print each debounced result.
    Watch {
        #[arg(long)]
        records: PathBuf,
    },
}

// =============================================================================
// Collaborators
// =============================================================================

/// Serves records from a JSON file. Only the empty domain is supported.
struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    fn read(&self) -> Result<Vec<Record>, SourceError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn fetch_records(
        &self,
        _resource: &str,
        domain: &[DomainTerm],
        _fields: &[String],
        options: &FetchOptions,
    ) -> Result<Vec<Record>, SourceError> {
        if !domain.is_empty() {
            return Err(SourceError::Fetch(
                "JSON file sources cannot evaluate domains".into(),
            ));
        }
        Ok(self
            .read()?
            .into_iter()
            .skip(options.offset)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_records(
        &self,
        _resource: &str,
        domain: &[DomainTerm],
    ) -> Result<usize, SourceError> {
        if !domain.is_empty() {
            return Err(SourceError::Fetch(
                "JSON file sources cannot evaluate domains".into(),
            ));
        }
        Ok(self.read()?.len())
    }
}

struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Danger => tracing::error!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Info | Severity::Success => tracing::info!("{}", message),
        }
    }
}

struct PrintOpener;

#[async_trait]
impl DetailOpener for PrintOpener {
    async fn open_detail(&self, id: &RecordId) {
        println!("-> open record {}", id);
    }
}

// =============================================================================
// Output
// =============================================================================

fn render_table(page: &PageResult, columns: &[String]) -> String {
    let columns: Vec<String> = if columns.is_empty() {
        let mut seen: Vec<String> = vec!["id".into()];
        for record in &page.items {
            for field in record.fields() {
                if !seen.contains(field) {
                    seen.push(field.clone());
                }
            }
        }
        seen
    } else {
        columns.to_vec()
    };

    let mut builder = Builder::default();
    builder.push_record(columns.clone());
    for record in &page.items {
        builder.push_record(columns.iter().map(|c| match record.get(c) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn page_footer(page: &PageResult) -> String {
    format!(
        "page {}/{} · {} matched{}{}",
        page.page,
        page.total_pages,
        page.total_matched,
        if page.has_prev() { " · :prev" } else { "" },
        if page.has_next() { " · :next" } else { "" },
    )
}

// =============================================================================
// Commands
// =============================================================================

fn load_records(path: &Path) -> Result<Vec<Record>, SourceError> {
    JsonFileSource {
        path: path.to_path_buf(),
    }
    .read()
}

async fn watch(records: PathBuf, config: &ViewConfig, profile: Profile) -> Result<(), Box<dyn Error>> {
    let resource = records.display().to_string();
    let controller = Arc::new(
        ListController::builder(resource, config.profile(profile)).build(
            Arc::new(JsonFileSource { path: records }),
            Arc::new(LogNotifier),
            Arc::new(PrintOpener),
        ),
    );
    controller.load().await?;

    let mut rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if let Some(page) = rx.borrow_and_update().clone() {
                println!("{}", render_table(&page, &[]));
                println!("{}", page_footer(&page));
            }
        }
    });

    eprintln!("Type to search. Commands: :sort <field>, :next, :prev, :open <n>, :auto, :quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some(":quit"), _) => break,
            (Some(":sort"), Some(field)) => {
                controller.update(|q| q.toggle_sort(field));
            }
            (Some(":next"), _) => {
                let total = controller.current_page().map_or(0, |p| p.total_pages);
                controller.update(|q| q.next_page(total));
            }
            (Some(":prev"), _) => {
                controller.update(|q| q.prev_page());
            }
            (Some(":auto"), _) => {
                controller.toggle_auto_refresh();
            }
            (Some(":open"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    controller.open(n - 1).await;
                }
                _ => tracing::warn!("':open' expects a row number, got '{}'", n),
            },
            _ => {
                controller.update(|q| q.with_search(line));
            }
        }
    }

    // Let a pending search land before exiting
    tokio::time::sleep(config.profile(profile).debounce).await;
    controller.shutdown();
    printer.abort();
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = ViewConfig::load_or_default(&cli.config);
    let base = config.profile(cli.profile).base_query();

    match cli.command {
        Commands::Query {
            query,
            records,
            columns,
            json,
        } => {
            let query = parser::parse_with(&query, base)?;
            let records = load_records(&records)?;
            let page = lv_pipeline::run(&records, &query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                println!("{}", render_table(&page, &columns));
                println!("{}", page_footer(&page));
            }
        }

        Commands::Stats {
            records,
            date_field,
            amount_field,
            group_by,
            today,
            months,
        } => {
            let records = load_records(&records)?;
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let summary = stats::compute(&records, &date_field, &amount_field, today);
            let mut output = serde_json::json!({
                "statistics": summary,
                "monthly": stats::monthly_counts(&records, &date_field, today, months),
            });
            if let Some(field) = group_by {
                output["groups"] =
                    serde_json::to_value(stats::group_totals(&records, &field, &amount_field))?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Domain {
            query,
            bucket,
            date_field,
            today,
        } => {
            let query = parser::parse_with(&query, base)?;
            let mut domain = build_domain(&query, &[]);
            if let Some(bucket) = bucket {
                let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
                domain.push(bucket_domain(bucket, &date_field, today));
            }
            let output = serde_json::json!({
                "domain": domain,
                "options": fetch_options(&query),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Watch { records } => watch(records, &config, cli.profile).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lv=info,lv_pipeline=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
