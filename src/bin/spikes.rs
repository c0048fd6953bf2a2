//! `spikes` - inspect the local spike queue and the feedback backend.
//!
//! Reads `.spikes/config.json` under the working directory (or `--dir`).

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use spikes_lib::backend::{BackendClient, SpikeQuery};
use spikes_lib::db::{Database, QueuedSpike};
use spikes_lib::models::{Rating, Spike, SpikeKind};
use spikes_lib::repository::{PushReport, SpikeRepository};
use spikes_lib::settings::{RemoteSettings, SettingsStore};
use spikes_lib::utils::logging;

const COMMENT_PREVIEW_MAX: usize = 40;

#[derive(Debug, Parser)]
#[command(name = "spikes", version, about = "Inspect captured feedback spikes")]
struct Cli {
    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Project root holding `.spikes/`. Defaults to the current directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List queued spikes.
    List(ListArgs),

    /// Show one spike by id or unique id prefix.
    Show { id: String },

    /// Element selectors ranked by spike count.
    Hotspots,

    /// Reviewers ranked by spike count.
    Reviewers,

    /// Dump the queue to stdout.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },

    /// Fetch spikes from the configured backend.
    Fetch(FetchArgs),

    /// Send queued spikes the backend never acknowledged.
    Push(PushArgs),

    /// List share links owned by the configured token.
    Shares,

    /// Delete a share link.
    Unshare { id: String },

    /// Emails collected by the backend (admin token).
    Prospects,

    /// Update `.spikes/config.json`.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Default, clap::Args)]
struct ListArgs {
    /// Case-insensitive substring of the page name.
    #[arg(long)]
    page: Option<String>,

    /// Case-insensitive substring of the reviewer name.
    #[arg(long)]
    reviewer: Option<String>,

    #[arg(long)]
    rating: Option<Rating>,

    #[arg(long)]
    project: Option<String>,

    /// Only spikes the backend never acknowledged.
    #[arg(long)]
    pending: bool,
}

#[derive(Debug, clap::Args)]
struct FetchArgs {
    #[arg(long)]
    page: Option<String>,

    #[arg(long)]
    reviewer: Option<String>,

    #[arg(long)]
    rating: Option<Rating>,

    #[arg(long)]
    project: Option<String>,

    /// Queue fetched spikes that are not in the local queue yet.
    #[arg(long)]
    store: bool,
}

#[derive(Debug, clap::Args)]
struct PushArgs {
    /// Overrides the configured endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Overrides the configured token.
    #[arg(long)]
    token: Option<String>,

    #[arg(long)]
    project: Option<String>,
}

#[derive(Debug, clap::Args)]
struct ConfigArgs {
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    token: Option<String>,

    #[arg(long)]
    project: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
    Jsonl,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    Cli::parse().run().await
}

impl Cli {
    async fn run(self) -> Result<()> {
        let root = match self.dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to read current directory")?,
        };
        let settings = SettingsStore::in_dir(&root)?;
        let json = self.json;

        match self.cmd {
            Command::List(args) => run_list(&settings, args, json).await,
            Command::Show { id } => run_show(&settings, &id, json).await,
            Command::Hotspots => run_hotspots(&settings, json).await,
            Command::Reviewers => run_reviewers(&settings, json).await,
            Command::Export { format } => run_export(&settings, format).await,
            Command::Fetch(args) => run_fetch(&settings, args, json).await,
            Command::Push(args) => run_push(&settings, args, json).await,
            Command::Shares => run_shares(&settings, json).await,
            Command::Unshare { id } => run_unshare(&settings, &id).await,
            Command::Prospects => run_prospects(&settings, json).await,
            Command::Config(args) => run_config(&settings, args),
        }
    }
}

fn open_queue(settings: &SettingsStore) -> Result<Database> {
    let path = settings.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Database::new(path)
}

/// Queue contents for the `--project` filter, else the configured project.
async fn load_queue(settings: &SettingsStore, project: Option<String>) -> Result<Vec<QueuedSpike>> {
    let project = project.or(settings.settings().project);
    open_queue(settings)?.list_spikes(project.as_deref()).await
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(entry: &QueuedSpike, args: &ListArgs) -> bool {
    let spike = &entry.spike;
    if let Some(page) = &args.page {
        if !contains_ignore_case(&spike.page_title, page) {
            return false;
        }
    }
    if let Some(reviewer) = &args.reviewer {
        if !contains_ignore_case(&spike.reviewer.name, reviewer) {
            return false;
        }
    }
    if let Some(rating) = args.rating {
        if spike.rating != Some(rating) {
            return false;
        }
    }
    !(args.pending && entry.is_delivered())
}

async fn run_list(settings: &SettingsStore, args: ListArgs, json: bool) -> Result<()> {
    let queued = load_queue(settings, args.project.clone()).await?;
    let spikes: Vec<Spike> = queued
        .into_iter()
        .filter(|entry| matches(entry, &args))
        .map(|entry| entry.spike)
        .collect();

    if json {
        return print_json(&spikes);
    }
    print_spikes_table(&spikes);
    Ok(())
}

async fn run_show(settings: &SettingsStore, id: &str, json: bool) -> Result<()> {
    let Some(entry) = open_queue(settings)?.find_spike(id).await? else {
        bail!("No spike found with id '{id}'");
    };

    if json {
        return print_json(&entry);
    }
    print_spike_detail(&entry);
    Ok(())
}

/// Descending by count, then by key for a stable order.
fn ranked(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

fn hotspots(spikes: &[Spike]) -> Vec<(String, usize)> {
    let mut counts = HashMap::new();
    for spike in spikes.iter().filter(|spike| spike.kind == SpikeKind::Element) {
        if let Some(selector) = spike.selector().filter(|selector| !selector.is_empty()) {
            *counts.entry(selector.to_string()).or_insert(0) += 1;
        }
    }
    ranked(counts)
}

fn reviewers(spikes: &[Spike]) -> Vec<(String, usize)> {
    let mut counts = HashMap::new();
    for spike in spikes {
        *counts.entry(spike.reviewer.name.clone()).or_insert(0) += 1;
    }
    ranked(counts)
}

#[derive(Serialize)]
struct SelectorCount<'a> {
    selector: &'a str,
    count: usize,
}

#[derive(Serialize)]
struct ReviewerCount<'a> {
    name: &'a str,
    count: usize,
}

async fn run_hotspots(settings: &SettingsStore, json: bool) -> Result<()> {
    let spikes: Vec<Spike> = load_queue(settings, None)
        .await?
        .into_iter()
        .map(|entry| entry.spike)
        .collect();
    let ranked = hotspots(&spikes);

    if json {
        let rows: Vec<SelectorCount> = ranked
            .iter()
            .map(|(selector, count)| SelectorCount {
                selector,
                count: *count,
            })
            .collect();
        return print_json(&rows);
    }
    if ranked.is_empty() {
        println!("No element spikes found.");
        return Ok(());
    }
    print_counts("Selector", &ranked);
    Ok(())
}

async fn run_reviewers(settings: &SettingsStore, json: bool) -> Result<()> {
    let spikes: Vec<Spike> = load_queue(settings, None)
        .await?
        .into_iter()
        .map(|entry| entry.spike)
        .collect();
    let ranked = reviewers(&spikes);

    if json {
        let rows: Vec<ReviewerCount> = ranked
            .iter()
            .map(|(name, count)| ReviewerCount { name, count: *count })
            .collect();
        return print_json(&rows);
    }
    if ranked.is_empty() {
        println!("No reviewers found.");
        return Ok(());
    }
    print_counts("Reviewer", &ranked);
    Ok(())
}

async fn run_export(settings: &SettingsStore, format: ExportFormat) -> Result<()> {
    let spikes: Vec<Spike> = load_queue(settings, None)
        .await?
        .into_iter()
        .map(|entry| entry.spike)
        .collect();

    match format {
        ExportFormat::Json => print_json(&spikes),
        ExportFormat::Csv => write_csv(io::stdout().lock(), &spikes),
        ExportFormat::Jsonl => {
            for spike in &spikes {
                println!("{}", serde_json::to_string(spike)?);
            }
            Ok(())
        }
    }
}

const CSV_HEADER: [&str; 14] = [
    "id",
    "type",
    "project_key",
    "page",
    "url",
    "reviewer_id",
    "reviewer_name",
    "selector",
    "element_text",
    "rating",
    "comments",
    "timestamp",
    "viewport_width",
    "viewport_height",
];

fn write_csv<W: Write>(writer: W, spikes: &[Spike]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for spike in spikes {
        let locator = spike.locator.as_ref();
        csv.write_record([
            spike.id.as_str(),
            spike.kind.as_str(),
            spike.project_key.as_str(),
            spike.page_title.as_str(),
            spike.page_url.as_str(),
            spike.reviewer.id.as_str(),
            spike.reviewer.name.as_str(),
            locator.map(|l| l.selector.as_str()).unwrap_or(""),
            locator.and_then(|l| l.element_text.as_deref()).unwrap_or(""),
            spike.rating_str(),
            spike.comment.as_str(),
            spike.captured_at.to_rfc3339().as_str(),
            spike.viewport.width.to_string().as_str(),
            spike.viewport.height.to_string().as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

fn remote_client(settings: &SettingsStore) -> Result<BackendClient> {
    remote_client_with(settings, None, None)
}

/// Flags win over `.spikes/config.json`.
fn remote_client_with(
    settings: &SettingsStore,
    endpoint: Option<String>,
    token: Option<String>,
) -> Result<BackendClient> {
    let remote = settings.settings().remote;
    let Some(endpoint) = endpoint.or(remote.endpoint) else {
        bail!("No backend endpoint configured; pass --endpoint or run `spikes config --endpoint <url>`");
    };
    Ok(BackendClient::new(&endpoint, token.or(remote.token))?)
}

async fn run_fetch(settings: &SettingsStore, args: FetchArgs, json: bool) -> Result<()> {
    let current = settings.settings();
    let client = remote_client(settings)?;
    let endpoint = client.endpoint().to_string();
    let query = SpikeQuery {
        page: args.page,
        reviewer: args.reviewer,
        rating: args.rating,
        project: args.project.or(current.project),
    };
    let spikes = client
        .list_spikes(&query)
        .await
        .with_context(|| format!("failed to fetch spikes from {endpoint}"))?;

    if args.store {
        let db = open_queue(settings)?;
        let mut added = 0;
        for spike in &spikes {
            if db.find_spike(&spike.id).await?.is_none() {
                db.insert_spike(spike).await?;
                added += 1;
            }
        }
        log::info!("Queued {added} of {} fetched spikes", spikes.len());
    }

    if json {
        return print_json(&spikes);
    }
    print_spikes_table(&spikes);
    Ok(())
}

async fn run_push(settings: &SettingsStore, args: PushArgs, json: bool) -> Result<()> {
    let client = remote_client_with(settings, args.endpoint, args.token)?;
    let endpoint = client.endpoint().to_string();
    let project = args.project.or(settings.settings().project);
    let repository = SpikeRepository::new(open_queue(settings)?, Some(Arc::new(client)));

    let report = repository
        .push_pending(project.as_deref())
        .await
        .with_context(|| format!("failed to push spikes to {endpoint}"))?;

    if json {
        return print_json(&push_summary(&report));
    }
    if report.pending == 0 {
        println!("No pending spikes to push.");
        return Ok(());
    }
    println!("Pending:  {}", report.pending);
    println!("Pushed:   {}", report.delivered);
    if !report.failed.is_empty() {
        println!("Failed:   {}", report.failed.len());
        for id in &report.failed {
            println!("  {}", short_id(id));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PushSummary<'a> {
    success: bool,
    pending: usize,
    pushed: usize,
    failed: &'a [String],
}

fn push_summary(report: &PushReport) -> PushSummary<'_> {
    PushSummary {
        success: report.failed.is_empty(),
        pending: report.pending,
        pushed: report.delivered,
        failed: &report.failed,
    }
}

async fn run_shares(settings: &SettingsStore, json: bool) -> Result<()> {
    let shares = remote_client(settings)?
        .list_shares()
        .await
        .context("failed to list shares")?;

    if json {
        return print_json(&shares);
    }
    if shares.is_empty() {
        println!("No shares found.");
        return Ok(());
    }
    let mut table = new_table(vec!["Slug", "URL", "Spikes", "Created"]);
    for share in &shares {
        table.add_row(vec![
            Cell::new(&share.slug),
            Cell::new(&share.url),
            Cell::new(format!("{} spikes", share.spike_count)),
            Cell::new(&share.created_at),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn run_unshare(settings: &SettingsStore, id: &str) -> Result<()> {
    remote_client(settings)?
        .delete_share(id)
        .await
        .with_context(|| format!("failed to delete share {id}"))?;
    println!("Deleted share {id}");
    Ok(())
}

async fn run_prospects(settings: &SettingsStore, json: bool) -> Result<()> {
    let prospects = remote_client(settings)?
        .list_prospects()
        .await
        .context("failed to list prospects")?;

    if json {
        return print_json(&prospects);
    }
    if prospects.is_empty() {
        println!("No prospects found.");
        return Ok(());
    }
    let mut table = new_table(vec!["Email", "First seen"]);
    for prospect in &prospects {
        table.add_row(vec![Cell::new(&prospect.email), Cell::new(&prospect.first_seen)]);
    }
    println!("{table}");
    Ok(())
}

fn run_config(settings: &SettingsStore, args: ConfigArgs) -> Result<()> {
    let current = settings.settings();

    if args.endpoint.is_some() || args.token.is_some() {
        settings.update_remote(RemoteSettings {
            endpoint: args.endpoint.or(current.remote.endpoint),
            token: args.token.or(current.remote.token),
        })?;
    }
    if let Some(project) = args.project {
        settings.update_project(Some(project).filter(|project| !project.is_empty()))?;
    }

    let updated = settings.settings();
    println!("Config:   {}", settings.path().display());
    println!("Project:  {}", updated.project.as_deref().unwrap_or("-"));
    println!("Endpoint: {}", updated.remote.endpoint.as_deref().unwrap_or("-"));
    println!(
        "Token:    {}",
        if updated.remote.token.is_some() { "set" } else { "-" }
    );
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn comment_preview(comment: &str) -> String {
    if comment.chars().count() > COMMENT_PREVIEW_MAX {
        let head: String = comment.chars().take(COMMENT_PREVIEW_MAX - 3).collect();
        format!("{head}...")
    } else {
        comment.to_string()
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn rating_cell(rating: Option<Rating>) -> Cell {
    match rating {
        Some(Rating::Love) => Cell::new("love").fg(Color::Green),
        Some(Rating::Like) => Cell::new("like").fg(Color::Blue),
        Some(Rating::Meh) => Cell::new("meh").fg(Color::Yellow),
        Some(Rating::No) => Cell::new("no").fg(Color::Red),
        None => Cell::new("-"),
    }
}

fn spike_row(spike: &Spike) -> Vec<Cell> {
    vec![
        Cell::new(short_id(&spike.id)),
        Cell::new(spike.kind.as_str()),
        Cell::new(&spike.page_title),
        Cell::new(&spike.reviewer.name),
        rating_cell(spike.rating),
        Cell::new(comment_preview(&spike.comment)),
    ]
}

fn spikes_table(spikes: &[Spike]) -> Table {
    let mut table = new_table(vec!["ID", "Type", "Page", "Reviewer", "Rating", "Comments"]);
    for spike in spikes {
        table.add_row(spike_row(spike));
    }
    table
}

fn print_spikes_table(spikes: &[Spike]) {
    if spikes.is_empty() {
        println!("No spikes found.");
        return;
    }
    println!("{}", spikes_table(spikes));
}

fn counts_table(label: &str, ranked: &[(String, usize)]) -> Table {
    let mut table = new_table(vec![label, "Count"]);
    for (key, count) in ranked {
        table.add_row(vec![Cell::new(key), Cell::new(format!("{count} spikes"))]);
    }
    table
}

fn print_counts(label: &str, ranked: &[(String, usize)]) {
    println!("{}", counts_table(label, ranked));
}

fn print_spike_detail(entry: &QueuedSpike) {
    let spike = &entry.spike;
    println!("ID:         {}", spike.id);
    println!("Type:       {}", spike.kind.as_str());
    println!("Project:    {}", spike.project_key);
    println!("Page:       {}", spike.page_title);
    println!("URL:        {}", spike.page_url);
    println!("Reviewer:   {} ({})", spike.reviewer.name, spike.reviewer.id);
    println!("Rating:     {}", spike.rating_str());
    println!("Timestamp:  {}", spike.captured_at.to_rfc3339());
    println!("Viewport:   {}x{}", spike.viewport.width, spike.viewport.height);

    if let Some(locator) = &spike.locator {
        println!("Selector:   {}", locator.selector);
        if let Some(text) = &locator.element_text {
            println!("Element:    {text}");
        }
        if let Some(bb) = &locator.bounding_box {
            println!("BoundingBox: ({}, {}) {}x{}", bb.x, bb.y, bb.width, bb.height);
        }
    }

    match (&entry.delivered_at, &entry.remote_id) {
        (Some(at), Some(remote)) => println!("Delivered:  {} as {remote}", at.to_rfc3339()),
        (Some(at), None) => println!("Delivered:  {}", at.to_rfc3339()),
        _ => println!("Delivered:  pending"),
    }

    println!();
    println!("Comments:");
    println!("  {}", spike.comment);
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use spikes_lib::models::{ElementLocator, Reviewer, Viewport};

    fn spike(id: &str, reviewer: &str, selector: Option<&str>, rating: Option<Rating>) -> Spike {
        Spike {
            id: id.into(),
            kind: if selector.is_some() {
                SpikeKind::Element
            } else {
                SpikeKind::Page
            },
            project_key: "acme".into(),
            page_title: "Pricing Page".into(),
            page_url: "https://acme.test/pricing".into(),
            locator: selector.map(|selector| ElementLocator {
                selector: selector.into(),
                structural_path: None,
                element_text: None,
                bounding_box: None,
            }),
            rating,
            comment: String::new(),
            reviewer: Reviewer {
                id: format!("r-{reviewer}"),
                name: reviewer.into(),
                email: None,
            },
            captured_at: Utc::now(),
            viewport: Viewport {
                width: 1280,
                height: 800,
            },
            share_id: None,
        }
    }

    fn queued(spike: Spike, delivered: bool) -> QueuedSpike {
        QueuedSpike {
            spike,
            queued_at: Utc::now(),
            delivered_at: delivered.then(Utc::now),
            remote_id: None,
        }
    }

    #[test]
    fn list_filters_are_substring_and_exact_rating() {
        let entry = queued(spike("a", "Dana Scully", None, Some(Rating::Like)), true);
        let args = ListArgs {
            page: Some("pricing".into()),
            reviewer: Some("SCULLY".into()),
            rating: Some(Rating::Like),
            ..ListArgs::default()
        };
        assert!(matches(&entry, &args));

        let args = ListArgs {
            rating: Some(Rating::Love),
            ..ListArgs::default()
        };
        assert!(!matches(&entry, &args));

        let args = ListArgs {
            pending: true,
            ..ListArgs::default()
        };
        assert!(!matches(&entry, &args));
    }

    #[test]
    fn hotspots_rank_element_selectors() {
        let spikes = vec![
            spike("1", "A", Some(".cta"), None),
            spike("2", "A", Some("#hero"), None),
            spike("3", "B", Some(".cta"), None),
            spike("4", "B", None, None),
        ];
        assert_eq!(
            hotspots(&spikes),
            vec![(".cta".to_string(), 2), ("#hero".to_string(), 1)]
        );
        assert_eq!(
            reviewers(&spikes),
            vec![("A".to_string(), 2), ("B".to_string(), 2)]
        );
    }

    #[test]
    fn rows_shorten_id_and_comment() {
        let mut long = spike("V1StGXR8_Z5jdHi6B-myT", "Dana", None, None);
        long.comment = "x".repeat(45);
        let row: Vec<String> = spike_row(&long).iter().map(Cell::content).collect();
        assert_eq!(row[0], "V1StGXR8");
        assert_eq!(row[4], "-");
        assert_eq!(row[5], format!("{}...", "x".repeat(37)));

        assert_eq!(comment_preview(&"y".repeat(40)), "y".repeat(40));
        assert_eq!(rating_cell(Some(Rating::Meh)).content(), "meh");
    }

    #[test]
    fn tables_render_every_row() {
        let spikes = vec![
            spike("a1", "Dana", Some(".cta"), Some(Rating::Love)),
            spike("b2", "Lee", None, None),
        ];
        let mut table = spikes_table(&spikes);
        table.force_no_tty();
        let rendered = table.to_string();
        assert!(rendered.contains("Reviewer"));
        assert!(rendered.contains("Dana"));
        assert!(rendered.contains("love"));
        assert!(rendered.contains("Lee"));

        let mut counts = counts_table("Selector", &hotspots(&spikes));
        counts.force_no_tty();
        assert!(counts.to_string().contains("1 spikes"));
    }

    #[test]
    fn csv_export_flattens_locator_fields() {
        let mut element = spike("a1", "Dana", Some("#buy"), Some(Rating::No));
        element.comment = "too small, hard to tap".into();
        let page = spike("b2", "Lee", None, None);

        let mut out = Vec::new();
        write_csv(&mut out, &[element, page]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert!(lines[1].starts_with("a1,element,acme,Pricing Page,https://acme.test/pricing,r-Dana,Dana,#buy,,no,\"too small, hard to tap\","));
        assert!(lines[1].ends_with(",1280,800"));
        assert!(lines[2].starts_with("b2,page,acme,Pricing Page,https://acme.test/pricing,r-Lee,Lee,,,-,,"));
    }

    #[test]
    fn push_summary_reports_failures() {
        let report = PushReport {
            pending: 3,
            delivered: 2,
            failed: vec!["c3".into()],
        };
        let value = serde_json::to_value(push_summary(&report)).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["pushed"], 2);
        assert_eq!(value["failed"][0], "c3");
        assert_eq!(
            serde_json::to_value(push_summary(&PushReport::default())).unwrap()["success"],
            true
        );
    }

    #[test]
    fn cli_parses_global_json_flag() {
        let cli = Cli::try_parse_from(["spikes", "list", "--rating", "love", "--json"]).unwrap();
        assert!(cli.json);
        match cli.cmd {
            Command::List(args) => assert_eq!(args.rating, Some(Rating::Love)),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["spikes", "export", "--format", "jsonl"]).unwrap();
        assert!(matches!(cli.cmd, Command::Export { format: ExportFormat::Jsonl }));

        let cli = Cli::try_parse_from(["spikes", "export", "--format", "csv"]).unwrap();
        assert!(matches!(cli.cmd, Command::Export { format: ExportFormat::Csv }));

        let cli =
            Cli::try_parse_from(["spikes", "push", "--endpoint", "https://api.test", "--token", "t"])
                .unwrap();
        match cli.cmd {
            Command::Push(args) => {
                assert_eq!(args.endpoint.as_deref(), Some("https://api.test"));
                assert_eq!(args.token.as_deref(), Some("t"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
