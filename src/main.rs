//! Insurance Analytics CLI
//!
//! Command-line interface over a directory of CSV record extracts and a JSON
//! settings file.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use insurance_analytics::bordereaux::SheetGrid;
use insurance_analytics::currency::{cached_rates, sync_rates, CsvRateSource, RateSource, RateTable};
use insurance_analytics::records::loader;
use insurance_analytics::settings::{JsonFileSettings, ReinsuranceInputs, SettingsSession, SolvencyInputs};
use insurance_analytics::{
    AnalyticsConfig, AnalyticsError, AnalyticsService, ExportRow, InMemoryStore, Overrides, ReportingPeriod,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "insurance_analytics")]
#[command(about = "Technical account, MGA utilization and regulatory forms from CSV extracts")]
#[command(version)]
struct Cli {
    /// Directory holding monetary_records.csv, claims.csv and the other extracts
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// JSON configuration file (defaults plus ANALYTICS_* env vars when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON settings file holding the manual overrides (default: <data-dir>/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Technical account and key ratios
    Summary {
        /// Only records booked on or before this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// MGA agreement utilization scores
    Utilization {
        /// Score one agreement instead of all of them
        #[arg(long)]
        agreement: Option<String>,

        /// Reference date for elapsed months (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Detect columns and totals in an uploaded bordereaux CSV
    ParseBordereaux {
        file: PathBuf,
    },

    /// Compose the four regulatory forms for a period
    Forms {
        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,
    },

    /// Write the statement and form rows to a CSV file
    Export {
        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        /// Output path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch quotes for a date from an ordered list of sources
    SyncRates {
        #[arg(long)]
        date: NaiveDate,

        /// Rate files, tried in the order given
        #[arg(long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// When every source fails, report the most recent cached quotes instead
        #[arg(long)]
        use_cached: bool,

        /// Currencies the cached fallback must cover, repeatable (default: all cached)
        #[arg(long = "currency")]
        currencies: Vec<String>,
    },

    /// Update manual overrides; every value is validated before it is saved
    SetOverride {
        #[arg(long)]
        operating_expenses: Option<f64>,

        /// Per-class IBNR as CLASS=AMOUNT, repeatable; replaces the whole map
        #[arg(long = "ibnr")]
        ibnr: Vec<String>,

        /// Solvency block as JSON
        #[arg(long)]
        solvency: Option<String>,

        /// Reinsurance block as JSON
        #[arg(long)]
        reinsurance: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AnalyticsConfig::from_json_path(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => AnalyticsConfig::from_env(),
    };
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("settings.json"));

    match &cli.command {
        Commands::ParseBordereaux { file } => {
            let reader = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
            let grid = SheetGrid::from_csv_reader(reader)?;
            let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            let parsed = insurance_analytics::bordereaux::parse_bordereaux_file(&grid, &name)?;
            print_json_or(cli.json, &parsed, || {
                println!("File: {} ({} rows)", parsed.file_name, parsed.row_count);
                if parsed.needs_manual_entry() {
                    println!("  No known columns detected; enter totals manually");
                }
                for (metric, header) in &parsed.detected_columns {
                    println!("  {:?} <- \"{}\"", metric, header);
                }
                println!("  Total GWP:             {:>18.2}", parsed.total_gwp);
                println!("  Total policies:        {:>18.0}", parsed.total_policies);
                println!("  Total claims paid:     {:>18.2}", parsed.total_claims_paid);
                println!("  Total claims reserved: {:>18.2}", parsed.total_claims_reserved);
            })
        }
        Commands::SyncRates {
            date,
            sources,
            use_cached,
            currencies,
        } => {
            let fallback = use_cached.then_some(currencies.as_slice());
            sync(&cli.data_dir, *date, sources, fallback, cli.json)
        }
        Commands::SetOverride {
            operating_expenses,
            ibnr,
            solvency,
            reinsurance,
        } => {
            let mut session = SettingsSession::open(JsonFileSettings::new(&settings_path))?;
            if let Some(amount) = operating_expenses {
                session.set_operating_expenses(*amount)?;
            }
            if !ibnr.is_empty() {
                session.set_ibnr(parse_ibnr(ibnr)?)?;
            }
            if let Some(raw) = solvency {
                let inputs: SolvencyInputs = serde_json::from_str(raw).context("Invalid solvency JSON")?;
                session.set_solvency(inputs)?;
            }
            if let Some(raw) = reinsurance {
                let inputs: ReinsuranceInputs = serde_json::from_str(raw).context("Invalid reinsurance JSON")?;
                session.set_reinsurance(inputs)?;
            }
            print_json_or(cli.json, session.overrides(), || {
                println!("Saved overrides to {}", settings_path.display());
            })
        }
        Commands::Summary { as_of } => {
            let service = open_service(&cli.data_dir, config, &settings_path)?;
            summary(&service, *as_of, cli.json)
        }
        Commands::Utilization { agreement, today } => {
            let service = open_service(&cli.data_dir, config, &settings_path)?;
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            utilization(&service, agreement.as_deref(), today, cli.json)
        }
        Commands::Forms { from, to } => {
            let service = open_service(&cli.data_dir, config, &settings_path)?;
            forms(&service, ReportingPeriod::new(*from, *to)?, cli.json)
        }
        Commands::Export { from, to, out } => {
            let service = open_service(&cli.data_dir, config, &settings_path)?;
            export(&service, ReportingPeriod::new(*from, *to)?, out.as_deref())
        }
    }
}

fn open_service(data_dir: &Path, config: AnalyticsConfig, settings_path: &Path) -> Result<AnalyticsService<InMemoryStore>> {
    let overrides = load_overrides(settings_path)?;
    let store = InMemoryStore::from_csv_dir(data_dir, &config)
        .with_context(|| format!("Failed to load records from {}", data_dir.display()))?;
    Ok(AnalyticsService::new(store, config, overrides))
}

fn summary(service: &AnalyticsService<InMemoryStore>, as_of: Option<NaiveDate>, json: bool) -> Result<()> {
    let summary = service.compute_analytics_summary(as_of)?;
    print_json_or(json, &summary, || {
        println!("Analytics summary ({})", summary.base_currency);
        println!("==========================\n");
        for channel in &summary.channels {
            println!(
                "  {:<16} {:>6} records  GWP {:>18.2}  GPE {:>18.2}",
                channel.channel.label(),
                channel.record_count,
                channel.gross_written_premium,
                channel.gross_premium_earned
            );
        }
        println!();
        print_rows(&summary.technical_account.statement_rows(service.config().secondary().as_ref()));
        if !summary.loss_ratio_by_class.is_empty() {
            println!("\nLoss ratio by class:");
            for (class, ratio) in &summary.loss_ratio_by_class {
                println!("  {:<24} {:>8.2}%", class, ratio);
            }
        }
        if summary.has_unconverted_amounts() {
            println!("\nUnconverted currencies: {}", summary.unconverted_currencies.join(", "));
        }
    })
}

fn utilization(
    service: &AnalyticsService<InMemoryStore>,
    agreement: Option<&str>,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let scores = match agreement {
        Some(id) => vec![service.compute_agreement_utilization(id, today)?],
        None => service.compute_all_utilization(today)?,
    };
    print_json_or(json, &scores, || {
        println!(
            "{:<16} {:>16} {:>16} {:>10} {:>6} {:>14} {:>16}",
            "Agreement", "EPI", "Actual GWP", "Util", "Score", "Trend", "Avg/quarter"
        );
        println!("{}", "-".repeat(100));
        for u in &scores {
            println!(
                "{:<16} {:>16.2} {:>16.2} {:>10} {:>6} {:>14} {:>16.2}",
                u.agreement_id,
                u.epi,
                u.actual_gwp,
                u.display(),
                "*".repeat(u.score as usize),
                format!("{:?}", u.trend),
                u.avg_quarterly_gwp
            );
        }
    })
}

fn forms(service: &AnalyticsService<InMemoryStore>, period: ReportingPeriod, json: bool) -> Result<()> {
    let forms = service.compose_regulatory_forms(period, service.overrides())?;
    print_json_or(json, &forms, || {
        println!("Regulatory forms {} to {}", period.from, period.to);
        println!("Solvency status: {:?}\n", forms.form2.status);
        print_rows(&forms.export_rows());
    })
}

/// Statement view followed by every form row
fn export(service: &AnalyticsService<InMemoryStore>, period: ReportingPeriod, out: Option<&Path>) -> Result<()> {
    let summary = service.compute_period_summary(period)?;
    let forms = service.compose_regulatory_forms(period, service.overrides())?;
    let secondary = service.config().secondary();

    let mut rows = summary.technical_account.statement_rows(secondary.as_ref());
    rows.extend(forms.export_rows());

    match out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Unable to create {}", path.display()))?;
            write_rows(file, &rows)?;
            println!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => write_rows(io::stdout(), &rows)?,
    }
    Ok(())
}

/// Sync quotes into the stored history; `fallback` names the currencies to
/// serve from the cache when every source fails
fn sync(data_dir: &Path, date: NaiveDate, paths: &[PathBuf], fallback: Option<&[String]>, json: bool) -> Result<()> {
    let sources: Vec<Box<dyn RateSource + Send + Sync>> = paths
        .iter()
        .map(|p| Box::new(CsvRateSource::new(p)) as Box<dyn RateSource + Send + Sync>)
        .collect();
    let outcome = match (sync_rates(&sources, date), fallback) {
        (Ok(outcome), _) => outcome,
        (Err(failure), Some(currencies)) => return serve_cached(data_dir, date, currencies, &failure, json),
        (Err(failure), None) => return Err(failure.into()),
    };

    let stored = loader::merge_exchange_rates(data_dir, &outcome.rates)
        .with_context(|| format!("Rate history in {} left unchanged", data_dir.display()))?;

    print_json_or(json, &outcome.rates, || {
        println!(
            "Synced {} rates for {} from {} ({} quotes stored)",
            outcome.rates.len(),
            date,
            outcome.source,
            stored
        );
        for skipped in &outcome.skipped {
            println!("  skipped {}", skipped);
        }
    })
}

/// Report stored quotes without writing anything back
fn serve_cached(
    data_dir: &Path,
    date: NaiveDate,
    currencies: &[String],
    failure: &AnalyticsError,
    json: bool,
) -> Result<()> {
    let table = RateTable::new(
        loader::load_exchange_rates(data_dir).with_context(|| format!("{}; no rate cache to fall back on", failure))?,
    );
    let cached = cached_rates(&table, currencies, date);
    if cached.rates.is_empty() {
        bail!("{}; no cached quotes to fall back on", failure);
    }

    let unavailable: Vec<String> = cached.unavailable.iter().map(ToString::to_string).collect();
    let report = serde_json::json!({
        "source": "cache",
        "rates": cached.rates,
        "unavailable": unavailable,
    });
    print_json_or(json, &report, || {
        println!("All rate sources failed: {}", failure);
        println!("Serving {} cached quotes", cached.rates.len());
        for quote in &cached.rates {
            println!("  {} {} {} per {}", quote.currency, quote.date, quote.rate, quote.nominal);
        }
        for missing in &unavailable {
            println!("  {}", missing);
        }
    })
}

fn load_overrides(path: &Path) -> Result<Overrides> {
    let overrides = Overrides::load(&JsonFileSettings::new(path))
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    overrides.validate()?;
    Ok(overrides)
}

fn parse_ibnr(pairs: &[String]) -> Result<BTreeMap<String, f64>> {
    let mut ibnr = BTreeMap::new();
    for pair in pairs {
        let Some((class, amount)) = pair.split_once('=') else {
            bail!("IBNR must be CLASS=AMOUNT, got {}", pair);
        };
        let amount: f64 = amount
            .trim()
            .parse()
            .with_context(|| format!("Invalid IBNR amount in {}", pair))?;
        ibnr.insert(class.trim().to_string(), amount);
    }
    Ok(ibnr)
}

fn print_json_or<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

fn print_rows(rows: &[ExportRow]) {
    for row in rows {
        match (row.amount_base, row.amount_secondary, row.ratio_pct, &row.text) {
            (Some(base), Some(secondary), _, _) => println!("  {:<48} {:>18.2} {:>14.2}", row.label, base, secondary),
            (Some(base), None, _, _) => println!("  {:<48} {:>18.2}", row.label, base),
            (None, _, Some(pct), _) => println!("  {:<48} {:>18.2}%", row.label, pct),
            (None, _, None, Some(text)) => println!("  {:<48} {:>18}", row.label, text),
            (None, _, None, None) => println!("  {}", row.label),
        }
    }
}

fn write_rows<W: io::Write>(writer: W, rows: &[ExportRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["Label", "AmountBase", "AmountSecondary", "RatioPct", "Value"])?;
    for row in rows {
        csv_writer.write_record([
            row.label.clone(),
            row.amount_base.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            row.amount_secondary.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            row.ratio_pct.map(|v| format!("{:.4}", v)).unwrap_or_default(),
            row.text.clone().unwrap_or_default(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
