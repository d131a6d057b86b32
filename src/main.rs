use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use rossmann_sales::synth::{self, SynthOptions};
use rossmann_sales::{
    build_views, export_dashboard, load_dataset, locate_sources, store_picker_options,
    CategoryColumn, Dashboard, DateRange, FilterSet, MembershipColumn, PipelineConfig,
    ViewOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "rossmann", version, about = "Rossmann sales dashboard pipeline")]
struct Cli {
    /// Config file (extension optional, may be absent)
    #[arg(long, default_value = "rossmann")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load, filter and print KPIs plus every view
    Report(ReportArgs),
    /// Write a synthetic train.csv / store.csv pair
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Look only in this directory for the source files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long, value_delimiter = ',')]
    store_type: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    assortment: Vec<String>,
    /// Promo flags to keep (0 = no promo, 1 = promo)
    #[arg(long, value_delimiter = ',', default_values_t = [0i64, 1])]
    promo: Vec<i64>,
    /// School-holiday flags to keep; empty keeps every row
    #[arg(long, value_delimiter = ',')]
    school_holiday: Vec<i64>,
    /// Promo2 flags to keep; empty keeps every row
    #[arg(long, value_delimiter = ',')]
    promo2: Vec<i64>,
    /// Store ids to keep; empty keeps every store
    #[arg(long, value_delimiter = ',')]
    store: Vec<i64>,
    #[arg(long)]
    top: Option<usize>,
    /// Print the dashboard as JSON
    #[arg(long)]
    json: bool,
    /// Write each view as Parquet into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, default_value = "data")]
    out: PathBuf,
    #[arg(long, default_value_t = 50)]
    stores: u32,
    #[arg(long, default_value_t = 90)]
    days: u32,
    #[arg(long, default_value = "2015-01-01")]
    start: NaiveDate,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = PipelineConfig::load(&cli.config).context("loading configuration")?;
    let _guard = rossmann_sales::log::init(cfg.log_dir.as_deref());

    match cli.command {
        Command::Report(args) => report(&cfg, args),
        Command::Generate(args) => {
            let opts = SynthOptions {
                stores: args.stores,
                days: args.days,
                start: args.start,
                seed: args.seed,
                ..SynthOptions::default()
            };
            let paths = synth::generate(&args.out, &opts)?;
            println!("Wrote {} and {}", paths.sales.display(), paths.stores.display());
            Ok(())
        }
    }
}

fn report(cfg: &PipelineConfig, args: ReportArgs) -> anyhow::Result<()> {
    let candidates = match &args.data_dir {
        Some(dir) => vec![dir.clone()],
        None => cfg.data_dirs.clone(),
    };
    let paths = locate_sources(&candidates, &cfg.sales_file, &cfg.store_file)?;
    let dataset = load_dataset(&paths)
        .with_context(|| format!("loading {}", paths.sales.display()))?;

    let Some(bounds) = dataset.date_bounds() else {
        println!("No open-store rows in the data.");
        return Ok(());
    };

    let range = DateRange::from_selection(args.from, args.to, bounds)?;
    let mut view = FilterSet::new().date_range(range).apply(&dataset);
    let mut filters = FilterSet::new()
        .category(CategoryColumn::StoreType, args.store_type)
        .category(CategoryColumn::Assortment, args.assortment)
        .membership(MembershipColumn::Promo, args.promo);
    if !args.school_holiday.is_empty() {
        filters = filters.membership(MembershipColumn::SchoolHoliday, args.school_holiday);
    }
    if !args.promo2.is_empty() {
        filters = filters.membership(MembershipColumn::Promo2, args.promo2);
    }
    view = filters.apply_to(&view);

    info!("Stores in data: {}", view.distinct_stores().len());
    if !args.store.is_empty() {
        if store_picker_options(&view, cfg.store_picker_limit).is_some() {
            view = FilterSet::new().stores(args.store).apply_to(&view);
        } else {
            warn!(
                limit = cfg.store_picker_limit,
                "too many stores in view; ignoring --store"
            );
        }
    }

    let dashboard = build_views(&view, args.top.unwrap_or(cfg.top_n))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print_dashboard(&dashboard, range);
    }

    if let Some(dir) = args.export_dir.as_ref().or(cfg.export_dir.as_ref()) {
        let written = export_dashboard(&dashboard, dir)?;
        info!("exported {} views to {}", written.len(), dir.display());
    }
    Ok(())
}

/// `1234567.8` -> `1,234,568`
fn thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

fn print_dashboard(dashboard: &Dashboard, range: DateRange) {
    let s = &dashboard.summary;
    println!("Rossmann Sales Dashboard  {} .. {}", range.start(), range.end());
    println!(
        "Total Sales {}  |  Avg Sales / day-row {}  |  Stores {}  |  Days {}",
        thousands(s.total_sales),
        thousands(s.mean_sales),
        thousands(s.stores as f64),
        thousands(s.days as f64)
    );

    for view in &dashboard.views {
        println!("\n== {} ==", view.title);
        match &view.outcome {
            ViewOutcome::Table(table) if table.is_empty() => {
                println!("No rows match the current filters.");
            }
            ViewOutcome::Table(table) => {
                for row in &table.rows {
                    let key: Vec<String> = row.key.iter().map(ToString::to_string).collect();
                    println!("{:<12} {:>14}", key.join(" / "), thousands(row.value));
                }
            }
            ViewOutcome::Distribution { groups } if groups.is_empty() => {
                println!("No rows match the current filters.");
            }
            ViewOutcome::Distribution { groups } => {
                println!(
                    "{:<10} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
                    "group", "n", "min", "q1", "median", "q3", "max"
                );
                for g in groups {
                    println!(
                        "{:<10} {:>8} {:>8.0} {:>8.0} {:>8.0} {:>8.0} {:>8.0}",
                        g.key.to_string(),
                        g.count,
                        g.min,
                        g.q1,
                        g.median,
                        g.q3,
                        g.max
                    );
                }
            }
            ViewOutcome::Skipped { notice } => println!("{notice}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(999.4), "999");
        assert_eq!(thousands(1_234_567.8), "1,234,568");
        assert_eq!(thousands(-1000.0), "-1,000");
    }

    #[test]
    fn cli_parses_filters() {
        let cli = Cli::try_parse_from([
            "rossmann",
            "report",
            "--from",
            "2015-01-01",
            "--store-type",
            "a,c",
            "--promo",
            "1",
            "--promo2",
            "0,1",
        ])
        .unwrap();
        match cli.command {
            Command::Report(args) => {
                assert_eq!(args.from, NaiveDate::from_ymd_opt(2015, 1, 1));
                assert_eq!(args.store_type, vec!["a", "c"]);
                assert_eq!(args.promo, vec![1]);
                assert_eq!(args.promo2, vec![0, 1]);
                assert!(args.school_holiday.is_empty());
                assert!(args.store.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
