//! CLI entry point for the loan insights library.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use loan_insights::analysis::{
    Aggregation, BinnedAggregator, CREDIT_UTILIZATION, CategoryAggregator, CorrelationRanker,
    HIGH_RISK_DISPLAY_COLUMNS, Metric, RISK_FACTOR_COLUMNS, RiskFlagger, RowTest, ScatterSampler,
    TrendPoint, ValueCountOptions, histogram_column, key_metrics, monthly_mean, value_counts,
    with_derived_columns,
};
use loan_insights::metadata::{COLUMN_METADATA_FILE, metadata_frame};
use loan_insights::presentation::{format_metric, format_percent, render_table};
use loan_insights::utils::{round2, text_values};
use loan_insights::{
    Bucket, BucketStat, ColumnSummarizer, CorrelationReport, Dataset, DescriptionCatalog,
    DescriptionStore, InsightsConfig, MetadataRecord, MetadataTableBuilder, MetadataWriter,
    RiskThresholds, Section, ValueCount, export,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    author = "Loan Insights Team",
    version,
    about = "Profiling, bucketing, correlation and risk views over a loan dataset",
    long_about = "Explore a cleaned loan dataset from the command line.\n\n\
                  The first CSV column is treated as the row identifier.\n\n\
                  EXAMPLES:\n  \
                  # Headline metrics for 36-month grade A and B loans\n  \
                  loan-insights -d cleaned_df.csv --grade A --grade B --term 36 overview\n\n  \
                  # Default rate per annual income bucket\n  \
                  loan-insights bins --by annual_income --stat default-rate\n\n  \
                  # Save column metadata next to the data\n  \
                  loan-insights metadata --save -o outputs/\n\n  \
                  # Sampled income vs. rate points for a scatter plot\n  \
                  loan-insights export scatter --scatter annual_income interest_rate\n\n  \
                  # Machine-readable correlations\n  \
                  loan-insights --json correlations | jq .top_pairs"
)]
struct Args {
    /// Path to the cleaned loan CSV
    #[arg(short, long, default_value = "cleaned_df.csv", global = true)]
    data: PathBuf,

    /// Directory for metadata files and exports
    #[arg(short, long, default_value = ".", global = true)]
    output_dir: PathBuf,

    /// Dataset description stored in dataset_metadata.json
    #[arg(long, global = true)]
    description: Option<String>,

    /// Keep only these grades (repeatable)
    #[arg(long = "grade", global = true)]
    grades: Vec<String>,

    /// Keep only these terms in months (repeatable)
    #[arg(long = "term", global = true)]
    terms: Vec<String>,

    /// Keep only these loan purposes (repeatable)
    #[arg(long = "purpose", global = true)]
    purposes: Vec<String>,

    /// Debt-to-income above this flags a loan as high risk
    #[arg(long, default_value = "40", global = true)]
    max_dti: f64,

    /// Credit utilization (%) above this flags a loan as high risk
    #[arg(long, default_value = "80", global = true)]
    max_utilization: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print JSON to stdout instead of tables
    ///
    /// Disables logging so stdout only carries the JSON document.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dataset shape, key metrics, grade mix and interest rate trend
    Overview,

    /// Per-column metadata table
    Metadata {
        /// Write column_metadata.csv and dataset_metadata.json
        #[arg(long)]
        save: bool,

        /// Replace a column description, as COLUMN=TEXT (repeatable)
        #[arg(long = "describe", value_parser = parse_description)]
        describe: Vec<(String, String)>,
    },

    /// Statistic of one column per bucket of another
    Bins {
        /// Column to bucket (or group with --categorical)
        #[arg(long, default_value = "annual_income")]
        by: String,

        /// Column to aggregate; defaults to interest_rate, or loan_status for rates
        #[arg(long)]
        target: Option<String>,

        #[arg(long, value_enum, default_value = "mean")]
        stat: CliStat,

        /// Number of quantile buckets
        #[arg(long)]
        buckets: Option<usize>,

        /// Group by the distinct values of --by
        #[arg(long)]
        categorical: bool,

        /// Fixed credit utilization bands instead of quantiles
        #[arg(long, conflicts_with = "categorical")]
        utilization_bands: bool,
    },

    /// Pearson correlations and the strongest pairs
    Correlations {
        /// Use every numeric column instead of the risk factors
        #[arg(long)]
        all_numeric: bool,

        /// Number of pairs to report
        #[arg(long)]
        top: Option<usize>,
    },

    /// Rule-based high-risk loans
    Risk {
        /// Maximum rows to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Key portfolio metrics
    Metrics,

    /// Write a CSV export
    Export {
        #[arg(value_enum)]
        kind: CliExport,

        /// Row index for row exports
        #[arg(long)]
        row: Option<usize>,

        /// Columns plotted by scatter exports
        #[arg(
            long,
            num_args = 2,
            value_names = ["X", "Y"],
            default_values = ["annual_income", "interest_rate"]
        )]
        scatter: Vec<String>,

        /// Replace a column description in metadata exports, as COLUMN=TEXT
        #[arg(long = "describe", value_parser = parse_description)]
        describe: Vec<(String, String)>,

        /// Destination file; defaults to a name inside the output directory
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Statistic computed per bucket
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStat {
    Mean,
    Median,
    /// Percentage of rows whose status matches the default pattern
    DefaultRate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExport {
    /// Whole filtered table
    Full,
    /// Column metadata with descriptions
    Metadata,
    /// A single row, id included
    Row,
    /// High-risk loans by interest rate
    HighRisk,
    /// Two columns, sampled for large tables
    Scatter,
}

fn parse_description(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((column, text)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), text.trim().to_string()))
        }
        _ => Err(format!("expected COLUMN=TEXT, got '{raw}'")),
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON document.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    let config = build_config(&args)?;
    let dataset = load_dataset(&args, &config)?;

    match &args.command {
        Command::Overview => run_overview(&args, &config, &dataset),
        Command::Metadata { save, describe } => {
            run_metadata(&args, &config, &dataset, *save, describe)
        }
        Command::Bins {
            by,
            target,
            stat,
            buckets,
            categorical,
            utilization_bands,
        } => {
            let request = BinRequest {
                by: by.as_str(),
                target: target.as_deref(),
                stat: *stat,
                buckets: buckets.unwrap_or(config.quantile_buckets),
                categorical: *categorical,
                utilization_bands: *utilization_bands,
            };
            run_bins(&args, &config, &dataset, &request)
        }
        Command::Correlations { all_numeric, top } => {
            run_correlations(&args, &config, &dataset, *all_numeric, *top)
        }
        Command::Risk { limit } => run_risk(
            &args,
            &config,
            &dataset,
            limit.unwrap_or(config.high_risk_display_limit),
        ),
        Command::Metrics => run_metrics(&args, &config, &dataset),
        Command::Export {
            kind,
            row,
            scatter,
            describe,
            file,
        } => {
            let request = ExportRequest {
                kind: *kind,
                row: *row,
                scatter,
                describe,
                file: file.as_ref(),
            };
            run_export(&args, &config, &dataset, &request)
        }
    }
}

fn build_config(args: &Args) -> Result<InsightsConfig> {
    let mut builder = InsightsConfig::builder()
        .data_path(&args.data)
        .output_dir(&args.output_dir)
        .risk(RiskThresholds {
            max_debt_to_income: args.max_dti,
            max_utilization: args.max_utilization,
            ..RiskThresholds::default()
        });

    if let Some(ref description) = args.description {
        builder = builder.dataset_description(description);
    }

    Ok(builder.build()?)
}

/// Load the dataset and apply the grade, term and purpose filters.
///
/// A filter on a column the table lacks is ignored.
fn load_dataset(args: &Args, config: &InsightsConfig) -> Result<Dataset> {
    let mut dataset = Dataset::load(&config.data_path)?;

    for (column, values) in [
        ("grade", &args.grades),
        ("term", &args.terms),
        ("loan_purpose", &args.purposes),
    ] {
        dataset = dataset
            .filter_in_if_present(column, values)
            .with_context(|| format!("Failed to filter on {column}"))?;
    }

    if dataset.height() == 0 {
        return Err(anyhow!("No rows match the selected filters"));
    }
    debug!("{} rows after filtering", dataset.height());
    Ok(dataset)
}

/// Print `value` as JSON, or as the text produced by `render`.
///
/// Note: tables go through `println!` on purpose; they are the command's
/// output, not log lines.
fn emit<T: Serialize>(args: &Args, value: &T, render: impl FnOnce(&T) -> String) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", render(value));
    }
    Ok(())
}

fn heading(title: &str) -> String {
    format!("{title}\n{}", "=".repeat(title.len()))
}

fn section_text<T>(section: &Section<T>, render: impl FnOnce(&T) -> String) -> String {
    match section {
        Section::Ready(value) => render(value),
        Section::Unavailable(message) => format!("  {message}"),
    }
}

// =============================================================================
// Overview
// =============================================================================

#[derive(Serialize)]
struct Overview {
    rows: usize,
    columns: usize,
    metrics: Vec<Metric>,
    grade_distribution: Section<Vec<ValueCount>>,
    loan_amount_distribution: Section<Vec<Bucket>>,
    interest_rate_trend: Section<Vec<TrendPoint>>,
}

fn run_overview(args: &Args, config: &InsightsConfig, dataset: &Dataset) -> Result<()> {
    let df = dataset.frame();
    let overview = Overview {
        rows: dataset.height(),
        columns: dataset.width(),
        metrics: key_metrics(df, &config.risk),
        grade_distribution: Section::from_result(
            "Grade distribution",
            value_counts(df, "grade", &ValueCountOptions::by_label()),
        ),
        loan_amount_distribution: Section::from_result(
            "Loan amount distribution",
            histogram_column(df, "loan_amount", config.histogram_bins),
        ),
        interest_rate_trend: Section::from_result(
            "Interest rate trend",
            monthly_mean(df, "issue_month", "interest_rate"),
        ),
    };

    emit(args, &overview, |o| {
        let mut out = vec![
            heading("Dataset"),
            format!("  Rows: {}\n  Columns: {}", o.rows, o.columns),
            String::new(),
            heading("Key metrics"),
            metrics_table(&o.metrics),
            String::new(),
            heading("Grade distribution"),
        ];
        out.push(section_text(&o.grade_distribution, |counts| {
            let rows: Vec<Vec<String>> = counts
                .iter()
                .map(|c| vec![c.value.clone(), c.count.to_string()])
                .collect();
            render_table(&["grade", "loans"], &rows)
        }));
        out.push(String::new());
        out.push(heading("Loan amount distribution"));
        out.push(section_text(&o.loan_amount_distribution, |buckets| {
            let rows: Vec<Vec<String>> = buckets
                .iter()
                .map(|b| vec![b.label.clone(), b.row_count.to_string()])
                .collect();
            render_table(&["range", "loans"], &rows)
        }));
        out.push(String::new());
        out.push(heading("Average interest rate by issue month"));
        out.push(section_text(&o.interest_rate_trend, |points| {
            let rows: Vec<Vec<String>> = points
                .iter()
                .map(|p| {
                    vec![
                        p.label.clone(),
                        format_percent(p.value),
                        p.row_count.to_string(),
                    ]
                })
                .collect();
            render_table(&["month", "avg rate", "loans"], &rows)
        }));
        out.join("\n")
    })
}

fn metrics_table(metrics: &[Metric]) -> String {
    let rows: Vec<Vec<String>> = metrics
        .iter()
        .map(|m| vec![m.label.clone(), format_metric(m)])
        .collect();
    render_table(&["metric", "value"], &rows)
}

fn run_metrics(args: &Args, config: &InsightsConfig, dataset: &Dataset) -> Result<()> {
    let metrics = key_metrics(dataset.frame(), &config.risk);
    emit(args, &metrics, |m| metrics_table(m))
}

// =============================================================================
// Metadata
// =============================================================================

/// Metadata records plus the description store with `overrides` applied.
fn metadata_with_edits(
    config: &InsightsConfig,
    dataset: &Dataset,
    overrides: &[(String, String)],
) -> (Vec<MetadataRecord>, DescriptionStore) {
    let catalog = DescriptionCatalog::loan_defaults();
    let records = MetadataTableBuilder::new(ColumnSummarizer::from_config(config))
        .build(dataset.frame(), &catalog);

    let mut store = DescriptionStore::new(catalog, config.dataset_description.clone());
    for (column, text) in overrides {
        store.set(column.clone(), text.clone());
    }
    (records, store)
}

fn run_metadata(
    args: &Args,
    config: &InsightsConfig,
    dataset: &Dataset,
    save: bool,
    overrides: &[(String, String)],
) -> Result<()> {
    let (records, store) = metadata_with_edits(config, dataset, overrides);

    if save {
        let mut frame = metadata_frame(&records, &store)?;
        let (csv_path, json_path) = MetadataWriter::new(&config.output_dir)
            .save(&mut frame, &dataset.metadata(store.dataset_description()))?;
        info!("Saved {} and {}", csv_path.display(), json_path.display());
    }

    let records: Vec<MetadataRecord> = records
        .into_iter()
        .map(|mut record| {
            record.description = store.get(&record.column);
            record
        })
        .collect();

    emit(args, &records, |records| {
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                vec![
                    r.column.clone(),
                    r.summary.dtype.to_string(),
                    r.summary.missing_count.to_string(),
                    format_percent(r.summary.missing_pct),
                    r.summary.unique_count.to_string(),
                    r.description.clone(),
                ]
            })
            .collect();
        render_table(
            &["column", "dtype", "missing", "missing %", "unique", "description"],
            &rows,
        )
    })
}

// =============================================================================
// Bins
// =============================================================================

struct BinRequest<'a> {
    by: &'a str,
    target: Option<&'a str>,
    stat: CliStat,
    buckets: usize,
    categorical: bool,
    utilization_bands: bool,
}

fn aggregation(
    stat: CliStat,
    thresholds: &RiskThresholds,
) -> loan_insights::InsightsResult<Aggregation> {
    Ok(match stat {
        CliStat::Mean => Aggregation::Mean,
        CliStat::Median => Aggregation::Median,
        CliStat::DefaultRate => Aggregation::Rate(RowTest::matches(&thresholds.status_pattern)?),
    })
}

fn compute_bins(
    config: &InsightsConfig,
    df: &DataFrame,
    request: &BinRequest<'_>,
) -> loan_insights::InsightsResult<Vec<BucketStat>> {
    let target = request.target.unwrap_or(match request.stat {
        CliStat::DefaultRate => "loan_status",
        CliStat::Mean | CliStat::Median => "interest_rate",
    });
    let agg = aggregation(request.stat, &config.risk)?;

    if request.utilization_bands {
        let derived = with_derived_columns(df)?;
        BinnedAggregator::utilization_bands(agg)?.aggregate(&derived, CREDIT_UTILIZATION, target)
    } else if request.categorical {
        CategoryAggregator::new(agg).aggregate(df, request.by, target)
    } else {
        BinnedAggregator::quantile(request.buckets, agg)?.aggregate(df, request.by, target)
    }
}

fn run_bins(
    args: &Args,
    config: &InsightsConfig,
    dataset: &Dataset,
    request: &BinRequest<'_>,
) -> Result<()> {
    let section = Section::from_result("Bins", compute_bins(config, dataset.frame(), request));

    emit(args, &section, |section| {
        section_text(section, |stats| {
            let value_header = match request.stat {
                CliStat::Mean => "mean",
                CliStat::Median => "median",
                CliStat::DefaultRate => "rate %",
            };
            let rows: Vec<Vec<String>> = stats
                .iter()
                .map(|s| {
                    vec![
                        s.bucket.label.clone(),
                        s.bucket.row_count.to_string(),
                        s.value.to_string(),
                    ]
                })
                .collect();
            render_table(&["bucket", "rows", value_header], &rows)
        })
    })
}

// =============================================================================
// Correlations
// =============================================================================

fn run_correlations(
    args: &Args,
    config: &InsightsConfig,
    dataset: &Dataset,
    all_numeric: bool,
    top: Option<usize>,
) -> Result<()> {
    let ranker = match top {
        Some(n) => CorrelationRanker::new(n),
        None => CorrelationRanker::from_config(config),
    };
    let derived = with_derived_columns(dataset.frame())?;
    let result = if all_numeric {
        ranker.rank(&derived)
    } else {
        ranker.rank_columns(&derived, &RISK_FACTOR_COLUMNS)
    };
    let section: Section<CorrelationReport> = Section::from_result("Correlations", result);

    emit(args, &section, |section| {
        section_text(section, |report| {
            let rows: Vec<Vec<String>> = report
                .top_pairs
                .iter()
                .map(|p| {
                    vec![
                        p.column_a.clone(),
                        p.column_b.clone(),
                        p.coefficient.to_string(),
                    ]
                })
                .collect();
            render_table(&["column a", "column b", "r"], &rows)
        })
    })
}

// =============================================================================
// Risk
// =============================================================================

#[derive(Serialize)]
struct RiskReport {
    rules: Vec<String>,
    flagged: usize,
    total: usize,
    flagged_pct: f64,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn risk_report(
    config: &InsightsConfig,
    dataset: &Dataset,
    limit: usize,
) -> loan_insights::InsightsResult<RiskReport> {
    let flagger = RiskFlagger::from_thresholds(&config.risk)?;
    let flags = flagger.flag(dataset.frame())?;
    let flagged = flags.iter().filter(|f| **f).count();

    let mut columns = vec![dataset.id_column()];
    columns.extend(HIGH_RISK_DISPLAY_COLUMNS);
    let table = flagger.high_risk_rows(
        &dataset.indexed_frame()?,
        &flags,
        Some("interest_rate"),
        &columns,
        limit,
    )?;

    Ok(RiskReport {
        rules: flagger
            .predicates()
            .predicates()
            .iter()
            .map(ToString::to_string)
            .collect(),
        flagged,
        total: flags.len(),
        flagged_pct: round2(flagged as f64 * 100.0 / flags.len().max(1) as f64),
        columns: table
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect(),
        rows: table_rows(&table)?,
    })
}

fn run_risk(args: &Args, config: &InsightsConfig, dataset: &Dataset, limit: usize) -> Result<()> {
    let section = Section::from_result("High-risk loans", risk_report(config, dataset, limit));

    emit(args, &section, |section| {
        let body = section_text(section, |r| {
            let headers: Vec<&str> = r.columns.iter().map(String::as_str).collect();
            format!(
                "  {}\n\n  {} of {} loans flagged ({})\n\n{}",
                r.rules.join("\n  "),
                r.flagged,
                r.total,
                format_percent(r.flagged_pct),
                render_table(&headers, &r.rows)
            )
        });
        format!("{}\n{}", heading("High-risk loans"), body)
    })
}

/// Row-major text cells, empty where a value is missing.
fn table_rows(df: &DataFrame) -> loan_insights::InsightsResult<Vec<Vec<String>>> {
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        columns.push(text_values(column.as_materialized_series())?);
    }
    Ok((0..df.height())
        .map(|i| {
            columns
                .iter()
                .map(|values| values[i].clone().unwrap_or_default())
                .collect()
        })
        .collect())
}

// =============================================================================
// Export
// =============================================================================

#[derive(Serialize)]
struct ExportSummary {
    path: PathBuf,
    bytes: usize,
}

struct ExportRequest<'a> {
    kind: CliExport,
    row: Option<usize>,
    scatter: &'a [String],
    describe: &'a [(String, String)],
    file: Option<&'a PathBuf>,
}

fn run_export(
    args: &Args,
    config: &InsightsConfig,
    dataset: &Dataset,
    request: &ExportRequest<'_>,
) -> Result<()> {
    let (bytes, default_name) = match request.kind {
        CliExport::Full => (export::full_table_csv(dataset)?, "loans_filtered.csv".to_string()),
        CliExport::Metadata => {
            let (records, store) = metadata_with_edits(config, dataset, request.describe);
            (
                export::metadata_csv(&records, &store)?,
                COLUMN_METADATA_FILE.to_string(),
            )
        }
        CliExport::Row => {
            let index = request
                .row
                .ok_or_else(|| anyhow!("--row is required for row exports"))?;
            (export::row_csv(dataset, index)?, format!("loan_row_{index}.csv"))
        }
        CliExport::HighRisk => {
            let flagger = RiskFlagger::from_thresholds(&config.risk)?;
            (
                export::high_risk_csv(dataset, &flagger, config.high_risk_export_limit)?,
                "high_risk_loans.csv".to_string(),
            )
        }
        CliExport::Scatter => {
            let [x, y] = request.scatter else {
                return Err(anyhow!("--scatter takes exactly two columns"));
            };
            let sampler = ScatterSampler::from_config(config)?;
            (
                export::scatter_csv(dataset, &sampler, x, y)?,
                format!("scatter_{x}_{y}.csv"),
            )
        }
    };

    let path = match request.file {
        Some(path) => path.clone(),
        None => config.output_dir.join(default_name),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());

    let summary = ExportSummary {
        path,
        bytes: bytes.len(),
    };
    emit(args, &summary, |s| {
        format!("Exported {} bytes to {}", s.bytes, s.path.display())
    })
}
