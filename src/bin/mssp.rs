use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mssp_sizing::models::{CompetitorEntry, CountryInput, RegulationEntry};
use mssp_sizing::report::{ReportInput, Section};
use mssp_sizing::viz::{ChartInput, ChartKind};
use log::warn;
use mssp_sizing::{JoinPolicy, MarketAssumptions, SizingResult};
use mssp_sizing::{calc, reference, report, storage, viz};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "mssp",
    version,
    about = "Size the MSSP market in Francophone Africa: TAM/SAM/SOM, attractiveness, reports & charts"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the enriched market table (and optionally save it).
    Build(BuildArgs),
    /// Print report sections and optionally export ranking/segment tables.
    Report(ReportArgs),
    /// Render charts into a directory.
    Chart(ChartArgs),
    /// Print or write the default assumptions as a JSON scenario.
    Assumptions(AssumptionsArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    fn ext(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Raw-input CSV (country, population_m, gdp_b_usd, internet_pct, mobile_pct, banks, insurers).
    /// Defaults to the built-in six-country table.
    #[arg(long, conflicts_with = "world_bank")]
    inputs: Option<PathBuf>,
    /// World Bank export (tidy or DataBank CSV) to extract indicators from.
    #[arg(long)]
    world_bank: Option<PathBuf>,
    /// Year to read from the World Bank export (default: latest available per series).
    #[arg(long, requires = "world_bank")]
    year: Option<i32>,
    /// Bank/insurer counts CSV used with --world-bank (default: built-in counts).
    #[arg(long, requires = "world_bank")]
    counts: Option<PathBuf>,
    /// JSON scenario overriding any subset of the market assumptions.
    #[arg(long)]
    assumptions: Option<PathBuf>,
    /// Regulatory table CSV; enables maturity and attractiveness scores.
    #[arg(long)]
    regulations: Option<PathBuf>,
    /// Abort when a country has no row in an auxiliary table instead of dropping it.
    #[arg(long, default_value_t = false)]
    strict_joins: bool,
}

#[derive(Args, Debug)]
struct BuildArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Save the enriched table to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Competitor table CSV.
    #[arg(long)]
    competitors: Option<PathBuf>,
    /// Section to print (repeatable): overview, segments, regulatory, competition, ranking.
    #[arg(long = "section")]
    sections: Vec<Section>,
    /// Number formatting locale (en, de, fr, ...).
    #[arg(long, default_value = "en")]
    locale: String,
    /// Also write country_ranking.csv and segment_analysis.csv into this directory.
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Competitor table CSV.
    #[arg(long)]
    competitors: Option<PathBuf>,
    /// Directory the charts are written to (created if missing).
    #[arg(long)]
    out_dir: PathBuf,
    /// Image format.
    #[arg(long, value_enum, default_value = "svg")]
    format: ImageFormat,
    /// Width of each chart (default 1000).
    #[arg(long, default_value_t = 1000)]
    width: u32,
    /// Height of each chart (default 600).
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Only render these charts (repeatable), e.g. market-size, dashboard.
    #[arg(long)]
    only: Vec<ChartKind>,
    /// Tick label locale (en, de, fr, ...).
    #[arg(long, default_value = "en")]
    locale: String,
}

#[derive(Args, Debug)]
struct AssumptionsArgs {
    /// Write the scenario JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Inputs resolved from the command line, before enrichment.
struct Loaded {
    assumptions: MarketAssumptions,
    inputs: Vec<CountryInput>,
    regulations: Option<Vec<RegulationEntry>>,
}

fn load(args: &InputArgs) -> Result<Loaded> {
    let mut assumptions = match &args.assumptions {
        Some(path) => MarketAssumptions::from_json_file(path)
            .with_context(|| format!("loading assumptions from {}", path.display()))?,
        None => MarketAssumptions::default(),
    };
    if args.strict_joins {
        assumptions.join_policy = JoinPolicy::Fail;
    }

    let inputs = match (&args.inputs, &args.world_bank) {
        (Some(path), _) => reference::load_inputs_csv(path)
            .with_context(|| format!("reading inputs from {}", path.display()))?,
        (None, Some(path)) => {
            let counts = match &args.counts {
                Some(c) => reference::load_institution_counts_csv(c)
                    .with_context(|| format!("reading counts from {}", c.display()))?,
                None => reference::builtin_institution_counts(),
            };
            reference::extract_world_bank(path, args.year, &counts, &assumptions)
                .with_context(|| format!("extracting indicators from {}", path.display()))?
        }
        (None, None) => reference::builtin_inputs(),
    };

    let regulations = load_optional(
        args.regulations.as_deref(),
        "regulations",
        |p| reference::load_regulations_csv(p),
    )?;

    Ok(Loaded {
        assumptions,
        inputs,
        regulations,
    })
}

fn load_competitors(path: Option<&Path>) -> Result<Option<Vec<CompetitorEntry>>> {
    load_optional(path, "competitors", |p| reference::load_competitors_csv(p))
}

/// Auxiliary tables are optional: a path that does not exist is logged and treated as not
/// supplied, so only the sections and charts that need it are skipped. A file that exists
/// but fails to parse is still an error.
fn load_optional<T>(
    path: Option<&Path>,
    what: &str,
    read: impl FnOnce(&Path) -> SizingResult<T>,
) -> Result<Option<T>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        warn!("{what} file {} not found, continuing without it", path.display());
        return Ok(None);
    }
    read(path)
        .map(Some)
        .with_context(|| format!("reading {what} from {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Build(args) => cmd_build(args),
        Command::Report(args) => cmd_report(args),
        Command::Chart(args) => cmd_chart(args),
        Command::Assumptions(args) => cmd_assumptions(args),
    }
}

fn cmd_build(args: BuildArgs) -> Result<()> {
    let loaded = load(&args.input)?;
    let enriched = calc::enrich(
        &loaded.inputs,
        loaded.regulations.as_deref(),
        &loaded.assumptions,
    )?;
    let records = &enriched.records;

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(records, path)?,
            "json" => storage::save_json(records, path)?,
            other => bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} rows to {}", records.len(), path.display());
    } else {
        let locale = &num_format::Locale::en;
        for r in records {
            println!(
                "{:<14} TAM={} SAM={} SOM={} attractiveness={}",
                r.country,
                report::fmt_num(r.metrics.tam_m_usd, 3, locale),
                report::fmt_num(r.metrics.sam_m_usd, 3, locale),
                report::fmt_num(r.metrics.som_m_usd, 3, locale),
                r.metrics
                    .attractiveness_score
                    .map(|s| report::fmt_num(s, 1, locale))
                    .unwrap_or_else(|| "NA".to_string()),
            );
        }
    }
    if !enriched.join_misses.is_empty() {
        eprintln!(
            "{} countries had no regulatory row and were left unscored",
            enriched.join_misses.len()
        );
    }
    Ok(())
}

fn cmd_report(args: ReportArgs) -> Result<()> {
    let loaded = load(&args.input)?;
    let competitors = load_competitors(args.competitors.as_deref())?;
    let enriched = calc::enrich(
        &loaded.inputs,
        loaded.regulations.as_deref(),
        &loaded.assumptions,
    )?;

    let input = ReportInput {
        records: &enriched.records,
        regulations: loaded.regulations.as_deref(),
        competitors: competitors.as_deref(),
        assumptions: &loaded.assumptions,
        locale: viz::util::map_locale(&args.locale),
    };
    let sections: &[Section] = if args.sections.is_empty() {
        &Section::ALL
    } else {
        &args.sections
    };
    print!("{}", report::render_all(sections, &input)?);

    if let Some(dir) = args.export_dir.as_ref() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let ranking_path = dir.join("country_ranking.csv");
        storage::save_ranking_csv(&calc::rank_by_attractiveness(&enriched.records), &ranking_path)?;
        let segments_path = dir.join("segment_analysis.csv");
        storage::save_segments_csv(
            &calc::segment_breakdown(&enriched.records, &loaded.assumptions),
            &segments_path,
        )?;
        eprintln!(
            "Exported {} and {}",
            ranking_path.display(),
            segments_path.display()
        );
    }
    Ok(())
}

fn cmd_chart(args: ChartArgs) -> Result<()> {
    let loaded = load(&args.input)?;
    let competitors = load_competitors(args.competitors.as_deref())?;
    let enriched = calc::enrich(
        &loaded.inputs,
        loaded.regulations.as_deref(),
        &loaded.assumptions,
    )?;

    let input = ChartInput {
        records: &enriched.records,
        regulations: loaded.regulations.as_deref(),
        competitors: competitors.as_deref(),
        assumptions: &loaded.assumptions,
        locale: viz::util::map_locale(&args.locale),
    };
    let written = viz::render_all(
        &input,
        &args.out_dir,
        args.format.ext(),
        args.width,
        args.height,
        &args.only,
    )?;
    for path in &written {
        eprintln!("Wrote chart to {}", path.display());
    }
    Ok(())
}

fn cmd_assumptions(args: AssumptionsArgs) -> Result<()> {
    let json = MarketAssumptions::default().to_json_pretty()?;
    match args.out.as_ref() {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote default assumptions to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
