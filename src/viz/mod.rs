//! Chart rendering: the fixed MSSP chart set, written to **SVG** or **PNG**.
//!
//! - One chart per [`ChartKind`], each a fixed pairing of metrics from the enriched table
//! - Country colors follow the Microsoft Office palette in table order; competitors are
//!   colored by pricing tier
//! - Locale-aware tick labels (`30,000` vs `30.000`)
//! - Output format follows the file extension (`.svg`, anything else is a bitmap)
//!
//! Charts only read the enriched records. Every plotted number was computed by [`crate::calc`].

pub mod text;
pub mod util;

use crate::calc;
use crate::config::MarketAssumptions;
use crate::models::{CompetitorEntry, CountryRecord, RegulationEntry};
use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info, warn};
use num_format::Locale;

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;

use text::{display_name, truncate_to_width};
use util::{
    axis_label, compute_left_label_area_px, office_color, padded_range, tier_color, value_range,
};

/// One-time registration for a fallback "sans-serif" font when using the `ab_glyph` text path.
/// Required because `ab_glyph` doesn't discover OS fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        // From `src/viz/mod.rs` → project root → `assets/DejaVuSans.ttf`
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

const Y_TICKS: usize = 8;
const TICK_FONT_PX: u32 = 12;

/// The charts this crate knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    /// Grouped TAM/SAM/SOM bars per country.
    MarketSize,
    /// Attractiveness score bars, best first.
    Attractiveness,
    /// Stacked bank/insurer/SME revenue bars per country.
    SegmentRevenue,
    /// Competitor clients vs. share, sized by share, colored by pricing tier.
    CompetitiveLandscape,
    /// Compliance maturity tier vs. IT market, sized by maximum penalty.
    RegulatoryMaturity,
    /// Internet penetration vs. cybersecurity spend, sized by population.
    InternetVsSpend,
    /// 2×2 panel: IT market, cyber spend, financial institutions, internet penetration.
    Dashboard,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::MarketSize,
        ChartKind::Attractiveness,
        ChartKind::SegmentRevenue,
        ChartKind::CompetitiveLandscape,
        ChartKind::RegulatoryMaturity,
        ChartKind::InternetVsSpend,
        ChartKind::Dashboard,
    ];

    /// Name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            ChartKind::MarketSize => "market-size",
            ChartKind::Attractiveness => "attractiveness",
            ChartKind::SegmentRevenue => "segment-revenue",
            ChartKind::CompetitiveLandscape => "competitive-landscape",
            ChartKind::RegulatoryMaturity => "regulatory-maturity",
            ChartKind::InternetVsSpend => "internet-vs-spend",
            ChartKind::Dashboard => "dashboard",
        }
    }

    /// Output file name without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            ChartKind::MarketSize => "market_size_comparison",
            ChartKind::Attractiveness => "country_attractiveness",
            ChartKind::SegmentRevenue => "segment_revenue_potential",
            ChartKind::CompetitiveLandscape => "competitive_landscape",
            ChartKind::RegulatoryMaturity => "regulatory_maturity",
            ChartKind::InternetVsSpend => "internet_vs_spending",
            ChartKind::Dashboard => "dashboard_overview",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::MarketSize => "MSSP Market Size by Country (TAM / SAM / SOM)",
            ChartKind::Attractiveness => "Country Attractiveness Score",
            ChartKind::SegmentRevenue => "Revenue Potential by Segment",
            ChartKind::CompetitiveLandscape => "Competitive Landscape",
            ChartKind::RegulatoryMaturity => "Regulatory Maturity vs IT Market",
            ChartKind::InternetVsSpend => "Internet Penetration vs Cybersecurity Spend",
            ChartKind::Dashboard => "MSSP Market Dashboard",
        }
    }

    /// Auxiliary table the chart cannot be drawn without, if any.
    pub fn required_table(self) -> Option<&'static str> {
        match self {
            ChartKind::Attractiveness | ChartKind::RegulatoryMaturity => Some("regulatory"),
            ChartKind::CompetitiveLandscape => Some("competitor"),
            _ => None,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == t)
            .ok_or_else(|| format!("unknown chart '{s}'"))
    }
}

/// Everything a chart may read. Records must already be enriched.
#[derive(Debug, Clone, Copy)]
pub struct ChartInput<'a> {
    pub records: &'a [CountryRecord],
    pub regulations: Option<&'a [RegulationEntry]>,
    pub competitors: Option<&'a [CompetitorEntry]>,
    pub assumptions: &'a MarketAssumptions,
    pub locale: &'static Locale,
}

impl ChartInput<'_> {
    fn missing_table(&self, kind: ChartKind) -> Option<&'static str> {
        let table = kind.required_table()?;
        let present = match table {
            "competitor" => self.competitors.is_some(),
            _ => self.regulations.is_some(),
        };
        (!present).then_some(table)
    }
}

/// Render one chart to `out_path`. The backend follows the extension: `.svg` writes SVG,
/// anything else goes through the bitmap backend.
pub fn render_chart<P: AsRef<Path>>(
    kind: ChartKind,
    input: &ChartInput<'_>,
    out_path: P,
    width: u32,
    height: u32,
) -> Result<()> {
    if input.records.is_empty() {
        return Err(anyhow!("no data to plot"));
    }
    if let Some(table) = input.missing_table(kind) {
        bail!("chart '{}' needs the {table} table", kind.name());
    }
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(&root, kind, input)?;
        root.present().map_err(|e| anyhow!("{:?}", e))?;
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_chart(&root, kind, input)?;
        root.present().map_err(|e| anyhow!("{:?}", e))?;
    }
    Ok(())
}

/// Render every chart in `only` (all charts when empty) into `out_dir` as `<stem>.<ext>`.
///
/// Charts whose auxiliary table is missing are skipped with a warning. Returns the written paths
/// in chart order.
pub fn render_all<P: AsRef<Path>>(
    input: &ChartInput<'_>,
    out_dir: P,
    ext: &str,
    width: u32,
    height: u32,
    only: &[ChartKind],
) -> Result<Vec<PathBuf>> {
    if input.records.is_empty() {
        return Err(anyhow!("no data to plot"));
    }
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let kinds: &[ChartKind] = if only.is_empty() { &ChartKind::ALL } else { only };
    let mut written = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        if let Some(table) = input.missing_table(kind) {
            warn!("chart '{}' skipped: no {table} table", kind.name());
            continue;
        }
        let path = out_dir.join(format!("{}.{ext}", kind.file_stem()));
        render_chart(kind, input, &path, width, height)
            .with_context(|| format!("rendering chart '{}'", kind.name()))?;
        info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, kind: ChartKind, input: &ChartInput<'_>) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
    let records = input.records;
    let countries: Vec<String> = records.iter().map(|r| display_name(&r.country)).collect();

    match kind {
        ChartKind::MarketSize => {
            let panel = BarPanel {
                title: kind.title(),
                y_desc: "USD millions",
                categories: &countries,
                series: vec![
                    bar_series("TAM", records, 0, |r| r.metrics.tam_m_usd),
                    bar_series("SAM", records, 1, |r| r.metrics.sam_m_usd),
                    bar_series("SOM", records, 5, |r| r.metrics.som_m_usd),
                ],
                stacked: false,
                legend: true,
            };
            draw_bars(root, &panel, input.locale)
        }
        ChartKind::Attractiveness => {
            let ranked = calc::rank_by_attractiveness(records);
            let names: Vec<String> = ranked.iter().map(|r| display_name(&r.country)).collect();
            let scores: Vec<f64> = ranked
                .iter()
                .map(|r| r.metrics.attractiveness_score.unwrap_or(0.0))
                .collect();
            let panel = BarPanel {
                title: kind.title(),
                y_desc: "Score (0-100)",
                categories: &names,
                series: vec![BarSeries {
                    name: "Attractiveness".to_string(),
                    values: scores,
                    color: office_color(5),
                }],
                stacked: false,
                legend: false,
            };
            draw_bars(root, &panel, input.locale)
        }
        ChartKind::SegmentRevenue => {
            let panel = BarPanel {
                title: kind.title(),
                y_desc: "USD millions",
                categories: &countries,
                series: vec![
                    bar_series("Banks", records, 0, |r| r.metrics.bank_revenue_m_usd),
                    bar_series("Insurers", records, 1, |r| r.metrics.insurer_revenue_m_usd),
                    bar_series("SMEs", records, 5, |r| r.metrics.sme_revenue_m_usd),
                ],
                stacked: true,
                legend: true,
            };
            draw_bars(root, &panel, input.locale)
        }
        ChartKind::CompetitiveLandscape => {
            let competitors = input.competitors.unwrap_or_default();
            let bubbles: Vec<Bubble> = competitors
                .iter()
                .map(|c| Bubble {
                    label: c.company.clone(),
                    x: c.clients_estimate as f64,
                    y: c.market_share_pct,
                    size: c.market_share_pct,
                    color: tier_color(c.pricing_tier),
                    group: c.pricing_tier.as_str().to_string(),
                })
                .collect();
            let panel = BubblePanel {
                title: kind.title(),
                x_desc: "Estimated clients",
                y_desc: "Market share (%)",
                x_range: None,
                x_ticks: None,
                legend: true,
            };
            draw_bubbles(root, &panel, &bubbles, input.locale)
        }
        ChartKind::RegulatoryMaturity => {
            let regulations = input.regulations.unwrap_or_default();
            let joined = calc::join_regulations(records, regulations, input.assumptions)?;
            let bubbles = maturity_bubbles(records, &joined);
            let panel = BubblePanel {
                title: kind.title(),
                x_desc: "Compliance maturity",
                y_desc: "IT market (USD millions)",
                x_range: Some(0.5..3.5),
                x_ticks: Some(&["Low", "Medium", "High"]),
                legend: false,
            };
            draw_bubbles(root, &panel, &bubbles, input.locale)
        }
        ChartKind::InternetVsSpend => {
            let bubbles: Vec<Bubble> = records
                .iter()
                .enumerate()
                .map(|(i, r)| Bubble {
                    label: display_name(&r.country),
                    x: r.inputs.internet_pct,
                    y: r.metrics.cyber_spend_m_usd,
                    size: r.inputs.population_m,
                    color: office_color(i),
                    group: String::new(),
                })
                .collect();
            let panel = BubblePanel {
                title: kind.title(),
                x_desc: "Internet penetration (%)",
                y_desc: "Cybersecurity spend (USD millions)",
                x_range: None,
                x_ticks: None,
                legend: false,
            };
            draw_bubbles(root, &panel, &bubbles, input.locale)
        }
        ChartKind::Dashboard => {
            let titled = root
                .titled(kind.title(), (FontFamily::SansSerif, 24))
                .map_err(|e| anyhow!("{:?}", e))?;
            let panels = titled.split_evenly((2, 2));
            let panel_metrics: [(&str, &str, fn(&CountryRecord) -> f64); 4] = [
                ("IT Market Size", "USD millions", |r| r.metrics.it_market_m_usd),
                ("Cybersecurity Spend", "USD millions", |r| r.metrics.cyber_spend_m_usd),
                ("Financial Institutions", "Banks + insurers", |r| {
                    r.inputs.financial_institutions() as f64
                }),
                ("Internet Penetration", "%", |r| r.inputs.internet_pct),
            ];
            for (k, (area, (title, y_desc, value))) in panels.iter().zip(panel_metrics).enumerate() {
                let panel = BarPanel {
                    title,
                    y_desc,
                    categories: &countries,
                    series: vec![bar_series(title, records, [0, 1, 3, 5][k], value)],
                    stacked: false,
                    legend: false,
                };
                draw_bars(area, &panel, input.locale)?;
            }
            Ok(())
        }
    }
}

struct BarSeries {
    name: String,
    values: Vec<f64>,
    color: RGBAColor,
}

fn bar_series(
    name: &str,
    records: &[CountryRecord],
    color_idx: usize,
    value: impl Fn(&CountryRecord) -> f64,
) -> BarSeries {
    BarSeries {
        name: name.to_string(),
        values: records.iter().map(value).collect(),
        color: office_color(color_idx),
    }
}

struct BarPanel<'a> {
    title: &'a str,
    y_desc: &'a str,
    categories: &'a [String],
    series: Vec<BarSeries>,
    stacked: bool,
    legend: bool,
}

/// Category label for an x coordinate; blank between categories.
fn category_label(categories: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    categories
        .get(i as usize)
        .map(|c| truncate_to_width(c, TICK_FONT_PX, 110))
        .unwrap_or_default()
}

/// Bars on an `f64` x axis, one slot per category centered on its index.
fn draw_bars<DB>(area: &DrawingArea<DB, Shift>, panel: &BarPanel<'_>, locale: &Locale) -> Result<()>
where
    DB: DrawingBackend,
{
    let n = panel.categories.len();
    let top = if panel.stacked {
        (0..n)
            .map(|i| panel.series.iter().map(|s| s.values[i]).sum::<f64>())
            .fold(0.0, f64::max)
    } else {
        panel
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max)
    };
    let y_range = value_range(top, 0.15);
    let left_label_width_px = compute_left_label_area_px(&y_range, Y_TICKS, TICK_FONT_PX, locale);
    let slots = n.max(1) as f64;

    let mut chart = ChartBuilder::on(area)
        .margin(14)
        .caption(panel.title, (FontFamily::SansSerif, 20))
        .set_label_area_size(LabelAreaPosition::Left, left_label_width_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(-0.5..(slots - 0.5), y_range)
        .map_err(|e| anyhow!("{:?}", e))?;

    let categories = panel.categories;
    let x_label_fmt = |x: &f64| category_label(categories, *x);
    let y_label_fmt = |v: &f64| axis_label(*v, locale);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc(panel.y_desc)
        .x_labels(n + 1)
        .y_labels(Y_TICKS)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, TICK_FONT_PX as i32))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    const GROUP_WIDTH: f64 = 0.8;
    let lanes = if panel.stacked { 1 } else { panel.series.len().max(1) };
    let bar_w = GROUP_WIDTH / lanes as f64;
    let mut base = vec![0.0; n];

    for (s_idx, s) in panel.series.iter().enumerate() {
        let lane = if panel.stacked { 0 } else { s_idx };
        let color = s.color;
        let bars: Vec<Rectangle<(f64, f64)>> = s
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x0 = i as f64 - GROUP_WIDTH / 2.0 + lane as f64 * bar_w;
                let y0 = base[i];
                Rectangle::new([(x0, y0), (x0 + bar_w * 0.95, y0 + v)], color.filled())
            })
            .collect();
        if panel.stacked {
            for (b, v) in base.iter_mut().zip(&s.values) {
                *b += v;
            }
        }
        let anno = chart.draw_series(bars).map_err(|e| anyhow!("{:?}", e))?;
        if panel.legend {
            anno.label(s.name.clone()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
        }
    }

    // Value labels only where there is a single bar per slot.
    if panel.series.len() == 1 && !panel.stacked {
        let value_style =
            TextStyle::from((FontFamily::SansSerif, 11)).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart
            .draw_series(panel.series[0].values.iter().enumerate().map(|(i, &v)| {
                Text::new(axis_label(v, locale), (i as f64, v), value_style.clone())
            }))
            .map_err(|e| anyhow!("{:?}", e))?;
    }

    if panel.legend {
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .label_font((FontFamily::SansSerif, 13))
            .draw()
            .map_err(|e| anyhow!("{:?}", e))?;
    }
    Ok(())
}

struct Bubble {
    label: String,
    x: f64,
    y: f64,
    /// Drives the radius; area is proportional to `size / max(size)`.
    size: f64,
    color: RGBAColor,
    /// Legend entry; bubbles sharing a group are drawn as one series.
    group: String,
}

struct BubblePanel<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    x_range: Option<Range<f64>>,
    /// Labels for x = 1, 2, 3, …
    x_ticks: Option<&'a [&'a str]>,
    legend: bool,
}

fn bubble_radius(size: f64, max_size: f64) -> u32 {
    if max_size <= 0.0 || !size.is_finite() {
        return 8;
    }
    (6.0 + 22.0 * (size.max(0.0) / max_size).sqrt()).round() as u32
}

/// Spread countries sharing a maturity tier so their bubbles do not sit on one vertical line.
fn maturity_bubbles(
    records: &[CountryRecord],
    joined: &[(&CountryRecord, &RegulationEntry)],
) -> Vec<Bubble> {
    let mut per_tier = [0usize; 4];
    for (_, reg) in joined {
        per_tier[reg.compliance_maturity.tier() as usize] += 1;
    }
    let mut seen = [0usize; 4];
    joined
        .iter()
        .map(|(r, reg)| {
            let tier = reg.compliance_maturity.tier() as usize;
            let offset = (seen[tier] as f64 - (per_tier[tier] as f64 - 1.0) / 2.0) * 0.12;
            seen[tier] += 1;
            let color_idx = records
                .iter()
                .position(|x| x.country == r.country)
                .unwrap_or(0);
            Bubble {
                label: display_name(&r.country),
                x: tier as f64 + offset,
                y: r.metrics.it_market_m_usd,
                size: reg.max_penalty_usd,
                color: office_color(color_idx),
                group: String::new(),
            }
        })
        .collect()
}

fn draw_bubbles<DB>(
    area: &DrawingArea<DB, Shift>,
    panel: &BubblePanel<'_>,
    bubbles: &[Bubble],
    locale: &Locale,
) -> Result<()>
where
    DB: DrawingBackend,
{
    let (min_x, max_x) = bubbles
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| (lo.min(b.x), hi.max(b.x)));
    let x_range = panel.x_range.clone().unwrap_or_else(|| {
        let r = padded_range(min_x, max_x, 0.15);
        r.start.max(0.0)..r.end
    });
    let max_y = bubbles.iter().map(|b| b.y).fold(0.0, f64::max);
    let y_range = value_range(max_y, 0.25);
    let max_size = bubbles.iter().map(|b| b.size).fold(0.0, f64::max);
    let left_label_width_px = compute_left_label_area_px(&y_range, Y_TICKS, TICK_FONT_PX, locale);

    let mut chart = ChartBuilder::on(area)
        .margin(14)
        .caption(panel.title, (FontFamily::SansSerif, 20))
        .set_label_area_size(LabelAreaPosition::Left, left_label_width_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(x_range.clone(), y_range)
        .map_err(|e| anyhow!("{:?}", e))?;

    let x_label_fmt = |x: &f64| match panel.x_ticks {
        Some(ticks) => {
            let i = x.round();
            if (x - i).abs() > 1e-6 || i < 1.0 {
                return String::new();
            }
            ticks.get(i as usize - 1).map(|t| t.to_string()).unwrap_or_default()
        }
        None => axis_label(*x, locale),
    };
    let y_label_fmt = |v: &f64| axis_label(*v, locale);
    let x_labels = match panel.x_ticks {
        Some(ticks) => ticks.len() + 1,
        None => 8,
    };
    chart
        .configure_mesh()
        .x_desc(panel.x_desc)
        .y_desc(panel.y_desc)
        .x_labels(x_labels)
        .y_labels(Y_TICKS)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, TICK_FONT_PX as i32))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    // Group order follows first appearance.
    let mut groups: Vec<&str> = Vec::new();
    for b in bubbles {
        if !groups.contains(&b.group.as_str()) {
            groups.push(&b.group);
        }
    }
    for group in groups {
        let members: Vec<&Bubble> = bubbles.iter().filter(|b| b.group == group).collect();
        debug!("bubble group '{group}': {} points", members.len());
        let anno = chart
            .draw_series(members.iter().map(|b| {
                let r = bubble_radius(b.size, max_size);
                EmptyElement::at((b.x, b.y))
                    + Circle::new((0, 0), r, b.color.mix(0.55).filled())
                    + Circle::new((0, 0), r, b.color.stroke_width(1))
                    + Text::new(
                        b.label.clone(),
                        (r as i32 + 4, -6),
                        (FontFamily::SansSerif, 12),
                    )
            }))
            .map_err(|e| anyhow!("{:?}", e))?;
        if panel.legend
            && !group.is_empty()
            && let Some(first) = members.first()
        {
            let color = first.color;
            anno.label(group.to_string())
                .legend(move |(x, y)| Circle::new((x + 6, y), 5, color.filled()));
        }
    }

    if panel.legend {
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .label_font((FontFamily::SansSerif, 13))
            .draw()
            .map_err(|e| anyhow!("{:?}", e))?;
    }
    Ok(())
}
