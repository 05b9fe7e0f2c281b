//! Console report sections.
//!
//! Every function here formats values already computed by [`crate::calc`]; none derives a metric.

use crate::calc;
use crate::config::MarketAssumptions;
use crate::error::SizingResult;
use crate::models::{
    CompetitorEntry, CountryRecord, MarketStructure, MaturityLevel, RegulationEntry,
    SegmentSummary,
};
use log::warn;
use num_format::{Locale, ToFormattedString};
use std::fmt::Write as _;
use std::str::FromStr;

const RULE_WIDTH: usize = 70;

/// Report sections in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Overview,
    Segments,
    Regulatory,
    Competition,
    Ranking,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Overview,
        Section::Segments,
        Section::Regulatory,
        Section::Competition,
        Section::Ranking,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Segments => "segments",
            Section::Regulatory => "regulatory",
            Section::Competition => "competition",
            Section::Ranking => "ranking",
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|sec| sec.name() == t)
            .ok_or_else(|| format!("unknown report section '{s}'"))
    }
}

/// Everything a report needs. Auxiliary tables are optional.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub records: &'a [CountryRecord],
    pub regulations: Option<&'a [RegulationEntry]>,
    pub competitors: Option<&'a [CompetitorEntry]>,
    pub assumptions: &'a MarketAssumptions,
    pub locale: &'static Locale,
}

/// Number with locale thousands separators and `prec` decimals.
pub fn fmt_num(v: f64, prec: usize, locale: &Locale) -> String {
    if !v.is_finite() {
        return "NA".to_string();
    }
    let s = format!("{:.*}", prec, v.abs());
    let (int_part, frac) = s.split_once('.').unwrap_or((s.as_str(), ""));
    let Ok(int_val) = int_part.parse::<u64>() else {
        return format!("{:.*}", prec, v);
    };
    let mut out = String::new();
    if v < 0.0 && s.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&int_val.to_formatted_string(locale));
    if prec > 0 {
        out.push_str(locale.decimal());
        out.push_str(frac);
    }
    out
}

fn banner(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  {title}");
    let _ = writeln!(out, "{rule}");
}

fn footer(out: &mut String) {
    let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
}

/// Totals and the three largest markets by SAM.
pub fn overview(records: &[CountryRecord], locale: &Locale) -> String {
    let t = calc::totals(records);
    let mut out = String::new();
    banner(&mut out, "MSSP MARKET OVERVIEW - FRANCOPHONE AFRICA");
    let _ = writeln!(out, "\nKey figures:");
    let _ = writeln!(out, "  - Total population: {}M", fmt_num(t.population_m, 1, locale));
    let _ = writeln!(out, "  - Combined GDP: ${}B", fmt_num(t.gdp_b_usd, 1, locale));
    let _ = writeln!(
        out,
        "  - Current cybersecurity spend: ${}M",
        fmt_num(t.cyber_spend_m_usd, 1, locale)
    );
    let _ = writeln!(out, "\nMarket sizing:");
    let _ = writeln!(out, "  - TAM (Total Addressable Market): ${}M", fmt_num(t.tam_m_usd, 1, locale));
    let _ = writeln!(out, "  - SAM (Serviceable Addressable Market): ${}M", fmt_num(t.sam_m_usd, 1, locale));
    let _ = writeln!(out, "  - SOM (Serviceable Obtainable Market): ${}M", fmt_num(t.som_m_usd, 1, locale));

    let _ = writeln!(out, "\nTop 3 markets by SAM:");
    for (i, r) in calc::top_n_by(records, crate::models::Metric::Sam, 3).iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}: ${}M (growth score {})",
            i + 1,
            r.country,
            fmt_num(r.metrics.sam_m_usd, 1, locale),
            fmt_num(r.metrics.growth_score, 0, locale)
        );
    }
    footer(&mut out);
    out
}

/// Revenue potential by customer segment.
pub fn segments(segments: &[SegmentSummary], locale: &Locale) -> String {
    let mut out = String::new();
    banner(&mut out, "CUSTOMER SEGMENT ANALYSIS");
    let _ = writeln!(out, "\nPotential by segment:");
    for s in segments {
        let _ = writeln!(out, "\n  {}:", s.segment.label());
        let _ = writeln!(out, "    - Addressable clients: {}", fmt_num(s.addressable_clients, 0, locale));
        let _ = writeln!(out, "    - Average ARPU: ${}/year", fmt_num(s.arpu_usd, 0, locale));
        let _ = writeln!(out, "    - Revenue potential: ${}M", fmt_num(s.revenue_potential_m_usd, 1, locale));
        let _ = writeln!(out, "    - Share of market: {}%", fmt_num(s.share_pct, 1, locale));
    }
    if let Some(top) = calc::top_segment(segments) {
        let _ = writeln!(
            out,
            "\nRecommendation: prioritise the '{}' segment for the initial roll-out.",
            top.segment.label()
        );
    }
    footer(&mut out);
    out
}

/// Regulatory view over the records that matched the regulatory table.
pub fn regulatory(joined: &[(&CountryRecord, &RegulationEntry)], locale: &Locale) -> String {
    let mut out = String::new();
    banner(&mut out, "REGULATORY LANDSCAPE");
    let _ = writeln!(out, "\nRegulatory maturity by country:");
    for (r, reg) in joined {
        let _ = writeln!(out, "\n  {}:", r.country);
        let _ = writeln!(out, "    - Maturity: {}", reg.compliance_maturity);
        let _ = writeln!(out, "    - Framework: {}", reg.framework);
        let _ = writeln!(out, "    - Maximum penalty: ${}", fmt_num(reg.max_penalty_usd, 0, locale));
        let _ = writeln!(out, "    - Market potential (SAM): ${}M", fmt_num(r.metrics.sam_m_usd, 1, locale));
    }
    let high: Vec<&str> = joined
        .iter()
        .filter(|(_, reg)| {
            matches!(
                reg.compliance_maturity,
                MaturityLevel::High | MaturityLevel::Advanced
            )
        })
        .map(|(r, _)| r.country.as_str())
        .collect();
    let _ = writeln!(
        out,
        "\nHigh-maturity markets (stronger security awareness): {}",
        if high.is_empty() { "none".to_string() } else { high.join(", ") }
    );
    footer(&mut out);
    out
}

/// Market structure, leading competitors and per-country presence.
pub fn competition(
    structure: &MarketStructure,
    top: &[&CompetitorEntry],
    by_country: &[(&CountryRecord, Vec<&CompetitorEntry>)],
    locale: &Locale,
) -> String {
    let mut out = String::new();
    banner(&mut out, "COMPETITIVE LANDSCAPE");
    let _ = writeln!(out, "\nMarket structure:");
    let _ = writeln!(out, "  - Share covered by listed players: {}%", fmt_num(structure.covered_share_pct, 0, locale));
    let _ = writeln!(out, "  - Concentration (top 3): {}%", fmt_num(structure.top3_concentration_pct, 0, locale));
    let _ = writeln!(out, "  - Number of players: {}", structure.players);

    let _ = writeln!(out, "\nTop {} competitors:", top.len());
    for (i, c) in top.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} ({})", i + 1, c.company, c.country);
        let _ = writeln!(out, "    - Services: {}", c.services);
        let _ = writeln!(out, "    - Market share: {}%", fmt_num(c.market_share_pct, 0, locale));
        let _ = writeln!(out, "    - Estimated clients: ~{}", (c.clients_estimate as u64).to_formatted_string(locale));
        let _ = writeln!(out, "    - Pricing tier: {}", c.pricing_tier);
    }

    if !by_country.is_empty() {
        let _ = writeln!(out, "\nPresence by market:");
        for (r, list) in by_country {
            let names: Vec<&str> = list.iter().map(|c| c.company.as_str()).collect();
            let _ = writeln!(
                out,
                "  - {} (SAM ${}M): {}",
                r.country,
                fmt_num(r.metrics.sam_m_usd, 1, locale),
                names.join(", ")
            );
        }
    }

    let _ = writeln!(
        out,
        "\nOpportunity: {}% of the market is not covered by the major players.",
        fmt_num(structure.uncovered_share_pct, 0, locale)
    );
    footer(&mut out);
    out
}

/// Attractiveness ranking with a three-phase deployment plan.
pub fn ranking(ranked: &[&CountryRecord], locale: &Locale) -> String {
    let mut out = String::new();
    banner(&mut out, "COUNTRY RANKING BY ATTRACTIVENESS");
    let _ = writeln!(out, "\nFinal ranking:");
    for (i, r) in ranked.iter().enumerate() {
        let score = r.metrics.attractiveness_score.unwrap_or(f64::NAN);
        let _ = writeln!(out, "\n  {}. {} - score {}/100", i + 1, r.country, fmt_num(score, 1, locale));
        let _ = writeln!(out, "    - Market potential (SAM): ${}M", fmt_num(r.metrics.sam_m_usd, 1, locale));
        if let Some(m) = r.compliance_maturity {
            let _ = writeln!(out, "    - Regulatory maturity: {m}");
        }
        let _ = writeln!(out, "    - Internet penetration: {}%", fmt_num(r.inputs.internet_pct, 1, locale));
        let _ = writeln!(out, "    - Banks: {} | Insurers: {}", r.inputs.banks, r.inputs.insurers);
    }

    const PHASES: [&str; 3] = ["0-12 months", "12-24 months", "24-36 months"];
    if !ranked.is_empty() {
        let _ = writeln!(out, "\nDeployment plan:");
        for (i, (phase, r)) in PHASES.iter().zip(ranked.iter()).enumerate() {
            let _ = writeln!(out, "  Phase {} ({phase}): {}", i + 1, r.country);
        }
    }
    footer(&mut out);
    out
}

/// Render one section. `Ok(None)` means the section needs an auxiliary table that was not
/// supplied, or (for the ranking) records that were never scored; the caller decides how to
/// surface the skip.
pub fn render(section: Section, input: &ReportInput<'_>) -> SizingResult<Option<String>> {
    let locale = input.locale;
    let text = match section {
        Section::Overview => overview(input.records, locale),
        Section::Segments => segments(&calc::segment_breakdown(input.records, input.assumptions), locale),
        Section::Regulatory => {
            let Some(regs) = input.regulations else {
                return Ok(None);
            };
            let joined = calc::join_regulations(input.records, regs, input.assumptions)?;
            regulatory(&joined, locale)
        }
        Section::Competition => {
            let Some(comps) = input.competitors else {
                return Ok(None);
            };
            let by_country = calc::join_competitors(input.records, comps, input.assumptions)?;
            competition(
                &calc::market_structure(comps),
                &calc::top_competitors(comps, 5),
                &by_country,
                locale,
            )
        }
        Section::Ranking => {
            if !input
                .records
                .iter()
                .any(|r| r.metrics.attractiveness_score.is_some())
            {
                return Ok(None);
            }
            ranking(&calc::rank_by_attractiveness(input.records), locale)
        }
    };
    Ok(Some(text))
}

/// Render the requested sections in order. Sections whose auxiliary table is missing are
/// replaced by a one-line notice instead of failing the run.
pub fn render_all(sections: &[Section], input: &ReportInput<'_>) -> SizingResult<String> {
    let mut out = String::new();
    for &section in sections {
        match render(section, input)? {
            Some(text) => {
                out.push_str(&text);
                out.push('\n');
            }
            None => {
                let reason = match section {
                    Section::Competition => "no competitor table supplied",
                    Section::Ranking => "no attractiveness scores (needs a regulatory table)",
                    _ => "no regulatory table supplied",
                };
                warn!("report section '{}' skipped: {reason}", section.name());
                let _ = writeln!(out, "[{}] skipped: {reason}\n", section.name());
            }
        }
    }
    Ok(out)
}
