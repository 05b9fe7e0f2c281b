use crate::error::SizingResult;
use crate::models::{CountryRecord, DerivedMetrics, MaturityLevel, RawIndicators, SegmentSummary};
use csv::WriterBuilder;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Flat CSV layout of an enriched record (one column per field).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnrichedRow {
    country: String,
    population_m: f64,
    gdp_b_usd: f64,
    internet_pct: f64,
    mobile_pct: f64,
    banks: u32,
    insurers: u32,
    compliance_maturity: Option<MaturityLevel>,
    it_market_m_usd: f64,
    cyber_spend_m_usd: f64,
    sme_count: u64,
    bank_revenue_m_usd: f64,
    insurer_revenue_m_usd: f64,
    sme_revenue_m_usd: f64,
    tam_m_usd: f64,
    sam_m_usd: f64,
    som_m_usd: f64,
    revenue_per_capita: f64,
    growth_score: f64,
    attractiveness_score: Option<f64>,
}

impl From<&CountryRecord> for EnrichedRow {
    fn from(r: &CountryRecord) -> Self {
        let i = &r.inputs;
        let m = &r.metrics;
        Self {
            country: guard_formula(&r.country),
            population_m: i.population_m,
            gdp_b_usd: i.gdp_b_usd,
            internet_pct: i.internet_pct,
            mobile_pct: i.mobile_pct,
            banks: i.banks,
            insurers: i.insurers,
            compliance_maturity: r.compliance_maturity,
            it_market_m_usd: m.it_market_m_usd,
            cyber_spend_m_usd: m.cyber_spend_m_usd,
            sme_count: m.sme_count,
            bank_revenue_m_usd: m.bank_revenue_m_usd,
            insurer_revenue_m_usd: m.insurer_revenue_m_usd,
            sme_revenue_m_usd: m.sme_revenue_m_usd,
            tam_m_usd: m.tam_m_usd,
            sam_m_usd: m.sam_m_usd,
            som_m_usd: m.som_m_usd,
            revenue_per_capita: m.revenue_per_capita,
            growth_score: m.growth_score,
            attractiveness_score: m.attractiveness_score,
        }
    }
}

impl From<EnrichedRow> for CountryRecord {
    fn from(r: EnrichedRow) -> Self {
        Self {
            country: unguard_formula(&r.country),
            inputs: RawIndicators {
                population_m: r.population_m,
                gdp_b_usd: r.gdp_b_usd,
                internet_pct: r.internet_pct,
                mobile_pct: r.mobile_pct,
                banks: r.banks,
                insurers: r.insurers,
            },
            compliance_maturity: r.compliance_maturity,
            metrics: DerivedMetrics {
                it_market_m_usd: r.it_market_m_usd,
                cyber_spend_m_usd: r.cyber_spend_m_usd,
                sme_count: r.sme_count,
                bank_revenue_m_usd: r.bank_revenue_m_usd,
                insurer_revenue_m_usd: r.insurer_revenue_m_usd,
                sme_revenue_m_usd: r.sme_revenue_m_usd,
                tam_m_usd: r.tam_m_usd,
                sam_m_usd: r.sam_m_usd,
                som_m_usd: r.som_m_usd,
                revenue_per_capita: r.revenue_per_capita,
                growth_score: r.growth_score,
                attractiveness_score: r.attractiveness_score,
            },
        }
    }
}

/// Spreadsheet apps execute cells starting with these characters as formulas.
fn is_formula_start(s: &str) -> bool {
    matches!(s.chars().next(), Some('=' | '+' | '-' | '@'))
}

/// Prefix a single quote so the cell is read as text.
fn guard_formula(s: &str) -> String {
    if is_formula_start(s) {
        format!("'{s}")
    } else {
        s.to_string()
    }
}

fn unguard_formula(s: &str) -> String {
    match s.strip_prefix('\'') {
        Some(rest) if is_formula_start(rest) => rest.to_string(),
        _ => s.to_string(),
    }
}

/// Save enriched records as CSV with header.
pub fn save_csv<P: AsRef<Path>>(records: &[CountryRecord], path: P) -> SizingResult<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new().from_path(path)?;
    for r in records {
        wtr.serialize(EnrichedRow::from(r))?;
    }
    wtr.flush()?;
    info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read back a table written by [`save_csv`].
pub fn load_csv<P: AsRef<Path>>(path: P) -> SizingResult<Vec<CountryRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.deserialize::<EnrichedRow>() {
        out.push(CountryRecord::from(row?));
    }
    Ok(out)
}

/// Save enriched records as a pretty JSON array.
pub fn save_json<P: AsRef<Path>>(records: &[CountryRecord], path: P) -> SizingResult<()> {
    let path = path.as_ref();
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(records)?;
    f.write_all(s.as_bytes())?;
    info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

pub fn load_json<P: AsRef<Path>>(path: P) -> SizingResult<Vec<CountryRecord>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Ranked records, best first, with a 1-based `rank` column.
pub fn save_ranking_csv<P: AsRef<Path>>(ranked: &[&CountryRecord], path: P) -> SizingResult<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record([
        "rank",
        "country",
        "attractiveness_score",
        "sam_m_usd",
        "growth_score",
        "compliance_maturity",
        "internet_pct",
        "banks",
        "insurers",
    ])?;
    for (i, r) in ranked.iter().enumerate() {
        wtr.serialize((
            i + 1,
            guard_formula(&r.country),
            r.metrics.attractiveness_score,
            r.metrics.sam_m_usd,
            r.metrics.growth_score,
            r.compliance_maturity.map(|m| m.as_str()),
            r.inputs.internet_pct,
            r.inputs.banks,
            r.inputs.insurers,
        ))?;
    }
    wtr.flush()?;
    info!("wrote ranking of {} countries to {}", ranked.len(), path.display());
    Ok(())
}

pub fn save_segments_csv<P: AsRef<Path>>(segments: &[SegmentSummary], path: P) -> SizingResult<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record([
        "segment",
        "addressable_clients",
        "arpu_usd",
        "revenue_potential_m_usd",
        "share_pct",
    ])?;
    for s in segments {
        wtr.serialize((
            s.segment.label(),
            s.addressable_clients,
            s.arpu_usd,
            s.revenue_potential_m_usd,
            s.share_pct,
        ))?;
    }
    wtr.flush()?;
    info!("wrote segment breakdown to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_guard_is_reversible() {
        assert_eq!(guard_formula("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(guard_formula("Senegal"), "Senegal");
        assert_eq!(unguard_formula("'=SUM(A1)"), "=SUM(A1)");
        assert_eq!(unguard_formula("'quoted"), "'quoted");
    }
}
