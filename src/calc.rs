//! Market-sizing calculator.
//!
//! The pipeline runs in three explicit stages so the collection-level dependency of the
//! attractiveness score stays visible:
//!
//! 1. [`derive_metrics`] computes every per-record metric from raw inputs alone.
//! 2. [`fold_maxima`] folds the finished stage-1 records into the true maxima of SAM and growth.
//! 3. [`score_attractiveness`] normalizes against those maxima.
//!
//! [`enrich`] chains the stages. Nothing in here touches the filesystem.

use crate::config::{JoinPolicy, MarketAssumptions};
use crate::error::{SizingError, SizingResult};
use crate::models::{
    CompetitorEntry, CountryInput, CountryKey, CountryRecord, DerivedMetrics, MarketStructure,
    MarketTotals, Metric, RawIndicators, RegulationEntry, Segment, SegmentSummary,
};
use log::{Level, debug, info, log, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

const USD_PER_MILLION: f64 = 1_000_000.0;

/// Maxima across the whole collection, used to normalize the attractiveness score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreMaxima {
    pub sam_m_usd: f64,
    pub growth_score: f64,
}

/// A country that had no row in an auxiliary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinMiss {
    pub country: String,
    pub table: &'static str,
}

/// Calculator output.
#[derive(Debug, Clone)]
pub struct Enriched {
    /// Same order as the input rows.
    pub records: Vec<CountryRecord>,
    pub join_misses: Vec<JoinMiss>,
}

/// Reject negative or non-finite numbers, empty names, and duplicate countries.
pub fn validate_inputs(rows: &[CountryInput], assumptions: &MarketAssumptions) -> SizingResult<()> {
    let mut seen = BTreeSet::new();
    for row in rows {
        if row.country.trim().is_empty() {
            return Err(SizingError::InvalidInput {
                country: "<unnamed>".into(),
                field: "country",
                reason: "must not be empty".into(),
            });
        }
        let r = &row.inputs;
        let numeric = [
            ("population_m", r.population_m),
            ("gdp_b_usd", r.gdp_b_usd),
            ("internet_pct", r.internet_pct),
            ("mobile_pct", r.mobile_pct),
        ];
        for (field, v) in numeric {
            if !v.is_finite() {
                return Err(SizingError::InvalidInput {
                    country: row.country.clone(),
                    field,
                    reason: format!("is not a finite number ({v})"),
                });
            }
            if v < 0.0 {
                return Err(SizingError::InvalidInput {
                    country: row.country.clone(),
                    field,
                    reason: format!("must be non-negative, got {v}"),
                });
            }
        }
        let key = CountryKey::resolve(&row.country, &assumptions.country_aliases);
        if key.as_str().is_empty() {
            return Err(SizingError::InvalidInput {
                country: row.country.clone(),
                field: "country",
                reason: "has no letters or digits to match on".to_string(),
            });
        }
        if !seen.insert(key) {
            return Err(SizingError::DuplicateCountry(row.country.clone()));
        }
    }
    Ok(())
}

/// Stage 1: every metric that depends on a single record's raw inputs.
/// `attractiveness_score` is left unset.
pub fn derive_metrics(r: &RawIndicators, a: &MarketAssumptions) -> DerivedMetrics {
    let it_market_m_usd = r.gdp_b_usd * a.it_share_of_gdp * 1000.0;
    let cyber_spend_m_usd = it_market_m_usd * a.cyber_share_of_it;
    let sme_count = (r.population_m * a.smes_per_million).floor() as u64;

    let bank_usd = r.banks as f64 * a.arpu.bank_usd;
    let insurer_usd = r.insurers as f64 * a.arpu.insurer_usd;
    let sme_usd = a.sme_addressable_share * sme_count as f64 * a.arpu.sme_usd;

    let tam_m_usd = (bank_usd + insurer_usd + sme_usd) / USD_PER_MILLION;
    let sam_m_usd = tam_m_usd * a.sam_share;
    let som_m_usd = sam_m_usd * a.som_share;

    let revenue_per_capita = if r.population_m > 0.0 {
        cyber_spend_m_usd / r.population_m
    } else {
        0.0
    };

    let w = &a.growth_weights;
    let growth_score = r.internet_pct * w.internet
        + r.mobile_pct * w.mobile
        + revenue_per_capita * w.revenue_per_capita
        + r.banks as f64 * w.banks;

    DerivedMetrics {
        it_market_m_usd,
        cyber_spend_m_usd,
        sme_count,
        bank_revenue_m_usd: bank_usd / USD_PER_MILLION,
        insurer_revenue_m_usd: insurer_usd / USD_PER_MILLION,
        sme_revenue_m_usd: sme_usd / USD_PER_MILLION,
        tam_m_usd,
        sam_m_usd,
        som_m_usd,
        revenue_per_capita,
        growth_score,
        attractiveness_score: None,
    }
}

/// Stage 2: maxima over the complete stage-1 collection.
pub fn fold_maxima(records: &[CountryRecord]) -> ScoreMaxima {
    records.iter().fold(ScoreMaxima::default(), |acc, r| ScoreMaxima {
        sam_m_usd: acc.sam_m_usd.max(r.metrics.sam_m_usd),
        growth_score: acc.growth_score.max(r.metrics.growth_score),
    })
}

/// Stage 3: composite 0–100 score. `None` when the record has no compliance maturity.
/// A component whose maximum is zero contributes nothing.
pub fn score_attractiveness(
    record: &CountryRecord,
    maxima: &ScoreMaxima,
    a: &MarketAssumptions,
) -> Option<f64> {
    let maturity = record.compliance_maturity?;
    let w = &a.attractiveness_weights;
    let norm = |v: f64, max: f64| if max > 0.0 { v / max } else { 0.0 };

    let market = norm(record.metrics.sam_m_usd, maxima.sam_m_usd) * w.market;
    let growth = norm(record.metrics.growth_score, maxima.growth_score) * w.growth;
    let maturity =
        a.maturity_scores.score(maturity) / a.maturity_scores.max * w.maturity;
    let connectivity = record.inputs.internet_pct / 100.0 * w.connectivity;
    Some(market + growth + maturity + connectivity)
}

/// Run all three stages over the reference table.
///
/// With `regulations == None` no record gets a maturity or attractiveness score.
/// Otherwise countries missing from the regulatory table are handled per
/// `assumptions.join_policy` and listed in [`Enriched::join_misses`].
pub fn enrich(
    rows: &[CountryInput],
    regulations: Option<&[RegulationEntry]>,
    assumptions: &MarketAssumptions,
) -> SizingResult<Enriched> {
    validate_inputs(rows, assumptions)?;

    let reg_index = regulations.map(|regs| index_by_country(regs, |e| e.country.as_str(), assumptions));
    let mut join_misses = Vec::new();

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let compliance_maturity = match &reg_index {
            Some(index) => {
                let key = CountryKey::resolve(&row.country, &assumptions.country_aliases);
                match index.get(&key) {
                    Some(entry) => Some(entry.compliance_maturity),
                    None => {
                        on_join_miss(&row.country, "regulatory", assumptions.join_policy, Level::Warn)?;
                        join_misses.push(JoinMiss {
                            country: row.country.clone(),
                            table: "regulatory",
                        });
                        None
                    }
                }
            }
            None => None,
        };
        let metrics = derive_metrics(&row.inputs, assumptions);
        debug!(
            "{}: it={:.2} cyber={:.2} tam={:.3} sam={:.3} growth={:.2}",
            row.country,
            metrics.it_market_m_usd,
            metrics.cyber_spend_m_usd,
            metrics.tam_m_usd,
            metrics.sam_m_usd,
            metrics.growth_score
        );
        records.push(CountryRecord {
            country: row.country.clone(),
            inputs: row.inputs,
            compliance_maturity,
            metrics,
        });
    }

    let maxima = fold_maxima(&records);
    let scores: Vec<Option<f64>> = records
        .iter()
        .map(|r| score_attractiveness(r, &maxima, assumptions))
        .collect();
    for (record, score) in records.iter_mut().zip(scores) {
        record.metrics.attractiveness_score = score;
    }

    if regulations.is_none() {
        warn!("no regulatory table supplied; attractiveness scores are not computed");
    }
    info!(
        "enriched {} countries (max SAM {:.3}M USD, max growth {:.2})",
        records.len(),
        maxima.sam_m_usd,
        maxima.growth_score
    );
    Ok(Enriched {
        records,
        join_misses,
    })
}

/// `level` is `Warn` where a miss is first discovered and `Debug` in views that re-join
/// records already reported by [`enrich`].
fn on_join_miss(
    country: &str,
    table: &'static str,
    policy: JoinPolicy,
    level: Level,
) -> SizingResult<()> {
    match policy {
        JoinPolicy::Fail => Err(SizingError::JoinMiss {
            country: country.to_string(),
            table,
        }),
        JoinPolicy::Drop => {
            log!(level, "{country}: no row in the {table} table, excluded from joined views");
            Ok(())
        }
    }
}

fn index_by_country<'a, T>(
    rows: &'a [T],
    country: impl Fn(&T) -> &str,
    assumptions: &MarketAssumptions,
) -> BTreeMap<CountryKey, &'a T> {
    let mut index = BTreeMap::new();
    for row in rows {
        let name = country(row);
        let key = CountryKey::resolve(name, &assumptions.country_aliases);
        if index.insert(key, row).is_some() {
            warn!("{name}: duplicate row in auxiliary table, keeping the last one");
        }
    }
    index
}

/// Inner join of records with the regulatory table, in record order.
pub fn join_regulations<'a>(
    records: &'a [CountryRecord],
    regulations: &'a [RegulationEntry],
    assumptions: &MarketAssumptions,
) -> SizingResult<Vec<(&'a CountryRecord, &'a RegulationEntry)>> {
    let index = index_by_country(regulations, |e| e.country.as_str(), assumptions);
    let mut out = Vec::with_capacity(records.len());
    for r in records {
        let key = CountryKey::resolve(&r.country, &assumptions.country_aliases);
        match index.get(&key) {
            Some(entry) => out.push((r, *entry)),
            None => on_join_miss(&r.country, "regulatory", assumptions.join_policy, Level::Debug)?,
        }
    }
    Ok(out)
}

/// Competitors grouped under each record they operate in, in record order.
/// Records with no competitor row are omitted.
pub fn join_competitors<'a>(
    records: &'a [CountryRecord],
    competitors: &'a [CompetitorEntry],
    assumptions: &MarketAssumptions,
) -> SizingResult<Vec<(&'a CountryRecord, Vec<&'a CompetitorEntry>)>> {
    let mut by_key: BTreeMap<CountryKey, Vec<&CompetitorEntry>> = BTreeMap::new();
    for c in competitors {
        by_key
            .entry(CountryKey::resolve(&c.country, &assumptions.country_aliases))
            .or_default()
            .push(c);
    }
    let mut out = Vec::with_capacity(records.len());
    for r in records {
        let key = CountryKey::resolve(&r.country, &assumptions.country_aliases);
        match by_key.remove(&key) {
            Some(list) => out.push((r, list)),
            None => on_join_miss(&r.country, "competitor", assumptions.join_policy, Level::Warn)?,
        }
    }
    for (key, list) in by_key {
        debug!("{} competitor rows for '{key}' match no country in the market table", list.len());
    }
    Ok(out)
}

/// Sums over all records.
pub fn totals(records: &[CountryRecord]) -> MarketTotals {
    records.iter().fold(MarketTotals::default(), |mut t, r| {
        t.population_m += r.inputs.population_m;
        t.gdp_b_usd += r.inputs.gdp_b_usd;
        t.cyber_spend_m_usd += r.metrics.cyber_spend_m_usd;
        t.tam_m_usd += r.metrics.tam_m_usd;
        t.sam_m_usd += r.metrics.sam_m_usd;
        t.som_m_usd += r.metrics.som_m_usd;
        t
    })
}

/// Revenue potential per customer segment across all countries.
pub fn segment_breakdown(records: &[CountryRecord], a: &MarketAssumptions) -> Vec<SegmentSummary> {
    let banks: f64 = records.iter().map(|r| r.inputs.banks as f64).sum();
    let insurers: f64 = records.iter().map(|r| r.inputs.insurers as f64).sum();
    let smes: f64 = records.iter().map(|r| r.metrics.sme_count as f64).sum();

    let rows = [
        (Segment::Banks, banks, a.arpu.bank_usd),
        (Segment::Insurers, insurers, a.arpu.insurer_usd),
        (Segment::Smes, smes * a.sme_addressable_share, a.arpu.sme_usd),
    ];
    let revenue: Vec<f64> = rows
        .iter()
        .map(|(_, clients, arpu)| clients * arpu / USD_PER_MILLION)
        .collect();
    let total: f64 = revenue.iter().sum();

    rows.iter()
        .zip(revenue)
        .map(|((segment, clients, arpu), rev)| SegmentSummary {
            segment: *segment,
            addressable_clients: *clients,
            arpu_usd: *arpu,
            revenue_potential_m_usd: rev,
            share_pct: if total > 0.0 { rev / total * 100.0 } else { 0.0 },
        })
        .collect()
}

/// The segment with the largest revenue potential.
pub fn top_segment(segments: &[SegmentSummary]) -> Option<&SegmentSummary> {
    segments.iter().max_by(|a, b| {
        a.revenue_potential_m_usd
            .partial_cmp(&b.revenue_potential_m_usd)
            .unwrap_or(Ordering::Equal)
    })
}

/// Coverage and concentration of the competitor table.
pub fn market_structure(competitors: &[CompetitorEntry]) -> MarketStructure {
    let covered: f64 = competitors.iter().map(|c| c.market_share_pct).sum();
    let top3: f64 = top_competitors(competitors, 3)
        .iter()
        .map(|c| c.market_share_pct)
        .sum();
    MarketStructure {
        covered_share_pct: covered,
        top3_concentration_pct: top3,
        players: competitors.len(),
        uncovered_share_pct: (100.0 - covered).max(0.0),
    }
}

/// Competitors sorted by market share, largest first; ties keep table order.
pub fn top_competitors(competitors: &[CompetitorEntry], n: usize) -> Vec<&CompetitorEntry> {
    let mut sorted: Vec<&CompetitorEntry> = competitors.iter().collect();
    sorted.sort_by(|a, b| {
        b.market_share_pct
            .partial_cmp(&a.market_share_pct)
            .unwrap_or(Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}

/// Records with an attractiveness score, best first; ties are broken by country name.
pub fn rank_by_attractiveness(records: &[CountryRecord]) -> Vec<&CountryRecord> {
    let ranked = top_n_by(records, Metric::Attractiveness, records.len());
    if ranked.len() < records.len() {
        debug!(
            "{} countries without attractiveness score left out of the ranking",
            records.len() - ranked.len()
        );
    }
    ranked
}

/// The `n` records with the largest value of `metric`. Records where the metric is
/// absent are skipped.
pub fn top_n_by(records: &[CountryRecord], metric: Metric, n: usize) -> Vec<&CountryRecord> {
    let mut scored: Vec<(f64, &CountryRecord)> = records
        .iter()
        .filter_map(|r| metric.value(r).map(|v| (v, r)))
        .collect();
    scored.sort_by(|(va, ra), (vb, rb)| {
        vb.partial_cmp(va)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ra.country.cmp(&rb.country))
    });
    scored.into_iter().take(n).map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn senegal() -> RawIndicators {
        RawIndicators {
            population_m: 17.2,
            gdp_b_usd: 27.6,
            internet_pct: 58.2,
            mobile_pct: 115.5,
            banks: 29,
            insurers: 30,
        }
    }

    #[test]
    fn zero_population_gives_zero_revenue_per_capita() {
        let mut r = senegal();
        r.population_m = 0.0;
        let m = derive_metrics(&r, &MarketAssumptions::default());
        assert_eq!(m.revenue_per_capita, 0.0);
        assert_eq!(m.sme_count, 0);
        assert!(m.growth_score.is_finite());
    }

    #[test]
    fn segment_revenues_sum_to_tam() {
        let m = derive_metrics(&senegal(), &MarketAssumptions::default());
        let sum = m.bank_revenue_m_usd + m.insurer_revenue_m_usd + m.sme_revenue_m_usd;
        assert!((sum - m.tam_m_usd).abs() < 1e-12);
    }

    #[test]
    fn zero_maxima_contribute_nothing() {
        let record = CountryRecord {
            country: "Nowhere".into(),
            inputs: RawIndicators {
                population_m: 0.0,
                gdp_b_usd: 0.0,
                internet_pct: 50.0,
                mobile_pct: 0.0,
                banks: 0,
                insurers: 0,
            },
            compliance_maturity: Some(crate::models::MaturityLevel::High),
            metrics: derive_metrics(
                &RawIndicators {
                    population_m: 0.0,
                    gdp_b_usd: 0.0,
                    internet_pct: 0.0,
                    mobile_pct: 0.0,
                    banks: 0,
                    insurers: 0,
                },
                &MarketAssumptions::default(),
            ),
        };
        let score =
            score_attractiveness(&record, &ScoreMaxima::default(), &MarketAssumptions::default())
                .unwrap();
        // maturity 10/10*20 + internet 50/100*20
        assert!((score - 30.0).abs() < 1e-9);
    }
}
