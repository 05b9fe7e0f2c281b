use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Raw socioeconomic indicators for one country, as entered or extracted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawIndicators {
    /// Population in millions.
    pub population_m: f64,
    /// GDP in billions of USD.
    pub gdp_b_usd: f64,
    /// Share of individuals using the internet (%).
    pub internet_pct: f64,
    /// Mobile subscriptions per 100 people (may exceed 100).
    pub mobile_pct: f64,
    pub banks: u32,
    pub insurers: u32,
}

impl RawIndicators {
    /// Banks plus insurers.
    pub fn financial_institutions(&self) -> u64 {
        u64::from(self.banks) + u64::from(self.insurers)
    }
}

/// One row of the reference table: a country and its raw indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryInput {
    pub country: String,
    pub inputs: RawIndicators,
}

/// Metrics derived from [`RawIndicators`] by the calculator. Money is in USD millions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub it_market_m_usd: f64,
    pub cyber_spend_m_usd: f64,
    pub sme_count: u64,
    pub bank_revenue_m_usd: f64,
    pub insurer_revenue_m_usd: f64,
    pub sme_revenue_m_usd: f64,
    pub tam_m_usd: f64,
    pub sam_m_usd: f64,
    pub som_m_usd: f64,
    pub revenue_per_capita: f64,
    pub growth_score: f64,
    /// Composite 0–100 score; `None` when the country has no regulatory row.
    pub attractiveness_score: Option<f64>,
}

/// One row of the enriched market table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub country: String,
    pub inputs: RawIndicators,
    pub compliance_maturity: Option<MaturityLevel>,
    pub metrics: DerivedMetrics,
}

/// Regulatory compliance maturity as labelled in the regulatory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MaturityLevel {
    High,
    Medium,
    Low,
    Basic,
    Developing,
    Advanced,
}

impl MaturityLevel {
    pub const ALL: [MaturityLevel; 6] = [
        MaturityLevel::High,
        MaturityLevel::Medium,
        MaturityLevel::Low,
        MaturityLevel::Basic,
        MaturityLevel::Developing,
        MaturityLevel::Advanced,
    ];

    /// Coarse 1..=3 tier used on chart axes (Low/Basic = 1, Medium/Developing = 2, High/Advanced = 3).
    pub fn tier(self) -> u8 {
        match self {
            MaturityLevel::Low | MaturityLevel::Basic => 1,
            MaturityLevel::Medium | MaturityLevel::Developing => 2,
            MaturityLevel::High | MaturityLevel::Advanced => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaturityLevel::High => "High",
            MaturityLevel::Medium => "Medium",
            MaturityLevel::Low => "Low",
            MaturityLevel::Basic => "Basic",
            MaturityLevel::Developing => "Developing",
            MaturityLevel::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaturityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| format!("unknown compliance maturity '{t}'"))
    }
}

impl TryFrom<String> for MaturityLevel {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MaturityLevel> for String {
    fn from(m: MaturityLevel) -> Self {
        m.as_str().to_string()
    }
}

/// Competitor pricing positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PricingTier {
    Premium,
    Mid,
    Budget,
}

impl PricingTier {
    pub const ALL: [PricingTier; 3] = [PricingTier::Premium, PricingTier::Mid, PricingTier::Budget];

    pub fn as_str(self) -> &'static str {
        match self {
            PricingTier::Premium => "Premium",
            PricingTier::Mid => "Mid",
            PricingTier::Budget => "Budget",
        }
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| format!("unknown pricing tier '{t}'"))
    }
}

impl TryFrom<String> for PricingTier {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PricingTier> for String {
    fn from(p: PricingTier) -> Self {
        p.as_str().to_string()
    }
}

/// Row of the regulatory table. Accepts snake_case or the original PascalCase headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationEntry {
    #[serde(alias = "Country")]
    pub country: String,
    #[serde(alias = "Compliance_Maturity")]
    pub compliance_maturity: MaturityLevel,
    #[serde(alias = "Cybersecurity_Framework")]
    pub framework: String,
    #[serde(alias = "Penalties_Max_USD")]
    pub max_penalty_usd: f64,
}

/// Row of the competitor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorEntry {
    #[serde(alias = "Company")]
    pub company: String,
    #[serde(alias = "Country")]
    pub country: String,
    #[serde(alias = "Services")]
    pub services: String,
    #[serde(alias = "Market_Share_Pct")]
    pub market_share_pct: f64,
    /// Some exports write estimates as `~150` or `1,200`; accept both.
    #[serde(alias = "Clients_Estimate", deserialize_with = "de_u32_lenient")]
    pub clients_estimate: u32,
    #[serde(alias = "Pricing_Tier")]
    pub pricing_tier: PricingTier,
}

/// Serde helper: parse `u32` from a number or from a string such as `"~150"` or `"1,200"`.
fn de_u32_lenient<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a non-negative integer, optionally written as text")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("negative value for u32"));
            }
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v < 0.0 || v > u32::MAX as f64 {
                return Err(E::custom("value out of range for u32"));
            }
            Ok(v.round() as u32)
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let cleaned: String = s
                .trim()
                .trim_start_matches('~')
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            cleaned.parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

/// Customer segment used for ARPU-based revenue breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Banks,
    Insurers,
    Smes,
}

impl Segment {
    pub fn label(self) -> &'static str {
        match self {
            Segment::Banks => "Banks",
            Segment::Insurers => "Insurers",
            Segment::Smes => "SMEs",
        }
    }
}

/// Revenue potential of one segment summed over all countries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub addressable_clients: f64,
    pub arpu_usd: f64,
    pub revenue_potential_m_usd: f64,
    pub share_pct: f64,
}

/// Concentration figures for the competitor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStructure {
    pub covered_share_pct: f64,
    pub top3_concentration_pct: f64,
    pub players: usize,
    pub uncovered_share_pct: f64,
}

/// Collection-wide sums shown in the overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTotals {
    pub population_m: f64,
    pub gdp_b_usd: f64,
    pub cyber_spend_m_usd: f64,
    pub tam_m_usd: f64,
    pub sam_m_usd: f64,
    pub som_m_usd: f64,
}

/// Selectable per-record metric, used for top-N listings and sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Population,
    Gdp,
    InternetPct,
    MobilePct,
    ItMarket,
    CyberSpend,
    Tam,
    Sam,
    Som,
    RevenuePerCapita,
    GrowthScore,
    Attractiveness,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::Population,
        Metric::Gdp,
        Metric::InternetPct,
        Metric::MobilePct,
        Metric::ItMarket,
        Metric::CyberSpend,
        Metric::Tam,
        Metric::Sam,
        Metric::Som,
        Metric::RevenuePerCapita,
        Metric::GrowthScore,
        Metric::Attractiveness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Population => "population",
            Metric::Gdp => "gdp",
            Metric::InternetPct => "internet",
            Metric::MobilePct => "mobile",
            Metric::ItMarket => "it-market",
            Metric::CyberSpend => "cyber-spend",
            Metric::Tam => "tam",
            Metric::Sam => "sam",
            Metric::Som => "som",
            Metric::RevenuePerCapita => "revenue-per-capita",
            Metric::GrowthScore => "growth",
            Metric::Attractiveness => "attractiveness",
        }
    }

    /// Read the metric off an enriched record. Only attractiveness can be absent.
    pub fn value(self, r: &CountryRecord) -> Option<f64> {
        let m = &r.metrics;
        let v = match self {
            Metric::Population => r.inputs.population_m,
            Metric::Gdp => r.inputs.gdp_b_usd,
            Metric::InternetPct => r.inputs.internet_pct,
            Metric::MobilePct => r.inputs.mobile_pct,
            Metric::ItMarket => m.it_market_m_usd,
            Metric::CyberSpend => m.cyber_spend_m_usd,
            Metric::Tam => m.tam_m_usd,
            Metric::Sam => m.sam_m_usd,
            Metric::Som => m.som_m_usd,
            Metric::RevenuePerCapita => m.revenue_per_capita,
            Metric::GrowthScore => m.growth_score,
            Metric::Attractiveness => return m.attractiveness_score,
        };
        Some(v)
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == t)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// Normalized join key for country names.
///
/// `"Côte d'Ivoire"`, `"COTE D'IVOIRE"` and `"cote_d_ivoire"` all normalize to
/// `cote_d_ivoire`; aliases then map that onto the canonical key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryKey(String);

impl CountryKey {
    /// Normalize without alias resolution.
    pub fn normalize(name: &str) -> Self {
        let mut out = String::with_capacity(name.len());
        let mut pending_sep = false;
        let mut push = |c: char, out: &mut String| {
            if c.is_alphanumeric() {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push(c);
            } else {
                pending_sep = true;
            }
        };
        for ch in name.chars().flat_map(char::to_lowercase) {
            match fold_diacritic(ch) {
                Some(folded) => folded.chars().for_each(|c| push(c, &mut out)),
                None => push(ch, &mut out),
            }
        }
        CountryKey(out)
    }

    /// Normalize, then resolve through an alias table whose keys and values are
    /// themselves normalized on lookup.
    pub fn resolve(name: &str, aliases: &BTreeMap<String, String>) -> Self {
        let key = Self::normalize(name);
        for (alias, canonical) in aliases {
            if Self::normalize(alias) == key {
                return Self::normalize(canonical);
            }
        }
        key
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ASCII replacement for the accented Latin letters found in French country names.
fn fold_diacritic(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' | 'å' => "a",
        'ç' => "c",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' | 'í' | 'ì' => "i",
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => "o",
        'ù' | 'û' | 'ü' | 'ú' => "u",
        'ÿ' => "y",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        _ => return None,
    };
    Some(folded)
}
