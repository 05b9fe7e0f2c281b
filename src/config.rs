//! Market-sizing assumptions.
//!
//! Every rate, ARPU and weight the calculator uses lives in [`MarketAssumptions`].
//! A scenario file is plain JSON and may override any subset of fields:
//!
//! ```json
//! { "sam_share": 0.5, "arpu": { "bank_usd": 65000 } }
//! ```

use crate::error::{SizingError, SizingResult};
use crate::models::MaturityLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// What to do when a country has no row in an auxiliary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Warn and leave the country out of the joined view.
    #[default]
    Drop,
    /// Abort the run.
    Fail,
}

/// Annual contract value per customer segment, in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arpu {
    pub bank_usd: f64,
    pub insurer_usd: f64,
    pub sme_usd: f64,
}

impl Default for Arpu {
    fn default() -> Self {
        Self {
            bank_usd: 50_000.0,
            insurer_usd: 30_000.0,
            sme_usd: 5_000.0,
        }
    }
}

/// Weights of the growth score: internet%, mobile%, revenue per capita, bank count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthWeights {
    pub internet: f64,
    pub mobile: f64,
    pub revenue_per_capita: f64,
    pub banks: f64,
}

impl Default for GrowthWeights {
    fn default() -> Self {
        Self {
            internet: 0.3,
            mobile: 0.2,
            revenue_per_capita: 10.0,
            banks: 0.5,
        }
    }
}

/// Points allotted to each normalized component of the attractiveness score.
/// The defaults sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractivenessWeights {
    pub market: f64,
    pub growth: f64,
    pub maturity: f64,
    pub connectivity: f64,
}

impl Default for AttractivenessWeights {
    fn default() -> Self {
        Self {
            market: 30.0,
            growth: 30.0,
            maturity: 20.0,
            connectivity: 20.0,
        }
    }
}

/// Scores on a 0..=`max` scale for each compliance maturity label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaturityScores {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    pub basic: f64,
    pub developing: f64,
    pub advanced: f64,
    /// Divisor used to normalize a maturity score to 0..=1.
    pub max: f64,
}

impl Default for MaturityScores {
    fn default() -> Self {
        Self {
            high: 10.0,
            medium: 7.0,
            low: 4.0,
            basic: 4.0,
            developing: 7.0,
            advanced: 10.0,
            max: 10.0,
        }
    }
}

impl MaturityScores {
    pub fn score(&self, level: MaturityLevel) -> f64 {
        match level {
            MaturityLevel::High => self.high,
            MaturityLevel::Medium => self.medium,
            MaturityLevel::Low => self.low,
            MaturityLevel::Basic => self.basic,
            MaturityLevel::Developing => self.developing,
            MaturityLevel::Advanced => self.advanced,
        }
    }
}

/// Policy constants for the sizing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketAssumptions {
    /// IT spending as a share of GDP.
    pub it_share_of_gdp: f64,
    /// Cybersecurity spending as a share of the IT market.
    pub cyber_share_of_it: f64,
    /// SMEs per million inhabitants (4 per 1,000 people).
    pub smes_per_million: f64,
    /// Share of SMEs that would buy managed security.
    pub sme_addressable_share: f64,
    pub arpu: Arpu,
    /// TAM → SAM.
    pub sam_share: f64,
    /// SAM → SOM.
    pub som_share: f64,
    pub growth_weights: GrowthWeights,
    pub attractiveness_weights: AttractivenessWeights,
    pub maturity_scores: MaturityScores,
    /// Alternate spellings mapped to the canonical country name used in the main table.
    pub country_aliases: BTreeMap<String, String>,
    pub join_policy: JoinPolicy,
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        let country_aliases = [
            ("Cote d'Ivoire", "Cote_Ivoire"),
            ("Ivory Coast", "Cote_Ivoire"),
            ("Burkina", "Burkina_Faso"),
        ]
        .into_iter()
        .map(|(a, c)| (a.to_string(), c.to_string()))
        .collect();
        Self {
            it_share_of_gdp: 0.025,
            cyber_share_of_it: 0.03,
            smes_per_million: 4_000.0,
            sme_addressable_share: 0.02,
            arpu: Arpu::default(),
            sam_share: 0.40,
            som_share: 0.15,
            growth_weights: GrowthWeights::default(),
            attractiveness_weights: AttractivenessWeights::default(),
            maturity_scores: MaturityScores::default(),
            country_aliases,
            join_policy: JoinPolicy::Drop,
        }
    }
}

impl MarketAssumptions {
    /// Load a scenario from JSON; fields not present keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SizingResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> SizingResult<Self> {
        let a: Self = serde_json::from_str(text)?;
        a.validate()?;
        Ok(a)
    }

    pub fn to_json_pretty(&self) -> SizingResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Shares must lie in [0, 1]; every other constant must be finite and non-negative.
    pub fn validate(&self) -> SizingResult<()> {
        let shares = [
            ("it_share_of_gdp", self.it_share_of_gdp),
            ("cyber_share_of_it", self.cyber_share_of_it),
            ("sme_addressable_share", self.sme_addressable_share),
            ("sam_share", self.sam_share),
            ("som_share", self.som_share),
        ];
        for (name, v) in shares {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(SizingError::InvalidAssumptions(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }

        let g = &self.growth_weights;
        let w = &self.attractiveness_weights;
        let m = &self.maturity_scores;
        let others = [
            ("smes_per_million", self.smes_per_million),
            ("arpu.bank_usd", self.arpu.bank_usd),
            ("arpu.insurer_usd", self.arpu.insurer_usd),
            ("arpu.sme_usd", self.arpu.sme_usd),
            ("growth_weights.internet", g.internet),
            ("growth_weights.mobile", g.mobile),
            ("growth_weights.revenue_per_capita", g.revenue_per_capita),
            ("growth_weights.banks", g.banks),
            ("attractiveness_weights.market", w.market),
            ("attractiveness_weights.growth", w.growth),
            ("attractiveness_weights.maturity", w.maturity),
            ("attractiveness_weights.connectivity", w.connectivity),
            ("maturity_scores.high", m.high),
            ("maturity_scores.medium", m.medium),
            ("maturity_scores.low", m.low),
            ("maturity_scores.basic", m.basic),
            ("maturity_scores.developing", m.developing),
            ("maturity_scores.advanced", m.advanced),
        ];
        for (name, v) in others {
            if !v.is_finite() || v < 0.0 {
                return Err(SizingError::InvalidAssumptions(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if !m.max.is_finite() || m.max <= 0.0 {
            return Err(SizingError::InvalidAssumptions(
                "maturity_scores.max must be positive".into(),
            ));
        }
        Ok(())
    }
}
