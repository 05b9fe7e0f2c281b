//! Reference data: the built-in country table and loaders for the tabular inputs.
//!
//! ### Accepted layouts
//! - Raw inputs: `country,population_m,gdp_b_usd,internet_pct,mobile_pct,banks,insurers`
//!   (the `Country,Population_M,GDP_B_USD,...` headers of the original spreadsheet work too;
//!   extra columns are ignored).
//! - Institution counts: `country,banks,insurers`.
//! - World Bank exports, either tidy (`country_name, indicator_id, indicator_name, year, value`,
//!   as written by `wbi get --out`) or DataBank wide (`Country Name, Series Name, 2024 [YR2024]`).

use crate::config::MarketAssumptions;
use crate::error::{SizingError, SizingResult};
use crate::models::{CompetitorEntry, CountryInput, CountryKey, RawIndicators, RegulationEntry};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

/// The six markets studied, with hand-entered indicators.
pub fn builtin_inputs() -> Vec<CountryInput> {
    // (country, population M, GDP B USD, internet %, mobile per 100, banks, insurers)
    const TABLE: [(&str, f64, f64, f64, f64, u32, u32); 6] = [
        ("Senegal", 17.2, 27.6, 58.2, 115.5, 29, 30),
        ("Cote_Ivoire", 27.5, 70.0, 47.0, 142.3, 29, 32),
        ("Cameroon", 27.9, 44.9, 38.5, 89.7, 19, 30),
        ("Morocco", 37.5, 134.2, 84.1, 130.2, 32, 26),
        ("Tunisia", 12.0, 46.8, 71.5, 128.9, 26, 22),
        ("Burkina_Faso", 22.1, 19.7, 22.0, 106.8, 16, 17),
    ];
    TABLE
        .iter()
        .map(
            |&(country, population_m, gdp_b_usd, internet_pct, mobile_pct, banks, insurers)| {
                CountryInput {
                    country: country.to_string(),
                    inputs: RawIndicators {
                        population_m,
                        gdp_b_usd,
                        internet_pct,
                        mobile_pct,
                        banks,
                        insurers,
                    },
                }
            },
        )
        .collect()
}

/// Bank and insurer counts for one country.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstitutionCounts {
    #[serde(alias = "Country")]
    pub country: String,
    #[serde(alias = "Banks_Count")]
    pub banks: u32,
    #[serde(alias = "Insurance_Companies")]
    pub insurers: u32,
}

/// Counts for the built-in markets.
pub fn builtin_institution_counts() -> Vec<InstitutionCounts> {
    builtin_inputs()
        .into_iter()
        .map(|c| InstitutionCounts {
            country: c.country,
            banks: c.inputs.banks,
            insurers: c.inputs.insurers,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct InputRow {
    #[serde(alias = "Country")]
    country: String,
    #[serde(alias = "Population_M")]
    population_m: f64,
    #[serde(alias = "GDP_B_USD")]
    gdp_b_usd: f64,
    #[serde(alias = "Internet_Penetration_Pct")]
    internet_pct: f64,
    #[serde(alias = "Mobile_Penetration_Pct")]
    mobile_pct: f64,
    #[serde(alias = "Banks_Count")]
    banks: u32,
    #[serde(alias = "Insurance_Companies")]
    insurers: u32,
}

impl From<InputRow> for CountryInput {
    fn from(r: InputRow) -> Self {
        Self {
            country: r.country,
            inputs: RawIndicators {
                population_m: r.population_m,
                gdp_b_usd: r.gdp_b_usd,
                internet_pct: r.internet_pct,
                mobile_pct: r.mobile_pct,
                banks: r.banks,
                insurers: r.insurers,
            },
        }
    }
}

fn read_table<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> SizingResult<Vec<T>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        out.push(row?);
    }
    debug!("read {} rows from {}", out.len(), path.display());
    Ok(out)
}

/// Load raw inputs. Any malformed row fails the whole load.
pub fn load_inputs_csv<P: AsRef<Path>>(path: P) -> SizingResult<Vec<CountryInput>> {
    let rows: Vec<InputRow> = read_table(path)?;
    Ok(rows.into_iter().map(CountryInput::from).collect())
}

pub fn load_institution_counts_csv<P: AsRef<Path>>(path: P) -> SizingResult<Vec<InstitutionCounts>> {
    read_table(path)
}

pub fn load_regulations_csv<P: AsRef<Path>>(path: P) -> SizingResult<Vec<RegulationEntry>> {
    read_table(path)
}

pub fn load_competitors_csv<P: AsRef<Path>>(path: P) -> SizingResult<Vec<CompetitorEntry>> {
    read_table(path)
}

/// The four World Bank series the reference table is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WbIndicator {
    Gdp,
    Population,
    Internet,
    Mobile,
}

impl WbIndicator {
    pub const ALL: [WbIndicator; 4] = [
        WbIndicator::Gdp,
        WbIndicator::Population,
        WbIndicator::Internet,
        WbIndicator::Mobile,
    ];

    pub fn code(self) -> &'static str {
        match self {
            WbIndicator::Gdp => "NY.GDP.MKTP.CD",
            WbIndicator::Population => "SP.POP.TOTL",
            WbIndicator::Internet => "IT.NET.USER.ZS",
            WbIndicator::Mobile => "IT.CEL.SETS.P2",
        }
    }

    pub fn series_name(self) -> &'static str {
        match self {
            WbIndicator::Gdp => "GDP (current US$)",
            WbIndicator::Population => "Population, total",
            WbIndicator::Internet => "Individuals using the Internet (% of population)",
            WbIndicator::Mobile => "Mobile cellular subscriptions (per 100 people)",
        }
    }

    /// Match either the series code or the full series name (case-insensitive).
    pub fn recognize(label: &str) -> Option<Self> {
        let t = label.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.code().eq_ignore_ascii_case(t) || i.series_name().eq_ignore_ascii_case(t))
    }

    /// Convert the raw World Bank value into the unit the reference table uses.
    fn scale(self, v: f64) -> f64 {
        match self {
            WbIndicator::Gdp => v / 1.0e9,
            WbIndicator::Population => v / 1.0e6,
            WbIndicator::Internet | WbIndicator::Mobile => v,
        }
    }
}

fn find_col(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Parse a numeric cell; DataBank writes `..` for missing observations.
fn parse_value(cell: &str) -> Option<f64> {
    let t = cell.trim();
    if t.is_empty() || t == ".." {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column whose header names a year, e.g. `2024` or `2024 [YR2024]`.
fn header_year(h: &str) -> Option<i32> {
    let digits: String = h.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 { digits.parse().ok() } else { None }
}

/// Build raw inputs from a World Bank export plus bank/insurer counts.
///
/// `year = None` takes the most recent year with a value for each series. The counts table
/// defines which countries are built; export rows for other countries (regions, aggregates)
/// are ignored. A counted country lacking any of the four series is an error.
pub fn extract_world_bank<P: AsRef<Path>>(
    path: P,
    year: Option<i32>,
    counts: &[InstitutionCounts],
    assumptions: &MarketAssumptions,
) -> SizingResult<Vec<CountryInput>> {
    let path = path.as_ref();
    let malformed = |reason: &str| SizingError::MalformedTable {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = rdr.headers()?.clone();

    let country_col = find_col(&headers, &["country_name", "Country Name", "country"])
        .ok_or_else(|| malformed("no country column"))?;
    let label_cols: Vec<usize> = [
        find_col(&headers, &["indicator_name", "Series Name"]),
        find_col(&headers, &["indicator_id", "Series Code"]),
    ]
    .into_iter()
    .flatten()
    .collect();
    if label_cols.is_empty() {
        return Err(malformed("no indicator/series column"));
    }

    let tidy = (
        find_col(&headers, &["year", "date"]),
        find_col(&headers, &["value"]),
    );
    let year_cols: Vec<(i32, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| header_year(h).map(|y| (y, i)))
        .collect();

    // (country key, indicator) -> (year, value); keep the requested or latest year.
    let mut observed: BTreeMap<(CountryKey, WbIndicator), (i32, f64)> = BTreeMap::new();
    let mut keep = |key: CountryKey, ind: WbIndicator, y: i32, v: f64| {
        if year.is_some_and(|want| want != y) {
            return;
        }
        let slot = observed.entry((key, ind)).or_insert((y, v));
        if y > slot.0 {
            *slot = (y, v);
        }
    };

    for row in rdr.records() {
        let row = row?;
        let Some(country) = row.get(country_col).filter(|c| !c.is_empty()) else {
            continue;
        };
        let Some(ind) = label_cols
            .iter()
            .filter_map(|&c| row.get(c))
            .find_map(WbIndicator::recognize)
        else {
            continue;
        };
        let key = CountryKey::resolve(country, &assumptions.country_aliases);
        match tidy {
            (Some(yc), Some(vc)) => {
                let y = row.get(yc).and_then(|s| s.trim().parse::<i32>().ok());
                let v = row.get(vc).and_then(parse_value);
                if let (Some(y), Some(v)) = (y, v) {
                    keep(key, ind, y, v);
                }
            }
            _ => {
                for &(y, col) in &year_cols {
                    if let Some(v) = row.get(col).and_then(parse_value) {
                        keep(key.clone(), ind, y, v);
                    }
                }
            }
        }
    }
    if tidy.1.is_none() && year_cols.is_empty() {
        return Err(malformed("no value or year columns"));
    }

    let mut out = Vec::with_capacity(counts.len());
    for c in counts {
        let key = CountryKey::resolve(&c.country, &assumptions.country_aliases);
        let mut values = [0.0f64; 4];
        for (slot, ind) in values.iter_mut().zip(WbIndicator::ALL) {
            let (_, v) = observed.get(&(key.clone(), ind)).ok_or_else(|| {
                SizingError::MissingIndicator {
                    country: c.country.clone(),
                    indicator: ind.series_name().to_string(),
                }
            })?;
            *slot = ind.scale(*v);
        }
        let [gdp_b_usd, population_m, internet_pct, mobile_pct] = values;
        out.push(CountryInput {
            country: c.country.clone(),
            inputs: RawIndicators {
                population_m,
                gdp_b_usd,
                internet_pct,
                mobile_pct,
                banks: c.banks,
                insurers: c.insurers,
            },
        });
    }
    info!(
        "extracted {} countries from {}{}",
        out.len(),
        path.display(),
        year.map(|y| format!(" (year {y})")).unwrap_or_default()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_codes_and_names() {
        assert_eq!(WbIndicator::recognize("SP.POP.TOTL"), Some(WbIndicator::Population));
        assert_eq!(
            WbIndicator::recognize("gdp (current us$)"),
            Some(WbIndicator::Gdp)
        );
        assert_eq!(WbIndicator::recognize("Access to electricity (% of population)"), None);
    }

    #[test]
    fn databank_headers_carry_years() {
        assert_eq!(header_year("2024 [YR2024]"), Some(2024));
        assert_eq!(header_year("Series Code"), None);
        assert_eq!(parse_value(".."), None);
        assert_eq!(parse_value("58.2"), Some(58.2));
    }

    #[test]
    fn builtin_table_has_six_markets() {
        let rows = builtin_inputs();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].country, "Senegal");
        assert_eq!(rows[0].inputs.banks, 29);
        assert_eq!(builtin_institution_counts()[5].country, "Burkina_Faso");
    }
}
