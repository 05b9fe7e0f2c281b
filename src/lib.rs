//! mssp_sizing
//!
//! A Rust library for sizing the managed security services (MSSP) market in six
//! Francophone African countries. Pairs with the `mssp` CLI.
//!
//! ### Features
//! - Built-in reference indicators, or extraction from a World Bank CSV export
//! - IT market, cybersecurity spend, SME counts, TAM/SAM/SOM, growth and attractiveness scores
//! - Every policy constant lives in [`MarketAssumptions`] and can be overridden from JSON
//! - Console report sections with locale-aware numbers
//! - SVG/PNG charts of the enriched table
//! - Save as CSV or JSON with one flat column per field
//!
//! ### Example
//! ```no_run
//! use mssp_sizing::{MarketAssumptions, calc, reference, storage, viz};
//!
//! let assumptions = MarketAssumptions::default();
//! let inputs = reference::builtin_inputs();
//! let regs = reference::load_regulations_csv("regulatory_data.csv")?;
//! let enriched = calc::enrich(&inputs, Some(&regs), &assumptions)?;
//! storage::save_csv(&enriched.records, "market.csv")?;
//!
//! let chart_input = viz::ChartInput {
//!     records: &enriched.records,
//!     regulations: Some(&regs),
//!     competitors: None,
//!     assumptions: &assumptions,
//!     locale: &num_format::Locale::en,
//! };
//! viz::render_chart(viz::ChartKind::MarketSize, &chart_input, "market.svg", 1000, 600)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod calc;
pub mod config;
pub mod error;
pub mod models;
pub mod reference;
pub mod report;
pub mod storage;
pub mod viz;

pub use config::{JoinPolicy, MarketAssumptions};
pub use error::{SizingError, SizingResult};
pub use models::{
    CompetitorEntry, CountryInput, CountryKey, CountryRecord, DerivedMetrics, MaturityLevel,
    Metric, PricingTier, RawIndicators, RegulationEntry,
};
