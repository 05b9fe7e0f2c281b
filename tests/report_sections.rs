use mssp_sizing::models::{CompetitorEntry, MaturityLevel, PricingTier, RegulationEntry};
use mssp_sizing::report::{self, ReportInput, Section};
use mssp_sizing::{JoinPolicy, MarketAssumptions, SizingError, calc, reference};
use num_format::Locale;

fn regulations() -> Vec<RegulationEntry> {
    // Tunisia deliberately absent.
    [
        ("Senegal", MaturityLevel::Medium, "CDP", 150_000.0),
        ("Cote d'Ivoire", MaturityLevel::Developing, "ARTCI", 100_000.0),
        ("Cameroon", MaturityLevel::Basic, "ANTIC", 50_000.0),
        ("Morocco", MaturityLevel::Advanced, "CNDP", 500_000.0),
        ("Burkina Faso", MaturityLevel::Low, "CIL", 30_000.0),
    ]
    .into_iter()
    .map(|(country, m, fw, pen)| RegulationEntry {
        country: country.into(),
        compliance_maturity: m,
        framework: fw.into(),
        max_penalty_usd: pen,
    })
    .collect()
}

fn competitors() -> Vec<CompetitorEntry> {
    [
        ("Orange Cyberdefense", "Senegal", 25.0, 150, PricingTier::Premium),
        ("Dataprotect", "Morocco", 18.0, 1200, PricingTier::Mid),
        ("Local MSSP", "Morocco", 7.0, 80, PricingTier::Budget),
    ]
    .into_iter()
    .map(|(company, country, share, clients, tier)| CompetitorEntry {
        company: company.into(),
        country: country.into(),
        services: "SOC, MDR".into(),
        market_share_pct: share,
        clients_estimate: clients,
        pricing_tier: tier,
    })
    .collect()
}

#[test]
fn cross_referenced_sections_omit_unmatched_countries() {
    let a = MarketAssumptions::default();
    let regs = regulations();
    let comps = competitors();
    let enriched = calc::enrich(&reference::builtin_inputs(), Some(&regs), &a).unwrap();
    let input = ReportInput {
        records: &enriched.records,
        regulations: Some(&regs),
        competitors: Some(&comps),
        assumptions: &a,
        locale: &Locale::en,
    };

    let text = report::render_all(&Section::ALL, &input).unwrap();
    assert!(text.contains("MSSP MARKET OVERVIEW"));
    assert!(text.contains("CUSTOMER SEGMENT ANALYSIS"));

    let regulatory = report::render(Section::Regulatory, &input).unwrap().unwrap();
    assert!(regulatory.contains("  Senegal:"));
    assert!(!regulatory.contains("Tunisia"));
    assert!(regulatory.contains("High-maturity markets (stronger security awareness): Morocco"));

    let ranking = report::render(Section::Ranking, &input).unwrap().unwrap();
    assert!(!ranking.contains("Tunisia"));
    assert!(ranking.contains("Phase 1 (0-12 months)"));
    assert!(ranking.contains("Phase 3 (24-36 months)"));

    let competition = report::render(Section::Competition, &input).unwrap().unwrap();
    assert!(competition.contains("Number of players: 3"));
    assert!(competition.contains("Concentration (top 3): 50%"));
    assert!(competition.contains("Opportunity: 50%"));
    assert!(competition.contains("Morocco (SAM $"));
    assert!(!competition.contains("  - Cameroon"));
}

#[test]
fn missing_tables_are_skipped_not_fatal() {
    let a = MarketAssumptions::default();
    let enriched = calc::enrich(&reference::builtin_inputs(), None, &a).unwrap();
    let input = ReportInput {
        records: &enriched.records,
        regulations: None,
        competitors: None,
        assumptions: &a,
        locale: &Locale::en,
    };
    assert_eq!(report::render(Section::Ranking, &input).unwrap(), None);

    let text = report::render_all(&Section::ALL, &input).unwrap();
    assert!(text.contains("[regulatory] skipped: no regulatory table supplied"));
    assert!(text.contains("[competition] skipped: no competitor table supplied"));
    assert!(text.contains("[ranking] skipped"));
    assert!(text.contains("TAM (Total Addressable Market)"));
}

#[test]
fn strict_joins_abort_the_report() {
    let a = MarketAssumptions {
        join_policy: JoinPolicy::Fail,
        ..MarketAssumptions::default()
    };
    let regs = regulations();
    let records = calc::enrich(&reference::builtin_inputs(), None, &a)
        .unwrap()
        .records;
    let input = ReportInput {
        records: &records,
        regulations: Some(&regs),
        competitors: None,
        assumptions: &a,
        locale: &Locale::en,
    };
    let err = report::render(Section::Regulatory, &input).unwrap_err();
    assert!(matches!(err, SizingError::JoinMiss { ref country, .. } if country == "Tunisia"));
}

#[test]
fn ranking_needs_scored_records() {
    let a = MarketAssumptions::default();
    let regs = regulations();
    let unscored = calc::enrich(&reference::builtin_inputs(), None, &a)
        .unwrap()
        .records;
    let input = ReportInput {
        records: &unscored,
        regulations: Some(&regs),
        competitors: None,
        assumptions: &a,
        locale: &Locale::en,
    };
    assert_eq!(report::render(Section::Ranking, &input).unwrap(), None);
    let text = report::render_all(&[Section::Ranking], &input).unwrap();
    assert!(text.contains("[ranking] skipped: no attractiveness scores"));
    assert!(!text.contains("Final ranking"));

    let scored = calc::enrich(&reference::builtin_inputs(), Some(&regs), &a)
        .unwrap()
        .records;
    let input = ReportInput {
        records: &scored,
        regulations: None,
        ..input
    };
    let ranking = report::render(Section::Ranking, &input).unwrap().unwrap();
    assert!(ranking.contains("Senegal"));
}

#[test]
fn overview_uses_locale_separators() {
    let a = MarketAssumptions::default();
    let enriched = calc::enrich(&reference::builtin_inputs(), None, &a).unwrap();
    let en = report::overview(&enriched.records, &Locale::en);
    let de = report::overview(&enriched.records, &Locale::de);
    assert!(en.contains("Total population: 144.2M"), "{en}");
    assert!(de.contains("Total population: 144,2M"), "{de}");
    // Morocco has the largest SAM.
    assert!(en.contains("1. Morocco:"));
}

#[test]
fn section_names_parse() {
    assert_eq!("Ranking".parse::<Section>(), Ok(Section::Ranking));
    assert!("summary".parse::<Section>().is_err());
}
