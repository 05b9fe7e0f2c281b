use mssp_sizing::calc;
use mssp_sizing::models::{CountryInput, MaturityLevel, Metric, RawIndicators, RegulationEntry};
use mssp_sizing::{JoinPolicy, MarketAssumptions, SizingError, reference};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn rel_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}

fn raw(population_m: f64, gdp_b_usd: f64, banks: u32, insurers: u32) -> RawIndicators {
    RawIndicators {
        population_m,
        gdp_b_usd,
        internet_pct: 40.0,
        mobile_pct: 90.0,
        banks,
        insurers,
    }
}

fn regulations() -> Vec<RegulationEntry> {
    [
        ("Senegal", MaturityLevel::Medium, 150_000.0),
        ("Cote d'Ivoire", MaturityLevel::Developing, 100_000.0),
        ("Cameroon", MaturityLevel::Basic, 50_000.0),
        ("Morocco", MaturityLevel::Advanced, 500_000.0),
        ("Tunisia", MaturityLevel::High, 300_000.0),
        ("Burkina Faso", MaturityLevel::Low, 30_000.0),
    ]
    .into_iter()
    .map(|(country, compliance_maturity, max_penalty_usd)| RegulationEntry {
        country: country.into(),
        compliance_maturity,
        framework: "Data protection law".into(),
        max_penalty_usd,
    })
    .collect()
}

#[test]
fn senegal_reference_values() {
    let a = MarketAssumptions::default();
    let inputs = reference::builtin_inputs();
    let out = calc::enrich(&inputs, None, &a).unwrap();
    let sn = out.records.iter().find(|r| r.country == "Senegal").unwrap();

    assert!(close(sn.metrics.it_market_m_usd, 690.0));
    assert!(close(sn.metrics.cyber_spend_m_usd, 20.7));
    assert_eq!(sn.metrics.sme_count, 68_800);
    assert!(close(sn.metrics.tam_m_usd, 9.23));
    assert!(close(sn.metrics.sam_m_usd, 9.23 * 0.4));
    assert!(close(sn.metrics.som_m_usd, 9.23 * 0.4 * 0.15));
    // No regulatory table, no score.
    assert_eq!(sn.metrics.attractiveness_score, None);
    assert!(out.join_misses.is_empty());
}

#[test]
fn formulas_hold_for_every_row() {
    let a = MarketAssumptions::default();
    let mut rows = reference::builtin_inputs();
    for (i, r) in [
        raw(0.00049, 0.01, 0, 0),
        raw(0.0002, 0.5, 1, 0),
        raw(3.75, 12.3, 7, 11),
        raw(0.0, 0.0, 0, 0),
    ]
    .into_iter()
    .enumerate()
    {
        rows.push(CountryInput {
            country: format!("Synthetic {i}"),
            inputs: r,
        });
    }

    let out = calc::enrich(&rows, None, &a).unwrap();
    assert_eq!(out.records.len(), rows.len());
    for rec in &out.records {
        let r = &rec.inputs;
        let m = &rec.metrics;
        let it = r.gdp_b_usd * a.it_share_of_gdp * 1000.0;
        let sme = (r.population_m * a.smes_per_million).floor() as u64;
        let tam = (r.banks as f64 * a.arpu.bank_usd
            + r.insurers as f64 * a.arpu.insurer_usd
            + a.sme_addressable_share * sme as f64 * a.arpu.sme_usd)
            / 1_000_000.0;

        assert!(rel_close(m.it_market_m_usd, it), "{}", rec.country);
        assert!(rel_close(m.cyber_spend_m_usd, it * a.cyber_share_of_it), "{}", rec.country);
        assert_eq!(m.sme_count, sme, "{}", rec.country);
        assert!(rel_close(m.tam_m_usd, tam), "{}", rec.country);
        assert!(rel_close(m.sam_m_usd, tam * a.sam_share), "{}", rec.country);
        assert!(rel_close(m.som_m_usd, tam * a.sam_share * a.som_share), "{}", rec.country);
        assert!(m.sam_m_usd <= m.tam_m_usd && m.som_m_usd <= m.sam_m_usd);
    }

    let floor_of = |name: &str| {
        out.records
            .iter()
            .find(|r| r.country == name)
            .unwrap()
            .metrics
            .sme_count
    };
    // 1.96 and 0.8 SMEs round down.
    assert_eq!(floor_of("Synthetic 0"), 1);
    assert_eq!(floor_of("Synthetic 1"), 0);
}

#[test]
fn non_latin_names_are_distinct_countries() {
    let inputs = vec![
        CountryInput {
            country: "المغرب".into(),
            inputs: raw(37.0, 130.0, 19, 24),
        },
        CountryInput {
            country: "تونس".into(),
            inputs: raw(12.0, 46.0, 23, 20),
        },
    ];
    let out = calc::enrich(&inputs, None, &MarketAssumptions::default()).unwrap();
    assert_eq!(out.records.len(), 2);
}

#[test]
fn name_without_letters_is_rejected() {
    let mut inputs = reference::builtin_inputs();
    inputs[0].country = " - ".into();
    let err = calc::enrich(&inputs, None, &MarketAssumptions::default()).unwrap_err();
    assert!(matches!(
        err,
        SizingError::InvalidInput { field: "country", .. }
    ));
}

#[test]
fn attractiveness_uses_true_maxima_and_ignores_order() {
    let a = MarketAssumptions::default();
    let regs = regulations();
    let inputs = reference::builtin_inputs();
    let forward = calc::enrich(&inputs, Some(&regs), &a).unwrap();

    let mut reversed_inputs: Vec<CountryInput> = inputs.clone();
    reversed_inputs.reverse();
    let reversed = calc::enrich(&reversed_inputs, Some(&regs), &a).unwrap();

    for r in &forward.records {
        let other = reversed
            .records
            .iter()
            .find(|o| o.country == r.country)
            .unwrap();
        assert_eq!(r.metrics, other.metrics, "{} differs by input order", r.country);
    }

    // Exactly the country with the largest SAM gets the full market component.
    let maxima = calc::fold_maxima(&forward.records);
    let top_sam = calc::top_n_by(&forward.records, Metric::Sam, 1)[0];
    assert!(close(top_sam.metrics.sam_m_usd, maxima.sam_m_usd));
    for r in &forward.records {
        let s = r.metrics.attractiveness_score.unwrap();
        assert!((0.0..=100.0).contains(&s), "{}: {s}", r.country);
    }
}

#[test]
fn aliases_join_regulatory_rows() {
    let a = MarketAssumptions::default();
    let regs = regulations();
    let out = calc::enrich(&reference::builtin_inputs(), Some(&regs), &a).unwrap();
    let ci = out
        .records
        .iter()
        .find(|r| r.country == "Cote_Ivoire")
        .unwrap();
    assert_eq!(ci.compliance_maturity, Some(MaturityLevel::Developing));
    let bf = out
        .records
        .iter()
        .find(|r| r.country == "Burkina_Faso")
        .unwrap();
    assert_eq!(bf.compliance_maturity, Some(MaturityLevel::Low));
    assert!(out.join_misses.is_empty());
}

#[test]
fn missing_regulatory_row_is_dropped_from_ranking() {
    let a = MarketAssumptions::default();
    let regs: Vec<RegulationEntry> = regulations()
        .into_iter()
        .filter(|r| r.country != "Tunisia")
        .collect();
    let out = calc::enrich(&reference::builtin_inputs(), Some(&regs), &a).unwrap();

    assert_eq!(out.join_misses.len(), 1);
    assert_eq!(out.join_misses[0].country, "Tunisia");
    let tn = out.records.iter().find(|r| r.country == "Tunisia").unwrap();
    assert_eq!(tn.metrics.attractiveness_score, None);
    // Raw metrics are still there.
    assert!(tn.metrics.tam_m_usd > 0.0);

    let ranked = calc::rank_by_attractiveness(&out.records);
    assert_eq!(ranked.len(), 5);
    assert!(ranked.iter().all(|r| r.country != "Tunisia"));
    for pair in ranked.windows(2) {
        assert!(pair[0].metrics.attractiveness_score >= pair[1].metrics.attractiveness_score);
    }
}

#[test]
fn strict_policy_fails_on_missing_row() {
    let a = MarketAssumptions {
        join_policy: JoinPolicy::Fail,
        ..MarketAssumptions::default()
    };
    let regs: Vec<RegulationEntry> = regulations()
        .into_iter()
        .filter(|r| r.country != "Cameroon")
        .collect();
    let err = calc::enrich(&reference::builtin_inputs(), Some(&regs), &a).unwrap_err();
    match err {
        SizingError::JoinMiss { country, table } => {
            assert_eq!(country, "Cameroon");
            assert_eq!(table, "regulatory");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn negative_input_fails_the_whole_run() {
    let mut inputs = reference::builtin_inputs();
    inputs[3].inputs.gdp_b_usd = -1.0;
    let err = calc::enrich(&inputs, None, &MarketAssumptions::default()).unwrap_err();
    assert!(matches!(
        err,
        SizingError::InvalidInput { field: "gdp_b_usd", .. }
    ));
}

#[test]
fn duplicate_country_via_alias_is_rejected() {
    let mut inputs = reference::builtin_inputs();
    let mut dup = inputs[1].clone();
    dup.country = "Ivory Coast".into();
    inputs.push(dup);
    let err = calc::enrich(&inputs, None, &MarketAssumptions::default()).unwrap_err();
    assert!(matches!(err, SizingError::DuplicateCountry(name) if name == "Ivory Coast"));
}

#[test]
fn scenario_overrides_change_sam() {
    let a = MarketAssumptions::from_json_str(r#"{ "sam_share": 0.5 }"#).unwrap();
    let out = calc::enrich(&reference::builtin_inputs(), None, &a).unwrap();
    for r in &out.records {
        assert!(close(r.metrics.sam_m_usd, r.metrics.tam_m_usd * 0.5));
    }
}

#[test]
fn segments_and_totals_agree() {
    let a = MarketAssumptions::default();
    let out = calc::enrich(&reference::builtin_inputs(), None, &a).unwrap();
    let totals = calc::totals(&out.records);
    let segments = calc::segment_breakdown(&out.records, &a);

    let seg_sum: f64 = segments.iter().map(|s| s.revenue_potential_m_usd).sum();
    assert!((seg_sum - totals.tam_m_usd).abs() < 1e-9);
    let share_sum: f64 = segments.iter().map(|s| s.share_pct).sum();
    assert!((share_sum - 100.0).abs() < 1e-9);

    let top = calc::top_segment(&segments).unwrap();
    assert!(
        segments
            .iter()
            .all(|s| s.revenue_potential_m_usd <= top.revenue_potential_m_usd)
    );
}

#[test]
fn top_n_by_metric_is_sorted_and_bounded() {
    let out = calc::enrich(
        &reference::builtin_inputs(),
        None,
        &MarketAssumptions::default(),
    )
    .unwrap();
    let top = calc::top_n_by(&out.records, Metric::Gdp, 3);
    assert_eq!(top.len(), 3);
    assert_eq!(top[0].country, "Morocco");
    assert!(top[0].inputs.gdp_b_usd >= top[1].inputs.gdp_b_usd);
    // Absent metric: nothing to rank.
    assert!(calc::top_n_by(&out.records, Metric::Attractiveness, 3).is_empty());
}
