use mssp_sizing::reference::{self, InstitutionCounts};
use mssp_sizing::{MarketAssumptions, SizingError};
use std::fs;
use std::path::Path;

fn counts() -> Vec<InstitutionCounts> {
    vec![
        InstitutionCounts {
            country: "Senegal".into(),
            banks: 29,
            insurers: 30,
        },
        InstitutionCounts {
            country: "Cote_Ivoire".into(),
            banks: 29,
            insurers: 32,
        },
    ]
}

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p
}

// Layout written by the `wbi` tool: one observation per row.
const TIDY: &str = "\
indicator_id,indicator_name,country_id,country_name,country_iso3,year,value,unit,obs_status,decimal
NY.GDP.MKTP.CD,GDP (current US$),SN,Senegal,SEN,2022,27600000000,,,0
NY.GDP.MKTP.CD,GDP (current US$),SN,Senegal,SEN,2021,25000000000,,,0
SP.POP.TOTL,\"Population, total\",SN,Senegal,SEN,2022,17200000,,,0
IT.NET.USER.ZS,Individuals using the Internet (% of population),SN,Senegal,SEN,2022,58.2,,,1
IT.CEL.SETS.P2,Mobile cellular subscriptions (per 100 people),SN,Senegal,SEN,2022,115.5,,,1
NY.GDP.MKTP.CD,GDP (current US$),CI,Cote d'Ivoire,CIV,2022,70000000000,,,0
SP.POP.TOTL,\"Population, total\",CI,Cote d'Ivoire,CIV,2022,27500000,,,0
IT.NET.USER.ZS,Individuals using the Internet (% of population),CI,Cote d'Ivoire,CIV,2022,47.0,,,1
IT.CEL.SETS.P2,Mobile cellular subscriptions (per 100 people),CI,Cote d'Ivoire,CIV,2022,142.3,,,1
SP.POP.TOTL,\"Population, total\",1W,World,WLD,2022,7950000000,,,0
";

#[test]
fn tidy_export_latest_year() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "wb.csv", TIDY);
    let rows =
        reference::extract_world_bank(&path, None, &counts(), &MarketAssumptions::default())
            .unwrap();

    // Scope follows the counts table; the World aggregate is ignored.
    assert_eq!(rows.len(), 2);
    let sn = &rows[0];
    assert_eq!(sn.country, "Senegal");
    assert!((sn.inputs.gdp_b_usd - 27.6).abs() < 1e-9);
    assert!((sn.inputs.population_m - 17.2).abs() < 1e-9);
    assert!((sn.inputs.internet_pct - 58.2).abs() < 1e-9);
    assert_eq!(sn.inputs.banks, 29);

    // "Cote d'Ivoire" in the export joins "Cote_Ivoire" in the counts through the alias table.
    assert_eq!(rows[1].country, "Cote_Ivoire");
    assert!((rows[1].inputs.mobile_pct - 142.3).abs() < 1e-9);
}

#[test]
fn tidy_export_fixed_year() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "wb.csv", TIDY);
    // 2021 only has Senegal's GDP.
    let err = reference::extract_world_bank(
        &path,
        Some(2021),
        &counts()[..1],
        &MarketAssumptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SizingError::MissingIndicator { .. }));
}

#[test]
fn databank_export_with_year_columns() {
    let body = "\
Country Name,Country Code,Series Name,Series Code,2022 [YR2022],2023 [YR2023]
Senegal,SEN,GDP (current US$),NY.GDP.MKTP.CD,27600000000,..
Senegal,SEN,\"Population, total\",SP.POP.TOTL,17000000,17200000
Senegal,SEN,Individuals using the Internet (% of population),IT.NET.USER.ZS,58.2,..
Senegal,SEN,Mobile cellular subscriptions (per 100 people),IT.CEL.SETS.P2,115.5,..
";
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "databank.csv", body);
    let rows = reference::extract_world_bank(
        &path,
        None,
        &counts()[..1],
        &MarketAssumptions::default(),
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    // Latest non-missing year per series.
    assert!((rows[0].inputs.population_m - 17.2).abs() < 1e-9);
    assert!((rows[0].inputs.gdp_b_usd - 27.6).abs() < 1e-9);
}

#[test]
fn missing_indicator_names_country_and_series() {
    let body = "\
country_name,indicator_id,year,value
Senegal,NY.GDP.MKTP.CD,2022,27600000000
Senegal,SP.POP.TOTL,2022,17200000
Senegal,IT.NET.USER.ZS,2022,58.2
";
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "partial.csv", body);
    let err = reference::extract_world_bank(
        &path,
        None,
        &counts()[..1],
        &MarketAssumptions::default(),
    )
    .unwrap_err();
    match err {
        SizingError::MissingIndicator { country, indicator } => {
            assert_eq!(country, "Senegal");
            assert!(indicator.starts_with("Mobile"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn auxiliary_tables_accept_original_headers() {
    let dir = tempfile::tempdir().unwrap();
    let regs = write(
        dir.path(),
        "regulatory_data.csv",
        "Country,Compliance_Maturity,Cybersecurity_Framework,Penalties_Max_USD\n\
         Senegal,Medium,CDP,150000\n\
         Morocco,Advanced,CNDP,500000\n",
    );
    let regs = reference::load_regulations_csv(&regs).unwrap();
    assert_eq!(regs.len(), 2);
    assert_eq!(regs[1].max_penalty_usd, 500_000.0);

    let comps = write(
        dir.path(),
        "competitors.csv",
        "Company,Country,Services,Market_Share_Pct,Clients_Estimate,Pricing_Tier\n\
         Orange Cyberdefense,Senegal,SOC,25.0,~150,Premium\n\
         Local MSSP,Morocco,MDR,8.5,\"1,200\",Budget\n",
    );
    let comps = reference::load_competitors_csv(&comps).unwrap();
    assert_eq!(comps[0].clients_estimate, 150);
    assert_eq!(comps[1].clients_estimate, 1200);

    let bad = write(
        dir.path(),
        "bad.csv",
        "Country,Compliance_Maturity,Cybersecurity_Framework,Penalties_Max_USD\n\
         Senegal,Excellent,CDP,1\n",
    );
    assert!(reference::load_regulations_csv(&bad).is_err());
}

#[test]
fn inputs_csv_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "inputs.csv",
        "country,population_m,gdp_b_usd,internet_pct,mobile_pct,banks,insurers\n\
         Senegal,17.2,27.6,58.2,115.5,29,30\n",
    );
    let rows = reference::load_inputs_csv(&path).unwrap();
    assert_eq!(rows, reference::builtin_inputs()[..1].to_vec());
}
