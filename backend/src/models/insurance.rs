//! SISSER rural-insurance policy records.

use serde::{Deserialize, Serialize};

/// One row of the SISSER export as it appears in the CSV file.
///
/// Numeric columns use a decimal comma, so they are read as text first.
#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceCsvRow {
    #[serde(rename = "SG_UF_PROPRIEDADE")]
    pub state: String,
    #[serde(rename = "NM_RAZAO_SOCIAL")]
    pub company: String,
    #[serde(rename = "NR_APOLICE")]
    pub policy: String,
    #[serde(rename = "NR_AREA_TOTAL", default)]
    pub area_total: Option<String>,
    #[serde(rename = "VL_PREMIO_LIQUIDO", default)]
    pub net_premium: Option<String>,
    #[serde(rename = "VL_LIMITE_GARANTIA", default)]
    pub coverage_limit: Option<String>,
    #[serde(rename = "NR_PRODUTIVIDADE_ESTIMADA", default)]
    pub estimated_yield: Option<String>,
    #[serde(rename = "NR_PRODUTIVIDADE_SEGURADA", default)]
    pub insured_yield: Option<String>,
    #[serde(rename = "VL_SUBVENCAO_FEDERAL", default)]
    pub federal_subsidy: Option<String>,
}

/// A parsed policy record. Missing or unparsable numbers are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRecord {
    pub state: String,
    pub company: String,
    pub policy: String,
    pub area_ha: Option<f64>,
    pub net_premium: Option<f64>,
    pub coverage_limit: Option<f64>,
    pub estimated_yield: Option<f64>,
    pub insured_yield: Option<f64>,
    pub federal_subsidy: Option<f64>,
}

impl From<InsuranceCsvRow> for InsuranceRecord {
    fn from(row: InsuranceCsvRow) -> Self {
        let num = |v: &Option<String>| v.as_deref().and_then(parse_decimal);
        Self {
            area_ha: num(&row.area_total),
            net_premium: num(&row.net_premium),
            coverage_limit: num(&row.coverage_limit),
            estimated_yield: num(&row.estimated_yield),
            insured_yield: num(&row.insured_yield),
            federal_subsidy: num(&row.federal_subsidy),
            state: row.state.trim().to_uppercase(),
            company: row.company.trim().to_string(),
            policy: row.policy.trim().to_string(),
        }
    }
}

/// Parse a number written with a decimal comma (`"1234,56"`).
///
/// Only the comma is rewritten; a dot is kept as a decimal point, matching the
/// plain `',' -> '.'` substitution the export is normally cleaned with.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric columns available for correlation analysis, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsuranceVariable {
    #[serde(rename = "NR_AREA_TOTAL")]
    AreaTotal,
    #[serde(rename = "VL_PREMIO_LIQUIDO")]
    NetPremium,
    #[serde(rename = "VL_LIMITE_GARANTIA")]
    CoverageLimit,
    #[serde(rename = "NR_PRODUTIVIDADE_ESTIMADA")]
    EstimatedYield,
    #[serde(rename = "NR_PRODUTIVIDADE_SEGURADA")]
    InsuredYield,
    #[serde(rename = "VL_SUBVENCAO_FEDERAL")]
    FederalSubsidy,
}

impl InsuranceVariable {
    pub const ALL: [InsuranceVariable; 6] = [
        Self::AreaTotal,
        Self::NetPremium,
        Self::CoverageLimit,
        Self::EstimatedYield,
        Self::InsuredYield,
        Self::FederalSubsidy,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::AreaTotal => "NR_AREA_TOTAL",
            Self::NetPremium => "VL_PREMIO_LIQUIDO",
            Self::CoverageLimit => "VL_LIMITE_GARANTIA",
            Self::EstimatedYield => "NR_PRODUTIVIDADE_ESTIMADA",
            Self::InsuredYield => "NR_PRODUTIVIDADE_SEGURADA",
            Self::FederalSubsidy => "VL_SUBVENCAO_FEDERAL",
        }
    }

    pub fn value(&self, record: &InsuranceRecord) -> Option<f64> {
        match self {
            Self::AreaTotal => record.area_ha,
            Self::NetPremium => record.net_premium,
            Self::CoverageLimit => record.coverage_limit,
            Self::EstimatedYield => record.estimated_yield,
            Self::InsuredYield => record.insured_yield,
            Self::FederalSubsidy => record.federal_subsidy,
        }
    }
}
