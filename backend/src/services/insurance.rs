//! SISSER rural-insurance analytics: per-state and per-company aggregates,
//! highlights, correlations and the state choropleth join.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{round2, InsuranceCsvRow, InsuranceRecord, InsuranceVariable};

/// Columns every export must carry; the numeric ones may be absent.
pub const REQUIRED_COLUMNS: [&str; 3] = ["SG_UF_PROPRIEDADE", "NM_RAZAO_SOCIAL", "NR_APOLICE"];
pub const STATE_CODE_PROPERTY: &str = "SIGLA_UF";
pub const STATE_NAME_PROPERTY: &str = "NM_UF";

#[derive(Debug, thiserror::Error)]
pub enum InsuranceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid state boundaries: {0}")]
    Boundaries(String),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub state: String,
    pub area_total: f64,
    pub premium_total: f64,
    pub policy_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub company: String,
    pub policy_count: usize,
    pub area_total: f64,
    pub premium_total: f64,
    /// States in order of first appearance.
    pub states: Vec<String>,
    pub state_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyStateSummary {
    pub company: String,
    pub state: String,
    pub policy_count: usize,
    pub area_total: f64,
    pub premium_total: f64,
}

/// Metric used to rank companies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyMetric {
    #[default]
    PolicyCount,
    StateCount,
    AreaTotal,
    PremiumTotal,
}

impl CompanyMetric {
    pub fn value(&self, company: &CompanySummary) -> f64 {
        match self {
            Self::PolicyCount => company.policy_count as f64,
            Self::StateCount => company.state_count as f64,
            Self::AreaTotal => company.area_total,
            Self::PremiumTotal => company.premium_total,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PolicyCount => "Número de Seguros",
            Self::StateCount => "Contagem de Estados",
            Self::AreaTotal => "Área Total",
            Self::PremiumTotal => "Valor Total",
        }
    }
}

impl FromStr for CompanyMetric {
    type Err = InsuranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "policy_count" | "numero_seguros" => Ok(Self::PolicyCount),
            "state_count" | "contagem_estados" => Ok(Self::StateCount),
            "area_total" => Ok(Self::AreaTotal),
            "premium_total" | "valor_total" => Ok(Self::PremiumTotal),
            _ => Err(InsuranceError::UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHighlight {
    pub state: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHighlights {
    pub most_policies: StateHighlight,
    pub largest_area: StateHighlight,
    pub largest_premium: StateHighlight,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsuranceTotals {
    pub companies: usize,
    /// Sum of the per-company distinct policy counts.
    pub policies: usize,
    pub area_total: f64,
    pub premium_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyShare {
    pub company: String,
    pub value: f64,
    pub percent: f64,
}

/// Square matrix over [`InsuranceVariable::ALL`]; `None` where a coefficient
/// is undefined (fewer than two complete pairs or zero variance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<InsuranceVariable>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: InsuranceVariable, b: InsuranceVariable) -> Option<f64> {
        let i = self.variables.iter().position(|v| *v == a)?;
        let j = self.variables.iter().position(|v| *v == b)?;
        self.values[i][j]
    }
}

/// Pearson coefficient over the pairs, `None` when undefined.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Policy records of one SISSER export.
#[derive(Debug, Clone, Default)]
pub struct InsuranceDataset {
    records: Vec<InsuranceRecord>,
}

impl InsuranceDataset {
    pub fn from_records(records: Vec<InsuranceRecord>) -> Self {
        Self { records }
    }

    /// Parse a `;`-separated export with decimal commas.
    ///
    /// Text that is not valid UTF-8 is decoded lossily. Rows that cannot be
    /// read are skipped and counted in a warning.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, InsuranceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv::StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(InsuranceError::MissingColumn(column.to_string()));
            }
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in rdr.byte_records() {
            let row = csv::StringRecord::from_byte_record_lossy(row?);
            match row.deserialize::<InsuranceCsvRow>(Some(&headers)) {
                Ok(parsed) => records.push(InsuranceRecord::from(parsed)),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "unreadable insurance rows skipped");
        }
        Ok(Self { records })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InsuranceError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| InsuranceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_reader(std::io::BufReader::new(file))?;
        info!(path = %path.display(), records = dataset.len(), "insurance dataset loaded");
        Ok(dataset)
    }

    pub fn records(&self) -> &[InsuranceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Area, premium and distinct policies per state, by state code.
    pub fn state_summaries(&self) -> Vec<StateSummary> {
        let mut groups: BTreeMap<&str, (f64, f64, BTreeSet<&str>)> = BTreeMap::new();
        for r in &self.records {
            let entry = groups.entry(r.state.as_str()).or_default();
            entry.0 += r.area_ha.unwrap_or(0.0);
            entry.1 += r.net_premium.unwrap_or(0.0);
            entry.2.insert(r.policy.as_str());
        }
        groups
            .into_iter()
            .map(|(state, (area, premium, policies))| StateSummary {
                state: state.to_string(),
                area_total: area,
                premium_total: premium,
                policy_count: policies.len(),
            })
            .collect()
    }

    /// States ordered by policy count, most first.
    pub fn states_by_policy_count(&self) -> Vec<StateSummary> {
        let mut states = self.state_summaries();
        states.sort_by(|a, b| b.policy_count.cmp(&a.policy_count));
        states
    }

    /// Per-company aggregates, by company name.
    pub fn company_summaries(&self) -> Vec<CompanySummary> {
        #[derive(Default)]
        struct Acc<'a> {
            area: f64,
            premium: f64,
            policies: BTreeSet<&'a str>,
            states: Vec<&'a str>,
        }
        let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
        for r in &self.records {
            let acc = groups.entry(r.company.as_str()).or_default();
            acc.area += r.area_ha.unwrap_or(0.0);
            acc.premium += r.net_premium.unwrap_or(0.0);
            acc.policies.insert(r.policy.as_str());
            if !acc.states.contains(&r.state.as_str()) {
                acc.states.push(r.state.as_str());
            }
        }
        groups
            .into_iter()
            .map(|(company, acc)| CompanySummary {
                company: company.to_string(),
                policy_count: acc.policies.len(),
                area_total: acc.area,
                premium_total: acc.premium,
                state_count: acc.states.len(),
                states: acc.states.into_iter().map(str::to_string).collect(),
            })
            .collect()
    }

    /// Companies ranked by `metric`, highest first. Ties keep name order.
    pub fn companies_by(&self, metric: CompanyMetric) -> Vec<CompanySummary> {
        let mut companies = self.company_summaries();
        companies.sort_by(|a, b| metric.value(b).total_cmp(&metric.value(a)));
        companies
    }

    pub fn company_state_breakdown(&self) -> Vec<CompanyStateSummary> {
        let mut groups: BTreeMap<(&str, &str), (f64, f64, BTreeSet<&str>)> = BTreeMap::new();
        for r in &self.records {
            let entry = groups
                .entry((r.company.as_str(), r.state.as_str()))
                .or_default();
            entry.0 += r.area_ha.unwrap_or(0.0);
            entry.1 += r.net_premium.unwrap_or(0.0);
            entry.2.insert(r.policy.as_str());
        }
        groups
            .into_iter()
            .map(|((company, state), (area, premium, policies))| CompanyStateSummary {
                company: company.to_string(),
                state: state.to_string(),
                policy_count: policies.len(),
                area_total: area,
                premium_total: premium,
            })
            .collect()
    }

    /// Leading state for policies, area and premium. The first state in code
    /// order wins a tie.
    pub fn highlights(&self) -> Option<StateHighlights> {
        let states = self.state_summaries();
        let top = |value: fn(&StateSummary) -> f64| -> Option<StateHighlight> {
            let mut best: Option<&StateSummary> = None;
            for s in &states {
                if best.map_or(true, |b| value(s) > value(b)) {
                    best = Some(s);
                }
            }
            best.map(|s| StateHighlight {
                state: s.state.clone(),
                value: value(s),
            })
        };
        Some(StateHighlights {
            most_policies: top(|s| s.policy_count as f64)?,
            largest_area: top(|s| s.area_total)?,
            largest_premium: top(|s| s.premium_total)?,
        })
    }

    pub fn totals(&self) -> InsuranceTotals {
        let companies = self.company_summaries();
        InsuranceTotals {
            companies: companies.len(),
            policies: companies.iter().map(|c| c.policy_count).sum(),
            area_total: companies.iter().map(|c| c.area_total).sum(),
            premium_total: companies.iter().map(|c| c.premium_total).sum(),
        }
    }

    /// Each company's part of the total for `metric`, in name order.
    pub fn company_shares(&self, metric: CompanyMetric) -> Vec<CompanyShare> {
        let companies = self.company_summaries();
        let total: f64 = companies.iter().map(|c| metric.value(c)).sum();
        companies
            .iter()
            .map(|c| {
                let value = metric.value(c);
                CompanyShare {
                    company: c.company.clone(),
                    value,
                    percent: if total > 0.0 { value / total * 100.0 } else { 0.0 },
                }
            })
            .collect()
    }

    /// Pearson correlations over the numeric columns, rounded to 2 decimals.
    /// Each pair uses only the records where both values are present.
    pub fn correlation_matrix(&self) -> CorrelationMatrix {
        let variables = InsuranceVariable::ALL.to_vec();
        let values = variables
            .iter()
            .map(|a| {
                variables
                    .iter()
                    .map(|b| {
                        let pairs: Vec<(f64, f64)> = self
                            .records
                            .iter()
                            .filter_map(|r| Some((a.value(r)?, b.value(r)?)))
                            .collect();
                        pearson(&pairs).map(round2)
                    })
                    .collect()
            })
            .collect();
        CorrelationMatrix { variables, values }
    }

    /// Left join of the state boundaries with the per-state metrics.
    ///
    /// Every boundary feature is kept; states without policies get `null`
    /// metrics.
    pub fn choropleth(&self, boundaries: &StateBoundaries) -> FeatureCollection {
        let by_state: BTreeMap<String, StateSummary> = self
            .state_summaries()
            .into_iter()
            .map(|s| (s.state.clone(), s))
            .collect();

        let features = boundaries
            .states
            .iter()
            .map(|boundary| {
                let summary = by_state.get(&boundary.code);
                let mut properties = JsonObject::new();
                properties.insert(STATE_CODE_PROPERTY.to_string(), JsonValue::from(boundary.code.clone()));
                properties.insert(
                    STATE_NAME_PROPERTY.to_string(),
                    boundary.name.clone().map(JsonValue::from).unwrap_or(JsonValue::Null),
                );
                properties.insert(
                    "numero_seguros".to_string(),
                    summary.map_or(JsonValue::Null, |s| JsonValue::from(s.policy_count)),
                );
                properties.insert(
                    "area_total".to_string(),
                    summary.map_or(JsonValue::Null, |s| JsonValue::from(s.area_total)),
                );
                properties.insert(
                    "valor_total".to_string(),
                    summary.map_or(JsonValue::Null, |s| JsonValue::from(s.premium_total)),
                );
                Feature {
                    bbox: None,
                    geometry: boundary.geometry.clone(),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateBoundary {
    pub code: String,
    pub name: Option<String>,
    pub geometry: Option<geojson::Geometry>,
}

/// Brazilian state polygons keyed by `SIGLA_UF`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateBoundaries {
    states: Vec<StateBoundary>,
}

impl StateBoundaries {
    pub fn from_geojson_str(text: &str) -> Result<Self, InsuranceError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| InsuranceError::Boundaries(e.to_string()))?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(InsuranceError::Boundaries(
                "state boundaries must be a FeatureCollection".to_string(),
            ));
        };
        let states = collection
            .features
            .into_iter()
            .filter_map(|feature| {
                let code = feature.property(STATE_CODE_PROPERTY)?.as_str()?.trim().to_uppercase();
                let name = feature
                    .property(STATE_NAME_PROPERTY)
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                Some(StateBoundary {
                    code,
                    name,
                    geometry: feature.geometry,
                })
            })
            .collect();
        Ok(Self { states })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InsuranceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| InsuranceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let boundaries = Self::from_geojson_str(&text)?;
        info!(path = %path.display(), states = boundaries.len(), "state boundaries loaded");
        Ok(boundaries)
    }

    pub fn states(&self) -> &[StateBoundary] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
#[path = "insurance_tests.rs"]
mod tests;
