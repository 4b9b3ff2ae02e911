//! Area per land-cover category per year inside a study area.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::compute::{LandCoverEngine, ReductionParams};
use crate::models::{AreaStatistic, ImageStack, Legend, StudyArea};

/// Knobs of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationOptions {
    #[serde(default)]
    pub params: ReductionParams,
    /// Emit a 0 km² row for legend categories absent from the area.
    #[serde(default = "default_true")]
    pub fill_missing_categories: bool,
    /// Refuse to aggregate without a study area instead of using the whole extent.
    #[serde(default = "default_true")]
    pub require_study_area: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            params: ReductionParams::default(),
            fill_missing_categories: true,
            require_study_area: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("select a study area before computing statistics")]
    StudyAreaRequired,

    #[error("no years selected")]
    NoYears,
}

/// Statistics table plus the per-year problems met while building it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pub area_name: Option<String>,
    pub rows: Vec<AreaStatistic>,
    pub warnings: Vec<String>,
    pub failed_years: Vec<i32>,
}

impl AreaReport {
    /// Total area in km² of one year over all categories.
    pub fn year_total_km2(&self, year: i32) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.year == year)
            .map(|r| r.area_km2)
            .sum()
    }

    fn fail_year(&mut self, year: i32, message: String) {
        warn!(year, "{}", message);
        self.failed_years.push(year);
        self.warnings.push(message);
    }
}

/// Reduce every selected year with one batched call and collect the rows.
///
/// Rows follow the order of `years`, then ascending category code. A year
/// whose reduction fails or finds no data contributes no rows and a warning;
/// the remaining years are still computed. Area found under codes the legend
/// does not list is reported in a warning for its year.
pub async fn compute_area_statistics(
    engine: &dyn LandCoverEngine,
    stack: &ImageStack,
    years: &[i32],
    area: Option<&StudyArea>,
    legend: &Legend,
    options: &AggregationOptions,
) -> Result<AreaReport, AggregationError> {
    if area.is_none() && options.require_study_area {
        return Err(AggregationError::StudyAreaRequired);
    }
    if years.is_empty() {
        return Err(AggregationError::NoYears);
    }

    let categories = legend.codes();
    let mut report = AreaReport {
        area_name: area.map(|a| a.name().to_string()),
        ..Default::default()
    };

    for &year in years {
        let Some(band) = stack.select_year(year) else {
            report.fail_year(year, format!("Year {}: no classification band in the stack", year));
            continue;
        };
        match engine
            .reduce_category_areas(&band.expr, area, &categories, &options.params)
            .await
        {
            Ok(sums) if sums.is_empty() => {
                report.fail_year(year, format!("Year {}: no data inside the study area", year));
            }
            Ok(sums) => {
                for code in &categories {
                    let area_m2 = sums.get(code).copied().unwrap_or(0.0);
                    if area_m2 <= 0.0 && !options.fill_missing_categories {
                        continue;
                    }
                    report
                        .rows
                        .push(AreaStatistic::from_m2(year, *code, legend.name_for(*code), area_m2));
                }
                let outside: Vec<String> = sums
                    .iter()
                    .filter(|(code, area_m2)| **area_m2 > 0.0 && !categories.contains(*code))
                    .map(|(code, area_m2)| format!("{} ({:.2} km²)", code.0, area_m2 / 1_000_000.0))
                    .collect();
                if !outside.is_empty() {
                    let message = format!(
                        "Year {}: area in codes outside the legend was left out: {}",
                        year,
                        outside.join(", ")
                    );
                    warn!(year, "{}", message);
                    report.warnings.push(message);
                }
            }
            Err(e) => {
                report.fail_year(year, format!("Year {}: {}", year, e));
            }
        }
    }

    if report.rows.is_empty() {
        warn!("no data found for the selected years");
        report
            .warnings
            .push("No data found for the selected years".to_string());
    }
    info!(
        area = report.area_name.as_deref().unwrap_or("<full extent>"),
        years = years.len(),
        rows = report.rows.len(),
        failed = report.failed_years.len(),
        "area statistics computed"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "area_stats_tests.rs"]
mod tests;
