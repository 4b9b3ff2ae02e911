//! Chart-ready reshaping of the area statistics table.
//!
//! Every chart works on class *names*, not codes: two codes sharing a label
//! (e.g. both "not observed" codes) are summed into one class.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{round2, AreaStatistic, Legend};

/// Area of one named class in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassYearArea {
    pub year: i32,
    pub class_name: String,
    pub area_km2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

/// One class across years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<SeriesPoint>,
}

/// Horizontal stacked bars of each class's share of the yearly total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedPercentChart {
    pub years: Vec<i32>,
    /// Ordered by mean share, largest first.
    pub series: Vec<ChartSeries>,
    pub x_range: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub name: String,
    pub color: String,
    pub area_km2: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub year: i32,
    pub total_km2: f64,
    pub slices: Vec<PieSlice>,
}

/// Years by class names, values in km² rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub years: Vec<i32>,
    pub columns: Vec<String>,
    /// `values[row][column]`; `None` where the class has no row that year.
    pub values: Vec<Vec<Option<f64>>>,
    /// Row index of each column's largest value.
    pub column_max: Vec<Option<usize>>,
    /// Row index of each column's smallest value.
    pub column_min: Vec<Option<usize>>,
}

/// All chart payloads of one statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBundle {
    pub stacked_percent: StackedPercentChart,
    pub grouped_bars: Vec<ChartSeries>,
    pub pie: Option<PieChart>,
    pub table: PivotTable,
}

/// Sum areas per `(year, class name)`.
pub fn aggregate_by_name(rows: &[AreaStatistic]) -> Vec<ClassYearArea> {
    let mut sums: BTreeMap<(i32, &str), f64> = BTreeMap::new();
    for row in rows {
        *sums.entry((row.year, row.label.as_str())).or_insert(0.0) += row.area_km2;
    }
    sums.into_iter()
        .map(|((year, name), area_km2)| ClassYearArea {
            year,
            class_name: name.to_string(),
            area_km2,
        })
        .collect()
}

/// Class names in legend order, followed by any name the legend lacks.
fn class_names(aggregated: &[ClassYearArea], legend: &Legend) -> Vec<String> {
    let present: BTreeSet<&str> = aggregated.iter().map(|a| a.class_name.as_str()).collect();
    let mut names: Vec<String> = Vec::new();
    for entry in legend.entries() {
        if present.contains(entry.name.as_str()) && !names.contains(&entry.name) {
            names.push(entry.name.clone());
        }
    }
    for name in present {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn years_of(aggregated: &[ClassYearArea]) -> Vec<i32> {
    aggregated
        .iter()
        .map(|a| a.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn lookup(aggregated: &[ClassYearArea], year: i32, name: &str) -> Option<f64> {
    aggregated
        .iter()
        .find(|a| a.year == year && a.class_name == name)
        .map(|a| a.area_km2)
}

pub fn stacked_percentage(rows: &[AreaStatistic], legend: &Legend) -> StackedPercentChart {
    let aggregated = aggregate_by_name(rows);
    let years = years_of(&aggregated);
    let names = class_names(&aggregated, legend);

    let totals: Vec<f64> = years
        .iter()
        .map(|&y| aggregated.iter().filter(|a| a.year == y).map(|a| a.area_km2).sum())
        .collect();

    let mut series: Vec<(f64, ChartSeries)> = names
        .iter()
        .map(|name| {
            let points: Vec<SeriesPoint> = years
                .iter()
                .zip(&totals)
                .map(|(&year, &total)| {
                    let area = lookup(&aggregated, year, name).unwrap_or(0.0);
                    let value = if total > 0.0 { area / total * 100.0 } else { 0.0 };
                    SeriesPoint { year, value }
                })
                .collect();
            let mean = if points.is_empty() {
                0.0
            } else {
                points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64
            };
            (
                mean,
                ChartSeries {
                    name: name.clone(),
                    color: legend.color_for_name(name).to_string(),
                    points,
                },
            )
        })
        .collect();
    // stable sort keeps legend order among equal means
    series.sort_by(|a, b| b.0.total_cmp(&a.0));

    StackedPercentChart {
        years,
        series: series.into_iter().map(|(_, s)| s).collect(),
        x_range: [0.0, 100.0],
    }
}

/// One series per class with its km² per year, sorted by year.
pub fn grouped_bars(rows: &[AreaStatistic], legend: &Legend) -> Vec<ChartSeries> {
    let aggregated = aggregate_by_name(rows);
    let years = years_of(&aggregated);
    class_names(&aggregated, legend)
        .into_iter()
        .map(|name| ChartSeries {
            color: legend.color_for_name(&name).to_string(),
            points: years
                .iter()
                .filter_map(|&year| {
                    lookup(&aggregated, year, &name).map(|value| SeriesPoint { year, value })
                })
                .collect(),
            name,
        })
        .collect()
}

/// Percentage per class for one year; the latest year when none is given.
///
/// A year with zero total area yields 0 % slices.
pub fn pie(rows: &[AreaStatistic], legend: &Legend, year: Option<i32>) -> Option<PieChart> {
    let aggregated = aggregate_by_name(rows);
    let year = match year {
        Some(y) => y,
        None => years_of(&aggregated).last().copied()?,
    };
    let names = class_names(&aggregated, legend);
    let year_rows: Vec<(String, f64)> = names
        .into_iter()
        .filter_map(|name| lookup(&aggregated, year, &name).map(|a| (name, a)))
        .collect();
    if year_rows.is_empty() {
        return None;
    }
    let total: f64 = year_rows.iter().map(|(_, a)| a).sum();
    let slices = year_rows
        .into_iter()
        .map(|(name, area_km2)| PieSlice {
            color: legend.color_for_name(&name).to_string(),
            percent: if total > 0.0 { area_km2 / total * 100.0 } else { 0.0 },
            area_km2,
            name,
        })
        .collect();
    Some(PieChart {
        year,
        total_km2: total,
        slices,
    })
}

pub fn pivot_table(rows: &[AreaStatistic], legend: &Legend) -> PivotTable {
    let aggregated = aggregate_by_name(rows);
    let years = years_of(&aggregated);
    let columns = class_names(&aggregated, legend);

    let values: Vec<Vec<Option<f64>>> = years
        .iter()
        .map(|&year| {
            columns
                .iter()
                .map(|name| lookup(&aggregated, year, name).map(round2))
                .collect()
        })
        .collect();

    let extreme = |column: usize, want_max: bool| -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (row, line) in values.iter().enumerate() {
            let Some(v) = line[column] else { continue };
            let better = match best {
                None => true,
                Some((_, b)) if want_max => v > b,
                Some((_, b)) => v < b,
            };
            if better {
                best = Some((row, v));
            }
        }
        best.map(|(row, _)| row)
    };
    let column_max = (0..columns.len()).map(|c| extreme(c, true)).collect();
    let column_min = (0..columns.len()).map(|c| extreme(c, false)).collect();

    PivotTable {
        years,
        columns,
        values,
        column_max,
        column_min,
    }
}

pub fn build_charts(rows: &[AreaStatistic], legend: &Legend, pie_year: Option<i32>) -> ChartBundle {
    ChartBundle {
        stacked_percent: stacked_percentage(rows, legend),
        grouped_bars: grouped_bars(rows, legend),
        pie: pie(rows, legend, pie_year),
        table: pivot_table(rows, legend),
    }
}
