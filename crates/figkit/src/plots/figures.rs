//! The paper's figures as data.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Figure, HistLayer, ScatterPlot, StackedHistogram};
use crate::citations::CitationRecord;

/// Number of synthetic studies drawn for the illustrative figures.
pub const STUDY_COUNT: usize = 40;

/// Illustrative scatter: effect breadth is spread out, quantification is
/// concentrated near zero (`x = 8u²`, `y = v⁴`).
pub fn studies_scatter(seed: u64) -> Figure {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = (0..STUDY_COUNT)
        .map(|_| {
            let (u, v): (f64, f64) = (rng.gen(), rng.gen());
            (8.0 * u * u, (v * v).powi(2))
        })
        .collect();
    Figure::Scatter(ScatterPlot {
        x_label: "Studied Effects (Biology)".into(),
        y_label: "Parameter Estimation (Quantification)".into(),
        points,
    })
}

/// Illustrative publication years skewed towards the present,
/// `1995 + 30 (1 - u^1.7)`.
pub fn studies_over_time(seed: u64) -> Figure {
    let mut rng = StdRng::seed_from_u64(seed);
    let years = (0..STUDY_COUNT)
        .map(|_| 1995.0 + 30.0 * (1.0 - rng.gen::<f64>().powf(1.7)))
        .collect();
    Figure::Histogram(StackedHistogram {
        x_label: "Year".into(),
        y_label: "Number of Studies".into(),
        layers: vec![HistLayer {
            label: String::new(),
            values: years,
            weights: None,
        }],
    })
}

/// One cross per record with both counts present.
pub fn citations_scatter(records: &[CitationRecord], first: &str, second: &str) -> Figure {
    let points = records
        .iter()
        .filter_map(|r| Some((r.count1? as f64, r.count2? as f64)))
        .collect();
    Figure::Scatter(ScatterPlot {
        x_label: format!("Citations ({first})"),
        y_label: format!("Citations ({second})"),
        points,
    })
}

/// Citations per publication year, one stacked layer per source. Missing
/// counts weigh zero.
pub fn citations_over_time(records: &[CitationRecord], first: &str, second: &str) -> Figure {
    let years: Vec<f64> = records.iter().map(|r| r.year as f64).collect();
    let weights = |pick: fn(&CitationRecord) -> Option<i64>| -> Vec<f64> {
        records.iter().map(|r| pick(r).unwrap_or(0) as f64).collect()
    };
    Figure::Histogram(StackedHistogram {
        x_label: "Publication Year".into(),
        y_label: "Citations".into(),
        layers: vec![
            HistLayer {
                label: first.to_string(),
                values: years.clone(),
                weights: Some(weights(|r| r.count1)),
            },
            HistLayer {
                label: second.to_string(),
                values: years,
                weights: Some(weights(|r| r.count2)),
            },
        ],
    })
}
