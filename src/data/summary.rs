use serde::Serialize;

use super::model::{TabularDataset, FREQUENCY_HZ};

// ---------------------------------------------------------------------------
// Per-field statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics over the present values of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub field: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); undefined for a single value.
    pub std: Option<f64>,
    pub span: f64,
    /// Mean successive difference, only computed for the primary frequency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

/// Summary of a whole dataset, computed eagerly at parse time.
///
/// There is no separate block for DAT average columns: their statistics,
/// including how many rows carry an average, are the `fields` entries for
/// `ave_amplitude`, `ave_phase` and `frequency_hz_ave`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub num_points: usize,
    pub columns: Vec<String>,
    pub fields: Vec<FieldStats>,
    /// Frequency step when the spacing is uniform within 1 %, else `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_step_hz: Option<f64>,
}

impl Summary {
    pub fn field(&self, name: &str) -> Option<&FieldStats> {
        self.fields.iter().find(|s| s.field == name)
    }
}

/// Summarise every field with at least one present value.
///
/// Fields with no present values are left out rather than reported as zero.
pub fn summarize(dataset: &TabularDataset) -> Summary {
    if dataset.is_empty() {
        return Summary::default();
    }

    let fields = dataset
        .fields()
        .iter()
        .filter_map(|name| {
            let values = dataset.present_values(name)?;
            field_stats(name, &values, name == FREQUENCY_HZ)
        })
        .collect();

    Summary {
        num_points: dataset.len(),
        columns: dataset.fields().to_vec(),
        fields,
        frequency_step_hz: None,
    }
}

/// Statistics over `values`, `None` when there is nothing to describe.
pub fn field_stats(name: &str, values: &[f64], with_step: bool) -> Option<FieldStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (n - 1.0)).sqrt())
    } else {
        None
    };
    let step = with_step.then(|| mean_step(values));

    Some(FieldStats {
        field: name.to_string(),
        count: values.len(),
        min,
        max,
        mean,
        std,
        span: max - min,
        step,
    })
}

/// Mean of successive differences; zero for fewer than two values.
pub fn mean_step(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let diffs = successive_differences(values);
    diffs.iter().sum::<f64>() / diffs.len() as f64
}

/// The common step if every successive difference is within 1 % of the mean.
pub fn uniform_step(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let diffs = successive_differences(values);
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    if mean <= 0.0 {
        return None;
    }
    let uniform = diffs.iter().all(|d| (d - mean).abs() / mean < 0.01);
    uniform.then_some(mean)
}

fn successive_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
