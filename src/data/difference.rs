//! Pointwise difference of two datasets resampled onto a shared domain.

use serde::{Deserialize, Serialize};

use super::error::{DataError, DataResult};
use super::model::{
    Metadata, MetadataValue, TabularDataset, FREQUENCY_GHZ, MAGNITUDE_DB,
    MAGNITUDE_DIFFERENCE_DB, PHASE_DEG, PHASE_DIFFERENCE_DEG,
};

pub const DEFAULT_GRID_POINTS: usize = 1001;

/// Tunables for the difference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferenceOptions {
    /// Number of evenly spaced points on the shared domain, endpoints included.
    pub grid_points: usize,
}

impl Default for DifferenceOptions {
    fn default() -> Self {
        Self {
            grid_points: DEFAULT_GRID_POINTS,
        }
    }
}

/// What to subtract.
///
/// The S1P kinds use `frequency_ghz` as the domain and fixed measurement
/// fields; `Custom` names both fields and says whether the result is an angle
/// in degrees that must be wrapped.
#[derive(Debug, Clone, PartialEq)]
pub enum DifferenceKind {
    Magnitude,
    Phase,
    Both,
    Custom {
        x_field: String,
        y_field: String,
        wrap_phase: bool,
    },
}

impl DifferenceKind {
    pub fn custom(x_field: &str, y_field: &str) -> Self {
        DifferenceKind::Custom {
            x_field: x_field.to_string(),
            y_field: y_field.to_string(),
            wrap_phase: false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DifferenceKind::Magnitude => "magnitude",
            DifferenceKind::Phase => "phase",
            DifferenceKind::Both => "both",
            DifferenceKind::Custom { .. } => "custom",
        }
    }

    pub fn x_field(&self) -> &str {
        match self {
            DifferenceKind::Custom { x_field, .. } => x_field,
            _ => FREQUENCY_GHZ,
        }
    }

    fn targets(&self) -> Vec<Target> {
        let magnitude = Target {
            y_field: MAGNITUDE_DB.to_string(),
            output: MAGNITUDE_DIFFERENCE_DB.to_string(),
            wrap: false,
        };
        let phase = Target {
            y_field: PHASE_DEG.to_string(),
            output: PHASE_DIFFERENCE_DEG.to_string(),
            wrap: true,
        };
        match self {
            DifferenceKind::Magnitude => vec![magnitude],
            DifferenceKind::Phase => vec![phase],
            DifferenceKind::Both => vec![magnitude, phase],
            DifferenceKind::Custom {
                y_field,
                wrap_phase,
                ..
            } => vec![Target {
                y_field: y_field.clone(),
                output: format!("{y_field}_difference"),
                wrap: *wrap_phase,
            }],
        }
    }
}

struct Target {
    y_field: String,
    output: String,
    wrap: bool,
}

/// Difference dataset; its metadata describes how it was produced.
#[derive(Debug, Clone)]
pub struct DifferenceResult {
    pub dataset: TabularDataset,
}

impl DifferenceResult {
    pub fn metadata(&self) -> &Metadata {
        &self.dataset.metadata
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Wrap an angle difference in degrees into `[-180, 180)`.
pub fn wrap_degrees(diff: f64) -> f64 {
    (diff + 180.0).rem_euclid(360.0) - 180.0
}

/// `n` evenly spaced points from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + i as f64 * step })
                .collect()
        }
    }
}

/// Piecewise-linear interpolation over ascending `xs`, extrapolating
/// linearly from the end segments outside `[xs[0], xs[n-1]]`.
pub fn interpolate_linear(xs: &[f64], ys: &[f64], targets: &[f64]) -> Vec<f64> {
    targets
        .iter()
        .map(|&t| interpolate_single(xs, ys, t))
        .collect()
}

fn interpolate_single(xs: &[f64], ys: &[f64], target: f64) -> f64 {
    let n = xs.len();
    if n == 1 {
        return ys[0];
    }
    let upper = xs.partition_point(|&x| x <= target).clamp(1, n - 1);
    let lower = upper - 1;

    let (x0, x1) = (xs[lower], xs[upper]);
    if x1 == x0 {
        return ys[upper];
    }
    ys[lower] + (target - x0) * (ys[upper] - ys[lower]) / (x1 - x0)
}

// ---------------------------------------------------------------------------
// Series extraction
// ---------------------------------------------------------------------------

/// `(x, y)` pairs with both values present, ascending in x.
struct Series {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

fn field_index(ds: &TabularDataset, field: &str, label: &str) -> DataResult<usize> {
    ds.field_index(field).ok_or_else(|| DataError::FieldNotFound {
        field: field.to_string(),
        dataset: label.to_string(),
    })
}

fn extract_series(ds: &TabularDataset, x_field: &str, y_field: &str, label: &str) -> DataResult<Series> {
    let xi = field_index(ds, x_field, label)?;
    let yi = field_index(ds, y_field, label)?;

    let mut pairs: Vec<(f64, f64)> = ds
        .rows()
        .iter()
        .filter_map(|row| row[xi].zip(row[yi]))
        .collect();
    if pairs.is_empty() {
        return Err(DataError::NoValidData(format!("{label} ({x_field}, {y_field})")));
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(Series {
        xs: pairs.iter().map(|p| p.0).collect(),
        ys: pairs.iter().map(|p| p.1).collect(),
    })
}

fn domain(ds: &TabularDataset, x_field: &str, label: &str) -> DataResult<(f64, f64)> {
    field_index(ds, x_field, label)?;
    ds.range(x_field)
        .ok_or_else(|| DataError::NoValidData(format!("{label} ({x_field})")))
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Difference `a - b` with default options.
pub fn difference(
    a: &TabularDataset,
    b: &TabularDataset,
    kind: &DifferenceKind,
) -> DataResult<DifferenceResult> {
    difference_with(a, b, kind, &DifferenceOptions::default())
}

/// Resample `a` and `b` onto their shared X domain and subtract pointwise.
pub fn difference_with(
    a: &TabularDataset,
    b: &TabularDataset,
    kind: &DifferenceKind,
    options: &DifferenceOptions,
) -> DataResult<DifferenceResult> {
    if options.grid_points < 2 {
        return Err(DataError::InvalidFormat {
            format: "difference options",
            message: format!("grid_points must be at least 2, got {}", options.grid_points),
        });
    }

    let name_a = a.source_name().unwrap_or("File 1").to_string();
    let name_b = b.source_name().unwrap_or("File 2").to_string();
    let x_field = kind.x_field();

    let (a_min, a_max) = domain(a, x_field, &name_a)?;
    let (b_min, b_max) = domain(b, x_field, &name_b)?;
    let x_min = a_min.max(b_min);
    let x_max = a_max.min(b_max);
    if x_min >= x_max {
        return Err(DataError::NoOverlap {
            field: x_field.to_string(),
            a_min,
            a_max,
            b_min,
            b_max,
        });
    }

    let grid = linspace(x_min, x_max, options.grid_points);
    let targets = kind.targets();

    let mut columns: Vec<(String, Vec<Option<f64>>)> =
        vec![(x_field.to_string(), grid.iter().map(|&x| Some(x)).collect())];
    for target in &targets {
        let series_a = extract_series(a, x_field, &target.y_field, &name_a)?;
        let series_b = extract_series(b, x_field, &target.y_field, &name_b)?;
        let ya = interpolate_linear(&series_a.xs, &series_a.ys, &grid);
        let yb = interpolate_linear(&series_b.xs, &series_b.ys, &grid);

        let diff: Vec<Option<f64>> = ya
            .iter()
            .zip(&yb)
            .map(|(va, vb)| {
                let d = va - vb;
                Some(if target.wrap { wrap_degrees(d) } else { d })
            })
            .collect();
        columns.push((target.output.clone(), diff));
    }

    let unit = match kind {
        DifferenceKind::Custom { .. } => "",
        _ => " GHz",
    };
    let mut metadata = Metadata::new();
    metadata.insert("difference_kind".into(), kind.name().into());
    metadata.insert("file1_name".into(), name_a.clone().into());
    metadata.insert("file2_name".into(), name_b.clone().into());
    metadata.insert("source_names".into(), MetadataValue::List(vec![name_a, name_b]));
    metadata.insert("x_field".into(), x_field.into());
    metadata.insert(
        "y_fields".into(),
        MetadataValue::List(targets.iter().map(|t| t.y_field.clone()).collect()),
    );
    metadata.insert(
        "shared_domain_range".into(),
        format!("{x_min:.3} - {x_max:.3}{unit}").into(),
    );
    metadata.insert("shared_domain".into(), MetadataValue::Range(x_min, x_max));
    metadata.insert("point_count".into(), MetadataValue::Integer(grid.len() as i64));
    metadata.insert(
        "phase_wrapped".into(),
        targets.iter().any(|t| t.wrap).into(),
    );

    let dataset = TabularDataset::from_columns(columns)?.with_metadata(metadata);
    log::info!(
        "Computed {} difference over {} points ({x_min} - {x_max})",
        kind.name(),
        grid.len()
    );
    Ok(DifferenceResult { dataset })
}
