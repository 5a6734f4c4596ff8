use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::error::{DataError, DataResult};
use super::summary::Summary;

// ---------------------------------------------------------------------------
// Canonical field names
// ---------------------------------------------------------------------------

pub const FREQUENCY_HZ: &str = "frequency_hz";
pub const FREQUENCY_KHZ: &str = "frequency_khz";
pub const FREQUENCY_GHZ: &str = "frequency_ghz";

pub const MAGNITUDE_DB: &str = "magnitude_db";
pub const MAGNITUDE_LINEAR: &str = "magnitude_linear";
pub const PHASE_DEG: &str = "phase_deg";
pub const PHASE_RAD: &str = "phase_rad";

pub const AMPLITUDE: &str = "amplitude";
pub const PHASE: &str = "phase";
pub const FREQUENCY_HZ_AVE: &str = "frequency_hz_ave";
pub const AVE_AMPLITUDE: &str = "ave_amplitude";
pub const AVE_PHASE: &str = "ave_phase";
pub const FREQUENCY_KHZ_AVE: &str = "frequency_khz_ave";

pub const MAGNITUDE_DIFFERENCE_DB: &str = "magnitude_difference_db";
pub const PHASE_DIFFERENCE_DEG: &str = "phase_difference_deg";

/// Axis label for a field, as shown by plotting front-ends.
pub fn display_label(field: &str) -> String {
    let known = match field {
        FREQUENCY_HZ => "Frequency (Hz)",
        FREQUENCY_KHZ => "Frequency (kHz)",
        FREQUENCY_GHZ => "Frequency (GHz)",
        MAGNITUDE_DB => "S11 Magnitude (dB)",
        MAGNITUDE_LINEAR => "S11 Magnitude (linear)",
        PHASE_DEG => "S11 Phase (degrees)",
        PHASE_RAD => "S11 Phase (radians)",
        AMPLITUDE => "Amplitude",
        PHASE => "Phase (degrees)",
        MAGNITUDE_DIFFERENCE_DB => "Magnitude Difference (dB)",
        PHASE_DIFFERENCE_DEG => "Phase Difference (degrees)",
        _ => "",
    };
    if !known.is_empty() {
        return known.to_string();
    }

    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// MetadataValue – a single metadata entry
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value attached to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// `(min, max)` of some quantity.
    Range(f64, f64),
    List(Vec<String>),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Range(lo, hi) => write!(f, "{lo:.4} - {hi:.4}"),
            MetadataValue::List(items) => write!(f, "{}", items.join("; ")),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<Option<f64>> for MetadataValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(MetadataValue::Null, MetadataValue::Float)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

// ---------------------------------------------------------------------------
// TabularDataset – ordered rows of named numeric fields
// ---------------------------------------------------------------------------

/// One row: a value per field, in field order. `None` marks an absent value.
pub type Row = Vec<Option<f64>>;

/// A loaded measurement table.
///
/// Every row holds exactly one slot per entry of `fields`; absent values are
/// `None`, never omitted. Primary measurement fields come first, derived ones
/// are appended after them.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    fields: Vec<String>,
    rows: Vec<Row>,
    pub metadata: Metadata,
}

impl TabularDataset {
    /// Build a dataset, checking that every row matches the field count.
    /// Non-finite values are stored as absent.
    pub fn new(fields: Vec<String>, mut rows: Vec<Row>) -> DataResult<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != fields.len()) {
            return Err(DataError::InvalidFormat {
                format: "dataset",
                message: format!(
                    "row {i} has {} values but there are {} fields",
                    row.len(),
                    fields.len()
                ),
            });
        }
        for value in rows.iter_mut().flat_map(|r| r.iter_mut()) {
            *value = value.filter(|v| v.is_finite());
        }
        Ok(TabularDataset {
            fields,
            rows,
            metadata: Metadata::new(),
        })
    }

    /// Build a dataset from equally long columns.
    pub fn from_columns(columns: Vec<(String, Vec<Option<f64>>)>) -> DataResult<Self> {
        let n_rows = columns.first().map_or(0, |(_, v)| v.len());
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != n_rows) {
            return Err(DataError::InvalidFormat {
                format: "dataset",
                message: format!(
                    "column '{name}' has {} values, expected {n_rows}",
                    values.len()
                ),
            });
        }

        let mut rows: Vec<Row> = vec![Vec::with_capacity(columns.len()); n_rows];
        let mut fields = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(v);
            }
            fields.push(name);
        }
        TabularDataset::new(fields, rows)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Append a field computed from each existing row.
    pub fn with_derived<F>(mut self, name: &str, derive: F) -> Self
    where
        F: Fn(&TabularDataset, &Row) -> Option<f64>,
    {
        let values: Vec<Option<f64>> = self
            .rows
            .iter()
            .map(|r| derive(&self, r).filter(|v| v.is_finite()))
            .collect();
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
        self.fields.push(name.to_string());
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_index(field).is_some()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Value of `field` in `row`; `None` if the field is unknown or absent.
    pub fn get(&self, row: &Row, field: &str) -> Option<f64> {
        self.field_index(field).and_then(|i| row.get(i).copied().flatten())
    }

    /// All values of one field in row order.
    pub fn column(&self, field: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.field_index(field)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Present values of one field in row order.
    pub fn present_values(&self, field: &str) -> Option<Vec<f64>> {
        let idx = self.field_index(field)?;
        Some(self.rows.iter().filter_map(|r| r[idx]).collect())
    }

    /// `(min, max)` over the present values of a field.
    pub fn range(&self, field: &str) -> Option<(f64, f64)> {
        let values = self.present_values(field)?;
        if values.is_empty() {
            return None;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    /// Name used to refer to this dataset in messages and difference metadata.
    pub fn source_name(&self) -> Option<&str> {
        self.metadata.get("file_name").and_then(MetadataValue::as_str)
    }
}

// ---------------------------------------------------------------------------
// ParseResult – what a parser hands back to its caller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileKind {
    S1p,
    Dat,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::S1p => write!(f, "S1P"),
            FileKind::Dat => write!(f, "DAT"),
        }
    }
}

/// A freshly parsed file with its eagerly computed summary.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub kind: FileKind,
    pub dataset: TabularDataset,
    pub summary: Summary,
}

impl ParseResult {
    pub fn metadata(&self) -> &Metadata {
        &self.dataset.metadata
    }
}
