//! Frequency-domain `.dat` export parser.
//!
//! Expected layout: one header row, then tab-separated columns
//!
//! | # | field              | notes                         |
//! |---|--------------------|-------------------------------|
//! | 1 | `frequency_hz`     | primary measurement           |
//! | 2 | `amplitude`        | primary measurement           |
//! | 3 | `phase`            | primary measurement           |
//! | 4 | `frequency_hz_ave` | averaged block, optional      |
//! | 5 | `ave_amplitude`    | averaged block, optional      |
//! | 6 | `ave_phase`        | averaged block, optional      |
//!
//! Header names in the file are ignored; columns are mapped by position.

use std::path::Path;

use super::error::{DataError, DataResult};
use super::loader::{ensure_exists, file_metadata, parse_number, read_text};
use super::model::{
    FileKind, Metadata, MetadataValue, ParseResult, Row, TabularDataset, AMPLITUDE, AVE_AMPLITUDE,
    AVE_PHASE, FREQUENCY_HZ, FREQUENCY_HZ_AVE, FREQUENCY_KHZ, FREQUENCY_KHZ_AVE, PHASE,
};
use super::summary::summarize;

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Which named fields the columns of a DAT file map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// frequency, amplitude, phase
    PrimaryOnly,
    /// primary triple followed by the averaged triple
    PrimaryPlusAverage,
}

const PRIMARY_FIELDS: [&str; 3] = [FREQUENCY_HZ, AMPLITUDE, PHASE];
const FULL_FIELDS: [&str; 6] = [
    FREQUENCY_HZ,
    AMPLITUDE,
    PHASE,
    FREQUENCY_HZ_AVE,
    AVE_AMPLITUDE,
    AVE_PHASE,
];

// Positions inside a row, valid for both layouts where present.
const COL_FREQ: usize = 0;
const COL_AMPLITUDE: usize = 1;
const COL_FREQ_AVE: usize = 3;

impl ColumnLayout {
    pub fn from_column_count(count: usize) -> DataResult<Self> {
        match count {
            0..=2 => Err(DataError::InvalidFormat {
                format: "DAT",
                message: format!("at least 3 columns required, found {count}"),
            }),
            3..=5 => Ok(ColumnLayout::PrimaryOnly),
            _ => Ok(ColumnLayout::PrimaryPlusAverage),
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ColumnLayout::PrimaryOnly => &PRIMARY_FIELDS,
            ColumnLayout::PrimaryPlusAverage => &FULL_FIELDS,
        }
    }

    pub fn has_average(self) -> bool {
        self == ColumnLayout::PrimaryPlusAverage
    }
}

// ---------------------------------------------------------------------------
// Raw table reading
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_tab_delimited(text: &str) -> DataResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(RawTable { headers, rows })
}

fn read_whitespace_delimited(text: &str) -> RawTable {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.split_whitespace().map(str::to_string).collect::<Vec<_>>());

    let headers = lines.next().unwrap_or_default();
    RawTable {
        headers,
        rows: lines.collect(),
    }
}

fn read_table(text: &str) -> DataResult<RawTable> {
    let table = read_tab_delimited(text)?;
    if table.headers.len() >= 3 {
        return Ok(table);
    }
    log::debug!(
        "Only {} tab-separated column(s), retrying with whitespace delimiter",
        table.headers.len()
    );
    Ok(read_whitespace_delimited(text))
}

// ---------------------------------------------------------------------------
// Row processing
// ---------------------------------------------------------------------------

/// Coerce raw cells to numbers and apply the average-block convention.
fn numeric_row(raw: &[String], layout: ColumnLayout) -> Row {
    let width = layout.fields().len();
    let mut row: Row = (0..width)
        .map(|i| raw.get(i).and_then(|c| parse_number(c)))
        .collect();

    // A zero average frequency is padding after the averaged block ends.
    if layout.has_average() && row[COL_FREQ_AVE] == Some(0.0) {
        for v in &mut row[COL_FREQ_AVE..] {
            *v = None;
        }
    }
    row
}

fn validate(dataset: &TabularDataset) {
    let Some(freqs) = dataset.column(FREQUENCY_HZ) else {
        return;
    };
    if freqs.iter().any(Option::is_none) {
        log::warn!("Found absent values in frequency data");
    }
    let present: Vec<f64> = freqs.into_iter().flatten().collect();
    if present.windows(2).any(|w| w[1] < w[0]) {
        log::warn!("Frequency data is not monotonically increasing");
    }
}

fn range_metadata(dataset: &TabularDataset, field: &str, scale: f64) -> MetadataValue {
    dataset
        .range(field)
        .map_or(MetadataValue::Null, |(lo, hi)| {
            MetadataValue::Range(lo / scale, hi / scale)
        })
}

fn dat_metadata(dataset: &TabularDataset, layout: ColumnLayout) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("data_format".into(), "Frequency Domain Measurement".into());
    metadata.insert("frequency_unit".into(), "Hz".into());
    metadata.insert("amplitude_unit".into(), "V".into());
    metadata.insert("phase_unit".into(), "degrees".into());
    metadata.insert(
        "column_layout".into(),
        match layout {
            ColumnLayout::PrimaryOnly => "primary",
            ColumnLayout::PrimaryPlusAverage => "primary+average",
        }
        .into(),
    );

    metadata.insert(
        "frequency_range_hz".into(),
        range_metadata(dataset, FREQUENCY_HZ, 1.0),
    );
    metadata.insert(
        "frequency_range_khz".into(),
        range_metadata(dataset, FREQUENCY_HZ, 1000.0),
    );
    metadata.insert("amplitude_range".into(), range_metadata(dataset, AMPLITUDE, 1.0));
    metadata.insert("phase_range".into(), range_metadata(dataset, PHASE, 1.0));

    let has_average_data = dataset
        .present_values(AVE_AMPLITUDE)
        .is_some_and(|v| !v.is_empty());
    metadata.insert("has_average_data".into(), has_average_data.into());

    // Literal first difference, not an average over the file.
    let rows = dataset.rows();
    if rows.len() > 1 {
        let step = rows[1][COL_FREQ]
            .zip(rows[0][COL_FREQ])
            .map(|(f1, f0)| f1 - f0);
        metadata.insert("frequency_step_hz".into(), step.into());
    }
    metadata
}

/// `YYYYMMDD-ID-...` style stems carry the date and measurement id.
fn measurement_info(stem: &str) -> Option<(String, String)> {
    let mut parts = stem.split('-');
    let date = parts.next()?;
    let id = parts.next()?;
    Some((date.to_string(), id.to_string()))
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse a `.dat` file.
pub fn parse_dat(path: &Path) -> DataResult<ParseResult> {
    ensure_exists(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::info!("Loading DAT file: {name}");

    let text = read_text(path)?;
    let mut result = parse_dat_str(&text, &path.display().to_string())?;

    let metadata = &mut result.dataset.metadata;
    metadata.extend(file_metadata(path, FileKind::Dat));
    if let Some((date, id)) = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(measurement_info)
    {
        metadata.insert("measurement_date".into(), date.into());
        metadata.insert("measurement_id".into(), id.into());
    }

    log::info!(
        "Loaded DAT file {name} with {} data points",
        result.dataset.len()
    );
    Ok(result)
}

/// Parse DAT content already in memory. `source` names it in errors.
pub fn parse_dat_str(text: &str, source: &str) -> DataResult<ParseResult> {
    let table = read_table(text)?;
    let layout = ColumnLayout::from_column_count(table.headers.len())?;
    let fields = layout.fields();
    if table.headers.len() > fields.len() {
        log::warn!(
            "{source}: ignoring {} column(s) beyond the first {}",
            table.headers.len() - fields.len(),
            fields.len()
        );
    }
    log::debug!("{source}: column layout {layout:?}");

    let total = table.rows.len();
    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|raw| numeric_row(raw, layout))
        .filter(|row| row[COL_FREQ].is_some() && row[COL_AMPLITUDE].is_some())
        .collect();
    if rows.len() < total {
        log::debug!(
            "{source}: dropped {} row(s) without frequency or amplitude",
            total - rows.len()
        );
    }
    if rows.is_empty() {
        return Err(DataError::NoValidData(source.to_string()));
    }

    let mut dataset = TabularDataset::new(fields.iter().map(|f| f.to_string()).collect(), rows)?
        .with_derived(FREQUENCY_KHZ, |ds, row| {
            ds.get(row, FREQUENCY_HZ).map(|f| f / 1000.0)
        });
    let has_average_frequency = dataset
        .present_values(FREQUENCY_HZ_AVE)
        .is_some_and(|v| !v.is_empty());
    if has_average_frequency {
        dataset = dataset.with_derived(FREQUENCY_KHZ_AVE, |ds, row| {
            ds.get(row, FREQUENCY_HZ_AVE).map(|f| f / 1000.0)
        });
    }

    validate(&dataset);

    let metadata = dat_metadata(&dataset, layout);
    let dataset = dataset.with_metadata(metadata);
    let summary = summarize(&dataset);

    Ok(ParseResult {
        kind: FileKind::Dat,
        dataset,
        summary,
    })
}
