//! Single-port Touchstone (`.s1p`) parser.
//!
//! Layout handled:
//! - one `#` option line: `# <unit> <parameter> <format> R <impedance>`
//! - `!` comment lines, also trailing `!` comments on data lines
//! - data lines `frequency value1 value2`, whitespace separated
//!
//! Values are normalised so `magnitude_db` / `phase_deg` always hold dB and
//! degrees and `frequency_hz` always holds Hertz, whatever the option line says.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{DataError, DataResult};
use super::loader::{ensure_exists, extension_of, file_metadata, parse_number, read_text};
use super::model::{
    FileKind, Metadata, MetadataValue, ParseResult, TabularDataset, FREQUENCY_GHZ, FREQUENCY_HZ,
    MAGNITUDE_DB, MAGNITUDE_LINEAR, PHASE_DEG, PHASE_RAD,
};
use super::summary::{summarize, uniform_step};

/// Manufacturer names recognised in comment lines.
pub const DEFAULT_INSTRUMENT_KEYWORDS: &[&str] = &[
    "rohde",
    "schwarz",
    "keysight",
    "agilent",
    "anritsu",
    "copper mountain",
    "tektronix",
    "hewlett",
];

/// Tunables for the S1P parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S1pOptions {
    /// Case-insensitive substrings that mark a comment as the instrument name.
    pub instrument_keywords: Vec<String>,
}

impl Default for S1pOptions {
    fn default() -> Self {
        Self {
            instrument_keywords: DEFAULT_INSTRUMENT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Option line
// ---------------------------------------------------------------------------

/// How the two values after the frequency are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterFormat {
    /// dB magnitude, angle in degrees.
    Db,
    /// Linear magnitude, angle in degrees.
    Ma,
    /// Real and imaginary parts.
    Ri,
}

impl ParameterFormat {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "DB" => Some(ParameterFormat::Db),
            "MA" => Some(ParameterFormat::Ma),
            "RI" => Some(ParameterFormat::Ri),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterFormat::Db => "DB",
            ParameterFormat::Ma => "MA",
            ParameterFormat::Ri => "RI",
        }
    }

    /// Convert a raw value pair to `(magnitude_db, phase_deg)`.
    pub fn to_db_deg(self, a: f64, b: f64) -> (f64, f64) {
        match self {
            ParameterFormat::Db => (a, b),
            ParameterFormat::Ma => (20.0 * a.log10(), b),
            ParameterFormat::Ri => (20.0 * a.hypot(b).log10(), b.atan2(a).to_degrees()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OptionLine {
    frequency_unit: String,
    freq_mult: f64,
    parameter_type: String,
    format: ParameterFormat,
    data_format: String,
    z0: f64,
}

impl Default for OptionLine {
    fn default() -> Self {
        Self {
            frequency_unit: "Hz".to_string(),
            freq_mult: 1.0,
            parameter_type: "S".to_string(),
            format: ParameterFormat::Db,
            data_format: "MA".to_string(),
            z0: 50.0,
        }
    }
}

/// Read the tokens after `#` positionally; a missing token keeps its default.
fn parse_option_line(body: &str) -> OptionLine {
    let mut options = OptionLine::default();
    let tokens: Vec<&str> = body.split_whitespace().collect();
    log::debug!("S1P option tokens: {tokens:?}");

    if let Some(unit) = tokens.first() {
        let unit = unit.to_ascii_uppercase();
        options.freq_mult = match unit.as_str() {
            "HZ" => 1.0,
            "KHZ" => 1e3,
            "MHZ" => 1e6,
            "GHZ" => 1e9,
            other => {
                log::warn!("Unknown frequency unit '{other}', assuming Hz");
                1.0
            }
        };
        options.frequency_unit = unit;
    }
    if let Some(param) = tokens.get(1) {
        options.parameter_type = param.to_ascii_uppercase();
    }
    if let Some(format) = tokens.get(2) {
        match ParameterFormat::from_token(format) {
            Some(f) => options.format = f,
            None => log::warn!("Unknown parameter format '{format}', assuming DB"),
        }
    }
    if let Some(repr) = tokens.get(3) {
        options.data_format = repr.to_ascii_uppercase();
    }
    if let Some(z0) = tokens.get(4) {
        match parse_number(z0) {
            Some(z) => options.z0 = z,
            None => log::warn!("Invalid reference impedance '{z0}', assuming 50 ohm"),
        }
    }
    options
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

struct Sections<'a> {
    option_line: Option<&'a str>,
    comments: Vec<&'a str>,
    /// `(1-based line number, content)`
    data: Vec<(usize, &'a str)>,
}

fn split_sections(text: &str) -> Sections<'_> {
    let mut sections = Sections {
        option_line: None,
        comments: Vec::new(),
        data: Vec::new(),
    };

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(body) = line.strip_prefix('#') {
            if sections.option_line.is_some() {
                log::warn!("Line {}: additional option line ignored", i + 1);
            } else {
                sections.option_line = Some(body.trim());
            }
        } else if let Some(comment) = line.strip_prefix('!') {
            let comment = comment.trim();
            if !comment.is_empty() {
                sections.comments.push(comment);
            }
        } else {
            // Drop trailing inline comment.
            let content = line.split('!').next().unwrap_or("").trim();
            if !content.is_empty() {
                sections.data.push((i + 1, content));
            }
        }
    }
    sections
}

fn find_instrument(comments: &[&str], keywords: &[String]) -> Option<String> {
    comments
        .iter()
        .find(|c| {
            let lower = c.to_lowercase();
            keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
        })
        .map(|c| c.to_string())
}

/// Parse one data line into `(frequency_hz, magnitude_db, phase_deg)`.
///
/// A pair with no dB or degree value (zero magnitude) keeps its row with the
/// value absent.
fn parse_data_line(
    line_no: usize,
    line: &str,
    options: &OptionLine,
) -> Option<(f64, Option<f64>, Option<f64>)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        log::warn!("Line {line_no}: insufficient data columns ({})", tokens.len());
        return None;
    }

    let parsed: Option<Vec<f64>> = tokens[..3].iter().map(|t| parse_number(t)).collect();
    let Some(values) = parsed else {
        log::warn!("Line {line_no}: non-numeric value in '{line}'");
        return None;
    };

    let frequency = values[0] * options.freq_mult;
    if !frequency.is_finite() {
        log::warn!("Line {line_no}: frequency {} overflows", values[0]);
        return None;
    }

    let (magnitude_db, phase_deg) = options.format.to_db_deg(values[1], values[2]);
    let magnitude_db = Some(magnitude_db).filter(|v| v.is_finite());
    let phase_deg = Some(phase_deg).filter(|v| v.is_finite());
    if magnitude_db.is_none() {
        log::debug!("Line {line_no}: magnitude has no dB value, stored as absent");
    }
    Some((frequency, magnitude_db, phase_deg))
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an `.s1p` file with default options.
pub fn parse_s1p(path: &Path) -> DataResult<ParseResult> {
    parse_s1p_with(path, &S1pOptions::default())
}

/// Parse an `.s1p` file.
pub fn parse_s1p_with(path: &Path, options: &S1pOptions) -> DataResult<ParseResult> {
    ensure_exists(path)?;
    let ext = extension_of(path);
    if ext != "s1p" {
        return Err(DataError::UnsupportedFormat(format!(".{ext}")));
    }

    log::info!("Loading S1P file: {}", path.display());
    let text = read_text(path)?;
    let mut result = parse_s1p_str(&text, &path.display().to_string(), options)?;
    result
        .dataset
        .metadata
        .extend(file_metadata(path, FileKind::S1p));

    log::info!(
        "Loaded S1P file with {} data points",
        result.dataset.len()
    );
    Ok(result)
}

/// Parse S1P content already in memory. `source` names it in errors.
pub fn parse_s1p_str(text: &str, source: &str, options: &S1pOptions) -> DataResult<ParseResult> {
    let sections = split_sections(text);
    let option_line = sections
        .option_line
        .map(parse_option_line)
        .unwrap_or_default();

    let mut points: Vec<(f64, Option<f64>, Option<f64>)> = sections
        .data
        .iter()
        .filter_map(|(line_no, line)| parse_data_line(*line_no, line, &option_line))
        .collect();

    if points.is_empty() {
        return Err(DataError::NoValidData(source.to_string()));
    }

    // Stable: equal frequencies keep file order.
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let dataset = TabularDataset::from_columns(vec![
        (FREQUENCY_HZ.to_string(), points.iter().map(|p| Some(p.0)).collect()),
        (MAGNITUDE_DB.to_string(), points.iter().map(|p| p.1).collect()),
        (PHASE_DEG.to_string(), points.iter().map(|p| p.2).collect()),
    ])?
    .with_derived(FREQUENCY_GHZ, |ds, row| ds.get(row, FREQUENCY_HZ).map(|f| f / 1e9))
    .with_derived(MAGNITUDE_LINEAR, |ds, row| {
        ds.get(row, MAGNITUDE_DB).map(|db| 10f64.powf(db / 20.0))
    })
    .with_derived(PHASE_RAD, |ds, row| ds.get(row, PHASE_DEG).map(f64::to_radians));

    let instrument = find_instrument(&sections.comments, &options.instrument_keywords)
        .unwrap_or_else(|| "Unknown".to_string());

    let mut metadata = Metadata::new();
    metadata.insert("format".into(), "S1P".into());
    metadata.insert("frequency_unit".into(), option_line.frequency_unit.into());
    metadata.insert("parameter_type".into(), option_line.parameter_type.into());
    metadata.insert("parameter_format".into(), option_line.format.as_str().into());
    metadata.insert("data_format".into(), option_line.data_format.into());
    metadata.insert("reference_impedance".into(), option_line.z0.into());
    metadata.insert("instrument".into(), instrument.into());
    metadata.insert(
        "comments".into(),
        MetadataValue::List(sections.comments.iter().map(|c| c.to_string()).collect()),
    );
    metadata.insert("num_points".into(), MetadataValue::Integer(points.len() as i64));

    let dataset = dataset.with_metadata(metadata);

    let mut summary = summarize(&dataset);
    let frequencies: Vec<f64> = points.iter().map(|p| p.0).collect();
    summary.frequency_step_hz = uniform_step(&frequencies);

    Ok(ParseResult {
        kind: FileKind::S1p,
        dataset,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_S1P: &str = "! Rohde & Schwarz ZNB20\n\
! Date: 2024-01-01\n\
# HZ S DB R 50\n\
1e9 -3.0 10.0\n\
2e9 -6.0 20.0\n";

    fn parse(text: &str) -> DataResult<ParseResult> {
        parse_s1p_str(text, "test", &S1pOptions::default())
    }

    #[test]
    fn test_parse_sample() {
        let result = parse(SAMPLE_S1P).unwrap();
        let ds = &result.dataset;
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.column(FREQUENCY_GHZ).unwrap(),
            vec![Some(1.0), Some(2.0)]
        );
        let lin = ds.column(MAGNITUDE_LINEAR).unwrap();
        assert!((lin[0].unwrap() - 0.7079).abs() < 1e-4);
        assert_eq!(
            ds.metadata.get("reference_impedance"),
            Some(&MetadataValue::Float(50.0))
        );
        assert_eq!(
            ds.metadata.get("instrument"),
            Some(&MetadataValue::String("Rohde & Schwarz ZNB20".into()))
        );
        assert_eq!(result.summary.frequency_step_hz, Some(1e9));
    }

    #[test]
    fn test_field_order() {
        let result = parse(SAMPLE_S1P).unwrap();
        assert_eq!(
            result.dataset.fields(),
            &[
                FREQUENCY_HZ,
                MAGNITUDE_DB,
                PHASE_DEG,
                FREQUENCY_GHZ,
                MAGNITUDE_LINEAR,
                PHASE_RAD
            ]
            .map(String::from)
        );
    }

    #[test]
    fn test_rows_sorted_stably() {
        let text = "# HZ S DB R 50\n3 -1 0\n1 -2 0\n3 -3 0\n2 -4 0\n";
        let ds = parse(text).unwrap().dataset;
        assert_eq!(
            ds.column(FREQUENCY_HZ).unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(3.0)]
        );
        // the two 3 Hz rows keep their relative order
        assert_eq!(
            ds.column(MAGNITUDE_DB).unwrap(),
            vec![Some(-2.0), Some(-4.0), Some(-1.0), Some(-3.0)]
        );
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = "# HZ S DB R 50\n1 -1 0\n2 -2\nabc -3 0\n4 -4 0 ! trailing\n";
        let ds = parse(text).unwrap().dataset;
        assert_eq!(ds.column(FREQUENCY_HZ).unwrap(), vec![Some(1.0), Some(4.0)]);
    }

    #[test]
    fn test_no_valid_data() {
        let err = parse("! only comments\n# HZ S DB R 50\nfoo bar baz\n").unwrap_err();
        assert!(matches!(err, DataError::NoValidData(_)));
    }

    #[test]
    fn test_defaults_without_option_line() {
        let result = parse("1 -1 0\n2 -2 0\n").unwrap();
        let meta = result.metadata();
        assert_eq!(meta.get("frequency_unit"), Some(&MetadataValue::from("Hz")));
        assert_eq!(meta.get("parameter_format"), Some(&MetadataValue::from("DB")));
        assert_eq!(meta.get("data_format"), Some(&MetadataValue::from("MA")));
        assert_eq!(meta.get("reference_impedance"), Some(&MetadataValue::Float(50.0)));
        assert_eq!(meta.get("instrument"), Some(&MetadataValue::from("Unknown")));
    }

    #[test]
    fn test_bad_impedance_falls_back() {
        let options = parse_option_line("HZ S DB R abc");
        assert_eq!(options.z0, 50.0);
        assert_eq!(options.data_format, "R");
    }

    #[test]
    fn test_frequency_unit_scaling() {
        let ds = parse("# GHZ S DB R 50\n1.5 -1 0\n").unwrap().dataset;
        assert_eq!(ds.column(FREQUENCY_HZ).unwrap(), vec![Some(1.5e9)]);
        assert_eq!(ds.column(FREQUENCY_GHZ).unwrap(), vec![Some(1.5)]);
    }

    #[test]
    fn test_ma_and_ri_formats_convert_to_db() {
        let ma = parse("# HZ S MA R 50\n1 0.1 45\n").unwrap().dataset;
        let db = ma.column(MAGNITUDE_DB).unwrap()[0].unwrap();
        assert!((db + 20.0).abs() < 1e-9);

        let ri = parse("# HZ S RI R 50\n1 0 1\n").unwrap().dataset;
        assert!(ri.column(MAGNITUDE_DB).unwrap()[0].unwrap().abs() < 1e-9);
        assert!((ri.column(PHASE_DEG).unwrap()[0].unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_magnitude_keeps_row() {
        let text = "# HZ S MA R 50\n1e9 0.5 10\n2e9 0 20\n3e9 0.25 30\n";
        let ds = parse(text).unwrap().dataset;
        assert_eq!(ds.len(), 3);

        let zero = &ds.rows()[1];
        assert_eq!(ds.get(zero, FREQUENCY_HZ), Some(2e9));
        assert_eq!(ds.get(zero, MAGNITUDE_DB), None);
        assert_eq!(ds.get(zero, MAGNITUDE_LINEAR), None);
        assert_eq!(ds.get(zero, PHASE_DEG), Some(20.0));
        assert!(ds.get(&ds.rows()[0], MAGNITUDE_DB).is_some());

        let all_zero = parse("# HZ S MA R 50\n1e9 0 0\n2e9 0 0\n").unwrap();
        assert_eq!(all_zero.dataset.len(), 2);
        assert_eq!(all_zero.dataset.present_values(MAGNITUDE_DB), Some(vec![]));
        assert!(all_zero.summary.field(MAGNITUDE_DB).is_none());
    }

    #[test]
    fn test_derived_columns_hold_for_every_row() {
        let text = "# HZ S DB R 50\n1 -1 -170\n2 -12.5 33\n3 0 179.9\n";
        let ds = parse(text).unwrap().dataset;
        for row in ds.rows() {
            let db = ds.get(row, MAGNITUDE_DB).unwrap();
            let lin = ds.get(row, MAGNITUDE_LINEAR).unwrap();
            assert!((lin - 10f64.powf(db / 20.0)).abs() < 1e-12);
            let deg = ds.get(row, PHASE_DEG).unwrap();
            let rad = ds.get(row, PHASE_RAD).unwrap();
            assert!((rad - deg * std::f64::consts::PI / 180.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_first_option_line_wins() {
        let result = parse("# HZ S DB R 75\n# GHZ S MA R 50\n1 -1 0\n").unwrap();
        assert_eq!(
            result.metadata().get("reference_impedance"),
            Some(&MetadataValue::Float(75.0))
        );
    }

    #[test]
    fn test_non_uniform_step_is_none() {
        let result = parse("1 -1 0\n2 -1 0\n4 -1 0\n").unwrap();
        assert_eq!(result.summary.frequency_step_hz, None);
    }
}
