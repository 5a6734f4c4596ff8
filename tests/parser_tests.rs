//! End-to-end parser tests over files on disk.

mod common;

use common::{write_file, SCENARIO_S1P, SIX_COLUMN_DAT};
use snp_processor::data::model::{
    AMPLITUDE, AVE_AMPLITUDE, AVE_PHASE, FREQUENCY_GHZ, FREQUENCY_HZ, FREQUENCY_HZ_AVE,
    FREQUENCY_KHZ, MAGNITUDE_LINEAR,
};
use snp_processor::data::{
    load_file, parse_dat, parse_s1p, DataError, FileKind, MetadataValue, S1pOptions,
};
use tempfile::TempDir;

// ============================================================================
// S1P
// ============================================================================

#[test]
fn test_s1p_scenario() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "dut.s1p", SCENARIO_S1P);

    let result = parse_s1p(&path).unwrap();
    assert_eq!(result.kind, FileKind::S1p);

    let ds = &result.dataset;
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.column(FREQUENCY_GHZ).unwrap(), vec![Some(1.0), Some(2.0)]);
    let lin = ds.column(MAGNITUDE_LINEAR).unwrap()[0].unwrap();
    assert!((lin - 0.7079).abs() < 1e-4);

    let meta = result.metadata();
    assert_eq!(meta.get("reference_impedance"), Some(&MetadataValue::Float(50.0)));
    assert_eq!(meta.get("file_name"), Some(&MetadataValue::from("dut.s1p")));
    assert_eq!(meta.get("file_type"), Some(&MetadataValue::from("S1P")));
    assert_eq!(
        meta.get("instrument"),
        Some(&MetadataValue::from("Keysight E5071C"))
    );
}

#[test]
fn test_s1p_row_count_and_order() {
    let tmp = TempDir::new().unwrap();
    let mut text = String::from("! shuffled\n# HZ S DB R 50\n");
    let freqs = [7.0, 3.0, 9.0, 1.0, 5.0, 3.0, 8.0];
    for (i, f) in freqs.iter().enumerate() {
        text.push_str(&format!("{f}e6 -{i}.5 {i}\n"));
    }
    let path = write_file(&tmp, "shuffled.S1P", &text);

    let ds = parse_s1p(&path).unwrap().dataset;
    assert_eq!(ds.len(), freqs.len());
    let sorted = ds.present_values(FREQUENCY_HZ).unwrap();
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_s1p_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = parse_s1p(&tmp.path().join("absent.s1p")).unwrap_err();
    assert!(matches!(err, DataError::FileNotFound(_)));
}

#[test]
fn test_s1p_wrong_extension() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "dut.s2p", SCENARIO_S1P);
    let err = parse_s1p(&path).unwrap_err();
    assert!(matches!(err, DataError::UnsupportedFormat(_)));
}

#[test]
fn test_s1p_latin1_comment() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("latin.s1p");
    let mut bytes = b"! Messung \xe4\n# HZ S DB R 50\n".to_vec();
    bytes.extend_from_slice(b"1 -1 0\n2 -2 0\n");
    std::fs::write(&path, bytes).unwrap();

    let result = parse_s1p(&path).unwrap();
    assert_eq!(result.dataset.len(), 2);
    assert_eq!(
        result.metadata().get("comments"),
        Some(&MetadataValue::List(vec!["Messung \u{e4}".to_string()]))
    );
}

#[test]
fn test_custom_instrument_keywords() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "lab.s1p", "! Homebuilt VNA mk2\n1 -1 0\n2 -1 0\n");
    let options = S1pOptions {
        instrument_keywords: vec!["homebuilt".to_string()],
    };
    let result = load_file(&path, &options).unwrap();
    assert_eq!(
        result.metadata().get("instrument"),
        Some(&MetadataValue::from("Homebuilt VNA mk2"))
    );
}

// ============================================================================
// DAT
// ============================================================================

#[test]
fn test_dat_zero_average_frequency() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "20240315-007.dat", SIX_COLUMN_DAT);

    let result = parse_dat(&path).unwrap();
    let ds = &result.dataset;
    assert_eq!(ds.len(), 3);

    let blanked = &ds.rows()[1];
    assert_eq!(ds.get(blanked, FREQUENCY_HZ_AVE), None);
    assert_eq!(ds.get(blanked, AVE_AMPLITUDE), None);
    assert_eq!(ds.get(blanked, AVE_PHASE), None);
    assert_eq!(ds.get(&ds.rows()[2], AVE_AMPLITUDE), Some(0.29));

    for row in ds.rows() {
        assert!(ds.get(row, FREQUENCY_HZ).is_some());
        assert!(ds.get(row, AMPLITUDE).is_some());
    }
    assert_eq!(
        ds.column(FREQUENCY_KHZ).unwrap(),
        vec![Some(1.0), Some(2.0), Some(3.0)]
    );

    let meta = result.metadata();
    assert_eq!(meta.get("measurement_date"), Some(&MetadataValue::from("20240315")));
    assert_eq!(meta.get("measurement_id"), Some(&MetadataValue::from("007")));
    assert_eq!(meta.get("has_average_data"), Some(&MetadataValue::Bool(true)));
    assert_eq!(meta.get("frequency_step_hz"), Some(&MetadataValue::Float(1000.0)));

    let ave = result.summary.field(AVE_AMPLITUDE).unwrap();
    assert_eq!(ave.count, 2);
}

#[test]
fn test_dat_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = parse_dat(&tmp.path().join("absent.dat")).unwrap_err();
    assert!(matches!(err, DataError::FileNotFound(_)));
}

#[test]
fn test_dat_two_columns_invalid() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "thin.dat", "f\ta\n1\t2\n");
    let err = parse_dat(&path).unwrap_err();
    assert!(matches!(err, DataError::InvalidFormat { .. }));
}

#[test]
fn test_dat_only_header_has_no_data() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "empty.dat", "f\ta\tp\n");
    let err = parse_dat(&path).unwrap_err();
    assert!(matches!(err, DataError::NoValidData(_)));
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_load_file_dispatch() {
    let tmp = TempDir::new().unwrap();
    let s1p = write_file(&tmp, "a.s1p", SCENARIO_S1P);
    let dat = write_file(&tmp, "b.txt", SIX_COLUMN_DAT);
    let other = write_file(&tmp, "c.csv", "x,y\n1,2\n");

    let options = S1pOptions::default();
    assert_eq!(load_file(&s1p, &options).unwrap().kind, FileKind::S1p);
    assert_eq!(load_file(&dat, &options).unwrap().kind, FileKind::Dat);
    assert!(matches!(
        load_file(&other, &options),
        Err(DataError::UnsupportedFormat(_))
    ));
}
