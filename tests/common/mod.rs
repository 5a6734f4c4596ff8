//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

pub const SCENARIO_S1P: &str = "! Keysight E5071C\n\
# HZ S DB R 50\n\
1e9 -3.0 10.0\n\
2e9 -6.0 20.0\n";

pub const SIX_COLUMN_DAT: &str = "Frequency\tAmplitude\tPhase\tFrequencyAve\taveAmplitude\tavePhase\n\
1000\t0.50\t-10\t1000\t0.49\t-9.5\n\
2000\t0.40\t-20\t0\t0.39\t-19.5\n\
3000\t0.30\t-30\t3000\t0.29\t-29.5\n";

/// Helper to get the binary under test
pub fn snp_processor() -> Command {
    Command::cargo_bin("snp-processor").unwrap()
}

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// An S1P body with `n` uniformly spaced points from `start_hz` in steps of
/// `step_hz`, magnitude and phase linear in the index.
pub fn linear_s1p(start_hz: f64, step_hz: f64, n: usize, mag_slope: f64, phase_offset: f64) -> String {
    let mut text = String::from("# HZ S DB R 50\n");
    for i in 0..n {
        let f = start_hz + i as f64 * step_hz;
        let mag = -1.0 + mag_slope * i as f64;
        let phase = phase_offset + i as f64;
        text.push_str(&format!("{f} {mag} {phase}\n"));
    }
    text
}
