use std::io::Write;
use std::path::Path;

use super::error::DataResult;
use super::model::TabularDataset;

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Write `dataset` as CSV: a header row of field names, then one line per
/// row in order. Absent values become empty cells.
pub fn to_csv(dataset: &TabularDataset, output_path: &Path) -> DataResult<()> {
    let file = std::fs::File::create(output_path)?;
    write_csv(dataset, file)?;
    log::info!("Data exported to: {}", output_path.display());
    Ok(())
}

/// Same as [`to_csv`] for any writer.
pub fn write_csv<W: Write>(dataset: &TabularDataset, writer: W) -> DataResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(dataset.fields())?;
    for row in dataset.rows() {
        csv_writer.write_record(
            row.iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        )?;
    }
    csv_writer.flush()?;
    Ok(())
}
