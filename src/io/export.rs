//! CSV export for solved schedules.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::solve::subproblem::HomeSolution;

/// Long-format column header: one row per home per hour.
const HEADER: &str = "home,hour,residual_kw,charging_kw,soc";

/// Exports schedules to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(schedules: &BTreeMap<String, HomeSolution>, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(schedules, buf)
}

/// Writes schedules as CSV to any writer, one row per home per hour.
///
/// The `soc` column carries the state of charge at the *end* of the hour.
/// Output is deterministic: homes in id order, hours ascending.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(
    schedules: &BTreeMap<String, HomeSolution>,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for (home, solution) in schedules {
        for (hour, &charging) in solution.charging_kw.iter().enumerate() {
            wtr.write_record(&[
                home.clone(),
                hour.to_string(),
                format!("{:.4}", solution.residual_kw[hour]),
                format!("{charging:.4}"),
                format!("{:.4}", solution.soc[hour + 1]),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedules() -> BTreeMap<String, HomeSolution> {
        let mut map = BTreeMap::new();
        map.insert(
            "H01".to_string(),
            HomeSolution {
                charging_kw: vec![0.0, 2.0, 1.5],
                soc: vec![0.2, 0.2, 0.6, 0.9],
                residual_kw: vec![0.5, 0.4, 0.3],
            },
        );
        map
    }

    #[test]
    fn header_and_row_count() {
        let mut buf = Vec::new();
        write_csv(&schedules(), &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.first().copied(), Some(HEADER));
        // 1 header + 3 hours
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn soc_column_is_end_of_hour() {
        let mut buf = Vec::new();
        write_csv(&schedules(), &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let second_row = output.lines().nth(2).unwrap_or("");
        assert_eq!(second_row, "H01,1,0.4000,2.0000,0.6000");
    }

    #[test]
    fn deterministic_output() {
        let s = schedules();
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_csv(&s, &mut a).ok();
        write_csv(&s, &mut b).ok();
        assert_eq!(a, b);
    }

    #[test]
    fn round_trip_parseable() {
        let mut buf = Vec::new();
        write_csv(&schedules(), &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.ok();
            assert!(rec.is_some(), "every row should parse");
            if let Some(rec) = rec {
                assert_eq!(rec.len(), 5);
                for i in 2..5 {
                    let value: Result<f32, _> = rec[i].parse();
                    assert!(value.is_ok(), "column {i} should parse as f32");
                }
            }
            rows += 1;
        }
        assert_eq!(rows, 3);
    }
}
