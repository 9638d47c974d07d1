//! Tabular adapters between delimited text files and Series.
//!
//! The reader maps header names onto Fields and ignores anything it does not recognize.
//! Writers produce the cleaned series, the derived-parameter table, the event list and a
//! YAML summary of the events.
use bitvec::slice::BitSlice;
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use time::macros::format_description;
use time::PrimitiveDateTime;

use super::aggregator::{Event, EventSummary};
use super::constants::TIME_COLUMN;
use super::criteria::DetectionProfile;
use super::derived::DerivedParameters;
use super::error::{SchemaError, SeriesIoError, TimestampError};
use super::field::Field;
use super::rolling::RollingStat;
use super::sample::{Sample, Series, Timestamp};

const PARAMETER_COLUMNS: [&str; 14] = [
    TIME_COLUMN,
    "proton_density",
    "proton_thermal",
    "proton_bulk_speed",
    "T_exp",
    "T_ratio",
    "alpha_ratio",
    "dynamic_pressure",
    "speed_change",
    "beta",
    "density_mean",
    "density_std",
    "flag",
    "score",
];

/// Parse a timestamp of the form `YYYY-MM-DD HH:MM:SS[.frac]`; a `T` separator and a
/// trailing `Z` are accepted.
pub fn parse_timestamp(value: &str, row: usize) -> Result<Timestamp, TimestampError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty(row));
    }
    let normalized = trimmed.trim_end_matches('Z').replacen('T', " ", 1);
    let format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(&normalized, format).map_err(|_| {
        TimestampError::Unparseable {
            row,
            value: value.to_string(),
        }
    })
}

pub fn format_timestamp(time: &Timestamp) -> Result<String, time::error::Format> {
    time.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
    ))
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn parse_value(cell: &str, row: usize, column: Field) -> Result<Option<f64>, SeriesIoError> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match f64::from_str(cell) {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(SeriesIoError::BadValue {
            row,
            column,
            value: cell.to_string(),
        }),
    }
}

/// Read a series from a delimited text file with a header row
pub fn read_series(path: &Path) -> Result<Series, SeriesIoError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut time_column: Option<usize> = None;
    let mut columns: Vec<(usize, Field)> = Vec::new();
    let mut fields: BTreeSet<Field> = BTreeSet::new();
    for (idx, name) in headers.iter().enumerate() {
        if name == TIME_COLUMN {
            if time_column.is_some() {
                return Err(SchemaError::DuplicateColumn(name.to_string()).into());
            }
            time_column = Some(idx);
            continue;
        }
        match Field::from_str(name) {
            Ok(field) => {
                if !fields.insert(field) {
                    return Err(SchemaError::DuplicateColumn(name.to_string()).into());
                }
                columns.push((idx, field));
            }
            Err(_) => log::debug!("Ignoring unknown column {name} in {}", path.display()),
        }
    }
    let time_column = time_column.ok_or(SchemaError::MissingTimeColumn)?;

    let mut series = Series::from_parts(fields, Vec::new());
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = row_idx + 1;
        if record.len() != headers.len() {
            return Err(SeriesIoError::RowLength(row));
        }
        let time = parse_timestamp(record.get(time_column).unwrap_or_default(), row)?;
        let mut sample = Sample::new(time);
        for (idx, field) in columns.iter() {
            let value = parse_value(record.get(*idx).unwrap_or_default(), row, *field)?;
            sample.set(*field, value);
        }
        series.push(sample);
    }
    Ok(series)
}

/// Write a series in the input schema; missing values are empty cells
pub fn write_series(path: &Path, series: &Series) -> Result<(), SeriesIoError> {
    let fields: Vec<Field> = Field::ALL
        .into_iter()
        .filter(|f| series.has_field(*f))
        .collect();
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![TIME_COLUMN.to_string()];
    header.extend(fields.iter().map(|f| f.name().to_string()));
    writer.write_record(&header)?;

    for sample in series.samples() {
        let mut record = vec![format_timestamp(&sample.time)?];
        record.extend(fields.iter().map(|f| format_value(sample.get(*f))));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the per-sample derived parameter table. All slices must be aligned with the series.
pub fn write_parameters(
    path: &Path,
    series: &Series,
    derived: &[DerivedParameters],
    baseline: &[RollingStat],
    flags: &BitSlice,
) -> Result<(), SeriesIoError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(PARAMETER_COLUMNS)?;
    for (idx, (sample, params)) in series.samples().iter().zip(derived.iter()).enumerate() {
        let stat = baseline.get(idx).copied().unwrap_or_default();
        let flagged = flags.get(idx).map(|bit| *bit).unwrap_or(false);
        let record = [
            format_timestamp(&sample.time)?,
            format_value(sample.get(Field::ProtonDensity)),
            format_value(sample.get(Field::ProtonThermal)),
            format_value(sample.get(Field::ProtonBulkSpeed)),
            format_value(params.t_exp),
            format_value(params.t_ratio),
            format_value(params.alpha_ratio),
            format_value(params.dynamic_pressure),
            format_value(params.speed_change),
            format_value(params.beta),
            format_value(stat.mean),
            format_value(stat.std),
            String::from(if flagged { "1" } else { "0" }),
            format_value(params.score),
        ];
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the event list, one column per criterion variable of the profile
pub fn write_events(
    path: &Path,
    events: &[Event],
    profile: &DetectionProfile,
) -> Result<(), SeriesIoError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![
        String::from("start_time"),
        String::from("end_time"),
        String::from("duration"),
    ];
    header.extend(
        profile
            .variables()
            .iter()
            .map(|(quantity, aggregate)| format!("{}_{}", aggregate.prefix(), quantity)),
    );
    writer.write_record(&header)?;

    for event in events.iter() {
        let mut record = vec![
            format_timestamp(&event.start_time)?,
            format_timestamp(&event.end_time)?,
            event.duration.to_string(),
        ];
        record.extend(event.peaks.iter().map(|peak| format_value(peak.value)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the event summary as YAML
pub fn write_summary(path: &Path, summary: &EventSummary) -> Result<(), SeriesIoError> {
    let yaml_str = serde_yaml::to_string(summary)?;
    std::fs::write(path, yaml_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::EventAggregator;
    use crate::criteria::{Criterion, Quantity};
    use bitvec::prelude::*;
    use std::io::Write;
    use time::macros::datetime;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2025-06-30 01:02:03", 1),
            Ok(datetime!(2025-06-30 01:02:03))
        );
        assert_eq!(
            parse_timestamp("2025-06-30T01:02:03.250000Z", 1),
            Ok(datetime!(2025-06-30 01:02:03.25))
        );
        assert_eq!(parse_timestamp("  ", 4), Err(TimestampError::Empty(4)));
        assert!(matches!(
            parse_timestamp("30/06/2025", 2),
            Err(TimestampError::Unparseable { row: 2, .. })
        ));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(&datetime!(2025-06-30 01:02:03.5)).unwrap(),
            "2025-06-30 01:02:03.500000"
        );
    }

    #[test]
    fn test_read_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "swis.csv",
            "time,proton_density,proton_bulk_speed,detector_id\n\
             2025-06-30 00:00:00,5.5,410.0,7\n\
             2025-06-30 00:00:05,,nan,7\n",
        );
        let series = read_series(&path).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.has_field(Field::ProtonDensity));
        assert!(!series.has_field(Field::ProtonThermal));
        assert_eq!(series.column(Field::ProtonDensity), vec![Some(5.5), None]);
        assert_eq!(series.column(Field::ProtonBulkSpeed), vec![Some(410.0), None]);
        assert_eq!(series.samples()[1].time, datetime!(2025-06-30 00:00:05));
    }

    #[test]
    fn test_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let no_time = write_file(dir.path(), "a.csv", "proton_density\n5.0\n");
        assert!(matches!(
            read_series(&no_time),
            Err(SeriesIoError::SchemaError(SchemaError::MissingTimeColumn))
        ));

        let bad_time = write_file(dir.path(), "b.csv", "time,proton_density\nyesterday,5.0\n");
        assert!(matches!(
            read_series(&bad_time),
            Err(SeriesIoError::TimestampError(TimestampError::Unparseable { row: 1, .. }))
        ));

        let bad_value = write_file(
            dir.path(),
            "c.csv",
            "time,proton_density\n2025-06-30 00:00:00,lots\n",
        );
        assert!(matches!(
            read_series(&bad_value),
            Err(SeriesIoError::BadValue {
                row: 1,
                column: Field::ProtonDensity,
                ..
            })
        ));

        let duplicate = write_file(
            dir.path(),
            "d.csv",
            "time,proton_density,proton_density\n2025-06-30 00:00:00,1,2\n",
        );
        assert!(matches!(
            read_series(&duplicate),
            Err(SeriesIoError::SchemaError(SchemaError::DuplicateColumn(_)))
        ));

        let short_row = write_file(
            dir.path(),
            "e.csv",
            "time,proton_density\n2025-06-30 00:00:00\n",
        );
        assert!(matches!(
            read_series(&short_row),
            Err(SeriesIoError::RowLength(1))
        ));
    }

    #[test]
    fn test_written_series_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        let mut series = Series::new([Field::ProtonDensity, Field::MagneticField]);
        series.push(Sample::new(datetime!(2025-06-30 00:00:00)).with(Field::ProtonDensity, 4.25));
        series.push(
            Sample::new(datetime!(2025-06-30 00:00:05.125))
                .with(Field::ProtonDensity, 6.0)
                .with(Field::MagneticField, 5.5),
        );
        write_series(&path, &series).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("time,proton_density,magnetic_field\n"));
        assert!(contents.contains("2025-06-30 00:00:00.000000,4.25,\n"));
        assert_eq!(read_series(&path).unwrap(), series);
    }

    #[test]
    fn test_parameter_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cme.csv");
        let mut series = Series::new([Field::ProtonDensity]);
        series.push(Sample::new(datetime!(2025-06-30 00:00:00)).with(Field::ProtonDensity, 8.0));
        let derived = vec![DerivedParameters {
            alpha_ratio: Some(0.2),
            ..Default::default()
        }];
        let baseline = vec![RollingStat {
            mean: Some(4.0),
            std: None,
        }];
        write_parameters(&path, &series, &derived, &baseline, &bitvec![1]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some(PARAMETER_COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("2025-06-30 00:00:00.000000,8,,,,,0.2,,,,4,,1,")
        );
    }

    #[test]
    fn test_event_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let profile = DetectionProfile::new(
            "",
            vec![Criterion::Above {
                quantity: Quantity::Raw(Field::ProtonBulkSpeed),
                threshold: 450.0,
            }],
        );
        let mut series = Series::new([Field::ProtonBulkSpeed]);
        series.push(Sample::new(datetime!(2025-06-30 00:00:00)).with(Field::ProtonBulkSpeed, 500.0));
        series.push(Sample::new(datetime!(2025-06-30 00:01:00)).with(Field::ProtonBulkSpeed, 520.0));
        let derived = vec![DerivedParameters::default(); 2];
        let events = EventAggregator::new(1, &profile).aggregate(&series, &derived, &bitvec![1, 1]);

        let events_path = dir.path().join("events.csv");
        write_events(&events_path, &events, &profile).unwrap();
        let contents = std::fs::read_to_string(&events_path).unwrap();
        assert_eq!(
            contents,
            "start_time,end_time,duration,max_proton_bulk_speed\n\
             2025-06-30 00:00:00.000000,2025-06-30 00:01:00.000000,2,520\n"
        );

        let summary_path = dir.path().join("events.yml");
        let summary = EventAggregator::summarize(&events);
        write_summary(&summary_path, &summary).unwrap();
        let read: EventSummary =
            serde_yaml::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(read, summary);
    }
}
