use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{StringRecord, Trim};

use super::bundle::HistogramBundle;
use super::model::{Charge, Dimuon, FourVector, Muon};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, RecordError};

// ---------------------------------------------------------------------------
// Field layout
// ---------------------------------------------------------------------------

/// Minimum number of fields on a data line.
///
/// Layout of the CMS dimuon CSV:
/// `Run,Event,type1,E1,px1,py1,pz1,pt1,eta1,phi1,Q1,type2,E2,px2,py2,pz2,pt2,eta2,phi2,Q2,M`
pub const MIN_FIELDS: usize = 20;

/// Column offsets for one muon's energy, momentum and charge.
#[derive(Debug, Clone, Copy)]
struct MuonColumns {
    e: usize,
    px: usize,
    py: usize,
    pz: usize,
    charge: usize,
}

const MU1: MuonColumns = MuonColumns { e: 3, px: 4, py: 5, pz: 6, charge: 10 };
const MU2: MuonColumns = MuonColumns { e: 12, px: 13, py: 14, pz: 15, charge: 19 };

// ---------------------------------------------------------------------------
// Record parser
// ---------------------------------------------------------------------------

/// Extract the two muons from one data line. `line` is only used in errors.
///
/// Columns other than the ten listed in [`MU1`] / [`MU2`] are not inspected.
pub fn parse_record(record: &StringRecord, line: u64) -> Result<(Muon, Muon), RecordError> {
    if record.len() < MIN_FIELDS {
        return Err(RecordError::TooFewFields {
            line,
            expected: MIN_FIELDS,
            found: record.len(),
        });
    }
    Ok((parse_muon(record, MU1, line)?, parse_muon(record, MU2, line)?))
}

fn parse_muon(record: &StringRecord, cols: MuonColumns, line: u64) -> Result<Muon, RecordError> {
    let p4 = FourVector::new(
        parse_float(record, cols.e, line)?,
        parse_float(record, cols.px, line)?,
        parse_float(record, cols.py, line)?,
        parse_float(record, cols.pz, line)?,
    );

    let raw = field(record, cols.charge);
    let q: i64 = raw.parse().map_err(|_| RecordError::NotANumber {
        line,
        field: cols.charge,
        value: raw.to_string(),
    })?;
    let charge = Charge::from_int(q).ok_or_else(|| RecordError::InvalidCharge {
        line,
        field: cols.charge,
        value: raw.to_string(),
    })?;

    Ok(Muon::new(p4, charge))
}

fn parse_float(record: &StringRecord, idx: usize, line: u64) -> Result<f64, RecordError> {
    let raw = field(record, idx);
    raw.parse::<f64>().map_err(|_| RecordError::NotANumber {
        line,
        field: idx,
        value: raw.to_string(),
    })
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

// ---------------------------------------------------------------------------
// Streaming ingestion
// ---------------------------------------------------------------------------

/// CSV reader settings: exactly one header line, rows of any width (short
/// rows are reported by [`parse_record`], not by the CSV layer).
fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(Trim::All);
    builder
}

fn open_input(path: &Path) -> Result<File, AnalysisError> {
    File::open(path).map_err(|e| AnalysisError::Input {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })
}

/// Open `path` and ingest every data line into a freshly booked bundle.
pub fn ingest_file(path: &Path, config: &AnalysisConfig) -> Result<HistogramBundle, AnalysisError> {
    ingest(open_input(path)?, path, config)
}

pub fn ingest_file_partitioned(
    path: &Path,
    config: &AnalysisConfig,
    chunk_size: usize,
) -> Result<HistogramBundle, AnalysisError> {
    ingest_partitioned(open_input(path)?, path, config, chunk_size)
}

/// Stream `input` through parser → reconstructor → aggregator.
///
/// The first malformed line aborts the whole run.
pub fn ingest<R: Read>(input: R, source: &Path, config: &AnalysisConfig) -> Result<HistogramBundle, AnalysisError> {
    let mut bundle = HistogramBundle::book(config)?;
    for_each_pair(input, source, |pair| {
        bundle.fill_pair(&pair);
        Ok(())
    })?;
    Ok(bundle)
}

/// Same result as [`ingest`], but every `chunk_size` records are filled into
/// a separate partial bundle that is then merged into the running total.
pub fn ingest_partitioned<R: Read>(
    input: R,
    source: &Path,
    config: &AnalysisConfig,
    chunk_size: usize,
) -> Result<HistogramBundle, AnalysisError> {
    let chunk_size = chunk_size.max(1);
    let mut total = HistogramBundle::book(config)?;
    let mut partial = HistogramBundle::book(config)?;
    let mut in_chunk = 0usize;

    for_each_pair(input, source, |pair| {
        partial.fill_pair(&pair);
        in_chunk += 1;
        if in_chunk == chunk_size {
            total.merge(&partial)?;
            partial.reset();
            in_chunk = 0;
        }
        Ok(())
    })?;
    total.merge(&partial)?;
    Ok(total)
}

fn for_each_pair<R, F>(input: R, source: &Path, mut on_pair: F) -> Result<u64, AnalysisError>
where
    R: Read,
    F: FnMut(Dimuon) -> Result<(), AnalysisError>,
{
    let mut reader = reader_builder().from_reader(input);
    let mut record = StringRecord::new();
    let mut count = 0u64;

    loop {
        let more = reader.read_record(&mut record).map_err(|e| AnalysisError::Input {
            path: source.to_path_buf(),
            source: e,
        })?;
        if !more {
            break;
        }
        // Data lines start at line 2, after the header.
        let line = record.position().map(|p| p.line()).unwrap_or(count + 2);
        let (mu1, mu2) = parse_record(&record, line)?;
        on_pair(Dimuon::reconstruct(mu1, mu2))?;
        count += 1;
    }

    log::debug!("read {count} records from {}", source.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bundle::names;

    const HEADER: &str = "Run,Event,type1,E1,px1,py1,pz1,pt1,eta1,phi1,Q1,type2,E2,px2,py2,pz2,pt2,eta2,phi2,Q2,M";

    /// Build a data line with the given kinematics in the CMS column layout.
    fn line(mu1: (f64, f64, f64, f64, i32), mu2: (f64, f64, f64, f64, i32)) -> String {
        format!(
            "146436,90830792,G,{},{},{},{},0,0,0,{},G,{},{},{},{},0,0,0,{},0",
            mu1.0, mu1.1, mu1.2, mu1.3, mu1.4, mu2.0, mu2.1, mu2.2, mu2.3, mu2.4
        )
    }

    fn record(text: &str) -> StringRecord {
        StringRecord::from(text.split(',').collect::<Vec<_>>())
    }

    fn csv_text(lines: &[String]) -> String {
        let mut text = String::from(HEADER);
        for l in lines {
            text.push('\n');
            text.push_str(l);
        }
        text.push('\n');
        text
    }

    #[test]
    fn parses_fixed_offsets() {
        let rec = record(&line((10.0, 3.0, 4.0, 0.0, -1), (12.0, -3.0, -4.0, 1.5, 1)));
        let (mu1, mu2) = parse_record(&rec, 2).unwrap();
        assert_eq!(mu1.p4, FourVector::new(10.0, 3.0, 4.0, 0.0));
        assert_eq!(mu1.charge, Charge::Negative);
        assert_eq!(mu2.p4, FourVector::new(12.0, -3.0, -4.0, 1.5));
        assert_eq!(mu2.charge, Charge::Positive);
    }

    #[test]
    fn short_line_is_malformed() {
        let rec = record("1,2,G,10,3,4,0,5,0,0,-1,G,10,-3,-4,0,5,0,0");
        assert_eq!(
            parse_record(&rec, 7),
            Err(RecordError::TooFewFields { line: 7, expected: 20, found: 19 })
        );
    }

    #[test]
    fn exactly_twenty_fields_is_enough() {
        let rec = record("1,2,G,10,3,4,0,5,0,0,-1,G,10,-3,-4,0,5,0,0,1");
        assert!(parse_record(&rec, 2).is_ok());
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let mut text = line((10.0, 3.0, 4.0, 0.0, -1), (10.0, -3.0, -4.0, 0.0, 1));
        text = text.replacen(",3,", ",abc,", 1);
        let err = parse_record(&record(&text), 2).unwrap_err();
        assert!(matches!(err, RecordError::NotANumber { field: 4, .. }));
    }

    #[test]
    fn charge_must_be_unit() {
        for bad in [0, 2, -3] {
            let rec = record(&line((10.0, 3.0, 4.0, 0.0, bad), (10.0, -3.0, -4.0, 0.0, 1)));
            let err = parse_record(&rec, 2).unwrap_err();
            assert!(matches!(err, RecordError::InvalidCharge { field: 10, .. }));
        }
        let rec = record(&line((10.0, 3.0, 4.0, 0.0, 1), (10.0, -3.0, -4.0, 0.0, 5)));
        assert!(matches!(
            parse_record(&rec, 2),
            Err(RecordError::InvalidCharge { field: 19, .. })
        ));
    }

    #[test]
    fn unlisted_columns_are_not_validated() {
        let text = line((10.0, 3.0, 4.0, 0.0, 1), (10.0, -3.0, -4.0, 0.0, -1)).replacen(",G,", ",not-a-type,", 1);
        assert!(parse_record(&record(&text), 2).is_ok());
    }

    #[test]
    fn opposite_sign_event_fills_all_events_only() {
        let text = csv_text(&[line((10.0, 3.0, 4.0, 0.0, -1), (10.0, -3.0, -4.0, 0.0, 1))]);
        let config = AnalysisConfig::default();
        let bundle = ingest(text.as_bytes(), Path::new("memory.csv"), &config).unwrap();

        // m = 20 GeV: inside `full`, outside the two zoomed windows.
        let full = bundle.get(&names::all_events("full")).unwrap();
        assert_eq!(full.integral(), 1.0);
        assert_eq!(full.contents[20], 1.0);
        for zoom in ["psi", "Ups"] {
            let h = bundle.get(&names::all_events(zoom)).unwrap();
            assert_eq!(h.integral(), 0.0);
            assert_eq!(h.overflow, 1.0);
        }
        for range in ["full", "psi", "Ups"] {
            let h = bundle.get(&names::same_sign(range)).unwrap();
            assert_eq!(h.integral() + h.underflow + h.overflow, 0.0);
        }

        // Both muons have pT = 5: one in each charge spectrum.
        assert_eq!(bundle.get(names::PT_POS).unwrap().contents[5], 1.0);
        assert_eq!(bundle.get(names::PT_NEG).unwrap().contents[5], 1.0);
        assert_eq!(bundle.stats.records, 1);
        assert_eq!(bundle.stats.opposite_sign, 1);
        assert_eq!(bundle.stats.same_sign, 0);
    }

    #[test]
    fn malformed_line_aborts_with_line_number() {
        let text = csv_text(&[
            line((10.0, 3.0, 4.0, 0.0, -1), (10.0, -3.0, -4.0, 0.0, 1)),
            "1,2,3".to_string(),
        ]);
        let err = ingest(text.as_bytes(), Path::new("memory.csv"), &AnalysisConfig::default()).unwrap_err();
        match err {
            AnalysisError::MalformedRecord(RecordError::TooFewFields { line, found, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_only_input_yields_empty_bundle() {
        let bundle = ingest(HEADER.as_bytes(), Path::new("memory.csv"), &AnalysisConfig::default()).unwrap();
        assert_eq!(bundle.stats.records, 0);
        assert!(bundle.histograms().all(|h| h.entries == 0));
    }

    #[test]
    fn missing_input_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingest_file(&dir.path().join("absent.csv"), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Input { .. }));
    }

    #[test]
    fn partitioned_ingest_equals_sequential() {
        let lines: Vec<String> = (0..23)
            .map(|i| {
                let e = 2.0 + i as f64 * 0.7;
                let q2 = if i % 3 == 0 { -1 } else { 1 };
                line((e, 0.3 * i as f64, 1.0, 0.5, -1), (e, -1.0, 0.2 * i as f64, -0.5, q2))
            })
            .collect();
        let text = csv_text(&lines);
        let config = AnalysisConfig::default();

        let sequential = ingest(text.as_bytes(), Path::new("memory.csv"), &config).unwrap();
        for chunk in [1, 4, 10, 100] {
            let partitioned = ingest_partitioned(text.as_bytes(), Path::new("memory.csv"), &config, chunk).unwrap();
            assert_eq!(partitioned, sequential, "chunk size {chunk}");
        }
    }
}
