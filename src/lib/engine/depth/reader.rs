use log::debug;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use super::record::DepthRecord;
use crate::core::error::{CoverageError, Result};
use crate::core::io::open_lines;

const MEAN_COLUMN: &str = "meanCoverage";
const PERCENTAGE_PREFIX: &str = "percentage";
const REGION_ID_COLUMN: usize = 3;
const PER_BASE_FIELDS: usize = 5;

/// Layout of a depth stream, detected from its first non-empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepthFormat {
    /// Region summary table with a `# chrom chromStart chromEnd ...` header.
    RegionSummary {
        mean_column: usize,
        /// `(column, threshold)` for every `percentage<T>` column.
        threshold_columns: Vec<(usize, u32)>,
    },
    /// `region_id chrom start end depth` runs.
    PerBase,
}

impl DepthFormat {
    /// Thresholds the stream reports fractions for.
    pub fn thresholds(&self) -> Vec<u32> {
        match self {
            DepthFormat::RegionSummary {
                threshold_columns, ..
            } => threshold_columns.iter().map(|(_, t)| *t).collect(),
            DepthFormat::PerBase => Vec::new(),
        }
    }

    fn from_header(header: &str) -> Option<Self> {
        let fields: Vec<&str> = header
            .trim_start_matches('#')
            .split('\t')
            .map(str::trim)
            .collect();
        let mean_column = fields.iter().position(|f| *f == MEAN_COLUMN)?;
        if mean_column <= REGION_ID_COLUMN {
            return None;
        }
        let threshold_columns = fields
            .iter()
            .enumerate()
            .filter_map(|(idx, f)| {
                f.strip_prefix(PERCENTAGE_PREFIX)
                    .and_then(|t| t.parse::<u32>().ok())
                    .map(|t| (idx, t))
            })
            .collect();
        Some(DepthFormat::RegionSummary {
            mean_column,
            threshold_columns,
        })
    }
}

impl fmt::Display for DepthFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthFormat::RegionSummary { .. } => write!(f, "region summary"),
            DepthFormat::PerBase => write!(f, "per-base"),
        }
    }
}

/// Lazy, single-pass stream of [`DepthRecord`]s.
///
/// Any failure (I/O, decompression, an unparseable line) is yielded once as
/// [`CoverageError::SourceUnavailable`] and ends the stream.
pub struct DepthReader<R: BufRead> {
    reader: R,
    source: String,
    line_no: usize,
    buf: String,
    format: Option<DepthFormat>,
    done: bool,
}

impl DepthReader<Box<dyn BufRead + Send>> {
    /// Open a depth file. `-` reads stdin; gzip input is decompressed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_lines(path)?;
        Ok(Self::new(reader, path.display().to_string()))
    }
}

impl<R: BufRead> DepthReader<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            line_no: 0,
            buf: String::new(),
            format: None,
            done: false,
        }
    }

    /// Detected layout, known after the first record has been read.
    pub fn format(&self) -> Option<&DepthFormat> {
        self.format.as_ref()
    }

    fn unavailable(&self, msg: impl fmt::Display) -> CoverageError {
        CoverageError::SourceUnavailable(format!("{}:{}: {}", self.source, self.line_no, msg))
    }

    fn next_record(&mut self) -> Result<Option<DepthRecord>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| self.unavailable(e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.trim().is_empty() {
                continue;
            }

            if self.format.is_none() {
                let format = if line.starts_with('#') {
                    DepthFormat::from_header(line).unwrap_or(DepthFormat::PerBase)
                } else {
                    DepthFormat::PerBase
                };
                debug!("{}: detected {} depth layout", self.source, format);
                let is_header = line.starts_with('#');
                self.format = Some(format);
                if is_header {
                    continue;
                }
            }

            if line.starts_with('#') {
                continue;
            }

            let parsed = match self.format.as_ref() {
                Some(DepthFormat::RegionSummary {
                    mean_column,
                    threshold_columns,
                }) => parse_summary(line, *mean_column, threshold_columns),
                _ => parse_per_base(line),
            };
            return parsed.map(Some).map_err(|msg| self.unavailable(msg));
        }
    }
}

impl<R: BufRead> Iterator for DepthReader<R> {
    type Item = Result<DepthRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> std::result::Result<T, String> {
    raw.parse::<T>()
        .map_err(|_| format!("invalid {} '{}'", what, raw))
}

fn parse_span(start: &str, end: &str) -> std::result::Result<(u64, u64), String> {
    let start: u64 = parse_number(start, "start")?;
    let end: u64 = parse_number(end, "end")?;
    if start > end {
        return Err(format!("start {} after end {}", start, end));
    }
    Ok((start, end))
}

fn parse_depth(raw: &str, what: &str) -> std::result::Result<f64, String> {
    let value: f64 = parse_number(raw, what)?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a non-negative number, got {}", what, raw));
    }
    Ok(value)
}

fn parse_summary(
    line: &str,
    mean_column: usize,
    threshold_columns: &[(usize, u32)],
) -> std::result::Result<DepthRecord, String> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    let needed = threshold_columns
        .iter()
        .map(|(idx, _)| *idx)
        .chain(std::iter::once(mean_column))
        .max()
        .unwrap_or(mean_column);
    if fields.len() <= needed {
        return Err(format!(
            "expected at least {} columns, got {}",
            needed + 1,
            fields.len()
        ));
    }

    let (start, end) = parse_span(fields[1], fields[2])?;
    let mean = parse_depth(fields[mean_column], MEAN_COLUMN)?;
    let mut fractions = Vec::with_capacity(threshold_columns.len());
    for (idx, threshold) in threshold_columns {
        let percent = parse_depth(fields[*idx], "percentage")?;
        fractions.push((*threshold, (percent / 100.0).min(1.0)));
    }

    Ok(DepthRecord::summary(
        fields[REGION_ID_COLUMN],
        fields[0],
        start,
        end,
        mean,
        fractions,
    ))
}

fn parse_per_base(line: &str) -> std::result::Result<DepthRecord, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < PER_BASE_FIELDS {
        return Err(format!(
            "expected {} columns (region chrom start end depth), got {}",
            PER_BASE_FIELDS,
            fields.len()
        ));
    }
    let (start, end) = parse_span(fields[2], fields[3])?;
    let depth = parse_depth(fields[4], "depth")?;
    Ok(DepthRecord::uniform(fields[0], fields[1], start, end, depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::depth::Coverage;
    use std::io::{self, Cursor, Read};

    const SUMMARY: &str = "# chrom\tchromStart\tchromEnd\tF3\tF4\tF5\treadCount\tmeanCoverage\tpercentage10\tpercentage20\tsampleName\n\
1\t100\t150\te1\tT1\tGENE1\t40\t12.5\t80\t10\tS1\n\
1\t140\t200\te2\tT1\tGENE1\t80\t25\t100\t60\tS1\n";

    fn collect(input: &str) -> Vec<Result<DepthRecord>> {
        DepthReader::new(Cursor::new(input.as_bytes().to_vec()), "test").collect()
    }

    #[test]
    fn reads_region_summary() {
        let mut reader = DepthReader::new(Cursor::new(SUMMARY.as_bytes()), "test");
        let first = reader.next().unwrap().unwrap();
        assert_eq!(
            reader.format().map(|f| f.thresholds()),
            Some(vec![10, 20])
        );
        assert_eq!(first.region_id.as_str(), "e1");
        assert_eq!(first.chrom.as_str(), "1");
        assert_eq!((first.span.start, first.span.end), (100, 150));
        assert_eq!(first.coverage.mean(), 12.5);
        assert_eq!(first.coverage.fraction_at(10), Some(0.8));
        assert_eq!(first.coverage.fraction_at(20), Some(0.1));

        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.coverage.fraction_at(10), Some(1.0));
        assert!(reader.next().is_none());
    }

    #[test]
    fn reads_per_base_runs() {
        let records = collect("e1 1 100 101 7\n\ne1\t1\t101\t150\t12.5\n");
        let records: Vec<DepthRecord> = records.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].coverage, Coverage::Uniform(7.0));
        assert_eq!(records[1].span.len(), 49);
    }

    #[test]
    fn per_base_may_start_with_a_comment() {
        let records = collect("# region chrom start end depth\ne1 1 0 10 3\n");
        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
    }

    #[test]
    fn empty_stream_yields_nothing() {
        assert!(collect("").is_empty());
        assert!(collect("\n\n").is_empty());
    }

    #[test]
    fn malformed_line_ends_stream() {
        let records = collect("e1 1 0 10 3\ne2 1 oops 10 3\ne3 1 0 10 3\n");
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(matches!(
            records[1],
            Err(CoverageError::SourceUnavailable(ref msg)) if msg.contains("test:2")
        ));
    }

    #[test]
    fn negative_depth_is_rejected() {
        let records = collect("e1 1 0 10 -3\n");
        assert!(matches!(records[0], Err(CoverageError::SourceUnavailable(_))));
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream cut"));
            }
            self.served = true;
            let line = b"e1 1 0 10 3\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn io_failure_mid_stream_is_source_unavailable() {
        let reader = io::BufReader::new(FailingReader { served: false });
        let records: Vec<_> = DepthReader::new(reader, "pipe").collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(matches!(
            records[1],
            Err(CoverageError::SourceUnavailable(ref msg)) if msg.contains("stream cut")
        ));
    }

    #[test]
    fn reads_gzipped_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.bed.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(SUMMARY.as_bytes()).unwrap();
        enc.finish().unwrap();

        let records: Vec<_> = DepthReader::from_path(&path)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);
    }
}
