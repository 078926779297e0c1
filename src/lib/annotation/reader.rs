use log::{debug, info};
use std::io::BufRead;
use std::path::Path;

use crate::core::error::{CoverageError, Result};
use crate::core::io::open_lines;
use crate::model::EXON_SEPARATOR;

const MISSING: &str = ".";
const MIN_FIELDS: usize = 3;

/// One exon row from the annotation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedExon {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub exon_id: String,
    /// Every transcript claiming this exon. Empty when the column is missing.
    pub transcript_ids: Vec<String>,
    pub gene_id: Option<String>,
}

impl AnnotatedExon {
    /// Exon owned by a single transcript.
    pub fn new(
        exon_id: impl Into<String>,
        chrom: impl Into<String>,
        start: u64,
        end: u64,
        transcript_id: impl Into<String>,
        gene_id: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            exon_id: exon_id.into(),
            transcript_ids: vec![transcript_id.into()],
            gene_id: Some(gene_id.into()),
        }
    }

    /// Parse a single annotation line. `source` and `line_no` only feed
    /// error messages.
    pub fn parse(line: &str, source: &str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(CoverageError::parse_at(
                source,
                line_no,
                format!("expected at least {} columns, got {}", MIN_FIELDS, fields.len()),
            ));
        }

        let chrom = fields[0].to_string();
        let start = parse_coord(fields[1], "start", source, line_no)?;
        let end = parse_coord(fields[2], "end", source, line_no)?;

        let exon_id = match optional(fields.get(3)) {
            Some(id) => id.to_string(),
            None => format!("{}-{}-{}", chrom, start, end),
        };
        if exon_id.contains(EXON_SEPARATOR) {
            return Err(CoverageError::parse_at(
                source,
                line_no,
                format!("exon id '{}' must not contain '{}'", exon_id, EXON_SEPARATOR),
            ));
        }

        let transcript_ids = optional(fields.get(4))
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty() && *id != MISSING)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let gene_id = optional(fields.get(5)).map(str::to_string);

        Ok(Self {
            chrom,
            start,
            end,
            exon_id,
            transcript_ids,
            gene_id,
        })
    }
}

#[inline]
fn optional<'a>(field: Option<&&'a str>) -> Option<&'a str> {
    match field {
        Some(value) if !value.is_empty() && *value != MISSING => Some(*value),
        _ => None,
    }
}

fn parse_coord(raw: &str, name: &str, source: &str, line_no: usize) -> Result<u64> {
    raw.parse::<u64>().map_err(|_| {
        CoverageError::parse_at(source, line_no, format!("invalid {} coordinate '{}'", name, raw))
    })
}

/// Lazy iterator over the exon rows of an annotation stream.
pub struct ExonReader<R: BufRead> {
    inner: R,
    source: String,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> ExonReader<R> {
    pub fn new(inner: R, source: impl Into<String>) -> Self {
        Self {
            inner,
            source: source.into(),
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for ExonReader<R> {
    type Item = Result<AnnotatedExon>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(CoverageError::Io(e))),
            }
            self.line_no += 1;

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.trim().is_empty() || line.starts_with('#') || line.starts_with("track") {
                continue;
            }
            return Some(AnnotatedExon::parse(line, &self.source, self.line_no));
        }
    }
}

/// Read every exon row of an annotation file (plain or gzipped).
pub fn read_exons<P: AsRef<Path>>(path: P) -> Result<Vec<AnnotatedExon>> {
    let path = path.as_ref();
    info!("Reading exon annotation from {}", path.display());
    let source = path.display().to_string();
    let exons = ExonReader::new(open_lines(path)?, source).collect::<Result<Vec<_>>>()?;
    debug!("Parsed {} exon rows", exons.len());
    Ok(exons)
}
