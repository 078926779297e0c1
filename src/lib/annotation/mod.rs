//! Exon annotation input.
//!
//! The annotation is a BED-like, tab-delimited file with one exon per line:
//!
//! ```text
//! #chrom  start  end  exon_id  transcript_id  gene_id
//! 1       100    150  e1       T1             GENE1
//! ```
//!
//! Coordinates are 0-based, half-open. `.` or an empty column means the value
//! is missing. The transcript column may hold a comma-separated list; every
//! listed transcript then claims the exon and the index rejects the claim.

mod reader;

pub use reader::{read_exons, AnnotatedExon, ExonReader};
