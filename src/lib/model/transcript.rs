use serde::Serialize;

/// Set of non-overlapping exon bases belonging to a single gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    /// Unique transcript id (e.g. a CCDS id).
    pub id: String,
    /// Owning gene.
    pub gene_id: String,
    /// Contig the exons live on.
    pub chromosome: String,
    /// Number of bases covered by at least one exon after merging overlaps.
    pub length: u64,
}

impl Transcript {
    pub fn new(
        id: impl Into<String>,
        gene_id: impl Into<String>,
        chromosome: impl Into<String>,
        length: u64,
    ) -> Self {
        Self {
            id: id.into(),
            gene_id: gene_id.into(),
            chromosome: chromosome.into(),
            length,
        }
    }
}
