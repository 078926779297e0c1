//! Table definitions.
//!
//! Completeness lives in its own table keyed by threshold so any configured
//! threshold set can be stored.

pub(crate) const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS transcript (
    id TEXT PRIMARY KEY,
    gene_id TEXT NOT NULL,
    chromosome TEXT NOT NULL,
    length INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS transcript_gene_idx ON transcript(gene_id);

CREATE TABLE IF NOT EXISTS sample (
    id TEXT PRIMARY KEY,
    group_id TEXT,
    source TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS sample_group_idx ON sample(group_id);

CREATE TABLE IF NOT EXISTS transcript_stat (
    id INTEGER PRIMARY KEY,
    sample_id TEXT NOT NULL REFERENCES sample(id) ON DELETE CASCADE,
    transcript_id TEXT NOT NULL REFERENCES transcript(id) ON DELETE CASCADE,
    mean_coverage REAL,
    threshold INTEGER NOT NULL,
    incomplete_exons TEXT,
    UNIQUE (sample_id, transcript_id)
);
CREATE INDEX IF NOT EXISTS transcript_stat_transcript_idx ON transcript_stat(transcript_id);

CREATE TABLE IF NOT EXISTS transcript_stat_completeness (
    stat_id INTEGER NOT NULL REFERENCES transcript_stat(id) ON DELETE CASCADE,
    threshold INTEGER NOT NULL,
    completeness REAL,
    PRIMARY KEY (stat_id, threshold)
);
";

pub(crate) const DROP_TABLES: &str = "
DROP TABLE IF EXISTS transcript_stat_completeness;
DROP TABLE IF EXISTS transcript_stat;
DROP TABLE IF EXISTS sample;
DROP TABLE IF EXISTS transcript;
";

pub(crate) const UPSERT_TRANSCRIPT: &str = "
INSERT INTO transcript (id, gene_id, chromosome, length) VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(id) DO UPDATE SET
    gene_id = excluded.gene_id,
    chromosome = excluded.chromosome,
    length = excluded.length";

/// Re-processing a sample keeps its original `created_at`.
pub(crate) const UPSERT_SAMPLE: &str = "
INSERT INTO sample (id, group_id, source, created_at) VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(id) DO UPDATE SET
    group_id = excluded.group_id,
    source = excluded.source";

pub(crate) const INSERT_STAT: &str = "
INSERT INTO transcript_stat (sample_id, transcript_id, mean_coverage, threshold, incomplete_exons)
VALUES (?1, ?2, ?3, ?4, ?5)";

pub(crate) const INSERT_COMPLETENESS: &str = "
INSERT INTO transcript_stat_completeness (stat_id, threshold, completeness) VALUES (?1, ?2, ?3)";

pub(crate) const DELETE_SAMPLE_STATS: &str = "DELETE FROM transcript_stat WHERE sample_id = ?1";

pub(crate) const DELETE_SAMPLE: &str = "DELETE FROM sample WHERE id = ?1";
