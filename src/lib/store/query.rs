//! Read-side access to stored stats.

use rusqlite::{OptionalExtension, Row};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

use super::CoverageStore;
use crate::core::error::Result;
use crate::model::{ExonIds, Sample, Transcript, TranscriptStat};

/// Per-sample averages over a set of transcript stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    pub sample_id: String,
    pub mean_coverage: Option<f64>,
    pub completeness: BTreeMap<u32, Option<f64>>,
}

const STAT_COLUMNS: &str =
    "id, sample_id, transcript_id, mean_coverage, threshold, incomplete_exons";

fn row_to_sample(row: &Row) -> rusqlite::Result<Sample> {
    Ok(Sample {
        id: row.get(0)?,
        group_id: row.get(1)?,
        source: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_transcript(row: &Row) -> rusqlite::Result<Transcript> {
    let length: i64 = row.get(3)?;
    Ok(Transcript {
        id: row.get(0)?,
        gene_id: row.get(1)?,
        chromosome: row.get(2)?,
        length: length as u64,
    })
}

fn row_to_stat(row: &Row) -> rusqlite::Result<(i64, TranscriptStat)> {
    let exons: Option<String> = row.get(5)?;
    Ok((
        row.get(0)?,
        TranscriptStat {
            sample_id: row.get(1)?,
            transcript_id: row.get(2)?,
            mean_coverage: row.get(3)?,
            completeness: BTreeMap::new(),
            threshold: row.get(4)?,
            incomplete_exons: ExonIds::decode(exons.as_deref()),
        },
    ))
}

impl CoverageStore {
    /// All samples, optionally restricted to one group.
    pub fn samples(&self, group_id: Option<&str>) -> Result<Vec<Sample>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, group_id, source, created_at FROM sample
             WHERE ?1 IS NULL OR group_id = ?1
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map((group_id,), row_to_sample)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn sample(&self, sample_id: &str) -> Result<Option<Sample>> {
        Ok(self
            .connection()
            .query_row(
                "SELECT id, group_id, source, created_at FROM sample WHERE id = ?1",
                (sample_id,),
                row_to_sample,
            )
            .optional()?)
    }

    pub fn transcript(&self, transcript_id: &str) -> Result<Option<Transcript>> {
        Ok(self
            .connection()
            .query_row(
                "SELECT id, gene_id, chromosome, length FROM transcript WHERE id = ?1",
                (transcript_id,),
                row_to_transcript,
            )
            .optional()?)
    }

    pub fn transcripts_for_gene(&self, gene_id: &str) -> Result<Vec<Transcript>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, gene_id, chromosome, length FROM transcript
             WHERE gene_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map((gene_id,), row_to_transcript)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every stat of a sample, ordered by transcript id.
    pub fn stats_for_sample(&self, sample_id: &str) -> Result<Vec<TranscriptStat>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM transcript_stat WHERE sample_id = ?1 ORDER BY transcript_id",
            STAT_COLUMNS
        ))?;
        let stats = stmt
            .query_map((sample_id,), row_to_stat)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut completeness = self.completeness_for_sample(sample_id)?;
        Ok(stats
            .into_iter()
            .map(|(id, mut stat)| {
                stat.completeness = completeness.remove(&id).unwrap_or_default();
                stat
            })
            .collect())
    }

    /// Stat of one transcript in one sample.
    pub fn stat(&self, sample_id: &str, transcript_id: &str) -> Result<Option<TranscriptStat>> {
        let found = self
            .connection()
            .query_row(
                &format!(
                    "SELECT {} FROM transcript_stat WHERE sample_id = ?1 AND transcript_id = ?2",
                    STAT_COLUMNS
                ),
                (sample_id, transcript_id),
                row_to_stat,
            )
            .optional()?;

        match found {
            Some((id, mut stat)) => {
                let mut stmt = self.connection().prepare(
                    "SELECT threshold, completeness FROM transcript_stat_completeness
                     WHERE stat_id = ?1",
                )?;
                let rows = stmt.query_map((id,), |row| Ok((row.get(0)?, row.get(1)?)))?;
                stat.completeness = rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
                Ok(Some(stat))
            }
            None => Ok(None),
        }
    }

    fn completeness_for_sample(
        &self,
        sample_id: &str,
    ) -> Result<FxHashMap<i64, BTreeMap<u32, Option<f64>>>> {
        let mut stmt = self.connection().prepare(
            "SELECT c.stat_id, c.threshold, c.completeness
             FROM transcript_stat_completeness c
             JOIN transcript_stat s ON s.id = c.stat_id
             WHERE s.sample_id = ?1",
        )?;
        let mut rows = stmt.query((sample_id,))?;
        let mut by_stat: FxHashMap<i64, BTreeMap<u32, Option<f64>>> = FxHashMap::default();
        while let Some(row) = rows.next()? {
            by_stat
                .entry(row.get(0)?)
                .or_default()
                .insert(row.get(1)?, row.get(2)?);
        }
        Ok(by_stat)
    }

    /// Average mean coverage and completeness per sample. An empty
    /// `sample_ids` means every sample with stats.
    pub fn mean_summary(&self, sample_ids: &[String]) -> Result<Vec<SampleSummary>> {
        let summaries = self.summarize(None)?;
        if sample_ids.is_empty() {
            return Ok(summaries);
        }
        Ok(summaries
            .into_iter()
            .filter(|s| sample_ids.contains(&s.sample_id))
            .collect())
    }

    /// Per-sample averages over the transcripts of one gene.
    pub fn gene_summary(&self, gene_id: &str) -> Result<Vec<SampleSummary>> {
        self.summarize(Some(gene_id))
    }

    fn summarize(&self, gene_id: Option<&str>) -> Result<Vec<SampleSummary>> {
        let mut means = self.connection().prepare(
            "SELECT s.sample_id, AVG(s.mean_coverage)
             FROM transcript_stat s
             JOIN transcript t ON t.id = s.transcript_id
             WHERE ?1 IS NULL OR t.gene_id = ?1
             GROUP BY s.sample_id
             ORDER BY s.sample_id",
        )?;
        let mut summaries: Vec<SampleSummary> = means
            .query_map((gene_id,), |row| {
                Ok(SampleSummary {
                    sample_id: row.get(0)?,
                    mean_coverage: row.get(1)?,
                    completeness: BTreeMap::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut completeness = self.connection().prepare(
            "SELECT s.sample_id, c.threshold, AVG(c.completeness)
             FROM transcript_stat_completeness c
             JOIN transcript_stat s ON s.id = c.stat_id
             JOIN transcript t ON t.id = s.transcript_id
             WHERE ?1 IS NULL OR t.gene_id = ?1
             GROUP BY s.sample_id, c.threshold",
        )?;
        let mut rows = completeness.query((gene_id,))?;
        let mut by_sample: FxHashMap<String, BTreeMap<u32, Option<f64>>> = FxHashMap::default();
        while let Some(row) = rows.next()? {
            by_sample
                .entry(row.get(0)?)
                .or_default()
                .insert(row.get(1)?, row.get(2)?);
        }

        for summary in &mut summaries {
            summary.completeness = by_sample.remove(&summary.sample_id).unwrap_or_default();
        }
        Ok(summaries)
    }
}
