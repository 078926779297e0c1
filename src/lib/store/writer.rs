use log::{debug, info};
use rusqlite::{ffi, Connection};

use super::schema;
use super::CoverageStore;
use crate::core::error::{CoverageError, Result};
use crate::model::{Sample, Transcript, TranscriptStat};

impl CoverageStore {
    /// Insert or replace transcript rows. Returns the number written.
    pub fn upsert_transcripts(&mut self, transcripts: &[Transcript]) -> Result<usize> {
        let tx = self.connection.transaction()?;
        {
            let mut upsert = tx.prepare(schema::UPSERT_TRANSCRIPT)?;
            for t in transcripts {
                upsert.execute((&t.id, &t.gene_id, &t.chromosome, t.length as i64))?;
            }
        }
        tx.commit()?;
        info!("Stored {} transcripts", transcripts.len());
        Ok(transcripts.len())
    }

    /// Create the sample, or update its group and source.
    pub fn upsert_sample(&mut self, sample: &Sample) -> Result<()> {
        upsert_sample(&self.connection, sample)
    }

    /// Replace every stat of `sample_id` with `stats` in one transaction.
    /// The sample must exist.
    pub fn upsert_transcript_stats(
        &mut self,
        sample_id: &str,
        stats: &[TranscriptStat],
    ) -> Result<usize> {
        let tx = self.connection.transaction()?;
        let written = replace_stats(&tx, sample_id, stats)?;
        tx.commit()?;
        Ok(written)
    }

    /// Write the sample row and its full stat set atomically. On error the
    /// store is left as it was.
    pub fn commit_sample(&mut self, sample: &Sample, stats: &[TranscriptStat]) -> Result<usize> {
        let tx = self.connection.transaction()?;
        upsert_sample(&tx, sample)?;
        let written = replace_stats(&tx, &sample.id, stats)?;
        tx.commit()?;
        info!("Committed {} stats for sample {}", written, sample.id);
        Ok(written)
    }

    /// Insert a single stat without replacing. An existing row for the same
    /// sample and transcript is a [`CoverageError::DuplicateStat`].
    pub fn insert_transcript_stat(&mut self, stat: &TranscriptStat) -> Result<i64> {
        let tx = self.connection.transaction()?;
        let id = insert_stat(&tx, stat)?;
        tx.commit()?;
        Ok(id)
    }

    /// Delete a sample and, by cascade, its stats. Returns `false` when the
    /// sample did not exist.
    pub fn remove_sample(&mut self, sample_id: &str) -> Result<bool> {
        let removed = self.connection.execute(schema::DELETE_SAMPLE, (sample_id,))?;
        debug!("Removed sample {}: {}", sample_id, removed > 0);
        Ok(removed > 0)
    }
}

fn upsert_sample(conn: &Connection, sample: &Sample) -> Result<()> {
    conn.execute(
        schema::UPSERT_SAMPLE,
        (&sample.id, &sample.group_id, &sample.source, sample.created_at),
    )?;
    Ok(())
}

fn replace_stats(conn: &Connection, sample_id: &str, stats: &[TranscriptStat]) -> Result<usize> {
    let removed = conn.execute(schema::DELETE_SAMPLE_STATS, (sample_id,))?;
    if removed > 0 {
        debug!("Replacing {} stats of sample {}", removed, sample_id);
    }
    for stat in stats {
        if stat.sample_id != sample_id {
            return Err(CoverageError::InvalidInput(format!(
                "stat for sample {} in the stat set of {}",
                stat.sample_id, sample_id
            )));
        }
        insert_stat(conn, stat)?;
    }
    Ok(stats.len())
}

fn insert_stat(conn: &Connection, stat: &TranscriptStat) -> Result<i64> {
    let exons = (!stat.incomplete_exons.is_empty()).then(|| stat.incomplete_exons.encode());
    let mut insert = conn.prepare_cached(schema::INSERT_STAT)?;
    insert
        .execute((
            &stat.sample_id,
            &stat.transcript_id,
            stat.mean_coverage,
            stat.threshold,
            exons,
        ))
        .map_err(|err| duplicate_or(err, stat))?;
    let stat_id = conn.last_insert_rowid();

    let mut completeness = conn.prepare_cached(schema::INSERT_COMPLETENESS)?;
    for (threshold, value) in &stat.completeness {
        completeness.execute((stat_id, threshold, value))?;
    }
    Ok(stat_id)
}

fn duplicate_or(err: rusqlite::Error, stat: &TranscriptStat) -> CoverageError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            CoverageError::DuplicateStat {
                sample_id: stat.sample_id.clone(),
                transcript_id: stat.transcript_id.clone(),
            }
        }
        _ => CoverageError::Store(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExonIds;
    use std::collections::BTreeMap;

    fn store() -> CoverageStore {
        let mut store = CoverageStore::open_in_memory().unwrap();
        store
            .upsert_transcripts(&[
                Transcript::new("T1", "G1", "1", 100),
                Transcript::new("T2", "G1", "1", 50),
            ])
            .unwrap();
        store
    }

    fn stat(sample: &str, transcript: &str, mean: f64) -> TranscriptStat {
        TranscriptStat {
            sample_id: sample.into(),
            transcript_id: transcript.into(),
            mean_coverage: Some(mean),
            completeness: BTreeMap::from([(10, Some(0.8)), (20, Some(0.5))]),
            threshold: 10,
            incomplete_exons: ["e2", "e5"].into_iter().collect(),
        }
    }

    #[test]
    fn commit_and_read_back() {
        let mut store = store();
        store
            .commit_sample(&Sample::new("S1"), &[stat("S1", "T1", 17.1), stat("S1", "T2", 3.0)])
            .unwrap();
        let stats = store.stats_for_sample("S1").unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0], stat("S1", "T1", 17.1));
    }

    #[test]
    fn recommit_replaces_stats() {
        let mut store = store();
        let sample = Sample::new("S1");
        store
            .commit_sample(&sample, &[stat("S1", "T1", 1.0), stat("S1", "T2", 1.0)])
            .unwrap();
        store.commit_sample(&sample, &[stat("S1", "T1", 2.0)]).unwrap();

        let stats = store.stats_for_sample("S1").unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].mean_coverage, Some(2.0));
    }

    #[test]
    fn uncontrolled_insert_rejects_duplicates() {
        let mut store = store();
        store.upsert_sample(&Sample::new("S1")).unwrap();
        store.insert_transcript_stat(&stat("S1", "T1", 1.0)).unwrap();
        let err = store.insert_transcript_stat(&stat("S1", "T1", 2.0)).unwrap_err();
        assert!(matches!(
            err,
            CoverageError::DuplicateStat { ref sample_id, ref transcript_id }
                if sample_id == "S1" && transcript_id == "T1"
        ));
        assert_eq!(store.stat("S1", "T1").unwrap().unwrap().mean_coverage, Some(1.0));
    }

    #[test]
    fn failed_commit_leaves_store_untouched() {
        let mut store = store();
        let sample = Sample::new("S1");
        store.commit_sample(&sample, &[stat("S1", "T1", 1.0)]).unwrap();

        // Unknown transcript violates the foreign key halfway through.
        let err = store
            .commit_sample(&sample, &[stat("S1", "T2", 5.0), stat("S1", "T404", 5.0)])
            .unwrap_err();
        assert!(matches!(err, CoverageError::Store(_)));

        let stats = store.stats_for_sample("S1").unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].transcript_id, "T1");
        assert_eq!(stats[0].mean_coverage, Some(1.0));
    }

    #[test]
    fn stats_require_their_sample() {
        let mut store = store();
        assert!(store
            .upsert_transcript_stats("S9", &[stat("S9", "T1", 1.0)])
            .is_err());
        assert!(matches!(
            store.upsert_transcript_stats("S9", &[stat("S1", "T1", 1.0)]),
            Err(CoverageError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicate_inside_a_stat_set_is_rejected() {
        let mut store = store();
        let err = store
            .commit_sample(&Sample::new("S1"), &[stat("S1", "T1", 1.0), stat("S1", "T1", 2.0)])
            .unwrap_err();
        assert!(matches!(err, CoverageError::DuplicateStat { .. }));
        assert!(store.sample("S1").unwrap().is_none());
    }

    #[test]
    fn removing_a_sample_cascades() {
        let mut store = store();
        store
            .commit_sample(&Sample::new("S1"), &[stat("S1", "T1", 1.0)])
            .unwrap();
        assert!(store.remove_sample("S1").unwrap());
        assert!(!store.remove_sample("S1").unwrap());
        assert!(store.stats_for_sample("S1").unwrap().is_empty());
        let orphans: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM transcript_stat_completeness", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn resample_keeps_creation_time() {
        let mut store = store();
        let first = Sample::new("S1").with_group(Some("fam1".into()));
        store.upsert_sample(&first).unwrap();
        let mut again = Sample::new("S1").with_group(Some("fam2".into()));
        again.created_at = first.created_at + chrono::Duration::days(1);
        store.upsert_sample(&again).unwrap();

        let stored = store.sample("S1").unwrap().unwrap();
        assert_eq!(stored.group_id.as_deref(), Some("fam2"));
        assert_eq!(stored.created_at, first.created_at);
    }

    #[test]
    fn empty_exon_list_round_trips() {
        let mut store = store();
        let mut complete = stat("S1", "T1", 40.0);
        complete.incomplete_exons = ExonIds::new();
        complete.completeness.insert(15, None);
        store.commit_sample(&Sample::new("S1"), &[complete.clone()]).unwrap();
        assert_eq!(store.stat("S1", "T1").unwrap(), Some(complete));
    }
}
