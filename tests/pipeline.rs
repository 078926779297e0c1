use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use txcov_lib::prelude::*;

const ANNOTATION: &str = "\
#chrom\tstart\tend\texon_id\ttranscript_id\tgene_id
1\t100\t150\te1\tT1\tGENE1
1\t140\t200\te2\tT1\tGENE1
1\t500\t520\te3\tT2\tGENE1
2\t10\t40\te4\tT3\tGENE2
";

const PER_BASE: &str = "\
e1 1 100 150 25
e2 1 140 150 25
e2 1 150 180 12
e2 1 180 200 5
e3 1 500 520 40
";

struct Fixture {
    dir: TempDir,
    index: IntervalIndex,
    settings: AggregationSettings,
}

impl Fixture {
    fn new() -> Self {
        Self::with_annotation(ANNOTATION)
    }

    fn with_annotation(text: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let annotation = dir.path().join("exons.bed");
        fs::write(&annotation, text).unwrap();
        let index = IntervalIndex::from_path(&annotation, &mut NullSink).unwrap();
        Self {
            dir,
            index,
            settings: AggregationSettings::default(),
        }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("coverage.sqlite3")
    }

    fn store(&self) -> CoverageStore {
        let mut store = CoverageStore::open(self.database()).unwrap();
        store.upsert_transcripts(&self.index.transcripts()).unwrap();
        store
    }

    fn job(&self, sample: &str, depth: &Path) -> SampleJob {
        SampleJob::new(Sample::new(sample), DepthSource::File(depth.to_path_buf()))
    }

    fn load(
        &self,
        store: &mut CoverageStore,
        job: &SampleJob,
    ) -> (std::result::Result<LoadSummary, SampleError>, DiagnosticReport) {
        let mut report = DiagnosticReport::quiet();
        let result = load_sample(&self.index, job, &self.settings, store, &mut report);
        (result, report)
    }
}

fn close(actual: Option<f64>, expected: f64) -> bool {
    actual.map(|v| (v - expected).abs() < 1e-9).unwrap_or(false)
}

#[test]
fn loads_a_sample_end_to_end() {
    let fx = Fixture::new();
    let depth = fx.file("S1.depth", PER_BASE);
    let mut store = fx.store();

    let (result, report) = fx.load(&mut store, &fx.job("S1", &depth));
    let summary = result.unwrap();
    assert_eq!(summary.stats, 2);
    assert_eq!(summary.records, 5);
    assert!(report.is_empty());

    let t1 = store.stat("S1", "T1").unwrap().unwrap();
    assert!(close(t1.completeness_10(), 0.80));
    assert!(close(t1.completeness_20(), 0.50));
    assert!(close(t1.mean_coverage, 17.1));
    assert_eq!(t1.incomplete_exons.iter().collect::<Vec<_>>(), vec!["e2"]);

    let t2 = store.stat("S1", "T2").unwrap().unwrap();
    assert!(close(t2.completeness_20(), 1.0));
    assert!(close(t2.completeness_50(), 0.0));
    assert!(store.stat("S1", "T3").unwrap().is_none());
}

#[test]
fn reloading_is_idempotent() {
    let fx = Fixture::new();
    let depth = fx.file("S1.depth", PER_BASE);
    let mut store = fx.store();
    let job = fx.job("S1", &depth);

    fx.load(&mut store, &job).0.unwrap();
    let first = store.stats_for_sample("S1").unwrap();
    fx.load(&mut store, &job).0.unwrap();
    let second = store.stats_for_sample("S1").unwrap();

    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
    assert_eq!(store.samples(None).unwrap().len(), 1);
}

#[test]
fn unknown_regions_do_not_block_the_sample() {
    let fx = Fixture::new();
    let depth = fx.file("S1.depth", &format!("EXON_X 1 0 10 30\n{}", PER_BASE));
    let mut store = fx.store();

    let (result, report) = fx.load(&mut store, &fx.job("S1", &depth));
    assert_eq!(result.unwrap().stats, 2);
    assert_eq!(report.unknown_regions, 1);
    assert_eq!(store.stats_for_sample("S1").unwrap().len(), 2);
}

#[test]
fn reads_gzipped_region_summary() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let fx = Fixture::new();
    let summary = "# chrom\tchromStart\tchromEnd\tF3\treadCount\tmeanCoverage\tpercentage10\tpercentage15\tpercentage20\tpercentage50\tpercentage100\tsampleName\n\
1\t500\t520\te3\t120\t40\t100\t100\t90\t0\t0\tS1\n";
    let path = fx.dir.path().join("S1.bed.gz");
    let mut enc = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
    enc.write_all(summary.as_bytes()).unwrap();
    enc.finish().unwrap();

    let mut store = fx.store();
    fx.load(&mut store, &fx.job("S1", &path)).0.unwrap();
    let t2 = store.stat("S1", "T2").unwrap().unwrap();
    assert!(close(t2.mean_coverage, 40.0));
    assert!(close(t2.completeness_20(), 0.9));
    assert!(t2.is_complete());
}

#[test]
fn exon_listed_twice_is_counted_once() {
    let fx = Fixture::with_annotation(
        "1\t0\t10\te1\tT1\tGENE1\n1\t0\t10\te1\tT1\tGENE1\n1\t10\t20\te2\tT1\tGENE1\n",
    );
    let header = "# chrom\tchromStart\tchromEnd\tF3\treadCount\tmeanCoverage\tpercentage10\tpercentage15\tpercentage20\tpercentage50\tpercentage100\tsampleName\n";
    let row = |id: &str, start: u64| {
        format!("1\t{}\t{}\t{}\t60\t30\t100\t100\t100\t0\t0\tS1\n", start, start + 10, id)
    };
    let depth = fx.file(
        "S1.bed",
        &format!("{}{}{}{}", header, row("e1", 0), row("e1", 0), row("e2", 10)),
    );
    let mut store = fx.store();

    fx.load(&mut store, &fx.job("S1", &depth)).0.unwrap();
    let t1 = store.stat("S1", "T1").unwrap().unwrap();
    assert!(close(t1.mean_coverage, 30.0));
    assert!(close(t1.completeness_10(), 1.0));
    assert!(t1.is_complete());
}

#[test]
fn missing_depth_file_fails_at_open() {
    let fx = Fixture::new();
    let mut store = fx.store();
    let (result, _) = fx.load(&mut store, &fx.job("S1", &fx.dir.path().join("nope.bed")));
    let err = result.unwrap_err();
    assert_eq!(err.stage, Stage::Open);
    assert!(matches!(err.source, CoverageError::FileNotFound(_)));
    assert!(store.sample("S1").unwrap().is_none());
}

#[test]
fn corrupt_depth_stream_leaves_previous_stats() {
    let fx = Fixture::new();
    let good = fx.file("good.depth", PER_BASE);
    let bad = fx.file("bad.depth", "e1 1 100 150 25\ne2 1 oops 200 5\n");
    let mut store = fx.store();

    fx.load(&mut store, &fx.job("S1", &good)).0.unwrap();
    let before = store.stats_for_sample("S1").unwrap();

    let err = fx.load(&mut store, &fx.job("S1", &bad)).0.unwrap_err();
    assert_eq!(err.stage, Stage::Aggregate);
    assert!(matches!(err.source, CoverageError::SourceUnavailable(_)));
    assert_eq!(store.stats_for_sample("S1").unwrap(), before);
}

#[test]
fn missing_depth_tool_leaves_previous_stats() {
    let fx = Fixture::new();
    let depth = fx.file("S1.depth", PER_BASE);
    let mut store = fx.store();
    fx.load(&mut store, &fx.job("S1", &depth)).0.unwrap();
    let before = store.stats_for_sample("S1").unwrap();

    let cmd = SambambaCommand::new(fx.dir.path().join("exons.bed"), "S1.bam")
        .executable(fx.dir.path().join("no-such-sambamba"));
    let job = SampleJob::new(Sample::new("S1"), DepthSource::Sambamba(cmd));
    let err = fx.load(&mut store, &job).0.unwrap_err();

    assert_eq!(err.stage, Stage::Open);
    assert!(matches!(err.source, CoverageError::SourceUnavailable(_)));
    assert_eq!(store.stats_for_sample("S1").unwrap(), before);
}

#[cfg(unix)]
fn fake_tool(fx: &Fixture, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = fx.file(name, &format!("#!/bin/sh\n{}\n", body));
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// Both tools are written before either runs; a fork racing a script write
// fails with ETXTBSY.
#[cfg(unix)]
#[test]
fn streams_depth_tool_output() {
    let fx = Fixture::new();
    let depth = fx.file("S1.depth", PER_BASE);
    let good = fake_tool(&fx, "sambamba-ok", &format!("cat '{}'", depth.display()));
    let bad = fake_tool(
        &fx,
        "sambamba-fail",
        &format!("cat '{}'\necho 'index missing' >&2\nexit 3", depth.display()),
    );
    let regions = fx.dir.path().join("exons.bed");
    let mut store = fx.store();

    let cmd = SambambaCommand::new(&regions, "S1.bam").executable(good);
    let job = SampleJob::new(Sample::new("S1"), DepthSource::Sambamba(cmd));
    let summary = fx.load(&mut store, &job).0.unwrap();
    assert_eq!(summary.stats, 2);
    assert!(close(
        store.stat("S1", "T1").unwrap().unwrap().completeness_10(),
        0.80
    ));

    let cmd = SambambaCommand::new(&regions, "S2.bam").executable(bad);
    let job = SampleJob::new(Sample::new("S2"), DepthSource::Sambamba(cmd));
    let err = fx.load(&mut store, &job).0.unwrap_err();
    assert_eq!(err.stage, Stage::Aggregate);
    assert!(matches!(err.source, CoverageError::SourceUnavailable(_)));
    assert!(store.sample("S2").unwrap().is_none());
}

#[test]
fn direct_insert_of_a_loaded_stat_is_a_duplicate() {
    let fx = Fixture::new();
    let depth = fx.file("S1.depth", PER_BASE);
    let mut store = fx.store();
    fx.load(&mut store, &fx.job("S1", &depth)).0.unwrap();

    let stat = store.stat("S1", "T1").unwrap().unwrap();
    assert!(matches!(
        store.insert_transcript_stat(&stat),
        Err(CoverageError::DuplicateStat { .. })
    ));
    assert_eq!(store.stats_for_sample("S1").unwrap().len(), 2);
}

#[test]
fn batch_loads_samples_in_parallel() {
    let fx = Fixture::new();
    drop(fx.store());
    let mut jobs = Vec::new();
    for i in 0..6 {
        let depth = fx.file(&format!("S{}.depth", i), PER_BASE);
        jobs.push(fx.job(&format!("S{}", i), &depth));
    }
    jobs.push(fx.job("BROKEN", &fx.dir.path().join("missing.depth")));

    let loader = BatchLoader::new(
        Arc::new(fx.index.clone()),
        fx.settings.clone(),
        fx.database(),
        3,
    );
    let reports = loader.run_all(jobs).unwrap();
    assert_eq!(reports.len(), 7);

    let failed: Vec<&SampleReport> = reports.iter().filter(|r| !r.is_ok()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].sample_id, "BROKEN");
    assert!(matches!(
        failed[0].result,
        Err(SampleError { stage: Stage::Open, .. })
    ));

    let store = CoverageStore::open(fx.database()).unwrap();
    assert_eq!(store.samples(None).unwrap().len(), 6);
    for i in 0..6 {
        assert_eq!(store.stats_for_sample(&format!("S{}", i)).unwrap().len(), 2);
    }
}
