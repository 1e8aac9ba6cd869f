//! Cross-check of two output files from equivalent simulation runs.
//!
//! Each timestep is compared as an unordered collection of bird states, so a
//! parallel run that writes birds in a different order still verifies.

use crate::config::VerifyConfig;
use crate::error::{DesyncError, HeaderMismatch};
use crate::format::{BirdState, SimReader, SimulationHeader};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter},
    path::Path,
};

/// Which file of the pair a bird came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    A,
    B,
}

/// A bird of one file with no equal in the same timestep of the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchReport {
    pub source: Source,
    pub index: usize,
    pub bird: BirdState,
}

impl MismatchReport {
    pub fn message(&self, label_a: &str, label_b: &str) -> String {
        let (from, other) = match self.source {
            Source::A => (label_a, label_b),
            Source::B => (label_b, label_a),
        };
        format!("Bird {} from {from} not in {other}.", self.index)
    }
}

/// Report every bird of one timestep that is missing from the other.
///
/// Reports are interleaved by index: `a[i]` is checked before `b[i]`.
pub fn compare_timestep(
    birds_a: &[BirdState],
    birds_b: &[BirdState],
    tolerance: f64,
) -> Vec<MismatchReport> {
    let contains = |birds: &[BirdState], bird: &BirdState| {
        birds.iter().any(|other| bird.matches(other, tolerance))
    };

    let mut reports = Vec::new();
    for index in 0..birds_a.len().max(birds_b.len()) {
        if let Some(bird) = birds_a.get(index).filter(|&bird| !contains(birds_b, bird)) {
            reports.push(MismatchReport {
                source: Source::A,
                index,
                bird: *bird,
            });
        }
        if let Some(bird) = birds_b.get(index).filter(|&bird| !contains(birds_a, bird)) {
            reports.push(MismatchReport {
                source: Source::B,
                index,
                bird: *bird,
            });
        }
    }
    reports
}

/// Two readers advanced in lockstep, one data timestep at a time.
pub struct FilePair<R> {
    reader_a: SimReader<R>,
    reader_b: SimReader<R>,
    timesteps: usize,
}

/// Open both files and compare their header tokens.
pub fn open_pair<P: AsRef<Path>, Q: AsRef<Path>>(
    path_a: P,
    path_b: Q,
) -> Result<(FilePair<BufReader<File>>, Option<HeaderMismatch>)> {
    let reader_a = SimReader::open(path_a)?;
    let reader_b = SimReader::open(path_b)?;
    Ok(FilePair::new(reader_a, reader_b))
}

impl<R: BufRead> FilePair<R> {
    pub fn new(
        reader_a: SimReader<R>,
        reader_b: SimReader<R>,
    ) -> (Self, Option<HeaderMismatch>) {
        let tokens_a = reader_a.header().tokens();
        let tokens_b = reader_b.header().tokens();
        let mismatch = (tokens_a != tokens_b).then(|| HeaderMismatch {
            label_a: reader_a.label().to_owned(),
            tokens_a: tokens_a.to_vec(),
            label_b: reader_b.label().to_owned(),
            tokens_b: tokens_b.to_vec(),
        });

        let pair = Self {
            reader_a,
            reader_b,
            timesteps: 0,
        };
        (pair, mismatch)
    }

    /// Header of the first file.
    pub fn header(&self) -> &SimulationHeader {
        self.reader_a.header()
    }

    pub fn label_a(&self) -> &str {
        self.reader_a.label()
    }

    pub fn label_b(&self) -> &str {
        self.reader_b.label()
    }

    /// Number of timestep pairs returned so far.
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    pub fn progress_count(&self) -> usize {
        self.reader_a.progress_count() + self.reader_b.progress_count()
    }

    /// Next pair of data timesteps, or `None` when both files end together.
    ///
    /// Progress lines are skipped in each file on its own.
    ///
    /// # Errors
    /// Fails with [`DesyncError`] when one file ends before the other.
    pub fn next_pair(&mut self) -> Result<Option<(Vec<BirdState>, Vec<BirdState>)>> {
        let birds_a = self.reader_a.next_timestep()?;
        let birds_b = self.reader_b.next_timestep()?;

        let (ended, other) = match (birds_a, birds_b) {
            (Some(birds_a), Some(birds_b)) => {
                self.timesteps += 1;
                return Ok(Some((birds_a, birds_b)));
            }
            (None, None) => return Ok(None),
            (None, Some(_)) => (&self.reader_a, &self.reader_b),
            (Some(_), None) => (&self.reader_b, &self.reader_a),
        };

        Err(DesyncError {
            ended: ended.label().to_owned(),
            other: other.label().to_owned(),
            timesteps: self.timesteps,
        }
        .into())
    }
}

/// Mismatch tagged with the timestep it was found in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestepMismatch {
    pub timestep: usize,
    #[serde(flatten)]
    pub report: MismatchReport,
}

/// Outcome of a verification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifySummary {
    pub label_a: String,
    pub label_b: String,
    pub headers_match: bool,
    pub timesteps: usize,
    pub progress_lines: usize,
    pub mismatches: Vec<TimestepMismatch>,
}

impl VerifySummary {
    /// Write the summary as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("failed to serialize summary")?;
        Ok(())
    }
}

pub struct Verifier {
    cfg: VerifyConfig,
}

impl Verifier {
    pub fn new(cfg: VerifyConfig) -> Self {
        Self { cfg }
    }

    /// Compare both files timestep by timestep and log every unmatched bird.
    pub fn run(&self) -> Result<VerifySummary> {
        let (mut pair, mismatch) =
            open_pair(&self.cfg.path_a, &self.cfg.path_b).context("failed to open files")?;

        if let Some(mismatch) = &mismatch {
            if self.cfg.strict_headers {
                return Err(mismatch.clone()).context("headers must match");
            }
            log::warn!("{mismatch}");
        }
        log::info!("{:#?}", pair.header());

        let mut mismatches = Vec::new();
        while let Some((birds_a, birds_b)) = pair.next_pair().context("failed to read timestep")? {
            let timestep = pair.timesteps() - 1;
            let reports = compare_timestep(&birds_a, &birds_b, self.cfg.tolerance);
            log::debug!("timestep {timestep}: {} unmatched birds", reports.len());

            for report in reports {
                log::warn!("{}", report.message(pair.label_a(), pair.label_b()));
                mismatches.push(TimestepMismatch { timestep, report });
            }
        }

        let summary = VerifySummary {
            label_a: pair.label_a().to_owned(),
            label_b: pair.label_b().to_owned(),
            headers_match: mismatch.is_none(),
            timesteps: pair.timesteps(),
            progress_lines: pair.progress_count(),
            mismatches,
        };
        log::info!(
            "compared {} timesteps, found {} unmatched birds",
            summary.timesteps,
            summary.mismatches.len()
        );

        if let Some(file) = &self.cfg.report_path {
            summary
                .save(file)
                .context("failed to save verification summary")?;
            log::info!("saved {file:?}");
        }

        if self.cfg.fail_on_mismatch && !summary.mismatches.is_empty() {
            bail!("{} unmatched birds", summary.mismatches.len());
        }

        Ok(summary)
    }
}
