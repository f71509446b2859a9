//! Batch classification over a link source
//!
//! A [`ClassifierContext`] is built once per run and owns the link source,
//! terrain model, hex grid and worker pool. Each batch classifies every link of
//! a set of witnesses on the pool, keeps the edges, picks the worst edge per
//! witness and builds report data for it from the full loss profile.

use crate::algorithms::{select_worst, ClassificationEngine, ClassificationParams};
use crate::core::{ClassificationResult, EdgeRecord, HotspotId};
use crate::propagation::{HexGrid, TerrainModel};
use crate::report::{assemble_report, CsvFormatter, JsonFormatter, ReportData};
use crate::source::{InventoryPager, LinkQuery, LinkSource};
use crate::utils::config::ClassifierConfig;
use crate::validation::error::{FatalError, LinkError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Skipped links per failure kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub validation: usize,
    pub geometry: usize,
    pub computation: usize,
    pub missing_assertion: usize,
}

impl SkipCounts {
    fn record(&mut self, error: &LinkError) {
        match error {
            LinkError::Validation(_) => self.validation += 1,
            LinkError::Geometry { .. } => self.geometry += 1,
            LinkError::Computation { .. } => self.computation += 1,
            LinkError::MissingAssertion { .. } => self.missing_assertion += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.validation + self.geometry + self.computation + self.missing_assertion
    }
}

/// Counters for one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub witnesses: usize,
    /// Rows returned by the link source
    pub rows: usize,
    /// Links that made it through classification
    pub classified: usize,
    pub edges: usize,
    pub reports: usize,
    pub skipped: SkipCounts,
    pub elapsed_ms: f64,
}

/// Everything produced by one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Two-column records for every edge link
    pub edges: Vec<EdgeRecord>,
    /// Full classification results of the edge links
    pub results: Vec<ClassificationResult>,
    /// One report per witness with at least one edge
    pub reports: Vec<ReportData>,
    pub summary: BatchSummary,
}

/// Totals over a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub batches: usize,
    pub witnesses: usize,
    pub edges: usize,
    pub reports: usize,
    pub files_written: usize,
}

/// Edge results of one query plus skip accounting
#[derive(Debug, Default)]
struct Evaluation {
    edges: Vec<ClassificationResult>,
    rows: usize,
    classified: usize,
    skipped: SkipCounts,
}

/// Long-lived classifier state for a run
pub struct ClassifierContext {
    config: ClassifierConfig,
    source: Box<dyn LinkSource>,
    terrain: Box<dyn TerrainModel>,
    grid: Box<dyn HexGrid>,
    pool: ThreadPool,
}

impl ClassifierContext {
    /// Validate the configuration, check the terrain source and start the worker pool
    pub fn new(
        config: ClassifierConfig,
        source: Box<dyn LinkSource>,
        terrain: Box<dyn TerrainModel>,
        grid: Box<dyn HexGrid>,
    ) -> Result<Self, FatalError> {
        config.validate()?;
        terrain.ensure_available().map_err(FatalError::TerrainSource)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.n_workers)
            .thread_name(|i| format!("link-worker-{}", i))
            .build()
            .map_err(|e| FatalError::WorkerPool(e.to_string()))?;

        info!(
            n_workers = config.n_workers,
            batch_size = config.batch_size,
            threshold_db = config.threshold_db,
            min_distance_km = config.min_distance_km,
            "classifier context ready"
        );
        Ok(Self {
            config,
            source,
            terrain,
            grid,
            pool,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Page through the hotspot registry in `batch_size` chunks
    pub fn inventory(&self) -> InventoryPager<'_> {
        InventoryPager::new(self.source.as_ref(), self.config.batch_size)
    }

    /// Classify every link matching `query` and return the edges, in source order
    pub fn compute_residuals(
        &self,
        query: &LinkQuery<'_>,
        compute_loss_profile: bool,
    ) -> Result<Vec<ClassificationResult>, FatalError> {
        Ok(self.evaluate(query, compute_loss_profile)?.edges)
    }

    fn evaluate(&self, query: &LinkQuery<'_>, compute_loss_profile: bool) -> Result<Evaluation, FatalError> {
        info!(witnesses = query.witnesses.len(), "computing model residuals");
        let rows = self.source.fetch_links(query)?;

        let params = ClassificationParams {
            compute_loss_profile,
            ..self.config.params()
        };
        let engine = ClassificationEngine::new(self.terrain.as_ref(), self.grid.as_ref(), params);
        let outcomes: Vec<Result<ClassificationResult, LinkError>> = self.pool.install(|| {
            rows.par_iter()
                .map(|row| row.to_link().and_then(|link| engine.classify(&link)))
                .collect()
        });

        let mut evaluation = Evaluation {
            rows: rows.len(),
            ..Evaluation::default()
        };
        for (row, outcome) in rows.iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    evaluation.classified += 1;
                    if result.edge_flag {
                        info!(
                            beaconer = %result.beaconer,
                            witness = %result.witness,
                            residual_db = result.residual_db,
                            samples = result.samples,
                            "edge flagged"
                        );
                        evaluation.edges.push(result);
                    }
                }
                Err(error) => {
                    error.log_skip(&row.beaconer, &row.witness);
                    evaluation.skipped.record(&error);
                }
            }
        }
        Ok(evaluation)
    }

    /// Classify, select and build reports for one batch of witnesses
    pub fn run_batch(&self, witness_ids: &[HotspotId]) -> Result<BatchOutcome, FatalError> {
        let started = Instant::now();
        info!(witnesses = witness_ids.len(), "running classifier on batch");

        let query = LinkQuery::for_witnesses(witness_ids, self.config.max_beaconers);
        let evaluation = self.evaluate(&query, false)?;
        let edges: Vec<EdgeRecord> = evaluation.edges.iter().map(EdgeRecord::from).collect();

        let selected = select_worst(&evaluation.edges);
        info!(pairs = selected.len(), "starting report generation");
        let mut reports = Vec::with_capacity(selected.len());
        for worst in selected {
            if let Some(report) = self.build_report(&worst.beaconer, &worst.witness)? {
                reports.push(report);
            }
        }

        let summary = BatchSummary {
            witnesses: witness_ids.len(),
            rows: evaluation.rows,
            classified: evaluation.classified,
            edges: edges.len(),
            reports: reports.len(),
            skipped: evaluation.skipped,
            elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
        };
        info!(
            rows = summary.rows,
            edges = summary.edges,
            reports = summary.reports,
            skipped = summary.skipped.total(),
            elapsed_ms = summary.elapsed_ms,
            "batch finished"
        );

        Ok(BatchOutcome {
            edges,
            results: evaluation.edges,
            reports,
            summary,
        })
    }

    /// Re-evaluate one pair with the full loss profile and assemble its report
    fn build_report(&self, beaconer: &HotspotId, witness: &HotspotId) -> Result<Option<ReportData>, FatalError> {
        info!(%beaconer, %witness, "creating report card");
        let beaconers = [beaconer.clone()];
        let witnesses = [witness.clone()];
        let query = LinkQuery::for_witnesses(&witnesses, 1).with_beaconers(&beaconers);

        let Some(result) = self.compute_residuals(&query, true)?.into_iter().next() else {
            warn!(%beaconer, %witness, "no loss profile available");
            return Ok(None);
        };
        let Some(loss_profile) = result.loss_profile_db.as_deref() else {
            warn!(%beaconer, %witness, "no loss profile available");
            return Ok(None);
        };
        match assemble_report(&result, loss_profile) {
            Ok(report) => Ok(Some(report)),
            Err(error) => {
                error.log_skip(beaconer, witness);
                Ok(None)
            }
        }
    }

    /// Write the edge list, optional full results and reports of a batch into `report_dir`
    pub fn write_batch(&self, batch: usize, outcome: &BatchOutcome) -> Result<Vec<PathBuf>, FatalError> {
        let dir = &self.config.report_dir;
        fs::create_dir_all(dir)?;
        let json = JsonFormatter::pretty();
        let mut written = Vec::new();

        if outcome.edges.is_empty() {
            warn!(batch, "no edge links found, nothing to write");
        } else {
            let path = dir.join(format!("edges_{}.json", batch));
            fs::write(&path, json.format_edges(&outcome.edges)?)?;
            written.push(path);

            let path = dir.join(format!("edges_{}.csv", batch));
            fs::write(&path, CsvFormatter::new().format_edges(&outcome.edges))?;
            written.push(path);
            info!(batch, edges = outcome.edges.len(), "wrote flagged beaconer->witness pairs");
        }

        if self.config.include_edge_metadata && !outcome.results.is_empty() {
            let path = dir.join(format!("results_{}.json", batch));
            fs::write(&path, json.format(&outcome.results)?)?;
            written.push(path);
        }

        for report in &outcome.reports {
            if !report.witness.is_file_safe() {
                warn!(witness = %report.witness, "witness key is not a valid file name, report not written");
                continue;
            }
            let path = dir.join(format!("{}.json", report.witness));
            fs::write(&path, json.format_report(report)?)?;
            info!(path = %path.display(), "report card written");
            written.push(path);
        }
        Ok(written)
    }

    /// Run every registry batch, writing outputs as each batch finishes
    pub fn run(&self, max_batches: Option<usize>) -> Result<RunSummary, FatalError> {
        let mut summary = RunSummary::default();
        for (index, keys) in self.inventory().with_max_batches(max_batches).enumerate() {
            let keys = keys?;
            let _span = info_span!("batch", index).entered();
            let outcome = self.run_batch(&keys)?;
            let written = self.write_batch(index, &outcome)?;

            summary.batches += 1;
            summary.witnesses += keys.len();
            summary.edges += outcome.edges.len();
            summary.reports += outcome.reports.len();
            summary.files_written += written.len();
        }
        info!(
            batches = summary.batches,
            edges = summary.edges,
            reports = summary.reports,
            "run complete"
        );
        Ok(summary)
    }
}
