//! Metrics reports exported by worldtests.
//!
//! Reports are written as JSON so CI can diff generation throughput and
//! scheduler behavior between runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Top-level metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test/benchmark identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (ISO 8601)
    pub timestamp: String,

    /// World seed the test ran with
    pub seed: i64,

    /// Overall test result
    pub result: TestResult,

    /// Chunk generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationMetrics>,

    /// Chunk scheduler counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed all validations
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

/// Generation throughput and output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetrics {
    /// Total chunks generated
    pub chunks_generated: usize,

    /// Total voxels generated
    pub blocks_generated: usize,

    /// Average generation time per chunk (microseconds)
    pub avg_gen_time_us: f64,

    /// Min generation time (microseconds)
    pub min_gen_time_us: u128,

    /// Max generation time (microseconds)
    pub max_gen_time_us: u128,

    /// Chunks per second throughput
    pub chunks_per_second: f64,

    /// Number of distinct biomes present
    pub unique_biomes: usize,

    /// Cross-border features carried by the generated chunks
    pub boundary_features: usize,

    /// Chunk seam validation results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seam_validation: Option<SeamValidation>,
}

/// Chunk boundary seam validation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeamValidation {
    /// Total seams checked
    pub total_seams: usize,

    /// Seams that passed validation
    pub seams_valid: usize,

    /// Seams that failed validation
    pub seams_failed: usize,

    /// Maximum height difference observed at seams
    pub max_seam_diff: i32,

    /// Average height difference at seams
    pub avg_seam_diff: f64,
}

/// Scheduler counters at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    /// Pipelines started
    pub pipeline_runs: u64,
    /// Requests served from cache
    pub cache_hits: u64,
    /// Requests that queued a generation
    pub cache_misses: u64,
    /// Requests that joined an in-flight generation
    pub attached: u64,
    /// Requests dropped before their result arrived
    pub withdrawals: u64,
    /// Chunks evicted from the cache
    pub evictions: u64,
    /// Generations that ran out of time
    pub timeouts: u64,
    /// Generations that failed for any other reason
    pub failures: u64,
    /// Cross-border features resolved
    pub markers_resolved: u64,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,

    /// Number of validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                seed: 0,
                result: TestResult::Pass,
                generation: None,
                scheduler: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set the world seed
    pub fn seed(mut self, seed: i64) -> Self {
        self.report.seed = seed;
        self
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set generation metrics
    pub fn generation(mut self, metrics: GenerationMetrics) -> Self {
        self.report.generation = Some(metrics);
        self
    }

    /// Set scheduler counters
    pub fn scheduler(mut self, metrics: SchedulerMetrics) -> Self {
        self.report.scheduler = Some(metrics);
        self
    }

    /// Set test execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        debug!(path = %self.path.display(), test = %report.test_name, "wrote metrics report");
        Ok(())
    }
}
