//! # Reduction pipeline
//!
//! Wires a [`TableSource`] through validation, affinity construction and spectral
//! projection into a [`TableSink`]. A run walks the states
//!
//! ```text
//! Start → Validating → BuildingAffinity → Decomposing → Writing → Done
//! ```
//!
//! strictly forward. Any error ends the run in [`PipelineState::Failed`] and
//! nothing is handed to the sink.

mod config;

pub use config::{ReductionConfig, ReductionConfigBuilder};

use crate::affinity::ReductionMethod;
use crate::error::Result;
use crate::input::validate;
use crate::io::{TableSink, TableSource};
use crate::spectral::SpectralProjection;
use log::{debug, info};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Start,
    Validating,
    BuildingAffinity,
    Decomposing,
    Writing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    fn successor(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Start => Some(PipelineState::Validating),
            PipelineState::Validating => Some(PipelineState::BuildingAffinity),
            PipelineState::BuildingAffinity => Some(PipelineState::Decomposing),
            PipelineState::Decomposing => Some(PipelineState::Writing),
            PipelineState::Writing => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed => None,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    method: ReductionMethod,
    projection: SpectralProjection,
}

impl Reduction {
    pub fn method(&self) -> ReductionMethod {
        self.method
    }

    pub fn coordinates(&self) -> &Array2<f64> {
        self.projection.coordinates()
    }

    pub fn into_coordinates(self) -> Array2<f64> {
        self.projection.into_coordinates()
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        self.projection.eigenvalues()
    }

    pub fn total_magnitude(&self) -> f64 {
        self.projection.total_magnitude()
    }

    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        self.projection.explained_variance_ratio()
    }

    pub fn cumulative_explained_variance_ratio(&self) -> Array1<f64> {
        self.projection.cumulative_explained_variance_ratio()
    }
}

pub struct Pipeline {
    config: ReductionConfig,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: ReductionConfig) -> Self {
        Pipeline {
            config,
            state: PipelineState::Start,
        }
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs one reduction from `source` into `sink`.
    ///
    /// Every call is an independent run starting from [`PipelineState::Start`].
    pub fn run<S, W>(&mut self, source: &S, sink: &mut W) -> Result<Reduction>
    where
        S: TableSource + ?Sized,
        W: TableSink + ?Sized,
    {
        self.state = PipelineState::Start;
        match self.execute(source, sink) {
            Ok(reduction) => Ok(reduction),
            Err(e) => {
                debug!("Pipeline failed in state {:?}: {}", self.state, e);
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn execute<S, W>(&mut self, source: &S, sink: &mut W) -> Result<Reduction>
    where
        S: TableSource + ?Sized,
        W: TableSink + ?Sized,
    {
        let method = self.config.method();
        let projector = self.config.projector();

        self.advance();
        method.validate()?;
        let table = source.read_table()?;
        let data = validate(&table)?;
        projector.check_components(method.affinity_dimension(data.nrows(), data.ncols()))?;

        self.advance();
        let affinity = method.build_affinity(&data)?;

        self.advance();
        let projection = projector.decompose_and_project(affinity)?;
        info!(
            "{} explained variance ratio: {}",
            method,
            projection.explained_variance_ratio()
        );

        self.advance();
        sink.write_table(projection.coordinates().view())?;

        self.advance();
        info!("Reduced data saved to {}", sink.describe());

        Ok(Reduction { method, projection })
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.successor() {
            debug!("Pipeline state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
