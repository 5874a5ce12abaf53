use crate::affinity::ReductionMethod;
use crate::spectral::{SpectralProjector, DEFAULT_COMPONENTS};

/// Parameters of a single reduction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionConfig {
    method: ReductionMethod,
    n_components: usize,
    max_iterations: Option<usize>,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        ReductionConfigBuilder::new().build()
    }
}

impl ReductionConfig {
    pub fn builder() -> ReductionConfigBuilder {
        ReductionConfigBuilder::new()
    }

    pub fn method(&self) -> ReductionMethod {
        self.method
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    pub(crate) fn projector(&self) -> SpectralProjector {
        let projector = SpectralProjector::new(self.n_components);
        match self.max_iterations {
            Some(limit) => projector.max_iterations(limit),
            None => projector,
        }
    }
}

/// Fluent builder for [`ReductionConfig`].
///
/// Default values:
/// - `method`: PCA
/// - `n_components`: 2
/// - `max_iterations`: scaled with the affinity dimension
///
/// ```ignore
/// let config = ReductionConfigBuilder::new()
///     .method(ReductionMethod::ExponentialMds { alpha: 0.5 })
///     .n_components(3)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReductionConfigBuilder {
    method: ReductionMethod,
    n_components: usize,
    max_iterations: Option<usize>,
}

impl Default for ReductionConfigBuilder {
    fn default() -> Self {
        Self {
            method: ReductionMethod::default(),
            n_components: DEFAULT_COMPONENTS,
            max_iterations: None,
        }
    }
}

impl ReductionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: ReductionMethod) -> Self {
        self.method = method;
        self
    }

    /// Number of output columns. Must not exceed the affinity dimension
    /// (features for PCA, observations for MDS); checked when the run starts.
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn build(self) -> ReductionConfig {
        ReductionConfig {
            method: self.method,
            n_components: self.n_components,
            max_iterations: self.max_iterations,
        }
    }
}
