//! Dimensionality reduction of dense numeric tables through a symmetric
//! eigendecomposition: PCA, norm-normalized PCA and exponential MDS.

pub mod affinity;
pub mod error;
pub mod input;
pub mod io;
pub mod pipeline;
pub mod spectral;

pub use affinity::ReductionMethod;
pub use error::{ReduceError, Result};
pub use input::{validate, DataMatrix, RawTable};
pub use pipeline::{Pipeline, PipelineState, Reduction, ReductionConfig, ReductionConfigBuilder};
pub use spectral::{SpectralProjector, DEFAULT_COMPONENTS};
