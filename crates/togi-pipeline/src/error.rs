//! Pipeline error type.
//!
//! Geometry problems (degenerate crop boxes, out-of-range resize targets)
//! are clamped or skipped rather than reported, and a constant-intensity
//! image falls back to fixed thresholding inside the Otsu path. The only
//! condition a stage refuses to work around is a non-binary input to an
//! operation that requires one.

/// Errors that can abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage that requires a two-valued image received one with more
    /// distinct intensities. The pipeline never binarizes implicitly;
    /// enable a threshold stage (or supply binary input) first.
    #[error("image is not binary: found {distinct} distinct pixel values")]
    NotBinary {
        /// Number of distinct pixel values found in the offending image.
        distinct: usize,
    },
}
