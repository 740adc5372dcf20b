// Data models crossing the pipeline's seams: analyze inputs, versioned
// analysis results, the apply-target resume shape, and the generated artifact.

pub mod analysis;
pub mod artifact;
pub mod resume;
