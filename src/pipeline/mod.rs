// src/pipeline/mod.rs
// =============================================================================
// The public entry point: URL in, sampled file contents out.
// =============================================================================

mod orchestrator;

pub use orchestrator::{RepoFetcher, RepositorySnapshot, SamplePlan};
