//! `EngineSettings`: the in-scope half of the teacher source's persisted
//! settings idea (`original_source/src/settings.hpp`/`settings_handler.hpp`),
//! with actual INI/file persistence left to the UI layer (out of scope here,
//! per spec.md's Non-goals) — this crate only owns the in-memory struct a
//! CLI or a UI can populate.

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Upper bound offered to the acceleration-structure builder for a
    /// single BLAS-batch scratch buffer, in bytes. The builder loops over
    /// "incomplete" batches when a scene needs more scratch than this.
    pub blas_scratch_budget_bytes: u64,
    pub russian_roulette_enabled: bool,
    pub max_path_depth: u32,
    pub firefly_clamp: f32,
    /// Fraction of the material table that must differ before the GPU
    /// mirror falls back to a full rebuild instead of a surgical patch
    /// (§4.D: `|D| > |materials| / 2`).
    pub full_update_ratio: f32,
    pub skinning_batch_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            blas_scratch_budget_bytes: 256 * 1024 * 1024,
            russian_roulette_enabled: true,
            max_path_depth: 8,
            firefly_clamp: 10.0,
            full_update_ratio: 0.5,
            skinning_batch_size: 2048,
        }
    }
}

/// Trivial no-op-by-default sink, replacing the original engine's global
/// profiler singleton (Design Note §9 "no global singletons") with an
/// explicitly-passed trait object.
pub trait ProfilerSink: Send + Sync {
    fn record(&self, _scope: &str, _nanos: u64) {}
}

pub struct NullProfiler;
impl ProfilerSink for NullProfiler {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = EngineSettings::default();
        assert!(s.max_path_depth > 0);
        assert!(s.full_update_ratio > 0.0 && s.full_update_ratio < 1.0);
    }
}
