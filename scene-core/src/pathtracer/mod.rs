//! §4.F Path-Tracing Integrator. The sampling math lives in [`math`] as
//! plain, unit-testable Rust; [`KERNEL_WGSL`] is the GPU mirror of the same
//! per-pixel procedure, loaded as a string for the raster/compute pipeline
//! to build a shader module from (same `include_str!` pattern the teacher
//! uses for its own WGSL shaders).

pub mod math;

pub const KERNEL_WGSL: &str = include_str!("kernel.wgsl");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_source_is_nonempty() {
        assert!(KERNEL_WGSL.contains("fn trace_main"));
    }
}
