//! §4.F per-pixel path-tracing math, kept in plain Rust so it is unit
//! testable without a device. [`super::KERNEL_WGSL`] mirrors this procedure
//! step for step for the actual GPU dispatch; this module exists to pin down
//! the sampling formulas the WGSL kernel must match, the way the teacher's
//! `renderer-core` keeps tonemap curve math in Rust next to the WGSL that
//! also implements it.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// `DIRAC` marks a sampling pdf for a perfectly specular event (mirror,
/// ideal transmission): MIS falls back to weight 1 rather than dividing by
/// an infinite density.
pub const DIRAC: f32 = f32::INFINITY;

/// Small xorshift PRNG seeded from `(pixel, frame)` (§4.F "PRNG seeded from
/// (pixel, frame)"). Not cryptographic; only used for sample generation.
pub struct Rng(u32);

impl Rng {
    pub fn new(pixel: (u32, u32), frame: u32) -> Self {
        let mut seed = pixel
            .0
            .wrapping_mul(1973)
            .wrapping_add(pixel.1.wrapping_mul(9277))
            .wrapping_add(frame.wrapping_mul(26699))
            | 1;
        // one warm-up round so small seeds don't produce an early short cycle
        seed = xorshift32(seed);
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = xorshift32(self.0);
        self.0
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    pub fn next_vec2(&mut self) -> Vec2 {
        Vec2::new(self.next_f32(), self.next_f32())
    }
}

fn xorshift32(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Camera parameters needed for ray generation; `inverse_view_projection`
/// maps NDC (x,y in `[-1,1]`, z arbitrary) back to a world-space point.
#[derive(Debug, Clone, Copy)]
pub struct CameraRays {
    pub eye: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub inverse_view_projection: Mat4,
    pub aperture: f32,
    pub focal_distance: f32,
}

/// §4.F item 1: pixel center + uniform sub-pixel jitter → NDC → world ray.
pub fn primary_ray(camera: &CameraRays, pixel: (u32, u32), resolution: (u32, u32), jitter: Vec2) -> Ray {
    let ndc_x = (((pixel.0 as f32 + jitter.x) / resolution.0 as f32) * 2.0) - 1.0;
    let ndc_y = 1.0 - (((pixel.1 as f32 + jitter.y) / resolution.1 as f32) * 2.0);

    let near = camera.inverse_view_projection * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
    let far = camera.inverse_view_projection * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
    let near_world = near.xyz() / near.w;
    let far_world = far.xyz() / far.w;

    Ray {
        origin: near_world,
        direction: (far_world - near_world).normalize(),
    }
}

/// §4.F item 2: depth-of-field disk sampling around the focal point.
pub fn apply_depth_of_field(camera: &CameraRays, ray: Ray, rand: Vec2) -> Ray {
    if camera.aperture <= 0.0 {
        return ray;
    }
    let focal_point = ray.origin + camera.focal_distance * ray.direction;
    let theta = rand.x * std::f32::consts::TAU;
    let radius = (rand.y * camera.aperture).sqrt();
    let offset = camera.right * (theta.cos() * radius) + camera.up * (theta.sin() * radius);
    let origin = ray.origin + offset;
    Ray {
        origin,
        direction: (focal_point - origin).normalize(),
    }
}

/// §4.F next-event-estimation light/environment selection weights.
#[derive(Debug, Clone, Copy)]
pub struct SamplingWeights {
    pub light_weight: f32,
    pub env_weight: f32,
}

pub fn sampling_weights(num_lights: usize, has_sky_or_hdr: bool) -> SamplingWeights {
    let raw_light = if num_lights > 0 { 0.5 } else { 0.0 };
    let raw_env = if has_sky_or_hdr { 0.5 } else { 0.0 };
    let total = raw_light + raw_env;
    if total == 0.0 {
        return SamplingWeights {
            light_weight: 0.0,
            env_weight: 0.0,
        };
    }
    SamplingWeights {
        light_weight: raw_light / total,
        env_weight: raw_env / total,
    }
}

/// §4.F MIS weight: `chosenPdf / (lightPdf + envPdf)`, or 1 for a DIRAC pdf.
pub fn mis_weight(chosen_pdf: f32, light_pdf: f32, env_pdf: f32) -> f32 {
    if chosen_pdf == DIRAC {
        return 1.0;
    }
    let denom = light_pdf + env_pdf;
    if denom <= 0.0 {
        0.0
    } else {
        chosen_pdf / denom
    }
}

/// Miss-shader MIS weight against a previously-sampled BSDF pdf
/// (`lastSamplePdf/(lastSamplePdf+envPdf)`, or 1 when the last sample was a
/// DIRAC event).
pub fn environment_mis_weight(last_sample_pdf: f32, env_pdf: f32) -> f32 {
    if last_sample_pdf == DIRAC {
        return 1.0;
    }
    let denom = last_sample_pdf + env_pdf;
    if denom <= 0.0 {
        0.0
    } else {
        last_sample_pdf / denom
    }
}

/// §4.F Russian roulette: `p = min(max(throughput) + 0.001, 0.95)`. Returns
/// `None` when the path terminates, `Some(divisor)` to scale throughput by
/// when it survives.
pub fn russian_roulette(throughput: Vec3, rand: f32) -> Option<f32> {
    let p = (throughput.x.max(throughput.y).max(throughput.z) + 0.001).min(0.95);
    if rand < 1.0 - p {
        None
    } else {
        Some(p)
    }
}

/// §4.F item 4: scale radiance down if its luminance exceeds `max_luminance`.
pub fn firefly_clamp(radiance: Vec3, max_luminance: f32) -> Vec3 {
    let luminance = radiance.dot(Vec3::new(0.2126, 0.7152, 0.0722));
    if luminance > max_luminance && luminance > 0.0 {
        radiance * (max_luminance / luminance)
    } else {
        radiance
    }
}

/// §4.F volume attenuation: `throughput *= exp(-hitT * absorptionCoefficient)`.
pub fn volume_attenuation(hit_t: f32, absorption_coefficient: Vec3) -> Vec3 {
    (-hit_t * absorption_coefficient).exp()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaTestMode {
    Opaque,
    Mask,
    Blend,
}

/// §4.F opacity test for any-hit shaders. `Blend` returns the raw sampled
/// alpha; the caller stochastically accepts/rejects it.
pub fn opacity_test(mode: AlphaTestMode, sampled_alpha: f32, alpha_cutoff: f32) -> f32 {
    match mode {
        AlphaTestMode::Opaque => 1.0,
        AlphaTestMode::Mask => {
            if sampled_alpha >= alpha_cutoff {
                1.0
            } else {
                0.0
            }
        }
        AlphaTestMode::Blend => sampled_alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_deterministic_for_same_seed() {
        let mut a = Rng::new((10, 20), 3);
        let mut b = Rng::new((10, 20), 3);
        assert_eq!(a.next_u32(), b.next_u32());
        assert_eq!(a.next_f32(), b.next_f32());
    }

    #[test]
    fn rng_differs_across_pixels() {
        let mut a = Rng::new((10, 20), 3);
        let mut b = Rng::new((11, 20), 3);
        assert_ne!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn no_dof_leaves_ray_unchanged() {
        let camera = CameraRays {
            eye: Vec3::ZERO,
            right: Vec3::X,
            up: Vec3::Y,
            inverse_view_projection: Mat4::IDENTITY,
            aperture: 0.0,
            focal_distance: 10.0,
        };
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        };
        let out = apply_depth_of_field(&camera, ray, Vec2::new(0.5, 0.5));
        assert_eq!(out.origin, ray.origin);
        assert_eq!(out.direction, ray.direction);
    }

    #[test]
    fn sampling_weights_split_evenly_when_both_present() {
        let w = sampling_weights(3, true);
        assert!((w.light_weight - 0.5).abs() < 1e-6);
        assert!((w.env_weight - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sampling_weights_all_light_when_no_environment() {
        let w = sampling_weights(3, false);
        assert_eq!(w.light_weight, 1.0);
        assert_eq!(w.env_weight, 0.0);
    }

    #[test]
    fn sampling_weights_zero_when_nothing_to_sample() {
        let w = sampling_weights(0, false);
        assert_eq!(w.light_weight, 0.0);
        assert_eq!(w.env_weight, 0.0);
    }

    #[test]
    fn mis_weight_is_one_for_dirac_pdf() {
        assert_eq!(mis_weight(DIRAC, 0.3, 0.2), 1.0);
    }

    #[test]
    fn mis_weight_normalizes_against_sum_of_pdfs() {
        assert!((mis_weight(0.5, 0.5, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn russian_roulette_always_survives_high_throughput() {
        // p = min(1.0 + 0.001, 0.95) = 0.95, so rand=0.99 (>= 1-p=0.05) survives.
        let divisor = russian_roulette(Vec3::splat(1.0), 0.99);
        assert_eq!(divisor, Some(0.95));
    }

    #[test]
    fn russian_roulette_terminates_low_throughput_on_bad_luck() {
        // p = min(0.101, 0.95) = 0.101; rand=0.05 < 1-p=0.899 terminates.
        assert_eq!(russian_roulette(Vec3::splat(0.1), 0.05), None);
    }

    #[test]
    fn firefly_clamp_scales_down_bright_radiance() {
        let clamped = firefly_clamp(Vec3::splat(100.0), 10.0);
        let luminance = clamped.dot(Vec3::new(0.2126, 0.7152, 0.0722));
        assert!((luminance - 10.0).abs() < 1e-3);
    }

    #[test]
    fn firefly_clamp_leaves_dim_radiance_untouched() {
        let radiance = Vec3::splat(0.1);
        assert_eq!(firefly_clamp(radiance, 10.0), radiance);
    }

    #[test]
    fn opacity_test_mask_steps_at_cutoff() {
        assert_eq!(opacity_test(AlphaTestMode::Mask, 0.4, 0.5), 0.0);
        assert_eq!(opacity_test(AlphaTestMode::Mask, 0.6, 0.5), 1.0);
    }

    #[test]
    fn opacity_test_opaque_always_one() {
        assert_eq!(opacity_test(AlphaTestMode::Opaque, 0.0, 0.5), 1.0);
    }

    #[test]
    fn opacity_test_blend_passes_through_alpha() {
        assert_eq!(opacity_test(AlphaTestMode::Blend, 0.37, 0.5), 0.37);
    }

    #[test]
    fn volume_attenuation_decays_with_distance() {
        let near = volume_attenuation(1.0, Vec3::splat(0.1));
        let far = volume_attenuation(10.0, Vec3::splat(0.1));
        assert!(far.x < near.x);
    }
}
