//! §4.D CPU skinning and morph blending. Grounded on
//! `examples/original_source/src/gltf_scene_vk.cpp`'s `applySkinning`
//! (unified position/normal/tangent pass, inverse-transpose normal matrix,
//! ~2048-vertex `parallel_batches`) and `getBlendedPositions` (morph target
//! accumulation), re-expressed with `rayon::par_chunks` in place of the
//! original's batch helper.
//!
//! The per-joint matrix already cancels the render node's own world
//! transform (`inverse(refNodeWorldMat) * jointNodeWorldMat *
//! inverseBindMatrix`), so the caller uploads skinned vertices straight into
//! object space alongside the render node's `objectToWorld`.

use glam::{Mat3, Mat4, Vec3, Vec4};
use rayon::prelude::*;

/// Per-joint data precomputed once per frame, before the parallel vertex
/// loop: the full joint matrix plus its inverse-transpose for normals.
#[derive(Clone, Copy)]
pub struct JointMatrix {
    pub matrix: Mat4,
    pub normal_matrix: Mat3,
}

impl JointMatrix {
    pub fn new(matrix: Mat4) -> Self {
        let upper_left = Mat3::from_mat4(matrix);
        let normal_matrix = upper_left.inverse().transpose();
        Self { matrix, normal_matrix }
    }
}

/// `inverse(refNodeWorldMat) * jointNodeWorldMat * inverseBindMatrix` for
/// every joint of one skin, in joint order.
pub fn compute_joint_matrices(
    ref_node_world: Mat4,
    joint_world_matrices: &[Mat4],
    inverse_bind_matrices: &[Mat4],
) -> Vec<JointMatrix> {
    let inv_ref = ref_node_world.inverse();
    joint_world_matrices
        .iter()
        .zip(inverse_bind_matrices.iter())
        .map(|(&joint_world, &inverse_bind)| JointMatrix::new(inv_ref * joint_world * inverse_bind))
        .collect()
}

pub struct SkinningInputs<'a> {
    pub positions: &'a [Vec3],
    pub normals: Option<&'a [Vec3]>,
    pub tangents: Option<&'a [Vec4]>,
    pub joints: &'a [[u16; 4]],
    pub weights: &'a [[f32; 4]],
}

pub struct SkinningOutputs {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec4>>,
}

const BATCH_SIZE: usize = 2048;

/// Skins `inputs` against `joints` in parallel batches of `BATCH_SIZE`
/// vertices (§4.D, §5 "CPU-parallel batches").
pub fn skin(inputs: &SkinningInputs, joints: &[JointMatrix]) -> SkinningOutputs {
    let vertex_count = inputs.positions.len();
    let mut positions = vec![Vec3::ZERO; vertex_count];
    let mut normals = inputs.normals.map(|_| vec![Vec3::ZERO; vertex_count]);
    let mut tangents = inputs.tangents.map(|_| vec![Vec4::ZERO; vertex_count]);

    let indices: Vec<usize> = (0..vertex_count).collect();
    indices
        .par_chunks(BATCH_SIZE)
        .zip(positions.par_chunks_mut(BATCH_SIZE))
        .for_each(|(chunk, pos_out)| {
            for (local, &v) in chunk.iter().enumerate() {
                let w = inputs.weights[v];
                let j = inputs.joints[v];
                let mut skinned = Vec3::ZERO;
                for k in 0..4 {
                    if w[k] > 0.0 {
                        skinned += w[k] * joints[j[k] as usize].matrix.transform_point3(inputs.positions[v]);
                    }
                }
                pos_out[local] = skinned;
            }
        });

    if let (Some(src), Some(dst)) = (inputs.normals, normals.as_deref_mut()) {
        indices
            .par_chunks(BATCH_SIZE)
            .zip(dst.par_chunks_mut(BATCH_SIZE))
            .for_each(|(chunk, nrm_out)| {
                for (local, &v) in chunk.iter().enumerate() {
                    let w = inputs.weights[v];
                    let j = inputs.joints[v];
                    let mut skinned = Vec3::ZERO;
                    for k in 0..4 {
                        if w[k] > 0.0 {
                            skinned += w[k] * (joints[j[k] as usize].normal_matrix * src[v]);
                        }
                    }
                    nrm_out[local] = skinned.normalize_or_zero();
                }
            });
    }

    if let (Some(src), Some(dst)) = (inputs.tangents, tangents.as_deref_mut()) {
        indices
            .par_chunks(BATCH_SIZE)
            .zip(dst.par_chunks_mut(BATCH_SIZE))
            .for_each(|(chunk, tan_out)| {
                for (local, &v) in chunk.iter().enumerate() {
                    let w = inputs.weights[v];
                    let j = inputs.joints[v];
                    let mut skinned = Vec3::ZERO;
                    for k in 0..4 {
                        if w[k] > 0.0 {
                            skinned += w[k] * (Mat3::from_mat4(joints[j[k] as usize].matrix) * src[v].truncate());
                        }
                    }
                    tan_out[local] = skinned.normalize_or_zero().extend(src[v].w);
                }
            });
    }

    SkinningOutputs {
        positions,
        normals,
        tangents,
    }
}

/// §4.D "Morph blending": base positions plus each non-zero-weighted
/// target's contribution. Operates in place on a caller-owned workspace
/// buffer so it can be reused frame to frame.
pub fn blend_morph_targets(base_positions: &[Vec3], targets: &[(&[Vec3], f32)], out: &mut Vec<Vec3>) {
    out.clear();
    out.extend_from_slice(base_positions);

    for &(target_positions, weight) in targets {
        if weight == 0.0 {
            continue;
        }
        out.par_chunks_mut(BATCH_SIZE)
            .enumerate()
            .for_each(|(batch_index, chunk)| {
                let start = batch_index * BATCH_SIZE;
                for (i, p) in chunk.iter_mut().enumerate() {
                    *p += weight * target_positions[start + i];
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_joint_leaves_position_unchanged() {
        let joints = vec![JointMatrix::new(Mat4::IDENTITY)];
        let inputs = SkinningInputs {
            positions: &[Vec3::new(1.0, 2.0, 3.0)],
            normals: None,
            tangents: None,
            joints: &[[0, 0, 0, 0]],
            weights: &[[1.0, 0.0, 0.0, 0.0]],
        };
        let out = skin(&inputs, &joints);
        assert_eq!(out.positions[0], Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn translated_joint_moves_the_vertex() {
        let joints = vec![JointMatrix::new(Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)))];
        let inputs = SkinningInputs {
            positions: &[Vec3::ZERO],
            normals: None,
            tangents: None,
            joints: &[[0, 0, 0, 0]],
            weights: &[[1.0, 0.0, 0.0, 0.0]],
        };
        let out = skin(&inputs, &joints);
        assert_eq!(out.positions[0], Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn ref_node_inverse_cancels_render_node_transform() {
        let ref_world = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let joint_world = Mat4::from_translation(Vec3::new(10.0, 1.0, 0.0));
        let joints = compute_joint_matrices(ref_world, &[joint_world], &[Mat4::IDENTITY]);
        // The render node itself will later multiply by `ref_world`, so the
        // skin result should only carry the +1 on Y once.
        assert_eq!(joints[0].matrix.transform_point3(Vec3::ZERO), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn morph_blend_adds_weighted_target_offsets() {
        let base = vec![Vec3::ZERO; 3];
        let target = vec![Vec3::X; 3];
        let mut out = Vec::new();
        blend_morph_targets(&base, &[(&target, 0.5)], &mut out);
        assert_eq!(out, vec![Vec3::new(0.5, 0.0, 0.0); 3]);
    }

    #[test]
    fn zero_weight_targets_are_skipped() {
        let base = vec![Vec3::ZERO; 3];
        let target = vec![Vec3::X; 3];
        let mut out = Vec::new();
        blend_morph_targets(&base, &[(&target, 0.0)], &mut out);
        assert_eq!(out, base);
    }
}
