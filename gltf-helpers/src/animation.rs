//! Sampler evaluation: grounded in the teacher's `animation.rs`
//! (`Channel<T>::sample`, `cubic_spline_interpolate`), generalized from
//! `gltf::animation::Interpolation`/`gltf::iter::Animations` to
//! `asset_io::model::{Interpolation, Animation, AnimationChannel}`, and
//! extended with weights channels and `KHR_animation_pointer` channels (3,
//! §4.C) which the teacher's subset never needed.

use crate::{DepthFirstNodes, Similarity};
use asset_io::model::{self, AnimationPath, Interpolation};
use glam::{Quat, Vec3};
use std::fmt;
use std::ops::{Add, Mul};

/// A sampled `KHR_animation_pointer` value, handed to the caller (the scene
/// model's shadow-JSON store) rather than written anywhere here: gltf-helpers
/// stays agnostic of how pointer paths map onto JSON.
#[derive(Debug, Clone)]
pub struct PointerSample {
    pub pointer: String,
    pub values: Vec<f32>,
}

pub fn read_animations(model: &model::Model) -> Vec<Animation> {
    model
        .animations
        .iter()
        .map(|anim| {
            let mut translation_channels = Vec::new();
            let mut rotation_channels = Vec::new();
            let mut scale_channels = Vec::new();
            let mut weights_channels = Vec::new();
            let mut pointer_channels = Vec::new();

            for channel in &anim.channels {
                let sampler = &anim.samplers[channel.sampler];
                let inputs: Vec<f32> = read_scalar_accessor(model, sampler.input);

                match channel.path {
                    AnimationPath::Translation => {
                        let Some(node_index) = channel.target_node else { continue };
                        let outputs = read_vec3_accessor(model, sampler.output);
                        translation_channels.push(Channel {
                            interpolation: sampler.interpolation,
                            inputs,
                            outputs,
                            node_index,
                        });
                    }
                    AnimationPath::Rotation => {
                        let Some(node_index) = channel.target_node else { continue };
                        let outputs = read_quat_accessor(model, sampler.output);
                        rotation_channels.push(Channel {
                            interpolation: sampler.interpolation,
                            inputs,
                            outputs,
                            node_index,
                        });
                    }
                    AnimationPath::Scale => {
                        let Some(node_index) = channel.target_node else { continue };
                        let outputs = read_vec3_accessor(model, sampler.output)
                            .into_iter()
                            .map(|v| v.x.max(v.y).max(v.z))
                            .collect();
                        scale_channels.push(Channel {
                            interpolation: sampler.interpolation,
                            inputs,
                            outputs,
                            node_index,
                        });
                    }
                    AnimationPath::Weights => {
                        let Some(node_index) = channel.target_node else { continue };
                        let flat = read_scalar_accessor(model, sampler.output);
                        let frame_width = model
                            .nodes
                            .get(node_index)
                            .and_then(|n| n.mesh)
                            .and_then(|m| model.meshes.get(m))
                            .map(|m| m.weights.len().max(1))
                            .unwrap_or(1);
                        let outputs = flat.chunks(frame_width.max(1)).map(|c| c.to_vec()).collect();
                        weights_channels.push(Channel {
                            interpolation: sampler.interpolation,
                            inputs,
                            outputs,
                            node_index,
                        });
                    }
                    AnimationPath::Pointer => {
                        let Some(pointer) = channel.pointer.clone() else { continue };
                        let flat = read_scalar_accessor(model, sampler.output);
                        let component_count = if inputs.is_empty() {
                            flat.len()
                        } else {
                            let divisor = if matches!(sampler.interpolation, Interpolation::CubicSpline) {
                                inputs.len() * 3
                            } else {
                                inputs.len()
                            };
                            if divisor == 0 { flat.len() } else { flat.len() / divisor }
                        };
                        pointer_channels.push(PointerChannel {
                            interpolation: sampler.interpolation,
                            inputs,
                            outputs: flat
                                .chunks(component_count.max(1))
                                .map(|c| c.to_vec())
                                .collect(),
                            pointer,
                        });
                    }
                }
            }

            let total_time = translation_channels
                .iter()
                .map(|c: &Channel<Vec3>| c.last_input())
                .chain(rotation_channels.iter().map(|c: &Channel<Quat>| c.last_input()))
                .chain(scale_channels.iter().map(|c: &Channel<f32>| c.last_input()))
                .chain(weights_channels.iter().map(|c: &Channel<Vec<f32>>| c.last_input()))
                .chain(pointer_channels.iter().map(|c| c.last_input()))
                .max_by_key(|&t| ordered_float::OrderedFloat(t))
                .unwrap_or(0.0);

            Animation {
                total_time,
                translation_channels,
                rotation_channels,
                scale_channels,
                weights_channels,
                pointer_channels,
            }
        })
        .collect()
}

fn read_scalar_accessor(model: &model::Model, accessor_index: usize) -> Vec<f32> {
    asset_io::accessor::read_f32(model, accessor_index).unwrap_or_default()
}

fn read_vec3_accessor(model: &model::Model, accessor_index: usize) -> Vec<Vec3> {
    asset_io::accessor::read_f32x3(model, accessor_index).unwrap_or_default()
}

fn read_quat_accessor(model: &model::Model, accessor_index: usize) -> Vec<Quat> {
    asset_io::accessor::read_f32x4(model, accessor_index)
        .unwrap_or_default()
        .into_iter()
        .map(|v| Quat::from_xyzw(v.x, v.y, v.z, v.w))
        .collect()
}

#[derive(Clone, Debug)]
pub struct AnimationJoints {
    global_transforms: Vec<Similarity>,
    local_transforms: Vec<Similarity>,
}

impl AnimationJoints {
    pub fn new(model: &model::Model, depth_first_nodes: &DepthFirstNodes) -> Self {
        let node_transforms: Vec<_> = model.nodes.iter().map(Similarity::new_from_node).collect();

        let mut joints = Self {
            global_transforms: node_transforms.clone(),
            local_transforms: node_transforms,
        };

        joints.update(depth_first_nodes);

        joints
    }

    pub fn iter<'a>(
        &'a mut self,
        joint_indices_to_node_indices: &'a [usize],
        inverse_bind_transforms: &'a [Similarity],
        depth_first_nodes: &DepthFirstNodes,
    ) -> impl Iterator<Item = Similarity> + 'a {
        self.update(depth_first_nodes);

        joint_indices_to_node_indices
            .iter()
            .enumerate()
            .map(move |(joint_index, &node_index)| {
                self.global_transforms[node_index] * inverse_bind_transforms[joint_index]
            })
    }

    pub fn update(&mut self, depth_first_nodes: &DepthFirstNodes) {
        for &index in &depth_first_nodes.roots {
            self.global_transforms[index] = self.local_transforms[index];
        }

        for child in &depth_first_nodes.children {
            let parent_transform = self.global_transforms[child.parent];
            self.global_transforms[child.index] = parent_transform * self.local_transforms[child.index];
        }
    }

    pub fn global_transform(&self, node_index: usize) -> Similarity {
        self.global_transforms[node_index]
    }

    /// The node's own local transform, as last written by `Animation::animate`
    /// (or the value it was constructed with). Callers that keep their own
    /// copy of the scene graph (e.g. the scene model) write this back into
    /// their node's transform rather than relying on `global_transform`,
    /// which would double-apply ancestor transforms already tracked there.
    pub fn local_transform(&self, node_index: usize) -> Similarity {
        self.local_transforms[node_index]
    }

    pub fn get_joint_mut(&mut self, index: usize, joint_indices_to_node_indices: &[usize]) -> &mut Similarity {
        &mut self.local_transforms[joint_indices_to_node_indices[index]]
    }
}

struct Channel<T> {
    interpolation: Interpolation,
    inputs: Vec<f32>,
    outputs: Vec<T>,
    node_index: usize,
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("interpolation", &self.interpolation)
            .field("num_values", &self.inputs.len())
            .field("node_index", &self.node_index)
            .finish()
    }
}

impl<T> Channel<T> {
    fn last_input(&self) -> f32 {
        self.inputs.last().copied().unwrap_or(0.0)
    }
}

struct PointerChannel {
    interpolation: Interpolation,
    inputs: Vec<f32>,
    outputs: Vec<Vec<f32>>,
    pointer: String,
}

impl PointerChannel {
    fn last_input(&self) -> f32 {
        self.inputs.last().copied().unwrap_or(0.0)
    }

    fn sample(&self, t: f32) -> Option<PointerSample> {
        let (i, factor, delta) = locate(&self.inputs, t)?;
        let values = match self.interpolation {
            Interpolation::Step => self.outputs[i].clone(),
            Interpolation::Linear => {
                let a = &self.outputs[i];
                let b = &self.outputs[i + 1];
                a.iter().zip(b).map(|(x, y)| x + (y - x) * factor).collect()
            }
            Interpolation::CubicSpline => {
                let width = self.outputs[i * 3 + 1].len();
                (0..width)
                    .map(|c| {
                        cubic_spline_interpolate(
                            self.outputs[i * 3 + 1][c],
                            self.outputs[i * 3 + 2][c],
                            self.outputs[i * 3 + 4][c],
                            self.outputs[i * 3 + 3][c],
                            delta,
                            factor,
                        )
                    })
                    .collect()
            }
        };
        Some(PointerSample {
            pointer: self.pointer.clone(),
            values,
        })
    }
}

fn locate(inputs: &[f32], t: f32) -> Option<(usize, f32, f32)> {
    if inputs.is_empty() || t < inputs[0] || t > *inputs.last().unwrap() {
        return None;
    }
    let index = inputs.binary_search_by_key(&ordered_float::OrderedFloat(t), |v| ordered_float::OrderedFloat(*v));
    let i = match index {
        Ok(exact) => exact.min(inputs.len() - 2).max(0),
        Err(insert_at) => insert_at.saturating_sub(1),
    };
    let previous_time = inputs[i];
    let next_time = *inputs.get(i + 1)?;
    let delta = next_time - previous_time;
    let factor = if delta > 0.0 { (t - previous_time) / delta } else { 0.0 };
    Some((i, factor, delta))
}

impl<T: Interpolate> Channel<T> {
    fn sample(&self, t: f32) -> Option<(usize, T)> {
        let (i, factor, delta) = locate(&self.inputs, t)?;

        let value = match self.interpolation {
            Interpolation::Step => self.outputs[i].clone(),
            Interpolation::Linear => {
                let previous_value = self.outputs[i].clone();
                let next_value = self.outputs[i + 1].clone();
                previous_value.linear(next_value, factor)
            }
            Interpolation::CubicSpline => {
                let starting_point = self.outputs[i * 3 + 1].clone();
                let starting_out_tangent = self.outputs[i * 3 + 2].clone();
                let ending_in_tangent = self.outputs[i * 3 + 3].clone();
                let ending_point = self.outputs[i * 3 + 4].clone();

                Interpolate::cubic_spline(
                    starting_point,
                    starting_out_tangent,
                    ending_point,
                    ending_in_tangent,
                    delta,
                    factor,
                )
            }
        };

        Some((self.node_index, value))
    }
}

#[derive(Debug)]
pub struct Animation {
    total_time: f32,
    translation_channels: Vec<Channel<Vec3>>,
    rotation_channels: Vec<Channel<Quat>>,
    scale_channels: Vec<Channel<f32>>,
    weights_channels: Vec<Channel<Vec<f32>>>,
    pointer_channels: Vec<PointerChannel>,
}

impl Animation {
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Node indices driven by translation/rotation/scale channels, i.e. the
    /// nodes a caller should fold into its world-matrix dirty set after
    /// calling `animate`. Weights and pointer updates are reported separately
    /// by `animate`'s return value.
    pub fn transform_node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.translation_channels
            .iter()
            .map(|c| c.node_index)
            .chain(self.rotation_channels.iter().map(|c| c.node_index))
            .chain(self.scale_channels.iter().map(|c| c.node_index))
    }

    /// Applies translation/rotation/scale channels to the joint local
    /// transforms and returns per-node weight updates plus sampled pointer
    /// values for the caller's shadow-JSON store to apply.
    pub fn animate(
        &self,
        animation_joints: &mut AnimationJoints,
        time: f32,
    ) -> (Vec<(usize, Vec<f32>)>, Vec<PointerSample>) {
        self.translation_channels
            .iter()
            .filter_map(move |channel| channel.sample(time))
            .for_each(|(node_index, translation)| {
                animation_joints.local_transforms[node_index].translation = translation;
            });

        self.rotation_channels
            .iter()
            .filter_map(move |channel| channel.sample(time))
            .for_each(|(node_index, rotation)| {
                animation_joints.local_transforms[node_index].rotation = rotation;
            });

        self.scale_channels
            .iter()
            .filter_map(move |channel| channel.sample(time))
            .for_each(|(node_index, scale)| {
                animation_joints.local_transforms[node_index].scale = scale;
            });

        let weights = self
            .weights_channels
            .iter()
            .filter_map(|channel| channel.sample(time))
            .collect();

        let pointers = self
            .pointer_channels
            .iter()
            .filter_map(|channel| channel.sample(time))
            .collect();

        (weights, pointers)
    }
}

trait Interpolate: Clone {
    fn linear(self, other: Self, t: f32) -> Self;

    fn cubic_spline(
        starting_point: Self,
        starting_out_tangent: Self,
        ending_in_point: Self,
        ending_out_tangent: Self,
        time_between_keyframes: f32,
        t: f32,
    ) -> Self;
}

impl Interpolate for Vec3 {
    fn linear(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }

    fn cubic_spline(
        starting_point: Self,
        starting_out_tangent: Self,
        ending_in_point: Self,
        ending_out_tangent: Self,
        time_between_keyframes: f32,
        t: f32,
    ) -> Self {
        cubic_spline_interpolate(
            starting_point,
            starting_out_tangent,
            ending_in_point,
            ending_out_tangent,
            time_between_keyframes,
            t,
        )
    }
}

impl Interpolate for Quat {
    fn linear(self, other: Self, t: f32) -> Self {
        self.slerp(other, t)
    }

    fn cubic_spline(
        starting_point: Self,
        starting_out_tangent: Self,
        ending_in_point: Self,
        ending_out_tangent: Self,
        time_between_keyframes: f32,
        t: f32,
    ) -> Self {
        cubic_spline_interpolate(
            starting_point,
            starting_out_tangent,
            ending_in_point,
            ending_out_tangent,
            time_between_keyframes,
            t,
        )
        .normalize()
    }
}

impl Interpolate for f32 {
    fn linear(self, other: Self, t: f32) -> Self {
        self * (1.0 - t) + other * t
    }

    fn cubic_spline(
        starting_point: Self,
        starting_out_tangent: Self,
        ending_in_point: Self,
        ending_out_tangent: Self,
        time_between_keyframes: f32,
        t: f32,
    ) -> Self {
        cubic_spline_interpolate(
            starting_point,
            starting_out_tangent,
            ending_in_point,
            ending_out_tangent,
            time_between_keyframes,
            t,
        )
    }
}

impl Interpolate for Vec<f32> {
    fn linear(self, other: Self, t: f32) -> Self {
        self.iter().zip(&other).map(|(a, b)| a * (1.0 - t) + b * t).collect()
    }

    fn cubic_spline(
        starting_point: Self,
        starting_out_tangent: Self,
        ending_in_point: Self,
        ending_out_tangent: Self,
        time_between_keyframes: f32,
        t: f32,
    ) -> Self {
        (0..starting_point.len())
            .map(|i| {
                cubic_spline_interpolate(
                    starting_point[i],
                    starting_out_tangent[i],
                    ending_in_point[i],
                    ending_out_tangent[i],
                    time_between_keyframes,
                    t,
                )
            })
            .collect()
    }
}

/// https://github.com/KhronosGroup/glTF/tree/master/specification/2.0#appendix-c-spline-interpolation
fn cubic_spline_interpolate<T>(
    starting_point: T,
    starting_out_tangent: T,
    ending_point: T,
    ending_in_tangent: T,
    time_between_keyframes: f32,
    t: f32,
) -> T
where
    T: Add<T, Output = T> + Mul<f32, Output = T> + Copy,
{
    let p0 = starting_point;
    let m0 = starting_out_tangent * time_between_keyframes;
    let p1 = ending_point;
    let m1 = ending_in_tangent * time_between_keyframes;

    let t2 = t * t;
    let t3 = t * t * t;

    p0 * (2.0 * t3 - 3.0 * t2 + 1.0) + m0 * (t3 - 2.0 * t2 + t) + p1 * (-2.0 * t3 + 3.0 * t2) + m1 * (t3 - t2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_spline_endpoints_match_control_points() {
        let p0 = Vec3::new(0.0, 0.0, 0.0);
        let p1 = Vec3::new(1.0, 2.0, 3.0);
        let start = cubic_spline_interpolate(p0, Vec3::ZERO, p1, Vec3::ZERO, 1.0, 0.0);
        let end = cubic_spline_interpolate(p0, Vec3::ZERO, p1, Vec3::ZERO, 1.0, 1.0);
        assert!(start.abs_diff_eq(p0, 1e-6));
        assert!(end.abs_diff_eq(p1, 1e-6));
    }

    #[test]
    fn linear_f32_interpolates_midpoint() {
        assert_eq!(Interpolate::linear(0.0f32, 10.0, 0.5), 5.0);
    }
}
