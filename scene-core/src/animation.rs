//! §4.C Animation Engine: wraps `gltf_helpers::animation` with the pieces
//! that stay agnostic there — current-time advancement, writing sampled T/R/S
//! values back onto `model.nodes`, and resolving `KHR_animation_pointer`
//! writes against the live model.
//!
//! The pointer grammar only needs to distinguish which top-level collection a
//! path targets (materials, lights, cameras, nodes); everything after that is
//! kept as an opaque "field path" string and matched against the handful of
//! properties glTF actually allows animating. A real JSON-pointer shadow
//! document would need array/object bookkeeping this crate has no other use
//! for, so the shadow store here is a flat map keyed by the pointer string
//! itself rather than a nested `serde_json::Value` tree (see DESIGN.md).

use std::collections::{HashMap, HashSet};

use asset_io::model::{Camera, CameraProjection, Light, Material, Model, NodeTransform};
use glam::{Vec3, Vec4};
use gltf_helpers::animation::{read_animations, Animation, AnimationJoints, PointerSample};
use gltf_helpers::DepthFirstNodes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Material,
    Light,
    Camera,
    Node,
}

struct ShadowEntry {
    kind: ResourceKind,
    index: usize,
    field: String,
    values: Vec<f32>,
}

/// Node/material/light/camera indices touched by the most recent
/// `update_animation` + `sync_to_model` pair, for the caller's GPU mirror to
/// decide between a surgical patch and a full table rebuild.
#[derive(Debug, Clone, Default)]
pub struct DirtyResources {
    pub nodes: HashSet<usize>,
    pub materials: HashSet<usize>,
    pub lights: HashSet<usize>,
    pub cameras: HashSet<usize>,
}

pub struct AnimationEngine {
    animations: Vec<Animation>,
    joints: AnimationJoints,
    current_animation: Option<usize>,
    current_time: f32,
    speed: f32,
    shadow: HashMap<String, ShadowEntry>,
    unresolved_pointers: HashSet<String>,
    pending_transform_nodes: HashSet<usize>,
    pending_pointers: Vec<PointerSample>,
}

impl AnimationEngine {
    pub fn new(model: &Model, depth_first_nodes: &DepthFirstNodes) -> Self {
        Self {
            animations: read_animations(model),
            joints: AnimationJoints::new(model, depth_first_nodes),
            current_animation: None,
            current_time: 0.0,
            speed: 1.0,
            shadow: HashMap::new(),
            unresolved_pointers: HashSet::new(),
            pending_transform_nodes: HashSet::new(),
            pending_pointers: Vec::new(),
        }
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn set_current_animation(&mut self, index: Option<usize>) {
        self.current_animation = index;
        self.current_time = 0.0;
    }

    pub fn current_animation(&self) -> Option<usize> {
        self.current_animation
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Advances current-time by `delta_time * speed`, looping into
    /// `[0, total_time)`, samples the active animation's channels, and writes
    /// translation/rotation/scale straight onto `model.nodes` and weights
    /// onto `model.meshes[..].weights`. Pointer channel samples are staged;
    /// call `sync_to_model` to resolve and apply them against live resources.
    /// Returns the node indices a caller should fold into its world-matrix
    /// dirty set.
    pub fn update_animation(&mut self, model: &mut Model, delta_time: f32) -> HashSet<usize> {
        let Some(index) = self.current_animation else {
            return HashSet::new();
        };
        let Some(animation) = self.animations.get(index) else {
            return HashSet::new();
        };

        let end = animation.total_time().max(f32::EPSILON);
        self.current_time = (self.current_time + delta_time * self.speed).rem_euclid(end);

        let (weight_updates, pointer_samples) = animation.animate(&mut self.joints, self.current_time);

        let mut dirty_nodes = HashSet::new();
        for node_index in animation.transform_node_indices() {
            if let Some(node) = model.nodes.get_mut(node_index) {
                let local = self.joints.local_transform(node_index);
                node.transform = NodeTransform::Trs {
                    translation: local.translation.to_array(),
                    rotation: local.rotation.to_array(),
                    scale: [local.scale; 3],
                };
            }
            dirty_nodes.insert(node_index);
        }

        for (node_index, weights) in weight_updates {
            if let Some(mesh_index) = model.nodes.get(node_index).and_then(|n| n.mesh) {
                if let Some(mesh) = model.meshes.get_mut(mesh_index) {
                    mesh.weights = weights;
                }
            }
            dirty_nodes.insert(node_index);
        }

        self.pending_pointers.extend(pointer_samples);
        self.pending_transform_nodes
            .extend(dirty_nodes.iter().copied());

        dirty_nodes
    }

    /// Resolves every pointer sample staged since the last call against the
    /// live model and returns the set of resources a caller's GPU mirror
    /// needs to refresh. Node writes staged by `update_animation` are folded
    /// into the returned set too, so callers only need to consult the return
    /// value of whichever of the two methods they call last.
    pub fn sync_to_model(&mut self, model: &mut Model) -> DirtyResources {
        for sample in self.pending_pointers.drain(..) {
            apply_pointer_sample(&mut self.shadow, &mut self.unresolved_pointers, sample);
        }

        let mut dirty = DirtyResources::default();
        dirty.nodes.extend(self.pending_transform_nodes.drain());

        let mut by_resource: HashMap<(ResourceKind, usize), Vec<&ShadowEntry>> = HashMap::new();
        for entry in self.shadow.values() {
            by_resource.entry((entry.kind, entry.index)).or_default().push(entry);
        }

        for ((kind, index), entries) in by_resource {
            match kind {
                ResourceKind::Material => {
                    if let Some(material) = model.materials.get_mut(index) {
                        for entry in entries {
                            apply_material_field(material, &entry.field, &entry.values);
                        }
                        dirty.materials.insert(index);
                    }
                }
                ResourceKind::Light => {
                    if let Some(light) = model.lights.get_mut(index) {
                        for entry in entries {
                            apply_light_field(light, &entry.field, &entry.values);
                        }
                        dirty.lights.insert(index);
                    }
                }
                ResourceKind::Camera => {
                    if let Some(camera) = model.cameras.get_mut(index) {
                        for entry in entries {
                            apply_camera_field(camera, &entry.field, &entry.values);
                        }
                        dirty.cameras.insert(index);
                    }
                }
                ResourceKind::Node => {
                    if let Some(node) = model.nodes.get_mut(index) {
                        for entry in entries {
                            apply_node_field(node, &entry.field, &entry.values);
                        }
                        dirty.nodes.insert(index);
                    }
                }
            }
        }

        dirty
    }
}

fn apply_pointer_sample(
    shadow: &mut HashMap<String, ShadowEntry>,
    unresolved: &mut HashSet<String>,
    sample: PointerSample,
) {
    if let Some(entry) = shadow.get_mut(&sample.pointer) {
        entry.values = sample.values;
        return;
    }

    match parse_pointer(&sample.pointer) {
        Some((kind, index, field)) => {
            shadow.insert(
                sample.pointer.clone(),
                ShadowEntry {
                    kind,
                    index,
                    field,
                    values: sample.values,
                },
            );
        }
        None => {
            if unresolved.insert(sample.pointer.clone()) {
                log::warn!(
                    "animation pointer {:?} does not resolve to a known resource, dropping",
                    sample.pointer
                );
            }
        }
    }
}

/// `/materials/N/...`, `/extensions/KHR_lights_punctual/lights/N/...`,
/// `/cameras/N/...`, `/nodes/N/...`. Anything else is unresolved.
fn parse_pointer(pointer: &str) -> Option<(ResourceKind, usize, String)> {
    let parts: Vec<&str> = pointer.trim_start_matches('/').split('/').collect();
    match parts.as_slice() {
        ["materials", idx, rest @ ..] => Some((ResourceKind::Material, idx.parse().ok()?, rest.join("/"))),
        ["nodes", idx, rest @ ..] => Some((ResourceKind::Node, idx.parse().ok()?, rest.join("/"))),
        ["cameras", idx, rest @ ..] => Some((ResourceKind::Camera, idx.parse().ok()?, rest.join("/"))),
        ["extensions", "KHR_lights_punctual", "lights", idx, rest @ ..] => {
            Some((ResourceKind::Light, idx.parse().ok()?, rest.join("/")))
        }
        _ => None,
    }
}

fn apply_material_field(material: &mut Material, field: &str, values: &[f32]) {
    match field {
        "pbrMetallicRoughness/baseColorFactor" => material.base_color_factor = Vec4::from_slice(values),
        "pbrMetallicRoughness/metallicFactor" => material.metallic_factor = values[0],
        "pbrMetallicRoughness/roughnessFactor" => material.roughness_factor = values[0],
        "emissiveFactor" => material.emissive_factor = Vec3::from_slice(values),
        "alphaCutoff" => material.alpha_cutoff = values[0],
        "normalTexture/scale" => {
            if let Some(texture) = &mut material.normal_texture {
                texture.scale = values[0];
            }
        }
        "occlusionTexture/strength" => {
            if let Some(texture) = &mut material.occlusion_texture {
                texture.strength = values[0];
            }
        }
        "extensions/KHR_materials_emissive_strength/emissiveStrength" => {
            material.emissive_strength.emissive_strength = values[0];
        }
        "extensions/KHR_materials_ior/ior" => material.ior = values[0],
        "extensions/KHR_materials_transmission/transmissionFactor" => material.transmission.factor = values[0],
        "extensions/KHR_materials_volume/thicknessFactor" => material.volume.thickness_factor = values[0],
        "extensions/KHR_materials_volume/attenuationColor" => {
            material.volume.attenuation_color = Vec3::from_slice(values);
        }
        "extensions/KHR_materials_volume/attenuationDistance" => {
            material.volume.attenuation_distance = values[0];
        }
        "extensions/KHR_materials_sheen/sheenColorFactor" => material.sheen.color_factor = Vec3::from_slice(values),
        "extensions/KHR_materials_sheen/sheenRoughnessFactor" => material.sheen.roughness_factor = values[0],
        "extensions/KHR_materials_clearcoat/clearcoatFactor" => material.clearcoat.factor = values[0],
        "extensions/KHR_materials_clearcoat/clearcoatRoughnessFactor" => {
            material.clearcoat.roughness_factor = values[0];
        }
        "extensions/KHR_materials_specular/specularFactor" => material.specular.factor = values[0],
        "extensions/KHR_materials_specular/specularColorFactor" => {
            material.specular.color_factor = Vec3::from_slice(values);
        }
        "extensions/KHR_materials_iridescence/iridescenceFactor" => material.iridescence.factor = values[0],
        "extensions/KHR_materials_dispersion/dispersion" => material.dispersion.dispersion = values[0],
        _ => log::warn!("unhandled material animation pointer field {field:?}"),
    }
}

fn apply_light_field(light: &mut Light, field: &str, values: &[f32]) {
    match field {
        "color" => light.color = Vec3::from_slice(values),
        "intensity" => light.intensity = values[0],
        "range" => light.range = Some(values[0]),
        "spot/innerConeAngle" => light.inner_cone_angle = values[0],
        "spot/outerConeAngle" => light.outer_cone_angle = values[0],
        _ => log::warn!("unhandled light animation pointer field {field:?}"),
    }
}

fn apply_camera_field(camera: &mut Camera, field: &str, values: &[f32]) {
    match field {
        "perspective/yfov" => {
            if let CameraProjection::Perspective { yfov, .. } = &mut camera.projection {
                *yfov = values[0];
            }
        }
        "perspective/aspectRatio" => {
            if let CameraProjection::Perspective { aspect, .. } = &mut camera.projection {
                *aspect = Some(values[0]);
            }
        }
        "orthographic/xmag" => {
            if let CameraProjection::Orthographic { xmag, .. } = &mut camera.projection {
                *xmag = values[0];
            }
        }
        "orthographic/ymag" => {
            if let CameraProjection::Orthographic { ymag, .. } = &mut camera.projection {
                *ymag = values[0];
            }
        }
        "znear" => camera.znear = values[0],
        "zfar" => camera.zfar = Some(values[0]),
        _ => log::warn!("unhandled camera animation pointer field {field:?}"),
    }
}

fn apply_node_field(node: &mut asset_io::model::Node, field: &str, values: &[f32]) {
    match field {
        "translation" => {
            if let NodeTransform::Trs { translation, .. } = &mut node.transform {
                *translation = [values[0], values[1], values[2]];
            }
        }
        "rotation" => {
            if let NodeTransform::Trs { rotation, .. } = &mut node.transform {
                *rotation = [values[0], values[1], values[2], values[3]];
            }
        }
        "scale" => {
            if let NodeTransform::Trs { scale, .. } = &mut node.transform {
                *scale = [values[0], values[1], values[2]];
            }
        }
        "extensions/KHR_node_visibility/visible" => {
            node.visible = values[0] != 0.0;
        }
        _ => log::warn!("unhandled node animation pointer field {field:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_pointer_shapes() {
        assert_eq!(
            parse_pointer("/materials/2/pbrMetallicRoughness/baseColorFactor"),
            Some((
                ResourceKind::Material,
                2,
                "pbrMetallicRoughness/baseColorFactor".to_string()
            ))
        );
        assert_eq!(
            parse_pointer("/extensions/KHR_lights_punctual/lights/0/intensity"),
            Some((ResourceKind::Light, 0, "intensity".to_string()))
        );
        assert_eq!(
            parse_pointer("/cameras/1/perspective/yfov"),
            Some((ResourceKind::Camera, 1, "perspective/yfov".to_string()))
        );
        assert_eq!(
            parse_pointer("/nodes/4/translation"),
            Some((ResourceKind::Node, 4, "translation".to_string()))
        );
        assert_eq!(parse_pointer("/scenes/0/nodes"), None);
    }

    #[test]
    fn material_field_updates_apply_to_the_right_struct() {
        let mut material = Material::default();
        apply_material_field(&mut material, "pbrMetallicRoughness/metallicFactor", &[0.25]);
        assert_eq!(material.metallic_factor, 0.25);
        apply_material_field(&mut material, "emissiveFactor", &[1.0, 0.5, 0.0]);
        assert_eq!(material.emissive_factor, Vec3::new(1.0, 0.5, 0.0));
    }
}
