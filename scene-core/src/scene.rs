//! §4.B Scene Model: render-graph build, GPU-instancing expansion, camera
//! discovery, scene bounds, variant switching, tangent generation, and
//! partial world-matrix update.
//!
//! Render Primitives live in a flat arena keyed by integer index
//! (Design Note §9); the back-reference to the source mesh/primitive pair is
//! `SourcePrimitiveRef { mesh_index, primitive_index }` rather than a raw
//! pointer into the parsed model.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use asset_io::accessor::{read_f32x3, read_f32x4};
use asset_io::model::{AlphaMode, Model, Node};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::error::{CoreError, Result};

/// Back-reference to the (mesh, primitive) pair a Render Primitive was
/// deduplicated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePrimitiveRef {
    pub mesh_index: usize,
    pub primitive_index: usize,
}

#[derive(Debug, Clone)]
pub struct RenderPrimitive {
    pub source: SourcePrimitiveRef,
    /// Filled in by `generate_missing_tangents` the first time a node using
    /// this primitive needs a normal-mapped tangent basis the source
    /// primitive doesn't carry.
    pub generated_tangents: Option<Vec<Vec4>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DedupKey {
    position: Option<usize>,
    normal: Option<usize>,
    tangent: Option<usize>,
    texcoord_0: Option<usize>,
    texcoord_1: Option<usize>,
    color_0: Option<usize>,
    joints_0: Option<usize>,
    weights_0: Option<usize>,
    indices: Option<usize>,
    material: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderNode {
    pub world_matrix: Mat4,
    pub material_id: usize,
    pub render_prim_id: usize,
    pub ref_node_id: usize,
    pub skin_id: Option<usize>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderLight {
    pub world_matrix: Mat4,
    pub light_index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderCamera {
    pub node_index: usize,
    pub camera_index: usize,
    pub world_matrix: Mat4,
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadedKind {
    OpaqueSingleSided,
    OpaqueDoubleSided,
    Blended,
    All,
}

/// Owns the parsed model plus the render graph derived from it. Mutating
/// operations (variant switches, animation, visibility toggles) keep the
/// lookup tables in §4.B item 10 up to date rather than rebuilding the whole
/// graph, except where the spec calls for a full rebuild (scene switch,
/// topology change).
pub struct Scene {
    model: Model,
    current_scene: usize,
    current_variant: Option<usize>,
    scene_camera_node: Option<usize>,
    full_update_ratio: f32,

    render_primitives: Vec<RenderPrimitive>,
    render_prim_lookup: HashMap<DedupKey, usize>,
    render_nodes: Vec<RenderNode>,
    render_lights: Vec<RenderLight>,

    node_to_render_nodes: Vec<Vec<usize>>,
    node_parents: Vec<Option<usize>>,
    nodes_local_matrices: Vec<Mat4>,
    nodes_world_matrices: Vec<Mat4>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let model = asset_io::load_and_prepare(path)?;
        Self::from_model(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::save::save(&self.model, path)
    }

    pub fn take_model(self) -> Model {
        self.model
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn from_model(mut model: Model) -> Result<Self> {
        assign_default_names(&mut model);
        if model.materials.is_empty() {
            model.materials.push(asset_io::model::Material::default());
        }

        let current_scene = model.default_scene.unwrap_or(0);

        let mut scene = Self {
            node_to_render_nodes: vec![Vec::new(); model.nodes.len()],
            node_parents: vec![None; model.nodes.len()],
            nodes_local_matrices: vec![Mat4::IDENTITY; model.nodes.len()],
            nodes_world_matrices: vec![Mat4::IDENTITY; model.nodes.len()],
            model,
            current_scene,
            current_variant: None,
            scene_camera_node: None,
            full_update_ratio: 0.5,
            render_primitives: Vec::new(),
            render_prim_lookup: HashMap::new(),
            render_nodes: Vec::new(),
            render_lights: Vec::new(),
        };

        scene.parse_scene()?;
        scene.discover_or_synthesize_camera();
        scene.generate_missing_tangents()?;
        Ok(scene)
    }

    pub fn set_full_update_ratio(&mut self, ratio: f32) {
        self.full_update_ratio = ratio;
    }

    /// §4.B item 3 (`setCurrentScene`): rebuilds the whole render graph from
    /// the given scene's root nodes.
    pub fn set_current_scene(&mut self, scene_index: usize) -> Result<()> {
        if scene_index >= self.model.scenes.len() {
            return Err(CoreError::DanglingNodeReference { node: scene_index });
        }
        self.current_scene = scene_index;
        self.parse_scene()?;
        self.discover_or_synthesize_camera();
        self.generate_missing_tangents()?;
        Ok(())
    }

    fn parse_scene(&mut self) -> Result<()> {
        self.render_nodes.clear();
        self.render_lights.clear();
        for slot in &mut self.node_to_render_nodes {
            slot.clear();
        }
        for p in &mut self.node_parents {
            *p = None;
        }
        self.nodes_local_matrices.fill(Mat4::IDENTITY);
        self.nodes_world_matrices.fill(Mat4::IDENTITY);

        let roots = self.model.scenes[self.current_scene].nodes.clone();
        // (node, parent world matrix, parent effective visibility)
        let mut stack: Vec<(usize, Mat4, bool)> =
            roots.iter().rev().map(|&n| (n, Mat4::IDENTITY, true)).collect();

        while let Some((node_index, parent_world, parent_visible)) = stack.pop() {
            let local = self.model.nodes[node_index].local_matrix();
            let world = parent_world * local;
            self.nodes_local_matrices[node_index] = local;
            self.nodes_world_matrices[node_index] = world;

            let node = self.model.nodes[node_index].clone();
            let effective_visible = parent_visible && node.visible;

            if let Some(light_index) = node.light {
                self.render_lights.push(RenderLight {
                    world_matrix: world,
                    light_index,
                });
            }

            if let Some(mesh_index) = node.mesh {
                self.emit_render_nodes_for_mesh(node_index, mesh_index, world, effective_visible)?;
            }

            for &child in node.children.iter().rev() {
                self.node_parents[child] = Some(node_index);
                stack.push((child, world, effective_visible));
            }
        }

        Ok(())
    }

    fn emit_render_nodes_for_mesh(
        &mut self,
        node_index: usize,
        mesh_index: usize,
        world: Mat4,
        effective_visible: bool,
    ) -> Result<()> {
        let skin_id = self.model.nodes[node_index].skin;
        let instancing = self.model.nodes[node_index].gpu_instancing.clone();
        let primitive_count = self.model.meshes[mesh_index].primitives.len();

        for primitive_index in 0..primitive_count {
            let render_prim_id = self.render_primitive_for(mesh_index, primitive_index);
            let material_id = self.resolve_material_index(mesh_index, primitive_index);

            if let Some(instancing) = &instancing {
                // §4.B item 4: EXT_mesh_gpu_instancing expansion.
                let translations = instancing
                    .translation
                    .map(|a| read_f32x3(&self.model, a))
                    .transpose()?;
                let rotations = instancing.rotation.map(|a| read_f32x4(&self.model, a)).transpose()?;
                let scales = instancing.scale.map(|a| read_f32x3(&self.model, a)).transpose()?;

                let instance_count = [
                    translations.as_ref().map(Vec::len),
                    rotations.as_ref().map(Vec::len),
                    scales.as_ref().map(Vec::len),
                ]
                .into_iter()
                .flatten()
                .max()
                .unwrap_or(0);

                for i in 0..instance_count {
                    let t = translations.as_ref().and_then(|v| v.get(i)).copied().unwrap_or(Vec3::ZERO);
                    let r = rotations
                        .as_ref()
                        .and_then(|v| v.get(i))
                        .map(|q| Quat::from_xyzw(q.x, q.y, q.z, q.w))
                        .unwrap_or(Quat::IDENTITY);
                    let s = scales.as_ref().and_then(|v| v.get(i)).copied().unwrap_or(Vec3::ONE);
                    let instance_world = world * Mat4::from_scale_rotation_translation(s, r, t);

                    let render_node_id = self.render_nodes.len();
                    self.render_nodes.push(RenderNode {
                        world_matrix: instance_world,
                        material_id,
                        render_prim_id,
                        ref_node_id: node_index,
                        skin_id,
                        visible: effective_visible,
                    });
                    self.node_to_render_nodes[node_index].push(render_node_id);
                }
            } else {
                let render_node_id = self.render_nodes.len();
                self.render_nodes.push(RenderNode {
                    world_matrix: world,
                    material_id,
                    render_prim_id,
                    ref_node_id: node_index,
                    skin_id,
                    visible: effective_visible,
                });
                self.node_to_render_nodes[node_index].push(render_node_id);
            }
        }

        Ok(())
    }

    fn resolve_material_index(&self, mesh_index: usize, primitive_index: usize) -> usize {
        let primitive = &self.model.meshes[mesh_index].primitives[primitive_index];
        if let Some(variant) = self.current_variant {
            if let Some(mapping) = primitive.mappings.iter().find(|m| m.variants.contains(&variant)) {
                return mapping.material;
            }
        }
        primitive.material.unwrap_or(0)
    }

    fn render_primitive_for(&mut self, mesh_index: usize, primitive_index: usize) -> usize {
        let primitive = &self.model.meshes[mesh_index].primitives[primitive_index];
        let key = DedupKey {
            position: primitive.attributes.position,
            normal: primitive.attributes.normal,
            tangent: primitive.attributes.tangent,
            texcoord_0: primitive.attributes.texcoord_0,
            texcoord_1: primitive.attributes.texcoord_1,
            color_0: primitive.attributes.color_0,
            joints_0: primitive.attributes.joints_0,
            weights_0: primitive.attributes.weights_0,
            indices: primitive.indices,
            material: primitive.material,
        };

        if let Some(&id) = self.render_prim_lookup.get(&key) {
            return id;
        }

        let id = self.render_primitives.len();
        self.render_primitives.push(RenderPrimitive {
            source: SourcePrimitiveRef {
                mesh_index,
                primitive_index,
            },
            generated_tangents: None,
        });
        self.render_prim_lookup.insert(key, id);
        id
    }

    /// §4.B item 5: first depth-first camera node wins; otherwise synthesize
    /// one framed to the scene bounding box.
    fn discover_or_synthesize_camera(&mut self) {
        if let Some(found) = self.depth_first_camera_node() {
            self.scene_camera_node = Some(found);
            return;
        }

        let (min, max) = self.scene_bounds();
        let center = (min + max) * 0.5;
        let radius = (max - min).length() * 0.5;
        let radius = if radius > 0.0 { radius } else { 1.0 };

        let eye = center + Vec3::new(0.0, 0.0, 2.414 * radius);
        let camera_index = self.model.cameras.len();
        self.model.cameras.push(asset_io::model::Camera {
            name: None,
            znear: 0.1 * radius,
            zfar: Some(10.0 * radius),
            projection: asset_io::model::CameraProjection::Perspective {
                yfov: 45f32.to_radians(),
                aspect: None,
            },
        });

        let node_index = self.model.nodes.len();
        let mut node = Node {
            camera: Some(camera_index),
            visible: true,
            eye_center_up: Some(((eye).into(), (center).into(), (Vec3::Y).into())),
            ..Node::default()
        };
        node.name = Some(format!("Camera-{camera_index}"));
        self.model.nodes.push(node);
        self.node_to_render_nodes.push(Vec::new());
        self.node_parents.push(None);
        self.nodes_local_matrices.push(Mat4::IDENTITY);
        self.nodes_world_matrices.push(
            Mat4::look_at_rh(eye, center, Vec3::Y).inverse(),
        );
        self.model.scenes[self.current_scene].nodes.push(node_index);

        self.scene_camera_node = Some(node_index);
    }

    fn depth_first_camera_node(&self) -> Option<usize> {
        let roots = &self.model.scenes[self.current_scene].nodes;
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            if self.model.nodes[index].camera.is_some() {
                return Some(index);
            }
            for &child in self.model.nodes[index].children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    pub fn set_scene_camera(&mut self, node_index: usize) {
        self.scene_camera_node = Some(node_index);
    }

    /// §4.B item 6: union of POSITION min/max across every Render Primitive,
    /// transformed by its render nodes' world matrices. Falls back to the
    /// unit cube when the scene has no geometry.
    pub fn scene_bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut touched = false;

        for render_node in &self.render_nodes {
            let prim = &self.render_primitives[render_node.render_prim_id];
            let source = &self.model.meshes[prim.source.mesh_index].primitives[prim.source.primitive_index];
            let Some(position_accessor) = source.attributes.position else {
                continue;
            };
            let Ok(positions) = read_f32x3(&self.model, position_accessor) else {
                continue;
            };
            for p in positions {
                let world_p = render_node.world_matrix.transform_point3(p);
                min = min.min(world_p);
                max = max.max(world_p);
                touched = true;
            }
        }

        if !touched {
            (Vec3::splat(-1.0), Vec3::splat(1.0))
        } else {
            (min, max)
        }
    }

    /// §4.B item 7: switching variants changes every render node whose
    /// material resolution depends on `current_variant`. Returns the set of
    /// render nodes whose `material_id` actually changed.
    pub fn set_current_variant(&mut self, variant: Option<usize>) -> HashSet<usize> {
        self.current_variant = variant;
        let mut dirty = HashSet::new();

        for render_node_id in 0..self.render_nodes.len() {
            let prim = &self.render_primitives[self.render_nodes[render_node_id].render_prim_id];
            let new_material = self.resolve_material_index(prim.source.mesh_index, prim.source.primitive_index);
            if self.render_nodes[render_node_id].material_id != new_material {
                self.render_nodes[render_node_id].material_id = new_material;
                dirty.insert(render_node_id);
            }
        }

        dirty
    }

    /// §4.B item 8: for render nodes whose material has a normal texture but
    /// whose source primitive lacks TANGENT, generate a tangent basis from
    /// POSITION/NORMAL/TEXCOORD_0 via the UV-gradient method.
    fn generate_missing_tangents(&mut self) -> Result<()> {
        let mut needs_tangents: HashSet<usize> = HashSet::new();
        for render_node in &self.render_nodes {
            let material = &self.model.materials[render_node.material_id];
            if material.normal_texture.is_none() {
                continue;
            }
            let prim = &self.render_primitives[render_node.render_prim_id];
            let source = &self.model.meshes[prim.source.mesh_index].primitives[prim.source.primitive_index];
            if source.attributes.tangent.is_none() && prim.generated_tangents.is_none() {
                needs_tangents.insert(render_node.render_prim_id);
            }
        }

        let ids: Vec<usize> = needs_tangents.into_iter().collect();
        let generated: Vec<(usize, Option<Vec<Vec4>>)> = ids
            .into_iter()
            .map(|id| {
                let prim = &self.render_primitives[id];
                let source = &self.model.meshes[prim.source.mesh_index].primitives[prim.source.primitive_index];
                (id, compute_uv_gradient_tangents(&self.model, source).ok())
            })
            .collect();

        for (id, tangents) in generated {
            self.render_primitives[id].generated_tangents = tangents;
        }

        Ok(())
    }

    /// §4.B item 9 (`updateNodeWorldMatrices`): filter to minimal ancestors,
    /// recompute local matrices, DFS-refresh descendants' world matrices,
    /// propagate to render nodes and render lights.
    pub fn update_node_world_matrices(&mut self, dirty: &HashSet<usize>) {
        let minimal: Vec<usize> = dirty
            .iter()
            .copied()
            .filter(|&n| !self.has_ancestor_in(n, dirty))
            .collect();

        for &node_index in &minimal {
            self.refresh_subtree(node_index);
        }
    }

    fn has_ancestor_in(&self, node: usize, set: &HashSet<usize>) -> bool {
        let mut current = self.node_parents.get(node).copied().flatten();
        while let Some(p) = current {
            if set.contains(&p) {
                return true;
            }
            current = self.node_parents.get(p).copied().flatten();
        }
        false
    }

    fn refresh_subtree(&mut self, node_index: usize) {
        let local = self.model.nodes[node_index].local_matrix();
        self.nodes_local_matrices[node_index] = local;

        let parent_world = self.node_parents[node_index]
            .map(|p| self.nodes_world_matrices[p])
            .unwrap_or(Mat4::IDENTITY);

        let mut stack = vec![(node_index, parent_world)];
        while let Some((index, parent_world)) = stack.pop() {
            let local = self.nodes_local_matrices[index];
            let world = parent_world * local;
            self.nodes_world_matrices[index] = world;

            for &render_node_id in &self.node_to_render_nodes[index] {
                self.render_nodes[render_node_id].world_matrix = world;
            }
            for render_light in &mut self.render_lights {
                if self.node_light_matches(index, render_light.light_index) {
                    render_light.world_matrix = world;
                }
            }

            for &child in &self.model.nodes[index].children {
                let child_local = self.model.nodes[child].local_matrix();
                self.nodes_local_matrices[child] = child_local;
                stack.push((child, world));
            }
        }
    }

    fn node_light_matches(&self, node_index: usize, light_index: usize) -> bool {
        self.model.nodes[node_index].light == Some(light_index)
    }

    /// §4.B item 11: gather render nodes under a node set; report whether
    /// the caller should prefer a full update.
    pub fn collect_render_node_indices(
        &self,
        node_set: &HashSet<usize>,
        include_descendants: bool,
    ) -> (HashSet<usize>, bool) {
        let mut render_indices = HashSet::new();
        let mut nodes_to_visit: Vec<usize> = node_set.iter().copied().collect();

        if include_descendants {
            let mut stack = nodes_to_visit.clone();
            while let Some(n) = stack.pop() {
                for &child in &self.model.nodes[n].children {
                    if nodes_to_visit.contains(&child) {
                        continue;
                    }
                    nodes_to_visit.push(child);
                    stack.push(child);
                }
            }
        }

        for n in nodes_to_visit {
            if let Some(list) = self.node_to_render_nodes.get(n) {
                render_indices.extend(list.iter().copied());
            }
        }

        let prefer_full =
            !self.render_nodes.is_empty() && render_indices.len() as f32 / self.render_nodes.len() as f32 > self.full_update_ratio;

        (render_indices, prefer_full)
    }

    /// Recursive `updateVisibility`: toggles a node's own visibility flag and
    /// recomputes effective visibility for it and every descendant.
    pub fn update_visibility(&mut self, node_index: usize, visible: bool) {
        self.model.nodes[node_index].visible = visible;
        let parent_effective = self.node_parents[node_index]
            .map(|p| self.effective_visibility(p))
            .unwrap_or(true);
        self.propagate_visibility(node_index, parent_effective);
    }

    fn effective_visibility(&self, node_index: usize) -> bool {
        let mut visible = self.model.nodes[node_index].visible;
        let mut current = self.node_parents[node_index];
        while let Some(p) = current {
            visible &= self.model.nodes[p].visible;
            current = self.node_parents[p];
        }
        visible
    }

    fn propagate_visibility(&mut self, node_index: usize, parent_effective: bool) {
        let effective = parent_effective && self.model.nodes[node_index].visible;
        for &render_node_id in &self.node_to_render_nodes[node_index] {
            self.render_nodes[render_node_id].visible = effective;
        }
        let children = self.model.nodes[node_index].children.clone();
        for child in children {
            self.propagate_visibility(child, effective);
        }
    }

    pub fn get_render_nodes(&self) -> &[RenderNode] {
        &self.render_nodes
    }

    pub fn get_render_primitives(&self) -> &[RenderPrimitive] {
        &self.render_primitives
    }

    pub fn get_render_lights(&self) -> &[RenderLight] {
        &self.render_lights
    }

    /// `getRenderCameras(force)`. Cameras are cheap to recompute, so `force`
    /// only controls whether eye/center/up are re-derived from the current
    /// world matrix even when extras are present (normally the extras win).
    pub fn get_render_cameras(&self, force: bool) -> Vec<RenderCamera> {
        let mut cameras = Vec::new();
        for (node_index, node) in self.model.nodes.iter().enumerate() {
            let Some(camera_index) = node.camera else {
                continue;
            };
            let world = self.nodes_world_matrices[node_index];
            let (eye, center, up) = if !force {
                if let Some((eye, center, up)) = node.eye_center_up {
                    (Vec3::from(eye), Vec3::from(center), Vec3::from(up))
                } else {
                    derive_eye_center_up(world)
                }
            } else {
                derive_eye_center_up(world)
            };
            cameras.push(RenderCamera {
                node_index,
                camera_index,
                world_matrix: world,
                eye,
                center,
                up,
            });
        }
        cameras
    }

    pub fn scene_camera_node(&self) -> Option<usize> {
        self.scene_camera_node
    }

    /// `getShadedNodes(kind)`: classifies render nodes by alpha mode,
    /// double-sidedness, and transmission for the rasterizer's shading
    /// passes.
    pub fn get_shaded_nodes(&self, kind: ShadedKind) -> Vec<usize> {
        (0..self.render_nodes.len())
            .filter(|&i| {
                let material = &self.model.materials[self.render_nodes[i].material_id];
                let has_transmission = material.transmission.present && material.transmission.factor > 0.0;
                match kind {
                    ShadedKind::All => true,
                    ShadedKind::Blended => material.alpha_mode == AlphaMode::Blend || has_transmission,
                    ShadedKind::OpaqueSingleSided => {
                        material.alpha_mode != AlphaMode::Blend && !has_transmission && !material.double_sided
                    }
                    ShadedKind::OpaqueDoubleSided => {
                        material.alpha_mode != AlphaMode::Blend && !has_transmission && material.double_sided
                    }
                }
            })
            .collect()
    }

    pub fn nodes_world_matrices(&self) -> &[Mat4] {
        &self.nodes_world_matrices
    }

    pub fn node_parents(&self) -> &[Option<usize>] {
        &self.node_parents
    }

    pub fn current_variant(&self) -> Option<usize> {
        self.current_variant
    }
}

fn derive_eye_center_up(world: Mat4) -> (Vec3, Vec3, Vec3) {
    let eye = world.transform_point3(Vec3::ZERO);
    let forward = world.transform_vector3(Vec3::NEG_Z);
    let up = world.transform_vector3(Vec3::Y);
    (eye, eye + forward, up)
}

/// §4.B item 1: `"<Kind>-<index>"` default names for anything unnamed.
fn assign_default_names(model: &mut Model) {
    for (i, scene) in model.scenes.iter_mut().enumerate() {
        scene.name.get_or_insert_with(|| format!("Scene-{i}"));
    }
    for (i, mesh) in model.meshes.iter_mut().enumerate() {
        mesh.name.get_or_insert_with(|| format!("Mesh-{i}"));
    }
    for (i, material) in model.materials.iter_mut().enumerate() {
        material.name.get_or_insert_with(|| format!("Material-{i}"));
    }
    for (i, node) in model.nodes.iter_mut().enumerate() {
        node.name.get_or_insert_with(|| format!("Node-{i}"));
    }
    for (i, camera) in model.cameras.iter_mut().enumerate() {
        camera.name.get_or_insert_with(|| format!("Camera-{i}"));
    }
    for (i, light) in model.lights.iter_mut().enumerate() {
        light.name.get_or_insert_with(|| format!("Light-{i}"));
    }
}

/// Simple per-triangle UV-gradient tangent generator (the non-MikkTSpace
/// option §4.B item 8 allows). Accumulates per-vertex tangent/bitangent from
/// each triangle's UV gradient, then Gram-Schmidt-orthogonalizes against the
/// shading normal and resolves handedness into `w`.
fn compute_uv_gradient_tangents(
    model: &Model,
    primitive: &asset_io::model::Primitive,
) -> std::result::Result<Vec<Vec4>, asset_io::AssetError> {
    use asset_io::accessor::read_u32;

    let position_accessor = primitive.attributes.position.ok_or(asset_io::AssetError::InvalidAccessor {
        accessor: 0,
        reason: "primitive has no POSITION accessor".into(),
    })?;
    let normal_accessor = primitive.attributes.normal.ok_or(asset_io::AssetError::InvalidAccessor {
        accessor: 0,
        reason: "primitive has no NORMAL accessor".into(),
    })?;
    let uv_accessor = primitive
        .attributes
        .texcoord_0
        .ok_or(asset_io::AssetError::InvalidAccessor {
            accessor: 0,
            reason: "primitive has no TEXCOORD_0 accessor".into(),
        })?;

    let positions = read_f32x3(model, position_accessor)?;
    let normals = read_f32x3(model, normal_accessor)?;
    let uvs = asset_io::accessor::read_f32x2(model, uv_accessor)?;

    let indices: Vec<u32> = match primitive.indices {
        Some(a) => read_u32(model, a)?,
        None => (0..positions.len() as u32).collect(),
    };

    let mut tangent_accum = vec![Vec3::ZERO; positions.len()];
    let mut bitangent_accum = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (p0, p1, p2) = (positions[i0], positions[i1], positions[i2]);
        let (uv0, uv1, uv2): (Vec2, Vec2, Vec2) = (uvs[i0], uvs[i1], uvs[i2]);

        let edge1 = p1 - p0;
        let edge2 = p2 - p0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        let denom = delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y;
        if denom.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / denom;
        let tangent = (edge1 * delta_uv2.y - edge2 * delta_uv1.y) * r;
        let bitangent = (edge2 * delta_uv1.x - edge1 * delta_uv2.x) * r;

        for i in [i0, i1, i2] {
            tangent_accum[i] += tangent;
            bitangent_accum[i] += bitangent;
        }
    }

    let tangents = positions
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let n = normals[i];
            let t = tangent_accum[i];
            let ortho = (t - n * n.dot(t)).normalize_or_zero();
            let handedness = if n.cross(ortho).dot(bitangent_accum[i]) < 0.0 {
                -1.0
            } else {
                1.0
            };
            Vec4::new(ortho.x, ortho.y, ortho.z, handedness)
        })
        .collect();

    Ok(tangents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_io::model::{Accessor, Attributes, Buffer, BufferView, ComponentType, ElementType, Mesh, Primitive, Scene as ModelScene};

    fn accessor_f32x3(buffer_view: usize, count: usize) -> Accessor {
        Accessor {
            element_type: ElementType::Vec3,
            component_type: ComponentType::F32,
            count,
            buffer_view: Some(buffer_view),
            byte_offset: 0,
            normalized: false,
            sparse: None,
        }
    }

    fn two_box_model() -> Model {
        let mut data = Vec::new();
        for v in [[0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        let byte_len = data.len();

        let mut model = Model {
            buffers: vec![Buffer {
                byte_length: byte_len,
                data,
            }],
            buffer_views: vec![BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: byte_len,
                byte_stride: None,
                meshopt: None,
            }],
            accessors: vec![accessor_f32x3(0, 3)],
            materials: vec![asset_io::model::Material::default()],
            ..Default::default()
        };

        let primitive = Primitive {
            attributes: Attributes {
                position: Some(0),
                ..Default::default()
            },
            indices: None,
            material: Some(0),
            targets: Vec::new(),
            mappings: Vec::new(),
            has_draco_compression: false,
        };
        model.meshes.push(Mesh {
            name: None,
            primitives: vec![primitive],
            weights: Vec::new(),
        });

        model.nodes.push(Node {
            mesh: Some(0),
            visible: true,
            ..Node::default()
        });
        model.nodes.push(Node {
            mesh: Some(0),
            visible: true,
            ..Node::default()
        });
        model.scenes.push(ModelScene {
            name: None,
            nodes: vec![0, 1],
        });
        model.default_scene = Some(0);
        model
    }

    #[test]
    fn two_box_scene_dedups_to_one_render_primitive() {
        let scene = Scene::from_model(two_box_model()).unwrap();
        assert_eq!(scene.get_render_primitives().len(), 1);
        assert_eq!(scene.get_render_nodes().len(), 2);
    }

    #[test]
    fn default_names_are_assigned() {
        let scene = Scene::from_model(two_box_model()).unwrap();
        assert_eq!(scene.model().nodes[0].name.as_deref(), Some("Node-0"));
        assert_eq!(scene.model().meshes[0].name.as_deref(), Some("Mesh-0"));
    }

    #[test]
    fn empty_scene_bounds_fall_back_to_unit_cube() {
        let mut model = Model::default();
        model.scenes.push(ModelScene {
            name: None,
            nodes: Vec::new(),
        });
        model.default_scene = Some(0);
        let scene = Scene::from_model(model).unwrap();
        let (min, max) = scene.scene_bounds();
        assert_eq!(min, Vec3::splat(-1.0));
        assert_eq!(max, Vec3::splat(1.0));
    }

    #[test]
    fn variant_switch_reports_exactly_the_changed_render_nodes() {
        let mut model = two_box_model();
        model.materials.push(asset_io::model::Material::default());
        model.variants.names = vec!["day".into(), "night".into()];
        model.meshes[0].primitives[0].mappings = vec![asset_io::model::VariantMapping {
            variants: vec![1],
            material: 1,
        }];

        let mut scene = Scene::from_model(model).unwrap();
        let dirty = scene.set_current_variant(Some(1));
        assert_eq!(dirty.len(), 2);
        for &n in &dirty {
            assert_eq!(scene.get_render_nodes()[n].material_id, 1);
        }
    }

    #[test]
    fn visibility_is_and_of_node_and_ancestors() {
        let mut model = two_box_model();
        model.nodes[0].children = vec![1];
        model.scenes[0].nodes = vec![0];
        let mut scene = Scene::from_model(model).unwrap();
        scene.update_visibility(0, false);
        for &rn in &scene.node_to_render_nodes[1] {
            assert!(!scene.render_nodes[rn].visible);
        }
    }
}
