//! §4.D GPU Mirror, pure half: conversion from the scene model to the flat
//! GPU record types in `shared_structs`, plus the surgical-vs-full-rebuild
//! policy for the material table. No `wgpu::Device` is touched here so this
//! module is exercised entirely by `#[cfg(test)]`; `scene-core/src/gpu/mod.rs`
//! wires the resulting byte spans onto real buffers.
//!
//! Grounded on `examples/original_source/src/gltf_scene_vk.cpp`'s
//! `updateMaterialBuffer`/`getShaderMaterial`/`updateCachedMaterial`
//! (surgical update + `TextureInfoSpan` contiguity) and `getShaderLights`
//! (light-table derivation, including the `sun_distance` constant below).

use std::collections::HashSet;

use asset_io::accessor::{read_f32x2, read_f32x3, read_f32x4, read_u32};
use asset_io::model::{ElementType, LightKind, Material, Model, TextureInfo};
use glam::{Mat4, Vec2, Vec3, Vec4};
use shared_structs::{
    material_flags, AnisotropyGpu, ClearcoatGpu, DiffuseTransmissionGpu, IridescenceGpu, LightGpu, MaterialGpu,
    RenderNodeGpu, RenderPrimitiveGpu, SheenGpu, SpecGlossGpu, SpecularGpu, TextureInfoGpu, TextureRefStd,
    TextureTransform, TransmissionGpu, VolumeGpu, VolumeScatterGpu, LIGHT_KIND_DIRECTIONAL, LIGHT_KIND_POINT,
    LIGHT_KIND_SPOT,
};

use crate::error::Result;
use crate::scene::{RenderLight, RenderNode, RenderPrimitive};

/// km, matching the original engine's sun-distance constant used to turn a
/// directional light's `radius` extra into an angular size.
const SUN_DISTANCE: f32 = 149_597_870.0;

/// Fixed slot order mirrored between `texture_slots` (what's populated) and
/// `push_material_textures` (what gets pushed into the texture-info table).
/// The order only matters for producing a stable topology bitmask; any
/// permutation would work as long as both sides agree.
fn texture_slots(material: &Material) -> [Option<&TextureInfo>; 21] {
    [
        material.base_color_texture.as_ref(),
        material.metallic_roughness_texture.as_ref(),
        material.normal_texture.as_ref(),
        material.occlusion_texture.as_ref(),
        material.emissive_texture.as_ref(),
        material.transmission.texture.as_ref(),
        material.volume.thickness_texture.as_ref(),
        material.clearcoat.texture.as_ref(),
        material.clearcoat.roughness_texture.as_ref(),
        material.clearcoat.normal_texture.as_ref(),
        material.sheen.color_texture.as_ref(),
        material.sheen.roughness_texture.as_ref(),
        material.specular.texture.as_ref(),
        material.specular.color_texture.as_ref(),
        material.anisotropy.texture.as_ref(),
        material.iridescence.texture.as_ref(),
        material.iridescence.thickness_texture.as_ref(),
        material.diffuse_transmission.texture.as_ref(),
        material.diffuse_transmission.color_texture.as_ref(),
        material.spec_gloss.diffuse_texture.as_ref(),
        material.spec_gloss.specular_glossiness_texture.as_ref(),
    ]
}

fn texture_topology(material: &Material) -> u32 {
    let mut mask = 0u32;
    for (i, slot) in texture_slots(material).iter().enumerate() {
        if slot.is_some() {
            mask |= 1 << i;
        }
    }
    mask
}

fn texture_transform_gpu(t: Option<&asset_io::model::TextureTransform>) -> TextureTransform {
    match t {
        Some(t) => TextureTransform {
            offset: t.offset.into(),
            scale: t.scale.into(),
            rotation: t.rotation,
        },
        None => TextureTransform::default(),
    }
}

fn texture_ref_gpu(info: Option<&TextureInfo>, texture_infos: &mut Vec<TextureInfoGpu>) -> TextureRefStd {
    match info {
        Some(info) => {
            let idx = texture_infos.len() as u32;
            texture_infos.push(TextureInfoGpu {
                texture_index: info.index as u32,
                uv_set: info.tex_coord as u32,
                transform: texture_transform_gpu(info.transform.as_ref()),
            });
            TextureRefStd { index: idx }
        }
        None => TextureRefStd::default(),
    }
}

fn material_flags_for(material: &Material) -> u32 {
    let mut flags = 0;
    match material.alpha_mode {
        asset_io::model::AlphaMode::Mask => flags |= material_flags::ALPHA_MASK,
        asset_io::model::AlphaMode::Blend => flags |= material_flags::ALPHA_BLEND,
        asset_io::model::AlphaMode::Opaque => {}
    }
    if material.double_sided {
        flags |= material_flags::DOUBLE_SIDED;
    }
    if material.is_thin_walled() {
        flags |= material_flags::THIN_WALLED;
    }
    if material.transmission.present {
        flags |= material_flags::HAS_TRANSMISSION;
    }
    if material.volume.present {
        flags |= material_flags::HAS_VOLUME;
    }
    if material.volume_scatter.present {
        flags |= material_flags::HAS_VOLUME_SCATTER;
    }
    if material.clearcoat.present {
        flags |= material_flags::HAS_CLEARCOAT;
    }
    if material.sheen.present {
        flags |= material_flags::HAS_SHEEN;
    }
    if material.specular.present {
        flags |= material_flags::HAS_SPECULAR;
    }
    if material.anisotropy.present {
        flags |= material_flags::HAS_ANISOTROPY;
    }
    if material.iridescence.present {
        flags |= material_flags::HAS_IRIDESCENCE;
    }
    if material.dispersion.present {
        flags |= material_flags::HAS_DISPERSION;
    }
    if material.emissive_strength.present {
        flags |= material_flags::HAS_EMISSIVE_STRENGTH;
    }
    if material.unlit.present {
        flags |= material_flags::UNLIT;
    }
    if material.diffuse_transmission.present {
        flags |= material_flags::HAS_DIFFUSE_TRANSMISSION;
    }
    if material.spec_gloss.present {
        flags |= material_flags::HAS_SPEC_GLOSS;
    }
    flags
}

/// Converts one material, appending its texture infos (in slot order, so
/// they land contiguously) onto `texture_infos`. Returns the record plus the
/// `[start, end)` span it occupied in `texture_infos`.
fn convert_material(material: &Material, texture_infos: &mut Vec<TextureInfoGpu>) -> (MaterialGpu, (u32, u32)) {
    let start = texture_infos.len() as u32;
    let slots = texture_slots(material);

    let gpu = MaterialGpu {
        flags: material_flags_for(material),
        alpha_cutoff: material.alpha_cutoff,
        base_color_factor: material.base_color_factor,
        base_color_texture: texture_ref_gpu(slots[0], texture_infos),
        metallic_factor: material.metallic_factor,
        roughness_factor: material.roughness_factor,
        metallic_roughness_texture: texture_ref_gpu(slots[1], texture_infos),
        normal_scale: material.normal_texture.as_ref().map(|t| t.scale).unwrap_or(1.0),
        normal_texture: texture_ref_gpu(slots[2], texture_infos),
        occlusion_strength: material.occlusion_texture.as_ref().map(|t| t.strength).unwrap_or(1.0),
        occlusion_texture: texture_ref_gpu(slots[3], texture_infos),
        emissive_factor: material.emissive_factor,
        emissive_strength: if material.emissive_strength.present {
            material.emissive_strength.emissive_strength
        } else {
            1.0
        },
        emissive_texture: texture_ref_gpu(slots[4], texture_infos),
        ior: material.ior,
        dispersion: material.dispersion.dispersion,
        transmission: TransmissionGpu {
            factor: material.transmission.factor,
            texture: texture_ref_gpu(slots[5], texture_infos),
        },
        volume: VolumeGpu {
            thickness_factor: material.volume.thickness_factor,
            thickness_texture: texture_ref_gpu(slots[6], texture_infos),
            attenuation_distance: material.volume.attenuation_distance,
            attenuation_color: material.volume.attenuation_color,
        },
        volume_scatter: VolumeScatterGpu {
            scatter_distance: material.volume_scatter.scatter_distance,
            scatter_color: material.volume_scatter.scatter_color,
        },
        clearcoat: ClearcoatGpu {
            factor: material.clearcoat.factor,
            texture: texture_ref_gpu(slots[7], texture_infos),
            roughness_factor: material.clearcoat.roughness_factor,
            roughness_texture: texture_ref_gpu(slots[8], texture_infos),
            normal_texture: texture_ref_gpu(slots[9], texture_infos),
        },
        sheen: SheenGpu {
            color_factor: material.sheen.color_factor,
            color_texture: texture_ref_gpu(slots[10], texture_infos),
            roughness_factor: material.sheen.roughness_factor,
            roughness_texture: texture_ref_gpu(slots[11], texture_infos),
        },
        specular: SpecularGpu {
            factor: material.specular.factor,
            texture: texture_ref_gpu(slots[12], texture_infos),
            color_factor: material.specular.color_factor,
            color_texture: texture_ref_gpu(slots[13], texture_infos),
        },
        anisotropy: AnisotropyGpu {
            strength: material.anisotropy.strength,
            rotation: material.anisotropy.rotation,
            texture: texture_ref_gpu(slots[14], texture_infos),
        },
        iridescence: IridescenceGpu {
            factor: material.iridescence.factor,
            texture: texture_ref_gpu(slots[15], texture_infos),
            ior: material.iridescence.ior,
            thickness_min: material.iridescence.thickness_min,
            thickness_max: material.iridescence.thickness_max,
            thickness_texture: texture_ref_gpu(slots[16], texture_infos),
        },
        diffuse_transmission: DiffuseTransmissionGpu {
            factor: material.diffuse_transmission.factor,
            texture: texture_ref_gpu(slots[17], texture_infos),
            color_factor: material.diffuse_transmission.color_factor,
            color_texture: texture_ref_gpu(slots[18], texture_infos),
        },
        spec_gloss: SpecGlossGpu {
            diffuse_factor: material.spec_gloss.diffuse_factor,
            diffuse_texture: texture_ref_gpu(slots[19], texture_infos),
            specular_factor: material.spec_gloss.specular_factor,
            glossiness_factor: material.spec_gloss.glossiness_factor,
            specular_glossiness_texture: texture_ref_gpu(slots[20], texture_infos),
        },
    };

    let end = texture_infos.len() as u32;
    (gpu, (start, end))
}

/// What the caller must actually push to the GPU after `MaterialMirror`
/// resolved an update.
pub enum MaterialUploadPlan {
    /// Re-upload both tables from index 0 in full.
    Full,
    /// Re-upload only `materials[idx]` and `texture_infos[span.0..span.1]`
    /// for each `(idx, span)` pair; spans are individually contiguous.
    Partial(Vec<(usize, (u32, u32))>),
}

/// CPU-side cache of the material table and texture-info table, plus the
/// bookkeeping the surgical-update policy needs (§4.D "Material table").
#[derive(Default)]
pub struct MaterialMirror {
    materials: Vec<MaterialGpu>,
    texture_infos: Vec<TextureInfoGpu>,
    spans: Vec<(u32, u32)>,
    topology: Vec<u32>,
}

impl MaterialMirror {
    pub fn materials(&self) -> &[MaterialGpu] {
        &self.materials
    }

    pub fn texture_infos(&self) -> &[TextureInfoGpu] {
        &self.texture_infos
    }

    fn rebuild(&mut self, materials: &[Material]) {
        self.materials.clear();
        self.texture_infos.clear();
        self.texture_infos.push(TextureInfoGpu::default()); // index 0: "no texture"
        self.spans.clear();
        self.topology.clear();

        for material in materials {
            let (gpu, span) = convert_material(material, &mut self.texture_infos);
            self.materials.push(gpu);
            self.spans.push(span);
            self.topology.push(texture_topology(material));
        }
    }

    /// `full_update_ratio` is `EngineSettings::full_update_ratio`; `dirty`
    /// empty means "first build or forced full refresh".
    pub fn update(&mut self, materials: &[Material], dirty: &HashSet<usize>, full_update_ratio: f32) -> MaterialUploadPlan {
        let needs_full = self.materials.len() != materials.len()
            || dirty.is_empty()
            || dirty.len() as f32 > materials.len() as f32 * full_update_ratio;

        if needs_full {
            self.rebuild(materials);
            return MaterialUploadPlan::Full;
        }

        let mut touched = Vec::with_capacity(dirty.len());
        for &idx in dirty {
            let Some(material) = materials.get(idx) else { continue };
            if texture_topology(material) != self.topology[idx] {
                self.rebuild(materials);
                return MaterialUploadPlan::Full;
            }

            let (start, end) = self.spans[idx];
            let mut scratch = Vec::new();
            let (gpu, _) = convert_material(material, &mut scratch);
            debug_assert_eq!(scratch.len() as u32, end - start);

            self.materials[idx] = gpu;
            self.texture_infos[start as usize..end as usize].copy_from_slice(&scratch);
            touched.push((idx, (start, end)));
        }

        MaterialUploadPlan::Partial(touched)
    }
}

pub fn render_node_gpu(node: &RenderNode) -> RenderNodeGpu {
    RenderNodeGpu {
        object_to_world: node.world_matrix.into(),
        world_to_object: node.world_matrix.inverse().into(),
        material_id: node.material_id as u32,
        render_prim_id: node.render_prim_id as u32,
        visible: node.visible as u32,
        _padding: 0,
    }
}

/// §4.D "Render-node table": empty `dirty` means a full refresh.
pub fn render_node_upload_plan(dirty: &HashSet<usize>, count: usize) -> Vec<usize> {
    if dirty.is_empty() {
        (0..count).collect()
    } else {
        dirty.iter().copied().collect()
    }
}

/// §4.D "Render-primitive table": the per-primitive vertex-attribute/index
/// arenas plus the flat record table of offsets into them. Each attribute
/// stream is packed into its own combined arena across every render
/// primitive (one upload per arena, addressed by byte offset), rather than
/// interleaved, since the arenas are written once per rebuild and never
/// touched per-frame.
#[derive(Default)]
pub struct RenderPrimitiveTables {
    pub records: Vec<RenderPrimitiveGpu>,
    pub positions: Vec<u8>,
    pub normals: Vec<u8>,
    pub tangents: Vec<u8>,
    pub tex_coords_0: Vec<u8>,
    pub tex_coords_1: Vec<u8>,
    pub colors: Vec<u8>,
    pub indices: Vec<u8>,
}

fn read_color(model: &Model, accessor_index: usize) -> crate::error::Result<Vec<Vec4>> {
    if model.accessors[accessor_index].element_type == ElementType::Vec4 {
        Ok(read_f32x4(model, accessor_index)?)
    } else {
        Ok(read_f32x3(model, accessor_index)?.into_iter().map(|c| c.extend(1.0)).collect())
    }
}

/// Appends `data`'s raw bytes to `arena` and returns the byte offset it was
/// written at, or 0 (the "absent" sentinel `RenderPrimitiveGpu` shares with
/// `TextureRefStd`'s "no texture" slot) when there's nothing to append.
fn append_arena<T: bytemuck::Pod>(arena: &mut Vec<u8>, data: Option<&[T]>) -> u64 {
    match data {
        Some(data) if !data.is_empty() => {
            let offset = arena.len() as u64;
            arena.extend_from_slice(bytemuck::cast_slice(data));
            offset
        }
        _ => 0,
    }
}

/// Builds the render-primitive table and its backing vertex-attribute/index
/// arenas from every Render Primitive's source mesh primitive, generated
/// tangents included (§4.B item 8's UV-gradient fallback feeds the same
/// `tangent_address` slot a source TANGENT accessor would).
pub fn build_render_primitive_tables(model: &Model, render_primitives: &[RenderPrimitive]) -> Result<RenderPrimitiveTables> {
    let mut tables = RenderPrimitiveTables::default();
    // Offset 0 doubles as the "absent" sentinel (`TextureRefStd`'s "no
    // texture" slot 0 does the same), so every optional arena reserves a
    // dummy element up front; only POSITION is mandatory and needs no guard.
    append_arena(&mut tables.normals, Some(&[Vec3::ZERO]));
    append_arena(&mut tables.tangents, Some(&[Vec4::ZERO]));
    append_arena(&mut tables.tex_coords_0, Some(&[Vec2::ZERO]));
    append_arena(&mut tables.tex_coords_1, Some(&[Vec2::ZERO]));
    append_arena(&mut tables.colors, Some(&[Vec4::ZERO]));
    append_arena(&mut tables.indices, Some(&[0u32]));

    for prim in render_primitives {
        let source = &model.meshes[prim.source.mesh_index].primitives[prim.source.primitive_index];
        let attrs = &source.attributes;

        let position_accessor = attrs.position.ok_or(crate::error::CoreError::MissingPositionAttribute {
            mesh: prim.source.mesh_index,
        })?;
        let positions = read_f32x3(model, position_accessor)?;
        let vertex_count = positions.len() as u32;
        let position_address = append_arena(&mut tables.positions, Some(&positions));

        let normals = attrs.normal.map(|a| read_f32x3(model, a)).transpose()?;
        let normal_address = append_arena(&mut tables.normals, normals.as_deref());

        let tangents = match (attrs.tangent, &prim.generated_tangents) {
            (Some(a), _) => Some(read_f32x4(model, a)?),
            (None, Some(generated)) => Some(generated.clone()),
            (None, None) => None,
        };
        let tangent_address = append_arena(&mut tables.tangents, tangents.as_deref());

        let tex_coords_0 = attrs.texcoord_0.map(|a| read_f32x2(model, a)).transpose()?;
        let tex_coord_0_address = append_arena(&mut tables.tex_coords_0, tex_coords_0.as_deref());

        let tex_coords_1 = attrs.texcoord_1.map(|a| read_f32x2(model, a)).transpose()?;
        let tex_coord_1_address = append_arena(&mut tables.tex_coords_1, tex_coords_1.as_deref());

        let colors = attrs.color_0.map(|a| read_color(model, a)).transpose()?;
        let color_address = append_arena(&mut tables.colors, colors.as_deref());

        let (index_address, index_count) = match source.indices {
            Some(a) => {
                let indices = read_u32(model, a)?;
                let count = indices.len() as u32;
                (append_arena(&mut tables.indices, Some(&indices)), count)
            }
            None => (0, 0),
        };

        tables.records.push(RenderPrimitiveGpu {
            position_address,
            normal_address,
            tangent_address,
            tex_coord_0_address,
            tex_coord_1_address,
            color_address,
            index_address,
            vertex_count,
            index_count,
        });
    }

    Ok(tables)
}

pub fn light_gpu(render_light: &RenderLight, light: &asset_io::model::Light) -> LightGpu {
    let world = render_light.world_matrix;
    let position = world.col(3).truncate();
    let direction = -world.col(2).truncate();

    let angular_size_or_inv_range = match light.kind {
        LightKind::Directional => 2.0 * (light.radius / SUN_DISTANCE).atan(),
        LightKind::Point | LightKind::Spot => match light.range {
            Some(range) if range > 0.0 => 1.0 / range,
            _ => 0.0,
        },
    };

    LightGpu {
        position,
        kind: match light.kind {
            LightKind::Point => LIGHT_KIND_POINT,
            LightKind::Spot => LIGHT_KIND_SPOT,
            LightKind::Directional => LIGHT_KIND_DIRECTIONAL,
        },
        direction,
        intensity: light.intensity,
        color: light.color,
        inner_angle: light.inner_cone_angle,
        outer_angle: light.outer_cone_angle,
        angular_size_or_inv_range,
        radius: light.radius,
        _padding: 0.0,
    }
}

/// Resize-if-smaller policy (§4.D): only grow, never shrink, and report
/// whether a resize actually happened so the caller knows to republish the
/// scene descriptor's addresses.
pub fn grown_capacity(current_capacity: usize, required: usize) -> Option<usize> {
    if required > current_capacity {
        Some(required)
    } else {
        None
    }
}

/// Helper used by the path tracer/rasterizer alike: world-space inverse used
/// to cancel the render node's own transform out of the joint matrices (the
/// per-joint matrix already carries the joint's full world transform).
pub fn ref_node_inverse(ref_node_world: Mat4) -> Mat4 {
    ref_node_world.inverse()
}

pub fn identity_if_none(v: Option<Vec3>) -> Vec3 {
    v.unwrap_or(Vec3::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_io::model::Material;

    #[test]
    fn rebuild_reserves_slot_zero_as_no_texture() {
        let mut mirror = MaterialMirror::default();
        let materials = vec![Material::default()];
        let plan = mirror.update(&materials, &HashSet::new(), 0.5);
        assert!(matches!(plan, MaterialUploadPlan::Full));
        assert_eq!(mirror.texture_infos()[0].texture_index, 0);
        assert_eq!(mirror.materials().len(), 1);
    }

    #[test]
    fn more_than_half_dirty_forces_full_rebuild() {
        let mut mirror = MaterialMirror::default();
        let materials = vec![Material::default(); 4];
        mirror.update(&materials, &HashSet::new(), 0.5);

        let mut dirty = HashSet::new();
        dirty.insert(0);
        dirty.insert(1);
        dirty.insert(2);
        let plan = mirror.update(&materials, &dirty, 0.5);
        assert!(matches!(plan, MaterialUploadPlan::Full));
    }

    #[test]
    fn minority_dirty_with_unchanged_topology_is_surgical() {
        let mut mirror = MaterialMirror::default();
        let mut materials = vec![Material::default(); 4];
        mirror.update(&materials, &HashSet::new(), 0.5);

        materials[1].roughness_factor = 0.2;
        let mut dirty = HashSet::new();
        dirty.insert(1);
        let plan = mirror.update(&materials, &dirty, 0.5);
        match plan {
            MaterialUploadPlan::Partial(touched) => {
                assert_eq!(touched.len(), 1);
                assert_eq!(touched[0].0, 1);
            }
            MaterialUploadPlan::Full => panic!("expected a surgical update"),
        }
        assert_eq!(mirror.materials()[1].roughness_factor, 0.2);
    }

    #[test]
    fn appearing_texture_slot_forces_full_rebuild_even_for_one_dirty_material() {
        let mut mirror = MaterialMirror::default();
        let mut materials = vec![Material::default(); 4];
        mirror.update(&materials, &HashSet::new(), 0.5);

        materials[0].normal_texture = Some(TextureInfo {
            index: 0,
            tex_coord: 0,
            scale: 1.0,
            strength: 1.0,
            transform: None,
        });
        let mut dirty = HashSet::new();
        dirty.insert(0);
        let plan = mirror.update(&materials, &dirty, 0.5);
        assert!(matches!(plan, MaterialUploadPlan::Full));
        assert!(mirror.materials()[0].normal_texture.index != 0);
    }

    #[test]
    fn directional_light_angular_size_matches_radius_and_sun_distance() {
        let render_light = RenderLight {
            world_matrix: Mat4::IDENTITY,
            light_index: 0,
        };
        let light = asset_io::model::Light {
            kind: LightKind::Directional,
            radius: 696_000.0,
            ..Default::default()
        };
        let gpu = light_gpu(&render_light, &light);
        let expected = 2.0 * (696_000.0f32 / SUN_DISTANCE).atan();
        assert!((gpu.angular_size_or_inv_range - expected).abs() < 1e-6);
    }

    #[test]
    fn point_light_inv_range_is_zero_for_nonpositive_range() {
        let render_light = RenderLight {
            world_matrix: Mat4::IDENTITY,
            light_index: 0,
        };
        let light = asset_io::model::Light {
            kind: LightKind::Point,
            range: Some(0.0),
            ..Default::default()
        };
        let gpu = light_gpu(&render_light, &light);
        assert_eq!(gpu.angular_size_or_inv_range, 0.0);
    }

    #[test]
    fn grown_capacity_never_shrinks() {
        assert_eq!(grown_capacity(100, 50), None);
        assert_eq!(grown_capacity(100, 150), Some(150));
    }
}
