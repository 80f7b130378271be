//! §6 `Scene::save`: serializes a `Model` back out to `.gltf` or `.glb`,
//! chosen by the output path's extension. Grounded in the wire shapes
//! `asset_io::json` already deserializes; this module writes the same
//! fields back out by hand with `serde_json::json!` rather than adding a
//! parallel `Serialize`-derived struct tree for every wire type.
//!
//! Two simplifications versus a full round-trip, both recorded in
//! DESIGN.md: every buffer is concatenated into a single combined buffer
//! (one `.bin`/GLB BIN chunk, never the original buffer split), and images
//! are always written back as embedded `bufferView` references rather than
//! restored to their original file URIs, since `Model` (§3) never retains
//! source image paths.

use std::path::Path;

use asset_io::model::{
    AlphaMode, AnimationPath, CameraProjection, ElementType, Interpolation, LightKind, Model, NodeTransform,
};
use serde_json::{json, Value};

use crate::error::{CoreError, Result};

pub fn save(model: &Model, path: &Path) -> Result<()> {
    let is_glb = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("glb"))
        .unwrap_or(false);

    let (combined_buffer, buffer_offsets) = combine_buffers(model);

    let mut document = json!({
        "asset": { "version": "2.0", "generator": "scene-core" },
        "scene": model.default_scene,
        "scenes": model.scenes.iter().map(scene_json).collect::<Vec<_>>(),
        "nodes": model.nodes.iter().map(node_json).collect::<Vec<_>>(),
        "meshes": model.meshes.iter().map(mesh_json).collect::<Vec<_>>(),
        "materials": model.materials.iter().map(material_json).collect::<Vec<_>>(),
        "accessors": model.accessors.iter().map(accessor_json).collect::<Vec<_>>(),
        "bufferViews": model
            .buffer_views
            .iter()
            .map(|bv| buffer_view_json(bv, &buffer_offsets))
            .collect::<Vec<_>>(),
        "extensionsUsed": model.extensions_used,
        "extensionsRequired": model.extensions_required,
    });

    let obj = document.as_object_mut().expect("document root is an object");

    if !model.skins.is_empty() {
        obj.insert(
            "skins".into(),
            json!(model
                .skins
                .iter()
                .map(|s| json!({
                    "joints": s.joints,
                    "inverseBindMatrices": s.inverse_bind_matrices,
                }))
                .collect::<Vec<_>>()),
        );
    }

    if !model.animations.is_empty() {
        obj.insert(
            "animations".into(),
            json!(model.animations.iter().map(animation_json).collect::<Vec<_>>()),
        );
    }

    if !model.cameras.is_empty() {
        obj.insert(
            "cameras".into(),
            json!(model.cameras.iter().map(camera_json).collect::<Vec<_>>()),
        );
    }

    let texture_count = texture_count(model);
    if texture_count > 0 {
        obj.insert(
            "textures".into(),
            json!((0..texture_count).map(|i| json!({ "source": i })).collect::<Vec<_>>()),
        );
    }
    if !model.image_buffer_views.is_empty() {
        obj.insert(
            "images".into(),
            json!(model
                .image_buffer_views
                .iter()
                .map(|(bv, mime)| json!({ "bufferView": bv, "mimeType": mime }))
                .collect::<Vec<_>>()),
        );
    }

    let mut extensions = serde_json::Map::new();
    if !model.lights.is_empty() {
        extensions.insert(
            "KHR_lights_punctual".into(),
            json!({ "lights": model.lights.iter().map(light_json).collect::<Vec<_>>() }),
        );
    }
    if !model.variants.names.is_empty() {
        extensions.insert(
            "KHR_materials_variants".into(),
            json!({ "variants": model.variants.names.iter().map(|n| json!({ "name": n })).collect::<Vec<_>>() }),
        );
    }
    if !extensions.is_empty() {
        obj.insert("extensions".into(), Value::Object(extensions));
    }

    if is_glb {
        obj.insert("buffers".into(), json!([{ "byteLength": combined_buffer.len() }]));
        write_glb(path, &document, &combined_buffer)
    } else {
        obj.insert(
            "buffers".into(),
            json!([{ "uri": bin_file_name(path), "byteLength": combined_buffer.len() }]),
        );
        write_gltf_with_external_bin(path, &document, &combined_buffer)
    }
}

fn bin_file_name(gltf_path: &Path) -> String {
    gltf_path
        .file_stem()
        .map(|s| format!("{}.bin", s.to_string_lossy()))
        .unwrap_or_else(|| "buffer.bin".to_string())
}

fn write_gltf_with_external_bin(path: &Path, document: &Value, combined_buffer: &[u8]) -> Result<()> {
    let bin_path = path.with_file_name(bin_file_name(path));
    std::fs::write(&bin_path, combined_buffer).map_err(|e| CoreError::SaveFailed {
        path: bin_path.clone(),
        source: e.into(),
    })?;
    let text = serde_json::to_string_pretty(document).map_err(|e| CoreError::SaveFailed {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(path, text).map_err(|e| CoreError::SaveFailed {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn write_glb(path: &Path, document: &Value, combined_buffer: &[u8]) -> Result<()> {
    let mut json_chunk = serde_json::to_vec(document).map_err(|e| CoreError::SaveFailed {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }

    let mut bin_chunk = combined_buffer.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total_length = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();

    let mut out = Vec::with_capacity(total_length);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total_length as u32).to_le_bytes());

    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json_chunk);

    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin_chunk);

    std::fs::write(path, out).map_err(|e| CoreError::SaveFailed {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Concatenates every buffer's bytes into one, 4-byte-aligning each
/// region's start so every bufferView byteOffset stays valid once rebased.
fn combine_buffers(model: &Model) -> (Vec<u8>, Vec<usize>) {
    let mut combined = Vec::new();
    let mut offsets = Vec::with_capacity(model.buffers.len());
    for buffer in &model.buffers {
        while combined.len() % 4 != 0 {
            combined.push(0);
        }
        offsets.push(combined.len());
        combined.extend_from_slice(&buffer.data);
    }
    (combined, offsets)
}

fn texture_count(model: &Model) -> usize {
    let mut max_seen = None;
    let mut note = |t: &Option<asset_io::model::TextureInfo>| {
        if let Some(t) = t {
            max_seen = Some(max_seen.map_or(t.index, |m: usize| m.max(t.index)));
        }
    };
    for material in &model.materials {
        note(&material.base_color_texture);
        note(&material.metallic_roughness_texture);
        note(&material.normal_texture);
        note(&material.occlusion_texture);
        note(&material.emissive_texture);
        note(&material.transmission.texture);
        note(&material.volume.thickness_texture);
        note(&material.clearcoat.texture);
        note(&material.clearcoat.roughness_texture);
        note(&material.clearcoat.normal_texture);
        note(&material.sheen.color_texture);
        note(&material.sheen.roughness_texture);
        note(&material.specular.texture);
        note(&material.specular.color_texture);
        note(&material.anisotropy.texture);
        note(&material.iridescence.texture);
        note(&material.iridescence.thickness_texture);
        note(&material.diffuse_transmission.texture);
        note(&material.diffuse_transmission.color_texture);
        note(&material.spec_gloss.diffuse_texture);
        note(&material.spec_gloss.specular_glossiness_texture);
    }
    max_seen.map(|m| m + 1).unwrap_or(0)
}

fn scene_json(scene: &asset_io::model::Scene) -> Value {
    json!({ "name": scene.name, "nodes": scene.nodes })
}

fn node_json(node: &asset_io::model::Node) -> Value {
    let mut out = serde_json::Map::new();
    out.insert("name".into(), json!(node.name));
    if let Some(mesh) = node.mesh {
        out.insert("mesh".into(), json!(mesh));
    }
    if let Some(skin) = node.skin {
        out.insert("skin".into(), json!(skin));
    }
    if let Some(camera) = node.camera {
        out.insert("camera".into(), json!(camera));
    }
    if !node.children.is_empty() {
        out.insert("children".into(), json!(node.children));
    }
    match node.transform {
        NodeTransform::Matrix(m) => {
            out.insert("matrix".into(), json!(m));
        }
        NodeTransform::Trs {
            translation,
            rotation,
            scale,
        } => {
            if translation != [0.0, 0.0, 0.0] {
                out.insert("translation".into(), json!(translation));
            }
            if rotation != [0.0, 0.0, 0.0, 1.0] {
                out.insert("rotation".into(), json!(rotation));
            }
            if scale != [1.0, 1.0, 1.0] {
                out.insert("scale".into(), json!(scale));
            }
        }
    }

    let mut extensions = serde_json::Map::new();
    if !node.visible {
        extensions.insert("KHR_node_visibility".into(), json!({ "visible": false }));
    }
    if let Some(light) = node.light {
        extensions.insert("KHR_lights_punctual".into(), json!({ "light": light }));
    }
    if let Some(gpu) = &node.gpu_instancing {
        let mut attrs = serde_json::Map::new();
        if let Some(t) = gpu.translation {
            attrs.insert("TRANSLATION".into(), json!(t));
        }
        if let Some(r) = gpu.rotation {
            attrs.insert("ROTATION".into(), json!(r));
        }
        if let Some(s) = gpu.scale {
            attrs.insert("SCALE".into(), json!(s));
        }
        extensions.insert("EXT_mesh_gpu_instancing".into(), json!({ "attributes": attrs }));
    }
    if !extensions.is_empty() {
        out.insert("extensions".into(), Value::Object(extensions));
    }

    if let Some((eye, center, up)) = node.eye_center_up {
        out.insert("extras".into(), json!({ "eye": eye, "center": center, "up": up }));
    }

    Value::Object(out)
}

fn mesh_json(mesh: &asset_io::model::Mesh) -> Value {
    json!({
        "name": mesh.name,
        "weights": if mesh.weights.is_empty() { Value::Null } else { json!(mesh.weights) },
        "primitives": mesh.primitives.iter().map(primitive_json).collect::<Vec<_>>(),
    })
}

fn primitive_json(primitive: &asset_io::model::Primitive) -> Value {
    let mut attributes = serde_json::Map::new();
    let a = &primitive.attributes;
    if let Some(v) = a.position {
        attributes.insert("POSITION".into(), json!(v));
    }
    if let Some(v) = a.normal {
        attributes.insert("NORMAL".into(), json!(v));
    }
    if let Some(v) = a.tangent {
        attributes.insert("TANGENT".into(), json!(v));
    }
    if let Some(v) = a.texcoord_0 {
        attributes.insert("TEXCOORD_0".into(), json!(v));
    }
    if let Some(v) = a.texcoord_1 {
        attributes.insert("TEXCOORD_1".into(), json!(v));
    }
    if let Some(v) = a.color_0 {
        attributes.insert("COLOR_0".into(), json!(v));
    }
    if let Some(v) = a.joints_0 {
        attributes.insert("JOINTS_0".into(), json!(v));
    }
    if let Some(v) = a.weights_0 {
        attributes.insert("WEIGHTS_0".into(), json!(v));
    }

    let mut out = serde_json::Map::new();
    out.insert("attributes".into(), Value::Object(attributes));
    if let Some(indices) = primitive.indices {
        out.insert("indices".into(), json!(indices));
    }
    if let Some(material) = primitive.material {
        out.insert("material".into(), json!(material));
    }
    if !primitive.targets.is_empty() {
        out.insert(
            "targets".into(),
            json!(primitive
                .targets
                .iter()
                .map(|t| {
                    let mut m = serde_json::Map::new();
                    if let Some(v) = t.position {
                        m.insert("POSITION".into(), json!(v));
                    }
                    if let Some(v) = t.normal {
                        m.insert("NORMAL".into(), json!(v));
                    }
                    if let Some(v) = t.tangent {
                        m.insert("TANGENT".into(), json!(v));
                    }
                    Value::Object(m)
                })
                .collect::<Vec<_>>()),
        );
    }
    if !primitive.mappings.is_empty() {
        out.insert(
            "extensions".into(),
            json!({
                "KHR_materials_variants": {
                    "mappings": primitive.mappings.iter().map(|m| json!({
                        "variants": m.variants,
                        "material": m.material,
                    })).collect::<Vec<_>>()
                }
            }),
        );
    }
    Value::Object(out)
}

fn texture_info_json(info: &asset_io::model::TextureInfo) -> Value {
    let mut out = json!({ "index": info.index, "texCoord": info.tex_coord });
    let obj = out.as_object_mut().unwrap();
    if info.scale != 1.0 {
        obj.insert("scale".into(), json!(info.scale));
    }
    if info.strength != 1.0 {
        obj.insert("strength".into(), json!(info.strength));
    }
    out
}

fn material_json(material: &asset_io::model::Material) -> Value {
    let mut out = serde_json::Map::new();
    out.insert("name".into(), json!(material.name));
    out.insert(
        "pbrMetallicRoughness".into(),
        json!({
            "baseColorFactor": material.base_color_factor.to_array(),
            "baseColorTexture": material.base_color_texture.as_ref().map(texture_info_json),
            "metallicFactor": material.metallic_factor,
            "roughnessFactor": material.roughness_factor,
            "metallicRoughnessTexture": material.metallic_roughness_texture.as_ref().map(texture_info_json),
        }),
    );
    if let Some(t) = &material.normal_texture {
        out.insert("normalTexture".into(), texture_info_json(t));
    }
    if let Some(t) = &material.occlusion_texture {
        out.insert("occlusionTexture".into(), texture_info_json(t));
    }
    if material.emissive_factor != glam::Vec3::ZERO {
        out.insert("emissiveFactor".into(), json!(material.emissive_factor.to_array()));
    }
    if let Some(t) = &material.emissive_texture {
        out.insert("emissiveTexture".into(), texture_info_json(t));
    }
    out.insert(
        "alphaMode".into(),
        json!(match material.alpha_mode {
            AlphaMode::Opaque => "OPAQUE",
            AlphaMode::Mask => "MASK",
            AlphaMode::Blend => "BLEND",
        }),
    );
    if material.alpha_mode == AlphaMode::Mask {
        out.insert("alphaCutoff".into(), json!(material.alpha_cutoff));
    }
    if material.double_sided {
        out.insert("doubleSided".into(), json!(true));
    }

    let mut extensions = serde_json::Map::new();
    if material.ior != 1.5 {
        extensions.insert("KHR_materials_ior".into(), json!({ "ior": material.ior }));
    }
    if material.transmission.present {
        extensions.insert(
            "KHR_materials_transmission".into(),
            json!({
                "transmissionFactor": material.transmission.factor,
                "transmissionTexture": material.transmission.texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.volume.present {
        extensions.insert(
            "KHR_materials_volume".into(),
            json!({
                "thicknessFactor": material.volume.thickness_factor,
                "thicknessTexture": material.volume.thickness_texture.as_ref().map(texture_info_json),
                "attenuationDistance": material.volume.attenuation_distance,
                "attenuationColor": material.volume.attenuation_color.to_array(),
            }),
        );
    }
    if material.volume_scatter.present {
        extensions.insert(
            "EXT_materials_volume_scatter".into(),
            json!({
                "scatterDistance": material.volume_scatter.scatter_distance,
                "scatterColor": material.volume_scatter.scatter_color.to_array(),
            }),
        );
    }
    if material.clearcoat.present {
        extensions.insert(
            "KHR_materials_clearcoat".into(),
            json!({
                "clearcoatFactor": material.clearcoat.factor,
                "clearcoatTexture": material.clearcoat.texture.as_ref().map(texture_info_json),
                "clearcoatRoughnessFactor": material.clearcoat.roughness_factor,
                "clearcoatRoughnessTexture": material.clearcoat.roughness_texture.as_ref().map(texture_info_json),
                "clearcoatNormalTexture": material.clearcoat.normal_texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.sheen.present {
        extensions.insert(
            "KHR_materials_sheen".into(),
            json!({
                "sheenColorFactor": material.sheen.color_factor.to_array(),
                "sheenColorTexture": material.sheen.color_texture.as_ref().map(texture_info_json),
                "sheenRoughnessFactor": material.sheen.roughness_factor,
                "sheenRoughnessTexture": material.sheen.roughness_texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.specular.present {
        extensions.insert(
            "KHR_materials_specular".into(),
            json!({
                "specularFactor": material.specular.factor,
                "specularTexture": material.specular.texture.as_ref().map(texture_info_json),
                "specularColorFactor": material.specular.color_factor.to_array(),
                "specularColorTexture": material.specular.color_texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.anisotropy.present {
        extensions.insert(
            "KHR_materials_anisotropy".into(),
            json!({
                "anisotropyStrength": material.anisotropy.strength,
                "anisotropyRotation": material.anisotropy.rotation,
                "anisotropyTexture": material.anisotropy.texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.iridescence.present {
        extensions.insert(
            "KHR_materials_iridescence".into(),
            json!({
                "iridescenceFactor": material.iridescence.factor,
                "iridescenceTexture": material.iridescence.texture.as_ref().map(texture_info_json),
                "iridescenceIor": material.iridescence.ior,
                "iridescenceThicknessMinimum": material.iridescence.thickness_min,
                "iridescenceThicknessMaximum": material.iridescence.thickness_max,
                "iridescenceThicknessTexture": material.iridescence.thickness_texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.dispersion.present {
        extensions.insert(
            "KHR_materials_dispersion".into(),
            json!({ "dispersion": material.dispersion.dispersion }),
        );
    }
    if material.emissive_strength.present {
        extensions.insert(
            "KHR_materials_emissive_strength".into(),
            json!({ "emissiveStrength": material.emissive_strength.emissive_strength }),
        );
    }
    if material.unlit.present {
        extensions.insert("KHR_materials_unlit".into(), json!({}));
    }
    if material.diffuse_transmission.present {
        extensions.insert(
            "KHR_materials_diffuse_transmission".into(),
            json!({
                "diffuseTransmissionFactor": material.diffuse_transmission.factor,
                "diffuseTransmissionTexture": material.diffuse_transmission.texture.as_ref().map(texture_info_json),
                "diffuseTransmissionColorFactor": material.diffuse_transmission.color_factor.to_array(),
                "diffuseTransmissionColorTexture": material.diffuse_transmission.color_texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if material.spec_gloss.present {
        extensions.insert(
            "KHR_materials_pbrSpecularGlossiness".into(),
            json!({
                "diffuseFactor": material.spec_gloss.diffuse_factor.to_array(),
                "diffuseTexture": material.spec_gloss.diffuse_texture.as_ref().map(texture_info_json),
                "specularFactor": material.spec_gloss.specular_factor.to_array(),
                "glossinessFactor": material.spec_gloss.glossiness_factor,
                "specularGlossinessTexture": material.spec_gloss.specular_glossiness_texture.as_ref().map(texture_info_json),
            }),
        );
    }
    if let Some(thin_walled) = material.thin_walled {
        extensions
            .entry("KHR_materials_volume".to_string())
            .or_insert_with(|| json!({}));
        out.entry("extras".to_string())
            .or_insert_with(|| json!({ "thinWalled": thin_walled }));
    }
    if !extensions.is_empty() {
        out.insert("extensions".into(), Value::Object(extensions));
    }

    Value::Object(out)
}

fn accessor_json(accessor: &asset_io::model::Accessor) -> Value {
    let element_type = match accessor.element_type {
        ElementType::Scalar => "SCALAR",
        ElementType::Vec2 => "VEC2",
        ElementType::Vec3 => "VEC3",
        ElementType::Vec4 => "VEC4",
        ElementType::Mat2 => "MAT2",
        ElementType::Mat3 => "MAT3",
        ElementType::Mat4 => "MAT4",
    };
    let component_type = match accessor.component_type {
        asset_io::model::ComponentType::I8 => 5120,
        asset_io::model::ComponentType::U8 => 5121,
        asset_io::model::ComponentType::I16 => 5122,
        asset_io::model::ComponentType::U16 => 5123,
        asset_io::model::ComponentType::U32 => 5125,
        asset_io::model::ComponentType::F32 => 5126,
    };
    let mut out = serde_json::Map::new();
    out.insert("bufferView".into(), json!(accessor.buffer_view));
    out.insert("byteOffset".into(), json!(accessor.byte_offset));
    out.insert("componentType".into(), json!(component_type));
    out.insert("normalized".into(), json!(accessor.normalized));
    out.insert("count".into(), json!(accessor.count));
    out.insert("type".into(), json!(element_type));
    // Sparse accessors are resolved into dense buffer views at load time
    // (§4.A); nothing is ever re-split into a sparse overlay on save.
    Value::Object(out)
}

fn buffer_view_json(bv: &asset_io::model::BufferView, buffer_offsets: &[usize]) -> Value {
    let mut out = serde_json::Map::new();
    out.insert("buffer".into(), json!(0));
    out.insert("byteOffset".into(), json!(buffer_offsets[bv.buffer] + bv.byte_offset));
    out.insert("byteLength".into(), json!(bv.byte_length));
    if let Some(stride) = bv.byte_stride {
        out.insert("byteStride".into(), json!(stride));
    }
    Value::Object(out)
}

fn animation_json(animation: &asset_io::model::Animation) -> Value {
    json!({
        "name": animation.name,
        "samplers": animation.samplers.iter().map(|s| json!({
            "input": s.input,
            "output": s.output,
            "interpolation": match s.interpolation {
                Interpolation::Step => "STEP",
                Interpolation::Linear => "LINEAR",
                Interpolation::CubicSpline => "CUBICSPLINE",
            },
        })).collect::<Vec<_>>(),
        "channels": animation.channels.iter().map(|c| {
            let mut target = serde_json::Map::new();
            target.insert("node".into(), json!(c.target_node));
            if let Some(pointer) = &c.pointer {
                target.insert("path".into(), json!("pointer"));
                target.insert("extensions".into(), json!({
                    "KHR_animation_pointer": { "pointer": pointer }
                }));
            } else {
                target.insert("path".into(), json!(match c.path {
                    AnimationPath::Translation => "translation",
                    AnimationPath::Rotation => "rotation",
                    AnimationPath::Scale => "scale",
                    AnimationPath::Weights => "weights",
                    AnimationPath::Pointer => "translation",
                }));
            }
            json!({ "sampler": c.sampler, "target": target })
        }).collect::<Vec<_>>(),
    })
}

fn camera_json(camera: &asset_io::model::Camera) -> Value {
    match &camera.projection {
        CameraProjection::Perspective { yfov, aspect } => json!({
            "name": camera.name,
            "type": "perspective",
            "znear": camera.znear,
            "zfar": camera.zfar,
            "perspective": { "yfov": yfov, "aspectRatio": aspect },
        }),
        CameraProjection::Orthographic { xmag, ymag } => json!({
            "name": camera.name,
            "type": "orthographic",
            "znear": camera.znear,
            "zfar": camera.zfar,
            "orthographic": { "xmag": xmag, "ymag": ymag },
        }),
    }
}

fn light_json(light: &asset_io::model::Light) -> Value {
    let mut out = json!({
        "name": light.name,
        "type": match light.kind {
            LightKind::Point => "point",
            LightKind::Spot => "spot",
            LightKind::Directional => "directional",
        },
        "color": light.color.to_array(),
        "intensity": light.intensity,
        "range": light.range,
    });
    if light.kind == LightKind::Spot {
        out.as_object_mut().unwrap().insert(
            "spot".into(),
            json!({
                "innerConeAngle": light.inner_cone_angle,
                "outerConeAngle": light.outer_cone_angle,
            }),
        );
    }
    if light.radius != 0.0 {
        out.as_object_mut()
            .unwrap()
            .insert("extras".into(), json!({ "radius": light.radius }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_io::model::*;
    use glam::Vec3;

    fn triangle_model() -> Model {
        let mut data = Vec::new();
        for v in [Vec3::ZERO, Vec3::X, Vec3::Y] {
            data.extend_from_slice(bytemuck::bytes_of(&v.x));
            data.extend_from_slice(bytemuck::bytes_of(&v.y));
            data.extend_from_slice(bytemuck::bytes_of(&v.z));
        }
        Model {
            buffers: vec![Buffer {
                byte_length: data.len(),
                data,
            }],
            buffer_views: vec![BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 36,
                byte_stride: None,
                meshopt: None,
            }],
            accessors: vec![Accessor {
                element_type: ElementType::Vec3,
                component_type: ComponentType::F32,
                count: 3,
                buffer_view: Some(0),
                byte_offset: 0,
                normalized: false,
                sparse: None,
            }],
            materials: vec![Material::default()],
            meshes: vec![Mesh {
                name: None,
                primitives: vec![Primitive {
                    attributes: Attributes {
                        position: Some(0),
                        ..Default::default()
                    },
                    indices: None,
                    material: Some(0),
                    targets: vec![],
                    mappings: vec![],
                    has_draco_compression: false,
                }],
                weights: vec![],
            }],
            nodes: vec![Node {
                mesh: Some(0),
                visible: true,
                ..Default::default()
            }],
            scenes: vec![Scene {
                name: None,
                nodes: vec![0],
            }],
            default_scene: Some(0),
            ..Default::default()
        }
    }

    #[test]
    fn glb_round_trips_through_the_loader() {
        let model = triangle_model();
        let dir = std::env::temp_dir().join(format!("scene-core-save-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triangle.glb");

        save(&model, &path).unwrap();
        let reloaded = asset_io::load_and_prepare(&path).unwrap();

        assert_eq!(reloaded.nodes.len(), 1);
        assert_eq!(reloaded.meshes[0].primitives.len(), 1);
        let positions = asset_io::accessor::read_f32x3(&reloaded, 0).unwrap();
        assert_eq!(positions[1], Vec3::X);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
