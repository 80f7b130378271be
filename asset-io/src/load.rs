//! glTF / GLB ingestion: §4.A "Asset Decoder". Parses either a standalone
//! `.gltf` + external buffers or a single `.glb` container, converts the wire
//! JSON (`json` module) into the domain model (`model` module), and rejects
//! assets that require an extension we don't implement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};

use crate::error::{AssetError, Result};
use crate::json::*;
use crate::model::*;

/// Extensions this decoder understands well enough that requiring them is
/// fine. Anything in `extensionsRequired` outside this set is a hard error.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "KHR_materials_pbrSpecularGlossiness",
    "KHR_materials_unlit",
    "KHR_materials_transmission",
    "KHR_materials_volume",
    "EXT_materials_volume_scatter",
    "KHR_materials_clearcoat",
    "KHR_materials_sheen",
    "KHR_materials_specular",
    "KHR_materials_anisotropy",
    "KHR_materials_iridescence",
    "KHR_materials_dispersion",
    "KHR_materials_emissive_strength",
    "KHR_materials_diffuse_transmission",
    "KHR_materials_variants",
    "KHR_lights_punctual",
    "KHR_texture_transform",
    "KHR_mesh_quantization",
    "KHR_animation_pointer",
    "KHR_node_visibility",
    "EXT_mesh_gpu_instancing",
    "EXT_meshopt_compression",
    // Flagged, not decompressed; see `Primitive::has_draco_compression`.
    "KHR_draco_mesh_compression",
];

const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

/// Loads and fully resolves a glTF 2.0 asset, following `.bin`/data-URI
/// buffers and validating required extensions. Does not decode images or
/// apply meshopt/compaction — those are separate passes (`meshopt`,
/// `compact`) a caller runs afterward.
pub fn load(path: &Path) -> Result<Model> {
    let bytes = std::fs::read(path).map_err(|e| AssetError::AssetParseFailed {
        path: path.to_path_buf(),
        source: anyhow::Error::new(e).context("reading asset file"),
    })?;

    let (gltf, glb_bin) = if bytes.len() >= 4 && u32::from_le_bytes(bytes[0..4].try_into().unwrap()) == GLB_MAGIC {
        parse_glb(path, &bytes)?
    } else {
        let text = std::str::from_utf8(&bytes).map_err(|e| AssetError::AssetParseFailed {
            path: path.to_path_buf(),
            source: anyhow::Error::new(e).context("asset is neither valid GLB nor UTF-8 JSON"),
        })?;
        let gltf: Gltf = serde_json::from_str(text).map_err(|e| AssetError::AssetParseFailed {
            path: path.to_path_buf(),
            source: anyhow::Error::new(e).context("parsing .gltf JSON"),
        })?;
        (gltf, None)
    };

    for ext in &gltf.extensions_required {
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AssetError::UnsupportedRequiredExtension {
                extension: ext.clone(),
            });
        }
    }
    for ext in &gltf.extensions_used {
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            log::warn!("asset uses unrecognized extension {ext:?}, ignoring");
        }
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let buffers = gltf
        .buffers
        .iter()
        .enumerate()
        .map(|(i, b)| load_buffer(base_dir, i, b, glb_bin.as_deref()))
        .collect::<Result<Vec<_>>>()?;

    let buffer_views = gltf
        .buffer_views
        .iter()
        .map(convert_buffer_view)
        .collect::<Vec<_>>();

    let accessors = gltf
        .accessors
        .iter()
        .enumerate()
        .map(|(i, a)| convert_accessor(i, a))
        .collect::<Result<Vec<_>>>()?;

    let image_buffer_views = gltf
        .images
        .iter()
        .filter_map(|img| {
            img.buffer_view
                .map(|bv| (bv, img.mime_type.clone().unwrap_or_default()))
        })
        .collect();

    let mut variant_names = Vec::new();
    if let Some(v) = gltf.extensions.get("KHR_materials_variants") {
        if let Ok(parsed) = serde_json::from_value::<JVariants>(v.clone()) {
            variant_names = parsed.variants.into_iter().map(|v| v.name).collect();
        }
    }

    let mut lights = Vec::new();
    if let Some(v) = gltf.extensions.get("KHR_lights_punctual") {
        if let Ok(parsed) = serde_json::from_value::<JLightsPunctual>(v.clone()) {
            lights = parsed.lights.into_iter().map(convert_light).collect();
        }
    }

    let materials = gltf.materials.iter().map(convert_material).collect();
    let meshes = gltf
        .meshes
        .iter()
        .enumerate()
        .map(|(i, m)| convert_mesh(i, m))
        .collect::<Result<Vec<_>>>()?;
    let nodes = gltf.nodes.iter().map(convert_node).collect();
    let scenes = gltf
        .scenes
        .iter()
        .map(|s| Scene {
            name: s.name.clone(),
            nodes: s.nodes.clone(),
        })
        .collect();
    let skins = gltf
        .skins
        .iter()
        .map(|s| Skin {
            joints: s.joints.clone(),
            inverse_bind_matrices: s.inverse_bind_matrices,
        })
        .collect();
    let animations = gltf.animations.iter().map(convert_animation).collect();
    let cameras = gltf.cameras.iter().map(convert_camera).collect();

    Ok(Model {
        scenes,
        default_scene: gltf.scene,
        nodes,
        meshes,
        materials,
        accessors,
        buffer_views,
        buffers,
        skins,
        animations,
        lights,
        cameras,
        variants: MaterialVariants { names: variant_names },
        image_buffer_views,
        extensions_used: gltf.extensions_used,
        extensions_required: gltf.extensions_required,
    })
}

fn parse_glb(path: &Path, bytes: &[u8]) -> Result<(Gltf, Option<Vec<u8>>)> {
    let bad = || AssetError::AssetParseFailed {
        path: path.to_path_buf(),
        source: anyhow::anyhow!("truncated or malformed GLB container"),
    };
    if bytes.len() < 12 {
        return Err(bad());
    }
    let total_length = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    if bytes.len() < total_length {
        return Err(bad());
    }

    let mut offset = 12usize;
    let mut json_chunk: Option<&[u8]> = None;
    let mut bin_chunk: Option<&[u8]> = None;

    while offset + 8 <= total_length {
        let chunk_length = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        let chunk_type = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap());
        let data_start = offset + 8;
        let data_end = data_start + chunk_length;
        if data_end > total_length {
            return Err(bad());
        }
        let data = &bytes[data_start..data_end];
        match chunk_type {
            GLB_CHUNK_JSON => json_chunk = Some(data),
            GLB_CHUNK_BIN => bin_chunk = Some(data),
            _ => {}
        }
        offset = data_end;
    }

    let json_chunk = json_chunk.ok_or_else(bad)?;
    let text = std::str::from_utf8(json_chunk).map_err(|e| AssetError::AssetParseFailed {
        path: path.to_path_buf(),
        source: anyhow::Error::new(e).context("GLB JSON chunk is not valid UTF-8"),
    })?;
    let gltf: Gltf = serde_json::from_str(text).map_err(|e| AssetError::AssetParseFailed {
        path: path.to_path_buf(),
        source: anyhow::Error::new(e).context("parsing GLB JSON chunk"),
    })?;
    Ok((gltf, bin_chunk.map(|b| b.to_vec())))
}

fn load_buffer(base_dir: &Path, index: usize, buffer: &JBuffer, glb_bin: Option<&[u8]>) -> Result<Buffer> {
    let data = match &buffer.uri {
        None => glb_bin
            .ok_or_else(|| AssetError::AssetParseFailed {
                path: base_dir.to_path_buf(),
                source: anyhow::anyhow!("buffer {index} has no uri and asset is not GLB"),
            })?
            .to_vec(),
        Some(uri) if uri.starts_with("data:") => decode_data_uri(uri).map_err(|reason| {
            AssetError::InvalidAccessor {
                accessor: index,
                reason,
            }
        })?,
        Some(uri) => {
            let decoded = percent_decode(uri);
            let path = resolve_path(base_dir, &decoded);
            std::fs::read(&path).map_err(|e| AssetError::AssetParseFailed {
                path,
                source: anyhow::Error::new(e).context("reading external buffer"),
            })?
        }
    };
    Ok(Buffer {
        byte_length: buffer.byte_length,
        data,
    })
}

fn resolve_path(base_dir: &Path, uri: &str) -> PathBuf {
    base_dir.join(uri)
}

fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte as char);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn decode_data_uri(uri: &str) -> std::result::Result<Vec<u8>, String> {
    let comma = uri.find(',').ok_or("malformed data uri")?;
    let header = &uri[5..comma];
    let payload = &uri[comma + 1..];
    if header.ends_with(";base64") {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| e.to_string())
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

fn convert_buffer_view(bv: &JBufferView) -> BufferView {
    let meshopt = bv
        .extensions
        .get("EXT_meshopt_compression")
        .and_then(|v| serde_json::from_value::<JMeshoptCompression>(v.clone()).ok())
        .map(|m| MeshoptCompression {
            buffer: m.buffer,
            byte_offset: m.byte_offset,
            byte_length: m.byte_length,
            byte_stride: m.byte_stride,
            count: m.count,
            mode: match m.mode.as_str() {
                "TRIANGLES" => MeshoptMode::Triangles,
                "INDICES" => MeshoptMode::Indices,
                _ => MeshoptMode::Attributes,
            },
            filter: match m.filter.as_deref() {
                Some("OCTAHEDRAL") => MeshoptFilter::Octahedral,
                Some("QUATERNION") => MeshoptFilter::Quaternion,
                Some("EXPONENTIAL") => MeshoptFilter::Exponential,
                _ => MeshoptFilter::None,
            },
        });
    BufferView {
        buffer: bv.buffer,
        byte_offset: bv.byte_offset,
        byte_length: bv.byte_length,
        byte_stride: bv.byte_stride,
        meshopt,
    }
}

fn convert_accessor(index: usize, a: &JAccessor) -> Result<Accessor> {
    let element_type = ElementType::from_gltf_str(&a.element_type).ok_or_else(|| AssetError::InvalidAccessor {
        accessor: index,
        reason: format!("unknown accessor type {:?}", a.element_type),
    })?;
    let component_type = ComponentType::from_gltf_code(a.component_type).ok_or_else(|| AssetError::InvalidAccessor {
        accessor: index,
        reason: format!("unknown component type code {}", a.component_type),
    })?;
    let sparse = a.sparse.as_ref().map(|s| {
        let sparse_component_type = ComponentType::from_gltf_code(s.indices.component_type)
            .unwrap_or(ComponentType::U32);
        Sparse {
            count: s.count,
            indices: SparseIndices {
                count: s.count,
                buffer_view: s.indices.buffer_view,
                byte_offset: s.indices.byte_offset,
                component_type: sparse_component_type,
            },
            values: SparseValues {
                buffer_view: s.values.buffer_view,
                byte_offset: s.values.byte_offset,
            },
        }
    });
    Ok(Accessor {
        element_type,
        component_type,
        count: a.count,
        buffer_view: a.buffer_view,
        byte_offset: a.byte_offset,
        normalized: a.normalized,
        sparse,
    })
}

fn convert_texture_info(t: &JTextureInfo) -> TextureInfo {
    let transform = t
        .extensions
        .get("KHR_texture_transform")
        .and_then(|v| serde_json::from_value::<JTextureTransform>(v.clone()).ok())
        .map(|t| TextureTransform {
            offset: t.offset,
            scale: t.scale,
            rotation: t.rotation,
        });
    TextureInfo {
        index: t.index,
        tex_coord: t.tex_coord,
        scale: t.scale,
        strength: t.strength,
        transform,
    }
}

fn opt_tex(t: &Option<JTextureInfo>) -> Option<TextureInfo> {
    t.as_ref().map(convert_texture_info)
}

fn convert_material(m: &JMaterial) -> Material {
    let mut mat = Material {
        name: m.name.clone(),
        alpha_mode: match m.alpha_mode.as_deref() {
            Some("MASK") => AlphaMode::Mask,
            Some("BLEND") => AlphaMode::Blend,
            _ => AlphaMode::Opaque,
        },
        alpha_cutoff: m.alpha_cutoff,
        double_sided: m.double_sided,
        normal_texture: opt_tex(&m.normal_texture),
        occlusion_texture: opt_tex(&m.occlusion_texture),
        emissive_factor: Vec3::from(m.emissive_factor),
        emissive_texture: opt_tex(&m.emissive_texture),
        ..Default::default()
    };

    if let Some(pbr) = &m.pbr_metallic_roughness {
        mat.base_color_factor = Vec4::from(pbr.base_color_factor);
        mat.base_color_texture = opt_tex(&pbr.base_color_texture);
        mat.metallic_factor = pbr.metallic_factor;
        mat.roughness_factor = pbr.roughness_factor;
        mat.metallic_roughness_texture = opt_tex(&pbr.metallic_roughness_texture);
    }

    macro_rules! ext {
        ($key:literal, $ty:ty, |$v:ident| $body:expr) => {
            if let Some(raw) = m.extensions.get($key) {
                if let Ok($v) = serde_json::from_value::<$ty>(raw.clone()) {
                    $body
                } else {
                    log::warn!("material {:?}: malformed {} extension", m.name, $key);
                }
            }
        };
    }

    ext!("KHR_materials_transmission", JTransmission, |v| {
        mat.transmission = TransmissionExtension {
            present: true,
            factor: v.transmission_factor,
            texture: opt_tex(&v.transmission_texture),
        };
    });
    ext!("KHR_materials_volume", JVolume, |v| {
        mat.volume = VolumeExtension {
            present: true,
            thickness_factor: v.thickness_factor,
            thickness_texture: opt_tex(&v.thickness_texture),
            attenuation_distance: v.attenuation_distance,
            attenuation_color: Vec3::from(v.attenuation_color),
        };
    });
    ext!("EXT_materials_volume_scatter", JVolumeScatter, |v| {
        mat.volume_scatter = VolumeScatterExtension {
            present: true,
            scatter_distance: v.scatter_distance,
            scatter_color: Vec3::from(v.scatter_color),
        };
    });
    ext!("KHR_materials_clearcoat", JClearcoat, |v| {
        mat.clearcoat = ClearcoatExtension {
            present: true,
            factor: v.clearcoat_factor,
            texture: opt_tex(&v.clearcoat_texture),
            roughness_factor: v.clearcoat_roughness_factor,
            roughness_texture: opt_tex(&v.clearcoat_roughness_texture),
            normal_texture: opt_tex(&v.clearcoat_normal_texture),
        };
    });
    ext!("KHR_materials_sheen", JSheen, |v| {
        mat.sheen = SheenExtension {
            present: true,
            color_factor: Vec3::from(v.sheen_color_factor),
            color_texture: opt_tex(&v.sheen_color_texture),
            roughness_factor: v.sheen_roughness_factor,
            roughness_texture: opt_tex(&v.sheen_roughness_texture),
        };
    });
    ext!("KHR_materials_specular", JSpecular, |v| {
        mat.specular = SpecularExtension {
            present: true,
            factor: v.specular_factor,
            texture: opt_tex(&v.specular_texture),
            color_factor: Vec3::from(v.specular_color_factor),
            color_texture: opt_tex(&v.specular_color_texture),
        };
    });
    ext!("KHR_materials_anisotropy", JAnisotropy, |v| {
        mat.anisotropy = AnisotropyExtension {
            present: true,
            strength: v.anisotropy_strength,
            rotation: v.anisotropy_rotation,
            texture: opt_tex(&v.anisotropy_texture),
        };
    });
    ext!("KHR_materials_iridescence", JIridescence, |v| {
        mat.iridescence = IridescenceExtension {
            present: true,
            factor: v.iridescence_factor,
            texture: opt_tex(&v.iridescence_texture),
            ior: v.iridescence_ior,
            thickness_min: v.iridescence_thickness_minimum,
            thickness_max: v.iridescence_thickness_maximum,
            thickness_texture: opt_tex(&v.iridescence_thickness_texture),
        };
    });
    ext!("KHR_materials_dispersion", JDispersion, |v| {
        mat.dispersion = DispersionExtension {
            present: true,
            dispersion: v.dispersion,
        };
    });
    ext!("KHR_materials_emissive_strength", JEmissiveStrength, |v| {
        mat.emissive_strength = EmissiveStrengthExtension {
            present: true,
            emissive_strength: v.emissive_strength,
        };
    });
    if m.extensions.get("KHR_materials_unlit").is_some() {
        mat.unlit = UnlitExtension { present: true };
    }
    ext!("KHR_materials_diffuse_transmission", JDiffuseTransmission, |v| {
        mat.diffuse_transmission = DiffuseTransmissionExtension {
            present: true,
            factor: v.diffuse_transmission_factor,
            texture: opt_tex(&v.diffuse_transmission_texture),
            color_factor: Vec3::from(v.diffuse_transmission_color_factor),
            color_texture: opt_tex(&v.diffuse_transmission_color_texture),
        };
    });
    ext!("KHR_materials_pbrSpecularGlossiness", JSpecGloss, |v| {
        mat.spec_gloss = SpecGlossExtension {
            present: true,
            diffuse_factor: Vec4::from(v.diffuse_factor),
            diffuse_texture: opt_tex(&v.diffuse_texture),
            specular_factor: Vec3::from(v.specular_factor),
            glossiness_factor: v.glossiness_factor,
            specular_glossiness_texture: opt_tex(&v.specular_glossiness_texture),
        };
    });

    // KHR_materials_ior shares the material's extensions object.
    if let Some(ior) = m
        .extensions
        .get("KHR_materials_ior")
        .and_then(|v| v.get("ior"))
        .and_then(|v| v.as_f64())
    {
        mat.ior = ior as f32;
    }

    mat
}

fn attribute_index(attrs: &HashMap<String, usize>, key: &str) -> Option<usize> {
    attrs.get(key).copied()
}

fn convert_attributes(attrs: &HashMap<String, usize>) -> Attributes {
    Attributes {
        position: attribute_index(attrs, "POSITION"),
        normal: attribute_index(attrs, "NORMAL"),
        tangent: attribute_index(attrs, "TANGENT"),
        texcoord_0: attribute_index(attrs, "TEXCOORD_0"),
        texcoord_1: attribute_index(attrs, "TEXCOORD_1"),
        color_0: attribute_index(attrs, "COLOR_0"),
        joints_0: attribute_index(attrs, "JOINTS_0"),
        weights_0: attribute_index(attrs, "WEIGHTS_0"),
    }
}

fn convert_mesh(mesh_index: usize, m: &JMesh) -> Result<Mesh> {
    let primitives = m
        .primitives
        .iter()
        .enumerate()
        .map(|(prim_index, p)| {
            let has_draco_compression = p.extensions.get("KHR_draco_mesh_compression").is_some();
            if has_draco_compression {
                log::warn!(
                    "mesh {mesh_index} primitive {prim_index} uses KHR_draco_mesh_compression; decompression is not implemented, primitive will be skipped downstream"
                );
            }
            let mappings = p
                .extensions
                .get("KHR_materials_variants")
                .and_then(|v| serde_json::from_value::<JVariantsPrimitiveExt>(v.clone()).ok())
                .map(|ext| {
                    ext.mappings
                        .into_iter()
                        .map(|mp| VariantMapping {
                            variants: mp.variants,
                            material: mp.material,
                        })
                        .collect()
                })
                .unwrap_or_default();

            Primitive {
                attributes: convert_attributes(&p.attributes),
                indices: p.indices,
                material: p.material,
                targets: p
                    .targets
                    .iter()
                    .map(|t| MorphTarget {
                        position: attribute_index(t, "POSITION"),
                        normal: attribute_index(t, "NORMAL"),
                        tangent: attribute_index(t, "TANGENT"),
                    })
                    .collect(),
                mappings,
                has_draco_compression,
            }
        })
        .collect();

    Ok(Mesh {
        name: m.name.clone(),
        primitives,
        weights: m.weights.clone(),
    })
}

fn convert_light(l: JLight) -> Light {
    let spot = l.spot.unwrap_or_default();
    Light {
        name: l.name,
        kind: match l.kind.as_str() {
            "spot" => LightKind::Spot,
            "directional" => LightKind::Directional,
            _ => LightKind::Point,
        },
        color: Vec3::from(l.color),
        intensity: l.intensity,
        range: l.range,
        inner_cone_angle: spot.inner_cone_angle,
        outer_cone_angle: spot.outer_cone_angle,
        radius: 0.0,
    }
}

fn convert_node(n: &JNode) -> Node {
    let transform = if let Some(m) = n.matrix {
        NodeTransform::Matrix(m)
    } else {
        NodeTransform::Trs {
            translation: n.translation.unwrap_or([0.0, 0.0, 0.0]),
            rotation: n.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]),
            scale: n.scale.unwrap_or([1.0, 1.0, 1.0]),
        }
    };

    let visible = n
        .extensions
        .get("KHR_node_visibility")
        .and_then(|v| v.get("visible"))
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    let gpu_instancing = n
        .extensions
        .get("EXT_mesh_gpu_instancing")
        .and_then(|v| serde_json::from_value::<JGpuInstancing>(v.clone()).ok())
        .map(|ext| GpuInstancing {
            translation: attribute_index(&ext.attributes, "TRANSLATION"),
            rotation: attribute_index(&ext.attributes, "ROTATION"),
            scale: attribute_index(&ext.attributes, "SCALE"),
        });

    let light = n
        .extensions
        .get("KHR_lights_punctual")
        .and_then(|v| v.get("light"))
        .and_then(|v| v.as_u64())
        .map(|i| i as usize);

    let eye_center_up = parse_eye_center_up(&n.extras);

    Node {
        name: n.name.clone(),
        mesh: n.mesh,
        skin: n.skin,
        light,
        camera: n.camera,
        transform,
        children: n.children.clone(),
        visible,
        gpu_instancing,
        eye_center_up,
    }
}

/// `original_source/src/gltf_camera_utils.hpp` stores an authored look-at
/// override as node extras rather than a real extension; mirrored here as a
/// best-effort read of an `{"eye":[..], "center":[..], "up":[..]}` extra.
fn parse_eye_center_up(extras: &serde_json::Value) -> Option<([f32; 3], [f32; 3], [f32; 3])> {
    let read = |key: &str| -> Option<[f32; 3]> {
        let arr = extras.get(key)?.as_array()?;
        if arr.len() != 3 {
            return None;
        }
        let mut out = [0.0f32; 3];
        for (i, v) in arr.iter().enumerate() {
            out[i] = v.as_f64()? as f32;
        }
        Some(out)
    };
    Some((read("eye")?, read("center")?, read("up")?))
}

fn convert_animation(a: &JAnimation) -> Animation {
    let samplers: Vec<AnimationSampler> = a
        .samplers
        .iter()
        .map(|s| AnimationSampler {
            input: s.input,
            output: s.output,
            interpolation: match s.interpolation.as_str() {
                "STEP" => Interpolation::Step,
                "CUBICSPLINE" => Interpolation::CubicSpline,
                _ => Interpolation::Linear,
            },
        })
        .collect();

    let channels = a
        .channels
        .iter()
        .map(|c| {
            let pointer = c
                .target
                .extensions
                .get("KHR_animation_pointer")
                .and_then(|v| v.get("pointer"))
                .and_then(|v| v.as_str())
                .map(String::from);
            let path = if pointer.is_some() {
                AnimationPath::Pointer
            } else {
                match c.target.path.as_str() {
                    "rotation" => AnimationPath::Rotation,
                    "scale" => AnimationPath::Scale,
                    "weights" => AnimationPath::Weights,
                    _ => AnimationPath::Translation,
                }
            };
            AnimationChannel {
                sampler: c.sampler,
                target_node: c.target.node,
                path,
                pointer,
            }
        })
        .collect();

    Animation {
        name: a.name.clone(),
        samplers,
        channels,
        start_time: 0.0,
        end_time: 0.0,
        current_time: 0.0,
    }
}

fn convert_camera(c: &JCamera) -> Camera {
    let projection = match c.kind.as_str() {
        "orthographic" => {
            let o = c.orthographic.as_ref();
            CameraProjection::Orthographic {
                xmag: o.map(|o| o.xmag).unwrap_or(1.0),
                ymag: o.map(|o| o.ymag).unwrap_or(1.0),
            }
        }
        _ => {
            let p = c.perspective.as_ref();
            CameraProjection::Perspective {
                yfov: p.map(|p| p.yfov).unwrap_or(std::f32::consts::FRAC_PI_4),
                aspect: p.and_then(|p| p.aspect),
            }
        }
    };
    Camera {
        name: c.name.clone(),
        znear: c.znear,
        zfar: c.zfar,
        projection,
    }
}
