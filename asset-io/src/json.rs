//! Raw glTF JSON wire schema (`serde`-deserializable), named after
//! `examples/gltf-rs-gltf/gltf-json`'s field layout. Kept separate from
//! `model` because the wire format needs `Option`-heavy, stringly-typed
//! fields (`"POSITION"`, component-type integer codes, `extensions` grab
//! bags) that the resolved `model::Model` never should.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct Gltf {
    #[serde(default)]
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<JScene>,
    #[serde(default)]
    pub nodes: Vec<JNode>,
    #[serde(default)]
    pub meshes: Vec<JMesh>,
    #[serde(default)]
    pub materials: Vec<JMaterial>,
    #[serde(default)]
    pub accessors: Vec<JAccessor>,
    #[serde(default, rename = "bufferViews")]
    pub buffer_views: Vec<JBufferView>,
    #[serde(default)]
    pub buffers: Vec<JBuffer>,
    #[serde(default)]
    pub images: Vec<JImage>,
    #[serde(default)]
    pub skins: Vec<JSkin>,
    #[serde(default)]
    pub animations: Vec<JAnimation>,
    #[serde(default)]
    pub cameras: Vec<JCamera>,
    #[serde(default, rename = "extensionsUsed")]
    pub extensions_used: Vec<String>,
    #[serde(default, rename = "extensionsRequired")]
    pub extensions_required: Vec<String>,
    #[serde(default)]
    pub extensions: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct JScene {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JNode {
    pub name: Option<String>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default)]
    pub extensions: Value,
    #[serde(default)]
    pub extras: Value,
}

#[derive(Debug, Deserialize)]
pub struct JPrimitive {
    pub attributes: HashMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    #[serde(default)]
    pub targets: Vec<HashMap<String, usize>>,
    #[serde(default)]
    pub extensions: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct JMesh {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<JPrimitive>,
    #[serde(default)]
    pub weights: Vec<f32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JTextureInfo {
    pub index: usize,
    #[serde(default, rename = "texCoord")]
    pub tex_coord: usize,
    #[serde(default = "one")]
    pub scale: f32,
    #[serde(default = "one")]
    pub strength: f32,
    #[serde(default)]
    pub extensions: Value,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Deserialize, Default)]
pub struct JPbrMetallicRoughness {
    #[serde(default = "one_vec4", rename = "baseColorFactor")]
    pub base_color_factor: [f32; 4],
    #[serde(rename = "baseColorTexture")]
    pub base_color_texture: Option<JTextureInfo>,
    #[serde(default = "one", rename = "metallicFactor")]
    pub metallic_factor: f32,
    #[serde(default = "one", rename = "roughnessFactor")]
    pub roughness_factor: f32,
    #[serde(rename = "metallicRoughnessTexture")]
    pub metallic_roughness_texture: Option<JTextureInfo>,
}

fn one_vec4() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

#[derive(Debug, Deserialize)]
pub struct JMaterial {
    pub name: Option<String>,
    #[serde(rename = "pbrMetallicRoughness")]
    pub pbr_metallic_roughness: Option<JPbrMetallicRoughness>,
    #[serde(rename = "normalTexture")]
    pub normal_texture: Option<JTextureInfo>,
    #[serde(rename = "occlusionTexture")]
    pub occlusion_texture: Option<JTextureInfo>,
    #[serde(default, rename = "emissiveFactor")]
    pub emissive_factor: [f32; 3],
    #[serde(rename = "emissiveTexture")]
    pub emissive_texture: Option<JTextureInfo>,
    #[serde(default, rename = "alphaMode")]
    pub alpha_mode: Option<String>,
    #[serde(default = "half", rename = "alphaCutoff")]
    pub alpha_cutoff: f32,
    #[serde(default, rename = "doubleSided")]
    pub double_sided: bool,
    #[serde(default)]
    pub extensions: Value,
}

fn half() -> f32 {
    0.5
}

#[derive(Debug, Deserialize)]
pub struct JAccessor {
    #[serde(rename = "bufferView")]
    pub buffer_view: Option<usize>,
    #[serde(default, rename = "byteOffset")]
    pub byte_offset: usize,
    #[serde(rename = "componentType")]
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub element_type: String,
    pub sparse: Option<JSparse>,
}

#[derive(Debug, Deserialize)]
pub struct JSparse {
    pub count: usize,
    pub indices: JSparseIndices,
    pub values: JSparseValues,
}

#[derive(Debug, Deserialize)]
pub struct JSparseIndices {
    #[serde(rename = "bufferView")]
    pub buffer_view: usize,
    #[serde(default, rename = "byteOffset")]
    pub byte_offset: usize,
    #[serde(rename = "componentType")]
    pub component_type: u32,
}

#[derive(Debug, Deserialize)]
pub struct JSparseValues {
    #[serde(rename = "bufferView")]
    pub buffer_view: usize,
    #[serde(default, rename = "byteOffset")]
    pub byte_offset: usize,
}

#[derive(Debug, Deserialize)]
pub struct JBufferView {
    pub buffer: usize,
    #[serde(default, rename = "byteOffset")]
    pub byte_offset: usize,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
    #[serde(rename = "byteStride")]
    pub byte_stride: Option<usize>,
    #[serde(default)]
    pub extensions: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct JBuffer {
    pub uri: Option<String>,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct JImage {
    pub uri: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "bufferView")]
    pub buffer_view: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JSkin {
    pub joints: Vec<usize>,
    #[serde(rename = "inverseBindMatrices")]
    pub inverse_bind_matrices: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct JAnimationChannelTarget {
    pub node: Option<usize>,
    pub path: String,
    #[serde(default)]
    pub extensions: Value,
}

#[derive(Debug, Deserialize)]
pub struct JAnimationChannel {
    pub sampler: usize,
    pub target: JAnimationChannelTarget,
}

#[derive(Debug, Deserialize)]
pub struct JAnimationSampler {
    pub input: usize,
    pub output: usize,
    #[serde(default = "linear")]
    pub interpolation: String,
}

fn linear() -> String {
    "LINEAR".to_string()
}

#[derive(Debug, Deserialize, Default)]
pub struct JAnimation {
    pub name: Option<String>,
    #[serde(default)]
    pub samplers: Vec<JAnimationSampler>,
    #[serde(default)]
    pub channels: Vec<JAnimationChannel>,
}

#[derive(Debug, Deserialize)]
pub struct JOrthographic {
    pub xmag: f32,
    pub ymag: f32,
}

#[derive(Debug, Deserialize)]
pub struct JPerspective {
    pub yfov: f32,
    pub aspect: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct JCamera {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub znear: f32,
    pub zfar: Option<f32>,
    pub orthographic: Option<JOrthographic>,
    pub perspective: Option<JPerspective>,
}

// ---- extension wire structs ----

#[derive(Debug, Deserialize, Default)]
pub struct JLight {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default = "one")]
    pub intensity: f32,
    pub range: Option<f32>,
    pub spot: Option<JSpot>,
    #[serde(default)]
    pub extras: Value,
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Deserialize, Default)]
pub struct JSpot {
    #[serde(default, rename = "innerConeAngle")]
    pub inner_cone_angle: f32,
    #[serde(default = "quarter_pi", rename = "outerConeAngle")]
    pub outer_cone_angle: f32,
}

fn quarter_pi() -> f32 {
    std::f32::consts::FRAC_PI_4
}

#[derive(Debug, Deserialize, Default)]
pub struct JLightsPunctual {
    #[serde(default)]
    pub lights: Vec<JLight>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JVariants {
    #[serde(default)]
    pub variants: Vec<JVariantName>,
}

#[derive(Debug, Deserialize)]
pub struct JVariantName {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JMapping {
    pub variants: Vec<usize>,
    pub material: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct JVariantsPrimitiveExt {
    #[serde(default)]
    pub mappings: Vec<JMapping>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JGpuInstancing {
    #[serde(default)]
    pub attributes: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
pub struct JMeshoptCompression {
    pub buffer: usize,
    #[serde(default, rename = "byteOffset")]
    pub byte_offset: usize,
    #[serde(rename = "byteLength")]
    pub byte_length: usize,
    #[serde(rename = "byteStride")]
    pub byte_stride: usize,
    pub count: usize,
    pub mode: String,
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JTextureTransform {
    #[serde(default)]
    pub offset: [f32; 2],
    #[serde(default = "one_vec2")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub rotation: f32,
}

fn one_vec2() -> [f32; 2] {
    [1.0, 1.0]
}

#[derive(Debug, Deserialize, Default)]
pub struct JTransmission {
    #[serde(default, rename = "transmissionFactor")]
    pub transmission_factor: f32,
    #[serde(rename = "transmissionTexture")]
    pub transmission_texture: Option<JTextureInfo>,
}

#[derive(Debug, Deserialize)]
pub struct JVolume {
    #[serde(default, rename = "thicknessFactor")]
    pub thickness_factor: f32,
    #[serde(rename = "thicknessTexture")]
    pub thickness_texture: Option<JTextureInfo>,
    #[serde(default = "inf", rename = "attenuationDistance")]
    pub attenuation_distance: f32,
    #[serde(default = "white", rename = "attenuationColor")]
    pub attenuation_color: [f32; 3],
}

fn inf() -> f32 {
    f32::INFINITY
}

impl Default for JVolume {
    fn default() -> Self {
        Self {
            thickness_factor: 0.0,
            thickness_texture: None,
            attenuation_distance: f32::INFINITY,
            attenuation_color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct JVolumeScatter {
    #[serde(default, rename = "scatterDistance")]
    pub scatter_distance: f32,
    #[serde(default = "white", rename = "scatterColor")]
    pub scatter_color: [f32; 3],
}

#[derive(Debug, Deserialize, Default)]
pub struct JClearcoat {
    #[serde(default, rename = "clearcoatFactor")]
    pub clearcoat_factor: f32,
    #[serde(rename = "clearcoatTexture")]
    pub clearcoat_texture: Option<JTextureInfo>,
    #[serde(default, rename = "clearcoatRoughnessFactor")]
    pub clearcoat_roughness_factor: f32,
    #[serde(rename = "clearcoatRoughnessTexture")]
    pub clearcoat_roughness_texture: Option<JTextureInfo>,
    #[serde(rename = "clearcoatNormalTexture")]
    pub clearcoat_normal_texture: Option<JTextureInfo>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JSheen {
    #[serde(default, rename = "sheenColorFactor")]
    pub sheen_color_factor: [f32; 3],
    #[serde(rename = "sheenColorTexture")]
    pub sheen_color_texture: Option<JTextureInfo>,
    #[serde(default, rename = "sheenRoughnessFactor")]
    pub sheen_roughness_factor: f32,
    #[serde(rename = "sheenRoughnessTexture")]
    pub sheen_roughness_texture: Option<JTextureInfo>,
}

#[derive(Debug, Deserialize)]
pub struct JSpecular {
    #[serde(default = "one", rename = "specularFactor")]
    pub specular_factor: f32,
    #[serde(rename = "specularTexture")]
    pub specular_texture: Option<JTextureInfo>,
    #[serde(default = "white", rename = "specularColorFactor")]
    pub specular_color_factor: [f32; 3],
    #[serde(rename = "specularColorTexture")]
    pub specular_color_texture: Option<JTextureInfo>,
}

impl Default for JSpecular {
    fn default() -> Self {
        Self {
            specular_factor: 1.0,
            specular_texture: None,
            specular_color_factor: [1.0, 1.0, 1.0],
            specular_color_texture: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct JAnisotropy {
    #[serde(default, rename = "anisotropyStrength")]
    pub anisotropy_strength: f32,
    #[serde(default, rename = "anisotropyRotation")]
    pub anisotropy_rotation: f32,
    #[serde(rename = "anisotropyTexture")]
    pub anisotropy_texture: Option<JTextureInfo>,
}

#[derive(Debug, Deserialize)]
pub struct JIridescence {
    #[serde(default, rename = "iridescenceFactor")]
    pub iridescence_factor: f32,
    #[serde(rename = "iridescenceTexture")]
    pub iridescence_texture: Option<JTextureInfo>,
    #[serde(default = "iridescence_ior_default", rename = "iridescenceIor")]
    pub iridescence_ior: f32,
    #[serde(
        default = "thickness_min_default",
        rename = "iridescenceThicknessMinimum"
    )]
    pub iridescence_thickness_minimum: f32,
    #[serde(
        default = "thickness_max_default",
        rename = "iridescenceThicknessMaximum"
    )]
    pub iridescence_thickness_maximum: f32,
    #[serde(rename = "iridescenceThicknessTexture")]
    pub iridescence_thickness_texture: Option<JTextureInfo>,
}

fn iridescence_ior_default() -> f32 {
    1.3
}
fn thickness_min_default() -> f32 {
    100.0
}
fn thickness_max_default() -> f32 {
    400.0
}

#[derive(Debug, Deserialize, Default)]
pub struct JDispersion {
    #[serde(default)]
    pub dispersion: f32,
}

#[derive(Debug, Deserialize)]
pub struct JEmissiveStrength {
    #[serde(rename = "emissiveStrength")]
    pub emissive_strength: f32,
}

#[derive(Debug, Deserialize, Default)]
pub struct JUnlit {}

#[derive(Debug, Deserialize, Default)]
pub struct JDiffuseTransmission {
    #[serde(default, rename = "diffuseTransmissionFactor")]
    pub diffuse_transmission_factor: f32,
    #[serde(rename = "diffuseTransmissionTexture")]
    pub diffuse_transmission_texture: Option<JTextureInfo>,
    #[serde(default = "white", rename = "diffuseTransmissionColorFactor")]
    pub diffuse_transmission_color_factor: [f32; 3],
    #[serde(rename = "diffuseTransmissionColorTexture")]
    pub diffuse_transmission_color_texture: Option<JTextureInfo>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JSpecGloss {
    #[serde(default = "one_vec4", rename = "diffuseFactor")]
    pub diffuse_factor: [f32; 4],
    #[serde(rename = "diffuseTexture")]
    pub diffuse_texture: Option<JTextureInfo>,
    #[serde(default = "white", rename = "specularFactor")]
    pub specular_factor: [f32; 3],
    #[serde(default = "one", rename = "glossinessFactor")]
    pub glossiness_factor: f32,
    #[serde(rename = "specularGlossinessTexture")]
    pub specular_glossiness_texture: Option<JTextureInfo>,
}

#[derive(Debug, Deserialize)]
pub struct JDraco {
    #[serde(rename = "bufferView")]
    pub buffer_view: usize,
    pub attributes: HashMap<String, usize>,
}
