//! §3 DATA MODEL. These types are close to the glTF JSON schema (grounded in
//! the field names used by `examples/gltf-rs-gltf/gltf-json`) but already
//! resolved to plain Rust values: indices are `usize`/`Option<usize>` ("-1
//! denotes absence" becomes `None`), and `Buffer` holds owned bytes rather
//! than a URI.

use glam::{Quat, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn num_components(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 => 4,
            ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }

    pub fn from_gltf_str(s: &str) -> Option<Self> {
        Some(match s {
            "SCALAR" => ElementType::Scalar,
            "VEC2" => ElementType::Vec2,
            "VEC3" => ElementType::Vec3,
            "VEC4" => ElementType::Vec4,
            "MAT2" => ElementType::Mat2,
            "MAT3" => ElementType::Mat3,
            "MAT4" => ElementType::Mat4,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }

    pub fn from_gltf_code(code: u32) -> Option<Self> {
        Some(match code {
            5120 => ComponentType::I8,
            5121 => ComponentType::U8,
            5122 => ComponentType::I16,
            5123 => ComponentType::U16,
            5125 => ComponentType::U32,
            5126 => ComponentType::F32,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SparseIndices {
    pub count: usize,
    pub buffer_view: usize,
    pub byte_offset: usize,
    pub component_type: ComponentType,
}

#[derive(Debug, Clone)]
pub struct SparseValues {
    pub buffer_view: usize,
    pub byte_offset: usize,
}

#[derive(Debug, Clone)]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub element_type: ElementType,
    pub component_type: ComponentType,
    pub count: usize,
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub normalized: bool,
    pub sparse: Option<Sparse>,
}

#[derive(Debug, Clone, Default)]
pub struct MeshoptCompression {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: usize,
    pub count: usize,
    pub mode: MeshoptMode,
    pub filter: MeshoptFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshoptMode {
    #[default]
    Attributes,
    Triangles,
    Indices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshoptFilter {
    #[default]
    None,
    Octahedral,
    Quaternion,
    Exponential,
}

#[derive(Debug, Clone)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub meshopt: Option<MeshoptCompression>,
}

#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub byte_length: usize,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub position: Option<usize>,
    pub normal: Option<usize>,
    pub tangent: Option<usize>,
    pub texcoord_0: Option<usize>,
    pub texcoord_1: Option<usize>,
    pub color_0: Option<usize>,
    pub joints_0: Option<usize>,
    pub weights_0: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MorphTarget {
    pub position: Option<usize>,
    pub normal: Option<usize>,
    pub tangent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct VariantMapping {
    pub variants: Vec<usize>,
    pub material: usize,
}

#[derive(Debug, Clone)]
pub struct Primitive {
    pub attributes: Attributes,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub targets: Vec<MorphTarget>,
    pub mappings: Vec<VariantMapping>,
    pub has_draco_compression: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

impl Default for AlphaMode {
    fn default() -> Self {
        AlphaMode::Opaque
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextureInfo {
    pub index: usize,
    pub tex_coord: usize,
    pub scale: f32,
    pub strength: f32,
    pub transform: Option<TextureTransform>,
}

impl TextureInfo {
    fn new(index: usize, tex_coord: usize) -> Self {
        Self {
            index,
            tex_coord,
            scale: 1.0,
            strength: 1.0,
            transform: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextureTransform {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
    pub rotation: f32,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransmissionExtension {
    pub present: bool,
    pub factor: f32,
    pub texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct VolumeExtension {
    pub present: bool,
    pub thickness_factor: f32,
    pub thickness_texture: Option<TextureInfo>,
    pub attenuation_distance: f32,
    pub attenuation_color: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct VolumeScatterExtension {
    pub present: bool,
    pub scatter_distance: f32,
    pub scatter_color: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct ClearcoatExtension {
    pub present: bool,
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub roughness_factor: f32,
    pub roughness_texture: Option<TextureInfo>,
    pub normal_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct SheenExtension {
    pub present: bool,
    pub color_factor: Vec3,
    pub color_texture: Option<TextureInfo>,
    pub roughness_factor: f32,
    pub roughness_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone)]
pub struct SpecularExtension {
    pub present: bool,
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub color_factor: Vec3,
    pub color_texture: Option<TextureInfo>,
}

impl Default for SpecularExtension {
    fn default() -> Self {
        Self {
            present: false,
            factor: 1.0,
            texture: None,
            color_factor: Vec3::ONE,
            color_texture: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnisotropyExtension {
    pub present: bool,
    pub strength: f32,
    pub rotation: f32,
    pub texture: Option<TextureInfo>,
}

#[derive(Debug, Clone)]
pub struct IridescenceExtension {
    pub present: bool,
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub ior: f32,
    pub thickness_min: f32,
    pub thickness_max: f32,
    pub thickness_texture: Option<TextureInfo>,
}

impl Default for IridescenceExtension {
    fn default() -> Self {
        Self {
            present: false,
            factor: 0.0,
            texture: None,
            ior: 1.3,
            thickness_min: 100.0,
            thickness_max: 400.0,
            thickness_texture: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispersionExtension {
    pub present: bool,
    pub dispersion: f32,
}

impl Default for DispersionExtension {
    fn default() -> Self {
        Self {
            present: false,
            dispersion: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmissiveStrengthExtension {
    pub present: bool,
    pub emissive_strength: f32,
}

impl Default for EmissiveStrengthExtension {
    fn default() -> Self {
        Self {
            present: false,
            emissive_strength: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnlitExtension {
    pub present: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DiffuseTransmissionExtension {
    pub present: bool,
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub color_factor: Vec3,
    pub color_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone)]
pub struct SpecGlossExtension {
    pub present: bool,
    pub diffuse_factor: Vec4,
    pub diffuse_texture: Option<TextureInfo>,
    pub specular_factor: Vec3,
    pub glossiness_factor: f32,
    pub specular_glossiness_texture: Option<TextureInfo>,
}

impl Default for SpecGlossExtension {
    fn default() -> Self {
        Self {
            present: false,
            diffuse_factor: Vec4::ONE,
            diffuse_texture: None,
            specular_factor: Vec3::ONE,
            glossiness_factor: 1.0,
            specular_glossiness_texture: None,
        }
    }
}

/// The PBR metallic-roughness core plus every typed extension record, each a
/// flat `present: bool` + fields struct (Design Note §9). Also carries
/// `thin_walled`, resolving the open "double-sidedness" question: a distinct
/// flag, falling back to `double_sided` only when the asset has no volume
/// extension.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
    pub normal_texture: Option<TextureInfo>,
    pub occlusion_texture: Option<TextureInfo>,
    pub emissive_factor: Vec3,
    pub emissive_texture: Option<TextureInfo>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub thin_walled: Option<bool>,
    pub ior: f32,
    pub transmission: TransmissionExtension,
    pub volume: VolumeExtension,
    pub volume_scatter: VolumeScatterExtension,
    pub clearcoat: ClearcoatExtension,
    pub sheen: SheenExtension,
    pub specular: SpecularExtension,
    pub anisotropy: AnisotropyExtension,
    pub iridescence: IridescenceExtension,
    pub dispersion: DispersionExtension,
    pub emissive_strength: EmissiveStrengthExtension,
    pub unlit: UnlitExtension,
    pub diffuse_transmission: DiffuseTransmissionExtension,
    pub spec_gloss: SpecGlossExtension,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_factor: Vec3::ZERO,
            emissive_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            thin_walled: None,
            ior: 1.5,
            transmission: Default::default(),
            volume: Default::default(),
            volume_scatter: Default::default(),
            clearcoat: Default::default(),
            sheen: Default::default(),
            specular: Default::default(),
            anisotropy: Default::default(),
            iridescence: Default::default(),
            dispersion: Default::default(),
            emissive_strength: Default::default(),
            unlit: Default::default(),
            diffuse_transmission: Default::default(),
            spec_gloss: Default::default(),
        }
    }
}

impl Material {
    /// Resolves the open design-note question: `thinWalled` is a distinct
    /// flag, only falling back to `doubleSided` when the asset sets neither
    /// the volume extension nor an explicit `thinWalled` extra.
    pub fn is_thin_walled(&self) -> bool {
        self.thin_walled
            .unwrap_or(!self.volume.present && self.double_sided)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTransform {
    Matrix([f32; 16]),
    Trs {
        translation: [f32; 3],
        rotation: [f32; 4],
        scale: [f32; 3],
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        NodeTransform::Trs {
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// `EXT_mesh_gpu_instancing` per-node attribute arrays.
#[derive(Debug, Clone, Default)]
pub struct GpuInstancing {
    pub translation: Option<usize>,
    pub rotation: Option<usize>,
    pub scale: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: Option<String>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub light: Option<usize>,
    pub camera: Option<usize>,
    pub transform: NodeTransform,
    pub children: Vec<usize>,
    pub visible: bool,
    pub gpu_instancing: Option<GpuInstancing>,
    pub eye_center_up: Option<([f32; 3], [f32; 3], [f32; 3])>,
}

impl Node {
    pub fn local_matrix(&self) -> glam::Mat4 {
        match self.transform {
            NodeTransform::Matrix(m) => glam::Mat4::from_cols_array(&m),
            NodeTransform::Trs {
                translation,
                rotation,
                scale,
            } => glam::Mat4::from_scale_rotation_translation(
                Vec3::from(scale),
                Quat::from_array(rotation),
                Vec3::from(translation),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    CubicSpline,
}

#[derive(Debug, Clone)]
pub struct AnimationSampler {
    pub input: usize,
    pub output: usize,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPath {
    Translation,
    Rotation,
    Scale,
    Weights,
    Pointer,
}

#[derive(Debug, Clone)]
pub struct AnimationChannel {
    pub sampler: usize,
    pub target_node: Option<usize>,
    pub path: AnimationPath,
    pub pointer: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: Option<String>,
    pub samplers: Vec<AnimationSampler>,
    pub channels: Vec<AnimationChannel>,
    pub start_time: f32,
    pub end_time: f32,
    pub current_time: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Spot,
    Directional,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: Option<String>,
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub range: Option<f32>,
    pub inner_cone_angle: f32,
    pub outer_cone_angle: f32,
    pub radius: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            name: None,
            kind: LightKind::Point,
            color: Vec3::ONE,
            intensity: 1.0,
            range: None,
            inner_cone_angle: 0.0,
            outer_cone_angle: std::f32::consts::FRAC_PI_4,
            radius: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CameraProjection {
    Perspective { yfov: f32, aspect: Option<f32> },
    Orthographic { xmag: f32, ymag: f32 },
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: Option<String>,
    pub znear: f32,
    pub zfar: Option<f32>,
    pub projection: CameraProjection,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialVariants {
    pub names: Vec<String>,
}

/// The fully parsed, already-buffer-resident glTF asset (§3 "accepts a
/// filesystem path... produces a fully parsed model"). Image byte ranges are
/// captured (`image_buffer_views`) but left undecoded per §4.A.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub scenes: Vec<Scene>,
    pub default_scene: Option<usize>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
    pub skins: Vec<Skin>,
    pub animations: Vec<Animation>,
    pub lights: Vec<Light>,
    pub cameras: Vec<Camera>,
    pub variants: MaterialVariants,
    /// Raw byte ranges for embedded images: `(buffer_view, mime_type)`. Not
    /// decoded here; handed to the external image-decoder collaborator.
    pub image_buffer_views: Vec<(usize, String)>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
}

