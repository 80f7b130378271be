#![cfg_attr(not(feature = "std"), no_std)]

use core::ops::Mul;
#[cfg(not(target_arch = "spirv"))]
use crevice::std140::AsStd140;
use glam::{Mat2, Mat4, Vec2, Vec3, Vec4};

/// A 4x4 matrix laid out as four columns, matching the teacher crate's trick
/// of avoiding `glam::Mat4`'s own (incompatible) std140 rules.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140))]
pub struct FlatMat4 {
    col_0: Vec4,
    col_1: Vec4,
    col_2: Vec4,
    col_3: Vec4,
}

impl From<FlatMat4> for Mat4 {
    fn from(d: FlatMat4) -> Self {
        Self::from_cols(d.col_0, d.col_1, d.col_2, d.col_3)
    }
}

impl From<Mat4> for FlatMat4 {
    fn from(mat: Mat4) -> Self {
        Self {
            col_0: mat.col(0),
            col_1: mat.col(1),
            col_2: mat.col(2),
            col_3: mat.col(3),
        }
    }
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug))]
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TextureTransform {
    pub offset: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

impl TextureTransform {
    pub fn transform_uv(&self, uv: Vec2) -> Vec2 {
        self.offset + (Mat2::from_angle(self.rotation) * self.scale * uv)
    }
}

/// Index into the GPU texture-info table. `0` is reserved to mean "no
/// texture" (§4.D: "Texture-info index 0 is reserved 'no texture'").
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct TextureRef(pub u32);

impl TextureRef {
    pub const NONE: Self = Self(0);

    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

/// std140-safe equivalent of `TextureRef`, embedded in GPU records (crevice
/// doesn't derive through transparent newtypes cleanly, so this is the
/// explicit field-carrying form).
#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct TextureRefStd {
    pub index: u32,
}

impl From<TextureRef> for TextureRefStd {
    fn from(r: TextureRef) -> Self {
        Self { index: r.0 }
    }
}

impl Default for TextureRefStd {
    fn default() -> Self {
        Self { index: 0 }
    }
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct TextureInfoGpu {
    /// Index into the bindless texture array (or atlas layer), resolved by
    /// the GPU mirror at upload time.
    pub texture_index: u32,
    pub uv_set: u32,
    pub transform: TextureTransform,
}

impl Default for TextureInfoGpu {
    fn default() -> Self {
        Self {
            texture_index: 0,
            uv_set: 0,
            transform: TextureTransform::default(),
        }
    }
}

/// Per-material boolean extension-presence flags, packed into a single u32
/// so the material table stays one fixed-size std140 record (the "flat
/// tagged record" design note in spec §9).
pub mod material_flags {
    pub const ALPHA_MASK: u32 = 1 << 0;
    pub const ALPHA_BLEND: u32 = 1 << 1;
    pub const DOUBLE_SIDED: u32 = 1 << 2;
    pub const THIN_WALLED: u32 = 1 << 3;
    pub const HAS_TRANSMISSION: u32 = 1 << 4;
    pub const HAS_VOLUME: u32 = 1 << 5;
    pub const HAS_VOLUME_SCATTER: u32 = 1 << 6;
    pub const HAS_CLEARCOAT: u32 = 1 << 7;
    pub const HAS_SHEEN: u32 = 1 << 8;
    pub const HAS_SPECULAR: u32 = 1 << 9;
    pub const HAS_ANISOTROPY: u32 = 1 << 10;
    pub const HAS_IRIDESCENCE: u32 = 1 << 11;
    pub const HAS_DISPERSION: u32 = 1 << 12;
    pub const HAS_EMISSIVE_STRENGTH: u32 = 1 << 13;
    pub const UNLIT: u32 = 1 << 14;
    pub const HAS_DIFFUSE_TRANSMISSION: u32 = 1 << 15;
    pub const HAS_SPEC_GLOSS: u32 = 1 << 16;
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct TransmissionGpu {
    pub factor: f32,
    pub texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct VolumeGpu {
    pub thickness_factor: f32,
    pub thickness_texture: TextureRefStd,
    pub attenuation_distance: f32,
    pub attenuation_color: Vec3,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct VolumeScatterGpu {
    pub scatter_distance: f32,
    pub scatter_color: Vec3,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct ClearcoatGpu {
    pub factor: f32,
    pub texture: TextureRefStd,
    pub roughness_factor: f32,
    pub roughness_texture: TextureRefStd,
    pub normal_texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct SheenGpu {
    pub color_factor: Vec3,
    pub color_texture: TextureRefStd,
    pub roughness_factor: f32,
    pub roughness_texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct SpecularGpu {
    pub factor: f32,
    pub texture: TextureRefStd,
    pub color_factor: Vec3,
    pub color_texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct AnisotropyGpu {
    pub strength: f32,
    pub rotation: f32,
    pub texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct IridescenceGpu {
    pub factor: f32,
    pub texture: TextureRefStd,
    pub ior: f32,
    pub thickness_min: f32,
    pub thickness_max: f32,
    pub thickness_texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct DiffuseTransmissionGpu {
    pub factor: f32,
    pub texture: TextureRefStd,
    pub color_factor: Vec3,
    pub color_texture: TextureRefStd,
}

#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct SpecGlossGpu {
    pub diffuse_factor: Vec4,
    pub diffuse_texture: TextureRefStd,
    pub specular_factor: Vec3,
    pub glossiness_factor: f32,
    pub specular_glossiness_texture: TextureRefStd,
}

/// The GPU mirror's per-material record (§4.D "Material table"). One flat
/// struct per Design Note §9 ("deep inheritance in materials" -> flat tagged
/// record); the integrator branches on `flags` rather than any vtable.
#[cfg_attr(not(target_arch = "spirv"), derive(AsStd140, Debug, Clone, Copy))]
#[repr(C)]
pub struct MaterialGpu {
    pub flags: u32,
    pub alpha_cutoff: f32,
    pub base_color_factor: Vec4,
    pub base_color_texture: TextureRefStd,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: TextureRefStd,
    pub normal_scale: f32,
    pub normal_texture: TextureRefStd,
    pub occlusion_strength: f32,
    pub occlusion_texture: TextureRefStd,
    pub emissive_factor: Vec3,
    pub emissive_strength: f32,
    pub emissive_texture: TextureRefStd,
    pub ior: f32,
    pub dispersion: f32,
    pub transmission: TransmissionGpu,
    pub volume: VolumeGpu,
    pub volume_scatter: VolumeScatterGpu,
    pub clearcoat: ClearcoatGpu,
    pub sheen: SheenGpu,
    pub specular: SpecularGpu,
    pub anisotropy: AnisotropyGpu,
    pub iridescence: IridescenceGpu,
    pub diffuse_transmission: DiffuseTransmissionGpu,
    pub spec_gloss: SpecGlossGpu,
}

impl MaterialGpu {
    pub fn is_opaque(&self) -> bool {
        self.flags & (material_flags::ALPHA_MASK | material_flags::ALPHA_BLEND) == 0
    }

    pub fn double_sided(&self) -> bool {
        self.flags & material_flags::DOUBLE_SIDED != 0
    }

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

/// §4.D "Render-node table": `{objectToWorld, worldToObject, materialID,
/// renderPrimID}`.
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy)]
#[repr(C)]
pub struct RenderNodeGpu {
    pub object_to_world: FlatMat4,
    pub world_to_object: FlatMat4,
    pub material_id: u32,
    pub render_prim_id: u32,
    pub visible: u32,
    pub _padding: u32,
}

pub const LIGHT_KIND_POINT: u32 = 0;
pub const LIGHT_KIND_SPOT: u32 = 1;
pub const LIGHT_KIND_DIRECTIONAL: u32 = 2;

/// §4.D "Light table", derived from a `Render Light`.
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LightGpu {
    pub position: Vec3,
    pub kind: u32,
    pub direction: Vec3,
    pub intensity: f32,
    pub color: Vec3,
    pub inner_angle: f32,
    pub outer_angle: f32,
    /// Directional: `angularSize = 2 * atan(radius / sun_distance)`.
    /// Point/spot: `invRange = 1 / range` (0 if range <= 0).
    pub angular_size_or_inv_range: f32,
    pub radius: f32,
    pub _padding: f32,
}

/// §4.E TLAS instance flags.
pub mod instance_flags {
    pub const FORCE_OPAQUE: u32 = 1 << 0;
    pub const TRIANGLE_FACING_CULL_DISABLE: u32 = 1 << 1;
}

/// §4.D "The GPU scene-descriptor buffer contains addresses for...". `wgpu`
/// has no equivalent of Vulkan's `VK_KHR_buffer_device_address`; these are
/// modeled as opaque 64-bit handles resolved by the GPU mirror's own
/// bind-group/binding-array bookkeeping rather than raw device pointers (see
/// DESIGN.md).
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy, Default)]
#[repr(C)]
pub struct SceneDescriptorGpu {
    pub material_table_address: u64,
    pub texture_info_table_address: u64,
    pub render_primitive_table_address: u64,
    pub render_node_table_address: u64,
    pub light_table_address: u64,
    pub light_count: u32,
    pub _padding: u32,
}

/// Per-render-primitive GPU handle table entry: device addresses of the
/// vertex-attribute buffers and the index buffer for one render primitive.
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy, Default)]
#[repr(C)]
pub struct RenderPrimitiveGpu {
    pub position_address: u64,
    pub normal_address: u64,
    pub tangent_address: u64,
    pub tex_coord_0_address: u64,
    pub tex_coord_1_address: u64,
    pub color_address: u64,
    pub index_address: u64,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Kept from the teacher crate: per-joint rigid transform used by CPU
/// skinning, and also suitable as a GPU-uploadable joint palette entry.
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy)]
#[repr(C)]
pub struct JointTransform {
    pub translation_and_scale: Vec4,
    pub rotation: glam::Quat,
}

impl JointTransform {
    pub const MAX_COUNT: usize = 65536 / core::mem::size_of::<Self>();

    pub fn new(translation: Vec3, scale: f32, rotation: glam::Quat) -> Self {
        Self {
            translation_and_scale: translation.extend(scale),
            rotation,
        }
    }

    pub fn translation(&self) -> Vec3 {
        self.translation_and_scale.truncate()
    }

    pub fn scale(&self) -> f32 {
        self.translation_and_scale.w
    }
}

impl Mul<Vec3> for JointTransform {
    type Output = Vec3;

    fn mul(self, vector: Vec3) -> Vec3 {
        self.translation() + (self.scale() * (self.rotation * vector))
    }
}

/// §4.E flat BVH node, shared by every BLAS (one per render primitive) and
/// the single TLAS (over render-node instances). `count == 0` marks an
/// interior node: `left_first` is its left child's index, the right child
/// immediately follows it. `count > 0` marks a leaf: `left_first` is the
/// index of its first primitive in the accompanying index-permutation array.
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy, Default)]
#[repr(C)]
pub struct BvhNode {
    pub aabb_min: Vec3,
    pub left_first: u32,
    pub aabb_max: Vec3,
    pub count: u32,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// One TLAS instance, as the GPU traversal shader reads it: the render
/// node's object-to-world transform (dropping the always-`[0,0,0,1]` last
/// row), which BLAS node buffer to descend into, and the instance flags
/// `crate::accel::instance_flags` derives.
#[cfg_attr(
    not(target_arch = "spirv"),
    derive(Debug, bytemuck::Zeroable, bytemuck::Pod)
)]
#[derive(Clone, Copy, Default)]
#[repr(C)]
pub struct TlasInstanceGpu {
    pub transform_rows: [Vec4; 3],
    pub blas_root_address: u32,
    pub instance_custom_index: u32,
    pub mask: u32,
    pub flags: u32,
}
