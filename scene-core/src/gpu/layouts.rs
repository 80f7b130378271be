//! Storage-buffer-table bind group layout for the GPU mirror, generalized
//! from the teacher's fixed-raster `BindGroupLayouts`
//! (`scene-core/src/bind_group_layouts.rs`, itself retained as reference):
//! same entry-closure construction style, applied to the flat tables in
//! `shared_structs` instead of per-draw uniforms.

pub struct SceneTableLayouts {
    /// Bindings, in order: material table, texture-info table, render
    /// primitive table, render node table, light table (all read-only
    /// storage), scene descriptor (uniform).
    pub scene_tables: wgpu::BindGroupLayout,
    /// Storage buffers the GPU mirror writes into from CPU skinning/morph
    /// output before a vertex-buffer transfer.
    pub skinning_workspace: wgpu::BindGroupLayout,
}

impl SceneTableLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let storage_entry = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            count: None,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        };

        let uniform_entry = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            count: None,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        };

        let storage_rw_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            count: None,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        };

        let compute_and_frag = wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT;

        Self {
            scene_tables: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("scene table bind group layout"),
                entries: &[
                    storage_entry(0, compute_and_frag), // material table
                    storage_entry(1, compute_and_frag), // texture-info table
                    storage_entry(2, compute_and_frag), // render primitive table
                    storage_entry(3, compute_and_frag), // render node table
                    storage_entry(4, compute_and_frag), // light table
                    uniform_entry(5, compute_and_frag), // scene descriptor
                ],
            }),
            skinning_workspace: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("skinning workspace bind group layout"),
                entries: &[
                    storage_entry(0, wgpu::ShaderStages::COMPUTE),    // base positions/normals/tangents
                    storage_entry(1, wgpu::ShaderStages::COMPUTE),    // joint matrices
                    storage_rw_entry(2),                              // skinned output
                ],
            }),
        }
    }
}
