//! §4.D GPU Mirror: keeps a set of flat storage-buffer tables in sync with
//! the scene model (`crate::scene::Scene`), using the policy/conversion
//! logic in [`tables`] and the skinning/morph math in [`skinning`]. Bind
//! group layout construction lives in [`layouts`].
//!
//! wgpu tracks buffer usage automatically (there's no equivalent of
//! `vkCmdPipelineBarrier` in its public API), so the manual
//! transfer→AS-build and AS-write→AS-read barriers the original engine
//! issues by hand are implicit here: submitting the vertex-buffer write
//! before the refit command buffer is enough, which is what
//! [`crate::accel`] does (see DESIGN.md).

pub mod layouts;
pub mod skinning;
pub mod tables;

use std::collections::HashSet;

use asset_io::model::{Light, Material, Model};
use crevice::std140::AsStd140;
use shared_structs::{LightGpu, MaterialGpu, RenderNodeGpu, RenderPrimitiveGpu, SceneDescriptorGpu, TextureInfoGpu};
use wgpu::util::DeviceExt;

use crate::error::Result as CoreResult;
use crate::scene::{RenderLight, RenderNode, RenderPrimitive, Scene};
use crate::settings::EngineSettings;
use tables::{MaterialMirror, MaterialUploadPlan};

fn storage_buffer(device: &wgpu::Device, label: &str, capacity_bytes: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: capacity_bytes.max(4),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

/// `create_buffer_init` rejects a zero-length `contents`, unlike
/// `storage_buffer`'s `size.max(4)`; pad so an empty arena (an asset with no
/// usable geometry in this slot) still creates a valid buffer.
fn arena_buffer(device: &wgpu::Device, label: &str, bytes: &[u8]) -> wgpu::Buffer {
    if bytes.is_empty() {
        storage_buffer(device, label, 0)
    } else {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        })
    }
}

/// Device-side mirror of the GPU mirror tables plus the CPU cache the
/// surgical-update policy needs. Addresses in [`SceneDescriptorGpu`] are
/// opaque handles this struct hands out itself (see `shared_structs`'s own
/// doc comment and DESIGN.md), not real device pointers.
pub struct GpuMirror {
    material_mirror: MaterialMirror,

    material_table: wgpu::Buffer,
    texture_info_table: wgpu::Buffer,
    render_primitive_table: wgpu::Buffer,
    render_node_table: wgpu::Buffer,
    light_table: wgpu::Buffer,
    scene_descriptor: wgpu::Buffer,

    /// Backing vertex-attribute/index arenas the render-primitive table's
    /// addresses point into (see `tables::build_render_primitive_tables`).
    /// Not listed in [`layouts::SceneTableLayouts`]: consumers bind them
    /// directly rather than through the scene-table bind group, the same way
    /// `skinning_workspace` stages its own buffers outside it.
    vertex_position_buffer: wgpu::Buffer,
    vertex_normal_buffer: wgpu::Buffer,
    vertex_tangent_buffer: wgpu::Buffer,
    vertex_tex_coord_0_buffer: wgpu::Buffer,
    vertex_tex_coord_1_buffer: wgpu::Buffer,
    vertex_color_buffer: wgpu::Buffer,
    vertex_index_buffer: wgpu::Buffer,

    light_count: usize,
    next_address: u64,
    material_table_address: u64,
    texture_info_table_address: u64,
    render_primitive_table_address: u64,
    render_node_table_address: u64,
    light_table_address: u64,
}

impl GpuMirror {
    pub fn new(device: &wgpu::Device) -> Self {
        let mut next_address = 1u64;
        let mut alloc = || {
            let addr = next_address;
            next_address += 1;
            addr
        };

        let material_table_address = alloc();
        let texture_info_table_address = alloc();
        let render_primitive_table_address = alloc();
        let render_node_table_address = alloc();
        let light_table_address = alloc();

        Self {
            material_mirror: MaterialMirror::default(),
            material_table: storage_buffer(device, "material table", 0),
            texture_info_table: storage_buffer(device, "texture info table", 0),
            render_primitive_table: storage_buffer(device, "render primitive table", 0),
            render_node_table: storage_buffer(device, "render node table", 0),
            light_table: storage_buffer(device, "light table", 0),
            scene_descriptor: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene descriptor"),
                contents: bytemuck::bytes_of(&SceneDescriptorGpu::default()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }),
            vertex_position_buffer: storage_buffer(device, "vertex position arena", 0),
            vertex_normal_buffer: storage_buffer(device, "vertex normal arena", 0),
            vertex_tangent_buffer: storage_buffer(device, "vertex tangent arena", 0),
            vertex_tex_coord_0_buffer: storage_buffer(device, "vertex tex coord 0 arena", 0),
            vertex_tex_coord_1_buffer: storage_buffer(device, "vertex tex coord 1 arena", 0),
            vertex_color_buffer: storage_buffer(device, "vertex color arena", 0),
            vertex_index_buffer: storage_buffer(device, "vertex index arena", 0),
            light_count: 0,
            next_address,
            material_table_address,
            texture_info_table_address,
            render_primitive_table_address,
            render_node_table_address,
            light_table_address,
        }
    }

    pub fn material_table(&self) -> &wgpu::Buffer {
        &self.material_table
    }

    pub fn texture_info_table(&self) -> &wgpu::Buffer {
        &self.texture_info_table
    }

    pub fn render_primitive_table(&self) -> &wgpu::Buffer {
        &self.render_primitive_table
    }

    pub fn render_node_table(&self) -> &wgpu::Buffer {
        &self.render_node_table
    }

    pub fn light_table(&self) -> &wgpu::Buffer {
        &self.light_table
    }

    pub fn scene_descriptor(&self) -> &wgpu::Buffer {
        &self.scene_descriptor
    }

    pub fn vertex_position_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_position_buffer
    }

    pub fn vertex_normal_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_normal_buffer
    }

    pub fn vertex_tangent_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_tangent_buffer
    }

    pub fn vertex_tex_coord_0_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_tex_coord_0_buffer
    }

    pub fn vertex_tex_coord_1_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_tex_coord_1_buffer
    }

    pub fn vertex_color_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_color_buffer
    }

    pub fn vertex_index_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_index_buffer
    }

    fn republish_scene_descriptor(&mut self, queue: &wgpu::Queue) {
        let descriptor = SceneDescriptorGpu {
            material_table_address: self.material_table_address,
            texture_info_table_address: self.texture_info_table_address,
            render_primitive_table_address: self.render_primitive_table_address,
            render_node_table_address: self.render_node_table_address,
            light_table_address: self.light_table_address,
            light_count: self.light_count as u32,
            _padding: 0,
        };
        queue.write_buffer(&self.scene_descriptor, 0, bytemuck::bytes_of(&descriptor));
    }

    /// Resize-if-smaller growth for one of the flat tables; returns a fresh
    /// buffer and bumps the opaque address when the old one is too small.
    fn grow(device: &wgpu::Device, label: &str, buffer: &mut wgpu::Buffer, address: &mut u64, next_address: &mut u64, required_bytes: u64) -> bool {
        if tables::grown_capacity(buffer.size() as usize, required_bytes as usize).is_none() {
            return false;
        }
        *buffer = storage_buffer(device, label, required_bytes);
        *address = *next_address;
        *next_address += 1;
        true
    }

    /// §4.D "Material table" surgical update. `dirty` is the set of
    /// material indices changed since the last call; pass an empty set to
    /// force a full rebuild (first sync after load, or a scene swap).
    pub fn sync_materials(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        materials: &[Material],
        dirty: &HashSet<usize>,
        settings: &EngineSettings,
    ) {
        let plan = self.material_mirror.update(materials, dirty, settings.full_update_ratio);

        let material_stride = std::mem::size_of::<<MaterialGpu as AsStd140>::Std140Type>() as u64;
        let texture_info_stride = std::mem::size_of::<<TextureInfoGpu as AsStd140>::Std140Type>() as u64;
        let material_bytes = self.material_mirror.materials().len() as u64 * material_stride;
        let texture_info_bytes = self.material_mirror.texture_infos().len() as u64 * texture_info_stride;

        let mut resized = Self::grow(
            device,
            "material table",
            &mut self.material_table,
            &mut self.material_table_address,
            &mut self.next_address,
            material_bytes,
        );
        resized |= Self::grow(
            device,
            "texture info table",
            &mut self.texture_info_table,
            &mut self.texture_info_table_address,
            &mut self.next_address,
            texture_info_bytes,
        );

        match plan {
            MaterialUploadPlan::Full => {
                queue.write_buffer(&self.material_table, 0, &material_std140_bytes(self.material_mirror.materials()));
                queue.write_buffer(&self.texture_info_table, 0, &texture_info_std140_bytes(self.material_mirror.texture_infos()));
            }
            MaterialUploadPlan::Partial(touched) => {
                if resized {
                    queue.write_buffer(&self.material_table, 0, &material_std140_bytes(self.material_mirror.materials()));
                    queue.write_buffer(&self.texture_info_table, 0, &texture_info_std140_bytes(self.material_mirror.texture_infos()));
                } else {
                    for (idx, (start, end)) in touched {
                        queue.write_buffer(
                            &self.material_table,
                            idx as u64 * material_stride,
                            &material_std140_bytes(&self.material_mirror.materials()[idx..idx + 1]),
                        );
                        let span = &self.material_mirror.texture_infos()[start as usize..end as usize];
                        queue.write_buffer(&self.texture_info_table, start as u64 * texture_info_stride, &texture_info_std140_bytes(span));
                    }
                }
            }
        }

        if resized {
            self.republish_scene_descriptor(queue);
        }
    }

    /// §4.D "Render-node table". Empty `dirty` means a full refresh.
    pub fn sync_render_nodes(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, render_nodes: &[RenderNode], dirty: &HashSet<usize>) {
        let record_size = std::mem::size_of::<RenderNodeGpu>() as u64;
        let required = render_nodes.len() as u64 * record_size;
        let resized = Self::grow(
            device,
            "render node table",
            &mut self.render_node_table,
            &mut self.render_node_table_address,
            &mut self.next_address,
            required,
        );
        let indices = tables::render_node_upload_plan(dirty, render_nodes.len());
        if resized || indices.len() == render_nodes.len() {
            let records: Vec<RenderNodeGpu> = render_nodes.iter().map(tables::render_node_gpu).collect();
            queue.write_buffer(&self.render_node_table, 0, bytemuck::cast_slice(&records));
        } else {
            for idx in indices {
                let record = tables::render_node_gpu(&render_nodes[idx]);
                queue.write_buffer(&self.render_node_table, idx as u64 * record_size, bytemuck::bytes_of(&record));
            }
        }

        if resized {
            self.republish_scene_descriptor(queue);
        }
    }

    /// §4.D "Render-primitive table": always a full rewrite. Render
    /// Primitives only grow (deduplication never retires an entry) and are
    /// rebuilt at asset-load/scene-switch cadence rather than per frame, so
    /// there's no surgical-update policy to apply here.
    pub fn sync_render_primitives(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        model: &Model,
        render_primitives: &[RenderPrimitive],
    ) -> CoreResult<()> {
        let built = tables::build_render_primitive_tables(model, render_primitives)?;

        let required = (built.records.len() * std::mem::size_of::<RenderPrimitiveGpu>()) as u64;
        Self::grow(
            device,
            "render primitive table",
            &mut self.render_primitive_table,
            &mut self.render_primitive_table_address,
            &mut self.next_address,
            required,
        );
        queue.write_buffer(&self.render_primitive_table, 0, bytemuck::cast_slice(&built.records));

        self.vertex_position_buffer = arena_buffer(device, "vertex position arena", &built.positions);
        self.vertex_normal_buffer = arena_buffer(device, "vertex normal arena", &built.normals);
        self.vertex_tangent_buffer = arena_buffer(device, "vertex tangent arena", &built.tangents);
        self.vertex_tex_coord_0_buffer = arena_buffer(device, "vertex tex coord 0 arena", &built.tex_coords_0);
        self.vertex_tex_coord_1_buffer = arena_buffer(device, "vertex tex coord 1 arena", &built.tex_coords_1);
        self.vertex_color_buffer = arena_buffer(device, "vertex color arena", &built.colors);
        self.vertex_index_buffer = arena_buffer(device, "vertex index arena", &built.indices);

        self.republish_scene_descriptor(queue);
        Ok(())
    }

    /// §4.D "Light table": always a full rewrite (lights are cheap and few
    /// compared to materials/render nodes).
    pub fn sync_lights(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, render_lights: &[RenderLight], lights: &[Light]) {
        let records: Vec<LightGpu> = render_lights
            .iter()
            .map(|render_light| tables::light_gpu(render_light, &lights[render_light.light_index]))
            .collect();

        let required = (records.len() * std::mem::size_of::<LightGpu>()) as u64;
        Self::grow(device, "light table", &mut self.light_table, &mut self.light_table_address, &mut self.next_address, required);

        self.light_count = records.len();
        queue.write_buffer(&self.light_table, 0, bytemuck::cast_slice(&records));
        // `light_count` changed regardless of whether the buffer resized.
        self.republish_scene_descriptor(queue);
    }

    /// Convenience for a brand-new `Scene`: rebuilds every table from
    /// scratch (materials, render primitives, render nodes, lights).
    pub fn full_sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene, settings: &EngineSettings) -> CoreResult<()> {
        self.sync_materials(device, queue, &scene.model().materials, &HashSet::new(), settings);
        self.sync_render_primitives(device, queue, scene.model(), scene.get_render_primitives())?;
        self.sync_render_nodes(device, queue, scene.get_render_nodes(), &HashSet::new());
        self.sync_lights(device, queue, scene.get_render_lights(), &scene.model().lights);
        Ok(())
    }
}

/// `MaterialGpu` carries nested extension sub-structs the WGSL side reads as
/// std140, so uploads go through crevice's derived `Std140Type` rather than
/// a direct `bytemuck::cast_slice` (the flat GPU records in `shared_structs`
/// that have no nested structs, e.g. `RenderNodeGpu`/`LightGpu`, stay plain
/// `Pod` and skip this step).
fn material_std140_bytes(materials: &[MaterialGpu]) -> Vec<u8> {
    let converted: Vec<_> = materials.iter().map(AsStd140::as_std140).collect();
    bytemuck::cast_slice(&converted).to_vec()
}

fn texture_info_std140_bytes(infos: &[TextureInfoGpu]) -> Vec<u8> {
    let converted: Vec<_> = infos.iter().map(AsStd140::as_std140).collect();
    bytemuck::cast_slice(&converted).to_vec()
}
