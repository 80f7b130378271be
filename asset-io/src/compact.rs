//! `compactModel`: grounded in `original_source/src/compact_model.cpp`.
//! Walks every live reference into `buffers`/`buffer_views`/`accessors` from
//! meshes, skins, animations, and embedded images, then rebuilds a single
//! 4-byte-aligned merged buffer holding only the bytes actually used,
//! remapping every index. Never drops a material, mesh, node or any other
//! non-buffer resource — only the buffer-side storage is compacted.

use std::collections::HashSet;

use crate::model::{BufferView, Model};

/// If at least this fraction of total buffer bytes are referenced and there
/// are no fully-unreferenced accessors, compaction is skipped: the cost of
/// rewriting a merged buffer outweighs the small savings.
const SKIP_THRESHOLD: f64 = 0.95;

pub fn compact_model(model: &mut Model) {
    let referenced_buffer_views = collect_referenced_buffer_views(model);

    let total_bytes: usize = model.buffers.iter().map(|b| b.data.len()).sum();
    let used_bytes: usize = referenced_buffer_views
        .iter()
        .map(|&bv| model.buffer_views[bv].byte_length)
        .sum();

    let all_views_referenced = referenced_buffer_views.len() == model.buffer_views.len();
    if total_bytes > 0
        && (used_bytes as f64 / total_bytes as f64) >= SKIP_THRESHOLD
        && all_views_referenced
    {
        log::debug!("compaction skipped: {used_bytes}/{total_bytes} bytes already referenced");
        return;
    }

    let mut merged = Vec::with_capacity(used_bytes);
    let mut new_offsets = vec![None; model.buffer_views.len()];

    let mut sorted: Vec<usize> = referenced_buffer_views.into_iter().collect();
    sorted.sort_unstable();

    for bv_index in sorted {
        let bv = &model.buffer_views[bv_index];
        let buffer = &model.buffers[bv.buffer];
        let start = bv.byte_offset;
        let end = start + bv.byte_length;
        let slice = &buffer.data[start..end];

        while merged.len() % 4 != 0 {
            merged.push(0);
        }
        let new_offset = merged.len();
        merged.extend_from_slice(slice);
        new_offsets[bv_index] = Some(new_offset);
    }

    let mut retained_views = Vec::new();
    let mut view_remap = vec![None; model.buffer_views.len()];
    for (old_index, offset) in new_offsets.into_iter().enumerate() {
        if let Some(new_offset) = offset {
            let old_view = &model.buffer_views[old_index];
            view_remap[old_index] = Some(retained_views.len());
            retained_views.push(BufferView {
                buffer: 0,
                byte_offset: new_offset,
                byte_length: old_view.byte_length,
                byte_stride: old_view.byte_stride,
                meshopt: old_view.meshopt.clone(),
            });
        }
    }

    model.buffers.clear();
    model.buffers.push(crate::model::Buffer {
        byte_length: merged.len(),
        data: merged,
    });
    model.buffer_views = retained_views;

    for accessor in &mut model.accessors {
        if let Some(bv) = accessor.buffer_view {
            accessor.buffer_view = view_remap[bv];
        }
        if let Some(sparse) = &mut accessor.sparse {
            sparse.indices.buffer_view = view_remap[sparse.indices.buffer_view].unwrap_or(sparse.indices.buffer_view);
            sparse.values.buffer_view = view_remap[sparse.values.buffer_view].unwrap_or(sparse.values.buffer_view);
        }
    }
    for (bv, _) in &mut model.image_buffer_views {
        if let Some(remapped) = view_remap[*bv] {
            *bv = remapped;
        }
    }

    log::info!(
        "compacted {} buffer(s)/{} view(s) into 1 buffer/{} view(s), {used_bytes}/{total_bytes} bytes retained",
        1,
        view_remap.len(),
        model.buffer_views.len()
    );
}

/// Walks the transitive closure of accessors actually reachable from scene
/// content, then expands each to its buffer view(s). An accessor unreferenced
/// by any mesh primitive, skin, or animation sampler (left behind by a
/// trimmed-down exporter, say) does not keep its buffer view alive just for
/// appearing in `model.accessors` — matching `compact_model.cpp`'s walk from
/// draw data outward rather than a flat scan of the accessor array.
fn collect_referenced_buffer_views(model: &Model) -> HashSet<usize> {
    let mut accessors = HashSet::new();

    for mesh in &model.meshes {
        for primitive in &mesh.primitives {
            let attrs = &primitive.attributes;
            for accessor in [
                attrs.position,
                attrs.normal,
                attrs.tangent,
                attrs.texcoord_0,
                attrs.texcoord_1,
                attrs.color_0,
                attrs.joints_0,
                attrs.weights_0,
            ]
            .into_iter()
            .flatten()
            {
                accessors.insert(accessor);
            }
            if let Some(indices) = primitive.indices {
                accessors.insert(indices);
            }
            for target in &primitive.targets {
                for accessor in [target.position, target.normal, target.tangent].into_iter().flatten() {
                    accessors.insert(accessor);
                }
            }
        }
    }

    for skin in &model.skins {
        if let Some(ibm) = skin.inverse_bind_matrices {
            accessors.insert(ibm);
        }
    }

    for animation in &model.animations {
        for sampler in &animation.samplers {
            accessors.insert(sampler.input);
            accessors.insert(sampler.output);
        }
    }

    let mut views = HashSet::new();
    for accessor_index in accessors {
        let accessor = &model.accessors[accessor_index];
        if let Some(bv) = accessor.buffer_view {
            views.insert(bv);
        }
        if let Some(sparse) = &accessor.sparse {
            views.insert(sparse.indices.buffer_view);
            views.insert(sparse.values.buffer_view);
        }
    }
    for (bv, _) in &model.image_buffer_views {
        views.insert(*bv);
    }
    views
}
