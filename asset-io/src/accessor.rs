//! Typed accessor reads, grounded in
//! `examples/expenses-superconductor/renderer-core/src/assets/models/accessors.rs`'s
//! dynamic-dispatch-by-`(component_type, normalized, byte_stride)` pattern,
//! generalized to this crate's `Model`/`Accessor` types and extended with
//! sparse-accessor overlay application (`original_source/src/tinygltf_utils.hpp`
//! applies the override after the base read; the teacher's subset never
//! needed sparse accessors at all).

use glam::{UVec4, Vec2, Vec3, Vec4};

use crate::error::{AssetError, Result};
use crate::model::{Accessor, ComponentType, Model};

fn unsigned_short_to_float(short: u16) -> f32 {
    short as f32 / 65535.0
}

fn unsigned_byte_to_float(byte: u8) -> f32 {
    byte as f32 / 255.0
}

fn signed_byte_to_float(byte: i8) -> f32 {
    (byte as f32 / 127.0).max(-1.0)
}

fn signed_short_to_float(short: i16) -> f32 {
    (short as f32 / 32767.0).max(-1.0)
}

fn byte_stride(model: &Model, accessor: &Accessor, buffer_view_index: usize) -> usize {
    let bv = &model.buffer_views[buffer_view_index];
    bv.meshopt
        .as_ref()
        .map(|m| m.byte_stride)
        .or(bv.byte_stride)
        .unwrap_or_else(|| accessor.component_type.byte_size() * accessor.element_type.num_components())
}

fn accessor_slice<'a>(model: &'a Model, accessor_index: usize, accessor: &Accessor) -> Result<(&'a [u8], usize)> {
    let bv_index = accessor.buffer_view.ok_or_else(|| AssetError::InvalidAccessor {
        accessor: accessor_index,
        reason: "accessor has no buffer view (fully sparse accessors are read as zero-filled)".into(),
    })?;
    let bv = model
        .buffer_views
        .get(bv_index)
        .ok_or_else(|| AssetError::InvalidAccessor {
            accessor: accessor_index,
            reason: format!("buffer view {bv_index} out of range"),
        })?;
    let buffer = model
        .buffers
        .get(bv.buffer)
        .ok_or_else(|| AssetError::InvalidAccessor {
            accessor: accessor_index,
            reason: format!("buffer {} out of range", bv.buffer),
        })?;
    let stride = byte_stride(model, accessor, bv_index);
    let start = bv.byte_offset + accessor.byte_offset;
    let end = start + accessor.count * stride;
    if end > buffer.data.len() {
        return Err(AssetError::InvalidAccessor {
            accessor: accessor_index,
            reason: format!("accessor range {start}..{end} exceeds buffer length {}", buffer.data.len()),
        });
    }
    Ok((&buffer.data[start..end], stride))
}

/// Reads the raw element stride's worth of bytes for a single sparse index
/// target, used by `apply_sparse_*` to overwrite one entry in place.
fn read_index_at(data: &[u8], component_type: ComponentType, i: usize) -> usize {
    let bs = component_type.byte_size();
    let bytes = &data[i * bs..i * bs + bs];
    match component_type {
        ComponentType::U8 => bytes[0] as usize,
        ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as usize,
        ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
        _ => unreachable!("sparse indices are always unsigned"),
    }
}

fn sparse_index_list(model: &Model, accessor: &Accessor) -> Result<Vec<usize>> {
    let sparse = accessor.sparse.as_ref().unwrap();
    let bv = &model.buffer_views[sparse.indices.buffer_view];
    let buffer = &model.buffers[bv.buffer];
    let start = bv.byte_offset + sparse.indices.byte_offset;
    let stride = sparse.indices.component_type.byte_size();
    let data = &buffer.data[start..start + sparse.count * stride];
    Ok((0..sparse.count)
        .map(|i| read_index_at(data, sparse.indices.component_type, i))
        .collect())
}

fn with_index(e: AssetError, accessor_index: usize) -> AssetError {
    match e {
        AssetError::InvalidAccessor { reason, .. } => AssetError::InvalidAccessor {
            accessor: accessor_index,
            reason,
        },
        other => other,
    }
}

macro_rules! typed_reader {
    ($name:ident, $elem:ty, $read_one:expr) => {
        pub fn $name(model: &Model, accessor_index: usize) -> Result<Vec<$elem>> {
            let accessor = model
                .accessors
                .get(accessor_index)
                .ok_or_else(|| AssetError::InvalidAccessor {
                    accessor: accessor_index,
                    reason: "index out of range".into(),
                })?;

            let mut values: Vec<$elem> = if accessor.buffer_view.is_some() {
                let (slice, stride) = accessor_slice(model, accessor_index, accessor)?;
                (0..accessor.count)
                    .map(|i| $read_one(&slice[i * stride..], accessor).map_err(|e| with_index(e, accessor_index)))
                    .collect::<Result<Vec<_>>>()?
            } else {
                vec![<$elem>::default(); accessor.count]
            };

            if let Some(sparse) = &accessor.sparse {
                let indices = sparse_index_list(model, accessor)?;
                let values_bv = &model.buffer_views[sparse.values.buffer_view];
                let values_buffer = &model.buffers[values_bv.buffer];
                let element_size = accessor.component_type.byte_size() * accessor.element_type.num_components();
                let start = values_bv.byte_offset + sparse.values.byte_offset;
                for (overlay_i, &target) in indices.iter().enumerate() {
                    let base = start + overlay_i * element_size;
                    let data = &values_buffer.data[base..base + element_size];
                    values[target] = $read_one(data, accessor).map_err(|e| with_index(e, accessor_index))?;
                }
            }

            Ok(values)
        }
    };
}

fn read_one_f32(data: &[u8], accessor: &Accessor) -> Result<f32> {
    match (accessor.component_type, accessor.normalized) {
        (ComponentType::F32, _) => Ok(f32::from_le_bytes(data[0..4].try_into().unwrap())),
        (ComponentType::U16, true) => Ok(unsigned_short_to_float(u16::from_le_bytes(data[0..2].try_into().unwrap()))),
        (ComponentType::U8, true) => Ok(unsigned_byte_to_float(data[0])),
        other => Err(AssetError::InvalidAccessor {
            accessor: 0,
            reason: format!("unsupported scalar read {other:?}"),
        }),
    }
}

fn read_one_f32x2(data: &[u8], accessor: &Accessor) -> Result<Vec2> {
    match (accessor.component_type, accessor.normalized) {
        (ComponentType::F32, false) => Ok(Vec2::new(
            f32::from_le_bytes(data[0..4].try_into().unwrap()),
            f32::from_le_bytes(data[4..8].try_into().unwrap()),
        )),
        (ComponentType::U16, true) => {
            let a = u16::from_le_bytes(data[0..2].try_into().unwrap());
            let b = u16::from_le_bytes(data[2..4].try_into().unwrap());
            Ok(Vec2::new(unsigned_short_to_float(a), unsigned_short_to_float(b)))
        }
        (ComponentType::U8, true) => Ok(Vec2::new(
            unsigned_byte_to_float(data[0]),
            unsigned_byte_to_float(data[1]),
        )),
        other => Err(AssetError::InvalidAccessor {
            accessor: 0,
            reason: format!("unsupported vec2 read {other:?}"),
        }),
    }
}

fn read_one_f32x3(data: &[u8], accessor: &Accessor) -> Result<Vec3> {
    match (accessor.component_type, accessor.normalized) {
        (ComponentType::F32, false) => Ok(Vec3::new(
            f32::from_le_bytes(data[0..4].try_into().unwrap()),
            f32::from_le_bytes(data[4..8].try_into().unwrap()),
            f32::from_le_bytes(data[8..12].try_into().unwrap()),
        )),
        (ComponentType::U16, true) => Ok(Vec3::from(std::array::from_fn(|i| {
            unsigned_short_to_float(u16::from_le_bytes(data[i * 2..i * 2 + 2].try_into().unwrap()))
        }))),
        (ComponentType::I16, true) => Ok(Vec3::from(std::array::from_fn(|i| {
            signed_short_to_float(i16::from_le_bytes(data[i * 2..i * 2 + 2].try_into().unwrap()))
        }))),
        (ComponentType::I8, true) => Ok(Vec3::from(std::array::from_fn(|i| signed_byte_to_float(data[i] as i8)))),
        other => Err(AssetError::InvalidAccessor {
            accessor: 0,
            reason: format!("unsupported vec3 read {other:?}"),
        }),
    }
}

fn read_one_f32x4(data: &[u8], accessor: &Accessor) -> Result<Vec4> {
    match (accessor.component_type, accessor.normalized) {
        (ComponentType::F32, false) => Ok(Vec4::from(std::array::from_fn(|i| {
            f32::from_le_bytes(data[i * 4..i * 4 + 4].try_into().unwrap())
        }))),
        (ComponentType::U8, true) => Ok(Vec4::from(std::array::from_fn(|i| unsigned_byte_to_float(data[i])))),
        (ComponentType::U16, true) => Ok(Vec4::from(std::array::from_fn(|i| {
            unsigned_short_to_float(u16::from_le_bytes(data[i * 2..i * 2 + 2].try_into().unwrap()))
        }))),
        (ComponentType::I16, true) => Ok(Vec4::from(std::array::from_fn(|i| {
            signed_short_to_float(i16::from_le_bytes(data[i * 2..i * 2 + 2].try_into().unwrap()))
        }))),
        other => Err(AssetError::InvalidAccessor {
            accessor: 0,
            reason: format!("unsupported vec4 read {other:?}"),
        }),
    }
}

fn read_one_u32(data: &[u8], accessor: &Accessor) -> Result<u32> {
    match accessor.component_type {
        ComponentType::U16 => Ok(u16::from_le_bytes(data[0..2].try_into().unwrap()) as u32),
        ComponentType::U32 => Ok(u32::from_le_bytes(data[0..4].try_into().unwrap())),
        ComponentType::U8 => Ok(data[0] as u32),
        other => Err(AssetError::InvalidAccessor {
            accessor: 0,
            reason: format!("unsupported index component type {other:?}"),
        }),
    }
}

fn read_one_u32x4(data: &[u8], accessor: &Accessor) -> Result<UVec4> {
    match accessor.component_type {
        ComponentType::U8 => Ok(UVec4::from(std::array::from_fn(|i| data[i] as u32))),
        ComponentType::U16 => Ok(UVec4::from(std::array::from_fn(|i| {
            u16::from_le_bytes(data[i * 2..i * 2 + 2].try_into().unwrap()) as u32
        }))),
        other => Err(AssetError::InvalidAccessor {
            accessor: 0,
            reason: format!("unsupported joints component type {other:?}"),
        }),
    }
}

typed_reader!(read_f32, f32, read_one_f32);
typed_reader!(read_f32x2, Vec2, read_one_f32x2);
typed_reader!(read_f32x3, Vec3, read_one_f32x3);
typed_reader!(read_f32x4, Vec4, read_one_f32x4);
typed_reader!(read_u32, u32, read_one_u32);
typed_reader!(read_u32x4, UVec4, read_one_u32x4);
