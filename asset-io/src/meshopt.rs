//! `EXT_meshopt_compression` decoding. meshopt encodes three orthogonal
//! concerns that the extension's JSON keeps separate: the bitstream codec
//! per `mode` (delegated to `meshopt_decoder`, below), and an optional
//! bit-exact `filter` reinterpretation of the decoded bytes
//! (octahedral-encoded normals/tangents, quaternions, or an exponential
//! fixed-point float encoding, which this module still applies itself since
//! they run after the crate's decode step and over already-plain bytes).
//!
//! The codec itself is the real `meshopt-decoder` crate, the same
//! dependency (same git rev) the teacher pins in
//! `examples/expenses-superconductor/renderer-core/Cargo.toml`. The bitstream
//! (per-element edge-fan codewords for the index modes, the 16-element-block
//! byte predictor for the vertex mode) is exactly the one
//! `EXT_meshopt_compression` assets in the wild were produced against
//! (gltfpack and the original engine both call into the real
//! `meshoptimizer` library for this), so it isn't something this crate
//! should reimplement from scratch.

use crate::error::{AssetError, Result};
use crate::model::{Buffer, MeshoptFilter, MeshoptMode, Model};

/// Decodes every buffer view tagged with `EXT_meshopt_compression` in place,
/// replacing its source buffer's relevant bytes with the decoded output and
/// dropping the byte_stride override since decoded data is always tightly
/// packed per the component layout implied by its consumer accessor.
pub fn decode_meshopt_buffer_views(model: &mut Model) -> Result<()> {
    for bv_index in 0..model.buffer_views.len() {
        let Some(meshopt) = model.buffer_views[bv_index].meshopt.clone() else {
            continue;
        };

        let source = &model.buffers[meshopt.buffer];
        let start = meshopt.byte_offset;
        let end = start + meshopt.byte_length;
        if end > source.data.len() {
            return Err(AssetError::MeshoptDecodeFailed {
                buffer_view: bv_index,
                reason: format!("source range {start}..{end} exceeds buffer length {}", source.data.len()),
            });
        }
        let encoded = &source.data[start..end];

        let decoded = match meshopt.mode {
            MeshoptMode::Attributes => decode_vertex_attribute(encoded, meshopt.count, meshopt.byte_stride),
            MeshoptMode::Triangles => decode_index_buffer(encoded, meshopt.count, meshopt.byte_stride),
            MeshoptMode::Indices => decode_index_sequence(encoded, meshopt.count, meshopt.byte_stride),
        }
        .map_err(|reason| AssetError::MeshoptDecodeFailed {
            buffer_view: bv_index,
            reason,
        })?;

        let filtered = apply_filter(decoded, meshopt.filter, meshopt.byte_stride).map_err(|reason| {
            AssetError::MeshoptDecodeFailed {
                buffer_view: bv_index,
                reason,
            }
        })?;

        let new_buffer_index = model.buffers.len();
        model.buffers.push(Buffer {
            byte_length: filtered.len(),
            data: filtered,
        });

        let bv = &mut model.buffer_views[bv_index];
        bv.buffer = new_buffer_index;
        bv.byte_offset = 0;
        bv.byte_length = meshopt.count * meshopt.byte_stride;
        bv.byte_stride = None;
        bv.meshopt = None;
    }

    model.extensions_used.retain(|e| e != "EXT_meshopt_compression");
    model.extensions_required.retain(|e| e != "EXT_meshopt_compression");

    Ok(())
}

/// Mode 0 (`meshopt_decodeVertexBuffer`'s wire format), delegated straight
/// to the real codec.
fn decode_vertex_attribute(encoded: &[u8], count: usize, stride: usize) -> std::result::Result<Vec<u8>, String> {
    meshopt_decoder::decode_vertex_buffer(encoded, count, stride).map_err(|err| format!("meshopt vertex buffer decode failed: {err}"))
}

/// Mode 1 (`meshopt_decodeIndexBuffer`, triangle-list variant): edge-fan
/// codeword stream, delegated to the real codec. Indices decode at whatever
/// width `stride` calls for (2 or 4 bytes).
fn decode_index_buffer(encoded: &[u8], count: usize, stride: usize) -> std::result::Result<Vec<u8>, String> {
    meshopt_decoder::decode_index_buffer(encoded, count, stride).map_err(|err| format!("meshopt index buffer decode failed: {err}"))
}

/// Mode 2 (`meshopt_decodeIndexSequence`): monotonically-increasing index
/// sequence, used for non-triangle-list topologies, delegated to the real
/// codec.
fn decode_index_sequence(encoded: &[u8], count: usize, stride: usize) -> std::result::Result<Vec<u8>, String> {
    meshopt_decoder::decode_index_sequence(encoded, count, stride).map_err(|err| format!("meshopt index sequence decode failed: {err}"))
}

fn apply_filter(data: Vec<u8>, filter: MeshoptFilter, stride: usize) -> std::result::Result<Vec<u8>, String> {
    match filter {
        MeshoptFilter::None => Ok(data),
        MeshoptFilter::Octahedral => filter_octahedral(data, stride),
        MeshoptFilter::Quaternion => filter_quaternion(data, stride),
        MeshoptFilter::Exponential => filter_exponential(data, stride),
    }
}

/// Decodes octahedral-mapped normals/tangents back to unit XYZ(W) floats.
/// `stride` is 4 (two i8) or 8 (two i16); the sign of a trailing fourth
/// component (tangent handedness) is carried through unchanged.
fn filter_octahedral(data: Vec<u8>, stride: usize) -> std::result::Result<Vec<u8>, String> {
    let count = data.len() / stride;
    let mut out = vec![0u8; count * 16];
    for i in 0..count {
        let src = &data[i * stride..i * stride + stride];
        let (x, y, one, w) = match stride {
            4 => (
                src[0] as i8 as f32 / 127.0,
                src[1] as i8 as f32 / 127.0,
                1.0,
                src[3] as i8 as f32 / 127.0,
            ),
            8 => (
                i16::from_le_bytes([src[0], src[1]]) as f32 / 32767.0,
                i16::from_le_bytes([src[2], src[3]]) as f32 / 32767.0,
                1.0,
                i16::from_le_bytes([src[6], src[7]]) as f32 / 32767.0,
            ),
            _ => return Err(format!("unsupported octahedral stride {stride}")),
        };
        let z = one - x.abs() - y.abs();
        let (ox, oy) = if z < 0.0 {
            ((1.0 - y.abs()) * x.signum(), (1.0 - x.abs()) * y.signum())
        } else {
            (x, y)
        };
        let v = glam::Vec3::new(ox, oy, z).normalize();
        out[i * 16..i * 16 + 4].copy_from_slice(&v.x.to_le_bytes());
        out[i * 16 + 4..i * 16 + 8].copy_from_slice(&v.y.to_le_bytes());
        out[i * 16 + 8..i * 16 + 12].copy_from_slice(&v.z.to_le_bytes());
        out[i * 16 + 12..i * 16 + 16].copy_from_slice(&w.to_le_bytes());
    }
    Ok(out)
}

/// Decodes 16-bit normalized quaternion components back to `f32`; meshopt
/// stores three components plus a two-bit index of the implicitly-largest
/// (dropped) one, scaled so the largest component stays positive.
fn filter_quaternion(data: Vec<u8>, stride: usize) -> std::result::Result<Vec<u8>, String> {
    if stride != 8 {
        return Err(format!("unsupported quaternion stride {stride}"));
    }
    let count = data.len() / stride;
    let mut out = vec![0u8; count * 16];
    const SQRT2_INV: f32 = std::f32::consts::FRAC_1_SQRT_2;
    for i in 0..count {
        let src = &data[i * stride..i * stride + stride];
        let c = |j: usize| i16::from_le_bytes([src[j * 2], src[j * 2 + 1]]) as f32 / 32767.0 * SQRT2_INV;
        let a = c(0);
        let b = c(1);
        let cc = c(2);
        let max_index = (u16::from_le_bytes([src[6], src[7]]) & 3) as usize;
        let sum_sq = a * a + b * b + cc * cc;
        let d = (1.0 - sum_sq).max(0.0).sqrt();
        let mut components = [0.0f32; 4];
        let mut comp_iter = [a, b, cc].into_iter();
        for (idx, slot) in components.iter_mut().enumerate() {
            *slot = if idx == max_index {
                d
            } else {
                comp_iter.next().unwrap_or(0.0)
            };
        }
        for (j, v) in components.iter().enumerate() {
            out[i * 16 + j * 4..i * 16 + j * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
    }
    Ok(out)
}

/// Decodes the exponential fixed-point float encoding: each component is a
/// shared-exponent mantissa pair packed into 32 bits, `mantissa * 2^exponent`.
fn filter_exponential(data: Vec<u8>, stride: usize) -> std::result::Result<Vec<u8>, String> {
    if stride % 4 != 0 {
        return Err(format!("exponential filter stride {stride} not a multiple of 4"));
    }
    let components = stride / 4;
    let count = data.len() / stride;
    let mut out = vec![0u8; data.len()];
    for i in 0..count {
        for c in 0..components {
            let offset = i * stride + c * 4;
            let raw = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap());
            let exponent = (raw as i32) >> 24;
            let mantissa = (raw << 8) as i32 >> 8;
            let value = mantissa as f32 * 2f32.powi(exponent);
            out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }
    Ok(out)
}

/// Reports whether any buffer view in the model still carries an unresolved
/// meshopt tag; used by callers to assert decoding ran to completion.
pub fn has_pending_meshopt(model: &Model) -> bool {
    model.buffer_views.iter().any(|bv| bv.meshopt.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octahedral_decodes_unit_vectors() {
        let data = vec![127u8, 0, 0, 127];
        let decoded = filter_octahedral(data, 4).unwrap();
        let x = f32::from_le_bytes(decoded[0..4].try_into().unwrap());
        let y = f32::from_le_bytes(decoded[4..8].try_into().unwrap());
        let z = f32::from_le_bytes(decoded[8..12].try_into().unwrap());
        let len = (x * x + y * y + z * z).sqrt();
        assert!((len - 1.0).abs() < 1e-3);
    }

    #[test]
    fn exponential_decodes_known_value() {
        // mantissa = 3, exponent = -1 -> 1.5
        let raw: u32 = ((-1i32 as u32) << 24) | (3u32 & 0x00FF_FFFF);
        let bytes = raw.to_le_bytes();
        let decoded = filter_exponential(bytes.to_vec(), 4).unwrap();
        let value = f32::from_le_bytes(decoded[0..4].try_into().unwrap());
        assert!((value - 1.5).abs() < 1e-6);
    }
}
