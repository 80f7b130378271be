//! Asset decoding: parses a glTF/GLB file into a fully resolved, buffer-
//! resident `Model`, decodes any `EXT_meshopt_compression` buffer views, and
//! compacts buffer storage down to what's actually referenced.
//!
//! Grounded in `examples/expenses-superconductor/renderer-core/src/assets`;
//! `Model` intentionally mirrors the teacher's `goth_gltf::Gltf` shape
//! (indices resolved, not handles) rather than introducing a new ECS-style
//! asset representation.

pub mod accessor;
pub mod compact;
pub mod error;
pub mod json;
pub mod load;
pub mod meshopt;
pub mod model;

pub use error::{AssetError, Result};
pub use model::Model;

use std::path::Path;

/// Loads `path`, decodes meshopt-compressed buffer views, and compacts
/// buffer storage. The single entry point most callers want; `load::load`,
/// `meshopt::decode_meshopt_buffer_views` and `compact::compact_model` are
/// exposed separately for tests and for tooling that needs the intermediate
/// stages (e.g. inspecting an asset before compaction).
pub fn load_and_prepare(path: &Path) -> Result<model::Model> {
    let mut model = load::load(path)?;
    meshopt::decode_meshopt_buffer_views(&mut model)?;
    compact::compact_model(&mut model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use glam::Vec3;

    fn triangle_model() -> Model {
        // A single triangle: 3 positions (f32x3) in one buffer view, no
        // indices, one default material.
        let mut data = Vec::new();
        for v in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ] {
            data.extend_from_slice(&v.x.to_le_bytes());
            data.extend_from_slice(&v.y.to_le_bytes());
            data.extend_from_slice(&v.z.to_le_bytes());
        }

        let mut model = Model {
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
            ..Default::default()
        };
        model.nodes.push(Node {
            mesh: Some(0),
            visible: true,
            ..Default::default()
        });
        model.scenes.push(Scene {
            name: None,
            nodes: vec![0],
        });
        model
    }

    #[test]
    fn reads_positions_back() {
        let model = triangle_model();
        let positions = accessor::read_f32x3(&model, 0).unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn compaction_is_a_noop_on_a_fully_used_buffer() {
        let mut model = triangle_model();
        compact::compact_model(&mut model);
        assert_eq!(model.buffers.len(), 1);
        assert_eq!(model.buffer_views.len(), 1);
        let positions = accessor::read_f32x3(&model, 0).unwrap();
        assert_eq!(positions[2], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn compaction_drops_unreferenced_buffer_views() {
        let mut model = triangle_model();
        // An orphan buffer view nothing points to.
        model.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 0,
            byte_length: 12,
            byte_stride: None,
            meshopt: None,
        });
        compact::compact_model(&mut model);
        assert_eq!(model.buffer_views.len(), 1);
        let positions = accessor::read_f32x3(&model, 0).unwrap();
        assert_eq!(positions.len(), 3);
    }

    #[test]
    fn thin_walled_falls_back_to_double_sided_without_volume() {
        let mut m = Material {
            double_sided: true,
            ..Default::default()
        };
        assert!(m.is_thin_walled());
        m.volume.present = true;
        assert!(!m.is_thin_walled());
        m.thin_walled = Some(true);
        assert!(m.is_thin_walled());
    }

    #[test]
    fn unsupported_required_extension_is_rejected() {
        use std::io::Write;
        let dir = std::env::temp_dir().join(format!("asset-io-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.gltf");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"asset":{{"version":"2.0"}},"extensionsRequired":["KHR_totally_made_up"]}}"#
        )
        .unwrap();
        drop(f);

        let err = load::load(&path).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedRequiredExtension { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
