//! §7 error table, rows owned by components B-F. Asset-decode failures stay
//! in `asset_io::AssetError`; `CoreError::Asset` wraps them for callers that
//! only want one error type across the whole pipeline.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Asset(#[from] asset_io::AssetError),

    #[error("scene references node {node} which does not exist")]
    DanglingNodeReference { node: usize },

    #[error("primitive in mesh {mesh} has no POSITION attribute")]
    MissingPositionAttribute { mesh: usize },

    #[error("animation pointer {pointer:?} does not resolve to a known resource")]
    UnresolvedAnimationPointer { pointer: String },

    #[error("acceleration structure build failed for render primitive {render_primitive}: {reason}")]
    AccelerationStructureBuildFailed { render_primitive: usize, reason: String },

    #[error("GPU buffer {name} overflowed its allocated capacity ({needed} > {capacity})")]
    GpuTableOverflow {
        name: String,
        needed: usize,
        capacity: usize,
    },

    #[error("failed to save asset to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
