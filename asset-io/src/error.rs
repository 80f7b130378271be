use std::path::PathBuf;

/// §7 error table, the rows owned by component A (the Asset Decoder).
/// Loader/parse failures are recovered at the load boundary: the caller gets
/// a whole `Err` and the previously-loaded model (if any) is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to parse glTF asset at {path}: {source}")]
    AssetParseFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("asset requires unsupported extension {extension:?}")]
    UnsupportedRequiredExtension { extension: String },

    #[error("EXT_meshopt_compression decode failed for buffer view {buffer_view}: {reason}")]
    MeshoptDecodeFailed { buffer_view: usize, reason: String },

    #[error("invalid accessor {accessor}: {reason}")]
    InvalidAccessor { accessor: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, AssetError>;
