pub mod animation;
pub mod error;
pub mod gpu;
pub mod save;
pub mod scene;
pub mod settings;

pub mod accel;
pub mod pathtracer;

pub use bytemuck;
pub use glam;
pub use gltf_helpers;
pub use shared_structs;

pub use error::{CoreError, Result};
pub use scene::Scene;
pub use settings::EngineSettings;
