pub mod block;
pub mod layer;
pub mod light;
pub mod params;
pub mod settings;

pub use block::{CloudUniforms, LayerBlock, ParameterBlock};
pub use layer::NoiseLayer;
pub use light::{DirectionalLight, LightVector};
pub use params::{CloudVolumeParameters, SettingsChange, SettingsObserver};
pub use settings::{CloudSettings, NoiseSettings, SettingsError};
