//! Configuration loading and settings types.

mod settings;

pub use settings::{
    BackendSettings, GatewaySettings, LineSettings, MediaSettings, MonitorSettings,
    RuntimeSettings, load_runtime_settings,
};
