//! Configuration loaded from `.encrypto.toml`.

pub mod settings;

pub use settings::Settings;
