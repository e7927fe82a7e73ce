use std::io;
use std::str::Utf8Error;
use btleplug;
use serde_json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("No device specified and no previously used printer is known (pass --device)")]
    NoTargetDevice,

    #[error("No device matching \"{wanted}\" was discovered during the scan window")]
    DeviceNotFound { wanted: String },

    #[error("The device has no writable-without-response characteristic")]
    MissingCharacteristic,

    #[error("Write to characteristic {uuid} did not complete within {deadline_ms}ms")]
    WriteTimeout { uuid: Uuid, deadline_ms: u64 },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to run command (device): {source}")]
    Device { #[from] source: DeviceError },

    #[error("Failed to run command (config): {source}")]
    ConfigError { #[from] source: ConfigError },
}
