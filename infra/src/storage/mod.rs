//! Uploaded media storage

mod filesystem;

pub use filesystem::FileSystemMediaStorage;
