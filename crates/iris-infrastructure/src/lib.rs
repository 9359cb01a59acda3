//! Infrastructure layer: filesystem paths, atomic TOML storage, and the
//! directory-backed chat archive.

pub mod archive;
pub mod paths;
pub mod storage;

pub use archive::DirChatArchive;
pub use paths::IrisPaths;
pub use storage::AtomicTomlFile;
