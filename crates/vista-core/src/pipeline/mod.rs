//! Image pipeline components.
//!
//! - **discovery**: Find image files in directories
//! - **validate**: Cheap pre-decode checks
//! - **decode**: Load and decode images
//! - **metadata**: Width, height, format and size for each image
//! - **hash**: BLAKE3 file digests
//! - **processor**: Orchestrates validate → decode → embed

pub mod decode;
pub mod discovery;
pub mod hash;
pub mod metadata;
pub mod processor;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::Hasher;
pub use metadata::{ImageStats, MetadataExtractor};
pub use processor::{BatchOutcome, ImageEmbedder, ImageLoader, PreparedImage};
pub use validate::Validator;
