// Library exports for testing and reuse

pub mod batch;
pub mod cli;
pub mod error;
pub mod export;
pub mod io;
pub mod polygonize;
pub mod sieve;

// Re-export commonly used types
pub use error::{Result, VectorizeError};
pub use export::{export_vector_layer, normalize_extension, ExportFormat};
pub use io::{read_input_raster, RasterMetadata};
pub use polygonize::{polygonize, shapes, VectorLayer};
pub use sieve::{sieve, Connectivity};
