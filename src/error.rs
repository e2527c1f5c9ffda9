use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorizeError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid sieve threshold: {0} (must be at least 1)")]
    InvalidThreshold(usize),

    #[error("Unsupported export format \"{0}\" (supported: geojson, geopackage)")]
    UnsupportedFormat(String),

    #[error("Input raster has no coordinate reference system")]
    MissingCrs,

    #[error("Invalid input path: {0}")]
    InvalidInputPath(String),

    #[error("No .tif files found in directory: {0}")]
    NoInputs(String),
}

pub type Result<T> = std::result::Result<T, VectorizeError>;
