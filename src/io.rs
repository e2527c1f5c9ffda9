use crate::error::{Result, VectorizeError};
use gdal::raster::RasterBand;
use gdal::Dataset;
use log::debug;
use ndarray::Array2;
use std::path::Path;

/// Georeferencing carried alongside the pixel data.
#[derive(Debug, Clone)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub geotransform: [f64; 6],
    pub projection: String,
}

/// Read band 1 of a raster and its georeferencing metadata
pub fn read_input_raster(path: &Path) -> Result<(Array2<i32>, RasterMetadata)> {
    debug!("Opening input raster: {}", path.display());
    let dataset = Dataset::open(path)?;

    let rasterband: RasterBand = dataset.rasterband(1)?;

    let width = rasterband.x_size() as usize;
    let height = rasterband.y_size() as usize;

    if width == 0 || height == 0 {
        return Err(VectorizeError::InvalidDimensions(width, height));
    }

    let geotransform = dataset.geo_transform()?;
    debug!("Raster dimensions: {}x{}", width, height);

    // Read entire raster into ndarray
    let buffer = rasterband.read_as::<i32>((0, 0), (width, height), (width, height), None)?;
    let data_vec: Vec<i32> = buffer.into_iter().collect();
    let data = Array2::from_shape_vec((height, width), data_vec)?;

    let metadata = RasterMetadata {
        width,
        height,
        geotransform,
        projection: dataset.projection(),
    };

    Ok((data, metadata))
}
