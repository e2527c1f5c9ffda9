use crate::error::{Result, VectorizeError};
use crate::polygonize::VectorLayer;
use clap::ValueEnum;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{Geometry as OgrGeometry, LayerAccess, LayerOptions, OGRwkbGeometryType};
use gdal::DriverManager;
use geo_types::{Coord, LineString, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use log::{debug, info};
use serde_json::Map;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported vector output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Geojson,
    Geopackage,
}

impl FromStr for ExportFormat {
    type Err = VectorizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "geojson" => Ok(ExportFormat::Geojson),
            "gpkg" | "geopackage" => Ok(ExportFormat::Geopackage),
            other => Err(VectorizeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Append the canonical extension for `format` unless the path already
/// carries one that the format accepts.
pub fn normalize_extension(path: &Path, format: ExportFormat) -> PathBuf {
    let extension = path.extension().and_then(|e| e.to_str());
    let keep = match format {
        ExportFormat::Geojson => matches!(extension, Some("json") | Some("geojson")),
        ExportFormat::Geopackage => matches!(extension, Some("gpkg")),
    };
    if keep {
        return path.to_path_buf();
    }
    let suffix = match format {
        ExportFormat::Geojson => ".geojson",
        ExportFormat::Geopackage => ".gpkg",
    };
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write a vector layer to disk in the requested format and return the
/// path actually written.
pub fn export_vector_layer(
    layer: &VectorLayer,
    path: &Path,
    format: ExportFormat,
    layer_name: &str,
) -> Result<PathBuf> {
    let path = normalize_extension(path, format);
    match format {
        ExportFormat::Geojson => write_geojson(layer, &path)?,
        ExportFormat::Geopackage => write_geopackage(layer, &path, layer_name)?,
    }
    Ok(path)
}

/// GeoJSON output is always reprojected to WGS84. Features carry an empty
/// properties object.
fn write_geojson(layer: &VectorLayer, path: &Path) -> Result<()> {
    debug!("Reprojecting {} geometries to WGS84", layer.geometries.len());
    let geometries = reproject_to_wgs84(layer)?;

    let features: Vec<Feature> = geometries
        .iter()
        .map(|polygon| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(polygon_coordinates(polygon)))),
            id: None,
            properties: Some(Map::new()),
            foreign_members: None,
        })
        .collect();

    info!("Writing {} features to {}", features.len(), path.display());
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &collection)?;
    Ok(())
}

/// GeoPackage output keeps the original CRS and writes a single named layer.
fn write_geopackage(layer: &VectorLayer, path: &Path, layer_name: &str) -> Result<()> {
    if layer.projection.trim().is_empty() {
        return Err(VectorizeError::MissingCrs);
    }
    let srs = SpatialRef::from_wkt(&layer.projection)?;

    let driver = DriverManager::get_driver_by_name("GPKG")?;
    let mut dataset = driver.create_vector_only(path)?;
    let mut ogr_layer = dataset.create_layer(LayerOptions {
        name: layer_name,
        srs: Some(&srs),
        ty: OGRwkbGeometryType::wkbPolygon,
        ..Default::default()
    })?;

    info!(
        "Writing {} features to layer \"{}\" in {}",
        layer.geometries.len(),
        layer_name,
        path.display()
    );
    for polygon in &layer.geometries {
        ogr_layer.create_feature(to_ogr_polygon(polygon)?)?;
    }
    Ok(())
}

fn reproject_to_wgs84(layer: &VectorLayer) -> Result<Vec<Polygon<f64>>> {
    if layer.projection.trim().is_empty() {
        return Err(VectorizeError::MissingCrs);
    }
    let mut source = SpatialRef::from_wkt(&layer.projection)?;
    source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let mut wgs84 = SpatialRef::from_epsg(4326)?;
    wgs84.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let transform = CoordTransform::new(&source, &wgs84)?;

    layer
        .geometries
        .iter()
        .map(|polygon| {
            let exterior = reproject_ring(polygon.exterior(), &transform)?;
            let interiors = polygon
                .interiors()
                .iter()
                .map(|ring| reproject_ring(ring, &transform))
                .collect::<Result<Vec<_>>>()?;
            Ok(Polygon::new(exterior, interiors))
        })
        .collect()
}

fn reproject_ring(ring: &LineString<f64>, transform: &CoordTransform) -> Result<LineString<f64>> {
    let mut xs: Vec<f64> = ring.coords().map(|c| c.x).collect();
    let mut ys: Vec<f64> = ring.coords().map(|c| c.y).collect();
    let mut zs = vec![0.0; xs.len()];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Coord { x, y })
        .collect())
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    let ring_coordinates =
        |ring: &LineString<f64>| ring.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    let mut rings = vec![ring_coordinates(polygon.exterior())];
    for hole in polygon.interiors() {
        rings.push(ring_coordinates(hole));
    }
    rings
}

fn to_ogr_polygon(polygon: &Polygon<f64>) -> Result<OgrGeometry> {
    let mut geometry = OgrGeometry::empty(OGRwkbGeometryType::wkbPolygon)?;
    add_ring(&mut geometry, polygon.exterior())?;
    for hole in polygon.interiors() {
        add_ring(&mut geometry, hole)?;
    }
    Ok(geometry)
}

fn add_ring(geometry: &mut OgrGeometry, ring: &LineString<f64>) -> Result<()> {
    let mut ogr_ring = OgrGeometry::empty(OGRwkbGeometryType::wkbLinearRing)?;
    for coord in ring.coords() {
        ogr_ring.add_point_2d((coord.x, coord.y));
    }
    geometry.add_geometry(ogr_ring)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (0.0, 0.0),
            ]),
            vec![],
        )
    }

    fn wgs84_wkt() -> String {
        SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap()
    }

    #[test]
    fn test_normalize_adds_geojson_extension() {
        assert_eq!(
            normalize_extension(Path::new("out"), ExportFormat::Geojson),
            PathBuf::from("out.geojson")
        );
        assert_eq!(
            normalize_extension(Path::new("out.abc"), ExportFormat::Geojson),
            PathBuf::from("out.abc.geojson")
        );
    }

    #[test]
    fn test_normalize_adds_gpkg_extension() {
        assert_eq!(
            normalize_extension(Path::new("out"), ExportFormat::Geopackage),
            PathBuf::from("out.gpkg")
        );
    }

    #[test]
    fn test_normalize_keeps_matching_extension() {
        assert_eq!(
            normalize_extension(Path::new("out.geojson"), ExportFormat::Geojson),
            PathBuf::from("out.geojson")
        );
        assert_eq!(
            normalize_extension(Path::new("out.json"), ExportFormat::Geojson),
            PathBuf::from("out.json")
        );
        assert_eq!(
            normalize_extension(Path::new("out.gpkg"), ExportFormat::Geopackage),
            PathBuf::from("out.gpkg")
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(
            "geojson".parse::<ExportFormat>().unwrap(),
            ExportFormat::Geojson
        );
        assert_eq!(
            "geopackage".parse::<ExportFormat>().unwrap(),
            ExportFormat::Geopackage
        );
        assert!(matches!(
            "shapefile".parse::<ExportFormat>(),
            Err(VectorizeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_writes_geojson_document() {
        let dir = tempfile::tempdir().unwrap();
        let layer = VectorLayer {
            geometries: vec![unit_square()],
            projection: wgs84_wkt(),
        };
        let written =
            export_vector_layer(&layer, &dir.path().join("out"), ExportFormat::Geojson, "out")
                .unwrap();
        assert_eq!(written.extension().unwrap(), "geojson");

        let doc: serde_json::Value =
            serde_json::from_reader(File::open(&written).unwrap()).unwrap();
        assert_eq!(doc["type"], "FeatureCollection");
        let features = doc["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"], serde_json::json!({}));
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
    }

    #[test]
    fn test_writes_empty_geojson_collection() {
        let dir = tempfile::tempdir().unwrap();
        let layer = VectorLayer {
            geometries: vec![],
            projection: wgs84_wkt(),
        };
        let written = export_vector_layer(
            &layer,
            &dir.path().join("empty"),
            ExportFormat::Geojson,
            "empty",
        )
        .unwrap();

        let doc: serde_json::Value =
            serde_json::from_reader(File::open(&written).unwrap()).unwrap();
        assert_eq!(doc["type"], "FeatureCollection");
        assert!(doc["features"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_writes_geopackage_layer() {
        let dir = tempfile::tempdir().unwrap();
        let layer = VectorLayer {
            geometries: vec![unit_square()],
            projection: SpatialRef::from_epsg(32633).unwrap().to_wkt().unwrap(),
        };
        let written = export_vector_layer(
            &layer,
            &dir.path().join("blocks"),
            ExportFormat::Geopackage,
            "blocks",
        )
        .unwrap();
        assert_eq!(written.extension().unwrap(), "gpkg");

        let dataset = gdal::Dataset::open(&written).unwrap();
        let ogr_layer = dataset.layer(0).unwrap();
        assert_eq!(ogr_layer.name(), "blocks");
        assert_eq!(ogr_layer.feature_count(), 1);
    }

    #[test]
    fn test_missing_crs_is_an_error() {
        let layer = VectorLayer {
            geometries: vec![unit_square()],
            projection: String::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let result =
            export_vector_layer(&layer, &dir.path().join("out"), ExportFormat::Geojson, "out");
        assert!(matches!(result, Err(VectorizeError::MissingCrs)));
    }
}
