use crate::export::ExportFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vectorize")]
#[command(about = "Convert classified rasters to vector polygon layers")]
#[command(version)]
pub struct Args {
    /// Input raster file, or directory of .tif files
    pub raster: PathBuf,

    /// The file type to export the data to
    #[arg(
        short = 't',
        long = "export_type",
        value_enum,
        default_value = "geopackage"
    )]
    pub export_type: ExportFormat,

    /// The location to write to
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Threshold in pixels of raster polygons to be removed
    #[arg(short = 'd', long, value_name = "PIXELS", default_value_t = 10)]
    pub threshold: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["vectorize", "input.tif"]).unwrap();
        assert_eq!(args.raster, PathBuf::from("input.tif"));
        assert_eq!(args.export_type, ExportFormat::Geopackage);
        assert_eq!(args.threshold, 10);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_rejects_unknown_export_type() {
        assert!(Args::try_parse_from(["vectorize", "input.tif", "-t", "shapefile"]).is_err());
    }

    #[test]
    fn test_short_flags() {
        let args = Args::try_parse_from([
            "vectorize", "masks/", "-t", "geojson", "-o", "vectors/", "-d", "25",
        ])
        .unwrap();
        assert_eq!(args.export_type, ExportFormat::Geojson);
        assert_eq!(args.output, Some(PathBuf::from("vectors/")));
        assert_eq!(args.threshold, 25);
    }
}
