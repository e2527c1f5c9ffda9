use crate::cli::Args;
use crate::error::{Result, VectorizeError};
use crate::export::{export_vector_layer, ExportFormat};
use crate::io;
use crate::polygonize::polygonize;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Where per-item outputs land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Directory(PathBuf),
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Process every input raster. A failing item is logged and counted but
/// does not stop the batch; outputs already written stay valid.
pub fn run(args: &Args) -> Result<BatchSummary> {
    let inputs = collect_inputs(&args.raster)?;
    let target = resolve_output(&args.raster, args.output.as_deref())?;
    info!("Processing {} raster(s)", inputs.len());

    let mut summary = BatchSummary::default();
    for input in &inputs {
        info!("Processing {}", input.display());
        match process_file(input, &target, args.export_type, args.threshold) {
            Ok(written) => {
                info!("Wrote {}", written.display());
                summary.succeeded += 1;
            }
            Err(e) => {
                error!("Failed to process {}: {}", input.display(), e);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// List the rasters to process: a directory yields every direct `.tif`
/// child in sorted order, a single file yields itself.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "tif"))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(VectorizeError::NoInputs(path.display().to_string()));
        }
        Ok(files)
    } else if path.is_file() {
        Ok(vec![path.to_path_buf()])
    } else {
        Err(VectorizeError::InvalidInputPath(path.display().to_string()))
    }
}

/// Derive the output location. Without `-o`, a single file writes
/// `<stem>.geojson` next to itself and a directory writes into
/// `<dir>_out/`. An explicit `-o` without a file extension is treated as a
/// directory; directories are created if absent.
pub fn resolve_output(raster: &Path, output: Option<&Path>) -> Result<OutputTarget> {
    match output {
        None => {
            if raster.is_dir() {
                let mut name = raster.as_os_str().to_os_string();
                name.push("_out");
                let dir = PathBuf::from(name);
                fs::create_dir_all(&dir)?;
                Ok(OutputTarget::Directory(dir))
            } else {
                Ok(OutputTarget::File(raster.with_extension("geojson")))
            }
        }
        Some(out) => {
            if out.is_dir() {
                Ok(OutputTarget::Directory(out.to_path_buf()))
            } else if out.extension().is_none() {
                fs::create_dir_all(out)?;
                Ok(OutputTarget::Directory(out.to_path_buf()))
            } else {
                Ok(OutputTarget::File(out.to_path_buf()))
            }
        }
    }
}

/// Run the full pipeline for one raster and return the path written.
pub fn process_file(
    input: &Path,
    target: &OutputTarget,
    format: ExportFormat,
    threshold: usize,
) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| VectorizeError::InvalidInputPath(input.display().to_string()))?;

    let (data, metadata) = io::read_input_raster(input)?;
    let layer = polygonize(&data, &metadata.projection, &metadata.geotransform, threshold);

    let base = match target {
        OutputTarget::Directory(dir) => dir.join(stem),
        OutputTarget::File(file) => file.clone(),
    };
    export_vector_layer(&layer, &base, format, stem)
}
