//! OpenRES CLI - river feature extraction for Functional Process Zones

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geo::Area;
use openres_algorithms::channel_belt::{
    belt_lines_to_features, generate_channel_belt, ChannelBeltParams, TaggedBelt,
};
use openres_algorithms::geometry::JoinStyle;
use openres_algorithms::lookup::PolygonAttributeLayer;
use openres_algorithms::pipeline::{
    centers_to_features, references_to_features, run_pipeline, transects_to_features, BeltMode,
    PipelineConfig, PipelineInputs,
};
use openres_algorithms::segments::{assign_segment_ids, segments_to_features};
use openres_algorithms::transect::BoundaryLayer;
use openres_algorithms::valley_floor::{
    delineate_valley_floor, rasterize_lines, Connectivity, ValleyFloorParams,
};
use openres_core::io::{read_geojson, read_geotiff, write_geojson, write_geotiff};
use openres_core::{AttributeLookup, Feature, FeatureCollection, PointSampler, Raster};
use openres_parallel::{CancelToken, ProcessingMode};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "openres")]
#[command(author, version, about = "Hydrogeomorphic feature extraction for river networks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Give every stream segment a unique t_ID
    Ids {
        /// Input stream network (GeoJSON lines)
        input: PathBuf,
        /// Output stream network with t_ID
        output: PathBuf,
    },
    /// Offset stream segments into left/right channel-belt lines
    ChannelBelt {
        /// Input stream network (GeoJSON lines)
        input: PathBuf,
        /// Output belt lines tagged with t_ID and side
        output: PathBuf,
        /// JSON file with channel-belt parameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Offset distance in layer units
        #[arg(short, long)]
        offset: Option<f64>,
        /// Join style: round, miter, bevel
        #[arg(short, long)]
        join: Option<String>,
        /// Arc vertices per quarter circle for round joins
        #[arg(long)]
        segments: Option<usize>,
        /// Miter limit before falling back to bevel
        #[arg(long)]
        miter_limit: Option<f64>,
    },
    /// Delineate the valley floor from a DEM and the stream network
    ValleyFloor {
        /// Input DEM (GeoTIFF)
        dem: PathBuf,
        /// Stream network burned in as the channel (GeoJSON lines)
        streams: PathBuf,
        /// Output valley-floor polygons (GeoJSON)
        output: PathBuf,
        /// Also write the valley-floor mask (GeoTIFF)
        #[arg(long)]
        mask: Option<PathBuf>,
        /// JSON file with valley-floor parameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Maximum slope (percent) propagation may cross
        #[arg(short, long)]
        slope_threshold: Option<f64>,
        /// Cell adjacency: 4 or 8
        #[arg(short, long)]
        connectivity: Option<String>,
        /// Exclude cells whose accumulated cost exceeds this
        #[arg(long)]
        max_cost: Option<f64>,
        /// Keep the whole coarse region instead of re-thresholding at its mean cost
        #[arg(long)]
        no_refine: bool,
        /// Closing radius in cells (0 disables)
        #[arg(long)]
        gap_cells: Option<usize>,
        /// Chaikin smoothing iterations
        #[arg(long)]
        smooth_iterations: Option<usize>,
        /// Chaikin corner-cut fraction, in (0, 0.5)
        #[arg(long)]
        smooth_offset: Option<f64>,
    },
    /// Run the full per-segment extraction
    Extract {
        /// Stream network (GeoJSON lines)
        #[arg(long)]
        streams: PathBuf,
        /// Valley lines (GeoJSON lines)
        #[arg(long)]
        valley_lines: PathBuf,
        /// DEM (GeoTIFF)
        #[arg(long)]
        dem: PathBuf,
        /// Channel-belt lines (GeoJSON lines, tagged with t_ID and side for tagged mode)
        #[arg(long)]
        belt: Option<PathBuf>,
        /// Precipitation surface (GeoTIFF)
        #[arg(long)]
        precipitation: Option<PathBuf>,
        /// Geology polygons (GeoJSON)
        #[arg(long, requires = "geology_field")]
        geology: Option<PathBuf>,
        /// Attribute of the geology layer written to GEO
        #[arg(long)]
        geology_field: Option<String>,
        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,
        /// JSON file with the run configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Transect growth step
        #[arg(long)]
        extension_increment: Option<f64>,
        /// Transect length cap per side
        #[arg(long)]
        max_length: Option<f64>,
        /// Belt sinuosity mode: split, tagged
        #[arg(long)]
        belt_mode: Option<String>,
        /// Worker threads (0 = sequential)
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} x {}", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

fn read_layer(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading layer...");
    let layer = read_geojson(path)
        .with_context(|| format!("Failed to read layer {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} features", path.display(), layer.len());
    Ok(layer)
}

fn write_layer(layer: &FeatureCollection, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geojson(layer, path).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn read_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Ok(T::default()),
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_join(s: &str) -> Result<JoinStyle> {
    match s.to_lowercase().as_str() {
        "round" | "r" => Ok(JoinStyle::Round),
        "miter" | "mitre" | "m" => Ok(JoinStyle::Miter),
        "bevel" | "b" => Ok(JoinStyle::Bevel),
        _ => anyhow::bail!("Unknown join style: {}. Use round, miter, or bevel.", s),
    }
}

fn parse_connectivity(s: &str) -> Result<Connectivity> {
    match s.to_lowercase().as_str() {
        "4" | "four" | "rook" => Ok(Connectivity::Four),
        "8" | "eight" | "queen" => Ok(Connectivity::Eight),
        _ => anyhow::bail!("Unknown connectivity: {}. Use 4 or 8.", s),
    }
}

fn parse_belt_mode(s: &str) -> Result<BeltMode> {
    match s.to_lowercase().as_str() {
        "split" | "split_at_transect" => Ok(BeltMode::SplitAtTransect),
        "tagged" | "tagged_sides" => Ok(BeltMode::TaggedSides),
        _ => anyhow::bail!("Unknown belt mode: {}. Use split or tagged.", s),
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn cmd_ids(input: &Path, output: &Path) -> Result<()> {
    let network = read_layer(input)?;
    let start = Instant::now();
    let segments = assign_segment_ids(&network).context("Failed to assign segment ids")?;
    let elapsed = start.elapsed();
    write_layer(&segments_to_features(&segments, network.crs.clone()), output)?;
    done("Stream network", output, elapsed);
    Ok(())
}

fn cmd_channel_belt(input: &Path, output: &Path, params: ChannelBeltParams) -> Result<()> {
    let network = read_layer(input)?;
    let segments = assign_segment_ids(&network).context("Failed to assign segment ids")?;
    let start = Instant::now();
    let lines = generate_channel_belt(&segments, &params).context("Failed to offset segments")?;
    let elapsed = start.elapsed();
    write_layer(&belt_lines_to_features(&lines, network.crs.clone()), output)?;
    done("Channel belt", output, elapsed);
    Ok(())
}

fn cmd_valley_floor(
    dem_path: &Path,
    streams: &Path,
    output: &Path,
    mask_path: Option<&Path>,
    params: ValleyFloorParams,
) -> Result<()> {
    let dem = read_raster(dem_path)?;
    let network = read_layer(streams)?;
    openres_core::crs::ensure_same_crs([("dem", dem.crs()), ("streams", network.crs.as_ref())])?;

    let start = Instant::now();
    let channel = rasterize_lines(&network.line_strings(), &dem);
    let floor = delineate_valley_floor(&dem, &channel, &params)
        .context("Failed to delineate valley floor")?;
    let elapsed = start.elapsed();

    let mut layer = FeatureCollection::with_crs(dem.crs().cloned());
    for (i, polygon) in floor.polygons.iter().enumerate() {
        layer.push(
            Feature::new(polygon.clone())
                .with_property("id", i as u32 + 1)
                .with_property("area", polygon.unsigned_area()),
        );
    }
    write_layer(&layer, output)?;
    if let Some(path) = mask_path {
        let pb = spinner("Writing mask...");
        write_geotiff(&floor.mask, path).context("Failed to write mask")?;
        pb.finish_and_clear();
    }
    println!(
        "  Reached cells: {}, polygons: {}",
        floor.reached_cells,
        floor.polygons.len()
    );
    if let Some(mean) = floor.mean_cost {
        println!("  Refined at mean cost: {:.4}", mean);
    }
    done("Valley floor", output, elapsed);
    Ok(())
}

struct ExtractPaths<'a> {
    streams: &'a Path,
    valley_lines: &'a Path,
    dem: &'a Path,
    belt: Option<&'a Path>,
    precipitation: Option<&'a Path>,
    geology: Option<(&'a Path, &'a str)>,
    out_dir: &'a Path,
}

fn cmd_extract(paths: ExtractPaths<'_>, config: PipelineConfig) -> Result<()> {
    config.validate().context("Invalid run configuration")?;

    let network = read_layer(paths.streams)?;
    let valley = read_layer(paths.valley_lines)?;
    let dem = read_raster(paths.dem)?;
    let belt = paths.belt.map(read_layer).transpose()?;
    let precipitation = paths.precipitation.map(read_raster).transpose()?;
    let geology = paths
        .geology
        .map(|(path, field)| -> Result<_> {
            let layer = read_layer(path)?;
            let bound = PolygonAttributeLayer::new(&layer, field)
                .with_context(|| format!("Failed to bind geology field '{}'", field))?;
            Ok((layer.crs, bound))
        })
        .transpose()?;

    let segments = assign_segment_ids(&network).context("Failed to assign segment ids")?;
    let valley_lines = BoundaryLayer::from_features(&valley);
    let belt_lines = belt.as_ref().map(BoundaryLayer::from_features);
    let tagged = belt.as_ref().map(TaggedBelt::from_features);

    let mut inputs = PipelineInputs::new(&segments, &valley_lines, &dem);
    inputs.channel_belt = belt_lines.as_ref();
    inputs.tagged_belt = tagged.as_ref().filter(|t| !t.is_empty());
    inputs.precipitation = precipitation.as_ref().map(|r| r as &dyn PointSampler);
    inputs.geology = geology.as_ref().map(|(_, g)| g as &dyn AttributeLookup);
    inputs.layer_crs = vec![
        ("streams", network.crs.as_ref()),
        ("valley lines", valley.crs.as_ref()),
        ("dem", dem.crs()),
    ];
    if let Some(b) = &belt {
        inputs.layer_crs.push(("channel belt", b.crs.as_ref()));
    }
    if let Some(p) = &precipitation {
        inputs.layer_crs.push(("precipitation", p.crs()));
    }
    if let Some((crs, _)) = &geology {
        inputs.layer_crs.push(("geology", crs.as_ref()));
    }

    let start = Instant::now();
    let pb = spinner("Extracting segment attributes...");
    let output = run_pipeline(&inputs, &config, &CancelToken::new());
    pb.finish_and_clear();
    let output = output.context("Extraction failed")?;
    let elapsed = start.elapsed();

    std::fs::create_dir_all(paths.out_dir)
        .with_context(|| format!("Failed to create {}", paths.out_dir.display()))?;
    let crs = network.crs.clone();
    let centers_path = paths.out_dir.join("segment_centers.geojson");
    write_layer(
        &segments_to_features(&segments, crs.clone()),
        &paths.out_dir.join("streams_tid.geojson"),
    )?;
    write_layer(
        &transects_to_features(&output.transects, crs.clone()),
        &paths.out_dir.join("transects.geojson"),
    )?;
    write_layer(
        &references_to_features(&output.references, crs.clone()),
        &paths.out_dir.join("reference_points.geojson"),
    )?;
    write_layer(&centers_to_features(&output.centers, crs), &centers_path)?;

    let incomplete = output
        .centers
        .iter()
        .filter(|c| !c.attributes.is_complete())
        .count();
    println!(
        "  Segments: {}, with unresolved attributes: {}",
        output.centers.len(),
        incomplete
    );
    done("Segment centers", &centers_path, elapsed);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Ids { input, output } => cmd_ids(&input, &output)?,

        Commands::ChannelBelt {
            input,
            output,
            config,
            offset,
            join,
            segments,
            miter_limit,
        } => {
            let mut params: ChannelBeltParams = read_config(config.as_deref())?;
            if let Some(v) = offset {
                params.offset = v;
            }
            if let Some(v) = join {
                params.join = parse_join(&v)?;
            }
            if let Some(v) = segments {
                params.segments = v;
            }
            if let Some(v) = miter_limit {
                params.miter_limit = v;
            }
            cmd_channel_belt(&input, &output, params)?;
        }

        Commands::ValleyFloor {
            dem,
            streams,
            output,
            mask,
            config,
            slope_threshold,
            connectivity,
            max_cost,
            no_refine,
            gap_cells,
            smooth_iterations,
            smooth_offset,
        } => {
            let mut params: ValleyFloorParams = read_config(config.as_deref())?;
            if let Some(v) = slope_threshold {
                params.slope_threshold = v;
            }
            if let Some(v) = connectivity {
                params.connectivity = parse_connectivity(&v)?;
            }
            if max_cost.is_some() {
                params.max_cost = max_cost;
            }
            if no_refine {
                params.refine_with_mean = false;
            }
            if let Some(v) = gap_cells {
                params.gap_cells = v;
            }
            if let Some(v) = smooth_iterations {
                params.smooth_iterations = v;
            }
            if let Some(v) = smooth_offset {
                params.smooth_offset = v;
            }
            cmd_valley_floor(&dem, &streams, &output, mask.as_deref(), params)?;
        }

        Commands::Extract {
            streams,
            valley_lines,
            dem,
            belt,
            precipitation,
            geology,
            geology_field,
            out_dir,
            config,
            extension_increment,
            max_length,
            belt_mode,
            threads,
        } => {
            let mut run: PipelineConfig = read_config(config.as_deref())?;
            if let Some(v) = extension_increment {
                run.transect.extension_increment = v;
            }
            if let Some(v) = max_length {
                run.transect.max_length = v;
            }
            if let Some(v) = belt_mode {
                run.belt_mode = parse_belt_mode(&v)?;
            }
            if let Some(n) = threads {
                run.processing = match n {
                    0 => ProcessingMode::Sequential,
                    n => ProcessingMode::ParallelWith(n),
                };
            }
            let geology = match (geology.as_deref(), geology_field.as_deref()) {
                (Some(path), Some(field)) => Some((path, field)),
                _ => None,
            };
            cmd_extract(
                ExtractPaths {
                    streams: &streams,
                    valley_lines: &valley_lines,
                    dem: &dem,
                    belt: belt.as_deref(),
                    precipitation: precipitation.as_deref(),
                    geology,
                    out_dir: &out_dir,
                },
                run,
            )?;
        }
    }

    Ok(())
}
