//! forestmgmt CLI - forest management constraint analysis

mod export;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use forestmgmt_algorithms::constraint::ConstraintParams;
use forestmgmt_algorithms::pipeline::{ConstraintPipeline, DataSources, DemSlope, FeatureLayer, RasterLayer};
use forestmgmt_core::io::{
    read_geometries, read_geotiff, read_protected_areas, read_regions, write_treatable_geojson,
    ProtectedAreaFields, RegionFields,
};
use forestmgmt_core::{Raster, Region};
use forestmgmt_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "forestmgmt")]
#[command(author, version, about = "Forest management constraint analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the constraint pipeline and export statistics and treatable polygons
    Run {
        #[command(flatten)]
        regions: RegionArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[command(flatten)]
        execution: ExecutionArgs,
        /// Land-cover classification GeoTIFF
        #[arg(long)]
        landcover: PathBuf,
        /// Slope GeoTIFF in percent rise
        #[arg(long, conflicts_with = "dem")]
        slope: Option<PathBuf>,
        /// Elevation GeoTIFF; slope is derived with Horn's method
        #[arg(long)]
        dem: Option<PathBuf>,
        /// Protected-lands GeoJSON
        #[arg(long)]
        protected: Option<PathBuf>,
        /// Property holding the protection status code
        #[arg(long, default_value = "GAP_Sts")]
        status_field: String,
        /// Property holding the designation type
        #[arg(long, default_value = "Des_Tp")]
        designation_field: String,
        /// Critical-habitat GeoJSON
        #[arg(long)]
        habitat: Option<PathBuf>,
        /// Hydrography GeoJSON (repeatable)
        #[arg(long = "hydro")]
        hydrography: Vec<PathBuf>,
        /// Road or trail GeoJSON (repeatable; all sources are unioned)
        #[arg(long)]
        roads: Vec<PathBuf>,
        /// Output prefix: writes <prefix>_statistics.csv and <prefix>_treatable.geojson
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Tabulate land-cover class areas per region
    ClassAreas {
        #[command(flatten)]
        regions: RegionArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[command(flatten)]
        execution: ExecutionArgs,
        /// Land-cover classification GeoTIFF
        #[arg(long)]
        landcover: PathBuf,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Report the sub-regions (HUC-12 watersheds, for example) lying mostly inside each region
    Subregions {
        #[command(flatten)]
        regions: RegionArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[command(flatten)]
        execution: ExecutionArgs,
        /// Land-cover classification GeoTIFF
        #[arg(long)]
        landcover: PathBuf,
        /// Sub-region polygons (GeoJSON)
        #[arg(long)]
        subregions: PathBuf,
        /// Property used as sub-region identifier
        #[arg(long, default_value = "huc12")]
        subregion_id_field: String,
        /// Property used as sub-region name
        #[arg(long, default_value = "name")]
        subregion_name_field: String,
        /// Column prefix for the sub-region fields
        #[arg(long, default_value = "huc12")]
        prefix: String,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate parameters and print the resolved configuration
    CheckParams {
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Args)]
struct RegionArgs {
    /// Regions of interest (GeoJSON polygons)
    #[arg(long)]
    regions: PathBuf,
    /// Property used as region identifier (default: feature id or index)
    #[arg(long)]
    id_field: Option<String>,
    /// Property used as region name
    #[arg(long, default_value = "NAME")]
    name_field: String,
    /// Keep only regions with FIELD equal to one of the values, e.g. STATE=Montana,Idaho
    #[arg(long, value_name = "FIELD=VALUES")]
    only: Option<String>,
}

#[derive(Args)]
struct ParamArgs {
    /// JSON file with constraint parameters
    #[arg(long = "params")]
    file: Option<PathBuf>,
    /// Candidate land-cover classes, comma separated
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<u16>>,
    /// Maximum slope in percent
    #[arg(long)]
    max_slope: Option<f64>,
    /// Road buffer distance in feet
    #[arg(long)]
    road_buffer_ft: Option<f64>,
    /// Riparian buffer distance in feet
    #[arg(long)]
    riparian_buffer_ft: Option<f64>,
    /// Excluded protection status codes, comma separated
    #[arg(long, value_delimiter = ',')]
    gap_codes: Option<Vec<u8>>,
    /// Analysis cell size in metres
    #[arg(long)]
    cell_size: Option<f64>,
    /// Rasterization tile size in cells
    #[arg(long)]
    tile_size: Option<usize>,
    /// Smallest share of a sub-region that must fall inside a region
    #[arg(long)]
    min_overlap: Option<f64>,
}

#[derive(Args)]
struct ExecutionArgs {
    /// Worker threads for region processing (default: all cores)
    #[arg(short = 'j', long, conflicts_with = "sequential")]
    threads: Option<usize>,
    /// Process regions one at a time
    #[arg(long)]
    sequential: bool,
}

impl ParamArgs {
    /// File values (or defaults) with command-line overrides applied
    fn resolve(&self) -> Result<ConstraintParams> {
        let mut params = match &self.file {
            Some(path) => {
                let text =
                    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("Invalid parameters in {}", path.display()))?
            }
            None => ConstraintParams::default(),
        };

        if let Some(classes) = &self.classes {
            params.landcover_classes = classes.clone();
        }
        if let Some(v) = self.max_slope {
            params.max_slope_percent = v;
        }
        if let Some(v) = self.road_buffer_ft {
            params.road_buffer_distance = v;
        }
        if let Some(v) = self.riparian_buffer_ft {
            params.riparian_buffer_distance = v;
        }
        if let Some(codes) = &self.gap_codes {
            params.gap_status_codes = codes.clone();
        }
        if let Some(v) = self.cell_size {
            params.cell_size_m = v;
        }
        if let Some(v) = self.tile_size {
            params.tile_size = v;
        }
        if let Some(v) = self.min_overlap {
            params.min_subregion_overlap = v;
        }

        Ok(params)
    }
}

impl ExecutionArgs {
    fn mode(&self) -> ProcessingMode {
        match (self.sequential, self.threads) {
            (true, _) => ProcessingMode::Sequential,
            (false, Some(n)) => ProcessingMode::ParallelWith(n),
            (false, None) => ProcessingMode::Parallel,
        }
    }
}

/// Attribute filter parsed from `FIELD=V1,V2`
#[derive(Debug, PartialEq)]
struct RegionFilter {
    field: String,
    values: Vec<String>,
}

impl RegionFilter {
    fn parse(expr: &str) -> Result<Self> {
        let (field, values) = expr
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUES, got '{}'", expr))?;
        let values: Vec<String> = values
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if field.trim().is_empty() || values.is_empty() {
            anyhow::bail!("Expected FIELD=VALUES, got '{}'", expr);
        }
        Ok(Self {
            field: field.trim().to_string(),
            values,
        })
    }

    fn matches(&self, region: &Region) -> bool {
        region
            .attribute(&self.field)
            .is_some_and(|v| self.values.iter().any(|want| *want == v.to_string()))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_regions(args: &RegionArgs) -> Result<Vec<Region>> {
    let fields = RegionFields {
        id_field: args.id_field.clone(),
        name_field: args.name_field.clone(),
    };
    let pb = spinner("Reading regions...");
    let mut regions = read_regions(&args.regions, &fields)
        .with_context(|| format!("Failed to read regions from {}", args.regions.display()))?;
    pb.finish_and_clear();

    if let Some(expr) = &args.only {
        let filter = RegionFilter::parse(expr)?;
        let before = regions.len();
        regions.retain(|r| filter.matches(r));
        info!("Selected {} of {} regions by {}", regions.len(), before, expr);
    } else {
        info!("Loaded {} regions", regions.len());
    }

    if regions.is_empty() {
        warn!("No regions to process");
    }
    Ok(regions)
}

fn read_raster<T: forestmgmt_core::RasterElement>(path: &Path, what: &str) -> Result<Raster<T>> {
    let pb = spinner(&format!("Reading {}...", what));
    let raster: Raster<T> =
        read_geotiff(path).with_context(|| format!("Failed to read {} raster {}", what, path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} x {}, cell size {}", what, raster.cols(), raster.rows(), raster.cell_size());
    Ok(raster)
}

fn read_lines(path: &Path, what: &str) -> Result<FeatureLayer<geo::Geometry<f64>>> {
    let geometries =
        read_geometries(path).with_context(|| format!("Failed to read {} layer {}", what, path.display()))?;
    info!("{}: {} features from {}", what, geometries.len(), path.display());
    Ok(FeatureLayer::new(geometries))
}

fn output_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    prefix.with_file_name(name)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            regions,
            params,
            execution,
            landcover,
            slope,
            dem,
            protected,
            status_field,
            designation_field,
            habitat,
            hydrography,
            roads,
            output,
        } => {
            let params = params.resolve()?;
            let region_list = load_regions(&regions)?;

            let mut sources = DataSources::new(RasterLayer::new(read_raster::<u16>(&landcover, "Land cover")?));
            if let Some(path) = &slope {
                sources = sources.with_slope(RasterLayer::new(read_raster::<f64>(path, "Slope")?));
            } else if let Some(path) = &dem {
                sources = sources.with_slope(DemSlope::new(read_raster::<f64>(path, "DEM")?));
            }
            if let Some(path) = &protected {
                let fields = ProtectedAreaFields {
                    status_field,
                    designation_field,
                };
                let areas = read_protected_areas(path, &fields)
                    .with_context(|| format!("Failed to read protected lands {}", path.display()))?;
                info!("Protected lands: {} features", areas.len());
                sources = sources.with_protected(FeatureLayer::new(areas));
            }
            if let Some(path) = &habitat {
                sources = sources.with_habitat(read_lines(path, "Critical habitat")?);
            }
            for path in &hydrography {
                sources = sources.with_hydrography(read_lines(path, "Hydrography")?);
            }
            for path in &roads {
                sources = sources.with_roads(read_lines(path, "Roads")?);
            }

            let pipeline = ConstraintPipeline::new(params, sources).context("Invalid constraint parameters")?;

            let start = Instant::now();
            let pb = spinner(&format!("Processing {} regions...", region_list.len()));
            let report = pipeline.run_batch(&region_list, execution.mode())?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            for outcome in &report.outcomes {
                match outcome.skip_reason() {
                    None => println!("  {} ({}): ok", outcome.region_id, outcome.region_name),
                    Some(reason) => println!("  {} ({}): skipped - {}", outcome.region_id, outcome.region_name, reason),
                }
            }
            println!(
                "{} regions completed, {} skipped",
                report.completed_count(),
                report.skipped_count()
            );

            let stats_path = output_path(&output, "_statistics.csv");
            export::write_statistics_csv(&stats_path, &region_list, &report)?;
            done("Statistics", &stats_path, elapsed);

            let features: Vec<_> = report.results().flat_map(|r| r.features.iter().cloned()).collect();
            let vector_path = output_path(&output, "_treatable.geojson");
            write_treatable_geojson(&vector_path, &features)
                .with_context(|| format!("Failed to write {}", vector_path.display()))?;
            println!("Treatable polygons ({}) saved to: {}", features.len(), vector_path.display());
        }

        Commands::ClassAreas {
            regions,
            params,
            execution,
            landcover,
            output,
        } => {
            let params = params.resolve()?;
            let region_list = load_regions(&regions)?;
            let sources = DataSources::new(RasterLayer::new(read_raster::<u16>(&landcover, "Land cover")?));
            let pipeline = ConstraintPipeline::new(params, sources).context("Invalid constraint parameters")?;

            let start = Instant::now();
            let pb = spinner("Tabulating land-cover classes...");
            let report = pipeline.class_area_batch(&region_list, execution.mode())?;
            pb.finish_and_clear();

            export::write_class_areas_csv(&output, &report)?;
            done("Class areas", &output, start.elapsed());
        }

        Commands::Subregions {
            regions,
            params,
            execution,
            landcover,
            subregions,
            subregion_id_field,
            subregion_name_field,
            prefix,
            output,
        } => {
            let params = params.resolve()?;
            let region_list = load_regions(&regions)?;

            let fields = RegionFields {
                id_field: Some(subregion_id_field),
                name_field: subregion_name_field,
            };
            let units = read_regions(&subregions, &fields)
                .with_context(|| format!("Failed to read sub-regions from {}", subregions.display()))?;
            info!("Sub-regions: {} features", units.len());

            let sources = DataSources::new(RasterLayer::new(read_raster::<u16>(&landcover, "Land cover")?))
                .with_subregions(FeatureLayer::new(units));
            let pipeline = ConstraintPipeline::new(params, sources).context("Invalid constraint parameters")?;

            let start = Instant::now();
            let pb = spinner("Overlaying sub-regions...");
            let report = pipeline.subregion_batch(&region_list, execution.mode())?;
            pb.finish_and_clear();

            let kept: usize = report.results().map(Vec::len).sum();
            println!(
                "{} sub-regions kept across {} regions ({} skipped)",
                kept,
                report.completed_count(),
                report.skipped_count()
            );

            export::write_subregions_csv(&output, &prefix, &report)?;
            done("Sub-region overlay", &output, start.elapsed());
        }

        Commands::CheckParams { params } => {
            let params = params.resolve()?;
            params.validate().context("Invalid constraint parameters")?;
            println!("{}", serde_json::to_string_pretty(&params)?);
            println!(
                "Road buffer: {:.1} m, riparian buffer: {:.1} m",
                params.road_buffer_m(),
                params.riparian_buffer_m()
            );
        }
    }

    Ok(())
}
