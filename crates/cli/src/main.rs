//! urbdiff CLI - built-up change detection from satellite composites

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use urbdiff_algorithms::imagery::{index_difference, ndbi, threshold_masks, ChangeThresholds};
use urbdiff_algorithms::morphology::{dilate_mask, StructuringElement};
use urbdiff_algorithms::resample::max_resample;
use urbdiff_algorithms::vector::{dissolve, simplify_collection, vectorize_mask, VectorizeParams};
use urbdiff_catalog::sync_api::search_scenes;
use urbdiff_catalog::{Catalog, DateRange, SceneStore, SearchParams};
use urbdiff_colormap::{auto_params, raster_to_rgba, ColorScheme, ColormapParams};
use urbdiff_core::io::{read_geotiff, write_geojson, write_geotiff, write_shapefile};
use urbdiff_core::{Raster, Region};
use urbdiff_pipeline::{ChangeConfig, ChangePipeline, RunReport};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "urbdiff")]
#[command(author, version, about = "Urban built-up change detection", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full change pipeline against a local scene store
    Run {
        /// Scene manifest JSON
        #[arg(long)]
        manifest: PathBuf,
        /// Pipeline configuration JSON (reference defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the effective configuration to stdout and exit
        #[arg(long)]
        print_config: bool,
    },
    /// Search a remote catalog for candidate scenes
    Search {
        /// Catalog: "es" or a custom endpoint URL
        #[arg(long, default_value = "es")]
        catalog: String,
        /// Collection identifier
        #[arg(long, default_value = "sentinel-2-l2a")]
        collection: String,
        /// Region as min_lon,min_lat,max_lon,max_lat
        #[arg(long)]
        bbox: String,
        /// Window start, YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// Window end, YYYY-MM-DD
        #[arg(long)]
        end: String,
        /// Cloud cover ceiling in percent (strictly below)
        #[arg(long, default_value = "5.0")]
        max_cloud: f64,
        /// Scene list output file (JSON)
        output: PathBuf,
    },
    /// Compute the built-up index from two band rasters
    Index {
        /// SWIR band file
        #[arg(long)]
        swir: PathBuf,
        /// NIR band file
        #[arg(long)]
        nir: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Difference two index rasters and write the change masks
    Change {
        /// Baseline (earlier) index raster
        #[arg(long)]
        baseline: PathBuf,
        /// Comparison (later) index raster
        #[arg(long)]
        comparison: PathBuf,
        /// Change raster output file
        output: PathBuf,
        /// Gain mask output file
        #[arg(long)]
        gain_mask: Option<PathBuf>,
        /// Loss mask output file
        #[arg(long)]
        loss_mask: Option<PathBuf>,
        /// Gain threshold (strictly above)
        #[arg(long, default_value = "0.2")]
        gain_threshold: f64,
        /// Loss threshold (strictly below)
        #[arg(long, default_value = "-0.2")]
        loss_threshold: f64,
    },
    /// Convert a change mask raster into a vector layer
    Vectorize {
        /// Input mask raster
        #[arg(long)]
        mask: PathBuf,
        /// Output file (.geojson or .shp decides the format)
        output: PathBuf,
        /// Local-maximum smoothing radius in pixels (0 = none)
        #[arg(long, default_value = "1")]
        radius: usize,
        /// Coarse cell size in map units (0 = keep input resolution)
        #[arg(long, default_value = "0")]
        scale: f64,
        /// Minimum pixels per polygon
        #[arg(long, default_value = "15")]
        min_count: usize,
        /// Simplification tolerance in map units
        #[arg(long, default_value = "0")]
        tolerance: f64,
    },
    /// Render a raster to PNG with a diverging palette
    Render {
        /// Input raster
        input: PathBuf,
        /// Output PNG file
        output: PathBuf,
        /// Display range minimum (auto-detected when omitted)
        #[arg(long)]
        min: Option<f64>,
        /// Display range maximum (auto-detected when omitted)
        #[arg(long)]
        max: Option<f64>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_raster(raster: &Raster<f64>, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_bbox(s: &str) -> Result<Region> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse().context("Invalid bbox coordinate"))
        .collect::<Result<_>>()?;
    if parts.len() != 4 {
        anyhow::bail!("Bbox must be min_lon,min_lat,max_lon,max_lat, got: {}", s);
    }
    Ok(Region::new(parts[0], parts[1], parts[2], parts[3])?)
}

fn print_report(report: &RunReport) {
    println!("Scenes: {} baseline, {} comparison", report.baseline_scenes, report.comparison_scenes);
    println!(
        "Gain: {} mask pixels, {} polygons",
        report.gain_pixels, report.gain_polygons
    );
    println!(
        "Loss: {} mask pixels, {} polygons",
        report.loss_pixels, report.loss_polygons
    );
    for export in &report.exports {
        match &export.error {
            None => println!("  exported {}", export.path.display()),
            Some(err) => println!("  FAILED   {}: {}", export.path.display(), err),
        }
    }
}

fn render_png(raster: &Raster<f64>, params: &ColormapParams, path: &PathBuf) -> Result<()> {
    let rgba = raster_to_rgba(raster, params);
    let image = image::RgbaImage::from_raw(raster.cols() as u32, raster.rows() as u32, rgba)
        .context("RGBA buffer size mismatch")?;
    image.save(path).context("Failed to write PNG")?;
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            manifest,
            config,
            print_config,
        } => {
            let config = match config {
                Some(path) => ChangeConfig::from_file(&path).context("Failed to load config")?,
                None => ChangeConfig::default(),
            };

            if print_config {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }

            let store = SceneStore::load(&manifest).context("Failed to load scene manifest")?;
            let pipeline = ChangePipeline::new(config)?;

            let start = Instant::now();
            let report = pipeline.run(&store).context("Pipeline run failed")?;
            let elapsed = start.elapsed();

            print_report(&report);
            println!("  Processing time: {:.2?}", elapsed);

            if let Some(viz) = &pipeline.config().visualization {
                let params = ColormapParams::with_range(
                    ColorScheme::BlueWhiteRed,
                    viz.display_min,
                    viz.display_max,
                );
                if let Some(parent) = viz.change_png.parent() {
                    std::fs::create_dir_all(parent).ok();
                }
                render_png(&report.change, &params, &viz.change_png)?;
                println!("  rendered {}", viz.change_png.display());
            }
        }

        // ── Search ───────────────────────────────────────────────────
        Commands::Search {
            catalog,
            collection,
            bbox,
            start,
            end,
            max_cloud,
            output,
        } => {
            let region = parse_bbox(&bbox)?;
            let range = DateRange::parse(&start, &end)?;
            let params = SearchParams::new()
                .bbox(region.to_bbox())
                .date_range(&range)
                .collection(&collection)
                .max_cloud_cover(max_cloud)
                .limit(100);

            let pb = spinner("Searching catalog...");
            let begin = Instant::now();
            let scenes = search_scenes(Catalog::from_str_or_url(&catalog), &params)
                .context("Catalog search failed")?;
            let elapsed = begin.elapsed();
            pb.finish_and_clear();

            println!("Found {} scenes below {}% cloud cover", scenes.len(), max_cloud);
            std::fs::write(&output, serde_json::to_string_pretty(&scenes)?)?;
            done("Scene list", &output, elapsed);
        }

        // ── Index ────────────────────────────────────────────────────
        Commands::Index { swir, nir, output } => {
            let swir_r = read_raster(&swir)?;
            let nir_r = read_raster(&nir)?;
            let start = Instant::now();
            let result = ndbi(&swir_r, &nir_r).context("Failed to compute index")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("NDBI", &output, elapsed);
        }

        // ── Change ───────────────────────────────────────────────────
        Commands::Change {
            baseline,
            comparison,
            output,
            gain_mask,
            loss_mask,
            gain_threshold,
            loss_threshold,
        } => {
            let baseline_r = read_raster(&baseline)?;
            let comparison_r = read_raster(&comparison)?;

            let start = Instant::now();
            let change = index_difference(&baseline_r, &comparison_r)
                .context("Failed to difference indices")?;
            let thresholds = ChangeThresholds {
                gain: gain_threshold,
                loss: loss_threshold,
            };
            let (gain, loss) =
                threshold_masks(&change, thresholds).context("Failed to threshold change")?;
            let elapsed = start.elapsed();

            write_raster(&change, &output)?;
            done("Change raster", &output, elapsed);

            if let Some(path) = gain_mask {
                write_raster(&gain, &path)?;
                println!("Gain mask saved to: {}", path.display());
            }
            if let Some(path) = loss_mask {
                write_raster(&loss, &path)?;
                println!("Loss mask saved to: {}", path.display());
            }
        }

        // ── Vectorize ────────────────────────────────────────────────
        Commands::Vectorize {
            mask,
            output,
            radius,
            scale,
            min_count,
            tolerance,
        } => {
            let mut mask_r = read_raster(&mask)?;

            let start = Instant::now();
            if radius > 0 {
                mask_r = dilate_mask(&mask_r, &StructuringElement::Square(radius))
                    .context("Failed to smooth mask")?;
            }
            if scale > 0.0 {
                mask_r = max_resample(&mask_r, scale).context("Failed to resample mask")?;
            }

            let polygons = vectorize_mask(
                &mask_r,
                &VectorizeParams {
                    min_pixel_count: min_count,
                },
            )
            .context("Failed to vectorize mask")?;
            println!("{} polygons above {} pixels", polygons.len(), min_count);

            let simplified = if tolerance > 0.0 {
                simplify_collection(&polygons, tolerance)
            } else {
                polygons
            };
            let layer = dissolve(&simplified).context("Failed to dissolve layer")?;
            let elapsed = start.elapsed();

            let is_shapefile = output
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
            if is_shapefile {
                write_shapefile(&layer, &output).context("Failed to write shapefile")?;
            } else {
                write_geojson(&layer, &output).context("Failed to write GeoJSON")?;
            }
            done("Vector layer", &output, elapsed);
        }

        // ── Render ───────────────────────────────────────────────────
        Commands::Render {
            input,
            output,
            min,
            max,
        } => {
            let raster = read_raster(&input)?;

            let start = Instant::now();
            let params = match (min, max) {
                (Some(lo), Some(hi)) => {
                    ColormapParams::with_range(ColorScheme::BlueWhiteRed, lo, hi)
                }
                _ => auto_params(&raster, ColorScheme::BlueWhiteRed),
            };
            render_png(&raster, &params, &output)?;
            let elapsed = start.elapsed();
            done("Rendering", &output, elapsed);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}
