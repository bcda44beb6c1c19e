use clap::Parser;
use griddecode::{
    AnchorPreset, AnchorPriors, BoundingBox, DecodeConfig, Detection, GridShape,
    PostprocessConfig, Postprocessor,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Grid detector postprocessing CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

/// Anchor priors given either as a preset name or as `[width, height]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnchorsConfig {
    Preset(String),
    Explicit(Vec<(f32, f32)>),
}

impl Default for AnchorsConfig {
    fn default() -> Self {
        Self::Preset(AnchorPreset::CustomVision.name().to_owned())
    }
}

impl AnchorsConfig {
    fn resolve(&self) -> Result<AnchorPriors, Box<dyn std::error::Error>> {
        match self {
            Self::Preset(name) => AnchorPreset::from_name(name)
                .map(AnchorPriors::preset)
                .ok_or_else(|| format!("unknown anchor preset '{name}'").into()),
            Self::Explicit(pairs) => Ok(AnchorPriors::from_pairs(pairs)?),
        }
    }
}

/// Raw tensor file contents: a flat array or a `[height][width][channels]`
/// nested array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTensor {
    Flat(Vec<f32>),
    Nested(Vec<Vec<Vec<f32>>>),
}

impl RawTensor {
    /// Flattens the tensor and returns it with its grid, if the shape
    /// carries one.
    fn into_flat(self) -> Result<(Vec<f32>, Option<GridShape>), Box<dyn std::error::Error>> {
        match self {
            Self::Flat(data) => Ok((data, None)),
            Self::Nested(rows) => {
                let height = rows.len();
                let width = rows.first().map_or(0, Vec::len);
                let channels = rows.first().and_then(|r| r.first()).map_or(0, Vec::len);
                let mut data = Vec::with_capacity(height * width * channels);
                for row in rows {
                    if row.len() != width {
                        return Err("nested tensor rows must all have the same width".into());
                    }
                    for cell in row {
                        if cell.len() != channels {
                            return Err(
                                "nested tensor cells must all have the same channel count".into()
                            );
                        }
                        data.extend(cell);
                    }
                }
                Ok((data, Some(GridShape::new(height, width))))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    raw_path: String,
    /// `[height, width]`; required for flat tensors.
    grid: Option<(usize, usize)>,
    anchors: AnchorsConfig,
    labels: Vec<String>,
    confidence_threshold: Option<f32>,
    max_detections: usize,
    iou_threshold: f32,
    clamp: bool,
    reject_non_finite: bool,
    parallel: bool,
    output_path: Option<String>,
    /// `[width, height]` of the model input; adds pixel boxes to the output.
    pixel_size: Option<(f64, f64)>,
}

impl Default for Config {
    fn default() -> Self {
        let decode = DecodeConfig::default();
        Self {
            raw_path: String::new(),
            grid: None,
            anchors: AnchorsConfig::default(),
            labels: Vec::new(),
            confidence_threshold: None,
            max_detections: 20,
            iou_threshold: griddecode::SelectConfig::DEFAULT_IOU_THRESHOLD,
            clamp: false,
            reject_non_finite: decode.reject_non_finite,
            parallel: decode.parallel,
            output_path: None,
            pixel_size: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct BoxRecord {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl From<BoundingBox> for BoxRecord {
    fn from(value: BoundingBox) -> Self {
        Self {
            left: value.left,
            top: value.top,
            width: value.width,
            height: value.height,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectionRecord {
    class_id: usize,
    class_name: String,
    confidence: f64,
    bounding_box: BoxRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_box: Option<BoxRecord>,
}

impl DetectionRecord {
    fn new(det: Detection, pixel_size: Option<(f64, f64)>) -> Self {
        let pixel_box = pixel_size.map(|(w, h)| det.bounding_box.to_pixels(w, h).into());
        Self {
            class_id: det.class_id,
            class_name: det.class_name,
            confidence: det.confidence,
            bounding_box: det.bounding_box.into(),
            pixel_box,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    grid: (usize, usize),
    detections: Vec<DetectionRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("griddecode=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.raw_path.is_empty() {
        return Err("raw_path must be set in the config".into());
    }
    if config.labels.is_empty() {
        return Err("labels must list at least one class name".into());
    }
    let Some(confidence_threshold) = config.confidence_threshold else {
        return Err("confidence_threshold must be set in the config".into());
    };

    let raw_text = fs::read_to_string(&config.raw_path)?;
    let raw: RawTensor = serde_json::from_str(&raw_text)?;
    let (data, shape_grid) = raw.into_flat()?;
    let grid = match (shape_grid, config.grid) {
        (Some(inferred), Some((height, width))) => {
            if inferred != GridShape::new(height, width) {
                return Err("grid does not match the nested tensor shape".into());
            }
            inferred
        }
        (Some(inferred), None) => inferred,
        (None, Some((height, width))) => GridShape::new(height, width),
        (None, None) => return Err("grid must be set for a flat tensor".into()),
    };
    tracing::info!(
        values = data.len(),
        height = grid.height,
        width = grid.width,
        "loaded raw tensor"
    );

    let anchors = config.anchors.resolve()?;
    let pp_config = PostprocessConfig::new(
        config.labels,
        confidence_threshold,
        config.max_detections,
    )
    .with_iou_threshold(config.iou_threshold)
    .with_clamp(config.clamp)
    .with_decode(DecodeConfig {
        reject_non_finite: config.reject_non_finite,
        parallel: config.parallel,
    });
    let processor = Postprocessor::new(anchors, pp_config)?;
    let detections = processor.run(&data, grid)?;
    tracing::info!(count = detections.len(), "postprocessing done");

    let output = Output {
        grid: (grid.height, grid.width),
        detections: detections
            .into_iter()
            .map(|det| DetectionRecord::new(det, config.pixel_size))
            .collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
