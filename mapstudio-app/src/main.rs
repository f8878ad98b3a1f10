use anyhow::{bail, Context};
use log::{info, warn};
use mapstudio::{
    background::ingest::{DatasetSource, HttpSource, InlineSource},
    MapStudio, StudioOptions,
};
use serde_json::json;
use std::sync::Arc;

const USAGE: &str = "usage: mapstudio-app <file-or-url> [--color-by <attribute>] [--config <options.json>]";

struct Args {
    input: String,
    color_by: Option<String>,
    config: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut input = None;
    let mut color_by = None;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--color-by" => color_by = Some(args.next().context("--color-by needs a value")?),
            "--config" => config = Some(args.next().context("--config needs a path")?),
            "-h" | "--help" => bail!(USAGE),
            _ if input.is_none() => input = Some(arg.clone()),
            other => bail!("unexpected argument '{}'\n{}", other, USAGE),
        }
    }

    Ok(Args {
        input: input.context(USAGE)?,
        color_by,
        config,
    })
}

fn load_source(input: &str) -> anyhow::Result<Arc<dyn DatasetSource>> {
    if input.starts_with("http://") || input.starts_with("https://") {
        let name = input.rsplit('/').next().unwrap_or(input).to_string();
        return Ok(Arc::new(HttpSource::new(name, input)));
    }

    let source =
        InlineSource::from_path(input).with_context(|| format!("failed to read {}", input))?;
    Ok(Arc::new(source))
}

/// Headless front end: ingests one dataset and prints the resulting layers
/// and legends as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mapstudio::init_logging();

    let args = parse_args()?;
    let options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path))?;
            StudioOptions::from_json_str(&text)?
        }
        None => StudioOptions::default(),
    };

    let source = load_source(&args.input)?;
    let mut studio = MapStudio::new(options)?;

    let job = studio.begin_ingestion(source)?;
    tokio::spawn(job.run()).await?;

    let mut layer_ids = Vec::new();
    for outcome in studio.poll_ingestion() {
        let report = outcome?;
        info!(
            "{} features, {} layers, completeness {}",
            report.summary.feature_count,
            report.layer_ids.len(),
            report.summary.completeness
        );
        if report.summary.truncated {
            warn!(
                "showing a preview of {} out of {} features",
                report.summary.feature_count,
                report.summary.reported_feature_count.unwrap_or_default()
            );
        }
        layer_ids.extend(report.layer_ids);
    }

    if let Some(attribute) = &args.color_by {
        for id in &layer_ids {
            studio.set_color_by(id, Some(attribute))?;
        }
    }

    let snapshot = studio.snapshot();
    let layers: Vec<_> = snapshot
        .layers()
        .iter()
        .map(|layer| {
            json!({
                "id": layer.id,
                "name": layer.name,
                "geometryType": layer.geometry_type,
                "vizType": layer.viz_type,
                "color": layer.color,
                "opacity": layer.opacity,
                "featureCount": layer.feature_count(),
                "legend": studio.legend(&layer.id),
            })
        })
        .collect();

    let output = json!({
        "layers": layers,
        "fitBounds": studio.fit_bounds().map(|b| b.to_bbox()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
