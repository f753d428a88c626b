use std::{num::NonZeroU32, path::PathBuf};

use anyhow::{Context as _, bail};
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

use spheretrace::{
    CpuBackend, IndexEncoding, RenderSettings, Renderer, SceneParameters,
    geometry::ScreenSize,
    scene::presets::Preset,
};

const USAGE: &str = "\
Usage: spheretrace-cli [PRESET] [OPTIONS]

Presets: three-spheres, random, random:<seed>, lights, cornell-box (default: random:0)

Options:
  --spp <N>          Samples per pixel (default: preset specific)
  --width <PIXELS>   Image width, height follows from the preset's aspect ratio (default: 800)
  --out <DIR>        Output directory (default: .)
  --no-bvh           Intersect every sphere instead of walking the BVH
  --float-indices    Store indices as floats in the packed buffers
  --print-tree       Dump the BVH to stdout before rendering";

struct Args {
    preset: Preset,
    samples_per_pixel: Option<NonZeroU32>,
    width: u32,
    output_directory: PathBuf,
    bvh_enabled: bool,
    encoding: IndexEncoding,
    print_tree: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
        let mut parsed = Args {
            preset: Preset::Random { seed: Some(0) },
            samples_per_pixel: None,
            width: 800,
            output_directory: PathBuf::from("."),
            bvh_enabled: true,
            encoding: IndexEncoding::Native,
            print_tree: false,
        };

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .with_context(|| format!("Missing value for {name}"))
            };
            match arg.as_str() {
                "--spp" => {
                    parsed.samples_per_pixel =
                        Some(value("--spp")?.parse().context("Invalid sample count")?)
                }
                "--width" => parsed.width = value("--width")?.parse().context("Invalid width")?,
                "--out" => parsed.output_directory = value("--out")?.into(),
                "--no-bvh" => parsed.bvh_enabled = false,
                "--float-indices" => parsed.encoding = IndexEncoding::Float,
                "--print-tree" => parsed.print_tree = true,
                "--help" | "-h" => bail!("{USAGE}"),
                other if !other.starts_with("--") => {
                    parsed.preset = other.parse().map_err(anyhow::Error::msg)?
                }
                other => bail!("Unknown option {other}\n\n{USAGE}"),
            }
        }

        if parsed.width == 0 {
            bail!("Width must be positive");
        }
        Ok(parsed)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    let aspect_ratio = args.preset.default_aspect_ratio();
    let height = ((args.width as f32 / aspect_ratio).round() as u32).max(1);
    let resolution = ScreenSize::new(args.width, height);

    let preset_parameters = args.preset.parameters();
    let parameters = SceneParameters {
        bvh_enabled: args.bvh_enabled,
        samples_per_pixel: args
            .samples_per_pixel
            .unwrap_or(preset_parameters.samples_per_pixel),
        ..preset_parameters
    };

    let bar = ProgressBar::no_length();
    let backend = CpuBackend::new(RenderSettings {
        tile_size: 64u32.try_into()?,
    })
    .with_progress_callback({
        let bar = bar.clone();
        move |finished, total| {
            bar.set_length(total as u64);
            bar.set_position(finished as u64);
        }
    });

    let mut renderer = Renderer::with_index_encoding(
        args.preset.scene()?,
        args.preset.camera(aspect_ratio),
        parameters,
        backend,
        args.encoding,
    )?;
    if args.print_tree {
        renderer.bvh().print_tree();
    }

    let output = renderer.render(resolution)?;
    bar.finish_and_clear();

    std::fs::create_dir_all(&args.output_directory).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.output_directory.display()
        )
    })?;
    let path = output.save(&args.output_directory)?;
    println!("{}", path.display());

    Ok(())
}
