use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use palette_swap_wasm::{
    ExtractOptions, OrderKey, Palette, SwapOptions, extract_palette_bytes, palette_swap_bytes,
    palette_swap_linear_bytes, palette_swap_with_palette_bytes, palette_to_layer_bytes,
};

/// Rank-based palette swapping for pixel art.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the colours of one or more images with those ranked from a sample
    Swap {
        /// Images to recolour
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Image to sample the new palette from (1-pixel-high images are read as strips)
        #[arg(short, long, conflicts_with = "colors", required_unless_present = "colors")]
        sample: Option<PathBuf>,

        /// Comma-separated hex colours to use as the new palette, darkest first
        #[arg(short = 'c', long)]
        colors: Option<String>,

        /// Pair lightest with lightest instead of darkest with darkest
        #[arg(long)]
        light_first: bool,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Recolour images from one palette strip to another of the same width
    SwapLinear {
        /// Images to recolour
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Strip holding the colours to replace, light to dark
        #[arg(long)]
        old: PathBuf,

        /// Strip holding the replacement colours, light to dark
        #[arg(long)]
        new: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write a 1-pixel-high palette strip for each image
    ToLayer {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        /// Output directory
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the palette of each image, darkest first
    Extract {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        /// Print JSON instead of one hex colour per line
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Ignore fully transparent pixels when sampling
    #[arg(long)]
    exclude_transparent: bool,

    /// Ignore colours with this many pixels or fewer
    #[arg(short = 't', long, default_value_t = 0)]
    count_threshold: u32,

    /// Rank colours by R+G+B instead of perceived brightness
    #[arg(long)]
    channel_sum: bool,
}

impl ExtractArgs {
    fn options(&self) -> ExtractOptions {
        ExtractOptions {
            include_transparent: !self.exclude_transparent,
            count_threshold: self.count_threshold,
            order_key: if self.channel_sum { OrderKey::ChannelSum } else { OrderKey::Brightness },
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output directory
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Output filename prefix (ignored when --out-dir supplied)
    #[arg(short = 'p', long, default_value = "swapped_")]
    prefix: String,
}

impl OutputArgs {
    fn path_for(&self, input: &Path) -> Result<PathBuf> {
        let name = input
            .file_name()
            .with_context(|| format!("{} has no file name", input.display()))?;
        let stem = input.file_stem().unwrap_or(name).to_string_lossy();
        Ok(match &self.out_dir {
            Some(dir) => dir.join(format!("{stem}.png")),
            None => input.with_file_name(format!("{}{stem}.png", self.prefix)),
        })
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("Saved → {}", path.display());
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Where `swap` gets its replacement palette from, loaded once for all inputs.
enum SwapSource {
    Sample(Vec<u8>),
    Colors(Palette),
}

impl SwapSource {
    fn resolve(sample: Option<&Path>, colors: Option<&str>) -> Result<Self> {
        match (sample, colors) {
            (Some(path), _) => Ok(Self::Sample(read_input(path)?)),
            (None, Some(list)) => {
                let hex: Vec<&str> = list.split(',').map(str::trim).collect();
                Ok(Self::Colors(Palette::from_hex_list(&hex).context("parsing --colors")?))
            }
            (None, None) => bail!("either --sample or --colors is required"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Swap { inputs, sample, colors, light_first, extract, output } => {
            let e = extract.options();
            let options = SwapOptions {
                include_transparent: e.include_transparent,
                light_first,
                count_threshold: e.count_threshold,
                order_key: e.order_key,
            };
            let source = SwapSource::resolve(sample.as_deref(), colors.as_deref())?;

            for input in &inputs {
                let bytes = read_input(input)?;
                let (png, hex) = match &source {
                    SwapSource::Sample(sample) => palette_swap_bytes(&bytes, sample, &options),
                    SwapSource::Colors(palette) => palette_swap_with_palette_bytes(&bytes, palette, &options),
                }
                .with_context(|| format!("palette swap failed for {}", input.display()))?;
                log::info!("{}: new palette {}", input.display(), hex.join(","));
                write_output(&output.path_for(input)?, &png)?;
            }
        }
        Command::SwapLinear { inputs, old, new, output } => {
            let old_bytes = read_input(&old)?;
            let new_bytes = read_input(&new)?;
            for input in &inputs {
                let bytes = read_input(input)?;
                let (png, _) = palette_swap_linear_bytes(&bytes, &old_bytes, &new_bytes)
                    .with_context(|| format!("linear palette swap failed for {}", input.display()))?;
                write_output(&output.path_for(input)?, &png)?;
            }
        }
        Command::ToLayer { inputs, extract, out_dir } => {
            let options = extract.options();
            for input in &inputs {
                let bytes = read_input(input)?;
                let (png, hex) = palette_to_layer_bytes(&bytes, &options)
                    .with_context(|| format!("palette extraction failed for {}", input.display()))?;
                log::info!("{}: {} colours", input.display(), hex.len());

                let stem = input.file_stem().unwrap_or_default().to_string_lossy();
                let file = format!("{stem}_palette.png");
                let out_path = match &out_dir {
                    Some(dir) => dir.join(file),
                    None => input.with_file_name(file),
                };
                write_output(&out_path, &png)?;
            }
        }
        Command::Extract { inputs, extract, json } => {
            let options = extract.options();
            let mut all = serde_json::Map::new();
            for input in &inputs {
                let bytes = read_input(input)?;
                let hex = extract_palette_bytes(&bytes, &options)
                    .with_context(|| format!("palette extraction failed for {}", input.display()))?;
                if json {
                    all.insert(input.display().to_string(), serde_json::json!(hex));
                } else {
                    println!("{}:", input.display());
                    for h in hex {
                        println!("#{h}");
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            }
        }
    }

    Ok(())
}
