use clap::{Parser, Subcommand};
use homesite::cv::{Converter, SystemRunner};
use homesite::pipeline::{self, BuildContext};
use homesite::{config, output};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "homesite")]
#[command(about = "Build tooling for a personal website")]
#[command(long_about = "\
Build tooling for a personal website

Produces two artifacts for the static site:

  collage   3x3 grid of your top Last.fm albums of the past month,
            each cover labelled with title and artist
  cv        PDF, HTML and DOCX versions of an org-mode CV, via pandoc
            and ConTeXt (mtxrun)

Environment:
  LASTFM_API_KEY, LASTFM_API_SECRET   Last.fm credentials (required for live collages)
  COLLAGE_TTF                         Font for collage labels (unless collage.font is set)

A .env file in the working directory is loaded first.

Run 'homesite gen-config' to generate a documented site.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the Last.fm collage to an image file
    Collage {
        /// Where to save the collage; the extension picks the format
        target_path: PathBuf,
        /// Use a static image and random labels instead of Last.fm
        #[arg(long)]
        mock: bool,
        /// Encoding quality for AVIF/JPEG (1-100)
        #[arg(long)]
        quality: Option<u32>,
    },
    /// Convert an org-mode CV to PDF, HTML and DOCX
    Cv {
        /// The org-mode source
        input: PathBuf,
        /// Output directory [default: cv.output_dir]
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Directory holding the pandoc templates [default: cv.styles_dir]
        #[arg(long)]
        styles_dir: Option<PathBuf>,
        /// Regenerate even if all outputs exist
        #[arg(long)]
        force: bool,
    },
    /// Run every build step configured in site.toml
    Build {
        /// Regenerate artifacts that already exist
        #[arg(long)]
        force: bool,
        /// Offline collage from the configured mock image
        #[arg(long)]
        mock: bool,
    },
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Command::Collage {
            target_path,
            mock,
            quality,
        } => {
            let mut site = config::load_config(&cli.config)?;
            if let Some(q) = quality {
                site.collage.quality = q;
                site.validate()?;
            }
            let placements = pipeline::write_collage(&site.collage, &target_path, mock)?;
            output::print_collage_output(&placements, &target_path, mock);
        }
        Command::Cv {
            input,
            out_dir,
            styles_dir,
            force,
        } => {
            let site = config::load_config(&cli.config)?;
            let out_dir = out_dir.unwrap_or_else(|| site.cv.output_dir.clone());
            let styles_dir = styles_dir.unwrap_or_else(|| site.cv.styles_dir.clone());
            let converter = Converter::from_config(SystemRunner, &site.cv);
            let outcome = converter.generate(&input, &out_dir, &styles_dir, force)?;
            output::print_cv_output(&outcome, &out_dir);
        }
        Command::Build { force, mock } => {
            let site = config::load_config(&cli.config)?;
            let ctx = BuildContext::new(site, force, mock);
            println!("==> Building from {}", cli.config.display());
            pipeline::run_steps(&ctx, &pipeline::default_steps(), output::print_step_output)?;
            println!("==> Build complete");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}
