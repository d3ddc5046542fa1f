//! Build driver: an ordered list of steps run against one [`BuildContext`].
//!
//! Each step receives the loaded [`SiteConfig`] plus the effective
//! `force_rerender` and `mock` flags, and reports a [`StepOutcome`] for the
//! CLI to print. Steps run in order and the first error stops the build.
//!
//! ```text
//! site.toml ─► BuildContext ─► CollageStep ─► CvStep
//! ```

use crate::config::{CollageConfig, ConfigError, SiteConfig};
use crate::cv::{Converter, ConvertError, CvOutcome, Format, SystemRunner};
use crate::imaging::{
    self, Collage, FontRenderer, GRID_CELLS, ImagingError, LabelRenderer, Quality,
};
use crate::lastfm::{self, Credentials, FetchError, LastFmClient, ScrobbleService};
use crate::types::Placement;
use image::DynamicImage;
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Everything a build step may read.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: SiteConfig,
    pub force_rerender: bool,
    pub mock: bool,
}

impl BuildContext {
    /// Command-line flags can switch on what the config leaves off, never the
    /// reverse.
    pub fn new(config: SiteConfig, force_rerender: bool, mock: bool) -> Self {
        let force_rerender = force_rerender || config.build.force_rerender;
        let mock = mock || config.build.mock;
        Self {
            config,
            force_rerender,
            mock,
        }
    }
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A collage was written to `path`.
    Collage {
        path: PathBuf,
        placements: Vec<Placement>,
        mock: bool,
    },
    /// CV formats written, in order.
    Cv(Vec<Format>),
    /// Outputs already present; nothing was done.
    UpToDate(PathBuf),
}

pub trait BuildStep {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &BuildContext) -> Result<StepOutcome, PipelineError>;
}

/// Renders the Last.fm collage to `collage.output`.
///
/// Runs when forced or when the output file is missing.
pub struct CollageStep;

impl BuildStep for CollageStep {
    fn name(&self) -> &'static str {
        "collage"
    }

    fn run(&self, ctx: &BuildContext) -> Result<StepOutcome, PipelineError> {
        let config = &ctx.config.collage;
        if !ctx.force_rerender && config.output.exists() {
            log::info!("{} exists, skipping collage", config.output.display());
            return Ok(StepOutcome::UpToDate(config.output.clone()));
        }
        let placements = write_collage(config, &config.output, ctx.mock)?;
        Ok(StepOutcome::Collage {
            path: config.output.clone(),
            placements,
            mock: ctx.mock,
        })
    }
}

/// Converts the CV into PDF, HTML and DOCX.
pub struct CvStep;

impl BuildStep for CvStep {
    fn name(&self) -> &'static str {
        "cv"
    }

    fn run(&self, ctx: &BuildContext) -> Result<StepOutcome, PipelineError> {
        let config = &ctx.config.cv;
        let converter = Converter::from_config(SystemRunner, config);
        let outcome = converter.generate(
            &config.source,
            &config.output_dir,
            &config.styles_dir,
            ctx.force_rerender,
        )?;
        Ok(match outcome {
            CvOutcome::Skipped => StepOutcome::UpToDate(config.output_dir.clone()),
            CvOutcome::Generated(formats) => StepOutcome::Cv(formats),
        })
    }
}

/// The site's build steps, in the order they must run.
pub fn default_steps() -> Vec<Box<dyn BuildStep>> {
    vec![Box::new(CollageStep), Box::new(CvStep)]
}

/// Run `steps` in order, handing each outcome to `on_done` as it completes.
///
/// Stops at the first failing step.
pub fn run_steps(
    ctx: &BuildContext,
    steps: &[Box<dyn BuildStep>],
    mut on_done: impl FnMut(&str, &StepOutcome),
) -> Result<Vec<StepOutcome>, PipelineError> {
    let mut outcomes = Vec::with_capacity(steps.len());
    for step in steps {
        log::debug!("running step {}", step.name());
        let outcome = step.run(ctx).inspect_err(|e| {
            log::error!("step {} failed: {e}", step.name());
        })?;
        on_done(step.name(), &outcome);
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

// ============================================================================
// Collage
// ============================================================================

/// Render a collage and save it to `target` at `config.quality`.
///
/// The font is loaded before anything is fetched so a missing font fails
/// without touching the network. Live mode needs `LASTFM_API_KEY` and
/// `LASTFM_API_SECRET`; mock mode reads `config.mock_art` instead.
pub fn write_collage(
    config: &CollageConfig,
    target: &Path,
    mock: bool,
) -> Result<Vec<Placement>, PipelineError> {
    let renderer = FontRenderer::from_config(config.font.as_deref())?;
    let collage = if mock {
        mock_collage(config, &renderer, &mut rand::thread_rng())?
    } else {
        let client = LastFmClient::new(Credentials::from_env()?);
        live_collage(&client, &renderer, config)?
    };
    save_collage(collage, target, Quality::new(config.quality))
}

/// Fetch the user's top albums and compose the first nine that have art.
pub fn live_collage<S: ScrobbleService, R: LabelRenderer>(
    service: &S,
    renderer: &R,
    config: &CollageConfig,
) -> Result<Collage, PipelineError> {
    let albums = lastfm::fetch_albums(
        service,
        &config.username,
        config.period,
        config.fetch_limit,
    )?
    .take(GRID_CELLS)
    .collect::<Result<Vec<_>, _>>()?;
    if albums.len() < GRID_CELLS {
        log::warn!(
            "only {} of {GRID_CELLS} cells have albums; the rest stay black",
            albums.len()
        );
    }
    Ok(imaging::compose_collage(albums, renderer))
}

/// Nine copies of `config.mock_art` with random labels.
pub fn mock_collage<R: LabelRenderer>(
    config: &CollageConfig,
    renderer: &R,
    rng: &mut impl Rng,
) -> Result<Collage, PipelineError> {
    let art = imaging::load_image(&config.mock_art)?;
    Ok(imaging::test_collage(&art, renderer, rng))
}

/// Encode the collage by the target's extension and return its placements.
pub fn save_collage(
    collage: Collage,
    target: &Path,
    quality: Quality,
) -> Result<Vec<Placement>, PipelineError> {
    let Collage { image, placements } = collage;
    imaging::save_image(&DynamicImage::ImageRgb8(image), target, quality)?;
    log::info!("saved collage to {}", target.display());
    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockRenderer;
    use crate::test_helpers::{cv_project, solid_cover, touch_outputs};
    use crate::types::TopAlbum;
    use image::RgbaImage;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;

    /// Ranked entries with solid-colour covers keyed by URL.
    struct FakeLastFm {
        entries: Vec<TopAlbum>,
        requested_limit: RefCell<Option<u32>>,
    }

    impl FakeLastFm {
        fn with_albums(count: u32) -> Self {
            let entries = (0..count)
                .map(|i| TopAlbum {
                    name: Some(format!("Album {i}")),
                    artist: Some(format!("Artist {i}")),
                    playcount: 100 - i as u64,
                    rank: i + 1,
                    cover_url: Some(format!("cover://{i}")),
                })
                .collect();
            Self {
                entries,
                requested_limit: RefCell::new(None),
            }
        }
    }

    impl ScrobbleService for FakeLastFm {
        fn top_albums(
            &self,
            _user: &str,
            _period: lastfm::Period,
            limit: u32,
        ) -> Result<Vec<TopAlbum>, FetchError> {
            *self.requested_limit.borrow_mut() = Some(limit);
            Ok(self.entries.clone())
        }

        fn cover_art(&self, url: &str) -> Result<RgbaImage, FetchError> {
            let i: u8 = url.trim_start_matches("cover://").parse().unwrap();
            Ok(solid_cover([10 * i, 100, 200, 255]))
        }
    }

    /// Records its name when run and returns a canned result.
    struct ScriptedStep {
        name: &'static str,
        fail: bool,
        log: std::rc::Rc<RefCell<Vec<&'static str>>>,
    }

    impl BuildStep for ScriptedStep {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run(&self, _ctx: &BuildContext) -> Result<StepOutcome, PipelineError> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(PipelineError::Imaging(ImagingError::MissingFont))
            } else {
                Ok(StepOutcome::UpToDate(PathBuf::from(self.name)))
            }
        }
    }

    fn scripted(
        plan: &[(&'static str, bool)],
    ) -> (Vec<Box<dyn BuildStep>>, std::rc::Rc<RefCell<Vec<&'static str>>>) {
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let steps = plan
            .iter()
            .map(|&(name, fail)| {
                Box::new(ScriptedStep {
                    name,
                    fail,
                    log: log.clone(),
                }) as Box<dyn BuildStep>
            })
            .collect();
        (steps, log)
    }

    // =========================================================================
    // Context and driver
    // =========================================================================

    #[test]
    fn context_ors_cli_and_config_flags() {
        let mut config = SiteConfig::default();
        let ctx = BuildContext::new(config.clone(), false, false);
        assert!(!ctx.force_rerender && !ctx.mock);

        let ctx = BuildContext::new(config.clone(), true, false);
        assert!(ctx.force_rerender && !ctx.mock);

        config.build.mock = true;
        let ctx = BuildContext::new(config, false, false);
        assert!(ctx.mock);
    }

    #[test]
    fn default_steps_are_collage_then_cv() {
        let names: Vec<_> = default_steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["collage", "cv"]);
    }

    #[test]
    fn run_steps_runs_in_order_and_reports_each() {
        let (steps, log) = scripted(&[("first", false), ("second", false)]);
        let ctx = BuildContext::new(SiteConfig::default(), false, false);
        let mut reported = Vec::new();

        let outcomes = run_steps(&ctx, &steps, |name, _| reported.push(name.to_string())).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(reported, vec!["first", "second"]);
    }

    #[test]
    fn run_steps_stops_at_first_error() {
        let (steps, log) = scripted(&[("first", true), ("second", false)]);
        let ctx = BuildContext::new(SiteConfig::default(), false, false);

        let result = run_steps(&ctx, &steps, |_, _| {});

        assert!(matches!(
            result,
            Err(PipelineError::Imaging(ImagingError::MissingFont))
        ));
        assert_eq!(*log.borrow(), vec!["first"]);
    }

    // =========================================================================
    // Steps
    // =========================================================================

    #[test]
    fn collage_step_skips_existing_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("collage.avif");
        std::fs::write(&output, b"old").unwrap();
        let mut config = SiteConfig::default();
        config.collage.output = output.clone();
        let ctx = BuildContext::new(config, false, false);

        let outcome = CollageStep.run(&ctx).unwrap();

        assert_eq!(outcome, StepOutcome::UpToDate(output.clone()));
        assert_eq!(std::fs::read(&output).unwrap(), b"old");
    }

    #[test]
    fn collage_step_forced_needs_a_font() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("collage.avif");
        std::fs::write(&output, b"old").unwrap();
        let mut config = SiteConfig::default();
        config.collage.output = output;
        config.collage.font = Some(tmp.path().join("missing.ttf"));
        let ctx = BuildContext::new(config, true, true);

        let result = CollageStep.run(&ctx);

        assert!(matches!(result, Err(PipelineError::Imaging(ImagingError::Io(_)))));
    }

    #[test]
    fn cv_step_skips_when_outputs_exist() {
        let project = cv_project();
        touch_outputs(&project.out, "cv", &["pdf", "html", "docx"]);
        let mut config = SiteConfig::default();
        config.cv.source = project.input.clone();
        config.cv.output_dir = project.out.clone();
        config.cv.styles_dir = project.styles.clone();
        let ctx = BuildContext::new(config, false, false);

        let outcome = CvStep.run(&ctx).unwrap();

        assert_eq!(outcome, StepOutcome::UpToDate(project.out.clone()));
    }

    // =========================================================================
    // Collage rendering
    // =========================================================================

    #[test]
    fn live_collage_places_first_nine_in_fetch_order() {
        let service = FakeLastFm::with_albums(15);
        let renderer = MockRenderer::new(10);
        let config = CollageConfig::default();

        let collage = live_collage(&service, &renderer, &config).unwrap();

        assert_eq!(*service.requested_limit.borrow(), Some(15));
        assert_eq!(collage.placements.len(), 9);
        for (i, placement) in collage.placements.iter().enumerate() {
            assert_eq!(placement.title, format!("Album {i}"));
            let (x, y) = imaging::cell_origin(i).unwrap();
            assert_eq!(
                collage.image.get_pixel(x + 150, y + 150).0,
                [10 * i as u8, 100, 200]
            );
        }
    }

    #[test]
    fn live_collage_with_few_albums_leaves_black_cells() {
        let service = FakeLastFm::with_albums(4);
        let renderer = MockRenderer::new(10);

        let collage = live_collage(&service, &renderer, &CollageConfig::default()).unwrap();

        assert_eq!(collage.placements.len(), 4);
        let (x, y) = imaging::cell_origin(8).unwrap();
        assert_eq!(collage.image.get_pixel(x + 150, y + 150).0, [0, 0, 0]);
    }

    #[test]
    fn mock_collage_reads_mock_art_and_saves() {
        let tmp = tempfile::TempDir::new().unwrap();
        let art_path = tmp.path().join("me.png");
        DynamicImage::ImageRgba8(solid_cover([40, 80, 120, 255]))
            .save(&art_path)
            .unwrap();
        let config = CollageConfig {
            mock_art: art_path,
            ..CollageConfig::default()
        };
        let renderer = MockRenderer::new(10);

        let collage = mock_collage(&config, &renderer, &mut StdRng::seed_from_u64(1)).unwrap();
        let target = tmp.path().join("out/collage.png");
        let placements = save_collage(collage, &target, Quality::default()).unwrap();

        assert_eq!(placements.len(), 9);
        let saved = imaging::load_image(&target).unwrap();
        assert_eq!(saved.dimensions(), (900, 900));
        assert_eq!(saved.get_pixel(450, 750).0, [40, 80, 120, 255]);
    }

    #[test]
    fn mock_collage_missing_art_errors() {
        let config = CollageConfig {
            mock_art: PathBuf::from("/nonexistent/me.webp"),
            ..CollageConfig::default()
        };
        let renderer = MockRenderer::new(10);
        let result = mock_collage(&config, &renderer, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(PipelineError::Imaging(_))));
    }
}
