//! CV conversion: one org-mode source, three published formats.
//!
//! The heavy lifting is done by external tools. `pandoc` reads the org file
//! and writes HTML and DOCX directly; the PDF goes through ConTeXt, so pandoc
//! first emits a `.tex` file into a scratch directory and `mtxrun` typesets
//! it there before the result is copied out.
//!
//! ```text
//! cv.org ──pandoc──► <tmp>/cv.tex ──mtxrun──► <tmp>/cv.pdf ──copy──► out/cv.pdf
//!        ──pandoc──► out/cv.html
//!        ──pandoc──► out/cv.docx
//! ```
//!
//! ## Skipping
//!
//! The output set is `<title>.pdf`, `<title>.html` and `<title>.docx`, where
//! `title` is the input's file stem. When all three already exist the whole
//! conversion is skipped without spawning anything, unless forced. A failure
//! part-way leaves whatever was written in place.
//!
//! ## Process seam
//!
//! Every subprocess goes through a [`CommandRunner`]. [`SystemRunner`] spawns
//! real processes; tests substitute a runner that records each
//! [`Invocation`], so argument vectors are asserted exactly and no
//! `pandoc` install is needed.

use crate::config::CvConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

pub const DEFAULT_STYLE: &str = "chmduquesne";
pub const DEFAULT_TMP_DIR: &str = "/tmp/pandoc-resume";

const PANDOC: &str = "pandoc";
const MTXRUN: &str = "mtxrun";
const LINK_FILTER: &str = "pdc-links-target-blank.lua";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CV source not found: {0}")]
    MissingInput(PathBuf),
    #[error("Cannot derive a title from {0}")]
    NoTitle(PathBuf),
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed ({status}): {stderr}")]
    ToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// One output format of the CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pdf,
    Html,
    Docx,
}

impl Format {
    /// Every format, in the order they are produced.
    pub const ALL: [Format; 3] = [Format::Pdf, Format::Html, Format::Docx];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Html => "html",
            Format::Docx => "docx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Format::Pdf => "PDF",
            Format::Html => "HTML",
            Format::Docx => "DOCX",
        }
    }
}

/// What [`Converter::generate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CvOutcome {
    /// All outputs existed; nothing was run.
    Skipped,
    /// These formats were written, in order.
    Generated(Vec<Format>),
}

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Write the command's stdout to this file instead of discarding it.
    pub stdout_to: Option<PathBuf>,
}

impl Invocation {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            stdout_to: None,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ConvertError>;
}

/// Spawns real processes and waits for them.
///
/// Stderr is captured and attached to [`ConvertError::ToolFailed`] on a
/// non-zero exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ConvertError> {
        log::debug!("running {invocation}");
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(log_path) = &invocation.stdout_to {
            command.stdout(std::fs::File::create(log_path)?);
        }

        let output = command.output().map_err(|source| ConvertError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ConvertError::ToolFailed {
                program: invocation.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// True iff `<title>.pdf`, `<title>.html` and `<title>.docx` all exist in
/// `out_dir`.
pub fn already_generated(title: &str, out_dir: &Path) -> bool {
    Format::ALL
        .iter()
        .all(|f| output_path(out_dir, title, *f).exists())
}

/// `<out_dir>/<title>.<ext>`
pub fn output_path(out_dir: &Path, title: &str, format: Format) -> PathBuf {
    out_dir.join(format!("{title}.{}", format.extension()))
}

/// The input's file stem, used as the output title.
pub fn title_of(input: &Path) -> Result<String, ConvertError> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConvertError::NoTitle(input.to_path_buf()))
}

// ============================================================================
// Argument vectors
// ============================================================================

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// pandoc → ConTeXt source, then mtxrun → PDF, both inside `tmp_dir`.
pub fn pdf_invocations(
    input: &Path,
    title: &str,
    styles_dir: &Path,
    style: &str,
    tmp_dir: &Path,
) -> [Invocation; 2] {
    let tex = tmp_dir.join(format!("{title}.tex"));
    let to_context = Invocation::new(
        PANDOC,
        vec![
            display(input),
            "--standalone".to_string(),
            format!("--template={}", display(&styles_dir.join(format!("{style}.tex")))),
            "--read=org".to_string(),
            "--to=context".to_string(),
            "--variable=papersize=A4".to_string(),
            format!("--output={}", display(&tex)),
        ],
    );
    let typeset = Invocation {
        stdout_to: Some(tmp_dir.join("context.log")),
        ..Invocation::new(
            MTXRUN,
            vec![
                format!("{title}.tex"),
                "--path".to_string(),
                display(tmp_dir),
                "--result".to_string(),
                format!("{title}.pdf"),
                "--script".to_string(),
                "context".to_string(),
            ],
        )
    };
    [to_context, typeset]
}

pub fn html_invocation(
    input: &Path,
    title: &str,
    dest: &Path,
    styles_dir: &Path,
    style: &str,
) -> Invocation {
    Invocation::new(
        PANDOC,
        vec![
            display(input),
            "--standalone".to_string(),
            format!(
                "--include-in-header={}",
                display(&styles_dir.join(format!("{style}.css")))
            ),
            format!("--lua-filter={}", display(&styles_dir.join(LINK_FILTER))),
            "--read=org".to_string(),
            "--to=html".to_string(),
            format!("--metadata=pagetitle={title}"),
            format!("--output={}", display(dest)),
        ],
    )
}

pub fn docx_invocation(input: &Path, dest: &Path) -> Invocation {
    Invocation::new(
        PANDOC,
        vec![
            display(input),
            "--standalone".to_string(),
            format!("--output={}", display(dest)),
        ],
    )
}

// ============================================================================
// Converter
// ============================================================================

/// Drives the conversions through a [`CommandRunner`].
pub struct Converter<R: CommandRunner> {
    runner: R,
    style: String,
    tmp_dir: PathBuf,
}

impl<R: CommandRunner> Converter<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            style: DEFAULT_STYLE.to_string(),
            tmp_dir: PathBuf::from(DEFAULT_TMP_DIR),
        }
    }

    /// Style name and scratch directory from `[cv]`.
    pub fn from_config(runner: R, config: &CvConfig) -> Self {
        Self {
            runner,
            style: config.style.clone(),
            tmp_dir: config.tmp_dir.clone(),
        }
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Typeset a PDF via ConTeXt and copy it to `dest`.
    pub fn pdf(&self, input: &Path, dest: &Path, styles_dir: &Path) -> Result<(), ConvertError> {
        let title = title_of(input)?;
        for invocation in pdf_invocations(input, &title, styles_dir, &self.style, &self.tmp_dir) {
            self.runner.run(&invocation)?;
        }
        std::fs::copy(self.tmp_dir.join(format!("{title}.pdf")), dest)?;
        Ok(())
    }

    /// Standalone HTML with the style's CSS inlined and external links
    /// opening in a new tab.
    pub fn html(&self, input: &Path, dest: &Path, styles_dir: &Path) -> Result<(), ConvertError> {
        let title = title_of(input)?;
        self.runner
            .run(&html_invocation(input, &title, dest, styles_dir, &self.style))
    }

    pub fn docx(&self, input: &Path, dest: &Path) -> Result<(), ConvertError> {
        self.runner.run(&docx_invocation(input, dest))
    }

    /// Produce all three formats unconditionally, PDF first.
    ///
    /// Creates `out_dir` and the scratch directory if needed. Stops at the
    /// first failing step.
    pub fn generate_all(
        &self,
        input: &Path,
        out_dir: &Path,
        styles_dir: &Path,
    ) -> Result<Vec<Format>, ConvertError> {
        if !input.is_file() {
            return Err(ConvertError::MissingInput(input.to_path_buf()));
        }
        let title = title_of(input)?;
        std::fs::create_dir_all(out_dir)?;
        std::fs::create_dir_all(&self.tmp_dir)?;

        let mut done = Vec::with_capacity(Format::ALL.len());
        for format in Format::ALL {
            let dest = output_path(out_dir, &title, format);
            match format {
                Format::Pdf => self.pdf(input, &dest, styles_dir)?,
                Format::Html => self.html(input, &dest, styles_dir)?,
                Format::Docx => self.docx(input, &dest)?,
            }
            log::info!("wrote {}", dest.display());
            done.push(format);
        }
        Ok(done)
    }

    /// [`generate_all`](Self::generate_all), unless every output already
    /// exists and `force` is off.
    pub fn generate(
        &self,
        input: &Path,
        out_dir: &Path,
        styles_dir: &Path,
        force: bool,
    ) -> Result<CvOutcome, ConvertError> {
        let title = title_of(input)?;
        if !force && already_generated(&title, out_dir) {
            log::info!("CV outputs for {title} already exist, skipping");
            return Ok(CvOutcome::Skipped);
        }
        self.generate_all(input, out_dir, styles_dir)
            .map(CvOutcome::Generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{cv_project, touch_outputs};
    use std::cell::RefCell;

    /// Records every invocation and fakes the files the real tools would
    /// write, so copying and skip checks behave as in production.
    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Invocation>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingRunner {
        fn failing_on(program: &'static str) -> Self {
            Self {
                fail_on: Some(program),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.borrow().clone()
        }

        fn programs(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.program).collect()
        }
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        let pos = args.iter().position(|a| a == flag)?;
        args.get(pos + 1).map(String::as_str)
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> Result<(), ConvertError> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.fail_on == Some(invocation.program.as_str()) {
                return Err(ConvertError::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
                });
            }
            if let Some(out) = invocation
                .args
                .iter()
                .find_map(|a| a.strip_prefix("--output="))
            {
                std::fs::write(out, b"converted")?;
            }
            if invocation.program == MTXRUN {
                let dir = flag_value(&invocation.args, "--path").unwrap();
                let result = flag_value(&invocation.args, "--result").unwrap();
                std::fs::write(Path::new(dir).join(result), b"%PDF")?;
            }
            Ok(())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Argument vectors
    // =========================================================================

    #[test]
    fn pdf_argument_vectors() {
        let [pandoc, mtxrun] = pdf_invocations(
            Path::new("content/cv/cv.org"),
            "cv",
            Path::new("pandoc_cv/styles"),
            "chmduquesne",
            Path::new("/tmp/pandoc-resume"),
        );

        assert_eq!(pandoc.program, "pandoc");
        assert_eq!(
            pandoc.args,
            strings(&[
                "content/cv/cv.org",
                "--standalone",
                "--template=pandoc_cv/styles/chmduquesne.tex",
                "--read=org",
                "--to=context",
                "--variable=papersize=A4",
                "--output=/tmp/pandoc-resume/cv.tex",
            ])
        );
        assert_eq!(pandoc.stdout_to, None);

        assert_eq!(mtxrun.program, "mtxrun");
        assert_eq!(
            mtxrun.args,
            strings(&[
                "cv.tex",
                "--path",
                "/tmp/pandoc-resume",
                "--result",
                "cv.pdf",
                "--script",
                "context",
            ])
        );
        assert_eq!(
            mtxrun.stdout_to,
            Some(PathBuf::from("/tmp/pandoc-resume/context.log"))
        );
    }

    #[test]
    fn html_argument_vector() {
        let inv = html_invocation(
            Path::new("cv.org"),
            "cv",
            Path::new("out/cv.html"),
            Path::new("styles"),
            "chmduquesne",
        );
        assert_eq!(inv.program, "pandoc");
        assert_eq!(
            inv.args,
            strings(&[
                "cv.org",
                "--standalone",
                "--include-in-header=styles/chmduquesne.css",
                "--lua-filter=styles/pdc-links-target-blank.lua",
                "--read=org",
                "--to=html",
                "--metadata=pagetitle=cv",
                "--output=out/cv.html",
            ])
        );
    }

    #[test]
    fn docx_argument_vector() {
        let inv = docx_invocation(Path::new("cv.org"), Path::new("out/cv.docx"));
        assert_eq!(
            inv.args,
            strings(&["cv.org", "--standalone", "--output=out/cv.docx"])
        );
    }

    #[test]
    fn invocation_display_joins_args() {
        let inv = docx_invocation(Path::new("cv.org"), Path::new("cv.docx"));
        assert_eq!(
            inv.to_string(),
            "pandoc cv.org --standalone --output=cv.docx"
        );
    }

    // =========================================================================
    // Completion check
    // =========================================================================

    #[test]
    fn already_generated_needs_all_three() {
        let project = cv_project();
        assert!(!already_generated("cv", &project.out));

        touch_outputs(&project.out, "cv", &["pdf", "html"]);
        assert!(!already_generated("cv", &project.out));

        touch_outputs(&project.out, "cv", &["docx"]);
        assert!(already_generated("cv", &project.out));
        assert!(!already_generated("resume", &project.out));
    }

    #[test]
    fn title_is_file_stem() {
        assert_eq!(title_of(Path::new("content/cv/cv.org")).unwrap(), "cv");
        assert_eq!(title_of(Path::new("resume.v2.org")).unwrap(), "resume.v2");
        assert!(matches!(
            title_of(Path::new("/")),
            Err(ConvertError::NoTitle(_))
        ));
    }

    // =========================================================================
    // Converter
    // =========================================================================

    #[test]
    fn generate_all_runs_pdf_html_docx_in_order() {
        let project = cv_project();
        let tmp = project.dir.path().join("scratch");
        let converter = Converter::new(RecordingRunner::default()).with_tmp_dir(&tmp);

        let done = converter
            .generate_all(&project.input, &project.out, &project.styles)
            .unwrap();

        assert_eq!(done, Format::ALL.to_vec());
        assert_eq!(
            converter.runner().programs(),
            vec!["pandoc", "mtxrun", "pandoc", "pandoc"]
        );
        assert!(already_generated("cv", &project.out));
        assert_eq!(std::fs::read(project.out.join("cv.pdf")).unwrap(), b"%PDF");
    }

    #[test]
    fn generate_skips_when_outputs_exist() {
        let project = cv_project();
        touch_outputs(&project.out, "cv", &["pdf", "html", "docx"]);
        let converter = Converter::new(RecordingRunner::default());

        let outcome = converter
            .generate(&project.input, &project.out, &project.styles, false)
            .unwrap();

        assert_eq!(outcome, CvOutcome::Skipped);
        assert!(converter.runner().calls().is_empty());
    }

    #[test]
    fn generate_runs_when_one_output_missing() {
        let project = cv_project();
        touch_outputs(&project.out, "cv", &["pdf", "html"]);
        let tmp = project.dir.path().join("scratch");
        let converter = Converter::new(RecordingRunner::default()).with_tmp_dir(&tmp);

        let outcome = converter
            .generate(&project.input, &project.out, &project.styles, false)
            .unwrap();

        assert_eq!(outcome, CvOutcome::Generated(Format::ALL.to_vec()));
        assert_eq!(converter.runner().calls().len(), 4);
    }

    #[test]
    fn generate_force_ignores_existing_outputs() {
        let project = cv_project();
        touch_outputs(&project.out, "cv", &["pdf", "html", "docx"]);
        let tmp = project.dir.path().join("scratch");
        let converter = Converter::new(RecordingRunner::default()).with_tmp_dir(&tmp);

        let outcome = converter
            .generate(&project.input, &project.out, &project.styles, true)
            .unwrap();

        assert!(matches!(outcome, CvOutcome::Generated(_)));
        assert_eq!(converter.runner().calls().len(), 4);
    }

    #[test]
    fn tool_failure_stops_and_keeps_partial_output() {
        let project = cv_project();
        let tmp = project.dir.path().join("scratch");
        let converter = Converter::new(RecordingRunner::failing_on("mtxrun")).with_tmp_dir(&tmp);

        let result = converter.generate_all(&project.input, &project.out, &project.styles);

        assert!(matches!(result, Err(ConvertError::Spawn { ref program, .. }) if program == "mtxrun"));
        assert_eq!(converter.runner().programs(), vec!["pandoc", "mtxrun"]);
        // The intermediate .tex is left behind
        assert!(tmp.join("cv.tex").exists());
        assert!(!project.out.join("cv.html").exists());
    }

    #[test]
    fn missing_input_runs_nothing() {
        let project = cv_project();
        let converter = Converter::new(RecordingRunner::default());
        let missing = project.dir.path().join("nope.org");

        let result = converter.generate(&missing, &project.out, &project.styles, false);

        assert!(matches!(result, Err(ConvertError::MissingInput(_))));
        assert!(converter.runner().calls().is_empty());
    }

    #[test]
    fn from_config_uses_style_and_tmp_dir() {
        let project = cv_project();
        let config = CvConfig {
            style: "plain".to_string(),
            tmp_dir: project.dir.path().join("work"),
            ..CvConfig::default()
        };
        let converter = Converter::from_config(RecordingRunner::default(), &config);

        std::fs::create_dir_all(&project.out).unwrap();
        converter
            .html(&project.input, &project.out.join("cv.html"), &project.styles)
            .unwrap();
        let calls = converter.runner().calls();
        assert!(calls[0].args[2].ends_with("plain.css"));

        converter
            .generate_all(&project.input, &project.out, &project.styles)
            .unwrap();
        assert!(project.dir.path().join("work/cv.tex").exists());
    }

    // =========================================================================
    // SystemRunner
    // =========================================================================

    #[cfg(unix)]
    #[test]
    fn system_runner_success_and_stdout_capture() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = tmp.path().join("out.log");
        let inv = Invocation {
            stdout_to: Some(log.clone()),
            ..Invocation::new("sh", strings(&["-c", "echo typeset"]))
        };
        SystemRunner.run(&inv).unwrap();
        assert_eq!(std::fs::read_to_string(log).unwrap().trim(), "typeset");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_status_and_stderr() {
        let inv = Invocation::new("sh", strings(&["-c", "echo broken >&2; exit 3"]));
        match SystemRunner.run(&inv) {
            Err(ConvertError::ToolFailed {
                program,
                status,
                stderr,
            }) => {
                assert_eq!(program, "sh");
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected ToolFailed, got {other:?}"),
        }
    }

    #[test]
    fn system_runner_missing_program_is_spawn_error() {
        let inv = Invocation::new("homesite-no-such-tool", Vec::new());
        assert!(matches!(
            SystemRunner.run(&inv),
            Err(ConvertError::Spawn { .. })
        ));
    }
}
