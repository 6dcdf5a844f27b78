//! `sliver`: command-line front end for the LAbS verification pipeline.
//!
//! One subcommand-free top-level command, matching the reference tool's
//! single `click.command()` rather than teacher's `seqc` subcommand tree
//! (`Build`/`Lint`/`Test`/...). Orchestration only: every real step is a
//! call into `sliver_core`.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use sliver_core::driver::{Cadp, CheckOptions, DriverError, ExitStatus, LabsTranslateCli,
    ModelChecker, Translator, TranslateOptions};
use sliver_core::SliverError;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Cadp,
    CadpMonitor,
}

impl Backend {
    fn encoding(self) -> &'static str {
        match self {
            Backend::Cadp => "lnt",
            Backend::CadpMonitor => "lnt-monitor",
        }
    }
}

/// The SLiVER LAbS verification tool.
#[derive(Parser, Debug)]
#[command(name = "sliver", version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify or simulate a LAbS multi-agent system")]
struct Cli {
    /// Path of LABS file to analyze
    file: PathBuf,

    /// Assign values for parameterised specification (key=value)
    values: Vec<String>,

    /// Backend to use in verification mode.
    #[arg(long, default_value = "cadp")]
    backend: Backend,

    /// Enable additional checks in the backend.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Enforce fair interleaving of components.
    #[arg(long, default_value_t = false)]
    fair: bool,

    /// Number of simulation traces to generate. If 0, run in verification mode.
    #[arg(long, default_value_t = 0)]
    simulate: u32,

    /// Print emulation program and exit.
    #[arg(long, default_value_t = false)]
    show: bool,

    /// Number of system evolutions. If 0, generate an unbounded system.
    #[arg(long, default_value_t = 0)]
    steps: u32,

    /// Configure time limit (seconds). Set to 0 to disable timeout.
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Print additional messages from the backend.
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Ignore all properties.
    #[arg(long = "no-properties", default_value_t = false)]
    no_properties: bool,

    /// Property to consider, others will be ignored.
    #[arg(long)]
    property: Option<String>,

    /// Do not remove intermediate files.
    #[arg(long = "keep-files", default_value_t = false)]
    keep_files: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.simulate > 0 && cli.steps == 0 {
        println!("Must specify the length of simulation traces (--steps)");
        process::exit(ExitStatus::InvalidArgs.code());
    }

    init_logging(cli.verbose);
    tracing::info!("Encoding...");

    match run(&cli) {
        Ok(status) => {
            if !(status == ExitStatus::Success && cli.simulate > 0) {
                println!("{}", status.message(cli.simulate > 0));
            } else {
                println!("Done.");
            }
            process::exit(status.code());
        }
        Err(e) => {
            tracing::error!("{e}");
            let status = exit_status_for(&e);
            println!("{}", status.message(cli.simulate > 0));
            process::exit(status.code());
        }
    }
}

fn exit_status_for(err: &SliverError) -> ExitStatus {
    match err {
        SliverError::Driver(DriverError::NonZeroExit { stderr, .. }) => {
            if stderr.starts_with("Property") {
                ExitStatus::InvalidArgs
            } else {
                ExitStatus::ParsingError
            }
        }
        SliverError::Driver(DriverError::MissingTool { .. }) => ExitStatus::BackendError,
        SliverError::Driver(_) => ExitStatus::ParsingError,
        _ => ExitStatus::InvalidArgs,
    }
}

fn run(cli: &Cli) -> Result<ExitStatus, SliverError> {
    let translator = LabsTranslateCli::new("LabsTranslate");
    let translate_opts = TranslateOptions {
        bound: cli.steps,
        fair: cli.fair,
        simulate: cli.simulate > 0,
        property: cli.property.clone(),
        no_properties: cli.no_properties,
        values: cli.values.clone(),
        ..TranslateOptions::default()
    };

    let (code, info_text) =
        translator.translate(&cli.file, &translate_opts, cli.backend.encoding(), true)?;

    if cli.show {
        println!("{code}");
        return Ok(ExitStatus::Success);
    }

    let info_text = info_text.unwrap_or_default();
    let descriptor = info_text.replace('\n', "|");
    let descriptor = descriptor.strip_suffix('|').unwrap_or(&descriptor);
    let info = sliver_core::info::parse(descriptor)?;

    let mut temp_files = Vec::new();
    let code_path = cli.scratch_path("lnt");
    write_temp_file(&code_path, &code, &mut temp_files)?;

    let mut warnings = Vec::new();
    let mut mcl_path = PathBuf::new();
    if !cli.no_properties && cli.simulate == 0 {
        let mut document = String::new();
        for text in &info.properties {
            let prop = sliver_core::property::parse(text)?;
            let (eliminated, mut prop_warnings) =
                sliver_core::eliminate::eliminate(&prop, &info.spawn)?;
            warnings.append(&mut prop_warnings);
            document.push_str(&sliver_core::mcl::emit(&eliminated, &info)?);
        }
        mcl_path = cli.scratch_path("mcl");
        write_temp_file(&mcl_path, &document, &mut temp_files)?;
    }

    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let check_opts = CheckOptions {
        debug: cli.debug,
        timeout_secs: cli.timeout,
        steps: cli.steps,
        keep_files: cli.keep_files,
        no_properties: cli.no_properties,
    };

    let checker = Cadp::new(&cli.cwd_for_checker());
    let verb = if cli.simulate > 0 { "Running simulation" } else { "Verifying" };
    if !(cli.simulate > 0) {
        if let Some(p) = &cli.property {
            tracing::info!("{verb} '{p}' with backend {:?}...", cli.backend);
        } else {
            tracing::info!("{verb} with backend {:?}...", cli.backend);
        }
    } else {
        tracing::info!("{verb} with backend {:?}...", cli.backend);
    }

    let status = if cli.simulate > 0 {
        checker.simulate(&code_path, &check_opts)
    } else {
        checker.verify(&code_path, &mcl_path, &check_opts)
    }?;

    if cli.keep_files {
        for f in &temp_files {
            tracing::info!("Keeping {}", f.display());
        }
    } else {
        for f in &temp_files {
            tracing::debug!("Removing {}...", f.display());
            let _ = std::fs::remove_file(f);
        }
    }

    Ok(status)
}

fn write_temp_file(
    path: &Path,
    contents: &str,
    temp_files: &mut Vec<PathBuf>,
) -> Result<(), SliverError> {
    std::fs::write(path, contents).map_err(|e| {
        SliverError::Driver(DriverError::SpawnFailed {
            command: format!("write {}", path.display()),
            reason: e.to_string(),
        })
    })?;
    temp_files.push(path.to_path_buf());
    Ok(())
}

impl Cli {
    /// The directory CADP's tools should run in: the LABS file's own
    /// directory, same as the reference driver's `generate_code` cwd.
    fn cwd_for_checker(&self) -> PathBuf {
        self.file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// A deterministic scratch-file path derived from the input file's
    /// stem and the run's parameters, same naming scheme as the reference
    /// driver's `make_filename` (stem, bound, fair/unfair, extension).
    fn scratch_path(&self, extension: &str) -> PathBuf {
        let stem = self
            .file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("out")
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect::<String>();
        let fairness = if self.fair { "fair" } else { "unfair" };
        let values = self.values.join("").replace('=', "");
        let mut name = format!("{stem}_{}_{fairness}", self.steps);
        if !values.is_empty() {
            name.push('_');
            name.push_str(&values);
        }
        name.push('.');
        name.push_str(extension);
        self.cwd_for_checker().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["sliver", "model.labs"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("model.labs"));
        assert_eq!(cli.steps, 0);
        assert_eq!(cli.simulate, 0);
        assert!(!cli.fair);
    }

    #[test]
    fn cli_parses_values_and_flags() {
        let cli = Cli::try_parse_from([
            "sliver", "model.labs", "N=3", "K=2", "--fair", "--steps", "10", "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.values, vec!["N=3".to_string(), "K=2".to_string()]);
        assert!(cli.fair);
        assert_eq!(cli.steps, 10);
        assert!(cli.verbose);
    }

    #[test]
    fn cli_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["sliver", "model.labs", "--backend", "nonsense"]).is_err());
    }

    #[test]
    fn cli_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_status_maps_property_error_to_invalid_args() {
        let err = SliverError::Driver(DriverError::NonZeroExit {
            command: "LabsTranslate".to_string(),
            code: Some(1),
            stderr: "Property 'foo' is malformed".to_string(),
        });
        assert_eq!(exit_status_for(&err), ExitStatus::InvalidArgs);
    }

    #[test]
    fn exit_status_maps_other_translator_failure_to_parsing_error() {
        let err = SliverError::Driver(DriverError::NonZeroExit {
            command: "LabsTranslate".to_string(),
            code: Some(1),
            stderr: "syntax error".to_string(),
        });
        assert_eq!(exit_status_for(&err), ExitStatus::ParsingError);
    }

    #[test]
    fn scratch_path_is_deterministic_and_sits_beside_the_input() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("my model.labs");
        std::fs::write(&file, "").unwrap();
        let cli = Cli::try_parse_from([
            "sliver",
            file.to_str().unwrap(),
            "N=3",
            "--fair",
            "--steps",
            "5",
        ])
        .unwrap();
        let path = cli.scratch_path("lnt");
        assert_eq!(path.parent().unwrap(), dir.path());
        assert_eq!(path.file_name().unwrap(), "my_model_5_fair_N3.lnt");
        assert_eq!(path, cli.scratch_path("lnt"));
    }

    #[test]
    fn write_temp_file_tracks_and_removes_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.lnt");
        let mut temp_files = Vec::new();
        write_temp_file(&path, "module HEADER is\nend module", &mut temp_files).unwrap();
        assert_eq!(temp_files, vec![path.clone()]);
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
        assert!(!path.exists());
    }
}
