use link_residual::{
    init_logging, ClassifierConfig, ClassifierContext, ConfigError, ConfigurationManager, FatalError, FlatEarthTerrain,
    LogConfig, MemoryLinkSource, PlanarHexGrid, RunSummary,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "usage: link-residual <config.json> <links.json> [out_dir]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(summary) => {
            info!(
                batches = summary.batches,
                edges = summary.edges,
                reports = summary.reports,
                files = summary.files_written,
                "finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            // no-op when the configured subscriber is already installed
            init_logging(&LogConfig::default());
            error!(error = %e, "{}", USAGE);
            ExitCode::FAILURE
        }
    }
}

fn required<'a>(args: &'a [String], index: usize, parameter: &str) -> Result<&'a str, ConfigError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingParameter {
            parameter: parameter.to_string(),
        })
}

fn load_config(args: &[String]) -> Result<ClassifierConfig, FatalError> {
    let mut manager = ConfigurationManager::from_file(required(args, 0, "config path")?)?;
    if let Some(out_dir) = args.get(2) {
        manager.update_config(ClassifierConfig {
            report_dir: PathBuf::from(out_dir),
            ..manager.config().clone()
        })?;
    }
    Ok(manager.config().clone())
}

fn run(args: &[String]) -> Result<RunSummary, FatalError> {
    let config = load_config(args)?;
    init_logging(&config.logging);

    let links_path = required(args, 1, "links path")?;
    let source = MemoryLinkSource::from_json_file(links_path)?;
    info!(rows = source.len(), path = links_path, "loaded link source");

    // Free-space model over level ground; the real terrain backend plugs in here.
    let context = ClassifierContext::new(
        config,
        Box::new(source),
        Box::new(FlatEarthTerrain::flat(0.0)),
        Box::new(PlanarHexGrid::new()),
    )?;
    context.run(None)
}
