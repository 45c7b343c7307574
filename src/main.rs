use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use solarscope::data::source;
use solarscope::{analyze, combine, AnalysisConfig};

/// Per-site and combined statistics for solar irradiance logs.
///
/// Prints the analysis report as JSON on stdout.
///
/// Examples:
///   solarscope benin=data/benin.csv togo=data/togo.xlsx
///   solarscope --config analysis.json benin=data/benin.csv
#[derive(Parser, Debug)]
#[command(name = "solarscope", version, about, long_about = None)]
struct Args {
    /// JSON analysis config; defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Site sources as SITE=PATH (CSV or Excel)
    #[arg(required = true, value_name = "SITE=PATH", value_parser = parse_site)]
    sources: Vec<(String, PathBuf)>,
}

fn parse_site(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((site, path)) if !site.is_empty() && !path.is_empty() => {
            Ok((site.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected SITE=PATH, got {arg:?}")),
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match run(args.config.as_deref(), &args.sources) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Analysis failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<&Path>, sources: &[(String, PathBuf)]) -> solarscope::Result<String> {
    let config = match config_path {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let options = config.load_options();

    let mut series = Vec::with_capacity(sources.len());
    for (site, path) in sources {
        series.push(source::load_site(site, path, &options)?);
    }

    let report = analyze(&combine(series)?, &config)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_site_sources() {
        let args = Args::try_parse_from([
            "solarscope",
            "--config",
            "analysis.json",
            "benin=data/benin.csv",
            "togo=data/togo.xlsx",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("analysis.json")));
        assert_eq!(
            args.sources,
            vec![
                ("benin".to_string(), PathBuf::from("data/benin.csv")),
                ("togo".to_string(), PathBuf::from("data/togo.xlsx")),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_source() {
        assert!(Args::try_parse_from(["solarscope", "benin.csv"]).is_err());
        assert!(Args::try_parse_from(["solarscope", "=benin.csv"]).is_err());
        assert!(Args::try_parse_from(["solarscope"]).is_err());
    }
}
