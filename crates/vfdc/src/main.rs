use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sha2::{Digest, Sha256};

use vfd_contracts::VFDC_REPORT_SCHEMA_VERSION;
use vfd_registry::actions::registry;
use vfdc::compile::{generate_tests, GenOptions};
use vfdc::coverage;

#[derive(Parser)]
#[command(name = "vfdc")]
#[command(about = "Conformance-test compiler for the vfd action registry.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Compile the registry into the standalone C conformance-test
    /// program.
    Generate {
        /// Write the C source here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print a JSON tool report to stdout. The C source must go to a
        /// file so the two streams stay separate.
        #[arg(long, requires = "out")]
        report_json: bool,
        /// Seconds the driver waits for session launch.
        #[arg(long, value_name = "SECS")]
        launch_timeout: Option<u32>,
        /// Read-only reference image attached as the fourth drive.
        #[arg(long, value_name = "PATH")]
        reference_image: Option<String>,
    },
    /// List actions no runnable test exercises.
    Audit {
        #[arg(long)]
        report_json: bool,
    },
    /// Dump the action registry as JSON.
    Actions {
        /// Compact single-line JSON with the schema version attached.
        #[arg(long)]
        report_json: bool,
    },
}

#[derive(Debug, Serialize)]
struct VfdcToolReport {
    schema_version: &'static str,
    command: &'static str,
    ok: bool,
    nr_actions: usize,
    nr_units: usize,
    nr_untested: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    untested: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    c_sha256: Option<String>,
    exit_code: u8,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Generate {
            out,
            report_json,
            launch_timeout,
            reference_image,
        } => {
            let mut options = GenOptions::default();
            if let Some(secs) = launch_timeout {
                options.launch_timeout_secs = secs;
            }
            if let Some(image) = reference_image {
                options.reference_image = image;
            }

            let generated = generate_tests(registry(), &options)?;

            match &out {
                Some(path) => write_text_file(path, &generated.c_src)?,
                None => print!("{}", generated.c_src),
            }

            if report_json {
                let report = VfdcToolReport {
                    schema_version: VFDC_REPORT_SCHEMA_VERSION,
                    command: "generate",
                    ok: true,
                    nr_actions: generated.stats.nr_actions,
                    nr_units: generated.stats.nr_units,
                    nr_untested: generated.stats.nr_untested,
                    untested: Vec::new(),
                    c_sha256: Some(sha256_hex(generated.c_src.as_bytes())),
                    exit_code: 0,
                };
                print_json(&report)?;
            }
            Ok(std::process::ExitCode::SUCCESS)
        }
        Cmd::Audit { report_json } => {
            let reg = registry();
            let untested = coverage::untested_actions(reg);
            let nr_units: usize = reg.iter().map(|a| a.tests.len()).sum();
            let ok = untested.is_empty();
            let exit_code = u8::from(!ok);

            if report_json {
                let report = VfdcToolReport {
                    schema_version: VFDC_REPORT_SCHEMA_VERSION,
                    command: "audit",
                    ok,
                    nr_actions: reg.len(),
                    nr_units,
                    nr_untested: untested.len(),
                    untested,
                    c_sha256: None,
                    exit_code,
                };
                print_json(&report)?;
            } else {
                for name in &untested {
                    println!("{name}");
                }
            }
            Ok(std::process::ExitCode::from(exit_code))
        }
        Cmd::Actions { report_json } => {
            if report_json {
                let report = serde_json::json!({
                    "schema_version": vfd_contracts::VFD_REGISTRY_SCHEMA_VERSION,
                    "actions": registry(),
                });
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("{}", serde_json::to_string_pretty(registry())?);
            }
            Ok(std::process::ExitCode::SUCCESS)
        }
    }
}

fn write_text_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("write: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let digest = h.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_report_requires_an_output_path() {
        assert!(Cli::try_parse_from(["vfdc", "generate", "--report-json"]).is_err());
        assert!(Cli::try_parse_from(["vfdc", "generate", "--report-json", "--out", "t.c"]).is_ok());
        assert!(Cli::try_parse_from(["vfdc", "generate"]).is_ok());
    }
}
