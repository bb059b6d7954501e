//! CRF Schema CLI
//!
//! Command-line interface for resolving annotated case-report-form schemas
//! against data records, deriving presentation hints, and linting schema
//! files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crf_schema::{
    derive_hints, flatten, lint, load_schema, resolve, strip_annotations, validate, FileStatus,
    ResolveOptions, ValidateError,
};

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "crf-schema")]
#[command(about = "Resolve annotated CRF schemas against data records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema against a data record
    Resolve {
        /// Schema file
        schema: PathBuf,

        /// Data record file (an empty record if not given)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Do not synthesize schema nodes for undeclared data
        #[arg(long)]
        no_append: bool,

        /// Strip crf:* annotations from the resolved schema
        #[arg(long)]
        strip: bool,

        /// Print the full resolution (schema, data patches, warnings)
        /// instead of the schema alone
        #[arg(long)]
        patches: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Derive the presentation hint tree for a schema/data pair
    Hints {
        /// Schema file
        schema: PathBuf,

        /// Data record file (an empty record if not given)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Flatten a schema/data pair into leaf-field rows
    Flatten {
        /// Schema file
        schema: PathBuf,

        /// Data record file (an empty record if not given)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a data record against a schema
    Validate {
        /// Schema file
        schema: PathBuf,

        /// Data record file
        data: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint schema files for errors (syntax, dangling refs, invalid annotations)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            schema,
            data,
            no_append,
            strip,
            patches,
            output,
            pretty,
        } => run_resolve(&schema, data.as_deref(), no_append, strip, patches, output, pretty),

        Commands::Hints {
            schema,
            data,
            pretty,
        } => run_hints(&schema, data.as_deref(), pretty),

        Commands::Flatten {
            schema,
            data,
            pretty,
        } => run_flatten(&schema, data.as_deref(), pretty),

        Commands::Validate { schema, data, json } => run_validate(&schema, &data, json),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_inputs(schema_path: &Path, data_path: Option<&Path>) -> Result<(Value, Value), u8> {
    let schema = load_schema(schema_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let data = match data_path {
        Some(path) => load_schema(path).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => Value::Object(serde_json::Map::new()),
    };
    Ok((schema, data))
}

fn emit<T: serde::Serialize>(value: &T, pretty: bool, output: Option<PathBuf>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => std::fs::write(&path, &json_output).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3u8
        }),
        None => {
            println!("{}", json_output);
            Ok(())
        }
    }
}

fn run_resolve(
    schema_path: &Path,
    data_path: Option<&Path>,
    no_append: bool,
    strip: bool,
    patches: bool,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_path, data_path)?;

    let options = ResolveOptions::new().append_undeclared(!no_append);
    let mut resolution = resolve(&schema, &data, &options);

    for warning in &resolution.warnings {
        eprintln!("Warning: {}", warning);
    }

    if strip {
        resolution.schema = strip_annotations(&resolution.schema);
    }

    if patches {
        emit(&resolution, pretty, output)
    } else {
        emit(&resolution.schema, pretty, output)
    }
}

fn run_hints(schema_path: &Path, data_path: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_path, data_path)?;

    let resolution = resolve(&schema, &data, &ResolveOptions::new());
    for warning in &resolution.warnings {
        eprintln!("Warning: {}", warning);
    }

    let required = resolution.schema["required"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let tree = derive_hints(&resolution.schema, &data, &required);

    emit(&tree, pretty, None)
}

fn run_flatten(schema_path: &Path, data_path: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_path, data_path)?;

    let resolution = resolve(&schema, &data, &ResolveOptions::new());
    for warning in &resolution.warnings {
        eprintln!("Warning: {}", warning);
    }

    let rows = flatten(&resolution.schema, &data);
    emit(&rows, pretty, None)
}

fn run_validate(schema_path: &Path, data_path: &Path, json_output: bool) -> Result<(), u8> {
    let (schema, data) = load_inputs(schema_path, Some(data_path))?;

    match validate(&schema, &data, &ResolveOptions::new()) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(ValidateError::Resolve(e)) => {
            if json_output {
                println!(r#"{{"valid":false,"error":"{}"}}"#, e);
            } else {
                eprintln!("Error: {}", e);
            }
            Err(e.exit_code() as u8)
        }
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    use crf_schema::Severity;

    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        match serde_json::to_string_pretty(&result) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return Err(2);
            }
        }
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let color = match diag.severity {
                    Severity::Error => "\x1b[31m",
                    Severity::Warning => "\x1b[33m",
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color,
                        match diag.severity {
                            Severity::Error => "error",
                            Severity::Warning => "warning",
                        },
                        diag.code,
                        diag.path,
                        diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
