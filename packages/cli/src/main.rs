//! `sgraph`: command-line interface to the shapegraph model engine.
//!
//! - **`validate`** assembles fragments and prints the validation report.
//! - **`select`** prints the shapes a selector matches.
//! - **`condition-keys`** prints the IAM condition keys of a service.
//! - **`auth`** prints the effective auth schemes of a service or operation.
//!
//! Every subcommand reads fragment JSON (one fragment or an array) from the
//! given files, or from stdin for `-`.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use shapegraph::render::render_report;
use shapegraph::{prelude, EngineConfig, Model, ModelAssembler, Selector, Severity, ShapeId};

/// sgraph: validate and query shape models
#[derive(Parser)]
#[command(name = "sgraph", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Command,
}

/// Flags that switch engine behaviour on. Each starts from the matching
/// `SGRAPH_*` environment variable read by [`EngineConfig::from_env`].
#[derive(Args)]
struct EngineArgs {
    /// Report traits with no definition as warnings instead of errors.
    /// [env: SGRAPH_ALLOW_UNKNOWN_TRAITS]
    #[arg(long, global = true)]
    allow_unknown_traits: bool,

    /// Run validation rules one after another instead of in parallel.
    /// [env: SGRAPH_SEQUENTIAL]
    #[arg(long, global = true)]
    sequential: bool,

    /// Skip a validation rule by name. Repeat or separate with commas.
    /// Adds to SGRAPH_DISABLE_RULES.
    #[arg(long = "disable-rule", value_name = "RULE", global = true, value_delimiter = ',')]
    disabled_rules: Vec<String>,
}

impl EngineArgs {
    /// `base` with every flag given on the command line applied on top.
    fn apply(&self, mut base: EngineConfig) -> EngineConfig {
        if self.sequential {
            base.parallel = false;
        }
        if self.allow_unknown_traits {
            base.allow_unknown_traits = true;
        }
        base.disabled_rules.extend(
            self.disabled_rules
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
        );
        base
    }
}

#[derive(Subcommand)]
enum Command {
    /// Assemble and validate fragments.
    ///
    /// Exits 0 if the model is valid, 1 if any ERROR violation is reported,
    /// 2 if the input cannot be assembled at all.
    Validate {
        /// Minimum severity to print: note | warning | danger | error
        #[arg(long, value_name = "SEVERITY", env = "SGRAPH_SEVERITY", default_value = "note")]
        severity: Severity,

        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Fragment JSON files, or `-` for stdin.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the IDs of every shape matching a selector.
    ///
    /// Examples:
    ///   sgraph select 'structure[trait|error]' model.json
    ///   sgraph select 'service ~> operation' model.json
    Select {
        selector: String,

        /// Include prelude shapes in the output.
        #[arg(long = "prelude")]
        include_prelude: bool,

        /// Fragment JSON files, or `-` for stdin.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the condition keys of a service's resources and operations.
    ConditionKeys {
        /// Absolute shape ID of the service.
        service: ShapeId,

        /// Fragment JSON files, or `-` for stdin.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the effective auth schemes of a service, or of one of its
    /// operations.
    Auth {
        /// Absolute shape ID of the service.
        service: ShapeId,

        /// Absolute shape ID of an operation bound to the service.
        #[arg(short, long, value_name = "SHAPE_ID")]
        operation: Option<ShapeId>,

        /// Fragment JSON files, or `-` for stdin.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shapegraph=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.engine.apply(EngineConfig::from_env());

    match cli.command {
        Command::Validate {
            severity,
            json,
            files,
        } => {
            let validated = assembler(config, &files)
                .assemble()
                .unwrap_or_else(|e| fatal(&format!("cannot assemble model: {}", e)));
            if json {
                let out = serde_json::to_string_pretty(&validated.report)
                    .unwrap_or_else(|e| fatal(&format!("cannot serialize report: {}", e)));
                println!("{}", out);
            } else {
                print!("{}", render_report(&validated.report, severity));
            }
            if !validated.is_valid() {
                process::exit(1);
            }
        }

        Command::Select {
            selector,
            include_prelude,
            files,
        } => {
            let selector = Selector::parse(&selector).unwrap_or_else(|e| fatal(&e.to_string()));
            let model = merged(config, &files);
            for id in selector.select(&model) {
                if include_prelude || !prelude::NAMESPACES.contains(&id.namespace()) {
                    println!("{}", id);
                }
            }
        }

        Command::ConditionKeys { service, files } => {
            let model = merged(config, &files);
            require_service(&model, &service);
            let index = model.condition_keys();

            println!("Defined keys:");
            for (name, definition) in index.defined_keys(&service).into_iter().flatten() {
                println!("  {}  ({})", name, definition.key_type);
            }

            let top_down = model.top_down();
            let subjects = top_down
                .contained_resources(&service)
                .iter()
                .chain(top_down.contained_operations(&service));
            for subject in subjects {
                let keys: Vec<&str> = index
                    .key_names(&service, subject)
                    .into_iter()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                if !keys.is_empty() {
                    println!("{}: {}", subject, keys.join(", "));
                }
            }
        }

        Command::Auth {
            service,
            operation,
            files,
        } => {
            let model = merged(config, &files);
            require_service(&model, &service);
            let schemes = match &operation {
                Some(op) => {
                    if !model.top_down().contained_operations(&service).contains(op) {
                        fatal(&format!("`{}` is not an operation of `{}`", op, service));
                    }
                    model.auth().effective_operation_auth(&service, op)
                }
                None => model.auth().effective_service_auth(&service),
            };
            for scheme in schemes {
                println!("{}", scheme);
            }
        }
    }
}

/// An assembler loaded with every file in `files`.
fn assembler(config: EngineConfig, files: &[PathBuf]) -> ModelAssembler {
    let mut assembler = ModelAssembler::with_config(config);
    for path in files {
        let json = read_input(path);
        if let Err(e) = assembler.add_json(&json) {
            fatal(&format!("{}: {}", path.display(), e));
        }
    }
    assembler
}

/// The merged model, without running validation. Merge problems are logged.
fn merged(config: EngineConfig, files: &[PathBuf]) -> Model {
    let merged = assembler(config, files)
        .merge()
        .unwrap_or_else(|e| fatal(&format!("cannot assemble model: {}", e)));
    for violation in &merged.violations {
        tracing::warn!(%violation, "merge problem");
    }
    merged.model
}

fn require_service(model: &Model, id: &ShapeId) {
    if model.get_shape(id).and_then(|s| s.as_service()).is_none() {
        fatal(&format!("`{}` is not a service in the model", id));
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {}", path.display(), e)))
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("sgraph: {}", msg);
    process::exit(2);
}

// --- tests -------------------------------------------------------------------
