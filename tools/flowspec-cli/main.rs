use clap::{Parser, Subcommand};
use flowspec::compiler::Compiler;
use flowspec::config::EditorConfig;
use flowspec::editor::JsonFileStore;
use flowspec::prelude::*;
use flowspec::spec::SpecShape;
use itertools::Itertools;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Normalize, validate, compile and preview WhatsApp Flow specs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional TOML config (flow version, data API version, default flow name)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Flow name used for titles when the spec does not provide one
    #[arg(short = 'n', long, global = true)]
    flow_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical spec for a stored spec of any accepted shape
    Normalize { path: PathBuf },
    /// List validation issues; exits non-zero when there are any
    Validate { path: PathBuf },
    /// Print the compiled vendor Flow JSON
    Compile {
        path: PathBuf,
        /// Refuse to compile a spec with validation issues
        #[arg(long)]
        strict: bool,
        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Normalize a stored spec and write it with its compiled JSON as a flow record
    Import { path: PathBuf, output: PathBuf },
    /// Show which screen follows a screen for the given answers
    Route {
        path: PathBuf,
        screen: String,
        /// Answers as field=value; values are read as JSON when they parse
        #[arg(short, long = "answer")]
        answers: Vec<String>,
        /// Prompt for each field the screen's rules look at
        #[arg(short = 'i', long)]
        interactive: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::from_file(path).unwrap_or_else(|e| exit_with_error(&e.to_string())),
        None => EditorConfig::default(),
    };
    let flow_name = cli
        .flow_name
        .clone()
        .unwrap_or_else(|| config.default_flow_name.clone());

    match cli.command {
        Command::Normalize { path } => run_normalize(&path, &flow_name),
        Command::Validate { path } => run_validate(&path, &flow_name),
        Command::Compile {
            path,
            strict,
            output,
        } => run_compile(&path, &flow_name, &config, strict, output),
        Command::Import { path, output } => run_import(&path, output, &flow_name, &config),
        Command::Route {
            path,
            screen,
            answers,
            interactive,
        } => run_route(&path, &flow_name, &screen, &answers, interactive),
    }
}

fn read_raw(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read flow file '{}': {}", path.display(), e))
    });
    let raw: serde_json::Value = serde_json::from_str(&content)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse flow JSON: {}", e)));
    raw
}

fn load_spec(path: &Path, flow_name: &str) -> FlowSpec {
    let load_start = Instant::now();
    let raw = read_raw(path);
    let shape = SpecShape::detect(&raw);
    let spec = normalize(&raw, flow_name);
    tracing::info!(
        ?shape,
        screens = spec.screens.len(),
        elapsed = ?load_start.elapsed(),
        "flow loaded"
    );
    spec
}

fn run_normalize(path: &Path, flow_name: &str) {
    let spec = load_spec(path, flow_name);
    let out = serde_json::to_string_pretty(&spec)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize spec: {}", e)));
    println!("{}", out);
}

fn run_validate(path: &Path, flow_name: &str) {
    let spec = load_spec(path, flow_name);
    let issues = validate(&spec);
    if issues.is_empty() {
        println!("No issues found ({} screens).", spec.screens.len());
        return;
    }
    println!("Found {} issue(s):", issues.len());
    for issue in &issues {
        println!("  - {}", issue);
    }
    std::process::exit(2);
}

fn run_compile(
    path: &Path,
    flow_name: &str,
    config: &EditorConfig,
    strict: bool,
    output: Option<PathBuf>,
) {
    let spec = load_spec(path, flow_name);

    let issues = validate(&spec);
    if !issues.is_empty() {
        if strict {
            exit_with_error(&CompileError::InvalidSpec(issues).to_string());
        }
        eprintln!("Warning: compiling a flow with {} issue(s).", issues.len());
    }

    let compile_start = Instant::now();
    let json = Compiler::builder(&spec)
        .with_config(config)
        .build()
        .compile_to_string()
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    let compile_duration = compile_start.elapsed();

    match output {
        Some(out_path) => {
            fs::write(&out_path, json).unwrap_or_else(|e| {
                exit_with_error(&format!(
                    "Failed to write '{}': {}",
                    out_path.display(),
                    e
                ))
            });
            eprintln!(
                "Compiled {} screens to {} in {:?}",
                spec.screens.len(),
                out_path.display(),
                compile_duration
            );
        }
        None => println!("{}", json),
    }
}

fn run_import(path: &Path, output: PathBuf, flow_name: &str, config: &EditorConfig) {
    let raw = read_raw(path);
    let state = EditorState::from_raw(&raw, flow_name);
    let runtime = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start runtime: {}", e)));

    let import_start = Instant::now();
    runtime.block_on(async {
        let store = Arc::new(JsonFileStore::new(&output));
        let mut editor = FlowEditor::new(state, store, None, config.clone());
        editor
            .save_now()
            .await
            .unwrap_or_else(|e| exit_with_error(&e.to_string()));
        println!(
            "Imported {} screens into {} in {:?}",
            editor.spec().screens.len(),
            output.display(),
            import_start.elapsed()
        );
    });
}

fn run_route(path: &Path, flow_name: &str, screen_id: &str, raw_answers: &[String], interactive: bool) {
    let spec = load_spec(path, flow_name);
    let mut answers = Answers::default();

    for raw in raw_answers {
        let (field, value) = raw.split_once('=').unwrap_or_else(|| {
            exit_with_error(&format!("Answer '{}' is not in field=value form", raw))
        });
        answers.insert(field.trim().to_string(), parse_answer(value));
    }

    if interactive {
        println!("--- Route preview for {} ---", screen_id);
        let fields: Vec<&str> = spec
            .branches(screen_id)
            .iter()
            .map(|r| r.field.as_str())
            .unique()
            .collect();
        for field in fields {
            if answers.contains_key(field) {
                continue;
            }
            let value = prompt_for_input(&format!("Value for '{}'", field), None);
            if !value.is_empty() {
                answers.insert(field.to_string(), parse_answer(&value));
            }
        }
    }

    let resolution = RouteResolver::new(&spec)
        .resolve(screen_id, &answers)
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    match &resolution.next {
        Some(next) => println!("  -> Next screen: {}", next),
        None => println!("  -> Flow completes"),
    }
    println!("  -> Reason: {}", resolution.reason);
}

fn parse_answer(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// A helper function to prompt the user and read a line of input.
fn prompt_for_input(prompt_text: &str, default: Option<&str>) -> String {
    let mut line = String::new();
    let default_prompt = default.map_or(String::new(), |d| format!(" [default: {}]", d));

    print!("> {}{}: ", prompt_text, default_prompt);
    if let Err(e) = io::stdout().flush() {
        exit_with_error(&format!("Failed to write prompt: {}", e));
    }
    if let Err(e) = io::stdin().read_line(&mut line) {
        exit_with_error(&format!("Failed to read line: {}", e));
    }
    let trimmed = line.trim().to_string();

    if trimmed.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        trimmed
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
