//! Conflux CLI - Command-line interface for integrated dual-branch analysis
//!
//! Runs confidence-fused analysis combining multi-path reasoning with
//! behavioral trajectory scoring, against a local Ollama instance or the
//! HuggingFace Inference API.

use clap::{Parser, Subcommand, ValueEnum};
use conflux::behavior::ProfileTrajectoryAnalyzer;
use conflux::benchmark::{builtin_cases, run_benchmark};
use conflux::core::{render_report, IntegratedAnalyzer};
use conflux::reasoning::huggingface::HuggingFaceBackend;
use conflux::reasoning::ollama::OllamaBackend;
use conflux::reasoning::runner::{PathRunner, RunMode, SampleBackend};
use conflux::reasoning::GenerateOptions;
use serde::Serialize;
use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

/// Conflux CLI - Confidence-fused reasoning and behavioral analysis
#[derive(Parser)]
#[command(name = "conflux-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for programmatic use
    Json,
}

/// Model backend selector
#[derive(Clone, Copy, ValueEnum, Default)]
enum Backend {
    /// Local Ollama instance
    #[default]
    Ollama,
    /// HuggingFace Inference API
    Huggingface,
}

impl Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Ollama => "ollama",
            Backend::Huggingface => "huggingface",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run integrated analysis (reasoning + behavior, fused)
    Analyze {
        /// The reasoning prompt (or - for stdin)
        #[arg(short, long)]
        prompt: Option<String>,

        /// User profile: inline JSON (starting with '{') or a file path
        #[arg(short = 'P', long)]
        profile: String,

        /// Multimodal source identifiers
        #[arg(long, value_delimiter = ',')]
        multimodal: Option<Vec<String>>,

        /// Model backend
        #[arg(short, long, value_enum, default_value = "ollama")]
        backend: Backend,

        /// Model name
        #[arg(short, long, default_value = "qwen3:0.6b")]
        model: String,

        /// Number of reasoning paths to sample
        #[arg(long, default_value = "8")]
        num_paths: usize,

        /// Fraction of paths kept after confidence pruning
        #[arg(long, default_value = "0.8")]
        keep_ratio: f64,

        /// Write the result JSON to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Write the text report to this file
        #[arg(short, long)]
        report: Option<String>,
    },

    /// Run reasoning-only multi-path sampling (no behavior branch, no fusion)
    Run {
        /// The reasoning prompt (or - for stdin)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Model backend
        #[arg(short, long, value_enum, default_value = "ollama")]
        backend: Backend,

        /// Model name
        #[arg(short, long, default_value = "qwen3:0.6b")]
        model: String,

        /// Number of reasoning paths to sample
        #[arg(short = 'n', long, default_value = "8")]
        num_paths: usize,

        /// Fraction of paths kept after confidence pruning
        #[arg(short = 'k', long, default_value = "0.8")]
        keep_ratio: f64,

        /// Execution mode
        #[arg(long, value_enum, default_value = "offline")]
        mode: Mode,

        /// Write the full result JSON to this file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run behavior-only trajectory analysis of a profile
    Behavior {
        /// User profile: inline JSON (starting with '{') or a file path
        #[arg(short = 'P', long)]
        profile: String,

        /// Multimodal source identifiers
        #[arg(long, value_delimiter = ',')]
        multimodal: Option<Vec<String>>,

        /// Write the result JSON to this file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show analyzer status and collaborator availability
    Status {
        /// Model backend
        #[arg(short, long, value_enum, default_value = "ollama")]
        backend: Backend,

        /// Model name
        #[arg(short, long, default_value = "qwen3:0.6b")]
        model: String,
    },

    /// Run the embedded benchmark suite
    Bench {
        /// Model backend
        #[arg(short, long, value_enum, default_value = "ollama")]
        backend: Backend,

        /// Model name
        #[arg(short, long, default_value = "qwen3:0.6b")]
        model: String,

        /// Write the per-case CSV summary to this file
        #[arg(long)]
        csv: Option<String>,

        /// Write the JSON summary to this file
        #[arg(long)]
        json: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Execution mode for the run subcommand
#[derive(Clone, Copy, ValueEnum, Default)]
enum Mode {
    /// Generate all paths before selecting survivors
    #[default]
    Offline,
    /// Stop early once the leading answer's agreement is strong enough
    Online,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Offline => RunMode::Offline,
            Mode::Online => RunMode::Online,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
#[allow(clippy::enum_variant_names)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Analyze {
            prompt,
            profile,
            multimodal,
            backend,
            model,
            num_paths,
            keep_ratio,
            output,
            report,
        } => {
            execute_analyze(
                cli.format, prompt, &profile, multimodal, backend, &model, num_paths, keep_ratio,
                output, report,
            )
            .await
        }

        Commands::Run {
            prompt,
            backend,
            model,
            num_paths,
            keep_ratio,
            mode,
            output,
        } => {
            execute_run(
                cli.format, prompt, backend, &model, num_paths, keep_ratio, mode, output,
            )
            .await
        }

        Commands::Behavior {
            profile,
            multimodal,
            output,
        } => execute_behavior(cli.format, &profile, multimodal, output).await,

        Commands::Status { backend, model } => execute_status(cli.format, backend, &model),

        Commands::Bench {
            backend,
            model,
            csv,
            json,
        } => execute_bench(cli.format, backend, &model, csv, json).await,

        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn execute_analyze(
    format: OutputFormat,
    prompt: Option<String>,
    profile: &str,
    multimodal: Option<Vec<String>>,
    backend: Backend,
    model: &str,
    num_paths: usize,
    keep_ratio: f64,
    output: Option<String>,
    report: Option<String>,
) -> Result<(), String> {
    let prompt_text = get_input(prompt, "prompt")?;
    if prompt_text.is_empty() {
        return Err("prompt cannot be empty".to_string());
    }

    // Malformed profile input is the one pre-dispatch error that reaches
    // the user as an explicit failure
    let profile_data = parse_profile(profile)?;

    let options = GenerateOptions::default()
        .with_num_paths(num_paths)
        .with_keep_ratio(keep_ratio);
    let analyzer = setup_analyzer(backend, model).with_generate_options(options);

    let result = analyzer
        .integrated_analysis(&prompt_text, &profile_data, multimodal.as_deref())
        .await;

    if let Some(path) = &output {
        let json = result.to_json().map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))?;
        println!("Result saved to {}", path);
    }

    if let Some(path) = &report {
        std::fs::write(path, render_report(&result))
            .map_err(|e| format!("Failed to write {}: {}", path, e))?;
        println!("Report saved to {}", path);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", result.to_json().map_err(|e| e.to_string())?);
        }
        OutputFormat::Text => {
            print!("{}", render_report(&result));
        }
    }
    Ok(())
}

/// Summary printed after a reasoning-only run
#[derive(Serialize)]
struct RunSummary {
    final_answer: String,
    generated_paths: usize,
    kept_paths: usize,
    average_confidence: f64,
}

#[allow(clippy::too_many_arguments)]
async fn execute_run(
    format: OutputFormat,
    prompt: Option<String>,
    backend: Backend,
    model: &str,
    num_paths: usize,
    keep_ratio: f64,
    mode: Mode,
    output: Option<String>,
) -> Result<(), String> {
    let prompt_text = get_input(prompt, "prompt")?;
    if prompt_text.is_empty() {
        return Err("prompt cannot be empty".to_string());
    }

    // Reasoning-only: a backend that cannot initialize is a hard error here,
    // there is no other branch to degrade to
    let sample_backend = setup_backend(backend, model).map_err(|e| e.to_string())?;
    let runner = PathRunner::new(sample_backend);

    let result = runner
        .run(&prompt_text, mode.into(), num_paths, keep_ratio)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(path) = &output {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))?;
        println!("Result saved to {}", path);
    }

    let average_confidence = if result.kept_confidences.is_empty() {
        0.0
    } else {
        result.kept_confidences.iter().sum::<f64>() / result.kept_confidences.len() as f64
    };

    output_response(
        format,
        &RunSummary {
            final_answer: result.final_answer,
            generated_paths: result.all_paths.len(),
            kept_paths: result.kept_paths.len(),
            average_confidence,
        },
    )
}

async fn execute_behavior(
    format: OutputFormat,
    profile: &str,
    multimodal: Option<Vec<String>>,
    output: Option<String>,
) -> Result<(), String> {
    use conflux::behavior::TrajectoryAnalyzer;

    let profile_data = parse_profile(profile)?;
    let sources = multimodal.unwrap_or_else(|| vec!["text".to_string(), "profile".to_string()]);

    let analyzer = ProfileTrajectoryAnalyzer::new();
    let result = analyzer
        .analyze_trajectory(&profile_data, &sources)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(path) = &output {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))?;
        println!("Result saved to {}", path);
    }

    output_response(format, &result)
}

fn execute_status(format: OutputFormat, backend: Backend, model: &str) -> Result<(), String> {
    let analyzer = setup_analyzer(backend, model);
    output_response(format, &analyzer.status())
}

async fn execute_bench(
    format: OutputFormat,
    backend: Backend,
    model: &str,
    csv: Option<String>,
    json: Option<String>,
) -> Result<(), String> {
    let analyzer = setup_analyzer(backend, model);
    let summary = run_benchmark(&analyzer, &builtin_cases()).await;

    if let Some(path) = &csv {
        std::fs::write(path, summary.to_csv())
            .map_err(|e| format!("Failed to write {}: {}", path, e))?;
        println!("CSV summary saved to {}", path);
    }

    if let Some(path) = &json {
        let body = summary.to_json().map_err(|e| e.to_string())?;
        std::fs::write(path, body).map_err(|e| format!("Failed to write {}: {}", path, e))?;
        println!("JSON summary saved to {}", path);
    }

    output_response(format, &summary.stats)
}

fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as ClapShell};

    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => ClapShell::Bash,
        Shell::Zsh => ClapShell::Zsh,
        Shell::Fish => ClapShell::Fish,
        Shell::PowerShell => ClapShell::PowerShell,
    };
    generate(shell, &mut cmd, "conflux-cli", &mut io::stdout());
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Build an analyzer for the selected backend
///
/// A backend that fails to initialize (e.g. missing HF_API_TOKEN) leaves its
/// branch uninstalled rather than failing the command; `status` reports the
/// availability.
fn setup_analyzer(backend: Backend, model: &str) -> IntegratedAnalyzer {
    let mut analyzer = IntegratedAnalyzer::new(backend.name(), model)
        .with_trajectory_analyzer(Arc::new(ProfileTrajectoryAnalyzer::new()));

    match setup_backend(backend, model) {
        Ok(sample_backend) => {
            analyzer = analyzer.with_reasoning_engine(Arc::new(PathRunner::new(sample_backend)));
        }
        Err(e) => {
            warn!(error = %e, "reasoning backend unavailable");
        }
    }

    analyzer
}

/// Build the sampling backend for the selected provider
fn setup_backend(
    backend: Backend,
    model: &str,
) -> Result<Arc<dyn SampleBackend>, conflux::reasoning::ReasoningError> {
    match backend {
        Backend::Ollama => Ok(Arc::new(OllamaBackend::new(model))),
        Backend::Huggingface => {
            let hf = HuggingFaceBackend::new(model)?;
            Ok(Arc::new(hf))
        }
    }
}

/// Parse a profile argument: inline JSON if it starts with '{', else a file path
fn parse_profile(profile: &str) -> Result<serde_json::Value, String> {
    let content = if profile.trim_start().starts_with('{') {
        profile.to_string()
    } else {
        std::fs::read_to_string(profile)
            .map_err(|e| format!("Failed to read profile file {}: {}", profile, e))?
    };

    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| format!("Invalid profile JSON: {}", e))?;

    if !value.is_object() {
        return Err("Profile must be a JSON object".to_string());
    }
    Ok(value)
}

/// Get input from command argument or stdin
fn get_input(arg: Option<String>, name: &str) -> Result<String, String> {
    match arg {
        Some(s) if s != "-" => Ok(s),
        _ => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("Failed to read {} from stdin: {}", name, e))?;
            Ok(input.trim().to_string())
        }
    }
}

/// Output a response in the specified format
fn output_response<T: Serialize>(format: OutputFormat, response: &T) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let value = serde_json::to_value(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            print_value(&value, 0);
        }
    }
    Ok(())
}

/// Recursively print a JSON value with indentation for human-readable output
fn print_value(value: &serde_json::Value, indent: usize) {
    let prefix = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}{}:", prefix, key);
                        print_value(val, indent + 1);
                    }
                    _ => {
                        println!("{}{}: {}", prefix, key, format_simple_value(val));
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}[{}]:", prefix, i);
                        print_value(val, indent + 1);
                    }
                    _ => {
                        println!("{}- {}", prefix, format_simple_value(val));
                    }
                }
            }
        }
        _ => {
            println!("{}{}", prefix, format_simple_value(value));
        }
    }
}

/// Format a simple JSON value as a string for display
fn format_simple_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
