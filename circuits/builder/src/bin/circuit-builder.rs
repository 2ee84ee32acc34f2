use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use circuit_builder::{
    diagnostics::fatal_count, templates, CircuitCompiler, CircuitDocument, CompileOutput,
    CompilerConfig, Diagnostic, Graph, Metrics,
};

#[derive(Parser)]
#[command(
    name = "circuit-builder",
    version,
    about = "Compile visual circuit graphs into circom source"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and compile a circuit graph.
    Compile {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = InputFormat::Graph)]
        format: InputFormat,
        /// JSON compiler configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the template name from the configuration.
        #[arg(long, env = "CIRCUIT_BUILDER_TEMPLATE_NAME")]
        template_name: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the full compile report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Write a built-in template graph as JSON.
    Template {
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the built-in templates.
    Templates,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// Native graph JSON (`nodes` with `kind`, `edges` with ports).
    Graph,
    /// Circuit saved by the visual editor.
    Editor,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileReport<'a> {
    code: &'a str,
    diagnostics: &'a [Diagnostic],
    metrics: &'a Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_digest: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile {
            input,
            format,
            config,
            template_name,
            out,
            json,
        } => cmd_compile(CompileParams {
            input: input.as_path(),
            format,
            config: config.as_deref(),
            template_name,
            out: out.as_deref(),
            json,
        }),
        Commands::Template { name, out } => cmd_template(&name, out.as_deref()),
        Commands::Templates => cmd_templates(),
    }
}

struct CompileParams<'a> {
    input: &'a Path,
    format: InputFormat,
    config: Option<&'a Path>,
    template_name: Option<String>,
    out: Option<&'a Path>,
    json: bool,
}

fn cmd_compile(params: CompileParams<'_>) -> Result<()> {
    let mut config = match params.config {
        Some(path) => {
            let raw = read_file(path)?;
            CompilerConfig::from_json(&raw)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
        }
        None => CompilerConfig::default(),
    };
    if let Some(name) = params.template_name {
        config.template_name = name;
    }
    let compiler = CircuitCompiler::new(config).context("invalid compiler configuration")?;

    let graph = load_graph(params.input, params.format)?;
    let output = compiler.compile(&graph);

    if params.json {
        let report = CompileReport {
            code: &output.code,
            diagnostics: &output.diagnostics,
            metrics: &output.metrics,
            source_digest: output.source_digest_hex(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&output);
        if output.is_emitted() {
            write_or_print(params.out, &output.code)?;
        }
    }

    if output.is_emitted() {
        Ok(())
    } else {
        Err(anyhow!(
            "compilation blocked by {} fatal diagnostic(s)",
            fatal_count(&output.diagnostics).max(1)
        ))
    }
}

fn load_graph(path: &Path, format: InputFormat) -> Result<Graph> {
    let raw = read_file(path)?;
    match format {
        InputFormat::Graph => Graph::from_json(&raw)
            .with_context(|| format!("failed to parse graph {}", path.display())),
        InputFormat::Editor => {
            let document = CircuitDocument::from_json(&raw)
                .with_context(|| format!("failed to parse editor document {}", path.display()))?;
            document
                .to_graph()
                .with_context(|| format!("failed to import editor document {}", path.display()))
        }
    }
}

fn print_summary(output: &CompileOutput) {
    for diagnostic in &output.diagnostics {
        eprintln!("{diagnostic}");
    }
    let metrics = &output.metrics;
    eprintln!(
        "nodes: {}, edges: {}, constraints: {}, estimated proving time: {}",
        metrics.node_count, metrics.edge_count, metrics.constraints, metrics.estimated_time
    );
    if let Some(digest) = output.source_digest_hex() {
        eprintln!("source digest: {digest}");
    }
}

fn cmd_template(name: &str, out: Option<&Path>) -> Result<()> {
    let Some(template) = templates::find(name) else {
        let available: Vec<&str> = templates::names().collect();
        bail!(
            "unknown template `{name}` (available: {})",
            available.join(", ")
        );
    };
    let json = template.graph().to_json_pretty()?;
    write_or_print(out, &json)
}

fn cmd_templates() -> Result<()> {
    for template in templates::TEMPLATES {
        println!(
            "{:<20} {} - {}",
            template.name, template.title, template.description
        );
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_or_print(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{contents}");
            if !contents.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}
