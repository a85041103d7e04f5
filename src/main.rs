use std::collections::HashMap;
use std::io::Read;

use clap::Parser;
use drun::engine::{Engine, EngineOptions, ErrorKind, RunConfig};
use drun::Program;

#[derive(Parser)]
#[command(name = "drun")]
#[command(about = "Execution engine for drun task automation programs")]
#[command(version)]
struct Cli {
    /// Parsed program as JSON (produced by the drun parser); "-" for stdin
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Show what would run without executing
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Verbose execution trace
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Leave unresolved {placeholders} as-is instead of failing
    #[arg(long = "allow-undefined")]
    allow_undefined: bool,

    /// Cache resolved task plans within this invocation
    #[arg(long = "cache")]
    cache: bool,

    /// Override the detected environment name
    #[arg(long = "env")]
    environment: Option<String>,

    /// Parallel loop worker cap
    #[arg(long = "workers")]
    workers: Option<usize>,

    /// List tasks instead of executing
    #[arg(long = "list")]
    list: bool,

    /// Render the plan (dot, mermaid, json) instead of executing
    #[arg(long = "explain")]
    explain: Option<String>,

    /// Task to execute
    #[arg()]
    task: Option<String>,

    /// Task parameters as key=value pairs
    #[arg()]
    params: Vec<String>,
}

fn exit_code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Config | ErrorKind::Parse => 2,
        ErrorKind::MissingParameter | ErrorKind::UnknownParameter | ErrorKind::Constraint => 3,
        ErrorKind::Cancelled => 130,
        _ => 1,
    }
}

fn load_program(file: Option<&str>) -> Result<Program, String> {
    let contents = match file {
        Some("-") | None => {
            use std::io::IsTerminal;
            if std::io::stdin().is_terminal() {
                return Err(
                    "no program provided; pass --file or pipe parsed JSON on stdin".to_string(),
                );
            }
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("cannot read stdin: {}", e))?;
            buffer
        }
        Some(path) => {
            std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e))?
        }
    };
    serde_json::from_str(&contents).map_err(|e| format!("cannot parse program: {}", e))
}

fn parse_params(raw: &[String]) -> HashMap<String, String> {
    raw.iter()
        .filter_map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let program = match load_program(cli.file.as_deref()) {
        Ok(program) => program,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(2);
        }
    };

    let engine = Engine::new(EngineOptions {
        config: RunConfig {
            dry_run: cli.dry_run,
            verbose: cli.verbose,
            allow_undefined: cli.allow_undefined,
            environment: cli.environment.clone(),
            max_workers: cli.workers,
            cache_enabled: cli.cache,
        },
        ..Default::default()
    });

    if cli.list {
        match engine.list_tasks(&program) {
            Ok(tasks) => {
                for task in tasks {
                    if task.description.is_empty() {
                        println!("{}", task.name);
                    } else {
                        println!("{}  {}", task.name, task.description);
                    }
                }
                std::process::exit(0);
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                std::process::exit(exit_code_for(err.kind));
            }
        }
    }

    let task = match cli.task {
        Some(ref task) => task.clone(),
        None => {
            eprintln!("Error: no task given");
            std::process::exit(2);
        }
    };

    if let Some(ref format) = cli.explain {
        match engine.explain(&program, &task) {
            Ok(plan) => {
                let rendered = match format.as_str() {
                    "dot" => plan.to_dot(),
                    "mermaid" => plan.to_mermaid(),
                    "json" => plan.to_json().unwrap_or_default(),
                    other => {
                        eprintln!("Error: unknown plan format '{}'", other);
                        std::process::exit(2);
                    }
                };
                print!("{}", rendered);
                std::process::exit(0);
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                std::process::exit(exit_code_for(err.kind));
            }
        }
    }

    // Ctrl-C trips the engine's cancel token; in-flight calls return
    // promptly with a cancelled error
    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let params = parse_params(&cli.params);
    match engine.execute_with_params(&program, &task, &params).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("Error: {}", err);
            if let Some(line) = err.context.line {
                if let Some(ref task) = err.context.task {
                    eprintln!("  in task '{}' (line {})", task, line);
                }
            }
            std::process::exit(exit_code_for(err.kind));
        }
    }
}
