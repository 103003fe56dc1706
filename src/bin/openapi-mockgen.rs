//! OpenAPI Mock Generator CLI
//!
//! Command-line interface for generating requests and responses from OpenAPI
//! documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use openapi_mockgen::{
    new_request_from_operation, new_response_from_operation, validate_content,
    CacheOperationAdapter, Contexts, Direction, Document, DocumentError, MemoryStorage,
    OpenApiDocument, Operation, ServiceConfig, ValidateError,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-mockgen")]
#[command(about = "Generate mock requests and responses from OpenAPI documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a request for an operation
    Request {
        #[command(flatten)]
        target: OperationArgs,

        #[command(flatten)]
        generate: GenerateArgs,
    },

    /// Generate the response of an operation
    Response {
        #[command(flatten)]
        target: OperationArgs,

        #[command(flatten)]
        generate: GenerateArgs,

        /// Validate the generated content against the response schema
        #[arg(long)]
        validate: bool,
    },

    /// Print the normalized schema of an operation
    Schema {
        #[command(flatten)]
        target: OperationArgs,

        /// Request body schema
        #[arg(
            long,
            conflicts_with = "response",
            required_unless_present = "response"
        )]
        request: bool,

        /// Response content schema
        #[arg(long, conflicts_with = "request", required_unless_present = "request")]
        response: bool,

        #[command(flatten)]
        parse: ParseArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List resources and their methods
    Resources {
        /// OpenAPI document (JSON or YAML)
        spec: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct OperationArgs {
    /// OpenAPI document (JSON or YAML)
    spec: PathBuf,

    /// HTTP method
    #[arg(long, short, default_value = "get")]
    method: String,

    /// Resource path as declared, e.g. /pets/{petId}
    #[arg(long, short)]
    path: String,
}

#[derive(Args)]
struct ParseArgs {
    /// Service configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum property depth (0 = unbounded)
    #[arg(long)]
    max_levels: Option<usize>,

    /// Maximum repetitions of one $ref along a branch
    #[arg(long)]
    max_recursion_levels: Option<usize>,

    /// Generate required properties only
    #[arg(long)]
    only_required: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    parse: ParseArgs,

    /// Context file (YAML); the file name is the namespace
    #[arg(long = "context")]
    contexts: Vec<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Prefix prepended to the generated path
    #[arg(long, default_value = "")]
    prefix: String,

    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Request { target, generate } => run_request(&target, &generate),
        Commands::Response {
            target,
            generate,
            validate,
        } => run_response(&target, &generate, validate),
        Commands::Schema {
            target,
            request,
            response: _,
            parse,
            pretty,
        } => run_schema(&target, Direction::from_request_flag(request), &parse, pretty),
        Commands::Resources { spec, json } => run_resources(&spec, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr so stdout stays machine readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("openapi_mockgen=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_request(target: &OperationArgs, args: &GenerateArgs) -> Result<(), u8> {
    let config = load_config(&args.parse, args.seed)?;
    let (document, operation) = load_operation(target, &config)?;
    let pipeline = config.pipeline(&load_context_files(&args.contexts)?);

    let request = new_request_from_operation(
        &args.prefix,
        &target.path,
        &target.method,
        operation.as_ref(),
        document.security(),
        &pipeline,
    );

    write_json(&request, args.pretty, args.output.as_deref())
}

fn run_response(target: &OperationArgs, args: &GenerateArgs, validate: bool) -> Result<(), u8> {
    let config = load_config(&args.parse, args.seed)?;
    let (_, operation) = load_operation(target, &config)?;
    let pipeline = config.pipeline(&load_context_files(&args.contexts)?);

    let response = new_response_from_operation(operation.as_ref(), &pipeline);
    let content = decode_content(&response.content, &response.content_type);

    if validate {
        if let Some(schema) = operation.response().content {
            match validate_content(&schema, &content, Direction::Response) {
                Ok(()) => {}
                Err(ValidateError::Invalid { errors }) => {
                    eprintln!("Validation failed:");
                    for error in errors {
                        eprintln!("  {}", error);
                    }
                    return Err(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Err(e.exit_code() as u8);
                }
            }
        }
    }

    let output = serde_json::json!({
        "statusCode": response.status_code,
        "headers": response.headers,
        "contentType": response.content_type,
        "content": content,
    });
    write_json(&output, args.pretty, args.output.as_deref())
}

fn run_schema(
    target: &OperationArgs,
    direction: Direction,
    parse: &ParseArgs,
    pretty: bool,
) -> Result<(), u8> {
    let config = load_config(parse, None)?;
    let (document, operation) = load_operation(target, &config)?;

    let schema = match direction {
        Direction::Request => operation
            .request(document.security())
            .body
            .and_then(|body| body.schema),
        Direction::Response => operation.response().content,
    };

    write_json(&schema, pretty, None)
}

fn run_resources(spec: &Path, json_output: bool) -> Result<(), u8> {
    let document = load_document(spec)?;
    let resources = document.resources();

    if json_output {
        return write_json(&resources, false, None);
    }

    for (path, methods) in resources {
        println!("{:<8} {}", methods.join(","), path);
    }
    Ok(())
}

fn load_config(parse: &ParseArgs, seed: Option<u64>) -> Result<ServiceConfig, u8> {
    let mut config = match &parse.config {
        Some(path) => ServiceConfig::load(path).map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e.exit_code() as u8
        })?,
        None => ServiceConfig::default(),
    };

    if let Some(levels) = parse.max_levels {
        config.parse_config.max_levels = levels;
    }
    if let Some(levels) = parse.max_recursion_levels {
        config.parse_config.max_recursion_levels = levels;
    }
    if parse.only_required {
        config.parse_config.only_required = true;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

fn load_document(spec: &Path) -> Result<OpenApiDocument, u8> {
    OpenApiDocument::load(spec).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn load_operation(
    target: &OperationArgs,
    config: &ServiceConfig,
) -> Result<(OpenApiDocument, Box<dyn Operation>), u8> {
    let document = load_document(&target.spec)?;

    let mut operation = document
        .find_operation(&target.method, &target.path)
        .map_err(|e| {
            match &e {
                DocumentError::MethodNotAllowed { .. } => eprintln!("Error (405): {}", e),
                DocumentError::OperationNotFound { .. } => eprintln!("Error (404): {}", e),
                _ => eprintln!("Error: {}", e),
            }
            e.exit_code() as u8
        })?;
    operation.set_parse_config(config.parse_config);

    if config.cache.schema {
        let service = target
            .spec
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        operation = Box::new(CacheOperationAdapter::new(
            service,
            operation,
            Arc::new(MemoryStorage::new()),
        ));
    }

    Ok((document, operation))
}

fn load_context_files(paths: &[PathBuf]) -> Result<Contexts, u8> {
    Contexts::load_files(paths).map_err(|e| {
        eprintln!("Error loading context: {}", e);
        e.exit_code() as u8
    })
}

/// JSON bodies are embedded as JSON, anything else as text.
fn decode_content(content: &[u8], content_type: &str) -> serde_json::Value {
    if content.is_empty() {
        return serde_json::Value::Null;
    }
    if content_type.starts_with("application/json") {
        if let Ok(value) = serde_json::from_slice(content) {
            return value;
        }
    }
    serde_json::Value::String(String::from_utf8_lossy(content).into_owned())
}

fn write_json<T: Serialize + ?Sized>(value: &T, pretty: bool, output: Option<&Path>) -> Result<(), u8> {
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
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
