//! Multiverse Devtools - Main entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use multiverse_schema::Audience;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "multiverse-devtools", version, about = "Component schema inspection")]
struct Cli {
    /// Output encoding for JSON results
    #[arg(long, global = true, env = "MULTIVERSE_OUTPUT", value_enum, default_value_t = OutputFormat::Pretty)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Command {
    /// List registered component types
    List {
        /// Only types in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the introspection description of a type
    Describe { type_name: String },
    /// Print the default instance of a type
    Default { type_name: String },
    /// Validate an instance read from a file (or stdin)
    Check { input: Option<PathBuf> },
    /// Project an instance for one audience
    Project {
        #[arg(long, env = "MULTIVERSE_AUDIENCE", default_value = "dev")]
        audience: Audience,
        /// Fully validate before projecting
        #[arg(long)]
        validate: bool,
        input: Option<PathBuf>,
    },
    /// Render the LLM digest of an entity given as a list of instances
    Digest {
        input: Option<PathBuf>,
        /// JSON object mapping entity ids to display names
        #[arg(long)]
        names: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multiverse_schema=info,multiverse_devtools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let registry = multiverse_components::registry()?;
    tracing::debug!(types = registry.len(), "Component registry ready");

    let out = match cli.command {
        Command::List { category } => commands::list(&registry, category.as_deref(), cli.output)?,
        Command::Describe { type_name } => commands::describe(&registry, &type_name, cli.output)?,
        Command::Default { type_name } => commands::default(&registry, &type_name, cli.output)?,
        Command::Check { input } => {
            let instance = commands::read_json(input.as_deref())?;
            commands::check(&registry, &instance)?
        }
        Command::Project {
            audience,
            validate,
            input,
        } => {
            let instance = commands::read_json(input.as_deref())?;
            commands::project(&registry, &instance, audience, validate, cli.output)?
        }
        Command::Digest { input, names } => {
            let saved = commands::read_json(input.as_deref())?;
            let names = names
                .map(|path| commands::read_names(&path))
                .transpose()?
                .unwrap_or_default();
            commands::digest(&registry, saved, &names)?
        }
    };
    println!("{out}");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
