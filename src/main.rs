use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mistral_client::config::Config;
use mistral_client::transport::http::format_error;
use mistral_client::{cron_triggers, executions, workflows, ServiceClient};
use serde::Serialize;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the Mistral workflow service
#[derive(Parser, Debug)]
#[command(name = "mistral", version, about, long_about = None)]
struct Args {
    /// Workflow service endpoint (overrides MISTRAL_URL and the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Auth token sent as X-Auth-Token (overrides OS_AUTH_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage workflows
    #[command(subcommand)]
    Workflow(WorkflowCommand),
    /// Manage executions
    #[command(subcommand)]
    Execution(ExecutionCommand),
    /// Manage cron triggers
    #[command(subcommand)]
    CronTrigger(CronTriggerCommand),
    /// Manage the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum WorkflowCommand {
    /// List workflows
    List {
        #[arg(long)]
        namespace: Option<String>,
        /// Maximum workflows per page
        #[arg(long)]
        limit: Option<u32>,
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Show one workflow
    Get { id: String },
    /// Create workflows from a definition file
    Create {
        file: PathBuf,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
    },
    /// Delete a workflow
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ExecutionCommand {
    /// List executions
    List {
        #[arg(long)]
        workflow_id: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Show one execution
    Get { id: String },
    /// Start an execution
    Create {
        workflow_id: String,
        /// Workflow input as a JSON document
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        /// Wait until the execution succeeds or fails
        #[arg(long)]
        wait: bool,
    },
    /// Delete an execution
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum CronTriggerCommand {
    /// List cron triggers
    List {
        #[arg(long)]
        workflow_id: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Show one cron trigger
    Get { id: String },
    /// Create a cron trigger
    Create {
        name: String,
        workflow_id: String,
        /// Unix crontab pattern
        #[arg(long)]
        pattern: Option<String>,
        /// Number of runs before the trigger is removed
        #[arg(long)]
        count: Option<u32>,
        /// Workflow input as a JSON document
        #[arg(long)]
        input: Option<String>,
    },
    /// Delete a cron trigger
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Persist the service endpoint
    SetEndpoint { endpoint: String },
    /// Print the effective configuration
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Private,
    Public,
}

impl From<ScopeArg> for workflows::Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Private => workflows::Scope::Private,
            ScopeArg::Public => workflows::Scope::Public,
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("mistral started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("mistral").join("mistral.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".mistral").join("mistral.log");
    }
    PathBuf::from("mistral.log")
}

fn print<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Collect at most `max_pages` pages of a listing
async fn collect<T: serde::de::DeserializeOwned>(
    pager: mistral_client::Pager<T>,
    max_pages: Option<usize>,
) -> mistral_client::Result<Vec<T>> {
    let mut items = Vec::new();
    if max_pages == Some(0) {
        return Ok(items);
    }
    let mut pages = 0;
    pager
        .each_page(|page| {
            items.extend(page.items);
            pages += 1;
            if max_pages.is_some_and(|max| pages >= max) {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
        .await?;
    Ok(items)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let mut config = Config::load();

    if let Command::Config(cmd) = &args.command {
        return run_config(cmd, &mut config, &args);
    }

    let endpoint = config.effective_endpoint(args.endpoint.as_deref());
    tracing::info!("Using endpoint: {}", endpoint);

    let mut client = ServiceClient::new(&endpoint)
        .with_context(|| format!("Invalid endpoint {}", endpoint))?;
    if let Some(token) = Config::effective_token(args.token.as_deref()) {
        client = client.with_token(token);
    }

    if let Err(err) = run(&client, &config, &args).await {
        tracing::error!("Command failed: {:?}", err);
        match err.downcast_ref::<mistral_client::Error>() {
            Some(service_err) => eprintln!("Error: {}", format_error(service_err)),
            None => eprintln!("Error: {:#}", err),
        }
        // Flush the log file before exiting
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}

fn run_config(cmd: &ConfigCommand, config: &mut Config, args: &Args) -> Result<()> {
    match cmd {
        ConfigCommand::SetEndpoint { endpoint } => {
            ServiceClient::new(endpoint)
                .with_context(|| format!("Invalid endpoint {}", endpoint))?;
            config.set_endpoint(endpoint)?;
            eprintln!("Saved endpoint {}", endpoint);
            Ok(())
        }
        ConfigCommand::Show => print(args.output, &*config),
    }
}

async fn run(client: &ServiceClient, config: &Config, args: &Args) -> Result<()> {
    let out = args.output;

    match &args.command {
        Command::Workflow(cmd) => match cmd {
            WorkflowCommand::List {
                namespace,
                limit,
                max_pages,
            } => {
                let opts = workflows::ListOpts {
                    namespace: namespace.clone(),
                    limit: *limit,
                    ..Default::default()
                };
                let items = collect(workflows::list(client, &opts)?, *max_pages).await?;
                print(out, &items)?;
            }
            WorkflowCommand::Get { id } => print(out, &workflows::get(client, id).await?)?,
            WorkflowCommand::Create {
                file,
                namespace,
                scope,
            } => {
                let definition = std::fs::read_to_string(file)
                    .with_context(|| format!("Cannot read workflow definition {:?}", file))?;
                let opts = workflows::CreateOpts {
                    definition,
                    namespace: namespace.clone(),
                    scope: scope.map(Into::into),
                };
                print(out, &workflows::create(client, &opts).await?)?;
            }
            WorkflowCommand::Delete { id } => {
                workflows::delete(client, id).await?;
                eprintln!("Deleted workflow {}", id);
            }
        },
        Command::Execution(cmd) => match cmd {
            ExecutionCommand::List {
                workflow_id,
                state,
                limit,
                max_pages,
            } => {
                let opts = executions::ListOpts {
                    workflow_id: workflow_id.clone(),
                    state: state.clone().map(Into::into),
                    limit: *limit,
                    ..Default::default()
                };
                let items = collect(executions::list(client, &opts)?, *max_pages).await?;
                print(out, &items)?;
            }
            ExecutionCommand::Get { id } => print(out, &executions::get(client, id).await?)?,
            ExecutionCommand::Create {
                workflow_id,
                input,
                description,
                namespace,
                wait,
            } => {
                let opts = executions::CreateOpts {
                    workflow_id: workflow_id.clone(),
                    workflow_namespace: namespace.clone(),
                    input: input.clone(),
                    description: description.clone(),
                    ..Default::default()
                };
                let execution = executions::create(client, &opts).await?;
                if *wait {
                    eprintln!("Waiting for execution {}", execution.id);
                    let finished =
                        executions::wait_for_success(client, &execution.id, config.poll_config())
                            .await?;
                    print(out, &finished)?;
                } else {
                    print(out, &execution)?;
                }
            }
            ExecutionCommand::Delete { id } => {
                executions::delete(client, id).await?;
                eprintln!("Deleted execution {}", id);
            }
        },
        Command::CronTrigger(cmd) => match cmd {
            CronTriggerCommand::List {
                workflow_id,
                limit,
                max_pages,
            } => {
                let opts = cron_triggers::ListOpts {
                    workflow_id: workflow_id.clone(),
                    limit: *limit,
                    ..Default::default()
                };
                let items = collect(cron_triggers::list(client, &opts)?, *max_pages).await?;
                print(out, &items)?;
            }
            CronTriggerCommand::Get { id } => print(out, &cron_triggers::get(client, id).await?)?,
            CronTriggerCommand::Create {
                name,
                workflow_id,
                pattern,
                count,
                input,
            } => {
                let opts = cron_triggers::CreateOpts {
                    pattern: pattern.clone(),
                    remaining_executions: *count,
                    workflow_input: input.clone(),
                    ..cron_triggers::CreateOpts::new(name.clone(), workflow_id.clone())
                };
                print(out, &cron_triggers::create(client, &opts).await?)?;
            }
            CronTriggerCommand::Delete { id } => {
                cron_triggers::delete(client, id).await?;
                eprintln!("Deleted cron trigger {}", id);
            }
        },
        Command::Config(_) => {}
    }

    Ok(())
}

