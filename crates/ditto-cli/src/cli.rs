//! Argument parsing and command dispatch.

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ditto_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, command_span, init_logging};
use reqwest::Url;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{
    AppContext, CliError, CliResult, Credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, Profile,
    build_http_client, parse_url,
};
use crate::commands::config::handle_config_get;
use crate::commands::connections::{
    handle_connection_create, handle_connection_delete, handle_connection_get,
    handle_connection_list,
};
use crate::commands::devops::handle_whoami;
use crate::commands::logging::{handle_logging_get, handle_logging_update};
use crate::commands::permissions::handle_permission_check;
use crate::commands::policies::{
    handle_policy_create, handle_policy_delete, handle_policy_entries, handle_policy_get,
};
use crate::commands::search::{handle_search_count, handle_search_query};
use crate::commands::things::{
    handle_thing_create, handle_thing_delete, handle_thing_diff, handle_thing_get,
    handle_thing_list, handle_thing_update,
};

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    run_with(Cli::parse()).await
}

pub(crate) async fn run_with(cli: Cli) -> i32 {
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let command_name = command_label(&cli.command);
    let correlation_id = Uuid::new_v4().to_string();
    let span = command_span(command_name, &correlation_id);

    let result = dispatch(cli, &correlation_id).instrument(span.clone()).await;

    let _entered = span.enter();
    match result {
        Ok(()) => {
            tracing::debug!("command succeeded");
            0
        }
        Err(err) => {
            let exit_code = err.exit_code();
            match &err {
                CliError::Connection(source) | CliError::Failure(source) => {
                    tracing::debug!(exit_code, error = %format!("{source:#}"), "command failed");
                }
                CliError::Validation(_) | CliError::NotFound(_) => {
                    tracing::debug!(exit_code, "command rejected");
                }
            }
            eprintln!("{}", err.display_message());
            exit_code
        }
    }
}

async fn dispatch(cli: Cli, correlation_id: &str) -> CliResult<()> {
    let profile = cli.command.profile();
    let credentials =
        Credentials::resolve(profile, cli.username.as_deref(), cli.password.as_deref())?;
    tracing::debug!(
        profile = profile.as_str(),
        username = %credentials.username,
        base_url = %cli.base_url,
        "resolved connection settings"
    );

    let ctx = AppContext {
        client: build_http_client(cli.http_timeout, correlation_id)?,
        base_url: cli.base_url,
        credentials,
    };
    let output = cli.output;

    match cli.command {
        Command::Thing(thing) => match thing {
            ThingCommand::List(args) => handle_thing_list(&ctx, args, output).await,
            ThingCommand::Get(args) => handle_thing_get(&ctx, args).await,
            ThingCommand::Create(args) => handle_thing_create(&ctx, args).await,
            ThingCommand::Update(args) => handle_thing_update(&ctx, args).await,
            ThingCommand::Delete(args) => {
                handle_thing_delete(&ctx, args, &mut io::stdin().lock()).await
            }
            ThingCommand::Diff(args) => handle_thing_diff(&ctx, args, output).await,
        },
        Command::Policy(policy) => match policy {
            PolicyCommand::Get(args) => handle_policy_get(&ctx, args).await,
            PolicyCommand::Create(args) => handle_policy_create(&ctx, args, output).await,
            PolicyCommand::Delete(args) => {
                handle_policy_delete(&ctx, args, &mut io::stdin().lock()).await
            }
            PolicyCommand::Entries(args) => handle_policy_entries(&ctx, args).await,
        },
        Command::Connection(connection) => match connection {
            ConnectionCommand::List(args) => handle_connection_list(&ctx, args, output).await,
            ConnectionCommand::Get(args) => handle_connection_get(&ctx, args).await,
            ConnectionCommand::Create(args) => handle_connection_create(&ctx, args).await,
            ConnectionCommand::Delete(args) => {
                handle_connection_delete(&ctx, args, &mut io::stdin().lock()).await
            }
        },
        Command::Search(search) => match search {
            SearchCommand::Query(args) => handle_search_query(&ctx, args, output).await,
            SearchCommand::Count(args) => handle_search_count(&ctx, args, output).await,
        },
        Command::Logging(logging) => match logging {
            LoggingCommand::Get(args) => handle_logging_get(&ctx, args).await,
            LoggingCommand::Update(args) => handle_logging_update(&ctx, args, output).await,
        },
        Command::Config(ConfigCommand::Get(args)) => handle_config_get(&ctx, args).await,
        Command::Permission(PermissionCommand::Check(args)) => {
            handle_permission_check(&ctx, args, output).await
        }
        Command::Devops(DevopsCommand::Whoami) => handle_whoami(&ctx, output).await,
    }
}

#[derive(Parser)]
#[command(
    name = "ditto",
    version,
    about = "Command-line client for the Eclipse Ditto HTTP and DevOps APIs"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "DITTO_BASE_URL",
        value_parser = parse_url,
        default_value = DEFAULT_BASE_URL
    )]
    base_url: Url,
    #[arg(
        long,
        global = true,
        env = "DITTO_USERNAME",
        help = "Basic auth user (defaults to the command group's profile user)"
    )]
    username: Option<String>,
    #[arg(
        long,
        global = true,
        env = "DITTO_PASSWORD",
        hide_env_values = true,
        help = "Basic auth password (defaults to the command group's profile password)"
    )]
    password: Option<String>,
    #[arg(
        long,
        global = true,
        env = "DITTO_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "HTTP client timeout in seconds"
    )]
    http_timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "DITTO_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log filter directive; RUST_LOG takes precedence"
    )]
    log_level: String,
    #[arg(long, global = true, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Manage things (digital twins)
    #[command(subcommand)]
    Thing(ThingCommand),
    /// Manage policies
    #[command(subcommand)]
    Policy(PolicyCommand),
    /// Manage connectivity connections
    #[command(subcommand)]
    Connection(ConnectionCommand),
    /// Search things
    #[command(subcommand)]
    Search(SearchCommand),
    /// Inspect and change service log levels
    #[command(subcommand)]
    Logging(LoggingCommand),
    /// Read service configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Check permissions on resources
    #[command(subcommand)]
    Permission(PermissionCommand),
    /// Identity and administrative helpers
    #[command(subcommand)]
    Devops(DevopsCommand),
}

impl Command {
    /// Credential profile used when no username/password is supplied.
    pub(crate) const fn profile(&self) -> Profile {
        match self {
            Self::Thing(_) | Self::Policy(_) | Self::Search(_) | Self::Devops(_) => Profile::Ditto,
            Self::Connection(_) | Self::Logging(_) | Self::Config(_) | Self::Permission(_) => {
                Profile::Devops
            }
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum ThingCommand {
    /// List things
    List(ThingListArgs),
    /// Get a thing, optionally at a historical revision
    Get(ThingGetArgs),
    /// Create a thing from a JSON file
    Create(ThingCreateArgs),
    /// Merge-patch a thing from a JSON file
    Update(ThingUpdateArgs),
    /// Delete a thing
    Delete(ThingDeleteArgs),
    /// Compare the current thing with a historical revision
    Diff(ThingDiffArgs),
}

#[derive(Args, Default)]
pub(crate) struct ThingListArgs {
    #[arg(
        long,
        short = 'f',
        help = "Comma-separated list of fields to include (e.g. 'thingId,attributes,features')"
    )]
    pub(crate) fields: Option<String>,
    #[arg(long, help = "Comma-separated list of thing IDs to retrieve")]
    pub(crate) ids: Option<String>,
    #[arg(long, help = "Server-side request timeout (e.g. '30s', '1m')")]
    pub(crate) timeout: Option<String>,
}

#[derive(Args)]
pub(crate) struct ThingGetArgs {
    #[arg(help = "The ID of the thing to retrieve")]
    pub(crate) thing_id: String,
    #[arg(long, help = "Historical revision number to retrieve")]
    pub(crate) revision: Option<u64>,
    #[arg(long, short = 'f', help = "Comma-separated list of fields to include")]
    pub(crate) fields: Option<String>,
}

#[derive(Args)]
pub(crate) struct ThingCreateArgs {
    #[arg(help = "The ID of the thing to create")]
    pub(crate) thing_id: String,
    #[arg(help = "Path to a JSON file containing the thing")]
    pub(crate) data_file: PathBuf,
}

#[derive(Args)]
pub(crate) struct ThingUpdateArgs {
    #[arg(help = "The ID of the thing to update")]
    pub(crate) thing_id: String,
    #[arg(help = "Path to a JSON merge patch file")]
    pub(crate) patch_file: PathBuf,
}

#[derive(Args)]
pub(crate) struct ThingDeleteArgs {
    #[arg(help = "The ID of the thing to delete")]
    pub(crate) thing_id: String,
    #[arg(long, help = "Skip confirmation prompt")]
    pub(crate) force: bool,
}

#[derive(Args)]
pub(crate) struct ThingDiffArgs {
    #[arg(help = "The ID of the thing to compare")]
    pub(crate) thing_id: String,
    #[arg(help = "Historical revision number to compare with current")]
    pub(crate) revision: u64,
}

#[derive(Subcommand)]
pub(crate) enum PolicyCommand {
    /// Get a policy
    Get(PolicyGetArgs),
    /// Create a policy from a JSON file
    Create(PolicyCreateArgs),
    /// Delete a policy
    Delete(PolicyDeleteArgs),
    /// List the entries of a policy
    Entries(PolicyEntriesArgs),
}

#[derive(Args)]
pub(crate) struct PolicyGetArgs {
    #[arg(help = "The ID of the policy to retrieve")]
    pub(crate) policy_id: String,
}

#[derive(Args)]
pub(crate) struct PolicyCreateArgs {
    #[arg(help = "The ID of the policy to create")]
    pub(crate) policy_id: String,
    #[arg(help = "Path to a JSON file containing the policy definition")]
    pub(crate) policy_file: PathBuf,
}

#[derive(Args)]
pub(crate) struct PolicyDeleteArgs {
    #[arg(help = "The ID of the policy to delete")]
    pub(crate) policy_id: String,
    #[arg(long, help = "Skip confirmation prompt")]
    pub(crate) confirm: bool,
}

#[derive(Args)]
pub(crate) struct PolicyEntriesArgs {
    #[arg(help = "The ID of the policy")]
    pub(crate) policy_id: String,
    #[arg(long, help = "Only show entries granting to this subject ID")]
    pub(crate) subject_id: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum ConnectionCommand {
    /// List connections
    List(ConnectionListArgs),
    /// Get a connection
    Get(ConnectionGetArgs),
    /// Create a connection
    Create(ConnectionCreateArgs),
    /// Delete a connection
    Delete(ConnectionDeleteArgs),
}

#[derive(Args, Default)]
pub(crate) struct ConnectionListArgs {
    #[arg(
        long,
        short = 'f',
        help = "Comma-separated list of fields to include (e.g. 'id,connectionStatus,uri')"
    )]
    pub(crate) fields: Option<String>,
}

#[derive(Args)]
pub(crate) struct ConnectionGetArgs {
    #[arg(help = "The ID of the connection to retrieve")]
    pub(crate) connection_id: String,
    #[arg(long, short = 'f', help = "Comma-separated list of fields to include")]
    pub(crate) fields: Option<String>,
}

#[derive(Args)]
pub(crate) struct ConnectionCreateArgs {
    #[arg(help = "The ID of the connection to create")]
    pub(crate) connection_id: String,
    #[arg(
        long,
        short = 'd',
        conflicts_with = "file",
        required_unless_present = "file",
        help = "Inline JSON connection definition"
    )]
    pub(crate) definition: Option<String>,
    #[arg(long, help = "Path to a JSON file containing the connection definition")]
    pub(crate) file: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct ConnectionDeleteArgs {
    #[arg(help = "The ID of the connection to delete")]
    pub(crate) connection_id: String,
    #[arg(long, help = "Skip confirmation prompt")]
    pub(crate) confirm: bool,
}

#[derive(Subcommand)]
pub(crate) enum SearchCommand {
    /// Search for things
    Query(SearchQueryArgs),
    /// Count things matching a filter
    Count(SearchCountArgs),
}

#[derive(Args, Default)]
pub(crate) struct SearchQueryArgs {
    #[arg(
        long,
        short = 'f',
        help = "RQL filter expression (e.g. 'eq(attributes/location,\"kitchen\")')"
    )]
    pub(crate) filter: Option<String>,
    #[arg(long, help = "Comma-separated list of fields to include")]
    pub(crate) fields: Option<String>,
    #[arg(long, short = 'n', help = "Comma-separated list of namespaces to search")]
    pub(crate) namespaces: Option<String>,
    #[arg(long, short = 'o', help = "Search options (e.g. 'size(10),sort(+thingId)')")]
    pub(crate) option: Option<String>,
    #[arg(long, short = 't', help = "Server-side request timeout (e.g. '30s', '1m')")]
    pub(crate) timeout: Option<String>,
}

#[derive(Args, Default)]
pub(crate) struct SearchCountArgs {
    #[arg(
        long,
        short = 'f',
        help = "RQL filter expression (e.g. 'eq(attributes/location,\"kitchen\")')"
    )]
    pub(crate) filter: Option<String>,
    #[arg(long, short = 'n', help = "Comma-separated list of namespaces to search")]
    pub(crate) namespaces: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum LoggingCommand {
    /// Get logging configuration
    Get(LoggingGetArgs),
    /// Update log levels from a JSON file
    Update(LoggingUpdateArgs),
}

#[derive(Args, Default)]
pub(crate) struct LoggingGetArgs {
    #[arg(long, help = "Include disabled loggers")]
    pub(crate) include_disabled: bool,
    #[arg(long = "module", short = 'm', help = "Module name to get logging config for")]
    pub(crate) module_name: Option<String>,
}

#[derive(Args)]
pub(crate) struct LoggingUpdateArgs {
    #[arg(help = "Path to a JSON file containing logging updates")]
    pub(crate) update_file: PathBuf,
    #[arg(long = "module", short = 'm', help = "Only update this module")]
    pub(crate) module_name: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Get configuration from Ditto services
    Get(ConfigGetArgs),
}

#[derive(Args, Default)]
pub(crate) struct ConfigGetArgs {
    #[arg(long, help = "Module name to retrieve config for")]
    pub(crate) module_name: Option<String>,
    #[arg(long, requires = "module_name", help = "Pod name (requires --module-name)")]
    pub(crate) pod_name: Option<String>,
    #[arg(long, help = "Config path to narrow the result (e.g. 'ditto.cluster')")]
    pub(crate) path: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum PermissionCommand {
    /// Check permissions on specified resources
    Check(PermissionCheckArgs),
}

#[derive(Args)]
pub(crate) struct PermissionCheckArgs {
    #[arg(help = "Path to a JSON file containing the permission check request")]
    pub(crate) request_file: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum DevopsCommand {
    /// Show the subjects the current credentials authenticate as
    Whoami,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Thing(ThingCommand::List(_)) => "thing_list",
        Command::Thing(ThingCommand::Get(_)) => "thing_get",
        Command::Thing(ThingCommand::Create(_)) => "thing_create",
        Command::Thing(ThingCommand::Update(_)) => "thing_update",
        Command::Thing(ThingCommand::Delete(_)) => "thing_delete",
        Command::Thing(ThingCommand::Diff(_)) => "thing_diff",
        Command::Policy(PolicyCommand::Get(_)) => "policy_get",
        Command::Policy(PolicyCommand::Create(_)) => "policy_create",
        Command::Policy(PolicyCommand::Delete(_)) => "policy_delete",
        Command::Policy(PolicyCommand::Entries(_)) => "policy_entries",
        Command::Connection(ConnectionCommand::List(_)) => "connection_list",
        Command::Connection(ConnectionCommand::Get(_)) => "connection_get",
        Command::Connection(ConnectionCommand::Create(_)) => "connection_create",
        Command::Connection(ConnectionCommand::Delete(_)) => "connection_delete",
        Command::Search(SearchCommand::Query(_)) => "search_query",
        Command::Search(SearchCommand::Count(_)) => "search_count",
        Command::Logging(LoggingCommand::Get(_)) => "logging_get",
        Command::Logging(LoggingCommand::Update(_)) => "logging_update",
        Command::Config(ConfigCommand::Get(_)) => "config_get",
        Command::Permission(PermissionCommand::Check(_)) => "permission_check",
        Command::Devops(DevopsCommand::Whoami) => "devops_whoami",
    }
}
