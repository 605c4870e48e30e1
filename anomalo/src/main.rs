//! Anomalo CLI: ping the API and look up tables, checks, channels, and organizations.

mod output;

use anomalo_lib::credentials::DEFAULT_SECRETS_FILE;
use anomalo_lib::models::{DeleteCheckRequest, RunChecksRequest};
use anomalo_lib::{get_credentials_from, Client};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anomalo")]
#[command(about = "Anomalo CLI - ping the API, look up tables, checks, channels, and organizations", long_about = None)]
struct Cli {
    /// Output format: plain (human-readable), json (structured).
    #[arg(short, long, default_value = "plain", value_enum)]
    output: OutputFormatArg,

    /// Credentials file ({"Host": ..., "Token": ...}); falls back to
    /// ANOMALO_INSTANCE_HOST / ANOMALO_API_SECRET_TOKEN.
    #[arg(long, env = "ANOMALO_SECRETS_FILE", default_value = DEFAULT_SECRETS_FILE)]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity and credentials
    Ping,
    /// Show a table's information and monitoring configuration
    Table {
        /// Full table name (warehouse prefix included unless --warehouse-id is given)
        name: String,
        #[arg(long)]
        warehouse_id: Option<i64>,
    },
    /// List checks on a table
    Checks { table_id: i64 },
    /// Find one check on a table by ref or static ID
    #[command(group(ArgGroup::new("key").required(true).args(["check_ref", "static_id"])))]
    Check {
        table_id: i64,
        #[arg(long = "ref")]
        check_ref: Option<String>,
        #[arg(long)]
        static_id: Option<i64>,
    },
    /// Run checks on a table (all of them unless --check-id is given)
    RunChecks {
        table_id: i64,
        #[arg(long = "check-id")]
        check_ids: Vec<i64>,
    },
    /// Delete a check from a table
    DeleteCheck { table_id: i64, check_id: i64 },
    /// List notification channels
    Channels,
    /// Find a notification channel by type and description substring
    Channel {
        #[arg(value_parser = anomalo_lib::VALID_NOTIFICATION_CHANNELS)]
        channel_type: String,
        contains: String,
    },
    /// List organizations accessible with the API key
    Orgs,
    /// Find an organization by exact name
    Org { name: String },
    /// Switch the organization the API key acts within
    SwitchOrg { org_id: i64 },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("anomalo {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let (creds, source) = match get_credentials_from(&cli.credentials) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let client = Client::from_credentials(creds);
    tracing::debug!(?source, host = client.host(), "resolved anomalo credentials");
    let format = match cli.output {
        OutputFormatArg::Plain => output::OutputFormat::Plain,
        OutputFormatArg::Json => output::OutputFormat::Json,
    };

    match run(&client, cli.command, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn render<T: Serialize>(value: &T, format: output::OutputFormat) -> Result<String, String> {
    let value =
        serde_json::to_value(value).map_err(|e| format!("could not render output: {}", e))?;
    match format {
        output::OutputFormat::Plain => Ok(output::format_plain(&value)),
        output::OutputFormat::Json => output::format_json(&value)
            .map(|s| s + "\n")
            .map_err(|e| format!("could not render output: {}", e)),
    }
}

fn print_value<T: Serialize>(value: &T, format: output::OutputFormat) -> CliResult {
    print!("{}", render(value, format)?);
    Ok(())
}

async fn run(client: &Client, cmd: Commands, format: output::OutputFormat) -> CliResult {
    match cmd {
        Commands::Ping => print_value(&client.ping().await?, format),
        Commands::Table { name, warehouse_id } => {
            let table = match warehouse_id {
                Some(id) => {
                    client
                        .get_table_information_with_warehouse_id(&name, id)
                        .await?
                }
                None => client.get_table_information(&name).await?,
            };
            print_value(&table, format)
        }
        Commands::Checks { table_id } => {
            print_value(&client.get_checks(table_id).await?.checks, format)
        }
        Commands::Check {
            table_id,
            check_ref,
            static_id,
        } => {
            let check = match (check_ref, static_id) {
                (Some(r), _) => client.get_check_by_ref(table_id, &r).await?,
                (None, Some(id)) => client.get_check_by_static_id(table_id, id).await?,
                (None, None) => None,
            };
            print_value(&check, format)
        }
        Commands::RunChecks {
            table_id,
            check_ids,
        } => {
            let req = RunChecksRequest {
                table_id,
                interval_id: None,
                check_ids: (!check_ids.is_empty()).then_some(check_ids),
            };
            print_value(&client.run_checks(&req).await?, format)
        }
        Commands::DeleteCheck { table_id, check_id } => {
            let req = DeleteCheckRequest { table_id, check_id };
            print_value(&client.delete_check(&req).await?, format)
        }
        Commands::Channels => print_value(
            &client.get_notification_channels().await?.notification_channels,
            format,
        ),
        Commands::Channel {
            channel_type,
            contains,
        } => {
            let channel = client
                .get_notification_channel_with_description_containing(&contains, &channel_type)
                .await?;
            print_value(&channel, format)
        }
        Commands::Orgs => print_value(&client.get_organizations().await?, format),
        Commands::Org { name } => {
            print_value(&client.get_organization_by_name(&name).await?, format)
        }
        Commands::SwitchOrg { org_id } => {
            print_value(&client.change_organization(org_id).await?, format)
        }
        Commands::Version => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_requires_a_key() {
        assert!(Cli::try_parse_from(["anomalo", "check", "7"]).is_err());
        let cli = Cli::try_parse_from(["anomalo", "check", "7", "--ref", "row_count"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Check { table_id: 7, check_ref: Some(_), static_id: None }
        ));
    }

    #[test]
    fn render_absent_lookup() {
        let none: Option<anomalo_lib::models::Check> = None;
        assert_eq!(render(&none, output::OutputFormat::Json).unwrap(), "null\n");
        assert!(render(&none, output::OutputFormat::Plain)
            .unwrap()
            .contains("not found"));
    }

    #[test]
    fn render_failure_is_not_a_decode_error() {
        use std::collections::HashMap;
        // Non-string map keys cannot become JSON objects.
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        let err = render(&bad, output::OutputFormat::Json).unwrap_err();
        assert!(err.starts_with("could not render output"));
        assert!(!err.contains("decode"));
    }

    #[test]
    fn channel_type_is_restricted() {
        assert!(Cli::try_parse_from(["anomalo", "channel", "fax", "oncall"]).is_err());
        assert!(Cli::try_parse_from(["anomalo", "channel", "slack", "oncall"]).is_ok());
    }
}
