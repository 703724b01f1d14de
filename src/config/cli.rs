use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

use crate::domain::types::{ItemStatus, ItemType};

/// Command-line arguments for the item bank client.
#[derive(Debug, Parser)]
#[command(name = "itembank", version, about = "Item bank dashboard client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "ITEMBANK_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List one page of the item bank.
    List(ListArgs),
    /// Move items to the trash.
    Delete(MutateArgs),
    /// Restore items from the trash.
    Restore(MutateArgs),
    /// Permanently delete trashed items.
    Purge(PurgeArgs),
    /// Run a scripted session against an in-memory backend.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the API base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Override the API request timeout in milliseconds.
    #[arg(long = "api-timeout-ms", value_name = "MS", global = true)]
    pub api_timeout_ms: Option<u64>,

    /// Scope requests to an organization.
    #[arg(long = "organization", value_name = "UUID", global = true)]
    pub organization: Option<Uuid>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// List trashed items instead of active ones.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub trash: bool,

    /// Only list items of this type.
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_item_type)]
    pub item_type: Option<ItemType>,

    /// Only list items with this status; ignored with --trash.
    #[arg(long, value_name = "STATUS", value_parser = parse_item_status)]
    pub status: Option<ItemStatus>,

    /// Case-insensitive search over item ids and statement text.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Zero-based page index.
    #[arg(long, default_value_t = 0)]
    pub page: u32,

    /// Items per page.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct MutateArgs {
    /// Identifiers of the items to change.
    #[arg(value_name = "ID", required = true, num_args = 1..)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub target: MutateArgs,

    /// Confirmation word; must be exactly DELETE.
    #[arg(long, value_name = "WORD", default_value = "")]
    pub confirm: String,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of items to seed.
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
    pub items: u32,
}

fn parse_item_type(value: &str) -> Result<ItemType, String> {
    ItemType::try_from(value).map_err(|()| {
        let known: Vec<&str> = ItemType::ALL.iter().map(|kind| kind.as_str()).collect();
        format!("unknown item type `{value}`; expected one of {}", known.join(", "))
    })
}

fn parse_item_status(value: &str) -> Result<ItemStatus, String> {
    ItemStatus::try_from(value).map_err(|()| {
        format!("unknown status `{value}`; expected draft, published or archived")
    })
}
