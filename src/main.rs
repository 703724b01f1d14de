use std::{process, sync::Arc};

use itembank::{
    application::{
        bank::{BankConfig, ItemBank, PageView, ReconcileMode},
        error::{AppError, ErrorReport},
        notice::Notice,
        repos::ItemsApi,
    },
    config::{self, Command, DemoArgs, ListArgs, MutateArgs, PurgeArgs, Settings},
    domain::{
        items::{ItemIds, statement_text},
        types::Scope,
    },
    infra::{
        error::InfraError,
        http_api::HttpItemsApi,
        memory::{InMemoryItemsApi, sample_items},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const PREVIEW_CHARS: usize = 60;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        report_application_error(&err);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("itembank", error);
    if dispatcher::has_been_set() {
        error!(source = report.source, messages = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, messages = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    let command = cli_args
        .command
        .unwrap_or(Command::List(ListArgs::default()));

    match command {
        Command::List(args) => run_list(&settings, args).await,
        Command::Delete(args) => run_delete(&settings, args).await,
        Command::Restore(args) => run_restore(&settings, args).await,
        Command::Purge(args) => run_purge(&settings, args).await,
        Command::Demo(args) => run_demo(&settings, args).await,
    }
}

fn scope_of(settings: &Settings) -> Scope {
    Scope::from_organization(settings.api.organization_id)
}

/// One-shot commands wait for reconciliation so the printed state is final.
fn cli_bank(api: Arc<dyn ItemsApi>, settings: &Settings) -> ItemBank {
    let config = BankConfig {
        reconcile: ReconcileMode::Inline,
        ..BankConfig::from(settings)
    };
    ItemBank::new(api, scope_of(settings), config)
}

fn http_bank(settings: &Settings) -> Result<ItemBank, AppError> {
    let api = HttpItemsApi::new(&settings.api)?;
    info!(base_url = %api.base_url(), scope = %scope_of(settings), "Using HTTP item bank");
    Ok(cli_bank(Arc::new(api), settings))
}

async fn run_list(settings: &Settings, args: ListArgs) -> Result<(), AppError> {
    let mut bank = http_bank(settings)?;
    bank.set_show_deleted(args.trash);
    bank.set_type_filter(args.item_type);
    bank.set_status_filter(args.status);
    if let Some(search) = args.search {
        bank.set_search_input(search);
        bank.settle_search();
    }

    let mut view = bank.load().await?;
    if args.page > 0 {
        bank.go_to_page(args.page);
        view = bank.load().await?;
    }

    let title = if args.trash { "Trash" } else { "Items" };
    print_page(title, &view);
    Ok(())
}

async fn run_delete(settings: &Settings, args: MutateArgs) -> Result<(), AppError> {
    let mut bank = http_bank(settings)?;
    select_ids(&mut bank, args)?;
    let result = bank.delete_selected().await;
    print_notices(bank.take_notices());
    result.map(|_| ())
}

async fn run_restore(settings: &Settings, args: MutateArgs) -> Result<(), AppError> {
    let mut bank = http_bank(settings)?;
    bank.set_show_deleted(true);
    select_ids(&mut bank, args)?;
    let result = bank.restore_selected().await;
    print_notices(bank.take_notices());
    result.map(|_| ())
}

async fn run_purge(settings: &Settings, args: PurgeArgs) -> Result<(), AppError> {
    let mut bank = http_bank(settings)?;
    bank.set_show_deleted(true);
    select_ids(&mut bank, args.target)?;
    let result = bank.confirm_permanent_delete(&args.confirm).await;
    print_notices(bank.take_notices());
    result.map(|_| ())
}

fn select_ids(bank: &mut ItemBank, args: MutateArgs) -> Result<(), AppError> {
    let ids = ItemIds::new(args.ids)?;
    for id in ids.as_slice() {
        bank.toggle_select(*id);
    }
    Ok(())
}

async fn run_demo(settings: &Settings, args: DemoArgs) -> Result<(), AppError> {
    let backend = Arc::new(InMemoryItemsApi::with_items(sample_items(
        scope_of(settings),
        args.items,
    )));
    let mut bank = cli_bank(Arc::clone(&backend) as Arc<dyn ItemsApi>, settings);

    let view = bank.load().await?;
    print_page("Items", &view);

    for item in view.items.iter().take(2) {
        bank.toggle_select(item.id);
    }
    bank.delete_selected().await?;
    print_notices(bank.take_notices());
    print_page("Items after delete", &bank.load().await?);

    bank.set_show_deleted(true);
    print_page("Trash", &bank.load().await?);

    bank.undo_last_delete().await?;
    print_notices(bank.take_notices());
    print_page("Trash after undo", &bank.load().await?);

    bank.set_show_deleted(false);
    print_page("Items after undo", &bank.load().await?);

    info!(server_items = backend.len(), "Demo finished");
    Ok(())
}

fn print_page(title: &str, view: &PageView) {
    println!(
        "{title}: page {}/{} ({} total)",
        view.current_page + 1,
        view.total_pages.max(1),
        view.total
    );
    for item in &view.items {
        let preview: String = statement_text(&item.statement)
            .chars()
            .take(PREVIEW_CHARS)
            .collect();
        println!(
            "  {}  {:<18} {:<9} {}",
            item.id,
            item.item_type.label(),
            item.status.as_str(),
            preview
        );
    }
    if view.items.is_empty() {
        println!("  (no items)");
    }
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        let undo = if notice.undo_ids.is_some() {
            " (undo available)"
        } else {
            ""
        };
        println!("[{}] {}{undo}", notice.kind.as_str(), notice.text);
    }
}
