use std::{error::Error, io::Write, sync::Arc};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use ledger::{
    AutoAccept, ConfirmationRequest, Confirmations, DecisionSender, HoldingRef, LedgerStore,
    NullNavigator, Portfolio, ResultLedger, TransactionDraft, numeric_field,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "folio_admin")]
#[command(about = "Admin utilities for Folio (inspect and edit the ledger)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./folio.db?mode=rwc"
    )]
    database_url: String,

    /// Log level for the `ledger` and `folio_admin` targets.
    #[arg(long, default_value = "warn")]
    level: String,

    /// Answer every confirmation prompt with yes.
    #[arg(long)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Holding(Holding),
    Tx(Tx),
    Transfer(Transfer),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List(AccountListArgs),
    Remove(AccountRemoveArgs),
    Summary(AccountSummaryArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct AccountListArgs {
    #[arg(long)]
    owner: String,
}

#[derive(Args, Debug)]
struct AccountRemoveArgs {
    #[arg(long)]
    account: Uuid,
}

#[derive(Args, Debug)]
struct AccountSummaryArgs {
    #[arg(long)]
    account: Uuid,
}

#[derive(Args, Debug)]
struct Holding {
    #[command(subcommand)]
    command: HoldingCommand,
}

#[derive(Subcommand, Debug)]
enum HoldingCommand {
    Create(HoldingCreateArgs),
    Edit(HoldingEditArgs),
    List(HoldingListArgs),
    Remove(HoldingRemoveArgs),
}

#[derive(Args, Debug)]
struct HoldingCreateArgs {
    #[arg(long)]
    account: Uuid,
    #[arg(long)]
    name: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct HoldingEditArgs {
    #[arg(long, conflicts_with = "name")]
    holding: Option<Uuid>,
    /// Exact name within `--account`; an ambiguous name is an error.
    #[arg(long, requires = "account")]
    name: Option<String>,
    #[arg(long)]
    account: Option<Uuid>,
    /// New name; the current one stays when omitted.
    #[arg(long)]
    rename: Option<String>,
    /// New notes; an empty string clears them.
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct HoldingListArgs {
    #[arg(long)]
    account: Uuid,
}

#[derive(Args, Debug)]
struct HoldingRemoveArgs {
    #[arg(long, conflicts_with = "name")]
    holding: Option<Uuid>,
    /// Exact name within `--account`; an ambiguous name is an error.
    #[arg(long, requires = "account")]
    name: Option<String>,
    #[arg(long)]
    account: Option<Uuid>,
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Add(TxAddArgs),
    Remove(TxRemoveArgs),
}

#[derive(Args, Debug)]
struct TxAddArgs {
    #[arg(long)]
    account: Uuid,
    /// Holding name; resolved at commit time, created when absent.
    #[arg(long, conflicts_with = "holding")]
    holding_name: Option<String>,
    #[arg(long)]
    holding: Option<Uuid>,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long)]
    date: Option<String>,
    /// Empty means unset, not zero.
    #[arg(long, default_value = "")]
    price: String,
    #[arg(long, default_value = "")]
    amount: String,
    #[arg(long, default_value = "")]
    total: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct TxRemoveArgs {
    #[arg(long)]
    tx: Uuid,
}

#[derive(Args, Debug)]
struct Transfer {
    #[command(subcommand)]
    command: TransferCommand,
}

#[derive(Subcommand, Debug)]
enum TransferCommand {
    Add(TransferAddArgs),
    Remove(TransferRemoveArgs),
}

#[derive(Args, Debug)]
struct TransferAddArgs {
    #[arg(long)]
    holding: Uuid,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long)]
    date: Option<String>,
    #[arg(long, default_value = "")]
    amount: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct TransferRemoveArgs {
    #[arg(long)]
    transfer: Uuid,
}

/// Prompts on stderr and reads one line from stdin. Anything but an
/// explicit yes declines, which leaves the gated operation pending; `main`
/// races it against the decline signal and exits.
struct TerminalConfirmations {
    declined: Arc<Notify>,
}

impl Confirmations for TerminalConfirmations {
    fn present(&self, request: ConfirmationRequest, decision: DecisionSender) {
        eprintln!("{}", request.title);
        eprint!("{} [y/N] ", request.message);
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            self.declined.notify_one();
            return;
        }
        match line.trim() {
            "y" | "Y" | "yes" => decision.accept(),
            _ => {
                decision.dismiss();
                self.declined.notify_one();
            }
        }
    }
}

/// Run a gated operation to completion, or exit once it is declined.
async fn gated<T>(
    declined: &Notify,
    action: impl Future<Output = ResultLedger<T>>,
) -> Result<T, Box<dyn Error + Send + Sync>> {
    tokio::select! {
        result = action => Ok(result?),
        () = declined.notified() => {
            eprintln!("aborted");
            std::process::exit(1);
        }
    }
}

/// Turn `--holding`, or `--name` within `--account`, into a holding id.
/// An ambiguous name is an error rather than a guess.
async fn resolve_holding_arg(
    portfolio: &Portfolio,
    holding: Option<Uuid>,
    name: Option<String>,
    account: Option<Uuid>,
) -> Result<Uuid, Box<dyn Error + Send + Sync>> {
    match (holding, name) {
        (Some(id), _) => Ok(id),
        (None, Some(name)) => {
            let account_id = account.ok_or("--name requires --account")?;
            let account = portfolio.store().account(account_id).await?;
            Ok(account
                .unique_holding_by_name(&name)?
                .ok_or_else(|| format!("no holding named {name:?}"))?
                .id)
        }
        (None, None) => Err("pass --holding or --name".into()),
    }
}

fn parse_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, Box<dyn Error + Send + Sync>> {
    match raw {
        None => Ok(None),
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .map_err(|err| format!("invalid --date {raw:?}: {err}"))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger={level},folio_admin={level}",
            level = cli.level
        ))
        .init();

    let db = connect_db(&cli.database_url).await?;
    let store = Arc::new(LedgerStore::builder().database(db).build().await?);

    let declined = Arc::new(Notify::new());
    let confirmations: Arc<dyn Confirmations> = if cli.yes {
        Arc::new(AutoAccept)
    } else {
        Arc::new(TerminalConfirmations {
            declined: declined.clone(),
        })
    };
    let portfolio = Portfolio::new(store, confirmations, Arc::new(NullNavigator));

    match cli.command {
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let account = gated(
                &declined,
                portfolio.add_account(&args.owner, &args.name, args.notes),
            )
            .await?;
            println!("created account: {} ({})", account.name, account.id);
        }
        Command::Account(Account {
            command: AccountCommand::List(args),
        }) => {
            for account in portfolio.store().accounts_for(&args.owner).await {
                println!("{}  {}", account.id, account.name);
            }
        }
        Command::Account(Account {
            command: AccountCommand::Remove(args),
        }) => {
            gated(&declined, portfolio.remove_account(args.account)).await?;
            println!("removed account: {}", args.account);
        }
        Command::Account(Account {
            command: AccountCommand::Summary(args),
        }) => {
            let account = portfolio.store().account(args.account).await?;
            let rollup = portfolio.store().account_metrics(args.account).await?;
            println!("{} ({})", account.name, account.id);
            println!("  balance: {:.2}", rollup.balance);
            println!("  value:   {:.2}", rollup.value);
            for holding in &account.holdings {
                let metrics = portfolio.store().holding_metrics(holding.id).await?;
                println!("  {} ({})", holding.name, holding.id);
                println!("    amount:        {:.4}", metrics.amount);
                println!("    average price: {:.4}", metrics.average_price);
                println!("    last price:    {:.4}", metrics.last_price);
                println!("    value:         {:.2}", metrics.value);
                println!(
                    "    return:        {:.2} ({:.2}%)",
                    metrics.return_value, metrics.return_percentage
                );
            }
        }
        Command::Holding(Holding {
            command: HoldingCommand::Create(args),
        }) => {
            let holding = gated(
                &declined,
                portfolio.add_holding(args.account, &args.name, args.notes),
            )
            .await?;
            println!("created holding: {} ({})", holding.name, holding.id);
        }
        Command::Holding(Holding {
            command: HoldingCommand::Edit(args),
        }) => {
            let id = resolve_holding_arg(&portfolio, args.holding, args.name, args.account).await?;
            let current = portfolio.store().holding(id).await?;
            let name = args.rename.unwrap_or(current.name);
            let notes = args.notes.or(current.notes);
            let holding = gated(&declined, portfolio.save_holding(id, &name, notes)).await?;
            println!("saved holding: {} ({})", holding.name, holding.id);
        }
        Command::Holding(Holding {
            command: HoldingCommand::List(args),
        }) => {
            let account = portfolio.store().account(args.account).await?;
            for holding in &account.holdings {
                let metrics = portfolio.store().holding_metrics(holding.id).await?;
                println!(
                    "{}  {}  amount {:.4}  value {:.2}",
                    holding.id, holding.name, metrics.amount, metrics.value
                );
            }
        }
        Command::Holding(Holding {
            command: HoldingCommand::Remove(args),
        }) => {
            let id = resolve_holding_arg(&portfolio, args.holding, args.name, args.account).await?;
            gated(&declined, portfolio.remove_holding(id)).await?;
            println!("removed holding: {id}");
        }
        Command::Tx(Tx {
            command: TxCommand::Add(args),
        }) => {
            let draft = TransactionDraft {
                date: parse_date(args.date.as_deref())?,
                holding: match (args.holding, args.holding_name) {
                    (Some(id), _) => HoldingRef::Id(id),
                    (None, Some(name)) => HoldingRef::Name(name),
                    (None, None) => return Err("pass --holding or --holding-name".into()),
                },
                price: numeric_field(&args.price)?,
                amount: numeric_field(&args.amount)?,
                total: numeric_field(&args.total)?,
                notes: args.notes,
            };
            let tx = gated(&declined, portfolio.add_transaction(args.account, draft)).await?;
            println!("created transaction: {} on holding {}", tx.id, tx.holding_id);
        }
        Command::Tx(Tx {
            command: TxCommand::Remove(args),
        }) => {
            gated(&declined, portfolio.remove_transaction(args.tx)).await?;
            println!("removed transaction: {}", args.tx);
        }
        Command::Transfer(Transfer {
            command: TransferCommand::Add(args),
        }) => {
            let transfer = gated(
                &declined,
                portfolio.add_transfer(
                    args.holding,
                    parse_date(args.date.as_deref())?,
                    numeric_field(&args.amount)?,
                    args.notes,
                ),
            )
            .await?;
            println!("created transfer: {} on holding {}", transfer.id, transfer.holding_id);
        }
        Command::Transfer(Transfer {
            command: TransferCommand::Remove(args),
        }) => {
            gated(&declined, portfolio.remove_transfer(args.transfer)).await?;
            println!("removed transfer: {}", args.transfer);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn holding_edit_parses_selector_and_new_fields() {
        let cli = Cli::try_parse_from([
            "folio_admin",
            "holding",
            "edit",
            "--name",
            "VWCE",
            "--account",
            "1f0e2f66-48c9-4c3e-9d44-1d6e9b6f0c11",
            "--rename",
            "VWCE Dist",
        ])
        .unwrap();

        let Command::Holding(Holding {
            command: HoldingCommand::Edit(args),
        }) = cli.command
        else {
            panic!("expected the holding edit subcommand");
        };
        assert_eq!(args.name.as_deref(), Some("VWCE"));
        assert_eq!(args.rename.as_deref(), Some("VWCE Dist"));
        assert!(args.holding.is_none());
        assert!(args.notes.is_none());
    }

    #[test]
    fn holding_names_need_an_account_to_resolve_in() {
        assert!(Cli::try_parse_from(["folio_admin", "holding", "edit", "--name", "VWCE"]).is_err());
    }
}
