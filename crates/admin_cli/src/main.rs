use std::{error::Error, io::Write, time::Duration};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, FeeRate, Money, NewAccount, NewPaymentMethod};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use server::AuthKeys;

#[derive(Parser, Debug)]
#[command(name = "wallet_admin")]
#[command(about = "Admin utilities for the wallet (bootstrap accounts/payment methods)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./wallet.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    PaymentMethod(PaymentMethod),
    Token(Token),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Open an account. The PIN is prompted for.
    Create(AccountCreateArgs),
    Show(AccountShowArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    /// Opening balance, e.g. `100.00`.
    #[arg(long, default_value = "0")]
    balance: Money,
}

#[derive(Args, Debug)]
struct AccountShowArgs {
    #[arg(long)]
    phone: String,
}

#[derive(Args, Debug)]
struct PaymentMethod {
    #[command(subcommand)]
    command: PaymentMethodCommand,
}

#[derive(Subcommand, Debug)]
enum PaymentMethodCommand {
    Create(PaymentMethodCreateArgs),
    Disable(PaymentMethodDisableArgs),
    List,
}

#[derive(Args, Debug)]
struct PaymentMethodCreateArgs {
    #[arg(long)]
    name: String,
    /// Smallest accepted top-up, e.g. `5.00`.
    #[arg(long)]
    min: Money,
    /// Largest accepted top-up.
    #[arg(long)]
    max: Money,
    /// Fee in percent, e.g. `2.5`.
    #[arg(long, default_value = "0")]
    fee: FeeRate,
}

#[derive(Args, Debug)]
struct PaymentMethodDisableArgs {
    #[arg(long)]
    id: i64,
}

#[derive(Args, Debug)]
struct Token {
    #[command(subcommand)]
    command: TokenCommand,
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a bearer token for the HTTP API.
    Issue(TokenIssueArgs),
}

#[derive(Args, Debug)]
struct TokenIssueArgs {
    #[arg(long)]
    account_id: i64,
    /// Signing secret, the same one the server is configured with.
    #[arg(long, env = "WALLET__AUTH__SECRET", hide_env_values = true)]
    secret: String,
    #[arg(long, default_value_t = 3600)]
    ttl_secs: u64,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_pin(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn say(out: &mut std::io::Stderr, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )?;
    Ok(())
}

fn prompt_pin_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_pin("PIN (6 digits): ")?;
        if p1.len() != 6 {
            say(&mut out, "PIN must be exactly 6 digits.")?;
            continue;
        }

        let p2 = prompt_pin("Confirm PIN: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        say(&mut out, "PINs do not match. Try again.")?;
    }

    Err("too many attempts".into())
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

    if let Command::Token(Token {
        command: TokenCommand::Issue(args),
    }) = &cli.command
    {
        let keys = AuthKeys::new(&args.secret, Duration::from_secs(args.ttl_secs))?;
        println!("{}", keys.issue(args.account_id)?);
        return Ok(());
    }

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let pin = prompt_pin_twice()?;
            let mut cmd =
                NewAccount::new(args.full_name, args.phone, pin).opening_balance(args.balance);
            if let Some(email) = args.email {
                cmd = cmd.email(email);
            }

            match engine.open_account(cmd).await {
                Ok(account) => println!(
                    "created account: {} ({}) balance {}",
                    account.phone, account.id, account.balance
                ),
                Err(EngineError::ExistingKey(phone)) => {
                    eprintln!("account already exists: {phone}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Account(Account {
            command: AccountCommand::Show(args),
        }) => match engine.account_by_phone(&args.phone).await {
            Ok(account) => {
                println!("id:      {}", account.id);
                println!("name:    {}", account.full_name);
                println!("phone:   {}", account.phone);
                if let Some(email) = account.email {
                    println!("email:   {email}");
                }
                println!("balance: {}", account.balance);
            }
            Err(EngineError::AccountNotFound(_)) => {
                eprintln!("account not found: {}", args.phone);
                std::process::exit(1);
            }
            Err(err) => return Err(err.into()),
        },
        Command::PaymentMethod(PaymentMethod {
            command: PaymentMethodCommand::Create(args),
        }) => {
            let method = engine
                .new_payment_method(NewPaymentMethod::new(
                    args.name, args.min, args.max, args.fee,
                ))
                .await?;
            println!(
                "created payment method: {} ({}) range {}..={} fee {}",
                method.name, method.id, method.min_amount, method.max_amount, method.fee_rate
            );
        }
        Command::PaymentMethod(PaymentMethod {
            command: PaymentMethodCommand::Disable(args),
        }) => match engine.set_payment_method_active(args.id, false).await {
            Ok(method) => println!("disabled payment method: {} ({})", method.name, method.id),
            Err(EngineError::UnknownPaymentMethod(_)) => {
                eprintln!("payment method not found: {}", args.id);
                std::process::exit(1);
            }
            Err(err) => return Err(err.into()),
        },
        Command::PaymentMethod(PaymentMethod {
            command: PaymentMethodCommand::List,
        }) => {
            for method in engine.payment_methods().await? {
                let state = if method.is_active { "active" } else { "disabled" };
                println!(
                    "{:>4}  {:<20} {}..={}  fee {}  {state}",
                    method.id, method.name, method.min_amount, method.max_amount, method.fee_rate
                );
            }
        }
        Command::Token(_) => {}
    }

    Ok(())
}
