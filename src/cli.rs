//! Line-oriented command front end over [`CardLedger`].
//!
//! Each invocation runs one command from the process arguments. With
//! `CARDLEDGER_CLI_SCRIPT` set, commands are read line by line from stdin.

use std::{
    env,
    io::{self, BufRead, Write},
    str::FromStr,
};

use cardledger_config::ConfigManager;
use cardledger_core::{
    storage::{BankAccountStore, CardStore, InvoiceChargeStore},
    CoreError,
};
use cardledger_domain::{
    BankAccount, BankAccountKind, BillingCycle, Card, LineItemUpdate, NewCard, NewCardPurchase,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shell_words::split;
use thiserror::Error;
use uuid::Uuid;

use crate::{build_info, AppError, CardLedger};

pub const SCRIPT_ENV: &str = "CARDLEDGER_CLI_SCRIPT";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::App(AppError::Core(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

pub fn run_cli() -> Result<(), CliError> {
    let script = env::var_os(SCRIPT_ENV).is_some();
    let args: Vec<String> = env::args().skip(1).collect();
    if !script && args.is_empty() {
        return Err(CliError::Usage(usage()));
    }

    let manager = ConfigManager::from_env().map_err(AppError::from)?;
    let ledger = CardLedger::open(&manager)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if script {
        run_script(&ledger, io::stdin().lock(), &mut out)
    } else {
        execute(&ledger, &args, &mut out).map(|_| ())
    }
}

/// Runs every line of `input`; failing lines are reported and skipped.
pub fn run_script<R: BufRead>(
    ledger: &CardLedger,
    input: R,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    for line in input.lines() {
        let line = line?;
        let tokens = match split(&line) {
            Ok(tokens) => tokens,
            Err(err) => {
                eprintln!("Warning: {err}");
                continue;
            }
        };
        if tokens.is_empty() || tokens[0].starts_with('#') {
            continue;
        }
        match execute(ledger, &tokens, out) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => eprintln!("Error: {err}"),
        }
    }
    Ok(())
}

pub fn execute(
    ledger: &CardLedger,
    args: &[String],
    out: &mut dyn Write,
) -> Result<LoopControl, CliError> {
    let Some(command) = args.first() else {
        return Err(CliError::Usage(usage()));
    };
    let args = &args[1..];
    let owner = ledger.owner_id();

    match command.to_lowercase().as_str() {
        "account-add" => {
            let name = arg(args, 0, "account-add <name> [checking|investment|cash]")?;
            if name.trim().is_empty() {
                return Err(CoreError::Validation("account name is required".into()).into());
            }
            let kind = match args.get(1) {
                Some(raw) => parse_account_kind(raw)?,
                None => BankAccountKind::Checking,
            };
            let account = ledger
                .store()
                .insert_account(BankAccount::new(owner, name, kind))?;
            writeln!(out, "Account {} {} ({})", account.id, account.name, account.kind)?;
        }
        "card-add" => {
            let help = "card-add <name> <limit> <closing_day> <due_day> [settlement_account]";
            let settlement_account_id = match args.get(4) {
                Some(raw) => Some(resolve_account(ledger, raw)?),
                None => None,
            };
            let card = ledger.cards().create(
                owner,
                NewCard {
                    name: arg(args, 0, help)?.to_string(),
                    color: None,
                    limit: parse_amount(arg(args, 1, help)?)?,
                    closing_day: parse_number(arg(args, 2, help)?)?,
                    due_day: parse_number(arg(args, 3, help)?)?,
                    settlement_account_id,
                },
            )?;
            writeln!(
                out,
                "Card {} {} closes on {} due on {}",
                card.id, card.name, card.closing_day, card.due_day
            )?;
        }
        "cards" => {
            for usage in ledger.cards().list_with_usage(owner)? {
                writeln!(
                    out,
                    "{}  limit {}  spent {}  available {}",
                    usage.card.name, usage.card.limit, usage.total_spent, usage.available_limit
                )?;
            }
        }
        "purchase" => {
            let help = "purchase <card> <name> <total> <YYYY-MM-DD> [installments]";
            let card = resolve_card(ledger, arg(args, 0, help)?)?;
            let installments = match args.get(4) {
                Some(raw) => parse_number(raw)?,
                None => 1,
            };
            let purchase = NewCardPurchase::new(
                card.id,
                arg(args, 1, help)?,
                parse_amount(arg(args, 2, help)?)?,
                parse_date(arg(args, 3, help)?)?,
            )
            .in_installments(installments);
            let items = ledger.purchases().create(owner, purchase)?;
            for item in &items {
                writeln!(out, "{}  {}  {}  {}", item.id, item.date, item.value, item.name)?;
            }
            if let Some(group_id) = items.first().and_then(|item| item.group_id) {
                writeln!(out, "Group {group_id}")?;
            }
        }
        "item-edit" => {
            let help = "item-edit <item_id> name=<text> value=<amount> date=<YYYY-MM-DD>";
            let item_id = parse_uuid(arg(args, 0, help)?)?;
            let update = parse_item_update(&args[1..])?;
            let item = ledger.purchases().update(owner, item_id, update)?;
            writeln!(out, "Updated {}  {}  {}", item.name, item.date, item.value)?;
        }
        "item-delete" => {
            let item_id = parse_uuid(arg(args, 0, "item-delete <item_id>")?)?;
            let item = ledger.purchases().remove(owner, item_id)?;
            writeln!(out, "Removed {}", item.name)?;
        }
        "group-delete" => {
            let group_id = parse_uuid(arg(args, 0, "group-delete <group_id>")?)?;
            let removed = ledger.purchases().remove_group(owner, group_id)?;
            writeln!(out, "Removed {removed} installment(s)")?;
        }
        "statement" => {
            let help = "statement <card> <MM/YYYY>";
            let card = resolve_card(ledger, arg(args, 0, help)?)?;
            let cycle = parse_cycle(arg(args, 1, help)?)?;
            let statement = ledger.cards().statement(owner, card.id, cycle)?;
            writeln!(
                out,
                "{} {}: closes {} due {}",
                card.name, statement.cycle, statement.closing_date, statement.due_date
            )?;
            for item in &statement.items {
                writeln!(out, "  {}  {}  {}", item.date, item.value, item.name)?;
            }
            writeln!(out, "Total {}", statement.total)?;
        }
        "charges" => {
            let card = resolve_card(ledger, arg(args, 0, "charges <card>")?)?;
            let charges = ledger.store().list_charges(owner, card.id)?;
            if charges.is_empty() {
                writeln!(out, "No invoice charges for {}", card.name)?;
            }
            for charge in charges {
                writeln!(
                    out,
                    "{}  {}  due {}  {}",
                    charge.cycle(),
                    charge.value,
                    charge.due_date,
                    charge.name
                )?;
            }
        }
        "version" => writeln!(out, "{}", build_info::current())?,
        "help" => writeln!(out, "{}", usage())?,
        "exit" | "quit" => return Ok(LoopControl::Exit),
        other => {
            return Err(CliError::Usage(format!(
                "unknown command `{other}`\n{}",
                usage()
            )))
        }
    }
    Ok(LoopControl::Continue)
}

pub fn usage() -> String {
    "Usage: cardledger_cli <command>\n\
     Commands:\n  \
     account-add <name> [checking|investment|cash]\n  \
     card-add <name> <limit> <closing_day> <due_day> [settlement_account]\n  \
     cards\n  \
     purchase <card> <name> <total> <YYYY-MM-DD> [installments]\n  \
     item-edit <item_id> [name=<text>] [value=<amount>] [date=<YYYY-MM-DD>]\n  \
     item-delete <item_id>\n  \
     group-delete <group_id>\n  \
     statement <card> <MM/YYYY>\n  \
     charges <card>\n  \
     version"
        .to_string()
}

fn arg<'a>(args: &'a [String], index: usize, help: &str) -> Result<&'a str, CliError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("usage: {help}")))
}

/// Cards are addressed by id or by case-insensitive name.
fn resolve_card(ledger: &CardLedger, raw: &str) -> Result<Card, CliError> {
    let owner = ledger.owner_id();
    let cards = ledger.store().list_cards(owner)?;
    let found = match Uuid::parse_str(raw) {
        Ok(id) => cards.into_iter().find(|card| card.id == id),
        Err(_) => cards
            .into_iter()
            .find(|card| card.name.eq_ignore_ascii_case(raw)),
    };
    found.ok_or_else(|| CliError::Usage(format!("no card matches `{raw}`")))
}

fn resolve_account(ledger: &CardLedger, raw: &str) -> Result<Uuid, CliError> {
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }
    ledger
        .store()
        .list_accounts(ledger.owner_id())?
        .into_iter()
        .find(|account| account.name.eq_ignore_ascii_case(raw))
        .map(|account| account.id)
        .ok_or_else(|| CliError::Usage(format!("no account matches `{raw}`")))
}

fn parse_item_update(pairs: &[String]) -> Result<LineItemUpdate, CliError> {
    let mut update = LineItemUpdate::default();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Usage(format!("expected key=value, got `{pair}`")))?;
        match key {
            "name" => update.name = Some(value.to_string()),
            "value" => update.value = Some(parse_amount(value)?),
            "date" => update.date = Some(parse_date(value)?),
            other => return Err(CliError::Usage(format!("unknown field `{other}`"))),
        }
    }
    Ok(update)
}

fn parse_account_kind(raw: &str) -> Result<BankAccountKind, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "checking" => Ok(BankAccountKind::Checking),
        "investment" => Ok(BankAccountKind::Investment),
        "cash" => Ok(BankAccountKind::Cash),
        other => Err(CliError::Usage(format!("unknown account kind `{other}`"))),
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, CliError> {
    Decimal::from_str(raw).map_err(|_| CliError::Usage(format!("invalid amount `{raw}`")))
}

fn parse_number(raw: &str) -> Result<u32, CliError> {
    raw.parse()
        .map_err(|_| CliError::Usage(format!("invalid number `{raw}`")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CliError::Usage(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
}

fn parse_cycle(raw: &str) -> Result<BillingCycle, CliError> {
    raw.split_once('/')
        .and_then(|(month, year)| BillingCycle::new(month.parse().ok()?, year.parse().ok()?))
        .ok_or_else(|| CliError::Usage(format!("invalid cycle `{raw}`, expected MM/YYYY")))
}

fn parse_uuid(raw: &str) -> Result<Uuid, CliError> {
    Uuid::parse_str(raw).map_err(|_| CliError::Usage(format!("invalid id `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_parse_from_month_and_year() {
        assert_eq!(parse_cycle("02/2024").unwrap(), BillingCycle::new(2, 2024).unwrap());
        assert!(parse_cycle("13/2024").is_err());
        assert!(parse_cycle("2024-02").is_err());
    }

    #[test]
    fn item_updates_parse_known_fields_only() {
        let pairs = vec!["value=12.50".to_string(), "date=2024-03-01".to_string()];
        let update = parse_item_update(&pairs).unwrap();
        assert_eq!(update.value, Some(Decimal::new(1250, 2)));
        assert_eq!(update.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(update.name.is_none());

        assert!(parse_item_update(&["color=red".to_string()]).is_err());
        assert!(parse_item_update(&["value".to_string()]).is_err());
    }
}
