// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;

use weekly_ledger::config::{CliArgs, Command};
use weekly_ledger::{
    export, logging, open_store, parse_amount, parse_rate, ChangeEvent, ChangeNotifier, Config, Currency,
    ExchangeRateSet, Trend, Tracker,
};

fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);
    logging::init(&config.logging);

    let store = open_store(&config.storage)
        .with_context(|| format!("Failed to open ledger at {}", config.storage.path.display()))?;

    let notifier = ChangeNotifier::new();
    notifier.subscribe(|event| match event {
        ChangeEvent::PeriodSaved { id } => tracing::debug!(%id, "history changed"),
        ChangeEvent::HistoryCleared => tracing::debug!("history cleared"),
        ChangeEvent::DraftChanged => tracing::trace!("draft changed"),
    });

    let mut tracker = Tracker::open(store, notifier, config.tracker.clone())?;
    run_command(&mut tracker, cli.command)
}

fn currency_or_default(tracker: &Tracker, code: Option<String>) -> Result<Currency> {
    match code {
        Some(code) => Ok(code.parse()?),
        None => Ok(tracker.settings().comparison_currency),
    }
}

fn parse_date(raw: Option<String>) -> Result<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s)),
        None => Ok(Utc::now().date_naive()),
    }
}

fn format_rates(rates: &ExchangeRateSet) -> String {
    let pivot = Currency::PIVOT;
    format!(
        "USD→{} {:.4}  EUR→{} {:.4}  BTC→USD {:.2}",
        pivot, rates.usd_to_brl, pivot, rates.eur_to_brl, rates.btc_to_usd
    )
}

fn format_trend(trend: &Trend) -> String {
    match trend.percent {
        Some(p) => format!("{} {:+.2}%", trend.direction.arrow(), p),
        None => trend.direction.arrow().to_string(),
    }
}

fn run_command(tracker: &mut Tracker, command: Command) -> Result<()> {
    match command {
        Command::Show { currency } => {
            let currency = currency_or_default(tracker, currency)?;
            print_draft(tracker, currency)?;
        }
        Command::Rates { usd_to_brl, eur_to_brl, btc_to_usd } => {
            let previous_btc = tracker.draft().rates().btc_to_usd;
            let rates = ExchangeRateSet::new(
                parse_rate(&usd_to_brl),
                parse_rate(&eur_to_brl),
                btc_to_usd.as_deref().map(parse_rate).unwrap_or(previous_btc),
            );
            if !rates.is_complete() {
                eprintln!("⚠️  Rates must be positive; balances cannot be edited until they are.");
            }
            tracker.set_rates(rates)?;
            println!("✓ Rates set: {}", format_rates(&rates));
        }
        Command::Add { name } => {
            let id = tracker.add_account(&name)?;
            println!("✓ Added '{}' ({})", name, id);
        }
        Command::Rename { id, name } => {
            let id = tracker.find_account(&id)?.id.clone();
            tracker.rename_account(&id, &name)?;
            println!("✓ Renamed {} to '{}'", id, name);
        }
        Command::Remove { id } => {
            let id = tracker.find_account(&id)?.id.clone();
            let removed = tracker.remove_account(&id)?;
            println!("✓ Removed '{}'", removed.name);
        }
        Command::Move { from, to } => {
            tracker.move_account(from, to)?;
            println!("✓ Moved account {} → {}", from, to);
        }
        Command::Set { id, currency, amount } => {
            let id = tracker.find_account(&id)?.id.clone();
            let currency: Currency = currency.parse()?;
            let account = tracker.edit_balance(&id, currency, parse_amount(&amount))?;
            println!(
                "✓ {}: USD {:.2}  BRL {:.2}  EUR {:.2}",
                account.name, account.usd, account.brl, account.eur
            );
        }
        Command::Save => {
            let period = tracker.save_period()?;
            let currency = tracker.settings().comparison_currency;
            println!(
                "✓ Saved week {} ({} accounts, {} {:.2})",
                period.date,
                period.accounts.len(),
                currency.symbol(),
                period.total_in(currency)
            );
        }
        Command::New { clear_rates, date } => {
            let date = parse_date(date)?;
            let carry = tracker.settings().carry_forward_rates && !clear_rates;
            let draft = tracker.start_new_period(carry, date)?;
            println!(
                "✓ Started week {} with {} accounts ({})",
                draft.date,
                draft.accounts().len(),
                if carry { "rates carried forward" } else { "rates cleared" }
            );
        }
        Command::History { currency } => {
            let currency = currency_or_default(tracker, currency)?;
            let series = tracker.comparison(currency)?;
            if series.is_empty() {
                println!("No saved weeks yet.");
                return Ok(());
            }
            println!("{:<12} {:>16} {:>12}", "Week", format!("Total ({})", currency), "Change");
            for point in &series {
                println!("{:<12} {:>16.2} {:>12}", point.date, point.total, format_trend(&point.change));
            }
        }
        Command::Account { name, currency } => {
            let currency = currency_or_default(tracker, currency)?;
            let series = tracker.account_history(&name, currency)?;
            if series.is_empty() {
                bail!("No saved week contains an account named '{}'", name);
            }
            println!("{} ({})", name, currency);
            for point in &series {
                println!("{:<12} {:>16.2} {:>12}", point.date, point.value, format_trend(&point.change));
            }
        }
        Command::Export { file } => {
            let history = tracker.history()?;
            let rows = export::export_to_path(&file, &history)
                .with_context(|| format!("Failed to export to {}", file.display()))?;
            println!("✓ Exported {} weeks ({} rows) to {}", history.len(), rows, file.display());
        }
        Command::Import { file } => {
            let periods = export::import_from_path(&file)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            let count = tracker.append_periods(&periods)?;
            println!("✓ Imported {} weeks", count);
        }
        Command::Clear => {
            let count = tracker.history()?.len();
            tracker.clear_history()?;
            println!("✓ Cleared {} saved weeks", count);
        }
        #[cfg(feature = "tui")]
        Command::Ui => {
            let mut app = ui::App::new(tracker)?;
            ui::run_ui(&mut app, tracker)?;
        }
    }

    Ok(())
}

fn print_draft(tracker: &Tracker, currency: Currency) -> Result<()> {
    let draft = tracker.draft();
    let rates = draft.rates();
    let summary = tracker.summary(currency)?;

    println!("Week of {}", draft.date);
    println!("Rates: {}", format_rates(rates));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:>3}  {:<24} {:>12} {:>12} {:>12}  {}", "#", "Account", "USD", "BRL", "EUR", "ID");
    for (i, account) in draft.accounts().iter().enumerate() {
        println!(
            "{:>3}  {:<24} {:>12.2} {:>12.2} {:>12.2}  {}",
            i + 1,
            account.name,
            account.usd,
            account.brl,
            account.eur,
            &account.id[..8.min(account.id.len())]
        );
    }
    let totals = summary.draft_totals;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("     {:<24} {:>12.2} {:>12.2} {:>12.2}", "Total", totals.usd, totals.brl, totals.eur);
    println!(
        "\nPortfolio: {} {:.2}  ({:.0}% USD / {:.0}% BRL / {:.0}% EUR)",
        currency.symbol(),
        summary.draft_total,
        summary.allocation.usd * 100.0,
        summary.allocation.brl * 100.0,
        summary.allocation.eur * 100.0
    );
    match summary.last_saved_total {
        Some(last) => println!(
            "vs last saved week: {} {:.2}  {}",
            currency.symbol(),
            last,
            format_trend(&summary.change)
        ),
        None => println!("No saved weeks yet."),
    }

    Ok(())
}
