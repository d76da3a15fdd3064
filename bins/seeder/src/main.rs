//! Demo seeder for GreatBank.
//!
//! Opens two demo accounts in an in-memory ledger and replays a short
//! account history through the engine: deposit, withdrawals, a transfer,
//! investment purchases, a price update and a sale. Rejected steps are
//! expected and logged with their application error code.
//!
//! Usage: cargo run --bin seeder

use anyhow::{Context, bail};
use rust_decimal_macros::dec;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use greatbank_core::{Account, AccountKind, InstrumentKind, LedgerError, PriceQuote};
use greatbank_shared::config::LoggingConfig;
use greatbank_shared::types::{AccountId, AccountNumber, UserId};
use greatbank_shared::{AppConfig, AppError};
use greatbank_store::{MemoryLedgerEngine, MemoryStore};

/// Demo user ID (consistent across runs)
const DEMO_USER_ID: &str = "00000000-0000-0000-0000-000000000002";
const CHECKING_NUMBER: &str = "1000200030004000";
const SAVINGS_NUMBER: &str = "5000600070008000";

struct DemoAccounts {
    checking: AccountId,
    savings: AccountId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let store = MemoryStore::new();
    let engine = store.engine(&config.engine);

    info!("Seeding demo accounts");
    let accounts = seed_accounts(&store)?;

    info!("Replaying demo activity");
    replay(&engine, &store, &accounts).await?;

    for account_id in [accounts.checking, accounts.savings] {
        let account = engine.account(account_id).await?;
        let recent = engine.recent_transactions(account_id, None).await?;
        info!(
            number = %account.account_number.masked(),
            balance = %account.balance,
            recent = recent.len(),
            "Final account state"
        );
    }
    info!("Seeding complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());
    let json = logging.json.then(|| tracing_subscriber::fmt::layer().json());
    let plain = (!logging.json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .init();
}

fn seed_accounts(store: &MemoryStore) -> anyhow::Result<DemoAccounts> {
    let owner = UserId::from_uuid(Uuid::parse_str(DEMO_USER_ID)?);

    let checking = Account::new(
        owner,
        AccountNumber::parse(CHECKING_NUMBER)?,
        AccountKind::Checking,
        "$argon2id$v=19$m=65536,t=3,p=4$demo_hash",
    )
    .with_balance(dec!(50.00));
    let savings = Account::new(
        owner,
        AccountNumber::parse(SAVINGS_NUMBER)?,
        AccountKind::Savings,
        "$argon2id$v=19$m=65536,t=3,p=4$demo_hash",
    )
    .with_balance(dec!(20.00));

    Ok(DemoAccounts {
        checking: store.accounts.open_account(checking)?,
        savings: store.accounts.open_account(savings)?,
    })
}

async fn replay(
    engine: &MemoryLedgerEngine,
    store: &MemoryStore,
    accounts: &DemoAccounts,
) -> anyhow::Result<()> {
    let checking = accounts.checking;

    let balance = engine.deposit(checking, dec!(100.00), "Payroll").await?;
    info!(%balance, "Deposited 100.00");

    let balance = engine.withdraw(checking, dec!(30.00), "ATM").await?;
    info!(%balance, "Withdrew 30.00");

    expect_rejection(
        "withdraw 500.00",
        engine.withdraw(checking, dec!(500.00), "").await,
    )?;

    let receipt = engine
        .transfer(checking, &AccountNumber::parse(SAVINGS_NUMBER)?, dec!(50.00), "Savings")
        .await?;
    info!(
        from_balance = %receipt.from_balance,
        to_balance = %receipt.to_balance,
        "Transferred 50.00 to savings"
    );

    expect_rejection(
        "buy 10 AAPL at 150.00",
        engine
            .purchase_investment(checking, InstrumentKind::Stock, "AAPL", dec!(10), dec!(150.00))
            .await,
    )?;

    let purchase = engine
        .purchase_investment(checking, InstrumentKind::Stock, "AAPL", dec!(2), dec!(30.00))
        .await?;
    info!(balance = %purchase.new_balance, holding_id = %purchase.holding.id, "Bought 2 AAPL");

    let updated = store
        .price_updater()
        .apply(&[PriceQuote {
            holding_id: purchase.holding.id,
            price: dec!(40.00),
        }])
        .await?;
    let portfolio = engine.portfolio(checking).await?;
    info!(
        updated,
        portfolio = %serde_json::to_string(&portfolio)?,
        "Repriced holdings"
    );

    let sale = engine
        .sell_investment(purchase.holding.id, checking, dec!(2), dec!(40.00))
        .await?;
    info!(
        proceeds = %sale.proceeds,
        balance = %sale.new_balance,
        remaining = %sale.remaining_shares,
        "Sold 2 AAPL"
    );

    Ok(())
}

/// Logs an expected business-rule rejection; anything else aborts the run.
fn expect_rejection<T>(step: &str, result: Result<T, LedgerError>) -> anyhow::Result<()> {
    match result {
        Ok(_) => bail!("{step} should have been rejected"),
        Err(err) if err.is_rejection() => {
            let app = AppError::from(err);
            warn!(
                step,
                code = app.error_code(),
                status = app.status_code(),
                error = %app,
                "Rejected as expected"
            );
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
