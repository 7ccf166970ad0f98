use chrono::NaiveDate;
use uuid::Uuid;

use engine::{
    Account, Category, CategoryKind, Currency, Ledger, LedgerError, RateTable, TransactionDraft,
    TransactionKind, TransactionPatch,
    store::{AccountRepository, AtomicityStrategy, CategoryRepository, DbStore, MemoryStore},
};
use migration::MigratorTrait;

const OWNER: &str = "alice";

fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new())
}

async fn db_ledger() -> Ledger<DbStore> {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Ledger::new(DbStore::new(db))
}

async fn seed<S: AtomicityStrategy>(
    ledger: &Ledger<S>,
    account: &Account,
    category: Option<&Category>,
) {
    ledger
        .store()
        .run_atomic(async |ctx| {
            ctx.insert_account(account).await?;
            if let Some(category) = category {
                ctx.insert_category(category).await?;
            }
            Ok(())
        })
        .await
        .unwrap();
}

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

// 1000.00 USD account, 50.00 categorized expense: balance drops, the month
// budget is auto-created and accrues, and deleting the transaction restores
// both aggregates exactly.
async fn expense_then_delete_round_trip<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                5_000,
                Currency::Usd,
                march(10),
            )
            .category_id(groceries.id)
            .note("weekly shop"),
        )
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        95_000
    );
    let budget = ledger
        .budget(OWNER, groceries.id, "2026-03")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(budget.spent_minor, 5_000);
    assert_eq!(budget.limit_minor, 0);
    assert_eq!(budget.currency, Currency::Usd);

    ledger.delete_transaction(OWNER, tx.id).await.unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        100_000
    );
    let budget = ledger
        .budget(OWNER, groceries.id, "2026-03")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(budget.spent_minor, 0);
    assert!(matches!(
        ledger.transaction(OWNER, tx.id).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn expense_then_delete_round_trip_memory() {
    expense_then_delete_round_trip(memory_ledger()).await;
}

#[tokio::test]
async fn expense_then_delete_round_trip_db() {
    expense_then_delete_round_trip(db_ledger().await).await;
}

async fn income_raises_balance_without_budget<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Eur, 10_000);
    let salary = Category::new(OWNER, "Salary", CategoryKind::Income);
    seed(&ledger, &account, Some(&salary)).await;

    ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Income,
                250_000,
                Currency::Eur,
                march(1),
            )
            .category_id(salary.id),
        )
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        260_000
    );
    // Income never accrues into a budget.
    assert!(ledger
        .budget(OWNER, salary.id, "2026-03")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn income_raises_balance_without_budget_memory() {
    income_raises_balance_without_budget(memory_ledger()).await;
}

#[tokio::test]
async fn income_raises_balance_without_budget_db() {
    income_raises_balance_without_budget(db_ledger().await).await;
}

async fn note_only_update_is_aggregate_neutral<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                5_000,
                Currency::Usd,
                march(10),
            )
            .category_id(groceries.id),
        )
        .await
        .unwrap();

    let updated = ledger
        .update_transaction(OWNER, tx.id, TransactionPatch::new().note("corrected"))
        .await
        .unwrap();

    assert_eq!(updated.note, "corrected");
    assert_eq!(updated.amount_minor, 5_000);
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        95_000
    );
    assert_eq!(
        ledger
            .budget(OWNER, groceries.id, "2026-03")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        5_000
    );
}

#[tokio::test]
async fn note_only_update_is_aggregate_neutral_memory() {
    note_only_update_is_aggregate_neutral(memory_ledger()).await;
}

#[tokio::test]
async fn note_only_update_is_aggregate_neutral_db() {
    note_only_update_is_aggregate_neutral(db_ledger().await).await;
}

async fn empty_patch_lands_on_same_aggregates<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                7_500,
                Currency::Usd,
                march(12),
            )
            .category_id(groceries.id),
        )
        .await
        .unwrap();

    // The invert/apply cycle still runs; it must be a no-op on aggregates.
    ledger
        .update_transaction(OWNER, tx.id, TransactionPatch::new())
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        92_500
    );
    assert_eq!(
        ledger
            .budget(OWNER, groceries.id, "2026-03")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        7_500
    );
}

#[tokio::test]
async fn empty_patch_lands_on_same_aggregates_memory() {
    empty_patch_lands_on_same_aggregates(memory_ledger()).await;
}

#[tokio::test]
async fn empty_patch_lands_on_same_aggregates_db() {
    empty_patch_lands_on_same_aggregates(db_ledger().await).await;
}

async fn amount_update_rederives_aggregates<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                5_000,
                Currency::Usd,
                march(10),
            )
            .category_id(groceries.id),
        )
        .await
        .unwrap();

    ledger
        .update_transaction(OWNER, tx.id, TransactionPatch::new().amount_minor(8_000))
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        92_000
    );
    assert_eq!(
        ledger
            .budget(OWNER, groceries.id, "2026-03")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        8_000
    );
}

#[tokio::test]
async fn amount_update_rederives_aggregates_memory() {
    amount_update_rederives_aggregates(memory_ledger()).await;
}

#[tokio::test]
async fn amount_update_rederives_aggregates_db() {
    amount_update_rederives_aggregates(db_ledger().await).await;
}

async fn account_switch_moves_both_balances<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let checking = Account::new(OWNER, "Checking", Currency::Usd, 50_000);
    let savings = Account::new(OWNER, "Savings", Currency::Usd, 50_000);
    seed(&ledger, &checking, None).await;
    seed(&ledger, &savings, None).await;

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                checking.id,
                TransactionKind::Expense,
                10_000,
                Currency::Usd,
                march(5),
            ),
        )
        .await
        .unwrap();

    ledger
        .update_transaction(OWNER, tx.id, TransactionPatch::new().account_id(savings.id))
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, checking.id).await.unwrap().balance_minor,
        50_000
    );
    assert_eq!(
        ledger.account(OWNER, savings.id).await.unwrap().balance_minor,
        40_000
    );
}

#[tokio::test]
async fn account_switch_moves_both_balances_memory() {
    account_switch_moves_both_balances(memory_ledger()).await;
}

#[tokio::test]
async fn account_switch_moves_both_balances_db() {
    account_switch_moves_both_balances(db_ledger().await).await;
}

// Re-categorizing an expense into another category and month rolls the old
// budget back to zero and accrues into the new month's budget; clearing the
// category removes the accrual entirely. The balance never moves.
async fn category_and_month_switch_moves_accrual<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    let fuel = Category::new(OWNER, "Fuel", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;
    ledger
        .store()
        .run_atomic(async |ctx| ctx.insert_category(&fuel).await)
        .await
        .unwrap();

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                5_000,
                Currency::Usd,
                march(10),
            )
            .category_id(groceries.id),
        )
        .await
        .unwrap();

    ledger
        .update_transaction(
            OWNER,
            tx.id,
            TransactionPatch::new()
                .category_id(fuel.id)
                .date(NaiveDate::from_ymd_opt(2026, 4, 2).unwrap()),
        )
        .await
        .unwrap();

    assert_eq!(
        ledger
            .budget(OWNER, groceries.id, "2026-03")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        0
    );
    assert_eq!(
        ledger
            .budget(OWNER, fuel.id, "2026-04")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        5_000
    );
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        95_000
    );

    ledger
        .update_transaction(OWNER, tx.id, TransactionPatch::new().clear_category())
        .await
        .unwrap();

    let updated = ledger.transaction(OWNER, tx.id).await.unwrap();
    assert_eq!(updated.category_id, None);
    assert_eq!(
        ledger
            .budget(OWNER, fuel.id, "2026-04")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        0
    );
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        95_000
    );
    assert!(ledger.check_consistency(OWNER).await.unwrap().is_consistent());
}

#[tokio::test]
async fn category_and_month_switch_moves_accrual_memory() {
    category_and_month_switch_moves_accrual(memory_ledger()).await;
}

#[tokio::test]
async fn category_and_month_switch_moves_accrual_db() {
    category_and_month_switch_moves_accrual(db_ledger().await).await;
}

// Flipping kind and currency in one patch: the old converted expense is
// rolled back and the new amount is applied with the new sign and rate.
async fn kind_and_currency_update_rederives_balance<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Giro", Currency::Eur, 100_000);
    seed(&ledger, &account, None).await;

    // 10.00 USD expense at the built-in 0.94 rate: -940.
    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                1_000,
                Currency::Usd,
                march(10),
            ),
        )
        .await
        .unwrap();
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        99_060
    );

    ledger
        .update_transaction(
            OWNER,
            tx.id,
            TransactionPatch::new()
                .kind(TransactionKind::Income)
                .currency(Currency::Eur),
        )
        .await
        .unwrap();

    // Now 10.00 EUR income, no conversion: +1_000 over the opening balance.
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        101_000
    );
    assert!(ledger.check_consistency(OWNER).await.unwrap().is_consistent());
}

#[tokio::test]
async fn kind_and_currency_update_rederives_balance_memory() {
    kind_and_currency_update_rederives_balance(memory_ledger()).await;
}

#[tokio::test]
async fn kind_and_currency_update_rederives_balance_db() {
    kind_and_currency_update_rederives_balance(db_ledger().await).await;
}

// 10.00 USD into a EUR account at the built-in 0.94 rate lands as 9.40;
// the budget adopts the account currency and accrues the converted amount.
async fn cross_currency_expense_converts<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Giro", Currency::Eur, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                1_000,
                Currency::Usd,
                march(10),
            )
            .category_id(groceries.id),
        )
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        100_000 - 940
    );
    let budget = ledger
        .budget(OWNER, groceries.id, "2026-03")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(budget.currency, Currency::Eur);
    assert_eq!(budget.spent_minor, 940);
}

#[tokio::test]
async fn cross_currency_expense_converts_memory() {
    cross_currency_expense_converts(memory_ledger()).await;
}

#[tokio::test]
async fn cross_currency_expense_converts_db() {
    cross_currency_expense_converts(db_ledger().await).await;
}

// A pair missing from the rate table passes through 1:1.
#[tokio::test]
async fn unknown_rate_pair_passes_through() {
    let ledger = Ledger::with_rates(MemoryStore::new(), RateTable::empty());
    let account = Account::new(OWNER, "Giro", Currency::Eur, 10_000);
    seed(&ledger, &account, None).await;

    ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                1_500,
                Currency::Usd,
                march(10),
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        8_500
    );
}

async fn rejects_bad_input<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 10_000);
    let salary = Category::new(OWNER, "Salary", CategoryKind::Income);
    seed(&ledger, &account, Some(&salary)).await;

    let err = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                -1,
                Currency::Usd,
                march(1),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    // Expense against an income category.
    let err = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                1_000,
                Currency::Usd,
                march(1),
            )
            .category_id(salary.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                Uuid::new_v4(),
                TransactionKind::Expense,
                1_000,
                Currency::Usd,
                march(1),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));

    // Nothing was recorded and nothing moved.
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        10_000
    );
    assert!(ledger.transactions(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejects_bad_input_memory() {
    rejects_bad_input(memory_ledger()).await;
}

#[tokio::test]
async fn rejects_bad_input_db() {
    rejects_bad_input(db_ledger().await).await;
}

async fn unknown_transaction_is_not_found<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let missing = Uuid::new_v4();
    assert!(matches!(
        ledger
            .update_transaction(OWNER, missing, TransactionPatch::new().note("x"))
            .await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.delete_transaction(OWNER, missing).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn unknown_transaction_is_not_found_memory() {
    unknown_transaction_is_not_found(memory_ledger()).await;
}

#[tokio::test]
async fn unknown_transaction_is_not_found_db() {
    unknown_transaction_is_not_found(db_ledger().await).await;
}

async fn foreign_owner_sees_nothing<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 10_000);
    seed(&ledger, &account, None).await;

    let tx = ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                1_000,
                Currency::Usd,
                march(1),
            ),
        )
        .await
        .unwrap();

    assert!(matches!(
        ledger.transaction("mallory", tx.id).await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.delete_transaction("mallory", tx.id).await,
        Err(LedgerError::NotFound(_))
    ));
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        9_000
    );
}

#[tokio::test]
async fn foreign_owner_sees_nothing_memory() {
    foreign_owner_sees_nothing(memory_ledger()).await;
}

#[tokio::test]
async fn foreign_owner_sees_nothing_db() {
    foreign_owner_sees_nothing(db_ledger().await).await;
}

async fn concurrent_creates_converge<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    let create = |amount: i64| {
        ledger.create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                amount,
                Currency::Usd,
                march(15),
            )
            .category_id(groceries.id),
        )
    };

    let (a, b, c, d) = tokio::join!(create(1_000), create(2_000), create(3_000), create(4_000));
    a.unwrap();
    b.unwrap();
    c.unwrap();
    d.unwrap();

    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        90_000
    );
    assert_eq!(
        ledger
            .budget(OWNER, groceries.id, "2026-03")
            .await
            .unwrap()
            .unwrap()
            .spent_minor,
        10_000
    );
    assert!(ledger.check_consistency(OWNER).await.unwrap().is_consistent());
}

#[tokio::test]
async fn concurrent_creates_converge_memory() {
    concurrent_creates_converge(memory_ledger()).await;
}

#[tokio::test]
async fn concurrent_creates_converge_db() {
    concurrent_creates_converge(db_ledger().await).await;
}

async fn recompute_repairs_drift<S: AtomicityStrategy>(ledger: Ledger<S>) {
    let account = Account::new(OWNER, "Checking", Currency::Usd, 100_000);
    let groceries = Category::new(OWNER, "Groceries", CategoryKind::Expense);
    seed(&ledger, &account, Some(&groceries)).await;

    ledger
        .create_transaction(
            OWNER,
            TransactionDraft::new(
                account.id,
                TransactionKind::Expense,
                5_000,
                Currency::Usd,
                march(10),
            )
            .category_id(groceries.id),
        )
        .await
        .unwrap();

    // Tamper with the stored balance behind the engine's back.
    ledger
        .store()
        .run_atomic(async |ctx| ctx.adjust_balance(OWNER, account.id, -123).await)
        .await
        .unwrap();

    let report = ledger.check_consistency(OWNER).await.unwrap();
    assert_eq!(report.accounts.len(), 1);
    assert_eq!(report.accounts[0].stored_minor, 95_000 - 123);
    assert_eq!(report.accounts[0].expected_minor, 95_000);
    assert!(report.budgets.is_empty());

    let repaired = ledger.recompute_aggregates(OWNER).await.unwrap();
    assert!(!repaired.is_consistent());
    assert!(ledger.check_consistency(OWNER).await.unwrap().is_consistent());
    assert_eq!(
        ledger.account(OWNER, account.id).await.unwrap().balance_minor,
        95_000
    );
}

#[tokio::test]
async fn recompute_repairs_drift_memory() {
    recompute_repairs_drift(memory_ledger()).await;
}

#[tokio::test]
async fn recompute_repairs_drift_db() {
    recompute_repairs_drift(db_ledger().await).await;
}

#[tokio::test]
async fn snapshot_survives_reopen() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("tally_{}.json", Uuid::new_v4()));

    let account = Account::new(OWNER, "Checking", Currency::Usd, 10_000);
    {
        let ledger = Ledger::new(MemoryStore::open(&path).unwrap());
        seed(&ledger, &account, None).await;
        ledger
            .create_transaction(
                OWNER,
                TransactionDraft::new(
                    account.id,
                    TransactionKind::Expense,
                    2_500,
                    Currency::Usd,
                    march(3),
                ),
            )
            .await
            .unwrap();
    }

    let reopened = Ledger::new(MemoryStore::open(&path).unwrap());
    assert_eq!(
        reopened.account(OWNER, account.id).await.unwrap().balance_minor,
        7_500
    );
    assert_eq!(reopened.transactions(OWNER).await.unwrap().len(), 1);

    std::fs::remove_file(&path).ok();
}
