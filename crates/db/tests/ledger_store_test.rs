//! Integration tests for the Postgres-backed ledger store.
//!
//! Run with `cargo test -p mbank-db -- --ignored` against a migrated database.

mod common;

use futures::future::join_all;
use mbank_core::auth::{Caller, Role};
use mbank_core::ledger::{
    CashRequest, HistoryQuery, HistoryScope, LedgerEngine, LedgerError, PaymentRequest,
    TransactionType, TransferRequest,
};
use mbank_db::{AccountRepository, SeaLedgerStore};
use mbank_shared::types::{PageRequest, UserId};
use rust_decimal_macros::dec;

fn caller_for(user: &mbank_db::repositories::UserWithRoles) -> Caller {
    Caller::new(UserId::from_uuid(user.user.id), vec![Role::User, Role::Customer])
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_transfer_scenario_persists() {
    let db = common::connect().await;
    let alias = common::create_account_type(&db).await;
    let alice = common::create_user(&db).await;
    let bob = common::create_user(&db).await;
    let a = common::open_account(&db, &alice, &alias, dec!(100.00), dec!(50.00)).await;
    let b = common::open_account(&db, &bob, &alias, dec!(0), dec!(5000)).await;

    let engine = LedgerEngine::with_holder_gate(SeaLedgerStore::new(db.clone()));
    let caller = caller_for(&alice);
    let transfer = |amount| TransferRequest {
        owner_act_no: a.account.act_no.clone(),
        receiver_act_no: b.account.act_no.clone(),
        amount,
        remark: Some("rent".to_string()),
    };

    engine.transfer(&caller, transfer(dec!(30.00))).await.unwrap();

    let err = engine.transfer(&caller, transfer(dec!(60.00))).await.unwrap_err();
    assert!(matches!(err, LedgerError::LimitExceeded { .. }), "{err}");

    let err = engine
        .withdraw(
            &caller,
            CashRequest {
                act_no: a.account.act_no.clone(),
                amount: dec!(200.00),
                remark: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }), "{err}");

    let accounts = AccountRepository::new(db.clone());
    let a_now = accounts.find_by_act_no(&a.account.act_no).await.unwrap().unwrap();
    let b_now = accounts.find_by_act_no(&b.account.act_no).await.unwrap().unwrap();
    assert_eq!(a_now.account.balance, dec!(70.00));
    assert_eq!(b_now.account.balance, dec!(30.00));

    let page = engine
        .history(HistoryQuery {
            scope: HistoryScope::Account(a.account.act_no.clone()),
            transaction_type: None,
            page: PageRequest::new(1, 10),
        })
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].transaction_type, TransactionType::Transfer);
    assert_eq!(page.data[0].remark.as_deref(), Some("rent"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_payment_to_external_receiver() {
    let db = common::connect().await;
    let alias = common::create_account_type(&db).await;
    let alice = common::create_user(&db).await;
    let a = common::open_account(&db, &alice, &alias, dec!(100), dec!(5000)).await;

    let engine = LedgerEngine::with_holder_gate(SeaLedgerStore::new(db.clone()));
    let receipt = engine
        .payment(
            &caller_for(&alice),
            PaymentRequest {
                owner_act_no: a.account.act_no.clone(),
                payment_receiver: "EDC-778812".to_string(),
                amount: dec!(12.50),
                remark: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.owner.balance, dec!(87.50));
    assert!(receipt.record.receiver_act_no.is_none());
    assert_eq!(receipt.record.payment_receiver.as_deref(), Some("EDC-778812"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_user_history_covers_all_held_accounts() {
    let db = common::connect().await;
    let alias = common::create_account_type(&db).await;
    let alice = common::create_user(&db).await;
    let first = common::open_account(&db, &alice, &alias, dec!(0), dec!(5000)).await;
    let second = common::open_account(&db, &alice, &alias, dec!(0), dec!(5000)).await;

    let engine = LedgerEngine::with_holder_gate(SeaLedgerStore::new(db.clone()));
    let caller = caller_for(&alice);
    for act_no in [&first.account.act_no, &second.account.act_no] {
        engine
            .deposit(
                &caller,
                CashRequest {
                    act_no: act_no.clone(),
                    amount: dec!(10),
                    remark: None,
                },
            )
            .await
            .unwrap();
    }

    let page = engine
        .history(HistoryQuery {
            scope: HistoryScope::User(caller.user_id),
            transaction_type: Some(TransactionType::Deposit),
            page: PageRequest::new(1, 10),
        })
        .await
        .unwrap();
    assert_eq!(page.meta.total, 2);
    assert!(page.data[0].transaction_at >= page.data[1].transaction_at);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_deposits_do_not_lose_updates() {
    let db = common::connect().await;
    let alias = common::create_account_type(&db).await;
    let alice = common::create_user(&db).await;
    let a = common::open_account(&db, &alice, &alias, dec!(0), dec!(5000)).await;

    let engine = LedgerEngine::with_holder_gate(SeaLedgerStore::new(db.clone()));
    let caller = caller_for(&alice);

    let results = join_all((0..20).map(|_| {
        engine.deposit(
            &caller,
            CashRequest {
                act_no: a.account.act_no.clone(),
                amount: dec!(5),
                remark: None,
            },
        )
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    let account = AccountRepository::new(db)
        .find_by_act_no(&a.account.act_no)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.account.balance, dec!(100));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_opposite_transfers_complete() {
    let db = common::connect().await;
    let alias = common::create_account_type(&db).await;
    let alice = common::create_user(&db).await;
    let bob = common::create_user(&db).await;
    let a = common::open_account(&db, &alice, &alias, dec!(100), dec!(5000)).await;
    let b = common::open_account(&db, &bob, &alias, dec!(100), dec!(5000)).await;

    let engine = LedgerEngine::with_holder_gate(SeaLedgerStore::new(db.clone()));
    let (alice_caller, bob_caller) = (caller_for(&alice), caller_for(&bob));

    let forward = (0..10).map(|_| {
        engine.transfer(
            &alice_caller,
            TransferRequest {
                owner_act_no: a.account.act_no.clone(),
                receiver_act_no: b.account.act_no.clone(),
                amount: dec!(3),
                remark: None,
            },
        )
    });
    let backward = (0..10).map(|_| {
        engine.transfer(
            &bob_caller,
            TransferRequest {
                owner_act_no: b.account.act_no.clone(),
                receiver_act_no: a.account.act_no.clone(),
                amount: dec!(1),
                remark: None,
            },
        )
    });
    let (forward, backward) = tokio::join!(join_all(forward), join_all(backward));
    assert!(forward.iter().chain(backward.iter()).all(Result::is_ok));

    let accounts = AccountRepository::new(db);
    let a_now = accounts.find_by_act_no(&a.account.act_no).await.unwrap().unwrap();
    let b_now = accounts.find_by_act_no(&b.account.act_no).await.unwrap().unwrap();
    assert_eq!(a_now.account.balance, dec!(80));
    assert_eq!(b_now.account.balance, dec!(120));
}
