//! Property-based tests for `LedgerEngine`.
//!
//! - Deposits and withdrawals change the balance by exactly the amount
//! - Overdrafts never commit
//! - Transfers conserve the total of both accounts
//! - A transfer to the same account is always rejected as invalid
//! - Amounts above the transfer limit never move money
//! - Sub-cent amounts are rejected and never move money

use std::future::Future;

use mbank_shared::types::{AccountId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::{ErrorKind, LedgerError};
use super::memory::MemoryStore;
use super::service::LedgerEngine;
use super::types::{AccountState, CashRequest, TransferRequest};
use crate::auth::{Caller, Role};
use crate::lifecycle::LifecycleStatus;

const OWNER_ACT: &str = "100000001";
const OTHER_ACT: &str = "100000002";

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate amounts with a non-zero third decimal (0.001 to 100.999).
fn sub_cent_amount() -> impl Strategy<Value = Decimal> {
    (1i64..101_000i64)
        .prop_filter("needs a sub-cent digit", |mills| mills % 10 != 0)
        .prop_map(|mills| Decimal::new(mills, 3))
}

/// Strategy to generate balances (0.00 to 10,000.00).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn setup(
    owner_balance: Decimal,
    other_balance: Decimal,
    limit: Decimal,
) -> (LedgerEngine<MemoryStore>, Caller) {
    let caller = Caller::new(UserId::new(), vec![Role::User, Role::Customer]);
    let state = |act_no: &str, balance| AccountState {
        id: AccountId::new(),
        act_no: act_no.to_string(),
        balance,
        transfer_limit: limit,
        owner_id: Some(caller.user_id),
        status: LifecycleStatus::Active,
    };
    let store = MemoryStore::with_accounts([
        state(OWNER_ACT, owner_balance),
        state(OTHER_ACT, other_balance),
    ]);
    (LedgerEngine::with_holder_gate(store), caller)
}

async fn balance_of(engine: &LedgerEngine<MemoryStore>, act_no: &str) -> Decimal {
    engine
        .store()
        .account(act_no)
        .await
        .map(|a| a.balance)
        .unwrap_or_default()
}

fn cash(amount: Decimal) -> CashRequest {
    CashRequest {
        act_no: OWNER_ACT.to_string(),
        amount,
        remark: None,
    }
}

fn transfer(to: &str, amount: Decimal) -> TransferRequest {
    TransferRequest {
        owner_act_no: OWNER_ACT.to_string(),
        receiver_act_no: to.to_string(),
        amount,
        remark: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_deposit_adds_exact_amount(start in balance(), amount in positive_amount()) {
        let (engine, caller) = setup(start, Decimal::ZERO, Decimal::MAX);
        let after = block_on(async {
            engine.deposit(&caller, cash(amount)).await?;
            Ok::<_, LedgerError>(balance_of(&engine, OWNER_ACT).await)
        });
        prop_assert_eq!(after, Ok(start + amount));
    }

    #[test]
    fn prop_withdraw_never_overdraws(start in balance(), amount in positive_amount()) {
        let (engine, caller) = setup(start, Decimal::ZERO, Decimal::MAX);
        let (result, after) = block_on(async {
            let result = engine.withdraw(&caller, cash(amount)).await;
            (result, balance_of(&engine, OWNER_ACT).await)
        });

        if amount <= start {
            prop_assert!(result.is_ok());
            prop_assert_eq!(after, start - amount);
        } else {
            prop_assert_eq!(result.map_err(|e| e.kind()).err(), Some(ErrorKind::InsufficientFunds));
            prop_assert_eq!(after, start);
        }
        prop_assert!(after >= Decimal::ZERO);
    }

    #[test]
    fn prop_transfer_conserves_total(
        owner in balance(),
        other in balance(),
        limit in positive_amount(),
        amount in positive_amount(),
    ) {
        let (engine, caller) = setup(owner, other, limit);
        let (result, owner_after, other_after) = block_on(async {
            let result = engine.transfer(&caller, transfer(OTHER_ACT, amount)).await;
            (
                result,
                balance_of(&engine, OWNER_ACT).await,
                balance_of(&engine, OTHER_ACT).await,
            )
        });

        prop_assert_eq!(owner_after + other_after, owner + other);
        if result.is_ok() {
            prop_assert_eq!(owner_after, owner - amount);
        } else {
            prop_assert_eq!(owner_after, owner);
        }
    }

    #[test]
    fn prop_same_account_always_invalid(start in balance(), amount in any::<i64>()) {
        let (engine, caller) = setup(start, Decimal::ZERO, Decimal::MAX);
        let result = block_on(engine.transfer(&caller, transfer(OWNER_ACT, Decimal::new(amount, 2))));
        let err = result.err();
        prop_assert_eq!(err.as_ref().map(LedgerError::kind), Some(ErrorKind::InvalidArgument));
        prop_assert_eq!(err, Some(LedgerError::SameAccount));
    }

    #[test]
    fn prop_limit_blocks_larger_amounts(limit in positive_amount(), excess in positive_amount()) {
        let amount = limit + excess;
        // Enough balance that only the limit can reject.
        let (engine, caller) = setup(amount, Decimal::ZERO, limit);
        let (result, after) = block_on(async {
            let result = engine.transfer(&caller, transfer(OTHER_ACT, amount)).await;
            (result, balance_of(&engine, OWNER_ACT).await)
        });

        prop_assert_eq!(result.map_err(|e| e.kind()).err(), Some(ErrorKind::LimitExceeded));
        prop_assert_eq!(after, amount);
    }

    #[test]
    fn prop_sub_cent_transfer_rejected(
        owner in balance(),
        other in balance(),
        amount in sub_cent_amount(),
    ) {
        let (engine, caller) = setup(owner, other, Decimal::MAX);
        let (result, owner_after, other_after) = block_on(async {
            let result = engine.transfer(&caller, transfer(OTHER_ACT, amount)).await;
            (
                result,
                balance_of(&engine, OWNER_ACT).await,
                balance_of(&engine, OTHER_ACT).await,
            )
        });

        prop_assert_eq!(result.map_err(|e| e.kind()).err(), Some(ErrorKind::InvalidArgument));
        prop_assert_eq!(owner_after, owner);
        prop_assert_eq!(other_after, other);
        prop_assert_eq!(owner_after + other_after, owner + other);
    }
}
