use fevm_economics::{AccountAddress, BalanceManager, MemoryStorage, TokenAmount};
use proptest::prelude::*;
use std::sync::Arc;

fn setup() -> Arc<BalanceManager> {
    Arc::new(BalanceManager::new(Arc::new(MemoryStorage::new())))
}

#[tokio::test]
async fn test_transfer_records_history() {
    let balances = setup();
    let alice = AccountAddress::from_bytes([0xA1; 20]);
    let bob = AccountAddress::from_bytes([0xB0; 20]);

    balances.credit(alice, &TokenAmount::from_whole(10)).await.unwrap();
    let tx_hash = balances
        .transfer(alice, bob, &TokenAmount::from_whole(4))
        .await
        .unwrap();
    assert_eq!(tx_hash.len(), 64);

    assert_eq!(balances.get_balance(alice).await.unwrap(), TokenAmount::from_whole(6));
    assert_eq!(balances.get_balance(bob).await.unwrap(), TokenAmount::from_whole(4));

    let history = balances.get_transfer_history(bob).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from, alice);
    assert_eq!(history[0].amount, TokenAmount::from_whole(4));
    assert_eq!(history[0].tx_hash, tx_hash);
}

#[tokio::test]
async fn test_self_transfer_rejected() {
    let balances = setup();
    let alice = AccountAddress::from_bytes([0xA1; 20]);
    balances.credit(alice, &TokenAmount::from_whole(1)).await.unwrap();
    assert!(balances
        .transfer(alice, alice, &TokenAmount::from_whole(1))
        .await
        .is_err());
}

#[tokio::test]
async fn test_concurrent_transfers_conserve_supply() {
    let balances = setup();
    let source = AccountAddress::from_bytes([0x01; 20]);
    balances.credit(source, &TokenAmount::from_whole(100)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20u8 {
        let balances = balances.clone();
        handles.push(tokio::spawn(async move {
            let dest = AccountAddress::from_bytes([0x10 + i; 20]);
            balances.transfer(source, dest, &TokenAmount::from_whole(7)).await
        }));
    }

    let mut succeeded = 0u64;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    // 100 / 7 = 14 transfers fit
    assert_eq!(succeeded, 14);
    let mut total = balances.get_balance(source).await.unwrap();
    for i in 0..20u8 {
        let dest = AccountAddress::from_bytes([0x10 + i; 20]);
        total = total
            .checked_add(&balances.get_balance(dest).await.unwrap())
            .unwrap();
    }
    assert_eq!(total, TokenAmount::from_whole(100));
}

#[test]
fn test_amount_serde_as_decimal_string() {
    let amount = TokenAmount::from_whole(2);
    let json = serde_json::to_string(&amount).unwrap();
    assert_eq!(json, "\"2000000000000000000\"");
    let back: TokenAmount = serde_json::from_str(&json).unwrap();
    assert_eq!(back, amount);
}

prop_compose! {
    fn arb_account_address()
        (bytes in prop::array::uniform20(any::<u8>())) -> AccountAddress {
        AccountAddress::from_bytes(bytes)
    }
}

proptest! {
    #[test]
    fn prop_address_hex_round_trip(addr in arb_account_address()) {
        prop_assert_eq!(AccountAddress::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn prop_checked_sub_inverts_add(a in any::<u128>(), b in any::<u128>()) {
        let x = TokenAmount::from_atto(a);
        let y = TokenAmount::from_atto(b);
        let sum = x.checked_add(&y).unwrap();
        prop_assert_eq!(sum.checked_sub(&y).unwrap(), x);
    }
}
