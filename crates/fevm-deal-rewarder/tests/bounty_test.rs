use fevm_deal_client::testing::MockSystemActor;
use fevm_deal_client::{
    DealClient, DealClientConfig, DealNotification, DealProposal, DealStatus, ExtraParamsV1,
    PieceCid, MARKET_ACTOR_ADDRESS,
};
use fevm_deal_rewarder::{DealRewarder, RewarderConfig, RewarderEvent};
use fevm_economics::{AccountAddress, BalanceManager, MemoryStorage, TokenAmount};
use std::sync::Arc;

const OWNER: [u8; 20] = [0x0A; 20];
const ESCROW: [u8; 20] = [0xEC; 20];
const FUNDER: [u8; 20] = [0xF0; 20];

struct Harness {
    registry: Arc<DealClient>,
    balances: Arc<BalanceManager>,
    rewarder: Arc<DealRewarder>,
    events: tokio::sync::mpsc::UnboundedReceiver<RewarderEvent>,
}

fn owner() -> AccountAddress {
    AccountAddress::from_bytes(OWNER)
}

fn funder() -> AccountAddress {
    AccountAddress::from_bytes(FUNDER)
}

fn escrow() -> AccountAddress {
    AccountAddress::from_bytes(ESCROW)
}

fn cid(tag: u8) -> PieceCid {
    PieceCid::new(vec![0x01, 0x81, 0xe2, 0x03, tag]).unwrap()
}

async fn setup() -> Harness {
    let _ = tracing_subscriber::fmt::try_init();

    let actor = Arc::new(MockSystemActor::new());
    let registry = Arc::new(DealClient::new(DealClientConfig::with_owner(owner()), actor));

    let balances = Arc::new(BalanceManager::new(Arc::new(MemoryStorage::new())));
    balances
        .credit(funder(), &TokenAmount::from_whole(100))
        .await
        .unwrap();

    let (rewarder, events) = DealRewarder::with_events(
        RewarderConfig::new(owner(), escrow()),
        registry.clone(),
        balances.clone(),
    );

    Harness {
        registry,
        balances,
        rewarder: Arc::new(rewarder),
        events,
    }
}

fn proposal(tag: u8, piece_size: u64) -> DealProposal {
    DealProposal {
        piece_cid: cid(tag),
        piece_size,
        verified_deal: true,
        label: String::new(),
        start_epoch: 100,
        end_epoch: 200,
        storage_price_per_epoch: TokenAmount::zero(),
        provider_collateral: TokenAmount::zero(),
        client_collateral: TokenAmount::zero(),
        extra_params_version: 1,
        extra_params: ExtraParamsV1 {
            location_ref: "https://example.com/piece.car".to_string(),
            car_size: piece_size / 2,
            skip_ipni_announce: false,
            remove_unsealed_copy: false,
        },
    }
}

/// Propose a piece and walk it to the given status
async fn deal_with_status(registry: &DealClient, tag: u8, size: u64, deal_id: u64, status: DealStatus) {
    registry.propose(owner(), proposal(tag, size)).await.unwrap();

    let market = AccountAddress::from_bytes(MARKET_ACTOR_ADDRESS);
    let notify = |status, deal_id| {
        DealNotification {
            piece_cid: cid(tag),
            deal_id,
            status,
            provider: None,
        }
        .encode()
        .unwrap()
    };

    registry
        .notify_deal(market, &notify(DealStatus::Published, Some(deal_id)))
        .await
        .unwrap();
    if status == DealStatus::Published {
        return;
    }
    registry
        .notify_deal(market, &notify(DealStatus::Activated, Some(deal_id)))
        .await
        .unwrap();
    if status == DealStatus::Terminated {
        registry
            .notify_deal(market, &notify(DealStatus::Terminated, None))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_claim_pays_client_once() {
    let mut h = setup().await;
    deal_with_status(&h.registry, 1, 2048, 11, DealStatus::Activated).await;

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(5), None)
        .await
        .unwrap();
    h.rewarder.add_bounty(owner(), cid(1), 2048).await.unwrap();

    let paid = h.rewarder.claim_bounty(funder(), 11).await.unwrap();
    assert_eq!(paid, TokenAmount::from_whole(1));
    assert_eq!(
        h.balances.get_balance(owner()).await.unwrap(),
        TokenAmount::from_whole(1)
    );
    assert_eq!(h.rewarder.escrow_balance().await.unwrap(), TokenAmount::from_whole(4));

    let bounty = h.rewarder.bounty(&cid(1)).await.unwrap();
    assert!(bounty.claimed);
    assert_eq!(bounty.claimed_by_deal, Some(11));

    // Second claim moves nothing
    let err = h.rewarder.claim_bounty(funder(), 11).await.unwrap_err();
    assert_eq!(err.code(), "already_claimed");
    assert_eq!(
        h.balances.get_balance(owner()).await.unwrap(),
        TokenAmount::from_whole(1)
    );
    assert_eq!(h.rewarder.escrow_balance().await.unwrap(), TokenAmount::from_whole(4));

    assert!(matches!(h.events.recv().await, Some(RewarderEvent::Funded { .. })));
    assert!(matches!(h.events.recv().await, Some(RewarderEvent::BountyAdded { .. })));
    match h.events.recv().await {
        Some(RewarderEvent::BountyClaimed { deal_id, recipient, .. }) => {
            assert_eq!(deal_id, 11);
            assert_eq!(recipient, owner());
        }
        other => panic!("expected claim event, got {:?}", other),
    }
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_claims_pay_once() {
    let h = setup().await;
    deal_with_status(&h.registry, 2, 1024, 21, DealStatus::Activated).await;
    h.rewarder
        .fund(funder(), TokenAmount::from_whole(10), None)
        .await
        .unwrap();
    h.rewarder.add_bounty(owner(), cid(2), 1024).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let rewarder = h.rewarder.clone();
        handles.push(tokio::spawn(async move {
            rewarder.claim_bounty(funder(), 21).await
        }));
    }

    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => paid += 1,
            Err(e) => assert_eq!(e.code(), "already_claimed"),
        }
    }
    assert_eq!(paid, 1);
    assert_eq!(h.rewarder.escrow_balance().await.unwrap(), TokenAmount::from_whole(9));
}

#[tokio::test]
async fn test_earmarked_funding_sets_reward() {
    let h = setup().await;
    deal_with_status(&h.registry, 3, 4096, 31, DealStatus::Activated).await;

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(3), Some(cid(3)))
        .await
        .unwrap();
    assert_eq!(h.rewarder.earmarked(&cid(3)).await, TokenAmount::from_whole(3));

    let bounty = h.rewarder.add_bounty(owner(), cid(3), 4096).await.unwrap();
    assert_eq!(bounty.reward, TokenAmount::from_whole(3));
    assert!(h.rewarder.earmarked(&cid(3)).await.is_zero());

    // Top up an open bounty
    h.rewarder
        .fund(funder(), TokenAmount::from_whole(2), Some(cid(3)))
        .await
        .unwrap();
    assert_eq!(
        h.rewarder.bounty(&cid(3)).await.unwrap().reward,
        TokenAmount::from_whole(5)
    );

    assert_eq!(
        h.rewarder.claim_bounty(funder(), 31).await.unwrap(),
        TokenAmount::from_whole(5)
    );

    // Paid bounties take no more funds
    let err = h
        .rewarder
        .fund(funder(), TokenAmount::from_whole(1), Some(cid(3)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "already_claimed");
    assert_eq!(
        h.balances.get_balance(funder()).await.unwrap(),
        TokenAmount::from_whole(95)
    );
}

#[tokio::test]
async fn test_claim_preconditions() {
    let h = setup().await;
    h.rewarder
        .fund(funder(), TokenAmount::from_whole(10), None)
        .await
        .unwrap();

    // Unknown deal
    let err = h.rewarder.claim_bounty(funder(), 404).await.unwrap_err();
    assert_eq!(err.code(), "not_found");

    // Activated deal, no bounty
    deal_with_status(&h.registry, 4, 2048, 41, DealStatus::Activated).await;
    let err = h.rewarder.claim_bounty(funder(), 41).await.unwrap_err();
    assert_eq!(err.code(), "not_found");

    // Size must match the bounty
    h.rewarder.add_bounty(owner(), cid(4), 4096).await.unwrap();
    let err = h.rewarder.claim_bounty(funder(), 41).await.unwrap_err();
    assert_eq!(
        err,
        fevm_deal_rewarder::RewarderError::SizeMismatch {
            expected: 4096,
            actual: 2048
        }
    );
    assert!(!h.rewarder.bounty(&cid(4)).await.unwrap().claimed);

    // Terminated deals are not eligible
    deal_with_status(&h.registry, 5, 2048, 51, DealStatus::Terminated).await;
    h.rewarder.add_bounty(owner(), cid(5), 2048).await.unwrap();
    let err = h.rewarder.claim_bounty(funder(), 51).await.unwrap_err();
    assert_eq!(err.code(), "not_activated");

    assert_eq!(h.rewarder.escrow_balance().await.unwrap(), TokenAmount::from_whole(10));
}

#[tokio::test]
async fn test_underfunded_escrow_keeps_bounty_open() {
    let h = setup().await;
    deal_with_status(&h.registry, 6, 2048, 61, DealStatus::Activated).await;

    // Nothing in escrow to back the default reward
    let err = h.rewarder.add_bounty(owner(), cid(6), 2048).await.unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
    assert!(h.rewarder.bounty(&cid(6)).await.is_err());

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(1), None)
        .await
        .unwrap();
    h.rewarder.add_bounty(owner(), cid(6), 2048).await.unwrap();
    assert_eq!(h.rewarder.reserved_balance().await, TokenAmount::from_whole(1));
    assert!(h.rewarder.unreserved_balance().await.unwrap().is_zero());

    // Escrow drained outside the rewarder
    h.balances
        .debit(escrow(), &TokenAmount::from_whole(1))
        .await
        .unwrap();
    let err = h.rewarder.claim_bounty(funder(), 61).await.unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
    assert!(!h.rewarder.bounty(&cid(6)).await.unwrap().claimed);

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(1), None)
        .await
        .unwrap();
    h.rewarder.claim_bounty(funder(), 61).await.unwrap();
    assert!(h.rewarder.escrow_balance().await.unwrap().is_zero());
    assert!(h.rewarder.reserved_balance().await.is_zero());
}

#[tokio::test]
async fn test_earmarked_funds_stay_with_their_piece() {
    let h = setup().await;
    deal_with_status(&h.registry, 10, 2048, 101, DealStatus::Activated).await;
    deal_with_status(&h.registry, 11, 2048, 111, DealStatus::Activated).await;

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(3), Some(cid(10)))
        .await
        .unwrap();
    h.rewarder.add_bounty(owner(), cid(10), 2048).await.unwrap();

    // The only escrow belongs to piece 10
    let err = h.rewarder.add_bounty(owner(), cid(11), 2048).await.unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
    assert_eq!(h.rewarder.claim_bounty(funder(), 111).await.unwrap_err().code(), "not_found");

    assert_eq!(
        h.rewarder.claim_bounty(funder(), 101).await.unwrap(),
        TokenAmount::from_whole(3)
    );

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(1), None)
        .await
        .unwrap();
    h.rewarder.add_bounty(owner(), cid(11), 2048).await.unwrap();
    assert_eq!(
        h.rewarder.claim_bounty(funder(), 111).await.unwrap(),
        TokenAmount::from_whole(1)
    );
    assert_eq!(
        h.balances.get_balance(owner()).await.unwrap(),
        TokenAmount::from_whole(4)
    );
    assert!(h.rewarder.escrow_balance().await.unwrap().is_zero());
    assert!(h.rewarder.reserved_balance().await.is_zero());
}

#[tokio::test]
async fn test_bounty_registration_rules() {
    let h = setup().await;

    let err = h
        .rewarder
        .add_bounty(funder(), cid(7), 2048)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");

    h.rewarder
        .fund(funder(), TokenAmount::from_whole(2), None)
        .await
        .unwrap();
    h.rewarder.add_bounty(owner(), cid(7), 2048).await.unwrap();
    let err = h
        .rewarder
        .add_bounty(owner(), cid(7), 1024)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "already_exists");
    assert_eq!(h.rewarder.bounty(&cid(7)).await.unwrap().piece_size, 2048);
    assert_eq!(h.rewarder.reserved_balance().await, TokenAmount::from_whole(1));

    assert_eq!(
        h.rewarder.bounty(&cid(8)).await.unwrap_err().code(),
        "not_found"
    );
}

#[tokio::test]
async fn test_fund_requires_balance() {
    let h = setup().await;
    let broke = AccountAddress::from_bytes([0x99; 20]);

    let err = h
        .rewarder
        .fund(broke, TokenAmount::from_whole(1), Some(cid(9)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "insufficient_funds");
    assert!(h.rewarder.earmarked(&cid(9)).await.is_zero());

    let err = h
        .rewarder
        .fund(escrow(), TokenAmount::from_whole(1), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");
}
