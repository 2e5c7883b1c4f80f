// tests/integration/shop_test.rs

//! Shop purchases: version check, stock guard, and debit-plus-grant atomicity.

use super::test_helpers::{TestContext, take_frames};
use anchorage::core::ResultKind;
use anchorage::core::commands::shop::MAX_PURCHASE_COUNT;
use anchorage::core::handler::DispatchOutcome;
use anchorage::core::persistence::ledger::{AWARD_KIND_ITEM, ShopOffer};
use anchorage::core::protocol::messages::{Cs16001, Sc16002, ids};
use std::sync::Arc;

const GOLD: u32 = 1;
const STARTING_GOLD: u32 = 3000;
const OFFER: u32 = 501;
const ITEM: u32 = 30001;

fn offer(stock: u32, price: u32) -> ShopOffer {
    ShopOffer {
        offer_id: OFFER,
        resource_id: GOLD,
        price,
        item_id: ITEM,
        item_count: 2,
        stock,
        version: 3,
    }
}

fn purchase(count: u32, cache_version: u32) -> Cs16001 {
    Cs16001 {
        offer_id: OFFER,
        count,
        cache_version,
    }
}

async fn buy(ctx: &TestContext, account: u32, request: Cs16001) -> Sc16002 {
    let session = ctx.state.find_session_by_account(account).unwrap();
    ctx.request(&session, ids::CS_SHOP_PURCHASE, ids::SC_SHOP_PURCHASE, &request)
        .await
}

#[tokio::test]
async fn test_successful_purchase() {
    let ctx = TestContext::new();
    ctx.logged_in(1).await;
    ctx.seed_offer(offer(5, 100)).await;

    let response = buy(&ctx, 1, purchase(2, 3)).await;
    assert_eq!(response.result, ResultKind::Success.code());
    assert_eq!(response.remaining_stock, Some(3));
    assert_eq!(response.drop_list.len(), 1);
    assert_eq!(response.drop_list[0].kind, AWARD_KIND_ITEM);
    assert_eq!(response.drop_list[0].id, ITEM);
    assert_eq!(response.drop_list[0].count, 4);

    assert_eq!(ctx.resource(1, GOLD).await, STARTING_GOLD - 200);
    assert_eq!(ctx.item(1, ITEM).await, 4);
    assert_eq!(ctx.stock(OFFER).await, Some(3));
}

#[tokio::test]
async fn test_stale_cache_changes_nothing() {
    let ctx = TestContext::new();
    ctx.logged_in(1).await;
    ctx.seed_offer(offer(5, 100)).await;

    let response = buy(&ctx, 1, purchase(1, 2)).await;
    assert_eq!(response.result, ResultKind::StaleCache.code());
    assert!(response.drop_list.is_empty());
    assert_eq!(ctx.resource(1, GOLD).await, STARTING_GOLD);
    assert_eq!(ctx.stock(OFFER).await, Some(5));
}

#[tokio::test]
async fn test_insufficient_funds_restores_stock() {
    let ctx = TestContext::new();
    ctx.logged_in(1).await;
    ctx.seed_offer(offer(5, STARTING_GOLD + 1)).await;

    let response = buy(&ctx, 1, purchase(1, 3)).await;
    assert_eq!(response.result, ResultKind::InsufficientResources.code());
    // The stock decrement ran first and must have been rolled back.
    assert_eq!(ctx.stock(OFFER).await, Some(5));
    assert_eq!(ctx.resource(1, GOLD).await, STARTING_GOLD);
    assert_eq!(ctx.item(1, ITEM).await, 0);
}

#[tokio::test]
async fn test_out_of_stock() {
    let ctx = TestContext::new();
    ctx.logged_in(1).await;
    ctx.seed_offer(offer(1, 10)).await;

    let response = buy(&ctx, 1, purchase(2, 3)).await;
    assert_eq!(response.result, ResultKind::StockExhausted.code());
    assert_eq!(ctx.resource(1, GOLD).await, STARTING_GOLD);
}

#[tokio::test]
async fn test_invalid_counts_and_unknown_offer() {
    let ctx = TestContext::new();
    ctx.logged_in(1).await;
    ctx.seed_offer(offer(5, 1)).await;

    let zero = buy(&ctx, 1, purchase(0, 3)).await;
    assert_eq!(zero.result, ResultKind::InvalidRequest.code());

    let too_many = buy(&ctx, 1, purchase(MAX_PURCHASE_COUNT + 1, 3)).await;
    assert_eq!(too_many.result, ResultKind::InvalidRequest.code());

    let missing = buy(
        &ctx,
        1,
        Cs16001 {
            offer_id: 9999,
            count: 1,
            cache_version: 1,
        },
    )
    .await;
    assert_eq!(missing.result, ResultKind::NotFound.code());
}

#[tokio::test]
async fn test_purchase_requires_login() {
    let ctx = TestContext::new();
    ctx.seed_offer(offer(5, 1)).await;
    let session = ctx.session();

    let outcome = ctx
        .dispatch(&session, ids::CS_SHOP_PURCHASE, 1, &purchase(1, 3))
        .await;
    assert_eq!(outcome, DispatchOutcome::Unauthenticated(ids::CS_SHOP_PURCHASE));
    assert!(take_frames(&session).is_empty());
    assert_eq!(ctx.stock(OFFER).await, Some(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_sold_once() {
    let ctx = Arc::new(TestContext::new());
    ctx.logged_in(1).await;
    ctx.logged_in(2).await;
    ctx.seed_offer(offer(1, 100)).await;

    let (a, b) = tokio::join!(
        {
            let ctx = ctx.clone();
            async move { buy(&ctx, 1, purchase(1, 3)).await }
        },
        {
            let ctx = ctx.clone();
            async move { buy(&ctx, 2, purchase(1, 3)).await }
        }
    );

    let mut results = [a.result, b.result];
    results.sort_unstable();
    assert_eq!(
        results,
        [
            ResultKind::Success.code(),
            ResultKind::StockExhausted.code()
        ]
    );
    assert_eq!(ctx.stock(OFFER).await, Some(0));

    let spent = (STARTING_GOLD - ctx.resource(1, GOLD).await)
        + (STARTING_GOLD - ctx.resource(2, GOLD).await);
    assert_eq!(spent, 100);
}
