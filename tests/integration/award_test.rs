// tests/integration/award_test.rs

//! Award claims: tier ordering, replay protection and all-or-nothing grants.

use super::test_helpers::TestContext;
use anchorage::core::ResultKind;
use anchorage::core::persistence::ledger::{AWARD_KIND_ITEM, AWARD_KIND_RESOURCE, AwardLine};
use anchorage::core::protocol::messages::{Cs17005, Sc17006, ids};

const TRACK: u32 = 7;
const BROKEN_TRACK: u32 = 8;
const GOLD: u32 = 1;
const OIL: u32 = 2;
const BADGE: u32 = 40001;

fn line(track_id: u32, award_index: u32, line: u32, kind: u32, target_id: u32, count: u32) -> AwardLine {
    AwardLine {
        track_id,
        award_index,
        line,
        kind,
        target_id,
        count,
    }
}

async fn seeded() -> TestContext {
    let ctx = TestContext::new();
    ctx.seed_award_lines(vec![
        line(TRACK, 1, 1, AWARD_KIND_RESOURCE, GOLD, 50),
        line(TRACK, 1, 2, AWARD_KIND_ITEM, BADGE, 2),
        line(TRACK, 2, 1, AWARD_KIND_RESOURCE, OIL, 10),
        line(BROKEN_TRACK, 1, 1, AWARD_KIND_RESOURCE, GOLD, 100),
        line(BROKEN_TRACK, 1, 2, 99, 1, 1),
    ])
    .await;
    ctx
}

async fn claim(ctx: &TestContext, account: u32, track_id: u32, award_index: u32) -> Sc17006 {
    let session = ctx.state.find_session_by_account(account).unwrap();
    ctx.request(
        &session,
        ids::CS_CLAIM_AWARD,
        ids::SC_CLAIM_AWARD,
        &Cs17005 {
            track_id,
            award_index,
        },
    )
    .await
}

#[tokio::test]
async fn test_claim_grants_every_line() {
    let ctx = seeded().await;
    ctx.logged_in(1).await;
    let gold_before = ctx.resource(1, GOLD).await;

    let response = claim(&ctx, 1, TRACK, 1).await;
    assert_eq!(response.result, ResultKind::Success.code());
    assert_eq!(response.drop_list.len(), 2);
    assert_eq!(ctx.resource(1, GOLD).await, gold_before + 50);
    assert_eq!(ctx.item(1, BADGE).await, 2);
    assert_eq!(ctx.last_award(1, TRACK).await, 1);
}

#[tokio::test]
async fn test_second_claim_is_rejected() {
    let ctx = seeded().await;
    ctx.logged_in(1).await;
    let gold_before = ctx.resource(1, GOLD).await;

    claim(&ctx, 1, TRACK, 1).await;
    let replay = claim(&ctx, 1, TRACK, 1).await;
    assert_eq!(replay.result, ResultKind::AlreadyClaimed.code());
    assert!(replay.drop_list.is_empty());
    assert_eq!(ctx.resource(1, GOLD).await, gold_before + 50);
    assert_eq!(ctx.item(1, BADGE).await, 2);
}

#[tokio::test]
async fn test_tiers_must_be_claimed_in_order() {
    let ctx = seeded().await;
    ctx.logged_in(1).await;

    let skipped = claim(&ctx, 1, TRACK, 2).await;
    assert_eq!(skipped.result, ResultKind::InvalidRequest.code());
    assert_eq!(ctx.last_award(1, TRACK).await, 0);

    claim(&ctx, 1, TRACK, 1).await;
    let next = claim(&ctx, 1, TRACK, 2).await;
    assert_eq!(next.result, ResultKind::Success.code());
    assert_eq!(ctx.last_award(1, TRACK).await, 2);
}

#[tokio::test]
async fn test_partial_failure_rolls_back_everything() {
    let ctx = seeded().await;
    ctx.logged_in(1).await;
    let gold_before = ctx.resource(1, GOLD).await;

    let response = claim(&ctx, 1, BROKEN_TRACK, 1).await;
    assert_eq!(response.result, ResultKind::Failed.code());
    assert!(response.drop_list.is_empty());
    assert_eq!(ctx.resource(1, GOLD).await, gold_before);
    assert_eq!(ctx.last_award(1, BROKEN_TRACK).await, 0);
}

#[tokio::test]
async fn test_unknown_tier_and_zero_index() {
    let ctx = seeded().await;
    ctx.logged_in(1).await;

    let unknown = claim(&ctx, 1, 999, 1).await;
    assert_eq!(unknown.result, ResultKind::NotFound.code());

    let zero = claim(&ctx, 1, TRACK, 0).await;
    assert_eq!(zero.result, ResultKind::InvalidRequest.code());
}

#[tokio::test]
async fn test_progress_is_per_commander() {
    let ctx = seeded().await;
    ctx.logged_in(1).await;
    ctx.logged_in(2).await;

    assert_eq!(claim(&ctx, 1, TRACK, 1).await.result, ResultKind::Success.code());
    assert_eq!(claim(&ctx, 2, TRACK, 1).await.result, ResultKind::Success.code());
}
