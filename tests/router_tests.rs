/// Dual-write router tests
///
/// Phase-by-phase write visibility, best-effort secondary failures and
/// unknown-phase rejection.
/// Run with: cargo test --test router_tests
mod common;

use std::sync::Arc;

use common::{as_store, Counter, FlakyStore};
use dualsync::{DualWriteStore, EntityStore, Phase, PhaseCell, SyncError};
use tokio_test::assert_ok;

fn setup(phase: Phase) -> (Arc<FlakyStore<Counter>>, Arc<FlakyStore<Counter>>, DualWriteStore<Counter>) {
    let src = Arc::new(FlakyStore::new());
    let dst = Arc::new(FlakyStore::new());
    let router = DualWriteStore::new(as_store(&src), as_store(&dst), Arc::new(PhaseCell::new(phase)));
    (src, dst, router)
}

#[tokio::test]
async fn test_src_only_writes_source_only() {
    let (src, dst, router) = setup(Phase::SrcOnly);

    assert_ok!(router.upsert(&Counter::new(1, 10)).await);

    assert!(src.store().get(1).await.unwrap().is_some());
    assert!(dst.store().get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_src_first_writes_both() {
    let (src, dst, router) = setup(Phase::SrcFirst);

    assert_ok!(router.upsert(&Counter::new(1, 10)).await);

    assert!(src.store().get(1).await.unwrap().is_some());
    assert!(dst.store().get(1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_dst_first_writes_both() {
    let (src, dst, router) = setup(Phase::DstFirst);

    assert_ok!(router.upsert(&Counter::new(1, 10)).await);

    assert!(src.store().get(1).await.unwrap().is_some());
    assert!(dst.store().get(1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_dst_only_writes_target_only() {
    let (src, dst, router) = setup(Phase::DstOnly);

    assert_ok!(router.upsert(&Counter::new(1, 10)).await);

    assert!(src.store().get(1).await.unwrap().is_none());
    assert!(dst.store().get(1).await.unwrap().is_some());
}

// Scenario: src_first, source write succeeds, target write fails. The
// business outcome is success; the target is simply left behind for the
// validator to catch.
#[tokio::test]
async fn test_src_first_swallows_target_failure() {
    let (src, dst, router) = setup(Phase::SrcFirst);
    dst.fail_writes(true);

    assert_ok!(router.upsert(&Counter::new(7, 3)).await);

    assert_eq!(src.store().get(7).await.unwrap().unwrap().likes, 3);
    assert!(dst.store().get(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_src_first_propagates_source_failure() {
    let (src, dst, router) = setup(Phase::SrcFirst);
    src.fail_writes(true);

    let err = router.upsert(&Counter::new(7, 3)).await.unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));

    assert!(src.store().get(7).await.unwrap().is_none());
    assert!(dst.store().get(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_dst_first_swallows_source_failure() {
    let (src, dst, router) = setup(Phase::DstFirst);
    src.fail_writes(true);

    assert_ok!(router.upsert(&Counter::new(7, 3)).await);

    assert!(src.store().get(7).await.unwrap().is_none());
    assert_eq!(dst.store().get(7).await.unwrap().unwrap().likes, 3);
}

#[tokio::test]
async fn test_dst_first_propagates_target_failure() {
    let (src, dst, router) = setup(Phase::DstFirst);
    dst.fail_writes(true);

    assert!(router.upsert(&Counter::new(7, 3)).await.is_err());
    assert!(src.store().get(7).await.unwrap().is_none());
    assert!(dst.store().get(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_batch_writes_follow_phase_contract() {
    let rows = vec![Counter::new(1, 10), Counter::new(2, 20)];

    let (src, dst, router) = setup(Phase::SrcFirst);
    dst.fail_writes(true);
    assert_ok!(router.upsert_many(&rows).await);
    assert_eq!(src.store().len().await, 2);
    assert_eq!(dst.store().len().await, 0);

    let (src, dst, router) = setup(Phase::DstOnly);
    assert_ok!(router.upsert_many(&rows).await);
    assert_eq!(src.store().len().await, 0);
    assert_eq!(dst.store().len().await, 2);
}

#[tokio::test]
async fn test_delete_routed_like_other_writes() {
    let (src, dst, router) = setup(Phase::SrcFirst);
    src.seed(&[Counter::new(1, 10)]).await;
    dst.seed(&[Counter::new(1, 10)]).await;

    assert_ok!(router.delete(1).await);
    assert!(src.store().get(1).await.unwrap().is_none());
    assert!(dst.store().get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reads_route_to_authoritative_store() {
    let src = Arc::new(FlakyStore::new());
    let dst = Arc::new(FlakyStore::new());
    src.seed(&[Counter::new(1, 111)]).await;
    dst.seed(&[Counter::new(1, 222)]).await;

    let phase = Arc::new(PhaseCell::new(Phase::SrcFirst));
    let router = DualWriteStore::new(as_store(&src), as_store(&dst), phase.clone());

    assert_eq!(router.get(1).await.unwrap().unwrap().likes, 111);

    phase.store(Phase::DstFirst);
    assert_eq!(router.get(1).await.unwrap().unwrap().likes, 222);

    phase.store(Phase::DstOnly);
    assert_eq!(router.get_many(&[1]).await.unwrap()[0].likes, 222);
}

// A raw tag outside the four defined phases is a configuration bug: the
// write must fail fast and touch neither store.
#[tokio::test]
async fn test_unknown_phase_touches_neither_store() {
    let src = Arc::new(FlakyStore::new());
    let dst = Arc::new(FlakyStore::new());
    let phase = Arc::new(PhaseCell::new(Phase::SrcOnly));
    let router = DualWriteStore::new(as_store(&src), as_store(&dst), phase.clone());

    phase.store_raw(42);

    let err = router.upsert(&Counter::new(1, 10)).await.unwrap_err();
    assert!(matches!(err, SyncError::UnknownPhase(42)));
    assert!(matches!(
        router.get(1).await.unwrap_err(),
        SyncError::UnknownPhase(42)
    ));
    assert!(matches!(
        router.delete_many(&[1]).await.unwrap_err(),
        SyncError::UnknownPhase(42)
    ));

    assert_eq!(src.store().len().await, 0);
    assert_eq!(dst.store().len().await, 0);

    // Recovery is a plain phase swap away.
    phase.store(Phase::SrcOnly);
    assert_ok!(router.upsert(&Counter::new(1, 10)).await);
}

// The phase cell is hot-swappable: the next write after a swap observes the
// new phase, with no restart or drain.
#[tokio::test]
async fn test_phase_swap_applies_to_next_write() {
    let src = Arc::new(FlakyStore::new());
    let dst = Arc::new(FlakyStore::new());
    let phase = Arc::new(PhaseCell::new(Phase::SrcOnly));
    let router = DualWriteStore::new(as_store(&src), as_store(&dst), phase.clone());

    assert_ok!(router.upsert(&Counter::new(1, 10)).await);
    assert!(dst.store().get(1).await.unwrap().is_none());

    phase.store(Phase::DstOnly);

    assert_ok!(router.upsert(&Counter::new(2, 20)).await);
    assert!(src.store().get(2).await.unwrap().is_none());
    assert!(dst.store().get(2).await.unwrap().is_some());
}
