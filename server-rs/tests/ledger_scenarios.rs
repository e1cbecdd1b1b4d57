//! Ledger and verification scenarios against a real PostgreSQL.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test`; skipped otherwise.

use ecoverse_api::error::AppError;
use ecoverse_api::models::{Decision, MissionStatus, Role, Tier};
use ecoverse_api::services::rewards::RewardPolicy;
use ecoverse_api::services::{activities, circles, missions, shop, tiers, tours, verification};

mod common;

#[tokio::test]
async fn test_first_approval_pays_reward_and_starts_streak() {
    require_database!();
    let pool = common::test_db().await;
    let admin = common::insert_user(&pool, 0, Role::Admin).await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let activity_id = common::insert_activity(&pool, user.id, Some(2.0)).await;

    let outcome = verification::verify(
        &pool,
        &RewardPolicy::default(),
        activity_id,
        Decision::Approved,
        admin.id,
    )
    .await
    .unwrap();

    let payout = outcome.payout.expect("approval pays out");
    assert_eq!(payout.reward, 20);
    assert_eq!(payout.eco_coins, 20);
    assert_eq!(payout.streak, 1);
    assert_eq!(outcome.activity.reward, Some(20));
    assert_eq!(outcome.activity.verified_by, Some(admin.id));
    assert!(outcome.activity.verified_at.is_some());

    assert_eq!(tiers::reconcile(&pool, user.id).await.unwrap(), Tier::Base);

    let entries: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ledger_entries WHERE user_id = $1 AND kind = 'REWARD' AND reference_id = $2",
    )
    .bind(user.id)
    .bind(activity_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_second_verification_is_already_processed() {
    require_database!();
    let pool = common::test_db().await;
    let admin = common::insert_user(&pool, 0, Role::Admin).await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let activity_id = common::insert_activity(&pool, user.id, Some(1.0)).await;
    let policy = RewardPolicy::default();

    verification::verify(&pool, &policy, activity_id, Decision::Approved, admin.id)
        .await
        .unwrap();
    let balance = common::balance_of(&pool, user.id).await;

    for decision in [Decision::Approved, Decision::Rejected] {
        let err = verification::verify(&pool, &policy, activity_id, decision, admin.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyProcessed(_)));
    }
    assert_eq!(common::balance_of(&pool, user.id).await, balance);
}

#[tokio::test]
async fn test_reward_past_balance_limit_is_refused() {
    require_database!();
    let pool = common::test_db().await;
    let admin = common::insert_user(&pool, 0, Role::Admin).await;
    let user = common::insert_user(&pool, i64::MAX - 5, Role::Member).await;
    let activity_id = common::insert_activity(&pool, user.id, None).await;

    let err = verification::verify(
        &pool,
        &RewardPolicy::default(),
        activity_id,
        Decision::Approved,
        admin.id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(common::balance_of(&pool, user.id).await, i64::MAX - 5);

    let status: String =
        sqlx::query_scalar("SELECT status::TEXT FROM activities WHERE id = $1")
            .bind(activity_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "PENDING");
}

#[tokio::test]
async fn test_rejection_leaves_ledger_untouched() {
    require_database!();
    let pool = common::test_db().await;
    let admin = common::insert_user(&pool, 0, Role::Admin).await;
    let user = common::insert_user(&pool, 300, Role::Member).await;
    let activity_id = common::insert_activity(&pool, user.id, Some(5.0)).await;

    let outcome = verification::verify(
        &pool,
        &RewardPolicy::default(),
        activity_id,
        Decision::Rejected,
        admin.id,
    )
    .await
    .unwrap();
    assert!(outcome.payout.is_none());
    assert_eq!(outcome.activity.reward, None);

    let (eco_coins, streak, tier): (i64, i32, Tier) =
        sqlx::query_as("SELECT eco_coins, streak, tier FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!((eco_coins, streak, tier), (300, 0, Tier::Base));

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_purchase_debits_and_tier_drops() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 600, Role::Member).await;
    assert_eq!(user.tier, Tier::Silver);
    let item_id = common::insert_shop_item(&pool, 200, 5).await;

    let order = shop::create_order(&pool, user.id, item_id, None).await.unwrap();
    assert_eq!(order.quantity, 1);
    assert_eq!(order.total_cost, 200);
    assert_eq!(order.status, "PENDING");

    assert_eq!(common::balance_of(&pool, user.id).await, 400);
    assert_eq!(tiers::reconcile(&pool, user.id).await.unwrap(), Tier::Base);

    let stock: i32 = sqlx::query_scalar("SELECT stock FROM shop_items WHERE id = $1")
        .bind(item_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stock, 4);
}

#[tokio::test]
async fn test_insufficient_balance_creates_nothing() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 50, Role::Member).await;
    let item_id = common::insert_shop_item(&pool, 200, 5).await;

    let err = shop::create_order(&pool, user.id, item_id, Some(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientBalance {
            required: 200,
            available: 50
        }
    ));

    assert_eq!(common::balance_of(&pool, user.id).await, 50);
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop_orders WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn test_balance_is_checked_before_stock() {
    require_database!();
    let pool = common::test_db().await;
    let poor = common::insert_user(&pool, 50, Role::Member).await;
    let rich = common::insert_user(&pool, 600, Role::Member).await;
    let item_id = common::insert_shop_item(&pool, 200, 0).await;

    let err = shop::create_order(&pool, poor.id, item_id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientBalance {
            required: 200,
            available: 50
        }
    ));

    let err = shop::create_order(&pool, rich.id, item_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Insufficient stock"));
    assert_eq!(common::balance_of(&pool, rich.id).await, 600);

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE user_id = $1")
        .bind(rich.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_tour_booking_debits_ticket_total() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 1000, Role::Member).await;
    let tour_id = common::insert_tour(&pool, 150).await;
    let date = chrono::Utc::now() + chrono::Duration::days(14);

    let booking = tours::book(&pool, user.id, tour_id, Some(3), date).await.unwrap();
    assert_eq!(booking.tickets, 3);
    assert_eq!(booking.total_cost, 450);
    assert_eq!(booking.status, "PENDING");
    assert_eq!(common::balance_of(&pool, user.id).await, 550);

    let kind: String = sqlx::query_scalar(
        "SELECT kind::TEXT FROM ledger_entries WHERE user_id = $1 AND reference_id = $2",
    )
    .bind(user.id)
    .bind(booking.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(kind, "TOUR_BOOKING");

    let mine = tours::list_bookings(&pool, user.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, booking.id);
}

#[tokio::test]
async fn test_tour_booking_without_funds_writes_nothing() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 100, Role::Member).await;
    let tour_id = common::insert_tour(&pool, 150).await;

    let err = tours::book(&pool, user.id, tour_id, None, chrono::Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientBalance {
            required: 150,
            available: 100
        }
    ));

    assert_eq!(common::balance_of(&pool, user.id).await, 100);
    let bookings: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM agri_tour_bookings WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(bookings, 0);

    let err = tours::book(&pool, user.id, uuid::Uuid::new_v4(), None, chrono::Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_purchases_never_overdraw() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 600, Role::Member).await;
    let item_id = common::insert_shop_item(&pool, 400, 10).await;
    let user_id = user.id;

    let a = tokio::spawn({
        let pool = pool.clone();
        async move { shop::create_order(&pool, user_id, item_id, None).await }
    });
    let b = tokio::spawn({
        let pool = pool.clone();
        async move { shop::create_order(&pool, user_id, item_id, None).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert_eq!(common::balance_of(&pool, user.id).await, 200);
}

#[tokio::test]
async fn test_duplicate_mission_join_conflicts() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let mission_id = common::insert_mission(&pool, 50).await;

    missions::join(&pool, user.id, mission_id).await.unwrap();
    let err = missions::join(&pool, user.id, mission_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Already joined"));

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_missions WHERE user_id = $1 AND mission_id = $2",
    )
    .bind(user.id)
    .bind(mission_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_duplicate_circle_join_conflicts() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let circle_id = common::insert_circle(&pool).await;

    let membership = circles::join(&pool, user.id, circle_id).await.unwrap();
    assert_eq!(membership.role, "MEMBER");
    let err = circles::join(&pool, user.id, circle_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Already joined"));

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_eco_circles WHERE user_id = $1 AND circle_id = $2",
    )
    .bind(user.id)
    .bind(circle_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);

    let listed = circles::list(&pool).await.unwrap();
    let circle = listed.iter().find(|c| c.id == circle_id).unwrap();
    assert_eq!(circle.member_count, 1);

    let err = circles::join(&pool, user.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_review_queue_is_oldest_first_and_history_newest_first() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let older = common::insert_activity(&pool, user.id, None).await;
    let newer = common::insert_activity(&pool, user.id, None).await;
    common::set_submitted_at(&pool, older, "2001-01-01T00:00:00Z").await;
    common::set_submitted_at(&pool, newer, "2001-01-02T00:00:00Z").await;

    let queue = activities::list_pending(&pool, 100, 0).await.unwrap();
    let queued: Vec<_> = queue
        .iter()
        .map(|p| p.activity.id)
        .filter(|id| *id == older || *id == newer)
        .collect();
    assert_eq!(queued, vec![older, newer]);
    let row = queue.iter().find(|p| p.activity.id == older).unwrap();
    assert_eq!(row.submitter_name, "Tester");

    let history = activities::list_mine(&pool, user.id).await.unwrap();
    let ids: Vec<_> = history.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![newer, older]);
}

#[tokio::test]
async fn test_mission_reward_is_credited_once() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let mission_id = common::insert_mission(&pool, 50).await;
    missions::join(&pool, user.id, mission_id).await.unwrap();

    let first = missions::update_progress(
        &pool,
        user.id,
        mission_id,
        None,
        Some(MissionStatus::Completed),
    )
    .await
    .unwrap();
    assert_eq!(first.credited, Some(50));
    assert_eq!(first.membership.status, MissionStatus::Completed);
    assert_eq!(first.membership.progress, 100);

    let second = missions::update_progress(
        &pool,
        user.id,
        mission_id,
        Some(10),
        Some(MissionStatus::Completed),
    )
    .await
    .unwrap();
    assert_eq!(second.credited, None);
    assert_eq!(second.membership.progress, 100);

    assert_eq!(common::balance_of(&pool, user.id).await, 50);
}

#[tokio::test]
async fn test_progress_without_membership_is_not_found() {
    require_database!();
    let pool = common::test_db().await;
    let user = common::insert_user(&pool, 0, Role::Member).await;
    let mission_id = common::insert_mission(&pool, 50).await;

    let err = missions::update_progress(&pool, user.id, mission_id, Some(40), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
