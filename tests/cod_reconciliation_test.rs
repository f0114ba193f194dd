mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{actor, TestApp};
use parcelflow_api::{
    auth::{Actor, ActorRole},
    entities::{
        order::OrderStatus,
        payment_submission::SubmissionStatus,
        transaction::{TransactionKind, TransactionPurpose, TransactionStatus},
    },
    errors::ServiceError,
    services::{
        orders::DeliverOrderRequest,
        payment_submissions::{ListSubmissionsQuery, ReconcileRequest, SubmitCodRequest},
        transactions::ListLedgerQuery,
    },
};

fn submit(order_ids: Vec<Uuid>, total: Decimal) -> SubmitCodRequest {
    SubmitCodRequest {
        order_ids,
        total_amount_submitted: total,
        notes: None,
    }
}

fn reconcile(status: SubmissionStatus, adjusted_amount: Option<Decimal>) -> ReconcileRequest {
    ReconcileRequest {
        status,
        adjusted_amount,
        notes: None,
    }
}

#[tokio::test]
async fn short_handover_is_recorded_as_a_discrepancy() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let ids = app.delivered_orders(&agent, 5, dec!(100000)).await;

    let submission = app
        .services
        .submissions
        .submit(&agent, submit(ids.clone(), dec!(480000)))
        .await
        .unwrap();

    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.expected_amount, dec!(500000));
    assert_eq!(submission.total_amount_submitted, dec!(480000));
    assert_eq!(submission.discrepancy, dec!(-20000));
    assert_eq!(submission.office_id, app.saigon_hub);
    assert_eq!(submission.order_id_list(), ids);
}

#[tokio::test]
async fn delivery_records_what_was_collected() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let ids = app.arrived_orders(1, dec!(100000)).await;

    let delivery = app
        .services
        .orders
        .deliver_order(
            &agent,
            ids[0],
            DeliverOrderRequest {
                amount_collected: dec!(90000),
                actual_recipient: "Neighbour".to_string(),
                note: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(delivery.order.actual_recipient.as_deref(), Some("Neighbour"));
    assert!(delivery.order.delivered_at.is_some());
    assert_eq!(delivery.collection.expected_amount, dec!(100000));
    assert_eq!(delivery.collection.discrepancy, dec!(-10000));
    assert_eq!(delivery.collection.office_id, app.saigon_hub);

    // The Hanoi office does not hand over Saigon parcels.
    let more = app.arrived_orders(1, dec!(100000)).await;
    let hanoi_agent = actor(ActorRole::DeliveryAgent, Some(app.hanoi_hub));
    assert_matches!(
        app.services
            .orders
            .deliver_order(
                &hanoi_agent,
                more[0],
                DeliverOrderRequest {
                    amount_collected: dec!(100000),
                    actual_recipient: "Tran Thi B".to_string(),
                    note: None,
                },
            )
            .await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn no_cod_order_cannot_collect_cash() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let ids = app.arrived_orders(1, dec!(0)).await;
    let handover = |amount_collected| DeliverOrderRequest {
        amount_collected,
        actual_recipient: "Tran Thi B".to_string(),
        note: None,
    };

    assert_matches!(
        app.services
            .orders
            .deliver_order(&agent, ids[0], handover(dec!(5000)))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    let order = app.services.orders.get_order(&agent, ids[0]).await.unwrap();
    assert_eq!(order.status, OrderStatus::ArrivedAtOffice);

    let delivery = app
        .services
        .orders
        .deliver_order(&agent, ids[0], handover(Decimal::ZERO))
        .await
        .unwrap();
    assert_eq!(delivery.order.status, OrderStatus::Delivered);
    assert!(delivery.collection.discrepancy.is_zero());
}

#[tokio::test]
async fn confirmed_submission_posts_revenue_to_the_ledger() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let finance = app.finance();
    let ids = app.delivered_orders(&agent, 2, dec!(100000)).await;
    let submission = app
        .services
        .submissions
        .submit(&agent, submit(ids, dec!(200000)))
        .await
        .unwrap();

    let outcome = app
        .services
        .submissions
        .reconcile(&finance, submission.id, reconcile(SubmissionStatus::Confirmed, None))
        .await
        .unwrap();
    assert_eq!(outcome.submission.status, SubmissionStatus::Confirmed);
    assert_eq!(outcome.submission.reconciled_by, Some(finance.user_id));

    let entry = outcome.ledger_entry.expect("revenue transfer");
    assert_eq!(entry.kind, TransactionKind::Income);
    assert_eq!(entry.purpose, TransactionPurpose::RevenueTransfer);
    assert_eq!(entry.amount, dec!(200000));
    assert_eq!(entry.status, TransactionStatus::Pending);
    assert_eq!(entry.payment_submission_id, Some(submission.id));

    let (entries, total, _, _) = app
        .services
        .ledger
        .list(&finance, ListLedgerQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].id, entry.id);

    let resolved = app.services.ledger.confirm(&finance, entry.id).await.unwrap();
    assert_eq!(resolved.status, TransactionStatus::Confirmed);

    assert_matches!(
        app.services
            .submissions
            .reconcile(&finance, submission.id, reconcile(SubmissionStatus::Rejected, None))
            .await,
        Err(ServiceError::InvalidState(_))
    );
}

#[tokio::test]
async fn adjustment_posts_the_accepted_amount() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let finance = app.finance();
    let ids = app.delivered_orders(&agent, 2, dec!(100000)).await;
    let submission = app
        .services
        .submissions
        .submit(&agent, submit(ids, dec!(180000)))
        .await
        .unwrap();
    let submissions = &app.services.submissions;

    assert_matches!(
        submissions
            .reconcile(&finance, submission.id, reconcile(SubmissionStatus::Adjusted, None))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        submissions
            .reconcile(
                &finance,
                submission.id,
                reconcile(SubmissionStatus::Confirmed, Some(dec!(1)))
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        submissions
            .reconcile(&finance, submission.id, reconcile(SubmissionStatus::Pending, None))
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let outcome = submissions
        .reconcile(
            &finance,
            submission.id,
            reconcile(SubmissionStatus::Adjusted, Some(dec!(190000))),
        )
        .await
        .unwrap();
    assert_eq!(outcome.submission.adjusted_amount, Some(dec!(190000)));
    assert_eq!(outcome.ledger_entry.map(|e| e.amount), Some(dec!(190000)));
}

#[tokio::test]
async fn rejection_releases_orders_for_resubmission() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let finance = app.finance();
    let ids = app.delivered_orders(&agent, 2, dec!(100000)).await;
    let submissions = &app.services.submissions;

    let first = submissions
        .submit(&agent, submit(ids.clone(), dec!(150000)))
        .await
        .unwrap();
    let outcome = submissions
        .reconcile(&finance, first.id, reconcile(SubmissionStatus::Rejected, None))
        .await
        .unwrap();
    assert_eq!(outcome.submission.status, SubmissionStatus::Rejected);
    assert!(outcome.ledger_entry.is_none());

    let second = submissions
        .submit(&agent, submit(ids, dec!(200000)))
        .await
        .unwrap();
    assert_eq!(second.discrepancy, dec!(0));

    let (entries, total, _, _) = app
        .services
        .ledger
        .list(&finance, ListLedgerQuery::default())
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn an_order_is_submitted_at_most_once() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let ids = app.delivered_orders(&agent, 2, dec!(100000)).await;
    let submissions = &app.services.submissions;

    submissions
        .submit(&agent, submit(vec![ids[0]], dec!(100000)))
        .await
        .unwrap();
    assert_matches!(
        submissions
            .submit(&agent, submit(ids.clone(), dec!(200000)))
            .await,
        Err(ServiceError::Conflict(_))
    );

    // The failed batch left the free order unclaimed.
    submissions
        .submit(&agent, submit(vec![ids[1]], dec!(100000)))
        .await
        .unwrap();
}

#[tokio::test]
async fn ineligible_orders_fail_the_whole_batch() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let delivered = app.delivered_orders(&agent, 1, dec!(100000)).await;
    let no_cod = app.delivered_orders(&agent, 1, dec!(0)).await;
    let undelivered = app.arrived_orders(1, dec!(100000)).await;
    let submissions = &app.services.submissions;

    assert_matches!(
        submissions
            .submit(&agent, submit(vec![delivered[0], delivered[0]], dec!(1)))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        submissions
            .submit(&agent, submit(vec![delivered[0], undelivered[0]], dec!(1)))
            .await,
        Err(ServiceError::InvalidState(_))
    );
    assert_matches!(
        submissions
            .submit(&agent, submit(vec![delivered[0], no_cod[0]], dec!(1)))
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let hanoi_agent = actor(ActorRole::DeliveryAgent, Some(app.hanoi_hub));
    assert_matches!(
        submissions
            .submit(&hanoi_agent, submit(vec![delivered[0]], dec!(100000)))
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let (pending, total, _, _) = submissions
        .list_submissions(&agent, ListSubmissionsQuery::default())
        .await
        .unwrap();
    assert!(pending.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn office_staff_reconcile_only_their_own_office() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let ids = app.delivered_orders(&agent, 1, dec!(100000)).await;
    let submission = app
        .services
        .submissions
        .submit(&agent, submit(ids, dec!(100000)))
        .await
        .unwrap();

    let hanoi_manager = actor(ActorRole::OfficeManager, Some(app.hanoi_hub));
    assert_matches!(
        app.services
            .submissions
            .reconcile(
                &hanoi_manager,
                submission.id,
                reconcile(SubmissionStatus::Confirmed, None)
            )
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        app.services
            .submissions
            .get_submission(&hanoi_manager, submission.id)
            .await,
        Err(ServiceError::NotFound(_))
    );

    let saigon_manager = actor(ActorRole::OfficeManager, Some(app.saigon_hub));
    let outcome = app
        .services
        .submissions
        .reconcile(
            &saigon_manager,
            submission.id,
            reconcile(SubmissionStatus::Confirmed, None),
        )
        .await
        .unwrap();
    let entry = outcome.ledger_entry.unwrap();

    // Ledger listings are scoped the same way.
    let (theirs, _, _, _) = app
        .services
        .ledger
        .list(&hanoi_manager, ListLedgerQuery::default())
        .await
        .unwrap();
    assert!(theirs.is_empty());
    let (ours, _, _, _) = app
        .services
        .ledger
        .list(&saigon_manager, ListLedgerQuery::default())
        .await
        .unwrap();
    assert_eq!(ours[0].id, entry.id);
}

async fn balance_of(app: &TestApp, actor: &Actor) -> parcelflow_api::services::payment_submissions::CodBalance {
    app.services
        .submissions
        .office_cod_balance(actor, app.saigon_hub)
        .await
        .unwrap()
}

#[tokio::test]
async fn cod_balance_follows_submissions() {
    let app = TestApp::new().await;
    let agent = app.agent();
    let finance = app.finance();
    let ids = app.delivered_orders(&agent, 3, dec!(100000)).await;

    let submission = app
        .services
        .submissions
        .submit(&agent, submit(ids[..2].to_vec(), dec!(200000)))
        .await
        .unwrap();

    let balance = balance_of(&app, &agent).await;
    assert_eq!(balance.collected, dec!(300000));
    assert_eq!(balance.outstanding, dec!(100000));
    assert_eq!(balance.submitted, dec!(200000));
    assert_eq!(balance.pending, dec!(200000));
    assert_eq!(balance.reconciled, dec!(0));

    app.services
        .submissions
        .reconcile(&finance, submission.id, reconcile(SubmissionStatus::Confirmed, None))
        .await
        .unwrap();
    let balance = balance_of(&app, &finance).await;
    assert_eq!(balance.pending, dec!(0));
    assert_eq!(balance.reconciled, dec!(200000));

    let hanoi_agent = actor(ActorRole::DeliveryAgent, Some(app.hanoi_hub));
    assert_matches!(
        app.services
            .submissions
            .office_cod_balance(&hanoi_agent, app.saigon_hub)
            .await,
        Err(ServiceError::Forbidden(_))
    );
}
