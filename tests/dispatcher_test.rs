mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{actor, TestApp};
use parcelflow_api::{
    auth::ActorRole,
    entities::{order::OrderStatus, order_history::HistoryAction, shipment::ShipmentStatus},
    errors::ServiceError,
    services::{
        orders::ConfirmOrderRequest,
        shipments::{
            FinishRequest, FinishStatus, ItemOutcome, ListShipmentsQuery, PickUpRequest,
            SkipReason,
        },
    },
};

fn pickup(order_ids: Vec<Uuid>) -> PickUpRequest {
    PickUpRequest {
        vehicle_id: Some(Uuid::new_v4()),
        order_ids,
    }
}

fn finish(status: FinishStatus) -> FinishRequest {
    FinishRequest { status, note: None }
}

#[tokio::test]
async fn pickup_takes_only_orders_confirmed_at_the_drivers_office() {
    let app = TestApp::new().await;
    let first = app.confirmed_order(dec!(0)).await;
    let second = app.confirmed_order(dec!(0)).await;

    // Confirmed into the Saigon hub, so not the Hanoi driver's to take.
    let elsewhere = app
        .services
        .orders
        .create_order(&app.operator(), app.order_request(dec!(0)))
        .await
        .unwrap();
    app.services
        .orders
        .confirm_order(
            &actor(ActorRole::Admin, None),
            elsewhere.id,
            ConfirmOrderRequest {
                origin_office_id: Some(app.saigon_hub),
                note: None,
            },
        )
        .await
        .unwrap();

    let driver = app.driver();
    let outcome = app
        .services
        .shipments
        .pick_up(&driver, pickup(vec![first.id, second.id, elsewhere.id]))
        .await
        .unwrap();

    let accepted: Vec<_> = outcome.accepted().collect();
    assert_eq!(accepted, vec![first.id, second.id]);
    assert_matches!(
        outcome.items[2].outcome,
        ItemOutcome::Skipped {
            reason: SkipReason::OfficeMismatch
        }
    );

    let detail = app
        .services
        .shipments
        .get_shipment(&driver, outcome.shipment_id.unwrap())
        .await
        .unwrap();
    assert_eq!(detail.shipment.status, ShipmentStatus::Pending);
    assert_eq!(detail.shipment.office_id, app.hanoi_hub);
    assert_eq!(detail.order_ids.len(), 2);

    let operator = app.operator();
    let picked = app.services.orders.get_order(&operator, first.id).await.unwrap();
    assert_eq!(picked.status, OrderStatus::PickedUp);
    let left = app
        .services
        .orders
        .get_order(&operator, elsewhere.id)
        .await
        .unwrap();
    assert_eq!(left.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn pickup_reports_every_skip_reason() {
    let app = TestApp::new().await;
    let confirmed = app.confirmed_order(dec!(0)).await;
    let pending = app
        .services
        .orders
        .create_order(&app.operator(), app.order_request(dec!(0)))
        .await
        .unwrap();
    let missing = Uuid::new_v4();

    let outcome = app
        .services
        .shipments
        .pick_up(
            &app.driver(),
            pickup(vec![confirmed.id, confirmed.id, pending.id, missing]),
        )
        .await
        .unwrap();

    let reasons: Vec<_> = outcome
        .items
        .iter()
        .map(|item| match item.outcome {
            ItemOutcome::Accepted => None,
            ItemOutcome::Skipped { reason } => Some(reason),
        })
        .collect();
    assert_eq!(
        reasons,
        vec![
            None,
            Some(SkipReason::Duplicate),
            Some(SkipReason::InvalidState),
            Some(SkipReason::NotFound)
        ]
    );
}

#[tokio::test]
async fn pickup_with_nothing_eligible_reports_reasons_without_a_shipment() {
    let app = TestApp::new().await;
    let driver = app.driver();
    let pending = app
        .services
        .orders
        .create_order(&app.operator(), app.order_request(dec!(0)))
        .await
        .unwrap();
    let missing = Uuid::new_v4();

    let outcome = app
        .services
        .shipments
        .pick_up(&driver, pickup(vec![pending.id, missing]))
        .await
        .unwrap();
    assert!(outcome.shipment_id.is_none());
    assert_eq!(outcome.accepted().count(), 0);
    assert_eq!(outcome.items[0].order_id, pending.id);
    assert_matches!(
        outcome.items[0].outcome,
        ItemOutcome::Skipped {
            reason: SkipReason::InvalidState
        }
    );
    assert_eq!(outcome.items[1].order_id, missing);
    assert_matches!(
        outcome.items[1].outcome,
        ItemOutcome::Skipped {
            reason: SkipReason::NotFound
        }
    );

    let (shipments, total, _, _) = app
        .services
        .shipments
        .list_driver_shipments(driver.user_id, ListShipmentsQuery::default())
        .await
        .unwrap();
    assert!(shipments.is_empty());
    assert_eq!(total, 0);

    let untouched = app
        .services
        .orders
        .get_order(&app.operator(), pending.id)
        .await
        .unwrap();
    assert_eq!(untouched.status, OrderStatus::Pending);
}

#[tokio::test]
async fn orders_in_an_active_shipment_cannot_be_picked_again() {
    let app = TestApp::new().await;
    let order = app.confirmed_order(dec!(0)).await;
    let shipments = &app.services.shipments;

    shipments
        .pick_up(&app.driver(), pickup(vec![order.id]))
        .await
        .unwrap();
    let other_driver = actor(ActorRole::Driver, Some(app.hanoi_hub));
    let again = shipments
        .pick_up(&other_driver, pickup(vec![order.id]))
        .await
        .unwrap();
    assert!(again.shipment_id.is_none());
    assert_matches!(
        again.items[0].outcome,
        ItemOutcome::Skipped {
            reason: SkipReason::InvalidState
        }
    );
}

#[tokio::test]
async fn start_and_completion_cascade_to_orders() {
    let app = TestApp::new().await;
    let driver = app.driver();
    let shipments = &app.services.shipments;
    let a = app.confirmed_order(dec!(0)).await;
    let b = app.confirmed_order(dec!(0)).await;

    let outcome = shipments
        .pick_up(&driver, pickup(vec![a.id, b.id]))
        .await
        .unwrap();
    let id = outcome.shipment_id.unwrap();

    // Completion needs the trip to be under way first.
    assert_matches!(
        shipments.finish(&driver, id, finish(FinishStatus::Completed)).await,
        Err(ServiceError::InvalidState(_))
    );

    let started = shipments.start(&driver, id).await.unwrap();
    assert_eq!(started.status, ShipmentStatus::InTransit);
    assert!(started.start_time.is_some());
    assert_matches!(
        shipments.start(&driver, id).await,
        Err(ServiceError::InvalidState(_))
    );

    let operator = app.operator();
    let moving = app.services.orders.get_order(&operator, a.id).await.unwrap();
    assert_eq!(moving.status, OrderStatus::InTransit);

    let done = shipments
        .finish(&driver, id, finish(FinishStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.status, ShipmentStatus::Completed);
    assert!(done.end_time >= done.start_time);

    for order_id in [a.id, b.id] {
        let order = app.services.orders.get_order(&operator, order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::ArrivedAtOffice);
    }

    let trail = app.services.history.list_for_shipment(id).await.unwrap();
    assert_eq!(trail.len(), 6);
    let landed = trail
        .iter()
        .find(|row| row.order_id == a.id && row.action == HistoryAction::Imported)
        .unwrap();
    assert_eq!(landed.from_office_id, Some(app.hanoi_hub));
    assert_eq!(landed.to_office_id, Some(app.saigon_hub));

    assert_matches!(
        shipments.finish(&driver, id, finish(FinishStatus::Cancelled)).await,
        Err(ServiceError::InvalidState(_))
    );
}

#[tokio::test]
async fn cancelled_trip_returns_its_orders() {
    let app = TestApp::new().await;
    let driver = app.driver();
    let order = app.confirmed_order(dec!(0)).await;

    let outcome = app
        .services
        .shipments
        .pick_up(&driver, pickup(vec![order.id]))
        .await
        .unwrap();
    let cancelled = app
        .services
        .shipments
        .finish(&driver, outcome.shipment_id.unwrap(), finish(FinishStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.status, ShipmentStatus::Cancelled);

    let returned = app
        .services
        .orders
        .get_order(&app.operator(), order.id)
        .await
        .unwrap();
    assert_eq!(returned.status, OrderStatus::Returned);

    let history = app
        .services
        .orders
        .order_history(&app.operator(), order.id)
        .await
        .unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.action, HistoryAction::Returned);
    assert_eq!(last.shipment_id, outcome.shipment_id);
    assert_eq!(last.to_office_id, Some(app.hanoi_hub));
}

#[tokio::test]
async fn only_the_assigned_driver_runs_the_trip() {
    let app = TestApp::new().await;
    let driver = app.driver();
    let order = app.confirmed_order(dec!(0)).await;
    let shipments = &app.services.shipments;
    let id = shipments
        .pick_up(&driver, pickup(vec![order.id]))
        .await
        .unwrap()
        .shipment_id
        .unwrap();

    let intruder = actor(ActorRole::Driver, Some(app.hanoi_hub));
    assert_matches!(
        shipments.start(&intruder, id).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        shipments.get_shipment(&intruder, id).await,
        Err(ServiceError::NotFound(_))
    );

    // Staff may read any trip.
    let detail = shipments.get_shipment(&app.operator(), id).await.unwrap();
    assert_eq!(detail.shipment.driver_id, driver.user_id);

    let (mine, total, _, _) = shipments
        .list_driver_shipments(
            driver.user_id,
            ListShipmentsQuery {
                status: Some(ShipmentStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(mine[0].id, id);
}
