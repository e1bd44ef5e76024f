mod common;

use common::{TENANT, seed_customer, seed_part, state};
use repairshop::core::models::{PartUsage, RepairStatus};
use repairshop::customers;
use repairshop::errors::ShopError;
use repairshop::repairs::{self, PartUsageRequest, RepairInput, RepairStatusUpdate};

fn input(customer_id: &str, device: &str, issue: &str) -> RepairInput {
    RepairInput {
        customer_id: customer_id.to_string(),
        device_model_id: None,
        device_label: device.to_string(),
        issue: issue.to_string(),
        estimated_cost_cents: Some(9_900),
        technician_notes: None,
    }
}

fn to(status: RepairStatus) -> RepairStatusUpdate {
    RepairStatusUpdate {
        status,
        final_cost_cents: None,
        notify_customer: true,
    }
}

#[tokio::test]
async fn test_search_by_customer_ticket_and_phone() {
    let (state, _) = state();
    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    let bob = seed_customer(&state, "Bob", "Stone", "bob@example.com").await;
    let r1 = repairs::create(&state, TENANT, &input(&jane.id, "iPhone 13", "Cracked screen"))
        .await
        .unwrap();
    repairs::create(&state, TENANT, &input(&bob.id, "Pixel 7", "Won't charge"))
        .await
        .unwrap();

    let hits = repairs::search(&state, TENANT, "JANE").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].repair.id, r1.id);
    assert_eq!(hits[0].customer_name, "Jane Doe");

    let hits = repairs::search(&state, TENANT, &r1.ticket_number.to_lowercase())
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    // Both customers share the fixture phone number.
    let hits = repairs::search(&state, TENANT, "010-4477").await.unwrap();
    assert_eq!(hits.len(), 2);
    let hits = repairs::search(&state, TENANT, "(4477)").await.unwrap();
    assert_eq!(hits.len(), 2);
    // Under four digits is too short to match a phone.
    assert!(repairs::search(&state, TENANT, "( 477 )").await.unwrap().is_empty());

    let hits = repairs::search(&state, TENANT, "charge").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].customer_email, "bob@example.com");

    assert!(repairs::search(&state, TENANT, "").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_completed_repairs_are_closed() {
    let (state, mock) = state();
    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    let repair = repairs::create(&state, TENANT, &input(&jane.id, "iPad Air", "Battery"))
        .await
        .unwrap();

    let ready = repairs::update_status(&state, TENANT, &repair.id, &to(RepairStatus::ReadyForPickup))
        .await
        .unwrap();
    assert!(ready.completed_at.is_none());

    let done = repairs::update_status(&state, TENANT, &repair.id, &to(RepairStatus::Completed))
        .await
        .unwrap();
    assert!(done.completed_at.is_some());
    assert_eq!(done.final_cost_cents, Some(9_900));

    let err = repairs::update_status(&state, TENANT, &repair.id, &to(RepairStatus::InProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));

    let sent = mock.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, vec!["jane@example.com".to_string()]);
    assert_eq!(
        sent[1].subject,
        format!("Repair {}: Completed", repair.ticket_number)
    );
}

#[tokio::test]
async fn test_status_change_without_notification() {
    let (state, mock) = state();
    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    let repair = repairs::create(&state, TENANT, &input(&jane.id, "iPad Air", "Battery"))
        .await
        .unwrap();

    repairs::update_status(
        &state,
        TENANT,
        &repair.id,
        &RepairStatusUpdate {
            status: RepairStatus::Diagnosing,
            final_cost_cents: None,
            notify_customer: false,
        },
    )
    .await
    .unwrap();
    assert!(mock.sent().await.is_empty());
}

#[tokio::test]
async fn test_part_usage_takes_stock() {
    let (state, _) = state();
    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    let part = seed_part(&state, "iPhone 13 Screen", "SCR-13", 2).await;
    let repair = repairs::create(&state, TENANT, &input(&jane.id, "iPhone 13", "Screen"))
        .await
        .unwrap();

    let usage = PartUsageRequest {
        part_id: part.id.clone(),
        quantity: 1,
    };
    repairs::record_part_usage(&state, TENANT, &repair.id, &usage).await.unwrap();
    let updated = repairs::record_part_usage(&state, TENANT, &repair.id, &usage)
        .await
        .unwrap();
    assert_eq!(updated.parts_used.len(), 1);
    assert_eq!(updated.parts_used[0].quantity, 2);
    assert_eq!(state.parts(TENANT).get_or_err(&part.id).await.unwrap().in_stock, 0);

    let err = repairs::record_part_usage(&state, TENANT, &repair.id, &usage)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::OutOfStock(_)));
}

#[tokio::test]
async fn test_customer_with_open_repair_cannot_be_deleted() {
    let (state, _) = state();
    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    let repair = repairs::create(&state, TENANT, &input(&jane.id, "Switch", "Joy-Con drift"))
        .await
        .unwrap();

    assert!(matches!(
        customers::delete(&state, TENANT, &jane.id).await,
        Err(ShopError::Conflict(_))
    ));

    repairs::update_status(&state, TENANT, &repair.id, &to(RepairStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(customers::history(&state, TENANT, &jane.id).await.unwrap().len(), 1);
    customers::delete(&state, TENANT, &jane.id).await.unwrap();
}

#[tokio::test]
async fn test_repair_requires_existing_customer() {
    let (state, _) = state();
    let err = repairs::create(&state, TENANT, &input("missing", "Pixel", "Screen"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));
}

#[tokio::test]
async fn test_part_usage_total_cannot_overflow() {
    let (state, _) = state();
    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    let part = seed_part(&state, "Pixel 7 Battery", "BAT-P7", 3).await;
    let mut repair = repairs::create(&state, TENANT, &input(&jane.id, "Pixel 7", "Battery"))
        .await
        .unwrap();
    repair.parts_used.push(PartUsage {
        part_id: part.id.clone(),
        quantity: u32::MAX,
    });
    state.repairs(TENANT).save(repair.clone()).await.unwrap();

    let err = repairs::record_part_usage(
        &state,
        TENANT,
        &repair.id,
        &PartUsageRequest {
            part_id: part.id.clone(),
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
    assert_eq!(state.parts(TENANT).get_or_err(&part.id).await.unwrap().in_stock, 3);
}
