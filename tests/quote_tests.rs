mod common;

use common::{ADMIN_EMAIL, TENANT, state};
use repairshop::core::models::{QuoteStatus, RepairStatus};
use repairshop::errors::ShopError;
use repairshop::quotes::{self, QuoteRequest, QuoteResponse};

fn request() -> QuoteRequest {
    QuoteRequest {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "+1 555 010 2233".into(),
        device_model_id: None,
        device_label: "iPhone 12 Pro".into(),
        issue: "Battery drains <fast> & phone gets hot".into(),
        preferred_contact: Some("email".into()),
    }
}

#[test]
fn test_quote_form_requires_contact_fields() {
    for field in ["firstName", "lastName", "email", "phone"] {
        let mut req = request();
        match field {
            "firstName" => req.first_name.clear(),
            "lastName" => req.last_name = "   ".into(),
            "email" => req.email.clear(),
            _ => req.phone.clear(),
        }
        match quotes::validate_request(&req) {
            Err(ShopError::Validation(msg)) => {
                assert!(msg.contains(field), "expected {field} in '{msg}'");
            }
            other => panic!("expected validation error for {field}, got {other:?}"),
        }
    }
}

#[test]
fn test_quote_form_checks_formats() {
    let mut req = request();
    req.email = "ada-at-example".into();
    req.phone = "12".into();
    let Err(ShopError::Validation(msg)) = quotes::validate_request(&req) else {
        panic!("expected validation error");
    };
    assert!(msg.contains("email: Please enter a valid email address"), "{msg}");
    assert!(msg.contains("phone: Please enter a valid phone number"), "{msg}");

    let mut req = request();
    req.device_label.clear();
    assert!(quotes::validate_request(&req).is_err());
    assert!(quotes::validate_request(&request()).is_ok());
}

#[tokio::test]
async fn test_submit_notifies_shop_and_customer() {
    let (state, mock) = state();
    let quote = quotes::submit(&state, TENANT, &request()).await.unwrap();
    assert_eq!(quote.status, QuoteStatus::New);

    let sent = mock.sent().await;
    assert_eq!(sent.len(), 2);

    let admin = sent
        .iter()
        .find(|m| m.to == vec![ADMIN_EMAIL.to_string()])
        .expect("admin notification");
    assert_eq!(admin.subject, "New quote request from Ada Lovelace");
    assert_eq!(admin.reply_to.as_deref(), Some("ada@example.com"));
    assert!(admin.html.contains("&lt;fast&gt; &amp; phone"));
    assert!(!admin.html.contains("<fast>"));
    assert!(admin.text.contains("A new repair quote request was submitted."));
    assert!(!admin.text.contains("<table>"));

    let customer = sent
        .iter()
        .find(|m| m.to == vec!["ada@example.com".to_string()])
        .expect("customer confirmation");
    assert_eq!(customer.subject, "We received your quote request - Repair Shop");
}

#[tokio::test]
async fn test_invalid_quote_is_not_stored() {
    let (state, mock) = state();
    let mut req = request();
    req.phone.clear();
    assert!(quotes::submit(&state, TENANT, &req).await.is_err());
    assert!(quotes::list(&state, TENANT).await.unwrap().is_empty());
    assert!(mock.sent().await.is_empty());
}

#[tokio::test]
async fn test_respond_emails_estimate() {
    let (state, mock) = state();
    let quote = quotes::submit(&state, TENANT, &request()).await.unwrap();
    mock.clear().await;

    let responded = quotes::respond(
        &state,
        TENANT,
        &quote.id,
        &QuoteResponse {
            estimated_cost_cents: 12_950,
            message: "We can swap the battery same day.".into(),
            admin_notes: Some("OEM battery in stock".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(responded.status, QuoteStatus::Responded);
    assert_eq!(responded.estimated_cost_cents, Some(12_950));

    let sent = mock.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your repair quote for iPhone 12 Pro");
    assert!(sent[0].html.contains("$129.50"));
}

#[tokio::test]
async fn test_convert_creates_customer_and_repair_once() {
    let (state, _) = state();
    let quote = quotes::submit(&state, TENANT, &request()).await.unwrap();

    let (converted, repair) = quotes::convert_to_repair(&state, TENANT, &quote.id)
        .await
        .unwrap();
    assert_eq!(converted.status, QuoteStatus::Converted);
    assert_eq!(converted.repair_id.as_deref(), Some(repair.id.as_str()));
    assert_eq!(repair.status, RepairStatus::Received);
    assert!(repair.ticket_number.starts_with("R-"));
    assert_eq!(repair.ticket_number.len(), 8);

    let customer = state.customers(TENANT).get_or_err(&repair.customer_id).await.unwrap();
    assert_eq!(customer.email, "ada@example.com");

    let err = quotes::convert_to_repair(&state, TENANT, &quote.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));

    // A second quote from the same person reuses the customer.
    let second = quotes::submit(&state, TENANT, &request()).await.unwrap();
    let (_, repair2) = quotes::convert_to_repair(&state, TENANT, &second.id)
        .await
        .unwrap();
    assert_eq!(repair2.customer_id, repair.customer_id);
}

#[tokio::test]
async fn test_status_cannot_be_set_to_converted_directly() {
    let (state, _) = state();
    let quote = quotes::submit(&state, TENANT, &request()).await.unwrap();

    let err = quotes::set_status(&state, TENANT, &quote.id, QuoteStatus::Converted)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let accepted = quotes::set_status(&state, TENANT, &quote.id, QuoteStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(accepted.status, QuoteStatus::Accepted);
}
