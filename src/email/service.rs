use std::sync::Arc;

use tracing::{error, info};

use super::templates::{self, RenderedEmail, TemplateContext};
use super::{EmailMessage, EmailSender};
use crate::core::config::AppConfig;
use crate::core::models::{ContactMessage, Customer, Order, Quote, Repair};
use crate::errors::ShopError;

/// Shop-level email operations.
///
/// The `notify_*` methods are used after a successful mutation: delivery
/// failures are logged and swallowed so the customer's request still succeeds.
pub struct EmailService {
    sender: Arc<dyn EmailSender>,
    ctx: TemplateContext,
    from: String,
    admin: String,
}

impl EmailService {
    #[must_use]
    pub fn new(config: &AppConfig, sender: Arc<dyn EmailSender>) -> Self {
        Self {
            sender,
            ctx: TemplateContext::from_config(config),
            from: config.email_from.clone(),
            admin: config.admin_email.clone(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &TemplateContext {
        &self.ctx
    }

    async fn send(&self, message: EmailMessage) -> Result<String, ShopError> {
        let id = self.sender.send(&message).await?;
        info!(
            provider = self.sender.provider_name(),
            message_id = %id,
            subject = %message.subject,
            "Email sent"
        );
        Ok(id)
    }

    async fn to_customer(&self, to: &str, rendered: RenderedEmail) -> Result<String, ShopError> {
        self.send(EmailMessage::new(&self.from, to, rendered).with_reply_to(&self.admin))
            .await
    }

    async fn to_admin(
        &self,
        reply_to: &str,
        rendered: RenderedEmail,
    ) -> Result<String, ShopError> {
        self.send(EmailMessage::new(&self.from, &self.admin, rendered).with_reply_to(reply_to))
            .await
    }

    fn logged(what: &str, result: Result<String, ShopError>) {
        if let Err(e) = result {
            error!("Failed to send {} email: {}", what, e);
        }
    }

    pub async fn quote_notification(&self, quote: &Quote) -> Result<String, ShopError> {
        self.to_admin(&quote.email, templates::quote_notification(&self.ctx, quote))
            .await
    }

    pub async fn quote_confirmation(&self, quote: &Quote) -> Result<String, ShopError> {
        self.to_customer(&quote.email, templates::quote_confirmation(&self.ctx, quote))
            .await
    }

    pub async fn quote_response(&self, quote: &Quote, message: &str) -> Result<String, ShopError> {
        self.to_customer(
            &quote.email,
            templates::quote_response(&self.ctx, quote, message),
        )
        .await
    }

    pub async fn order_confirmation(&self, order: &Order) -> Result<String, ShopError> {
        self.to_customer(
            &order.contact.email,
            templates::order_confirmation(&self.ctx, order),
        )
        .await
    }

    pub async fn order_status(&self, order: &Order) -> Result<String, ShopError> {
        self.to_customer(&order.contact.email, templates::order_status(&self.ctx, order))
            .await
    }

    pub async fn repair_status(
        &self,
        repair: &Repair,
        customer: &Customer,
    ) -> Result<String, ShopError> {
        self.to_customer(
            &customer.email,
            templates::repair_status(&self.ctx, repair, customer),
        )
        .await
    }

    pub async fn contact_notification(&self, msg: &ContactMessage) -> Result<String, ShopError> {
        self.to_admin(&msg.email, templates::contact_notification(&self.ctx, msg))
            .await
    }

    pub async fn contact_response(
        &self,
        msg: &ContactMessage,
        reply: &str,
    ) -> Result<String, ShopError> {
        self.to_customer(&msg.email, templates::contact_response(&self.ctx, msg, reply))
            .await
    }

    // Fire-and-log variants used after the data is already saved.

    pub async fn notify_quote_received(&self, quote: &Quote) {
        let (admin, customer) =
            tokio::join!(self.quote_notification(quote), self.quote_confirmation(quote));
        Self::logged("quote notification", admin);
        Self::logged("quote confirmation", customer);
    }

    pub async fn notify_order_placed(&self, order: &Order) {
        let result = self.order_confirmation(order).await;
        Self::logged("order confirmation", result);
    }

    pub async fn notify_order_status(&self, order: &Order) {
        let result = self.order_status(order).await;
        Self::logged("order status", result);
    }

    pub async fn notify_repair_status(&self, repair: &Repair, customer: &Customer) {
        let result = self.repair_status(repair, customer).await;
        Self::logged("repair status", result);
    }

    pub async fn notify_contact_received(&self, msg: &ContactMessage) {
        let result = self.contact_notification(msg).await;
        Self::logged("contact notification", result);
    }
}
