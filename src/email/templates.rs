//! HTML/text email templates.
//!
//! Every template produces an HTML body; the plain-text alternative is derived
//! from it with html2text so the two never drift apart. All user-supplied
//! values pass through [`escape`].

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::core::config::AppConfig;
use crate::core::validate::clean_line;
use crate::core::models::{ContactMessage, Customer, Order, Quote, Repair};

/// Width used when wrapping the plain-text alternative.
const TEXT_WIDTH: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl RenderedEmail {
    #[must_use]
    pub fn from_html(subject: String, html: String) -> Self {
        let subject = clean_line(&subject);
        let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH).unwrap_or_else(|e| {
            warn!("Failed to derive text part for '{}': {}", subject, e);
            subject.clone()
        });
        Self {
            subject,
            html,
            text,
        }
    }
}

/// Shop-wide values every template needs.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub shop_name: String,
    pub site_url: String,
    pub timezone: Tz,
}

impl TemplateContext {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            shop_name: config.shop_name.clone(),
            site_url: config.site_url.clone(),
            timezone: config.shop_timezone,
        }
    }

    #[must_use]
    pub fn format_date(&self, at: &DateTime<Utc>) -> String {
        at.with_timezone(&self.timezone)
            .format("%B %-d, %Y %H:%M %Z")
            .to_string()
    }
}

#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `1234` -> `$12.34`, `-50` -> `-$0.50`.
#[must_use]
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Escaped text with newlines turned into `<br>`.
fn paragraph(raw: &str) -> String {
    escape(raw).replace('\n', "<br>")
}

fn layout(ctx: &TemplateContext, heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family:Arial,sans-serif;color:#222\">\
<h1 style=\"font-size:20px\">{heading}</h1>{body}\
<hr><p style=\"font-size:12px;color:#777\">{shop} &middot; <a href=\"{site}\">{site}</a></p>\
</body></html>",
        heading = escape(heading),
        body = body,
        shop = escape(&ctx.shop_name),
        site = escape(&ctx.site_url),
    )
}

fn row(label: &str, value: &str) -> String {
    format!(
        "<tr><td style=\"padding:4px 12px 4px 0\"><strong>{}</strong></td><td>{}</td></tr>",
        escape(label),
        paragraph(value)
    )
}

// ============================================================================
// Quotes
// ============================================================================

#[must_use]
pub fn quote_notification(ctx: &TemplateContext, quote: &Quote) -> RenderedEmail {
    let name = format!("{} {}", quote.first_name, quote.last_name);
    let mut rows = vec![
        row("Name", &name),
        row("Email", &quote.email),
        row("Phone", &quote.phone),
        row("Device", &quote.device_label),
        row("Issue", &quote.issue),
    ];
    if let Some(pref) = &quote.preferred_contact {
        rows.push(row("Preferred contact", pref));
    }
    rows.push(row("Received", &ctx.format_date(&quote.created_at)));

    let body = format!(
        "<p>A new repair quote request was submitted.</p><table>{}</table>\
<p><a href=\"{}/admin?tab=quotes&amp;id={}\">Open in dashboard</a></p>",
        rows.join(""),
        escape(&ctx.site_url),
        escape(&quote.id)
    );
    RenderedEmail::from_html(
        format!("New quote request from {name}"),
        layout(ctx, "New quote request", &body),
    )
}

#[must_use]
pub fn quote_confirmation(ctx: &TemplateContext, quote: &Quote) -> RenderedEmail {
    let body = format!(
        "<p>Hi {first},</p><p>Thanks for asking us about your {device}. \
We received your request and will get back to you with an estimate shortly.</p>\
<table>{issue}</table><p>Your reference: <strong>{id}</strong></p>",
        first = escape(&quote.first_name),
        device = escape(&quote.device_label),
        issue = row("Issue", &quote.issue),
        id = escape(&quote.id),
    );
    RenderedEmail::from_html(
        format!("We received your quote request - {}", ctx.shop_name),
        layout(ctx, "Quote request received", &body),
    )
}

#[must_use]
pub fn quote_response(ctx: &TemplateContext, quote: &Quote, message: &str) -> RenderedEmail {
    let estimate = quote
        .estimated_cost_cents
        .map(|c| row("Estimated cost", &format_money(c)))
        .unwrap_or_default();
    let body = format!(
        "<p>Hi {first},</p><p>{message}</p><table>{device}{estimate}</table>\
<p>Reply to this email or call us to book your repair.</p>",
        first = escape(&quote.first_name),
        message = paragraph(message),
        device = row("Device", &quote.device_label),
        estimate = estimate,
    );
    RenderedEmail::from_html(
        format!("Your repair quote for {}", quote.device_label),
        layout(ctx, "Your repair quote", &body),
    )
}

// ============================================================================
// Orders
// ============================================================================

fn order_lines(order: &Order) -> String {
    let mut html = String::from(
        "<table><tr><th align=\"left\">Item</th><th>Qty</th><th align=\"right\">Total</th></tr>",
    );
    for item in &order.items {
        html.push_str(&format!(
            "<tr><td>{}</td><td align=\"center\">{}</td><td align=\"right\">{}</td></tr>",
            escape(&item.name),
            item.quantity,
            format_money(item.line_total_cents())
        ));
    }
    html.push_str(&format!(
        "<tr><td colspan=\"2\">Subtotal</td><td align=\"right\">{}</td></tr>\
<tr><td colspan=\"2\">Shipping</td><td align=\"right\">{}</td></tr>\
<tr><td colspan=\"2\"><strong>Total</strong></td><td align=\"right\"><strong>{}</strong></td></tr></table>",
        format_money(order.subtotal_cents),
        format_money(order.shipping_cents),
        format_money(order.total_cents)
    ));
    html
}

#[must_use]
pub fn order_confirmation(ctx: &TemplateContext, order: &Order) -> RenderedEmail {
    let body = format!(
        "<p>Hi {first},</p><p>Thanks for your order <strong>{number}</strong> placed on {date}.</p>\
{lines}<table>{ship}</table>\
<p>You can check its status any time at <a href=\"{site}/orders/{number}\">{site}/orders/{number}</a>.</p>",
        first = escape(&order.contact.first_name),
        number = escape(&order.number),
        date = ctx.format_date(&order.created_at),
        lines = order_lines(order),
        ship = row("Ship to", &order.shipping_address),
        site = escape(&ctx.site_url),
    );
    RenderedEmail::from_html(
        format!("Order {} confirmed", order.number),
        layout(ctx, "Order confirmation", &body),
    )
}

#[must_use]
pub fn order_status(ctx: &TemplateContext, order: &Order) -> RenderedEmail {
    let tracking = order
        .tracking_number
        .as_deref()
        .map(|t| row("Tracking number", t))
        .unwrap_or_default();
    let body = format!(
        "<p>Hi {first},</p><p>Your order <strong>{number}</strong> is now \
<strong>{status}</strong>.</p><table>{tracking}</table>{lines}",
        first = escape(&order.contact.first_name),
        number = escape(&order.number),
        status = order.status.label(),
        tracking = tracking,
        lines = order_lines(order),
    );
    RenderedEmail::from_html(
        format!("Order {}: {}", order.number, order.status.label()),
        layout(ctx, "Order update", &body),
    )
}

// ============================================================================
// Repairs
// ============================================================================

#[must_use]
pub fn repair_status(ctx: &TemplateContext, repair: &Repair, customer: &Customer) -> RenderedEmail {
    let mut rows = vec![
        row("Ticket", &repair.ticket_number),
        row("Device", &repair.device_label),
        row("Status", repair.status.label()),
    ];
    if let Some(cost) = repair.final_cost_cents.or(repair.estimated_cost_cents) {
        rows.push(row("Cost", &format_money(cost)));
    }
    let body = format!(
        "<p>Hi {first},</p><p>There is an update on your repair.</p><table>{rows}</table>",
        first = escape(&customer.first_name),
        rows = rows.join(""),
    );
    RenderedEmail::from_html(
        format!(
            "Repair {}: {}",
            repair.ticket_number,
            repair.status.label()
        ),
        layout(ctx, "Repair update", &body),
    )
}

// ============================================================================
// Contact form
// ============================================================================

#[must_use]
pub fn contact_notification(ctx: &TemplateContext, msg: &ContactMessage) -> RenderedEmail {
    let body = format!(
        "<table>{}{}{}{}</table><p>{}</p>",
        row("From", &msg.name),
        row("Email", &msg.email),
        row("Phone", msg.phone.as_deref().unwrap_or("-")),
        row("Subject", &msg.subject),
        paragraph(&msg.message)
    );
    RenderedEmail::from_html(
        format!("Contact form: {}", msg.subject),
        layout(ctx, "New contact message", &body),
    )
}

#[must_use]
pub fn contact_response(ctx: &TemplateContext, msg: &ContactMessage, reply: &str) -> RenderedEmail {
    let body = format!(
        "<p>Hi {name},</p><p>{reply}</p><hr><p style=\"color:#777\">You wrote:</p>\
<blockquote>{original}</blockquote>",
        name = escape(&msg.name),
        reply = paragraph(reply),
        original = paragraph(&msg.message),
    );
    RenderedEmail::from_html(
        format!("Re: {}", msg.subject),
        layout(ctx, &format!("Message from {}", ctx.shop_name), &body),
    )
}
