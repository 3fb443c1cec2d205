//! Server-rendered admin markup. Every dynamic value goes through [`escape`].

pub mod error_page;
pub mod subscription_detail;
pub mod subscription_list;

use chrono::NaiveDate;
use crates::domain::value_objects::enums::{
    invoice_statuses::InvoiceStatus, subscription_statuses::SubscriptionStatus,
};

use crate::axum_http::flash::{FlashKind, FlashMessage};

pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background:#f4f5f7; color:#1f2933; margin:0;">
<header style="background:#1f2933; color:#fff; padding:14px 24px;">
<a href="/admin/assinaturas" style="color:#fff; text-decoration:none; font-weight:600;">Billing admin</a>
</header>
<main style="max-width:1100px; margin:24px auto; padding:0 16px;">
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        body = body,
    )
}

pub fn banner(flash: &FlashMessage) -> String {
    let (background, border) = match flash.kind {
        FlashKind::Success => ("#e6f4ea", "#34a853"),
        FlashKind::Error => ("#fdecea", "#d93025"),
    };
    format!(
        r#"<div role="alert" style="background:{background}; border-left:4px solid {border}; padding:10px 14px; margin-bottom:16px; border-radius:4px;">{}</div>"#,
        escape(&flash.message),
    )
}

pub fn banners(flashes: &[FlashMessage]) -> String {
    flashes.iter().map(banner).collect()
}

pub fn status_badge(status: SubscriptionStatus) -> String {
    let color = match status {
        SubscriptionStatus::Trial => "#1a73e8",
        SubscriptionStatus::Active => "#188038",
        SubscriptionStatus::PastDue => "#e37400",
        SubscriptionStatus::Canceled => "#5f6368",
        SubscriptionStatus::Suspended => "#d93025",
    };
    format!(
        r#"<span style="background:{color}; color:#fff; padding:2px 8px; border-radius:10px; font-size:12px;">{}</span>"#,
        status.as_str(),
    )
}

pub fn invoice_badge(status: InvoiceStatus) -> String {
    let color = match status {
        InvoiceStatus::Pending => "#e37400",
        InvoiceStatus::Paid => "#188038",
        InvoiceStatus::Failed => "#d93025",
    };
    format!(
        r#"<span style="color:{color}; font-weight:600;">{}</span>"#,
        status.as_str(),
    )
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) const TABLE_STYLE: &str =
    "width:100%; border-collapse:collapse; background:#fff; box-shadow:0 1px 2px rgba(0,0,0,.08);";
pub(crate) const TH_STYLE: &str =
    "text-align:left; padding:10px; border-bottom:2px solid #e4e7eb; font-size:13px; color:#52606d;";
pub(crate) const TD_STYLE: &str = "padding:10px; border-bottom:1px solid #e4e7eb; font-size:14px;";
pub(crate) const CARD_STYLE: &str = "background:#fff; padding:16px 20px; margin-bottom:20px; border-radius:6px; box-shadow:0 1px 2px rgba(0,0,0,.08);";
pub(crate) const BUTTON_STYLE: &str = "background:#1a73e8; color:#fff; border:0; padding:8px 14px; border-radius:4px; cursor:pointer;";
pub(crate) const DANGER_BUTTON_STYLE: &str = "background:#d93025; color:#fff; border:0; padding:8px 14px; border-radius:4px; cursor:pointer;";
