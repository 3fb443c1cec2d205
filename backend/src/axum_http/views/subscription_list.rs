use crates::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus, money::format_minor,
    subscriptions::SubscriptionDetailDto,
};

use super::{
    BUTTON_STYLE, TABLE_STYLE, TD_STYLE, TH_STYLE, banners, escape, format_date, layout,
    status_badge,
};
use crate::axum_http::flash::FlashMessage;

pub struct SubscriptionListView<'a> {
    pub subscriptions: &'a [SubscriptionDetailDto],
    pub status: Option<SubscriptionStatus>,
    pub search: &'a str,
    pub flashes: &'a [FlashMessage],
}

pub fn render_subscription_list(view: &SubscriptionListView<'_>) -> String {
    let mut body = String::new();
    body.push_str(r#"<h1 style="margin-top:0;">Subscriptions</h1>"#);
    body.push_str(&banners(view.flashes));
    body.push_str(&filter_form(view.status, view.search));

    if view.subscriptions.is_empty() {
        body.push_str(r#"<p style="color:#52606d;">No subscriptions found.</p>"#);
        return layout("Subscriptions", &body);
    }

    body.push_str(&format!(
        r#"<table style="{TABLE_STYLE}"><thead><tr>
<th style="{TH_STYLE}">Store</th>
<th style="{TH_STYLE}">Plan</th>
<th style="{TH_STYLE}">Status</th>
<th style="{TH_STYLE}">Cycle</th>
<th style="{TH_STYLE}">Price</th>
<th style="{TH_STYLE}">Next invoice</th>
<th style="{TH_STYLE}"></th>
</tr></thead><tbody>"#
    ));
    for subscription in view.subscriptions {
        body.push_str(&row(subscription));
    }
    body.push_str("</tbody></table>");

    layout("Subscriptions", &body)
}

fn filter_form(selected: Option<SubscriptionStatus>, search: &str) -> String {
    let mut options = String::from(r#"<option value="">All statuses</option>"#);
    for status in SubscriptionStatus::ALL {
        let marker = if selected == Some(status) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            r#"<option value="{value}"{marker}>{value}</option>"#,
            value = status.as_str(),
        ));
    }

    format!(
        r#"<form method="get" action="/admin/assinaturas" style="display:flex; gap:8px; margin-bottom:16px;">
<select name="status" style="padding:6px;">{options}</select>
<input type="search" name="search" value="{search}" placeholder="Store name" style="padding:6px; flex:1;">
<button type="submit" style="{BUTTON_STYLE}">Filter</button>
</form>"#,
        search = escape(search),
    )
}

fn row(subscription: &SubscriptionDetailDto) -> String {
    let price = subscription
        .price_minor
        .map(|amount| format_minor(amount, &subscription.currency))
        .unwrap_or_else(|| "-".to_string());

    format!(
        r#"<tr>
<td style="{TD_STYLE}">{store}</td>
<td style="{TD_STYLE}">{plan}</td>
<td style="{TD_STYLE}">{status}</td>
<td style="{TD_STYLE}">{cycle}</td>
<td style="{TD_STYLE}">{price}</td>
<td style="{TD_STYLE}">{next_invoice}</td>
<td style="{TD_STYLE}"><a href="/admin/assinaturas/detalhes?id={id}">Details</a></td>
</tr>"#,
        store = escape(&subscription.store_name),
        plan = escape(&subscription.plan_name),
        status = status_badge(subscription.status),
        cycle = subscription.billing_cycle.as_str(),
        price = escape(&price),
        next_invoice = format_date(subscription.next_invoice_date),
        id = subscription.id,
    )
}
