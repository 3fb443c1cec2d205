use crates::domain::value_objects::{
    enums::{billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus},
    invoices::InvoiceDto,
    money::format_minor,
    plans::PlanDto,
    stores::StoreDto,
    subscriptions::SubscriptionDetailDto,
};
use uuid::Uuid;

use super::{
    BUTTON_STYLE, CARD_STYLE, DANGER_BUTTON_STYLE, TABLE_STYLE, TD_STYLE, TH_STYLE, banners,
    escape, format_date, invoice_badge, layout, status_badge,
};
use crate::axum_http::flash::FlashMessage;

pub struct SubscriptionDetailView<'a> {
    pub store_id: Uuid,
    pub store: Option<&'a StoreDto>,
    pub subscription: Option<&'a SubscriptionDetailDto>,
    pub invoices: &'a [InvoiceDto],
    pub plans: &'a [PlanDto],
    pub flashes: &'a [FlashMessage],
}

impl SubscriptionDetailView<'_> {
    fn store_name(&self) -> &str {
        self.store
            .map(|store| store.name.as_str())
            .or_else(|| {
                self.subscription
                    .map(|subscription| subscription.store_name.as_str())
            })
            .unwrap_or("Unknown store")
    }

    fn form_action(&self) -> String {
        match self.subscription {
            Some(subscription) => format!("/admin/assinaturas/detalhes?id={}", subscription.id),
            None => format!("/admin/assinaturas/detalhes?loja_id={}", self.store_id),
        }
    }
}

pub fn render_subscription_detail(view: &SubscriptionDetailView<'_>) -> String {
    let title = format!("Subscription - {}", view.store_name());
    let mut body = String::new();
    body.push_str(r#"<p><a href="/admin/assinaturas">&larr; All subscriptions</a></p>"#);
    body.push_str(&format!(
        r#"<h1 style="margin-top:0;">{}</h1>"#,
        escape(view.store_name())
    ));
    body.push_str(&banners(view.flashes));
    body.push_str(&store_card(view));

    match view.subscription {
        Some(subscription) => {
            body.push_str(&subscription_card(subscription));
            body.push_str(&lifecycle_actions(view, subscription));
        }
        None => body.push_str(&format!(
            r#"<div style="{CARD_STYLE}"><p style="margin:0;">This store has no subscription yet.</p></div>"#
        )),
    }

    body.push_str(&assign_plan_form(view));

    if view.subscription.is_some() {
        body.push_str(&invoices_table(view.invoices));
    }

    layout(&title, &body)
}

fn store_card(view: &SubscriptionDetailView<'_>) -> String {
    let Some(store) = view.store else {
        return String::new();
    };
    let phone = store.phone.as_deref().unwrap_or("-");

    format!(
        r#"<div style="{CARD_STYLE}">
<h2 style="margin-top:0; font-size:16px;">Store</h2>
<p style="margin:4px 0;">Email: {email}</p>
<p style="margin:4px 0;">Phone: {phone}</p>
</div>"#,
        email = escape(&store.email),
        phone = escape(phone),
    )
}

fn subscription_card(subscription: &SubscriptionDetailDto) -> String {
    let price = subscription
        .price_minor
        .map(|amount| format_minor(amount, &subscription.currency))
        .unwrap_or_else(|| "-".to_string());

    format!(
        r#"<div style="{CARD_STYLE}">
<h2 style="margin-top:0; font-size:16px;">Subscription {status}</h2>
<p style="margin:4px 0;">Plan: {plan} ({slug})</p>
<p style="margin:4px 0;">Cycle: {cycle}</p>
<p style="margin:4px 0;">Price: {price}</p>
<p style="margin:4px 0;">Trial ends: {trial_end}</p>
<p style="margin:4px 0;">Current period: {period_start} to {period_end}</p>
<p style="margin:4px 0;">Next invoice: {next_invoice}</p>
</div>"#,
        status = status_badge(subscription.status),
        plan = escape(&subscription.plan_name),
        slug = escape(&subscription.plan_slug),
        cycle = subscription.billing_cycle.as_str(),
        price = escape(&price),
        trial_end = format_date(subscription.trial_end),
        period_start = format_date(Some(subscription.current_period_start)),
        period_end = format_date(Some(subscription.current_period_end)),
        next_invoice = format_date(subscription.next_invoice_date),
    )
}

fn action_button(action_url: &str, store_id: Uuid, action: &str, label: &str, style: &str) -> String {
    format!(
        r#"<form method="post" action="{action_url}" style="display:inline-block; margin-right:8px;">
<input type="hidden" name="loja_id" value="{store_id}">
<input type="hidden" name="action" value="{action}">
<button type="submit" style="{style}">{label}</button>
</form>"#,
        action_url = escape(action_url),
    )
}

fn lifecycle_actions(view: &SubscriptionDetailView<'_>, subscription: &SubscriptionDetailDto) -> String {
    if subscription.status == SubscriptionStatus::Canceled {
        return String::new();
    }

    let action_url = view.form_action();
    let mut buttons = String::new();
    if subscription.status != SubscriptionStatus::Suspended {
        buttons.push_str(&action_button(
            &action_url,
            view.store_id,
            "generate_invoice",
            "Generate invoice",
            BUTTON_STYLE,
        ));
        buttons.push_str(&action_button(
            &action_url,
            view.store_id,
            "suspend",
            "Suspend",
            BUTTON_STYLE,
        ));
    }
    buttons.push_str(&action_button(
        &action_url,
        view.store_id,
        "cancel",
        "Cancel subscription",
        DANGER_BUTTON_STYLE,
    ));

    format!(r#"<div style="{CARD_STYLE}">{buttons}</div>"#)
}

fn assign_plan_form(view: &SubscriptionDetailView<'_>) -> String {
    let current_slug = view
        .subscription
        .filter(|subscription| subscription.status != SubscriptionStatus::Canceled)
        .map(|subscription| subscription.plan_slug.as_str());
    let current_cycle = view
        .subscription
        .map(|subscription| subscription.billing_cycle)
        .unwrap_or(BillingCycle::Monthly);

    let mut plan_options = String::new();
    for plan in view.plans {
        let marker = if current_slug == Some(plan.slug.as_str()) {
            " selected"
        } else {
            ""
        };
        plan_options.push_str(&format!(
            r#"<option value="{slug}"{marker}>{name} - {price}/month, {trial} trial days</option>"#,
            slug = escape(&plan.slug),
            name = escape(&plan.name),
            price = escape(&format_minor(plan.monthly_price_minor, &plan.currency)),
            trial = plan.trial_days,
        ));
    }

    let mut cycle_options = String::new();
    for cycle in [BillingCycle::Monthly, BillingCycle::Yearly] {
        let marker = if cycle == current_cycle { " selected" } else { "" };
        cycle_options.push_str(&format!(
            r#"<option value="{value}"{marker}>{value}</option>"#,
            value = cycle.as_str(),
        ));
    }

    let heading = if current_slug.is_some() {
        "Change plan"
    } else {
        "Assign plan"
    };

    format!(
        r#"<div style="{CARD_STYLE}">
<h2 style="margin-top:0; font-size:16px;">{heading}</h2>
<form method="post" action="{action_url}" style="display:flex; flex-wrap:wrap; gap:8px; align-items:center;">
<input type="hidden" name="action" value="assign_plan">
<input type="hidden" name="loja_id" value="{store_id}">
<select name="plano_slug" style="padding:6px;">{plan_options}</select>
<select name="ciclo" style="padding:6px;">{cycle_options}</select>
<input type="number" name="trial_days" min="0" placeholder="Trial days (plan default)" style="padding:6px; width:200px;">
<button type="submit" style="{BUTTON_STYLE}">Save</button>
</form>
</div>"#,
        action_url = escape(&view.form_action()),
        store_id = view.store_id,
    )
}

fn invoices_table(invoices: &[InvoiceDto]) -> String {
    if invoices.is_empty() {
        return format!(
            r#"<div style="{CARD_STYLE}"><h2 style="margin-top:0; font-size:16px;">Invoices</h2><p style="margin:0;">No invoices issued.</p></div>"#
        );
    }

    let mut rows = String::new();
    for invoice in invoices {
        let paid_at = invoice
            .paid_at
            .map(|paid_at| paid_at.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        rows.push_str(&format!(
            r#"<tr>
<td style="{TD_STYLE}">{number}</td>
<td style="{TD_STYLE}">{period_start} to {period_end}</td>
<td style="{TD_STYLE}">{amount}</td>
<td style="{TD_STYLE}">{status}</td>
<td style="{TD_STYLE}">{due_date}</td>
<td style="{TD_STYLE}">{paid_at}</td>
</tr>"#,
            number = escape(&invoice.number),
            period_start = format_date(Some(invoice.period_start)),
            period_end = format_date(Some(invoice.period_end)),
            amount = escape(&format_minor(invoice.amount_minor, &invoice.currency)),
            status = invoice_badge(invoice.status),
            due_date = format_date(Some(invoice.due_date)),
        ));
    }

    format!(
        r#"<h2 style="font-size:16px;">Invoices</h2>
<table style="{TABLE_STYLE}"><thead><tr>
<th style="{TH_STYLE}">Number</th>
<th style="{TH_STYLE}">Period</th>
<th style="{TH_STYLE}">Amount</th>
<th style="{TH_STYLE}">Status</th>
<th style="{TH_STYLE}">Due</th>
<th style="{TH_STYLE}">Paid at</th>
</tr></thead><tbody>{rows}</tbody></table>"#
    )
}
