use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{FromRef, Query, State},
    response::{Html, Redirect},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use crates::{
    domain::value_objects::{
        enums::{billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus},
        money::format_minor,
        subscriptions::{SubscriptionDetailDto, SubscriptionFilters},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            invoices::InvoicePostgres, plans::PlanPostgres, stores::StorePostgres,
            subscriptions::SubscriptionPostgres,
        },
    },
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{AdminAuthKeys, AdminSession},
    axum_http::{
        error_responses::AppError,
        flash::{FlashMessage, FlashSigner},
        views::{
            subscription_detail::{SubscriptionDetailView, render_subscription_detail},
            subscription_list::{SubscriptionListView, render_subscription_list},
        },
    },
    config::config_model::DotEnvyConfig,
    usecases::{
        subscription_search::filter_by_store_name,
        subscriptions::{SubscriptionController, SubscriptionError, SubscriptionUseCase},
    },
};

pub struct AdminState<C> {
    pub controller: Arc<C>,
    pub auth: Arc<AdminAuthKeys>,
    pub flash: Arc<FlashSigner>,
}

impl<C> Clone for AdminState<C> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            auth: Arc::clone(&self.auth),
            flash: Arc::clone(&self.flash),
        }
    }
}

impl<C> FromRef<AdminState<C>> for Arc<AdminAuthKeys> {
    fn from_ref(state: &AdminState<C>) -> Self {
        Arc::clone(&state.auth)
    }
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let invoice_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let store_repository = StorePostgres::new(Arc::clone(&db_pool));

    let subscription_usecase = SubscriptionUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(invoice_repository),
        Arc::new(plan_repository),
        Arc::new(store_repository),
    );

    router(AdminState {
        controller: Arc::new(subscription_usecase),
        auth: Arc::new(AdminAuthKeys::new(
            &config.admin_auth.jwt_secret,
            config.admin_auth.login_url.clone(),
        )),
        flash: Arc::new(FlashSigner::new(
            &config.flash.secret,
            config.flash.ttl_seconds,
            config.stage.secure_cookies(),
        )),
    })
}

pub fn router<C>(state: AdminState<C>) -> Router
where
    C: SubscriptionController + 'static,
{
    Router::new()
        .route("/", get(list_subscriptions::<C>))
        .route(
            "/detalhes",
            get(subscription_detail::<C>).post(subscription_action::<C>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub id: Option<String>,
    pub loja_id: Option<String>,
}

/// Form fields arrive as raw strings so bad input becomes a flash message
/// instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ActionForm {
    pub action: Option<String>,
    pub loja_id: Option<String>,
    pub plano_slug: Option<String>,
    pub trial_days: Option<String>,
    pub ciclo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailTarget {
    Subscription(Uuid),
    Store(Uuid),
}

impl DetailTarget {
    fn from_query(query: &DetailQuery) -> Result<Self, AppError> {
        if let Some(raw) = non_blank(query.id.as_deref()) {
            return parse_uuid(raw, "id").map(DetailTarget::Subscription);
        }
        if let Some(raw) = non_blank(query.loja_id.as_deref()) {
            return parse_uuid(raw, "loja_id").map(DetailTarget::Store);
        }
        Err(AppError::BadRequest(
            "Provide a subscription id or a loja_id".to_string(),
        ))
    }

    fn url(&self) -> String {
        match self {
            DetailTarget::Subscription(id) => format!("/admin/assinaturas/detalhes?id={}", id),
            DetailTarget::Store(id) => format!("/admin/assinaturas/detalhes?loja_id={}", id),
        }
    }

    fn store_id(&self) -> Option<Uuid> {
        match self {
            DetailTarget::Store(id) => Some(*id),
            DetailTarget::Subscription(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AdminAction {
    AssignPlan {
        store_id: Uuid,
        plan_slug: String,
        trial_days: Option<u32>,
        cycle: BillingCycle,
    },
    Lifecycle(LifecycleAction),
}

/// Actions that operate on an existing subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleAction {
    GenerateInvoice,
    Suspend,
    Cancel,
}

impl AdminAction {
    fn name(&self) -> &'static str {
        match self {
            AdminAction::AssignPlan { .. } => "assign_plan",
            AdminAction::Lifecycle(LifecycleAction::GenerateInvoice) => "generate_invoice",
            AdminAction::Lifecycle(LifecycleAction::Suspend) => "suspend",
            AdminAction::Lifecycle(LifecycleAction::Cancel) => "cancel",
        }
    }

    fn parse(form: &ActionForm, fallback_store_id: Option<Uuid>) -> Result<Self, String> {
        match non_blank(form.action.as_deref()) {
            Some("assign_plan") => {
                let store_id = match non_blank(form.loja_id.as_deref()) {
                    Some(raw) => Uuid::parse_str(raw).map_err(|_| "Invalid store id".to_string())?,
                    None => fallback_store_id.ok_or_else(|| "Missing store".to_string())?,
                };
                let plan_slug = non_blank(form.plano_slug.as_deref())
                    .ok_or_else(|| "Choose a plan".to_string())?
                    .to_string();
                let trial_days = match non_blank(form.trial_days.as_deref()) {
                    Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                        "Trial days must be a whole number of days".to_string()
                    })?),
                    None => None,
                };
                let cycle = match non_blank(form.ciclo.as_deref()) {
                    Some(raw) => BillingCycle::from_str(raw)
                        .ok_or_else(|| format!("Unknown billing cycle '{}'", raw))?,
                    None => BillingCycle::Monthly,
                };

                Ok(AdminAction::AssignPlan {
                    store_id,
                    plan_slug,
                    trial_days,
                    cycle,
                })
            }
            Some("generate_invoice") => Ok(AdminAction::Lifecycle(LifecycleAction::GenerateInvoice)),
            Some("suspend") => Ok(AdminAction::Lifecycle(LifecycleAction::Suspend)),
            Some("cancel") => Ok(AdminAction::Lifecycle(LifecycleAction::Cancel)),
            Some(other) => Err(format!("Unknown action '{}'", other)),
            None => Err("Missing action".to_string()),
        }
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {}", field)))
}

pub async fn list_subscriptions<C>(
    State(state): State<AdminState<C>>,
    session: AdminSession,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> (CookieJar, Html<String>)
where
    C: SubscriptionController + 'static,
{
    let (jar, flash) = state.flash.take(jar);
    let mut flashes: Vec<FlashMessage> = flash.into_iter().collect();

    let status = match non_blank(query.status.as_deref()) {
        Some(raw) => match SubscriptionStatus::from_str(raw) {
            Some(status) => Some(status),
            None => {
                warn!(status = raw, "admin_pages: ignoring unknown status filter");
                flashes.push(FlashMessage::error(format!(
                    "Unknown status filter '{}'",
                    raw
                )));
                None
            }
        },
        None => None,
    };

    let subscriptions = match state
        .controller
        .list_subscriptions(SubscriptionFilters { status })
        .await
    {
        Ok(subscriptions) => filter_by_store_name(subscriptions, query.search.as_deref()),
        Err(err) => {
            error!(
                admin_id = %session.user_id,
                error = ?err,
                "admin_pages: failed to list subscriptions"
            );
            flashes.push(FlashMessage::error(err.user_message()));
            Vec::new()
        }
    };

    let search = query.search.as_deref().map(str::trim).unwrap_or("");
    let html = render_subscription_list(&SubscriptionListView {
        subscriptions: &subscriptions,
        status,
        search,
        flashes: &flashes,
    });

    (jar, Html(html))
}

pub async fn subscription_detail<C>(
    State(state): State<AdminState<C>>,
    _session: AdminSession,
    jar: CookieJar,
    Query(query): Query<DetailQuery>,
) -> Result<(CookieJar, Html<String>), AppError>
where
    C: SubscriptionController + 'static,
{
    let target = DetailTarget::from_query(&query)?;
    let controller = &state.controller;

    let (store_id, subscription) = match target {
        DetailTarget::Subscription(subscription_id) => {
            let subscription = controller
                .get_subscription_by_id(subscription_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;
            (subscription.store_id, Some(subscription))
        }
        DetailTarget::Store(store_id) => {
            (store_id, controller.get_subscription_by_store(store_id).await?)
        }
    };

    let store = controller.find_store(store_id).await?;
    if store.is_none() && subscription.is_none() {
        return Err(AppError::NotFound("Store not found".to_string()));
    }

    let invoices = match &subscription {
        Some(subscription) => controller.get_invoices_by_subscription(subscription.id).await?,
        None => Vec::new(),
    };
    let plans = controller.list_active_plans().await?;

    let (jar, flash) = state.flash.take(jar);
    let flashes: Vec<FlashMessage> = flash.into_iter().collect();

    let html = render_subscription_detail(&SubscriptionDetailView {
        store_id,
        store: store.as_ref(),
        subscription: subscription.as_ref(),
        invoices: &invoices,
        plans: &plans,
        flashes: &flashes,
    });

    Ok((jar, Html(html)))
}

pub async fn subscription_action<C>(
    State(state): State<AdminState<C>>,
    session: AdminSession,
    jar: CookieJar,
    Query(query): Query<DetailQuery>,
    Form(form): Form<ActionForm>,
) -> Result<(CookieJar, Redirect), AppError>
where
    C: SubscriptionController + 'static,
{
    let target = DetailTarget::from_query(&query)?;

    let action = match AdminAction::parse(&form, target.store_id()) {
        Ok(action) => action,
        Err(message) => {
            warn!(
                admin_id = %session.user_id,
                action = ?form.action,
                reason = %message,
                "admin_pages: rejected action form"
            );
            let jar = state.flash.set(jar, FlashMessage::error(message));
            return Ok((jar, Redirect::to(&target.url())));
        }
    };

    let action_name = action.name();
    let (redirect_to, outcome) = run_action(state.controller.as_ref(), target, action).await;

    let flash = match outcome {
        Ok(message) => {
            info!(
                admin_id = %session.user_id,
                action = action_name,
                "admin_pages: action completed"
            );
            FlashMessage::success(message)
        }
        Err(err) => {
            if matches!(err, SubscriptionError::Internal(_)) {
                error!(
                    admin_id = %session.user_id,
                    action = action_name,
                    error = ?err,
                    "admin_pages: action failed"
                );
            } else {
                warn!(
                    admin_id = %session.user_id,
                    action = action_name,
                    status = err.status_code().as_u16(),
                    error = %err,
                    "admin_pages: action refused"
                );
            }
            FlashMessage::error(err.user_message())
        }
    };

    let jar = state.flash.set(jar, flash);
    Ok((jar, Redirect::to(&redirect_to.url())))
}

async fn run_action<C>(
    controller: &C,
    target: DetailTarget,
    action: AdminAction,
) -> (DetailTarget, Result<String, SubscriptionError>)
where
    C: SubscriptionController + ?Sized,
{
    let lifecycle = match action {
        AdminAction::AssignPlan {
            store_id,
            plan_slug,
            trial_days,
            cycle,
        } => {
            return match controller
                .assign_plan_to_store(store_id, plan_slug.clone(), trial_days, cycle)
                .await
            {
                Ok(outcome) => {
                    let message = if outcome.created {
                        format!("Subscription created on plan {}", plan_slug)
                    } else {
                        format!("Subscription moved to plan {}", plan_slug)
                    };
                    (DetailTarget::Subscription(outcome.subscription_id), Ok(message))
                }
                Err(err) => (target, Err(err)),
            };
        }
        AdminAction::Lifecycle(lifecycle) => lifecycle,
    };

    let subscription_id = match resolve_subscription_id(controller, target).await {
        Ok(subscription_id) => subscription_id,
        Err(err) => return (target, Err(err)),
    };

    let result = match lifecycle {
        LifecycleAction::GenerateInvoice => controller
            .generate_invoice_for_subscription(subscription_id)
            .await
            .map(|invoice| {
                format!(
                    "Invoice {} issued for {}, due {}",
                    invoice.number,
                    format_minor(invoice.amount_minor, &invoice.currency),
                    invoice.due_date.format("%d/%m/%Y")
                )
            }),
        LifecycleAction::Suspend => controller
            .suspend_subscription(subscription_id)
            .await
            .map(|_| "Subscription suspended".to_string()),
        LifecycleAction::Cancel => controller
            .cancel_subscription(subscription_id)
            .await
            .map(|_| "Subscription canceled".to_string()),
    };

    (target, result)
}

async fn resolve_subscription_id<C>(
    controller: &C,
    target: DetailTarget,
) -> Result<Uuid, SubscriptionError>
where
    C: SubscriptionController + ?Sized,
{
    match target {
        DetailTarget::Subscription(subscription_id) => Ok(subscription_id),
        DetailTarget::Store(store_id) => controller
            .get_subscription_by_store(store_id)
            .await?
            .map(|subscription: SubscriptionDetailDto| subscription.id)
            .ok_or(SubscriptionError::SubscriptionNotFound),
    }
}
