use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use crates::domain::{
    entities::{
        invoices::{InsertInvoiceEntity, IssueInvoiceOutcome},
        subscriptions::{
            InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionPeriodEntity,
            UpdateSubscriptionPlanEntity,
        },
    },
    repositories::{
        invoices::InvoiceRepository, plans::PlanRepository, stores::StoreRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        enums::{
            billing_cycles::BillingCycle, invoice_statuses::InvoiceStatus,
            subscription_statuses::SubscriptionStatus,
        },
        invoices::{GeneratedInvoice, InvoiceDto},
        plans::PlanDto,
        stores::StoreDto,
        subscriptions::{AssignPlanOutcome, SubscriptionDetailDto, SubscriptionFilters},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::billing_periods::{self, BillingSchedule};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("store not found")]
    StoreNotFound,
    #[error("plan '{0}' not found or inactive")]
    PlanNotFound(String),
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("cannot change subscription from {from} to {to}")]
    InvalidTransition {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },
    #[error("subscription with status {0} cannot be invoiced")]
    SubscriptionNotBillable(SubscriptionStatus),
    #[error("invoice {0} was already issued for the current period")]
    InvoiceAlreadyIssued(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::StoreNotFound
            | SubscriptionError::PlanNotFound(_)
            | SubscriptionError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            SubscriptionError::InvalidTransition { .. }
            | SubscriptionError::SubscriptionNotBillable(_)
            | SubscriptionError::InvoiceAlreadyIssued(_) => StatusCode::CONFLICT,
            SubscriptionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the admin. Internal causes stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            SubscriptionError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Everything the admin pages ask of the billing backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionController: Send + Sync {
    async fn assign_plan_to_store(
        &self,
        store_id: Uuid,
        plan_slug: String,
        trial_days: Option<u32>,
        cycle: BillingCycle,
    ) -> UseCaseResult<AssignPlanOutcome>;

    async fn generate_invoice_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> UseCaseResult<GeneratedInvoice>;

    async fn suspend_subscription(&self, subscription_id: Uuid) -> UseCaseResult<()>;

    async fn cancel_subscription(&self, subscription_id: Uuid) -> UseCaseResult<()>;

    async fn get_subscription_by_id(
        &self,
        subscription_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionDetailDto>>;

    async fn get_subscription_by_store(
        &self,
        store_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionDetailDto>>;

    async fn get_invoices_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> UseCaseResult<Vec<InvoiceDto>>;

    async fn list_subscriptions(
        &self,
        filters: SubscriptionFilters,
    ) -> UseCaseResult<Vec<SubscriptionDetailDto>>;

    async fn list_active_plans(&self) -> UseCaseResult<Vec<PlanDto>>;

    async fn find_store(&self, store_id: Uuid) -> UseCaseResult<Option<StoreDto>>;
}

pub struct SubscriptionUseCase<S, I, P, St>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    St: StoreRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    invoice_repo: Arc<I>,
    plan_repo: Arc<P>,
    store_repo: Arc<St>,
}

impl<S, I, P, St> SubscriptionUseCase<S, I, P, St>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    St: StoreRepository + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        invoice_repo: Arc<I>,
        plan_repo: Arc<P>,
        store_repo: Arc<St>,
    ) -> Self {
        Self {
            subscription_repo,
            invoice_repo,
            plan_repo,
            store_repo,
        }
    }

    async fn load_subscription(&self, subscription_id: Uuid) -> UseCaseResult<SubscriptionEntity> {
        self.subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to load subscription"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::SubscriptionNotFound;
                warn!(
                    %subscription_id,
                    status = err.status_code().as_u16(),
                    "subscriptions: subscription not found"
                );
                err
            })
    }

    fn parse_status(subscription: &SubscriptionEntity) -> UseCaseResult<SubscriptionStatus> {
        SubscriptionStatus::from_str(&subscription.status).ok_or_else(|| {
            SubscriptionError::Internal(anyhow!(
                "subscription {} has unknown status {}",
                subscription.id,
                subscription.status
            ))
        })
    }

    fn parse_cycle(subscription: &SubscriptionEntity) -> UseCaseResult<BillingCycle> {
        BillingCycle::from_str(&subscription.billing_cycle).ok_or_else(|| {
            SubscriptionError::Internal(anyhow!(
                "subscription {} has unknown billing cycle {}",
                subscription.id,
                subscription.billing_cycle
            ))
        })
    }

    fn schedule_error() -> SubscriptionError {
        SubscriptionError::InvalidInput("billing period is out of the supported date range".into())
    }

    /// Schedule for an existing subscription changing plan.
    ///
    /// A billable subscription that stays on its cycle keeps its period and
    /// next invoice date. A new period starts on a cycle change, on an
    /// explicit fresh trial or when a suspended subscription is reactivated.
    /// Without an explicit trial the running trial (if any) is kept and no
    /// new one is granted.
    fn reschedule(
        existing: &SubscriptionEntity,
        current_status: SubscriptionStatus,
        trial_days: Option<u32>,
        cycle: BillingCycle,
        today: NaiveDate,
    ) -> UseCaseResult<BillingSchedule> {
        let trial_running = existing.trial_end.is_some_and(|trial_end| trial_end > today);
        let same_cycle = Self::parse_cycle(existing)? == cycle;
        let trial_kept = match trial_days {
            None => true,
            Some(0) => !trial_running,
            Some(_) => false,
        };

        if current_status != SubscriptionStatus::Suspended && same_cycle && trial_kept {
            let status = if trial_running {
                SubscriptionStatus::Trial
            } else {
                SubscriptionStatus::Active
            };
            return Ok(BillingSchedule {
                status,
                trial_end: existing.trial_end,
                period_start: existing.current_period_start,
                period_end: existing.current_period_end,
                next_invoice_date: existing
                    .next_invoice_date
                    .unwrap_or(existing.current_period_start),
                anchor: existing.billing_anchor,
            });
        }

        let schedule = match (trial_days, existing.trial_end) {
            (Some(days), _) => BillingSchedule::start(today, days, cycle),
            (None, Some(trial_end)) if trial_end > today => {
                BillingSchedule::continue_trial(trial_end, cycle)
            }
            (None, _) => BillingSchedule::start(today, 0, cycle),
        };
        schedule.ok_or_else(Self::schedule_error)
    }

    /// A trial whose end has passed is billed as active.
    fn settled_status(
        status: SubscriptionStatus,
        trial_end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> SubscriptionStatus {
        let trial_over = status == SubscriptionStatus::Trial
            && trial_end.is_none_or(|trial_end| trial_end <= today);
        if trial_over && status.can_transition_to(SubscriptionStatus::Active) {
            SubscriptionStatus::Active
        } else {
            status
        }
    }

    fn invoice_number(period_start: NaiveDate) -> String {
        let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("INV-{}-{}", period_start.format("%Y%m"), &suffix[..8])
    }
}

#[async_trait]
impl<S, I, P, St> SubscriptionController for SubscriptionUseCase<S, I, P, St>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    St: StoreRepository + Send + Sync + 'static,
{
    async fn assign_plan_to_store(
        &self,
        store_id: Uuid,
        plan_slug: String,
        trial_days: Option<u32>,
        cycle: BillingCycle,
    ) -> UseCaseResult<AssignPlanOutcome> {
        info!(
            %store_id,
            plan_slug = %plan_slug,
            ?trial_days,
            cycle = %cycle,
            "subscriptions: assign plan requested"
        );

        let store = self.store_repo.find_by_id(store_id).await.map_err(|err| {
            error!(%store_id, db_error = ?err, "subscriptions: failed to load store");
            SubscriptionError::Internal(err)
        })?;
        if store.is_none() {
            let err = SubscriptionError::StoreNotFound;
            warn!(
                %store_id,
                status = err.status_code().as_u16(),
                "subscriptions: store not found for plan assignment"
            );
            return Err(err);
        }

        let plan = self
            .plan_repo
            .find_active_by_slug(&plan_slug)
            .await
            .map_err(|err| {
                error!(
                    %store_id,
                    plan_slug = %plan_slug,
                    db_error = ?err,
                    "subscriptions: failed to load plan"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::PlanNotFound(plan_slug.clone());
                warn!(
                    %store_id,
                    plan_slug = %plan_slug,
                    status = err.status_code().as_u16(),
                    "subscriptions: plan missing or inactive"
                );
                err
            })?;

        if plan.price_for_cycle(cycle).is_none_or(|price| price < 0) {
            let err = SubscriptionError::InvalidInput(format!(
                "plan '{}' has no valid {} price",
                plan.slug, cycle
            ));
            warn!(
                %store_id,
                plan_slug = %plan.slug,
                status = err.status_code().as_u16(),
                "subscriptions: plan price invalid for cycle"
            );
            return Err(err);
        }

        let today = Utc::now().date_naive();
        let existing = self
            .subscription_repo
            .find_latest_by_store(store_id)
            .await
            .map_err(|err| {
                error!(
                    %store_id,
                    db_error = ?err,
                    "subscriptions: failed to load store subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        let existing = match existing {
            Some(subscription) => {
                let status = Self::parse_status(&subscription)?;
                if status.is_terminal() { None } else { Some((subscription, status)) }
            }
            None => None,
        };

        match existing {
            None => {
                let days = trial_days.unwrap_or_else(|| u32::try_from(plan.trial_days).unwrap_or(0));
                let schedule =
                    BillingSchedule::start(today, days, cycle).ok_or_else(Self::schedule_error)?;

                let subscription_id = self
                    .subscription_repo
                    .create_subscription(InsertSubscriptionEntity {
                        store_id,
                        plan_id: plan.id,
                        status: schedule.status.to_string(),
                        billing_cycle: cycle.to_string(),
                        trial_end: schedule.trial_end,
                        current_period_start: schedule.period_start,
                        current_period_end: schedule.period_end,
                        billing_anchor: schedule.anchor,
                        next_invoice_date: Some(schedule.next_invoice_date),
                    })
                    .await
                    .map_err(|err| {
                        error!(
                            %store_id,
                            plan_id = %plan.id,
                            db_error = ?err,
                            "subscriptions: failed to create subscription"
                        );
                        SubscriptionError::Internal(err)
                    })?;

                info!(
                    %store_id,
                    %subscription_id,
                    plan_slug = %plan.slug,
                    status = %schedule.status,
                    "subscriptions: subscription created"
                );

                Ok(AssignPlanOutcome {
                    subscription_id,
                    created: true,
                })
            }
            Some((subscription, current_status)) => {
                let schedule =
                    Self::reschedule(&subscription, current_status, trial_days, cycle, today)?;

                if !current_status.can_transition_to(schedule.status) {
                    let err = SubscriptionError::InvalidTransition {
                        from: current_status,
                        to: schedule.status,
                    };
                    warn!(
                        %store_id,
                        subscription_id = %subscription.id,
                        status = err.status_code().as_u16(),
                        "subscriptions: plan change rejected"
                    );
                    return Err(err);
                }

                let updated = self
                    .subscription_repo
                    .update_plan(
                        subscription.id,
                        UpdateSubscriptionPlanEntity {
                            plan_id: plan.id,
                            status: schedule.status.to_string(),
                            billing_cycle: cycle.to_string(),
                            trial_end: schedule.trial_end,
                            current_period_start: schedule.period_start,
                            current_period_end: schedule.period_end,
                            billing_anchor: schedule.anchor,
                            next_invoice_date: Some(schedule.next_invoice_date),
                            suspended_at: None,
                            updated_at: Utc::now(),
                        },
                    )
                    .await
                    .map_err(|err| {
                        error!(
                            %store_id,
                            subscription_id = %subscription.id,
                            db_error = ?err,
                            "subscriptions: failed to change subscription plan"
                        );
                        SubscriptionError::Internal(err)
                    })?;

                if !updated {
                    let err = SubscriptionError::InvalidTransition {
                        from: SubscriptionStatus::Canceled,
                        to: schedule.status,
                    };
                    warn!(
                        %store_id,
                        subscription_id = %subscription.id,
                        status = err.status_code().as_u16(),
                        "subscriptions: subscription cancelled during plan change"
                    );
                    return Err(err);
                }

                info!(
                    %store_id,
                    subscription_id = %subscription.id,
                    plan_slug = %plan.slug,
                    from_status = %current_status,
                    to_status = %schedule.status,
                    "subscriptions: subscription plan changed"
                );

                Ok(AssignPlanOutcome {
                    subscription_id: subscription.id,
                    created: false,
                })
            }
        }
    }

    async fn generate_invoice_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> UseCaseResult<GeneratedInvoice> {
        info!(%subscription_id, "subscriptions: generate invoice requested");

        let relations = self
            .subscription_repo
            .find_with_relations_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to load subscription for invoicing"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::SubscriptionNotFound;
                warn!(
                    %subscription_id,
                    status = err.status_code().as_u16(),
                    "subscriptions: subscription not found for invoicing"
                );
                err
            })?;

        let subscription = &relations.subscription;
        let plan = &relations.plan;

        let status = Self::parse_status(subscription)?;
        if matches!(
            status,
            SubscriptionStatus::Canceled | SubscriptionStatus::Suspended
        ) {
            let err = SubscriptionError::SubscriptionNotBillable(status);
            warn!(
                %subscription_id,
                status = err.status_code().as_u16(),
                subscription_status = %status,
                "subscriptions: subscription not billable"
            );
            return Err(err);
        }
        let cycle = Self::parse_cycle(subscription)?;

        let today = Utc::now().date_naive();
        let (period_start, period_end) = billing_periods::current_period(
            subscription.billing_anchor,
            subscription.current_period_start,
            subscription.current_period_end,
            cycle,
            today,
        )
        .ok_or_else(Self::schedule_error)?;

        let rolled = period_start != subscription.current_period_start;
        let next_invoice_date = if rolled {
            Some(period_start)
        } else {
            subscription.next_invoice_date
        };
        let billed_status = Self::settled_status(status, subscription.trial_end, today);

        let amount_minor = plan
            .price_for_cycle(cycle)
            .filter(|price| *price >= 0)
            .ok_or_else(|| {
                SubscriptionError::InvalidInput(format!(
                    "plan '{}' has no valid {} price",
                    plan.slug, cycle
                ))
            })?;

        let due_date = billing_periods::invoice_due_date(next_invoice_date, period_start);

        let outcome = self
            .invoice_repo
            .issue_invoice(
                InsertInvoiceEntity {
                    subscription_id,
                    store_id: subscription.store_id,
                    plan_id: plan.id,
                    number: Self::invoice_number(period_start),
                    amount_minor,
                    currency: plan.currency.clone(),
                    status: InvoiceStatus::Pending.to_string(),
                    period_start,
                    period_end,
                    due_date,
                },
                UpdateSubscriptionPeriodEntity {
                    status: billed_status.to_string(),
                    current_period_start: period_start,
                    current_period_end: period_end,
                    next_invoice_date: Some(period_end),
                    updated_at: Utc::now(),
                },
            )
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to issue invoice"
                );
                SubscriptionError::Internal(err)
            })?;

        let invoice = match outcome {
            IssueInvoiceOutcome::Issued(invoice) => invoice,
            IssueInvoiceOutcome::AlreadyIssued(number) => {
                let err = SubscriptionError::InvoiceAlreadyIssued(number);
                warn!(
                    %subscription_id,
                    %period_start,
                    status = err.status_code().as_u16(),
                    "subscriptions: invoice already issued for period"
                );
                return Err(err);
            }
            IssueInvoiceOutcome::SubscriptionNotBillable(locked_status) => {
                let locked_status = SubscriptionStatus::from_str(&locked_status).ok_or_else(|| {
                    SubscriptionError::Internal(anyhow!(
                        "subscription {} has unknown status {}",
                        subscription_id,
                        locked_status
                    ))
                })?;
                let err = SubscriptionError::SubscriptionNotBillable(locked_status);
                warn!(
                    %subscription_id,
                    status = err.status_code().as_u16(),
                    subscription_status = %locked_status,
                    "subscriptions: subscription stopped being billable before invoicing"
                );
                return Err(err);
            }
        };

        if rolled {
            info!(
                %subscription_id,
                %period_start,
                %period_end,
                "subscriptions: billing period rolled forward"
            );
        }
        if billed_status != status {
            info!(
                %subscription_id,
                from_status = %status,
                to_status = %billed_status,
                "subscriptions: trial ended"
            );
        }
        info!(
            %subscription_id,
            invoice_number = %invoice.number,
            amount_minor,
            %due_date,
            "subscriptions: invoice generated"
        );

        Ok(GeneratedInvoice {
            number: invoice.number,
            amount_minor: invoice.amount_minor,
            currency: invoice.currency,
            due_date: invoice.due_date,
        })
    }

    async fn suspend_subscription(&self, subscription_id: Uuid) -> UseCaseResult<()> {
        info!(%subscription_id, "subscriptions: suspend requested");

        let subscription = self.load_subscription(subscription_id).await?;
        let status = Self::parse_status(&subscription)?;

        if status == SubscriptionStatus::Suspended {
            info!(%subscription_id, "subscriptions: already suspended");
            return Ok(());
        }
        if !status.can_transition_to(SubscriptionStatus::Suspended) {
            let err = SubscriptionError::InvalidTransition {
                from: status,
                to: SubscriptionStatus::Suspended,
            };
            warn!(
                %subscription_id,
                status = err.status_code().as_u16(),
                "subscriptions: suspend rejected"
            );
            return Err(err);
        }

        let suspended = self
            .subscription_repo
            .mark_suspended(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to suspend subscription"
                );
                SubscriptionError::Internal(err)
            })?;
        if !suspended {
            let err = SubscriptionError::InvalidTransition {
                from: SubscriptionStatus::Canceled,
                to: SubscriptionStatus::Suspended,
            };
            warn!(
                %subscription_id,
                status = err.status_code().as_u16(),
                "subscriptions: subscription cancelled before suspend"
            );
            return Err(err);
        }

        info!(%subscription_id, from_status = %status, "subscriptions: subscription suspended");
        Ok(())
    }

    async fn cancel_subscription(&self, subscription_id: Uuid) -> UseCaseResult<()> {
        info!(%subscription_id, "subscriptions: cancel requested");

        let subscription = self.load_subscription(subscription_id).await?;
        let status = Self::parse_status(&subscription)?;

        if status.is_terminal() {
            let err = SubscriptionError::InvalidTransition {
                from: status,
                to: SubscriptionStatus::Canceled,
            };
            warn!(
                %subscription_id,
                status = err.status_code().as_u16(),
                "subscriptions: subscription already cancelled"
            );
            return Err(err);
        }

        let canceled = self
            .subscription_repo
            .mark_canceled(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to cancel subscription"
                );
                SubscriptionError::Internal(err)
            })?;
        if !canceled {
            let err = SubscriptionError::InvalidTransition {
                from: SubscriptionStatus::Canceled,
                to: SubscriptionStatus::Canceled,
            };
            warn!(
                %subscription_id,
                status = err.status_code().as_u16(),
                "subscriptions: subscription already cancelled"
            );
            return Err(err);
        }

        info!(%subscription_id, from_status = %status, "subscriptions: subscription cancelled");
        Ok(())
    }

    async fn get_subscription_by_id(
        &self,
        subscription_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionDetailDto>> {
        let relations = self
            .subscription_repo
            .find_with_relations_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to load subscription detail"
                );
                SubscriptionError::Internal(err)
            })?;

        match relations {
            Some(relations) => Ok(Some(SubscriptionDetailDto::try_from(relations)?)),
            None => Ok(None),
        }
    }

    async fn get_subscription_by_store(
        &self,
        store_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionDetailDto>> {
        let latest = self
            .subscription_repo
            .find_latest_by_store(store_id)
            .await
            .map_err(|err| {
                error!(
                    %store_id,
                    db_error = ?err,
                    "subscriptions: failed to load store subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        match latest {
            Some(subscription) => self.get_subscription_by_id(subscription.id).await,
            None => Ok(None),
        }
    }

    async fn get_invoices_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> UseCaseResult<Vec<InvoiceDto>> {
        let invoices = self
            .invoice_repo
            .list_by_subscription(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to list invoices"
                );
                SubscriptionError::Internal(err)
            })?;

        let mut dtos = invoices
            .into_iter()
            .map(InvoiceDto::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        dtos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(dtos)
    }

    async fn list_subscriptions(
        &self,
        filters: SubscriptionFilters,
    ) -> UseCaseResult<Vec<SubscriptionDetailDto>> {
        info!(status = ?filters.status, "subscriptions: listing subscriptions");

        let rows = self
            .subscription_repo
            .list_with_relations(filters.status)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to list subscriptions");
                SubscriptionError::Internal(err)
            })?;

        let subscriptions = rows
            .into_iter()
            .map(SubscriptionDetailDto::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;

        // Exact status match regardless of repository filtering.
        let subscriptions: Vec<_> = match filters.status {
            Some(status) => subscriptions
                .into_iter()
                .filter(|subscription| subscription.status == status)
                .collect(),
            None => subscriptions,
        };

        let subscription_count = subscriptions.len();
        info!(subscription_count, "subscriptions: subscriptions loaded");
        Ok(subscriptions)
    }

    async fn list_active_plans(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = self.plan_repo.list_active_plans().await.map_err(|err| {
            error!(db_error = ?err, "subscriptions: failed to list active plans");
            SubscriptionError::Internal(err)
        })?;

        let mut plans: Vec<PlanDto> = plans.into_iter().map(PlanDto::from).collect();
        plans.sort_by_key(|plan| plan.monthly_price_minor);
        Ok(plans)
    }

    async fn find_store(&self, store_id: Uuid) -> UseCaseResult<Option<StoreDto>> {
        let store = self.store_repo.find_by_id(store_id).await.map_err(|err| {
            error!(%store_id, db_error = ?err, "subscriptions: failed to load store");
            SubscriptionError::Internal(err)
        })?;

        Ok(store.map(StoreDto::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, Months};
    use crates::domain::{
        entities::{
            invoices::InvoiceEntity, plans::PlanEntity, stores::StoreEntity,
            subscriptions::SubscriptionWithRelations,
        },
        repositories::{
            invoices::MockInvoiceRepository, plans::MockPlanRepository,
            stores::MockStoreRepository, subscriptions::MockSubscriptionRepository,
        },
    };
    use mockall::predicate::eq;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn sample_store(id: Uuid) -> StoreEntity {
        StoreEntity {
            id,
            name: "Padaria Central".to_string(),
            email: "contato@padaria.example".to_string(),
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn sample_plan(slug: &str, monthly_price_minor: i32, trial_days: i32) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: "Pro".to_string(),
            monthly_price_minor,
            yearly_price_minor: None,
            trial_days,
            currency: "BRL".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn sample_subscription(
        store_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
        cycle: BillingCycle,
        period_start: NaiveDate,
    ) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            store_id,
            plan_id,
            status: status.to_string(),
            billing_cycle: cycle.to_string(),
            trial_end: None,
            current_period_start: period_start,
            current_period_end: billing_periods::period_end(period_start, cycle).unwrap(),
            billing_anchor: period_start,
            next_invoice_date: Some(period_start),
            suspended_at: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn invoice_from(insert: InsertInvoiceEntity) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            subscription_id: insert.subscription_id,
            store_id: insert.store_id,
            plan_id: insert.plan_id,
            number: insert.number,
            amount_minor: insert.amount_minor,
            currency: insert.currency,
            status: insert.status,
            period_start: insert.period_start,
            period_end: insert.period_end,
            due_date: insert.due_date,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    fn usecase(
        subscription_repo: MockSubscriptionRepository,
        invoice_repo: MockInvoiceRepository,
        plan_repo: MockPlanRepository,
        store_repo: MockStoreRepository,
    ) -> SubscriptionUseCase<
        MockSubscriptionRepository,
        MockInvoiceRepository,
        MockPlanRepository,
        MockStoreRepository,
    > {
        SubscriptionUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(invoice_repo),
            Arc::new(plan_repo),
            Arc::new(store_repo),
        )
    }

    fn store_repo_with(store_id: Uuid) -> MockStoreRepository {
        let mut store_repo = MockStoreRepository::new();
        store_repo
            .expect_find_by_id()
            .with(eq(store_id))
            .returning(|id| Ok(Some(sample_store(id))));
        store_repo
    }

    fn plan_repo_with(plan: PlanEntity) -> MockPlanRepository {
        let mut plan_repo = MockPlanRepository::new();
        let slug = plan.slug.clone();
        plan_repo
            .expect_find_active_by_slug()
            .withf(move |requested| requested == slug)
            .returning(move |_| Ok(Some(plan.clone())));
        plan_repo
    }

    #[tokio::test]
    async fn assign_plan_with_unknown_slug_never_creates_subscription() {
        let store_id = Uuid::new_v4();

        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_active_by_slug()
            .returning(|_| Ok(None));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_create_subscription().times(0);
        subscription_repo.expect_update_plan().times(0);

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo,
            store_repo_with(store_id),
        );

        let err = usecase
            .assign_plan_to_store(store_id, "ghost".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::PlanNotFound(ref slug) if slug == "ghost"));
        assert_eq!(err.user_message(), "plan 'ghost' not found or inactive");
    }

    #[tokio::test]
    async fn assign_plan_to_unknown_store_fails() {
        let mut store_repo = MockStoreRepository::new();
        store_repo.expect_find_by_id().returning(|_| Ok(None));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_create_subscription().times(0);

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            store_repo,
        );

        let err = usecase
            .assign_plan_to_store(Uuid::new_v4(), "pro".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::StoreNotFound));
    }

    #[tokio::test]
    async fn assign_plan_without_trial_days_uses_plan_default() {
        let store_id = Uuid::new_v4();
        let created_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 14);
        let plan_id = plan.id;
        let trial_end = today().checked_add_days(Days::new(14)).unwrap();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .with(eq(store_id))
            .returning(|_| Ok(None));
        subscription_repo
            .expect_create_subscription()
            .withf(move |insert| {
                insert.store_id == store_id
                    && insert.plan_id == plan_id
                    && insert.status == "trial"
                    && insert.trial_end == Some(trial_end)
                    && insert.current_period_start == trial_end
                    && insert.next_invoice_date == Some(trial_end)
                    && insert.billing_cycle == "monthly"
            })
            .times(1)
            .returning(move |_| Ok(created_id));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        let outcome = usecase
            .assign_plan_to_store(store_id, "pro".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AssignPlanOutcome {
                subscription_id: created_id,
                created: true,
            }
        );
    }

    #[tokio::test]
    async fn assign_plan_with_zero_trial_days_has_no_trial() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 14);
        let today = today();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(|_| Ok(None));
        subscription_repo
            .expect_create_subscription()
            .withf(move |insert| {
                insert.status == "ativa"
                    && insert.trial_end.is_none()
                    && insert.current_period_start == today
            })
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        let outcome = usecase
            .assign_plan_to_store(store_id, "pro".to_string(), Some(0), BillingCycle::Yearly)
            .await
            .unwrap();

        assert!(outcome.created);
    }

    #[tokio::test]
    async fn assign_plan_reactivates_suspended_subscription() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 14);
        let existing = sample_subscription(
            store_id,
            Uuid::new_v4(),
            SubscriptionStatus::Suspended,
            BillingCycle::Monthly,
            today(),
        );
        let existing_id = existing.id;
        let plan_id = plan.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(move |_| Ok(Some(existing.clone())));
        subscription_repo.expect_create_subscription().times(0);
        subscription_repo
            .expect_update_plan()
            .withf(move |id, changes| {
                *id == existing_id
                    && changes.plan_id == plan_id
                    && changes.status == "ativa"
                    && changes.suspended_at.is_none()
                    && changes.billing_cycle == "yearly"
                    && changes.current_period_start == today()
                    && changes.billing_anchor == today()
            })
            .times(1)
            .returning(|_, _| Ok(true));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        let outcome = usecase
            .assign_plan_to_store(store_id, "pro".to_string(), None, BillingCycle::Yearly)
            .await
            .unwrap();

        assert_eq!(outcome.subscription_id, existing_id);
        assert!(!outcome.created);
    }

    #[tokio::test]
    async fn resaving_same_plan_and_cycle_keeps_billing_period() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 14);
        let period_start = today().checked_sub_days(Days::new(10)).unwrap();
        let mut existing = sample_subscription(
            store_id,
            plan.id,
            SubscriptionStatus::Active,
            BillingCycle::Monthly,
            period_start,
        );
        let period_end = existing.current_period_end;
        existing.next_invoice_date = Some(period_end);
        let existing_id = existing.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(move |_| Ok(Some(existing.clone())));
        subscription_repo
            .expect_update_plan()
            .withf(move |id, changes| {
                *id == existing_id
                    && changes.status == "ativa"
                    && changes.trial_end.is_none()
                    && changes.current_period_start == period_start
                    && changes.current_period_end == period_end
                    && changes.next_invoice_date == Some(period_end)
                    && changes.billing_anchor == period_start
            })
            .times(1)
            .returning(|_, _| Ok(true));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        let outcome = usecase
            .assign_plan_to_store(store_id, "pro".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap();

        assert_eq!(outcome.subscription_id, existing_id);
    }

    #[tokio::test]
    async fn plan_change_settles_past_due_without_moving_period() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("business", 19990, 0);
        let period_start = today().checked_sub_days(Days::new(3)).unwrap();
        let existing = sample_subscription(
            store_id,
            Uuid::new_v4(),
            SubscriptionStatus::PastDue,
            BillingCycle::Monthly,
            period_start,
        );

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(move |_| Ok(Some(existing.clone())));
        subscription_repo
            .expect_update_plan()
            .withf(move |_, changes| {
                changes.status == "ativa"
                    && changes.current_period_start == period_start
                    && changes.next_invoice_date == Some(period_start)
            })
            .times(1)
            .returning(|_, _| Ok(true));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        usecase
            .assign_plan_to_store(store_id, "business".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cycle_change_starts_new_period_today() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 14);
        let existing = sample_subscription(
            store_id,
            plan.id,
            SubscriptionStatus::Active,
            BillingCycle::Monthly,
            today().checked_sub_days(Days::new(10)).unwrap(),
        );
        let today = today();
        let year_later = today.checked_add_months(Months::new(12)).unwrap();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(move |_| Ok(Some(existing.clone())));
        subscription_repo
            .expect_update_plan()
            .withf(move |_, changes| {
                changes.billing_cycle == "yearly"
                    && changes.current_period_start == today
                    && changes.current_period_end == year_later
                    && changes.billing_anchor == today
                    && changes.next_invoice_date == Some(today)
            })
            .times(1)
            .returning(|_, _| Ok(true));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        usecase
            .assign_plan_to_store(store_id, "pro".to_string(), None, BillingCycle::Yearly)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn plan_change_on_concurrently_cancelled_subscription_is_rejected() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 0);
        let existing = sample_subscription(
            store_id,
            plan.id,
            SubscriptionStatus::Active,
            BillingCycle::Monthly,
            today(),
        );

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(move |_| Ok(Some(existing.clone())));
        subscription_repo
            .expect_update_plan()
            .times(1)
            .returning(|_, _| Ok(false));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        let err = usecase
            .assign_plan_to_store(store_id, "pro".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscriptionError::InvalidTransition {
                from: SubscriptionStatus::Canceled,
                to: SubscriptionStatus::Active,
            }
        ));
    }

    #[tokio::test]
    async fn assign_plan_after_cancellation_creates_new_subscription() {
        let store_id = Uuid::new_v4();
        let plan = sample_plan("pro", 4990, 0);
        let cancelled = sample_subscription(
            store_id,
            Uuid::new_v4(),
            SubscriptionStatus::Canceled,
            BillingCycle::Monthly,
            today(),
        );
        let cancelled_id = cancelled.id;
        let new_id = Uuid::new_v4();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_latest_by_store()
            .returning(move |_| Ok(Some(cancelled.clone())));
        subscription_repo.expect_update_plan().times(0);
        subscription_repo
            .expect_create_subscription()
            .times(1)
            .returning(move |_| Ok(new_id));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            plan_repo_with(plan),
            store_repo_with(store_id),
        );

        let outcome = usecase
            .assign_plan_to_store(store_id, "pro".to_string(), None, BillingCycle::Monthly)
            .await
            .unwrap();

        assert_eq!(outcome.subscription_id, new_id);
        assert_ne!(outcome.subscription_id, cancelled_id);
    }

    #[tokio::test]
    async fn cancelled_subscription_cannot_be_suspended_or_cancelled_again() {
        let cancelled = sample_subscription(
            Uuid::new_v4(),
            Uuid::new_v4(),
            SubscriptionStatus::Canceled,
            BillingCycle::Monthly,
            today(),
        );
        let cancelled_id = cancelled.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .with(eq(cancelled_id))
            .returning(move |_| Ok(Some(cancelled.clone())));
        subscription_repo.expect_mark_suspended().times(0);
        subscription_repo.expect_mark_canceled().times(0);

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockStoreRepository::new(),
        );

        let suspend = usecase.suspend_subscription(cancelled_id).await.unwrap_err();
        assert!(matches!(
            suspend,
            SubscriptionError::InvalidTransition {
                from: SubscriptionStatus::Canceled,
                to: SubscriptionStatus::Suspended,
            }
        ));

        let cancel = usecase.cancel_subscription(cancelled_id).await.unwrap_err();
        assert!(matches!(cancel, SubscriptionError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancel_marks_active_subscription_cancelled() {
        let active = sample_subscription(
            Uuid::new_v4(),
            Uuid::new_v4(),
            SubscriptionStatus::Active,
            BillingCycle::Monthly,
            today(),
        );
        let active_id = active.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(active.clone())));
        subscription_repo
            .expect_mark_canceled()
            .with(eq(active_id))
            .times(1)
            .returning(|_| Ok(true));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockStoreRepository::new(),
        );

        usecase.cancel_subscription(active_id).await.unwrap();
    }

    #[tokio::test]
    async fn lifecycle_writes_lost_to_concurrent_cancellation_are_rejected() {
        let active = sample_subscription(
            Uuid::new_v4(),
            Uuid::new_v4(),
            SubscriptionStatus::Active,
            BillingCycle::Monthly,
            today(),
        );
        let active_id = active.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(active.clone())));
        subscription_repo
            .expect_mark_suspended()
            .with(eq(active_id))
            .times(1)
            .returning(|_| Ok(false));
        subscription_repo
            .expect_mark_canceled()
            .with(eq(active_id))
            .times(1)
            .returning(|_| Ok(false));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockStoreRepository::new(),
        );

        let suspend = usecase.suspend_subscription(active_id).await.unwrap_err();
        assert!(matches!(
            suspend,
            SubscriptionError::InvalidTransition {
                from: SubscriptionStatus::Canceled,
                to: SubscriptionStatus::Suspended,
            }
        ));

        let cancel = usecase.cancel_subscription(active_id).await.unwrap_err();
        assert_eq!(cancel.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn suspending_twice_is_a_no_op() {
        let suspended = sample_subscription(
            Uuid::new_v4(),
            Uuid::new_v4(),
            SubscriptionStatus::Suspended,
            BillingCycle::Monthly,
            today(),
        );
        let suspended_id = suspended.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(suspended.clone())));
        subscription_repo.expect_mark_suspended().times(0);

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockStoreRepository::new(),
        );

        usecase.suspend_subscription(suspended_id).await.unwrap();
    }

    #[tokio::test]
    async fn list_with_status_returns_only_exact_matches() {
        let plan = sample_plan("pro", 4990, 0);
        let rows: Vec<SubscriptionWithRelations> = [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
        ]
        .into_iter()
        .map(|status| {
            let store = sample_store(Uuid::new_v4());
            SubscriptionWithRelations {
                subscription: sample_subscription(
                    store.id,
                    plan.id,
                    status,
                    BillingCycle::Monthly,
                    today(),
                ),
                plan: plan.clone(),
                store,
            }
        })
        .collect();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_list_with_relations()
            .with(eq(Some(SubscriptionStatus::Active)))
            .returning(move |_| Ok(rows.clone()));

        let usecase = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockStoreRepository::new(),
        );

        let listed = usecase
            .list_subscriptions(SubscriptionFilters {
                status: Some(SubscriptionStatus::Active),
            })
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.status == SubscriptionStatus::Active));
    }

    fn relations_for(
        status: SubscriptionStatus,
        cycle: BillingCycle,
        period_start: NaiveDate,
    ) -> SubscriptionWithRelations {
        let plan = sample_plan("pro", 4990, 0);
        let store = sample_store(Uuid::new_v4());
        SubscriptionWithRelations {
            subscription: sample_subscription(store.id, plan.id, status, cycle, period_start),
            plan,
            store,
        }
    }

    fn issued(insert: InsertInvoiceEntity) -> anyhow::Result<IssueInvoiceOutcome> {
        Ok(IssueInvoiceOutcome::Issued(invoice_from(insert)))
    }

    fn subscription_repo_returning(relations: SubscriptionWithRelations) -> MockSubscriptionRepository {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_with_relations_by_id()
            .with(eq(relations.subscription.id))
            .returning(move |_| Ok(Some(relations.clone())));
        subscription_repo
    }

    fn invoicing_usecase(
        subscription_repo: MockSubscriptionRepository,
        invoice_repo: MockInvoiceRepository,
    ) -> SubscriptionUseCase<
        MockSubscriptionRepository,
        MockInvoiceRepository,
        MockPlanRepository,
        MockStoreRepository,
    > {
        usecase(
            subscription_repo,
            invoice_repo,
            MockPlanRepository::new(),
            MockStoreRepository::new(),
        )
    }

    #[tokio::test]
    async fn generated_invoice_bills_cycle_price_within_period() {
        let relations = relations_for(SubscriptionStatus::Active, BillingCycle::Yearly, today());
        let subscription_id = relations.subscription.id;
        let period_start = relations.subscription.current_period_start;
        let period_end = relations.subscription.current_period_end;

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo
            .expect_issue_invoice()
            .withf(move |insert, period| {
                insert.subscription_id == subscription_id
                    && insert.amount_minor == 4990 * 12
                    && insert.due_date >= period_start
                    && insert.period_start == period_start
                    && insert.period_end == period_end
                    && insert.status == "pending"
                    && insert.number.starts_with("INV-")
                    && period.status == "ativa"
                    && period.current_period_start == period_start
                    && period.next_invoice_date == Some(period_end)
            })
            .times(1)
            .returning(|insert, _| issued(insert));

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        let invoice = usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap();

        assert_eq!(invoice.amount_minor, 59880);
        assert_eq!(invoice.currency, "BRL");
        assert!(invoice.due_date >= period_start);
        assert_eq!(invoice.number.len(), "INV-202601-ABCDEF12".len());
    }

    #[tokio::test]
    async fn second_invoice_for_same_period_is_rejected() {
        let relations = relations_for(SubscriptionStatus::Active, BillingCycle::Monthly, today());
        let subscription_id = relations.subscription.id;

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo
            .expect_issue_invoice()
            .times(1)
            .returning(|_, _| {
                Ok(IssueInvoiceOutcome::AlreadyIssued(
                    "INV-202601-0000AAAA".to_string(),
                ))
            });

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        let err = usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::InvoiceAlreadyIssued(ref number) if number == "INV-202601-0000AAAA"));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn cancelled_subscription_is_not_invoiced() {
        let relations = relations_for(SubscriptionStatus::Canceled, BillingCycle::Monthly, today());
        let subscription_id = relations.subscription.id;

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo.expect_issue_invoice().times(0);

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        let err = usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscriptionError::SubscriptionNotBillable(SubscriptionStatus::Canceled)
        ));
    }

    #[tokio::test]
    async fn subscription_suspended_while_invoicing_is_not_billable() {
        let relations = relations_for(SubscriptionStatus::Active, BillingCycle::Monthly, today());
        let subscription_id = relations.subscription.id;

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo
            .expect_issue_invoice()
            .times(1)
            .returning(|_, _| {
                Ok(IssueInvoiceOutcome::SubscriptionNotBillable(
                    "suspensa".to_string(),
                ))
            });

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        let err = usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscriptionError::SubscriptionNotBillable(SubscriptionStatus::Suspended)
        ));
    }

    #[tokio::test]
    async fn stale_period_is_rolled_forward_before_invoicing() {
        let stale_start = today().checked_sub_months(Months::new(3)).unwrap();
        let relations = relations_for(SubscriptionStatus::Active, BillingCycle::Monthly, stale_start);
        let subscription_id = relations.subscription.id;
        let today = today();

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo
            .expect_issue_invoice()
            .withf(move |insert, period| {
                insert.period_start > stale_start
                    && insert.period_start <= today
                    && insert.period_end > today
                    && insert.due_date == insert.period_start
                    && period.current_period_start == insert.period_start
                    && period.current_period_end == insert.period_end
                    && period.next_invoice_date == Some(insert.period_end)
            })
            .times(1)
            .returning(|insert, _| issued(insert));

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invoicing_after_trial_end_activates_subscription() {
        let trial_end = today().checked_sub_days(Days::new(40)).unwrap();
        let mut relations = relations_for(SubscriptionStatus::Trial, BillingCycle::Monthly, trial_end);
        relations.subscription.trial_end = Some(trial_end);
        let subscription_id = relations.subscription.id;
        let first_period_end = relations.subscription.current_period_end;

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo
            .expect_issue_invoice()
            .withf(move |insert, period| {
                period.status == "ativa" && insert.period_start >= first_period_end
            })
            .times(1)
            .returning(|insert, _| issued(insert));

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invoicing_during_running_trial_keeps_trial_status() {
        let trial_end = today().checked_add_days(Days::new(5)).unwrap();
        let mut relations = relations_for(SubscriptionStatus::Trial, BillingCycle::Monthly, trial_end);
        relations.subscription.trial_end = Some(trial_end);
        let subscription_id = relations.subscription.id;

        let mut invoice_repo = MockInvoiceRepository::new();
        invoice_repo
            .expect_issue_invoice()
            .withf(move |insert, period| {
                period.status == "trial"
                    && insert.period_start == trial_end
                    && insert.due_date == trial_end
            })
            .times(1)
            .returning(|insert, _| issued(insert));

        let usecase = invoicing_usecase(subscription_repo_returning(relations), invoice_repo);

        usecase
            .generate_invoice_for_subscription(subscription_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn active_plans_are_sorted_by_monthly_price() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_list_active_plans().returning(|| {
            Ok(vec![
                sample_plan("business", 19990, 0),
                sample_plan("basic", 1990, 7),
                sample_plan("pro", 4990, 14),
            ])
        });

        let usecase = usecase(
            MockSubscriptionRepository::new(),
            MockInvoiceRepository::new(),
            plan_repo,
            MockStoreRepository::new(),
        );

        let slugs: Vec<String> = usecase
            .list_active_plans()
            .await
            .unwrap()
            .into_iter()
            .map(|plan| plan.slug)
            .collect();

        assert_eq!(slugs, vec!["basic", "pro", "business"]);
    }

    #[test]
    fn internal_errors_do_not_leak_to_the_page() {
        let err = SubscriptionError::Internal(anyhow!("connection refused"));
        assert_eq!(err.user_message(), "Internal server error");
        assert_eq!(
            err.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
