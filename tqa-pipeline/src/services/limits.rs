//! Budget and rate-limit collaborators
//!
//! Both are consulted before any AI spend and treated as authoritative;
//! the pipeline never does optimistic spend-then-check. Rate-limit
//! denial is retriable, budget exhaustion is not.

use crate::error::PipelineResult;
use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use uuid::Uuid;

/// Remaining-quota answer from the budget collaborator
#[derive(Debug, Clone, Copy)]
pub struct BudgetStatus {
    pub has_quota: bool,
    pub remaining_usd: Option<f64>,
}

/// Budget collaborator contract
#[async_trait]
pub trait BudgetService: Send + Sync {
    async fn check_budget(&self, project_id: Uuid, tenant_id: Uuid) -> PipelineResult<BudgetStatus>;
}

/// Rate-limit collaborator contract; `false` means no token available
#[async_trait]
pub trait RateLimiterService: Send + Sync {
    async fn acquire(&self, project_id: Uuid) -> PipelineResult<bool>;
}

/// Budget service used when no external budget collaborator is
/// configured: always grants quota.
pub struct UnlimitedBudget;

#[async_trait]
impl BudgetService for UnlimitedBudget {
    async fn check_budget(
        &self,
        _project_id: Uuid,
        _tenant_id: Uuid,
    ) -> PipelineResult<BudgetStatus> {
        Ok(BudgetStatus {
            has_quota: true,
            remaining_usd: None,
        })
    }
}

/// Budget service backed by an external HTTP collaborator
pub struct HttpBudgetService {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BudgetResponse {
    has_quota: bool,
    #[serde(default)]
    remaining_usd: Option<f64>,
}

impl HttpBudgetService {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BudgetService for HttpBudgetService {
    async fn check_budget(&self, project_id: Uuid, tenant_id: Uuid) -> PipelineResult<BudgetStatus> {
        let response = self
            .client
            .get(format!("{}/budget", self.base_url))
            .query(&[
                ("projectId", project_id.to_string()),
                ("tenantId", tenant_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                crate::error::PipelineError::Internal(format!("budget service: {}", e))
            })?;

        let body: BudgetResponse = response.json().await.map_err(|e| {
            crate::error::PipelineError::Internal(format!("budget service response: {}", e))
        })?;

        Ok(BudgetStatus {
            has_quota: body.has_quota,
            remaining_usd: body.remaining_usd,
        })
    }
}

/// In-process keyed rate limiter, one bucket per project
pub struct GovernorRateLimiter {
    limiter: DefaultKeyedRateLimiter<Uuid>,
}

impl GovernorRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute.max(1))
            .unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
        }
    }
}

#[async_trait]
impl RateLimiterService for GovernorRateLimiter {
    async fn acquire(&self, project_id: Uuid) -> PipelineResult<bool> {
        Ok(self.limiter.check_key(&project_id).is_ok())
    }
}
