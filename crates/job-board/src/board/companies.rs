use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{Company, CompanyId};
use super::identity::SessionContext;
use super::validation::Validate;
use super::ServiceError;
use crate::store::{Order, Query, Store};

/// Fields supplied when an employer creates a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
}

impl CompanyPatch {
    fn apply(&self, company: &mut Company) {
        if let Some(name) = &self.name {
            company.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            company.description = Some(description.clone());
        }
        if let Some(website) = &self.website {
            company.website = Some(website.clone());
        }
        if let Some(logo_url) = &self.logo_url {
            company.logo_url = Some(logo_url.clone());
        }
    }
}

/// Single-table CRUD over companies. Only the creator may change or delete a company.
#[derive(Clone)]
pub struct CompanyService {
    store: Store,
}

impl CompanyService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Company>, ServiceError> {
        debug!("listing companies");
        Ok(self
            .store
            .companies
            .select(&Query::new().order_by(Order::asc("name")))?)
    }

    pub fn get(&self, id: &CompanyId) -> Result<Company, ServiceError> {
        self.store
            .companies
            .single(&Query::new().eq("id", id))
            .map_err(ServiceError::missing("company", id.as_str()))
    }

    pub fn list_mine(&self, ctx: &SessionContext) -> Result<Vec<Company>, ServiceError> {
        let user_id = ctx.require_user()?;
        Ok(self.store.companies.select(
            &Query::new()
                .eq("created_by", user_id)
                .order_by(Order::desc("created_at")),
        )?)
    }

    /// Finds one of the caller's companies by exact name.
    pub fn find_mine_by_name(
        &self,
        ctx: &SessionContext,
        name: &str,
    ) -> Result<Option<Company>, ServiceError> {
        let user_id = ctx.require_user()?;
        let rows = self.store.companies.select(
            &Query::new()
                .eq("created_by", user_id)
                .eq("name", name.trim()),
        )?;
        Ok(rows.into_iter().next())
    }

    pub fn create(
        &self,
        ctx: &SessionContext,
        draft: CompanyDraft,
    ) -> Result<Company, ServiceError> {
        let user_id = ctx.require_user()?.clone();
        let now = self.store.now();
        let company = Company {
            id: CompanyId::generate(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            website: draft.website,
            logo_url: draft.logo_url,
            created_by: user_id,
            created_at: now,
            updated_at: now,
        };
        company.validate()?;

        let stored = self.store.companies.insert(company)?;
        info!(company_id = %stored.id, name = %stored.name, "company created");
        Ok(stored)
    }

    pub fn update(
        &self,
        ctx: &SessionContext,
        id: &CompanyId,
        patch: CompanyPatch,
    ) -> Result<Company, ServiceError> {
        let mut candidate = self.owned(ctx, id)?;
        patch.apply(&mut candidate);
        candidate.validate()?;

        let now = self.store.now();
        let updated = self
            .store
            .companies
            .update(id.as_str(), &mut |row: &mut Company| {
                patch.apply(row);
                row.updated_at = now;
            })
            .map_err(ServiceError::missing("company", id.as_str()))?;
        info!(company_id = %id, "company updated");
        Ok(updated)
    }

    /// Deletes the row only; dependent jobs are governed by the store.
    pub fn delete(&self, ctx: &SessionContext, id: &CompanyId) -> Result<(), ServiceError> {
        self.owned(ctx, id)?;
        self.store
            .companies
            .delete(id.as_str())
            .map_err(ServiceError::missing("company", id.as_str()))?;
        info!(company_id = %id, "company deleted");
        Ok(())
    }

    fn owned(&self, ctx: &SessionContext, id: &CompanyId) -> Result<Company, ServiceError> {
        let user_id = ctx.require_user()?;
        let company = self.get(id)?;
        if company.created_by != *user_id {
            warn!(company_id = %id, %user_id, "company change refused: not the creator");
            return Err(ServiceError::Forbidden(
                "only the creator can change a company".to_string(),
            ));
        }
        Ok(company)
    }
}
