//! Service catalogue (study abroad, admissions, coaching).

use crate::access::{authorize, Action, Principal, Resource};
use crate::error::{require, CoreError, CoreResult};
use crate::text::{now_rfc3339, slugify};
use corehub_redis::queries::services::{self as queries, ServiceRow};
use corehub_redis::RedisPool as DbPool;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Services created by `corehub seed`.
pub const DEFAULT_SERVICES: [(&str, &str); 3] = [
    ("Study Abroad", "End-to-end university application support"),
    ("Ivy League Admission", "Admission strategy for highly selective universities"),
    ("Coaching", "Test preparation and language coaching"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl Service {
    pub fn from_row(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Create a service. Only super-admins manage the catalogue.
pub async fn create_service(pool: &DbPool, principal: &Principal, new: NewService) -> CoreResult<Service> {
    authorize(principal, Action::Write, &Resource::Platform)?;
    insert_service(pool, new).await
}

pub(crate) async fn insert_service(pool: &DbPool, new: NewService) -> CoreResult<Service> {
    require(&new.name, "Service name")?;
    let slug = slugify(new.slug.as_deref().unwrap_or(&new.name), '-');
    if slug.is_empty() {
        return Err(CoreError::validation("Service slug must contain letters or digits"));
    }

    let row = ServiceRow {
        id: Uuid::new_v4().to_string(),
        name: new.name.trim().to_string(),
        slug,
        description: new.description,
        is_active: true,
        created_at: now_rfc3339(),
    };
    queries::insert_service(pool, &row).await?;

    info!(service_id = %row.id, slug = %row.slug, "Service created");
    Ok(Service::from_row(row))
}

pub async fn get_service(pool: &DbPool, id: &str) -> CoreResult<Service> {
    Ok(Service::from_row(queries::get_service(pool, id).await?))
}

/// Active services, in creation order.
pub async fn list_services(pool: &DbPool) -> CoreResult<Vec<Service>> {
    let rows = queries::list_services(pool).await?;
    Ok(rows.into_iter().map(Service::from_row).filter(|s| s.is_active).collect())
}

/// Create any missing default service. Returns every default service.
pub async fn ensure_default_services(pool: &DbPool) -> CoreResult<Vec<Service>> {
    let mut services = Vec::with_capacity(DEFAULT_SERVICES.len());
    for (name, description) in DEFAULT_SERVICES {
        let slug = slugify(name, '-');
        let service = match queries::find_service_by_slug(pool, &slug).await? {
            Some(row) => Service::from_row(row),
            None => {
                insert_service(
                    pool,
                    NewService {
                        name: name.to_string(),
                        slug: Some(slug),
                        description: Some(description.to_string()),
                    },
                )
                .await?
            }
        };
        services.push(service);
    }
    Ok(services)
}
