//! Request context carrier.
//!
//! A [`RequestContext`] is built once per request from a validated
//! handshake and then travels with that request only: either passed
//! explicitly, or bound for the duration of a future with [`scope`] and
//! read back with [`current`]. There is no process-wide slot, so
//! concurrent requests can never observe each other's context.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SolgateError;
use crate::models::handshake::Handshake;
use crate::registry::{SolutionName, StoreIds, derive_store_ids};

/// Which kind of store an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationClass {
    System,
    TenantApp,
    TenantErp,
}

impl OperationClass {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationClass::System => "SYSTEM",
            OperationClass::TenantApp => "TENANT_APP",
            OperationClass::TenantErp => "TENANT_ERP",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationClass {
    type Err = SolgateError;

    /// Anything but the three known classes is a programming error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(OperationClass::System),
            "TENANT_APP" => Ok(OperationClass::TenantApp),
            "TENANT_ERP" => Ok(OperationClass::TenantErp),
            other => Err(SolgateError::UnknownOperation(format!(
                "unrecognized operation class '{other}'"
            ))),
        }
    }
}

/// The declared target of a data operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum OperationDescriptor {
    /// Access to a model held by the external ERP.
    ErpModel { model: String },
    /// Access to application-owned data.
    AppData { collection: String },
    /// Platform administration.
    PlatformAdmin { action: String },
}

impl FromStr for OperationDescriptor {
    type Err = SolgateError;

    /// Parses `erp:<model>`, `app:<collection>` or `system:<action>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || SolgateError::UnknownOperation(format!("unrecognized operation '{s}'"));
        let (prefix, target) = s.split_once(':').ok_or_else(unknown)?;
        if target.is_empty() {
            return Err(unknown());
        }
        let target = target.to_string();
        match prefix {
            "erp" => Ok(OperationDescriptor::ErpModel { model: target }),
            "app" => Ok(OperationDescriptor::AppData { collection: target }),
            "system" => Ok(OperationDescriptor::PlatformAdmin { action: target }),
            _ => Err(unknown()),
        }
    }
}

/// Map an operation's declared target to its class. Pure.
pub fn classify(descriptor: &OperationDescriptor) -> OperationClass {
    match descriptor {
        OperationDescriptor::ErpModel { .. } => OperationClass::TenantErp,
        OperationDescriptor::AppData { .. } => OperationClass::TenantApp,
        OperationDescriptor::PlatformAdmin { .. } => OperationClass::System,
    }
}

/// The tenant a request is bound to, with its derived stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    pub name: SolutionName,
    pub stores: StoreIds,
}

/// Per-request authenticated context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    handshake_id: Uuid,
    tenant: Option<TenantScope>,
    permissions: BTreeSet<String>,
    operation_class: Option<OperationClass>,
}

impl RequestContext {
    /// Build a context from a handshake that has already passed
    /// validation.
    pub fn bind(handshake: &Handshake) -> Self {
        let tenant = handshake.solution_name.as_ref().map(|name| TenantScope {
            name: name.clone(),
            stores: derive_store_ids(name),
        });
        Self {
            handshake_id: handshake.id,
            tenant,
            permissions: handshake.permissions.clone(),
            operation_class: None,
        }
    }

    /// Record the class of the operation this request is performing.
    pub fn with_operation(mut self, class: OperationClass) -> Self {
        self.operation_class = Some(class);
        self
    }

    pub fn handshake_id(&self) -> Uuid {
        self.handshake_id
    }

    pub fn solution_name(&self) -> Option<&SolutionName> {
        self.tenant.as_ref().map(|t| &t.name)
    }

    pub fn resolved_store_ids(&self) -> Option<&StoreIds> {
        self.tenant.as_ref().map(|t| &t.stores)
    }

    pub fn tenant(&self) -> Option<&TenantScope> {
        self.tenant.as_ref()
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn operation_class(&self) -> Option<OperationClass> {
        self.operation_class
    }

    pub fn is_system(&self) -> bool {
        self.tenant.is_none()
    }
}

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Run `fut` with `ctx` as the current request context.
///
/// The binding is visible only to `fut` itself, not to tasks it spawns.
pub async fn scope<F: Future>(ctx: RequestContext, fut: F) -> F::Output {
    CURRENT.scope(ctx, fut).await
}

/// The context of the calling request, if inside [`scope`].
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(RequestContext::clone).ok()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn handshake_for(solution: Option<&str>) -> Handshake {
        let now = Utc::now();
        Handshake {
            id: Uuid::new_v4(),
            token_hash: String::new(),
            secret_hash: String::new(),
            solution_name: solution.map(|s| SolutionName::parse(s).unwrap()),
            permissions: ["read".to_string()].into_iter().collect(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
            revoked_at: None,
        }
    }

    #[test]
    fn classify_maps_each_target() {
        let erp = OperationDescriptor::ErpModel {
            model: "res.partner".into(),
        };
        let app = OperationDescriptor::AppData {
            collection: "rooms".into(),
        };
        let admin = OperationDescriptor::PlatformAdmin {
            action: "list_solutions".into(),
        };
        assert_eq!(classify(&erp), OperationClass::TenantErp);
        assert_eq!(classify(&app), OperationClass::TenantApp);
        assert_eq!(classify(&admin), OperationClass::System);
    }

    #[test]
    fn descriptor_parsing() {
        assert_eq!(
            "erp:res.partner".parse::<OperationDescriptor>().unwrap(),
            OperationDescriptor::ErpModel {
                model: "res.partner".into()
            }
        );
        assert_eq!(
            "app:rooms".parse::<OperationDescriptor>().unwrap(),
            OperationDescriptor::AppData {
                collection: "rooms".into()
            }
        );
        for bad in ["erp", "erp:", "db:rooms", "", ":rooms"] {
            let err = bad.parse::<OperationDescriptor>().unwrap_err();
            assert!(matches!(err, SolgateError::UnknownOperation(_)), "{bad}");
        }
    }

    #[test]
    fn class_parsing_rejects_unknown() {
        assert_eq!(
            "TENANT_APP".parse::<OperationClass>().unwrap(),
            OperationClass::TenantApp
        );
        assert!(matches!(
            "TENANT".parse::<OperationClass>(),
            Err(SolgateError::UnknownOperation(_))
        ));
    }

    #[test]
    fn bind_derives_tenant_stores() {
        let hs = handshake_for(Some("acme"));
        let ctx = RequestContext::bind(&hs);
        assert_eq!(ctx.handshake_id(), hs.id);
        assert_eq!(ctx.solution_name().unwrap().as_str(), "acme");
        let stores = ctx.resolved_store_ids().unwrap();
        assert_eq!(stores.erp.physical(), "erp_acme_db");
        assert_eq!(stores.app.physical(), "app_acme_db");
        assert!(ctx.permissions().contains("read"));
    }

    #[test]
    fn bind_system_handshake_has_no_tenant() {
        let ctx = RequestContext::bind(&handshake_for(None));
        assert!(ctx.is_system());
        assert!(ctx.resolved_store_ids().is_none());
    }

    #[tokio::test]
    async fn current_is_only_visible_inside_scope() {
        assert!(current().is_none());
        let ctx = RequestContext::bind(&handshake_for(Some("acme")));
        let seen = scope(ctx.clone(), async { current() }).await;
        assert_eq!(seen, Some(ctx));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn concurrent_scopes_do_not_leak() {
        let mut handles = Vec::new();
        for name in ["acme", "globex", "initech", "umbrella"] {
            handles.push(tokio::spawn(async move {
                let ctx = RequestContext::bind(&handshake_for(Some(name)));
                scope(ctx, async move {
                    tokio::task::yield_now().await;
                    current()
                        .and_then(|c| c.solution_name().map(|n| n.to_string()))
                        .unwrap_or_default()
                })
                .await
            }));
        }
        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        assert_eq!(seen, vec!["acme", "globex", "initech", "umbrella"]);
    }
}
