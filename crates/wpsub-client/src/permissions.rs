//! Fine-grained connection permissions (grant / revoke / check).
//!
//! State lives in the service; `PermissionGrant` is only a request parameter.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;

use wpsub_core::error::{Result, WpsError};

use crate::rest::{RestClient, RestRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    JoinLeaveGroup,
    SendToGroup,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::JoinLeaveGroup => "joinLeaveGroup",
            Permission::SendToGroup => "sendToGroup",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = WpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "joinLeaveGroup" => Ok(Permission::JoinLeaveGroup),
            "sendToGroup" => Ok(Permission::SendToGroup),
            other => Err(WpsError::Configuration(format!("unknown permission: {other}"))),
        }
    }
}

/// Connection + permission (+ optional group scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub connection_id: String,
    pub permission: Permission,
    pub target_group: Option<String>,
}

impl PermissionGrant {
    pub fn new(connection_id: impl Into<String>, permission: Permission) -> Self {
        Self {
            connection_id: connection_id.into(),
            permission,
            target_group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.target_group = Some(group.into());
        self
    }

    fn request(&self, method: Method, hub: &str) -> RestRequest {
        RestRequest::new(
            method,
            [
                "api",
                "hubs",
                hub,
                "permissions",
                self.permission.as_str(),
                "connections",
                self.connection_id.as_str(),
            ],
        )
        .query_opt("targetName", self.target_group.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct PermissionClient {
    rest: RestClient,
    hub: String,
}

impl PermissionClient {
    pub fn new(rest: RestClient, hub: impl Into<String>) -> Self {
        Self {
            rest,
            hub: hub.into(),
        }
    }

    /// PUT; 200 is the only success.
    pub async fn grant(
        &self,
        connection_id: &str,
        permission: Permission,
        target_group: Option<&str>,
    ) -> Result<()> {
        let req = grant_of(connection_id, permission, target_group).request(Method::PUT, &self.hub);
        self.rest.send(req).await?.expect_status(&[200])
    }

    /// DELETE; 200 is the only success.
    pub async fn revoke(
        &self,
        connection_id: &str,
        permission: Permission,
        target_group: Option<&str>,
    ) -> Result<()> {
        let req = grant_of(connection_id, permission, target_group).request(Method::DELETE, &self.hub);
        self.rest.send(req).await?.expect_status(&[200])
    }

    /// HEAD; 200 => true, 404 => false.
    pub async fn check(
        &self,
        connection_id: &str,
        permission: Permission,
        target_group: Option<&str>,
    ) -> Result<bool> {
        let req = grant_of(connection_id, permission, target_group).request(Method::HEAD, &self.hub);
        self.rest.send(req).await?.exists(200, 404)
    }
}

fn grant_of(connection_id: &str, permission: Permission, target_group: Option<&str>) -> PermissionGrant {
    let grant = PermissionGrant::new(connection_id, permission);
    match target_group {
        Some(g) => grant.in_group(g),
        None => grant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_names_round_trip_from_wire() {
        assert_eq!("sendToGroup".parse::<Permission>().unwrap(), Permission::SendToGroup);
        assert_eq!(Permission::JoinLeaveGroup.to_string(), "joinLeaveGroup");
        assert!("admin".parse::<Permission>().is_err());
    }

    #[test]
    fn grant_request_shape() {
        let req = PermissionGrant::new("c1", Permission::SendToGroup)
            .in_group("g1")
            .request(Method::PUT, "chat");
        assert_eq!(
            req.segments,
            vec!["api", "hubs", "chat", "permissions", "sendToGroup", "connections", "c1"]
        );
        assert_eq!(req.query, vec![("targetName".to_string(), "g1".to_string())]);
    }

    #[test]
    fn no_group_no_query() {
        let req = PermissionGrant::new("c1", Permission::JoinLeaveGroup).request(Method::HEAD, "chat");
        assert!(req.query.is_empty());
    }
}
