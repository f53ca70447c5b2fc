//! Navigation access control
//!
//! Pure visibility decisions for the app's navigation menu. A nav item may
//! require roles (user must hold at least one) and/or permissions (ANY by
//! default, ALL when `require_all_permissions` is set). No session means
//! nothing is visible.

use serde::{Deserialize, Serialize};

use crate::session::SessionUser;

/// One entry in the navigation menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub id: String,
    pub label: String,
    pub route: String,
    /// User must hold at least one of these roles (empty = no role gate)
    #[serde(default)]
    pub required_roles: Vec<String>,
    /// Permission gate, ANY by default
    #[serde(default)]
    pub required_permissions: Vec<String>,
    /// When set, every listed permission is required
    #[serde(default)]
    pub require_all_permissions: bool,
}

impl NavItem {
    pub fn new(id: &str, label: &str, route: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            route: route.to_string(),
            required_roles: Vec::new(),
            required_permissions: Vec::new(),
            require_all_permissions: false,
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.required_roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.required_permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn requiring_all_permissions(mut self) -> Self {
        self.require_all_permissions = true;
        self
    }
}

/// Decide whether a nav item is visible to the given user
///
/// Total function of (item, user); no backend calls, no hidden state.
pub fn is_visible(item: &NavItem, user: Option<&SessionUser>) -> bool {
    let Some(user) = user else {
        // No session: everything is denied
        return false;
    };

    if !item.required_roles.is_empty()
        && !item.required_roles.iter().any(|r| user.roles.contains(r))
    {
        return false;
    }

    if !item.required_permissions.is_empty() {
        let holds = |p: &String| user.permissions.contains(p);
        return if item.require_all_permissions {
            item.required_permissions.iter().all(holds)
        } else {
            item.required_permissions.iter().any(holds)
        };
    }

    true
}

/// Filter a menu down to the items visible to the user
pub fn visible_items<'a>(items: &'a [NavItem], user: Option<&SessionUser>) -> Vec<&'a NavItem> {
    items.iter().filter(|item| is_visible(item, user)).collect()
}

/// The platform navigation menu
pub fn default_nav() -> Vec<NavItem> {
    vec![
        NavItem::new("dashboard", "Dashboard", "/dashboard"),
        NavItem::new("transfers", "Transfers", "/transfers")
            .with_permissions(&["transfers:read"]),
        NavItem::new("requests", "Money Requests", "/requests")
            .with_permissions(&["requests:read"]),
        NavItem::new("events", "Events", "/events").with_permissions(&["events:read"]),
        NavItem::new("notifications", "Notifications", "/notifications"),
        NavItem::new("broadcast", "Broadcast", "/admin/broadcast")
            .with_roles(&["ADMIN"])
            .with_permissions(&["notifications:broadcast"]),
        NavItem::new("admin", "Administration", "/admin").with_roles(&["ADMIN"]),
    ]
}
