use serde::{Deserialize, Serialize};

/// Closed set of access tiers. Adding a role here is deliberately a
/// compile error everywhere a match is not updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User1,
    User2,
    User3,
    User4,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::User1,
        Role::User2,
        Role::User3,
        Role::User4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User1 => "user1",
            Role::User2 => "user2",
            Role::User3 => "user3",
            Role::User4 => "user4",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user1" => Ok(Role::User1),
            "user2" => Ok(Role::User2),
            "user3" => Ok(Role::User3),
            "user4" => Ok(Role::User4),
            _ => anyhow::bail!("Invalid role: {}", s),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub view_all_objects: bool,
    pub view_pricing: bool,
    pub view_contacts: bool,
    pub view_documents: bool,
    pub edit_objects: bool,
    pub export_data: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RoleInfo {
    pub role: Role,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: &'static str,
    pub color: &'static str,
    pub permissions: Permissions,
}

/// Static registry entry for a role. Total over the enum; roles are
/// defined once at process start and never created at runtime.
pub fn role_info(role: Role) -> RoleInfo {
    match role {
        Role::Admin => RoleInfo {
            role,
            name: "Administrator",
            description: "Full access to all functions",
            tier: "Admin",
            color: "#ef4444",
            permissions: Permissions {
                view_all_objects: true,
                view_pricing: true,
                view_contacts: true,
                view_documents: true,
                edit_objects: true,
                export_data: true,
            },
        },
        Role::User1 => RoleInfo {
            role,
            name: "Free",
            description: "Basic object browsing without pricing",
            tier: "Free",
            color: "#6b7280",
            permissions: Permissions {
                view_all_objects: false,
                view_pricing: false,
                view_contacts: false,
                view_documents: false,
                edit_objects: false,
                export_data: false,
            },
        },
        Role::User2 => RoleInfo {
            role,
            name: "Light",
            description: "All objects and pricing",
            tier: "Light",
            color: "#3b82f6",
            permissions: Permissions {
                view_all_objects: true,
                view_pricing: true,
                view_contacts: false,
                view_documents: false,
                edit_objects: false,
                export_data: false,
            },
        },
        Role::User3 => RoleInfo {
            role,
            name: "Max",
            description: "Pricing and contact access",
            tier: "Max",
            color: "#a855f7",
            permissions: Permissions {
                view_all_objects: true,
                view_pricing: true,
                view_contacts: true,
                view_documents: true,
                edit_objects: false,
                export_data: true,
            },
        },
        Role::User4 => RoleInfo {
            role,
            name: "VIP",
            description: "Full access except administration",
            tier: "VIP",
            color: "#eab308",
            permissions: Permissions {
                view_all_objects: true,
                view_pricing: true,
                view_contacts: true,
                view_documents: true,
                edit_objects: true,
                export_data: true,
            },
        },
    }
}

/// Attribute-level check: closed by default. A role sees an attribute
/// only if it is in the allowed list.
pub fn can_access_attribute(role: Role, allowed_roles: &[Role]) -> bool {
    allowed_roles.contains(&role)
}

/// Object-level check: open by default. An object with no restriction
/// list is visible to everyone; a non-empty list is a whitelist.
///
/// The asymmetry with [`can_access_attribute`] is intentional and load
/// bearing: callers depend on both defaults.
pub fn can_access_object(role: Role, object_visible_roles: Option<&[Role]>) -> bool {
    match object_visible_roles {
        None => true,
        Some(roles) if roles.is_empty() => true,
        Some(roles) => roles.contains(&role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_attribute_access_closed_by_default() {
        for role in Role::ALL {
            assert!(!can_access_attribute(role, &[]));
        }
        assert!(can_access_attribute(Role::Admin, &[Role::Admin, Role::User3]));
        assert!(!can_access_attribute(Role::User2, &[Role::Admin, Role::User3]));
    }

    #[test]
    fn test_object_access_open_by_default() {
        for role in Role::ALL {
            assert!(can_access_object(role, None));
            assert!(can_access_object(role, Some(&[])));
        }
        assert!(can_access_object(Role::User1, Some(&[Role::User1])));
        assert!(!can_access_object(Role::User1, Some(&[Role::Admin])));
    }

    #[test]
    fn test_registry_is_total() {
        for role in Role::ALL {
            let info = role_info(role);
            assert_eq!(info.role, role);
            assert!(!info.name.is_empty());
        }
        assert!(role_info(Role::Admin).permissions.edit_objects);
        assert!(!role_info(Role::User1).permissions.view_pricing);
    }
}
