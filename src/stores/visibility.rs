use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::roles::Role;
use crate::stores::properties::{Property, GEOMETRY_KEY};
use crate::stores::settings::SettingsStore;

/// Backend setting keys holding the serialized rule blobs.
pub const ATTRIBUTE_RULES_KEY: &str = "attribute_visibility_rules";
pub const EDIT_PERMISSIONS_KEY: &str = "edit_permissions";

/// Which roles may see one attribute. Absence of a rule for an attribute
/// means the attribute is not visible (closed by default), unlike
/// object-level visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeVisibilityRule {
    pub attribute_path: String,
    pub label: String,
    pub visible_for_roles: Vec<Role>,
}

/// Process-wide singleton: the roles allowed to edit parcel records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPermissions {
    pub allowed_roles: Vec<Role>,
}

/// An attribute observed in the loaded parcel records: its key, a display
/// label, and the union of values seen for it. Derived view, recomputed
/// from the records, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSummary {
    pub path: String,
    pub label: String,
    pub values: BTreeSet<String>,
}

/// Scan parcel records for distinct attribute keys (discovery order),
/// excluding the reserved geometry key.
pub fn discover_attributes(properties: &[Property]) -> Vec<AttributeSummary> {
    let mut summaries: Vec<AttributeSummary> = Vec::new();

    for property in properties {
        for (key, value) in &property.attributes {
            if key == GEOMETRY_KEY {
                continue;
            }

            let index = match summaries.iter().position(|s| &s.path == key) {
                Some(index) => index,
                None => {
                    summaries.push(AttributeSummary {
                        path: key.clone(),
                        label: key.clone(),
                        values: BTreeSet::new(),
                    });
                    summaries.len() - 1
                }
            };
            let summary = &mut summaries[index];

            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    summary.values.insert(s.clone());
                }
                other => {
                    summary.values.insert(other.to_string());
                }
            }
        }
    }

    summaries
}

/// In-memory attribute rules and the edit-permissions singleton, persisted
/// through the backend settings store. Toggles mutate only local state;
/// the save operations commit each blob all-or-nothing, and a failed save
/// leaves the local state intact for a retry.
pub struct VisibilityStore {
    settings: SettingsStore,
    rules: Vec<AttributeVisibilityRule>,
    edit_permissions: EditPermissions,
}

impl VisibilityStore {
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            settings,
            rules: Vec::new(),
            edit_permissions: EditPermissions::default(),
        }
    }

    /// Pull both blobs from the backend. A missing blob means no rules
    /// authored yet; a malformed one is recovered as empty with a logged
    /// warning.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        self.rules = match self.settings.get_setting(ATTRIBUTE_RULES_KEY).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(rules) => rules,
                Err(e) => {
                    tracing::warn!("Malformed attribute visibility rules, starting empty: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        self.edit_permissions = match self.settings.get_setting(EDIT_PERMISSIONS_KEY).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(permissions) => permissions,
                Err(e) => {
                    tracing::warn!("Malformed edit permissions, starting empty: {}", e);
                    EditPermissions::default()
                }
            },
            None => EditPermissions::default(),
        };

        Ok(())
    }

    /// Rules in attribute discovery order. The order is incidental, not
    /// semantic.
    pub fn rules(&self) -> &[AttributeVisibilityRule] {
        &self.rules
    }

    pub fn edit_permissions(&self) -> &EditPermissions {
        &self.edit_permissions
    }

    /// Closed by default: no rule for the attribute means not visible.
    pub fn is_visible(&self, attribute_path: &str, role: Role) -> bool {
        self.rules
            .iter()
            .find(|r| r.attribute_path == attribute_path)
            .map(|r| r.visible_for_roles.contains(&role))
            .unwrap_or(false)
    }

    /// Flip the role's membership in the attribute's rule, creating the
    /// rule on first touch. Applying the same toggle twice restores the
    /// prior state.
    pub fn toggle_attribute(&mut self, attribute_path: &str, label: &str, role: Role) {
        let index = match self
            .rules
            .iter()
            .position(|r| r.attribute_path == attribute_path)
        {
            Some(index) => index,
            None => {
                self.rules.push(AttributeVisibilityRule {
                    attribute_path: attribute_path.to_string(),
                    label: label.to_string(),
                    visible_for_roles: Vec::new(),
                });
                self.rules.len() - 1
            }
        };
        let rule = &mut self.rules[index];

        if let Some(index) = rule.visible_for_roles.iter().position(|r| *r == role) {
            rule.visible_for_roles.remove(index);
        } else {
            rule.visible_for_roles.push(role);
        }
    }

    pub fn toggle_edit_role(&mut self, role: Role) {
        let roles = &mut self.edit_permissions.allowed_roles;
        if let Some(index) = roles.iter().position(|r| *r == role) {
            roles.remove(index);
        } else {
            roles.push(role);
        }
    }

    pub fn can_edit(&self, role: Role) -> bool {
        self.edit_permissions.allowed_roles.contains(&role)
    }

    /// Drop rules whose attribute no longer occurs in any record. Returns
    /// how many rules were removed; the caller still has to save.
    pub fn prune_orphaned_rules(&mut self, properties: &[Property]) -> usize {
        let live: BTreeSet<&str> = properties
            .iter()
            .flat_map(|p| p.attributes.keys())
            .map(String::as_str)
            .filter(|k| *k != GEOMETRY_KEY)
            .collect();

        let before = self.rules.len();
        self.rules.retain(|r| live.contains(r.attribute_path.as_str()));
        before - self.rules.len()
    }

    /// Persist the whole rule list in one write. On failure nothing is
    /// committed and the in-memory rules stay as edited.
    pub async fn save_attribute_rules(&mut self) -> anyhow::Result<()> {
        let blob = serde_json::to_string(&self.rules)?;

        self.settings
            .upsert_setting(
                ATTRIBUTE_RULES_KEY,
                &blob,
                Some("Per-attribute role visibility rules"),
            )
            .await?;
        Ok(())
    }

    pub async fn save_edit_permissions(&mut self) -> anyhow::Result<()> {
        let blob = serde_json::to_string(&self.edit_permissions)?;

        self.settings
            .upsert_setting(
                EDIT_PERMISSIONS_KEY,
                &blob,
                Some("Roles allowed to edit parcel records"),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::config::Config;

    fn store() -> VisibilityStore {
        VisibilityStore::new(SettingsStore::new(ApiClient::new(Config::default())))
    }

    fn property(id: i64, attributes: serde_json::Value) -> Property {
        Property {
            id,
            title: format!("Parcel {}", id),
            status: "available".to_string(),
            segment: "standard".to_string(),
            price: None,
            area: None,
            location: None,
            visible_roles: None,
            attributes: attributes.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_unruled_attribute_is_hidden_for_everyone() {
        let store = store();
        for role in Role::ALL {
            assert!(!store.is_visible("cadastral_number", role));
        }
    }

    #[test]
    fn test_rule_membership() {
        let mut store = store();
        store.toggle_attribute("price", "Price", Role::Admin);
        store.toggle_attribute("price", "Price", Role::User3);

        assert!(store.is_visible("price", Role::Admin));
        assert!(store.is_visible("price", Role::User3));
        assert!(!store.is_visible("price", Role::User2));
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let mut store = store();
        store.toggle_attribute("price", "Price", Role::Admin);
        let before = store.rules().to_vec();

        store.toggle_attribute("price", "Price", Role::User2);
        store.toggle_attribute("price", "Price", Role::User2);

        assert_eq!(store.rules(), before.as_slice());
    }

    #[test]
    fn test_first_toggle_creates_rule() {
        let mut store = store();
        assert!(store.rules().is_empty());

        store.toggle_attribute("zone", "Zoning", Role::User4);

        assert_eq!(store.rules().len(), 1);
        assert_eq!(store.rules()[0].attribute_path, "zone");
        assert_eq!(store.rules()[0].visible_for_roles, vec![Role::User4]);
    }

    #[test]
    fn test_toggle_edit_role() {
        let mut store = store();
        assert!(!store.can_edit(Role::User4));

        store.toggle_edit_role(Role::User4);
        assert!(store.can_edit(Role::User4));

        store.toggle_edit_role(Role::User4);
        assert!(!store.can_edit(Role::User4));
    }

    #[test]
    fn test_discover_attributes_skips_geometry() {
        let properties = vec![
            property(1, serde_json::json!({"price": "100", "geometry": {"type": "Polygon"}})),
            property(2, serde_json::json!({"price": "250", "zone": "industrial"})),
        ];

        let attrs = discover_attributes(&properties);
        let paths: Vec<&str> = attrs.iter().map(|a| a.path.as_str()).collect();

        assert_eq!(paths, vec!["price", "zone"]);
        let price = &attrs[0];
        assert_eq!(
            price.values,
            BTreeSet::from(["100".to_string(), "250".to_string()])
        );
    }

    #[test]
    fn test_prune_orphaned_rules() {
        let mut store = store();
        store.toggle_attribute("price", "Price", Role::Admin);
        store.toggle_attribute("removed_attr", "Removed", Role::Admin);

        let properties = vec![property(1, serde_json::json!({"price": "100"}))];
        let removed = store.prune_orphaned_rules(&properties);

        assert_eq!(removed, 1);
        assert_eq!(store.rules().len(), 1);
        assert_eq!(store.rules()[0].attribute_path, "price");
    }
}
