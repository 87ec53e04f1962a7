use crate::roles::{can_access_object, Role};
use crate::stores::display::DisplayConfig;
use crate::stores::properties::Property;

/// The ordered sequence of card elements a role actually sees: enabled
/// configs the role may view, sorted by display order. Recomputed on each
/// call; the stores own the raw-data caching.
pub fn visible_elements(configs: &[DisplayConfig], role: Role) -> Vec<DisplayConfig> {
    let mut visible: Vec<DisplayConfig> = configs
        .iter()
        .filter(|c| c.enabled && c.is_visible_for_role(role))
        .cloned()
        .collect();

    visible.sort_by_key(|c| (c.display_order, c.id));
    visible
}

/// Parcel records visible to a role: object-level visibility is open by
/// default, so only records with a non-empty restriction list can be
/// filtered out.
pub fn visible_properties(properties: &[Property], role: Role) -> Vec<Property> {
    properties
        .iter()
        .filter(|p| can_access_object(role, p.visible_roles.as_deref()))
        .cloned()
        .collect()
}
