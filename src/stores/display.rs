use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::roles::{can_access_attribute, Role};

const ENDPOINT: &str = "display-config";

/// Kind of renderable element on a parcel detail card. Configs are
/// ordered within their kind's partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    Attribute,
    Image,
    Document,
    ContactButton,
    CustomElement,
}

impl ConfigType {
    pub const ALL: [ConfigType; 5] = [
        ConfigType::Attribute,
        ConfigType::Image,
        ConfigType::Document,
        ConfigType::ContactButton,
        ConfigType::CustomElement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Attribute => "attribute",
            ConfigType::Image => "image",
            ConfigType::Document => "document",
            ConfigType::ContactButton => "contact_button",
            ConfigType::CustomElement => "custom_element",
        }
    }
}

impl std::str::FromStr for ConfigType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "attribute" => Ok(ConfigType::Attribute),
            "image" => Ok(ConfigType::Image),
            "document" => Ok(ConfigType::Document),
            "contact_button" => Ok(ConfigType::ContactButton),
            "custom_element" => Ok(ConfigType::CustomElement),
            _ => anyhow::bail!("Invalid config type: {}", s),
        }
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an attribute value is rendered and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    #[default]
    Text,
    Textarea,
    Number,
    Money,
    Boolean,
    Select,
    Date,
}

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::Text => "text",
            FormatType::Textarea => "textarea",
            FormatType::Number => "number",
            FormatType::Money => "money",
            FormatType::Boolean => "boolean",
            FormatType::Select => "select",
            FormatType::Date => "date",
        }
    }
}

impl std::str::FromStr for FormatType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(FormatType::Text),
            "textarea" => Ok(FormatType::Textarea),
            "number" => Ok(FormatType::Number),
            "money" => Ok(FormatType::Money),
            "boolean" => Ok(FormatType::Boolean),
            "select" => Ok(FormatType::Select),
            "date" => Ok(FormatType::Date),
            _ => anyhow::bail!("Invalid format type: {}", s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct FormatOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
}

/// Per-kind element settings. On the wire this is the backend's open
/// `settings` object (plus the `formatType`/`formatOptions` columns for
/// attribute elements); in memory each kind carries only its own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementSettings {
    Attribute {
        format: FormatType,
        options: Vec<String>,
    },
    Image {
        max_count: Option<u32>,
    },
    Document {
        max_count: Option<u32>,
    },
    ContactButton {
        label: Option<String>,
        url: Option<String>,
    },
    CustomElement {
        content: Option<String>,
    },
}

impl ElementSettings {
    pub fn default_for(config_type: ConfigType) -> Self {
        match config_type {
            ConfigType::Attribute => ElementSettings::Attribute {
                format: FormatType::default(),
                options: Vec::new(),
            },
            ConfigType::Image => ElementSettings::Image { max_count: None },
            ConfigType::Document => ElementSettings::Document { max_count: None },
            ConfigType::ContactButton => ElementSettings::ContactButton {
                label: None,
                url: None,
            },
            ConfigType::CustomElement => ElementSettings::CustomElement { content: None },
        }
    }

    pub fn config_type(&self) -> ConfigType {
        match self {
            ElementSettings::Attribute { .. } => ConfigType::Attribute,
            ElementSettings::Image { .. } => ConfigType::Image,
            ElementSettings::Document { .. } => ConfigType::Document,
            ElementSettings::ContactButton { .. } => ConfigType::ContactButton,
            ElementSettings::CustomElement { .. } => ConfigType::CustomElement,
        }
    }

    /// Decode from the wire representation. Unknown keys are ignored and a
    /// malformed bag degrades to the kind's default with a logged warning.
    fn from_wire(
        config_type: ConfigType,
        bag: &serde_json::Map<String, Value>,
        format_type: Option<&str>,
        format_options: Option<&FormatOptions>,
    ) -> Self {
        match config_type {
            ConfigType::Attribute => {
                let format = match format_type {
                    None => FormatType::default(),
                    Some(raw) => raw.parse().unwrap_or_else(|_| {
                        tracing::warn!("Unknown format type {:?}, falling back to text", raw);
                        FormatType::default()
                    }),
                };
                let options = format_options.map(|o| o.options.clone()).unwrap_or_default();
                ElementSettings::Attribute { format, options }
            }
            ConfigType::Image => ElementSettings::Image {
                max_count: read_u32(bag, "maxCount"),
            },
            ConfigType::Document => ElementSettings::Document {
                max_count: read_u32(bag, "maxCount"),
            },
            ConfigType::ContactButton => ElementSettings::ContactButton {
                label: read_string(bag, "label"),
                url: read_string(bag, "url"),
            },
            ConfigType::CustomElement => ElementSettings::CustomElement {
                content: read_string(bag, "content"),
            },
        }
    }

    fn to_wire(
        &self,
    ) -> (
        serde_json::Map<String, Value>,
        Option<FormatType>,
        Option<FormatOptions>,
    ) {
        let mut bag = serde_json::Map::new();

        match self {
            ElementSettings::Attribute { format, options } => {
                let format_options = if *format == FormatType::Select || !options.is_empty() {
                    Some(FormatOptions {
                        options: options.clone(),
                    })
                } else {
                    None
                };
                (bag, Some(*format), format_options)
            }
            ElementSettings::Image { max_count } | ElementSettings::Document { max_count } => {
                if let Some(n) = max_count {
                    bag.insert("maxCount".to_string(), Value::from(*n));
                }
                (bag, None, None)
            }
            ElementSettings::ContactButton { label, url } => {
                if let Some(label) = label {
                    bag.insert("label".to_string(), Value::from(label.clone()));
                }
                if let Some(url) = url {
                    bag.insert("url".to_string(), Value::from(url.clone()));
                }
                (bag, None, None)
            }
            ElementSettings::CustomElement { content } => {
                if let Some(content) = content {
                    bag.insert("content".to_string(), Value::from(content.clone()));
                }
                (bag, None, None)
            }
        }
    }
}

fn read_u32(bag: &serde_json::Map<String, Value>, key: &str) -> Option<u32> {
    bag.get(key).and_then(Value::as_u64).map(|n| n as u32)
}

fn read_string(bag: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    bag.get(key).and_then(Value::as_str).map(str::to_string)
}

/// One renderable element of a parcel detail card: what it is, where it
/// sorts, and which roles may see it. Ids are assigned by the backend;
/// `display_order` is a sort key within the `config_type` partition, not a
/// dense index.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub id: i64,
    pub config_type: ConfigType,
    pub config_key: String,
    pub display_name: String,
    pub display_order: i32,
    pub visible_roles: Vec<Role>,
    pub enabled: bool,
    pub settings: ElementSettings,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl DisplayConfig {
    /// Role visibility is closed by default: a role not in the list does
    /// not see the element, same semantics as attribute rules.
    pub fn is_visible_for_role(&self, role: Role) -> bool {
        can_access_attribute(role, &self.visible_roles)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigRecord {
    id: i64,
    config_type: ConfigType,
    config_key: String,
    display_name: String,
    display_order: i32,
    // Nullable column on the backend; null means no roles listed.
    #[serde(default, deserialize_with = "super::wire::null_as_empty")]
    visible_roles: Vec<Role>,
    enabled: bool,
    #[serde(default)]
    settings: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format_options: Option<FormatOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<NaiveDateTime>,
}

impl From<ConfigRecord> for DisplayConfig {
    fn from(record: ConfigRecord) -> Self {
        let settings = ElementSettings::from_wire(
            record.config_type,
            &record.settings,
            record.format_type.as_deref(),
            record.format_options.as_ref(),
        );

        DisplayConfig {
            id: record.id,
            config_type: record.config_type,
            config_key: record.config_key,
            display_name: record.display_name,
            display_order: record.display_order,
            visible_roles: record.visible_roles,
            enabled: record.enabled,
            settings,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl DisplayConfig {
    fn to_record(&self) -> ConfigRecord {
        let (settings, format_type, format_options) = self.settings.to_wire();

        ConfigRecord {
            id: self.id,
            config_type: self.config_type,
            config_key: self.config_key.clone(),
            display_name: self.display_name.clone(),
            display_order: self.display_order,
            visible_roles: self.visible_roles.clone(),
            enabled: self.enabled,
            settings,
            format_type: format_type.map(|f| f.as_str().to_string()),
            format_options,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Serialize for DisplayConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DisplayConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ConfigRecord::deserialize(deserializer)?.into())
    }
}

/// A new element to persist. The store assigns the display order (append
/// at the end of the kind's partition); the backend assigns the id. The
/// element kind is carried by the settings variant, so an unrepresentable
/// kind cannot be constructed.
#[derive(Debug, Clone)]
pub struct NewDisplayConfig {
    pub config_key: String,
    pub display_name: String,
    pub visible_roles: Vec<Role>,
    pub enabled: bool,
    pub settings: ElementSettings,
}

/// Partial update for an existing config. Absent fields are left as-is by
/// the backend.
#[derive(Debug, Clone, Default)]
pub struct DisplayConfigPatch {
    pub display_name: Option<String>,
    pub display_order: Option<i32>,
    pub visible_roles: Option<Vec<Role>>,
    pub enabled: Option<bool>,
    pub settings: Option<ElementSettings>,
}

impl DisplayConfigPatch {
    fn into_body(self) -> serde_json::Map<String, Value> {
        let mut body = serde_json::Map::new();

        if let Some(name) = self.display_name {
            body.insert("displayName".to_string(), Value::from(name));
        }
        if let Some(order) = self.display_order {
            body.insert("displayOrder".to_string(), Value::from(order));
        }
        if let Some(roles) = self.visible_roles {
            let roles: Vec<Value> = roles.iter().map(|r| Value::from(r.as_str())).collect();
            body.insert("visibleRoles".to_string(), Value::from(roles));
        }
        if let Some(enabled) = self.enabled {
            body.insert("enabled".to_string(), Value::from(enabled));
        }
        if let Some(settings) = self.settings {
            let (bag, format_type, format_options) = settings.to_wire();
            body.insert("settings".to_string(), Value::Object(bag));
            if let Some(format) = format_type {
                body.insert("formatType".to_string(), Value::from(format.as_str()));
            }
            match format_options {
                Some(options) => {
                    let value = serde_json::to_value(options).unwrap_or(Value::Null);
                    body.insert("formatOptions".to_string(), value);
                }
                None => {
                    body.insert("formatOptions".to_string(), Value::Null);
                }
            }
        }

        body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub id: i64,
    pub display_order: i32,
}

#[derive(Serialize)]
struct BatchOrderBody<'a> {
    updates: &'a [OrderUpdate],
}

/// Store for display configs. Holds one lazily-populated snapshot of the
/// full config list; every mutation nulls it, so a read after a
/// successful write always round-trips through the backend.
pub struct DisplayConfigStore {
    api: ApiClient,
    cache: Option<Vec<DisplayConfig>>,
}

impl DisplayConfigStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    fn url(&self) -> String {
        self.api.endpoint(ENDPOINT)
    }

    async fn snapshot(&mut self) -> Result<Vec<DisplayConfig>, ApiError> {
        if let Some(ref cached) = self.cache {
            return Ok(cached.clone());
        }

        let configs: Vec<DisplayConfig> = self.api.get_json(&self.url()).await?;
        self.cache = Some(configs.clone());
        Ok(configs)
    }

    /// Configs ordered by (display_order, id), optionally restricted to
    /// one element kind.
    pub async fn get_configs(
        &mut self,
        config_type: Option<ConfigType>,
    ) -> Result<Vec<DisplayConfig>, ApiError> {
        let mut configs = self.snapshot().await?;

        if let Some(config_type) = config_type {
            configs.retain(|c| c.config_type == config_type);
        }
        configs.sort_by_key(|c| (c.display_order, c.id));

        Ok(configs)
    }

    /// Create a new element at the end of its kind's partition.
    pub async fn create_config(
        &mut self,
        new: NewDisplayConfig,
    ) -> Result<DisplayConfig, ApiError> {
        let config_type = new.settings.config_type();

        let configs = self.snapshot().await?;
        let display_order = configs
            .iter()
            .filter(|c| c.config_type == config_type)
            .map(|c| c.display_order)
            .max()
            .map_or(0, |max| max + 1);

        let (settings, format_type, format_options) = new.settings.to_wire();
        let body = serde_json::json!({
            "configType": config_type,
            "configKey": new.config_key,
            "displayName": new.display_name,
            "displayOrder": display_order,
            "visibleRoles": new.visible_roles,
            "enabled": new.enabled,
            "settings": settings,
            "formatType": format_type.map(|f| f.as_str()),
            "formatOptions": format_options,
        });

        let created: DisplayConfig = self.api.post_json(&self.url(), &body).await?;
        self.cache = None;
        Ok(created)
    }

    /// Partial update; NotFound if the id does not exist.
    pub async fn update_config(
        &mut self,
        id: i64,
        patch: DisplayConfigPatch,
    ) -> Result<DisplayConfig, ApiError> {
        let url = format!("{}/{}", self.url(), id);
        let body = Value::Object(patch.into_body());
        let updated: DisplayConfig = self.api.put_json(&url, &body).await?;
        self.cache = None;
        Ok(updated)
    }

    /// Delete without renumbering: remaining display_order values keep
    /// their gaps.
    pub async fn delete_config(&mut self, id: i64) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.url(), id);
        self.api.delete(&url).await?;
        self.cache = None;
        Ok(())
    }

    pub async fn toggle_enabled(&mut self, id: i64) -> Result<DisplayConfig, ApiError> {
        let configs = self.snapshot().await?;
        let config = configs
            .iter()
            .find(|c| c.id == id)
            .ok_or(ApiError::NotFound)?;

        self.update_config(
            id,
            DisplayConfigPatch {
                enabled: Some(!config.enabled),
                ..Default::default()
            },
        )
        .await
    }

    /// Swap display_order with the adjacent config in the same kind
    /// partition. A move past either end of the partition is a no-op.
    pub async fn move_config(&mut self, id: i64, direction: Direction) -> Result<(), ApiError> {
        let configs = self.snapshot().await?;
        let config = configs
            .iter()
            .find(|c| c.id == id)
            .ok_or(ApiError::NotFound)?;

        let mut partition: Vec<&DisplayConfig> = configs
            .iter()
            .filter(|c| c.config_type == config.config_type)
            .collect();
        partition.sort_by_key(|c| (c.display_order, c.id));

        let index = match partition.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => return Err(ApiError::NotFound),
        };

        let neighbor = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => (index + 1 < partition.len()).then_some(index + 1),
        };

        let neighbor = match neighbor {
            Some(neighbor) => partition[neighbor],
            None => return Ok(()),
        };

        let updates = [
            OrderUpdate {
                id,
                display_order: neighbor.display_order,
            },
            OrderUpdate {
                id: neighbor.id,
                display_order: config.display_order,
            },
        ];

        self.batch_update_order(&updates).await
    }

    /// Atomic bulk reorder, used after a drag-reorder. All-or-nothing on
    /// the backend; the cache is only dropped on success.
    pub async fn batch_update_order(&mut self, updates: &[OrderUpdate]) -> Result<(), ApiError> {
        let url = format!("{}/batch-order", self.url());
        self.api.put_unit(&url, &BatchOrderBody { updates }).await?;
        self.cache = None;
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wire_record() {
        let json = r#"{
            "id": 7,
            "configType": "attribute",
            "configKey": "price",
            "displayName": "Price",
            "displayOrder": 3,
            "visibleRoles": ["admin", "user3"],
            "enabled": true,
            "settings": {},
            "formatType": "money",
            "createdAt": "2024-05-01T10:30:00"
        }"#;

        let config: DisplayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.id, 7);
        assert_eq!(config.config_type, ConfigType::Attribute);
        assert_eq!(config.visible_roles, vec![Role::Admin, Role::User3]);
        assert_eq!(
            config.settings,
            ElementSettings::Attribute {
                format: FormatType::Money,
                options: vec![],
            }
        );
        assert!(config.created_at.is_some());
    }

    #[test]
    fn test_null_visible_roles_decodes_as_empty() {
        let json = r#"{
            "id": 2,
            "configType": "image",
            "configKey": "photos",
            "displayName": "Photos",
            "displayOrder": 0,
            "visibleRoles": null,
            "enabled": true,
            "settings": {}
        }"#;

        let config: DisplayConfig = serde_json::from_str(json).unwrap();
        assert!(config.visible_roles.is_empty());
    }

    #[test]
    fn test_unknown_format_falls_back_to_text() {
        let json = r#"{
            "id": 1,
            "configType": "attribute",
            "configKey": "zone",
            "displayName": "Zone",
            "displayOrder": 0,
            "visibleRoles": [],
            "enabled": true,
            "settings": {},
            "formatType": "hologram"
        }"#;

        let config: DisplayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.settings,
            ElementSettings::Attribute {
                format: FormatType::Text,
                options: vec![],
            }
        );
    }

    #[test]
    fn test_settings_wire_round_trip_per_kind() {
        let button = ElementSettings::ContactButton {
            label: Some("Call the broker".to_string()),
            url: Some("tel:+70000000000".to_string()),
        };
        let (bag, format_type, format_options) = button.to_wire();
        assert!(format_type.is_none());
        assert!(format_options.is_none());
        let decoded =
            ElementSettings::from_wire(ConfigType::ContactButton, &bag, None, None);
        assert_eq!(decoded, button);

        let select = ElementSettings::Attribute {
            format: FormatType::Select,
            options: vec!["premium".to_string(), "standard".to_string()],
        };
        let (bag, format_type, format_options) = select.to_wire();
        assert!(bag.is_empty());
        let decoded = ElementSettings::from_wire(
            ConfigType::Attribute,
            &bag,
            format_type.map(|f| f.as_str()),
            format_options.as_ref(),
        );
        assert_eq!(decoded, select);
    }

    #[test]
    fn test_unknown_settings_keys_are_ignored() {
        let mut bag = serde_json::Map::new();
        bag.insert("legacyFlag".to_string(), Value::from(true));
        bag.insert("maxCount".to_string(), Value::from(4));

        let decoded = ElementSettings::from_wire(ConfigType::Image, &bag, None, None);
        assert_eq!(decoded, ElementSettings::Image { max_count: Some(4) });
    }

    #[test]
    fn test_role_visibility_closed_by_default() {
        let config = DisplayConfig {
            id: 1,
            config_type: ConfigType::Image,
            config_key: "photos".to_string(),
            display_name: "Photos".to_string(),
            display_order: 0,
            visible_roles: vec![],
            enabled: true,
            settings: ElementSettings::default_for(ConfigType::Image),
            created_at: None,
            updated_at: None,
        };

        for role in Role::ALL {
            assert!(!config.is_visible_for_role(role));
        }
    }

    #[test]
    fn test_config_type_round_trip() {
        for config_type in ConfigType::ALL {
            assert_eq!(
                config_type.as_str().parse::<ConfigType>().unwrap(),
                config_type
            );
        }
        assert!("widget".parse::<ConfigType>().is_err());
    }
}
