use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::api::ApiClient;
use crate::config::Config;
use crate::local::LocalStore;
use crate::migrate::migrate_attribute_configs;
use crate::resolver;
use crate::roles::{role_info, Role};
use crate::stores::companies::{CompanyStore, NewCompany};
use crate::stores::display::{
    ConfigType, Direction, DisplayConfigPatch, DisplayConfigStore, ElementSettings,
    NewDisplayConfig,
};
use crate::stores::filters::{FilterSettingsStore, UpsertFilter};
use crate::stores::properties::PropertyStore;
use crate::stores::settings::SettingsStore;
use crate::stores::users::{NewUser, UserStore};
use crate::stores::visibility::{discover_attributes, VisibilityStore};

#[derive(Parser)]
#[command(name = "cadaster")]
#[command(about = "Admin console for land-parcel visibility rules and display configuration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the role registry with permissions
    Roles,

    /// Attribute visibility rules and edit permissions
    Visibility {
        #[command(subcommand)]
        action: VisibilityAction,
    },

    /// Display configuration of parcel-card elements
    Display {
        #[command(subcommand)]
        action: DisplayAction,
    },

    /// User administration
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Company administration
    Companies {
        #[command(subcommand)]
        action: CompanyAction,
    },

    /// Backend key-value settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Map filter configuration
    Filters {
        #[command(subcommand)]
        action: FilterAction,
    },

    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum VisibilityAction {
    /// Show authored attribute rules and edit permissions
    List,

    /// Show attributes discovered from the loaded parcel records
    Attributes,

    /// Flip a role's visibility of one attribute and save
    Toggle {
        attribute: String,

        #[arg(long)]
        role: String,

        #[arg(long, help = "Display label used when the rule is first created")]
        label: Option<String>,
    },

    /// Flip a role's membership in the edit permissions and save
    ToggleEdit {
        role: String,
    },

    /// Remove rules for attributes that no longer exist and save
    Prune,
}

#[derive(Subcommand)]
pub enum DisplayAction {
    List {
        #[arg(long, help = "Restrict to one element kind")]
        r#type: Option<String>,
    },

    Add {
        #[arg(long)]
        r#type: String,

        #[arg(long)]
        key: String,

        #[arg(long)]
        name: String,

        #[arg(long, value_delimiter = ',', help = "Roles allowed to see the element")]
        roles: Vec<String>,

        #[arg(long, help = "Create the element disabled")]
        disabled: bool,
    },

    Set {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        order: Option<i32>,

        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<String>>,
    },

    Remove {
        id: i64,

        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Swap the element with its neighbor in the same kind partition
    Move {
        id: i64,

        #[arg(value_parser = ["up", "down"])]
        direction: String,
    },

    /// Flip the enabled flag
    Toggle {
        id: i64,
    },

    /// Preview the ordered card a role would see
    Resolve {
        #[arg(long, help = "Defaults to the configured operator role")]
        role: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    List,
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        role: String,

        #[arg(long)]
        company_id: Option<i64>,

        #[arg(long)]
        phone: Option<String>,
    },
    Deactivate {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CompanyAction {
    List,
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        inn: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
    Deactivate {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    List,
    Set {
        key: String,
        value: String,

        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FilterAction {
    List,
    /// Create or update a filter by its key
    Set {
        key: String,

        #[arg(long)]
        label: String,

        #[arg(long, value_parser = ["select", "range", "search", "toggle"])]
        r#type: String,

        #[arg(long)]
        order: Option<i32>,

        #[arg(long)]
        disabled: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Init,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;

    // Legacy attribute-config blob is migrated once per client, at start.
    let mut local = LocalStore::open(config.state_path.clone());
    migrate_attribute_configs(&mut local);

    let api = ApiClient::new(config);

    match cli.command {
        Commands::Roles => show_roles(),
        Commands::Visibility { action } => run_visibility(api, action).await,
        Commands::Display { action } => run_display(api, action).await,
        Commands::Users { action } => run_users(api, action).await,
        Commands::Companies { action } => run_companies(api, action).await,
        Commands::Settings { action } => run_settings(api, action).await,
        Commands::Filters { action } => run_filters(api, action).await,
        Commands::Config { action } => match action {
            Some(ConfigAction::Init) => crate::config::init_config().await,
            Some(ConfigAction::Show) | None => crate::config::show_config().await,
        },
    }
}

fn show_roles() -> Result<()> {
    for role in Role::ALL {
        let info = role_info(role);
        let p = info.permissions;
        println!("{:<8} {:<14} {} ({})", role, info.name, info.description, info.tier);
        println!(
            "         objects:{} pricing:{} contacts:{} documents:{} edit:{} export:{}",
            mark(p.view_all_objects),
            mark(p.view_pricing),
            mark(p.view_contacts),
            mark(p.view_documents),
            mark(p.edit_objects),
            mark(p.export_data),
        );
    }
    Ok(())
}

fn mark(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

async fn load_visibility(api: &ApiClient) -> Result<VisibilityStore> {
    let mut store = VisibilityStore::new(SettingsStore::new(api.clone()));
    store.load().await?;
    Ok(store)
}

async fn run_visibility(api: ApiClient, action: VisibilityAction) -> Result<()> {
    match action {
        VisibilityAction::List => {
            let store = load_visibility(&api).await?;

            println!("Attribute rules:");
            if store.rules().is_empty() {
                println!("  (none authored; all attributes hidden by default)");
            }
            for rule in store.rules() {
                let roles: Vec<&str> =
                    rule.visible_for_roles.iter().map(|r| r.as_str()).collect();
                println!(
                    "  {:<24} {:<24} [{}]",
                    rule.attribute_path,
                    rule.label,
                    roles.join(", ")
                );
            }

            let editors: Vec<&str> = store
                .edit_permissions()
                .allowed_roles
                .iter()
                .map(|r| r.as_str())
                .collect();
            println!("Edit permissions: [{}]", editors.join(", "));
            Ok(())
        }
        VisibilityAction::Attributes => {
            let mut properties = PropertyStore::new(api.clone());
            let records = properties.get_properties().await?;

            for attr in discover_attributes(&records) {
                println!("{:<24} {} values", attr.path, attr.values.len());
            }
            Ok(())
        }
        VisibilityAction::Toggle {
            attribute,
            role,
            label,
        } => {
            let role: Role = role.parse()?;
            let mut store = load_visibility(&api).await?;

            let label = label.unwrap_or_else(|| attribute.clone());
            store.toggle_attribute(&attribute, &label, role);
            store.save_attribute_rules().await?;

            let state = if store.is_visible(&attribute, role) {
                "visible"
            } else {
                "hidden"
            };
            println!("{} is now {} for {}", attribute, state, role);
            Ok(())
        }
        VisibilityAction::ToggleEdit { role } => {
            let role: Role = role.parse()?;
            let mut store = load_visibility(&api).await?;

            store.toggle_edit_role(role);
            store.save_edit_permissions().await?;

            let state = if store.can_edit(role) { "may" } else { "may not" };
            println!("{} {} edit objects", role, state);
            Ok(())
        }
        VisibilityAction::Prune => {
            let mut properties = PropertyStore::new(api.clone());
            let records = properties.get_properties().await?;

            let mut store = load_visibility(&api).await?;
            let removed = store.prune_orphaned_rules(&records);

            if removed > 0 {
                store.save_attribute_rules().await?;
            }
            println!("Removed {} orphaned rule(s)", removed);
            Ok(())
        }
    }
}

async fn run_display(api: ApiClient, action: DisplayAction) -> Result<()> {
    let mut store = DisplayConfigStore::new(api.clone());

    match action {
        DisplayAction::List { r#type } => {
            let config_type = match r#type {
                Some(raw) => Some(raw.parse::<ConfigType>()?),
                None => None,
            };

            for config in store.get_configs(config_type).await? {
                let roles: Vec<&str> = config.visible_roles.iter().map(|r| r.as_str()).collect();
                let state = if config.enabled { "" } else { " (disabled)" };
                println!(
                    "{:>4}  {:<15} {:<3} {:<24} [{}]{}",
                    config.id,
                    config.config_type,
                    config.display_order,
                    config.display_name,
                    roles.join(", "),
                    state,
                );
            }
            Ok(())
        }
        DisplayAction::Add {
            r#type,
            key,
            name,
            roles,
            disabled,
        } => {
            let config_type: ConfigType = r#type.parse()?;
            let visible_roles = parse_roles(&roles)?;

            let created = store
                .create_config(NewDisplayConfig {
                    config_key: key,
                    display_name: name,
                    visible_roles,
                    enabled: !disabled,
                    settings: ElementSettings::default_for(config_type),
                })
                .await?;

            println!(
                "Created {} element {} at order {}",
                created.config_type, created.id, created.display_order
            );
            Ok(())
        }
        DisplayAction::Set {
            id,
            name,
            order,
            roles,
        } => {
            let visible_roles = match roles {
                Some(raw) => Some(parse_roles(&raw)?),
                None => None,
            };

            let updated = store
                .update_config(
                    id,
                    DisplayConfigPatch {
                        display_name: name,
                        display_order: order,
                        visible_roles,
                        ..Default::default()
                    },
                )
                .await?;

            println!("Updated element {}", updated.id);
            Ok(())
        }
        DisplayAction::Remove { id, yes } => {
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete display config {}?", id))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Aborted");
                    return Ok(());
                }
            }

            store.delete_config(id).await?;
            println!("Deleted element {}", id);
            Ok(())
        }
        DisplayAction::Move { id, direction } => {
            let direction = match direction.as_str() {
                "up" => Direction::Up,
                _ => Direction::Down,
            };

            store.move_config(id, direction).await?;
            println!("Moved element {}", id);
            Ok(())
        }
        DisplayAction::Toggle { id } => {
            let updated = store.toggle_enabled(id).await?;
            let state = if updated.enabled { "enabled" } else { "disabled" };
            println!("Element {} is now {}", id, state);
            Ok(())
        }
        DisplayAction::Resolve { role } => {
            let role = role
                .or_else(|| api.config().operator_role.clone())
                .ok_or_else(|| anyhow::anyhow!("No role given and no operator role configured"))?;
            let role: Role = role.parse()?;
            let configs = store.get_configs(None).await?;

            for config in resolver::visible_elements(&configs, role) {
                println!(
                    "{:<3} {:<15} {}",
                    config.display_order, config.config_type, config.display_name
                );
            }
            Ok(())
        }
    }
}

async fn run_users(api: ApiClient, action: UserAction) -> Result<()> {
    let mut store = UserStore::new(api);

    match action {
        UserAction::List => {
            for user in store.get_users().await? {
                let state = if user.is_active { "" } else { " (inactive)" };
                println!(
                    "{:>4}  {:<24} {:<28} {}{}",
                    user.id, user.full_name, user.email, user.role, state
                );
            }
            Ok(())
        }
        UserAction::Add {
            name,
            email,
            role,
            company_id,
            phone,
        } => {
            let role: Role = role.parse()?;
            let created = store
                .create_user(NewUser {
                    company_id,
                    full_name: name,
                    email,
                    phone,
                    role,
                    is_active: Some(true),
                })
                .await?;
            println!("Created user {} ({})", created.id, created.email);
            Ok(())
        }
        UserAction::Deactivate { id } => {
            let mut patch = serde_json::Map::new();
            patch.insert("isActive".to_string(), serde_json::Value::from(false));
            store.update_user(id, patch).await?;
            println!("Deactivated user {}", id);
            Ok(())
        }
    }
}

async fn run_companies(api: ApiClient, action: CompanyAction) -> Result<()> {
    let mut store = CompanyStore::new(api);

    match action {
        CompanyAction::List => {
            for company in store.get_companies().await? {
                let state = if company.is_active { "" } else { " (inactive)" };
                println!("{:>4}  {}{}", company.id, company.name, state);
            }
            Ok(())
        }
        CompanyAction::Add { name, inn, email } => {
            let created = store
                .create_company(NewCompany {
                    name,
                    inn,
                    kpp: None,
                    legal_address: None,
                    contact_email: email,
                    contact_phone: None,
                    is_active: Some(true),
                })
                .await?;
            println!("Created company {} ({})", created.id, created.name);
            Ok(())
        }
        CompanyAction::Deactivate { id } => {
            let mut patch = serde_json::Map::new();
            patch.insert("isActive".to_string(), serde_json::Value::from(false));
            store.update_company(id, patch).await?;
            println!("Deactivated company {}", id);
            Ok(())
        }
    }
}

async fn run_settings(api: ApiClient, action: SettingsAction) -> Result<()> {
    let mut store = SettingsStore::new(api);

    match action {
        SettingsAction::List => {
            for setting in store.get_settings().await? {
                println!("{:<32} {}", setting.setting_key, setting.setting_value);
            }
            Ok(())
        }
        SettingsAction::Set {
            key,
            value,
            description,
        } => {
            store
                .upsert_setting(&key, &value, description.as_deref())
                .await?;
            println!("Saved setting {}", key);
            Ok(())
        }
    }
}

async fn run_filters(api: ApiClient, action: FilterAction) -> Result<()> {
    let mut store = FilterSettingsStore::new(api);

    match action {
        FilterAction::List => {
            for filter in store.get_filters().await? {
                let state = if filter.is_enabled { "" } else { " (disabled)" };
                println!(
                    "{:<3} {:<20} {:<24} {}{}",
                    filter.display_order,
                    filter.filter_key,
                    filter.filter_label,
                    filter.filter_type,
                    state,
                );
            }
            Ok(())
        }
        FilterAction::Set {
            key,
            label,
            r#type,
            order,
            disabled,
        } => {
            let saved = store
                .upsert_filter(UpsertFilter {
                    filter_key: key,
                    filter_label: label,
                    filter_type: r#type,
                    options: None,
                    is_enabled: Some(!disabled),
                    display_order: order,
                })
                .await?;
            println!("Saved filter {}", saved.filter_key);
            Ok(())
        }
    }
}

fn parse_roles(raw: &[String]) -> Result<Vec<Role>> {
    raw.iter().map(|r| r.parse()).collect()
}
