use crate::local::LocalStore;

pub const OLD_KEY: &str = "attribute_configs";
pub const NEW_KEY: &str = "attribute_configs_global_v1";
pub const MIGRATION_FLAG: &str = "attribute_configs_migrated_v1";

/// One-shot migration of the legacy attribute-config blob from the old
/// local key to the namespaced global key, guarded by a completion flag.
///
/// Failures are logged and swallowed; a failed copy leaves the flag unset,
/// so the migration runs again on the next start.
pub fn migrate_attribute_configs(store: &mut LocalStore) {
    // Already migrated on this client.
    if store.get(MIGRATION_FLAG).is_some() {
        return;
    }

    // Data already present under the new key: flag and stop.
    if store.get(NEW_KEY).is_some() {
        if let Err(e) = store.set(MIGRATION_FLAG, "true") {
            tracing::error!("Failed to record migration flag: {}", e);
        }
        return;
    }

    // Nothing to migrate: flag and stop.
    let old_data = match store.get(OLD_KEY) {
        Some(data) => data.to_string(),
        None => {
            if let Err(e) = store.set(MIGRATION_FLAG, "true") {
                tracing::error!("Failed to record migration flag: {}", e);
            }
            return;
        }
    };

    match store
        .set(NEW_KEY, &old_data)
        .and_then(|_| store.set(MIGRATION_FLAG, "true"))
    {
        Ok(()) => {
            tracing::info!("Attribute configs migrated to global key");
        }
        Err(e) => {
            // Flag intentionally left unset on this branch.
            tracing::error!("Attribute config migration failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalStore {
        LocalStore::open(dir.path().join("state.json"))
    }

    #[test]
    fn test_migrates_old_data_and_sets_flag() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.set(OLD_KEY, r#"{"price":{"visible":true}}"#).unwrap();

        migrate_attribute_configs(&mut s);

        assert_eq!(s.get(NEW_KEY), Some(r#"{"price":{"visible":true}}"#));
        assert_eq!(s.get(MIGRATION_FLAG), Some("true"));
    }

    #[test]
    fn test_rerun_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.set(OLD_KEY, "legacy").unwrap();

        migrate_attribute_configs(&mut s);
        s.set(NEW_KEY, "edited since").unwrap();
        migrate_attribute_configs(&mut s);

        // Second run must not clobber the migrated value.
        assert_eq!(s.get(NEW_KEY), Some("edited since"));
    }

    #[test]
    fn test_no_old_data_just_sets_flag() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);

        migrate_attribute_configs(&mut s);

        assert_eq!(s.get(NEW_KEY), None);
        assert_eq!(s.get(MIGRATION_FLAG), Some("true"));
    }

    #[test]
    fn test_existing_new_data_sets_flag_without_copy() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&dir);
        s.set(OLD_KEY, "legacy").unwrap();
        s.set(NEW_KEY, "already global").unwrap();

        migrate_attribute_configs(&mut s);

        assert_eq!(s.get(NEW_KEY), Some("already global"));
        assert_eq!(s.get(MIGRATION_FLAG), Some("true"));
    }
}
