//! Integration tests for userdesk.
//!
//! Exercises the services together over a real `SQLite` file.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::uninlined_format_args
)]

use secrecy::SecretString;
use std::sync::Arc;
use tempfile::TempDir;
use userdesk::io::{ExportService, ImportService};
use userdesk::services::{RegisterRequest, UpdateUserRequest};
use userdesk::{AppConfig, Error, PasswordHasher, SqliteUserStore, UserId, UserService, UserStore};

struct Fixture {
    users: UserService,
    imports: ImportService,
    exports: ExportService,
    store: Arc<SqliteUserStore>,
    _dir: TempDir,
}

fn cheap_config(dir: &TempDir) -> AppConfig {
    AppConfig::from_toml(&format!(
        "data_dir = {:?}\n\n[password]\nmemory_kib = 8\niterations = 1\n",
        dir.path().display().to_string()
    ))
    .unwrap()
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = cheap_config(&dir);
    let store = Arc::new(SqliteUserStore::open(config.database_path()).unwrap());
    let shared: Arc<dyn UserStore> = store.clone();
    let hasher = config.password_hasher().unwrap();
    Fixture {
        users: UserService::new(Arc::clone(&shared), hasher.clone()),
        imports: ImportService::new(Arc::clone(&shared), hasher, config.import_options()),
        exports: ExportService::new(shared, config.export_options()),
        store,
        _dir: dir,
    }
}

fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

fn register(users: &UserService, name: &str, email: &str) -> UserId {
    users
        .register(&RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: secret("correct-horse"),
            password_confirmation: secret("correct-horse"),
        })
        .unwrap()
        .data
        .id
}

// ============================================================================
// User lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_register_update_delete() {
        let f = fixture();
        let id = register(&f.users, "Ada", "ada@example.com");

        let updated = f
            .users
            .update(
                id,
                &UpdateUserRequest {
                    name: "Ada Lovelace".to_string(),
                    email: "ADA@example.com".to_string(),
                    ..UpdateUserRequest::default()
                },
            )
            .unwrap();
        assert_eq!(updated.message, "User updated successfully!");
        assert_eq!(updated.data.name, "Ada Lovelace");

        let deleted = f.users.delete(id).unwrap();
        assert_eq!(deleted.message, "User 'Ada Lovelace' deleted successfully!");
        assert!(matches!(f.users.get(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_password_change_is_hashed() {
        let f = fixture();
        let id = register(&f.users, "Ada", "ada@example.com");
        let before = f.store.get(id).unwrap().unwrap().password_hash;

        f.users
            .update(
                id,
                &UpdateUserRequest {
                    name: "Ada".to_string(),
                    email: "ada@example.com".to_string(),
                    password: secret("new-password"),
                    password_confirmation: secret("new-password"),
                },
            )
            .unwrap();

        let after = f.store.get(id).unwrap().unwrap().password_hash;
        assert_ne!(before, after);
        let hasher = PasswordHasher::with_cost(8, 1).unwrap();
        assert!(hasher.verify(&SecretString::from("new-password".to_string()), &after));
    }

    #[test]
    fn test_email_uniqueness_ignores_case() {
        let f = fixture();
        register(&f.users, "Ada", "ada@example.com");

        let err = f
            .users
            .register(&RegisterRequest {
                name: "Imposter".to_string(),
                email: "Ada@Example.com".to_string(),
                password: secret("correct-horse"),
                password_confirmation: secret("correct-horse"),
            })
            .unwrap_err();

        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("email").and_then(|messages| messages.first()).map(String::as_str),
            Some("The email has already been taken.")
        );
    }

    #[test]
    fn test_listing_pages() {
        let f = fixture();
        for i in 0..11 {
            register(&f.users, &format!("User {i}"), &format!("u{i}@example.com"));
        }

        let first = f.users.list(1).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.last_page, 2);
        assert!(first.has_more());

        let second = f.users.list(2).unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more());
    }
}

// ============================================================================
// Import and export
// ============================================================================

mod csv_round_trip {
    use super::*;

    #[test]
    fn test_exported_file_reimports_into_fresh_store() {
        let source = fixture();
        register(&source.users, "Ada", "ada@example.com");
        register(&source.users, "Grace, Hopper", "grace@example.com");

        let result = source.exports.export().unwrap();
        assert_eq!(result.exported, 2);
        assert!(result.filename.starts_with("users_export_"));

        let target = fixture();
        let report = target.imports.import_from_path(&result.path).unwrap();

        assert_eq!(report.imported, 2);
        assert!(!report.has_errors());
        let grace = target
            .store
            .find_by_email("grace@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(grace.name, "Grace, Hopper");

        // No password column in exports, so imported users get the default.
        let hasher = PasswordHasher::with_cost(8, 1).unwrap();
        assert!(hasher.verify(
            &SecretString::from("password123".to_string()),
            &grace.password_hash
        ));
    }

    #[test]
    fn test_reimport_into_same_store_reports_duplicates() {
        let f = fixture();
        register(&f.users, "Ada", "ada@example.com");
        let result = f.exports.export().unwrap();

        let report = f.imports.import_from_path(&result.path).unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(
            report.summary(),
            "Successfully imported 0 users. 1 rows had errors: \
             Row 2: Email 'ada@example.com' already exists."
        );
    }

    #[test]
    fn test_exports_listed_newest_first() {
        let f = fixture();
        register(&f.users, "Ada", "ada@example.com");

        let dir = f.exports.options().exports_dir.clone();
        std::fs::create_dir_all(&dir).unwrap();
        let older = dir.join("users_export_2020-01-01_00-00-00.csv");
        std::fs::write(&older, "ID\n").unwrap();
        let old_time = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000);
        std::fs::File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(old_time)
            .unwrap();

        let fresh = f.exports.export().unwrap();
        let listed = f.exports.list_exports().unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, fresh.filename);
        assert_eq!(listed[1].path, older);
    }

    #[test]
    fn test_missing_file_is_a_failure() {
        let f = fixture();
        let err = f
            .imports
            .import_from_path(std::path::Path::new("/nonexistent/users.csv"))
            .unwrap_err();
        assert!(
            userdesk::io::services::import::failure_message(&err)
                .starts_with("Failed to import users: ")
        );
    }
}
