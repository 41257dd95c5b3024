//! User registration, login and lookup

use chrono::Utc;
use redb::ReadableTable;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::config::AdminSeed;
use crate::database::{get_json, put_json, Store, TABLE_USERS, TABLE_USER_EMAILS};
use crate::error::{AppError, AppResult};
use crate::model::{RegisterRequest, Role, UserRecord};

const MIN_PASSWORD_LEN: usize = 6;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates and stores a new account
pub fn register(store: &Store, request: RegisterRequest, role: Role) -> AppResult<UserRecord> {
    let name = request.name.trim();
    let email = normalize_email(&request.email);

    if name.is_empty() {
        return Err(AppError::Validation("Please provide a name".into()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Please provide a valid email".into()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email,
        phone: request
            .phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty()),
        password_hash: hash_password(&request.password)?,
        role,
        created_at: Utc::now(),
    };

    let write_txn = store.write()?;
    {
        let mut emails = write_txn.open_table(TABLE_USER_EMAILS)?;
        if emails.get(user.email.as_str())?.is_some() {
            return Err(AppError::Validation("User already exists".into()));
        }
        emails.insert(user.email.as_str(), user.id.as_str())?;

        let mut users = write_txn.open_table(TABLE_USERS)?;
        put_json(&mut users, &user.id, &user)?;
    }
    write_txn.commit()?;

    info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(user)
}

pub fn find_by_email(store: &Store, email: &str) -> AppResult<Option<UserRecord>> {
    let read_txn = store.read()?;
    let emails = read_txn.open_table(TABLE_USER_EMAILS)?;
    let Some(user_id) = emails.get(normalize_email(email).as_str())? else {
        return Ok(None);
    };

    let users = read_txn.open_table(TABLE_USERS)?;
    get_json(&users, user_id.value())
}

/// Checks credentials. Unknown email and wrong password are indistinguishable.
pub fn authenticate(store: &Store, email: &str, password: &str) -> AppResult<UserRecord> {
    match find_by_email(store, email)? {
        Some(user) if verify_password(password, &user.password_hash) => Ok(user),
        _ => Err(AppError::Unauthorized("Invalid email or password".into())),
    }
}

/// All users, newest first
pub fn list(store: &Store) -> AppResult<Vec<UserRecord>> {
    let mut users: Vec<UserRecord> = store.fetch_all(TABLE_USERS)?;
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(users)
}

/// Creates the configured administrator unless the email is already taken
pub fn seed_admin(store: &Store, seed: &AdminSeed) -> AppResult<()> {
    if find_by_email(store, &seed.email)?.is_some() {
        return Ok(());
    }

    let admin = register(
        store,
        RegisterRequest {
            name: seed.name.clone(),
            email: seed.email.clone(),
            password: seed.password.clone(),
            phone: seed.phone.clone(),
        },
        Role::Admin,
    )?;
    info!(email = %admin.email, "admin account seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Chikondi Phiri".into(),
            email: email.into(),
            password: "secret1".into(),
            phone: Some(" 0999 ".into()),
        }
    }

    #[test]
    fn emails_are_unique_regardless_of_case() {
        let temp_db = NamedTempFile::new().unwrap();
        let store = Store::open(temp_db.path().to_str().unwrap()).unwrap();

        let user = register(&store, request("Chikondi@Example.com"), Role::Customer).unwrap();
        assert_eq!(user.email, "chikondi@example.com");
        assert_eq!(user.phone.as_deref(), Some("0999"));

        let err = register(&store, request("chikondi@example.com "), Role::Customer).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "User already exists"));
    }

    #[test]
    fn seeding_is_skipped_when_the_admin_exists() {
        let temp_db = NamedTempFile::new().unwrap();
        let store = Store::open(temp_db.path().to_str().unwrap()).unwrap();
        let seed = AdminSeed {
            name: "Shop Admin".into(),
            email: "admin@example.com".into(),
            password: "admin-pass".into(),
            phone: None,
        };

        seed_admin(&store, &seed).unwrap();
        seed_admin(&store, &seed).unwrap();

        let users = list(&store).unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin());
        assert!(authenticate(&store, "admin@example.com", "admin-pass").is_ok());
        assert!(authenticate(&store, "admin@example.com", "nope").is_err());
    }
}
