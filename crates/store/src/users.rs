use chrono::Utc;
use core_sim::{money::round_cents, NewUser, UserProfile, UserRole};
use rusqlite::{params, OptionalExtension, Row};

use crate::{is_unique_violation, to_millis, Store, StoreError, StoreResult};

/// A profile together with the stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub profile: UserProfile,
    pub password_hash: String,
}

const PROFILE_COLUMNS: &str = "u.id, u.full_name, u.username, u.email, u.role, \
     COALESCE(c.balance, 0.0) AS balance, u.password_hash";

impl Store {
    /// Inserts the user and opens their cash account in one transaction.
    ///
    /// Fails with `Duplicate` when the username or the email is taken.
    pub fn create_user(&self, user: &NewUser, starting_cash: f64) -> StoreResult<UserProfile> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
            params![user.username, user.email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(StoreError::Duplicate("username or email"));
        }

        let inserted = tx.execute(
            "INSERT INTO users (full_name, username, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.full_name,
                user.username,
                user.email,
                user.password_hash,
                user.role.as_str(),
                to_millis(Utc::now()),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Duplicate("username or email"));
            }
            Err(err) => return Err(err.into()),
        }
        let id = tx.last_insert_rowid();

        let balance = round_cents(starting_cash.max(0.0));
        tx.execute(
            "INSERT INTO cash_accounts (user_id, balance) VALUES (?1, ?2)",
            params![id, balance],
        )?;
        tx.commit()?;

        Ok(UserProfile {
            id,
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            cash_balance: balance,
        })
    }

    /// Looks a user up by username or email.
    pub fn find_credentials(&self, username_or_email: &str) -> StoreResult<Option<Credentials>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM users u
             LEFT JOIN cash_accounts c ON c.user_id = u.id
             WHERE u.username = ?1 OR u.email = ?1
             ORDER BY u.id LIMIT 1"
        );
        let row = conn
            .query_row(&sql, params![username_or_email], |row| {
                Ok((profile_from_row(row)?, row.get::<_, String>("password_hash")?))
            })
            .optional()?;

        row.map(|(profile, password_hash)| -> StoreResult<Credentials> {
            Ok(Credentials {
                profile: profile?,
                password_hash,
            })
        })
        .transpose()
    }

    pub fn user_profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM users u
             LEFT JOIN cash_accounts c ON c.user_id = u.id
             WHERE u.id = ?1"
        );
        conn.query_row(&sql, params![user_id], profile_from_row)
            .optional()?
            .transpose()
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<StoreResult<UserProfile>> {
    let role: String = row.get("role")?;
    let Some(role) = UserRole::parse(&role) else {
        return Ok(Err(StoreError::Corrupt(format!("unknown user role {role:?}"))));
    };

    Ok(Ok(UserProfile {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        username: row.get("username")?,
        email: row.get("email")?,
        role,
        cash_balance: row.get("balance")?,
    }))
}

#[cfg(test)]
mod tests {
    use core_sim::{NewUser, UserRole};

    use crate::{Store, StoreError};

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            full_name: "Grace Hopper".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            role: UserRole::Customer,
            password_hash: "salt$hash".to_string(),
        }
    }

    #[test]
    fn registration_opens_cash_account_with_starting_balance() {
        let store = Store::open_in_memory().unwrap();

        let profile = store
            .create_user(&new_user("grace", "grace@example.com"), 10_000.0)
            .unwrap();

        assert_eq!(profile.cash_balance, 10_000.0);
        assert_eq!(store.balance(profile.id).unwrap(), 10_000.0);
    }

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_user(&new_user("grace", "grace@example.com"), 0.0)
            .unwrap();

        let same_name = store.create_user(&new_user("grace", "other@example.com"), 0.0);
        let same_email = store.create_user(&new_user("other", "grace@example.com"), 0.0);

        assert!(matches!(same_name, Err(StoreError::Duplicate(_))));
        assert!(matches!(same_email, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn credentials_found_by_username_or_email() {
        let store = Store::open_in_memory().unwrap();
        let created = store
            .create_user(&new_user("grace", "grace@example.com"), 50.0)
            .unwrap();

        let by_name = store.find_credentials("grace").unwrap().unwrap();
        let by_email = store.find_credentials("grace@example.com").unwrap().unwrap();

        assert_eq!(by_name.profile, created);
        assert_eq!(by_email.profile.id, created.id);
        assert_eq!(by_name.password_hash, "salt$hash");
        assert!(store.find_credentials("nobody").unwrap().is_none());
    }

    #[test]
    fn profile_balance_tracks_ledger() {
        let store = Store::open_in_memory().unwrap();
        let created = store
            .create_user(&new_user("grace", "grace@example.com"), 100.0)
            .unwrap();

        store.deposit(created.id, 25.5).unwrap();

        let profile = store.user_profile(created.id).unwrap().unwrap();
        assert_eq!(profile.cash_balance, 125.5);
    }
}
