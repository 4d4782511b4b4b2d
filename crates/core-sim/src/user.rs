use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Admin => "Admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Customer" => Some(Self::Customer),
            "Admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// A user as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    #[serde(rename = "userID")]
    pub id: i64,
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "UserType")]
    pub role: UserRole,
    /// Read from the cash ledger at request time.
    #[serde(rename = "CashBalance")]
    pub cash_balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub password_hash: String,
}
