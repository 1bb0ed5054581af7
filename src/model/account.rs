use crate::model::role::Role;

/// Login projection shared by admin and faculty accounts.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}
