//! Player accounts and the winners table.

use crate::protocol::WinnerInfo;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Name and password are required")]
    MissingCredentials,

    #[error("Invalid password")]
    InvalidPassword,
}

/// A registered player. Accounts live for the process lifetime only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAccount {
    pub id: Uuid,
    pub name: String,
    password: String,
    pub wins: u32,
}

/// In-memory directory of all known players.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    accounts: HashMap<Uuid, PlayerAccount>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player, or log in when the name is already taken and the
    /// password matches. `preferred_id` is used for fresh accounts so the
    /// caller can reuse its connection id.
    pub fn register(
        &mut self,
        preferred_id: Uuid,
        name: &str,
        password: &str,
    ) -> Result<PlayerAccount, DirectoryError> {
        if name.is_empty() || password.is_empty() {
            return Err(DirectoryError::MissingCredentials);
        }

        if let Some(existing) = self.accounts.values().find(|a| a.name == name) {
            if existing.password == password {
                return Ok(existing.clone());
            }
            return Err(DirectoryError::InvalidPassword);
        }

        let account = PlayerAccount {
            id: preferred_id,
            name: name.to_string(),
            password: password.to_string(),
            wins: 0,
        };
        self.accounts.insert(preferred_id, account.clone());
        Ok(account)
    }

    pub fn get(&self, id: Uuid) -> Option<&PlayerAccount> {
        self.accounts.get(&id)
    }

    /// Bump a player's win counter.
    pub fn record_win(&mut self, id: Uuid) {
        if let Some(account) = self.accounts.get_mut(&id) {
            account.wins += 1;
        }
    }

    /// Leaderboard rows, most wins first.
    pub fn winners(&self) -> Vec<WinnerInfo> {
        let mut winners: Vec<WinnerInfo> = self
            .accounts
            .values()
            .map(|a| WinnerInfo {
                name: a.name.clone(),
                wins: a.wins,
            })
            .collect();
        winners.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.name.cmp(&b.name)));
        winners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_login() {
        let mut directory = PlayerDirectory::new();
        let conn = Uuid::new_v4();

        let account = directory.register(conn, "alice", "secret").unwrap();
        assert_eq!(account.id, conn);
        assert_eq!(account.wins, 0);

        // Same name and password logs in as the existing account
        let other_conn = Uuid::new_v4();
        let again = directory.register(other_conn, "alice", "secret").unwrap();
        assert_eq!(again.id, conn);

        // Wrong password is rejected
        assert_eq!(
            directory.register(other_conn, "alice", "nope"),
            Err(DirectoryError::InvalidPassword)
        );
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let mut directory = PlayerDirectory::new();
        assert_eq!(
            directory.register(Uuid::new_v4(), "", "pw"),
            Err(DirectoryError::MissingCredentials)
        );
        assert_eq!(
            directory.register(Uuid::new_v4(), "bob", ""),
            Err(DirectoryError::MissingCredentials)
        );
    }

    #[test]
    fn test_winners_sorted_by_wins() {
        let mut directory = PlayerDirectory::new();
        let alice = directory.register(Uuid::new_v4(), "alice", "pw").unwrap().id;
        let bob = directory.register(Uuid::new_v4(), "bob", "pw").unwrap().id;
        directory.register(Uuid::new_v4(), "carol", "pw").unwrap();

        directory.record_win(bob);
        directory.record_win(bob);
        directory.record_win(alice);

        let winners = directory.winners();
        assert_eq!(
            winners,
            vec![
                WinnerInfo { name: "bob".into(), wins: 2 },
                WinnerInfo { name: "alice".into(), wins: 1 },
                WinnerInfo { name: "carol".into(), wins: 0 },
            ]
        );
    }
}
