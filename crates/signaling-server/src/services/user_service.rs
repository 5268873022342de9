//! User registry.
//!
//! Records are upserted on every connection attempt and kept after the
//! connection closes; only the connection handle is cleared.

use crate::errors::SignalingError;
use crate::models::User;
use crate::signaling::connection::ConnectionHandle;
use chrono::Utc;
use common::error::RepositoryError;
use common::repository::Repository;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct UserService {
    repo: Arc<dyn Repository<User>>,
    mutation_lock: Mutex<()>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository<User>>) -> Self {
        Self {
            repo,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Insert or replace the record for `user_id`, stamping `last_active`.
    #[instrument(skip_all, name = "signaling.user.create", fields(user_id = %user_id))]
    pub async fn create_user(
        &self,
        user_id: &str,
        connection: Option<ConnectionHandle>,
    ) -> Result<User, SignalingError> {
        if user_id.is_empty() {
            return Err(SignalingError::BadRequest("user id must not be empty".to_string()));
        }
        let _guard = self.mutation_lock.lock().await;
        let user = User::new(user_id, connection);
        self.repo.insert(user.clone()).await?;
        debug!(target: "signaling.user", user_id = %user_id, connected = user.connection.is_some(), "User upserted");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, SignalingError> {
        Ok(self.repo.find(&user_id.to_string()).await?)
    }

    /// Refresh `last_active`, recreating the record if it has gone missing.
    pub async fn update_active(&self, user_id: &str) -> Result<(), SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        let user = match self.repo.find(&user_id.to_string()).await {
            Ok(mut user) => {
                user.last_active = Utc::now();
                user
            }
            Err(RepositoryError::NotFound(_)) => {
                debug!(target: "signaling.user", user_id = %user_id, "Heartbeat for unknown user, recreating record");
                User::new(user_id, None)
            }
            Err(e) => return Err(e.into()),
        };
        self.repo.update(user).await?;
        Ok(())
    }

    /// Live connection currently registered for `user_id`, if any.
    pub async fn live_connection(
        &self,
        user_id: &str,
    ) -> Result<Option<ConnectionHandle>, SignalingError> {
        match self.repo.find(&user_id.to_string()).await {
            Ok(user) => Ok(user.connection.filter(|c| !c.is_closed())),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Clear the connection handle if it still belongs to `connection_id`.
    ///
    /// A newer session for the same user keeps its handle. A missing record is
    /// not an error.
    pub async fn disconnect(&self, user_id: &str, connection_id: Uuid) -> Result<(), SignalingError> {
        self.restore_connection(user_id, connection_id, None).await
    }

    /// Put `previous` back in place of `connection_id`.
    ///
    /// Used when a connection registered itself but was refused, so the session
    /// it displaced stays reachable. No-op once another connection has taken over.
    pub async fn restore_connection(
        &self,
        user_id: &str,
        connection_id: Uuid,
        previous: Option<ConnectionHandle>,
    ) -> Result<(), SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        let mut user = match self.repo.find(&user_id.to_string()).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if user.connection.as_ref().map(ConnectionHandle::id) != Some(connection_id) {
            debug!(target: "signaling.user", user_id = %user_id, "Connection already replaced, leaving record as is");
            return Ok(());
        }

        user.connection = previous;
        user.last_active = Utc::now();
        self.repo.update(user).await?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), SignalingError> {
        let _guard = self.mutation_lock.lock().await;
        self.repo.delete(&user_id.to_string()).await?;
        Ok(())
    }

    /// All users, ordered by id.
    pub async fn list_users(&self) -> Result<Vec<User>, SignalingError> {
        let mut users = self.repo.list_all().await?;
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}
