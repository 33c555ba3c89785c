//! Log group existence checks.
//!
//! A log group exists when a prefix listing for its name returns a group with
//! exactly that name. [`LogGroupValidator::exists`] is fail-closed: a backend
//! error counts as "does not exist" and is logged. [`LogGroupValidator::check`]
//! keeps the error for callers that need to tell the two apart.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::Result;
use std::sync::Arc;

use super::client::LogsBackend;
use super::types::LogGroupSummary;
use crate::app::data_plane::pagination::{collect_pages, find_in_pages};
use crate::app::errors::EngineError;

#[derive(Clone)]
pub struct LogGroupValidator {
    backend: Arc<dyn LogsBackend>,
}

impl LogGroupValidator {
    pub fn new(backend: Arc<dyn LogsBackend>) -> Self {
        Self { backend }
    }

    /// Every log group whose name starts with `prefix` (all when `None`)
    pub async fn describe_log_groups(&self, prefix: Option<&str>) -> Result<Vec<LogGroupSummary>> {
        let backend = self.backend.as_ref();
        collect_pages(move |token| backend.describe_log_groups(prefix, token)).await
    }

    /// Whether `name` exists, keeping backend errors. Paging stops at the
    /// exact match.
    pub async fn check(&self, name: &str) -> Result<bool> {
        let backend = self.backend.as_ref();
        let found = find_in_pages(
            move |token| backend.describe_log_groups(Some(name), token),
            |group| group.log_group_name == name,
        )
        .await?;
        Ok(found.is_some())
    }

    /// Whether `name` exists. Backend errors count as "does not exist".
    pub async fn exists(&self, name: &str) -> bool {
        match self.check(name).await {
            Ok(true) => {
                log_info!("Log group '{}' exists", name);
                true
            }
            Ok(false) => {
                log_info!("Log group '{}' does not exist", name);
                false
            }
            Err(e) => {
                log_error!("Error checking log group '{}': {:#}", name, e);
                false
            }
        }
    }

    /// Gate: fail with [`EngineError::LogGroupNotFound`] on the first missing group
    pub async fn require_all(&self, names: &[String]) -> std::result::Result<(), EngineError> {
        for name in names {
            if !self.exists(name).await {
                log_warn!("Log group '{}' does not exist", name);
                return Err(EngineError::LogGroupNotFound {
                    log_group: name.clone(),
                });
            }
        }
        Ok(())
    }
}
