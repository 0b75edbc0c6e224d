use crate::constants::reports::STATUS_OPEN;
use crate::entities::{prelude::*, reports};
use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use tracing::info;

pub struct ReportRepository {
    conn: DatabaseConnection,
}

impl ReportRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        target_type: &str,
        target_id: i32,
        reported_by: i32,
        reason: &str,
    ) -> Result<i32> {
        let active_model = reports::ActiveModel {
            target_type: Set(target_type.to_string()),
            target_id: Set(target_id),
            reported_by: Set(Some(reported_by)),
            reason: Set(reason.to_string()),
            status: Set(STATUS_OPEN.to_string()),
            created_at: Set(crate::db::now_timestamp()),
            resolved_by: Set(None),
            resolved_at: Set(None),
            ..Default::default()
        };

        let res = Reports::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert report")?;

        info!(
            "Report {} filed on {} {} by user {}",
            res.last_insert_id, target_type, target_id, reported_by
        );
        Ok(res.last_insert_id)
    }

    pub async fn get(&self, id: i32) -> Result<Option<reports::Model>> {
        Reports::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query report")
    }
}
