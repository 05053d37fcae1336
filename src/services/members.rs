//! Members service (admin)

use serde_json::json;

use crate::{
    client::{ApiClient, Method},
    error::{AppError, AppResult},
    models::{Member, MemberPayload, MemberStatus},
};

#[derive(Clone)]
pub struct MembersService {
    client: ApiClient,
}

impl MembersService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, token: &str) -> AppResult<Vec<Member>> {
        let payloads: Vec<MemberPayload> = self
            .client
            .get("/members", Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to load members"))?;
        Ok(payloads.into_iter().map(Member::from).collect())
    }

    pub async fn get(&self, token: &str, id: i64) -> AppResult<Member> {
        let payload: MemberPayload = self
            .client
            .get(&format!("/members/{}", id), Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Member not found"))?;
        Ok(payload.into())
    }

    /// Change a member's status; the member is read back when the reply does not carry it
    #[tracing::instrument(skip(self, token))]
    pub async fn update_status(
        &self,
        token: &str,
        id: i64,
        status: MemberStatus,
    ) -> AppResult<Option<Member>> {
        let status = status
            .wire_name()
            .ok_or_else(|| AppError::Validation("Unknown member status".to_string()))?;
        let reply: Option<MemberPayload> = self
            .client
            .request_optional(
                Method::PATCH,
                &format!("/members/{}/status", id),
                Some(token),
                Some(json!({ "status": status })),
            )
            .await
            .map_err(|e| AppError::upstream(e, "Failed to update member status"))?;
        tracing::info!("Member {} set to {}", id, status);

        if let Some(payload) = reply {
            return Ok(Some(payload.into()));
        }
        match self.get(token, id).await {
            Ok(member) => Ok(Some(member)),
            Err(e) => {
                tracing::warn!("Member {} not reloaded: {}", id, e);
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn delete(&self, token: &str, id: i64) -> AppResult<()> {
        self.client
            .delete(&format!("/members/{}", id), Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to delete member"))?;
        tracing::info!("Member {} deleted", id);
        Ok(())
    }
}
