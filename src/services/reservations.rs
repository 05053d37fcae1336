//! Reservations service

use chrono::NaiveDate;

use crate::{
    client::{ApiClient, Method},
    error::{AppError, AppResult},
    models::{reservation::CreateReservationRequest, Reservation, ReservationPayload},
};

/// Check the pickup window picked in the reserve dialog
pub fn validate_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AppError::Validation(
            "Please select both start and end dates".to_string(),
        ));
    };
    if start < today {
        return Err(AppError::Validation("Start date cannot be in the past".to_string()));
    }
    if end <= start {
        return Err(AppError::Validation("End date must be after start date".to_string()));
    }
    Ok((start, end))
}

#[derive(Clone)]
pub struct ReservationsService {
    client: ApiClient,
}

impl ReservationsService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Reserve a title for the window `[start, end]`.
    ///
    /// Eligibility (already borrowed, already reserved, copies available) is
    /// left to the backend, whose message is passed through. The reservation
    /// is returned when the backend echoes it.
    #[tracing::instrument(skip(self, token))]
    pub async fn reserve(
        &self,
        token: &str,
        book_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<Option<Reservation>> {
        let (start_date, end_date) = validate_window(start, end, today)?;
        let body = serde_json::to_value(CreateReservationRequest {
            book_id,
            start_date,
            end_date,
        })
        .map_err(|e| AppError::Internal(e.to_string()))?;

        let payload: Option<ReservationPayload> = self
            .client
            .request_optional(Method::POST, "/reservations", Some(token), Some(body))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to reserve book"))?;
        tracing::info!("Book {} reserved", book_id);
        Ok(payload.map(Reservation::from))
    }

    pub async fn list(&self, token: &str) -> AppResult<Vec<Reservation>> {
        let payloads: Vec<ReservationPayload> = self
            .client
            .get("/reservations", Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to load reservations"))?;
        Ok(payloads.into_iter().map(Reservation::from).collect())
    }

    pub async fn get(&self, token: &str, id: i64) -> AppResult<Reservation> {
        let payload: ReservationPayload = self
            .client
            .get(&format!("/reservations/{}", id), Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Reservation not found"))?;
        Ok(payload.into())
    }

    /// Cancel a reservation; the reply body is not used
    #[tracing::instrument(skip(self, token))]
    pub async fn cancel(&self, token: &str, id: i64) -> AppResult<()> {
        self.client
            .execute(Method::POST, &format!("/reservations/{}/cancel", id), Some(token), None)
            .await
            .map_err(|e| AppError::upstream(e, "Failed to cancel reservation"))?;
        tracing::info!("Reservation {} cancelled", id);
        Ok(())
    }
}
