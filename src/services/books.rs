//! Catalog service: books as served by `/catalog/books`

use validator::Validate;

use crate::{
    client::ApiClient,
    error::{AppError, AppResult},
    models::{
        book::BOOK_FORM_FIELDS, first_validation_message, Book, BookPayload, CreateBookRequest,
        UpdateBookRequest,
    },
};

#[derive(Clone)]
pub struct BooksService {
    client: ApiClient,
}

impl BooksService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Whole catalog, in backend order
    pub async fn list(&self, token: &str) -> AppResult<Vec<Book>> {
        let payloads: Vec<BookPayload> = self
            .client
            .get("/catalog/books", Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to load books"))?;
        Ok(payloads.into_iter().map(Book::from).collect())
    }

    pub async fn get(&self, token: &str, id: i64) -> AppResult<Book> {
        let payload: BookPayload = self
            .client
            .get(&format!("/catalog/books/{}", id), Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Book not found"))?;
        Ok(payload.into())
    }

    #[tracing::instrument(skip(self, token, request), fields(title = %request.title))]
    pub async fn create(&self, token: &str, request: &CreateBookRequest) -> AppResult<Book> {
        request
            .validate()
            .map_err(|e| AppError::Validation(first_validation_message(&e, BOOK_FORM_FIELDS)))?;

        let mut body = request.clone();
        body.title = body.title.trim().to_string();
        let body = serde_json::to_value(&body).map_err(|e| AppError::Internal(e.to_string()))?;

        let payload: BookPayload = self
            .client
            .post("/catalog/books", Some(token), Some(body))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to create book"))?;
        tracing::info!("Book {} created", payload.id);
        Ok(payload.into())
    }

    /// Partial update; absent fields are left untouched by the backend
    #[tracing::instrument(skip(self, token, request))]
    pub async fn update(&self, token: &str, id: i64, request: &UpdateBookRequest) -> AppResult<Book> {
        request
            .validate()
            .map_err(|e| AppError::Validation(first_validation_message(&e, BOOK_FORM_FIELDS)))?;

        let mut body = request.clone();
        body.title = body.title.map(|t| t.trim().to_string());
        let body = serde_json::to_value(&body).map_err(|e| AppError::Internal(e.to_string()))?;

        let payload: BookPayload = self
            .client
            .patch(&format!("/catalog/books/{}", id), Some(token), body)
            .await
            .map_err(|e| AppError::upstream(e, "Failed to update book"))?;
        Ok(payload.into())
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn delete(&self, token: &str, id: i64) -> AppResult<()> {
        self.client
            .delete(&format!("/catalog/books/{}", id), Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to delete book"))?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }
}
