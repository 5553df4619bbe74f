use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    // 予約不可のヴェニューや時間帯の重複など、現在の状態と矛盾するリクエスト
    #[error("{0}")]
    ResourceConflict(String),
    // リードタイム・最大予約時間などの予約ポリシー違反。違反したルールを文面で示す
    #[error("{0}")]
    PolicyViolation(String),
    #[error("{0}")]
    InvalidStateTransition(String),
    #[error("{0}")]
    PaymentInvalid(String),
    #[error("認証されていません。")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    ValidationError(#[from] garde::Report),
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("外部サービスの呼び出しに失敗しました。{0}")]
    ExternalServiceError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            AppError::UnprocessableEntity(_)
            | AppError::PolicyViolation(_)
            | AppError::InvalidStateTransition(_)
            | AppError::PaymentInvalid(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ResourceConflict(_) => StatusCode::CONFLICT,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::ConversionEntityError(_)
            | AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        } else {
            tracing::warn!(
                error.cause_chain = ?self,
                error.message = %self,
                "Request failed"
            );
        }

        (
            status_code,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
