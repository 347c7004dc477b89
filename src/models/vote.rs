use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A user's single, immutable vote on a question.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vote {
    pub id: i32,
    pub user_id: i32,
    pub question_id: i32,
    pub choice_id: i32,
    pub cast_at: DateTime<Utc>,
}
