use actix_web::web::{Data, Json, Path};
use serde::Deserialize;
use sqlx::{query, query_scalar, PgPool};

use crate::error::Error;
use crate::handlers::question::validate_text;
use crate::response::{CreateResponse, DeleteResponse};

#[derive(Debug, Deserialize)]
pub struct AddChoice {
    pub choice_text: String,
}

pub async fn add(question_id: Path<(i32,)>, Json(AddChoice { choice_text }): Json<AddChoice>, db: Data<PgPool>) -> Result<Json<CreateResponse>, Error> {
    let question_id = question_id.into_inner().0;
    let choice_text = validate_text(&choice_text, "choice_text")?;
    let mut tx = db.begin().await?;
    let exists: bool = query_scalar("SELECT EXISTS(SELECT id FROM questions WHERE id = $1)")
        .bind(question_id)
        .fetch_one(&mut tx)
        .await?;
    if !exists {
        return Err(Error::NotFound("question"));
    }
    let id: i32 = query_scalar("INSERT INTO choices (question_id, choice_text, vote_count) VALUES ($1, $2, 0) RETURNING id")
        .bind(question_id)
        .bind(&choice_text)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(Json(CreateResponse { id }))
}

pub async fn delete_choice(choice_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<DeleteResponse>, Error> {
    let choice_id = choice_id.into_inner().0;
    let mut conn = db.acquire().await?;
    // dependent votes go with the choice (FK cascade)
    let deleted = query("DELETE FROM choices WHERE id = $1")
        .bind(choice_id)
        .execute(&mut conn)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(Error::NotFound("choice"));
    }
    Ok(Json(DeleteResponse::new(deleted)))
}
