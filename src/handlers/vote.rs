use actix_web::web::{Data, Json, Path};
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar, PgPool};

use crate::context::UserInfo;
use crate::error::Error;
use crate::models::vote::Vote;

#[derive(Debug, Deserialize)]
pub struct CastVote {
    pub choice_id: i32,
}

/// Records the caller's single vote on a question and bumps the chosen tally.
///
/// The duplicate check up front keeps the common path friendly; the unique
/// index on (user_id, question_id) closes the remaining check-then-act window.
/// A vote that loses that race is reported as already-voted, never retried.
pub async fn cast(
    user_info: UserInfo,
    question_id: Path<(i32,)>,
    Json(CastVote { choice_id }): Json<CastVote>,
    db: Data<PgPool>,
) -> Result<Json<Vote>, Error> {
    let question_id = question_id.into_inner().0;
    let mut tx = db.begin().await?;
    let valid_choice: bool = query_scalar("SELECT EXISTS(SELECT id FROM choices WHERE id = $1 AND question_id = $2)")
        .bind(choice_id)
        .bind(question_id)
        .fetch_one(&mut tx)
        .await?;
    if !valid_choice {
        return Err(Error::NotFound("choice"));
    }
    if let Some(prior) = existing_choice_text(&mut tx, user_info.id, question_id).await? {
        return Err(Error::AlreadyVoted(prior));
    }
    let inserted = query_as::<_, Vote>(
        "INSERT INTO votes (user_id, question_id, choice_id)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, question_id, choice_id, cast_at",
    )
    .bind(user_info.id)
    .bind(question_id)
    .bind(choice_id)
    .fetch_one(&mut tx)
    .await;
    let vote = match inserted {
        Ok(vote) => vote,
        Err(err) if is_unique_violation(&err) => {
            // a concurrent request won the unique index
            tx.rollback().await?;
            let mut conn = db.acquire().await?;
            let prior = existing_choice_text(&mut conn, user_info.id, question_id).await?.unwrap_or_default();
            return Err(Error::AlreadyVoted(prior));
        }
        Err(err) => return Err(err.into()),
    };
    query("UPDATE choices SET vote_count = vote_count + 1 WHERE id = $1")
        .bind(choice_id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(Json(vote))
}

async fn existing_choice_text<'e, E>(executor: E, user_id: i32, question_id: i32) -> Result<Option<String>, Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let text: Option<String> = query_scalar(
        "SELECT c.choice_text
        FROM votes AS v
        JOIN choices AS c ON v.choice_id = c.id
        WHERE v.user_id = $1 AND v.question_id = $2",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await?;
    Ok(text)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
    }
}
