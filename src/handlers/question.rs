use actix_web::web::{Data, Json, Path, Query};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, FromRow, PgPool, QueryBuilder};

use crate::context::UserInfo;
use crate::error::Error;
use crate::models::choice::Choice;
use crate::models::question::Question;
use crate::response::{CreateResponse, DeleteResponse, List};

/// Questions per listing page.
pub const PAGE_SIZE: i64 = 5;

/// Upper bound for question and choice texts, matching the column width.
pub const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<i64>,
}

pub async fn list(Query(ListParams { search, page }): Query<ListParams>, db: Data<PgPool>) -> Result<Json<List<Question>>, Error> {
    let mut conn = db.acquire().await?;
    let page = page.unwrap_or(1).max(1);
    let pattern = search.filter(|s| !s.trim().is_empty()).map(|s| format!("%{}%", s.trim()));
    let total: i64 = query_scalar(
        "SELECT COUNT(DISTINCT q.id)
        FROM questions AS q
        LEFT JOIN choices AS c ON q.id = c.question_id
        WHERE ($1 IS NULL OR q.question_text ILIKE $1 OR c.choice_text ILIKE $1)",
    )
    .bind(&pattern)
    .fetch_one(&mut conn)
    .await?;
    let list = query_as(
        "SELECT DISTINCT q.id, q.question_text, q.pub_date
        FROM questions AS q
        LEFT JOIN choices AS c ON q.id = c.question_id
        WHERE ($1 IS NULL OR q.question_text ILIKE $1 OR c.choice_text ILIKE $1)
        ORDER BY q.pub_date DESC
        LIMIT $2
        OFFSET $3",
    )
    .bind(&pattern)
    .bind(PAGE_SIZE)
    .bind((page - 1) * PAGE_SIZE)
    .fetch_all(&mut conn)
    .await?;
    Ok(Json(List::new(list, total)))
}

#[derive(Debug, Serialize, FromRow)]
pub struct ChoiceItem {
    pub id: i32,
    pub choice_text: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub choices: Vec<ChoiceItem>,
    pub my_choice_id: Option<i32>,
}

pub async fn detail(user_info: UserInfo, question_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<QuestionDetail>, Error> {
    let question_id = question_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let question = query_as::<_, Question>("SELECT id, question_text, pub_date FROM questions WHERE id = $1")
        .bind(question_id)
        .fetch_optional(&mut conn)
        .await?
        .ok_or(Error::NotFound("question"))?;
    let choices = query_as("SELECT id, choice_text FROM choices WHERE question_id = $1 ORDER BY id")
        .bind(question_id)
        .fetch_all(&mut conn)
        .await?;
    let my_choice_id = query_scalar("SELECT choice_id FROM votes WHERE user_id = $1 AND question_id = $2")
        .bind(user_info.id)
        .bind(question_id)
        .fetch_optional(&mut conn)
        .await?;
    Ok(Json(QuestionDetail {
        question,
        choices,
        my_choice_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct QuestionResults {
    pub question: Question,
    pub choices: Vec<Choice>,
}

pub async fn results(question_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<QuestionResults>, Error> {
    let question_id = question_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let question = query_as::<_, Question>("SELECT id, question_text, pub_date FROM questions WHERE id = $1")
        .bind(question_id)
        .fetch_optional(&mut conn)
        .await?
        .ok_or(Error::NotFound("question"))?;
    let choices = query_as("SELECT id, question_id, choice_text, vote_count FROM choices WHERE question_id = $1 ORDER BY id")
        .bind(question_id)
        .fetch_all(&mut conn)
        .await?;
    Ok(Json(QuestionResults { question, choices }))
}

#[derive(Debug, Deserialize)]
pub struct CreatePoll {
    pub question_text: String,
    pub pub_date: Option<String>,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub dynamic_choices: Vec<String>,
}

pub async fn create(Json(poll): Json<CreatePoll>, db: Data<PgPool>) -> Result<Json<CreateResponse>, Error> {
    let question_text = validate_text(&poll.question_text, "question_text")?;
    let pub_date = match &poll.pub_date {
        Some(raw) => parse_pub_date(raw)?,
        None => Utc::now(),
    };
    let choices = merge_choices(poll.choices, poll.dynamic_choices);
    for text in &choices {
        validate_text(text, "choice_text")?;
    }
    let mut tx = db.begin().await?;
    let id: i32 = query_scalar("INSERT INTO questions (question_text, pub_date) VALUES ($1, $2) RETURNING id")
        .bind(&question_text)
        .bind(pub_date)
        .fetch_one(&mut tx)
        .await?;
    if choices.is_empty() {
        warn!("question {} created without any choices", id);
    } else {
        QueryBuilder::new("INSERT INTO choices (question_id, choice_text, vote_count) ")
            .push_values(choices.iter(), |mut b, text| {
                b.push_bind(id);
                b.push_bind(text);
                b.push_bind(0_i32);
            })
            .build()
            .execute(&mut tx)
            .await?;
    }
    tx.commit().await?;
    Ok(Json(CreateResponse { id }))
}

pub async fn delete_question(question_id: Path<(i32,)>, db: Data<PgPool>) -> Result<Json<DeleteResponse>, Error> {
    let question_id = question_id.into_inner().0;
    let mut conn = db.acquire().await?;
    // choices and votes go with the question (FK cascade)
    let deleted = query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(&mut conn)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(Error::NotFound("question"));
    }
    Ok(Json(DeleteResponse::new(deleted)))
}

pub(crate) fn validate_text(raw: &str, field: &'static str) -> Result<String, Error> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(Error::Validation(format!("{} must be at most {} characters", field, MAX_TEXT_LEN)));
    }
    Ok(text.to_owned())
}

/// Merges the structured choice list with the free-form one, trimming each
/// entry and discarding empties.
fn merge_choices(choices: Vec<String>, dynamic_choices: Vec<String>) -> Vec<String> {
    choices
        .into_iter()
        .chain(dynamic_choices)
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Accepts RFC 3339 as well as the plain date formats the admin form posts.
fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, Error> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_choices_trims_and_discards_empties() {
        let merged = merge_choices(
            vec!["Red".into(), "  Blue  ".into(), "".into()],
            vec!["Green".into(), "   ".into()],
        );
        assert_eq!(merged, vec!["Red", "Blue", "Green"]);
    }

    #[test]
    fn test_merge_choices_keeps_source_order() {
        let merged = merge_choices(vec!["a".into()], vec!["b".into(), "c".into()]);
        assert_eq!(merged, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_choices_allows_empty_result() {
        assert!(merge_choices(vec!["  ".into()], vec![]).is_empty());
    }

    #[test]
    fn test_validate_text_bounds() {
        assert_eq!(validate_text("  Best color?  ", "question_text").unwrap(), "Best color?");
        assert!(validate_text("", "question_text").is_err());
        assert!(validate_text("   ", "question_text").is_err());
        assert!(validate_text(&"x".repeat(MAX_TEXT_LEN), "question_text").is_ok());
        assert!(validate_text(&"x".repeat(MAX_TEXT_LEN + 1), "question_text").is_err());
    }

    #[test]
    fn test_parse_pub_date_formats() {
        assert!(parse_pub_date("2024-09-15T10:30:00Z").is_ok());
        assert!(parse_pub_date("2024-09-15 10:30:00").is_ok());
        let midnight = parse_pub_date("2024-09-15").unwrap();
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_rejects_garbage() {
        assert!(matches!(parse_pub_date("not a date"), Err(Error::ParseDate(_))));
        assert!(parse_pub_date("15/09/2024").is_err());
    }
}
