use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Question {
    pub id: i32,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

impl Question {
    /// True when the question was published within the last day.
    pub fn was_published_recently(&self) -> bool {
        self.pub_date >= Utc::now() - Duration::days(1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn question_published_at(pub_date: DateTime<Utc>) -> Question {
        Question {
            id: 1,
            question_text: "Best color?".into(),
            pub_date,
        }
    }

    #[test]
    fn test_recent_publication() {
        assert!(question_published_at(Utc::now() - Duration::hours(3)).was_published_recently());
    }

    #[test]
    fn test_old_publication() {
        assert!(!question_published_at(Utc::now() - Duration::days(2)).was_published_recently());
    }
}
