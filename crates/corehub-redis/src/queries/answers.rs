//! Student form answer queries (Redis).
//!
//! One document per (registration, part). Saving replaces that document only.

use crate::client::{get_doc, get_docs, put_doc, RedisPool, RedisResult};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentFormAnswerRow {
    pub registration_id: String,
    pub part_key: String,
    pub answers: Value,
    pub completed: bool,
    pub last_saved_at: String,
    pub created_at: String,
}

pub fn answer_key(registration_id: &str, part_key: &str) -> String {
    format!("core:answers:{}:{}", registration_id, part_key)
}

fn parts_key(registration_id: &str) -> String {
    format!("core:answers:{}:parts", registration_id)
}

/// Answers of one part; `None` means the part has not been started.
pub async fn get_answer(
    pool: &RedisPool,
    registration_id: &str,
    part_key: &str,
) -> RedisResult<Option<StudentFormAnswerRow>> {
    get_doc(pool, &answer_key(registration_id, part_key)).await
}

pub async fn list_answers(
    pool: &RedisPool,
    registration_id: &str,
) -> RedisResult<Vec<StudentFormAnswerRow>> {
    let mut conn = pool.clone();
    let mut parts: Vec<String> = conn.smembers(parts_key(registration_id)).await?;
    parts.sort();
    get_docs(pool, parts.iter().map(|p| answer_key(registration_id, p)).collect()).await
}

/// Replace the stored answers of one part.
pub async fn save_answer(pool: &RedisPool, row: &StudentFormAnswerRow) -> RedisResult<()> {
    put_doc(pool, &answer_key(&row.registration_id, &row.part_key), row).await?;
    let mut conn = pool.clone();
    conn.sadd::<_, _, ()>(parts_key(&row.registration_id), &row.part_key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parts_have_independent_keys() {
        assert_eq!(answer_key("reg-1", "PROFILE"), "core:answers:reg-1:PROFILE");
        assert_ne!(answer_key("reg-1", "PROFILE"), answer_key("reg-1", "APPLICATION"));
    }

    #[test]
    fn test_stored_answers_keep_submitted_bytes() {
        let submitted = r#"{"sec-b":{"sub-1":[{"zeta":"1","alpha":"2"}]},"sec-a":{"sub-2":[{}]}}"#;
        let row = StudentFormAnswerRow {
            registration_id: "reg-1".into(),
            part_key: "PROFILE".into(),
            answers: serde_json::from_str(submitted).unwrap(),
            completed: false,
            last_saved_at: "2026-01-01T00:00:00+00:00".into(),
            created_at: "2026-01-01T00:00:00+00:00".into(),
        };

        let stored = serde_json::to_string(&row).unwrap();
        let reloaded: StudentFormAnswerRow = serde_json::from_str(&stored).unwrap();

        assert_eq!(serde_json::to_string(&reloaded.answers).unwrap(), submitted);
        assert_eq!(reloaded, row);
    }
}
