use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub mood_emoji: String,
    pub entry: String,
}

#[derive(Debug, FromRow)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_emoji: String,
    pub entry: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntryView {
    pub id: Uuid,
    pub mood_emoji: String,
    pub entry: String,
    pub created_at: DateTime<Utc>,
}

impl From<DiaryEntry> for DiaryEntryView {
    fn from(e: DiaryEntry) -> Self {
        DiaryEntryView {
            id: e.id,
            mood_emoji: e.mood_emoji,
            entry: e.entry,
            created_at: e.created_at,
        }
    }
}

/// 心情记录的时间范围筛选
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFilter {
    Daily,
    Weekly,
    Monthly,
}

impl EntryFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(EntryFilter::Daily),
            "weekly" => Some(EntryFilter::Weekly),
            "monthly" => Some(EntryFilter::Monthly),
            _ => None,
        }
    }

    /// 周期起点:当天零点、本周一零点、本月一号零点
    pub fn period_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let start = match self {
            EntryFilter::Daily => today,
            EntryFilter::Weekly => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            EntryFilter::Monthly => today.with_day(1).unwrap_or(today),
        };
        start.and_time(NaiveTime::MIN).and_utc()
    }
}

impl DiaryEntry {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        mood_emoji: &str,
        entry: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DiaryEntry>(
            r#"
            INSERT INTO diary_entries (user_id, mood_emoji, entry)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, mood_emoji, entry, created_at
            "#,
        )
        .bind(user_id)
        .bind(mood_emoji)
        .bind(entry)
        .fetch_one(pool)
        .await
    }

    /// 只取当前用户的记录,since为None时不限时间
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiaryEntry>(
            r#"
            SELECT id, user_id, mood_emoji, entry, created_at
            FROM diary_entries
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filter_parsing() {
        assert_eq!(EntryFilter::parse("daily"), Some(EntryFilter::Daily));
        assert_eq!(EntryFilter::parse("weekly"), Some(EntryFilter::Weekly));
        assert_eq!(EntryFilter::parse("monthly"), Some(EntryFilter::Monthly));
        assert_eq!(EntryFilter::parse("yearly"), None);
        assert_eq!(EntryFilter::parse(""), None);
    }

    #[test]
    fn daily_starts_at_midnight() {
        // 2025-06-18 是周三
        let now = Utc.with_ymd_and_hms(2025, 6, 18, 15, 30, 45).unwrap();
        let start = EntryFilter::Daily.period_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_starts_on_monday() {
        let wednesday = Utc.with_ymd_and_hms(2025, 6, 18, 15, 30, 0).unwrap();
        let start = EntryFilter::Weekly.period_start(wednesday);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_on_monday_is_that_same_day() {
        let monday = Utc.with_ymd_and_hms(2025, 6, 16, 3, 0, 0).unwrap();
        let start = EntryFilter::Weekly.period_start(monday);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_on_sunday_reaches_back_to_monday() {
        let sunday = Utc.with_ymd_and_hms(2025, 6, 22, 23, 0, 0).unwrap();
        let start = EntryFilter::Weekly.period_start(sunday);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn monthly_starts_on_the_first() {
        let now = Utc.with_ymd_and_hms(2025, 6, 18, 15, 30, 0).unwrap();
        let start = EntryFilter::Monthly.period_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn monthly_on_the_first_keeps_the_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 1).unwrap();
        let start = EntryFilter::Monthly.period_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    }
}
