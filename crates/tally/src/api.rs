use chrono::{Days, NaiveDate};
use sea_orm::{DatabaseConnection, SqlErr};

use tally_common::error::{Result, TallyError};

use crate::db;
pub use crate::db::checkin::LeaderboardRow;

pub const LEADERBOARD_LIMIT: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    Recorded { streak: i32 },
    AlreadyCheckedIn,
}

#[derive(Clone)]
pub struct ApiState {
    pub db: DatabaseConnection,
    pub auth: String,
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/*
Check-in
*/

/// Record today's check-in for a user. The first check-in ever also
/// creates the user row with `join_date` set to today. A check-in on the
/// day after the previous one extends the streak; any gap resets it to 1.
pub async fn check_in(
    user_id: &str,
    today: NaiveDate,
    db: &DatabaseConnection,
) -> Result<CheckInOutcome> {
    let date = format_date(today);
    if db::checkin::get_by_user_and_date(user_id, &date, db)
        .await?
        .is_some()
    {
        return Ok(CheckInOutcome::AlreadyCheckedIn);
    }

    db::user::create(user_id, &date, db).await?;

    let yesterday = format_date(today - Days::new(1));
    let streak = match db::checkin::get_by_user_and_date(user_id, &yesterday, db).await? {
        Some(previous) => previous.streak + 1,
        None => 1,
    };

    match db::checkin::create(user_id, &date, streak, db).await {
        Ok(entry) => Ok(CheckInOutcome::Recorded {
            streak: entry.streak,
        }),
        // Two check-ins racing past the existence check: the unique index
        // on (user_id, date) turns the loser into the duplicate reply.
        Err(TallyError::Db(err))
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
        {
            Ok(CheckInOutcome::AlreadyCheckedIn)
        }
        Err(err) => Err(err),
    }
}

/*
Join date
*/

pub async fn join_date(user_id: &str, db: &DatabaseConnection) -> Result<Option<String>> {
    let entry = db::user::get(user_id, db).await?;

    Ok(entry.map(|user| user.join_date))
}

/*
Leaderboard
*/

pub async fn leaderboard(db: &DatabaseConnection) -> Result<Vec<LeaderboardRow>> {
    db::checkin::top_streaks(LEADERBOARD_LIMIT, db).await
}

#[cfg(test)]
mod test_api {
    use crate::utils::get_test_db;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn it_should_create_a_user_on_first_check_in() {
        let db = get_test_db().await;

        let outcome = check_in("ada", date("2024-01-01"), &db).await.unwrap();
        assert_eq!(outcome, CheckInOutcome::Recorded { streak: 1 });

        let user = db::user::get("ada", &db).await.unwrap().unwrap();
        assert_eq!(user.join_date, "2024-01-01");
    }

    #[tokio::test]
    async fn it_should_extend_the_streak_on_consecutive_days() {
        let db = get_test_db().await;

        check_in("ada", date("2024-01-01"), &db).await.unwrap();
        let outcome = check_in("ada", date("2024-01-02"), &db).await.unwrap();
        assert_eq!(outcome, CheckInOutcome::Recorded { streak: 2 });
    }

    #[tokio::test]
    async fn it_should_reset_the_streak_after_a_gap() {
        let db = get_test_db().await;

        check_in("ada", date("2024-01-01"), &db).await.unwrap();
        check_in("ada", date("2024-01-02"), &db).await.unwrap();
        let outcome = check_in("ada", date("2024-01-04"), &db).await.unwrap();
        assert_eq!(outcome, CheckInOutcome::Recorded { streak: 1 });
    }

    #[tokio::test]
    async fn it_should_refuse_a_second_check_in_on_the_same_day() {
        let db = get_test_db().await;

        check_in("ada", date("2024-01-01"), &db).await.unwrap();
        let outcome = check_in("ada", date("2024-01-01"), &db).await.unwrap();
        assert_eq!(outcome, CheckInOutcome::AlreadyCheckedIn);

        let entry = db::checkin::get_by_user_and_date("ada", "2024-01-01", &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.streak, 1);
    }

    #[tokio::test]
    async fn it_should_keep_the_original_join_date() {
        let db = get_test_db().await;

        check_in("ada", date("2024-01-01"), &db).await.unwrap();
        check_in("ada", date("2024-01-02"), &db).await.unwrap();

        let user = db::user::get("ada", &db).await.unwrap().unwrap();
        assert_eq!(user.join_date, "2024-01-01");
    }

    #[tokio::test]
    async fn it_should_report_the_join_date() {
        let db = get_test_db().await;

        assert_eq!(join_date("ada", &db).await.unwrap(), None);

        check_in("ada", date("2024-01-01"), &db).await.unwrap();
        assert_eq!(
            join_date("ada", &db).await.unwrap(),
            Some("2024-01-01".to_owned())
        );
    }

    #[tokio::test]
    async fn it_should_rank_the_leaderboard_by_streak() {
        let db = get_test_db().await;

        // A: 5-day streak, B: 9-day streak, C: 9-day streak.
        for day in 1..=5 {
            check_in("a", date(&format!("2024-01-{day:02}")), &db)
                .await
                .unwrap();
        }
        for day in 1..=9 {
            check_in("b", date(&format!("2024-01-{day:02}")), &db)
                .await
                .unwrap();
            check_in("c", date(&format!("2024-01-{day:02}")), &db)
                .await
                .unwrap();
        }

        let rows = leaderboard(&db).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].streak, 9);
        assert_eq!(rows[1].streak, 9);
        assert_eq!(rows[2].streak, 5);
        assert_eq!(rows[2].user_id, "a");
        for pair in rows.windows(2) {
            assert!(pair[0].streak >= pair[1].streak);
        }
    }

    #[tokio::test]
    async fn it_should_list_each_user_once() {
        let db = get_test_db().await;

        // Three historical rows for one user, only the best one counts.
        check_in("ada", date("2024-01-01"), &db).await.unwrap();
        check_in("ada", date("2024-01-02"), &db).await.unwrap();
        check_in("ada", date("2024-01-03"), &db).await.unwrap();

        let rows = leaderboard(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "ada");
        assert_eq!(rows[0].streak, 3);
    }

    #[tokio::test]
    async fn it_should_limit_the_leaderboard_to_fifty_rows() {
        let db = get_test_db().await;

        for n in 0..60 {
            check_in(&format!("user-{n:02}"), date("2024-01-01"), &db)
                .await
                .unwrap();
        }

        let rows = leaderboard(&db).await.unwrap();
        assert_eq!(rows.len(), 50);
    }
}
