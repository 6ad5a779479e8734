// Tally
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use sea_orm::*;
use serde::Serialize;
use uuid;

use tally_common::error::Result;

use super::entities::{prelude::*, *};

/// One leaderboard entry: a user's best recorded streak.
#[derive(Debug, FromQueryResult, Serialize)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub streak: i32,
}

pub async fn create(
    user_id: &str,
    date: &str,
    streak: i32,
    db: &DatabaseConnection,
) -> Result<checkin::Model> {
    let entry = checkin::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        user_id: ActiveValue::Set(user_id.to_owned()),
        date: ActiveValue::Set(date.to_owned()),
        streak: ActiveValue::Set(streak),
        ..Default::default()
    };
    let entry = entry.insert(db).await?;

    Ok(entry)
}

pub async fn get_by_user_and_date(
    user_id: &str,
    date: &str,
    db: &DatabaseConnection,
) -> Result<Option<checkin::Model>> {
    let entry = Checkin::find()
        .filter(checkin::Column::UserId.eq(user_id))
        .filter(checkin::Column::Date.eq(date))
        .one(db)
        .await?;

    Ok(entry)
}

pub async fn top_streaks(limit: u64, db: &DatabaseConnection) -> Result<Vec<LeaderboardRow>> {
    let entries = Checkin::find()
        .select_only()
        .column(checkin::Column::UserId)
        .column_as(checkin::Column::Streak.max(), "streak")
        .group_by(checkin::Column::UserId)
        .order_by_desc(checkin::Column::Streak.max())
        .limit(limit)
        .into_model::<LeaderboardRow>()
        .all(db)
        .await?;

    Ok(entries)
}
