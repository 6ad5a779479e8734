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

use tally_common::error::Result;

use super::entities::{prelude::*, *};

pub async fn create(user_id: &str, join_date: &str, db: &DatabaseConnection) -> Result<String> {
    let Some(existing) = User::find_by_id(user_id).one(db).await? else {
        let entry = user::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_owned()),
            join_date: ActiveValue::Set(join_date.to_owned()),
            ..Default::default()
        };
        entry.insert(db).await?;
        return Ok(user_id.to_owned());
    };
    Ok(existing.user_id)
}

pub async fn get(user_id: &str, db: &DatabaseConnection) -> Result<Option<user::Model>> {
    let entry = User::find_by_id(user_id).one(db).await?;

    Ok(entry)
}
