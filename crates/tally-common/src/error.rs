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

use sea_orm::DbErr;
use serde_json::Error as SerdeError;
use std::io;
use thiserror::Error;
use tokio;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("Gateway error: `{0}`")]
    Gateway(String),
    #[error("Database error: `{0}`")]
    Db(#[from] DbErr),
    #[error("I/O error: `{0}`")]
    Io(#[from] io::Error),
    #[error("Channel Receive error: `{0}`")]
    ChannelRecv(#[from] tokio::sync::oneshot::error::RecvError),
    #[error("Serialization/deserialization error")]
    Serde(#[from] SerdeError),
    #[error("Websocket close")]
    WebsocketClose,
}

pub type Result<T> = std::result::Result<T, TallyError>;
