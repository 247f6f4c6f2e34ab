//! Mutation rows and the queues they live in.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

use super::Error;
use crate::config::Config;

/// The mutation queues. Each one has its own table, sync port and worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    /// Competition changes: opening a season, registrations, standings.
    Competitie,
    /// Web shop and event orders.
    Bestel,
    /// Payment status updates.
    Betaal,
    /// Referee assignments.
    Scheids,
}

impl Queue {
    pub fn all() -> [Queue; 4] {
        [Queue::Competitie, Queue::Bestel, Queue::Betaal, Queue::Scheids]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Queue::Competitie => "competitie",
            Queue::Bestel => "bestel",
            Queue::Betaal => "betaal",
            Queue::Scheids => "scheids",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Queue::Competitie => "competitie_mutatie",
            Queue::Bestel => "bestel_mutatie",
            Queue::Betaal => "betaal_mutatie",
            Queue::Scheids => "scheids_mutatie",
        }
    }

    /// Offset from the configured base port. 2 belongs to the pass downloader.
    pub fn port_offset(&self) -> u16 {
        match self {
            Queue::Competitie => 1,
            Queue::Bestel => 3,
            Queue::Betaal => 4,
            Queue::Scheids => 5,
        }
    }

    /// Address the worker of this queue listens on for pings.
    pub fn sync_addr(&self, config: &Config) -> String {
        format!(
            "{}:{}",
            config.sync.host,
            config.sync.base_port + self.port_offset()
        )
    }

    /// How long the worker waits for a ping before looking at the table again.
    pub fn poll_timeout(&self) -> Duration {
        match self {
            Queue::Competitie => Duration::from_secs(3),
            _ => Duration::from_secs(5),
        }
    }

    /// Taken off the worker's run time so that two workers started by cron
    /// don't overlap.
    pub fn overlap_margin(&self) -> Duration {
        match self {
            Queue::Competitie => Duration::ZERO,
            _ => Duration::from_secs(15),
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Queue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Queue::all()
            .into_iter()
            .find(|queue| queue.name() == s.to_lowercase())
            .ok_or_else(|| Error::UnknownQueue(s.to_string()))
    }
}

/// One unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Assigned by the store on insert. Ids only go up.
    pub id: Option<i64>,
    pub queue: Queue,
    /// What kind of mutation this is. Meaning is up to the handlers.
    pub code: i32,
    /// Reference to the entity the mutation is about.
    pub payload: serde_json::Value,
    /// Who asked for it, e.g. "BB Jan de Vries".
    pub door: String,
    /// Set by the worker once the mutation has been applied (`is_verwerkt`).
    pub processed: bool,
    pub created_at: OffsetDateTime,
}

impl Mutation {
    /// New, unsaved mutation.
    pub fn new(queue: Queue, code: i32) -> Self {
        Self {
            id: None,
            queue,
            code,
            payload: serde_json::Value::Object(Default::default()),
            door: String::new(),
            processed: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Set the entity reference from anything serializable.
    pub fn payload(mut self, payload: impl Serialize) -> Result<Self, Error> {
        self.payload = serde_json::to_value(payload)?;
        Ok(self)
    }

    /// Set the actor label.
    pub fn door(mut self, door: impl ToString) -> Self {
        self.door = door.to_string();
        self
    }

    /// Primary key, if the mutation has been saved.
    pub fn id(&self) -> Result<i64, Error> {
        self.id.ok_or(Error::NotSaved)
    }

    /// Read the payload as a Rust type.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// Same kind of work about the same entity, still waiting for the worker.
    pub fn same_pending(&self, other: &Mutation) -> bool {
        !other.processed
            && self.queue == other.queue
            && self.code == other.code
            && self.payload == other.payload
    }

    pub(crate) fn from_row(queue: Queue, row: tokio_postgres::Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            queue,
            code: row.try_get("code")?,
            payload: row.try_get("payload")?,
            door: row.try_get("door")?,
            processed: row.try_get("is_verwerkt")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
