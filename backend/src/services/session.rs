//! In-memory dashboard sessions.
//!
//! A session keeps what one user has selected between requests: the resolved
//! study area and the years to display.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{StudyArea, StudyAreaSummary, YearRange};
use crate::study_area::{ResolutionAttempt, ResolutionOutcome};

/// Year shown before the user picks any.
pub const DEFAULT_YEAR: i32 = 2023;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("year {year} is outside the available range {first}-{last}")]
    YearOutOfRange { year: i32, first: i32, last: i32 },
}

/// What applying a resolution outcome did to the session's area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaChange {
    Replaced,
    Kept,
    Cleared,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub area: Option<StudyArea>,
    pub years: Vec<i32>,
    /// Attempts of the latest resolution, including failed channels.
    pub last_attempts: Vec<ResolutionAttempt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub area: Option<StudyAreaSummary>,
    pub years: Vec<i32>,
    pub last_attempts: Vec<ResolutionAttempt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            area: session.area.as_ref().map(StudyArea::summary),
            years: session.years.clone(),
            last_attempts: session.last_attempts.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    years: YearRange,
}

impl SessionStore {
    pub fn new(years: YearRange) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            years,
        }
    }

    pub fn year_range(&self) -> YearRange {
        self.years
    }

    /// Create an empty session and return its id.
    pub fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let default_year = if self.years.contains(DEFAULT_YEAR) {
            DEFAULT_YEAR
        } else {
            self.years.last
        };
        let session = Session {
            session_id: session_id.clone(),
            area: None,
            years: vec![default_year],
            last_attempts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.sessions.write().insert(session_id.clone(), session);
        debug!(session = %session_id, "session created");
        session_id
    }

    pub fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.sessions
            .read()
            .get(session_id)
            .map(SessionSnapshot::from)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub fn remove(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Apply a resolution: a resolved area replaces the current one, a request
    /// without any input clears it, and a failed resolution leaves it as is.
    pub fn apply_resolution(
        &self,
        session_id: &str,
        outcome: ResolutionOutcome,
    ) -> Result<AreaChange, SessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let change = if outcome.is_no_input() {
            session.area = None;
            AreaChange::Cleared
        } else if let Some(area) = outcome.area {
            info!(session = %session_id, area = %area.name(), fingerprint = %area.fingerprint(), "study area replaced");
            session.area = Some(area);
            AreaChange::Replaced
        } else {
            AreaChange::Kept
        };
        session.last_attempts = outcome.attempts;
        session.updated_at = Utc::now();
        Ok(change)
    }

    /// Replace the selected years. Duplicates collapse to their first position.
    pub fn set_years(&self, session_id: &str, years: &[i32]) -> Result<Vec<i32>, SessionError> {
        if let Some(&year) = years.iter().find(|y| !self.years.contains(**y)) {
            return Err(SessionError::YearOutOfRange {
                year,
                first: self.years.first,
                last: self.years.last,
            });
        }
        let mut selected: Vec<i32> = Vec::with_capacity(years.len());
        for &year in years {
            if !selected.contains(&year) {
                selected.push(year);
            }
        }

        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.years = selected.clone();
        session.updated_at = Utc::now();
        Ok(selected)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(YearRange::default())
    }
}
