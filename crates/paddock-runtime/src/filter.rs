use paddock_types::{AggregateScope, EventId, SessionKey, SessionType};

use crate::{Error, Result};

/// Earliest season the providers can be asked about
pub const FIRST_SEASON: i32 = 1950;

/// Recognized aggregate filters; everything else is rejected up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateFilter {
    pub first_season: i32,
    pub last_season: i32,
    pub session_types: Vec<SessionType>,
    pub event: Option<EventId>,
}

impl AggregateFilter {
    /// Races only, one season range
    pub fn races(first_season: i32, last_season: i32) -> Self {
        Self {
            first_season,
            last_season,
            session_types: vec![SessionType::Race],
            event: None,
        }
    }

    pub fn with_session_types(mut self, session_types: Vec<SessionType>) -> Self {
        self.session_types = session_types;
        self
    }

    pub fn with_event(mut self, event: EventId) -> Self {
        self.event = Some(event);
        self
    }

    pub fn seasons(&self) -> impl Iterator<Item = i32> {
        self.first_season..=self.last_season
    }

    pub fn matches(&self, key: &SessionKey) -> bool {
        (self.first_season..=self.last_season).contains(&key.season)
            && self.session_types.contains(&key.session_type)
            && self.event.as_ref().is_none_or(|event| &key.event == event)
    }
}

/// Scope plus filter, validated together before entering the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    scope: AggregateScope,
    filter: AggregateFilter,
}

impl AggregateQuery {
    pub fn new(scope: AggregateScope, mut filter: AggregateFilter) -> Result<Self> {
        let current = chrono::Datelike::year(&chrono::Utc::now());

        if filter.first_season > filter.last_season {
            return Err(Error::InvalidQuery(format!(
                "season range {}-{} is reversed",
                filter.first_season, filter.last_season
            )));
        }
        if filter.first_season < FIRST_SEASON || filter.last_season > current + 1 {
            return Err(Error::InvalidQuery(format!(
                "seasons must fall within {}-{}",
                FIRST_SEASON,
                current + 1
            )));
        }

        filter.session_types.sort();
        filter.session_types.dedup();
        if filter.session_types.is_empty() {
            return Err(Error::InvalidQuery(
                "at least one session type is required".to_string(),
            ));
        }

        match &scope {
            AggregateScope::Circuit(circuit) => match &filter.event {
                Some(event) if event != circuit => {
                    return Err(Error::InvalidQuery(format!(
                        "event filter {} conflicts with circuit scope {}",
                        event, circuit
                    )));
                }
                _ => filter.event = Some(circuit.clone()),
            },
            AggregateScope::SeasonComparison => {
                if !filter.session_types.iter().any(|t| t.awards_points()) {
                    return Err(Error::InvalidQuery(
                        "season comparison needs a points-scoring session type".to_string(),
                    ));
                }
            }
            AggregateScope::Driver(_) | AggregateScope::Team(_) => {}
        }

        Ok(Self { scope, filter })
    }

    pub fn scope(&self) -> &AggregateScope {
        &self.scope
    }

    pub fn filter(&self) -> &AggregateFilter {
        &self.filter
    }
}
