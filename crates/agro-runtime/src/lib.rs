#![deny(warnings)]

//! Dashboard runtime: configuration, per-viewer sessions and event dispatch.
//!
//! Each viewer owns a [`DashboardSession`]; hosts serving several viewers keep
//! them in a [`SessionRegistry`] so no forecast cache is shared between them.

pub mod config;
pub mod session;

pub use config::{ConfigError, DashboardConfig, LabelTable, SliderConfig, SliderSpec};
pub use session::{DashboardEvent, DashboardSession, DashboardView, SliderPositions, YearRange};

use agro_core::{EnvField, ValidationError, Year};
use agro_econ::EconError;
use agro_forecast::ForecastError;
use agro_sim::SimError;
use data_pipeline::PipelineError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The event needs data that only exists after a page load.
    #[error("dashboard not initialized: send a page load first")]
    NotInitialized,
    #[error("{field} override {value} outside {min}..={max}")]
    OverrideOutOfRange {
        field: EnvField,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid year range {min}..={max}")]
    InvalidRange { min: Year, max: Year },
    #[error("unknown session {0}")]
    UnknownSession(String),
    #[error("session {0} already open")]
    SessionExists(String),
    #[error("session lock poisoned")]
    Poisoned,
}

pub type SharedSession = Arc<Mutex<DashboardSession>>;

/// Sessions keyed by viewer id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `id`.
    pub fn open(&self, id: &str, config: DashboardConfig) -> Result<SharedSession, DashboardError> {
        let session = Arc::new(Mutex::new(DashboardSession::new(config)?));
        let mut map = self.sessions.write().map_err(|_| DashboardError::Poisoned)?;
        if map.contains_key(id) {
            return Err(DashboardError::SessionExists(id.to_string()));
        }
        map.insert(id.to_string(), Arc::clone(&session));
        info!(session = id, open = map.len(), "session opened");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Result<SharedSession, DashboardError> {
        let map = self.sessions.read().map_err(|_| DashboardError::Poisoned)?;
        map.get(id)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownSession(id.to_string()))
    }

    /// Drop the session; returns whether it existed.
    pub fn close(&self, id: &str) -> Result<bool, DashboardError> {
        let mut map = self.sessions.write().map_err(|_| DashboardError::Poisoned)?;
        Ok(map.remove(id).is_some())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Route `event` to the session `id`, holding its lock for the whole event.
    pub fn dispatch(&self, id: &str, event: DashboardEvent) -> Result<DashboardView, DashboardError> {
        let session = self.get(id)?;
        let mut guard = session.lock().map_err(|_| DashboardError::Poisoned)?;
        guard.handle(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(seed: u64) -> DashboardConfig {
        DashboardConfig {
            seed: Some(seed),
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn sessions_do_not_share_overrides() {
        let reg = SessionRegistry::new();
        reg.open("a", config(9)).unwrap();
        reg.open("b", config(9)).unwrap();
        let a0 = reg.dispatch("a", DashboardEvent::PageLoad).unwrap();
        let b0 = reg.dispatch("b", DashboardEvent::PageLoad).unwrap();
        assert_eq!(a0, b0);

        let a1 = reg
            .dispatch(
                "a",
                DashboardEvent::OverrideChanged {
                    field: EnvField::Temperature,
                    value: 40.0,
                },
            )
            .unwrap();
        let b1 = reg.get("b").unwrap().lock().unwrap().view().unwrap();
        assert_eq!(a1.next_year.rows[0].temperature, 40.0);
        assert_eq!(b1, b0);
    }

    #[test]
    fn concurrent_dispatch_per_session() {
        let reg = SessionRegistry::new();
        for id in ["x", "y", "z"] {
            reg.open(id, config(1)).unwrap();
        }
        std::thread::scope(|s| {
            for id in ["x", "y", "z"] {
                let reg = &reg;
                s.spawn(move || {
                    reg.dispatch(id, DashboardEvent::PageLoad).unwrap();
                    reg.dispatch(id, DashboardEvent::RangeFilterChanged { min: 2026, max: 2028 })
                        .unwrap();
                });
            }
        });
        for id in ["x", "y", "z"] {
            let v = reg.get(id).unwrap().lock().unwrap().view().unwrap();
            assert_eq!(v.forecast.years(), vec![2026, 2027, 2028]);
        }
    }

    #[test]
    fn registry_bookkeeping() {
        let reg = SessionRegistry::new();
        assert!(reg.is_empty());
        reg.open("a", config(1)).unwrap();
        assert!(matches!(
            reg.open("a", config(2)),
            Err(DashboardError::SessionExists(_))
        ));
        assert!(matches!(
            reg.dispatch("nope", DashboardEvent::PageLoad),
            Err(DashboardError::UnknownSession(_))
        ));
        assert!(reg.close("a").unwrap());
        assert!(!reg.close("a").unwrap());
        assert_eq!(reg.len(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn range_filter_stays_inside_span(seed in any::<u64>(), lo in 2020i32..2035, width in 0i32..6) {
            let mut s = DashboardSession::new(config(seed)).unwrap();
            s.handle(DashboardEvent::PageLoad).unwrap();
            let v = s.handle(DashboardEvent::RangeFilterChanged { min: lo, max: lo + width }).unwrap();
            for r in &v.forecast.rows {
                prop_assert!(r.year >= lo && r.year <= lo + width);
                prop_assert!(r.year >= v.forecast_span.min && r.year <= v.forecast_span.max);
            }
        }
    }
}
