//! Data hooks: fetch rows from the backend, map them to view types and keep
//! loading/error state alongside the data
//!
//! A hook fetches once when mounted, again whenever its dependencies change, and
//! on explicit [`DataHook::refetch`]. There is no automatic retry.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::backend::{BackendClient, Direction, Query};
use crate::model::{
    CalendarEvent, Client, ClientStatus, EventRow, Prescription, CLIENTS_TABLE, EVENTS_TABLE,
    PRESCRIPTIONS_TABLE,
};
use crate::NutrimaticError;

/// Source of rows for a [`DataHook`]
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Deps: Clone + PartialEq + fmt::Debug + Send + Sync;
    type Item: Clone + Send + Sync;

    async fn fetch(&self, deps: &Self::Deps) -> crate::Result<Vec<Self::Item>>;
}

/// Observable hook state
#[derive(Debug, Clone, Serialize)]
pub struct HookState<T> {
    pub data: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for HookState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

pub struct DataHook<F: Fetcher> {
    fetcher: F,
    deps: Mutex<F::Deps>,
    state: Arc<RwLock<HookState<F::Item>>>,
    /// Bumped by every fetch; only the latest one may publish its result
    generation: AtomicU64,
}

impl<F: Fetcher> DataHook<F> {
    /// Create the hook and run the initial fetch
    pub async fn mount(fetcher: F, deps: F::Deps) -> Self {
        let hook = Self {
            fetcher,
            deps: Mutex::new(deps),
            state: Arc::new(RwLock::new(HookState::default())),
            generation: AtomicU64::new(0),
        };
        hook.refetch().await;
        hook
    }

    /// Replace the dependencies, refetching only when they changed
    pub async fn set_deps(&self, deps: F::Deps) -> bool {
        {
            let mut current = self.deps.lock().await;
            if *current == deps {
                return false;
            }
            tracing::debug!("Hook dependencies changed: {:?} -> {:?}", *current, deps);
            *current = deps;
        }
        self.refetch().await;
        true
    }

    /// Fetch with the current dependencies; a result overtaken by a later
    /// fetch is dropped
    pub async fn refetch(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deps = self.deps.lock().await.clone();
        self.state.write().await.loading = true;

        let result = self.fetcher.fetch(&deps).await;

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Dropping stale fetch result for {:?}", deps);
            return;
        }
        state.loading = false;
        match result {
            Ok(data) => {
                state.data = data;
                state.error = None;
            }
            Err(e) => {
                tracing::warn!("Fetch for {:?} failed: {}", deps, e);
                state.data.clear();
                state.error = Some(e.to_string());
            }
        }
    }

    pub async fn snapshot(&self) -> HookState<F::Item> {
        self.state.read().await.clone()
    }

    pub async fn deps(&self) -> F::Deps {
        self.deps.lock().await.clone()
    }
}

/// Calendar month, rendered as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> crate::Result<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(NutrimaticError::Validation(format!(
                "invalid month {}-{}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = NutrimaticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NutrimaticError::Validation(format!("expected YYYY-MM, got '{}'", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDeps {
    pub owner: Uuid,
    pub month: YearMonth,
}

/// Schedule rows of one month joined to their client
pub struct CalendarFetcher {
    pub backend: BackendClient,
}

#[async_trait]
impl Fetcher for CalendarFetcher {
    type Deps = CalendarDeps;
    type Item = CalendarEvent;

    async fn fetch(&self, deps: &CalendarDeps) -> crate::Result<Vec<CalendarEvent>> {
        let query = Query::table(EVENTS_TABLE)
            .select("id,data,hora,acao,clientes(nome)")
            .eq("nutricionista_id", deps.owner)
            .gte("data", deps.month.first_day())
            .lt("data", deps.month.next().first_day())
            .order("data", Direction::Ascending)
            .order("hora", Direction::Ascending);

        let rows: Vec<EventRow> = self.backend.select(&query).await?;
        Ok(rows.into_iter().map(CalendarEvent::from).collect())
    }
}

/// Where the client list comes from
pub enum ClientSource {
    Fixtures,
    Backend(BackendClient),
}

pub struct ClientsFetcher {
    pub source: ClientSource,
}

#[async_trait]
impl Fetcher for ClientsFetcher {
    type Deps = Uuid;
    type Item = Client;

    async fn fetch(&self, owner: &Uuid) -> crate::Result<Vec<Client>> {
        match &self.source {
            ClientSource::Fixtures => Ok(fixture_clients()),
            ClientSource::Backend(backend) => {
                let query = Query::table(CLIENTS_TABLE)
                    .select("id,nome,telefone,status")
                    .eq("nutricionista_id", owner)
                    .order("nome", Direction::Ascending);
                backend.select(&query).await
            }
        }
    }
}

/// Sample clients shown until the client table is wired up
pub fn fixture_clients() -> Vec<Client> {
    [
        (1, "Ana Beatriz Lima", "(11) 98765-4321", ClientStatus::Active),
        (2, "Carlos Eduardo Santos", "(21) 99876-5432", ClientStatus::Active),
        (3, "Fernanda Oliveira", "(31) 97654-3210", ClientStatus::Inactive),
        (4, "João Pedro Almeida", "(41) 96543-2109", ClientStatus::Active),
    ]
    .into_iter()
    .map(|(n, name, phone, status)| Client {
        id: Uuid::from_u128(n),
        name: name.to_string(),
        phone: phone.to_string(),
        status,
    })
    .collect()
}

/// Prescriptions of one nutritionist, newest first
pub struct PrescriptionsFetcher {
    pub backend: BackendClient,
}

#[async_trait]
impl Fetcher for PrescriptionsFetcher {
    type Deps = Uuid;
    type Item = Prescription;

    async fn fetch(&self, owner: &Uuid) -> crate::Result<Vec<Prescription>> {
        let query = Query::table(PRESCRIPTIONS_TABLE)
            .eq("nutricionista_id", owner)
            .order("created_at", Direction::Descending);
        self.backend.select(&query).await
    }
}
