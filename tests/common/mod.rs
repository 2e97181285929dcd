#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uptimesync::{
    Account, AlertContact, Monitor, MonitorKind, MonitorProvider, NewMonitor, ProviderError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(NewMonitor),
    Delete(u64),
    Raw {
        method: String,
        params: Vec<(String, String)>,
    },
}

#[derive(Default)]
struct State {
    monitors: Vec<Monitor>,
    contacts: Vec<AlertContact>,
    calls: Vec<Call>,
    fail_listing: bool,
    fail_contacts: bool,
    fail_create: bool,
    fail_delete: bool,
    fail_edit: bool,
}

/// In-memory account that applies mutations and records every call.
pub struct FakeProvider {
    email: String,
    next_id: Arc<AtomicU64>,
    state: Mutex<State>,
}

impl FakeProvider {
    pub fn new(email: &str, ids: &Arc<AtomicU64>) -> Arc<Self> {
        Arc::new(Self {
            email: email.to_string(),
            next_id: Arc::clone(ids),
            state: Mutex::new(State::default()),
        })
    }

    pub fn account(self: &Arc<Self>) -> Account {
        Account::new(self.email.clone(), Arc::clone(self) as Arc<dyn MonitorProvider>)
    }

    pub fn with_monitor(self: Arc<Self>, monitor: Monitor) -> Arc<Self> {
        self.push_monitor(monitor);
        self
    }

    pub fn push_monitor(&self, monitor: Monitor) {
        self.state.lock().unwrap().monitors.push(monitor);
    }

    pub fn with_contact(self: Arc<Self>, id: &str, name: &str) -> Arc<Self> {
        self.state.lock().unwrap().contacts.push(AlertContact {
            id: id.to_string(),
            friendly_name: name.to_string(),
            kind: 2,
        });
        self
    }

    pub fn failing_listing(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().unwrap().fail_listing = true;
        self
    }

    pub fn failing_contacts(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().unwrap().fail_contacts = true;
        self
    }

    pub fn failing_create(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    /// Delete calls are recorded but rejected.
    pub fn failing_delete(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().unwrap().fail_delete = true;
        self
    }

    /// `editMonitor` calls are recorded but rejected.
    pub fn failing_edit(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().unwrap().fail_edit = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn creates(&self) -> Vec<NewMonitor> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn monitors_now(&self) -> Vec<Monitor> {
        self.state.lock().unwrap().monitors.clone()
    }

    fn fail(method: &str) -> ProviderError {
        ProviderError::Api {
            method: method.to_string(),
            message: "simulated failure".to_string(),
        }
    }
}

#[async_trait]
impl MonitorProvider for FakeProvider {
    async fn monitors(&self) -> Result<Vec<Monitor>, ProviderError> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(Self::fail("getMonitors"));
        }
        Ok(state.monitors.clone())
    }

    async fn alert_contacts(&self) -> Result<Vec<AlertContact>, ProviderError> {
        let state = self.state.lock().unwrap();
        if state.fail_contacts {
            return Err(Self::fail("getAlertContacts"));
        }
        Ok(state.contacts.clone())
    }

    async fn create_monitor(&self, monitor: &NewMonitor) -> Result<u64, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(monitor.clone()));
        if state.fail_create {
            return Err(Self::fail("newMonitor"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.monitors.push(Monitor {
            id,
            friendly_name: monitor.friendly_name.clone(),
            url: monitor.url.clone(),
            kind: monitor.kind,
            keyword_type: monitor.keyword_type,
            keyword_value: monitor.keyword_value.clone(),
            alert_contacts: monitor.alert_contacts.clone(),
            port: Some(monitor.port),
        });
        Ok(id)
    }

    async fn delete_monitor(&self, id: u64) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id));
        if state.fail_delete {
            return Err(Self::fail("deleteMonitor"));
        }
        state.monitors.retain(|m| m.id != id);
        Ok(())
    }

    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Raw {
            method: method.to_string(),
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        });
        let param = |key: &str| params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());
        if method == "editMonitor" {
            if state.fail_edit {
                return Err(Self::fail(method));
            }
            let id: u64 = param("id").and_then(|id| id.parse().ok()).unwrap_or_default();
            if let (Some(monitor), Some(keyword)) = (
                state.monitors.iter_mut().find(|m| m.id == id),
                param("keyword_value"),
            ) {
                monitor.keyword_value = keyword;
            }
        }
        Ok(())
    }

    async fn account_email(&self) -> Result<String, ProviderError> {
        Ok(self.email.clone())
    }
}

pub fn ids() -> Arc<AtomicU64> {
    Arc::new(AtomicU64::new(1000))
}

pub fn plain_monitor(id: u64, name: &str) -> Monitor {
    Monitor {
        id,
        friendly_name: name.to_string(),
        url: format!("https://{name}"),
        kind: MonitorKind::Plain,
        keyword_type: None,
        keyword_value: String::new(),
        alert_contacts: Vec::new(),
        port: None,
    }
}

pub fn keyword_monitor(id: u64, name: &str, keyword: &str) -> Monitor {
    Monitor {
        kind: MonitorKind::Keyword,
        keyword_type: Some(uptimesync::KeywordPolarity::Exists),
        keyword_value: keyword.to_string(),
        ..plain_monitor(id, name)
    }
}
