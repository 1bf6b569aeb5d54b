//! In-memory fakes shared by the unit tests.

use async_trait::async_trait;
use labeler_store::{Label, LabelStore, LabelStoreError, NewLabel, RepoRef, label_key};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Create(String),
    Attach(u64, Vec<String>),
}

#[derive(Debug, Clone)]
enum CreateBehavior {
    /// Another writer creates `canonical` first; our create then conflicts.
    Race { canonical: String },
    Fail,
}

#[derive(Default)]
pub struct FakeLabelStore {
    labels: Mutex<Vec<Label>>,
    create_behavior: HashMap<String, CreateBehavior>,
    fail_list: bool,
    fail_relist: bool,
    fail_attach: bool,
    calls: Mutex<Vec<StoreCall>>,
}

impl FakeLabelStore {
    pub fn with_labels(names: &[&str]) -> Self {
        let labels = names
            .iter()
            .map(|name| Label {
                name: name.to_string(),
                description: None,
                color: "ededed".to_string(),
            })
            .collect();
        Self {
            labels: Mutex::new(labels),
            ..Self::default()
        }
    }

    pub fn race_on(mut self, name: &str, canonical: &str) -> Self {
        self.create_behavior.insert(
            label_key(name),
            CreateBehavior::Race {
                canonical: canonical.to_string(),
            },
        );
        self
    }

    pub fn fail_on(mut self, name: &str) -> Self {
        self.create_behavior
            .insert(label_key(name), CreateBehavior::Fail);
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// The first listing succeeds; every later one fails.
    pub fn failing_relist(mut self) -> Self {
        self.fail_relist = true;
        self
    }

    pub fn failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Create(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn label(&self, name: &str) -> Option<Label> {
        self.labels
            .lock()
            .expect("labels lock")
            .iter()
            .find(|l| l.name == name)
            .cloned()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl LabelStore for FakeLabelStore {
    async fn list_labels(&self, _repo: &RepoRef) -> labeler_store::Result<Vec<Label>> {
        let previous_lists = self
            .calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::List))
            .count();
        self.record(StoreCall::List);
        if self.fail_list || (self.fail_relist && previous_lists > 0) {
            return Err(LabelStoreError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(self.labels.lock().expect("labels lock").clone())
    }

    async fn create_label(
        &self,
        _repo: &RepoRef,
        label: &NewLabel,
    ) -> labeler_store::Result<Label> {
        self.record(StoreCall::Create(label.name.clone()));
        let mut labels = self.labels.lock().expect("labels lock");
        match self.create_behavior.get(&label_key(&label.name)) {
            Some(CreateBehavior::Race { canonical }) => {
                labels.push(Label {
                    name: canonical.clone(),
                    description: None,
                    color: "ededed".to_string(),
                });
                return Err(LabelStoreError::Conflict {
                    name: label.name.clone(),
                });
            }
            Some(CreateBehavior::Fail) => {
                return Err(LabelStoreError::Api {
                    status: 403,
                    message: "Resource not accessible by integration".to_string(),
                });
            }
            None => {}
        }
        if labels.iter().any(|l| l.key() == label_key(&label.name)) {
            return Err(LabelStoreError::Conflict {
                name: label.name.clone(),
            });
        }
        let created = Label {
            name: label.name.clone(),
            description: Some(label.description.clone()),
            color: label.color.clone(),
        };
        labels.push(created.clone());
        Ok(created)
    }

    async fn attach_labels(
        &self,
        _repo: &RepoRef,
        issue_number: u64,
        names: &[String],
    ) -> labeler_store::Result<()> {
        self.record(StoreCall::Attach(issue_number, names.to_vec()));
        if self.fail_attach {
            return Err(LabelStoreError::Http("connection reset".to_string()));
        }
        Ok(())
    }
}
