//! Mock implementations for testing
//!
//! Provides a recording [`MockSession`] and an in-memory [`StaticSecrets`]
//! so the runner, reporter and configuration can be exercised without a
//! broker, an HTTP endpoint, the filesystem or the process environment.

use crate::config::SecretSource;
use crate::envelope::Envelope;
use crate::error::CallError;
use crate::outcome::{Response, TokenUsage};
use crate::transport::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// How a [`MockSession`] answers
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Acknowledge every publish
    Acknowledge,
    /// Answer with generated text
    Generate(String),
    /// Fail `open` with a connection error
    ConnectFailure(String),
    /// Fail `call` with a remote error
    RemoteFailure(String),
}

/// Everything the mock saw
#[derive(Debug, Default, Clone)]
pub struct MockRecord {
    pub opens: usize,
    pub closes: usize,
    pub calls: Vec<Envelope>,
}

/// Recording session double
#[derive(Debug, Clone)]
pub struct MockSession {
    behavior: MockBehavior,
    open: bool,
    record: Arc<Mutex<MockRecord>>,
}

impl MockSession {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            open: false,
            record: Arc::new(Mutex::new(MockRecord::default())),
        }
    }

    pub fn acknowledging() -> Self {
        Self::new(MockBehavior::Acknowledge)
    }

    pub fn generating(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Generate(text.into()))
    }

    /// Shared handle to the record, usable after the session is moved
    pub fn recorder(&self) -> Arc<Mutex<MockRecord>> {
        self.record.clone()
    }

    fn record(&self) -> MutexGuard<'_, MockRecord> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open_count(&self) -> usize {
        self.record().opens
    }

    pub fn close_count(&self) -> usize {
        self.record().closes
    }

    pub fn calls(&self) -> Vec<Envelope> {
        self.record().calls.clone()
    }
}

#[async_trait]
impl Session for MockSession {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<(), CallError> {
        self.record().opens += 1;
        if let MockBehavior::ConnectFailure(message) = &self.behavior {
            return Err(CallError::connection(message.clone()));
        }
        self.open = true;
        Ok(())
    }

    async fn call(&mut self, envelope: &Envelope) -> Result<Response, CallError> {
        if !self.open {
            return Err(CallError::connection("Session is not open"));
        }
        self.record().calls.push(envelope.clone());

        match &self.behavior {
            MockBehavior::Acknowledge => Ok(Response::Acknowledged {
                destination: envelope.destination.clone(),
            }),
            MockBehavior::Generate(text) => Ok(Response::Generated {
                text: text.clone(),
                model: envelope.destination.clone(),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                },
                stop_reason: Some("end_turn".to_string()),
            }),
            MockBehavior::RemoteFailure(message) => Err(CallError::remote(message.clone())),
            MockBehavior::ConnectFailure(message) => Err(CallError::connection(message.clone())),
        }
    }

    async fn close(&mut self) -> Result<(), CallError> {
        self.record().closes += 1;
        self.open = false;
        Ok(())
    }
}

/// In-memory secret source
#[derive(Debug, Default, Clone)]
pub struct StaticSecrets {
    env: HashMap<String, String>,
    files: HashMap<PathBuf, Vec<u8>>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: &[u8]) -> Self {
        self.files.insert(path.into(), contents.to_vec());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn env_var(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }

    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}
