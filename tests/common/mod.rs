//! In-memory fakes for the tunnel, the database and the model.
//!
//! All three share one `Probe` so a test can see what the pipeline did.

#![allow(dead_code)]

use askdb::db::{Connector, SchemaInspector, SqlSession};
use askdb::pipeline::{Pipeline, PipelineEvent, Reporter};
use askdb::tunnel::{ActiveTunnel, TunnelProvider};
use askdb::{AskError, Result, RowSet, SqlGenerator};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const CUSTOMERS_DDL: &str = "CREATE TABLE `customers` (\n  `id` int NOT NULL,\n  `name` varchar(64)\n)";

/// Everything the fakes observed.
#[derive(Default)]
pub struct Probe {
    pub tunnel_opens: Mutex<usize>,
    pub tunnel_releases: Mutex<usize>,
    pub session_closes: Mutex<usize>,
    /// Statements executed outside schema inspection
    pub executed: Mutex<Vec<String>>,
    /// Prompts sent to the model
    pub prompts: Mutex<Vec<String>>,
    pub events: Mutex<Vec<String>>,
}

impl Probe {
    pub fn opens(&self) -> usize {
        *self.tunnel_opens.lock().unwrap()
    }

    pub fn releases(&self) -> usize {
        *self.tunnel_releases.lock().unwrap()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

pub struct FakeTunnels {
    pub probe: Arc<Probe>,
    pub fail_open: bool,
}

pub struct FakeTunnel {
    probe: Arc<Probe>,
    closed: bool,
}

#[async_trait]
impl TunnelProvider for FakeTunnels {
    type Tunnel = FakeTunnel;

    async fn open(&self) -> Result<FakeTunnel> {
        if self.fail_open {
            return Err(AskError::tunnel("cannot reach bastion:22"));
        }
        *self.probe.tunnel_opens.lock().unwrap() += 1;
        Ok(FakeTunnel {
            probe: Arc::clone(&self.probe),
            closed: false,
        })
    }

    fn describe_remote(&self) -> String {
        "bastion:3306".to_string()
    }
}

#[async_trait]
impl ActiveTunnel for FakeTunnel {
    fn local_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 3307))
    }

    async fn close(mut self) -> Result<()> {
        self.closed = true;
        *self.probe.tunnel_releases.lock().unwrap() += 1;
        Ok(())
    }
}

impl Drop for FakeTunnel {
    // same backstop as the SSH tunnel: release if never closed
    fn drop(&mut self) {
        if !self.closed {
            *self.probe.tunnel_releases.lock().unwrap() += 1;
        }
    }
}

/// Database with one `customers` table and scripted query outcomes.
pub struct FakeDatabase {
    pub probe: Arc<Probe>,
    pub outcomes: Arc<Mutex<VecDeque<std::result::Result<RowSet, String>>>>,
    pub schema_fails: bool,
    pub connect_fails: bool,
}

impl FakeDatabase {
    pub fn new(probe: Arc<Probe>, outcomes: Vec<std::result::Result<RowSet, String>>) -> Self {
        Self {
            probe,
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            schema_fails: false,
            connect_fails: false,
        }
    }
}

pub struct FakeSession {
    probe: Arc<Probe>,
    outcomes: Arc<Mutex<VecDeque<std::result::Result<RowSet, String>>>>,
    schema_fails: bool,
}

#[async_trait]
impl Connector for FakeDatabase {
    type Session = FakeSession;

    async fn connect(&self, _addr: SocketAddr) -> Result<FakeSession> {
        if self.connect_fails {
            return Err(AskError::ConnectionError("Access denied for user 'app'".to_string()));
        }
        Ok(FakeSession {
            probe: Arc::clone(&self.probe),
            outcomes: Arc::clone(&self.outcomes),
            schema_fails: self.schema_fails,
        })
    }

    fn database(&self) -> &str {
        "shop"
    }
}

#[async_trait]
impl SqlSession for FakeSession {
    async fn fetch(&mut self, sql: &str) -> Result<RowSet> {
        if sql.starts_with("SELECT TABLE_NAME FROM information_schema") {
            if self.schema_fails {
                return Err(AskError::execution("SELECT command denied"));
            }
            return Ok(RowSet::new(vec!["TABLE_NAME".into()], vec![vec![json!("customers")]]));
        }
        if sql.starts_with("SHOW CREATE TABLE") {
            return Ok(RowSet::new(
                vec!["Table".into(), "Create Table".into()],
                vec![vec![json!("customers"), json!(CUSTOMERS_DDL)]],
            ));
        }
        if sql == "SHOW TABLES;" {
            return Ok(RowSet::new(vec!["Tables_in_shop".into()], vec![vec![json!("customers")]]));
        }

        self.probe.executed.lock().unwrap().push(sql.to_string());
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(AskError::execution(message)),
            None => panic!("no scripted outcome for {}", sql),
        }
    }

    async fn close(self) -> Result<()> {
        *self.probe.session_closes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Model that replays scripted replies.
pub struct ScriptedModel {
    pub probe: Arc<Probe>,
    pub replies: Mutex<VecDeque<std::result::Result<String, String>>>,
}

impl ScriptedModel {
    pub fn new(probe: Arc<Probe>, replies: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            probe,
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl SqlGenerator for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.probe.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(AskError::LlmError(message)),
            None => panic!("model asked more often than scripted"),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Records every event's message.
pub struct RecordingReporter {
    pub probe: Arc<Probe>,
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &PipelineEvent<'_>) {
        self.probe.events.lock().unwrap().push(event.message());
    }
}

pub type FakePipeline = Pipeline<FakeTunnels, FakeDatabase, ScriptedModel>;

pub fn pipeline(
    probe: &Arc<Probe>,
    replies: Vec<std::result::Result<String, String>>,
    outcomes: Vec<std::result::Result<RowSet, String>>,
) -> FakePipeline {
    pipeline_with(probe, replies, FakeDatabase::new(Arc::clone(probe), outcomes), false)
}

pub fn pipeline_with(
    probe: &Arc<Probe>,
    replies: Vec<std::result::Result<String, String>>,
    database: FakeDatabase,
    fail_open: bool,
) -> FakePipeline {
    Pipeline::new(
        FakeTunnels {
            probe: Arc::clone(probe),
            fail_open,
        },
        database,
        ScriptedModel::new(Arc::clone(probe), replies),
        SchemaInspector::new(0),
    )
}

pub fn reporter(probe: &Arc<Probe>) -> RecordingReporter {
    RecordingReporter {
        probe: Arc::clone(probe),
    }
}

pub fn johns() -> RowSet {
    RowSet::new(
        vec!["id".into(), "name".into()],
        vec![
            vec![json!(1), json!("John Smith")],
            vec![json!(4), json!("Johnny Cash")],
        ],
    )
}
