//! Common test utilities for integration tests
//!
//! Provides a project fixture on disk and a scripted model client whose
//! answers depend on the request.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use permuter::adapters::clients::ClientRegistry;
use permuter::domain::errors::ModelCallError;
use permuter::domain::models::{ClientName, Config, ModelRequest};
use permuter::domain::ports::ModelClient;
use permuter::services::{Instructions, Pipeline, StepContext};

type Responder = dyn Fn(&ModelRequest) -> Result<String, ModelCallError> + Send + Sync;

/// Model client answering through a closure and recording every request.
pub struct ScriptedClient {
    respond: Box<Responder>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedClient {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&ModelRequest) -> Result<String, ModelCallError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_with(&self, instructions: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.instructions == instructions)
            .count()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelCallError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

/// Rules, variants and flavors laid out in a temporary directory.
pub struct Project {
    pub dir: TempDir,
    pub config: Config,
}

impl Project {
    /// Two rule variants and one flavor level with two flavors.
    pub fn standard() -> Self {
        let project = Self::empty();
        project.write("rules/common.md", "// shared\nBe kind.\n");
        project.write("rules/variants/formal.md", "Use formal language.\n");
        project.write("rules/variants/casual.md", "Use casual language.\n");
        project.write("flavors/level_1/short.md", "Keep answers short.\n");
        project.write("flavors/level_1/long.md", "Give detailed answers.\n");
        project
    }

    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.common_rules = path_string(&dir.path().join("rules/common.md"));
        config.paths.rules_dir = Some(path_string(&dir.path().join("rules/variants")));
        config.paths.output_dir = path_string(&dir.path().join("out"));
        config.paths.extra.insert(
            "flavors_level_1_directory".to_string(),
            path_string(&dir.path().join("flavors/level_1")),
        );
        config.generation.prompts_per_permutation = 2;
        config.generation.max_iterations = 3;
        Self { dir, config }
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn out(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join("out").join(relative)
    }

    pub fn count_files(&self, relative: &str) -> usize {
        fs::read_dir(self.out(relative))
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0)
    }

    pub fn pipeline(&self, service: Arc<ScriptedClient>, target: Arc<ScriptedClient>) -> Pipeline {
        let registry = ClientRegistry::new()
            .with_client(ClientName::Service, service, 2)
            .with_client(ClientName::Target, target, 3);
        let ctx = StepContext::new(
            Arc::new(registry),
            Arc::new(self.config.clone()),
            Instructions::default(),
        );
        Pipeline::new(ctx)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
