//! Scripted command runner for unit tests

use async_trait::async_trait;
use stackctl_core::StackResult;
use std::sync::Mutex;

use crate::traits::{CommandOutput, CommandRunner, CommandSpec};

type Responder = dyn Fn(&CommandSpec) -> StackResult<CommandOutput> + Send + Sync;

/// Answers every command through a closure and records the command lines
pub struct ScriptedRunner {
    responder: Box<Responder>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CommandSpec) -> StackResult<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> StackResult<CommandOutput> {
        self.calls.lock().unwrap().push(spec.to_string());
        (self.responder)(spec)
    }
}

pub fn ok(stdout: &str) -> StackResult<CommandOutput> {
    Ok(CommandOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn fail(stderr: &str) -> StackResult<CommandOutput> {
    Ok(CommandOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}
