//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use serde::Deserialize;
use std::path::Path;

use crate::common::{Error, Result};
use crate::pgwire::{BackendMessage, FrontendMessage};
use crate::script::{self, Script, Step};

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Server address as `host:port`; falls back to the config file
    pub connect: Option<String>,
    /// Deadline for each receive and flush, in seconds
    pub timeout_secs: Option<u64>,
    /// The sequence of steps to execute
    pub steps: Vec<ScenarioStep>,
}

/// A single step in a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Send a message and flush
    Send { message: FrontendMessage },
    /// Expect the next message to equal `message`
    Expect { message: BackendMessage },
    /// Expect the next message to be the same type as `message`
    ExpectAny { message: BackendMessage },
    /// Discard messages until one of the same type as `message` or end of stream
    WaitFor { message: BackendMessage },
    /// Discard messages until CloseComplete or end of stream
    WaitForClose,
    /// AuthenticationOk followed by an idle ReadyForQuery
    AcceptAuthenticated,
    /// A named group of steps, run as a nested script
    Group {
        name: Option<String>,
        steps: Vec<ScenarioStep>,
    },
}

impl From<&ScenarioStep> for Step {
    fn from(step: &ScenarioStep) -> Self {
        match step {
            ScenarioStep::Send { message } => script::send_message(message.clone()),
            ScenarioStep::Expect { message } => script::expect_message(message.clone()),
            ScenarioStep::ExpectAny { message } => script::expect_any_message(message.clone()),
            ScenarioStep::WaitFor { message } => script::wait_for(message.clone()),
            ScenarioStep::WaitForClose => script::wait_for_close(),
            ScenarioStep::AcceptAuthenticated => {
                Script::new(script::accept_authenticated_connection()).into()
            }
            ScenarioStep::Group { steps, .. } => {
                steps.iter().map(Step::from).collect::<Script>().into()
            }
        }
    }
}

impl ScenarioStep {
    /// Human-readable one-line summary
    pub fn describe(&self) -> String {
        match self {
            ScenarioStep::AcceptAuthenticated => "accept authenticated connection".to_string(),
            ScenarioStep::Group {
                name: Some(name),
                steps,
            } => format!("{} ({} steps)", name, steps.len()),
            other => Step::from(other).to_string(),
        }
    }
}

impl TestScenario {
    /// Build the script this scenario describes
    pub fn script(&self) -> Script {
        self.steps.iter().map(Step::from).collect()
    }
}

/// Load and parse a scenario file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    parse_scenario(&content).map_err(|e| Error::ScenarioParse {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

/// Parse scenario YAML text
pub fn parse_scenario(content: &str) -> std::result::Result<TestScenario, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgwire::{ErrorFields, TxStatus};

    const STARTUP: &str = r#"
name: startup after cancel
description: cancel is rejected, then the connection is accepted
connect: 127.0.0.1:6543
steps:
  - action: send
    message:
      type: cancel_request
      process_id: 0
      secret_key: 0
  - action: expect
    message:
      type: error_response
      severity: FATAL
      message: some error
  - action: send
    message:
      type: startup_message
      parameters:
        user: test_user
        database: test_db
  - action: accept_authenticated
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = parse_scenario(STARTUP).unwrap();
        assert_eq!(scenario.name, "startup after cancel");
        assert_eq!(scenario.connect.as_deref(), Some("127.0.0.1:6543"));
        assert_eq!(scenario.timeout_secs, None);
        assert_eq!(scenario.steps.len(), 4);
    }

    #[test]
    fn test_scenario_builds_script() {
        let script = parse_scenario(STARTUP).unwrap().script();

        let mut expected = Script::new(vec![
            script::send_message(FrontendMessage::CancelRequest {
                process_id: 0,
                secret_key: 0,
            }),
            script::expect_message(BackendMessage::ErrorResponse(ErrorFields {
                severity: "FATAL".to_string(),
                message: "some error".to_string(),
                ..Default::default()
            })),
            script::send_message(FrontendMessage::startup([
                ("user", "test_user"),
                ("database", "test_db"),
            ])),
        ]);
        expected.push(Script::new(script::accept_authenticated_connection()));

        assert_eq!(script, expected);
    }

    #[test]
    fn test_groups_and_waits() {
        let scenario = parse_scenario(
            r#"
name: extended query
steps:
  - action: group
    name: close portal
    steps:
      - action: send
        message: { type: close, object_type: portal, name: p1 }
      - action: send
        message: { type: sync }
      - action: wait_for_close
  - action: expect_any
    message: { type: backend_key_data, process_id: 0, secret_key: 0 }
  - action: wait_for
    message: { type: ready_for_query, tx_status: idle }
"#,
        )
        .unwrap();

        assert_eq!(scenario.steps[0].describe(), "close portal (3 steps)");
        assert_eq!(scenario.steps[1].describe(), "expect any BackendKeyData");
        assert_eq!(scenario.steps[2].describe(), "wait for ReadyForQuery");

        let script = scenario.script();
        assert_eq!(script.len(), 3);
        match &script.steps()[0] {
            Step::Script(group) => assert_eq!(group.steps()[2], script::wait_for_close()),
            other => panic!("expected nested script, got {:?}", other),
        }
        assert_eq!(
            script.steps()[2],
            script::wait_for(BackendMessage::ReadyForQuery {
                tx_status: TxStatus::Idle
            })
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = parse_scenario("name: x\nsteps:\n  - action: teleport\n").unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn test_load_scenario_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "name: [").unwrap();

        match load_scenario(&path) {
            Err(Error::ScenarioParse { path: p, .. }) => assert!(p.ends_with("broken.yaml")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
