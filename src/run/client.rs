use crate::event::AppEvent;
use crate::lang::LanguageId;
use crate::run::{Executor, RunId};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::mpsc;
use tokio::runtime::Handle;

pub const DEFAULT_BASE_URL: &str = "https://lexius-transpiler.onrender.com";

/// Captured streams from the execution service. Any field may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RunResponse {
    #[serde(default)]
    result: Option<ExecutionResult>,
}

/// Joins the non-empty captured fields with newlines and trims the trailing
/// newline so `stdout: "5\n"` surfaces as `5`.
pub fn join_execution_output(exec: &ExecutionResult) -> String {
    let result_text = match &exec.result {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let parts = [
        exec.stdout.as_deref().unwrap_or(""),
        exec.stderr.as_deref().unwrap_or(""),
        result_text.as_str(),
    ];
    let joined = parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    joined.trim_end_matches('\n').to_string()
}

/// HTTP client for the hosted execution service. `execute` spawns the
/// request on the tokio runtime and reports back over the app event
/// channel, keyed by run id.
pub struct HttpExecutor {
    base_url: String,
    client: reqwest::Client,
    runtime_handle: Handle,
    tx: mpsc::Sender<AppEvent>,
}

impl HttpExecutor {
    pub fn new(base_url: String, runtime_handle: Handle, tx: mpsc::Sender<AppEvent>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            runtime_handle,
            tx,
        }
    }
}

impl Executor for HttpExecutor {
    fn execute(&self, run_id: RunId, code: &str, lang: LanguageId) {
        let url = format!("{}/run", self.base_url);
        let body = json!({ "code": code, "lang": lang.as_str() });
        let client = self.client.clone();
        let tx = self.tx.clone();

        self.runtime_handle.spawn(async move {
            let event = match client.post(&url).json(&body).send().await {
                Ok(res) if res.status().is_success() => match res.json::<RunResponse>().await {
                    Ok(data) => AppEvent::RunCompleted {
                        run_id,
                        output: join_execution_output(&data.result.unwrap_or_default()),
                    },
                    Err(err) => AppEvent::RunFailed {
                        run_id,
                        message: format!("invalid response body: {err}"),
                    },
                },
                Ok(res) => AppEvent::RunFailed {
                    run_id,
                    message: format!("Server error: {}", res.status().as_u16()),
                },
                Err(err) => AppEvent::RunFailed {
                    run_id,
                    message: err.to_string(),
                },
            };
            let _ = tx.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_is_trimmed() {
        let exec = ExecutionResult {
            stdout: Some("5\n".to_string()),
            ..Default::default()
        };
        assert_eq!(join_execution_output(&exec), "5");
    }

    #[test]
    fn non_empty_fields_join_in_order() {
        let exec = ExecutionResult {
            stdout: Some("out".to_string()),
            stderr: Some("err".to_string()),
            result: Some(Value::String("42".to_string())),
        };
        assert_eq!(join_execution_output(&exec), "out\nerr\n42");
    }

    #[test]
    fn empty_fields_are_skipped() {
        let exec = ExecutionResult {
            stdout: Some(String::new()),
            stderr: None,
            result: Some(Value::String("done".to_string())),
        };
        assert_eq!(join_execution_output(&exec), "done");
    }

    #[test]
    fn non_string_results_are_stringified() {
        let exec = ExecutionResult {
            result: Some(json!(7)),
            ..Default::default()
        };
        assert_eq!(join_execution_output(&exec), "7");

        let exec = ExecutionResult {
            result: Some(Value::Null),
            ..Default::default()
        };
        assert_eq!(join_execution_output(&exec), "");
    }

    #[test]
    fn missing_result_object_yields_empty_output() {
        let response: RunResponse =
            serde_json::from_str("{}").expect("empty body should deserialize");
        assert_eq!(join_execution_output(&response.result.unwrap_or_default()), "");
    }
}
