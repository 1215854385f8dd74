//! Batches of translation requests, as read by the command line tool.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::debug;

use crate::converter::Converter;
use crate::promql::{EvaluationParams, PromQLTree};

/// One query to translate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub tree: PromQLTree,
    pub evaluation: EvaluationParams,
}

/// The result of one request: either `sql` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TranslationOutcome {
    pub fn is_ok(&self) -> bool {
        self.sql.is_some()
    }
}

/// Translates every request on the blocking pool. Outcomes keep the order
/// of `requests`.
pub async fn translate_batch(
    converter: Arc<Converter>,
    requests: Vec<TranslationRequest>,
) -> Result<Vec<TranslationOutcome>, JoinError> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let converter = Arc::clone(&converter);
            tokio::task::spawn_blocking(move || {
                converter.convert(&request.tree, request.evaluation)
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await? {
            Ok(query) => TranslationOutcome {
                sql: Some(query.to_string()),
                error: None,
                kind: None,
            },
            Err(e) => {
                debug!(request = index, "Request failed: {}", e);
                TranslationOutcome {
                    sql: None,
                    error: Some(e.to_string()),
                    kind: Some(e.kind().as_str().to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;

    #[tokio::test]
    async fn test_translate_batch_keeps_order() {
        let mut ok = PromQLTree::new();
        ok.scalar(1.0);

        let mut unsupported = PromQLTree::new();
        let up = unsupported.selector("up", vec![]);
        unsupported.function("sort", vec![up]);

        let requests = vec![
            TranslationRequest {
                tree: ok.clone(),
                evaluation: EvaluationParams::Instant { time_ms: 1_000 },
            },
            TranslationRequest {
                tree: unsupported,
                evaluation: EvaluationParams::Instant { time_ms: 1_000 },
            },
            TranslationRequest {
                tree: ok,
                evaluation: EvaluationParams::Instant { time_ms: 2_000 },
            },
        ];

        let converter = Arc::new(Converter::new(ConverterConfig::default()));
        let outcomes = translate_batch(converter, requests).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].sql.as_deref(),
            Some("SELECT toDateTime64(1.000, 3) AS timestamp, 1.0 AS value")
        );
        assert!(!outcomes[1].is_ok());
        assert_eq!(outcomes[1].kind.as_deref(), Some("unimplemented"));
        assert_eq!(
            outcomes[2].sql.as_deref(),
            Some("SELECT toDateTime64(2.000, 3) AS timestamp, 1.0 AS value")
        );
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "tree": {
                "nodes": [
                    {"kind": "instant_selector", "metric": "up"},
                    {"kind": "function", "name": "abs", "args": [0]}
                ],
                "root": 1
            },
            "evaluation": {"instant": {"time_ms": 1000}}
        }"#;

        let request: TranslationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.tree.len(), 2);
        assert_eq!(request.tree.root().0, 1);
        assert_eq!(request.evaluation, EvaluationParams::Instant { time_ms: 1_000 });
    }
}
