use super::prompts;
use crate::llm::{LLMClient, with_timeout};
use crate::progress::ProgressEvent;
use crate::types::Result;
use std::time::Duration;

const EMPTY_NARRATIVE: &str = "No progress has been recorded for this run yet.";

/// Plain-language summary of a run's progress, written by the model.
///
/// An empty log short-circuits without calling the model. The call gives up
/// after `timeout` when one is set.
pub async fn narrate(
    llm: &dyn LLMClient,
    query: &str,
    events: &[ProgressEvent],
    timeout: Option<Duration>,
) -> Result<String> {
    if events.is_empty() {
        return Ok(EMPTY_NARRATIVE.to_string());
    }

    let prompt = prompts::narrative(query, events);
    let text = with_timeout(llm.generate(&prompt), timeout).await?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{EventLog, EventStatus};
    use crate::types::AppError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMClient for Recorder {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok("  The run finished searching.  ".to_string())
        }

        fn model_name(&self) -> &str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_empty_log_skips_model() {
        let llm = Recorder::default();
        let text = narrate(&llm, "q", &[], None).await.unwrap();
        assert_eq!(text, EMPTY_NARRATIVE);
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_narrative_prompt_includes_events() {
        let log = EventLog::new(Uuid::new_v4());
        log.record("search", "query", EventStatus::Succeeded, "Found 3 results", Value::Null);

        let llm = Recorder::default();
        let text = narrate(&llm, "fusion power", &log.snapshot(), None).await.unwrap();

        assert_eq!(text, "The run finished searching.");
        let prompts = llm.prompts.lock();
        assert!(prompts[0].contains("RESEARCH QUERY: fusion power"));
        assert!(prompts[0].contains("search/query succeeded: Found 3 results"));
    }

    struct Stalled;

    #[async_trait]
    impl LLMClient for Stalled {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        fn model_name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_model_times_out() {
        let log = EventLog::new(Uuid::new_v4());
        log.record("pipeline", "web_search", EventStatus::Started, "Searching", Value::Null);

        let err = narrate(&Stalled, "q", &log.snapshot(), Some(Duration::from_secs(30)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }
}
