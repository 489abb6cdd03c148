//! Narrative rendering contract
//!
//! A [`NarrativeBackend`] turns a disclosed evidence item into investigative
//! prose. Generative backends live outside this crate; [`TemplateNarrator`]
//! is the deterministic stand-in. Rendering can never fail a disclosure:
//! errors and timeouts degrade to the item's raw finding text.

use crate::error::RenderError;
use crate::state::DisclosureRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use ttx_scenario::EvidenceItem;

/// Renders disclosed evidence as prose
#[async_trait]
pub trait NarrativeBackend: Send + Sync + Debug {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Phrase `item` as the answer to `request`
    ///
    /// `prior` is the timeline before this disclosure.
    ///
    /// # Errors
    /// `RenderError::Unavailable` on any backend failure
    async fn render(
        &self,
        item: &EvidenceItem,
        request: &str,
        prior: &[DisclosureRecord],
    ) -> Result<String, RenderError>;
}

/// Where the narrative text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// Produced by the backend
    Rendered,
    /// Backend failed; raw finding text
    Fallback,
}

/// Deterministic narrator built from the scenario text
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

#[async_trait]
impl NarrativeBackend for TemplateNarrator {
    fn name(&self) -> &str {
        "template"
    }

    async fn render(
        &self,
        item: &EvidenceItem,
        request: &str,
        prior: &[DisclosureRecord],
    ) -> Result<String, RenderError> {
        let source = item.source.as_deref().unwrap_or("The investigation");
        let mut text = format!(
            "Following up on \"{}\": {} shows {}",
            request.trim(),
            source,
            item.finding.trim()
        );
        if !item.narrative_hooks.is_empty() {
            let hook = &item.narrative_hooks[prior.len() % item.narrative_hooks.len()];
            text.push_str(" Worth noting: ");
            text.push_str(hook);
            text.push('.');
        }
        Ok(text)
    }
}

/// Render with a deadline; any failure yields the raw finding
pub(crate) async fn render_or_fallback(
    backend: &dyn NarrativeBackend,
    item: &EvidenceItem,
    request: &str,
    prior: &[DisclosureRecord],
    timeout: Duration,
) -> (String, NarrativeSource) {
    let outcome = match tokio::time::timeout(timeout, backend.render(item, request, prior)).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::TimedOut {
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    match outcome {
        Ok(text) => (text, NarrativeSource::Rendered),
        Err(err) => {
            tracing::warn!(
                backend = backend.name(),
                evidence = %item.id,
                error = %err,
                "Narrative rendering failed, using raw finding"
            );
            (item.finding.clone(), NarrativeSource::Fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttx_scenario::EvidenceId;

    fn item() -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId::from("E1"),
            category: "email".into(),
            tags: vec!["phishing".into()],
            red_herring: false,
            phase: None,
            finding: "Macro document from lookalike domain".into(),
            narrative_hooks: vec!["the sender has an extra hyphen".into()],
            source: Some("Exchange message trace".into()),
        }
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl NarrativeBackend for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn render(
            &self,
            _: &EvidenceItem,
            _: &str,
            _: &[DisclosureRecord],
        ) -> Result<String, RenderError> {
            Err(RenderError::unavailable("quota exceeded"))
        }
    }

    #[tokio::test]
    async fn template_is_deterministic() {
        let a = TemplateNarrator.render(&item(), "check email", &[]).await.unwrap();
        let b = TemplateNarrator.render(&item(), "check email", &[]).await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("Exchange message trace"));
        assert!(a.contains("extra hyphen"));
    }

    #[tokio::test]
    async fn failure_falls_back_to_finding() {
        let (text, source) =
            render_or_fallback(&Broken, &item(), "email", &[], Duration::from_secs(1)).await;
        assert_eq!(source, NarrativeSource::Fallback);
        assert_eq!(text, "Macro document from lookalike domain");
    }
}
