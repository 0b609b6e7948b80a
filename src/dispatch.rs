//! Classify-then-route for one prompt

use crate::agents::{GeneralAgent, SessionId};
use crate::envelope::{ChatEnvelope, ClientMessage, TurnReply};
use crate::error::GatewayResult;
use crate::observability::metrics;
use crate::routing::{TaskCategory, TaskClassifier};
use crate::workers::{ApiWorkerClient, GuiWorkerClient};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn, Instrument};

/// Routes each prompt to the handler its category names
pub struct Dispatcher {
    classifier: Arc<dyn TaskClassifier>,
    general: Arc<GeneralAgent>,
    gui: GuiWorkerClient,
    api: ApiWorkerClient,
}

impl Dispatcher {
    pub fn new(
        classifier: Arc<dyn TaskClassifier>,
        general: Arc<GeneralAgent>,
        gui: GuiWorkerClient,
        api: ApiWorkerClient,
    ) -> Self {
        Self {
            classifier,
            general,
            gui,
            api,
        }
    }

    /// Handle one inbound text frame and produce exactly one reply
    pub async fn handle_text(&self, session: SessionId, text: &str) -> TurnReply {
        let Some(message) = ClientMessage::parse(text) else {
            metrics().invalid_message();
            warn!(session = %session, "Invalid message structure received");
            return TurnReply::invalid_structure();
        };

        let span = crate::turn_span!(session = %session);
        self.handle_message(session, message).instrument(span).await
    }

    async fn handle_message(&self, session: SessionId, message: ClientMessage) -> TurnReply {
        let started = Instant::now();
        let category = self.classify(&message.prompt).await;
        debug!(category = %category, "Dispatching turn");

        let reply = match category {
            TaskCategory::General => self
                .general
                .answer(session, &message.prompt)
                .await
                .map(|answer| ChatEnvelope::general(&message.prompt, &answer)),
            TaskCategory::Gui => self.gui.run_tests(&message).await,
            TaskCategory::Api => {
                return match self.api.call(message.envelope_json()).await {
                    Ok(answer) => {
                        metrics().turn_completed(category, started.elapsed());
                        TurnReply::Text(answer)
                    }
                    Err(e) => {
                        metrics().turn_failed(started.elapsed());
                        TurnReply::Text(e.to_string())
                    }
                };
            }
        };

        match reply {
            Ok(envelope) => {
                metrics().turn_completed(category, started.elapsed());
                TurnReply::envelope(&envelope)
            }
            Err(e) => {
                metrics().turn_failed(started.elapsed());
                error!(category = %category, error = %e, "Turn failed");
                TurnReply::error(&e)
            }
        }
    }

    async fn classify(&self, prompt: &str) -> TaskCategory {
        match self.classifier.classify(prompt).await {
            Ok(category) => category,
            Err(e) => {
                metrics().classifier_fallback();
                warn!(error = %e, "Classifier unavailable, falling back to general");
                TaskCategory::General
            }
        }
    }

    /// Clear everything held for `session`
    pub async fn reset(&self, session: SessionId) -> GatewayResult<()> {
        self.general.reset(session).await
    }
}
