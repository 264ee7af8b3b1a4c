
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::llm::{ChatMessage, ChatModel};
use crate::prompt::PromptTemplate;
use crate::{AssistantError, Result};

const CLASSIFIER_TEMPLATE: &str = "Tâche: dire si la requête suivante concerne {{domaine}}.\n\
Requête: {{requete}}\n\
Réponds uniquement par un seul mot en minuscules: oui, non ou peut-être. N'ajoute rien d'autre.";

/// Which routing strategy to build from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicyKind {
    #[default]
    LlmClassifier,
    Always,
    Never,
}

impl fmt::Display for RoutingPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LlmClassifier => write!(f, "llm_classifier"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// What to do when the classifier answers "peut-être"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousPolicy {
    #[default]
    Retrieve,
    Skip,
}

impl fmt::Display for AmbiguousPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrieve => write!(f, "retrieve"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Outcome of routing one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer from the conversation alone
    NoRetrieval,
    /// Consult the configured retriever
    Retrieve,
}

impl Route {
    #[inline]
    pub const fn retrieves(self) -> bool {
        matches!(self, Self::Retrieve)
    }
}

/// Parsed answer of the relevance classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Yes,
    No,
    Maybe,
    Unrecognized,
}

impl Classification {
    /// Interpret a free-form model reply.
    ///
    /// A reply mentioning "non" anywhere counts as a refusal, whatever else it says.
    #[inline]
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim().to_lowercase();
        if reply.contains("non") {
            Self::No
        } else if reply.contains("oui") {
            Self::Yes
        } else if reply.contains("peut") {
            Self::Maybe
        } else {
            Self::Unrecognized
        }
    }
}

/// Asks a language model whether a query concerns the indexed domain
#[derive(Clone)]
pub struct LlmClassifierRouter {
    template: PromptTemplate,
    domain: String,
    ambiguous: AmbiguousPolicy,
    model: Option<Arc<dyn ChatModel>>,
}

impl fmt::Debug for LlmClassifierRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClassifierRouter")
            .field("domain", &self.domain)
            .field("ambiguous", &self.ambiguous)
            .field("dedicated_model", &self.model.is_some())
            .finish()
    }
}

impl LlmClassifierRouter {
    #[inline]
    pub fn new(domain: impl Into<String>, ambiguous: AmbiguousPolicy) -> Self {
        Self {
            template: PromptTemplate::new(CLASSIFIER_TEMPLATE),
            domain: domain.into(),
            ambiguous,
            model: None,
        }
    }

    /// Classify with `model` instead of the session's answering model
    #[inline]
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    #[inline]
    pub fn classification_prompt(&self, query: &str) -> Result<String> {
        self.template
            .render(&[("domaine", self.domain.as_str()), ("requete", query)])
    }

    /// Single classification call; failures are not retried here.
    ///
    /// A model set with [`Self::with_model`] takes precedence over `model`.
    #[inline]
    pub fn classify(&self, query: &str, model: &dyn ChatModel) -> Result<Classification> {
        let prompt = self.classification_prompt(query)?;
        let model: &dyn ChatModel = match &self.model {
            Some(own) => own.as_ref(),
            None => model,
        };
        let reply = model
            .chat(&[ChatMessage::user(prompt)])
            .map_err(|e| AssistantError::Routing(format!("Classification call failed: {}", e)))?;

        let classification = Classification::parse(&reply);
        if classification == Classification::Unrecognized {
            warn!("Unexpected classifier reply {:?}, retrieving anyway", reply);
        } else {
            debug!("Classifier replied {:?} ({:?})", reply.trim(), classification);
        }
        Ok(classification)
    }

    #[inline]
    pub fn route(&self, query: &str, model: &dyn ChatModel) -> Result<Route> {
        let route = match self.classify(query, model)? {
            Classification::No => Route::NoRetrieval,
            Classification::Maybe if self.ambiguous == AmbiguousPolicy::Skip => Route::NoRetrieval,
            Classification::Yes | Classification::Maybe | Classification::Unrecognized => {
                Route::Retrieve
            }
        };
        Ok(route)
    }
}

/// Per-query decision on whether retrieval runs at all
#[derive(Debug, Clone)]
pub enum RoutingPolicy {
    AlwaysRetrieve,
    NeverRetrieve,
    LlmClassifier(LlmClassifierRouter),
}

impl RoutingPolicy {
    #[inline]
    pub fn from_config(config: &RoutingConfig) -> Self {
        match config.policy {
            RoutingPolicyKind::Always => Self::AlwaysRetrieve,
            RoutingPolicyKind::Never => Self::NeverRetrieve,
            RoutingPolicyKind::LlmClassifier => Self::LlmClassifier(LlmClassifierRouter::new(
                config.domain.clone(),
                config.ambiguous,
            )),
        }
    }

    /// Use `model` for classification calls; other policies are unchanged
    #[inline]
    pub fn with_classifier_model(self, model: Arc<dyn ChatModel>) -> Self {
        match self {
            Self::LlmClassifier(router) => Self::LlmClassifier(router.with_model(model)),
            other => other,
        }
    }

    /// `model` is only consulted by the classifier policy
    #[inline]
    pub fn route(&self, query: &str, model: &dyn ChatModel) -> Result<Route> {
        match self {
            Self::AlwaysRetrieve => Ok(Route::Retrieve),
            Self::NeverRetrieve => Ok(Route::NoRetrieval),
            Self::LlmClassifier(router) => router.route(query, model),
        }
    }

    #[inline]
    pub fn kind(&self) -> RoutingPolicyKind {
        match self {
            Self::AlwaysRetrieve => RoutingPolicyKind::Always,
            Self::NeverRetrieve => RoutingPolicyKind::Never,
            Self::LlmClassifier(_) => RoutingPolicyKind::LlmClassifier,
        }
    }
}
