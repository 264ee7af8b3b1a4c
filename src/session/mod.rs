
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::augment::RetrievalAugmentor;
use crate::llm::{ChatMessage, ChatModel};
use crate::memory::ConversationMemory;
use crate::routing::{Route, RoutingPolicy};
use crate::{AssistantError, Result};

const SEPARATOR: &str = "──────────────────────────────────────────────────";
const QUIT_COMMANDS: [&str; 2] = ["fin", "end"];

/// Where a session is in its turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingInput,
    Routing,
    Retrieving,
    Augmenting,
    Generating,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingInput => "awaiting input",
            Self::Routing => "routing",
            Self::Retrieving => "retrieving",
            Self::Augmenting => "augmenting",
            Self::Generating => "generating",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Blank,
    Quit,
    Question(String),
}

impl Input {
    /// The quit sentinels are matched case-insensitively after trimming
    #[inline]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::Blank
        } else if QUIT_COMMANDS
            .iter()
            .any(|command| trimmed.eq_ignore_ascii_case(command))
        {
            Self::Quit
        } else {
            Self::Question(trimmed.to_string())
        }
    }
}

/// A single conversation: routes each question, augments it with retrieved
/// context and history, and asks the model for an answer.
pub struct ChatSession {
    model: Arc<dyn ChatModel>,
    router: RoutingPolicy,
    augmentor: RetrievalAugmentor,
    memory: ConversationMemory,
    state: SessionState,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("router", &self.router.kind())
            .field("augmentor", &self.augmentor)
            .field("memory", &self.memory.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Assemble a session; an empty index cannot answer anything and is rejected
    #[inline]
    pub fn new(
        model: Arc<dyn ChatModel>,
        router: RoutingPolicy,
        augmentor: RetrievalAugmentor,
        memory: ConversationMemory,
    ) -> Result<Self> {
        if augmentor.retriever().index().is_empty() {
            return Err(AssistantError::Config(
                "The index is empty; load at least one document with text".to_string(),
            ));
        }

        Ok(Self {
            model,
            router,
            augmentor,
            memory,
            state: SessionState::Idle,
        })
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    #[inline]
    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::AwaitingInput;
            info!("Session started");
        }
    }

    #[inline]
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
        info!("Session terminated");
    }

    /// Answer one question.
    ///
    /// Failures leave memory untouched and the session ready for the next turn.
    #[inline]
    pub fn handle(&mut self, question: &str) -> Result<String> {
        match self.state {
            SessionState::Terminated => {
                return Err(AssistantError::Config(
                    "Session has already terminated".to_string(),
                ));
            }
            SessionState::Idle => self.start(),
            _ => {}
        }

        let result = self.run_turn(question);
        self.state = SessionState::AwaitingInput;

        let answer = result?;
        self.memory.append(ChatMessage::user(question));
        self.memory.append(ChatMessage::assistant(answer.clone()));
        Ok(answer)
    }

    fn run_turn(&mut self, question: &str) -> Result<String> {
        self.state = SessionState::Routing;
        let route = self.router.route(question, self.model.as_ref())?;
        debug!("Route for this turn: {:?}", route);

        let retrieved = if route == Route::Retrieve {
            self.state = SessionState::Retrieving;
            self.augmentor.retrieve(question, route)?
        } else {
            Vec::new()
        };

        self.state = SessionState::Augmenting;
        let messages = self.augmentor.compose(question, &retrieved, &self.memory)?;

        self.state = SessionState::Generating;
        self.model.chat(&messages)
    }
}

/// Line-oriented conversation loop.
///
/// Returns once the user types a quit command or input ends. Recoverable
/// errors are reported on `output` and the loop carries on.
#[inline]
pub fn run_conversation<R, W>(session: &mut ChatSession, input: R, mut output: W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    session.start();

    writeln!(output, "{}", SEPARATOR)?;
    writeln!(output, "Assistant RAG prêt. Saisissez votre question.")?;
    writeln!(output, "Tapez « fin » pour quitter.")?;
    writeln!(output, "{}", SEPARATOR)?;

    let mut lines = input.lines();
    loop {
        write!(output, "Vous > ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            debug!("Input closed");
            writeln!(output)?;
            writeln!(output, "Au revoir.")?;
            break;
        };

        match Input::parse(&line?) {
            Input::Blank => {
                writeln!(
                    output,
                    "Veuillez entrer une question ou « fin » pour quitter."
                )?;
            }
            Input::Quit => {
                writeln!(output, "Au revoir.")?;
                break;
            }
            Input::Question(question) => match session.handle(&question) {
                Ok(answer) => {
                    writeln!(output, "Assistant > {}", answer)?;
                    writeln!(output, "{}", SEPARATOR)?;
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Turn failed: {}", e);
                    writeln!(output, "Erreur > {}", e)?;
                    writeln!(output, "{}", SEPARATOR)?;
                }
                Err(e) => {
                    error!("Session aborted: {}", e);
                    session.terminate();
                    return Err(e);
                }
            },
        }
    }

    session.terminate();
    output.flush()?;
    Ok(())
}
