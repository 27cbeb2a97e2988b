use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::quiz::provider::{
    ClassificationError, Classifier, ClassifyRequest, ProviderError, QuestionProvider,
};
use crate::quiz::session::{PendingCall, Session, TransitionError};
use crate::quiz::{Difficulty, SortingResult};

/// Performs the outbound calls a session asks for and feeds their outcome
/// back into it. Every call is bounded by `timeout`; running out of time
/// counts as a failure of the call that was pending.
#[derive(Clone)]
pub struct SessionRunner {
    questions: Arc<dyn QuestionProvider>,
    classifier: Arc<dyn Classifier>,
    timeout: Duration,
}

impl SessionRunner {
    pub fn new(
        questions: Arc<dyn QuestionProvider>,
        classifier: Arc<dyn Classifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            questions,
            classifier,
            timeout,
        }
    }

    /// `Home -> LoadingQuestions -> Answering | Home`.
    pub async fn start_session(&self, session: &mut Session) -> Result<(), TransitionError> {
        let difficulty = session.start_session()?;
        self.load_questions(session, difficulty).await
    }

    /// `ShowingResult -> LoadingQuestions -> Answering | Home`.
    pub async fn play_again(&self, session: &mut Session) -> Result<(), TransitionError> {
        let difficulty = session.play_again()?;
        self.load_questions(session, difficulty).await
    }

    pub async fn load_questions(
        &self,
        session: &mut Session,
        difficulty: Difficulty,
    ) -> Result<(), TransitionError> {
        info!("Fetching questions for the {} track", difficulty);
        let fetched = tokio::time::timeout(self.timeout, self.questions.fetch_questions(difficulty))
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.timeout)));

        match fetched {
            Ok(questions) => session.questions_received(questions),
            Err(e) => session.questions_failed(&e),
        }
    }

    /// Asks the classifier once and stores its verdict (or the fallback).
    pub async fn sort(
        &self,
        session: &mut Session,
        request: ClassifyRequest,
    ) -> Result<SortingResult, TransitionError> {
        info!(
            "Sorting a {} student with {}/{}",
            request.difficulty, request.correct, request.total
        );
        let verdict = tokio::time::timeout(self.timeout, self.classifier.classify(request))
            .await
            .unwrap_or(Err(ClassificationError::Timeout(self.timeout)));

        session.classification_finished(verdict).cloned()
    }

    /// Issues the call the session is waiting on, if any. Covers fresh
    /// starts as well as sessions restored mid-call from storage.
    /// Returns whether a call was made.
    pub async fn resume(&self, session: &mut Session) -> Result<bool, TransitionError> {
        match session.pending_call() {
            Some(PendingCall::Questions(difficulty)) => {
                self.load_questions(session, difficulty).await?;
            }
            Some(PendingCall::Sorting(request)) => {
                self.sort(session, request).await?;
            }
            None => {
                debug!("Nothing pending in {:?}", session.kind());
                return Ok(false);
            }
        }
        Ok(true)
    }
}
