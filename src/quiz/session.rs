//! The game session controller.
//!
//! A [`Session`] is the dialogue state of one chat. Every user action and
//! every completion of an outbound call is a named transition on it;
//! transitions that are not allowed in the current state are rejected with
//! a [`TransitionError`] and leave the session untouched.

use log::{debug, warn};
use thiserror::Error;

use crate::quiz::provider::{ClassificationError, ClassifyRequest, ProviderError};
use crate::quiz::{Difficulty, Question, Score, SortingResult};

/// Shown on the home screen when a stored round no longer makes sense.
pub const ROUND_LOST: &str = "The pages of your last round were lost. Start a new one.";

/// Position in the question list, bounded by the list length at
/// construction and only ever moved forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionIndex {
    current: usize,
    len: usize,
}

impl QuestionIndex {
    /// `None` for an empty list.
    pub fn first(len: usize) -> Option<Self> {
        (len > 0).then_some(Self { current: 0, len })
    }

    pub fn get(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.len
    }

    /// `None` once the last question has been reached.
    pub fn advance(self) -> Option<Self> {
        (!self.is_last()).then_some(Self {
            current: self.current + 1,
            len: self.len,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Lobby {
    pub difficulty: Difficulty,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Round {
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    pub index: QuestionIndex,
    pub score: Score,
    pub answers: Vec<usize>,
}

impl Round {
    /// `None` when the round is inconsistent, which only a damaged stored
    /// dialogue can produce.
    pub fn current_question(&self) -> Option<&Question> {
        if !self.is_consistent() {
            return None;
        }
        self.questions.get(self.index.get())
    }

    pub fn is_consistent(&self) -> bool {
        let len = self.questions.len();
        self.index.len() == len
            && self.index.get() < len
            && self.answers.len() == self.index.get()
            && self.score.total as usize == len
            && self.score.correct as usize <= self.answers.len()
    }
}

/// Everything a finished round leaves behind for the result and review
/// screens.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    pub answers: Vec<usize>,
    pub score: Score,
}

impl Transcript {
    pub fn classify_request(&self) -> ClassifyRequest {
        ClassifyRequest {
            correct: self.score.correct,
            total: self.score.total,
            difficulty: self.difficulty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Sorting {
    pub transcript: Transcript,
    pub result: Option<SortingResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Outcome {
    pub transcript: Transcript,
    pub result: SortingResult,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Session {
    Home(Lobby),
    LoadingQuestions(Difficulty),
    Answering(Round),
    Classifying(Sorting),
    ShowingResult(Outcome),
    ReviewingAnswers(Outcome),
}

impl Default for Session {
    fn default() -> Self {
        Session::Home(Lobby::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Home,
    LoadingQuestions,
    Answering,
    Classifying,
    ShowingResult,
    ReviewingAnswers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{action} is not allowed while {state:?}")]
    NotAllowed {
        action: &'static str,
        state: StateKind,
    },
    #[error("option {selected} does not exist, the question has {available} options")]
    InvalidOption { selected: usize, available: usize },
    #[error("that answer belongs to a question that was already answered")]
    StaleAnswer,
    #[error("the sorting result is not in yet")]
    ResultPending,
    #[error("the round has already been sorted")]
    AlreadySorted,
    #[error("the stored round is inconsistent")]
    CorruptRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Index of the next question to show.
    Question(usize),
    /// That was the last question; the classifier has to be asked exactly once.
    Classify(ClassifyRequest),
}

/// The outbound call a session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCall {
    Questions(Difficulty),
    Sorting(ClassifyRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub next: Next,
}

impl Session {
    pub fn kind(&self) -> StateKind {
        match self {
            Session::Home(_) => StateKind::Home,
            Session::LoadingQuestions(_) => StateKind::LoadingQuestions,
            Session::Answering(_) => StateKind::Answering,
            Session::Classifying(_) => StateKind::Classifying,
            Session::ShowingResult(_) => StateKind::ShowingResult,
            Session::ReviewingAnswers(_) => StateKind::ReviewingAnswers,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        match self {
            Session::Home(lobby) => lobby.difficulty,
            Session::LoadingQuestions(difficulty) => *difficulty,
            Session::Answering(round) => round.difficulty,
            Session::Classifying(sorting) => sorting.transcript.difficulty,
            Session::ShowingResult(outcome) | Session::ReviewingAnswers(outcome) => {
                outcome.transcript.difficulty
            }
        }
    }

    /// Empty outside of a loaded round.
    pub fn questions(&self) -> &[Question] {
        match self {
            Session::Home(_) | Session::LoadingQuestions(_) => &[],
            Session::Answering(round) => &round.questions,
            Session::Classifying(sorting) => &sorting.transcript.questions,
            Session::ShowingResult(outcome) | Session::ReviewingAnswers(outcome) => {
                &outcome.transcript.questions
            }
        }
    }

    /// `{0, 0}` outside of a loaded round.
    pub fn score(&self) -> Score {
        match self {
            Session::Home(_) | Session::LoadingQuestions(_) => Score::default(),
            Session::Answering(round) => round.score,
            Session::Classifying(sorting) => sorting.transcript.score,
            Session::ShowingResult(outcome) | Session::ReviewingAnswers(outcome) => {
                outcome.transcript.score
            }
        }
    }

    pub fn current_question_index(&self) -> Option<usize> {
        match self {
            Session::Answering(round) => Some(round.index.get()),
            _ => None,
        }
    }

    pub fn sorting_result(&self) -> Option<&SortingResult> {
        match self {
            Session::Classifying(sorting) => sorting.result.as_ref(),
            Session::ShowingResult(outcome) | Session::ReviewingAnswers(outcome) => {
                Some(&outcome.result)
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Session::Home(lobby) => lobby.error.as_deref(),
            _ => None,
        }
    }

    pub fn is_reviewing(&self) -> bool {
        matches!(self, Session::ReviewingAnswers(_))
    }

    /// The call that has to be (re)issued before the session can move on.
    /// Updates of one chat are handled in order, so a stored session in one
    /// of these states means its call was interrupted.
    pub fn pending_call(&self) -> Option<PendingCall> {
        match self {
            Session::LoadingQuestions(difficulty) => Some(PendingCall::Questions(*difficulty)),
            Session::Classifying(Sorting {
                transcript,
                result: None,
            }) => Some(PendingCall::Sorting(transcript.classify_request())),
            _ => None,
        }
    }

    /// Sends an inconsistent `Answering` session home with a notice.
    /// Returns whether anything was discarded.
    pub fn discard_corrupt_round(&mut self) -> bool {
        let difficulty = match self {
            Session::Answering(round) if !round.is_consistent() => round.difficulty,
            _ => return false,
        };
        warn!("Discarding an inconsistent round");
        self.enter(Session::Home(Lobby {
            difficulty,
            error: Some(ROUND_LOST.to_string()),
        }));
        true
    }

    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> Result<(), TransitionError> {
        match self {
            Session::Home(lobby) => {
                lobby.difficulty = difficulty;
                lobby.error = None;
                Ok(())
            }
            other => Err(other.not_allowed("select difficulty")),
        }
    }

    /// `Home -> LoadingQuestions`. Returns the tier to ask the question
    /// provider for.
    pub fn start_session(&mut self) -> Result<Difficulty, TransitionError> {
        match self {
            Session::Home(lobby) => {
                let difficulty = lobby.difficulty;
                self.enter(Session::LoadingQuestions(difficulty));
                Ok(difficulty)
            }
            other => Err(other.not_allowed("start a session")),
        }
    }

    /// `ShowingResult -> LoadingQuestions` for another round at the same
    /// tier, skipping `Home`.
    pub fn play_again(&mut self) -> Result<Difficulty, TransitionError> {
        match self {
            Session::ShowingResult(outcome) => {
                let difficulty = outcome.transcript.difficulty;
                self.enter(Session::LoadingQuestions(difficulty));
                Ok(difficulty)
            }
            other => Err(other.not_allowed("play again")),
        }
    }

    /// `LoadingQuestions -> Answering`. An empty list cannot be played and
    /// sends the session home like any other provider failure.
    pub fn questions_received(&mut self, questions: Vec<Question>) -> Result<(), TransitionError> {
        let Session::LoadingQuestions(difficulty) = *self else {
            return Err(self.not_allowed("receive questions"));
        };
        let Some(index) = QuestionIndex::first(questions.len()) else {
            return self.questions_failed(&ProviderError::Empty);
        };
        let score = Score::new(questions.len() as u32);
        self.enter(Session::Answering(Round {
            difficulty,
            questions,
            index,
            score,
            answers: Vec::new(),
        }));
        Ok(())
    }

    /// `LoadingQuestions -> Home` with the failure's user-facing message.
    pub fn questions_failed(&mut self, error: &ProviderError) -> Result<(), TransitionError> {
        let Session::LoadingQuestions(difficulty) = *self else {
            return Err(self.not_allowed("fail loading questions"));
        };
        warn!("Question provider failed: {}", error);
        self.enter(Session::Home(Lobby {
            difficulty,
            error: Some(error.user_message().to_string()),
        }));
        Ok(())
    }

    pub fn submit_answer(&mut self, selected: usize) -> Result<AnswerOutcome, TransitionError> {
        let round = match &mut *self {
            Session::Answering(round) => round,
            other => return Err(other.not_allowed("answer")),
        };
        let Some(question) = round.current_question() else {
            return Err(TransitionError::CorruptRound);
        };
        if selected >= question.options.len() {
            return Err(TransitionError::InvalidOption {
                selected,
                available: question.options.len(),
            });
        }

        let correct = question.is_correct(selected);
        if correct {
            round.score.correct += 1;
        }
        round.answers.push(selected);

        if let Some(next) = round.index.advance() {
            round.index = next;
            return Ok(AnswerOutcome {
                correct,
                next: Next::Question(next.get()),
            });
        }

        let transcript = Transcript {
            difficulty: round.difficulty,
            questions: std::mem::take(&mut round.questions),
            answers: std::mem::take(&mut round.answers),
            score: round.score,
        };
        let request = transcript.classify_request();
        self.enter(Session::Classifying(Sorting {
            transcript,
            result: None,
        }));
        Ok(AnswerOutcome {
            correct,
            next: Next::Classify(request),
        })
    }

    /// Answer lock for button presses: labels carry the question number,
    /// so a tap on an older keyboard never matches the current question even
    /// when both questions offer the same options.
    pub fn submit_answer_label(&mut self, label: &str) -> Result<AnswerOutcome, TransitionError> {
        let selected = match &*self {
            Session::Answering(round) => {
                let question = round
                    .current_question()
                    .ok_or(TransitionError::CorruptRound)?;
                option_labels(round.index.get(), question)
                    .iter()
                    .position(|l| l == label.trim())
                    .ok_or(TransitionError::StaleAnswer)?
            }
            other => return Err(other.not_allowed("answer")),
        };
        self.submit_answer(selected)
    }

    /// Stores the classifier's verdict, or the fixed fallback when it failed.
    /// The session stays in `Classifying` until [`Session::show_result`].
    pub fn classification_finished(
        &mut self,
        result: Result<SortingResult, ClassificationError>,
    ) -> Result<&SortingResult, TransitionError> {
        let sorting = match self {
            Session::Classifying(sorting) => sorting,
            other => return Err(other.not_allowed("finish sorting")),
        };
        if sorting.result.is_some() {
            return Err(TransitionError::AlreadySorted);
        }
        let result = result.unwrap_or_else(|e| {
            warn!("Sorting failed, using the fallback verdict: {}", e);
            SortingResult::fallback()
        });
        debug!("Sorted into {}", result.house);
        Ok(sorting.result.insert(result))
    }

    /// `Classifying -> ShowingResult`, once the verdict is in.
    pub fn show_result(&mut self) -> Result<(), TransitionError> {
        match self {
            Session::Classifying(sorting) => {
                let Some(result) = sorting.result.take() else {
                    return Err(TransitionError::ResultPending);
                };
                let transcript = sorting.transcript.clone();
                self.enter(Session::ShowingResult(Outcome { transcript, result }));
                Ok(())
            }
            other => Err(other.not_allowed("show the result")),
        }
    }

    pub fn toggle_review(&mut self) -> Result<(), TransitionError> {
        let from = self.kind();
        let next = match std::mem::take(self) {
            Session::ShowingResult(outcome) => Session::ReviewingAnswers(outcome),
            Session::ReviewingAnswers(outcome) => Session::ShowingResult(outcome),
            other => {
                let err = other.not_allowed("toggle the review");
                *self = other;
                return Err(err);
            }
        };
        debug!("Session {:?} -> {:?}", from, next.kind());
        *self = next;
        Ok(())
    }

    /// Drops all round data and goes back to `Home`, keeping only the last
    /// chosen difficulty as the preselection.
    ///
    /// Allowed from `Home`, `Answering` (abandons the round),
    /// `Classifying` once the verdict is in, `ShowingResult` and
    /// `ReviewingAnswers`. Refused in `LoadingQuestions` and in
    /// `Classifying` before the verdict, where an outbound call is pending.
    pub fn return_home(&mut self) -> Result<(), TransitionError> {
        match self {
            Session::LoadingQuestions(_) | Session::Classifying(Sorting { result: None, .. }) => {
                Err(self.not_allowed("return home"))
            }
            _ => {
                let difficulty = self.difficulty();
                self.enter(Session::Home(Lobby {
                    difficulty,
                    error: None,
                }));
                Ok(())
            }
        }
    }

    /// Goes home no matter what, for explicit `/start` and `/home`. A stored
    /// session can sit in a pending state whose call will never complete.
    pub fn abandon(&mut self) {
        if self.return_home().is_ok() {
            return;
        }
        let difficulty = self.difficulty();
        self.enter(Session::Home(Lobby {
            difficulty,
            error: None,
        }));
    }

    fn enter(&mut self, next: Session) {
        debug!("Session {:?} -> {:?}", self.kind(), next.kind());
        *self = next;
    }

    fn not_allowed(&self, action: &'static str) -> TransitionError {
        TransitionError::NotAllowed {
            action,
            state: self.kind(),
        }
    }
}

/// Keyboard labels for the options of the question at `index`:
/// "1·A) ...", "1·B) ...".
pub fn option_labels(index: usize, question: &Question) -> Vec<String> {
    question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}·{}) {}", index + 1, option_letter(i), option))
        .collect()
}

pub fn option_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{House, FALLBACK_NARRATIVE};

    fn questions(correct: &[usize]) -> Vec<Question> {
        correct
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Question::new(
                    format!("Question {}", i + 1),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    c,
                )
            })
            .collect()
    }

    fn answering(difficulty: Difficulty, correct: &[usize]) -> Session {
        let mut session = Session::default();
        session.select_difficulty(difficulty).unwrap();
        session.start_session().unwrap();
        session.questions_received(questions(correct)).unwrap();
        session
    }

    fn sorted(correct: &[usize]) -> Session {
        let mut session = answering(Difficulty::Wizard, correct);
        for &c in correct {
            session.submit_answer(c).unwrap();
        }
        session
            .classification_finished(Ok(SortingResult {
                house: House::Ravenclaw,
                narrative: "Wit beyond measure".into(),
            }))
            .unwrap();
        session.show_result().unwrap();
        session
    }

    #[test]
    fn question_index_is_bounded_and_forward_only() {
        assert_eq!(QuestionIndex::first(0), None);
        let index = QuestionIndex::first(2).unwrap();
        assert_eq!(index.get(), 0);
        let index = index.advance().unwrap();
        assert_eq!(index.get(), 1);
        assert!(index.is_last());
        assert_eq!(index.advance(), None);
    }

    #[test]
    fn starting_a_session_loads_and_initialises_the_round() {
        for difficulty in Difficulty::ALL {
            let session = answering(difficulty, &[0, 1, 2, 3, 0]);
            assert_eq!(session.kind(), StateKind::Answering);
            assert_eq!(session.score(), Score { correct: 0, total: 5 });
            assert_eq!(session.current_question_index(), Some(0));
            assert_eq!(session.difficulty(), difficulty);
        }
    }

    #[test]
    fn start_is_only_reachable_from_home() {
        let mut session = Session::default();
        session.start_session().unwrap();
        assert_eq!(
            session.start_session(),
            Err(TransitionError::NotAllowed {
                action: "start a session",
                state: StateKind::LoadingQuestions
            })
        );
        assert_eq!(session.kind(), StateKind::LoadingQuestions);
    }

    #[test]
    fn worked_example_scores_three_of_five() {
        let mut session = answering(Difficulty::Wizard, &[0, 1, 1, 3, 2]);
        let mut requests = Vec::new();
        for selected in [0, 1, 2, 3, 0] {
            if let Next::Classify(request) = session.submit_answer(selected).unwrap().next {
                requests.push(request);
            }
        }
        assert_eq!(session.score(), Score { correct: 3, total: 5 });
        assert_eq!(
            requests,
            vec![ClassifyRequest {
                correct: 3,
                total: 5,
                difficulty: Difficulty::Wizard
            }]
        );
        assert_eq!(session.kind(), StateKind::Classifying);
    }

    #[test]
    fn all_wrong_answers_score_zero() {
        let correct = [0, 1, 2, 3, 0];
        let mut session = answering(Difficulty::Muggle, &correct);
        for c in correct {
            session.submit_answer((c + 1) % 4).unwrap();
        }
        assert_eq!(session.score(), Score { correct: 0, total: 5 });
    }

    #[test]
    fn answering_is_rejected_once_classifying() {
        let mut session = answering(Difficulty::Wizard, &[0]);
        assert!(matches!(
            session.submit_answer(0).unwrap().next,
            Next::Classify(_)
        ));
        assert_eq!(
            session.submit_answer(0),
            Err(TransitionError::NotAllowed {
                action: "answer",
                state: StateKind::Classifying
            })
        );
        assert_eq!(session.score(), Score { correct: 1, total: 1 });
    }

    #[test]
    fn out_of_range_option_does_not_advance() {
        let mut session = answering(Difficulty::Wizard, &[0, 0]);
        assert_eq!(
            session.submit_answer(4),
            Err(TransitionError::InvalidOption {
                selected: 4,
                available: 4
            })
        );
        assert_eq!(session.current_question_index(), Some(0));
    }

    #[test]
    fn stale_label_is_locked_out() {
        let mut session = Session::default();
        session.start_session().unwrap();
        session
            .questions_received(vec![
                Question::new("Q1".into(), vec!["w".into(), "x".into(), "y".into(), "z".into()], 1),
                Question::new("Q2".into(), vec!["p".into(), "q".into(), "r".into(), "s".into()], 0),
            ])
            .unwrap();

        let outcome = session.submit_answer_label("1·B) x").unwrap();
        assert!(outcome.correct);
        // a double tap resends the first question's label
        assert_eq!(
            session.submit_answer_label("1·B) x"),
            Err(TransitionError::StaleAnswer)
        );
        assert_eq!(session.current_question_index(), Some(1));
        assert_eq!(session.score().correct, 1);
    }

    #[test]
    fn empty_question_list_goes_home_with_error() {
        let mut session = Session::default();
        session.start_session().unwrap();
        session.questions_received(Vec::new()).unwrap();
        assert_eq!(session.kind(), StateKind::Home);
        assert!(session.error().is_some_and(|e| !e.is_empty()));
        assert!(session.questions().is_empty());
    }

    #[test]
    fn provider_failure_returns_home_keeping_difficulty() {
        let mut session = Session::default();
        session.select_difficulty(Difficulty::Master).unwrap();
        session.start_session().unwrap();
        session
            .questions_failed(&ProviderError::Service("offline".into()))
            .unwrap();
        assert_eq!(session.kind(), StateKind::Home);
        assert_eq!(session.difficulty(), Difficulty::Master);
        assert_eq!(
            session.error(),
            Some(crate::quiz::provider::DARK_SPELL)
        );
        assert_eq!(session.score(), Score::default());

        // choosing again clears the message
        session.select_difficulty(Difficulty::Muggle).unwrap();
        assert_eq!(session.error(), None);
    }

    #[test]
    fn classifier_failure_substitutes_fallback() {
        let mut session = answering(Difficulty::Wizard, &[0, 0, 0, 0, 0]);
        for selected in [0, 0, 0, 0, 1] {
            session.submit_answer(selected).unwrap();
        }
        assert_eq!(session.score(), Score { correct: 4, total: 5 });
        session
            .classification_finished(Err(ClassificationError::Service("boom".into())))
            .unwrap();
        let result = session.sorting_result().unwrap();
        assert_eq!(result.house, House::Gryffindor);
        assert_eq!(result.narrative, FALLBACK_NARRATIVE);

        session.show_result().unwrap();
        assert_eq!(session.kind(), StateKind::ShowingResult);
        assert_eq!(session.score(), Score { correct: 4, total: 5 });
    }

    #[test]
    fn result_is_gated_until_the_verdict_arrives() {
        let mut session = answering(Difficulty::Wizard, &[2]);
        session.submit_answer(2).unwrap();
        assert_eq!(session.show_result(), Err(TransitionError::ResultPending));
        assert_eq!(
            session.return_home(),
            Err(TransitionError::NotAllowed {
                action: "return home",
                state: StateKind::Classifying
            })
        );
        session
            .classification_finished(Ok(SortingResult::fallback()))
            .unwrap();
        assert_eq!(
            session
                .classification_finished(Ok(SortingResult::fallback()))
                .unwrap_err(),
            TransitionError::AlreadySorted
        );
    }

    #[test]
    fn review_round_trip_changes_nothing() {
        let mut session = sorted(&[0, 1, 2, 3, 0]);
        let before = session.clone();

        session.toggle_review().unwrap();
        assert!(session.is_reviewing());
        assert_eq!(session.score(), before.score());
        assert_eq!(session.play_again(), Err(TransitionError::NotAllowed {
            action: "play again",
            state: StateKind::ReviewingAnswers
        }));

        session.toggle_review().unwrap();
        assert_eq!(session, before);
    }

    #[test]
    fn toggle_review_outside_results_is_rejected() {
        let mut session = answering(Difficulty::Wizard, &[0, 1]);
        let before = session.clone();
        assert!(session.toggle_review().is_err());
        assert_eq!(session, before);
    }

    #[test]
    fn play_again_reloads_the_same_tier_with_fresh_data() {
        let mut session = sorted(&[0, 1, 2, 3, 0]);
        assert_eq!(session.play_again(), Ok(Difficulty::Wizard));
        assert_eq!(session.kind(), StateKind::LoadingQuestions);
        assert!(session.questions().is_empty());
        assert_eq!(session.score(), Score::default());
        assert_eq!(session.sorting_result(), None);
    }

    #[test]
    fn return_home_empties_the_session() {
        for mut session in [
            sorted(&[0, 1, 2, 3, 0]),
            answering(Difficulty::Master, &[1, 1]),
        ] {
            session.return_home().unwrap();
            assert_eq!(session.kind(), StateKind::Home);
            assert!(session.questions().is_empty());
            assert_eq!(session.score(), Score { correct: 0, total: 0 });
            assert_eq!(session.sorting_result(), None);
            assert!(!session.is_reviewing());
        }
    }

    #[test]
    fn option_labels_are_lettered() {
        let q = Question::new(
            "Q".into(),
            vec!["Lumos".into(), "Nox".into(), "Accio".into(), "Reducto".into()],
            0,
        );
        assert_eq!(
            option_labels(2, &q),
            vec!["3·A) Lumos", "3·B) Nox", "3·C) Accio", "3·D) Reducto"]
        );
    }

    #[test]
    fn double_tap_on_repeated_options_is_not_scored_twice() {
        let options: Vec<String> = vec!["Hermione".into(), "Ron".into(), "Harry".into(), "Neville".into()];
        let mut session = Session::default();
        session.start_session().unwrap();
        session
            .questions_received(
                (1..=5)
                    .map(|i| Question::new(format!("Who said line {}?", i), options.clone(), 0))
                    .collect(),
            )
            .unwrap();

        assert!(session.submit_answer_label("1·A) Hermione").unwrap().correct);
        assert_eq!(
            session.submit_answer_label("1·A) Hermione"),
            Err(TransitionError::StaleAnswer)
        );
        assert_eq!(session.current_question_index(), Some(1));
        assert_eq!(session.score(), Score { correct: 1, total: 5 });

        assert!(session.submit_answer_label("2·A) Hermione").unwrap().correct);
        assert_eq!(session.current_question_index(), Some(2));
    }

    #[test]
    fn restored_round_with_index_out_of_range_is_discarded() {
        let session = answering(Difficulty::Master, &[0, 1, 2, 3, 0]);
        let stored = serde_json::to_string(&session)
            .unwrap()
            .replace("\"current\":0", "\"current\":7");
        let mut restored: Session = serde_json::from_str(&stored).unwrap();

        let Session::Answering(round) = &restored else {
            panic!("expected a round");
        };
        assert!(!round.is_consistent());
        assert_eq!(round.current_question(), None);
        assert_eq!(restored.submit_answer(0), Err(TransitionError::CorruptRound));
        assert_eq!(
            restored.submit_answer_label("8·A) a"),
            Err(TransitionError::CorruptRound)
        );

        assert!(restored.discard_corrupt_round());
        assert_eq!(restored.kind(), StateKind::Home);
        assert_eq!(restored.difficulty(), Difficulty::Master);
        assert_eq!(restored.error(), Some(ROUND_LOST));
        assert!(!restored.discard_corrupt_round());
    }

    #[test]
    fn round_length_mismatch_is_inconsistent() {
        let Session::Answering(mut round) = answering(Difficulty::Wizard, &[0, 1, 2]) else {
            panic!("expected a round");
        };
        assert!(round.is_consistent());
        round.questions.pop();
        assert!(!round.is_consistent());
        assert_eq!(round.current_question(), None);
    }

    #[test]
    fn pending_call_names_the_interrupted_request() {
        assert_eq!(Session::default().pending_call(), None);

        let mut session = Session::default();
        session.select_difficulty(Difficulty::Muggle).unwrap();
        session.start_session().unwrap();
        assert_eq!(
            session.pending_call(),
            Some(PendingCall::Questions(Difficulty::Muggle))
        );

        session.questions_received(questions(&[1, 1])).unwrap();
        assert_eq!(session.pending_call(), None);
        session.submit_answer(1).unwrap();
        session.submit_answer(0).unwrap();
        assert_eq!(
            session.pending_call(),
            Some(PendingCall::Sorting(ClassifyRequest {
                correct: 1,
                total: 2,
                difficulty: Difficulty::Muggle
            }))
        );

        session
            .classification_finished(Ok(SortingResult::fallback()))
            .unwrap();
        assert_eq!(session.pending_call(), None);
    }

    #[test]
    fn abandon_leaves_pending_states_for_home() {
        let mut loading = Session::default();
        loading.select_difficulty(Difficulty::Master).unwrap();
        loading.start_session().unwrap();
        assert!(loading.return_home().is_err());
        loading.abandon();
        assert_eq!(loading.kind(), StateKind::Home);
        assert_eq!(loading.difficulty(), Difficulty::Master);

        let mut sorting = answering(Difficulty::Wizard, &[0]);
        sorting.submit_answer(0).unwrap();
        sorting.abandon();
        assert_eq!(sorting.kind(), StateKind::Home);
        assert!(sorting.questions().is_empty());
        assert_eq!(sorting.error(), None);
    }
}
