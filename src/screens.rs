//! What the chat shows for each session state: message text (Telegram HTML)
//! and the reply keyboard that offers the actions allowed in that state.

use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};
use teloxide::utils::html::escape;

use crate::quiz::session::{
    option_labels, option_letter, Lobby, Outcome, Round, Session, Sorting, ROUND_LOST,
};
use crate::quiz::{Difficulty, SortingResult};

pub const START_GAME: &str = "⚡ Start the game";
pub const ENTER_GREAT_HALL: &str = "Enter the Great Hall";
pub const VIEW_ANSWERS: &str = "📜 View answers";
pub const ANOTHER_DUEL: &str = "🔁 Another duel";
pub const RETURN_HOME: &str = "🏰 Return home";
pub const CLOSE_REVIEW: &str = "Back to results";

pub const LOADING_TEXT: &str = "✨ Summoning knowledge from the restricted section...";
pub const SORTING_TEXT: &str =
    "🎩 <i>\"Hmm... let's see where you belong...\"</i>\n\nReading your thoughts...";
pub const PICK_AN_OPTION: &str = "Please choose one of the options on the keyboard.";

/// Telegram rejects messages over 4096 characters; markup counts towards
/// the raw text, so stay a little below.
pub const MESSAGE_LIMIT: usize = 4000;

const PROMPT_CLIP: usize = 300;
const OPTION_CLIP: usize = 120;
const EXPLANATION_CLIP: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub buttons: Vec<Vec<String>>,
}

impl Screen {
    fn new(text: impl Into<String>, buttons: Vec<Vec<String>>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }

    /// The text split into messages of at most [`MESSAGE_LIMIT`] chars.
    /// Splits happen between paragraphs so no HTML tag is cut in half.
    pub fn pages(&self) -> Vec<String> {
        let mut pages = Vec::new();
        let mut page = String::new();
        for block in self.text.split("\n\n") {
            let block = clip(block, MESSAGE_LIMIT);
            let joined = page.chars().count() + 2 + block.chars().count();
            if !page.is_empty() && joined > MESSAGE_LIMIT {
                pages.push(std::mem::take(&mut page));
            }
            if !page.is_empty() {
                page.push_str("\n\n");
            }
            page.push_str(&block);
        }
        pages.push(page);
        pages
    }

    pub fn markup(&self) -> ReplyMarkup {
        if self.buttons.is_empty() {
            return ReplyMarkup::KeyboardRemove(KeyboardRemove::new());
        }
        ReplyMarkup::Keyboard(KeyboardMarkup::new(self.buttons.iter().map(|row| {
            row.iter()
                .map(|label| KeyboardButton::new(label.clone()))
                .collect::<Vec<_>>()
        })))
    }
}

pub fn difficulty_button(difficulty: Difficulty) -> String {
    let icon = match difficulty {
        Difficulty::Muggle => "☕",
        Difficulty::Wizard => "🪄",
        Difficulty::Master => "👁",
    };
    format!("{} {}", icon, difficulty.label())
}

pub fn difficulty_from_button(text: &str) -> Option<Difficulty> {
    Difficulty::ALL
        .into_iter()
        .find(|d| difficulty_button(*d) == text.trim())
        .or_else(|| Difficulty::from_label(text))
}

pub fn screen_for(session: &Session) -> Screen {
    match session {
        Session::Home(lobby) => home(lobby),
        Session::LoadingQuestions(_) => Screen::new(LOADING_TEXT, Vec::new()),
        Session::Answering(round) => question(round),
        Session::Classifying(Sorting {
            result: Some(result),
            ..
        }) => verdict(result),
        Session::Classifying(_) => Screen::new(SORTING_TEXT, Vec::new()),
        Session::ShowingResult(outcome) => results(outcome),
        Session::ReviewingAnswers(outcome) => review(outcome),
    }
}

fn home(lobby: &Lobby) -> Screen {
    let mut text = format!(
        "<b>Wizarding World Trivia ✨</b>\n\nChoose your track. Current track: <b>{}</b>\nThen start the game and the Sorting Hat will decide where you belong.",
        lobby.difficulty
    );
    if let Some(error) = &lobby.error {
        text.push_str(&format!("\n\n⚠️ {}", escape(error)));
    }
    Screen::new(
        text,
        vec![
            Difficulty::ALL.into_iter().map(difficulty_button).collect(),
            vec![START_GAME.to_string()],
        ],
    )
}

fn question(round: &Round) -> Screen {
    let Some(question) = round.current_question() else {
        return Screen::new(escape(ROUND_LOST), vec![vec![RETURN_HOME.to_string()]]);
    };
    let text = format!(
        "<b>Question {} of {}</b> · {} track\n\n{}",
        round.index.get() + 1,
        round.questions.len(),
        round.difficulty,
        escape(&question.prompt)
    );
    Screen::new(
        text,
        option_labels(round.index.get(), question)
            .into_iter()
            .map(|l| vec![l])
            .collect(),
    )
}

fn verdict(result: &SortingResult) -> Screen {
    let text = format!(
        "🎩 <i>\"{}\"</i>\n\n{} <b>{}!</b>",
        escape(&result.narrative),
        result.house.emblem(),
        result.house.name().to_uppercase()
    );
    Screen::new(text, vec![vec![ENTER_GREAT_HALL.to_string()]])
}

fn results(outcome: &Outcome) -> Screen {
    let house = outcome.result.house;
    let text = format!(
        "{} <b>{} graduate report</b>\n\n<b>{} / {}</b>\n\nA great result for {}. Your magical knowledge is most impressive!",
        house.emblem(),
        house,
        outcome.transcript.score.correct,
        outcome.transcript.score.total,
        house
    );
    Screen::new(
        text,
        vec![
            vec![VIEW_ANSWERS.to_string()],
            vec![ANOTHER_DUEL.to_string()],
            vec![RETURN_HOME.to_string()],
        ],
    )
}

fn review(outcome: &Outcome) -> Screen {
    let transcript = &outcome.transcript;
    let mut text = String::from("<b>📜 Archive of wisdom</b>");
    for (i, question) in transcript.questions.iter().enumerate() {
        text.push_str(&format!(
            "\n\n<b>{}.</b> {}",
            i + 1,
            escape(&clip(&question.prompt, PROMPT_CLIP))
        ));
        if let Some(correct) = question.correct_option() {
            text.push_str(&format!(
                "\n✅ {}) {}",
                option_letter(question.correct_index),
                escape(&clip(correct, OPTION_CLIP))
            ));
        }
        match transcript.answers.get(i) {
            Some(&chosen) if !question.is_correct(chosen) => {
                let option = question.options.get(chosen).map(String::as_str).unwrap_or("");
                text.push_str(&format!(
                    "\n❌ Your answer: {}) {}",
                    option_letter(chosen),
                    escape(&clip(option, OPTION_CLIP))
                ));
            }
            _ => {}
        }
        if let Some(explanation) = &question.explanation {
            text.push_str(&format!(
                "\n<i>{}</i>",
                escape(&clip(explanation, EXPLANATION_CLIP))
            ));
        }
    }
    Screen::new(text, vec![vec![CLOSE_REVIEW.to_string()]])
}

/// Cuts `text` to at most `max` chars, marking the cut with an ellipsis.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
