pub mod ai_helper;
pub mod provider;
pub mod runner;
pub mod session;

use std::fmt;

/// Number of questions in one sorting round.
pub const QUESTIONS_PER_ROUND: usize = 5;
/// Number of answer options every question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Difficulty {
    Muggle,
    #[default]
    Wizard,
    Master,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Muggle, Difficulty::Wizard, Difficulty::Master];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Muggle => "Muggle",
            Difficulty::Wizard => "Wizard",
            Difficulty::Master => "Master",
        }
    }

    /// How deep into the lore the questions for this tier should reach.
    pub fn scope(&self) -> &'static str {
        match self {
            Difficulty::Muggle => "basic knowledge of the Harry Potter films only.",
            Difficulty::Wizard => {
                "in-depth details from the books and films, including spells and minor characters."
            }
            Difficulty::Master => {
                "extremely rare details, the deep history of the wizarding world and technical details from 'Fantastic Beasts' and Pottermore."
            }
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum House {
    Gryffindor,
    Hufflepuff,
    Ravenclaw,
    Slytherin,
}

impl House {
    pub const ALL: [House; 4] = [
        House::Gryffindor,
        House::Hufflepuff,
        House::Ravenclaw,
        House::Slytherin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            House::Gryffindor => "Gryffindor",
            House::Hufflepuff => "Hufflepuff",
            House::Ravenclaw => "Ravenclaw",
            House::Slytherin => "Slytherin",
        }
    }

    pub fn emblem(&self) -> &'static str {
        match self {
            House::Gryffindor => "🦁",
            House::Hufflepuff => "🦡",
            House::Ravenclaw => "🦅",
            House::Slytherin => "🐍",
        }
    }

    /// Case-insensitive, ignores everything that is not a letter
    /// ("slytherin!", "Slytherin" and "SLYTHERIN" all match).
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_alphabetic())
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|h| h.name().to_lowercase() == cleaned)
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
}

impl Question {
    pub fn new(prompt: String, options: Vec<String>, correct_index: usize) -> Self {
        Self {
            prompt,
            options,
            correct_index,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_index
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    pub fn new(total: u32) -> Self {
        Self { correct: 0, total }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SortingResult {
    pub house: House,
    pub narrative: String,
}

/// What the Sorting Hat says when it could not make up its mind.
pub const FALLBACK_NARRATIVE: &str = "Hmm, a complex mind indeed... I see plenty of courage here.";

impl SortingResult {
    pub fn fallback() -> Self {
        Self {
            house: House::Gryffindor,
            narrative: FALLBACK_NARRATIVE.to_string(),
        }
    }
}
