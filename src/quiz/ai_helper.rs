use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use chatgpt::types::CompletionResponse;
use log::debug;

use crate::quiz::provider::{
    parse_questions, parse_sorting, ClassificationError, Classifier, ClassifyRequest,
    ProviderError, QuestionProvider,
};
use crate::quiz::{Difficulty, House, Question, SortingResult, QUESTIONS_PER_ROUND};

/// ChatGPT-backed question author and house classifier.
pub struct SortingHat {
    chat_gpt: ChatGPT,
}

impl SortingHat {
    pub fn new(chat_gpt: ChatGPT) -> Self {
        Self { chat_gpt }
    }

    async fn complete(&self, prompt: String) -> Result<String, chatgpt::err::Error> {
        let response: CompletionResponse = self.chat_gpt.send_message(prompt).await?;
        let content = response.message().clone().content;

        debug!("Completion: {:?}", content);

        Ok(content)
    }
}

pub fn question_prompt(difficulty: Difficulty) -> String {
    format!(
        "Create {count} challenging trivia questions about the wizarding world (the Harry Potter universe) in English.
        The difficulty level should be: {scope}
        Write the questions and answers in fluent English.
        Reply with JSON only: an array of exactly {count} objects, each with the fields
        \"question\" (string), \"options\" (array of exactly 4 strings),
        \"correctIndex\" (number, index of the right option, 0-3) and
        \"explanation\" (a short, magical explanation of the fact).",
        count = QUESTIONS_PER_ROUND,
        scope = difficulty.scope(),
    )
}

pub fn sorting_prompt(request: &ClassifyRequest) -> String {
    let houses = House::ALL.map(|h| h.name()).join(", ");
    format!(
        "Act as the Sorting Hat from Harry Potter. A student has finished a magical trivia challenge.
        Score: {} out of {}
        Difficulty: {}

        Based on their performance choose one of the four houses: {}.
        Give a short, mysterious and characterful monologue (2-3 sentences), perhaps in rhyme, before announcing the house.
        Reply with JSON only: an object with the fields \"house\" (one of {}) and \"dialogue\" (the monologue).",
        request.correct, request.total, request.difficulty, houses, houses,
    )
}

#[async_trait]
impl QuestionProvider for SortingHat {
    async fn fetch_questions(&self, difficulty: Difficulty) -> Result<Vec<Question>, ProviderError> {
        let content = self
            .complete(question_prompt(difficulty))
            .await
            .map_err(|e| ProviderError::Service(e.to_string()))?;
        parse_questions(&content)
    }
}

#[async_trait]
impl Classifier for SortingHat {
    async fn classify(&self, request: ClassifyRequest) -> Result<SortingResult, ClassificationError> {
        let content = self
            .complete(sorting_prompt(&request))
            .await
            .map_err(|e| ClassificationError::Service(e.to_string()))?;
        parse_sorting(&content)
    }
}
