use std::sync::Arc;

use log::{debug, info};
use teloxide::{
    dispatching::{dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
    types::{ChatAction, ParseMode},
};

use crate::quiz::runner::SessionRunner;
use crate::quiz::session::{
    AnswerOutcome, Lobby, Next, Outcome, Round, Session, Sorting, TransitionError,
};
use crate::quiz::Difficulty;
use crate::screens::{
    difficulty_from_button, screen_for, ANOTHER_DUEL, CLOSE_REVIEW, ENTER_GREAT_HALL,
    PICK_AN_OPTION, RETURN_HOME, START_GAME, VIEW_ANSWERS,
};

pub type QuizDialogue = Dialogue<Session, ErasedStorage<Session>>;
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

pub fn schema() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<Session>, Session>()
        .branch(dptree::filter(|msg: Message| is_reset_command(&msg)).endpoint(go_home))
        .branch(dptree::case![Session::Home(lobby)].endpoint(home))
        .branch(dptree::case![Session::LoadingQuestions(difficulty)].endpoint(resume_loading))
        .branch(dptree::case![Session::Answering(round)].endpoint(answering))
        .branch(dptree::case![Session::Classifying(sorting)].endpoint(classifying))
        .branch(dptree::case![Session::ShowingResult(outcome)].endpoint(showing_result))
        .branch(dptree::case![Session::ReviewingAnswers(outcome)].endpoint(reviewing))
}

fn is_reset_command(msg: &Message) -> bool {
    matches!(
        msg.text().map(str::trim),
        Some("/start") | Some("/home")
    )
}

async fn show(bot: &Bot, chat_id: ChatId, session: &Session) -> HandlerResult {
    let screen = screen_for(session);
    let mut pages = screen.pages();
    let last = pages.pop().unwrap_or_default();
    for page in pages {
        bot.send_message(chat_id, page).parse_mode(ParseMode::Html).await?;
    }
    bot.send_message(chat_id, last)
        .parse_mode(ParseMode::Html)
        .reply_markup(screen.markup())
        .await?;
    Ok(())
}

async fn save_and_show(bot: &Bot, dialogue: &QuizDialogue, session: Session) -> HandlerResult {
    dialogue.update(session.clone()).await?;
    show(bot, dialogue.chat_id(), &session).await
}

/// Persists the waiting state, shows its interstitial, then runs the call
/// the session is waiting on and shows where it landed.
async fn run_pending(
    bot: &Bot,
    dialogue: &QuizDialogue,
    runner: &SessionRunner,
    mut session: Session,
) -> HandlerResult {
    dialogue.update(session.clone()).await?;
    show(bot, dialogue.chat_id(), &session).await?;
    // Cosmetic, so a failure here is not worth aborting the round for
    let _ = bot
        .send_chat_action(dialogue.chat_id(), ChatAction::Typing)
        .await;

    runner.resume(&mut session).await?;
    save_and_show(bot, dialogue, session).await
}

async fn go_home(bot: Bot, dialogue: QuizDialogue) -> HandlerResult {
    let mut session = dialogue.get().await?.unwrap_or_default();
    session.abandon();
    save_and_show(&bot, &dialogue, session).await
}

async fn home(
    bot: Bot,
    dialogue: QuizDialogue,
    lobby: Lobby,
    runner: Arc<SessionRunner>,
    msg: Message,
) -> HandlerResult {
    let mut session = Session::Home(lobby);
    let text = msg.text().unwrap_or_default();

    if text == START_GAME {
        let difficulty = session.start_session()?;
        info!("Chat {} starts a {} round", msg.chat.id, difficulty);
        return run_pending(&bot, &dialogue, &runner, session).await;
    }

    if let Some(difficulty) = difficulty_from_button(text) {
        session.select_difficulty(difficulty)?;
    }
    save_and_show(&bot, &dialogue, session).await
}

async fn resume_loading(
    bot: Bot,
    dialogue: QuizDialogue,
    difficulty: Difficulty,
    runner: Arc<SessionRunner>,
) -> HandlerResult {
    // Updates of one chat are handled in order, so landing here means the
    // previous fetch never finished.
    debug!("Resuming an interrupted question fetch");
    run_pending(&bot, &dialogue, &runner, Session::LoadingQuestions(difficulty)).await
}

async fn answering(
    bot: Bot,
    dialogue: QuizDialogue,
    round: Round,
    runner: Arc<SessionRunner>,
    msg: Message,
) -> HandlerResult {
    let mut session = Session::Answering(round);
    if session.discard_corrupt_round() {
        return save_and_show(&bot, &dialogue, session).await;
    }
    let text = msg.text().unwrap_or_default();

    match session.submit_answer_label(text) {
        Ok(AnswerOutcome {
            next: Next::Question(_),
            ..
        }) => save_and_show(&bot, &dialogue, session).await,
        Ok(AnswerOutcome {
            next: Next::Classify(_),
            ..
        }) => run_pending(&bot, &dialogue, &runner, session).await,
        Err(TransitionError::StaleAnswer) => {
            bot.send_message(msg.chat.id, PICK_AN_OPTION).await?;
            show(&bot, msg.chat.id, &session).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn classifying(
    bot: Bot,
    dialogue: QuizDialogue,
    sorting: Sorting,
    runner: Arc<SessionRunner>,
    msg: Message,
) -> HandlerResult {
    if sorting.result.is_some() {
        let mut session = Session::Classifying(sorting);
        if msg.text() == Some(ENTER_GREAT_HALL) {
            session.show_result()?;
        }
        return save_and_show(&bot, &dialogue, session).await;
    }

    debug!("Resuming an interrupted sorting");
    run_pending(&bot, &dialogue, &runner, Session::Classifying(sorting)).await
}

async fn showing_result(
    bot: Bot,
    dialogue: QuizDialogue,
    outcome: Outcome,
    runner: Arc<SessionRunner>,
    msg: Message,
) -> HandlerResult {
    let mut session = Session::ShowingResult(outcome);

    match msg.text().unwrap_or_default() {
        VIEW_ANSWERS => session.toggle_review()?,
        ANOTHER_DUEL => {
            let difficulty = session.play_again()?;
            info!("Chat {} plays another {} round", msg.chat.id, difficulty);
            return run_pending(&bot, &dialogue, &runner, session).await;
        }
        RETURN_HOME => session.return_home()?,
        _ => {}
    }
    save_and_show(&bot, &dialogue, session).await
}

async fn reviewing(bot: Bot, dialogue: QuizDialogue, outcome: Outcome, msg: Message) -> HandlerResult {
    let mut session = Session::ReviewingAnswers(outcome);
    if msg.text() == Some(CLOSE_REVIEW) {
        session.toggle_review()?;
    }
    save_and_show(&bot, &dialogue, session).await
}
