use std::sync::Arc;

use chatgpt::client::ChatGPT;
use dotenv::dotenv;
use log::{debug, info};
use sorting_hat::{
    config::Config,
    handlers::{self, HandlerError},
    quiz::{ai_helper::SortingHat, runner::SessionRunner, session::Session},
};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, InMemStorage, SqliteStorage, Storage},
    prelude::*,
};

type DialogueStorage = Arc<ErasedStorage<Session>>;

#[tokio::main]
async fn main() -> Result<(), HandlerError> {
    let env_file_loaded = dotenv().is_ok();

    pretty_env_logger::init();
    info!("Starting the Sorting Hat bot...");
    if !env_file_loaded {
        debug!("No .env file found, using the process environment only");
    }

    let config = Config::from_env()?;
    let bot = Bot::from_env();
    let storage = open_storage(&config).await?;

    let gpt = {
        let mut gpt = ChatGPT::new(config.chatgpt_api_key.as_str())?;

        gpt.config.engine = config.engine;
        gpt.config.timeout = config.ai_timeout;

        gpt
    };

    let sorting_hat = Arc::new(SortingHat::new(gpt));
    let runner = Arc::new(SessionRunner::new(
        sorting_hat.clone(),
        sorting_hat,
        config.ai_timeout,
    ));

    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![storage, runner])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

async fn open_storage(config: &Config) -> Result<DialogueStorage, HandlerError> {
    let storage: DialogueStorage = match &config.dialogue_db {
        Some(path) => {
            info!("Keeping dialogues in {}", path);
            SqliteStorage::open(path, Json).await?.erase()
        }
        None => {
            info!("Keeping dialogues in memory");
            InMemStorage::<Session>::new().erase()
        }
    };
    Ok(storage)
}
