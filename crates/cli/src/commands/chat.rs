use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use snoozy_agents::openai::OpenAiChatClient;
use snoozy_agents::SupportSystem;
use snoozy_core::config::{AppConfig, LoadOptions};
use snoozy_db::repositories::{SqlOrderRepository, SqlProductRepository, SqlReviewRepository};
use snoozy_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

const SESSION_ID: &str = "default";

/// Interactive terminal chat against a locally-bootstrapped support system.
/// `quit` exits, `clear` starts a fresh conversation, empty input is skipped.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let api_key =
            config.llm.api_key.clone().unwrap_or_else(|| SecretString::from(String::new()));
        let client = OpenAiChatClient::new(
            api_key,
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            Duration::from_secs(config.llm.timeout_secs),
        )
        .map_err(|error| ("llm_client", error.to_string(), 4u8))?;

        let support = SupportSystem::new(
            Arc::new(client),
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlReviewRepository::new(pool.clone())),
            Arc::new(SqlOrderRepository::new(pool.clone())),
            &config,
        );

        println!("Welcome to Frodo - Your Mattress Expert!");
        println!("Type 'quit' to exit, 'clear' to start a new conversation\n");

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("\nYou: ");
            let _ = io::stdout().flush();

            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) => {
                    return Err(("stdin", error.to_string(), 7u8));
                }
            }

            let query = line.trim();
            if query.eq_ignore_ascii_case("quit") {
                println!("\nGoodbye!");
                break;
            }
            if query.eq_ignore_ascii_case("clear") {
                support.clear_conversation(SESSION_ID).await;
                println!("\nConversation cleared. Starting fresh!");
                continue;
            }
            if query.is_empty() {
                continue;
            }

            println!("\nFrodo is thinking...");
            let reply = support.process_query(SESSION_ID, query).await;
            println!("\nFrodo: {reply}");
        }

        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::silent(),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}
