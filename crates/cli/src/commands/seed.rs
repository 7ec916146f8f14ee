use snoozy_core::config::{AppConfig, LoadOptions};
use snoozy_db::{connect_with_settings, migrations, StoreSeedDataset};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
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
                "seed",
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

        let seeded = StoreSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = StoreSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        if verification.passed {
            Ok(format!(
                "seeded {} products and {} reviews; all {} checks passed",
                seeded.products,
                seeded.reviews,
                verification.checks.len()
            ))
        } else {
            let failed = verification
                .checks
                .iter()
                .filter(|check| !check.passed)
                .map(|check| format!("{} ({})", check.name, check.detail))
                .collect::<Vec<_>>()
                .join(", ");
            Err(("seed_verification", format!("seed verification failed: {failed}"), 6u8))
        }
    });

    match result {
        Ok(message) => CommandResult::success("seed", message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
