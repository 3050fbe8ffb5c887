use anyhow::Context;
use clap::{Parser, Subcommand};
use climate_core::{Config, Dashboard, ForecastOutcome, UnitSystem};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use std::time::Duration;
use tokio::time::timeout;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "daily-climate", version, about = "Weather and top news in your terminal")]
pub struct Cli {
    /// Unit system for this session: "imperial" or "metric".
    #[arg(long, global = true, value_parser = parse_units)]
    pub units: Option<UnitSystem>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API keys and the default unit system.
    Configure,

    /// Show weather and headlines for one location, then exit.
    Show {
        /// City, zip code or address.
        address: String,
    },

    /// Prompt for locations until Esc or Ctrl-C (default).
    Interactive,
}

fn parse_units(value: &str) -> anyhow::Result<UnitSystem> {
    UnitSystem::try_from(value)
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Interactive) {
            Command::Configure => configure(),
            Command::Show { address } => {
                let (dashboard, wait) = open_dashboard(self.units)?;
                show(&dashboard, &address, wait).await
            }
            Command::Interactive => {
                let (dashboard, wait) = open_dashboard(self.units)?;
                interactive(&dashboard, wait).await
            }
        }
    }
}

/// Load config (file + environment), fail fast on missing keys, start the dashboard.
fn open_dashboard(units: Option<UnitSystem>) -> anyhow::Result<(Dashboard, Duration)> {
    let mut config = Config::load_with_env()?;
    if let Some(units) = units {
        config.set_units(units);
    }

    let dashboard = Dashboard::from_config(&config)?;
    // The weather calls run concurrently, each bounded by the HTTP timeout.
    let wait = config.http.timeout() + Duration::from_secs(1);

    Ok((dashboard, wait))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let weather_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read OpenWeather API key")?;
    let news_key = Password::new("New York Times API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read New York Times API key")?;

    let start = UnitSystem::all().iter().position(|u| *u == config.units).unwrap_or_default();
    let units = Select::new("Units:", UnitSystem::all().to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read unit system")?;

    if !weather_key.trim().is_empty() {
        config.set_weather_api_key(weather_key.trim().to_string());
    }
    if !news_key.trim().is_empty() {
        config.set_news_api_key(news_key.trim().to_string());
    }
    config.set_units(units);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(dashboard: &Dashboard, address: &str, wait: Duration) -> anyhow::Result<()> {
    let headlines = dashboard.start();

    let status = submit_and_wait(dashboard, address, wait).await;

    if let Some(task) = headlines {
        if timeout(wait, task).await.is_err() {
            tracing::warn!("headlines did not arrive in time");
        }
    }

    print!("{}", render::dashboard(&dashboard.view(), status.as_deref()));
    Ok(())
}

async fn interactive(dashboard: &Dashboard, wait: Duration) -> anyhow::Result<()> {
    dashboard.start();

    loop {
        let input = match Text::new("Enter city, zip, etc.:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e).context("Failed to read location"),
        };

        let status = submit_and_wait(dashboard, &input, wait).await;
        print!("{}", render::dashboard(&dashboard.view(), status.as_deref()));
    }

    Ok(())
}

/// Submit `input` and wait for the forecast of that place to settle.
///
/// Returns a status line for the user when nothing new will be shown.
async fn submit_and_wait(dashboard: &Dashboard, input: &str, wait: Duration) -> Option<String> {
    match dashboard.search(input, wait).await {
        Ok(outcome) => outcome_status(outcome).map(str::to_string),
        Err(e) => Some(e.user_message().to_string()),
    }
}

fn outcome_status(outcome: ForecastOutcome) -> Option<&'static str> {
    match outcome {
        ForecastOutcome::Updated => None,
        ForecastOutcome::Unchanged => {
            Some("Weather could not be updated; showing the last forecast.")
        }
        ForecastOutcome::Pending => Some("The forecast is taking longer than expected."),
    }
}
