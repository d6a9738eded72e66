use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use storage::{HistoryStore, Storage, ThemeStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wizard_core::{
    FormSchema, HttpPredictionTransport, ResultPresenter, SubmissionController, Transition,
    WizardController,
};

mod commands;
mod config;
mod render;

use commands::{parse_command, Command, CommandError, ThemeChoice, HELP};
use config::{read_settings_file, resolve_settings, Overrides, SETTINGS_FILE};
use render::{render_history, render_view, Palette, EMPTY_HISTORY};

#[derive(Parser, Debug)]
#[command(about = "Multi-step crop yield prediction form")]
struct Args {
    /// Prediction server base url.
    #[arg(long)]
    server_url: Option<String>,
    /// SQLite url for history and theme.
    #[arg(long)]
    database_url: Option<String>,
    /// TOML form schema replacing the built-in one.
    #[arg(long)]
    schema: Option<String>,
    #[arg(long)]
    request_timeout_secs: Option<u64>,
    /// Settings file.
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
    /// Disable ANSI colors.
    #[arg(long)]
    no_color: bool,
}

const ANIMATION_POLL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let file_cfg = read_settings_file(&args.config)?;
    let settings = resolve_settings(
        file_cfg.as_ref(),
        |key| std::env::var(key).ok(),
        Overrides {
            server_url: args.server_url,
            database_url: args.database_url,
            schema_path: args.schema,
            request_timeout_secs: args.request_timeout_secs,
        },
    );
    info!(
        server_url = %settings.server_url,
        database_url = %settings.database_url,
        "settings resolved"
    );

    let storage = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open database '{}'", settings.database_url))?;
    let history = HistoryStore::new(storage.clone());
    let themes = ThemeStore::new(storage);

    let mut schema = load_schema(settings.schema_path.as_deref())?;
    let transport =
        HttpPredictionTransport::with_timeout(&settings.server_url, settings.request_timeout())?;
    match transport.fetch_options().await {
        Ok(options) => schema.apply_options(&options),
        Err(error) => warn!(
            error = %format!("{error:#}"),
            "select options unavailable; any value is accepted"
        ),
    }

    let mut controller = WizardController::new(
        schema,
        SubmissionController::new(Arc::new(transport)),
        ResultPresenter::new(Arc::new(history.clone())),
    );
    let color = !args.no_color && std::io::stdout().is_terminal();
    let mut palette = Palette::for_theme(themes.current().await, color);

    println!("{}", render_view(&controller.view(), controller.schema(), palette));
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(error) => {
                println!("{error}");
                continue;
            }
        };

        match command {
            Command::Set { field, value } => {
                if let Err(error) = controller.set_field(&field, value) {
                    println!("{error}");
                    continue;
                }
            }
            Command::Next => {
                if controller.next() == Transition::Blocked {
                    println!("Fix the highlighted fields to continue.");
                }
            }
            Command::Back => {
                controller.previous();
            }
            Command::Reset => controller.reset(),
            Command::Submit => {
                let mut stdout = std::io::stdout();
                let sent = submit_showing_progress(&mut controller, palette, &mut stdout)
                    .await
                    .context("failed to write to stdout")?;
                if sent {
                    if let Err(error) = follow_animation(&controller, &mut stdout).await {
                        warn!(%error, "result animation stopped");
                    }
                } else if controller.current_step() < controller.total_steps() {
                    println!("Submit is available on the last step.");
                }
            }
            Command::ClearHistory => {
                history.clear().await;
                println!("{EMPTY_HISTORY}");
                continue;
            }
            Command::History => {
                print!("{}", render_history(&history.entries().await));
                continue;
            }
            Command::Theme(choice) => {
                let theme = match choice {
                    ThemeChoice::Show => themes.current().await,
                    ThemeChoice::Set(theme) => {
                        themes.set_theme(theme).await;
                        theme
                    }
                    ThemeChoice::Toggle => themes.toggle().await,
                };
                palette = Palette::for_theme(theme, color);
                println!("theme: {}", theme.as_str());
            }
            Command::Show => {}
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
        }

        println!("{}", render_view(&controller.view(), controller.schema(), palette));
    }

    info!("wizard closed");
    Ok(())
}

fn load_schema(path: Option<&str>) -> Result<FormSchema> {
    let Some(path) = path else {
        return Ok(FormSchema::crop_yield());
    };
    let raw = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read form schema '{path}'"))?;
    FormSchema::from_toml_str(&raw).with_context(|| format!("invalid form schema '{path}'"))
}

/// Draws the busy form while the request is in flight. Returns whether a
/// request was sent.
async fn submit_showing_progress(
    controller: &mut WizardController,
    palette: Palette,
    out: &mut impl Write,
) -> std::io::Result<bool> {
    let Some(pending) = controller.begin_submit() else {
        return Ok(false);
    };
    writeln!(out, "{}", render_view(&controller.view(), controller.schema(), palette))?;
    out.flush()?;
    let outcome = pending.send().await;
    controller.finish_submit(pending, &outcome).await;
    Ok(true)
}

/// Redraws the result value in place until the count-up finishes.
async fn follow_animation(
    controller: &WizardController,
    out: &mut impl Write,
) -> std::io::Result<()> {
    let mut animated = false;
    while controller.is_result_animating() {
        animated = true;
        let result = controller.result();
        write!(out, "\r  {} {}", result.value_text, result.unit)?;
        out.flush()?;
        tokio::time::sleep(ANIMATION_POLL).await;
    }
    if animated {
        writeln!(out)?;
    }
    Ok(())
}
