// Headless front end: launches the configured version and mirrors the event
// channel to stdout until the game exits.

use std::process::ExitCode;

use minelite::core::events::{EventSink, LauncherEvent};
use minelite::core::launch::{LaunchRequest, Orchestrator};
use minelite::core::state::LauncherSettings;

#[tokio::main]
async fn main() -> ExitCode {
    minelite::init_logging();

    let settings = LauncherSettings::load();
    let request = LaunchRequest {
        username: settings.username.clone(),
        minecraft_version: settings.game_version.clone(),
        loader: settings.loader,
    };

    let (events, mut rx) = EventSink::channel();
    let orchestrator = match Orchestrator::new(settings, events) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = orchestrator.launch(request).await {
        eprintln!("Launch failed: {}", e);
        return ExitCode::FAILURE;
    }

    while let Some(event) = rx.recv().await {
        match event {
            LauncherEvent::Log { line } => println!("{}", line),
            LauncherEvent::Progress { task, total } => {
                if task == total {
                    println!("[{}/{}] done", task, total);
                }
            }
            LauncherEvent::Launched => println!("Game process started"),
            LauncherEvent::Stopped { code } => {
                println!("Game exited with code {}", code);
                return if code == 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                };
            }
        }
    }
    ExitCode::SUCCESS
}
