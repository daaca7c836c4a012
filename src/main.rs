//! Voxgate binary entry point.
//!
//! Initializes all subsystems, starts the recognizer and the global poll
//! loop, then runs the main event loop over host commands until the host
//! says stop, stdin closes, or an interrupt arrives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info, warn};

use voxgate::config;
use voxgate::coordinator::ModeCoordinator;
use voxgate::game::{GameEvent, GameSessionSupervisor};
use voxgate::ipc::{self, emit_error, emit_event, HostCommand, HostEvent};
use voxgate::logger;
use voxgate::recognizer::RecognizerSupervisor;
use voxgate::router::{CommandRouter, GlobalAction, GlobalDispatch, RouteOutcome};
use voxgate::session::Session;
use voxgate::windows::{SystemWindowProbe, WindowProbe};
use voxgate::Command;

/// Global actions are forwarded to the host GUI, which owns the screens
/// and window chrome.
struct HostDispatch;

impl GlobalDispatch for HostDispatch {
    fn perform(&mut self, action: GlobalAction) {
        info!(action = action.name(), "global action");
        emit_event(&HostEvent::ActionPerformed {
            action: action.name().to_string(),
        });
    }
}

#[tokio::main]
async fn main() {
    // Logging goes to stderr + files; stdout carries the host protocol.
    logger::init();
    emit_event(&HostEvent::Starting {});

    let config = config::load();
    info!(channel = %config.channel_path().display(), games = config.games.len(), "configuration loaded");
    let session = Arc::new(Session::new(config));

    // Voice input is best-effort: a recognizer that cannot start leaves
    // the channel silent, and the host keeps working by mouse and key.
    let mut recognizer = RecognizerSupervisor::new(session.config().recognizer.clone());
    if let Err(e) = recognizer.start() {
        error!(error = %e, "recognizer unavailable, voice input disabled");
        emit_error(&format!("recognizer unavailable: {}", e));
    }

    let router = Arc::new(Mutex::new(CommandRouter::new(
        session.auth(),
        Box::new(HostDispatch),
    )));
    let active_context = Arc::new(Mutex::new(String::from("login")));
    let (launch_tx, mut launch_rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let coordinator = ModeCoordinator::new(session.channel());
    {
        let router = Arc::clone(&router);
        let active_context = Arc::clone(&active_context);
        let session = Arc::clone(&session);
        let poll_interval = Duration::from_millis(session.config().poll_interval_ms.max(1));
        let on_command = move |command: Command| {
            emit_event(&HostEvent::CommandDelivered {
                text: command.text.clone(),
            });
            let context = active_context.lock().unwrap().clone();
            let outcome = router.lock().unwrap().route(&command, &context);
            match outcome {
                RouteOutcome::Denied(action) => {
                    emit_event(&HostEvent::AuthDenied {
                        action: action.name().to_string(),
                    });
                }
                RouteOutcome::Ignored => {
                    // Not a screen or global command: maybe a game launch phrase.
                    if let Some(profile) = session.game_for_phrase(&command.text) {
                        let _ = launch_tx.send(profile.name.clone());
                    }
                }
                RouteOutcome::ContextHandled | RouteOutcome::Performed(_) => {}
            }
        };
        if let Err(e) = coordinator.start_global_monitoring(on_command, poll_interval) {
            error!(error = %e, "failed to start channel monitoring");
        }
    }

    let probe: Arc<dyn WindowProbe> = Arc::new(SystemWindowProbe::new());
    let games = GameSessionSupervisor::new(coordinator.clone(), probe);
    games.set_event_hook({
        let coordinator = coordinator.clone();
        move |event| match event {
            GameEvent::Started { name } => {
                emit_event(&HostEvent::GameStarted { name });
                emit_event(&HostEvent::ModeChange {
                    mode: coordinator.mode().to_string(),
                });
            }
            GameEvent::StartTimeout { name } => {
                emit_error(&format!("game '{}' window did not appear", name));
            }
            GameEvent::Ended { name } => {
                emit_event(&HostEvent::GameEnded { name });
                emit_event(&HostEvent::ModeChange {
                    mode: coordinator.mode().to_string(),
                });
            }
        }
    });

    let mut host_rx = ipc::spawn_stdin_reader();
    emit_event(&HostEvent::Ready {});
    info!("voxgate ready");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            maybe_cmd = host_rx.recv() => {
                match maybe_cmd {
                    Some(cmd) => {
                        if !handle_host_command(cmd, &session, &games, &active_context).await {
                            break;
                        }
                    }
                    None => {
                        // stdin closed — host process gone
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
            Some(name) = launch_rx.recv() => {
                launch_game(&name, true, &session, &games).await;
            }
            _ = &mut ctrl_c => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    emit_event(&HostEvent::Stopping {});
    games.teardown().await;
    games.join_monitor().await;
    coordinator.shutdown();
    recognizer.stop().await;
    info!("voxgate shut down");
}

/// Handle a single command from the host.
/// Returns `false` if the main loop should exit.
async fn handle_host_command(
    cmd: HostCommand,
    session: &Arc<Session>,
    games: &GameSessionSupervisor,
    active_context: &Arc<Mutex<String>>,
) -> bool {
    match cmd {
        HostCommand::SetAuth { logged_in } => {
            session.auth().set(logged_in);
        }
        HostCommand::SetContext { context } => {
            info!(context = %context, "active context changed");
            *active_context.lock().unwrap() = context;
        }
        HostCommand::LaunchGame { name, auto_launch } => {
            launch_game(&name, auto_launch, session, games).await;
        }
        HostCommand::StopGame {} => {
            games.teardown().await;
        }
        HostCommand::Ping {} => {
            emit_event(&HostEvent::Pong {});
        }
        HostCommand::Stop {} => {
            return false;
        }
    }
    true
}

async fn launch_game(
    name: &str,
    auto_launch: bool,
    session: &Arc<Session>,
    games: &GameSessionSupervisor,
) {
    let Some(profile) = session.game_by_name(name).cloned() else {
        warn!(game = %name, "unknown game profile");
        emit_error(&format!("unknown game '{}'", name));
        return;
    };
    if let Err(e) = games.launch(&profile, auto_launch).await {
        error!(game = %name, error = %e, "game launch failed");
        emit_error(&format!("failed to launch '{}': {}", name, e));
    }
}
