//! Main run loop: presence monitor, orchestrator and operator shell

use std::io::{BufRead, Write};
use std::sync::atomic::Ordering;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use macropad::player::PlayerStatus;
use macropad::shell::HELP;
use macropad::{
    CommandPlayer, Config, Orchestrator, OrchestratorError, PresenceHandle, PresenceMonitor,
    ProfileLibrary, ShellCommand,
};
use macropad_transport::SerialPortWatcher;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How often the shell loop checks for Ctrl-C
const INPUT_POLL: Duration = Duration::from_millis(200);

pub fn run(config: &Config, connect: bool, port: Option<String>) -> anyhow::Result<()> {
    let mut config = config.clone();
    if port.is_some() {
        config.default_port = port;
    }

    let profiles_dir = config.profiles_dir();
    let library = match ProfileLibrary::load_from_directory(&profiles_dir) {
        Ok(library) => library,
        Err(e) => {
            warn!("No profiles loaded: {}", e);
            ProfileLibrary::new()
        }
    };

    let mut orchestrator = Orchestrator::new(
        config.session_config(""),
        config.default_port.clone(),
        config.chord_map(),
        Box::new(CommandPlayer::new(config.player.clone())),
        library,
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let watcher = SerialPortWatcher::new(config.poll_interval());
    let monitor = PresenceMonitor::new(Box::new(watcher), config.presence_config(), events_tx);
    orchestrator.attach_presence(monitor.control());
    let orchestrator = Arc::new(Mutex::new(orchestrator));

    info!("Watching for {}", config.device_id);
    let mut presence = monitor.spawn();

    // Presence events are applied on their own thread so a slow open never
    // stalls the shell
    let pump = {
        let orchestrator = Arc::clone(&orchestrator);
        thread::Builder::new()
            .name("macropad-orchestrator".into())
            .spawn(move || {
                while let Some(event) = events_rx.blocking_recv() {
                    orchestrator.lock().handle_presence(event);
                }
            })
            .expect("Failed to spawn orchestrator thread")
    };

    if connect {
        match orchestrator.lock().connect_default() {
            Ok(port) => println!("Connected to {port}"),
            Err(e) => println!("Failed to connect: {e}"),
        }
    }

    let running = super::setup_interrupt_handler();
    let lines = spawn_stdin_reader();
    println!("Type help for commands");
    prompt();

    while running.load(Ordering::SeqCst) {
        let line = match lines.recv_timeout(INPUT_POLL) {
            Ok(line) => line,
            Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        };
        match ShellCommand::parse(&line) {
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => execute(&orchestrator, &presence, &config, command),
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }
        prompt();
    }

    info!("Shutting down");
    presence.stop();
    let _ = pump.join();
    orchestrator.lock().shutdown();
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Forward stdin lines; the channel closes on EOF
fn spawn_stdin_reader() -> std_mpsc::Receiver<String> {
    let (tx, rx) = std_mpsc::channel();
    thread::Builder::new()
        .name("macropad-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .expect("Failed to spawn stdin thread");
    rx
}

fn execute(
    orchestrator: &Mutex<Orchestrator>,
    presence: &PresenceHandle,
    config: &Config,
    command: ShellCommand,
) {
    let mut orch = orchestrator.lock();
    let result: Result<(), OrchestratorError> = match command {
        ShellCommand::Quit => Ok(()),
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Buttons => {
            match orch.buttons() {
                Some(buttons) => {
                    for (index, held) in buttons.iter().enumerate() {
                        println!("    {index}: {}", if *held { "down" } else { "up" });
                    }
                }
                None => println!("No device session"),
            }
            Ok(())
        }
        ShellCommand::Lights => {
            match orch.lights() {
                Some(lights) if lights.is_empty() => println!("No lights set"),
                Some(lights) => {
                    for (id, rgb) in lights {
                        println!("    {id}: {rgb}");
                    }
                }
                None => println!("No device session"),
            }
            Ok(())
        }
        ShellCommand::Connect => orch
            .connect_default()
            .map(|port| println!("Connected to {port}")),
        ShellCommand::KeyboardMode(on) => orch.set_keyboard_mode(on),
        ShellCommand::LoadProfile(name) => orch.load_profile(&name),
        ShellCommand::Profiles => {
            let active = orch.active_profile();
            for name in orch.profile_names() {
                let marker = if Some(name) == active { "*" } else { " " };
                println!("  {marker} {name}");
            }
            if active.is_none() {
                println!("No profile loaded");
            }
            Ok(())
        }
        ShellCommand::Status => {
            println!("Presence: {}", presence.state());
            println!("Session:  {}", orch.session_state());
            refresh_player_lights(&orch, config)
        }
    };
    if let Err(e) = result {
        println!("{e}");
    }
}

/// Read the now-playing file and update the status lights
fn refresh_player_lights(orch: &Orchestrator, config: &Config) -> Result<(), OrchestratorError> {
    let Some(path) = &config.player.now_playing_file else {
        return Ok(());
    };
    if orch.session().is_none() {
        return Ok(());
    }
    match PlayerStatus::read_now_playing(path, &config.player.now_playing_format) {
        Ok(mut status) => {
            status.stop_after = orch.stop_after_current();
            println!(
                "Player:   {} {} - {}",
                if status.playing { "playing" } else { "stopped" },
                status.artist,
                status.title
            );
            orch.show_player_status(&status)
        }
        Err(e) => {
            println!("{e}");
            Ok(())
        }
    }
}
