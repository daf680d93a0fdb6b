//! Aula Wordle Demo
//!
//! Runs a full classroom session inside one process: a coordinator opens a
//! room on the in-process transport, three participants join, a word is
//! launched, guessed, stopped, and the podiums are reported.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use aula_wordle::config::SessionConfig;
use aula_wordle::network::{
    generate_room_code, Coordinator, MemoryHub, Participant, PeerAddress,
};
use aula_wordle::{GuessOutcome, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Aula Wordle v{}", VERSION);

    let config = SessionConfig::from_env();
    let provided_code = std::env::args().nth(1);
    if !config.gate_allows(provided_code.as_deref()) {
        anyhow::bail!("instructor access code rejected");
    }
    info!("Max attempts per round: {}", config.max_attempts);

    demo_session(config).await
}

/// Let spawned link pumps and the coordinator loop catch up.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Demo function to exercise a full session end to end.
async fn demo_session(config: SessionConfig) -> Result<()> {
    info!("=== Opening Room ===");

    let hub = MemoryHub::new();
    let code = generate_room_code(&mut rand::thread_rng());
    let coordinator = Coordinator::new(code.clone());
    info!("Room code: {} (address {})", code, coordinator.address());

    let (_host, host_rx) = hub.endpoint(coordinator.address())?;
    let (handle, actions_rx) = Coordinator::action_channel();
    let loop_task = tokio::spawn(coordinator.run(host_rx, actions_rx));

    // Students join before any word exists; each gets an empty snapshot.
    let mut students = Vec::new();
    for name in ["Ana", "Luis", "Marta"] {
        let (endpoint, events) = hub.endpoint(PeerAddress::ephemeral())?;
        let participant = Participant::join(&endpoint, &code, name, config.max_attempts)?;
        students.push((participant, events, endpoint));
    }
    settle().await;

    info!("=== Launching Word ===");
    handle.launch("raton").await.context("word rejected")?;
    settle().await;
    for (participant, events, _) in &mut students {
        participant.drain_events(events);
        info!(
            "{} sees word of {} letters",
            participant.display_name(),
            participant.replica().word().map_or(0, |w| w.chars().count())
        );
    }

    // Ana needs two tries, Luis one; Marta runs out of attempts.
    let (ana, _, _) = &mut students[0];
    ana.guess("SALON");
    ana.guess("RATON");

    let (luis, _, _) = &mut students[1];
    luis.guess("RATON");

    let (marta, _, _) = &mut students[2];
    let misses = ["COPAS", "MONTE", "PIANO", "LUNES", "VERDE", "PLAZA"];
    for miss in misses.iter().copied().cycle() {
        match marta.guess(miss) {
            GuessOutcome::Playing => continue,
            outcome => {
                info!("Marta is done: {:?}", outcome);
                break;
            }
        }
    }
    settle().await;

    info!("=== Stopping Round ===");
    handle.stop();
    settle().await;

    for (participant, events, _) in &mut students {
        participant.drain_events(events);
    }

    let (ana, _, _) = &students[0];
    let awards = ana
        .replica()
        .awards()
        .context("awards never reached the replicas")?;

    info!("=== Podium: Fastest ===");
    for (place, entry) in awards.fastest.iter().enumerate() {
        info!(
            "#{}: {} - {:.2}s",
            place + 1,
            entry.display_name,
            entry.time_taken_ms as f64 / 1000.0
        );
    }
    info!("=== Podium: Most Efficient ===");
    for (place, entry) in awards.most_efficient.iter().enumerate() {
        info!(
            "#{}: {} - {} attempts",
            place + 1,
            entry.display_name,
            entry.attempts
        );
    }

    info!("=== Resetting Session ===");
    handle.reset();
    settle().await;
    for (participant, events, _) in &mut students {
        participant.drain_events(events);
    }

    handle.shutdown();
    let coordinator = loop_task.await?;
    info!(
        "Session over: {} participants still connected, {} results recorded",
        coordinator.roster().connected_count(),
        coordinator.state().results().len()
    );

    Ok(())
}
