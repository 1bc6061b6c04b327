//! Example: Arm the panel, trip a zone, and print what a listener sees.

use std::sync::Arc;

use alarm_panel::{
    AlarmMode, AlarmPanel, MemoryStore, PanelMessage, PanelNodeConfig, StateReply, StateRequest,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let panel = AlarmPanel::new(
        PanelNodeConfig::builder().name("Demo Panel").build(),
        Arc::new(MemoryStore::new()),
    );

    let (listener, mut states) = alarm_panel::channel_listener();
    panel.register_state_listener("printer", listener).await;

    let printer = tokio::spawn(async move {
        while let Some(msg) = states.recv().await {
            println!("listener: {}", serde_json::to_string(&msg).unwrap_or_default());
        }
    });

    let requests = [
        // Home: the door is not armed, nothing happens
        PanelMessage::new(StateRequest::zone("front_door", &[AlarmMode::Away, AlarmMode::Night])),
        PanelMessage::new(StateRequest::target(AlarmMode::Away)),
        PanelMessage::new(StateRequest::zone("front_door", &[AlarmMode::Away, AlarmMode::Night])),
        PanelMessage::new(StateRequest::target(AlarmMode::Off)),
    ];

    for msg in requests {
        let result = panel.set_state(msg).await;
        println!("reply: {}", serde_json::to_string(&StateReply::from(&result))?);
        if let Ok(outcome) = result
            && let Some(fan_out) = outcome.fan_out
        {
            fan_out.join().await;
        }
    }

    // Wait for the registration snapshot before exiting
    tokio::time::sleep(panel.config().registration_delay()).await;
    drop(panel);
    printer.await?;
    Ok(())
}
