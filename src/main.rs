pub mod channels;
pub mod config;
pub mod externals;
pub mod history;
pub mod models;
pub mod ports;
pub mod projector;
pub mod tasks;

use anyhow::Result;
use config::DashboardSettings;
use externals::{
    console::task::spawn_console_reader,
    render::RenderModule,
    sensor_feed::{control::FeedControl, task::task_manage_sensor_feed},
};
use history::HistoryBuffer;
use tasks::dashboard::{task_dashboard, Dashboard};
use tokio::{signal, sync::broadcast};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = DashboardSettings::load()?;

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(settings.log_level_filter()?)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Loaded settings: {:?}", settings);

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let (tx_batches, rx_batches) = broadcast::channel(32);
    let (tx_connection_state, rx_connection_state) = broadcast::channel(32);
    let (tx_commands, rx_commands) = broadcast::channel(32);

    // NOTE: Used to point the feed at a new host.
    let (tx_connect, rx_connect) = broadcast::channel(8);
    let feed = FeedControl::new(tx_connect, settings.port);

    let token_clone = token.clone();
    tracker.spawn(async {
        task_manage_sensor_feed(token_clone, rx_connect, tx_batches, tx_connection_state).await
    });

    let RenderModule { terminal_surface } = RenderModule::initialize(settings.ansi);
    let dashboard = Dashboard::new(
        terminal_surface,
        HistoryBuffer::new(settings.history_capacity)?,
        settings.selection(),
    );

    let token_clone = token.clone();
    let feed_clone = feed.clone();
    let redraw_interval = settings.redraw_interval();
    tracker.spawn(async move {
        task_dashboard(
            token_clone,
            dashboard,
            redraw_interval,
            feed_clone,
            rx_batches,
            rx_commands,
            rx_connection_state,
        )
        .await;
    });

    spawn_console_reader(tx_commands)?;

    if settings.connect_on_start {
        feed.request(settings.host_address()?)?;
    } else {
        info!("Waiting for a 'connect' command.");
    }

    tokio::select! {
        _ = token.cancelled() => {}
        res = signal::ctrl_c() => {
            match res {
                Ok(_) => {
                    token.cancel();
                },
                Err(e) => {
                    error!("Failed to listen for ctrl_c. Error: {}", e);
                    token.cancel();
                }
            };
        },
    }

    tracker.close();
    tracker.wait().await;

    Ok(())
}
