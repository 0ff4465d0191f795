use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use board_client::api::{GameApi, HttpApi};
use board_client::config::{ClientConfig, Timings};
use board_client::console::{self, Command, HELP};
use board_client::events::{ClientEvent, EventSink};
use board_client::model::Board;
use board_client::store::{poller, PlayerStore};
use board_client::telemetry;
use board_client::turn::TurnMachine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = ClientConfig::from_env().context("loading client config")?;
    let api: Arc<dyn GameApi> = Arc::new(HttpApi::new(&config).context("building http client")?);
    let store = PlayerStore::new();
    let (events, mut event_rx) = EventSink::channel();
    let machine = TurnMachine::new(Arc::clone(&api), store.clone(), Arc::new(Board::classic()), Timings::default(), events);

    let me = machine.load().await.context("loading current player")?;
    info!(player = me.id, name = %me.name, sector = me.sector_id, "signed in");

    let cancel = CancellationToken::new();
    let poller = tokio::spawn(poller::run(Arc::clone(&api), store, config.poll_interval, cancel.clone()));
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ClientEvent::TokenMoved { .. } | ClientEvent::TrainMoved { .. } => {}
                ClientEvent::ToastShown { message, .. } => println!("! {message}"),
                ClientEvent::DiceRevealed { roll, .. } => println!("dice: {} + {}", roll.data[0], roll.data[1]),
                ClientEvent::MapCompleted { .. } => println!("map completed!"),
                other => debug!(event = ?other, "client event"),
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match machine.surface() {
            Ok(surface) => println!("> {}", console::describe(&surface)),
            Err(err) if err.is_fatal() => {
                cancel.cancel();
                return Err(err).context("server sent a turn state this client cannot handle");
            }
            Err(err) => warn!(error = %err, "no surface"),
        }
        let Some(line) = lines.next_line().await? else { break };
        let cmd = match console::parse(&line) {
            Ok(cmd) => cmd,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match cmd {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Status => {
                if let Some(me) = machine.store().me() {
                    println!("{} on sector {}, score {:.2}, cards {:?}", me.name, me.sector_id, me.total_score, me.card_types().collect::<Vec<_>>());
                }
            }
            cmd => match console::dispatch(&machine, cmd).await {
                Ok(outcome) => debug!(?outcome, "action done"),
                Err(err) if err.is_fatal() => {
                    cancel.cancel();
                    return Err(err).context("turn aborted");
                }
                Err(err) => println!("{err}"),
            },
        }
    }

    cancel.cancel();
    poller.await.context("poller task")?;
    info!("bye");
    Ok(())
}
