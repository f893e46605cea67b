use std::io::{self, BufRead};

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::Command;
use crate::input::{Input, parse_line};

/// Feed commands read line by line from `reader` until quit, EOF or
/// cancellation. Ending the input always cancels the pipeline.
pub fn read_commands<R: BufRead>(
    reader: R,
    commands: &Sender<Command>,
    cancel: &CancellationToken,
) {
    for line in reader.lines() {
        if cancel.is_cancelled() {
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("stdin read failed: {err}");
                break;
            }
        };
        match parse_line(&line) {
            Ok(Input::Quit) => {
                info!("quit requested");
                break;
            }
            Ok(Input::Command(command)) => {
                debug!(?command, "input");
                if commands.blocking_send(command).is_err() {
                    debug!("manager gone; stopping input");
                    break;
                }
            }
            Err(err) => warn!(input = %line, "{err}"),
        }
    }
    info!("input closed; initiating shutdown");
    cancel.cancel();
}

pub fn spawn_stdin(commands: Sender<Command>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || read_commands(io::stdin().lock(), &commands, &cancel))
}
