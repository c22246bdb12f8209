use std::{
    io::{self, BufRead},
    thread,
};

use tokio::sync::broadcast::Sender;
use tracing::{debug, error, info, trace, warn};

use crate::models::user_command::UserCommand;

/// Spawn the thread reading user commands from stdin.
///
/// Reading stdin blocks, so this runs on its own thread rather than on the
/// runtime. The thread ends at end of input or once nobody listens for
/// commands; it is never joined.
pub fn spawn_console_reader(tx_commands: Sender<UserCommand>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = io::stdin();
            forward_user_commands(stdin.lock(), &tx_commands);
        })
}

/// Parse every line of `reader` as a command and broadcast it.
/// Lines that don't parse are reported and skipped. Returns the number of
/// commands sent.
#[tracing::instrument(skip_all)]
pub fn forward_user_commands(reader: impl BufRead, tx_commands: &Sender<UserCommand>) -> usize {
    info!("Started.");
    let mut sent = 0;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read from console. Error: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            trace!("Skipping blank line.");
            continue;
        }

        let command = match line.parse::<UserCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("Ignoring console input '{}'. Error: {}", line.trim(), e);
                continue;
            }
        };

        debug!("Got user command: {}", command);
        if let Err(e) = tx_commands.send(command) {
            warn!("Nobody is listening for commands. Error: {}", e);
            break;
        }
        sent += 1;
    }

    info!("Console input closed.");
    sent
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::sync::broadcast;

    use super::*;

    #[test]
    fn test_forwards_valid_commands_and_skips_the_rest() {
        let (tx, mut rx) = broadcast::channel(8);
        let input = Cursor::new("select battery\n\nbogus\nconnect 10.0.0.2\nquit\n");

        let sent = forward_user_commands(input, &tx);

        assert_eq!(sent, 3);
        assert_eq!(rx.try_recv().unwrap(), UserCommand::Select("battery".into()));
        assert_eq!(rx.try_recv().unwrap(), UserCommand::Connect("10.0.0.2".into()));
        assert_eq!(rx.try_recv().unwrap(), UserCommand::Quit);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stops_when_nobody_listens() {
        let (tx, rx) = broadcast::channel::<UserCommand>(8);
        drop(rx);
        let input = Cursor::new("clear\nclear\n");

        assert_eq!(forward_user_commands(input, &tx), 0);
    }
}
