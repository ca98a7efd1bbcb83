pub mod protocol;

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::pairing::KeyStore;
use protocol::Command;

/// What to do with one input line
enum Reply {
    Line(String),
    Skip,
    Quit,
}

/// Run the pairing console until EOF or `quit`
///
/// Reads one command per line from `reader` and writes one `OK ...` or
/// `ERR ...` line per command to `writer`.
pub async fn run_console<R, W>(
    store: Arc<KeyStore>,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        match respond(&store, &line)? {
            Reply::Line(response) => write_line(&mut writer, &response).await?,
            Reply::Skip => continue,
            Reply::Quit => break,
        }
    }

    Ok(())
}

/// Read lines from a blocking source on a dedicated thread
///
/// The thread is detached and ends at EOF, on a read error, or when the
/// next line arrives after the receiver is gone. Shutdown never waits on it.
pub fn spawn_line_reader<R>(reader: R) -> anyhow::Result<mpsc::Receiver<io::Result<String>>>
where
    R: io::BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })
        .map_err(|e| anyhow::anyhow!("Failed to spawn console input thread: {}", e))?;
    Ok(rx)
}

/// Run the console over lines from [`spawn_line_reader`]
///
/// Stops at EOF, on `quit`, or as soon as `shutdown` completes, even while
/// the input thread is still blocked in a read.
pub async fn serve<W, F>(
    store: Arc<KeyStore>,
    mut lines: mpsc::Receiver<io::Result<String>>,
    mut writer: W,
    shutdown: F,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.recv() => match line {
                Some(line) => line?,
                None => break,
            },
            _ = &mut shutdown => {
                info!("Console interrupted");
                break;
            }
        };

        match respond(&store, &line)? {
            Reply::Line(response) => write_line(&mut writer, &response).await?,
            Reply::Skip => continue,
            Reply::Quit => break,
        }
    }

    Ok(())
}

fn respond(store: &KeyStore, line: &str) -> anyhow::Result<Reply> {
    match Command::parse(line) {
        Ok(Some(command)) => {
            debug!("Console command: {}", command);
            match handle_command(store, command)? {
                Some(response) => Ok(Reply::Line(response)),
                None => {
                    info!("Console closed by quit command");
                    Ok(Reply::Quit)
                }
            }
        }
        Ok(None) => Ok(Reply::Skip),
        Err(e) => {
            warn!("Rejected console input: {}", e);
            Ok(Reply::Line(format!("ERR {}", e)))
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.flush().await
}

/// Execute one command; `None` means the console should stop
fn handle_command(store: &KeyStore, command: Command) -> anyhow::Result<Option<String>> {
    let response = match command {
        Command::Generate { device_id } => match store.generate(&device_id) {
            Some(key) => format!("OK {}", key),
            None => "ERR exhausted".to_string(),
        },
        Command::Redeem { key } => match store.redeem(&key) {
            Some(device_id) => format!("OK {}", device_id),
            None => "ERR not found".to_string(),
        },
        Command::Purge => format!("OK {}", store.purge_expired()),
        Command::Stats => format!("OK {}", serde_json::to_string(&store.stats())?),
        Command::Quit => return Ok(None),
    };
    Ok(Some(response))
}
