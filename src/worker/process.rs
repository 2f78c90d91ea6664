//! Child side of a process worker
//!
//! Runs one worker with its event stream on stdout, one JSON line per
//! event. Stops on SIGINT/SIGTERM or when stdin reaches end of file,
//! which is how the coordinator asks it to shut down.

use super::{WorkerError, prepare};
use crate::events::{EventSink, WorkerEvent, encode_line};
use crate::plan::WorkerAssignment;
use crate::runtime::{shutdown_channel, shutdown_signal};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, watch};

/// Run a worker process to completion
///
/// `sink` must be the sending side of `events`; the binary creates the
/// pair up front so log capture can be installed before the runtime
/// starts.
///
/// # Errors
/// Returns the worker's failure after reporting it on the event stream.
pub async fn serve(
    assignment: WorkerAssignment,
    sink: EventSink,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
) -> Result<(), WorkerError> {
    let (stop, shutdown) = shutdown_channel();
    tokio::spawn(watch_for_stop(tokio::io::stdin(), stop));

    let (done_tx, done_rx) = oneshot::channel();
    let pump = tokio::spawn(pump_events(events, tokio::io::stdout(), done_rx));

    let result = run_assignment(assignment, sink.clone(), shutdown).await;
    if let Err(e) = &result {
        sink.emit(WorkerEvent::error(e.to_string()));
    }

    let _ = done_tx.send(());
    let _ = pump.await;
    result
}

async fn run_assignment(
    assignment: WorkerAssignment,
    sink: EventSink,
    shutdown: watch::Receiver<bool>,
) -> Result<(), WorkerError> {
    let (transport, scripting) = prepare(&assignment)?;
    super::run(assignment, transport, scripting, sink, shutdown).await?;
    Ok(())
}

/// Flip the shutdown flag on a signal or when `input` closes
async fn watch_for_stop<R>(mut input: R, stop: watch::Sender<bool>)
where
    R: AsyncRead + Unpin,
{
    let eof = async {
        let mut buf = [0u8; 64];
        loop {
            match input.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = eof => {}
        _ = shutdown_signal() => {}
    }
    let _ = stop.send(true);
}

/// Write events as JSON lines until told to finish, then drain
async fn pump_events<W>(
    mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    mut out: W,
    mut done: oneshot::Receiver<()>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => {
                    if write_event(&mut out, &event).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            _ = &mut done => {
                while let Ok(event) = events.try_recv() {
                    if write_event(&mut out, &event).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = out.flush().await;
}

async fn write_event<W>(out: &mut W, event: &WorkerEvent) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode_line(event).map_err(std::io::Error::other)?;
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::decode_line;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pump_writes_lines_and_drains() {
        let (sink, rx) = EventSink::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let (writer, mut reader) = tokio::io::duplex(4096);

        sink.log("one");
        sink.warning("two");
        let pump = tokio::spawn(pump_events(rx, writer, done_rx));
        sink.error("three");
        done_tx.send(()).unwrap();
        pump.await.unwrap();

        let mut output = String::new();
        reader.read_to_string(&mut output).await.unwrap();
        let events: Vec<WorkerEvent> = output.lines().map(|l| decode_line(l).unwrap()).collect();
        assert_eq!(
            events,
            vec![
                WorkerEvent::log("one"),
                WorkerEvent::warning("two"),
                WorkerEvent::error("three"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stdin_eof_requests_shutdown() {
        let (stop, mut shutdown) = shutdown_channel();
        let (writer, reader) = tokio::io::duplex(64);
        let watcher = tokio::spawn(watch_for_stop(reader, stop));

        drop(writer);
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait_for(|s| *s))
            .await
            .unwrap()
            .unwrap();
        watcher.await.unwrap();
    }
}
