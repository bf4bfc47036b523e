//! The control-socket side of spec.md §7's "viewer/telnet endpoint": a
//! tiny line protocol over a Unix domain socket, grounded on the same
//! request/response-per-connection shape `olsrv2ctl`'s REPL expects.
//! One command per line, response lines terminated by a lone `.`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use oonf_core::inspect::Snapshot;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

pub async fn serve(socket_path: impl AsRef<Path>, snapshot: Arc<Mutex<Snapshot>>) -> std::io::Result<()> {
    let path = socket_path.as_ref();
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path)?;
    tracing::info!(path = %path.display(), "control socket listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let snapshot = Arc::clone(&snapshot);
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, snapshot).await {
                tracing::debug!(error = %e, "control client disconnected");
            }
        });
    }
}

async fn handle_client(stream: UnixStream, snapshot: Arc<Mutex<Snapshot>>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.eq_ignore_ascii_case("quit") {
            break;
        }
        let rendered = {
            let snap = snapshot.lock().expect("snapshot mutex poisoned");
            snap.render(command)
        };
        for out in rendered {
            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer.write_all(b".\n").await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn status_request_is_terminated_by_a_lone_dot() {
        let mut snapshot = Snapshot::default();
        snapshot.originator = "10.0.0.1".into();
        let snapshot = Arc::new(Mutex::new(snapshot));

        let (client, server) = UnixStream::pair().expect("socket pair");
        let task = tokio::spawn(handle_client(server, snapshot));

        let (mut read_half, mut write_half) = client.into_split();
        write_half.write_all(b"status\nquit\n").await.unwrap();
        drop(write_half);

        let mut buf = String::new();
        read_half.read_to_string(&mut buf).await.unwrap();
        task.await.unwrap().unwrap();

        let lines: Vec<&str> = buf.lines().collect();
        assert_eq!(lines[0], "originator 10.0.0.1");
        assert_eq!(lines[1], "0 neighbors, 0 routes");
        assert_eq!(lines[2], ".");
    }

    #[tokio::test]
    async fn quit_closes_the_connection_without_a_response() {
        let snapshot = Arc::new(Mutex::new(Snapshot::default()));
        let (client, server) = UnixStream::pair().expect("socket pair");
        let task = tokio::spawn(handle_client(server, snapshot));

        let (mut read_half, mut write_half) = client.into_split();
        write_half.write_all(b"quit\n").await.unwrap();
        drop(write_half);

        let mut buf = String::new();
        read_half.read_to_string(&mut buf).await.unwrap();
        task.await.unwrap().unwrap();
        assert!(buf.is_empty());
    }
}
