// ===============================
// src/recorder.rs
// ===============================
//
// Lightweight JSONL recorder:
// - Appends every Event to a .jsonl file.
// - Buffered with BufWriter to save syscalls.
// - Flushes every 1s and/or every 1000 events.
// - Creates the parent directory if missing.
// - On write failure, reopens the file and carries on.
//
// ENV: set `RECORD_FILE=/path/to/events.jsonl` to enable (see main.rs).
//
use std::path::Path;
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info};

use crate::domain::Event;

async fn open_writer(path: &str) -> Option<BufWriter<tokio::fs::File>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!(?e, %path, "recorder: create_dir_all failed");
            }
        }
    }
    match OpenOptions::new().create(true).append(true).open(path).await {
        Ok(file) => Some(BufWriter::new(file)),
        Err(e) => {
            error!(?e, %path, "recorder: open failed, recording disabled");
            None
        }
    }
}

pub async fn run(mut rx: mpsc::Receiver<Event>, path: String) {
    info!(%path, "recorder: started");
    let Some(mut writer) = open_writer(&path).await else {
        // drain so senders never block
        while rx.recv().await.is_some() {}
        return;
    };

    // Periodic flush (every 1s) plus count-based flush
    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut since_last_flush: u32 = 0;
    const FLUSH_EVERY_N_EVENTS: u32 = 1000;

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                match maybe_ev {
                    Some(ev) => {
                        let line = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                error!(?e, "recorder: serialize error, skip event");
                                continue;
                            }
                        };

                        if let Err(e) = writer.write_all(line.as_bytes()).await {
                            error!(?e, "recorder: write failed, attempting reopen");
                            match open_writer(&path).await {
                                Some(w) => writer = w,
                                None => continue,
                            }
                            if let Err(e2) = writer.write_all(line.as_bytes()).await {
                                error!(?e2, "recorder: write failed again after reopen, drop event");
                                continue;
                            }
                        }
                        if let Err(e) = writer.write_all(b"\n").await {
                            error!(?e, "recorder: newline write failed");
                        }

                        since_last_flush += 1;
                        if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                            let _ = writer.flush().await;
                            since_last_flush = 0;
                        }
                    }
                    None => {
                        // Channel closed: flush and exit
                        let _ = writer.flush().await;
                        info!("recorder: channel closed, stopped");
                        break;
                    }
                }
            }

            _ = tick.tick() => {
                let _ = writer.flush().await;
                since_last_flush = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_land_in_the_file_as_jsonl() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.jsonl");
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(run(rx, path.to_string_lossy().into_owned()));

        tx.send(Event::Note("session started".into())).await.unwrap();
        tx.send(Event::Sale {
            items: 2,
            outcome: "completed".into(),
        })
        .await
        .unwrap();
        drop(tx); // close channel -> flush and stop
        handle.await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("session started"));
        assert!(lines[1].contains("completed"));
    }
}
