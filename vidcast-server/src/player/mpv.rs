use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::Command;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};
use vidcast_core::player::{Player, PlayerError, PlayerEvent, PlayerResult};

use crate::infra::config::PlayerConfig;

/// mpv creates the IPC socket shortly after start; poll for it rather than
/// racing the process.
const IPC_CONNECT_ATTEMPTS: u32 = 50;
const IPC_CONNECT_DELAY: Duration = Duration::from_millis(100);

/// Properties like duration are unavailable for a moment after a source
/// switch while demuxing starts.
const PROPERTY_RETRY_ATTEMPTS: u32 = 10;
const PROPERTY_RETRY_DELAY: Duration = Duration::from_millis(200);

const REQUEST_QUEUE_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 8;

struct IpcRequest {
    command: Value,
    reply: oneshot::Sender<PlayerResult<Value>>,
}

struct MpvProcess {
    requests: mpsc::Sender<IpcRequest>,
}

/// `Player` adapter over an mpv process driven through its JSON IPC socket.
///
/// The process is spawned lazily on the first cast and reused across casts
/// (a `loadfile` replaces the source without a visible handoff gap).
/// Termination, whatever the cause, is reported once on the event channel.
pub struct MpvPlayer {
    config: PlayerConfig,
    process: Mutex<Option<MpvProcess>>,
    running: Arc<AtomicBool>,
    events: broadcast::Sender<PlayerEvent>,
}

impl std::fmt::Debug for MpvPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpvPlayer")
            .field("binary", &self.config.binary)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl MpvPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            process: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    async fn spawn_process(&self) -> PlayerResult<MpvProcess> {
        let socket = &self.config.ipc_socket;
        // A stale socket from a crashed run would make the connect below
        // attach to nothing.
        let _ = std::fs::remove_file(socket);

        let mut command = Command::new(&self.config.binary);
        command
            .arg(format!("--input-ipc-server={}", socket.display()))
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg("--force-window=yes")
            .arg("--loop-file=inf")
            .arg(&self.config.loading_screen)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if self.config.fullscreen {
            command.arg("--fullscreen");
        }

        let mut child = command.spawn()?;

        let mut stream = None;
        for _ in 0..IPC_CONNECT_ATTEMPTS {
            match UnixStream::connect(socket).await {
                Ok(connected) => {
                    stream = Some(connected);
                    break;
                }
                Err(_) => tokio::time::sleep(IPC_CONNECT_DELAY).await,
            }
        }
        let Some(stream) = stream else {
            let _ = child.start_kill();
            return Err(PlayerError::Ipc(format!(
                "IPC socket {} never became connectable",
                socket.display()
            )));
        };

        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        tokio::spawn(run_ipc_actor(stream, requests_rx));

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let events = self.events.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!(%status, "player process exited"),
                Err(err) => warn!(%err, "failed waiting on player process"),
            }
            running.store(false, Ordering::SeqCst);
            let _ = events.send(PlayerEvent::Closed);
        });

        info!(binary = %self.config.binary.display(), "spawned player process");
        Ok(MpvProcess {
            requests: requests_tx,
        })
    }

    async fn sender(&self) -> PlayerResult<mpsc::Sender<IpcRequest>> {
        let slot = self.process.lock().await;
        match slot.as_ref() {
            Some(process) if self.running.load(Ordering::SeqCst) => Ok(process.requests.clone()),
            _ => Err(PlayerError::NotRunning),
        }
    }

    async fn request(&self, command: Value) -> PlayerResult<Value> {
        let sender = self.sender().await?;
        request_on(&sender, command).await
    }

    async fn get_f64(&self, property: &str) -> PlayerResult<f64> {
        let value = self.request(json!(["get_property", property])).await?;
        value
            .as_f64()
            .ok_or_else(|| PlayerError::Protocol(format!("{property} is not a number: {value}")))
    }

    async fn get_f64_retry(&self, property: &str) -> PlayerResult<f64> {
        let mut last = PlayerError::Ipc(format!("{property} unavailable"));
        for _ in 0..PROPERTY_RETRY_ATTEMPTS {
            match self.get_f64(property).await {
                Ok(value) => return Ok(value),
                Err(PlayerError::Ipc(msg)) if msg.contains("unavailable") => {
                    last = PlayerError::Ipc(msg);
                    tokio::time::sleep(PROPERTY_RETRY_DELAY).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last)
    }
}

#[async_trait]
impl Player for MpvPlayer {
    async fn show_loading(&self) -> PlayerResult<()> {
        let mut slot = self.process.lock().await;
        if let Some(process) = slot.as_ref()
            && self.running.load(Ordering::SeqCst)
        {
            // Reuse the running process so the screen never goes blank
            // between the old source and the placeholder.
            let screen = self.config.loading_screen.display().to_string();
            request_on(&process.requests, json!(["loadfile", screen, "replace"])).await?;
            request_on(&process.requests, json!(["set_property", "loop-file", "inf"])).await?;
            request_on(&process.requests, json!(["set_property", "pause", false])).await?;
            return Ok(());
        }
        *slot = Some(self.spawn_process().await?);
        Ok(())
    }

    async fn load(&self, url: &str) -> PlayerResult<()> {
        let sender = self.sender().await?;
        request_on(&sender, json!(["set_property", "loop-file", "no"])).await?;
        request_on(&sender, json!(["loadfile", url, "replace"])).await?;
        request_on(&sender, json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn play(&self) -> PlayerResult<()> {
        self.request(json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.request(json!(["set_property", "pause", true])).await?;
        Ok(())
    }

    async fn seek(&self, offset_secs: f64) -> PlayerResult<()> {
        self.request(json!(["seek", offset_secs, "relative"])).await?;
        Ok(())
    }

    async fn position(&self) -> PlayerResult<f64> {
        self.get_f64("time-pos").await
    }

    async fn set_position(&self, secs: f64) -> PlayerResult<f64> {
        self.request(json!(["set_property", "time-pos", secs]))
            .await?;
        // Report what the player actually landed on; around a seek the
        // property can momentarily be unavailable, in which case the
        // requested position is the best answer.
        match self.get_f64("time-pos").await {
            Ok(actual) => Ok(actual),
            Err(_) => Ok(secs),
        }
    }

    async fn duration(&self) -> PlayerResult<f64> {
        self.get_f64_retry("duration").await
    }

    async fn volume(&self) -> PlayerResult<f64> {
        self.get_f64("volume").await
    }

    async fn set_volume(&self, volume: f64) -> PlayerResult<f64> {
        self.request(json!(["set_property", "volume", volume]))
            .await?;
        Ok(volume)
    }

    async fn increase_volume(&self) -> PlayerResult<()> {
        self.request(json!(["add", "volume", self.config.volume_step]))
            .await?;
        Ok(())
    }

    async fn decrease_volume(&self) -> PlayerResult<()> {
        self.request(json!(["add", "volume", -self.config.volume_step]))
            .await?;
        Ok(())
    }

    async fn increase_speed(&self) -> PlayerResult<()> {
        self.request(json!(["multiply", "speed", self.config.speed_factor]))
            .await?;
        Ok(())
    }

    async fn decrease_speed(&self) -> PlayerResult<()> {
        self.request(json!(["multiply", "speed", 1.0 / self.config.speed_factor]))
            .await?;
        Ok(())
    }

    async fn show_subtitles(&self) -> PlayerResult<()> {
        self.request(json!(["set_property", "sub-visibility", true]))
            .await?;
        Ok(())
    }

    async fn hide_subtitles(&self) -> PlayerResult<()> {
        self.request(json!(["set_property", "sub-visibility", false]))
            .await?;
        Ok(())
    }

    async fn quit(&self) -> PlayerResult<()> {
        // The process may exit before replying; the exit watcher reports
        // the termination either way.
        if let Err(err) = self.request(json!(["quit"])).await {
            debug!(%err, "no reply to quit, process presumably exiting");
        }
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

/// Send one command through the actor and wait for its matched reply.
async fn request_on(sender: &mpsc::Sender<IpcRequest>, command: Value) -> PlayerResult<Value> {
    let (reply_tx, reply_rx) = oneshot::channel();
    sender
        .send(IpcRequest {
            command,
            reply: reply_tx,
        })
        .await
        .map_err(|_| PlayerError::NotRunning)?;
    reply_rx.await.map_err(|_| PlayerError::NotRunning)?
}

/// Owns the IPC socket: serializes outbound commands, matches replies to
/// callers by request id, and drops mpv's own event notifications.
async fn run_ipc_actor(stream: UnixStream, mut requests: mpsc::Receiver<IpcRequest>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut pending: HashMap<u64, oneshot::Sender<PlayerResult<Value>>> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(IpcRequest { command, reply }) = request else { break };
                let id = next_id;
                next_id += 1;

                let mut line = json!({ "command": command, "request_id": id }).to_string();
                line.push('\n');
                if let Err(err) = write_half.write_all(line.as_bytes()).await {
                    let _ = reply.send(Err(PlayerError::Io(err)));
                    break;
                }
                pending.insert(id, reply);
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_reply(&line, &mut pending),
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(PlayerError::NotRunning));
    }
}

fn handle_reply(line: &str, pending: &mut HashMap<u64, oneshot::Sender<PlayerResult<Value>>>) {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        trace!(line, "unparseable IPC line");
        return;
    };

    let Some(id) = value.get("request_id").and_then(Value::as_u64) else {
        // Unsolicited mpv event; process termination is watched separately.
        trace!(event = ?value.get("event"), "ignoring player event");
        return;
    };

    let Some(reply) = pending.remove(&id) else {
        return;
    };

    let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown");
    let result = if error == "success" {
        Ok(value.get("data").cloned().unwrap_or(Value::Null))
    } else {
        Err(PlayerError::Ipc(error.to_owned()))
    };
    let _ = reply.send(result);
}
