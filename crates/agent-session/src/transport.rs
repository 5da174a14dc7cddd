use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::session::{AgentSession, Event, InterfaceHints};

/// Failures spawning or driving the agent child process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("agent session already started")]
    AlreadyStarted,
    #[error("failed to spawn agent process at {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A request from another task into the task that owns an [`AgentSession`].
/// External callers never touch `AgentSession` directly — they hold the
/// [`mpsc::Sender<SessionCommand>`] handed back by [`run`].
#[derive(Debug)]
pub enum SessionCommand {
    SendEthernetFrame(Vec<u8>),
    Stop,
}

const READ_CHUNK: usize = 4096;

/// Spawns the agent executable, pipes its stdio through the link protocol,
/// and drives `session` until the child exits or `commands` is dropped.
///
/// `session` is expected to be otherwise untouched by any other task for the
/// duration of this call — it is `!Sync` by convention, per the
/// single-task-owns-link-state rule. Observed events are forwarded onto
/// `events` as they are produced; a full or closed `events` channel is
/// logged and dropped rather than allowed to stall the link.
pub async fn run(
    session: &mut AgentSession,
    agent_path: &Path,
    hints: &InterfaceHints,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<Event>,
) -> Result<(), TransportError> {
    if session.is_started() {
        return Err(TransportError::AlreadyStarted);
    }

    let mut command = Command::new(agent_path);
    if let Some(name) = &hints.if_name {
        command.arg("-n").arg(name);
    }
    if let Some(mac) = hints.if_mac {
        command.arg("-a").arg(mac.to_string());
    }
    if let Some(mtu) = hints.if_mtu {
        command.arg("-m").arg(mtu.to_string());
    }
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = command.spawn().map_err(|source| TransportError::Spawn {
        path: agent_path.to_path_buf(),
        source,
    })?;
    let mut stdin = child
        .stdin
        .take()
        .expect("child spawned with piped stdin");
    let mut stdout = BufReader::new(
        child
            .stdout
            .take()
            .expect("child spawned with piped stdout"),
    );

    session.mark_started();
    tracing::info!(agent_path = %agent_path.display(), "agent process spawned");

    let mut decoder = byteframe::Decoder::new();
    let mut read_buf = [0u8; READ_CHUNK];
    // Set once stdout reaches EOF. A closed stdout is not proof the child has
    // exited, so the read branch is then disabled and the loop keeps
    // selecting on `child.wait()` (and the command channel) until it has.
    let mut stdout_eof = false;

    loop {
        flush_outbound(session, &mut stdin).await;
        forward_events(session, &events);

        tokio::select! {
            read = stdout.read(&mut read_buf), if !stdout_eof => {
                match read {
                    Ok(0) => {
                        tracing::debug!("agent closed stdout, waiting for process exit");
                        stdout_eof = true;
                    }
                    Ok(n) => {
                        decoder.feed(&read_buf[..n]);
                        while let Some(result) = decoder.next_frame() {
                            match result {
                                Ok(payload) => session.on_inbound(&payload),
                                Err(e) => tracing::debug!("dropping malformed agent frame: {e}"),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("error reading agent stdout: {e}");
                        break;
                    }
                }
            }
            status = child.wait() => {
                tracing::info!(?status, "agent process exited");
                break;
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(SessionCommand::SendEthernetFrame(frame)) => session.send_ethernet_frame(frame),
                    Some(SessionCommand::Stop) => session.stop(),
                    None => tracing::debug!("command channel closed"),
                }
            }
        }
    }

    flush_outbound(session, &mut stdin).await;
    session.on_child_exited();
    forward_events(session, &events);

    Ok(())
}

async fn flush_outbound(session: &mut AgentSession, stdin: &mut tokio::process::ChildStdin) {
    while let Some(payload) = session.next_outbound() {
        let wrapped = byteframe::wrap(&payload);
        if let Err(e) = stdin.write_all(&wrapped).await {
            tracing::warn!("failed writing to agent stdin: {e}");
            break;
        }
    }
}

fn forward_events(session: &mut AgentSession, events: &mpsc::UnboundedSender<Event>) {
    while let Some(event) = session.next_event() {
        if events.send(event).is_err() {
            tracing::debug!("event receiver dropped, discarding subsequent events");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_rejects_double_start() {
        let mut session = AgentSession::new(3, InterfaceHints::default());
        session.mark_started();

        let (_tx, rx) = mpsc::channel(1);
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let result = run(
            &mut session,
            Path::new("/nonexistent/6lhagent"),
            &InterfaceHints::default(),
            rx,
            events_tx,
        )
        .await;

        assert!(matches!(result, Err(TransportError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn run_reports_spawn_failure_for_a_missing_executable() {
        let mut session = AgentSession::new(3, InterfaceHints::default());
        let (_tx, rx) = mpsc::channel(1);
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let result = run(
            &mut session,
            Path::new("/nonexistent/6lhagent"),
            &InterfaceHints::default(),
            rx,
            events_tx,
        )
        .await;

        assert!(matches!(result, Err(TransportError::Spawn { .. })));
    }
}
