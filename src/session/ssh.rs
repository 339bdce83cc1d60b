//! SSH transport built on russh and async-ssh2-tokio.
//!
//! One [`SshSession`] per device: a PTY shell channel bridged through mpsc
//! channels by a spawned I/O task, with prompt detection driving the read
//! loop. Cisco-family sessions are walked into privileged configuration mode
//! during [`SshFactory::open`]; MikroTik-family sessions are used as-is.

use std::time::Duration;

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::Config;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use russh::ChannelMsg;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::device::{DeviceDescriptor, DeviceFamily};
use crate::error::EngineError;

use super::{DeviceSession, SessionFactory};

/// Guard timeout for a single command; a wedged device must not hang the run.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for login, privileged mode and configuration mode entry.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

fn prompt_regex(pattern: &str) -> Regex {
    // Devices prefix redrawn lines with NUL bytes and carriage returns.
    let full = format!(r"^\x00*\r?{pattern}");
    match Regex::new(&full) {
        Ok(re) => re,
        Err(err) => panic!("invalid prompt regex '{pattern}': {err}"),
    }
}

/// Cisco user exec prompt (`switch>`).
static CISCO_USER_PROMPT: Lazy<Regex> = Lazy::new(|| prompt_regex(r"[\w.\-]+>\s*$"));

/// Cisco privileged exec prompt (`switch#`).
static CISCO_PRIV_PROMPT: Lazy<Regex> = Lazy::new(|| prompt_regex(r"[\w.\-]+#\s*$"));

/// Cisco configuration prompt (`switch(config)#`, `switch(config-if)#`, ...).
static CISCO_CONFIG_PROMPT: Lazy<Regex> = Lazy::new(|| prompt_regex(r"[\w.\-]+\([\w\-]+\)#\s*$"));

/// Cisco enable password prompt.
static CISCO_PASSWORD_PROMPT: Lazy<Regex> = Lazy::new(|| prompt_regex(r"Password:\s*$"));

/// MikroTik RouterOS prompt (`[admin@MikroTik] >`).
static MIKROTIK_PROMPT: Lazy<Regex> = Lazy::new(|| prompt_regex(r"\[[^\]\r\n]+\]\s*/?\S*>\s*$"));

/// Matches control characters at the start of lines (carriage returns,
/// backspaces) that terminals emit when redrawing output.
static IGNORE_START_LINE: Lazy<Regex> =
    Lazy::new(
        || match Regex::new(r"^(\r+(\s+\r+)*)|(\u{8}+(\s+\u{8}+)*)") {
            Ok(re) => re,
            Err(err) => panic!("invalid IGNORE_START_LINE regex: {err}"),
        },
    );

/// A live SSH shell session to one network device.
pub struct SshSession {
    client: Client,
    sender: Sender<String>,
    recv: Receiver<String>,
    family: DeviceFamily,
    addr: String,
    in_config: bool,
    closed: bool,
}

impl SshSession {
    /// Checks if the underlying SSH connection is still active.
    pub fn is_connected(&self) -> bool {
        !self.closed && !self.client.is_closed()
    }

    async fn send_line(&mut self, text: &str) -> Result<(), EngineError> {
        self.sender.send(format!("{text}\n")).await?;
        Ok(())
    }

    /// Reads shell output until the trailing unterminated line matches one of
    /// `patterns`. Returns the accumulated output and the matched index.
    async fn wait_for(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<(String, usize), EngineError> {
        let recv = &mut self.recv;
        let mut output = String::new();
        let mut line_buffer = String::new();

        let result = tokio::time::timeout(timeout, async {
            loop {
                match recv.recv().await {
                    Some(data) => {
                        trace!("{:?}", data);
                        line_buffer.push_str(&data);

                        // Complete lines go straight to the output.
                        while let Some(newline_pos) = line_buffer.find('\n') {
                            let line = line_buffer.drain(..=newline_pos).collect::<String>();
                            output.push_str(&IGNORE_START_LINE.replace(&line, ""));
                        }

                        // The remaining partial line is the prompt candidate.
                        if !line_buffer.is_empty()
                            && let Some(idx) =
                                patterns.iter().position(|p| p.is_match(&line_buffer))
                        {
                            output.push_str(&line_buffer);
                            line_buffer.clear();
                            return Ok(idx);
                        }
                    }
                    None => return Err(EngineError::ChannelDisconnect),
                }
            }
        })
        .await;

        match result {
            Ok(Ok(idx)) => Ok((output, idx)),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                output.push_str(&line_buffer);
                Err(EngineError::ExecTimeout(output))
            }
        }
    }

    /// Sends a command and collects its output up to the next ready prompt.
    async fn exec(&mut self, command: &str, ready: &[&Regex]) -> Result<String, EngineError> {
        // Drop residual data from earlier interactions.
        while self.recv.try_recv().is_ok() {}

        self.send_line(command).await?;
        let (raw, _) = self.wait_for(ready, COMMAND_TIMEOUT).await?;
        Ok(trim_output(command, &raw))
    }

    /// Walks a Cisco session from login into privileged configuration mode.
    async fn login_cisco(&mut self, descriptor: &DeviceDescriptor) -> Result<(), EngineError> {
        let (_, state) = self
            .wait_for(&[&CISCO_PRIV_PROMPT, &CISCO_USER_PROMPT], LOGIN_TIMEOUT)
            .await
            .map_err(init_failure)?;

        if state == 1 {
            debug!("{} entering privileged mode", self.addr);
            self.send_line("enable").await?;
            let (_, answer) = self
                .wait_for(&[&CISCO_PRIV_PROMPT, &CISCO_PASSWORD_PROMPT], LOGIN_TIMEOUT)
                .await
                .map_err(init_failure)?;
            if answer == 1 {
                let secret = descriptor.enable_secret.as_deref().ok_or_else(|| {
                    EngineError::PrivilegedModeFailed {
                        addr: self.addr.clone(),
                        reason: "device asked for an enable secret but none is configured"
                            .to_string(),
                    }
                })?;
                self.send_line(secret).await?;
                if let Err(err) = self.wait_for(&[&CISCO_PRIV_PROMPT], LOGIN_TIMEOUT).await {
                    return Err(EngineError::PrivilegedModeFailed {
                        addr: self.addr.clone(),
                        reason: format!("enable secret not accepted: {err}"),
                    });
                }
            }
        }

        // Disable pagination so show output arrives in one piece.
        self.exec("terminal length 0", &[&CISCO_PRIV_PROMPT]).await?;

        self.enter_config_mode().await
    }

    async fn enter_config_mode(&mut self) -> Result<(), EngineError> {
        self.send_line("configure terminal").await?;
        match self.wait_for(&[&CISCO_CONFIG_PROMPT], LOGIN_TIMEOUT).await {
            Ok(_) => {
                self.in_config = true;
                Ok(())
            }
            Err(EngineError::ExecTimeout(out)) => Err(EngineError::PrivilegedModeFailed {
                addr: self.addr.clone(),
                reason: format!("configuration mode not reached: {out}"),
            }),
            Err(err) => Err(err),
        }
    }

    async fn login_mikrotik(&mut self) -> Result<(), EngineError> {
        self.wait_for(&[&MIKROTIK_PROMPT], LOGIN_TIMEOUT)
            .await
            .map_err(init_failure)?;
        Ok(())
    }
}

fn init_failure(err: EngineError) -> EngineError {
    match err {
        EngineError::ExecTimeout(output) => EngineError::InitTimeout(if output.is_empty() {
            "no prompt received".to_string()
        } else {
            output
        }),
        other => other,
    }
}

/// Strips the echoed command and the trailing prompt line from raw output.
fn trim_output(command: &str, raw: &str) -> String {
    let mut content = raw;
    if !command.is_empty() && content.starts_with(command) {
        content = content
            .strip_prefix(command)
            .unwrap_or(content)
            .trim_start_matches(['\n', '\r']);
    }

    let content = match content.rfind('\n') {
        Some(pos) => &content[..pos],
        None => "",
    };
    content.trim_end().to_string()
}

impl DeviceSession for SshSession {
    async fn apply_command(&mut self, command: &str) -> Result<String, EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        match self.family {
            DeviceFamily::CiscoIos => {
                if !self.in_config {
                    self.enter_config_mode().await?;
                }
                self.exec(command, &[&CISCO_CONFIG_PROMPT, &CISCO_PRIV_PROMPT])
                    .await
            }
            DeviceFamily::MikrotikRouterOs => self.exec(command, &[&MIKROTIK_PROMPT]).await,
        }
    }

    async fn run_read_only(&mut self, command: &str) -> Result<String, EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        match self.family {
            DeviceFamily::CiscoIos => {
                if self.in_config {
                    self.send_line("end").await?;
                    self.wait_for(&[&CISCO_PRIV_PROMPT], COMMAND_TIMEOUT).await?;
                    self.in_config = false;
                }
                self.exec(command, &[&CISCO_PRIV_PROMPT]).await
            }
            DeviceFamily::MikrotikRouterOs => self.exec(command, &[&MIKROTIK_PROMPT]).await,
        }
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("{} closing session", self.addr);

        // Stop receiving new data.
        self.recv.close();

        // Try a graceful exit if the connection is still up.
        if !self.client.is_closed() {
            if let Err(err) = self.sender.send("exit\n".to_string()).await {
                debug!("{} failed to send exit command: {:?}", self.addr, err);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        // The underlying client closes on drop.
        debug!("{} session closed", self.addr);
        Ok(())
    }
}

/// Opens [`SshSession`]s from device descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshFactory;

impl SessionFactory for SshFactory {
    type Session = SshSession;

    async fn open(&self, descriptor: &DeviceDescriptor) -> Result<SshSession, EngineError> {
        let endpoint = descriptor.endpoint();

        let config = Config {
            preferred: descriptor.transport.preferred(),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let client = Client::connect_with_config(
            (descriptor.addr.clone(), descriptor.port),
            &descriptor.username,
            AuthMethod::with_password(&descriptor.password),
            descriptor.transport.server_check(),
            config,
        )
        .await
        .map_err(|err| EngineError::ConnectionFailed {
            addr: endpoint.clone(),
            reason: err.to_string(),
        })?;
        debug!("{} TCP connection successful", endpoint);

        let mut channel = client.get_channel().await?;
        channel
            .request_pty(false, "xterm", 800, 600, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} shell request successful", endpoint);

        let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
        let (sender_to_user, receiver_from_shell) = mpsc::channel::<String>(256);

        let io_task_endpoint = endpoint.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(data) = receiver_from_user.recv() => {
                        if let Err(e) = channel.data(data.as_bytes()).await {
                            debug!("{} failed to send data to shell: {:?}", io_task_endpoint, e);
                            break;
                        }
                    },
                    Some(msg) = channel.wait() => {
                        match msg {
                            ChannelMsg::Data { ref data } => {
                                if let Ok(s) = std::str::from_utf8(data)
                                    && sender_to_user.send(s.to_string()).await.is_err() {
                                        debug!("{} shell output receiver dropped, closing task", io_task_endpoint);
                                        break;
                                    }
                            }
                            ChannelMsg::ExitStatus { exit_status } => {
                                debug!("{} shell exited with status code: {}", io_task_endpoint, exit_status);
                                let _ = channel.eof().await;
                                break;
                            }
                            ChannelMsg::Eof => {
                                debug!("{} shell sent EOF", io_task_endpoint);
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            debug!("{} SSH I/O task ended", io_task_endpoint);
        });

        let mut session = SshSession {
            client,
            sender: sender_to_shell,
            recv: receiver_from_shell,
            family: descriptor.family,
            addr: descriptor.addr.clone(),
            in_config: false,
            closed: false,
        };

        match descriptor.family {
            DeviceFamily::CiscoIos => session.login_cisco(descriptor).await?,
            DeviceFamily::MikrotikRouterOs => session.login_mikrotik().await?,
        }

        debug!("{} session ready", endpoint);
        Ok(session)
    }
}
