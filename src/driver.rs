//! Tokio driver for a [`Client`].
//!
//! The client itself never waits. The driver owns it inside a single task and
//! serialises the three things that can move it forward: application
//! commands, transport completions and timer expirations. Because only this
//! task touches the client, no lock guards the session state.
//!
//! ```rust,ignore
//! let (driver, handle) = Driver::new(MyTransport::new(responder_slot), ClientConfig::from_env());
//! let task = tokio::spawn(driver.run());
//!
//! handle.subscribe("/chat/*", Listener::new(|data| println!("{data}")))?;
//! handle.publish("/chat/lobby", json!({"text": "hi"}))?;
//! handle.shutdown()?;          // disconnects, then the task returns the client
//! let client = task.await?;
//! ```

use std::future;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::{Callback, Channels, Client, Exchange, Listener};
use crate::config::ClientConfig;
use crate::error::{BayeuxError, Result};
use crate::protocol::{channel, Message};
use crate::timer::TimerRegistry;
use crate::transport::Transport;

/// Application request forwarded to the client
pub enum Command {
    /// Establish the session and start the connect loop
    Connect,
    /// Subscribe a listener
    Subscribe {
        /// Channel patterns
        channels: Vec<String>,
        /// Subscriber
        listener: Listener,
    },
    /// Drop subscriptions
    Unsubscribe {
        /// Channel patterns
        channels: Vec<String>,
        /// Fired on acknowledgement
        callback: Option<Callback>,
    },
    /// Publish a message
    Publish {
        /// Concrete channel
        channel: String,
        /// Payload
        data: Value,
    },
    /// End the session but keep the driver running
    Disconnect,
}

/// Everything the driver task reacts to, besides timers
pub enum Inbound {
    /// Transport completion for a request
    Response {
        /// Token the transport was handed
        exchange: Exchange,
        /// Server response(s)
        messages: Vec<Message>,
    },
    /// Messages pushed outside any request
    Deliver(Vec<Message>),
    /// Application command
    Command(Command),
    /// Disconnect and stop the driver
    Shutdown,
}

/// Handle transports use to report responses back to the driver
#[derive(Debug, Clone)]
pub struct Responder {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl Responder {
    /// Report the response(s) to a request
    pub fn respond(&self, exchange: Exchange, messages: Vec<Message>) -> Result<()> {
        self.tx
            .send(Inbound::Response { exchange, messages })
            .map_err(|_| BayeuxError::DriverClosed)
    }

    /// Deliver messages that arrived without a request
    pub fn deliver(&self, messages: Vec<Message>) -> Result<()> {
        self.tx
            .send(Inbound::Deliver(messages))
            .map_err(|_| BayeuxError::DriverClosed)
    }
}

/// Cloneable application handle to a running driver
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl ClientHandle {
    /// Establish the session
    pub fn connect(&self) -> Result<()> {
        self.command(Command::Connect)
    }

    /// Subscribe a listener; channel names are validated before queueing
    pub fn subscribe(&self, channels: impl Into<Channels>, listener: Listener) -> Result<()> {
        let channels = channels.into().into_vec();
        channel::validate_subscribable(&channels)?;
        self.command(Command::Subscribe { channels, listener })
    }

    /// Drop subscriptions; channel names are validated before queueing
    pub fn unsubscribe(
        &self,
        channels: impl Into<Channels>,
        callback: Option<Callback>,
    ) -> Result<()> {
        let channels = channels.into().into_vec();
        channel::validate_subscribable(&channels)?;
        self.command(Command::Unsubscribe { channels, callback })
    }

    /// Publish a message; the channel is validated before queueing
    pub fn publish(&self, channel: &str, data: Value) -> Result<()> {
        channel::validate_publishable(channel)?;
        self.command(Command::Publish {
            channel: channel.to_string(),
            data,
        })
    }

    /// End the session, leaving the driver running
    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    /// Disconnect and stop the driver task
    pub fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Inbound::Shutdown)
            .map_err(|_| BayeuxError::DriverClosed)
    }

    /// Responder for transports feeding this driver
    pub fn responder(&self) -> Responder {
        Responder {
            tx: self.tx.clone(),
        }
    }

    /// Whether the driver task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn command(&self, command: Command) -> Result<()> {
        self.tx
            .send(Inbound::Command(command))
            .map_err(|_| BayeuxError::DriverClosed)
    }
}

/// Single-task event loop owning a [`Client`]
pub struct Driver<T> {
    client: Client<T, TimerRegistry>,
    inbox: mpsc::UnboundedReceiver<Inbound>,
}

impl<T: Transport> Driver<T> {
    /// Create a driver around a fresh client
    pub fn new(transport: T, config: ClientConfig) -> (Self, ClientHandle) {
        Self::with_client(Client::new(transport, config))
    }

    /// Create a driver around an existing client
    pub fn with_client(client: Client<T, TimerRegistry>) -> (Self, ClientHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        (Self { client, inbox }, ClientHandle { tx })
    }

    /// Client owned by the driver
    pub fn client(&self) -> &Client<T, TimerRegistry> {
        &self.client
    }

    /// Client owned by the driver, mutably (e.g. to install a responder)
    pub fn client_mut(&mut self) -> &mut Client<T, TimerRegistry> {
        &mut self.client
    }

    /// Run until shut down or every sender is dropped, then disconnect and
    /// return the client.
    pub async fn run(mut self) -> Client<T, TimerRegistry> {
        loop {
            let deadline = self.client.timers().next_deadline();

            tokio::select! {
                inbound = self.inbox.recv() => match inbound {
                    Some(Inbound::Shutdown) | None => break,
                    Some(inbound) => self.dispatch(inbound),
                },
                () = sleep_until(deadline) => self.fire_expired(),
            }
        }

        tracing::info!("Driver stopping for {}", self.client.config().endpoint);
        self.client.disconnect();
        self.client
    }

    fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Response { exchange, messages } => self.client.receive(exchange, messages),
            Inbound::Deliver(messages) => self.client.deliver_messages(&messages),
            Inbound::Command(command) => self.execute(command),
            Inbound::Shutdown => {},
        }
    }

    fn execute(&mut self, command: Command) {
        let outcome = match command {
            Command::Connect => {
                self.client.connect(None);
                Ok(())
            },
            Command::Subscribe { channels, listener } => self.client.subscribe(channels, listener),
            Command::Unsubscribe { channels, callback } => {
                self.client.unsubscribe(channels, callback)
            },
            Command::Publish { channel, data } => self.client.publish(&channel, data),
            Command::Disconnect => {
                self.client.disconnect();
                Ok(())
            },
        };

        if let Err(e) = outcome {
            tracing::warn!("Command rejected: {}", e);
        }
    }

    fn fire_expired(&mut self) {
        let due = self.client.timers_mut().expire(Instant::now());
        for event in due {
            self.client.fire(event);
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => future::pending().await,
    }
}
