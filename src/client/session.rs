//! The Bayeux client state machine.
//!
//! Drives handshake, the connect loop, subscriptions and publishing over a
//! [`Transport`], resuming only when the host calls [`Client::receive`] with a
//! transport completion or [`Client::fire`] with an expired timer.

use std::mem;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::action::{Callback, Channels, Exchange, Listener, Pending, Step};
use super::deferred::{CallbackGate, DeferredStatus};
use super::ConnectionState;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::id::{IdGenerator, UuidGenerator};
use crate::protocol::{channel, Advice, AdviceUpdate, ChannelTree, Message, Reconnect};
use crate::timer::{TimerEvent, TimerName, TimerRegistry, Timers};
use crate::transport::Transport;

/// Bayeux protocol client
pub struct Client<T, M = TimerRegistry, G = UuidGenerator> {
    /// Session state
    state: ConnectionState,
    /// Server-assigned session id
    client_id: Option<String>,
    /// Id of the outstanding connect request
    connection_id: Option<String>,
    /// Sequence of the outstanding handshake request
    handshake_attempt: Option<u64>,
    /// Handshakes sent so far
    handshakes_sent: u64,
    /// Advice currently in force
    advice: Advice,
    /// Publish envelopes awaiting flush
    outbox: Vec<Message>,
    /// Subscription registry
    channels: ChannelTree<Listener>,
    /// Callers waiting for the handshake to complete
    gate: CallbackGate<Step>,
    /// Wire transport
    transport: T,
    /// Timer registry
    timers: M,
    /// Correlation ids
    ids: G,
    /// Timings and endpoint
    config: ClientConfig,
}

impl<T: Transport> Client<T> {
    /// Create a client with the default timer registry and id generator
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self::with_parts(transport, TimerRegistry::new(), UuidGenerator, config)
    }
}

impl<T: Transport, M: Timers, G: IdGenerator> Client<T, M, G> {
    /// Create a client from explicit collaborators
    pub fn with_parts(transport: T, timers: M, ids: G, config: ClientConfig) -> Self {
        info!("New client created for {}", config.endpoint);
        Self {
            state: ConnectionState::Unconnected,
            client_id: None,
            connection_id: None,
            handshake_attempt: None,
            handshakes_sent: 0,
            advice: Advice::retry(config.retry_interval()),
            outbox: Vec::new(),
            channels: ChannelTree::new(),
            gate: CallbackGate::new(),
            transport,
            timers,
            ids,
            config,
        }
    }

    /// Current session state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Server-assigned session id, once handshaken
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Id of the outstanding connect request
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Advice currently in force
    pub fn advice(&self) -> Advice {
        self.advice
    }

    /// Number of publishes waiting for the next flush
    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Subscription registry
    pub fn subscriptions(&self) -> &ChannelTree<Listener> {
        &self.channels
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Wire transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Wire transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Timer registry
    pub fn timers(&self) -> &M {
        &self.timers
    }

    /// Timer registry, mutably
    pub fn timers_mut(&mut self) -> &mut M {
        &mut self.timers
    }

    // ---------------------------------------------------------------------
    // Handshake
    // ---------------------------------------------------------------------

    /// Negotiate a session with the server.
    ///
    /// Does nothing, and drops the callback uncalled, unless the client is
    /// unconnected and advice allows reconnecting.
    /// Unsuccessful attempts are retried after `advice.interval` until one
    /// succeeds, and the callback fires once a session is established.
    pub fn handshake(&mut self, callback: Option<Callback>) {
        if self.state != ConnectionState::Unconnected {
            return;
        }
        self.handshake_then(callback.map(Step::Notify));
    }

    fn handshake_then(&mut self, then: Option<Step>) {
        if !self.advice.allows_reconnect() {
            return;
        }

        if self.state != ConnectionState::Unconnected {
            if let Some(step) = then {
                self.park(step);
            }
            return;
        }

        self.state = ConnectionState::Connecting;
        self.handshakes_sent += 1;
        let attempt = self.handshakes_sent;
        self.handshake_attempt = Some(attempt);

        info!("Initiating handshake with {}", self.config.endpoint);

        let message = Message::handshake(self.transport.supported_connection_types());
        self.transport.send(
            vec![message],
            Some(Exchange(Pending::Handshake { attempt, then })),
        );
    }

    fn handshake_reply(&mut self, attempt: u64, then: Option<Step>, response: Message) {
        if self.state != ConnectionState::Connecting || self.handshake_attempt != Some(attempt) {
            debug!("Ignoring response to superseded handshake #{}", attempt);
            if let Some(step) = then {
                self.park(step);
            }
            return;
        }
        self.handshake_attempt = None;

        let client_id = match response.client_id {
            Some(ref id) if response.is_successful() => id.clone(),
            _ => {
                info!(
                    "Handshake unsuccessful: {}",
                    response.error.as_deref().unwrap_or("no clientId")
                );
                self.state = ConnectionState::Unconnected;
                if let Some(step) = then {
                    self.defer(step);
                }
                let retry_in = self.interval_for(&response);
                self.timers.add(retry_in, TimerEvent::Handshake);
                return;
            },
        };

        self.state = ConnectionState::Connected;
        self.client_id = Some(client_id);
        if let Some(ref server_types) = response.supported_connection_types {
            self.transport.select(server_types);
        }
        if self.advice.reconnect == Reconnect::Handshake {
            self.advice.reconnect = Reconnect::Retry;
        }

        info!("Handshake successful: {}", self.session_label());
        self.release_deferred();
        if let Some(step) = then {
            self.run(step);
        }
    }

    // ---------------------------------------------------------------------
    // Connect
    // ---------------------------------------------------------------------

    /// Make sure a session exists and a connect request is outstanding.
    ///
    /// Every concurrent caller shares the same handshake and the same
    /// connect request; the callback fires once the session is connected.
    pub fn connect(&mut self, callback: Option<Callback>) {
        self.connect_then(callback.map(Step::Notify));
    }

    fn connect_then(&mut self, then: Option<Step>) {
        if !self.advice.allows_reconnect() || self.state == ConnectionState::Disconnected {
            return;
        }

        if self.state == ConnectionState::Connecting {
            if let Some(step) = then {
                self.defer(step);
            }
            return;
        }

        if self.advice.reconnect == Reconnect::Handshake
            && self.state == ConnectionState::Connected
        {
            info!("Server requested a new handshake for {}", self.session_label());
            self.state = ConnectionState::Unconnected;
            self.connection_id = None;
        }

        if self.state == ConnectionState::Unconnected {
            self.begin_reconnect_timeout();
            self.handshake_then(Some(Step::Connect(then.map(Box::new))));
            return;
        }

        self.release_deferred();
        if let Some(step) = then {
            self.run(step);
        }

        if self.connection_id.is_some() || self.state != ConnectionState::Connected {
            return;
        }
        let Some(client_id) = self.client_id.clone() else {
            return;
        };

        let id = self.ids.next_id();
        self.connection_id = Some(id.clone());
        info!("Initiating connection for {}", client_id);

        let message = Message::connect(&client_id, self.transport.connection_type(), &id);
        self.begin_reconnect_timeout();
        self.transport
            .send(vec![message], Some(Exchange(Pending::Connect { id })));
    }

    fn connect_reply(&mut self, id: String, response: Message) {
        if !self.verify_client_id(&response) {
            return;
        }
        if self.connection_id.as_deref() != Some(id.as_str()) {
            debug!("Ignoring response to superseded connect {}", id);
            return;
        }

        self.connection_id = None;
        self.timers.remove(TimerName::Reconnect);

        if !response.is_successful() {
            warn!(
                "Connect failed for {}: {}",
                self.session_label(),
                response.error.as_deref().unwrap_or("unknown error")
            );
        }
        info!("Closed connection for {}", self.session_label());
        let poll_in = self.interval_for(&response);
        self.timers.add(poll_in, TimerEvent::Connect);
    }

    fn begin_reconnect_timeout(&mut self) {
        let timeout = self.config.timeout();
        self.timers.add(timeout, TimerEvent::Reconnect);
    }

    fn reconnect_timeout(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        warn!(
            "Server took >{}s to reply to connection for {}: attempting to reconnect",
            self.config.timeout_secs,
            self.session_label()
        );

        self.connection_id = None;
        self.client_id = None;
        self.handshake_attempt = None;
        self.state = ConnectionState::Unconnected;

        let patterns = self.channels.patterns();
        if patterns.is_empty() {
            self.connect_then(None);
        } else {
            self.connect_then(Some(Step::Subscribe {
                channels: patterns,
                listener: None,
            }));
        }
    }

    // ---------------------------------------------------------------------
    // Disconnect
    // ---------------------------------------------------------------------

    /// End the session for good.
    ///
    /// Queued publishes are flushed first; afterwards no request is ever sent
    /// again and every subscription is dropped.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }

        self.flush();
        self.state = ConnectionState::Disconnected;

        info!("Disconnecting {}", self.session_label());
        if let Some(ref client_id) = self.client_id {
            self.transport.send(vec![Message::disconnect(client_id)], None);
        }

        info!("Clearing channel listeners for {}", self.session_label());
        self.channels.clear();
        self.timers.remove(TimerName::Reconnect);
        self.timers.remove(TimerName::Connect);
    }

    // ---------------------------------------------------------------------
    // Subscribe / Unsubscribe
    // ---------------------------------------------------------------------

    /// Subscribe `listener` to one or more channel patterns.
    ///
    /// The listener is registered once the server acknowledges the
    /// subscription.
    pub fn subscribe(&mut self, channels: impl Into<Channels>, listener: Listener) -> Result<()> {
        let channels = channels.into().into_vec();
        channel::validate_subscribable(&channels)?;

        self.connect_then(Some(Step::Subscribe {
            channels,
            listener: Some(listener),
        }));
        Ok(())
    }

    /// Unsubscribe from one or more channel patterns.
    ///
    /// `callback` fires only when the server acknowledges the request.
    pub fn unsubscribe(
        &mut self,
        channels: impl Into<Channels>,
        callback: Option<Callback>,
    ) -> Result<()> {
        let channels = channels.into().into_vec();
        channel::validate_subscribable(&channels)?;

        self.connect_then(Some(Step::Unsubscribe { channels, callback }));
        Ok(())
    }

    fn send_subscribe(&mut self, channels: Vec<String>, listener: Option<Listener>) {
        let Some(client_id) = self.client_id.clone() else {
            return;
        };
        info!(
            "Client {} attempting to subscribe to [{}]",
            client_id,
            channels.join(", ")
        );

        let message = Message::subscribe(&client_id, channels.clone());
        self.transport.send(
            vec![message],
            Some(Exchange(Pending::Subscribe { channels, listener })),
        );
    }

    fn subscribe_reply(&mut self, channels: Vec<String>, listener: Option<Listener>, response: Message) {
        if !self.verify_client_id(&response) {
            return;
        }
        if !response.is_successful() {
            warn!(
                "Subscription to [{}] refused for {}: {}",
                channels.join(", "),
                self.session_label(),
                response.error.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        let Some(listener) = listener else {
            return;
        };

        let acknowledged = response.subscription_channels().unwrap_or(channels);
        info!(
            "Subscription acknowledged for {} to [{}]",
            self.session_label(),
            acknowledged.join(", ")
        );
        for pattern in &acknowledged {
            self.channels.register(pattern, listener.clone());
        }
    }

    fn send_unsubscribe(&mut self, channels: Vec<String>, callback: Option<Callback>) {
        let Some(client_id) = self.client_id.clone() else {
            return;
        };
        info!(
            "Client {} attempting to unsubscribe from [{}]",
            client_id,
            channels.join(", ")
        );

        let message = Message::unsubscribe(&client_id, channels.clone());
        self.transport.send(
            vec![message],
            Some(Exchange(Pending::Unsubscribe { channels, callback })),
        );
    }

    fn unsubscribe_reply(&mut self, channels: Vec<String>, callback: Option<Callback>, response: Message) {
        if !self.verify_client_id(&response) {
            return;
        }
        if !response.is_successful() {
            warn!(
                "Unsubscription from [{}] refused for {}: {}",
                channels.join(", "),
                self.session_label(),
                response.error.as_deref().unwrap_or("unknown error")
            );
            return;
        }

        let acknowledged = response.subscription_channels().unwrap_or(channels);
        info!(
            "Unsubscription acknowledged for {} from [{}]",
            self.session_label(),
            acknowledged.join(", ")
        );
        for pattern in &acknowledged {
            self.channels.unregister(pattern);
        }
        if let Some(callback) = callback {
            callback();
        }
    }

    // ---------------------------------------------------------------------
    // Publish
    // ---------------------------------------------------------------------

    /// Publish `data` to a concrete channel.
    ///
    /// Messages are batched: every publish within the debounce window goes
    /// out in a single transport call.
    pub fn publish(&mut self, channel: &str, data: Value) -> Result<()> {
        channel::validate_publishable(channel)?;

        self.connect_then(Some(Step::Publish {
            channel: channel.to_string(),
            data,
        }));
        Ok(())
    }

    fn enqueue(&mut self, channel: String, data: Value) {
        let Some(client_id) = self.client_id.clone() else {
            return;
        };
        debug!(
            "Client {} queueing published message to {}: {}",
            client_id, channel, data
        );

        self.outbox.push(Message::publish(&channel, data, &client_id));
        let delay = self.config.publish_delay();
        self.timers.add(delay, TimerEvent::Publish);
    }

    fn flush(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        let batch = mem::take(&mut self.outbox);
        let count = batch.len();
        debug!("Flushing {} published message(s)", count);
        self.transport
            .send(batch, Some(Exchange(Pending::Publish { count })));
    }

    // ---------------------------------------------------------------------
    // Advice & delivery
    // ---------------------------------------------------------------------

    /// Merge server advice into the session.
    ///
    /// `reconnect: handshake` invalidates the clientId at once so the next
    /// connect negotiates a new session.
    pub fn handle_advice(&mut self, update: &AdviceUpdate) {
        self.advice.merge(update);
        if self.advice.reconnect == Reconnect::Handshake && self.client_id.is_some() {
            info!("Advice invalidated session {}", self.session_label());
            self.client_id = None;
        }
    }

    /// Hand pushed messages to every listener whose pattern matches.
    pub fn deliver_messages(&self, messages: &[Message]) {
        for message in messages {
            let data = message.data.as_ref().unwrap_or(&Value::Null);
            debug!(
                "Client {} calling listeners for {} with {}",
                self.session_label(),
                message.channel,
                data
            );
            for listener in self.channels.matching(&message.channel) {
                listener.invoke(data);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Resumption points
    // ---------------------------------------------------------------------

    /// Feed the server's response(s) to a request back into the client.
    ///
    /// Pushed application messages riding along are delivered first, then the
    /// reply is handled, then any advice is applied. A missing reply counts as
    /// an unsuccessful one.
    pub fn receive(&mut self, exchange: Exchange, responses: Vec<Message>) {
        if self.state == ConnectionState::Disconnected {
            debug!("Ignoring {} response after disconnect", exchange.kind());
            return;
        }

        let reply_channel = exchange.meta_channel();
        let mut reply = None;
        let mut pushed = Vec::new();
        let mut advice = Vec::new();

        for message in responses {
            if let Some(ref update) = message.advice {
                advice.push(update.clone());
            }
            if reply.is_none() && reply_channel == Some(message.channel.as_str()) {
                reply = Some(message);
            } else if !message.is_meta() && message.data.is_some() {
                pushed.push(message);
            } else if message.successful == Some(false) {
                warn!(
                    "Server rejected message on {}: {}",
                    message.channel,
                    message.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        self.deliver_messages(&pushed);

        let reply = reply
            .unwrap_or_else(|| Message::failure(reply_channel.unwrap_or_default(), "no response"));
        match exchange.0 {
            Pending::Handshake { attempt, then } => self.handshake_reply(attempt, then, reply),
            Pending::Connect { id } => self.connect_reply(id, reply),
            Pending::Subscribe { channels, listener } => {
                self.subscribe_reply(channels, listener, reply);
            },
            Pending::Unsubscribe { channels, callback } => {
                self.unsubscribe_reply(channels, callback, reply);
            },
            Pending::Publish { count } => {
                debug!("Server answered batch of {} published message(s)", count);
            },
        }

        for update in &advice {
            self.handle_advice(update);
        }
    }

    /// Run an expired timer's event.
    pub fn fire(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Reconnect => self.reconnect_timeout(),
            TimerEvent::Publish => self.flush(),
            TimerEvent::Handshake => self.handshake_then(None),
            TimerEvent::Connect => self.connect_then(None),
        }
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn run(&mut self, step: Step) {
        match step {
            Step::Connect(next) => self.connect_then(next.map(|step| *step)),
            Step::Subscribe { channels, listener } => self.send_subscribe(channels, listener),
            Step::Unsubscribe { channels, callback } => self.send_unsubscribe(channels, callback),
            Step::Publish { channel, data } => self.enqueue(channel, data),
            Step::Notify(callback) => callback(),
        }
    }

    /// Run everything parked while no session was available.
    fn release_deferred(&mut self) {
        let parked = self.gate.set_status(DeferredStatus::Succeeded);
        self.gate.set_status(DeferredStatus::Deferred);
        if !parked.is_empty() {
            debug!("Calling {} deferred action(s) for {}", parked.len(), self.session_label());
        }
        for step in parked {
            self.run(step);
        }
    }

    /// Attach work to whatever session exists or is being negotiated.
    fn park(&mut self, step: Step) {
        match self.state {
            ConnectionState::Connected => self.run(step),
            ConnectionState::Disconnected => {},
            ConnectionState::Unconnected | ConnectionState::Connecting => self.defer(step),
        }
    }

    fn defer(&mut self, step: Step) {
        if let Some(step) = self.gate.run_when(DeferredStatus::Succeeded, step) {
            self.run(step);
        }
    }

    /// Responses from an earlier session must not touch this one.
    fn verify_client_id(&self, response: &Message) -> bool {
        let matches = matches!(
            (&response.client_id, &self.client_id),
            (Some(theirs), Some(ours)) if theirs == ours
        );
        if !matches {
            debug!(
                "Discarding {} response for foreign clientId {:?}",
                response.channel, response.client_id
            );
        }
        matches
    }

    /// Interval in force once the response's own advice is merged.
    fn interval_for(&self, response: &Message) -> Duration {
        let mut advice = self.advice;
        if let Some(ref update) = response.advice {
            advice.merge(update);
        }
        advice.interval
    }

    fn session_label(&self) -> &str {
        self.client_id.as_deref().unwrap_or("<no session>")
    }
}
