use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::client::clock::RenderClock;
use crate::client::commands::{map_command, CommandSender};
use crate::error::{Error, Result};
use crate::protocol::ack::DeltaAck;
use crate::protocol::packet::{connect_packet, delta_reset_packet, DeltaFragment, PacketType, Welcome};
use crate::protocol::transport::DatagramTransport;
use crate::state::{ApplyTarget, ConnectionState, SharedWorld, Update, UpdateHistory};

const HANDSHAKE_INTERVAL: Duration = Duration::from_millis(500);
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Pacing of the receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    /// Time between connect requests while waiting for a welcome
    pub handshake_interval: Duration,
    /// Sleep when no datagram is waiting
    pub idle_sleep: Duration,
}

impl LoopTiming {
    /// Receive-loop iterations between connect requests
    pub fn handshake_every(&self) -> u64 {
        let idle = self.idle_sleep.as_micros().max(1);
        (self.handshake_interval.as_micros() / idle).max(1) as u64
    }
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            handshake_interval: HANDSHAKE_INTERVAL,
            idle_sleep: IDLE_SLEEP,
        }
    }
}

/// What a processed datagram turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedPacket {
    Welcome { map_name: String },
    Delta { update_id: u16, fragment_id: u16, entities: usize },
    /// Duplicate, late, or already superseded by the baseline
    Stale { update_id: u16 },
    /// The named baseline could not be rebuilt; a reset was requested
    BaselineUnavailable { baseline_id: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebase {
    Unchanged,
    Null,
    Rebased,
    Behind,
    Unavailable,
}

/// One spectator session with a server.
///
/// Owns the transport and every piece of protocol bookkeeping; the entity
/// arrays live in the [`SharedWorld`] and are only touched under its lock.
pub struct Connection<T> {
    transport: T,
    world: SharedWorld,
    commands: CommandSender,
    clock: RenderClock,
    timing: LoopTiming,
    state: ConnectionState,

    history: UpdateHistory,
    last_baseline_id: u16,
    last_ack: Option<DeltaAck>,
}

impl<T: DatagramTransport> Connection<T> {
    pub fn new(
        transport: T,
        world: SharedWorld,
        commands: CommandSender,
        clock: RenderClock,
        timing: LoopTiming,
    ) -> Self {
        Self {
            transport,
            world,
            commands,
            clock,
            timing,
            state: ConnectionState::Disconnected,
            history: UpdateHistory::new(),
            last_baseline_id: 0,
            last_ack: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_baseline_id(&self) -> u16 {
        self.last_baseline_id
    }

    pub fn last_ack(&self) -> Option<&DeltaAck> {
        self.last_ack.as_ref()
    }

    pub fn history(&self) -> &UpdateHistory {
        &self.history
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.world.lock().state = state;
    }

    /// Announce ourselves until the server answers with a welcome.
    ///
    /// Retries forever; only `cancel` ends the handshake early.
    pub async fn connect(&mut self, cancel: &AtomicBool) -> Result<String> {
        self.set_state(ConnectionState::Connecting);
        let every = self.timing.handshake_every();
        let mut iteration: u64 = 0;

        loop {
            if cancel.load(Ordering::Relaxed) {
                self.set_state(ConnectionState::Disconnected);
                return Err(Error::Cancelled);
            }

            if iteration % every == 0 {
                debug!(server = %self.transport.remote_addr(), "sending connect request");
                self.send_packet(&connect_packet());
            }
            iteration += 1;

            let data = match self.recv() {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tokio::time::sleep(self.timing.idle_sleep).await;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "receive failed during handshake");
                    tokio::time::sleep(self.timing.idle_sleep).await;
                    continue;
                }
            };

            match PacketType::of(&data) {
                Ok(PacketType::SvcWelcome) => match self.handle_welcome(&data) {
                    Ok(map_name) => return Ok(map_name),
                    Err(e) => {
                        warn!(error = %e, len = data.len(), "ignoring malformed welcome");
                        self.world.lock().stats.malformed_packets += 1;
                    }
                },
                Ok(other) => trace!(?other, "ignoring packet during handshake"),
                Err(e) => warn!(error = %e, "ignoring unknown packet during handshake"),
            }
        }
    }

    /// Receive and process at most one datagram
    pub fn poll(&mut self) -> Result<Option<ReceivedPacket>> {
        let Some(data) = self.recv()? else {
            return Ok(None);
        };
        self.handle_packet(&data).map(Some)
    }

    /// Handshake, then process datagrams until `cancel` is set
    pub async fn run(mut self, cancel: Arc<AtomicBool>) {
        match self.connect(&cancel).await {
            Ok(map_name) => info!(%map_name, "joined server as spectator"),
            Err(e) => {
                debug!(error = %e, "handshake ended");
                return;
            }
        }

        while !cancel.load(Ordering::Relaxed) {
            match self.poll() {
                Ok(Some(packet)) => trace!(?packet, "processed packet"),
                Ok(None) => tokio::time::sleep(self.timing.idle_sleep).await,
                Err(Error::Io(e)) => {
                    warn!(error = %e, "receive failed");
                    tokio::time::sleep(self.timing.idle_sleep).await;
                }
                Err(e) => warn!(error = %e, "discarding packet"),
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("network loop stopped");
    }

    fn recv(&mut self) -> Result<Option<bytes::Bytes>> {
        let data = self.transport.try_recv()?;
        if let Some(data) = &data {
            self.world.lock().stats.record_received(data.len());
        }
        Ok(data)
    }

    /// Dispatch one datagram by its type byte
    pub fn handle_packet(&mut self, data: &[u8]) -> Result<ReceivedPacket> {
        let result = match PacketType::of(data) {
            Ok(PacketType::SvcWelcome) => self
                .handle_welcome(data)
                .map(|map_name| ReceivedPacket::Welcome { map_name }),
            Ok(PacketType::SvcDeltaPacketEntities) => self.handle_delta(data),
            Ok(other) => Err(Error::InvalidPacket(format!("unexpected {other:?} from server"))),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.world.lock().stats.malformed_packets += 1;
        }
        result
    }

    fn handle_welcome(&mut self, data: &[u8]) -> Result<String> {
        let welcome = Welcome::parse(data)?;
        info!(map = %welcome.map_name, "server welcome");

        self.world.lock().map_name = Some(welcome.map_name.clone());
        if !self.commands.push(map_command(&welcome.map_name)) {
            debug!("command queue closed, map command dropped");
        }
        self.set_state(ConnectionState::Connected);
        Ok(welcome.map_name)
    }

    fn handle_delta(&mut self, data: &[u8]) -> Result<ReceivedPacket> {
        let fragment = DeltaFragment::parse(data)?;
        let update_id = fragment.update_id;
        trace!(
            update_id,
            baseline_id = fragment.baseline_id,
            fragment_id = fragment.fragment_id,
            len = fragment.body.len(),
            "delta fragment"
        );

        if fragment.baseline_id == 0 {
            self.restart_from_null_baseline();
        }
        if self.is_stale(&fragment) {
            self.world.lock().stats.stale_fragments += 1;
            return Ok(ReceivedPacket::Stale { update_id });
        }

        if self.rebase(fragment.baseline_id) == Rebase::Unavailable {
            return Ok(ReceivedPacket::BaselineUnavailable { baseline_id: fragment.baseline_id });
        }

        let starts_update = self.history.get(update_id).is_none();
        let entities = {
            let mut world = self.world.lock();
            let entities = world.store.apply_delta(&fragment.body, ApplyTarget::Current)?;
            if starts_update {
                world.last_update_time = self.clock.now();
            }
            entities
        };

        let fragment_id = fragment.fragment_id;
        self.record_fragment(fragment);
        self.history.prune_through(self.last_baseline_id);

        Ok(ReceivedPacket::Delta { update_id, fragment_id, entities })
    }

    fn is_stale(&self, fragment: &DeltaFragment) -> bool {
        if self.last_baseline_id != 0 && fragment.update_id <= self.last_baseline_id {
            return true;
        }
        self.history
            .get(fragment.update_id)
            .is_some_and(|u| u.acked || u.has_fragment(fragment.fragment_id))
    }

    /// File an applied fragment under its update, acknowledging the
    /// previous pending update when this one is new.
    fn record_fragment(&mut self, fragment: DeltaFragment) {
        if self.history.get(fragment.update_id).is_some() {
            self.history.append(fragment);
            return;
        }

        self.ack_best_pending();
        if let Some(evicted) = self.history.push(Update::new(fragment)) {
            debug!(update_id = evicted.id, acked = evicted.acked, "update evicted from history");
        }
    }

    /// Drop the held baseline and every update recorded against it.
    ///
    /// The baseline array is all-invalid whenever `last_baseline_id` is 0,
    /// so there is nothing to do without a held baseline.
    fn restart_from_null_baseline(&mut self) {
        if self.last_baseline_id == 0 {
            return;
        }
        info!(previous = self.last_baseline_id, "server restarted from null baseline");
        self.world.lock().store.reset_baseline();
        self.last_baseline_id = 0;
        self.history.clear();
    }

    fn rebase(&mut self, baseline_id: u16) -> Rebase {
        if baseline_id == 0 {
            return Rebase::Null;
        }

        match baseline_id.cmp(&self.last_baseline_id) {
            std::cmp::Ordering::Equal => Rebase::Unchanged,
            std::cmp::Ordering::Greater => self.adopt_baseline(baseline_id),
            std::cmp::Ordering::Less => {
                debug!(baseline_id, last_baseline_id = self.last_baseline_id, "server is behind, resending ack");
                self.resend_last_ack();
                Rebase::Behind
            }
        }
    }

    /// Replay the retained update `baseline_id` onto the baseline array
    fn adopt_baseline(&mut self, baseline_id: u16) -> Rebase {
        let Some(update) = self.history.get_mut(baseline_id) else {
            warn!(
                baseline_id,
                last_baseline_id = self.last_baseline_id,
                "baseline not in history, requesting null baseline"
            );
            self.request_null_baseline();
            return Rebase::Unavailable;
        };

        update.fragments.sort_by_key(|f| f.fragment_id);
        let replayed = {
            let mut world = self.world.lock();
            update
                .fragments
                .iter()
                .try_for_each(|f| world.store.apply_delta(&f.body, ApplyTarget::Baseline).map(|_| ()))
        };
        if let Err(e) = replayed {
            warn!(baseline_id, error = %e, "baseline replay failed, requesting null baseline");
            self.request_null_baseline();
            return Rebase::Unavailable;
        }

        info!(baseline_id, previous = self.last_baseline_id, "rebased");
        self.last_baseline_id = baseline_id;
        self.history.prune_through(baseline_id);
        self.world.lock().stats.rebases += 1;
        Rebase::Rebased
    }

    fn request_null_baseline(&mut self) {
        {
            let mut world = self.world.lock();
            world.store.reset_baseline();
            world.stats.baseline_resets += 1;
        }
        self.last_baseline_id = 0;
        self.send_packet(&delta_reset_packet());
    }

    fn ack_best_pending(&mut self) {
        let Some(update) = self.history.best_pending_mut() else {
            return;
        };
        let ack = DeltaAck::for_update(update);
        update.acked = true;

        debug!(
            update_id = ack.update_id,
            fragments = ack.received.len(),
            complete = ack.is_complete(),
            "acknowledging update"
        );
        if self.send_packet(&ack.encode()) {
            self.world.lock().stats.acks_sent += 1;
        }
        self.last_ack = Some(ack);
    }

    fn resend_last_ack(&mut self) {
        let Some(packet) = self.last_ack.as_ref().map(DeltaAck::encode) else {
            trace!("no acknowledgment to resend");
            return;
        };
        if self.send_packet(&packet) {
            self.world.lock().stats.acks_sent += 1;
        }
    }

    fn send_packet(&mut self, packet: &[u8]) -> bool {
        match self.transport.send(packet) {
            Ok(()) => {
                self.world.lock().stats.record_sent(packet.len());
                true
            }
            Err(e) => {
                warn!(error = %e, len = packet.len(), "send failed");
                false
            }
        }
    }
}
