/// Counters maintained by the network loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Datagrams discarded because they failed to parse or decode
    pub malformed_packets: u64,
    pub acks_sent: u64,
    /// Null-baseline restarts requested from the server
    pub baseline_resets: u64,
    pub rebases: u64,
    /// Fragments dropped for belonging to an acked or superseded update
    pub stale_fragments: u64,
}

impl NetworkStats {
    pub fn record_sent(&mut self, len: usize) {
        self.packets_sent += 1;
        self.bytes_sent += len as u64;
    }

    pub fn record_received(&mut self, len: usize) {
        self.packets_received += 1;
        self.bytes_received += len as u64;
    }
}
