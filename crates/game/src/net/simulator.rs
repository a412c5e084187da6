use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::stats::PacketLossSimulation;

#[derive(Debug)]
struct DelayedDatagram {
    release_time: Instant,
    order: u64,
    data: Vec<u8>,
    addr: SocketAddr,
}

impl PartialEq for DelayedDatagram {
    fn eq(&self, other: &Self) -> bool {
        self.release_time == other.release_time && self.order == other.order
    }
}

impl Eq for DelayedDatagram {}

impl PartialOrd for DelayedDatagram {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedDatagram {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_time
            .cmp(&self.release_time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// What happened to a datagram handed to [`NetworkSimulator::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Dropped,
    Queued,
    Duplicated,
}

/// Holds outgoing datagrams back according to a [`PacketLossSimulation`].
#[derive(Debug, Default)]
pub struct NetworkSimulator {
    config: PacketLossSimulation,
    queue: BinaryHeap<DelayedDatagram>,
    next_order: u64,
}

impl NetworkSimulator {
    pub fn new(config: PacketLossSimulation) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &PacketLossSimulation {
        &self.config
    }

    pub fn set_config(&mut self, config: PacketLossSimulation) {
        self.config = config;
    }

    pub fn is_active(&self) -> bool {
        self.config.enabled
    }

    fn push(&mut self, data: Vec<u8>, addr: SocketAddr, now: Instant) {
        let delay = Duration::from_millis(u64::from(self.config.delay_ms()));
        self.queue.push(DelayedDatagram {
            release_time: now + delay,
            order: self.next_order,
            data,
            addr,
        });
        self.next_order += 1;
    }

    pub fn enqueue(&mut self, data: Vec<u8>, addr: SocketAddr) -> Fate {
        if self.config.should_drop() {
            return Fate::Dropped;
        }

        let now = Instant::now();
        if self.config.should_duplicate() {
            self.push(data.clone(), addr, now);
            self.push(data, addr, now);
            Fate::Duplicated
        } else {
            self.push(data, addr, now);
            Fate::Queued
        }
    }

    /// Datagrams whose delay has elapsed, earliest first.
    pub fn take_due(&mut self) -> Vec<(Vec<u8>, SocketAddr)> {
        let mut due = Vec::new();
        let now = Instant::now();
        while self
            .queue
            .peek()
            .is_some_and(|delayed| delayed.release_time <= now)
        {
            if let Some(delayed) = self.queue.pop() {
                due.push((delayed.data, delayed.addr));
            }
        }
        due
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
