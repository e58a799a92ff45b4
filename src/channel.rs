//! Report channel - bounded FIFO between the report builder and the
//! host transport.
//!
//! New reports are dropped when the FIFO is full.  Draining stops at the
//! first `Busy` answer and leaves that report at the head, so a retry
//! after the transport-ready signal keeps the original order.

use heapless::Deque;

use crate::error::{Error, TransportError};
use crate::hid::HidReport;

/// Host transport for finished reports.
pub trait ReportSink {
    /// Try to hand one report to the transport without blocking.
    fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError>;
}

pub struct ReportChannel<const M: usize> {
    queue: Deque<HidReport, M>,
    connected: bool,
}

impl<const M: usize> ReportChannel<M> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            connected: false,
        }
    }

    /// Queue `report` and drain as far as the transport allows.
    ///
    /// Nothing is queued while no host is connected.
    pub fn submit<S>(&mut self, report: HidReport, sink: &mut S) -> Result<(), Error>
    where
        S: ReportSink + ?Sized,
    {
        if !self.connected {
            trace!("no host, report discarded");
            return Ok(());
        }
        if self.queue.push_back(report).is_err() {
            warn!("report buffer full, dropping report");
        }
        self.drain(sink)
    }

    /// Send queued reports until the queue is empty or the transport is
    /// busy.  Any failure other than busy/discarded is fatal.
    pub fn drain<S>(&mut self, sink: &mut S) -> Result<(), Error>
    where
        S: ReportSink + ?Sized,
    {
        if !self.connected {
            return Ok(());
        }

        while let Some(report) = self.queue.front() {
            match sink.send_report(report) {
                Ok(()) => {}
                Err(TransportError::Busy) => {
                    trace!("transport busy, {} reports pending", self.queue.len());
                    break;
                }
                Err(TransportError::Discarded) => {
                    debug!("transport discarded report");
                }
                Err(TransportError::Failed(code)) => {
                    error!("report transport failed: {}", code);
                    return Err(Error::Transport(code));
                }
            }
            self.queue.pop_front();
        }

        Ok(())
    }

    /// Reports still queued when the host goes away are dropped.
    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            info!("host connected: {}", connected);
        }
        if !connected {
            self.queue.clear();
        }
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<const M: usize> Default for ReportChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hid::KeyboardReport;

    /// Transport that answers from a script, then accepts everything.
    pub struct ScriptedSink {
        pub sent: heapless::Vec<HidReport, 32>,
        pub script: Deque<Result<(), TransportError>, 8>,
    }

    impl ScriptedSink {
        pub fn new() -> Self {
            Self {
                sent: heapless::Vec::new(),
                script: Deque::new(),
            }
        }

        pub fn then(mut self, answer: Result<(), TransportError>) -> Self {
            self.script.push_back(answer).unwrap();
            self
        }
    }

    impl ReportSink for ScriptedSink {
        fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
            let answer = self.script.pop_front().unwrap_or(Ok(()));
            if answer.is_ok() {
                self.sent.push(*report).unwrap();
            }
            answer
        }
    }

    fn key(usage: u8) -> HidReport {
        let mut kb = KeyboardReport::empty();
        kb.push_key(usage);
        HidReport::Keyboard(kb)
    }

    fn connected<const M: usize>() -> ReportChannel<M> {
        let mut channel = ReportChannel::new();
        channel.set_connected(true);
        channel
    }

    #[test]
    fn reports_flow_through_when_idle() {
        let mut channel = connected::<5>();
        let mut sink = ScriptedSink::new();

        channel.submit(key(0x04), &mut sink).unwrap();
        channel.submit(key(0x05), &mut sink).unwrap();

        assert_eq!(sink.sent.as_slice(), &[key(0x04), key(0x05)]);
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn busy_keeps_head_and_order() {
        let mut channel = connected::<5>();
        let mut sink = ScriptedSink::new()
            .then(Err(TransportError::Busy))
            .then(Err(TransportError::Busy))
            .then(Err(TransportError::Busy));

        channel.submit(key(0x04), &mut sink).unwrap();
        channel.submit(key(0x05), &mut sink).unwrap();
        channel.submit(key(0x06), &mut sink).unwrap();
        assert!(sink.sent.is_empty());
        assert_eq!(channel.pending(), 3);

        channel.drain(&mut sink).unwrap();
        assert_eq!(sink.sent.as_slice(), &[key(0x04), key(0x05), key(0x06)]);
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn full_buffer_drops_newest() {
        let mut channel = connected::<2>();
        let mut sink = ScriptedSink::new()
            .then(Err(TransportError::Busy))
            .then(Err(TransportError::Busy))
            .then(Err(TransportError::Busy));

        channel.submit(key(0x04), &mut sink).unwrap();
        channel.submit(key(0x05), &mut sink).unwrap();
        channel.submit(key(0x06), &mut sink).unwrap();
        assert_eq!(channel.pending(), 2);

        channel.drain(&mut sink).unwrap();
        assert_eq!(sink.sent.as_slice(), &[key(0x04), key(0x05)]);
    }

    #[test]
    fn discarded_report_is_dropped_and_drain_continues() {
        let mut channel = connected::<5>();
        let mut sink = ScriptedSink::new()
            .then(Err(TransportError::Busy))
            .then(Err(TransportError::Discarded));

        channel.submit(key(0x04), &mut sink).unwrap();
        channel.submit(key(0x05), &mut sink).unwrap();

        assert_eq!(sink.sent.as_slice(), &[key(0x05)]);
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn transport_failure_is_fatal() {
        let mut channel = connected::<5>();
        let mut sink = ScriptedSink::new().then(Err(TransportError::Failed(0x13)));

        assert_eq!(
            channel.submit(key(0x04), &mut sink),
            Err(Error::Transport(0x13))
        );
    }

    #[test]
    fn nothing_queued_without_host() {
        let mut channel = ReportChannel::<5>::new();
        let mut sink = ScriptedSink::new();

        channel.submit(key(0x04), &mut sink).unwrap();
        assert_eq!(channel.pending(), 0);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn disconnect_drops_queued_reports() {
        let mut channel = connected::<5>();
        let mut sink = ScriptedSink::new().then(Err(TransportError::Busy));
        channel.submit(key(0x04), &mut sink).unwrap();
        assert_eq!(channel.pending(), 1);

        channel.set_connected(false);
        channel.set_connected(true);
        channel.drain(&mut sink).unwrap();
        assert_eq!(channel.pending(), 0);
        assert!(sink.sent.is_empty());
    }
}
