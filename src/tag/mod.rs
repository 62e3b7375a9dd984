//! The tag side of the ranging exchange
//!
//! The entry point is [`Tag`]. The application calls [`Tag::handle`] for
//! every radio event and calls it again with [`RadioEvent::Timeout`] once the
//! returned duration has passed without another event.
//!
//! One exchange looks like this:
//!
//! ``` text
//! Tag                         Anchor
//!  | ---- POLL (seq n) ------> |
//!  | <--- ANSWER (seq n) ----- |
//!  | ---- FINAL (seq n) -----> |
//!  | <--- REPORT (seq n) ----- |
//! ```
//!
//! Every timeout starts a new exchange with the next sequence number. Replies
//! that carry any other sequence number are discarded, so a stalled exchange
//! is simply abandoned.

use core::{
    num::Wrapping,
    time::Duration,
};

use crate::{
    configs::TagConfig,
    frame::Framer,
    message::{
        EnvironmentData,
        Message,
        MessageKind,
        ReportPayload,
        MAX_MESSAGE_LEN,
    },
    radio::{
        Radio,
        RadioEvent,
    },
    ranging,
    stats::{
        Statistics,
        StatsReport,
    },
    time::AntennaDelay,
    debug,
    error,
    info,
    warn,
};

pub use cycle::*;
pub use error::*;

mod cycle;
mod error;


/// Size of the frame buffers, the maximum IEEE 802.15.4 frame length
pub const FRAME_BUFFER_LEN: usize = 127;


/// Where the tag is in the exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No exchange in flight
    Idle,

    /// POLL sent, waiting for ANSWER
    AwaitingAnswer,

    /// FINAL sent, waiting for REPORT
    AwaitingReport,
}


/// A ranging tag
///
/// Owns all state of the ranging process: the exchange in flight, the
/// sequence number and the statistics. The radio is passed in with every
/// event.
#[derive(Debug)]
pub struct Tag {
    config: TagConfig,
    antenna_delay: AntennaDelay,
    framer: Framer,
    state: State,
    seq: Wrapping<u8>,
    cycle: Cycle,
    last_tx: Option<MessageKind>,
    stats: Statistics,
    last_distance: Option<f64>,
    environment: Option<EnvironmentData>,
}

impl Tag {
    /// Creates a tag
    ///
    /// The first exchange starts on the first [`RadioEvent::Timeout`].
    pub fn new(config: TagConfig) -> Self {
        Tag {
            config,
            antenna_delay: config.antenna_delay(),
            framer: Framer::new(config.pan_id, config.address),
            state: State::Idle,
            seq: Wrapping(0),
            cycle: Cycle::new(0),
            last_tx: None,
            stats: Statistics::new(),
            last_distance: None,
            environment: None,
        }
    }

    /// Handles a radio event
    ///
    /// Returns the new state and the time after which the driving loop should
    /// deliver [`RadioEvent::Timeout`], unless another event arrives first.
    /// Errors are logged and otherwise absorbed; use [`Tag::try_handle`] to
    /// observe them.
    pub fn handle<R>(&mut self, radio: &mut R, event: RadioEvent) -> (State, Duration)
    where
        R: Radio,
    {
        if let Err(err) = self.try_handle(radio, event) {
            match err {
                Error::StaleMessage {
                    kind: MessageKind::Report,
                    expected,
                    received,
                } => {
                    error!("REPORT: wrong sequence number {} (expected {})", received, expected);
                }
                Error::StaleMessage { received, .. } => {
                    debug!("wrong sequence number {}", received);
                }
                Error::ForeignMessage { .. } | Error::EmptyFrame => {
                    debug!("discarded: {}", err.reason());
                }
                _ => {
                    warn!("discarded: {}", err.reason());
                }
            }
        }

        (self.state, self.config.ranging_interval())
    }

    /// Handles a radio event, returning the error if there was one
    ///
    /// Leaves the tag in the same state [`Tag::handle`] would.
    pub fn try_handle<R>(&mut self, radio: &mut R, event: RadioEvent) -> Result<State, Error<R::Error>>
    where
        R: Radio,
    {
        match event {
            RadioEvent::Timeout => self.start_ranging(radio)?,
            RadioEvent::PacketSent => self.on_packet_sent(radio)?,
            RadioEvent::PacketReceived => self.on_packet_received(radio)?,
            // The next timeout starts over.
            RadioEvent::ReceiveFailed => {}
        }

        Ok(self.state)
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Sequence number of the current exchange
    pub fn seq(&self) -> u8 {
        self.seq.0
    }

    /// The exchange in flight
    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    /// The configuration the tag was created with
    pub fn config(&self) -> &TagConfig {
        &self.config
    }

    /// Statistics since the last report
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Returns the statistics and resets them
    pub fn report_and_reset(&mut self) -> StatsReport {
        let report = self.stats.report_and_reset();
        info!(
            "max = {} min = {} avg = {} rssi = {} plr = {}",
            report.max_distance,
            report.min_distance,
            report.avg_distance,
            report.avg_signal_power,
            report.packet_loss_percent
        );
        report
    }

    /// The most recent distance, in meters
    pub fn last_distance(&self) -> Option<f64> {
        self.last_distance
    }

    /// Sensor data from the most recent REPORT
    pub fn environment(&self) -> Option<&EnvironmentData> {
        self.environment.as_ref()
    }

    fn start_ranging<R>(&mut self, radio: &mut R) -> Result<(), Error<R::Error>>
    where
        R: Radio,
    {
        self.seq += Wrapping(1);
        self.cycle = Cycle::new(self.seq.0);
        self.state = State::Idle;

        radio.idle().map_err(Error::Radio)?;

        let anchor = self.config.anchor_address;
        self.send(radio, Message::Poll { seq: self.seq.0 }, anchor)?;

        self.stats.record_attempt();
        self.state = State::AwaitingAnswer;

        debug!("POLL {}", self.seq.0);
        Ok(())
    }

    fn on_packet_sent<R>(&mut self, radio: &mut R) -> Result<(), Error<R::Error>>
    where
        R: Radio,
    {
        let slot = match self.last_tx.take() {
            Some(MessageKind::Poll) => &mut self.cycle.poll_tx,
            Some(MessageKind::Final) => &mut self.cycle.final_tx,
            _ => return Ok(()),
        };

        let departure = radio.tx_timestamp().map_err(Error::Radio)?;
        *slot = Some(self.antenna_delay.capture_tx(departure));

        Ok(())
    }

    fn on_packet_received<R>(&mut self, radio: &mut R) -> Result<(), Error<R::Error>>
    where
        R: Radio,
    {
        let len = radio.data_length().map_err(Error::Radio)?;
        if len == 0 {
            return Err(Error::EmptyFrame);
        }
        if len > FRAME_BUFFER_LEN {
            radio.start_receive().map_err(Error::Radio)?;
            return Err(Error::FrameTooLong { len });
        }

        let mut buf = [0; FRAME_BUFFER_LEN];
        radio.read_data(&mut buf[..len]).map_err(Error::Radio)?;

        let envelope = match self.framer.decode(&buf[..len]) {
            Ok(envelope) => envelope,
            Err(err) => {
                radio.start_receive().map_err(Error::Radio)?;
                return Err(Error::Frame(err));
            }
        };

        if !self.framer.is_for_me(&envelope) {
            radio.start_receive().map_err(Error::Radio)?;
            return Err(Error::ForeignMessage {
                destination: envelope.destination,
            });
        }

        let peer = envelope.source.unwrap_or(self.config.anchor_address);

        let result = match Message::decode(envelope.payload) {
            Ok(Message::Answer { seq }) => self.on_answer(radio, seq, peer),
            Ok(Message::Report { seq, payload }) => self.on_report(radio, seq, payload),
            Ok(message) => Err(Error::UnexpectedMessage {
                kind: message.kind(),
                state: self.state,
            }),
            Err(err) => Err(Error::Message(err)),
        };

        // The frame was dropped, keep listening for the one we expect.
        if let Err(Error::Message(_))
        | Err(Error::UnexpectedMessage { .. })
        | Err(Error::StaleMessage { .. }) = result
        {
            radio.start_receive().map_err(Error::Radio)?;
        }

        result
    }

    fn on_answer<R>(&mut self, radio: &mut R, seq: u8, peer: u64) -> Result<(), Error<R::Error>>
    where
        R: Radio,
    {
        self.check_current::<R::Error>(MessageKind::Answer, seq, State::AwaitingAnswer)?;

        let arrival = radio.rx_timestamp().map_err(Error::Radio)?;
        self.cycle.answer_rx = Some(self.antenna_delay.capture_rx(arrival));

        self.send(radio, Message::Final { seq }, peer)?;
        self.state = State::AwaitingReport;

        debug!("ANSWER {}, FINAL sent", seq);
        Ok(())
    }

    fn on_report<R>(
        &mut self,
        radio: &mut R,
        seq: u8,
        report: ReportPayload,
    ) -> Result<(), Error<R::Error>>
    where
        R: Radio,
    {
        self.check_current::<R::Error>(MessageKind::Report, seq, State::AwaitingReport)?;
        self.state = State::Idle;

        self.cycle.poll_rx = Some(report.poll_rx);
        self.cycle.answer_tx = Some(report.answer_tx);
        self.cycle.final_rx = Some(report.final_rx);
        self.environment = Some(report.environment);

        let arrival = radio.rx_timestamp().map_err(Error::Radio)?;
        self.cycle.report_rx = Some(self.antenna_delay.capture_rx(arrival));

        let distance = ranging::compute_distance(&self.cycle.timestamps()?)?;
        let power = radio.receive_power().map_err(Error::Radio)?;

        self.stats.record_success(distance, power as f64);
        self.last_distance = Some(distance);

        info!("REPORT {}: {} m, {} dBm", seq, distance, power);
        Ok(())
    }

    fn check_current<E>(&self, kind: MessageKind, seq: u8, expected: State) -> Result<(), Error<E>> {
        if seq != self.cycle.seq {
            return Err(Error::StaleMessage {
                kind,
                expected: self.cycle.seq,
                received: seq,
            });
        }
        if self.state != expected {
            return Err(Error::UnexpectedMessage {
                kind,
                state: self.state,
            });
        }

        Ok(())
    }

    fn send<R>(&mut self, radio: &mut R, message: Message, destination: u64) -> Result<(), Error<R::Error>>
    where
        R: Radio,
    {
        let mut payload = [0; MAX_MESSAGE_LEN];
        let payload_len = message.encode(&mut payload)?;

        let mut frame = [0; FRAME_BUFFER_LEN];
        let len = self
            .framer
            .encode(&mut frame, destination, &payload[..payload_len])
            .map_err(Error::Frame)?;

        radio.transmit(&frame[..len], true).map_err(Error::Radio)?;
        self.last_tx = Some(message.kind());

        Ok(())
    }
}
