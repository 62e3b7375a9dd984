//! A minimal driving loop for [`Tag`]
//!
//! The tag itself never waits. Something has to deliver radio events to it,
//! and deliver [`RadioEvent::Timeout`] once the delay it asked for has
//! passed. Applications built on an interrupt framework will do that
//! themselves. For simpler ones, [`run_once`] does it with a `CountDown` timer and
//! a polled [`EventSource`].
//!
//! [`Tag`]: ../tag/struct.Tag.html
//! [`RadioEvent::Timeout`]: ../radio/enum.RadioEvent.html#variant.Timeout

use core::time::Duration;

use embedded_hal::timer::CountDown;

use crate::{
    radio::{
        Radio,
        RadioEvent,
    },
    tag::{
        State,
        Tag,
    },
};


/// Source of radio events, usually backed by the radio's IRQ line
pub trait EventSource {
    /// Error that can occur while checking for events
    type Error;

    /// Returns the next pending event, or `WouldBlock` if there is none
    fn poll_event(&mut self) -> nb::Result<RadioEvent, Self::Error>;
}


/// Waits for one event and hands it to the tag
///
/// Starts `timer` with `delay`, which should be the duration the previous call
/// to [`Tag::handle`] returned. Returns what [`Tag::handle`] returns for the
/// event, so the result can be fed into the next call.
///
/// [`Tag::handle`]: ../tag/struct.Tag.html#method.handle
pub fn run_once<R, S, T>(
    tag: &mut Tag,
    radio: &mut R,
    events: &mut S,
    timer: &mut T,
    delay: Duration,
) -> Result<(State, Duration), S::Error>
where
    R: Radio,
    S: EventSource,
    T: CountDown,
    T::Time: From<Duration>,
{
    timer.start(delay);
    let event = next_event!(timer, events.poll_event())?;

    Ok(tag.handle(radio, event))
}


#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        vec::Vec,
    };

    use crate::{
        configs::TagConfig,
        time::Timestamp,
    };

    use super::*;

    struct Timer {
        started: Vec<Duration>,
        ticks_left: usize,
    }

    impl CountDown for Timer {
        type Time = Duration;

        fn start<D>(&mut self, count: D)
        where
            D: Into<Duration>,
        {
            self.started.push(count.into());
            self.ticks_left = 3;
        }

        fn wait(&mut self) -> nb::Result<(), void::Void> {
            if self.ticks_left == 0 {
                return Ok(());
            }
            self.ticks_left -= 1;
            Err(nb::Error::WouldBlock)
        }
    }

    struct Events(VecDeque<nb::Result<RadioEvent, &'static str>>);

    impl EventSource for Events {
        type Error = &'static str;

        fn poll_event(&mut self) -> nb::Result<RadioEvent, &'static str> {
            self.0.pop_front().unwrap_or(Err(nb::Error::WouldBlock))
        }
    }

    #[derive(Default)]
    struct Radio {
        transmissions: usize,
    }

    impl crate::radio::Radio for Radio {
        type Error = ();

        fn idle(&mut self) -> Result<(), ()> {
            Ok(())
        }

        fn transmit(&mut self, _: &[u8], _: bool) -> Result<(), ()> {
            self.transmissions += 1;
            Ok(())
        }

        fn start_receive(&mut self) -> Result<(), ()> {
            Ok(())
        }

        fn data_length(&mut self) -> Result<usize, ()> {
            Ok(0)
        }

        fn read_data(&mut self, _: &mut [u8]) -> Result<(), ()> {
            Ok(())
        }

        fn tx_timestamp(&mut self) -> Result<Timestamp, ()> {
            Ok(Timestamp::default())
        }

        fn rx_timestamp(&mut self) -> Result<Timestamp, ()> {
            Ok(Timestamp::default())
        }

        fn receive_power(&mut self) -> Result<f32, ()> {
            Ok(-90.0)
        }
    }

    fn timer() -> Timer {
        Timer {
            started: Vec::new(),
            ticks_left: 0,
        }
    }

    #[test]
    fn expired_timer_starts_ranging() {
        let mut tag = Tag::new(TagConfig::new(0x42));
        let mut radio = Radio::default();
        let mut events = Events(VecDeque::new());
        let mut timer = timer();

        let (state, delay) = run_once(
            &mut tag,
            &mut radio,
            &mut events,
            &mut timer,
            Duration::from_millis(10),
        )
        .unwrap();

        assert_eq!(state, State::AwaitingAnswer);
        assert_eq!(delay, Duration::from_millis(10));
        assert_eq!(timer.started, [Duration::from_millis(10)]);
        assert_eq!(radio.transmissions, 1);
        assert_eq!(tag.stats().interrogations(), 1);
    }

    #[test]
    fn pending_event_is_handled_before_timeout() {
        let mut tag = Tag::new(TagConfig::new(0x42));
        let mut radio = Radio::default();
        let mut events = Events(
            vec![
                Err(nb::Error::WouldBlock),
                Ok(RadioEvent::ReceiveFailed),
            ]
            .into(),
        );
        let mut timer = timer();

        let (state, _) = run_once(
            &mut tag,
            &mut radio,
            &mut events,
            &mut timer,
            Duration::from_millis(10),
        )
        .unwrap();

        assert_eq!(state, State::Idle);
        assert_eq!(radio.transmissions, 0);
    }

    #[test]
    fn event_source_errors_are_returned() {
        let mut tag = Tag::new(TagConfig::new(0x42));
        let mut radio = Radio::default();
        let mut events = Events(vec![Err(nb::Error::Other("irq"))].into());
        let mut timer = timer();

        let result = run_once(
            &mut tag,
            &mut radio,
            &mut events,
            &mut timer,
            Duration::from_millis(10),
        );

        assert_eq!(result, Err("irq"));
    }
}
