//! Macros for driving a [`Tag`] from a timer and an event source
//!
//! [`Tag`]: ../tag/struct.Tag.html


/// Waits for the next radio event, or until a timer runs out
///
/// Expects two arguments:
///
/// - A timer that implements `embedded_hal::timer::CountDown` and has already
///   been started
/// - An expression that evaluates to `nb::Result<RadioEvent, E>`, typically a
///   call to [`EventSource::poll_event`]
///
/// Evaluates the expression until it returns something other than
/// `WouldBlock`, and returns `Result<RadioEvent, E>`. If the timer runs out
/// first, returns `Ok(RadioEvent::Timeout)`.
///
/// # Example
///
/// ``` rust
/// use dw1000_twr::{
///     next_event,
///     radio::RadioEvent,
/// };
/// #
/// # struct Timer;
/// #
/// # impl embedded_hal::timer::CountDown for Timer {
/// #     type Time = ();
/// #     fn start<T>(&mut self, _: T) {}
/// #     fn wait(&mut self) -> nb::Result<(), void::Void> { Ok(()) }
/// # }
/// #
/// # let mut timer = Timer;
///
/// let event: Result<RadioEvent, ()> = next_event!(
///     &mut timer,
///     {
///         // Nothing happened on the radio yet
///         Err(nb::Error::WouldBlock)
///     }
/// );
///
/// assert_eq!(event, Ok(RadioEvent::Timeout));
/// ```
///
/// [`EventSource::poll_event`]: driver/trait.EventSource.html#tymethod.poll_event
#[macro_export]
macro_rules! next_event {
    ($timer:expr, $poll:expr) => {
        {
            #[allow(unused_imports)]
            use embedded_hal::prelude::*;

            fn check_type<T>(_: &mut T)
                where T: embedded_hal::timer::CountDown {}
            check_type($timer);

            loop {
                match $poll {
                    Ok(event) =>
                        break Ok(event),
                    Err(nb::Error::WouldBlock) =>
                        (),
                    Err(nb::Error::Other(error)) =>
                        break Err(error),
                }

                match $timer.wait() {
                    Ok(()) =>
                        break Ok($crate::radio::RadioEvent::Timeout),
                    Err(nb::Error::WouldBlock) =>
                        (),
                    Err(_) =>
                        unreachable!(),
                }
            }
        }
    }
}
