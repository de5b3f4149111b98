//! Periodic empty frames for the peer's idle timeout

use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

pin_project! {
    /// Ticks once per period. Without a period it stays pending forever
    #[derive(Debug)]
    pub struct HeartBeat {
        #[pin]
        interval: Option<IntervalStream>,
        period: Option<Duration>,
    }
}

impl HeartBeat {
    /// A heartbeat that never ticks
    pub fn never() -> Self {
        Self {
            interval: None,
            period: None,
        }
    }

    /// A heartbeat whose first tick is one `period` from now
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(IntervalStream::new(interval)),
            period: Some(period),
        }
    }

    /// The period, `None` for a heartbeat that never ticks
    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl Stream for HeartBeat {
    type Item = Instant;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.project().interval.as_pin_mut() {
            Some(interval) => interval.poll_next(cx),
            None => Poll::Pending,
        }
    }
}
