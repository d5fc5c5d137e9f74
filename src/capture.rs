use std::{
    io,
    pin::Pin,
    task::{ready, Context, Poll},
};

use log::warn;
use tokio::io::{AsyncRead, ReadBuf};

use crate::constants::CAPTURE_BUF_LEN;

/// One frame source, optionally attributed to the interface it listens on.
pub(crate) struct Tap<T> {
    interface: Option<String>,
    reader: T,
    buf: Box<[u8]>,
    closed: bool,
}

impl<T: AsyncRead + Unpin> Tap<T> {
    pub(crate) fn new(interface: Option<String>, reader: T) -> Self {
        Self {
            interface,
            reader,
            buf: vec![0; CAPTURE_BUF_LEN].into_boxed_slice(),
            closed: false,
        }
    }

    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        let mut buf = ReadBuf::new(&mut self.buf);
        match Pin::new(&mut self.reader).poll_read(cx, &mut buf) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(buf.filled().len())),
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Location of the last frame read, valid until the next poll.
#[derive(Copy, Clone, Debug)]
pub(crate) struct FrameRef {
    tap: usize,
    len: usize,
}

/// Captured traffic a session listens to.
pub(crate) enum Capture<'c, R> {
    /// Opened by the session, one tap per scanned interface. Polling starts
    /// at `next` so that a busy interface cannot starve the others.
    Owned { taps: Vec<Tap<R>>, next: usize },
    /// Supplied by the caller, only borrowed for the session's lifetime.
    Shared(Tap<&'c mut R>),
    Released,
}

impl<'c, R: AsyncRead + Unpin> Capture<'c, R> {
    pub(crate) fn owned(taps: Vec<Tap<R>>) -> Self {
        Capture::Owned { taps, next: 0 }
    }

    pub(crate) fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<FrameRef>> {
        match self {
            Capture::Owned { taps, next } => {
                let frame = ready!(poll_taps(taps, *next, cx))?;
                *next = (frame.tap + 1) % taps.len();
                Poll::Ready(Ok(frame))
            }
            Capture::Shared(tap) => poll_taps(std::slice::from_mut(tap), 0, cx),
            Capture::Released => Poll::Pending,
        }
    }

    pub(crate) fn frame(&self, frame: FrameRef) -> (Option<&str>, &[u8]) {
        let tap = match self {
            Capture::Owned { taps, .. } => {
                taps.get(frame.tap).map(|tap| (&tap.interface, &tap.buf))
            }
            Capture::Shared(tap) => Some((&tap.interface, &tap.buf)),
            Capture::Released => None,
        };
        match tap {
            Some((interface, buf)) => (interface.as_deref(), &buf[..frame.len]),
            None => (None, &[] as &[u8]),
        }
    }

    /// Drops the taps the session opened and lets go of a shared capture.
    pub(crate) fn release(&mut self) {
        *self = Capture::Released;
    }
}

fn poll_taps<T: AsyncRead + Unpin>(
    taps: &mut [Tap<T>],
    start: usize,
    cx: &mut Context<'_>,
) -> Poll<io::Result<FrameRef>> {
    let count = taps.len();
    for idx in (0..count).map(|offset| (start + offset) % count) {
        let tap = &mut taps[idx];
        if tap.closed {
            continue;
        }
        match tap.poll_frame(cx) {
            Poll::Ready(Ok(0)) => {
                warn!(
                    "capture on {} closed",
                    tap.interface.as_deref().unwrap_or("shared source")
                );
                tap.closed = true;
            }
            Poll::Ready(Ok(len)) => return Poll::Ready(Ok(FrameRef { tap: idx, len })),
            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
            Poll::Pending => {}
        }
    }
    Poll::Pending
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use futures::future::poll_fn;

    use super::{Capture, Tap};
    use crate::link::mock::{MockRx, Wire};

    async fn next_interface(capture: &mut Capture<'_, MockRx>) -> String {
        let frame = poll_fn(|cx| capture.poll_frame(cx)).await.unwrap();
        capture.frame(frame).0.unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_taps_take_turns() {
        let wire = Rc::new(Wire::default());
        let (eth0, rx0) = MockRx::new(Rc::clone(&wire));
        let (eth1, rx1) = MockRx::new(Rc::clone(&wire));
        for _ in 0..3 {
            eth0.send(vec![0; 60]).unwrap();
        }
        eth1.send(vec![1; 60]).unwrap();

        let mut capture = Capture::owned(vec![
            Tap::new(Some("eth0".into()), rx0),
            Tap::new(Some("eth1".into()), rx1),
        ]);
        let mut order = Vec::new();
        for _ in 0..4 {
            order.push(next_interface(&mut capture).await);
        }
        assert_eq!(order, ["eth0", "eth1", "eth0", "eth0"]);
    }

    #[tokio::test]
    async fn test_closed_tap_is_skipped() {
        let wire = Rc::new(Wire::default());
        let (eth0, rx0) = MockRx::new(Rc::clone(&wire));
        let (eth1, rx1) = MockRx::new(Rc::clone(&wire));
        drop(eth0);
        eth1.send(vec![1; 60]).unwrap();
        eth1.send(vec![1; 42]).unwrap();

        let mut capture = Capture::owned(vec![
            Tap::new(Some("eth0".into()), rx0),
            Tap::new(Some("eth1".into()), rx1),
        ]);
        assert_eq!(next_interface(&mut capture).await, "eth1");
        let frame = poll_fn(|cx| capture.poll_frame(cx)).await.unwrap();
        assert_eq!(capture.frame(frame), (Some("eth1"), &[1u8; 42][..]));

        capture.release();
        assert_eq!(wire.rx_released.get(), 2);
    }
}
