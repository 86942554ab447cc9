//! Outbound delivery of unsolicited datagrams.
//!
//! Booking operations never reach for the server socket directly; they are
//! handed a [`Notifier`] and push update datagrams through it.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

/// Future returned by [`Notifier::send_to`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// Sends one datagram to one recipient.
pub trait Notifier: Send + Sync {
    fn send_to<'a>(&'a self, payload: &'a [u8], target: SocketAddr) -> SendFuture<'a>;
}

/// Sends through the server's UDP socket, bounded by a per-send timeout.
#[derive(Debug, Clone)]
pub struct UdpNotifier {
    socket: Arc<UdpSocket>,
    timeout: Duration,
}

impl UdpNotifier {
    pub fn new(socket: Arc<UdpSocket>, timeout: Duration) -> Self {
        Self { socket, timeout }
    }
}

impl Notifier for UdpNotifier {
    fn send_to<'a>(&'a self, payload: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.socket.send_to(payload, target)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("send to {target} timed out"),
                )),
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Records every datagram instead of sending it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingNotifier {
        sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
        unreachable: HashSet<SocketAddr>,
    }

    impl RecordingNotifier {
        pub(crate) fn failing_for(targets: impl IntoIterator<Item = SocketAddr>) -> Self {
            Self {
                sent: Mutex::default(),
                unreachable: targets.into_iter().collect(),
            }
        }

        pub(crate) fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }

        pub(crate) fn recipients(&self) -> Vec<SocketAddr> {
            self.sent().into_iter().map(|(addr, _)| addr).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send_to<'a>(&'a self, payload: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
            Box::pin(async move {
                if self.unreachable.contains(&target) {
                    return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "unreachable"));
                }
                self.sent.lock().unwrap().push((target, payload.to_vec()));
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn udp_notifier_delivers() {
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let observer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let notifier = UdpNotifier::new(server, Duration::from_secs(1));

        notifier
            .send_to(b"update", observer.local_addr().unwrap())
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = observer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"update");
    }
}
