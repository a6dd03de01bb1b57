//! Lazy address enumeration feeding the worker pool.
//!
//! A producer task walks the address source and pushes each address into a
//! bounded channel. The channel closes when the producer returns, whether it
//! finished the source or hit a fault, so consumers never wait forever.

use std::net::IpAddr;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, SweepError};
use crate::netdetect::AddressBlock;

/// Addresses buffered between the producer and the pool.
pub const STREAM_BUFFER: usize = 100;

/// Receiving half of the address handoff plus the producer that owns the sending half.
#[derive(Debug)]
pub struct AddressStream {
    rx: mpsc::Receiver<IpAddr>,
    producer: JoinHandle<Result<u64>>,
}

impl AddressStream {
    /// Start enumerating `block` in ascending order.
    pub fn from_block(block: AddressBlock) -> Self {
        Self::from_source(block.addresses().map(Ok))
    }

    /// Start enumerating an arbitrary fallible source.
    ///
    /// The first `Err` stops enumeration and is returned by [`AddressStream::finish`].
    pub fn from_source<I>(source: I) -> Self
    where
        I: IntoIterator<Item = Result<IpAddr>> + Send + 'static,
        I::IntoIter: Send,
    {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let producer = tokio::spawn(produce(source.into_iter(), tx));
        Self { rx, producer }
    }

    /// Next address, or `None` once the producer has finished.
    pub async fn recv(&mut self) -> Option<IpAddr> {
        self.rx.recv().await
    }

    /// Stop accepting addresses and wait for the producer.
    ///
    /// Returns how many addresses were handed over, or the enumeration fault.
    pub async fn finish(self) -> Result<u64> {
        let Self { rx, producer } = self;
        drop(rx);
        match producer.await {
            Ok(res) => res,
            Err(e) => Err(SweepError::Enumeration(format!("producer task failed: {e}"))),
        }
    }
}

async fn produce<I>(source: I, tx: mpsc::Sender<IpAddr>) -> Result<u64>
where
    I: Iterator<Item = Result<IpAddr>>,
{
    let mut sent = 0u64;
    for item in source {
        let addr = item?;
        if tx.send(addr).await.is_err() {
            // Receiver dropped: the sweep stopped pulling.
            tracing::debug!(sent, "address stream receiver closed early");
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn yields_block_in_order_then_closes() {
        let block = AddressBlock::parse("10.0.0.0/29").unwrap();
        let mut stream = AddressStream::from_block(block);
        let mut seen = Vec::new();
        while let Some(addr) = stream.recv().await {
            seen.push(addr);
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(seen[0], IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(seen[7], IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(stream.finish().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn fault_closes_stream_and_surfaces() {
        let source = vec![
            Ok(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
            Err(SweepError::Enumeration("boom".into())),
            Ok(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))),
        ];
        let mut stream = AddressStream::from_source(source);
        assert!(stream.recv().await.is_some());
        assert!(stream.recv().await.is_none());
        let err = stream.finish().await.unwrap_err();
        assert!(matches!(err, SweepError::Enumeration(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn early_finish_stops_large_block() {
        let block = AddressBlock::parse("10.0.0.0/8").unwrap();
        let mut stream = AddressStream::from_block(block);
        assert!(stream.recv().await.is_some());
        let sent = stream.finish().await.unwrap();
        assert!(sent < block.len() as u64);
    }
}
