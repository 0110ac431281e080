//! An in-memory transport for tests: two connected endpoints with channel
//! backed streams, implementing just enough of the transport trait for the
//! session engine.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::sync::watch;

#[derive(Debug, Clone, thiserror::Error)]
#[error("mock transport: {0}")]
pub struct MockError(pub &'static str);

impl web_transport_trait::Error for MockError {}

enum Chunk {
	Data(Bytes),
	Fin,
	Reset(u32),
}

pub struct MockSend {
	data: tokio::sync::mpsc::UnboundedSender<Chunk>,
	stopped: watch::Receiver<Option<u32>>,
}

pub struct MockRecv {
	data: tokio::sync::mpsc::UnboundedReceiver<Chunk>,
	stop: watch::Sender<Option<u32>>,
	buffer: BytesMut,
	fin: bool,
}

// A one-directional pipe: bytes written to the MockSend arrive at the MockRecv.
fn pipe() -> (MockSend, MockRecv) {
	let (data_tx, data_rx) = tokio::sync::mpsc::unbounded_channel();
	let (stop_tx, stop_rx) = watch::channel(None);

	(
		MockSend {
			data: data_tx,
			stopped: stop_rx,
		},
		MockRecv {
			data: data_rx,
			stop: stop_tx,
			buffer: BytesMut::new(),
			fin: false,
		},
	)
}

impl web_transport_trait::SendStream for MockSend {
	type Error = MockError;

	async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
		if self.stopped.borrow().is_some() {
			return Err(MockError("stopped"));
		}

		let chunk = Bytes::copy_from_slice(buf);
		let size = chunk.len();

		self.data.send(Chunk::Data(chunk)).map_err(|_| MockError("closed"))?;
		Ok(size)
	}

	async fn write_buf<B: Buf + Send>(&mut self, buf: &mut B) -> Result<usize, Self::Error> {
		if self.stopped.borrow().is_some() {
			return Err(MockError("stopped"));
		}

		let chunk = buf.copy_to_bytes(buf.remaining());
		let size = chunk.len();

		self.data.send(Chunk::Data(chunk)).map_err(|_| MockError("closed"))?;
		Ok(size)
	}

	async fn finish(&mut self) -> Result<(), Self::Error> {
		self.data.send(Chunk::Fin).map_err(|_| MockError("closed"))?;
		Ok(())
	}

	fn reset(&mut self, code: u32) {
		self.data.send(Chunk::Reset(code)).ok();
	}

	fn set_priority(&mut self, _priority: i32) {}

	async fn closed(&mut self) -> Result<(), Self::Error> {
		self.stopped.wait_for(|stop| stop.is_some()).await.map_err(|_| MockError("closed"))?;
		Ok(())
	}
}

impl MockRecv {
	// Make sure the buffer is non-empty, returning false at end of stream.
	async fn fill(&mut self) -> Result<bool, MockError> {
		while self.buffer.is_empty() {
			if self.fin {
				return Ok(false);
			}

			match self.data.recv().await {
				Some(Chunk::Data(data)) => self.buffer.put(data),
				Some(Chunk::Fin) | None => self.fin = true,
				Some(Chunk::Reset(_code)) => return Err(MockError("reset")),
			}
		}

		Ok(true)
	}
}

impl web_transport_trait::RecvStream for MockRecv {
	type Error = MockError;

	async fn read(&mut self, dst: &mut [u8]) -> Result<Option<usize>, Self::Error> {
		if !self.fill().await? {
			return Ok(None);
		}

		let size = self.buffer.len().min(dst.len());
		let chunk = self.buffer.split_to(size);
		dst[..size].copy_from_slice(&chunk);
		Ok(Some(size))
	}

	async fn closed(&mut self) -> Result<(), Self::Error> {
		while self.fill().await? {
			self.buffer.clear();
		}
		Ok(())
	}

	async fn read_buf<B: BufMut + Send>(&mut self, buf: &mut B) -> Result<Option<usize>, Self::Error> {
		if !self.fill().await? {
			return Ok(None);
		}

		let chunk = self.buffer.split().freeze();
		let size = chunk.len();
		buf.put(chunk);
		Ok(Some(size))
	}

	async fn read_chunk(&mut self, max: usize) -> Result<Option<Bytes>, Self::Error> {
		if !self.fill().await? {
			return Ok(None);
		}

		let size = self.buffer.len().min(max);
		Ok(Some(self.buffer.split_to(size).freeze()))
	}

	fn stop(&mut self, code: u32) {
		self.stop.send(Some(code)).ok();
	}
}

type BiStream = (MockSend, MockRecv);

struct Endpoint {
	bi_tx: async_channel::Sender<BiStream>,
	bi_rx: async_channel::Receiver<BiStream>,
	uni_tx: async_channel::Sender<MockRecv>,
	uni_rx: async_channel::Receiver<MockRecv>,
	closed: watch::Sender<Option<u32>>,
}

/// One endpoint of an in-memory connection; see [pair].
#[derive(Clone)]
pub struct MockSession {
	local: std::sync::Arc<Endpoint>,
}

/// Two connected endpoints; streams opened on one are accepted on the other.
pub fn pair() -> (MockSession, MockSession) {
	let (a_bi_tx, a_bi_rx) = async_channel::unbounded();
	let (b_bi_tx, b_bi_rx) = async_channel::unbounded();
	let (a_uni_tx, a_uni_rx) = async_channel::unbounded();
	let (b_uni_tx, b_uni_rx) = async_channel::unbounded();
	let closed = watch::channel(None).0;

	let a = MockSession {
		local: std::sync::Arc::new(Endpoint {
			bi_tx: b_bi_tx,
			bi_rx: a_bi_rx,
			uni_tx: b_uni_tx,
			uni_rx: a_uni_rx,
			closed: closed.clone(),
		}),
	};

	let b = MockSession {
		local: std::sync::Arc::new(Endpoint {
			bi_tx: a_bi_tx,
			bi_rx: b_bi_rx,
			uni_tx: a_uni_tx,
			uni_rx: b_uni_rx,
			closed,
		}),
	};

	(a, b)
}

impl web_transport_trait::Session for MockSession {
	type SendStream = MockSend;
	type RecvStream = MockRecv;
	type Error = MockError;

	async fn open_bi(&self) -> Result<(Self::SendStream, Self::RecvStream), Self::Error> {
		let (local_send, remote_recv) = pipe();
		let (remote_send, local_recv) = pipe();

		self.local
			.bi_tx
			.send((remote_send, remote_recv))
			.await
			.map_err(|_| MockError("closed"))?;

		Ok((local_send, local_recv))
	}

	async fn accept_bi(&self) -> Result<(Self::SendStream, Self::RecvStream), Self::Error> {
		let mut closed = self.local.closed.subscribe();

		tokio::select! {
			stream = self.local.bi_rx.recv() => stream.map_err(|_| MockError("closed")),
			_ = closed.wait_for(|closed| closed.is_some()) => Err(MockError("closed")),
		}
	}

	async fn open_uni(&self) -> Result<Self::SendStream, Self::Error> {
		let (local_send, remote_recv) = pipe();

		self.local
			.uni_tx
			.send(remote_recv)
			.await
			.map_err(|_| MockError("closed"))?;

		Ok(local_send)
	}

	async fn accept_uni(&self) -> Result<Self::RecvStream, Self::Error> {
		let mut closed = self.local.closed.subscribe();

		tokio::select! {
			stream = self.local.uni_rx.recv() => stream.map_err(|_| MockError("closed")),
			_ = closed.wait_for(|closed| closed.is_some()) => Err(MockError("closed")),
		}
	}

	fn send_datagram(&self, _payload: Bytes) -> Result<(), Self::Error> {
		Err(MockError("datagrams unsupported"))
	}

	async fn recv_datagram(&self) -> Result<Bytes, Self::Error> {
		Err(MockError("datagrams unsupported"))
	}

	fn max_datagram_size(&self) -> usize {
		0
	}

	fn close(&self, code: u32, _reason: &str) {
		self.local.closed.send_replace(Some(code));
	}

	async fn closed(&self) -> Self::Error {
		let mut closed = self.local.closed.subscribe();
		closed.wait_for(|closed| closed.is_some()).await.ok();
		MockError("closed")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use web_transport_trait::{RecvStream, SendStream, Session};

	#[tokio::test]
	async fn round_trip() {
		let (client, server) = pair();

		let (mut send, _recv) = client.open_bi().await.unwrap();
		let (_peer_send, mut peer_recv) = server.accept_bi().await.unwrap();

		let mut buf = std::io::Cursor::new(b"hello".to_vec());
		send.write_buf(&mut buf).await.unwrap();
		send.finish().await.unwrap();

		let mut received = BytesMut::new();
		while peer_recv.read_buf(&mut received).await.unwrap().is_some() {}
		assert_eq!(received.as_ref(), b"hello");
	}

	#[tokio::test]
	async fn read_chunk_respects_max() {
		let (client, server) = pair();

		let mut send = client.open_uni().await.unwrap();
		let mut recv = server.accept_uni().await.unwrap();

		let mut buf = std::io::Cursor::new(b"abcdef".to_vec());
		send.write_buf(&mut buf).await.unwrap();
		send.finish().await.unwrap();

		let chunk = recv.read_chunk(4).await.unwrap().unwrap();
		assert_eq!(chunk.as_ref(), b"abcd");

		let chunk = recv.read_chunk(4).await.unwrap().unwrap();
		assert_eq!(chunk.as_ref(), b"ef");

		assert!(recv.read_chunk(4).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn stop_wakes_sender() {
		let (client, server) = pair();

		let mut send = client.open_uni().await.unwrap();
		let mut recv = server.accept_uni().await.unwrap();

		recv.stop(7);
		send.closed().await.unwrap();
	}
}
