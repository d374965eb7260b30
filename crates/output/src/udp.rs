// Copyright 2025-2026 CEMAXECUTER LLC

//! UDP datagram sink. Each transfer is sent as exactly one datagram,
//! so the engine's transfer size is derived from the link MTU.

use std::net::{SocketAddr, UdpSocket};

use duo_engine::{Transfer, TransferSink};

/// IPv4 header (20) plus UDP header (8).
const UDP_OVERHEAD: usize = 28;

/// Largest transfer payload that fits one datagram at the given MTU.
pub fn max_transfer_for_mtu(mtu: usize) -> Result<usize, String> {
    if mtu <= UDP_OVERHEAD {
        return Err(format!(
            "MTU {} leaves no room for payload after {} bytes of IP/UDP headers",
            mtu, UDP_OVERHEAD
        ));
    }
    Ok(mtu - UDP_OVERHEAD)
}

/// Sends each merged transfer to a fixed destination address.
pub struct UdpSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpSink {
    pub fn new(dest: SocketAddr) -> Result<Self, String> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| format!("failed to create UDP socket: {}", e))?;
        Ok(UdpSink { socket, dest })
    }
}

impl TransferSink for UdpSink {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        // A lost or refused datagram is not fatal to the stream.
        if let Err(e) = self.socket.send_to(transfer.bytes(), self.dest) {
            log::error!("sendto {} failed: {}", self.dest, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_engine::transfer::{SampleFormat, TransferData, TransferShape};

    #[test]
    fn test_mtu_payload_budget() {
        assert_eq!(max_transfer_for_mtu(1500).unwrap(), 1472);
        assert_eq!(max_transfer_for_mtu(9000).unwrap(), 8972);
        assert!(max_transfer_for_mtu(28).is_err());
        assert!(max_transfer_for_mtu(0).is_err());
    }

    #[test]
    fn test_datagram_length_matches_transfer() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_nonblocking(false).unwrap();
        let dest = receiver.local_addr().unwrap();

        let shape = TransferShape::new(SampleFormat::Short, 1472).unwrap();
        let scalars = vec![0x0102i16; shape.num_scalars];
        let transfer = Transfer {
            shape,
            data: TransferData::Short(&scalars),
        };

        let mut sink = UdpSink::new(dest).unwrap();
        sink.on_transfer(&transfer);

        let mut buf = [0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(len, shape.num_bytes);
        // Little-endian scalar layout on the wire
        assert_eq!(&buf[..4], &[0x02, 0x01, 0x02, 0x01]);
    }
}
