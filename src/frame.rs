//! The IEEE 802.15.4 envelope around ranging messages
//!
//! Ranging messages are carried in MAC data frames with extended (EUI-64)
//! source and destination addresses. Both addresses share one PAN ID, so PAN
//! ID compression is always used. No FCS is written or expected, the radio
//! handles that.

use core::num::Wrapping;

use byte::BytesExt as _;
use ieee802154::mac::{
    self,
    FooterMode,
    FrameSerDesContext,
};


/// Builds and parses the MAC frames of one node
#[derive(Debug)]
pub struct Framer {
    pan_id: mac::PanId,
    address: mac::ExtendedAddress,
    seq: Wrapping<u8>,
}

impl Framer {
    /// Creates a framer for the node with the given address
    pub fn new(pan_id: u16, address: u64) -> Self {
        Framer {
            pan_id: mac::PanId(pan_id),
            address: mac::ExtendedAddress(address),
            seq: Wrapping(0),
        }
    }

    /// The address of this node
    pub fn address(&self) -> u64 {
        self.address.0
    }

    /// Writes a data frame carrying `payload` to `destination` into `buf`
    ///
    /// Returns the length of the frame. Every frame gets the next MAC sequence
    /// number, which is independent of the ranging sequence number.
    pub fn encode(
        &mut self,
        buf: &mut [u8],
        destination: u64,
        payload: &[u8],
    ) -> Result<usize, byte::Error> {
        let seq = self.seq.0;
        self.seq += Wrapping(1);

        let frame = mac::Frame {
            header: mac::Header {
                frame_type: mac::FrameType::Data,
                version: mac::FrameVersion::Ieee802154_2006,
                auxiliary_security_header: None,
                ie_present: false,
                seq_no_suppress: false,
                frame_pending: false,
                ack_request: false,
                pan_id_compress: true,
                destination: Some(mac::Address::Extended(
                    self.pan_id,
                    mac::ExtendedAddress(destination),
                )),
                source: Some(mac::Address::Extended(self.pan_id, self.address)),
                seq,
            },
            content: mac::FrameContent::Data,
            payload,
            footer: [0; 2],
        };

        let mut len = 0;
        buf.write_with(
            &mut len,
            frame,
            &mut FrameSerDesContext::no_security(FooterMode::None),
        )?;

        Ok(len)
    }

    /// Parses a received frame
    pub fn decode<'b>(&self, buf: &'b [u8]) -> Result<Envelope<'b>, byte::Error> {
        let frame: mac::Frame<'b> = buf.read_with(&mut 0, FooterMode::None)?;

        Ok(Envelope {
            source: extended(frame.header.source),
            destination: extended(frame.header.destination),
            payload: frame.payload,
        })
    }

    /// Whether a frame with this destination is meant for this node
    pub fn is_for_me(&self, envelope: &Envelope) -> bool {
        envelope.destination == Some(self.address.0)
    }
}


/// The parts of a received frame the tag cares about
#[derive(Debug, PartialEq, Eq)]
pub struct Envelope<'b> {
    /// Extended source address, `None` if absent or short
    pub source: Option<u64>,

    /// Extended destination address, `None` if absent or short
    pub destination: Option<u64>,

    /// The frame payload, which holds the ranging message
    pub payload: &'b [u8],
}

fn extended(address: Option<mac::Address>) -> Option<u64> {
    match address {
        Some(mac::Address::Extended(_, address)) => Some(address.0),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const TAG: u64 = 0xbccf_0000_0000_0042;
    const ANCHOR: u64 = 0xbccf_0000_0000_0001;

    #[test]
    fn frame_round_trip() {
        let mut tag = Framer::new(0xbccf, TAG);
        let anchor = Framer::new(0xbccf, ANCHOR);

        let mut buf = [0; 64];
        let len = tag.encode(&mut buf, ANCHOR, &[0x01, 0x05]).unwrap();

        // frame control, seq, PAN ID, two extended addresses, payload
        assert_eq!(len, 2 + 1 + 2 + 8 + 8 + 2);

        let envelope = anchor.decode(&buf[..len]).unwrap();
        assert_eq!(envelope.source, Some(TAG));
        assert_eq!(envelope.destination, Some(ANCHOR));
        assert_eq!(envelope.payload, &[0x01, 0x05]);
        assert!(anchor.is_for_me(&envelope));
        assert!(!tag.is_for_me(&envelope));
    }

    #[test]
    fn mac_sequence_number_increments() {
        let mut tag = Framer::new(0xbccf, TAG);
        let mut buf = [0; 64];

        tag.encode(&mut buf, ANCHOR, &[]).unwrap();
        assert_eq!(buf[2], 0);
        tag.encode(&mut buf, ANCHOR, &[]).unwrap();
        assert_eq!(buf[2], 1);
    }

    #[test]
    fn encode_fails_on_small_buffer() {
        let mut tag = Framer::new(0xbccf, TAG);
        let mut buf = [0; 8];

        assert!(tag.encode(&mut buf, ANCHOR, &[0x01, 0x05]).is_err());
    }

    #[test]
    fn garbage_does_not_decode() {
        let tag = Framer::new(0xbccf, TAG);
        assert!(tag.decode(&[0xff]).is_err());
    }
}
