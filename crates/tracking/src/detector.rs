//! Pattern detector implementations
//!
//! Each detector decodes its own marker framing from raw image bytes:
//! a 4-byte sentinel, a u16-le payload length, the payload, and an XOR
//! checksum byte. The variant is chosen once at startup from configuration;
//! dispatch goes through the closed [`Detector`] enum, not per-call dynamic
//! lookup.

use bytes::Bytes;
use contracts::{DetectorKind, ImageBuffer, PatternDetector};
use tracing::trace;

const QR_SENTINEL: &[u8; 4] = b"QRC\x01";
const DMX_SENTINEL: &[u8; 4] = b"DMX\x01";

/// Build the configured detector variant.
pub fn build_detector(kind: DetectorKind) -> Detector {
    match kind {
        DetectorKind::QrCode => Detector::QrCode(QrCodeDetector::default()),
        DetectorKind::DataMatrix => Detector::DataMatrix(DataMatrixDetector::default()),
    }
}

/// Closed set of detector implementations.
pub enum Detector {
    QrCode(QrCodeDetector),
    DataMatrix(DataMatrixDetector),
}

impl PatternDetector for Detector {
    fn detect(&mut self, image: &ImageBuffer) -> bool {
        match self {
            Detector::QrCode(d) => d.detect(image),
            Detector::DataMatrix(d) => d.detect(image),
        }
    }

    fn message(&self) -> Option<&str> {
        match self {
            Detector::QrCode(d) => d.message(),
            Detector::DataMatrix(d) => d.message(),
        }
    }
}

/// QR-code pattern detector
#[derive(Default)]
pub struct QrCodeDetector {
    message: Option<String>,
}

impl QrCodeDetector {
    /// Encode a payload into the QR marker framing (used by synthetic feeds).
    pub fn encode(message: &str) -> Bytes {
        encode_marker(QR_SENTINEL, message)
    }
}

impl PatternDetector for QrCodeDetector {
    fn detect(&mut self, image: &ImageBuffer) -> bool {
        scan_marker(QR_SENTINEL, image, &mut self.message)
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Data-matrix pattern detector
#[derive(Default)]
pub struct DataMatrixDetector {
    message: Option<String>,
}

impl DataMatrixDetector {
    /// Encode a payload into the data-matrix marker framing.
    pub fn encode(message: &str) -> Bytes {
        encode_marker(DMX_SENTINEL, message)
    }
}

impl PatternDetector for DataMatrixDetector {
    fn detect(&mut self, image: &ImageBuffer) -> bool {
        scan_marker(DMX_SENTINEL, image, &mut self.message)
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

fn encode_marker(sentinel: &[u8; 4], message: &str) -> Bytes {
    let payload = message.as_bytes();
    let len = payload.len().min(u16::MAX as usize) as u16;
    let payload = &payload[..len as usize];

    let mut out = Vec::with_capacity(4 + 2 + payload.len() + 1);
    out.extend_from_slice(sentinel);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    out.push(xor_checksum(payload));
    Bytes::from(out)
}

/// Scan the image buffer for a marker; on success store the decoded payload.
///
/// A previously decoded message is retained when the current frame has no
/// marker, matching the "last decoded message" contract of the message
/// channel.
fn scan_marker(sentinel: &[u8; 4], image: &ImageBuffer, message: &mut Option<String>) -> bool {
    let data = image.data.as_ref();
    let mut offset = 0;
    while let Some(pos) = find_sentinel(&data[offset..], sentinel) {
        let start = offset + pos + sentinel.len();
        if let Some(decoded) = decode_at(data, start) {
            trace!(len = decoded.len(), "pattern decoded");
            *message = Some(decoded);
            return true;
        }
        offset += pos + 1;
    }
    false
}

fn find_sentinel(haystack: &[u8], sentinel: &[u8; 4]) -> Option<usize> {
    haystack
        .windows(sentinel.len())
        .position(|window| window == sentinel)
}

fn decode_at(data: &[u8], start: usize) -> Option<String> {
    let len_bytes = data.get(start..start + 2)?;
    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let payload = data.get(start + 2..start + 2 + len)?;
    let checksum = *data.get(start + 2 + len)?;
    if xor_checksum(payload) != checksum {
        return None;
    }
    String::from_utf8(payload.to_vec()).ok()
}

fn xor_checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PixelFormat;

    fn image_with(pattern: &Bytes, offset: usize) -> ImageBuffer {
        let mut data = vec![200u8; 1024];
        data[offset..offset + pattern.len()].copy_from_slice(pattern);
        ImageBuffer {
            width: 32,
            height: 32,
            format: PixelFormat::Mono8,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn qr_detector_decodes_embedded_payload() {
        let pattern = QrCodeDetector::encode("hello pattern");
        let image = image_with(&pattern, 100);

        let mut detector = QrCodeDetector::default();
        assert!(detector.detect(&image));
        assert_eq!(detector.message(), Some("hello pattern"));
    }

    #[test]
    fn detector_keeps_last_message_when_pattern_absent() {
        let pattern = QrCodeDetector::encode("sticky");
        let mut detector = QrCodeDetector::default();
        assert!(detector.detect(&image_with(&pattern, 10)));

        let blank = ImageBuffer {
            width: 32,
            height: 32,
            format: PixelFormat::Mono8,
            data: Bytes::from(vec![0u8; 1024]),
        };
        assert!(!detector.detect(&blank));
        assert_eq!(detector.message(), Some("sticky"));
    }

    #[test]
    fn detectors_ignore_foreign_framing() {
        let dmx_pattern = DataMatrixDetector::encode("not for qr");
        let image = image_with(&dmx_pattern, 50);

        let mut qr = QrCodeDetector::default();
        assert!(!qr.detect(&image));
        assert_eq!(qr.message(), None);

        let mut dmx = DataMatrixDetector::default();
        assert!(dmx.detect(&image));
        assert_eq!(dmx.message(), Some("not for qr"));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let pattern = QrCodeDetector::encode("payload");
        let mut data = vec![0u8; 256];
        data[20..20 + pattern.len()].copy_from_slice(&pattern);
        // Flip a payload byte without fixing the checksum
        data[20 + 7] ^= 0xff;
        let image = ImageBuffer {
            width: 16,
            height: 16,
            format: PixelFormat::Mono8,
            data: Bytes::from(data),
        };

        let mut detector = QrCodeDetector::default();
        assert!(!detector.detect(&image));
    }

    #[test]
    fn build_detector_honors_kind() {
        let mut qr = build_detector(DetectorKind::QrCode);
        let mut dmx = build_detector(DetectorKind::DataMatrix);

        let pattern = QrCodeDetector::encode("variant check");
        let image = image_with(&pattern, 30);
        assert!(qr.detect(&image));
        assert!(!dmx.detect(&image));
    }
}
