//! Frame demarcation over a raw, half-duplex serial byte stream.
//!
//! Modbus RTU classically delimits frames with a >=3.5-character idle gap.
//! This reader instead infers the frame length from the function-code byte
//! (and, for the variable-length writes, a single byte-count field), which
//! is sufficient because every supported request has a deterministic length.

use std::io::{self, ErrorKind, Read};

/// Attempt to fill `buf` completely from `source`. A short read (the
/// underlying transport times out or reports EOF before `buf` is full)
/// abandons the read entirely: whatever was collected is discarded and
/// `Ok(None)` is returned, per the "short reads abandon the frame" rule.
/// A timeout with zero bytes collected is ordinary bus idleness and stays
/// silent; a timeout after some bytes already arrived is a genuinely
/// truncated frame and is logged.
fn read_exact_or_abandon(source: &mut dyn Read, buf: &mut [u8]) -> io::Result<Option<()>> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled > 0 {
                    log::warn!("frame truncated after {filled}/{} bytes: peer closed mid-frame", buf.len());
                }
                return Ok(None);
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock => {
                if filled > 0 {
                    log::warn!("frame truncated after {filled}/{} bytes: read timed out", buf.len());
                }
                return Ok(None);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(Some(()))
}

fn read_n(source: &mut dyn Read, n: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; n];
    match read_exact_or_abandon(source, &mut buf)? {
        Some(()) => Ok(Some(buf)),
        None => Ok(None),
    }
}

/// Read one complete Modbus RTU request frame (header + payload + CRC) from
/// `source`. Returns:
/// - `Ok(Some(frame))` once a full frame has been collected,
/// - `Ok(None)` if the stream went quiet (idle bus, short read, or a
///   sequence of unsupported function codes that never resynchronized),
/// - `Err` only for a genuine, non-timeout I/O failure.
pub fn read_modbus_frame(source: &mut dyn Read) -> io::Result<Option<Vec<u8>>> {
    loop {
        let header = match read_n(source, 2)? {
            Some(h) => h,
            None => return Ok(None),
        };
        let slave_id = header[0];
        let function_code = header[1];

        let tail = match function_code {
            0x01..=0x06 => read_n(source, 6)?,
            0x0F | 0x10 => {
                let addr_qty = match read_n(source, 4)? {
                    Some(b) => b,
                    None => return Ok(None),
                };
                let byte_count_buf = match read_n(source, 1)? {
                    Some(b) => b,
                    None => return Ok(None),
                };
                let byte_count = byte_count_buf[0] as usize;
                let payload = match read_n(source, byte_count + 2)? {
                    Some(b) => b,
                    None => return Ok(None),
                };
                let mut combined = addr_qty;
                combined.extend(byte_count_buf);
                combined.extend(payload);
                Some(combined)
            }
            0x14 => {
                let byte_count_buf = match read_n(source, 1)? {
                    Some(b) => b,
                    None => return Ok(None),
                };
                let byte_count = byte_count_buf[0] as usize;
                let payload = match read_n(source, byte_count + 2)? {
                    Some(b) => b,
                    None => return Ok(None),
                };
                let mut combined = byte_count_buf;
                combined.extend(payload);
                Some(combined)
            }
            other => {
                log::warn!("unsupported function code 0x{other:02X} from slave {slave_id}, resyncing");
                continue;
            }
        };

        let tail = match tail {
            Some(t) => t,
            None => return Ok(None),
        };

        let mut frame = Vec::with_capacity(2 + tail.len());
        frame.push(slave_id);
        frame.push(function_code);
        frame.extend(tail);
        return Ok(Some(frame));
    }
}
