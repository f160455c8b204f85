// Checksums used on the MPP wire.
//
// Inverter replies and serial/hidraw commands carry a CRC16/XMODEM where any byte that would
// collide with a frame delimiter ('(', CR, LF) is bumped by one. The no-driver USB frame uses
// the plain CRC.

const RESERVED: [u8; 3] = [0x28, 0x0d, 0x0a];

pub fn crc16_xmodem(data: &[u8]) -> u16 {
    crc16::State::<crc16::XMODEM>::calculate(data)
}

/// Big-endian CRC bytes with reserved values adjusted.
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let mut bytes = crc16_xmodem(data).to_be_bytes();
    for b in bytes.iter_mut() {
        if RESERVED.contains(b) {
            *b += 1;
        }
    }
    bytes
}

/// Checks the two bytes before the trailing CR against the checksum of everything before them.
/// A frame without the CR never verifies.
pub fn verify(frame: &[u8]) -> bool {
    let Some(frame) = frame.strip_suffix(b"\r") else {
        return false;
    };
    if frame.len() < 3 {
        return false;
    }
    let (data, crc) = frame.split_at(frame.len() - 2);
    checksum(data) == crc
}
