//! GIF89a container serialization.
//!
//! This module emits the fixed-layout blocks of the GIF89a format into an
//! append-only output buffer: header, logical screen descriptor, color
//! tables, the Netscape looping extension, per-frame graphic control and
//! image descriptor blocks, and the trailer. Nothing is ever rewritten
//! after being emitted.

/// The GIF89a signature and version.
pub const HEADER: &[u8; 6] = b"GIF89a";

/// Trailer byte closing the file.
pub const TRAILER: u8 = 0x3B;

/// Write the 6-byte header. Emitted once, at the start of a session.
pub fn write_header(out: &mut Vec<u8>) {
    out.extend_from_slice(HEADER);
}

/// Write the 7-byte Logical Screen Descriptor.
///
/// The packed field declares a global color table with 8-bit color
/// resolution and 256 entries (0xF7); background index and pixel aspect
/// ratio are always zero.
pub fn write_logical_screen_descriptor(out: &mut Vec<u8>, width: u16, height: u16) {
    write_u16_le(out, width);
    write_u16_le(out, height);
    out.push(0xF7);
    out.push(0); // background color index
    out.push(0); // pixel aspect ratio
}

/// Write a 768-byte color table (global or local).
pub fn write_color_table(out: &mut Vec<u8>, palette: &[u8; 768]) {
    out.extend_from_slice(palette);
}

/// Write the Netscape2.0 application extension requesting looping.
///
/// A loop count of zero means loop forever. Callers that want the
/// animation played once simply never call this.
pub fn write_netscape_loop(out: &mut Vec<u8>, loop_count: u16) {
    out.push(0x21); // extension introducer
    out.push(0xFF); // application extension label
    out.push(11);
    out.extend_from_slice(b"NETSCAPE2.0");
    out.push(3); // sub-block length
    out.push(1); // loop sub-block id
    write_u16_le(out, loop_count);
    out.push(0); // block terminator
}

/// Write the 8-byte Graphic Control Extension for one frame.
///
/// # Arguments
/// * `disposal` - disposal method (0-7), stored in bits 2-4 of the packed field
/// * `transparent_index` - palette index rendered transparent, if any
/// * `delay_cs` - frame delay in centiseconds
pub fn write_graphic_control(
    out: &mut Vec<u8>,
    disposal: u8,
    transparent_index: Option<u8>,
    delay_cs: u16,
) {
    out.push(0x21); // extension introducer
    out.push(0xF9); // graphic control label
    out.push(4);
    let transparency_flag = u8::from(transparent_index.is_some());
    out.push(((disposal & 0x07) << 2) | transparency_flag);
    write_u16_le(out, delay_cs);
    out.push(transparent_index.unwrap_or(0));
    out.push(0); // block terminator
}

/// Write the 10-byte Image Descriptor for one frame.
///
/// Frames always cover the full logical screen at position (0,0). The
/// packed field announces a 256-entry local color table when `local_table`
/// is set; the first frame uses the global table instead.
pub fn write_image_descriptor(out: &mut Vec<u8>, width: u16, height: u16, local_table: bool) {
    out.push(0x2C); // image separator
    write_u16_le(out, 0); // left
    write_u16_le(out, 0); // top
    write_u16_le(out, width);
    write_u16_le(out, height);
    out.push(if local_table { 0x87 } else { 0x00 });
}

/// Write the trailer byte. Emitted once, at the end of a session.
pub fn write_trailer(out: &mut Vec<u8>) {
    out.push(TRAILER);
}

#[inline]
fn write_u16_le(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() {
        let mut out = Vec::new();
        write_header(&mut out);
        assert_eq!(&out, b"GIF89a");
    }

    #[test]
    fn test_logical_screen_descriptor_layout() {
        let mut out = Vec::new();
        write_logical_screen_descriptor(&mut out, 320, 200);
        assert_eq!(out, [0x40, 0x01, 0xC8, 0x00, 0xF7, 0x00, 0x00]);
    }

    #[test]
    fn test_color_table_is_always_768_bytes() {
        let mut out = Vec::new();
        let palette = [0xABu8; 768];
        write_color_table(&mut out, &palette);
        assert_eq!(out.len(), 768);
        assert!(out.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_netscape_loop_infinite() {
        let mut out = Vec::new();
        write_netscape_loop(&mut out, 0);
        assert_eq!(
            out,
            [
                0x21, 0xFF, 11, b'N', b'E', b'T', b'S', b'C', b'A', b'P', b'E', b'2', b'.', b'0',
                3, 1, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_netscape_loop_count_little_endian() {
        let mut out = Vec::new();
        write_netscape_loop(&mut out, 0x0102);
        assert_eq!(&out[16..18], &[0x02, 0x01]);
    }

    #[test]
    fn test_graphic_control_opaque() {
        let mut out = Vec::new();
        write_graphic_control(&mut out, 0, None, 10);
        assert_eq!(out, [0x21, 0xF9, 4, 0x00, 10, 0, 0, 0]);
    }

    #[test]
    fn test_graphic_control_transparent() {
        let mut out = Vec::new();
        write_graphic_control(&mut out, 2, Some(7), 500);
        // disposal 2 in bits 2-4, transparency flag set
        assert_eq!(out, [0x21, 0xF9, 4, 0x09, 0xF4, 0x01, 7, 0]);
    }

    #[test]
    fn test_image_descriptor_global_table() {
        let mut out = Vec::new();
        write_image_descriptor(&mut out, 4, 4, false);
        assert_eq!(out, [0x2C, 0, 0, 0, 0, 4, 0, 4, 0, 0x00]);
    }

    #[test]
    fn test_image_descriptor_local_table() {
        let mut out = Vec::new();
        write_image_descriptor(&mut out, 700, 1, true);
        assert_eq!(out, [0x2C, 0, 0, 0, 0, 0xBC, 0x02, 1, 0, 0x87]);
    }

    #[test]
    fn test_trailer() {
        let mut out = Vec::new();
        write_trailer(&mut out);
        assert_eq!(out, [0x3B]);
    }
}
