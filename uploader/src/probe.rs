//! Reading a recording's duration from its container header.
//!
//! Only the two containers screen recorders actually produce are understood: ISO
//! base media (MP4/QuickTime) and Matroska/WebM. Browser `MediaRecorder` WebM output
//! usually has no duration at all, so `None` is an expected answer, not an error.

use std::time::Duration;

/// Returns the duration declared in the container header, if there is one.
pub fn probe_duration(bytes: &[u8]) -> Option<Duration> {
    let duration = if bytes.starts_with(&EBML_MAGIC) {
        webm_duration(bytes)?
    } else if bytes.get(4..8).is_some_and(|t| ISO_BOX_TYPES.contains(&t)) {
        mp4_duration(bytes)?
    } else {
        return None;
    };
    (duration.is_finite() && duration > 0.0)
        .then(|| Duration::try_from_secs_f64(duration).ok())
        .flatten()
}

// --- ISO base media -----------------------------------------------------------------

const ISO_BOX_TYPES: [&[u8]; 5] = [b"ftyp", b"moov", b"mdat", b"free", b"wide"];

/// Iterates over the boxes directly inside `data`, yielding `(type, payload)`.
fn iso_boxes(mut data: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> {
    std::iter::from_fn(move || {
        let size = u32::from_be_bytes(data.get(0..4)?.try_into().ok()?) as u64;
        let kind: [u8; 4] = data.get(4..8)?.try_into().ok()?;
        let (header, size) = match size {
            0 => (8, data.len() as u64),
            1 => (16, u64::from_be_bytes(data.get(8..16)?.try_into().ok()?)),
            n => (8, n),
        };
        if size < header || size > data.len() as u64 {
            // truncated payloads still get their header-declared prefix looked at
            let payload = data.get(header as usize..)?;
            data = &[];
            return Some((kind, payload));
        }
        let payload = &data[header as usize..size as usize];
        data = &data[size as usize..];
        Some((kind, payload))
    })
}

fn mp4_duration(bytes: &[u8]) -> Option<f64> {
    let (_, moov) = iso_boxes(bytes).find(|(kind, _)| kind == b"moov")?;
    let (_, mvhd) = iso_boxes(moov).find(|(kind, _)| kind == b"mvhd")?;
    let version = *mvhd.first()?;
    let (timescale, duration) = if version == 1 {
        // version+flags, creation (8), modification (8)
        let timescale = u32::from_be_bytes(mvhd.get(20..24)?.try_into().ok()?);
        let duration = u64::from_be_bytes(mvhd.get(24..32)?.try_into().ok()?);
        (timescale, (duration != u64::MAX).then_some(duration)?)
    } else {
        // version+flags, creation (4), modification (4)
        let timescale = u32::from_be_bytes(mvhd.get(12..16)?.try_into().ok()?);
        let duration = u32::from_be_bytes(mvhd.get(16..20)?.try_into().ok()?);
        (timescale, u64::from((duration != u32::MAX).then_some(duration)?))
    };
    (timescale != 0).then(|| duration as f64 / f64::from(timescale))
}

// --- Matroska / WebM ----------------------------------------------------------------

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const SEGMENT: u32 = 0x1853_8067;
const INFO: u32 = 0x1549_A966;
const CLUSTER: u32 = 0x1F43_B675;
const TIMECODE_SCALE: u32 = 0x2A_D7B1;
const DURATION: u32 = 0x4489;
const DEFAULT_TIMECODE_SCALE_NS: u64 = 1_000_000;

/// Reads an EBML variable-length integer, returning `(value, encoded length)`.
///
/// With `keep_marker` the length marker bit stays in the value, which is how element
/// ids are conventionally written.
fn read_vint(data: &[u8], keep_marker: bool) -> Option<(u64, usize)> {
    let first = *data.first()?;
    let len = first.leading_zeros() as usize + 1;
    if len > 8 {
        return None;
    }
    let bytes = data.get(..len)?;
    let mut value = if keep_marker {
        u64::from(first)
    } else {
        u64::from(first) & ((1u64 << (8 - len)) - 1)
    };
    for b in &bytes[1..] {
        value = (value << 8) | u64::from(*b);
    }
    Some((value, len))
}

/// One EBML element header: id, payload size (`None` when unknown), header length.
fn read_element(data: &[u8]) -> Option<(u32, Option<u64>, usize)> {
    let (id, id_len) = read_vint(data, true)?;
    let (size, size_len) = read_vint(&data[id_len..], false)?;
    let unknown = size == (1u64 << (7 * size_len)) - 1;
    Some((
        u32::try_from(id).ok()?,
        (!unknown).then_some(size),
        id_len + size_len,
    ))
}

fn read_uint(payload: &[u8]) -> Option<u64> {
    if payload.is_empty() || payload.len() > 8 {
        return None;
    }
    Some(payload.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b)))
}

fn read_float(payload: &[u8]) -> Option<f64> {
    match payload.len() {
        4 => Some(f64::from(f32::from_be_bytes(payload.try_into().ok()?))),
        8 => Some(f64::from_be_bytes(payload.try_into().ok()?)),
        _ => None,
    }
}

fn webm_duration(bytes: &[u8]) -> Option<f64> {
    let mut data = bytes;
    // top level: EBML header, then the segment
    while !data.is_empty() {
        let (id, size, header) = read_element(data)?;
        let body = &data[header..];
        if id == SEGMENT {
            let body = match size {
                Some(size) => body.get(..size as usize).unwrap_or(body),
                None => body,
            };
            return segment_duration(body);
        }
        data = body.get(size? as usize..)?;
    }
    None
}

fn segment_duration(mut data: &[u8]) -> Option<f64> {
    while !data.is_empty() {
        let (id, size, header) = read_element(data)?;
        let body = &data[header..];
        match id {
            INFO => {
                let info = body.get(..size? as usize).unwrap_or(body);
                return info_duration(info);
            }
            // media data follows the headers; Info never comes after it
            CLUSTER => return None,
            _ => data = body.get(size? as usize..)?,
        }
    }
    None
}

fn info_duration(mut data: &[u8]) -> Option<f64> {
    let mut scale = DEFAULT_TIMECODE_SCALE_NS;
    let mut duration = None;
    while !data.is_empty() {
        let (id, size, header) = read_element(data)?;
        let size = size? as usize;
        let payload = data.get(header..header + size)?;
        match id {
            TIMECODE_SCALE => scale = read_uint(payload).unwrap_or(DEFAULT_TIMECODE_SCALE_NS),
            DURATION => duration = read_float(payload),
            _ => {}
        }
        data = &data[header + size..];
    }
    Some(duration? * scale as f64 / 1e9)
}
