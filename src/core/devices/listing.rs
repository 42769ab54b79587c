use crate::domain::models::{Device, Display, ScreenGeometry, VideoDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Video,
    Audio,
}

#[derive(Debug, Default, PartialEq)]
pub struct RawListing {
    pub video: Vec<Device>,
    pub audio: Vec<Device>,
}

/// Splits the encoder's device listing into video and audio entries.
///
/// Lines before the first section header, or without an `[index] name` entry,
/// are skipped.
pub fn parse_device_listing(text: &str, video_marker: &str, audio_marker: &str) -> RawListing {
    let mut listing = RawListing::default();
    let mut section = None;

    for line in text.lines() {
        if line.contains(video_marker) {
            section = Some(Section::Video);
            continue;
        }
        if line.contains(audio_marker) {
            section = Some(Section::Audio);
            continue;
        }
        let Some(current) = section else {
            continue;
        };
        let Some(device) = parse_device_line(line) else {
            continue;
        };
        match current {
            Section::Video => listing.video.push(device),
            Section::Audio => listing.audio.push(device),
        }
    }
    listing
}

/// Finds the first `[<digits>]<whitespace><name>` in a line.
pub fn parse_device_line(line: &str) -> Option<Device> {
    let mut search_from = 0;
    while let Some(found) = line[search_from..].find('[') {
        let open = search_from + found;
        search_from = open + 1;
        let rest = &line[open + 1..];
        let Some(close) = rest.find(']') else {
            return None;
        };
        let digits = &rest[..close];
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            continue;
        }
        let after = &rest[close + 1..];
        if !after.starts_with(char::is_whitespace) {
            continue;
        }
        let Ok(index) = digits.parse::<u32>() else {
            continue;
        };
        let name = after.trim();
        if name.is_empty() {
            return None;
        }
        return Some(Device {
            index,
            name: name.to_string(),
        });
    }
    None
}

/// Screen number at the end of a screen-capture device name, e.g. `Capture screen 1`.
pub fn screen_index(name: &str, screen_prefix: &str) -> Option<usize> {
    let rest = name.strip_prefix(screen_prefix)?;
    let digits = rest
        .trim()
        .chars()
        .rev()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>()
        .chars()
        .rev()
        .collect::<String>();
    digits.parse().ok()
}

/// Marks screen-capture devices and attaches the geometry of the matching
/// display; `displays` must already be ordered left to right.
pub fn attach_screen_geometry(
    devices: Vec<Device>,
    displays: &[Display],
    screen_prefix: &str,
) -> Vec<VideoDevice> {
    devices
        .into_iter()
        .map(|device| {
            let is_screen = device.name.starts_with(screen_prefix);
            let geometry = if is_screen {
                screen_index(&device.name, screen_prefix)
                    .and_then(|index| displays.get(index))
                    .map(ScreenGeometry::from_display)
            } else {
                None
            };
            if is_screen && geometry.is_none() {
                tracing::warn!("no display matches screen device {:?}", device.name);
            }
            VideoDevice {
                index: device.index,
                name: device.name,
                is_screen,
                geometry,
            }
        })
        .collect()
}
