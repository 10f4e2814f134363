//! Tag reader backed by symphonia's demuxers.
//!
//! Only the container is parsed: the format reader is opened to get codec
//! parameters and metadata revisions, no packets are decoded.

use std::fs::File;
use std::path::Path;

use bc_core::{Container, Error};
use symphonia::core::codecs::{
    CodecParameters, CodecType, CODEC_TYPE_AAC, CODEC_TYPE_ALAC, CODEC_TYPE_FLAC, CODEC_TYPE_MP1,
    CODEC_TYPE_MP2, CODEC_TYPE_MP3, CODEC_TYPE_OPUS, CODEC_TYPE_VORBIS,
};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

use crate::reader::TagReader;
use crate::types::{parse_track_number, TrackTags};

/// A pure-Rust [`TagReader`] implementation.
///
/// Supports MP3, MP4/M4A/M4B, Ogg Vorbis and Opus. No external tools are
/// required.
pub struct SymphoniaTagReader;

impl SymphoniaTagReader {
    /// Create a new `SymphoniaTagReader`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SymphoniaTagReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader for SymphoniaTagReader {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn supports(&self, path: &Path) -> bool {
        Container::from_path(path).is_some()
    }

    fn read(&self, path: &Path) -> bc_core::Result<TrackTags> {
        let container = Container::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

        let file = File::open(path).map_err(|e| Error::scan(path, e))?;
        let size = file.metadata().map(|m| m.len()).ok();
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::corrupt(path, e))?;

        let mut tags = TrackTags::new(container);

        {
            let track = probed
                .format
                .default_track()
                .ok_or_else(|| Error::corrupt(path, "no audio track"))?;
            let params = &track.codec_params;

            let codec = codec_name(params.codec);
            if matches!(container, Container::Ogg | Container::Opus)
                && !matches!(codec, Some("vorbis" | "opus"))
            {
                return Err(Error::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }

            tags.codec = codec.map(str::to_string);
            tags.duration = duration_secs(params);
            tags.sample_rate = params.sample_rate;
            tags.channels = params.channels.map(|c| c.count() as u16);
        }

        // Tags found ahead of the container (ID3v2 on MP3) come first, then
        // whatever the demuxer read from the container itself.
        if let Some(rev) = probed.metadata.get().as_ref().and_then(|m| m.current()) {
            apply_revision(&mut tags, rev);
        }
        if let Some(rev) = probed.format.metadata().current() {
            apply_revision(&mut tags, rev);
        }

        if let (Some(size), Some(duration)) = (size, tags.duration) {
            if duration > 0.0 {
                tags.bitrate = Some(((size as f64 * 8.0) / duration).round() as u32);
            }
        }

        tracing::debug!(
            path = %path.display(),
            codec = ?tags.codec,
            duration = ?tags.duration,
            "Read tags"
        );

        Ok(tags)
    }
}

fn codec_name(codec: CodecType) -> Option<&'static str> {
    match codec {
        CODEC_TYPE_MP3 => Some("mp3"),
        CODEC_TYPE_MP2 => Some("mp2"),
        CODEC_TYPE_MP1 => Some("mp1"),
        CODEC_TYPE_AAC => Some("aac"),
        CODEC_TYPE_ALAC => Some("alac"),
        CODEC_TYPE_VORBIS => Some("vorbis"),
        CODEC_TYPE_OPUS => Some("opus"),
        CODEC_TYPE_FLAC => Some("flac"),
        _ => None,
    }
}

fn duration_secs(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    if let Some(tb) = params.time_base {
        let time = tb.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    let rate = params.sample_rate.filter(|r| *r > 0)?;
    Some(frames as f64 / f64::from(rate))
}

/// Fill empty fields of `tags` from a metadata revision. Earlier revisions
/// win, so the first source to provide a field keeps it.
fn apply_revision(tags: &mut TrackTags, rev: &MetadataRevision) {
    for tag in rev.tags() {
        let Some(key) = tag.std_key else {
            continue;
        };
        let value = tag.value.to_string();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let slot = match key {
            StandardTagKey::TrackTitle => &mut tags.title,
            StandardTagKey::Artist => &mut tags.artist,
            StandardTagKey::AlbumArtist if tags.artist.is_none() => &mut tags.artist,
            StandardTagKey::Album => &mut tags.album,
            StandardTagKey::Comment | StandardTagKey::Description => &mut tags.comment,
            StandardTagKey::Genre => &mut tags.genre,
            StandardTagKey::TrackNumber => {
                if tags.track_number.is_none() {
                    tags.track_number = parse_track_number(value);
                }
                continue;
            }
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
}
