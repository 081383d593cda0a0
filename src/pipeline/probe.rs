//! Extracting the primary video stream's dimensions from probe output.

use super::{
    error::{PipelineError, PipelineResult},
    media_tool::MediaTool,
};
use serde::Deserialize;
use std::path::Path;

/// Pixel dimensions of the first stream that reports both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe `input` and return its first dimensioned stream.
pub async fn probe_dimensions(tool: &dyn MediaTool, input: &Path) -> PipelineResult<StreamInfo> {
    let raw = tool.probe(input).await?;
    parse_stream_info(&raw)
}

/// Output that is not the expected JSON is a hard failure, never an empty result.
pub fn parse_stream_info(raw: &[u8]) -> PipelineResult<StreamInfo> {
    let output: ProbeOutput = serde_json::from_slice(raw)
        .map_err(|e| PipelineError::ProbeFailed(format!("unreadable ffprobe output: {e}")))?;

    output
        .streams
        .into_iter()
        .find_map(|stream| match (stream.width, stream.height) {
            (Some(width), Some(height)) => Some(StreamInfo { width, height }),
            _ => None,
        })
        .ok_or(PipelineError::NoStreamFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_streams_without_dimensions() {
        let raw = br#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "sample_rate": "48000"},
                {"index": 1, "codec_type": "video", "width": 1920, "height": 1080},
                {"index": 2, "codec_type": "video", "width": 640, "height": 360}
            ]
        }"#;

        assert_eq!(
            parse_stream_info(raw).unwrap(),
            StreamInfo {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn no_streams_is_no_stream_found() {
        assert!(matches!(
            parse_stream_info(br#"{"streams": []}"#),
            Err(PipelineError::NoStreamFound)
        ));
        assert!(matches!(
            parse_stream_info(b"{}"),
            Err(PipelineError::NoStreamFound)
        ));
        assert!(matches!(
            parse_stream_info(br#"{"streams": [{"codec_type": "audio"}]}"#),
            Err(PipelineError::NoStreamFound)
        ));
    }

    #[test]
    fn malformed_output_is_probe_failure() {
        assert!(matches!(
            parse_stream_info(b"Invalid data found when processing input"),
            Err(PipelineError::ProbeFailed(_))
        ));
        assert!(matches!(
            parse_stream_info(br#"{"streams": [{"width": "wide"}]}"#),
            Err(PipelineError::ProbeFailed(_))
        ));
    }

    #[test]
    fn zero_height_is_still_reported() {
        let info = parse_stream_info(br#"{"streams": [{"width": 1920, "height": 0}]}"#).unwrap();
        assert_eq!(info.height, 0);
    }
}
