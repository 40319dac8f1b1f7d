/*!
 * Tests for timestamp parsing and formatting
 */

use subtrans::errors::SubtitleError;
use subtrans::subtitle::{
    format_lrc_timestamp, format_srt_timestamp, format_vtt_timestamp, parse_lrc_timestamp,
    parse_srt_timestamp, parse_timestamp_range, parse_vtt_timestamp, SubtitleFormat,
};

#[test]
fn test_parseSrtTimestamp_withValidInput_shouldReturnMilliseconds() {
    assert_eq!(parse_srt_timestamp("00:00:00,000").unwrap(), 0);
    assert_eq!(parse_srt_timestamp("01:02:03,456").unwrap(), 3_723_456);
    assert_eq!(parse_srt_timestamp(" 00:00:04,500 ").unwrap(), 4_500);
}

#[test]
fn test_parseSrtTimestamp_withDotSeparator_shouldFail() {
    let result = parse_srt_timestamp("00:00:01.000");
    assert!(matches!(result, Err(SubtitleError::MalformedTimestamp(_))));
}

#[test]
fn test_parseSrtTimestamp_withOutOfRangeFields_shouldFail() {
    assert!(parse_srt_timestamp("00:60:00,000").is_err());
    assert!(parse_srt_timestamp("00:00:60,000").is_err());
    assert!(parse_srt_timestamp("0:00:01,000").is_err());
    assert!(parse_srt_timestamp("00:00:01,00").is_err());
}

#[test]
fn test_parseVttTimestamp_withShortForm_shouldAssumeZeroHours() {
    assert_eq!(parse_vtt_timestamp("01:02.003").unwrap(), 62_003);
    assert_eq!(parse_vtt_timestamp("10:00:00.000").unwrap(), 36_000_000);
}

#[test]
fn test_parseVttTimestamp_withCommaSeparator_shouldFail() {
    assert!(parse_vtt_timestamp("00:00:01,000").is_err());
}

#[test]
fn test_parseLrcTimestamp_withCentiseconds_shouldScaleByTen() {
    assert_eq!(parse_lrc_timestamp("[00:01.50]").unwrap(), 1_500);
    assert_eq!(parse_lrc_timestamp("02:03.07").unwrap(), 123_070);
    assert_eq!(parse_lrc_timestamp("[75:00.00]").unwrap(), 4_500_000);
}

#[test]
fn test_parseLrcTimestamp_withMilliseconds_shouldFail() {
    assert!(parse_lrc_timestamp("[00:01.500]").is_err());
    assert!(parse_lrc_timestamp("[00:61.00]").is_err());
}

#[test]
fn test_formatTimestamps_shouldUseFixedWidthFields() {
    assert_eq!(format_srt_timestamp(3_723_456), "01:02:03,456");
    assert_eq!(format_vtt_timestamp(3_723_456), "01:02:03.456");
    assert_eq!(format_srt_timestamp(0), "00:00:00,000");
}

#[test]
fn test_formatLrcTimestamp_withSubCentisecond_shouldTruncate() {
    assert_eq!(format_lrc_timestamp(1_999), "[00:01.99]");
    assert_eq!(format_lrc_timestamp(61_005), "[01:01.00]");
    assert_eq!(format_lrc_timestamp(3_600_000), "[60:00.00]");
}

#[test]
fn test_srtRoundTrip_shouldBeExact() {
    for ms in [0, 1, 999, 1_000, 59_999, 3_599_999, 3_600_000, 86_399_999] {
        assert_eq!(parse_srt_timestamp(&format_srt_timestamp(ms)).unwrap(), ms);
        assert_eq!(parse_vtt_timestamp(&format_vtt_timestamp(ms)).unwrap(), ms);
    }
}

#[test]
fn test_parseTimestampRange_withVttSettings_shouldIgnoreSettings() {
    let range = parse_timestamp_range("00:01.000 --> 00:02.500 align:start position:10%", SubtitleFormat::Vtt).unwrap();
    assert_eq!(range, (1_000, 2_500));
}

#[test]
fn test_parseTimestampRange_withoutArrow_shouldFail() {
    assert!(parse_timestamp_range("00:00:01,000 00:00:02,000", SubtitleFormat::Srt).is_err());
    assert!(parse_timestamp_range("00:00:01,000 -->", SubtitleFormat::Srt).is_err());
}

#[test]
fn test_parseTimestampRange_forLrc_shouldFail() {
    assert!(parse_timestamp_range("00:01.00 --> 00:02.00", SubtitleFormat::Lrc).is_err());
}
