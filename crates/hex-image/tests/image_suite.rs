//! End-to-end coverage of the image engine: load, query, re-pack and save.

#![allow(clippy::pedantic, clippy::nursery)]

use std::fs;
use std::io::Cursor;

use hex_image::{
    ErrorKind, FileFormat, HexImage, ImageConfig, LineEnding, OutputFormat, Warning,
};
use log as _;
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use tempfile::tempdir;
use thiserror as _;

const LINEAR_IMAGE: &str = "\
:020000040800F2
:04000000DEADBEEFC4
:020004000102F7
:0301000011223396
:0400000508000004EB
:00000001FF
";

fn loaded(text: &str) -> HexImage {
    let mut image = HexImage::new();
    image.load_str(text).expect("fixture loads");
    image
}

fn saved_text(image: &HexImage) -> String {
    let mut out = Vec::new();
    image.write_to(&mut out).expect("write to memory");
    String::from_utf8(out).expect("ascii output")
}

#[test]
fn file_round_trip_preserves_records_and_bytes() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("input.hex");
    let output = dir.path().join("output.hex");
    fs::write(&input, LINEAR_IMAGE).expect("write fixture");

    let mut first = HexImage::new();
    let report = first.load(&input).expect("load fixture");
    assert_eq!(report.format, FileFormat::IntelHex);
    assert!(report.is_clean());
    first.save(&output).expect("save");

    assert_eq!(fs::read_to_string(&output).expect("read back"), LINEAR_IMAGE);

    let mut second = HexImage::new();
    second.load(&output).expect("reload");
    assert_eq!(second.records(), first.records());
    assert_eq!(
        second.get_data_dump().expect("dump"),
        first.get_data_dump().expect("dump")
    );
}

#[test]
fn counters_describe_the_loaded_image() {
    let image = loaded(LINEAR_IMAGE);
    assert_eq!(image.line_count(), 6);
    assert_eq!(image.new_line_count(), 6);
    assert_eq!(image.min_address(), 0x0800_0000);
    assert_eq!(image.max_address(), 0x0800_0102);
    assert_eq!(image.byte_count(), 9);
    assert_eq!(image.max_record_len(), 4);
    assert_eq!(image.last_overlay_address(), 0);
}

#[test]
fn gaps_split_the_snapshot_into_blocks() {
    let mut image = loaded(LINEAR_IMAGE);
    let snapshot = image.get_data_dump().expect("dump");
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.blocks()[0].start_address, 0x0800_0000);
    assert_eq!(
        snapshot.blocks()[0].bytes,
        vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02]
    );
    assert_eq!(snapshot.blocks()[1].start_address, 0x0800_0100);
    assert_eq!(snapshot.byte_count(), 9);
}

#[test]
fn overlapping_records_are_reported() {
    let mut image = HexImage::new();
    let report = image
        .load_str(":01000000AA55\n:01000000BB44\n:00000001FF\n")
        .expect("overlay is not a load failure");
    assert_eq!(report.warnings, vec![Warning::Overlay { address: 0 }]);

    let err = image.get_data_dump().expect_err("overlay");
    assert_eq!(err.kind, ErrorKind::Overlay);
    assert_eq!(err.address(), Some(0));
    assert_eq!(
        image.get_bytes_at(0, 1).expect_err("overlay").kind,
        ErrorKind::Overlay
    );
    assert_eq!(
        image.optimize_linear(16, None).expect_err("overlay").kind,
        ErrorKind::Overlay
    );
}

#[test]
fn record_straddling_a_page_is_split() {
    let mut image = loaded(":04FFFE0001020304F5\n:00000001FF\n");
    assert_eq!(
        saved_text(&image),
        ":02FFFE000102FE\n:020000040001F9\n:020000000304F7\n:00000001FF\n"
    );
    let snapshot = image.get_data_dump().expect("dump");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.blocks()[0].start_address, 0xFFFE);
    assert_eq!(snapshot.blocks()[0].bytes, vec![1, 2, 3, 4]);
}

#[rstest]
#[case::aligned_segment(
    ":020000021000EC\n:02001000AABB89\n:00000001FF\n",
    ":020000040001F9\n:02001000AABB89\n:00000001FF\n"
)]
#[case::unaligned_segment(
    ":020000021001EB\n:02001000AABB89\n:00000001FF\n",
    ":020000040001F9\n:02002000AABB79\n:00000001FF\n"
)]
fn segment_addressing_becomes_linear(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(saved_text(&loaded(input)), expected);
}

#[test]
fn missing_terminator_is_synthesized() {
    let mut image = HexImage::new();
    let report = image.load_str(":01000000AA55\n").expect("load");
    assert_eq!(report.warnings, vec![Warning::MissingEof]);
    assert_eq!(saved_text(&image), ":01000000AA55\n:00000001FF\n");
}

#[test]
fn lowercase_and_crlf_input_is_accepted() {
    let config = ImageConfig {
        line_ending: LineEnding::CrLf,
        ..ImageConfig::default()
    };
    let mut image = HexImage::with_config(config);
    image
        .load_str(":01000000aa55\r\n\r\n:00000001ff\r\n")
        .expect("load");
    assert_eq!(image.line_count(), 2);
    assert_eq!(saved_text(&image), ":01000000AA55\r\n:00000001FF\r\n");
}

#[rstest]
#[case::bad_checksum(":01000000AA56\n", ErrorKind::Checksum, 1)]
#[case::bad_digit(":01000000AG55\n", ErrorKind::Syntax, 1)]
#[case::second_line(":01000000AA55\n\n:0100000", ErrorKind::Syntax, 3)]
#[case::unknown_command(":00000006FA\n", ErrorKind::UnknownCommand, 1)]
#[case::unknown_prefix("#01000000AA55\n", ErrorKind::Syntax, 1)]
fn malformed_input_names_the_line(
    #[case] text: &str,
    #[case] kind: ErrorKind,
    #[case] line: usize,
) {
    let mut image = HexImage::new();
    let err = image.load_str(text).expect_err("malformed");
    assert_eq!(err.kind, kind);
    assert_eq!(err.line(), Some(line));
    assert!(image.records().is_empty());
}

#[test]
fn empty_input_has_no_data() {
    let mut image = HexImage::new();
    assert_eq!(image.load_str("\n\n").expect_err("empty").kind, ErrorKind::NoData);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().expect("temp dir");
    let mut image = HexImage::new();
    let err = image
        .load(dir.path().join("absent.hex"))
        .expect_err("missing file");
    assert!(matches!(err.kind, ErrorKind::Io(_)));
}

#[test]
fn non_utf8_file_is_a_syntax_error() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("binary.hex");
    fs::write(&path, [b':', 0xFF, 0xFE]).expect("write fixture");
    let mut image = HexImage::new();
    assert_eq!(image.load(&path).expect_err("binary").kind, ErrorKind::Syntax);
}

#[test]
fn pattern_search_stops_at_a_gap() {
    let mut image = loaded(":0400000041424344F2\n:0400080045464748DA\n:00000001FF\n");
    assert_eq!(image.find_pattern(0, b"CD"), Ok(2));
    assert_eq!(image.find_pattern(0, b"EF").expect_err("gap").kind, ErrorKind::NotFound);
    assert_eq!(image.find_pattern(8, b"EF"), Ok(8));
    assert_eq!(image.find_pattern(4, b"EF").expect_err("gap").kind, ErrorKind::NotFound);

    let span = image.get_bytes_at(2, 4).expect("read");
    assert_eq!(span.bytes, b"CD".to_vec());
    assert!(span.truncated);
}

#[test]
fn optimize_merges_small_records() {
    let mut image = loaded(LINEAR_IMAGE);
    let before = image.get_data_dump().expect("dump").clone();
    image.optimize(32).expect("optimize");
    assert_eq!(
        saved_text(&image),
        "\
:020000040800F2
:06000000DEADBEEF0102BF
:0301000011223396
:0400000508000004EB
:00000001FF
"
    );
    assert_eq!(image.get_data_dump().expect("dump"), &before);
    assert_eq!(image.new_line_count(), 5);
    assert_eq!(image.line_count(), 6);
}

#[test]
fn linear_optimize_skips_empty_data_records() {
    let mut image = loaded(":0000000000\n:0100100011DE\n:00000001FF\n");
    assert_eq!(image.min_address(), 0x10);
    image.optimize_linear(16, None).expect("optimize");
    assert_eq!(saved_text(&image), ":0100100011DE\n:00000001FF\n");
}

#[test]
fn linear_optimize_with_fill_closes_gaps() {
    let mut image = loaded(LINEAR_IMAGE);
    image.optimize_linear(255, Some(0xFF)).expect("optimize");
    let snapshot = image.get_data_dump().expect("dump");
    assert_eq!(snapshot.len(), 1);
    let bytes = &snapshot.blocks()[0].bytes;
    assert_eq!(bytes.len(), 0x103);
    assert!(bytes[6..0x100].iter().all(|b| *b == 0xFF));
    assert_eq!(image.max_record_len(), 255);
    assert_eq!(image.byte_count(), 0x103);
}

#[test]
fn srecord_input_loads_into_linear_records() {
    let text = "\
S00600004844521B
S1061000010203E3
S2060120000405CF
S3060800000006EB
S9031000EC
";
    let mut image = HexImage::new();
    let report = image.load_reader(Cursor::new(text)).expect("load");
    assert_eq!(report.format, FileFormat::SRecord);
    assert_eq!(image.format(), Some(FileFormat::SRecord));
    assert_eq!(image.max_record_len(), 3);
    assert_eq!(
        saved_text(&image),
        "\
:03100000010203E7
:020000040001F9
:022000000405D5
:020000040800F2
:0100000006F9
:0400000500001000E7
:00000001FF
"
    );
}

#[test]
fn srecord_output_reloads_to_the_same_bytes() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("image.s19");
    let config = ImageConfig {
        output_format: OutputFormat::SRecord,
        ..ImageConfig::default()
    };

    let mut image = HexImage::with_config(config);
    image.load_str(LINEAR_IMAGE).expect("load");
    image.save(&path).expect("save");
    let text = fs::read_to_string(&path).expect("read back");
    assert!(text.lines().all(|line| line.starts_with("S3") || line.starts_with("S7")));
    assert_eq!(text.lines().last(), Some("S70508000004EE"));

    let mut reloaded = HexImage::new();
    let report = reloaded.load(&path).expect("reload");
    assert_eq!(report.format, FileFormat::SRecord);
    assert_eq!(
        reloaded.get_data_dump().expect("dump"),
        image.get_data_dump().expect("dump")
    );
}
