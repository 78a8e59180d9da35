use insta::assert_snapshot;
use std::path::Path;

use vidscale::engine::{
    EncodingSettings, Resolution, build_concat_args, build_scale_args, format_ffmpeg_cmd,
};

fn render(settings: &EncodingSettings) -> String {
    let args = build_scale_args(
        settings,
        Path::new("/tmp/input.mp4"),
        Path::new("/tmp/output.mp4"),
    );
    format_ffmpeg_cmd("ffmpeg", &args)
}

#[test]
fn snapshot_scale_cpu_hd() {
    let settings = EncodingSettings::default().with_resolution(Resolution::Hd);
    let cmd = render(&settings);
    assert_snapshot!("scale_cpu_hd", cmd);
}

#[test]
fn snapshot_scale_gpu_fhd() {
    let mut settings = EncodingSettings::default().with_resolution(Resolution::Fhd);
    settings.use_gpu = true;
    let cmd = render(&settings);
    assert_snapshot!("scale_gpu_fhd", cmd);
}

#[test]
fn snapshot_scale_vertical_hd() {
    let mut settings = EncodingSettings::default().with_resolution(Resolution::Hd);
    settings.vertical = true;
    let cmd = render(&settings);
    assert_snapshot!("scale_vertical_hd", cmd);
}

#[test]
fn snapshot_scale_custom_flags() {
    let mut settings = EncodingSettings::default().with_resolution(Resolution::Hd);
    settings.threads = 4;
    settings.fps = Some(30);
    settings.extra_args = "-movflags +faststart".to_string();
    let cmd = render(&settings);
    assert_snapshot!("scale_custom_flags", cmd);
}

#[test]
fn snapshot_join_concat() {
    let args = build_concat_args(
        Path::new("/tmp/concat_list.txt"),
        Path::new("/tmp/joined_output.mp4"),
    );
    let cmd = format_ffmpeg_cmd("ffmpeg", &args);
    assert_snapshot!("join_concat", cmd);
}
