mod common;

use common::{FakeDevice, CAP_STREAMING};
use v4l_stream::format::description::Flags as FormatFlags;
use v4l_stream::framesize::FrameSizeEnum;
use v4l_stream::v4l2::api::v4l2_frmsize_union;
use v4l_stream::{Error, FourCC, Stream};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn capabilities_are_cached() {
    init();
    let fake = FakeDevice::new();
    let dev = fake.open_device();

    let caps = dev.caps();
    assert_eq!(caps.driver, "fake");
    assert_eq!(caps.card, "Fake Camera");
    assert_eq!(caps.version, (6, 1, 0));
    assert!(caps.supports_capture());
    assert!(caps.supports_streaming());
    assert_eq!(dev.query_caps().unwrap().bus, "platform");
}

#[test]
fn formats_are_listed_once() {
    init();
    let fake = FakeDevice::new();
    let dev = fake.open_device();

    let formats = dev.enum_formats().unwrap();
    let codes: Vec<_> = formats.iter().map(|desc| desc.fourcc).collect();
    assert_eq!(
        codes,
        vec![
            FourCC::new(b"YUYV"),
            FourCC::new(b"MJPG"),
            FourCC::new(b"GREY")
        ]
    );
    assert_eq!(formats[0].description, "YUYV 4:2:2");
    assert!(formats[1].flags.contains(FormatFlags::COMPRESSED));
    assert!(!formats[2].flags.contains(FormatFlags::COMPRESSED));
}

#[test]
fn enumeration_past_the_end() {
    init();
    let fake = FakeDevice::new();
    let dev = fake.open_device();

    let handle = dev.handle();
    assert!(matches!(
        v4l_stream::ioctl::enum_format(&handle, 4),
        Err(Error::EnumerationExhausted)
    ));
    assert!(v4l_stream::ioctl::enum_format(&handle, 3).is_ok());
}

#[test]
fn framesizes_are_consistent() {
    init();
    let fake = FakeDevice::new();
    let dev = fake.open_device();

    let yuyv = dev.enum_framesizes(FourCC::new(b"YUYV")).unwrap();
    assert_eq!(yuyv.len(), 2);
    assert_eq!(yuyv[0].size.to_string(), "Discrete(640x480)");
    assert_eq!(yuyv[1].index, 1);

    let mjpg = dev.enum_framesizes(FourCC::new(b"MJPG")).unwrap();
    assert_eq!(mjpg.len(), 1);
    assert!(matches!(mjpg[0].size, FrameSizeEnum::Stepwise(_)));

    for size in yuyv.iter().chain(mjpg.iter()) {
        let range = size.size.range();
        assert!(range.max_width >= range.min_width);
        assert!(range.max_height >= range.min_height);
        if range.step_width == 0 {
            assert_eq!(range.min_width, range.max_width);
        }
        if range.step_height == 0 {
            assert_eq!(range.min_height, range.max_height);
        }
    }

    assert!(dev.enum_framesizes(FourCC::new(b"NV12")).unwrap().is_empty());
}

#[test]
fn unknown_framesize_type_is_a_protocol_error() {
    init();
    let fake = FakeDevice::new();
    let grey = u32::from(FourCC::new(b"GREY"));
    fake.state()
        .framesizes
        .push((grey, 9, v4l2_frmsize_union::new([0; 24])));
    let dev = fake.open_device();

    assert!(matches!(
        dev.enum_framesizes(FourCC::new(b"GREY")),
        Err(Error::Protocol(_))
    ));
}

#[test]
fn driver_adjusts_the_format() {
    init();
    let fake = FakeDevice::new();
    let dev = fake.open_device();

    let fmt = dev.negotiate(FourCC::new(b"YUYV"), 640, 480).unwrap();
    assert_eq!((fmt.width, fmt.height), (640, 480));
    assert_eq!(fmt.stride, 1280);
    assert_eq!(fmt.size, 640 * 480 * 2);

    let fmt = dev.negotiate(FourCC::new(b"MJPG"), 4000, 3000).unwrap();
    assert_eq!((fmt.width, fmt.height), (1920, 1080));
    assert_eq!(fmt.fourcc, FourCC::new(b"MJPG"));

    // unknown codes fall back to the current one
    let fmt = dev.negotiate(FourCC::new(b"RGB3"), 320, 240).unwrap();
    assert_eq!(fmt.fourcc, FourCC::new(b"MJPG"));

    assert_eq!(dev.format().unwrap(), fmt);
}

#[test]
fn streaming_requires_capabilities() {
    init();
    let fake = FakeDevice::new();
    fake.state().capabilities = CAP_STREAMING;
    let dev = fake.open_device();
    assert!(matches!(Stream::new(&dev), Err(Error::Unsupported(_))));

    let fake = FakeDevice::new();
    fake.state().capabilities = common::CAP_VIDEO_CAPTURE;
    let dev = fake.open_device();
    assert!(matches!(Stream::new(&dev), Err(Error::Unsupported(_))));
    assert!(fake.state().buffers.is_empty());
}

#[test]
fn descriptor_is_closed_last() {
    init();
    let fake = FakeDevice::new();
    let dev = fake.open_device();
    let stream = Stream::new(&dev).unwrap();
    assert_eq!(fake.state().open_fds.len(), 1);

    drop(dev);
    assert_eq!(fake.state().open_fds.len(), 1);
    assert_eq!(fake.live_mappings(), 4);

    drop(stream);
    assert_eq!(fake.live_mappings(), 0);
    assert!(fake.state().open_fds.is_empty());
}
