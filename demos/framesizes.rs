use v4l_stream::framesize::FrameSizeEnum;
use v4l_stream::Device;

fn main() {
    env_logger::init();

    // Device node path or index (default: 0)
    let mut path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/video0".to_string());
    if path.parse::<u64>().is_ok() {
        path = format!("/dev/video{}", path);
    }
    println!("Using device: {}\n", path);

    let dev = Device::with_path(&path).expect("Failed to open device");
    let format = dev.format().expect("Failed to get format");
    let framesizes = dev
        .enum_framesizes(format.fourcc)
        .expect("Failed to enumerate frame sizes");

    println!("Active format:\n{}", format);
    println!("Active format framesizes:");

    for framesize in framesizes {
        println!("{}", framesize);
        if let FrameSizeEnum::Discrete(_) = framesize.size {
            continue;
        }

        let range = framesize.size.range();
        println!(
            "  widths {}..={} step {}, heights {}..={} step {}",
            range.min_width,
            range.max_width,
            range.step_width,
            range.min_height,
            range.max_height,
            range.step_height
        );
    }
}
