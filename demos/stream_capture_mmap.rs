use std::time::{Duration, Instant};

use v4l_stream::{Device, FourCC, Result, Stream};

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/video0".to_string());
    println!("Using device: {}\n", path);

    // Capture 10 frames by default
    let count = 10;

    // Allocate 4 buffers by default
    let buffer_count = 4;

    let dev = Device::with_path(&path)?;
    let format = dev.negotiate(FourCC::new(b"YUYV"), 640, 480)?;
    println!("Active format:\n{}", format);

    let mut stream = Stream::with_buffers(&dev, buffer_count)?;
    let timeout = Duration::from_secs(2);

    let start = Instant::now();
    let mut bytes = 0;
    let mut captured = 0;
    for _ in 0..count {
        let frame = match stream.next_frame(timeout)? {
            Some(frame) => frame,
            None => {
                println!("Timed out waiting for a frame");
                continue;
            }
        };

        let meta = *frame.meta();
        bytes += frame.data().len();
        captured += 1;

        println!("Buffer");
        println!("  index     : {}", frame.index());
        println!("  sequence  : {}", meta.sequence);
        println!("  timestamp : {}", meta.timestamp);
        println!("  flags     : {}", meta.flags);
        println!("  length    : {}", frame.data().len());

        frame.release()?;
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!();
    println!("FPS: {}", captured as f64 / elapsed);
    println!("MB/s: {}", bytes as f64 / 1_048_576.0 / elapsed);

    stream.stop()?;
    Ok(())
}
