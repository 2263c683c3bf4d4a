use v4l_stream::{Device, Result};

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/video0".to_string());
    println!("Using device: {}\n", path);

    let dev = Device::with_path(&path)?;
    println!("Capabilities:\n{}", dev.caps());

    let format = dev.format()?;
    println!("Active format:\n{}", format);

    println!("Available formats:");
    for format in dev.enum_formats()? {
        println!("  {} ({}) [{}]", format.fourcc, format.description, format.flags);

        for framesize in dev.enum_framesizes(format.fourcc)? {
            println!("    Size: {}", framesize);
        }

        println!()
    }

    Ok(())
}
