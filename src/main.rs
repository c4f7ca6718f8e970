use std::io;
use std::process;

use clap::{Arg, Command};

use fatimg::render::{OutputSink, StdoutSink};
use fatimg::shell::Shell;
use fatimg::volume::{FatVolume, MountConfig};
use fatimg::MountMode;

mod logging;

fn main() {
    logging::init();

    let mut sink = StdoutSink::new();
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| String::from("fatimg"));

    let matches = Command::new("fatimg")
        .about("FAT12/16/32 disk image explorer")
        .disable_help_flag(true)
        .arg(Arg::new("image").help("Path to the image file"))
        .arg(Arg::new("mode").help("'read-only' (default) or 'read-write'"))
        .try_get_matches();

    let matches = match matches {
        Ok(matches) => matches,
        Err(err) => {
            sink.error(&format!("{err}\n"));
            process::exit(1);
        }
    };

    let Some(image) = matches.get_one::<String>("image") else {
        sink.warning(&format!("Usage: {program} <img_file> [mode]\n"));
        sink.info("  <img_file>: Path to the image file\n");
        sink.info("  [mode]: Optional, 'read-only' (default) or 'read-write'\n");
        process::exit(1);
    };

    let mode = match matches.get_one::<String>("mode").map(String::as_str) {
        None | Some("read-only") => MountMode::ReadOnly,
        Some("read-write") => MountMode::ReadWrite,
        Some(other) => {
            sink.error(&format!("Invalid mode: {other}\n"));
            sink.info("Mode must be 'read-only' or 'read-write'\n");
            process::exit(1);
        }
    };

    let config = MountConfig::new(image).mode(mode);
    let mut volume = match FatVolume::mount(config) {
        Ok(volume) => volume,
        Err(err) => {
            sink.error(&format!("Failed to mount file system: {err}\n"));
            process::exit(1);
        }
    };
    sink.success("Mount successful\n");

    let stdin = io::stdin();
    let mut shell = Shell::new(&mut volume, &mut sink);
    shell.run(stdin.lock());
    drop(shell);

    volume.unmount();
    process::exit(42);
}
