//! The interactive shell over a mounted volume.
//!
//! One command per input line. A line containing the literal two-byte `&&`
//! separator is split on it, each side trimmed of ASCII whitespace and
//! executed in order until one fails; a single `&` is ordinary text. Any
//! failed line is reported as `Failed to process command` and the loop keeps
//! going; only `exit`, `quit` or end of input stop it.

use std::io::BufRead;

use crate::entry::{FatDateTime, FileKind};
use crate::bpb::FatType;
use crate::render::{OutputSink, Style};
use crate::tree::NO_NODE;
use crate::volume::FatVolume;
use crate::MountMode;

const PERSONA: &str = "FATIMG";

pub struct Shell<'a> {
    volume: &'a mut FatVolume,
    sink: &'a mut dyn OutputSink,
    current_path: String,
    /// Fixed when the shell comes up at the root; `cd` does not change it.
    root_mode: bool,
    running: bool,
}

impl<'a> Shell<'a> {
    pub fn new(volume: &'a mut FatVolume, sink: &'a mut dyn OutputSink) -> Self {
        Self {
            volume,
            sink,
            current_path: String::from("/"),
            root_mode: true,
            running: true,
        }
    }

    /// The path shown in the prompt.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Read and execute commands until `exit`/`quit` or end of input.
    pub fn run(&mut self, mut input: impl BufRead) {
        self.sink.info("Switched to root mode\n");

        let mut line = String::new();
        while self.running {
            self.display_prompt();

            line.clear();
            match input.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let command = line.trim_end_matches(|c| c == '\n' || c == '\r');

            if !self.execute_line(command) {
                self.sink.error("Failed to process command\n");
            }
        }
    }

    fn display_prompt(&mut self) {
        self.sink.write_styled(Style::Persona, PERSONA);
        self.sink.write_styled(Style::Separator, "@");
        if self.root_mode {
            self.sink.write_styled(Style::ModeRoot, "root: ");
        } else {
            self.sink.write_styled(Style::ModeUser, "user: ");
        }
        self.sink.write_styled(Style::PromptPath, &self.current_path);
        self.sink.write_styled(Style::PromptTail, "$> ");
    }

    /// Split on the literal `&&` separator and run every part in order,
    /// stopping at the first failure.
    fn execute_line(&mut self, line: &str) -> bool {
        if line.contains("&&") {
            for part in line.split("&&") {
                let command = part.trim_matches(|c: char| c.is_ascii_whitespace());
                if command.is_empty() {
                    continue;
                }
                self.display_prompt();
                if !self.dispatch(command) {
                    return false;
                }
            }
            true
        } else {
            self.dispatch(line)
        }
    }

    fn dispatch(&mut self, command: &str) -> bool {
        let mut parts = command.split_whitespace();
        let Some(cmd) = parts.next() else {
            return true;
        };

        match cmd {
            "ls" => self.cmd_ls(),
            "cd" => match parts.next() {
                Some(path) => self.cmd_cd(path),
                None => {
                    self.sink.error("cd: missing operand\n");
                    false
                }
            },
            "cat" => match parts.next() {
                Some(path) => self.cmd_cat(path),
                None => {
                    self.sink.error("cat: missing operand\n");
                    false
                }
            },
            "evidence" => self.cmd_evidence(),
            "cls" | "clear" => {
                let _ = std::process::Command::new("clear").status();
                true
            }
            "help" => {
                self.show_help();
                true
            }
            "exit" | "quit" => {
                self.running = false;
                self.sink.info("Exiting...\n");
                true
            }
            other => {
                self.sink.error(&format!("Unknown command: {other}\n"));
                self.sink.info("Type 'help' for available commands\n");
                false
            }
        }
    }

    fn cmd_ls(&mut self) -> bool {
        let tree = self.volume.tree();
        let mut children = tree.children(self.volume.current_dir()).peekable();

        if children.peek().is_none() {
            self.sink.write_plain("Directory is empty\n");
            return true;
        }

        self.sink.write_plain(&format!(
            "{:<32} {:<12} {:<12} {:<20} {:<20}\n",
            "Name", "Type", "Size", "Created", "Modified"
        ));
        self.sink.write_plain(&format!("{}\n", "-".repeat(80)));

        for child in children {
            let node = tree.node(child);
            let style = if node.kind == FileKind::Directory {
                Style::Directory
            } else {
                Style::FileBody
            };
            self.sink
                .write_styled(style, &format!("{:<32} ", node.name));
            self.sink.write_plain(&format!(
                "{:<12} {:<12} {:<20} {:<20}\n",
                node.kind.name(),
                node.size,
                format_datetime(&node.created),
                format_datetime(&node.modified),
            ));
        }
        true
    }

    fn cmd_cd(&mut self, path: &str) -> bool {
        match path {
            "/" => {
                let root = self.volume.root();
                self.volume.set_current_dir(root).expect("root is a directory");
                self.current_path = String::from("/");
            }
            "." | "./" => {}
            ".." | "../" => {
                let parent = self.volume.tree().node(self.volume.current_dir()).parent;
                if parent != NO_NODE {
                    self.volume.set_current_dir(parent).expect("parent is a directory");
                    match self.current_path.rfind('/') {
                        Some(0) | None => self.current_path = String::from("/"),
                        Some(pos) => self.current_path.truncate(pos),
                    }
                }
            }
            _ => {
                let normalized = join_and_normalize(&self.current_path, path);
                let target = match self.volume.tree().resolve(self.volume.root(), &normalized) {
                    Some(node) => node,
                    None => {
                        self.sink.error(&format!("Directory not found: {path}\n"));
                        return false;
                    }
                };
                if self.volume.tree().node(target).kind != FileKind::Directory {
                    self.sink.error(&format!("Not a directory: {path}\n"));
                    return false;
                }
                self.volume.set_current_dir(target).expect("checked directory");
                self.current_path = normalized;
            }
        }

        true
    }

    fn cmd_cat(&mut self, path: &str) -> bool {
        let mut full_path = self.current_path.clone();
        if !full_path.ends_with('/') {
            full_path.push('/');
        }
        full_path.push_str(path);

        let node = match self.volume.tree().resolve(self.volume.root(), &full_path) {
            Some(node) => node,
            None => {
                self.sink.error(&format!("File not found: {path}\n"));
                return false;
            }
        };
        if self.volume.tree().node(node).kind != FileKind::Regular {
            self.sink.error(&format!("Not a regular file: {path}\n"));
            return false;
        }

        let size = self.volume.tree().node(node).size as usize;
        let mut buf = vec![0u8; size];
        let copied = match self.volume.read_file(node, &mut buf) {
            Ok(n) => n,
            Err(_) => {
                self.sink.error(&format!("Failed to read file: {path}\n"));
                return false;
            }
        };

        let body = String::from_utf8_lossy(&buf[..copied]).into_owned();
        self.sink.write_styled(Style::FileBody, &body);
        self.sink.write_plain("\n");
        true
    }

    fn cmd_evidence(&mut self) -> bool {
        let bs = self.volume.boot_sector();
        let fat_type = self.volume.fat_type();

        self.sink.info("File System Information:\n");
        self.sink
            .write_plain(&format!("FAT Type: {}\n", fat_type.name()));
        self.sink
            .write_plain(&format!("Bytes per Sector: {}\n", bs.bytes_per_sector));
        self.sink
            .write_plain(&format!("Sectors per Cluster: {}\n", bs.sectors_per_cluster));
        self.sink
            .write_plain(&format!("Reserved Sectors: {}\n", bs.reserved_sectors));
        self.sink
            .write_plain(&format!("Number of FATs: {}\n", bs.number_of_fats));
        if fat_type != FatType::Fat32 {
            self.sink
                .write_plain(&format!("Root Entry Count: {}\n", bs.root_entry_count));
        }
        self.sink
            .write_plain(&format!("Total Sectors: {}\n", bs.total_sectors()));
        self.sink
            .write_plain(&format!("FAT Size: {} sectors\n", bs.fat_size_sectors()));
        if fat_type == FatType::Fat32 {
            self.sink
                .write_plain(&format!("Root Cluster: {}\n", bs.root_cluster));
        }

        let info = self.volume.filesystem_info();
        self.sink
            .write_plain(&format!("Total Size: {} bytes\n", info.total_size));
        self.sink
            .write_plain(&format!("Free Size: {} bytes\n", info.free_size));
        self.sink
            .write_plain(&format!("Used Size: {} bytes\n", info.used_size()));

        self.sink.write_plain("\nConfiguration:\n");
        let mode = match self.volume.mode() {
            MountMode::ReadOnly => "Read-Only",
            MountMode::ReadWrite => "Read-Write",
        };
        self.sink.write_plain(&format!("Mode: {mode}\n"));
        self.sink
            .write_plain(&format!("Sector Size: {}\n", self.volume.sector_size()));
        true
    }

    fn show_help(&mut self) {
        self.sink.write_plain("Available commands:\n");
        self.sink
            .write_plain("  ls                  List files and directories\n");
        self.sink.write_plain("  cd <path>           Change directory\n");
        self.sink.write_plain("  cat <file>          Display file content\n");
        self.sink
            .write_plain("  evidence            Show file system information\n");
        self.sink.write_plain("  cls, clear          Clear the screen\n");
        self.sink.write_plain("  help                Show this help message\n");
        self.sink.write_plain("  exit, quit          Exit the program\n");
    }
}

fn format_datetime(dt: &FatDateTime) -> String {
    match dt.to_naive() {
        Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::from("N/A"),
    }
}

/// Join `arg` onto the current display path and collapse `.`, `..` and
/// repeated slashes into a normalized absolute path.
fn join_and_normalize(current: &str, arg: &str) -> String {
    let mut joined = String::from(current);
    if !joined.ends_with('/') {
        joined.push('/');
    }
    joined.push_str(arg);

    let mut components: Vec<&str> = Vec::new();
    for token in joined.split('/') {
        match token {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            name => components.push(name),
        }
    }

    if components.is_empty() {
        String::from("/")
    } else {
        format!("/{}", components.join("/"))
    }
}
