//! Backing image access.
//!
//! An [`ImageFile`] is the open handle to the `.img` file a volume is mounted
//! from. All higher layers address it in whole sectors; this layer only knows
//! byte offsets and does absolute positioned reads and writes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use spin::RwLock;

use crate::{Error, MountMode, Result};

pub struct ImageFile {
    file: RwLock<File>,
    mode: MountMode,
    len: u64,
}

impl ImageFile {
    /// Open the backing image.
    ///
    /// The path must end in `.img` (case-sensitive). In read-only mode the
    /// file is opened without write access, so a write can never reach the
    /// image by accident.
    pub fn open(path: &Path, mode: MountMode) -> Result<Self> {
        let display = path.display().to_string();
        if !display.ends_with(".img") {
            return Err(Error::NotAnImage(display));
        }

        let file = match mode {
            MountMode::ReadOnly => OpenOptions::new().read(true).open(path)?,
            MountMode::ReadWrite => OpenOptions::new().read(true).write(true).open(path)?,
        };
        let len = file.metadata()?.len();

        Ok(Self {
            file: RwLock::new(file),
            mode,
            len,
        })
    }

    pub fn mode(&self) -> MountMode {
        self.mode
    }

    /// Length of the backing image in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read exactly `buf.len()` bytes at `offset`, stopping early only at end
    /// of file. Returns the number of bytes actually transferred; a short
    /// read at EOF is the short count, not an error.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut transferred = 0;
        while transferred < buf.len() {
            let n = file.read(&mut buf[transferred..])?;
            if n == 0 {
                break;
            }
            transferred += n;
        }
        Ok(transferred)
    }

    /// Write `buf` at `offset`. Fails before touching the image when the
    /// volume was mounted read-only.
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        if self.mode == MountMode::ReadOnly {
            return Err(Error::ReadOnlyVolume);
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }
}
