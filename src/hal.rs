//! Sector-addressed I/O over the backing image.
//!
//! The [`SectorHal`] owns the image handle and a fixed [`SectorSize`] chosen
//! at initialization. Everything above it reads and writes whole sectors;
//! the byte offset of sector `i` is simply `i * sector_size`.

use std::path::Path;

use crate::device::ImageFile;
use crate::{Error, MountMode, Result};

/// The sector sizes the HAL accepts. Anything else is rejected at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SectorSize {
    B512 = 512,
    B1024 = 1024,
    B2048 = 2048,
    B4096 = 4096,
}

impl SectorSize {
    pub fn bytes(self) -> usize {
        self as u32 as usize
    }
}

impl Default for SectorSize {
    fn default() -> Self {
        SectorSize::B512
    }
}

impl TryFrom<u32> for SectorSize {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            512 => Ok(SectorSize::B512),
            1024 => Ok(SectorSize::B1024),
            2048 => Ok(SectorSize::B2048),
            4096 => Ok(SectorSize::B4096),
            other => Err(Error::UnsupportedSectorSize(other)),
        }
    }
}

pub struct SectorHal {
    image: ImageFile,
    sector_size: SectorSize,
}

impl SectorHal {
    /// Open the image at `path` and fix the sector size.
    ///
    /// The image is opened first; if the sector size is not one of the
    /// supported values, or the image length is not a positive multiple of
    /// it, the handle is closed again on the way out.
    pub fn new(path: &Path, mode: MountMode, sector_size: u32) -> Result<Self> {
        let image = ImageFile::open(path, mode)?;
        let sector_size = SectorSize::try_from(sector_size)?;

        if image.is_empty() || image.len() % sector_size.bytes() as u64 != 0 {
            return Err(Error::BadImageSize(image.len()));
        }

        Ok(Self { image, sector_size })
    }

    pub fn sector_size(&self) -> usize {
        self.sector_size.bytes()
    }

    pub fn mode(&self) -> MountMode {
        self.image.mode()
    }

    /// Read sector `sector` into `buf`, which must be exactly one sector.
    pub fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), self.sector_size(), "buffer must be one sector");

        let offset = sector as u64 * self.sector_size() as u64;
        let n = self.image.read_at(offset, buf)?;
        if n != self.sector_size() {
            return Err(Error::ShortRead(sector));
        }
        Ok(())
    }

    /// Write `buf`, exactly one sector long, to sector `sector`.
    pub fn write_sector(&self, sector: u32, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), self.sector_size(), "buffer must be one sector");

        let offset = sector as u64 * self.sector_size() as u64;
        let n = self.image.write_at(offset, buf)?;
        if n != self.sector_size() {
            return Err(Error::ShortWrite(sector));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn temp_image(name: &str, len: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "fatimg-hal-{}-{}.img",
            std::process::id(),
            name
        ));
        std::fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn sector_size_accepts_the_four_supported_values() {
        for size in [512u32, 1024, 2048, 4096] {
            assert_eq!(SectorSize::try_from(size).unwrap().bytes(), size as usize);
        }
    }

    #[test]
    fn sector_size_rejects_everything_else() {
        for size in [0u32, 1, 256, 513, 8192] {
            assert!(matches!(
                SectorSize::try_from(size),
                Err(Error::UnsupportedSectorSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn image_length_must_be_a_multiple_of_the_sector_size() {
        let path = temp_image("ragged", 1000);
        assert!(matches!(
            SectorHal::new(&path, MountMode::ReadOnly, 512),
            Err(Error::BadImageSize(1000))
        ));

        // The same image is fine once the length lines up.
        let path = temp_image("aligned", 1024);
        assert!(SectorHal::new(&path, MountMode::ReadOnly, 512).is_ok());

        // A length aligned to 512 but not to the configured size still fails.
        let path = temp_image("coarse", 512 * 3);
        assert!(matches!(
            SectorHal::new(&path, MountMode::ReadOnly, 1024),
            Err(Error::BadImageSize(1536))
        ));
    }

    #[test]
    fn empty_images_are_rejected() {
        let path = temp_image("empty", 0);
        assert!(matches!(
            SectorHal::new(&path, MountMode::ReadOnly, 512),
            Err(Error::BadImageSize(0))
        ));
    }
}
