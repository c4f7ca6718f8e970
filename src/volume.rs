//! The mount facade.
//!
//! A [`FatVolume`] owns every layer below it: the sector HAL, the decoded
//! boot sector and geometry, the in-memory FAT and the materialized
//! directory tree. All of it is acquired in [`FatVolume::mount`] and dropped
//! together; a failure partway through releases whatever was already built,
//! and no partially built tree ever escapes.

use std::path::PathBuf;

use log::debug;

use crate::bpb::{BootSector, FatType, Geometry};
use crate::entry::FileKind;
use crate::fat::{EocPolicy, FatTable};
use crate::hal::SectorHal;
use crate::tree::{build_tree, FileTree, NodeId};
use crate::{Error, MountMode, Result};

#[derive(Debug, Clone)]
pub struct MountConfig {
    pub image_path: PathBuf,
    pub mode: MountMode,
    /// HAL sector size in bytes; must be one of 512, 1024, 2048, 4096.
    pub sector_size: u32,
    pub eoc_policy: EocPolicy,
}

impl MountConfig {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            mode: MountMode::ReadOnly,
            sector_size: 512,
            eoc_policy: EocPolicy::default(),
        }
    }

    pub fn mode(mut self, mode: MountMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn sector_size(mut self, sector_size: u32) -> Self {
        self.sector_size = sector_size;
        self
    }

    pub fn eoc_policy(mut self, eoc_policy: EocPolicy) -> Self {
        self.eoc_policy = eoc_policy;
        self
    }
}

/// Total and free capacity of a mounted volume, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    pub total_size: u64,
    pub free_size: u64,
}

impl FsInfo {
    pub fn used_size(&self) -> u64 {
        self.total_size - self.free_size
    }
}

pub struct FatVolume {
    hal: SectorHal,
    boot_sector: BootSector,
    geometry: Geometry,
    fat: FatTable,
    tree: FileTree,
    current_dir: NodeId,
    mode: MountMode,
}

impl FatVolume {
    /// Mount the image described by `config`.
    ///
    /// Initializes the HAL, reads and validates the boot sector, derives the
    /// geometry, loads the FAT and builds the directory tree. The current
    /// directory starts at the root.
    pub fn mount(config: MountConfig) -> Result<Self> {
        let hal = SectorHal::new(&config.image_path, config.mode, config.sector_size)?;

        let mut sector = vec![0u8; hal.sector_size()];
        hal.read_sector(0, &mut sector)?;
        let boot_sector = BootSector::parse(&sector);
        boot_sector.validate(hal.sector_size())?;

        let geometry = Geometry::from_boot_sector(&boot_sector);
        debug!(
            "mounting {}: {}, {} total clusters, data from sector {}",
            config.image_path.display(),
            geometry.fat_type().name(),
            geometry.total_clusters,
            geometry.first_data_sector
        );

        let fat = FatTable::load(&hal, &geometry, config.eoc_policy)?;
        let tree = build_tree(&hal, &geometry, &fat)?;
        debug!("directory tree holds {} nodes", tree.len());

        let root = tree.root();
        Ok(Self {
            hal,
            boot_sector,
            geometry,
            fat,
            tree,
            current_dir: root,
            mode: config.mode,
        })
    }

    /// Release the mount. Consuming the volume makes a second unmount
    /// unrepresentable; everything the mount acquired is dropped here.
    pub fn unmount(self) {}

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot_sector
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn fat_type(&self) -> FatType {
        self.geometry.fat_type()
    }

    pub fn mode(&self) -> MountMode {
        self.mode
    }

    pub fn sector_size(&self) -> usize {
        self.hal.sector_size()
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn current_dir(&self) -> NodeId {
        self.current_dir
    }

    /// Move the current directory. The target must be a directory node.
    pub fn set_current_dir(&mut self, node: NodeId) -> Result<()> {
        if self.tree.node(node).kind != FileKind::Directory {
            return Err(Error::NotADirectory(self.tree.node(node).name.clone()));
        }
        self.current_dir = node;
        Ok(())
    }

    /// Read a regular file's content into `buf`.
    ///
    /// Walks the node's cluster chain sector by sector, copying
    /// `min(remaining, sector_size)` each step, capped at the smaller of the
    /// buffer and the recorded file size. Returns the byte count copied.
    pub fn read_file(&self, node: NodeId, buf: &mut [u8]) -> Result<usize> {
        let file = self.tree.node(node);
        if file.kind != FileKind::Regular {
            return Err(Error::NotARegularFile(file.name.clone()));
        }

        let want = buf.len().min(file.size as usize);
        let sector_size = self.hal.sector_size();
        let mut sector = vec![0u8; sector_size];
        let mut copied = 0usize;

        'chain: for cluster in self.fat.chain(file.first_cluster) {
            let first_sector = self.geometry.cluster_to_sector(cluster);
            for i in 0..self.geometry.sectors_per_cluster {
                if copied >= want {
                    break 'chain;
                }
                self.hal.read_sector(first_sector + i, &mut sector)?;
                let n = (want - copied).min(sector_size);
                buf[copied..copied + n].copy_from_slice(&sector[..n]);
                copied += n;
            }
        }

        Ok(copied)
    }

    /// Write a regular file's content. Not implemented: a read-only mount
    /// refuses before any I/O, and a read-write mount reports the write path
    /// as unsupported rather than pretending success.
    pub fn write_file(&self, node: NodeId, _buf: &[u8]) -> Result<usize> {
        let file = self.tree.node(node);
        if file.kind != FileKind::Regular {
            return Err(Error::NotARegularFile(file.name.clone()));
        }
        if self.mode == MountMode::ReadOnly {
            return Err(Error::ReadOnlyVolume);
        }
        Err(Error::WriteUnsupported)
    }

    /// Total and free capacity. Free space is counted by scanning the FAT
    /// for zero entries over the user cluster range.
    pub fn filesystem_info(&self) -> FsInfo {
        let cluster_size = self.geometry.cluster_size_bytes() as u64;
        FsInfo {
            total_size: self.geometry.total_clusters as u64 * cluster_size,
            free_size: self.fat.free_clusters() as u64 * cluster_size,
        }
    }
}
