//! Boot sector decoding and volume geometry.
//!
//! The first sector of a FAT volume carries the BIOS Parameter Block. All
//! multi-byte fields are little-endian and live at fixed byte offsets; the
//! FAT32 extension block is present exactly when the 16-bit FAT size field
//! is zero, and the tail fields (drive number through fs type) shift from
//! base 36 to base 64 in that case.
//!
//! The FAT variant is *not* determined by the fs-type string. The one and
//! only way to classify a volume is by its count of data clusters: fewer
//! than 4085 clusters is FAT12, fewer than 65525 is FAT16, anything else
//! is FAT32.

use log::error;

use crate::{
    read_le_u16, read_le_u32, Error, Result, MAX_CLUSTER_FAT12, MAX_CLUSTER_FAT16,
};

/// The decoded BIOS Parameter Block.
///
/// Fields are kept verbatim as read from sector 0; all derived layout lives
/// in [`Geometry`].
#[derive(Debug, Clone, Default)]
pub struct BootSector {
    /// Offset 11: bytes per sector, one of 512, 1024, 2048, 4096.
    pub bytes_per_sector: u16,
    /// Offset 13: sectors per allocation unit, a power of two >= 1.
    pub sectors_per_cluster: u8,
    /// Offset 14: sectors in the reserved region, including this one.
    pub reserved_sectors: u16,
    /// Offset 16: number of FAT copies, typically 2.
    pub number_of_fats: u8,
    /// Offset 17: root directory entry count; 0 on FAT32.
    pub root_entry_count: u16,
    /// Offset 19: 16-bit total sector count; 0 iff the 32-bit count is used.
    pub total_sectors_16: u16,
    /// Offset 21: media descriptor, 0xF8 for fixed media.
    pub media_type: u8,
    /// Offset 22: 16-bit FAT size in sectors; 0 marks a FAT32 volume.
    pub fat_size_16: u16,
    /// Offset 24: sectors per track, CHS-era geometry.
    pub sectors_per_track: u16,
    /// Offset 26: head count, CHS-era geometry.
    pub number_of_heads: u16,
    /// Offset 28: sectors preceding this volume on partitioned media.
    pub hidden_sectors: u32,
    /// Offset 32: 32-bit total sector count; 0 iff the 16-bit count is used.
    pub total_sectors_32: u32,

    // FAT32 extension block, present iff fat_size_16 == 0.
    /// Offset 36: 32-bit FAT size in sectors.
    pub fat_size_32: u32,
    /// Offset 40: FAT mirroring flags.
    pub extended_flags: u16,
    /// Offset 42: filesystem version, 0.0.
    pub fs_version: u16,
    /// Offset 44: first cluster of the root directory, usually 2.
    pub root_cluster: u32,
    /// Offset 48: sector of the FSInfo structure, usually 1.
    pub fs_info: u16,
    /// Offset 50: sector of the backup boot record, usually 6.
    pub backup_boot_sector: u16,
    /// Offset 52: 12 reserved bytes.
    pub reserved: [u8; 12],

    // Tail fields, at base 64 on FAT32 and base 36 on FAT12/16.
    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    /// 11 bytes, space-padded, not NUL-terminated.
    pub volume_label: [u8; 11],
    /// 8 bytes, informational only; never used for classification.
    pub fs_type: [u8; 8],
}

impl BootSector {
    /// Decode the BPB out of a raw copy of sector 0.
    pub fn parse(sector: &[u8]) -> Self {
        let mut bs = BootSector {
            bytes_per_sector: read_le_u16(&sector[11..]),
            sectors_per_cluster: sector[13],
            reserved_sectors: read_le_u16(&sector[14..]),
            number_of_fats: sector[16],
            root_entry_count: read_le_u16(&sector[17..]),
            total_sectors_16: read_le_u16(&sector[19..]),
            media_type: sector[21],
            fat_size_16: read_le_u16(&sector[22..]),
            sectors_per_track: read_le_u16(&sector[24..]),
            number_of_heads: read_le_u16(&sector[26..]),
            hidden_sectors: read_le_u32(&sector[28..]),
            total_sectors_32: read_le_u32(&sector[32..]),
            ..BootSector::default()
        };

        if bs.fat_size_16 == 0 {
            bs.fat_size_32 = read_le_u32(&sector[36..]);
            bs.extended_flags = read_le_u16(&sector[40..]);
            bs.fs_version = read_le_u16(&sector[42..]);
            bs.root_cluster = read_le_u32(&sector[44..]);
            bs.fs_info = read_le_u16(&sector[48..]);
            bs.backup_boot_sector = read_le_u16(&sector[50..]);
            bs.reserved.copy_from_slice(&sector[52..64]);
        }

        // The common tail shifts past the FAT32 block when it is present.
        let base = if bs.fat_size_16 == 0 { 64 } else { 36 };
        bs.drive_number = sector[base];
        bs.reserved1 = sector[base + 1];
        bs.boot_signature = sector[base + 2];
        bs.volume_id = read_le_u32(&sector[base + 3..]);
        bs.volume_label.copy_from_slice(&sector[base + 7..base + 18]);
        bs.fs_type.copy_from_slice(&sector[base + 18..base + 26]);

        bs
    }

    /// Reject boot sectors this mount cannot interpret.
    ///
    /// The checks are strict: a bytes-per-sector outside the supported set or
    /// different from the HAL sector size, a sectors-per-cluster that is zero
    /// or not a power of two, or two (or zero) active total-sector fields all
    /// fail the mount instead of being patched over.
    pub fn validate(&self, hal_sector_size: usize) -> Result<()> {
        let bps = self.bytes_per_sector as u32;
        if !matches!(bps, 512 | 1024 | 2048 | 4096) {
            error!("bytes per sector ({bps}) must be 512, 1024, 2048 or 4096");
            return Err(Error::InvalidBootSector("unsupported bytes per sector"));
        }
        if bps as usize != hal_sector_size {
            error!(
                "bytes per sector ({bps}) does not match the I/O sector size ({hal_sector_size})"
            );
            return Err(Error::InvalidBootSector(
                "bytes per sector differs from the I/O sector size",
            ));
        }

        let spc = self.sectors_per_cluster;
        if spc == 0 || !spc.is_power_of_two() {
            error!("sectors per cluster ({spc}) must be a power of two");
            return Err(Error::InvalidBootSector("bad sectors per cluster"));
        }

        if (self.total_sectors_16 == 0) == (self.total_sectors_32 == 0) {
            error!(
                "exactly one total-sector field must be set (16-bit: {}, 32-bit: {})",
                self.total_sectors_16, self.total_sectors_32
            );
            return Err(Error::InvalidBootSector("ambiguous total sector count"));
        }

        if self.fat_size_16 == 0 && self.fat_size_32 == 0 {
            error!("both FAT size fields are zero");
            return Err(Error::InvalidBootSector("missing FAT size"));
        }

        Ok(())
    }

    /// FAT size in sectors, whichever field carries it.
    pub fn fat_size_sectors(&self) -> u32 {
        if self.fat_size_16 != 0 {
            self.fat_size_16 as u32
        } else {
            self.fat_size_32
        }
    }

    /// Total sector count, whichever field carries it.
    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

impl FatType {
    pub fn name(self) -> &'static str {
        match self {
            FatType::Fat12 => "FAT12",
            FatType::Fat16 => "FAT16",
            FatType::Fat32 => "FAT32",
        }
    }
}

/// Volume layout derived from the BPB. Computed once at mount, immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    /// First sector of the first FAT copy.
    pub first_fat_sector: u32,
    /// FAT size in sectors.
    pub fat_size_sectors: u32,
    /// Sectors occupied by the fixed root directory region; 0 on FAT32.
    pub root_dir_sectors: u32,
    /// First sector of the fixed root directory region (FAT12/16).
    pub first_root_dir_sector: u32,
    /// First sector of cluster 2.
    pub first_data_sector: u32,
    pub total_sectors: u32,
    pub data_sectors: u32,
    /// Count of data clusters, starting at cluster 2. This number alone
    /// decides the FAT variant.
    pub total_clusters: u32,
    /// First cluster of the root directory chain; meaningful on FAT32 only.
    pub root_cluster: u32,
    fat_type: FatType,
}

impl Geometry {
    pub fn from_boot_sector(bs: &BootSector) -> Self {
        let bytes_per_sector = bs.bytes_per_sector as u32;
        let sectors_per_cluster = bs.sectors_per_cluster as u32;
        let fat_size_sectors = bs.fat_size_sectors();
        let total_sectors = bs.total_sectors();

        let first_fat_sector = bs.reserved_sectors as u32;
        // Rounds up; always 0 on FAT32 where root_entry_count is 0.
        let root_dir_sectors = ((bs.root_entry_count as u32 * 32) + bytes_per_sector - 1)
            / bytes_per_sector;
        let first_root_dir_sector =
            bs.reserved_sectors as u32 + bs.number_of_fats as u32 * fat_size_sectors;

        let data_sectors = total_sectors.saturating_sub(
            bs.reserved_sectors as u32
                + bs.number_of_fats as u32 * fat_size_sectors
                + root_dir_sectors,
        );
        let total_clusters = data_sectors / sectors_per_cluster;

        let fat_type = if total_clusters < MAX_CLUSTER_FAT12 {
            FatType::Fat12
        } else if total_clusters < MAX_CLUSTER_FAT16 {
            FatType::Fat16
        } else {
            FatType::Fat32
        };

        // On FAT32 there is no fixed root region; the data area starts right
        // after the FATs and the root directory is an ordinary cluster chain.
        let first_data_sector = match fat_type {
            FatType::Fat32 => bs.reserved_sectors as u32 + bs.number_of_fats as u32 * fat_size_sectors,
            _ => first_root_dir_sector + root_dir_sectors,
        };

        Self {
            bytes_per_sector,
            sectors_per_cluster,
            first_fat_sector,
            fat_size_sectors,
            root_dir_sectors,
            first_root_dir_sector,
            first_data_sector,
            total_sectors,
            data_sectors,
            total_clusters,
            root_cluster: bs.root_cluster,
            fat_type,
        }
    }

    pub fn fat_type(&self) -> FatType {
        self.fat_type
    }

    /// First sector of a data cluster. Clusters 0 and 1 are reserved and
    /// map to sector 0.
    pub fn cluster_to_sector(&self, cluster: u32) -> u32 {
        if cluster < 2 {
            return 0;
        }
        self.first_data_sector + (cluster - 2) * self.sectors_per_cluster
    }

    pub fn cluster_size_bytes(&self) -> u32 {
        self.sectors_per_cluster * self.bytes_per_sector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A boot sector whose geometry works out to `total_clusters` data
    /// clusters with one sector per cluster.
    fn synthetic(total_clusters: u32) -> BootSector {
        BootSector {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            number_of_fats: 1,
            root_entry_count: 0,
            total_sectors_32: total_clusters + 2,
            fat_size_16: 1,
            ..BootSector::default()
        }
    }

    fn sample_sector() -> Vec<u8> {
        let mut sector = vec![0u8; 512];
        sector[0] = 0xEB;
        sector[2] = 0x90;
        sector[11..13].copy_from_slice(&512u16.to_le_bytes());
        sector[13] = 4;
        sector[14..16].copy_from_slice(&2u16.to_le_bytes());
        sector[16] = 2;
        sector[17..19].copy_from_slice(&224u16.to_le_bytes());
        sector[19..21].copy_from_slice(&2880u16.to_le_bytes());
        sector[21] = 0xF0;
        sector[22..24].copy_from_slice(&9u16.to_le_bytes());
        sector[24..26].copy_from_slice(&18u16.to_le_bytes());
        sector[26..28].copy_from_slice(&2u16.to_le_bytes());
        sector[28..32].copy_from_slice(&0u32.to_le_bytes());
        sector[32..36].copy_from_slice(&0u32.to_le_bytes());
        // Tail at base 36 for a FAT12/16 layout.
        sector[36] = 0x00;
        sector[38] = 0x29;
        sector[39..43].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        sector[43..54].copy_from_slice(b"TESTVOLUME ");
        sector[54..62].copy_from_slice(b"FAT12   ");
        sector[510] = 0x55;
        sector[511] = 0xAA;
        sector
    }

    #[test]
    fn parse_reads_every_field_at_its_offset() {
        let bs = BootSector::parse(&sample_sector());
        assert_eq!(bs.bytes_per_sector, 512);
        assert_eq!(bs.sectors_per_cluster, 4);
        assert_eq!(bs.reserved_sectors, 2);
        assert_eq!(bs.number_of_fats, 2);
        assert_eq!(bs.root_entry_count, 224);
        assert_eq!(bs.total_sectors_16, 2880);
        assert_eq!(bs.media_type, 0xF0);
        assert_eq!(bs.fat_size_16, 9);
        assert_eq!(bs.sectors_per_track, 18);
        assert_eq!(bs.number_of_heads, 2);
        assert_eq!(bs.hidden_sectors, 0);
        assert_eq!(bs.total_sectors_32, 0);
        assert_eq!(bs.boot_signature, 0x29);
        assert_eq!(bs.volume_id, 0xDEAD_BEEF);
        assert_eq!(&bs.volume_label, b"TESTVOLUME ");
        assert_eq!(&bs.fs_type, b"FAT12   ");
    }

    #[test]
    fn fat32_extension_block_is_read_when_fat_size_16_is_zero() {
        let mut sector = vec![0u8; 512];
        sector[11..13].copy_from_slice(&512u16.to_le_bytes());
        sector[13] = 8;
        sector[14..16].copy_from_slice(&32u16.to_le_bytes());
        sector[16] = 2;
        sector[32..36].copy_from_slice(&1_048_576u32.to_le_bytes());
        sector[36..40].copy_from_slice(&1009u32.to_le_bytes());
        sector[44..48].copy_from_slice(&2u32.to_le_bytes());
        sector[48..50].copy_from_slice(&1u16.to_le_bytes());
        sector[50..52].copy_from_slice(&6u16.to_le_bytes());
        sector[64] = 0x80;
        sector[66] = 0x29;
        sector[71..82].copy_from_slice(b"NO NAME    ");
        sector[82..90].copy_from_slice(b"FAT32   ");

        let bs = BootSector::parse(&sector);
        assert_eq!(bs.fat_size_16, 0);
        assert_eq!(bs.fat_size_32, 1009);
        assert_eq!(bs.root_cluster, 2);
        assert_eq!(bs.fs_info, 1);
        assert_eq!(bs.backup_boot_sector, 6);
        assert_eq!(bs.drive_number, 0x80);
        assert_eq!(&bs.fs_type, b"FAT32   ");
    }

    #[test]
    fn classification_boundaries() {
        let cases = [
            (4084, FatType::Fat12),
            (4085, FatType::Fat16),
            (65524, FatType::Fat16),
            (65525, FatType::Fat32),
        ];
        for (clusters, expected) in cases {
            let geo = Geometry::from_boot_sector(&synthetic(clusters));
            assert_eq!(geo.total_clusters, clusters);
            assert_eq!(geo.fat_type(), expected, "{clusters} clusters");
        }
    }

    #[test]
    fn cluster_to_sector_mapping() {
        let geo = Geometry::from_boot_sector(&synthetic(100));
        // reserved(1) + fat(1) + no root region
        assert_eq!(geo.first_data_sector, 2);
        assert_eq!(geo.cluster_to_sector(2), geo.first_data_sector);
        assert_eq!(geo.cluster_to_sector(7), geo.first_data_sector + 5);
        assert_eq!(geo.cluster_to_sector(0), 0);
        assert_eq!(geo.cluster_to_sector(1), 0);
    }

    #[test]
    fn validate_rejects_mismatched_sector_size() {
        let bs = BootSector::parse(&sample_sector());
        assert!(bs.validate(512).is_ok());
        assert!(bs.validate(1024).is_err());
    }

    #[test]
    fn validate_rejects_non_power_of_two_cluster_size() {
        let mut bs = BootSector::parse(&sample_sector());
        bs.sectors_per_cluster = 3;
        assert!(bs.validate(512).is_err());
        bs.sectors_per_cluster = 0;
        assert!(bs.validate(512).is_err());
    }

    #[test]
    fn validate_requires_exactly_one_total_sector_field() {
        let mut bs = BootSector::parse(&sample_sector());
        bs.total_sectors_32 = 2880;
        assert!(bs.validate(512).is_err());
        bs.total_sectors_16 = 0;
        assert!(bs.validate(512).is_ok());
    }
}
