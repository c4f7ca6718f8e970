//! Raw 32-byte directory entries.
//!
//! A FAT directory is a flat array of 32-byte records. The first name byte
//! doubles as a marker: 0x00 for a never-used slot, 0xE5 for a deleted one.
//! An attribute byte of 0x0F marks a long-file-name continuation; those are
//! not reconstructed here and fall out together with volume labels, since
//! both carry the volume-ID bit.

use chrono::{NaiveDate, NaiveDateTime};

use crate::bpb::FatType;
use crate::{
    read_le_u16, read_le_u32, ATTR_DIRECTORY, ATTR_VOLUME_ID, DIR_ENTRY_DELETED,
    DIR_ENTRY_UNUSED, DOT, SPACE,
};

/// What a directory entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    VolumeId,
    Unknown,
}

impl FileKind {
    pub fn name(self) -> &'static str {
        match self {
            FileKind::Regular => "File",
            FileKind::Directory => "Directory",
            FileKind::VolumeId => "Volume ID",
            FileKind::Unknown => "Unknown",
        }
    }
}

/// Date and time fields as packed into a directory entry.
///
/// year = 1980 + bits 9..15 of the date word, month = bits 5..8,
/// day = bits 0..4; hour = bits 11..15 of the time word, minute = bits
/// 5..10, second = twice bits 0..4. The packing admits out-of-range values
/// (a zeroed date decodes to month 0); display code maps those to "N/A"
/// through [`FatDateTime::to_naive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FatDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl FatDateTime {
    pub fn from_packed(date: u16, time: u16) -> Self {
        Self {
            year: 1980 + ((date >> 9) & 0x7F),
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: ((time >> 11) & 0x1F) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second: ((time & 0x1F) * 2) as u8,
        }
    }

    /// The decoded timestamp as a calendar value, or `None` when the packed
    /// fields do not form a valid date or time.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_opt(self.hour as u32, self.minute as u32, self.second as u32)
    }
}

/// One decoded 32-byte directory entry.
#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    /// Bytes 0..8: name, space-padded.
    pub name: [u8; 8],
    /// Bytes 8..11: extension, space-padded.
    pub extension: [u8; 3],
    /// Byte 11: attribute bits.
    pub attributes: u8,
    /// Byte 13: creation time, tenths of a second part.
    pub create_time_tenth: u8,
    /// Bytes 14..16: creation time.
    pub create_time: u16,
    /// Bytes 16..18: creation date.
    pub create_date: u16,
    /// Bytes 18..20: last access date.
    pub last_access_date: u16,
    /// Bytes 20..22: first cluster, high word. Meaningful on FAT32 only.
    pub first_cluster_high: u16,
    /// Bytes 22..24: last write time.
    pub write_time: u16,
    /// Bytes 24..26: last write date.
    pub write_date: u16,
    /// Bytes 26..28: first cluster, low word.
    pub first_cluster_low: u16,
    /// Bytes 28..32: file size in bytes; 0 for directories.
    pub file_size: u32,
}

impl DirEntry {
    /// Decode one 32-byte slot.
    pub fn parse(slot: &[u8]) -> Self {
        let mut name = [0u8; 8];
        let mut extension = [0u8; 3];
        name.copy_from_slice(&slot[0..8]);
        extension.copy_from_slice(&slot[8..11]);

        Self {
            name,
            extension,
            attributes: slot[11],
            create_time_tenth: slot[13],
            create_time: read_le_u16(&slot[14..]),
            create_date: read_le_u16(&slot[16..]),
            last_access_date: read_le_u16(&slot[18..]),
            first_cluster_high: read_le_u16(&slot[20..]),
            write_time: read_le_u16(&slot[22..]),
            write_date: read_le_u16(&slot[24..]),
            first_cluster_low: read_le_u16(&slot[26..]),
            file_size: read_le_u32(&slot[28..]),
        }
    }

    /// Slot was never allocated. Scanning continues past it; unlike the 0xE5
    /// mark, later slots may still be in use on volumes written by sloppy
    /// tools.
    pub fn is_unused(&self) -> bool {
        self.name[0] == DIR_ENTRY_UNUSED
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == DIR_ENTRY_DELETED
    }

    /// Volume label, and with it every long-name continuation (attribute
    /// 0x0F has the volume-ID bit set too).
    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME_ID != 0
    }

    /// The `.` or `..` self/parent entry of a subdirectory.
    pub fn is_dot_entry(&self) -> bool {
        self.name[0] == DOT
            && (self.name[1] == SPACE || (self.name[1] == DOT && self.name[2] == SPACE))
    }

    pub fn kind(&self) -> FileKind {
        if self.attributes & ATTR_DIRECTORY != 0 {
            FileKind::Directory
        } else {
            FileKind::Regular
        }
    }

    /// First cluster of the entry's data. The high word only counts on
    /// FAT32; FAT12/16 entries may carry garbage there.
    pub fn first_cluster(&self, fat_type: FatType) -> u32 {
        let low = self.first_cluster_low as u32;
        match fat_type {
            FatType::Fat32 => low | (self.first_cluster_high as u32) << 16,
            _ => low,
        }
    }

    /// Materialize the 8.3 name: non-space name characters, then a dot and
    /// the non-space extension characters when there are any, lowercased.
    pub fn display_name(&self) -> String {
        let mut out = String::new();
        for &b in self.name.iter().filter(|&&b| b != SPACE) {
            out.push(b.to_ascii_lowercase() as char);
        }
        if self.extension.iter().any(|&b| b != SPACE) {
            out.push('.');
            for &b in self.extension.iter().filter(|&&b| b != SPACE) {
                out.push(b.to_ascii_lowercase() as char);
            }
        }
        out
    }

    pub fn created(&self) -> FatDateTime {
        FatDateTime::from_packed(self.create_date, self.create_time)
    }

    pub fn modified(&self) -> FatDateTime {
        FatDateTime::from_packed(self.write_date, self.write_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ATTR_ARCHIVE, ATTR_LONG_NAME};

    fn slot(name: &[u8; 8], ext: &[u8; 3], attr: u8, cluster: u16, size: u32) -> [u8; 32] {
        let mut slot = [0u8; 32];
        slot[0..8].copy_from_slice(name);
        slot[8..11].copy_from_slice(ext);
        slot[11] = attr;
        slot[26..28].copy_from_slice(&cluster.to_le_bytes());
        slot[28..32].copy_from_slice(&size.to_le_bytes());
        slot
    }

    #[test]
    fn name_with_extension_is_lowercased_and_dotted() {
        let e = DirEntry::parse(&slot(b"GREET   ", b"TXT", ATTR_ARCHIVE, 3, 6));
        assert_eq!(e.display_name(), "greet.txt");
        assert_eq!(e.kind(), FileKind::Regular);
        assert_eq!(e.file_size, 6);
    }

    #[test]
    fn name_without_extension_has_no_dot() {
        let e = DirEntry::parse(&slot(b"DIR1    ", b"   ", crate::ATTR_DIRECTORY, 2, 0));
        assert_eq!(e.display_name(), "dir1");
        assert_eq!(e.kind(), FileKind::Directory);
    }

    #[test]
    fn full_length_name_materializes_to_twelve_chars() {
        let e = DirEntry::parse(&slot(b"ABCDEFGH", b"IJK", ATTR_ARCHIVE, 0, 0));
        assert_eq!(e.display_name(), "abcdefgh.ijk");
        assert_eq!(e.display_name().len(), crate::SHORT_NAME_LEN_CAP);
    }

    #[test]
    fn first_cluster_uses_the_high_word_only_on_fat32() {
        let mut raw = slot(b"A       ", b"   ", ATTR_ARCHIVE, 0x0005, 0);
        raw[20..22].copy_from_slice(&0x0001u16.to_le_bytes());
        let e = DirEntry::parse(&raw);
        assert_eq!(e.first_cluster(FatType::Fat32), 0x0001_0005);
        assert_eq!(e.first_cluster(FatType::Fat16), 0x0005);
        assert_eq!(e.first_cluster(FatType::Fat12), 0x0005);
    }

    #[test]
    fn markers() {
        let unused = DirEntry::parse(&slot(&[0x00; 8], b"   ", 0, 0, 0));
        assert!(unused.is_unused());

        let mut deleted_name = *b"GONE    ";
        deleted_name[0] = 0xE5;
        let deleted = DirEntry::parse(&slot(&deleted_name, b"TXT", ATTR_ARCHIVE, 0, 0));
        assert!(deleted.is_deleted());

        let label = DirEntry::parse(&slot(b"TESTVOL ", b"   ", crate::ATTR_VOLUME_ID, 0, 0));
        assert!(label.is_volume_label());

        // A long-name continuation is skipped through the same bit.
        let lfn = DirEntry::parse(&slot(b"\x41h\0e\0l\0l", b"\0o\0", ATTR_LONG_NAME, 0, 0));
        assert!(lfn.is_volume_label());
    }

    #[test]
    fn dot_entries() {
        let dot = DirEntry::parse(&slot(b".       ", b"   ", crate::ATTR_DIRECTORY, 2, 0));
        let dotdot = DirEntry::parse(&slot(b"..      ", b"   ", crate::ATTR_DIRECTORY, 0, 0));
        let dotted_file = DirEntry::parse(&slot(b".HIDDEN ", b"   ", ATTR_ARCHIVE, 5, 0));
        assert!(dot.is_dot_entry());
        assert!(dotdot.is_dot_entry());
        assert!(!dotted_file.is_dot_entry());
    }

    #[test]
    fn packed_datetime_decodes_by_bit_field() {
        // year 41 -> 2021, month 1, day 21; 12:00:00
        let dt = FatDateTime::from_packed(0x5235, 0x6000);
        assert_eq!(
            dt,
            FatDateTime {
                year: 2021,
                month: 1,
                day: 21,
                hour: 12,
                minute: 0,
                second: 0,
            }
        );
        assert_eq!(
            dt.to_naive().unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2021-01-21 12:00:00"
        );
    }

    #[test]
    fn seconds_carry_a_two_second_granularity() {
        let dt = FatDateTime::from_packed(0x5235, 0x6001);
        assert_eq!(dt.second, 2);
    }

    #[test]
    fn out_of_range_packed_fields_have_no_calendar_value() {
        // A month field of zero cannot be a real date.
        let dt = FatDateTime::from_packed(0x5215, 0);
        assert_eq!(dt.year, 2021);
        assert_eq!(dt.month, 0);
        assert_eq!(dt.day, 21);
        assert!(dt.to_naive().is_none());

        let zeroed = FatDateTime::from_packed(0, 0);
        assert!(zeroed.to_naive().is_none());
    }
}
