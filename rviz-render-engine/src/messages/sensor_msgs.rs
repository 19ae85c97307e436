use serde::{Deserialize, Serialize};

use super::Message;
use super::std_msgs::Header;

/// One named channel inside a point record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PointField {
    pub name: String,
    /// Byte offset from the start of the point record.
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

impl PointField {
    pub const INT8: u8 = 1;
    pub const UINT8: u8 = 2;
    pub const INT16: u8 = 3;
    pub const UINT16: u8 = 4;
    pub const INT32: u8 = 5;
    pub const UINT32: u8 = 6;
    pub const FLOAT32: u8 = 7;
    pub const FLOAT64: u8 = 8;

    /// Width of one element in bytes, `None` for unknown datatypes.
    pub fn size(&self) -> Option<usize> {
        match self.datatype {
            Self::INT8 | Self::UINT8 => Some(1),
            Self::INT16 | Self::UINT16 => Some(2),
            Self::INT32 | Self::UINT32 | Self::FLOAT32 => Some(4),
            Self::FLOAT64 => Some(8),
            _ => None,
        }
    }

    /// First element of this field in `point`, widened to `f64`.
    ///
    /// `None` when the datatype is unknown or the record is too short.
    pub fn read(&self, point: &[u8], big_endian: bool) -> Option<f64> {
        let start = self.offset as usize;
        let bytes = point.get(start..start + self.size()?)?;

        macro_rules! decode {
            ($ty:ty) => {{
                let raw = bytes.try_into().ok()?;
                let value = if big_endian {
                    <$ty>::from_be_bytes(raw)
                } else {
                    <$ty>::from_le_bytes(raw)
                };
                value as f64
            }};
        }

        Some(match self.datatype {
            Self::INT8 => decode!(i8),
            Self::UINT8 => decode!(u8),
            Self::INT16 => decode!(i16),
            Self::UINT16 => decode!(u16),
            Self::INT32 => decode!(i32),
            Self::UINT32 => decode!(u32),
            Self::FLOAT32 => decode!(f32),
            Self::FLOAT64 => decode!(f64),
            _ => return None,
        })
    }
}

/// Packed point records with a self-describing layout.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    /// Bytes per point record.
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl PointCloud2 {
    /// Whole records in `data`.
    pub fn point_count(&self) -> usize {
        match self.point_step as usize {
            0 => 0,
            step => self.data.len() / step,
        }
    }

    /// Field named `name`, compared case-insensitively.
    pub fn field(&self, name: &str) -> Option<&PointField> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.point_step.max(1) as usize)
    }
}

impl Message for PointCloud2 {
    const TYPE_NAME: &'static str = "sensor_msgs/PointCloud2";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, offset: u32, datatype: u8) -> PointField {
        PointField {
            name: name.into(),
            offset,
            datatype,
            count: 1,
        }
    }

    #[test]
    fn reads_each_datatype_at_its_offset() {
        let mut record = vec![0xFEu8];
        record.extend_from_slice(&300u16.to_le_bytes());
        record.extend_from_slice(&1.5f32.to_le_bytes());
        record.extend_from_slice(&(-2.25f64).to_le_bytes());

        assert_eq!(field("a", 0, PointField::INT8).read(&record, false), Some(-2.0));
        assert_eq!(field("a", 0, PointField::UINT8).read(&record, false), Some(254.0));
        assert_eq!(field("b", 1, PointField::UINT16).read(&record, false), Some(300.0));
        assert_eq!(field("c", 3, PointField::FLOAT32).read(&record, false), Some(1.5));
        assert_eq!(field("d", 7, PointField::FLOAT64).read(&record, false), Some(-2.25));
        assert_eq!(field("e", 9, PointField::FLOAT64).read(&record, false), None);
        assert_eq!(field("f", 0, 42).read(&record, false), None);
    }

    #[test]
    fn big_endian_records() {
        let record = 7i32.to_be_bytes();
        assert_eq!(field("v", 0, PointField::INT32).read(&record, true), Some(7.0));
    }

    #[test]
    fn point_count_ignores_trailing_bytes() {
        let cloud = PointCloud2 {
            point_step: 12,
            data: vec![0; 30],
            fields: vec![field("X", 0, PointField::FLOAT32)],
            ..Default::default()
        };
        assert_eq!(cloud.point_count(), 2);
        assert_eq!(cloud.records().count(), 2);
        assert!(cloud.field("x").is_some());
        assert_eq!(PointCloud2::default().point_count(), 0);
    }
}
