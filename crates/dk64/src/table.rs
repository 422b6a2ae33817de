//! Geometry tables.
//!
//! The ROM stores map geometry as a table of assets. Entries are decoded
//! independently: one malformed asset never prevents its siblings from
//! decoding. Indirection records are resolved against the finished table.

use dk64_decode::BuildLimits;

use crate::asset::{DecodedGeometry, GeometryAsset};
use crate::error::{Error, Result};

/// Assets extracted from one geometry table, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryTable {
    assets: Vec<GeometryAsset>,
}

impl GeometryTable {
    /// Build a table from decompressed entries.
    pub fn new(entries: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            assets: entries.into_iter().map(GeometryAsset::new).collect(),
        }
    }

    #[must_use]
    pub fn assets(&self) -> &[GeometryAsset] {
        &self.assets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&GeometryAsset> {
        self.assets.get(index).ok_or(Error::NoSuchAsset {
            index,
            len: self.assets.len(),
        })
    }

    /// The asset an indirection record at `index` points to.
    ///
    /// Returns `Ok(None)` if the asset at `index` is not an indirection
    /// record. Only one hop is followed.
    pub fn resolve_pointer(&self, index: usize) -> Result<Option<(usize, &GeometryAsset)>> {
        let Some(target) = self.get(index)?.pointer() else {
            return Ok(None);
        };
        let asset = self.assets.get(target).ok_or(Error::DanglingIndirection {
            index,
            target,
            len: self.assets.len(),
        })?;
        Ok(Some((target, asset)))
    }

    /// Decode every asset. Failures are reported per asset.
    pub fn decode_all(&self, limits: BuildLimits) -> Vec<Result<DecodedGeometry>> {
        self.assets
            .iter()
            .enumerate()
            .map(|(index, asset)| {
                let decoded = self.resolve_pointer(index).and_then(|_| asset.decode(limits));
                if let Err(err) = &decoded {
                    tracing::warn!(index, %err, "failed to decode geometry asset");
                }
                decoded
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer_entry(target: u8) -> Vec<u8> {
        vec![0x00, target, 0x08, 0, 0, 0, 0, 0]
    }

    #[test]
    fn resolves_pointer_to_sibling() {
        let table = GeometryTable::new([
            vec![0xAA; 4],
            vec![0xBB; 4],
            vec![0xCC; 4],
            vec![0xDD; 4],
            pointer_entry(3),
        ]);
        let (target, asset) = table.resolve_pointer(4).unwrap().unwrap();
        assert_eq!(target, 3);
        assert_eq!(asset.raw(), &[0xDD; 4]);
        assert_eq!(table.resolve_pointer(0).unwrap(), None);
    }

    #[test]
    fn dangling_pointer_is_reported() {
        let table = GeometryTable::new([pointer_entry(7)]);
        assert_eq!(
            table.resolve_pointer(0),
            Err(Error::DanglingIndirection {
                index: 0,
                target: 7,
                len: 1
            })
        );
    }

    #[test]
    fn failures_stay_local_to_their_asset() {
        let table = GeometryTable::new([vec![0x12; 8], pointer_entry(0)]);
        let results = table.decode_all(BuildLimits::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().points_to, Some(0));
    }
}
