//! Fixed-tile texture atlas (C7): a direct-mapped region (stable index,
//! never evicted) plus an LRU-cached region (strong-hash key, evicted on
//! insertion when full). The atlas itself never touches pixels or a GPU
//! context — it only tracks *where* a tile lives and emits backend commands
//! (`ConfigureAtlas`/`UploadTile`/`RenderTile`) a collaborator executes.
//!
//! Ported from `original_source/src/vtrasterizer/TextureAtlas.h`
//! (`AtlasTileID`, `TileLocation`, `computeAtlasSize`, the direct-mapped +
//! LRU split, and wide-glyph tile slicing). No example repo in the retrieval
//! pack implements a texture atlas, so this module has no close analogue —
//! it is grounded entirely on the original source plus the backend-command
//! interface described in §4.6/§6.

use std::collections::{HashMap, VecDeque};

/// Pixel format of the atlas texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtlasFormat {
    Red,
    Rgb,
    Rgba,
}

impl AtlasFormat {
    pub fn element_count(self) -> u32 {
        match self {
            AtlasFormat::Red => 1,
            AtlasFormat::Rgb => 3,
            AtlasFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Pixel offset of one tile within the atlas texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileLocation {
    pub x: u32,
    pub y: u32,
}

/// Atlas-relative `[0, 1]` UV rectangle for a tile, for backends that want
/// normalized texture coordinates instead of pixel offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedTileLocation {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Static configuration for a [`TextureAtlas`], mirroring
/// `TextureAtlas.h`'s `AtlasProperties`.
#[derive(Debug, Clone, Copy)]
pub struct AtlasProperties {
    pub format: AtlasFormat,
    pub tile_size: ImageSize,
    /// Capacity of the LRU-cached region (tiles, not hash slots — this
    /// implementation uses a plain `HashMap` rather than a fixed-size
    /// strong-hash table, so there's no separate hash-count knob).
    pub lru_capacity: u32,
    /// Number of reserved direct-mapped slots, indices `0..direct_mapping_count`.
    pub direct_mapping_count: u32,
}

/// A strong key identifying one rasterized glyph tile:
/// `(font_id, glyph_index, size, presentation)` collapsed to a single u64 by
/// the caller (the actual rasterizer/shaping pipeline is out of scope; the
/// atlas only needs the key to be stable and unique per distinct glyph).
pub type LruKey = u64;

/// Backend commands the atlas emits; a GPU/rasterization collaborator
/// executes them (§4.6, §6 "Atlas backend interface").
#[derive(Debug, Clone, PartialEq)]
pub enum AtlasCommand {
    ConfigureAtlas {
        size: ImageSize,
        properties: AtlasPropertiesSnapshot,
    },
    UploadTile {
        location: TileLocation,
        bitmap: Vec<u8>,
        bitmap_size: ImageSize,
        format: AtlasFormat,
    },
    RenderTile {
        x: i32,
        y: i32,
        bitmap_size: ImageSize,
        target_size: ImageSize,
        color: (u8, u8, u8, u8),
        tile_location: TileLocation,
        normalized_location: NormalizedTileLocation,
        shader_selector: u32,
    },
}

/// A plain-data copy of [`AtlasProperties`] suitable for embedding in a
/// command (the original carries `AtlasProperties` by value too).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasPropertiesSnapshot {
    pub format: AtlasFormat,
    pub tile_size: ImageSize,
    pub direct_mapping_count: u32,
    pub lru_capacity: u32,
}

/// Round up to the next power of two (minimum 1).
fn next_pow2(v: u32) -> u32 {
    if v <= 1 {
        1
    } else {
        1u32 << (32 - (v - 1).leading_zeros())
    }
}

/// The smallest square power-of-two texture (in tile units) that fits
/// `total_tiles` tiles of `tile_size`, per `TextureAtlas.h::computeAtlasSize`.
pub fn compute_atlas_size(total_tiles: u32, tile_size: ImageSize) -> ImageSize {
    let tiles_per_side = next_pow2((total_tiles as f64).sqrt().ceil() as u32).max(1);
    ImageSize {
        width: tiles_per_side * tile_size.width,
        height: tiles_per_side * tile_size.height,
    }
}

/// A fixed-size, grid-tiled texture atlas with a never-evicted direct-mapped
/// region and an LRU-evicted region for everything else.
#[derive(Debug)]
pub struct TextureAtlas {
    properties: AtlasProperties,
    tiles_per_row: u32,
    direct_slots: Vec<bool>,
    lru_map: HashMap<LruKey, u32>,
    lru_order: VecDeque<LruKey>,
    next_lru_slot: u32,
    pending: Vec<AtlasCommand>,
}

impl TextureAtlas {
    pub fn new(properties: AtlasProperties) -> Self {
        let total = properties.direct_mapping_count + properties.lru_capacity;
        let size = compute_atlas_size(total.max(1), properties.tile_size);
        let tiles_per_row = (size.width / properties.tile_size.width.max(1)).max(1);

        let mut atlas = Self {
            properties,
            tiles_per_row,
            direct_slots: vec![false; properties.direct_mapping_count as usize],
            lru_map: HashMap::new(),
            lru_order: VecDeque::new(),
            next_lru_slot: properties.direct_mapping_count,
            pending: Vec::new(),
        };
        atlas.pending.push(AtlasCommand::ConfigureAtlas {
            size,
            properties: AtlasPropertiesSnapshot {
                format: properties.format,
                tile_size: properties.tile_size,
                direct_mapping_count: properties.direct_mapping_count,
                lru_capacity: properties.lru_capacity,
            },
        });
        atlas
    }

    pub fn tile_size(&self) -> ImageSize {
        self.properties.tile_size
    }

    /// Pixel offset of tile index `n` within the atlas.
    pub fn tile_location(&self, tile_index: u32) -> TileLocation {
        let row = tile_index / self.tiles_per_row;
        let col = tile_index % self.tiles_per_row;
        TileLocation {
            x: col * self.properties.tile_size.width,
            y: row * self.properties.tile_size.height,
        }
    }

    fn normalized(&self, location: TileLocation) -> NormalizedTileLocation {
        let atlas_w = (self.tiles_per_row * self.properties.tile_size.width).max(1) as f32;
        let atlas_h = atlas_w;
        NormalizedTileLocation {
            x: location.x as f32 / atlas_w,
            y: location.y as f32 / atlas_h,
            width: self.properties.tile_size.width as f32 / atlas_w,
            height: self.properties.tile_size.height as f32 / atlas_h,
        }
    }

    /// Claim a never-evicted direct-mapped slot by stable index (e.g. an
    /// ASCII codepoint offset). Errs if `index` is outside the reserved
    /// range (§7 "Atlas miss on render" handles the fallback at the caller).
    pub fn upload_direct(&mut self, index: u32, bitmap: Vec<u8>) -> Option<TileLocation> {
        let slot = self.direct_slots.get_mut(index as usize)?;
        *slot = true;
        let location = self.tile_location(index);
        self.pending.push(AtlasCommand::UploadTile {
            location,
            bitmap,
            bitmap_size: self.properties.tile_size,
            format: self.properties.format,
        });
        Some(location)
    }

    /// Look up or insert an LRU-cached tile keyed by `key`, evicting the
    /// least-recently-used entry if the cache is full. `make_bitmap` is
    /// called (once) only on a cache miss.
    pub fn get_or_insert_lru(
        &mut self,
        key: LruKey,
        make_bitmap: impl FnOnce() -> Vec<u8>,
    ) -> TileLocation {
        if let Some(&slot) = self.lru_map.get(&key) {
            self.touch(key);
            return self.tile_location(slot);
        }

        if self.lru_map.len() as u32 >= self.properties.lru_capacity {
            self.evict_one();
        }

        let slot = self.next_lru_slot;
        self.next_lru_slot = self
            .properties
            .direct_mapping_count
            + ((self.next_lru_slot + 1 - self.properties.direct_mapping_count)
                % self.properties.lru_capacity.max(1));
        self.lru_map.insert(key, slot);
        self.lru_order.push_back(key);

        let location = self.tile_location(slot);
        self.pending.push(AtlasCommand::UploadTile {
            location,
            bitmap: make_bitmap(),
            bitmap_size: self.properties.tile_size,
            format: self.properties.format,
        });
        location
    }

    fn touch(&mut self, key: LruKey) {
        if let Some(pos) = self.lru_order.iter().position(|&k| k == key) {
            let k = self.lru_order.remove(pos).unwrap();
            self.lru_order.push_back(k);
        }
    }

    fn evict_one(&mut self) {
        if let Some(oldest) = self.lru_order.pop_front() {
            self.lru_map.remove(&oldest);
        }
    }

    /// Record a draw call for a tile already resident in the atlas (caller
    /// resolved `location` via [`Self::upload_direct`]/[`Self::get_or_insert_lru`]).
    pub fn render_tile(
        &mut self,
        x: i32,
        y: i32,
        target_size: ImageSize,
        color: (u8, u8, u8, u8),
        location: TileLocation,
        shader_selector: u32,
    ) {
        let normalized = self.normalized(location);
        self.pending.push(AtlasCommand::RenderTile {
            x,
            y,
            bitmap_size: self.properties.tile_size,
            target_size,
            color,
            tile_location: location,
            normalized_location: normalized,
            shader_selector,
        });
    }

    /// Wide glyphs (wider than one tile) are stored as a head tile plus N
    /// continuation tiles keyed by `hash * (x_offset + 1)`, per
    /// `TextureAtlas.h`'s wide-glyph slicing scheme. Returns the locations of
    /// the head tile followed by each continuation tile, left to right.
    pub fn get_or_insert_wide(
        &mut self,
        base_key: LruKey,
        slice_count: u32,
        mut make_slice_bitmap: impl FnMut(u32) -> Vec<u8>,
    ) -> Vec<TileLocation> {
        (0..slice_count.max(1))
            .map(|i| {
                let key = base_key.wrapping_mul(i as u64 + 1);
                self.get_or_insert_lru(key, || make_slice_bitmap(i))
            })
            .collect()
    }

    /// Drain backend commands accumulated since the last call.
    pub fn take_commands(&mut self) -> Vec<AtlasCommand> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> AtlasProperties {
        AtlasProperties {
            format: AtlasFormat::Rgba,
            tile_size: ImageSize { width: 16, height: 16 },
            lru_capacity: 4,
            direct_mapping_count: 2,
        }
    }

    #[test]
    fn atlas_size_rounds_up_to_power_of_two() {
        let size = compute_atlas_size(10, ImageSize { width: 16, height: 16 });
        // sqrt(10) ~= 3.16 -> ceil 4 -> already pow2 -> 4x4 tiles
        assert_eq!(size, ImageSize { width: 64, height: 64 });
    }

    #[test]
    fn direct_slot_is_never_evicted() {
        let mut atlas = TextureAtlas::new(props());
        let loc = atlas.upload_direct(0, vec![0; 4]).unwrap();
        for i in 0..10 {
            atlas.get_or_insert_lru(i, || vec![1; 4]);
        }
        assert_eq!(atlas.tile_location(0), loc);
    }

    #[test]
    fn lru_cache_evicts_oldest_on_overflow() {
        let mut atlas = TextureAtlas::new(props());
        for i in 0..4 {
            atlas.get_or_insert_lru(i, || vec![1; 4]);
        }
        atlas.get_or_insert_lru(4, || vec![2; 4]);
        assert!(!atlas.lru_map.contains_key(&0));
        assert!(atlas.lru_map.contains_key(&4));
    }

    #[test]
    fn lru_hit_does_not_allocate_new_slot() {
        let mut atlas = TextureAtlas::new(props());
        let first = atlas.get_or_insert_lru(7, || vec![1; 4]);
        let second = atlas.get_or_insert_lru(7, || panic!("should not re-rasterize"));
        assert_eq!(first, second);
    }
}
