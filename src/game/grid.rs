use rand::{seq::SliceRandom, Rng};

use crate::{
    error::{GameError, GameResult},
    models::{Position, Tile, TileView},
};

/// Shape of a grid and how its tiles are grouped for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub width: usize,
    pub height: usize,
    pub tile_types: u8,
    /// Tiles that must be selected together to form a match
    pub match_size: usize,
}

impl GridLayout {
    pub fn new(width: usize, height: usize, tile_types: u8) -> Self {
        Self {
            width,
            height,
            tile_types,
            match_size: 2,
        }
    }

    pub fn with_match_size(mut self, match_size: usize) -> Self {
        self.match_size = match_size;
        self
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    fn validate(&self) -> GameResult<()> {
        let cells = self.cells();
        if cells % 2 != 0 {
            return Err(GameError::OddCellCount {
                width: self.width,
                height: self.height,
            });
        }
        if self.match_size < 2 || cells % self.match_size != 0 {
            return Err(GameError::InvalidMatchSize {
                cells,
                match_size: self.match_size,
            });
        }
        if self.tile_types == 0 {
            return Err(GameError::NoTileTypes);
        }
        Ok(())
    }
}

/// The tile matrix for one level, stored row-major
#[derive(Debug, Clone, Default)]
pub struct GridModel {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl GridModel {
    /// Build a grid for `letters`.
    ///
    /// Letters fill the `cells / 2` pair slots cyclically, each placed twice,
    /// and the whole queue is shuffled before being dealt out in scan order.
    /// Tile types are dealt from their own shuffled queue, in groups of
    /// `match_size`, so type and letter are independent but every type occurs
    /// a whole number of match groups.
    pub fn build<R: Rng + ?Sized>(
        layout: &GridLayout,
        letters: &[char],
        rng: &mut R,
    ) -> GameResult<Self> {
        layout.validate()?;
        if letters.is_empty() {
            return Err(GameError::EmptyLetterSource);
        }

        let cells = layout.cells();
        let letter_queue = Self::letter_queue(cells, letters, rng);
        let type_queue = Self::type_queue(cells, layout.tile_types, layout.match_size, rng);

        let tiles = letter_queue
            .into_iter()
            .zip(type_queue)
            .enumerate()
            .map(|(index, (letter, tile_type))| {
                let position = Position::new(index % layout.width, index / layout.width);
                Tile::new(position, tile_type, Some(letter))
            })
            .collect();

        Ok(Self {
            width: layout.width,
            height: layout.height,
            tiles,
        })
    }

    fn letter_queue<R: Rng + ?Sized>(cells: usize, letters: &[char], rng: &mut R) -> Vec<char> {
        let mut queue = Vec::with_capacity(cells);
        for slot in 0..cells / 2 {
            let letter = letters[slot % letters.len()];
            queue.push(letter);
            queue.push(letter);
        }
        queue.shuffle(rng);
        queue
    }

    fn type_queue<R: Rng + ?Sized>(
        cells: usize,
        tile_types: u8,
        match_size: usize,
        rng: &mut R,
    ) -> Vec<u8> {
        let mut queue = Vec::with_capacity(cells);
        for _ in 0..cells / match_size {
            let tile_type = rng.random_range(0..tile_types);
            queue.extend(std::iter::repeat_n(tile_type, match_size));
        }
        queue.shuffle(rng);
        queue
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        (pos.x < self.width && pos.y < self.height).then(|| pos.y * self.width + pos.x)
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index(pos).and_then(move |i| self.tiles.get_mut(i))
    }

    #[cfg(test)]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn views(&self) -> Vec<TileView> {
        self.tiles.iter().map(TileView::from).collect()
    }

    /// True iff every tile is matched. An empty grid has nothing left to
    /// match but is not a finished level.
    pub fn all_matched(&self) -> bool {
        !self.tiles.is_empty() && self.tiles.iter().all(|t| t.is_matched)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drop all tiles. The grid must be rebuilt before it is used again.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.width = 0;
        self.height = 0;
    }

    /// Overwrite tile types in scan order, for building fixed boards in tests
    #[cfg(test)]
    pub fn set_types(&mut self, types: &[u8]) {
        for (tile, &tile_type) in self.tiles.iter_mut().zip(types) {
            tile.tile_type = tile_type;
        }
    }
}
