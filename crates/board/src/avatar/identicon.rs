pub const IDENTICON_SIZE: usize = 8;

/// Color in HSL space: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Hsl {
    pub fn to_css(&self) -> String {
        format!("hsl({},{}%,{}%)", self.hue, self.saturation, self.lightness)
    }
}

/// Cell fill of an identicon grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Background,
    Foreground,
    Spot,
}

/// Blockies-style identicon: a left/right mirrored grid in three colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Identicon {
    pub size: usize,
    pub foreground: Hsl,
    pub background: Hsl,
    pub spot: Hsl,
    /// Row-major cells, `size * size` long.
    pub cells: Vec<Cell>,
}

impl Identicon {
    /// Derives the identicon for an account address.
    ///
    /// The address is lowercased first, so checksummed and plain spellings
    /// share one identicon.
    pub fn generate(address: &str) -> Self {
        let mut rng = SeedRng::new(&address.to_lowercase());
        let foreground = rng.next_color();
        let background = rng.next_color();
        let spot = rng.next_color();
        let cells = rng.next_cells(IDENTICON_SIZE);

        Self {
            size: IDENTICON_SIZE,
            foreground,
            background,
            spot,
            cells,
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        if row >= self.size || column >= self.size {
            return None;
        }
        self.cells.get(row * self.size + column).copied()
    }

    pub fn color_of(&self, cell: Cell) -> Hsl {
        match cell {
            Cell::Background => self.background,
            Cell::Foreground => self.foreground,
            Cell::Spot => self.spot,
        }
    }
}

/// xorshift128 over four 32-bit words seeded from the address text.
struct SeedRng {
    state: [i32; 4],
}

impl SeedRng {
    fn new(seed: &str) -> Self {
        let mut state = [0i32; 4];
        for (position, unit) in seed.encode_utf16().enumerate() {
            let slot = &mut state[position % 4];
            *slot = (*slot << 5).wrapping_sub(*slot).wrapping_add(i32::from(unit));
        }
        Self { state }
    }

    /// Uniform value in `[0, 1)`.
    ///
    /// The xor of `x` with its own arithmetic shift always clears the sign
    /// bit, so the new word is non-negative and the mask never drops a bit.
    fn next_unit(&mut self) -> f64 {
        let t = self.state[0] ^ (self.state[0] << 11);
        self.state[0] = self.state[1];
        self.state[1] = self.state[2];
        self.state[2] = self.state[3];
        self.state[3] = self.state[3] ^ (self.state[3] >> 19) ^ t ^ (t >> 8);
        f64::from(self.state[3] as u32 & 0x7fff_ffff) / f64::from(1u32 << 31)
    }

    fn next_color(&mut self) -> Hsl {
        let hue = (self.next_unit() * 360.0).floor();
        let saturation = self.next_unit() * 60.0 + 40.0;
        let lightness =
            (self.next_unit() + self.next_unit() + self.next_unit() + self.next_unit()) * 25.0;
        Hsl {
            hue,
            saturation,
            lightness,
        }
    }

    fn next_cells(&mut self, size: usize) -> Vec<Cell> {
        let data_width = size.div_ceil(2);
        let mirror_width = size - data_width;
        let mut cells = Vec::with_capacity(size * size);

        for _ in 0..size {
            let row = (0..data_width)
                .map(|_| match (self.next_unit() * 2.3).floor() as u8 {
                    0 => Cell::Background,
                    1 => Cell::Foreground,
                    _ => Cell::Spot,
                })
                .collect::<Vec<_>>();
            cells.extend_from_slice(&row);
            cells.extend(row[..mirror_width].iter().rev());
        }

        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn generation_is_deterministic_and_case_insensitive() {
        let first = Identicon::generate(ADDRESS);
        assert_eq!(first, Identicon::generate(ADDRESS));
        assert_eq!(first, Identicon::generate(&ADDRESS.to_lowercase()));
        assert_ne!(
            first.cells,
            Identicon::generate("0x0000000000000000000000000000000000000001").cells
        );
    }

    #[test]
    fn rows_are_mirrored() {
        let identicon = Identicon::generate(ADDRESS);
        assert_eq!(identicon.cells.len(), IDENTICON_SIZE * IDENTICON_SIZE);
        for row in 0..IDENTICON_SIZE {
            for column in 0..IDENTICON_SIZE / 2 {
                assert_eq!(
                    identicon.cell(row, column),
                    identicon.cell(row, IDENTICON_SIZE - 1 - column)
                );
            }
        }
        assert_eq!(identicon.cell(IDENTICON_SIZE, 0), None);
    }

    #[test]
    fn matches_blockies_output_for_a_known_address() {
        use Cell::{Background as B, Foreground as F, Spot as S};

        let identicon = Identicon::generate(ADDRESS);
        assert_eq!(identicon.foreground.hue, 217.0);
        assert_eq!(identicon.background.hue, 100.0);
        assert_eq!(identicon.spot.hue, 300.0);
        assert!((identicon.foreground.saturation - 66.143_342_098).abs() < 1e-6);
        assert!((identicon.foreground.lightness - 69.655_475_206).abs() < 1e-6);

        let rows = [
            [F, F, F, B, B, F, F, F],
            [F, F, F, F, F, F, F, F],
            [B, B, F, F, F, F, B, B],
            [B, B, B, F, F, B, B, B],
            [B, B, B, F, F, B, B, B],
            [B, S, F, B, B, F, S, B],
            [F, F, B, B, B, B, F, F],
            [F, F, B, F, F, B, F, F],
        ];
        assert_eq!(identicon.cells, rows.concat());
    }

    #[test]
    fn colors_stay_in_range() {
        let identicon = Identicon::generate(ADDRESS);
        for color in [identicon.foreground, identicon.background, identicon.spot] {
            assert!((0.0..360.0).contains(&color.hue));
            assert!((40.0..100.0).contains(&color.saturation));
            assert!((0.0..100.0).contains(&color.lightness));
        }
        assert!(identicon.foreground.to_css().starts_with("hsl("));
    }
}
