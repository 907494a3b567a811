//! Colormap tables
//!
//! Each table holds 256 (R,G,B) triples, flattened to 768 bytes and read in
//! consecutive triples. Tables are built at compile time by linear
//! interpolation between color stops.

use std::borrow::Cow;

use contracts::ColormapKind;

/// Entries per built-in table
pub const COLORMAP_LEN: usize = 256 * 3;

type Stop = (u8, [u8; 3]);

const RAINBOW_STOPS: &[Stop] = &[
    (0, [32, 0, 64]),
    (42, [0, 0, 255]),
    (85, [0, 255, 255]),
    (128, [0, 255, 0]),
    (170, [255, 255, 0]),
    (213, [255, 128, 0]),
    (255, [255, 0, 0]),
];

const GRAYSCALE_STOPS: &[Stop] = &[(0, [0, 0, 0]), (255, [255, 255, 255])];

const IRONBLACK_STOPS: &[Stop] = &[
    (0, [255, 255, 255]),
    (64, [0, 0, 0]),
    (96, [50, 0, 120]),
    (144, [190, 30, 90]),
    (192, [250, 120, 0]),
    (232, [255, 220, 40]),
    (255, [255, 255, 230]),
];

static RAINBOW: [u8; COLORMAP_LEN] = gradient(RAINBOW_STOPS);
static GRAYSCALE: [u8; COLORMAP_LEN] = gradient(GRAYSCALE_STOPS);
static IRONBLACK: [u8; COLORMAP_LEN] = gradient(IRONBLACK_STOPS);

/// Expand sorted color stops (first at 0, last at 255) into a flat table
const fn gradient(stops: &[Stop]) -> [u8; COLORMAP_LEN] {
    let mut table = [0u8; COLORMAP_LEN];
    let mut seg = 0;
    while seg + 1 < stops.len() {
        let (start, from) = stops[seg];
        let (end, to) = stops[seg + 1];
        let span = (end - start) as i32;
        let mut idx = start as usize;
        while idx <= end as usize {
            let t = (idx - start as usize) as i32;
            let mut ch = 0;
            while ch < 3 {
                let a = from[ch] as i32;
                let b = to[ch] as i32;
                table[idx * 3 + ch] = (a + (b - a) * t / span) as u8;
                ch += 1;
            }
            idx += 1;
        }
        seg += 1;
    }
    table
}

/// Color lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colormap {
    name: Cow<'static, str>,
    table: Cow<'static, [u8]>,
}

impl Colormap {
    /// Built-in table for `kind`
    pub fn builtin(kind: ColormapKind) -> Self {
        let table: &'static [u8] = match kind {
            ColormapKind::Rainbow => &RAINBOW,
            ColormapKind::Grayscale => &GRAYSCALE,
            ColormapKind::Ironblack => &IRONBLACK,
        };
        Self {
            name: Cow::Borrowed(kind.as_str()),
            table: Cow::Borrowed(table),
        }
    }

    /// Arbitrary table, for exercising the clamping in `lookup`
    #[cfg(test)]
    fn from_table(name: &str, table: Vec<u8>) -> Self {
        Self {
            name: Cow::Owned(name.to_string()),
            table: Cow::Owned(table),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// (R,G,B) for a normalized intensity
    ///
    /// Offsets `3n`, `3n+1`, `3n+2` are each clamped to the last valid index.
    #[inline]
    pub fn lookup(&self, normalized: usize) -> [u8; 3] {
        let last = self.table.len() - 1;
        let base = normalized.saturating_mul(3);
        [
            self.table[base.min(last)],
            self.table[base.saturating_add(1).min(last)],
            self.table[base.saturating_add(2).min(last)],
        ]
    }
}
