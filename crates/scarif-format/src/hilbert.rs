use once_cell::sync::Lazy;
use scarif_world::SECTION_BLOCKS;

// State machine walking a 3-D Hilbert curve one octant per step. Each entry is
// `next_state * 8 | morton_octant`.
const HILBERT_TO_MORTON: [u8; 96] = [
    48, 33, 35, 26, 30, 79, 77, 44, 78, 68, 64, 50, 51, 25, 29, 63, 27, 87, 86, 74, 72, 52, 53,
    89, 83, 18, 16, 1, 5, 60, 62, 15, 0, 52, 53, 57, 59, 87, 86, 66, 61, 95, 91, 81, 80, 2, 6,
    76, 32, 2, 6, 12, 13, 95, 91, 17, 93, 41, 40, 36, 38, 10, 11, 31, 14, 79, 77, 92, 88, 33, 35,
    82, 70, 10, 11, 23, 21, 41, 40, 4, 19, 25, 29, 47, 46, 68, 64, 34, 45, 60, 62, 71, 67, 18,
    16, 49,
];

const SECTION_BITS: u32 = 4;

static CURVE: Lazy<[u16; SECTION_BLOCKS]> = Lazy::new(|| {
    let mut curve = [0u16; SECTION_BLOCKS];
    for (step, cell) in curve.iter_mut().enumerate() {
        let (x, y, z) = morton_decode(hilbert_to_morton(step as u32, SECTION_BITS));
        *cell = ((y << 8) | (z << 4) | x) as u16;
    }
    curve
});

fn hilbert_to_morton(index: u32, bits: u32) -> u32 {
    let mut morton = 0;
    let mut transform = 0usize;
    let mut shift = 3 * (bits - 1) as i32;
    while shift >= 0 {
        transform = HILBERT_TO_MORTON[transform | ((index >> shift) & 7) as usize] as usize;
        morton = (morton << 3) | (transform & 7) as u32;
        transform &= !7;
        shift -= 3;
    }
    morton
}

/// Splits interleaved bits back into (x, y, z); bit `b` belongs to axis `b % 3`.
fn morton_decode(morton: u32) -> (u32, u32, u32) {
    let mut axes = [0u32; 3];
    for bit in 0..3 * SECTION_BITS {
        axes[(bit % 3) as usize] |= ((morton >> bit) & 1) << (bit / 3);
    }
    (axes[0], axes[1], axes[2])
}

/// Order in which a section's 4096 block indices are written to a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockLayout {
    /// `y * 256 + z * 16 + x`, the order sections are stored in.
    Linear,
    /// Along a Hilbert curve, so neighbouring blocks stay neighbours in the stream.
    #[default]
    Hilbert,
}

impl BlockLayout {
    /// Linear block index of the `step`-th value in the stream.
    pub fn linear_index(self, step: usize) -> usize {
        match self {
            BlockLayout::Linear => step,
            BlockLayout::Hilbert => CURVE[step] as usize,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockLayout::Linear => "linear",
            BlockLayout::Hilbert => "hilbert",
        }
    }

    pub fn from_name(name: &str) -> Option<BlockLayout> {
        match name {
            "linear" => Some(BlockLayout::Linear),
            "hilbert" => Some(BlockLayout::Hilbert),
            _ => None,
        }
    }
}
