//! CRC-32 used by the container page checksum.
//!
//! Polynomial 0x04C11DB7, MSB-first, initial value 0 and no final XOR.
//! This is not the reflected CRC-32 used by zlib.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-32 algorithm for page checksums.
pub const CRC_OGG_PAGE_ALG: Algorithm<u32> = Algorithm {
    poly: 0x04c1_1db7,
    init: 0x0000_0000,
};

/// Page-checksum engine, table built at compile time.
pub const OGG_PAGE_CRC: Crc32 = Crc32::new(&CRC_OGG_PAGE_ALG);

/// Checksum contribution of the fixed `OggS` signature plus a zero version
/// byte. Pages are written with this prefix, so the checksum of the rest of
/// the page starts from here.
pub const OGG_CAPTURE_SEED: u32 = OGG_PAGE_CRC.update(OGG_PAGE_CRC.init, b"OggS\0");

/// Computes CRC-32 over `len` bits of `value`, MSB first.
#[inline(always)]
pub const fn crc32(poly: u32, mut value: u32, len: usize) -> u32 {
    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 31) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc32_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc32(poly, (i as u32) << 24, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc32 {
    pub poly: u32,
    pub init: u32,
    table: [u32; 256],
}

impl Crc32 {
    pub const fn new(algorithm: &Algorithm<u32>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc32_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u32) -> u32 {
        self.table[(index & 0xFF) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u32, bytes: &[u8]) -> u32 {
        let mut i = 0;

        while i < bytes.len() {
            crc = (crc << 8) ^ self.table_entry((crc >> 24) ^ bytes[i] as u32);
            i += 1;
        }

        crc
    }

    /// One-shot checksum from the algorithm's initial value.
    pub const fn checksum(&self, bytes: &[u8]) -> u32 {
        self.update(self.init, bytes)
    }
}
