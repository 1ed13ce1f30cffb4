/// Number of general purpose registers (`r0`..`r7`).
pub const REGISTER_COUNT : usize = 8;

/// Total number of data-memory cells.
pub const MEMORY_SIZE    : usize = 256;

/// First address of the scalar range.
pub const SCALAR_BASE    : u16 = 32;
/// Last address of the scalar range (inclusive).
pub const SCALAR_END     : u16 = 191;

/// First address of the array range.
pub const ARRAY_BASE     : u16 = 192;
/// Last address of the array range (inclusive).
pub const ARRAY_END      : u16 = 255;
