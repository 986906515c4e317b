pub mod auth;
pub mod packet;
pub mod session;

// Fixed protocol addresses, must match SP PRO firmware.
pub const ADDR_COMPORT: u32 = 0x0000_A000;
pub const ADDR_DISCONNECT: u32 = 0x0000_A00D;
pub const ADDR_CHALLENGE: u32 = 0x001F_0000;
pub const ADDR_CHALLENGE_SUCCESS: u32 = 0x001F_0010;

/// Value of the comport register while no session is authenticated.
pub const COMPORT_UNAUTHENTICATED: u16 = 0xFFFF;
